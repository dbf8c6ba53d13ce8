//! Command line framing.
//!
//! Reassembles newline-terminated command lines from a raw serial byte
//! stream. `\n`, `\r`, and `\r\n` all terminate a line, including a `\r\n`
//! pair split across separate feed calls.
//!
//! There are two framing paths into the dispatcher: the bulk path pulls a
//! complete line out of the RX ring via [`crate::ring::RingBuffer::peek_line`]
//! and wraps it with [`Line::from_parts`]; the incremental path pushes one
//! byte at a time through [`LineSession::push_byte`]. Both produce the same
//! [`Line`] value for the same input, so the dispatcher cannot tell them
//! apart.

use heapless::Vec;

use crate::config::LINE_CAPACITY;

/// Command prefix; anything not starting with this is discarded unanswered.
pub const COMMAND_PREFIX: &[u8] = b"km.";

/// Line terminator as received, preserved so echoes can reproduce the
/// original bytes instead of a normalized one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Terminator {
    Lf,
    Cr,
    CrLf,
}

impl Terminator {
    pub fn as_bytes(self) -> &'static [u8] {
        match self {
            Terminator::Lf => b"\n",
            Terminator::Cr => b"\r",
            Terminator::CrLf => b"\r\n",
        }
    }

    /// Width of the terminator on the wire.
    pub fn len(self) -> usize {
        self.as_bytes().len()
    }
}

/// A complete received line, ready for dispatch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Line {
    content: Vec<u8, LINE_CAPACITY>,
    terminator: Terminator,
    is_command: bool,
}

impl Line {
    /// Wrap a line extracted by the bulk path. Content beyond the line
    /// capacity has already been dropped by `peek_line`.
    pub fn from_parts(content: &[u8], terminator: Terminator) -> Self {
        let mut buf = Vec::new();
        let take = content.len().min(LINE_CAPACITY);
        // Capacity matches `take`, cannot fail.
        let _ = buf.extend_from_slice(&content[..take]);
        let is_command = looks_like_command(&buf);
        Self {
            content: buf,
            terminator,
            is_command,
        }
    }

    /// Line text, terminator excluded.
    pub fn content(&self) -> &[u8] {
        &self.content
    }

    pub fn terminator(&self) -> Terminator {
        self.terminator
    }

    /// True when the line starts with the `km.` command prefix.
    pub fn is_command(&self) -> bool {
        self.is_command
    }
}

fn looks_like_command(content: &[u8]) -> bool {
    content.len() >= COMMAND_PREFIX.len() && &content[..COMMAND_PREFIX.len()] == COMMAND_PREFIX
}

/// Per-byte framing state machine (the incremental path).
///
/// Holds the accumulation buffer, the "looks like a command" flag, and the
/// pending-`\r` terminator state between feed calls.
pub struct LineSession {
    buf: Vec<u8, LINE_CAPACITY>,
    in_command: bool,
    pending_cr: bool,
}

impl LineSession {
    pub const fn new() -> Self {
        Self {
            buf: Vec::new(),
            in_command: false,
            pending_cr: false,
        }
    }

    /// Feed one byte; returns a completed [`Line`] when this byte ends one.
    ///
    /// A lone `\r` defers completion by one byte: if the next byte is `\n`
    /// the pair forms a single two-byte terminator, otherwise the
    /// `\r`-terminated line completes and the new byte starts fresh
    /// processing (including the case where it is itself a terminator).
    pub fn push_byte(&mut self, byte: u8) -> Option<Line> {
        if self.pending_cr {
            self.pending_cr = false;
            if byte == b'\n' {
                return Some(self.complete(Terminator::CrLf));
            }
            let line = self.complete(Terminator::Cr);
            self.consume(byte);
            return Some(line);
        }
        self.consume(byte)
    }

    fn consume(&mut self, byte: u8) -> Option<Line> {
        match byte {
            b'\n' => Some(self.complete(Terminator::Lf)),
            b'\r' => {
                self.pending_cr = true;
                None
            }
            _ => {
                self.accept(byte);
                None
            }
        }
    }

    fn accept(&mut self, byte: u8) {
        if self.buf.push(byte).is_err() {
            // Over-long line: drop the whole in-progress line and start
            // over with this byte.
            self.reset();
            let _ = self.buf.push(byte);
        }
        if self.buf.len() == COMMAND_PREFIX.len() {
            self.in_command = looks_like_command(&self.buf);
        }
    }

    fn complete(&mut self, terminator: Terminator) -> Line {
        let line = Line {
            content: self.buf.clone(),
            terminator,
            is_command: self.in_command,
        };
        self.reset();
        line
    }

    /// Drop any partial line and terminator state.
    pub fn reset(&mut self) {
        self.buf.clear();
        self.in_command = false;
        self.pending_cr = false;
    }
}

impl Default for LineSession {
    fn default() -> Self {
        Self::new()
    }
}
