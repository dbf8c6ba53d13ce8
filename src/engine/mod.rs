//! Input injection and merging engine.
//!
//! One [`Engine`] owns the whole serial→HID pipeline: the RX ring fed by the
//! transport, line framing, command dispatch, the per-button state machines,
//! the movement/wheel accumulators, and the TX ring holding echoes, prompts,
//! and notifications for the transport to flush.
//!
//! The engine has no threads and no statics. Two call patterns drive it:
//! [`Engine::feed`] (producer side, interrupt/DMA context) and the periodic
//! [`Engine::tick`] (consumer side). Within one tick, commands are applied
//! in arrival order and button timers advance before the report is
//! assembled, so a command's effect is visible in the very next report.

pub mod button;
pub mod motion;
pub mod rng;

#[cfg(test)]
mod tests;

use crate::command::{Axis, Command};
use crate::config::{LINE_CAPACITY, RX_BUFFER_CAPACITY, TX_BUFFER_CAPACITY};
use crate::framer::{Line, LineSession};
use crate::report::MouseReport;
use crate::ring::RingBuffer;
use button::{ButtonId, ButtonState};
use motion::{AxisLocks, MotionAccumulator, WheelAccumulator};
use rng::{JitterRng, Lcg};

/// The injection engine. Construct one at startup and pass it to every
/// entry point; independent instances are cheap, which is what the tests
/// rely on.
pub struct Engine<R: JitterRng = Lcg> {
    rx: RingBuffer<RX_BUFFER_CAPACITY>,
    tx: RingBuffer<TX_BUFFER_CAPACITY>,
    session: LineSession,
    buttons: [ButtonState; ButtonId::COUNT],
    /// Last-observed raw physical button bits, bit positions per `ButtonId`.
    physical_buttons: u8,
    axis_locks: AxisLocks,
    motion: MotionAccumulator,
    wheel: WheelAccumulator,
    notify_enabled: bool,
    last_notified: u8,
    rng: R,
}

impl Engine<Lcg> {
    pub fn new() -> Self {
        Self::with_rng(Lcg::default())
    }
}

impl Default for Engine<Lcg> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: JitterRng> Engine<R> {
    /// Build an engine around a caller-supplied jitter source.
    pub fn with_rng(rng: R) -> Self {
        Self {
            rx: RingBuffer::new(),
            tx: RingBuffer::new(),
            session: LineSession::new(),
            buttons: [ButtonState::new(); ButtonId::COUNT],
            physical_buttons: 0,
            axis_locks: AxisLocks::default(),
            motion: MotionAccumulator::new(),
            wheel: WheelAccumulator::new(),
            notify_enabled: false,
            last_notified: 0,
            rng,
        }
    }

    // Producer side

    /// Append raw serial bytes, in arbitrary chunks. Never blocks; on
    /// overflow the oldest unread bytes are dropped.
    pub fn feed(&mut self, bytes: &[u8]) {
        self.rx.push_slice(bytes);
    }

    // Physical input path

    /// Merge a physical mouse event observed by the host stack: raw button
    /// bitmap plus relative deltas. Buttons that are neither forced nor
    /// locked mirror immediately; deltas land in the shared accumulators.
    pub fn observe_physical(&mut self, buttons: u8, dx: i8, dy: i8, wheel: i8) {
        self.physical_buttons = buttons;
        for id in ButtonId::ALL {
            self.buttons[id.index()].mirror_physical(buttons & id.bit() != 0);
        }
        self.motion.add(dx as i16, dy as i16, self.axis_locks);
        if wheel != 0 {
            self.wheel.add(wheel as i32);
        }
    }

    // Consumer side

    /// One processing pass: frame and dispatch every fully received line in
    /// arrival order, advance all button timers, then emit a button-change
    /// notification if enabled and the bitmap moved.
    pub fn process(&mut self, now: u64) {
        while let Some(b) = self.rx.pop() {
            if let Some(line) = self.session.push_byte(b) {
                self.dispatch(&line, now);
            }
        }
        self.advance_buttons(now);
        self.emit_notification();
    }

    /// Bulk-framing variant of [`Engine::process`]: pulls whole lines out of
    /// the RX ring instead of walking it byte by byte. Behaviorally
    /// identical for complete input; both paths feed the same dispatcher.
    pub fn process_bulk(&mut self, now: u64) {
        let mut storage = [0u8; LINE_CAPACITY];
        while let Some((len, term)) = self.rx.peek_line(&mut storage) {
            let line = Line::from_parts(&storage[..len], term);
            self.dispatch(&line, now);
        }
        self.advance_buttons(now);
        self.emit_notification();
    }

    /// Drain accumulated state into one report. The USB stack polls this
    /// once per transmission tick; calling it again without an intervening
    /// tick re-drains the accumulators early.
    pub fn assemble_report(&mut self) -> MouseReport {
        MouseReport {
            buttons: self.button_bitmap(),
            x: self.motion.drain_x(),
            y: self.motion.drain_y(),
            wheel: self.wheel.drain(),
            pan: 0,
        }
    }

    /// Full update cycle: process pending input, then assemble the report.
    pub fn tick(&mut self, now: u64) -> MouseReport {
        self.process(now);
        self.assemble_report()
    }

    /// Move up to `buf.len()` pending response bytes out of the TX ring.
    /// Returns the number of bytes written.
    pub fn drain_tx(&mut self, buf: &mut [u8]) -> usize {
        let mut n = 0;
        while n < buf.len() {
            match self.tx.pop() {
                Some(b) => {
                    buf[n] = b;
                    n += 1;
                }
                None => break,
            }
        }
        n
    }

    /// Pending response bytes not yet drained.
    pub fn tx_len(&self) -> usize {
        self.tx.len()
    }

    // Introspection

    pub fn is_pressed(&self, id: ButtonId) -> bool {
        self.buttons[id.index()].pressed()
    }

    pub fn is_forced(&self, id: ButtonId) -> bool {
        self.buttons[id.index()].forced()
    }

    pub fn is_locked(&self, id: ButtonId) -> bool {
        self.buttons[id.index()].locked()
    }

    /// Combined authoritative button bitmap (bit 0 = left .. bit 4 = side2).
    pub fn button_bitmap(&self) -> u8 {
        let mut bitmap = 0;
        for id in ButtonId::ALL {
            if self.buttons[id.index()].pressed() {
                bitmap |= id.bit();
            }
        }
        bitmap
    }

    // Dispatch

    fn dispatch(&mut self, line: &Line, now: u64) {
        if !line.is_command() {
            // Garbage lines disappear without a trace: no echo, no reply.
            return;
        }

        // Echo the line exactly as received, original terminator included,
        // before any parsing.
        self.tx.push_slice(line.content());
        self.tx.push_slice(line.terminator().as_bytes());

        let Some(cmd) = Command::parse(line.content()) else {
            // Recognized prefix but malformed command: the echo already went
            // out and nothing else follows. Wire-compatible, if unfriendly.
            return;
        };
        self.apply(cmd, now);
    }

    fn apply(&mut self, cmd: Command, now: u64) {
        match cmd {
            Command::ButtonForce { button, pressed } => {
                if pressed {
                    self.buttons[button.index()].force_press();
                } else {
                    self.buttons[button.index()].force_release(now, &mut self.rng);
                }
                self.tx.push_slice(b"1\r\n>>> ");
            }
            Command::Click { button } => {
                self.buttons[button.index()].start_click(now, &mut self.rng);
                self.reply_prompt();
            }
            Command::Move { dx, dy } => {
                self.motion.add(dx as i16, dy as i16, self.axis_locks);
                self.reply_prompt();
            }
            Command::Wheel { delta } => {
                self.wheel.add(delta);
                self.reply_prompt();
            }
            Command::AxisLock { axis, state } => {
                let lock = match axis {
                    Axis::X => &mut self.axis_locks.x,
                    Axis::Y => &mut self.axis_locks.y,
                };
                match state {
                    Some(v) => {
                        *lock = v;
                        self.reply_prompt();
                    }
                    None => {
                        let v = *lock;
                        self.reply_value(v);
                    }
                }
            }
            Command::ButtonLock { button, state } => match state {
                Some(v) => {
                    self.buttons[button.index()].set_lock(v);
                    self.reply_prompt();
                }
                None => self.reply_value(self.buttons[button.index()].locked()),
            },
            Command::Notify { state } => match state {
                Some(v) => {
                    self.notify_enabled = v;
                    self.reply_prompt();
                }
                None => self.reply_value(self.notify_enabled),
            },
        }
    }

    fn reply_prompt(&mut self) {
        self.tx.push_slice(b">>> ");
    }

    fn reply_value(&mut self, value: bool) {
        self.tx.push(if value { b'1' } else { b'0' });
        self.tx.push_slice(b"\r\n>>> ");
    }

    // Tick internals

    fn advance_buttons(&mut self, now: u64) {
        for id in ButtonId::ALL {
            let physical = self.physical_buttons & id.bit() != 0;
            self.buttons[id.index()].advance(now, physical);
        }
    }

    /// Button-change notification: `km.` followed by the raw bitmap byte.
    /// Bitmap values under 32 produce control characters on the wire; that
    /// is the protocol, not an encoding bug.
    fn emit_notification(&mut self) {
        if !self.notify_enabled {
            return;
        }
        let bitmap = self.button_bitmap();
        if bitmap != self.last_notified {
            self.tx.push_slice(b"km.");
            self.tx.push(bitmap);
            self.tx.push_slice(b"\r\n");
            self.last_notified = bitmap;
        }
    }
}
