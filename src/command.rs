//! `km.*` command grammar.
//!
//! Commands are single lines of the form `km.<name>(<args>)`:
//!
//! ```text
//! km.left(1)        force-press the left button      (also right/middle/side1/side2)
//! km.click(0)       humanized click by button index
//! km.move(10,-5)    queue relative movement
//! km.wheel(-2)      queue wheel scroll
//! km.lock_mx(1)     lock the X axis; empty args query
//! km.lock_ml()      query the left button lock       (ml/mr/mm/ms1/ms2)
//! km.buttons(1)     enable button-change notifications
//! ```
//!
//! Parsing is deliberately forgiving in the same places the wire protocol
//! is: integers are read atoi-style (leading whitespace, optional sign,
//! stop at the first non-digit, wrap on overflow), and any line that fails
//! to parse is simply not a command - the dispatcher stays silent.

use crate::engine::button::ButtonId;
use crate::framer::COMMAND_PREFIX;

/// Movement axis selector for the `lock_mx` / `lock_my` commands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Axis {
    X,
    Y,
}

/// A parsed actuator intent. `state: None` on the lock/notify forms is the
/// query variant (empty parentheses).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    ButtonForce { button: ButtonId, pressed: bool },
    Click { button: ButtonId },
    Move { dx: i32, dy: i32 },
    Wheel { delta: i32 },
    AxisLock { axis: Axis, state: Option<bool> },
    ButtonLock { button: ButtonId, state: Option<bool> },
    Notify { state: Option<bool> },
}

impl Command {
    /// Parse one line (terminator excluded). Returns `None` for anything
    /// malformed: unknown name, missing parentheses, unparsable or
    /// out-of-range argument.
    pub fn parse(line: &[u8]) -> Option<Command> {
        let rest = line.strip_prefix(COMMAND_PREFIX)?;
        let open = rest.iter().position(|&b| b == b'(')?;
        let name = &rest[..open];
        let after_open = &rest[open + 1..];
        let close = after_open.iter().position(|&b| b == b')')?;
        let args = &after_open[..close];

        if let Some(button) = ButtonId::from_name(name) {
            return Some(Command::ButtonForce {
                button,
                pressed: parse_bit(args)?,
            });
        }

        match name {
            b"click" => {
                let index = parse_int(args)?;
                let button = usize::try_from(index).ok().and_then(ButtonId::from_index)?;
                Some(Command::Click { button })
            }
            b"move" => {
                let (dx, rest) = parse_int_prefix(args)?;
                let rest = rest.strip_prefix(b",")?;
                let dy = parse_int(rest)?;
                Some(Command::Move { dx, dy })
            }
            b"wheel" => Some(Command::Wheel {
                delta: parse_int(args)?,
            }),
            b"buttons" => Some(Command::Notify {
                state: parse_state(args)?,
            }),
            _ => {
                let target = name.strip_prefix(b"lock_")?;
                let state = parse_state(args)?;
                match target {
                    b"mx" => Some(Command::AxisLock {
                        axis: Axis::X,
                        state,
                    }),
                    b"my" => Some(Command::AxisLock {
                        axis: Axis::Y,
                        state,
                    }),
                    _ => Some(Command::ButtonLock {
                        button: ButtonId::from_short_name(target)?,
                        state,
                    }),
                }
            }
        }
    }
}

/// Strict `0`/`1` argument for the button force commands.
fn parse_bit(args: &[u8]) -> Option<bool> {
    match args {
        b"0" => Some(false),
        b"1" => Some(true),
        _ => None,
    }
}

/// Query/set argument: empty means query, otherwise a strict `0`/`1`.
fn parse_state(args: &[u8]) -> Option<Option<bool>> {
    if args.is_empty() {
        Some(None)
    } else {
        parse_bit(args).map(Some)
    }
}

fn parse_int(args: &[u8]) -> Option<i32> {
    parse_int_prefix(args).map(|(v, _)| v)
}

/// atoi-style integer scan: skips leading whitespace, takes an optional
/// sign, consumes digits until the first non-digit. Accumulation wraps on
/// overflow rather than failing; extreme `move` arguments are allowed to
/// wrap all the way into the 16-bit accumulator.
fn parse_int_prefix(args: &[u8]) -> Option<(i32, &[u8])> {
    let mut i = 0;
    while i < args.len() && (args[i] == b' ' || args[i] == b'\t') {
        i += 1;
    }
    let negative = match args.get(i).copied() {
        Some(b'-') => {
            i += 1;
            true
        }
        Some(b'+') => {
            i += 1;
            false
        }
        _ => false,
    };
    let digits_start = i;
    let mut value: i32 = 0;
    while let Some(&d) = args.get(i).filter(|b| b.is_ascii_digit()) {
        value = value.wrapping_mul(10).wrapping_add((d - b'0') as i32);
        i += 1;
    }
    if i == digits_start {
        return None;
    }
    if negative {
        value = value.wrapping_neg();
    }
    Some((value, &args[i..]))
}
