//! Per-button state machine.
//!
//! Three authorities compete for each button: the physical device (mirrored
//! bit), forced commands (`km.left(1)` and friends), and the per-button lock.
//! Commands always win; the lock only suppresses physical mirroring, never a
//! forced or click command.

use crate::config::{CLICK_PRESS_MAX_MS, CLICK_PRESS_MIN_MS, RELEASE_MAX_MS, RELEASE_MIN_MS};
use crate::engine::rng::JitterRng;

/// Mouse button identifiers, in HID report bit order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ButtonId {
    Left = 0,
    Right = 1,
    Middle = 2,
    Side1 = 3,
    Side2 = 4,
}

impl ButtonId {
    pub const COUNT: usize = 5;

    pub const ALL: [ButtonId; Self::COUNT] = [
        ButtonId::Left,
        ButtonId::Right,
        ButtonId::Middle,
        ButtonId::Side1,
        ButtonId::Side2,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Bit position in the combined button bitmap.
    pub fn bit(self) -> u8 {
        1 << (self as u8)
    }

    /// Numeric index as used by `km.click(n)`.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Full protocol name, as used by `km.left(1)` etc.
    pub fn from_name(name: &[u8]) -> Option<Self> {
        match name {
            b"left" => Some(ButtonId::Left),
            b"right" => Some(ButtonId::Right),
            b"middle" => Some(ButtonId::Middle),
            b"side1" => Some(ButtonId::Side1),
            b"side2" => Some(ButtonId::Side2),
            _ => None,
        }
    }

    /// Short name, as used by the `km.lock_*` commands.
    pub fn from_short_name(name: &[u8]) -> Option<Self> {
        match name {
            b"ml" => Some(ButtonId::Left),
            b"mr" => Some(ButtonId::Right),
            b"mm" => Some(ButtonId::Middle),
            b"ms1" => Some(ButtonId::Side1),
            b"ms2" => Some(ButtonId::Side2),
            _ => None,
        }
    }
}

/// Timed click sequence: press now, release at `release_at`, return to
/// normal authority at `end_at`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
struct Click {
    release_at: u64,
    end_at: u64,
}

/// State of one button.
///
/// Invariants: an active click implies `forced`; a click and a pending timed
/// release are never active at the same time.
#[derive(Clone, Copy, Debug, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ButtonState {
    pressed: bool,
    forced: bool,
    locked: bool,
    release_deadline: Option<u64>,
    click: Option<Click>,
}

impl ButtonState {
    pub const fn new() -> Self {
        Self {
            pressed: false,
            forced: false,
            locked: false,
            release_deadline: None,
            click: None,
        }
    }

    /// Authoritative pressed state, as it will appear in the next report.
    pub fn pressed(&self) -> bool {
        self.pressed
    }

    /// True while a command owns the state instead of physical input.
    pub fn forced(&self) -> bool {
        self.forced
    }

    pub fn locked(&self) -> bool {
        self.locked
    }

    pub fn set_lock(&mut self, locked: bool) {
        self.locked = locked;
    }

    /// `km.<name>(1)`: command takes ownership, pressed immediately.
    /// Cancels any pending release or in-progress click.
    pub fn force_press(&mut self) {
        self.pressed = true;
        self.forced = true;
        self.release_deadline = None;
        self.click = None;
    }

    /// `km.<name>(0)`: releases a command-pressed button and holds command
    /// authority for a randomized latency window before physical mirroring
    /// resumes. No effect unless the button is currently forced and pressed.
    pub fn force_release<R: JitterRng>(&mut self, now: u64, rng: &mut R) {
        if self.forced && self.pressed {
            self.pressed = false;
            self.click = None;
            self.release_deadline =
                Some(now + rng.next_range(RELEASE_MIN_MS, RELEASE_MAX_MS) as u64);
        }
    }

    /// `km.click(n)`: unconditionally starts a press-then-release sequence
    /// with randomized phase durations. Ignores the lock by design.
    pub fn start_click<R: JitterRng>(&mut self, now: u64, rng: &mut R) {
        let release_at = now + rng.next_range(CLICK_PRESS_MIN_MS, CLICK_PRESS_MAX_MS) as u64;
        let end_at = release_at + rng.next_range(RELEASE_MIN_MS, RELEASE_MAX_MS) as u64;
        self.pressed = true;
        self.forced = true;
        self.release_deadline = None;
        self.click = Some(Click { release_at, end_at });
    }

    /// Immediate mirror on a physical input event. Same gate as the per-tick
    /// mirror: only when neither forced nor locked.
    pub fn mirror_physical(&mut self, physical: bool) {
        if !self.forced && !self.locked {
            self.pressed = physical;
        }
    }

    /// Advance timers one tick. Transitions are evaluated in fixed priority
    /// order: click phases, then pending timed release, then passive mirror.
    pub fn advance(&mut self, now: u64, physical: bool) {
        if let Some(click) = self.click {
            if now >= click.end_at {
                self.click = None;
                self.forced = false;
                // Click completion mirrors the physical bit even when
                // locked; the timed-release path below does not. Existing
                // protocol clients depend on the current behavior.
                self.pressed = physical;
            } else if now >= click.release_at {
                self.pressed = false;
            }
            return;
        }

        if self.forced && !self.pressed {
            if let Some(deadline) = self.release_deadline {
                if now >= deadline {
                    self.forced = false;
                    self.release_deadline = None;
                    if !self.locked {
                        self.pressed = physical;
                    }
                }
                return;
            }
        }

        if !self.forced && !self.locked {
            self.pressed = physical;
        }
    }
}
