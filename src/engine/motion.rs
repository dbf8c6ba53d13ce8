//! Movement and wheel accumulation.
//!
//! Physical deltas and `km.move` commands land in the same accumulators;
//! once a delta is accumulated its source is gone. The X/Y accumulators are
//! wider than the i8 report fields: draining clamps to the report range and
//! carries the remainder to the next tick, so large moves smear across
//! reports without losing counts. The wheel is clamped at write time
//! instead and drains to zero.

/// Per-axis gates for movement accumulation. A locked axis discards both
/// physical and command-issued deltas.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AxisLocks {
    pub x: bool,
    pub y: bool,
}

/// Signed 16-bit X/Y accumulators. Accumulation wraps (no saturation);
/// only the drain step clamps.
#[derive(Debug, Default)]
pub struct MotionAccumulator {
    x: i16,
    y: i16,
}

impl MotionAccumulator {
    pub const fn new() -> Self {
        Self { x: 0, y: 0 }
    }

    pub fn add(&mut self, dx: i16, dy: i16, locks: AxisLocks) {
        if !locks.x {
            self.x = self.x.wrapping_add(dx);
        }
        if !locks.y {
            self.y = self.y.wrapping_add(dy);
        }
    }

    pub fn drain_x(&mut self) -> i8 {
        Self::drain(&mut self.x)
    }

    pub fn drain_y(&mut self) -> i8 {
        Self::drain(&mut self.y)
    }

    /// Emit up to one report's worth of movement, keeping the clamped-off
    /// remainder for the next report.
    fn drain(acc: &mut i16) -> i8 {
        if *acc > i8::MAX as i16 {
            *acc -= i8::MAX as i16;
            i8::MAX
        } else if *acc < i8::MIN as i16 {
            *acc -= i8::MIN as i16;
            i8::MIN
        } else {
            let v = *acc as i8;
            *acc = 0;
            v
        }
    }
}

/// Wheel accumulator, clamped to the report range at write time. By
/// construction it cannot overflow, so draining simply zeroes it.
#[derive(Debug, Default)]
pub struct WheelAccumulator {
    value: i8,
}

impl WheelAccumulator {
    pub const fn new() -> Self {
        Self { value: 0 }
    }

    pub fn add(&mut self, delta: i32) {
        let sum = (self.value as i32).saturating_add(delta);
        self.value = sum.clamp(i8::MIN as i32, i8::MAX as i32) as i8;
    }

    pub fn drain(&mut self) -> i8 {
        let v = self.value;
        self.value = 0;
        v
    }
}
