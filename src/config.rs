//! Application-wide constants and compile-time configuration.
//!
//! All buffer capacities, timing parameters, and protocol constants
//! live here so they can be tuned in one place.

// Serial ingestion

/// Capacity of the serial RX ring buffer (bytes). Must be a power of two.
/// On overflow the oldest unread byte is dropped; losing stale automation
/// bytes is preferable to stalling the UART interrupt.
pub const RX_BUFFER_CAPACITY: usize = 512;

/// Capacity of the serial TX ring buffer (bytes). Must be a power of two.
/// Holds command echoes, prompts, and button-change notifications until the
/// transport drains them.
pub const TX_BUFFER_CAPACITY: usize = 1024;

/// Maximum length of a single command line, excluding the terminator.
/// Longer in-progress lines are silently discarded.
pub const LINE_CAPACITY: usize = 64;

/// Serial baud rate.
pub const UART_BAUD: u32 = 115_200;

// Humanized command timing
//
// Jitter windows are half-open: a duration is drawn from [MIN, MAX).

/// Click press-phase duration window (ms): time between the synthetic
/// press and the synthetic release of a `km.click(n)` sequence.
pub const CLICK_PRESS_MIN_MS: u32 = 75;
pub const CLICK_PRESS_MAX_MS: u32 = 125;

/// Forced-release hold-off window (ms): how long a released button stays
/// under command authority before physical mirroring resumes. Also the
/// tail phase of a click sequence.
pub const RELEASE_MIN_MS: u32 = 125;
pub const RELEASE_MAX_MS: u32 = 175;

/// Fixed seed for the timing-jitter PRNG. A fixed seed keeps protocol
/// timing reproducible run-to-run, which test harnesses rely on.
pub const JITTER_SEED: u32 = 1;

// USB

/// USB VID/PID - use the "pid.codes" open-source test VID.
/// Replace with your own allocated VID/PID for production.
pub const USB_VID: u16 = 0x1209;
pub const USB_PID: u16 = 0x0002;

/// USB device strings.
pub const USB_MANUFACTURER: &str = "km2usb";
pub const USB_PRODUCT: &str = "Serial Input Injector";
pub const USB_SERIAL_NUMBER: &str = "000001";

/// USB HID polling interval (ms). 1 ms = 1000 Hz; one report per poll.
pub const USB_HID_POLL_MS: u8 = 1;
