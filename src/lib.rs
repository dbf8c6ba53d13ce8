//! km2usb - serial input injector.
//!
//! The host PC sees one ordinary USB HID mouse. Behind it, two input
//! sources compete: a real mouse observed by the USB host port, and a
//! serial automation channel speaking the textual `km.<name>(<args>)`
//! protocol. This library is the injection and merging engine: it frames
//! and parses the serial byte stream, runs the per-button state machines
//! with humanized timing, merges command state with physical input, and
//! assembles one authoritative mouse report per polling tick.
//!
//! Everything here is pure logic over bytes and a millisecond clock, so it
//! builds and tests on the host: `cargo test`.
//!
//! The embedded binary (`src/main.rs`, feature `embedded`) wires the engine
//! to the RP2040 UART and the Embassy USB stack.

#![cfg_attr(not(test), no_std)]

pub mod command;
pub mod config;
pub mod engine;
pub mod framer;
pub mod report;
pub mod ring;

pub use command::{Axis, Command};
pub use engine::button::ButtonId;
pub use engine::rng::{JitterRng, Lcg};
pub use engine::Engine;
pub use report::MouseReport;
