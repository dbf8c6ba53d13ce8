//! Unit tests for the injection engine state machines.
//!
//! These tests run on the host and drive the engine with synthetic byte
//! streams and a simulated millisecond clock.

use super::button::{ButtonId, ButtonState};
use super::rng::JitterRng;
use super::Engine;

/// Jitter source that always returns the same raw value, so every
/// `next_range(lo, hi)` draw lands on `lo + FIXED % (hi - lo)`.
struct FixedRng(u32);

impl JitterRng for FixedRng {
    fn next_u32(&mut self) -> u32 {
        self.0
    }
}

/// Engine with zero jitter: clicks press for exactly 75 ms and release
/// authority lasts exactly 125 ms.
fn deterministic_engine() -> Engine<FixedRng> {
    Engine::with_rng(FixedRng(0))
}

fn drain_string<R: JitterRng>(engine: &mut Engine<R>) -> String {
    let mut buf = [0u8; 512];
    let n = engine.drain_tx(&mut buf);
    buf[..n].iter().map(|&b| b as char).collect()
}

fn run_line<R: JitterRng>(engine: &mut Engine<R>, line: &str, now: u64) {
    engine.feed(line.as_bytes());
    engine.process(now);
}

// ════════════════════════════════════════════════════════════════════════
// Button state machine
// ════════════════════════════════════════════════════════════════════════

#[test]
fn passive_mirror_follows_physical() {
    let mut b = ButtonState::new();
    b.advance(0, true);
    assert!(b.pressed());
    b.advance(1, false);
    assert!(!b.pressed());
}

#[test]
fn lock_freezes_passive_mirror() {
    let mut b = ButtonState::new();
    b.set_lock(true);
    b.advance(0, true);
    assert!(!b.pressed());
    b.mirror_physical(true);
    assert!(!b.pressed());
}

#[test]
fn force_press_overrides_physical_zero() {
    let mut b = ButtonState::new();
    b.force_press();
    assert!(b.pressed());
    assert!(b.forced());
    b.advance(0, false);
    assert!(b.pressed()); // forced-and-pressed: no change per tick
    b.mirror_physical(false);
    assert!(b.pressed()); // immediate mirror gated by forced too
}

#[test]
fn force_release_requires_forced_and_pressed() {
    let mut rng = FixedRng(0);
    let mut b = ButtonState::new();

    // Not forced: no-op.
    b.advance(0, true);
    b.force_release(0, &mut rng);
    assert!(b.pressed());
    assert!(!b.forced());

    // Forced path: releases immediately, keeps authority for the window.
    b.force_press();
    b.force_release(10, &mut rng);
    assert!(!b.pressed());
    assert!(b.forced());
}

#[test]
fn timed_release_ends_after_latency_window() {
    let mut rng = FixedRng(0); // window is exactly 125 ms
    let mut b = ButtonState::new();
    b.force_press();
    b.force_release(1000, &mut rng);

    b.advance(1124, true);
    assert!(b.forced()); // physical press held off during the window
    assert!(!b.pressed());

    b.advance(1125, true);
    assert!(!b.forced());
    assert!(b.pressed()); // mirroring resumed
}

#[test]
fn timed_release_freezes_when_locked() {
    let mut rng = FixedRng(0);
    let mut b = ButtonState::new();
    b.set_lock(true);
    b.force_press();
    b.force_release(0, &mut rng);

    b.advance(125, true);
    assert!(!b.forced());
    assert!(!b.pressed()); // frozen until unlocked, physical bit ignored

    b.set_lock(false);
    b.advance(126, true);
    assert!(b.pressed());
}

#[test]
fn click_runs_press_release_end_phases() {
    let mut rng = FixedRng(0); // press 75 ms, tail 125 ms
    let mut b = ButtonState::new();
    b.start_click(0, &mut rng);
    assert!(b.pressed());
    assert!(b.forced());

    b.advance(74, false);
    assert!(b.pressed()); // press phase

    b.advance(75, false);
    assert!(!b.pressed()); // release phase
    assert!(b.forced());

    b.advance(199, false);
    assert!(b.forced()); // still owned until end_at

    b.advance(200, false);
    assert!(!b.forced()); // 75 + 125: back to physical authority
    assert!(!b.pressed());
}

#[test]
fn click_completion_ignores_lock_on_mirror() {
    // Intentional asymmetry with the timed-release path: click completion
    // adopts the physical bit even while locked.
    let mut rng = FixedRng(0);
    let mut b = ButtonState::new();
    b.set_lock(true);
    b.start_click(0, &mut rng);
    b.advance(200, true);
    assert!(!b.forced());
    assert!(b.pressed()); // physical bit adopted despite the lock
}

#[test]
fn force_press_cancels_click() {
    let mut rng = FixedRng(0);
    let mut b = ButtonState::new();
    b.start_click(0, &mut rng);
    b.force_press();
    b.advance(1000, false);
    assert!(b.pressed()); // click timers gone; still force-pressed
}

#[test]
fn click_restarts_cleanly_over_pending_release() {
    let mut rng = FixedRng(0);
    let mut b = ButtonState::new();
    b.force_press();
    b.force_release(0, &mut rng);
    b.start_click(10, &mut rng);
    assert!(b.pressed());
    // The pending release deadline must not fire mid-click.
    b.advance(85, false);
    assert!(!b.pressed()); // click release phase, still forced
    assert!(b.forced());
}

// ════════════════════════════════════════════════════════════════════════
// Dispatch and response protocol
// ════════════════════════════════════════════════════════════════════════

#[test]
fn button_command_echo_and_result() {
    let mut e = deterministic_engine();
    run_line(&mut e, "km.left(1)\r\n", 0);
    assert_eq!(drain_string(&mut e), "km.left(1)\r\n1\r\n>>> ");
    assert!(e.is_pressed(ButtonId::Left));
}

#[test]
fn mutating_command_gets_bare_prompt() {
    let mut e = deterministic_engine();
    run_line(&mut e, "km.move(3,4)\n", 0);
    assert_eq!(drain_string(&mut e), "km.move(3,4)\n>>> ");
}

#[test]
fn echo_preserves_original_terminator() {
    let mut e = deterministic_engine();
    run_line(&mut e, "km.wheel(1)\r", 0);
    // Engine holds the lone CR until the next byte arrives.
    assert_eq!(drain_string(&mut e), "");
    run_line(&mut e, "x", 0);
    assert_eq!(drain_string(&mut e), "km.wheel(1)\r>>> ");
}

#[test]
fn query_prints_value_then_prompt() {
    let mut e = deterministic_engine();
    run_line(&mut e, "km.lock_mx()\r\n", 0);
    assert_eq!(drain_string(&mut e), "km.lock_mx()\r\n0\r\n>>> ");

    run_line(&mut e, "km.lock_mx(1)\r\n", 0);
    drain_string(&mut e);
    run_line(&mut e, "km.lock_mx()\r\n", 0);
    assert_eq!(drain_string(&mut e), "km.lock_mx()\r\n1\r\n>>> ");
}

#[test]
fn query_is_idempotent() {
    let mut e = deterministic_engine();
    run_line(&mut e, "km.lock_my()\r\n", 0);
    let first = drain_string(&mut e);
    run_line(&mut e, "km.lock_my()\r\n", 0);
    let second = drain_string(&mut e);
    assert_eq!(first, second);
}

#[test]
fn malformed_command_is_echoed_but_silent() {
    let mut e = deterministic_engine();
    run_line(&mut e, "km.left(5)\r\n", 0);
    assert_eq!(drain_string(&mut e), "km.left(5)\r\n");
    assert!(!e.is_pressed(ButtonId::Left));

    run_line(&mut e, "km.click(9)\r\n", 0);
    assert_eq!(drain_string(&mut e), "km.click(9)\r\n");

    run_line(&mut e, "km.move(1\r\n", 0);
    assert_eq!(drain_string(&mut e), "km.move(1\r\n");
}

#[test]
fn non_command_line_vanishes() {
    let mut e = deterministic_engine();
    run_line(&mut e, "AT+RST\r\nhello\n", 0);
    assert_eq!(drain_string(&mut e), "");
}

#[test]
fn commands_apply_in_arrival_order() {
    let mut e = deterministic_engine();
    run_line(&mut e, "km.left(1)\nkm.left(0)\n", 0);
    // The release arrived last, so the button ends the tick released.
    assert!(!e.is_pressed(ButtonId::Left));
    assert!(e.is_forced(ButtonId::Left));
}

// ════════════════════════════════════════════════════════════════════════
// Locks, movement, notifications
// ════════════════════════════════════════════════════════════════════════

#[test]
fn button_lock_gates_physical_not_commands() {
    let mut e = deterministic_engine();
    run_line(&mut e, "km.lock_ml(1)\r\n", 0);
    e.observe_physical(ButtonId::Left.bit(), 0, 0, 0);
    e.process(1);
    assert!(!e.is_pressed(ButtonId::Left));

    run_line(&mut e, "km.click(0)\r\n", 1);
    assert!(e.is_pressed(ButtonId::Left)); // click ignores the lock
}

#[test]
fn axis_lock_drops_both_input_sources() {
    let mut e = deterministic_engine();
    run_line(&mut e, "km.lock_mx(1)\r\n", 0);
    e.observe_physical(0, 50, 9, 0);
    run_line(&mut e, "km.move(25,1)\r\n", 0);
    let report = e.assemble_report();
    assert_eq!(report.x, 0);
    assert_eq!(report.y, 10);
}

#[test]
fn physical_and_command_movement_share_accumulator() {
    let mut e = deterministic_engine();
    e.observe_physical(0, 100, 0, 0);
    run_line(&mut e, "km.move(100,0)\r\n", 0);
    let first = e.assemble_report();
    let second = e.assemble_report();
    assert_eq!(first.x, 127);
    assert_eq!(second.x, 73);
}

#[test]
fn notification_fires_once_per_bitmap_change() {
    let mut e = deterministic_engine();
    run_line(&mut e, "km.buttons(1)\r\n", 0);
    drain_string(&mut e);

    e.observe_physical(ButtonId::Left.bit(), 0, 0, 0);
    e.process(1);
    let mut buf = [0u8; 16];
    let n = e.drain_tx(&mut buf);
    assert_eq!(&buf[..n], b"km.\x01\r\n");

    // Same bitmap, no repeat.
    e.process(2);
    assert_eq!(e.tx_len(), 0);

    e.observe_physical(0, 0, 0, 0);
    e.process(3);
    let n = e.drain_tx(&mut buf);
    assert_eq!(&buf[..n], b"km.\x00\r\n");
}

#[test]
fn notification_disabled_by_default() {
    let mut e = deterministic_engine();
    e.observe_physical(ButtonId::Right.bit(), 0, 0, 0);
    e.process(1);
    assert_eq!(e.tx_len(), 0);
}

#[test]
fn buttons_query_reflects_enable_state() {
    let mut e = deterministic_engine();
    run_line(&mut e, "km.buttons()\r\n", 0);
    assert_eq!(drain_string(&mut e), "km.buttons()\r\n0\r\n>>> ");
    run_line(&mut e, "km.buttons(1)\r\n", 0);
    drain_string(&mut e);
    run_line(&mut e, "km.buttons()\r\n", 0);
    assert_eq!(drain_string(&mut e), "km.buttons()\r\n1\r\n>>> ");
}

#[test]
fn report_merges_forced_and_physical_buttons() {
    let mut e = deterministic_engine();
    e.observe_physical(ButtonId::Right.bit(), 0, 0, 0);
    run_line(&mut e, "km.left(1)\r\n", 0);
    let report = e.assemble_report();
    assert_eq!(report.buttons, ButtonId::Left.bit() | ButtonId::Right.bit());
    assert_eq!(report.pan, 0);
}

#[test]
fn bulk_and_incremental_processing_agree() {
    let input = b"km.left(1)\r\nkm.move(10,-3)\nnoise\r\nkm.wheel(5)\r\n";

    let mut inc = deterministic_engine();
    inc.feed(input);
    inc.process(0);

    let mut bulk = deterministic_engine();
    bulk.feed(input);
    bulk.process_bulk(0);

    assert_eq!(drain_string(&mut inc), drain_string(&mut bulk));
    assert_eq!(inc.assemble_report(), bulk.assemble_report());
}
