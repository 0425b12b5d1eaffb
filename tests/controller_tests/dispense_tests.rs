//! Tests for the dispense completion wait
//!
//! These tests verify:
//! - The wait ends on the exact terminal marker and reads nothing after it
//! - Silence ends the wait with a timeout instead of blocking
//! - Unacknowledged and offline dispenses return without waiting

#[path = "../common/mod.rs"]
mod common;

use std::num::NonZeroU32;
use std::time::{Duration, Instant};

use common::{connected, controller_for, line, Chunk, SimDevice};
use zaf::{ConnectionState, DispenseOutcome};

// =============================================================================
// Helper Functions
// =============================================================================

fn cycles(n: u32) -> NonZeroU32 {
    NonZeroU32::new(n).unwrap()
}

/// A board that answers PING and replays `script` after any DISPENSE
fn dispensing_device(script: Vec<Chunk>) -> SimDevice {
    SimDevice::with_responder(move |cmd| {
        if cmd == "PING" {
            vec![line("PONG")]
        } else if cmd.starts_with("DISPENSE:") {
            script.clone()
        } else {
            vec![line("OK")]
        }
    })
}

// =============================================================================
// Completion Tests
// =============================================================================

#[test]
fn test_dispense_completes_with_stock_firmware() {
    let device = SimDevice::firmware();
    let mut controller = connected(&device);

    let outcome = controller.dispense_food(cycles(2));

    assert_eq!(
        outcome,
        DispenseOutcome::Completed {
            updates: vec!["CYCLE 1/2".to_string(), "CYCLE 2/2".to_string()]
        }
    );
    assert!(device.written().ends_with("DISPENSE:2\n"));
}

#[test]
fn test_dispense_stops_at_terminal_marker() {
    let device = dispensing_device(vec![
        line("DISPENSING..."),
        line("SERVO OPEN"),
        line("SERVO CLOSED"),
        line("DISPENSE_COMPLETE"),
        line("LATE STATUS"),
    ]);
    let mut controller = connected(&device);
    let reads_before = device.reads();

    let outcome = controller.dispense_food(cycles(1));

    assert!(outcome.is_completed());
    assert_eq!(outcome.updates(), ["SERVO OPEN", "SERVO CLOSED"]);
    // One read for the ack, two statuses, one terminal marker
    assert_eq!(device.reads() - reads_before, 4);
    assert_eq!(device.unread(), 1);
}

#[test]
fn test_dispense_terminal_marker_immediately() {
    let device = dispensing_device(vec![line("DISPENSING"), line("DISPENSE_COMPLETE")]);
    let mut controller = connected(&device);

    let outcome = controller.dispense_food(cycles(1));

    assert_eq!(outcome, DispenseOutcome::Completed { updates: vec![] });
}

#[test]
fn test_dispense_marker_must_match_exactly() {
    let device = dispensing_device(vec![
        line("DISPENSING..."),
        line("DISPENSE_COMPLETE?"),
        line("DISPENSE_COMPLETE"),
    ]);
    let mut controller = connected(&device);

    let outcome = controller.dispense_food(cycles(1));

    assert!(outcome.is_completed());
    assert_eq!(outcome.updates(), ["DISPENSE_COMPLETE?"]);
}

#[test]
fn test_dispense_has_no_line_cap() {
    let mut script = vec![line("DISPENSING...")];
    for i in 0..500 {
        script.push(line(&format!("TICK {}", i)));
    }
    script.push(line("DISPENSE_COMPLETE"));
    let device = dispensing_device(script);
    let mut controller = connected(&device);

    let outcome = controller.dispense_food(cycles(50));

    assert!(outcome.is_completed());
    assert_eq!(outcome.updates().len(), 500);
}

#[test]
fn test_dispense_handles_crlf_and_split_lines() {
    let device = dispensing_device(vec![
        Chunk::Data(b"DISPENSING...\r\n".to_vec()),
        Chunk::Data(b"DISPENSE_".to_vec()),
        Chunk::Data(b"COMPLETE\r\n".to_vec()),
    ]);
    let mut controller = connected(&device);

    assert!(controller.dispense_food(cycles(1)).is_completed());
}

// =============================================================================
// Timeout Tests
// =============================================================================

#[test]
fn test_dispense_times_out_when_device_goes_silent() {
    let device = dispensing_device(vec![line("DISPENSING..."), line("SERVO OPEN")]);
    let mut controller = connected(&device);

    let start = Instant::now();
    let outcome = controller.dispense_food(cycles(1));

    assert_eq!(
        outcome,
        DispenseOutcome::TimedOut {
            updates: vec!["SERVO OPEN".to_string()]
        }
    );
    assert!(start.elapsed() < Duration::from_secs(5));
    assert_eq!(controller.state(), ConnectionState::Verified);
}

#[test]
fn test_dispense_silence_mid_sequence_ends_wait() {
    let device = dispensing_device(vec![
        line("DISPENSING..."),
        Chunk::Silence,
        line("DISPENSE_COMPLETE"),
    ]);
    let mut controller = connected(&device);

    let outcome = controller.dispense_food(cycles(1));

    assert!(matches!(outcome, DispenseOutcome::TimedOut { .. }));
    assert_eq!(device.unread(), 1);
}

#[test]
fn test_dispense_blank_line_ends_wait() {
    let device = dispensing_device(vec![
        line("DISPENSING..."),
        line(""),
        line("DISPENSE_COMPLETE"),
    ]);
    let mut controller = connected(&device);

    let outcome = controller.dispense_food(cycles(1));

    assert_eq!(outcome, DispenseOutcome::TimedOut { updates: vec![] });
}

#[test]
fn test_dispense_skips_unreadable_status() {
    let device = dispensing_device(vec![
        line("DISPENSING..."),
        Chunk::Data(vec![0xFF, b'\n']),
        line("DISPENSE_COMPLETE"),
    ]);
    let mut controller = connected(&device);

    let outcome = controller.dispense_food(cycles(1));

    assert_eq!(outcome, DispenseOutcome::Completed { updates: vec![] });
}

// =============================================================================
// Not Acknowledged / Offline Tests
// =============================================================================

#[test]
fn test_dispense_ack_marker_anywhere_in_line() {
    let device = dispensing_device(vec![line("OK: DISPENSING 2"), line("DISPENSE_COMPLETE")]);
    let mut controller = connected(&device);

    assert!(controller.dispense_food(cycles(2)).is_completed());
}

#[test]
fn test_dispense_complete_is_not_an_ack() {
    let device = dispensing_device(vec![line("DISPENSE_COMPLETE")]);
    let mut controller = connected(&device);

    assert_eq!(
        controller.dispense_food(cycles(1)),
        DispenseOutcome::NotAcknowledged {
            response: "DISPENSE_COMPLETE".to_string()
        }
    );
}

#[test]
fn test_dispense_not_acknowledged() {
    let device = dispensing_device(vec![line("ERR:JAMMED"), line("DISPENSE_COMPLETE")]);
    let mut controller = connected(&device);

    let outcome = controller.dispense_food(cycles(1));

    assert_eq!(
        outcome,
        DispenseOutcome::NotAcknowledged {
            response: "ERR:JAMMED".to_string()
        }
    );
    assert_eq!(device.unread(), 1);
}

#[test]
fn test_dispense_no_reply_is_not_acknowledged() {
    let device = dispensing_device(vec![]);
    let mut controller = connected(&device);

    let outcome = controller.dispense_food(cycles(1));

    assert_eq!(
        outcome,
        DispenseOutcome::NotAcknowledged {
            response: String::new()
        }
    );
}

#[test]
fn test_dispense_while_disconnected() {
    let device = SimDevice::firmware();
    let mut controller = controller_for(&device);

    let outcome = controller.dispense_food(cycles(1));

    assert!(matches!(outcome, DispenseOutcome::Offline { .. }));
    assert_eq!(device.written(), "");
}

#[test]
fn test_dispense_write_failure_is_offline() {
    let device = SimDevice::firmware();
    let mut controller = connected(&device);
    device.set_fail_writes(true);

    let outcome = controller.dispense_food(cycles(1));

    assert!(matches!(outcome, DispenseOutcome::Offline { .. }));
    assert_eq!(controller.state(), ConnectionState::Disconnected);
}

#[test]
fn test_dispense_unplugged_mid_wait_is_offline() {
    let device = dispensing_device(vec![line("DISPENSING..."), line("SERVO OPEN"), Chunk::Unplug]);
    let mut controller = connected(&device);

    let outcome = controller.dispense_food(cycles(1));

    assert!(matches!(outcome, DispenseOutcome::Offline { .. }));
    assert!(!controller.is_connected());
    assert_eq!(controller.send_command(&zaf::protocol::Command::Ping), "");
}
