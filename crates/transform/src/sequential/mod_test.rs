//! Tests for the sequential modifier

use super::*;
use syslane_protocol::{Facility, Severity};

fn modifier(first: u64, last: u64, use_padding: bool) -> SequentialModifier {
    SequentialModifier::new(SequentialConfig {
        first,
        last,
        use_padding,
        pad_char: '0',
    })
}

fn apply(modifier: &SequentialModifier) -> String {
    let message = SyslogMessage::new(Facility::User, Severity::Info, "msg");
    modifier.modify(message).unwrap().body().to_string()
}

#[test]
fn test_wraps_to_first_after_last() {
    let seq = modifier(500, 1000, false);
    assert!(seq.set_next(999));

    assert_eq!(apply(&seq), "msg #999");
    assert_eq!(apply(&seq), "msg #1000");
    assert_eq!(apply(&seq), "msg #500");
}

#[test]
fn test_pads_to_width_of_last() {
    let seq = modifier(5, 1000, true);
    assert_eq!(apply(&seq), "msg #0005");
    assert!(seq.set_next(1000));
    assert_eq!(apply(&seq), "msg #1000");
}

#[test]
fn test_custom_pad_char() {
    let seq = SequentialModifier::new(SequentialConfig {
        first: 1,
        last: 99,
        use_padding: true,
        pad_char: 'x',
    });
    assert_eq!(apply(&seq), "msg #x1");
}

#[test]
fn test_bound_updates_that_break_order_are_ignored() {
    let seq = modifier(500, 1000, false);

    assert!(!seq.set_first(1001));
    assert_eq!(seq.bounds(), (500, 1000));

    assert!(!seq.set_last(499));
    assert_eq!(seq.bounds(), (500, 1000));
}

#[test]
fn test_shrinking_last_resets_counter() {
    let seq = modifier(0, 100, false);
    assert!(seq.set_next(90));
    assert!(seq.set_last(50));
    assert_eq!(seq.peek(), 0);
}

#[test]
fn test_raising_first_moves_counter() {
    let seq = modifier(0, 100, false);
    assert!(seq.set_first(10));
    assert_eq!(seq.peek(), 10);
}

#[test]
fn test_set_next_outside_bounds_ignored() {
    let seq = modifier(10, 20, false);
    assert!(!seq.set_next(21));
    assert!(!seq.set_next(9));
    assert_eq!(seq.peek(), 10);
}

#[test]
fn test_single_value_range() {
    let seq = modifier(7, 7, false);
    assert_eq!(apply(&seq), "msg #7");
    assert_eq!(apply(&seq), "msg #7");
}

#[test]
fn test_strip_removes_counter() {
    let seq = modifier(1, 100, true);
    let numbered = seq
        .modify(SyslogMessage::new(Facility::User, Severity::Info, "a #b"))
        .unwrap();
    assert_eq!(numbered.body(), "a #b #001");
    assert_eq!(seq.strip(&numbered).unwrap().body(), "a #b");

    let plain = SyslogMessage::new(Facility::User, Severity::Info, "no counter");
    assert!(seq.strip(&plain).is_none());
}
