//! Span unit tests

use crate::util::span::{Position, Span};

#[test]
fn test_position_display() {
    let pos = Position::new(10, 20);
    assert_eq!(format!("{}", pos), "10:20");
}

#[test]
fn test_dummy_span() {
    let span = Span::dummy();
    assert!(span.is_dummy());
    assert!(span.is_empty());
}

#[test]
fn test_span_len_and_join() {
    let a = Span::new(Position::with_offset(1, 1, 0), Position::with_offset(1, 4, 3));
    let b = Span::new(Position::with_offset(2, 1, 6), Position::with_offset(2, 3, 8));
    assert_eq!(a.len(), 3);
    let joined = a.to(b);
    assert_eq!(joined.start, a.start);
    assert_eq!(joined.end, b.end);
    assert_eq!(joined.len(), 8);
    assert_eq!(format!("{}", joined), "[1:1 - 2:3]");
}
