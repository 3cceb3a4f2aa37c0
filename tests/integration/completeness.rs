//! Statement completeness through the shell's engine interface

use ias::repl::classify::{classify_source, Classification};
use ias::repl::{ReplBackend, RunOutcome};
use ias::runtime::{Interpreter, RecordingBoard};

fn engine() -> Interpreter {
    Interpreter::new(Box::new(RecordingBoard::new())).unwrap()
}

/// Feed `lines` one at a time and record the verdict after each.
fn verdicts(lines: &[&str]) -> Vec<Classification> {
    let engine = engine();
    let mut text = String::new();
    let mut out = Vec::new();
    for (i, line) in lines.iter().enumerate() {
        if i > 0 {
            text.push('\n');
        }
        text.push_str(line);
        out.push(classify_source(&engine, &text));
    }
    out
}

fn open_then_ready(lines: &[&str]) {
    let got = verdicts(lines);
    let (last, open) = got.split_last().unwrap();
    assert!(
        open.iter().all(|v| *v == Classification::NeedsMore),
        "{:?} -> {:?}",
        lines,
        got
    );
    assert_eq!(*last, Classification::Ready, "{:?}", lines);
}

#[test]
fn test_multi_line_constructs() {
    open_then_ready(&["if true", "end"]);
    open_then_ready(&["def greet(name)", "  \"hi #{name}\"", "end"]);
    open_then_ready(&["class Point", "  attr_reader :x", "end"]);
    open_then_ready(&["[1, 2, 3].each do |v|", "  p v", "end"]);
    open_then_ready(&["total = 1 +", "  2 +", "  3"]);
    open_then_ready(&["s = \"first", "second\""]);
    open_then_ready(&["text = <<~EOS", "  line one", "  line two", "EOS"]);
    open_then_ready(&["h = {", "  a: 1,", "  b: 2", "}"]);
    open_then_ready(&["begin", "  raise 'x'", "rescue => e", "  e.message", "end"]);
    open_then_ready(&["case 3", "when 1..5 then :low", "else :high", "end"]);
    open_then_ready(&["foo = [1,", "", "2]"]);
}

#[test]
fn test_heredoc_stays_open_until_terminator() {
    let got = verdicts(&["x = <<EOS", "EOS is not alone here", "EOS"]);
    assert_eq!(
        got,
        vec![Classification::NeedsMore, Classification::NeedsMore, Classification::Ready]
    );
}

#[test]
fn test_errors_are_not_continuations() {
    for source in ["end", "def", "class /x/", "def m(/x/)", "1 = 2", "foo(1))"] {
        let got = classify_source(&engine(), source);
        assert!(matches!(got, Classification::SyntaxError(_)), "{:?} -> {:?}", source, got);
    }
}

#[test]
fn test_locals_from_earlier_statements_change_the_verdict() {
    let mut engine = engine();
    assert_eq!(classify_source(&engine, "n /2"), Classification::NeedsMore);
    let mut out = Vec::new();
    assert!(matches!(engine.compile_and_run("n = 8", &mut out), RunOutcome::Returned(_)));
    assert_eq!(classify_source(&engine, "n /2"), Classification::Ready);
}

#[test]
fn test_classification_does_not_run_code() {
    let engine = engine();
    classify_source(&engine, "side = 1");
    assert!(engine.local("side").is_none());
    let snapshot = engine.parse("side = 1");
    assert!(!snapshot.has_errors());
}
