//! Property tests for the statement buffer, the classifier and the session

use ias::repl::classify::classify_source;
use ias::repl::{EngineFactory, Prompt, Session, StatementBuffer};
use ias::runtime::{Interpreter, RecordingBoard};
use ias::ShellConfig;
use proptest::prelude::*;

fn session() -> Session<Interpreter> {
    let factory: EngineFactory<Interpreter> =
        Box::new(|| Interpreter::new(Box::new(RecordingBoard::new())));
    let config = ShellConfig {
        banner: false,
        ..ShellConfig::default()
    };
    Session::new(config, factory).unwrap()
}

fn feed(
    session: &mut Session<Interpreter>,
    line: &str,
) -> (Prompt, String) {
    let mut out = Vec::new();
    let prompt = session.handle_line(line, &mut out).unwrap();
    (prompt, String::from_utf8(out).unwrap())
}

/// Lines a user might type, including ones that open or break statements
fn fragment() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just("if true"),
        Just("end"),
        Just("1 +"),
        Just("2"),
        Just("[1,"),
        Just("3]"),
        Just("'abc"),
        Just("'"),
        Just("def helper"),
        Just("class Foo"),
        Just("x = 1"),
        Just("x"),
        Just("puts 'hi'"),
        Just("raise 'e'"),
        Just(")"),
        Just("foo("),
        Just(""),
        Just("quit"),
    ]
}

proptest! {
    #[test]
    fn buffer_holds_lines_joined_by_newlines(lines in prop::collection::vec("[^\n]{0,12}", 1..8)) {
        let mut buffer = StatementBuffer::new();
        for line in &lines {
            buffer.append(line);
        }
        prop_assert_eq!(buffer.as_str(), lines.join("\n"));
        prop_assert_eq!(buffer.line_count(), lines.len());
        buffer.reset();
        prop_assert!(buffer.is_empty());
        prop_assert_eq!(buffer.as_str(), "");
    }

    #[test]
    fn classification_is_deterministic(lines in prop::collection::vec(fragment(), 1..5)) {
        let engine = Interpreter::new(Box::new(RecordingBoard::new())).unwrap();
        let text = lines.join("\n");
        prop_assert_eq!(classify_source(&engine, &text), classify_source(&engine, &text));
    }

    #[test]
    fn prompt_reflects_pending_statement(lines in prop::collection::vec(fragment(), 1..12)) {
        let mut s = session();
        for line in &lines {
            let (prompt, _) = feed(&mut s, line);
            match prompt {
                Prompt::Primary => prop_assert_eq!(s.pending(), ""),
                Prompt::Continuation => prop_assert!(s.pending().ends_with(line)),
            }
        }
    }

    #[test]
    fn balanced_arithmetic_is_ready_on_one_line(a in -1000i64..1000, b in -1000i64..1000) {
        let mut s = session();
        let (prompt, out) = feed(&mut s, &format!("{} + {}", a, b));
        prop_assert_eq!(prompt, Prompt::Primary);
        prop_assert_eq!(out, format!(" => {}\n", a + b));
    }

    #[test]
    fn definitions_persist_between_statements(n in any::<i32>(), name in "[a-z][a-z0-9_]{0,8}") {
        prop_assume!(!matches!(name.as_str(),
            "if" | "do" | "end" | "in" | "or" | "and" | "not" | "def" | "nil" | "for" | "self"
            | "true" | "false" | "case" | "when" | "then" | "else" | "elsif" | "while" | "until"
            | "begin" | "class" | "break" | "next" | "redo" | "retry" | "return" | "super"
            | "yield" | "unless" | "rescue" | "ensure" | "module" | "undef" | "alias" | "defined"
            | "p" | "puts" | "print" | "loop" | "proc" | "lambda" | "raise" | "fail" | "quit" | "exit"));
        let mut s = session();
        feed(&mut s, &format!("{} = {}", name, n));
        let (_, out) = feed(&mut s, &name);
        prop_assert_eq!(out, format!(" => {}\n", n));
    }
}
