//! Evaluation of a complete statement

use super::backend_trait::{ReplBackend, RunOutcome};
use std::io::{self, Write};
use tracing::debug;

/// What the evaluator printed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Evaluation {
    /// The inspected result, printed after the result prefix
    Value(String),
    /// The inspected exception, printed on its own
    Exception(String),
}

/// Run `source` and print its result or exception to `console`.
///
/// Compile failures arrive as exceptions and are printed the same way.
/// The engine stays usable after an exception.
pub fn evaluate<B: ReplBackend>(
    backend: &mut B,
    source: &str,
    console: &mut dyn Write,
    result_prefix: &str,
) -> io::Result<Evaluation> {
    debug!(len = source.len(), "evaluating statement");
    let evaluation = match backend.compile_and_run(source, console) {
        RunOutcome::Returned(value) => {
            let text = describe(backend, &value, console);
            writeln!(console, "{}{}", result_prefix, text)?;
            Evaluation::Value(text)
        }
        RunOutcome::Raised(exception) => {
            let text = describe(backend, &exception, console);
            debug!(exception = %text, "statement raised");
            writeln!(console, "{}", text)?;
            Evaluation::Exception(text)
        }
    };
    console.flush()?;
    Ok(evaluation)
}

fn describe<B: ReplBackend>(
    backend: &mut B,
    value: &B::Value,
    console: &mut dyn Write,
) -> String {
    match backend.inspect(value, console) {
        Some(text) => text,
        None => backend.to_display_string(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::board::RecordingBoard;
    use crate::runtime::interpreter::Interpreter;

    fn run(
        interp: &mut Interpreter,
        source: &str,
    ) -> (Evaluation, String) {
        let mut out = Vec::new();
        let evaluation = evaluate(interp, source, &mut out, " => ").unwrap();
        (evaluation, String::from_utf8(out).unwrap())
    }

    fn interpreter() -> Interpreter {
        Interpreter::new(Box::new(RecordingBoard::new())).unwrap()
    }

    #[test]
    fn test_value_gets_result_prefix() {
        let mut interp = interpreter();
        let (evaluation, out) = run(&mut interp, "1 + 1");
        assert_eq!(evaluation, Evaluation::Value("2".into()));
        assert_eq!(out, " => 2\n");
    }

    #[test]
    fn test_script_output_comes_first() {
        let mut interp = interpreter();
        let (_, out) = run(&mut interp, "puts \"hi\"");
        assert_eq!(out, "hi\n => \"hi\"\n");
    }

    #[test]
    fn test_exception_has_no_prefix() {
        let mut interp = interpreter();
        let (evaluation, out) = run(&mut interp, "raise 'oops'");
        assert_eq!(evaluation, Evaluation::Exception("oops (RuntimeError)".into()));
        assert_eq!(out, "oops (RuntimeError)\n");
        let (_, out) = run(&mut interp, "1 / 0");
        assert_eq!(out, "divided by 0 (ZeroDivisionError)\n");
    }

    #[test]
    fn test_compile_failure_reads_like_an_exception() {
        let mut interp = interpreter();
        let (evaluation, _) = run(&mut interp, "next");
        assert_eq!(evaluation, Evaluation::Exception("Invalid next (SyntaxError)".into()));
    }

    #[test]
    fn test_uninspectable_value_falls_back() {
        let mut interp = interpreter();
        let (_, out) = run(&mut interp, "class Raw < BasicObject; end; Raw.new");
        assert_eq!(out, " => #<Raw>\n");
    }

    #[test]
    fn test_user_inspect_is_used() {
        let mut interp = interpreter();
        let (_, out) = run(&mut interp, "class Pt; def inspect; 'P!'; end; end; Pt.new");
        assert_eq!(out, " => P!\n");
    }
}
