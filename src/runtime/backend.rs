//! The interpreter as the shell's scripting engine

use crate::frontend::snapshot::{snapshot, LexerSnapshot};
use crate::repl::backend_trait::{ReplBackend, RunOutcome};
use crate::runtime::interpreter::Interpreter;
use crate::runtime::value::Value;
use std::io::Write;

impl ReplBackend for Interpreter {
    type Value = Value;

    /// Parsed against the persistent top-level locals, so `x /2` reads as
    /// a division once `x` has been assigned and opens a regexp before.
    fn parse(
        &self,
        source: &str,
    ) -> LexerSnapshot {
        snapshot(source, &self.top_level_locals())
    }

    fn compile_and_run(
        &mut self,
        source: &str,
        console: &mut dyn Write,
    ) -> RunOutcome<Value> {
        self.run(source, console)
    }

    fn inspect(
        &mut self,
        value: &Value,
        console: &mut dyn Write,
    ) -> Option<String> {
        self.inspect_value(value, console)
    }

    fn to_display_string(
        &mut self,
        value: &Value,
    ) -> String {
        self.display_string(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::lexer::ExprState;
    use crate::runtime::board::RecordingBoard;

    fn backend() -> Interpreter {
        Interpreter::new(Box::new(RecordingBoard::new())).unwrap()
    }

    #[test]
    fn test_parse_does_not_execute() {
        let mut interp = backend();
        let snap = ReplBackend::parse(&interp, "x = 1");
        assert!(!snap.has_errors());
        assert!(interp.local("x").is_none());
        let mut out = Vec::new();
        assert!(matches!(
            interp.compile_and_run("x = 1", &mut out),
            RunOutcome::Returned(Value::Int(1))
        ));
    }

    #[test]
    fn test_parse_sees_persistent_locals() {
        let mut interp = backend();
        assert!(ReplBackend::parse(&interp, "x /2").in_literal);
        let mut out = Vec::new();
        interp.compile_and_run("x = 10", &mut out);
        let snap = ReplBackend::parse(&interp, "x /2");
        assert!(!snap.in_literal);
        assert!(!snap.has_errors());
        assert_eq!(snap.state, ExprState::End);
    }

    #[test]
    fn test_inspect_and_display() {
        let mut interp = backend();
        let mut out = Vec::new();
        let RunOutcome::Returned(value) = interp.compile_and_run(":sym", &mut out) else {
            panic!("raised");
        };
        assert_eq!(ReplBackend::inspect(&mut interp, &value, &mut out).as_deref(), Some(":sym"));
        assert_eq!(interp.to_display_string(&value), "sym");
    }
}
