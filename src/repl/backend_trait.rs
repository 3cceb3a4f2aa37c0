//! Interface between the shell and a scripting engine

use crate::frontend::snapshot::LexerSnapshot;
use std::io::Write;
use thiserror::Error;

/// How a statement finished
#[derive(Debug, Clone)]
pub enum RunOutcome<V> {
    Returned(V),
    /// An exception escaped the statement. Compile failures land here too.
    Raised(V),
}

/// The engine could not be constructed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("engine initialization failed: {reason}")]
pub struct EngineInitError {
    pub reason: String,
}

impl EngineInitError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Builds a fresh engine; called at startup and on every session reset.
pub type EngineFactory<B> = Box<dyn FnMut() -> Result<B, EngineInitError>>;

/// A scripting engine the shell can drive
pub trait ReplBackend {
    type Value;

    /// Lex and parse `source` without executing anything.
    fn parse(
        &self,
        source: &str,
    ) -> LexerSnapshot;

    /// Compile and execute `source` in the persistent top-level context.
    /// Script output goes to `console`.
    fn compile_and_run(
        &mut self,
        source: &str,
        console: &mut dyn Write,
    ) -> RunOutcome<Self::Value>;

    /// Inspect text, or `None` when the value does not support inspection.
    fn inspect(
        &mut self,
        value: &Self::Value,
        console: &mut dyn Write,
    ) -> Option<String>;

    /// Plain conversion used when `inspect` is not available
    fn to_display_string(
        &mut self,
        value: &Self::Value,
    ) -> String;
}
