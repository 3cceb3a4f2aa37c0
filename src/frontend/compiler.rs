//! Compiler driver
//!
//! Runs the parser and the checks that need the whole program, producing
//! a [`Program`] the interpreter can execute.

use super::parser::{self, ast::Program, ParseError};
use crate::util::span::Span;
use std::collections::HashSet;
use thiserror::Error;
use tracing::debug;

/// Compilation errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// `break` or `next` with no loop or block to leave.
    #[error("Invalid {keyword}")]
    InvalidJump { keyword: &'static str, span: Span },
}

impl CompileError {
    pub fn span(&self) -> Span {
        match self {
            CompileError::Parse(error) => error.span(),
            CompileError::InvalidJump { span, .. } => *span,
        }
    }
}

/// Compiler context
#[derive(Debug, Default)]
pub struct Compiler {
    /// Programs compiled so far
    compiled: usize,
}

impl Compiler {
    /// Create a new compiler
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile source code. `locals` are the top-level variables that
    /// already exist in the execution context.
    pub fn compile(
        &mut self,
        source: &str,
        locals: &HashSet<String>,
    ) -> Result<Program, CompileError> {
        debug!("Compiling source code ({} bytes)", source.len());
        let program = parser::parse_source(source, locals)?;
        if let Some(&(keyword, span)) = program.invalid_jumps.first() {
            debug!("Rejected {} at {}", keyword, span.start);
            return Err(CompileError::InvalidJump { keyword, span });
        }
        self.compiled += 1;
        debug!(
            "Compiled {} top-level statements (program #{})",
            program.body.len(),
            self.compiled
        );
        Ok(program)
    }

    pub fn compiled(&self) -> usize {
        self.compiled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(source: &str) -> Result<Program, CompileError> {
        Compiler::new().compile(source, &HashSet::new())
    }

    #[test]
    fn test_compile_counts_programs() {
        let mut compiler = Compiler::new();
        compiler.compile("1", &HashSet::new()).unwrap();
        compiler.compile("2", &HashSet::new()).unwrap();
        assert_eq!(compiler.compiled(), 2);
    }

    #[test]
    fn test_top_level_jumps_are_rejected() {
        let error = compile("break").unwrap_err();
        assert_eq!(error.to_string(), "Invalid break");
        let error = compile("x = 1\nnext 2").unwrap_err();
        assert_eq!(error.to_string(), "Invalid next");
        assert_eq!(error.span().start.line, 2);
    }

    #[test]
    fn test_jumps_in_interpolation_are_checked() {
        assert!(matches!(
            compile("\"#{break}\""),
            Err(CompileError::InvalidJump { .. })
        ));
    }

    #[test]
    fn test_parse_error_passes_through() {
        let error = compile("1 +").unwrap_err();
        assert!(matches!(error, CompileError::Parse(ParseError::UnexpectedEof { .. })));
    }

    #[test]
    fn test_loops_and_blocks_allow_jumps() {
        assert!(compile("while true do break end").is_ok());
        assert!(compile("loop { break 1 }").is_ok());
        assert!(compile("[1].each do |x| next end").is_ok());
    }
}
