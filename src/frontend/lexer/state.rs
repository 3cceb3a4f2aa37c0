//! Expression-boundary state carried by the lexer.

use std::fmt;

/// Where the lexer stands relative to the current expression.
///
/// The first five variants mean the construct cannot be closed yet
/// (an operand, a method name or a class name must follow).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExprState {
    /// Start of an expression: after an operator, `(`, `,`, `then`, `do`.
    Beg,
    /// After `.` or `::`; a method name must follow.
    Dot,
    /// After `class`; a class name must follow.
    Class,
    /// After `def`; a method name must follow.
    Fname,
    /// After `if`, `while`, `and`, `?` and friends; a value must follow.
    Value,
    /// After a method name that may take arguments.
    Arg,
    /// After a method name in command position.
    CmdArg,
    /// After a complete operand.
    End,
    /// After a closing `)`.
    EndArg,
    /// After a method name or parameter list in a definition.
    EndFn,
    /// After `return`, `break`, `next` or `rescue`; a value is optional.
    Mid,
    /// After `;` or a significant newline.
    Terminated,
}

impl ExprState {
    /// The construct cannot be complete in this state.
    #[inline]
    pub fn is_blocking(self) -> bool {
        matches!(
            self,
            ExprState::Beg | ExprState::Dot | ExprState::Class | ExprState::Fname | ExprState::Value
        )
    }

    /// A new operand may start here, so `/`, `-` and `<<` open literals or unary forms.
    #[inline]
    pub fn is_beg_like(self) -> bool {
        matches!(
            self,
            ExprState::Beg
                | ExprState::Mid
                | ExprState::Value
                | ExprState::Class
                | ExprState::Terminated
        )
    }

    /// Right after a method name that may be followed by arguments.
    #[inline]
    pub fn is_arg_like(self) -> bool {
        matches!(self, ExprState::Arg | ExprState::CmdArg)
    }

    /// A newline here does not end the statement.
    #[inline]
    pub fn ignores_newline(self) -> bool {
        self.is_blocking() || self == ExprState::Terminated
    }

    /// `name:` is read as a label.
    #[inline]
    pub fn allows_label(self) -> bool {
        matches!(
            self,
            ExprState::Beg | ExprState::Arg | ExprState::CmdArg | ExprState::Mid
        )
    }
}

impl fmt::Display for ExprState {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let name = match self {
            ExprState::Beg => "EXPR_BEG",
            ExprState::Dot => "EXPR_DOT",
            ExprState::Class => "EXPR_CLASS",
            ExprState::Fname => "EXPR_FNAME",
            ExprState::Value => "EXPR_VALUE",
            ExprState::Arg => "EXPR_ARG",
            ExprState::CmdArg => "EXPR_CMDARG",
            ExprState::End => "EXPR_END",
            ExprState::EndArg => "EXPR_ENDARG",
            ExprState::EndFn => "EXPR_ENDFN",
            ExprState::Mid => "EXPR_MID",
            ExprState::Terminated => "EXPR_TERMINATED",
        };
        write!(f, "{}", name)
    }
}
