//! Parser state and token stream management

use super::ast::JumpTarget;
use super::ParseError;
use crate::frontend::lexer::{Token, TokenKind};
use crate::util::span::Span;
use std::collections::HashSet;

/// Binding power levels for the Pratt parser
pub const BP_LOWEST: u8 = 0;
pub const BP_ASSIGN: u8 = 10;
pub const BP_TERNARY: u8 = 15;
pub const BP_RANGE: u8 = 20;
pub const BP_OROR: u8 = 30;
pub const BP_ANDAND: u8 = 40;
pub const BP_EQ: u8 = 50;
pub const BP_CMP: u8 = 60;
pub const BP_BOR: u8 = 70;
pub const BP_BAND: u8 = 80;
pub const BP_SHIFT: u8 = 90;
pub const BP_ADD: u8 = 100;
pub const BP_MUL: u8 = 110;
pub const BP_UMINUS: u8 = 120;
pub const BP_POW: u8 = 130;
pub const BP_UNARY: u8 = 140;
pub const BP_CALL: u8 = 150;

pub type PResult<T> = Result<T, ParseError>;

#[derive(Debug)]
struct Scope {
    vars: HashSet<String>,
    /// Method and class bodies do not see enclosing locals.
    barrier: bool,
}

/// Innermost construct a `break`/`next` would leave.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum JumpContext {
    Loop,
    Block,
    Method,
}

/// Parser state for tracking position, scopes and jump targets
#[derive(Debug)]
pub struct ParserState<'a> {
    tokens: &'a [Token],
    pos: usize,
    eof: Token,
    scopes: Vec<Scope>,
    jumps: Vec<JumpContext>,
    def_depth: usize,
    /// Non-zero while a trailing `do` belongs to an outer construct.
    no_do_block: usize,
    invalid_jumps: Vec<(&'static str, Span)>,
}

impl<'a> ParserState<'a> {
    /// Create a new parser state; `locals` are visible at the top level.
    pub fn new(
        tokens: &'a [Token],
        locals: &HashSet<String>,
    ) -> Self {
        let end = tokens.last().map(|t| t.span).unwrap_or_default();
        Self {
            tokens,
            pos: 0,
            eof: Token {
                kind: TokenKind::Eof,
                span: end,
                spaced: false,
            },
            scopes: vec![Scope {
                vars: locals.clone(),
                barrier: true,
            }],
            jumps: Vec::new(),
            def_depth: 0,
            no_do_block: 0,
            invalid_jumps: Vec::new(),
        }
    }

    // ---- token cursor ----

    #[inline]
    pub fn current(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&self.eof)
    }

    #[inline]
    pub fn kind(&self) -> &TokenKind {
        &self.current().kind
    }

    #[inline]
    pub fn peek_nth(
        &self,
        n: usize,
    ) -> &Token {
        self.tokens.get(self.pos + n).unwrap_or(&self.eof)
    }

    #[inline]
    pub fn at(
        &self,
        kind: &TokenKind,
    ) -> bool {
        self.kind() == kind
    }

    #[inline]
    pub fn at_end(&self) -> bool {
        self.at(&TokenKind::Eof)
    }

    /// Statement separator
    #[inline]
    pub fn at_term(&self) -> bool {
        matches!(self.kind(), TokenKind::Newline | TokenKind::Semicolon)
    }

    /// Advance and return the consumed token
    pub fn bump(&mut self) -> Token {
        let token = self.current().clone();
        if self.pos < self.tokens.len() && !self.at_end() {
            self.pos += 1;
        }
        token
    }

    pub fn eat(
        &mut self,
        kind: &TokenKind,
    ) -> bool {
        if self.at(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    /// Expect a specific token; `expecting` names it in the error message.
    pub fn expect(
        &mut self,
        kind: &TokenKind,
        expecting: &str,
    ) -> PResult<Span> {
        if self.at(kind) {
            Ok(self.bump().span)
        } else {
            Err(self.unexpected(Some(expecting)))
        }
    }

    pub fn expect_end(&mut self) -> PResult<Span> {
        self.expect(&TokenKind::KwEnd, "'end'")
    }

    pub fn skip_terms(&mut self) {
        while self.at_term() {
            self.bump();
        }
    }

    pub fn skip_newlines(&mut self) {
        while self.at(&TokenKind::Newline) {
            self.bump();
        }
    }

    /// Span of the last consumed token
    pub fn prev_span(&self) -> Span {
        match self.pos {
            0 => self.current().span,
            n => self.tokens.get(n - 1).map_or(self.eof.span, |t| t.span),
        }
    }

    pub fn span_from(
        &self,
        start: Span,
    ) -> Span {
        start.to(self.prev_span())
    }

    /// Error for the token at the cursor. The token decides the error kind.
    pub fn unexpected(
        &self,
        expecting: Option<&str>,
    ) -> ParseError {
        let token = self.current();
        let expecting = expecting.map(str::to_string);
        let span = token.span;
        match &token.kind {
            TokenKind::Eof => ParseError::UnexpectedEof { expecting, span },
            TokenKind::KwEnd => ParseError::UnexpectedEnd { span },
            TokenKind::Regexp { .. } => ParseError::UnexpectedLiteral {
                found: token.kind.describe(),
                expecting,
                span,
            },
            other => ParseError::UnexpectedToken {
                found: other.describe(),
                expecting,
                span,
            },
        }
    }

    pub fn invalid(
        &self,
        message: impl Into<String>,
        span: Span,
    ) -> ParseError {
        ParseError::Invalid {
            message: message.into(),
            span,
        }
    }

    // ---- local variable scopes ----

    pub fn push_scope(
        &mut self,
        barrier: bool,
    ) {
        self.scopes.push(Scope {
            vars: HashSet::new(),
            barrier,
        });
    }

    pub fn pop_scope(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    pub fn declare(
        &mut self,
        name: &str,
    ) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.vars.insert(name.to_string());
        }
    }

    pub fn is_local(
        &self,
        name: &str,
    ) -> bool {
        for scope in self.scopes.iter().rev() {
            if scope.vars.contains(name) {
                return true;
            }
            if scope.barrier {
                return false;
            }
        }
        false
    }

    /// Every local visible from the innermost scope
    pub fn visible_locals(&self) -> HashSet<String> {
        let mut names = HashSet::new();
        for scope in self.scopes.iter().rev() {
            names.extend(scope.vars.iter().cloned());
            if scope.barrier {
                break;
            }
        }
        names
    }

    /// Locals of the outermost scope
    pub fn top_locals(&self) -> HashSet<String> {
        self.scopes
            .first()
            .map(|scope| scope.vars.clone())
            .unwrap_or_default()
    }

    // ---- jump targets ----

    pub(crate) fn push_jump(
        &mut self,
        context: JumpContext,
    ) {
        self.jumps.push(context);
    }

    pub(crate) fn pop_jump(&mut self) {
        self.jumps.pop();
    }

    /// Resolve what `keyword` leaves; records it when there is nothing to leave.
    pub fn jump_target(
        &mut self,
        keyword: &'static str,
        span: Span,
    ) -> JumpTarget {
        match self.jumps.last() {
            Some(JumpContext::Loop) => JumpTarget::Loop,
            Some(JumpContext::Block) => JumpTarget::Block,
            Some(JumpContext::Method) | None => {
                self.invalid_jumps.push((keyword, span));
                JumpTarget::Invalid
            }
        }
    }

    pub fn add_invalid_jumps(
        &mut self,
        jumps: Vec<(&'static str, Span)>,
    ) {
        self.invalid_jumps.extend(jumps);
    }

    pub fn take_invalid_jumps(&mut self) -> Vec<(&'static str, Span)> {
        std::mem::take(&mut self.invalid_jumps)
    }

    // ---- context flags ----

    pub fn enter_def(&mut self) {
        self.def_depth += 1;
    }

    pub fn leave_def(&mut self) {
        self.def_depth = self.def_depth.saturating_sub(1);
    }

    #[inline]
    pub fn in_def(&self) -> bool {
        self.def_depth > 0
    }

    #[inline]
    pub fn do_block_allowed(&self) -> bool {
        self.no_do_block == 0
    }

    /// Run `f` with `do` reserved for the enclosing construct.
    pub fn without_do_block<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> PResult<T>,
    ) -> PResult<T> {
        self.no_do_block += 1;
        let result = f(self);
        self.no_do_block -= 1;
        result
    }

    /// Run `f` inside brackets, where `do` attaches normally again.
    pub fn with_do_block<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> PResult<T>,
    ) -> PResult<T> {
        let saved = std::mem::take(&mut self.no_do_block);
        let result = f(self);
        self.no_do_block = saved;
        result
    }
}
