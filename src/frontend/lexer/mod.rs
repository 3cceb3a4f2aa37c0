//! Lexer module
//!
//! Turns statement text into tokens and tracks the expression-boundary
//! state after the last token. Literal scanning (strings, symbols, regexps,
//! heredocs, word lists) reports whether a literal is still open at the end
//! of input instead of failing, so partial statements can be lexed.

pub mod state;
pub mod tokens;

pub use state::ExprState;
pub use tokens::{StrPart, Token, TokenKind};

use crate::util::span::{Position, Span};
use std::collections::HashSet;
use tracing::trace;

/// Lexer error
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LexError {
    #[error("Invalid char '{ch}' in expression at {position}")]
    UnexpectedChar { ch: char, position: Position },
    #[error("Invalid number literal '{text}' at {position}")]
    InvalidNumber { text: String, position: Position },
    #[error("Invalid escape sequence '\\{sequence}' at {position}")]
    InvalidEscape { sequence: String, position: Position },
    #[error("'{text}' is not allowed as a variable name at {position}")]
    InvalidVariableName { text: String, position: Position },
    #[error("unterminated quoted heredoc identifier at {position}")]
    UnterminatedHeredocId { position: Position },
}

impl LexError {
    pub fn position(&self) -> Position {
        match self {
            LexError::UnexpectedChar { position, .. }
            | LexError::InvalidNumber { position, .. }
            | LexError::InvalidEscape { position, .. }
            | LexError::InvalidVariableName { position, .. }
            | LexError::UnterminatedHeredocId { position } => *position,
        }
    }
}

/// Result of lexing one buffer.
#[derive(Debug, Clone)]
pub struct Lexed {
    /// Tokens up to the first error, always terminated by `Eof`.
    pub tokens: Vec<Token>,
    /// State after the last token.
    pub state: ExprState,
    /// A string-like literal was still open at end of input.
    pub in_literal: bool,
    pub error: Option<LexError>,
}

/// Tokenize `source`. `locals` names the variables already defined in the
/// enclosing scope; they change how a following `/`, `-`, `[` or `<<` is read.
pub fn tokenize(
    source: &str,
    locals: &HashSet<String>,
) -> Lexed {
    let lexed = Lexer::new(source, locals).run();
    trace!(
        tokens = lexed.tokens.len(),
        state = %lexed.state,
        in_literal = lexed.in_literal,
        "lexed buffer"
    );
    lexed
}

/// Operator names accepted after `def` and `.`, longest first.
const OPERATOR_METHODS: &[&str] = &[
    "[]=", "<=>", "===", "[]", "==", "=~", "!=", "!~", "**", "+@", "-@", "<<", ">>", "<=", ">=",
    "+", "-", "*", "/", "%", "<", ">", "!", "&", "|", "^", "~",
];

/// Compound assignment operators, longest first.
const OP_ASSIGNS: &[&str] = &[
    "**=", "||=", "&&=", "<<=", ">>=", "+=", "-=", "*=", "/=", "%=", "|=", "&=", "^=",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockParams {
    None,
    /// Just saw `{` or `do`; a `|` opens the parameter list.
    Pending,
    Open,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DefParams {
    None,
    /// The method name was just read.
    AfterName,
    /// Inside `(...)` at this paren depth.
    Paren(usize),
    /// Unparenthesized list running to the end of the line.
    Bare,
}

struct Scanned {
    parts: Vec<StrPart>,
    end: usize,
    closed: bool,
}

struct Lexer<'a> {
    src: &'a str,
    pos: usize,
    line: usize,
    column: usize,
    start: Position,
    spaced: bool,
    state: ExprState,
    cmd_start: bool,
    locals: HashSet<String>,
    tokens: Vec<Token>,
    heredoc_resume: Option<usize>,
    in_literal: bool,
    error: Option<LexError>,
    block_params: BlockParams,
    def_params: DefParams,
    paren_depth: usize,
}

impl<'a> Lexer<'a> {
    fn new(
        src: &'a str,
        locals: &HashSet<String>,
    ) -> Self {
        Self {
            src,
            pos: 0,
            line: 1,
            column: 1,
            start: Position::with_offset(1, 1, 0),
            spaced: false,
            state: ExprState::Beg,
            cmd_start: true,
            locals: locals.clone(),
            tokens: Vec::new(),
            heredoc_resume: None,
            in_literal: false,
            error: None,
            block_params: BlockParams::None,
            def_params: DefParams::None,
            paren_depth: 0,
        }
    }

    fn run(mut self) -> Lexed {
        while self.error.is_none() {
            self.spaced = self.skip_blank();
            self.start = self.position();
            let Some(c) = self.peek() else { break };
            self.lex_one(c);
        }
        self.start = self.position();
        self.tokens.push(Token {
            kind: TokenKind::Eof,
            span: Span::new(self.start, self.start),
            spaced: self.spaced,
        });
        Lexed {
            tokens: self.tokens,
            state: self.state,
            in_literal: self.in_literal,
            error: self.error,
        }
    }

    // ---- cursor ----

    fn position(&self) -> Position {
        Position::with_offset(self.line, self.column, self.pos)
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek_at(
        &self,
        n: usize,
    ) -> Option<char> {
        self.rest().chars().nth(n)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn bump_n(
        &mut self,
        n: usize,
    ) {
        for _ in 0..n {
            self.bump();
        }
    }

    fn advance_to(
        &mut self,
        end: usize,
    ) {
        while self.pos < end && self.bump().is_some() {}
    }

    fn starts_with(
        &self,
        s: &str,
    ) -> bool {
        self.rest().starts_with(s)
    }

    /// Skips blanks, comments and escaped newlines. Returns whether anything was skipped.
    fn skip_blank(&mut self) -> bool {
        let mut skipped = false;
        loop {
            match self.peek() {
                Some(' ' | '\t' | '\r' | '\x0c') => {
                    self.bump();
                    skipped = true;
                }
                Some('\\') if self.peek_at(1) == Some('\n') => {
                    self.bump_n(2);
                    self.resume_heredoc();
                    skipped = true;
                }
                // The continued line has not arrived yet.
                Some('\\') if self.peek_at(1).is_none() => {
                    self.bump();
                    self.state = ExprState::Beg;
                    skipped = true;
                }
                Some('#') => {
                    while !matches!(self.peek(), None | Some('\n')) {
                        self.bump();
                    }
                    skipped = true;
                }
                _ => return skipped,
            }
        }
    }

    fn resume_heredoc(&mut self) {
        if let Some(resume) = self.heredoc_resume.take() {
            self.advance_to(resume);
        }
    }

    fn fail(
        &mut self,
        error: LexError,
    ) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    fn push(
        &mut self,
        kind: TokenKind,
        state: ExprState,
    ) {
        if self.block_params == BlockParams::Pending && kind != TokenKind::Pipe {
            self.block_params = BlockParams::None;
        }
        if self.def_params == DefParams::AfterName
            && !matches!(kind, TokenKind::LParen | TokenKind::Ident(_))
        {
            self.def_params = DefParams::None;
        }
        let span = Span::new(self.start, self.position());
        self.tokens.push(Token {
            kind,
            span,
            spaced: self.spaced,
        });
        self.state = state;
        self.cmd_start = false;
    }

    fn last_kind(&self) -> Option<&TokenKind> {
        self.tokens.last().map(|t| &t.kind)
    }

    // ---- dispatch ----

    fn lex_one(
        &mut self,
        c: char,
    ) {
        if matches!(self.state, ExprState::Fname | ExprState::Dot)
            && !is_ident_start(c)
            && self.lex_operator_method()
        {
            return;
        }
        match c {
            '\n' => self.lex_newline(),
            '0'..='9' => self.lex_number(),
            '"' => self.lex_double_quoted(),
            '\'' => self.lex_single_quoted(),
            '@' => self.lex_ivar(),
            '$' => self.lex_gvar(),
            ':' => self.lex_colon(),
            '/' => self.lex_slash(),
            '<' => self.lex_lt(),
            '%' => self.lex_percent(),
            '|' => self.lex_pipe(),
            c if is_ident_start(c) => self.lex_ident(),
            c => self.lex_operator(c),
        }
    }

    fn lex_operator_method(&mut self) -> bool {
        let Some(op) = OPERATOR_METHODS.iter().find(|op| self.starts_with(op)) else {
            return false;
        };
        let op = (*op).to_string();
        self.bump_n(op.chars().count());
        let next = if self.state == ExprState::Fname {
            self.def_params = DefParams::AfterName;
            ExprState::EndFn
        } else {
            ExprState::Arg
        };
        self.push(TokenKind::Ident(op), next);
        true
    }

    fn lex_newline(&mut self) {
        self.bump();
        self.resume_heredoc();
        if self.def_params == DefParams::Bare || self.def_params == DefParams::AfterName {
            self.def_params = DefParams::None;
        }
        if self.state.ignores_newline() {
            return;
        }
        self.push(TokenKind::Newline, ExprState::Terminated);
        self.cmd_start = true;
    }

    fn lex_number(&mut self) {
        let start = self.pos;
        let position = self.position();
        let radix = match (self.peek(), self.peek_at(1)) {
            (Some('0'), Some('x' | 'X')) => 16,
            (Some('0'), Some('b' | 'B')) => 2,
            (Some('0'), Some('o' | 'O')) => 8,
            _ => 10,
        };
        if radix != 10 {
            self.bump_n(2);
            while matches!(self.peek(), Some(c) if c.is_digit(radix) || c == '_') {
                self.bump();
            }
            let text = &self.src[start..self.pos];
            let digits: String = text[2..].chars().filter(|c| *c != '_').collect();
            match i64::from_str_radix(&digits, radix) {
                Ok(value) => self.push(TokenKind::Int(value), ExprState::End),
                Err(_) => self.fail(LexError::InvalidNumber {
                    text: text.to_string(),
                    position,
                }),
            }
            return;
        }

        let mut is_float = false;
        self.eat_digits();
        if self.peek() == Some('.') && matches!(self.peek_at(1), Some(c) if c.is_ascii_digit()) {
            is_float = true;
            self.bump();
            self.eat_digits();
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            let exp_digit = match self.peek_at(1) {
                Some('+' | '-') => matches!(self.peek_at(2), Some(c) if c.is_ascii_digit()),
                Some(c) => c.is_ascii_digit(),
                None => false,
            };
            if exp_digit {
                is_float = true;
                self.bump_n(2);
                self.eat_digits();
            }
        }
        let text = &self.src[start..self.pos];
        let clean: String = text.chars().filter(|c| *c != '_').collect();
        let kind = if is_float {
            clean.parse::<f64>().ok().map(TokenKind::Float)
        } else {
            clean
                .parse::<i64>()
                .ok()
                .map(TokenKind::Int)
                .or_else(|| clean.parse::<f64>().ok().map(TokenKind::Float))
        };
        match kind {
            Some(kind) => self.push(kind, ExprState::End),
            None => self.fail(LexError::InvalidNumber {
                text: text.to_string(),
                position,
            }),
        }
    }

    fn eat_digits(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_ascii_digit() || c == '_') {
            self.bump();
        }
    }

    // ---- quoted literals ----

    /// Scans a quoted literal body at the cursor, up to and including `term`.
    fn scan(
        &mut self,
        term: char,
        interpolate: bool,
        regexp: bool,
    ) -> Option<Scanned> {
        let position = self.position();
        match scan_quoted(self.src, self.pos, Some(term), interpolate, regexp) {
            Ok(scanned) => {
                self.advance_to(scanned.end);
                if !scanned.closed {
                    self.in_literal = true;
                }
                Some(scanned)
            }
            Err(sequence) => {
                self.fail(LexError::InvalidEscape { sequence, position });
                None
            }
        }
    }

    fn lex_double_quoted(&mut self) {
        self.bump();
        if let Some(scanned) = self.scan('"', true, false) {
            self.push(TokenKind::Str(scanned.parts), ExprState::End);
        }
    }

    fn lex_single_quoted(&mut self) {
        self.bump();
        if let Some(scanned) = self.scan('\'', false, false) {
            self.push(TokenKind::Str(scanned.parts), ExprState::End);
        }
    }

    fn lex_regexp(&mut self) {
        self.bump();
        let Some(scanned) = self.scan('/', true, true) else {
            return;
        };
        let mut flags = String::new();
        if scanned.closed {
            while let Some(c @ ('i' | 'm' | 'x' | 'o')) = self.peek() {
                flags.push(c);
                self.bump();
            }
        }
        self.push(
            TokenKind::Regexp {
                parts: scanned.parts,
                flags,
            },
            ExprState::End,
        );
    }

    fn lex_heredoc(&mut self) {
        let position = self.position();
        self.bump_n(2);
        let squiggly = self.peek() == Some('~');
        let dash = self.peek() == Some('-');
        if squiggly || dash {
            self.bump();
        }
        let quote = match self.peek() {
            Some(q @ ('\'' | '"')) => {
                self.bump();
                Some(q)
            }
            _ => None,
        };
        let id_start = self.pos;
        while matches!(self.peek(), Some(c) if is_ident_char(c)) {
            self.bump();
        }
        let id = self.src[id_start..self.pos].to_string();
        if let Some(q) = quote {
            if self.peek() != Some(q) {
                self.fail(LexError::UnterminatedHeredocId { position });
                return;
            }
            self.bump();
        }

        let body_start = match self.heredoc_resume {
            Some(resume) => resume,
            None => match self.rest().find('\n') {
                Some(i) => self.pos + i + 1,
                None => {
                    self.in_literal = true;
                    self.push(TokenKind::Str(Vec::new()), ExprState::End);
                    return;
                }
            },
        };

        let len = self.src.len();
        let mut cursor = body_start;
        let mut found = None;
        while cursor < len {
            let line_end = self.src[cursor..].find('\n').map_or(len, |i| cursor + i);
            let line = self.src[cursor..line_end].trim_end_matches('\r');
            let candidate = if squiggly || dash { line.trim_start() } else { line };
            if candidate == id {
                found = Some((cursor, (line_end + 1).min(len)));
                break;
            }
            cursor = line_end + 1;
        }

        let Some((body_end, resume)) = found else {
            self.in_literal = true;
            self.heredoc_resume = Some(len);
            self.push(TokenKind::Str(Vec::new()), ExprState::End);
            return;
        };

        let raw = &self.src[body_start..body_end];
        let body = if squiggly { dedent(raw) } else { raw.to_string() };
        let interpolate = quote != Some('\'');
        let parts = if interpolate {
            match scan_quoted(&body, 0, None, true, false) {
                Ok(scanned) => {
                    if !scanned.closed {
                        self.in_literal = true;
                    }
                    scanned.parts
                }
                Err(sequence) => {
                    self.fail(LexError::InvalidEscape { sequence, position });
                    return;
                }
            }
        } else if body.is_empty() {
            Vec::new()
        } else {
            vec![StrPart::Lit(body)]
        };
        self.heredoc_resume = Some(resume);
        self.push(TokenKind::Str(parts), ExprState::End);
    }

    // ---- names ----

    fn lex_ident(&mut self) {
        let start = self.pos;
        let prev = self.state;
        self.bump();
        while matches!(self.peek(), Some(c) if is_ident_char(c)) {
            self.bump();
        }
        if matches!(self.peek(), Some('?' | '!')) && self.peek_at(1) != Some('=') {
            self.bump();
        }
        let mut name = self.src[start..self.pos].to_string();

        if prev == ExprState::Fname
            && self.peek() == Some('=')
            && self.peek_at(1) == Some('(')
        {
            self.bump();
            name.push('=');
        }

        if self.peek() == Some(':')
            && self.peek_at(1) != Some(':')
            && prev.allows_label()
            && self.def_params == DefParams::None
        {
            self.bump();
            self.push(TokenKind::Label(name), ExprState::Beg);
            return;
        }

        if prev == ExprState::Fname && name == "self" && self.peek() == Some('.') {
            self.push(TokenKind::KwSelf, ExprState::Fname);
            return;
        }

        if !matches!(prev, ExprState::Dot | ExprState::Fname) {
            if let Some(kind) = tokens::keyword(&name) {
                self.push_keyword(kind);
                return;
            }
        }

        let is_const = name.chars().next().is_some_and(char::is_uppercase);
        let next = match prev {
            ExprState::Dot => ExprState::Arg,
            ExprState::Fname => ExprState::EndFn,
            _ if is_const => ExprState::End,
            _ if self.locals.contains(&name) => ExprState::End,
            _ if self.cmd_start => ExprState::CmdArg,
            _ => ExprState::Arg,
        };

        if !is_const && !matches!(prev, ExprState::Dot | ExprState::Fname) {
            let declares = self.block_params == BlockParams::Open
                || matches!(self.def_params, DefParams::Paren(_) | DefParams::Bare)
                || self.def_params == DefParams::AfterName
                || self.looks_like_assignment();
            if self.def_params == DefParams::AfterName {
                self.def_params = DefParams::Bare;
            }
            if declares {
                self.locals.insert(name.clone());
            }
        }

        let kind = if is_const {
            TokenKind::Const(name)
        } else {
            TokenKind::Ident(name)
        };
        self.push(kind, next);
        if prev == ExprState::Fname {
            self.def_params = DefParams::AfterName;
        }
    }

    fn looks_like_assignment(&self) -> bool {
        let rest = self.rest().trim_start_matches([' ', '\t']);
        if let Some(after) = rest.strip_prefix('=') {
            return !after.starts_with(['=', '~', '>']);
        }
        OP_ASSIGNS.iter().any(|op| rest.starts_with(op))
    }

    fn push_keyword(
        &mut self,
        kind: TokenKind,
    ) {
        let next = match kind {
            TokenKind::KwIf
            | TokenKind::KwUnless
            | TokenKind::KwWhile
            | TokenKind::KwUntil
            | TokenKind::KwElsif
            | TokenKind::KwCase
            | TokenKind::KwWhen
            | TokenKind::KwAnd
            | TokenKind::KwOr
            | TokenKind::KwNot => ExprState::Value,
            TokenKind::KwThen
            | TokenKind::KwElse
            | TokenKind::KwDo
            | TokenKind::KwBegin
            | TokenKind::KwEnsure => ExprState::Beg,
            TokenKind::KwReturn | TokenKind::KwBreak | TokenKind::KwNext | TokenKind::KwRescue => {
                ExprState::Mid
            }
            TokenKind::KwDef => ExprState::Fname,
            TokenKind::KwClass | TokenKind::KwModule => ExprState::Class,
            TokenKind::KwYield | TokenKind::KwSuper => ExprState::Arg,
            _ => ExprState::End,
        };
        let starts_command = matches!(
            kind,
            TokenKind::KwThen
                | TokenKind::KwElse
                | TokenKind::KwDo
                | TokenKind::KwBegin
                | TokenKind::KwEnsure
                | TokenKind::KwAnd
                | TokenKind::KwOr
                | TokenKind::KwNot
        );
        let opens_block = kind == TokenKind::KwDo;
        self.push(kind, next);
        self.cmd_start = starts_command;
        if opens_block {
            self.block_params = BlockParams::Pending;
        }
    }

    fn lex_ivar(&mut self) {
        let position = self.position();
        let start = self.pos;
        self.bump();
        if self.peek() == Some('@') {
            self.bump();
        }
        if !matches!(self.peek(), Some(c) if is_ident_start(c)) {
            while matches!(self.peek(), Some(c) if is_ident_char(c)) {
                self.bump();
            }
            self.fail(LexError::InvalidVariableName {
                text: self.src[start..self.pos].to_string(),
                position,
            });
            return;
        }
        while matches!(self.peek(), Some(c) if is_ident_char(c)) {
            self.bump();
        }
        let name = self.src[start..self.pos].to_string();
        if name.starts_with("@@") {
            self.fail(LexError::InvalidVariableName { text: name, position });
            return;
        }
        self.push(TokenKind::IVar(name), ExprState::End);
    }

    fn lex_gvar(&mut self) {
        let position = self.position();
        let start = self.pos;
        self.bump();
        match self.peek() {
            Some(c) if is_ident_start(c) => {
                while matches!(self.peek(), Some(c) if is_ident_char(c)) {
                    self.bump();
                }
            }
            Some('!' | '@' | '~' | '&' | '0'..='9' | '_' | ';' | ',' | '/' | '\\') => {
                self.bump();
            }
            _ => {
                self.fail(LexError::InvalidVariableName {
                    text: "$".to_string(),
                    position,
                });
                return;
            }
        }
        let name = self.src[start..self.pos].to_string();
        self.push(TokenKind::GVar(name), ExprState::End);
    }

    fn lex_colon(&mut self) {
        if self.starts_with("::") {
            self.bump_n(2);
            self.push(TokenKind::ColonColon, ExprState::Dot);
            return;
        }
        match self.peek_at(1) {
            Some('"') => {
                self.bump_n(2);
                if let Some(scanned) = self.scan('"', true, false) {
                    self.push(TokenKind::DSymbol(scanned.parts), ExprState::End);
                }
            }
            Some('\'') => {
                self.bump_n(2);
                if let Some(scanned) = self.scan('\'', false, false) {
                    self.push(TokenKind::DSymbol(scanned.parts), ExprState::End);
                }
            }
            Some(c) if is_ident_start(c) || c == '@' || c == '$' => {
                self.bump();
                let start = self.pos;
                while matches!(self.peek(), Some('@' | '$')) {
                    self.bump();
                }
                while matches!(self.peek(), Some(c) if is_ident_char(c)) {
                    self.bump();
                }
                if matches!(self.peek(), Some('?' | '!' | '='))
                    && !matches!(self.peek_at(1), Some('=' | '~' | '>'))
                {
                    self.bump();
                }
                let name = self.src[start..self.pos].to_string();
                self.push(TokenKind::Symbol(name), ExprState::End);
            }
            Some(_) => {
                let after = &self.rest()[1..];
                if let Some(op) = OPERATOR_METHODS
                    .iter()
                    .find(|op| after.starts_with(*op) && !op.ends_with('@'))
                {
                    let op = (*op).to_string();
                    self.bump_n(1 + op.chars().count());
                    self.push(TokenKind::Symbol(op), ExprState::End);
                } else {
                    self.bump();
                    self.push(TokenKind::Colon, ExprState::Beg);
                }
            }
            None => {
                self.bump();
                self.push(TokenKind::Colon, ExprState::Beg);
            }
        }
    }

    // ---- ambiguous operators ----

    /// An operand may start here: beginning of an expression, or an
    /// argument position right after a method name with a space before
    /// and none after.
    fn operand_may_start(&self) -> bool {
        if self.state.is_beg_like() {
            return true;
        }
        self.state.is_arg_like()
            && self.spaced
            && !matches!(self.peek_at(1), None | Some(' ' | '\t' | '\n' | '\r'))
    }

    fn lex_slash(&mut self) {
        if self.state.is_beg_like() {
            self.lex_regexp();
        } else if self.starts_with("/=") {
            self.bump_n(2);
            self.push(TokenKind::OpAssign("/".into()), ExprState::Beg);
        } else if self.operand_may_start() {
            self.lex_regexp();
        } else {
            self.bump();
            self.push(TokenKind::Slash, ExprState::Beg);
        }
    }

    fn lex_lt(&mut self) {
        if self.starts_with("<<") && self.heredoc_ahead() && self.operand_may_start() {
            self.lex_heredoc();
            return;
        }
        let (kind, width) = if self.starts_with("<=>") {
            (TokenKind::Cmp, 3)
        } else if self.starts_with("<<=") {
            (TokenKind::OpAssign("<<".into()), 3)
        } else if self.starts_with("<=") {
            (TokenKind::Le, 2)
        } else if self.starts_with("<<") {
            (TokenKind::Shl, 2)
        } else {
            (TokenKind::Lt, 1)
        };
        self.bump_n(width);
        self.push(kind, ExprState::Beg);
    }

    fn heredoc_ahead(&self) -> bool {
        let mut after = self.rest()[2..].chars();
        let mut c = after.next();
        if matches!(c, Some('~' | '-')) {
            c = after.next();
        }
        matches!(c, Some(q) if q == '\'' || q == '"' || is_ident_start(q))
    }

    fn lex_percent(&mut self) {
        let word_list = matches!(self.peek_at(1), Some('w' | 'i'))
            && matches!(self.peek_at(2), Some('(' | '[' | '{' | '<'))
            && self.operand_may_start();
        if word_list {
            let symbols = self.peek_at(1) == Some('i');
            let close = match self.peek_at(2) {
                Some('(') => ')',
                Some('[') => ']',
                Some('{') => '}',
                _ => '>',
            };
            self.bump_n(3);
            let body_start = self.pos;
            let (body_end, closed) = match self.rest().find(close) {
                Some(i) => (self.pos + i, true),
                None => (self.src.len(), false),
            };
            let items = self.src[body_start..body_end]
                .split_whitespace()
                .map(str::to_string)
                .collect();
            self.advance_to(body_end);
            if closed {
                self.bump();
            } else {
                self.in_literal = true;
            }
            self.push(TokenKind::Words { items, symbols }, ExprState::End);
        } else if self.starts_with("%=") {
            self.bump_n(2);
            self.push(TokenKind::OpAssign("%".into()), ExprState::Beg);
        } else {
            self.bump();
            self.push(TokenKind::Percent, ExprState::Beg);
        }
    }

    fn lex_pipe(&mut self) {
        match self.block_params {
            BlockParams::Pending => {
                if self.starts_with("||") {
                    self.bump();
                    self.push(TokenKind::Pipe, ExprState::Beg);
                    self.start = self.position();
                    self.spaced = false;
                    self.bump();
                    self.push(TokenKind::Pipe, ExprState::Beg);
                    self.block_params = BlockParams::None;
                    self.cmd_start = true;
                } else {
                    self.bump();
                    self.push(TokenKind::Pipe, ExprState::Beg);
                    self.block_params = BlockParams::Open;
                }
            }
            BlockParams::Open => {
                self.bump();
                self.block_params = BlockParams::None;
                self.push(TokenKind::Pipe, ExprState::Beg);
                self.cmd_start = true;
            }
            BlockParams::None => {
                let (kind, width) = if self.starts_with("||=") {
                    (TokenKind::OpAssign("||".into()), 3)
                } else if self.starts_with("||") {
                    (TokenKind::OrOr, 2)
                } else if self.starts_with("|=") {
                    (TokenKind::OpAssign("|".into()), 2)
                } else {
                    (TokenKind::Pipe, 1)
                };
                self.bump_n(width);
                self.push(kind, ExprState::Beg);
            }
        }
    }

    fn lex_operator(
        &mut self,
        c: char,
    ) {
        let position = self.position();
        let (kind, width, next) = match c {
            '(' => {
                self.bump();
                self.paren_depth += 1;
                if self.def_params == DefParams::AfterName {
                    self.push(TokenKind::LParen, ExprState::Beg);
                    self.def_params = DefParams::Paren(self.paren_depth);
                } else {
                    self.push(TokenKind::LParen, ExprState::Beg);
                }
                self.cmd_start = true;
                return;
            }
            ')' => {
                self.bump();
                let closes_params = self.def_params == DefParams::Paren(self.paren_depth);
                self.paren_depth = self.paren_depth.saturating_sub(1);
                if closes_params {
                    self.def_params = DefParams::None;
                    self.push(TokenKind::RParen, ExprState::EndFn);
                } else {
                    self.push(TokenKind::RParen, ExprState::EndArg);
                }
                return;
            }
            '{' => {
                self.bump();
                let block = matches!(
                    self.state,
                    ExprState::Arg | ExprState::CmdArg | ExprState::End | ExprState::EndArg
                );
                if block {
                    self.push(TokenKind::LBraceBlock, ExprState::Beg);
                    self.block_params = BlockParams::Pending;
                    self.cmd_start = true;
                } else {
                    self.push(TokenKind::LBrace, ExprState::Beg);
                }
                return;
            }
            ';' => {
                self.bump();
                if self.def_params == DefParams::Bare || self.def_params == DefParams::AfterName {
                    self.def_params = DefParams::None;
                }
                self.push(TokenKind::Semicolon, ExprState::Terminated);
                self.cmd_start = true;
                return;
            }
            '.' => {
                if self.starts_with("...") {
                    (TokenKind::DotDotDot, 3, ExprState::Beg)
                } else if self.starts_with("..") {
                    (TokenKind::DotDot, 2, ExprState::Beg)
                } else if self.state == ExprState::Fname
                    && self.last_kind() == Some(&TokenKind::KwSelf)
                {
                    (TokenKind::Dot, 1, ExprState::Fname)
                } else {
                    (TokenKind::Dot, 1, ExprState::Dot)
                }
            }
            ']' => (TokenKind::RBracket, 1, ExprState::End),
            '[' => (TokenKind::LBracket, 1, ExprState::Beg),
            '}' => (TokenKind::RBrace, 1, ExprState::End),
            ',' => (TokenKind::Comma, 1, ExprState::Beg),
            '?' => (TokenKind::Question, 1, ExprState::Value),
            '~' => (TokenKind::Tilde, 1, ExprState::Beg),
            '^' => {
                if self.starts_with("^=") {
                    (TokenKind::OpAssign("^".into()), 2, ExprState::Beg)
                } else {
                    (TokenKind::Caret, 1, ExprState::Beg)
                }
            }
            '=' => {
                if self.starts_with("===") {
                    (TokenKind::EqEqEq, 3, ExprState::Beg)
                } else if self.starts_with("==") {
                    (TokenKind::EqEq, 2, ExprState::Beg)
                } else if self.starts_with("=~") {
                    (TokenKind::Match, 2, ExprState::Beg)
                } else if self.starts_with("=>") {
                    (TokenKind::Arrow, 2, ExprState::Beg)
                } else {
                    (TokenKind::Assign, 1, ExprState::Beg)
                }
            }
            '!' => {
                if self.starts_with("!=") {
                    (TokenKind::NotEq, 2, ExprState::Beg)
                } else if self.starts_with("!~") {
                    (TokenKind::NotMatch, 2, ExprState::Beg)
                } else {
                    (TokenKind::Bang, 1, ExprState::Beg)
                }
            }
            '>' => {
                if self.starts_with(">>=") {
                    (TokenKind::OpAssign(">>".into()), 3, ExprState::Beg)
                } else if self.starts_with(">=") {
                    (TokenKind::Ge, 2, ExprState::Beg)
                } else if self.starts_with(">>") {
                    (TokenKind::Shr, 2, ExprState::Beg)
                } else {
                    (TokenKind::Gt, 1, ExprState::Beg)
                }
            }
            '+' => {
                if self.starts_with("+=") {
                    (TokenKind::OpAssign("+".into()), 2, ExprState::Beg)
                } else if self.operand_may_start() {
                    (TokenKind::UPlus, 1, ExprState::Beg)
                } else {
                    (TokenKind::Plus, 1, ExprState::Beg)
                }
            }
            '-' => {
                if self.starts_with("-=") {
                    (TokenKind::OpAssign("-".into()), 2, ExprState::Beg)
                } else if self.operand_may_start() {
                    (TokenKind::UMinus, 1, ExprState::Beg)
                } else {
                    (TokenKind::Minus, 1, ExprState::Beg)
                }
            }
            '*' => {
                if self.starts_with("**=") {
                    (TokenKind::OpAssign("**".into()), 3, ExprState::Beg)
                } else if self.starts_with("**") {
                    (TokenKind::Pow, 2, ExprState::Beg)
                } else if self.starts_with("*=") {
                    (TokenKind::OpAssign("*".into()), 2, ExprState::Beg)
                } else {
                    (TokenKind::Star, 1, ExprState::Beg)
                }
            }
            '&' => {
                if self.starts_with("&&=") {
                    (TokenKind::OpAssign("&&".into()), 3, ExprState::Beg)
                } else if self.starts_with("&&") {
                    (TokenKind::AndAnd, 2, ExprState::Beg)
                } else if self.starts_with("&=") {
                    (TokenKind::OpAssign("&".into()), 2, ExprState::Beg)
                } else {
                    (TokenKind::Amp, 1, ExprState::Beg)
                }
            }
            c => {
                self.fail(LexError::UnexpectedChar { ch: c, position });
                return;
            }
        };
        self.bump_n(width);
        self.push(kind, next);
    }
}

#[inline]
fn is_ident_start(c: char) -> bool {
    c == '_' || unicode_ident::is_xid_start(c)
}

#[inline]
fn is_ident_char(c: char) -> bool {
    unicode_ident::is_xid_continue(c)
}

/// Removes the common leading indentation of the non-blank lines (`<<~`).
fn dedent(raw: &str) -> String {
    let indent = raw
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.len() - line.trim_start_matches([' ', '\t']).len())
        .min()
        .unwrap_or(0);
    raw.split_inclusive('\n')
        .map(|line| {
            let strip = indent.min(line.len() - line.trim_start_matches([' ', '\t']).len());
            &line[strip..]
        })
        .collect()
}

/// Finds the `}` closing an interpolation that starts at `start`.
fn interpolation_end(
    text: &str,
    start: usize,
) -> Option<usize> {
    let mut depth = 1usize;
    let mut chars = text[start..].char_indices();
    while let Some((i, c)) = chars.next() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(start + i);
                }
            }
            '\\' => {
                chars.next();
            }
            '"' | '\'' => loop {
                match chars.next() {
                    Some((_, '\\')) => {
                        chars.next();
                    }
                    Some((_, q)) if q == c => break,
                    Some(_) => {}
                    None => return None,
                }
            },
            _ => {}
        }
    }
    None
}

fn flush(
    parts: &mut Vec<StrPart>,
    buf: &mut String,
) {
    if !buf.is_empty() {
        parts.push(StrPart::Lit(std::mem::take(buf)));
    }
}

/// Scans a quoted body from `from`. With `term == None` the whole rest of
/// `text` is the body (heredocs). Errors carry the offending escape.
fn scan_quoted(
    text: &str,
    from: usize,
    term: Option<char>,
    interpolate: bool,
    regexp: bool,
) -> Result<Scanned, String> {
    let mut parts = Vec::new();
    let mut buf = String::new();
    let mut chars = text[from..].char_indices().peekable();

    while let Some((i, ch)) = chars.next() {
        let at = from + i;
        if Some(ch) == term {
            flush(&mut parts, &mut buf);
            return Ok(Scanned {
                parts,
                end: at + ch.len_utf8(),
                closed: true,
            });
        }
        match ch {
            '\\' => {
                let Some((_, esc)) = chars.next() else { break };
                if regexp {
                    if Some(esc) != term {
                        buf.push('\\');
                    }
                    buf.push(esc);
                    continue;
                }
                if !interpolate {
                    if esc != '\\' && Some(esc) != term {
                        buf.push('\\');
                    }
                    buf.push(esc);
                    continue;
                }
                match esc {
                    'n' => buf.push('\n'),
                    't' => buf.push('\t'),
                    'r' => buf.push('\r'),
                    '0' => buf.push('\0'),
                    's' => buf.push(' '),
                    'e' => buf.push('\x1b'),
                    'a' => buf.push('\x07'),
                    'b' => buf.push('\x08'),
                    'v' => buf.push('\x0b'),
                    'f' => buf.push('\x0c'),
                    '\n' => {}
                    'u' => {
                        let mut hex = String::new();
                        if chars.peek().map(|(_, c)| *c) == Some('{') {
                            chars.next();
                            loop {
                                match chars.next() {
                                    Some((_, '}')) => break,
                                    Some((_, c)) if c.is_ascii_hexdigit() => hex.push(c),
                                    _ => return Err(format!("u{{{}", hex)),
                                }
                            }
                        } else {
                            for _ in 0..4 {
                                match chars.next() {
                                    Some((_, c)) if c.is_ascii_hexdigit() => hex.push(c),
                                    _ => return Err(format!("u{}", hex)),
                                }
                            }
                        }
                        let decoded = u32::from_str_radix(&hex, 16)
                            .ok()
                            .and_then(char::from_u32)
                            .ok_or_else(|| format!("u{}", hex))?;
                        buf.push(decoded);
                    }
                    'x' => {
                        let mut hex = String::new();
                        while hex.len() < 2 {
                            match chars.peek() {
                                Some((_, c)) if c.is_ascii_hexdigit() => {
                                    hex.push(*c);
                                    chars.next();
                                }
                                _ => break,
                            }
                        }
                        let byte = u8::from_str_radix(&hex, 16).map_err(|_| "x".to_string())?;
                        buf.push(char::from(byte));
                    }
                    other => buf.push(other),
                }
            }
            '#' if interpolate && chars.peek().map(|(_, c)| *c) == Some('{') => {
                chars.next();
                flush(&mut parts, &mut buf);
                let code_start = at + 2;
                let Some(code_end) = interpolation_end(text, code_start) else {
                    return Ok(Scanned {
                        parts,
                        end: text.len(),
                        closed: false,
                    });
                };
                parts.push(StrPart::Code(text[code_start..code_end].to_string()));
                while matches!(chars.peek(), Some((j, _)) if from + j <= code_end) {
                    chars.next();
                }
            }
            _ => buf.push(ch),
        }
    }

    flush(&mut parts, &mut buf);
    Ok(Scanned {
        parts,
        end: text.len(),
        closed: term.is_none(),
    })
}

#[cfg(test)]
mod tests;
