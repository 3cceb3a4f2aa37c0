//! Token types

use crate::util::span::Span;

/// Piece of a string-like literal: raw text or an interpolated `#{...}` body.
#[derive(Debug, Clone, PartialEq)]
pub enum StrPart {
    Lit(String),
    Code(String),
}

/// Token kind
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Keywords
    KwIf,
    KwUnless,
    KwElsif,
    KwElse,
    KwThen,
    KwWhile,
    KwUntil,
    KwDo,
    KwEnd,
    KwDef,
    KwClass,
    KwModule,
    KwReturn,
    KwBreak,
    KwNext,
    KwYield,
    KwSuper,
    KwSelf,
    KwNil,
    KwTrue,
    KwFalse,
    KwAnd,
    KwOr,
    KwNot,
    KwCase,
    KwWhen,
    KwBegin,
    KwRescue,
    KwEnsure,

    // Names
    Ident(String),
    Const(String),
    IVar(String),
    GVar(String),
    Label(String),

    // Literals
    Int(i64),
    Float(f64),
    Str(Vec<StrPart>),
    Symbol(String),
    DSymbol(Vec<StrPart>),
    Regexp { parts: Vec<StrPart>, flags: String },
    Words { items: Vec<String>, symbols: bool },

    // Operators
    Plus,
    UPlus,
    Minus,
    UMinus,
    Star,
    Pow,
    Slash,
    Percent,
    EqEq,
    EqEqEq,
    NotEq,
    Match,
    NotMatch,
    Lt,
    Gt,
    Le,
    Ge,
    Cmp,
    AndAnd,
    OrOr,
    Bang,
    Tilde,
    Amp,
    Pipe,
    Caret,
    Shl,
    Shr,
    Assign,
    /// Compound assignment; carries the operator without the `=` (`"+"`, `"||"`).
    OpAssign(String),
    Arrow,
    Dot,
    ColonColon,
    Comma,
    Question,
    Colon,
    DotDot,
    DotDotDot,

    // Delimiters
    LParen,
    RParen,
    LBracket,
    RBracket,
    /// `{` opening a hash literal
    LBrace,
    /// `{` opening a block
    LBraceBlock,
    RBrace,
    Semicolon,
    Newline,
    Eof,
}

impl TokenKind {
    /// Short description used in syntax error messages.
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Ident(name) => format!("local variable or method '{}'", name),
            TokenKind::Const(name) => format!("constant '{}'", name),
            TokenKind::IVar(name) => format!("instance variable '{}'", name),
            TokenKind::GVar(name) => format!("global variable '{}'", name),
            TokenKind::Label(name) => format!("label '{}:'", name),
            TokenKind::Int(_) => "integer literal".to_string(),
            TokenKind::Float(_) => "float literal".to_string(),
            TokenKind::Str(_) => "string literal".to_string(),
            TokenKind::Symbol(_) | TokenKind::DSymbol(_) => "symbol literal".to_string(),
            TokenKind::Regexp { .. } => "regexp literal".to_string(),
            TokenKind::Words { .. } => "word list".to_string(),
            TokenKind::OpAssign(op) => format!("'{}='", op),
            TokenKind::Newline => "'\\n'".to_string(),
            TokenKind::Eof => "end-of-input".to_string(),
            other => format!("'{}'", other.symbol()),
        }
    }

    fn symbol(&self) -> &'static str {
        match self {
            TokenKind::KwIf => "if",
            TokenKind::KwUnless => "unless",
            TokenKind::KwElsif => "elsif",
            TokenKind::KwElse => "else",
            TokenKind::KwThen => "then",
            TokenKind::KwWhile => "while",
            TokenKind::KwUntil => "until",
            TokenKind::KwDo => "do",
            TokenKind::KwEnd => "end",
            TokenKind::KwDef => "def",
            TokenKind::KwClass => "class",
            TokenKind::KwModule => "module",
            TokenKind::KwReturn => "return",
            TokenKind::KwBreak => "break",
            TokenKind::KwNext => "next",
            TokenKind::KwYield => "yield",
            TokenKind::KwSuper => "super",
            TokenKind::KwSelf => "self",
            TokenKind::KwNil => "nil",
            TokenKind::KwTrue => "true",
            TokenKind::KwFalse => "false",
            TokenKind::KwAnd => "and",
            TokenKind::KwOr => "or",
            TokenKind::KwNot => "not",
            TokenKind::KwCase => "case",
            TokenKind::KwWhen => "when",
            TokenKind::KwBegin => "begin",
            TokenKind::KwRescue => "rescue",
            TokenKind::KwEnsure => "ensure",
            TokenKind::Plus | TokenKind::UPlus => "+",
            TokenKind::Minus | TokenKind::UMinus => "-",
            TokenKind::Star => "*",
            TokenKind::Pow => "**",
            TokenKind::Slash => "/",
            TokenKind::Percent => "%",
            TokenKind::EqEq => "==",
            TokenKind::EqEqEq => "===",
            TokenKind::NotEq => "!=",
            TokenKind::Match => "=~",
            TokenKind::NotMatch => "!~",
            TokenKind::Lt => "<",
            TokenKind::Gt => ">",
            TokenKind::Le => "<=",
            TokenKind::Ge => ">=",
            TokenKind::Cmp => "<=>",
            TokenKind::AndAnd => "&&",
            TokenKind::OrOr => "||",
            TokenKind::Bang => "!",
            TokenKind::Tilde => "~",
            TokenKind::Amp => "&",
            TokenKind::Pipe => "|",
            TokenKind::Caret => "^",
            TokenKind::Shl => "<<",
            TokenKind::Shr => ">>",
            TokenKind::Assign => "=",
            TokenKind::Arrow => "=>",
            TokenKind::Dot => ".",
            TokenKind::ColonColon => "::",
            TokenKind::Comma => ",",
            TokenKind::Question => "?",
            TokenKind::Colon => ":",
            TokenKind::DotDot => "..",
            TokenKind::DotDotDot => "...",
            TokenKind::LParen => "(",
            TokenKind::RParen => ")",
            TokenKind::LBracket => "[",
            TokenKind::RBracket => "]",
            TokenKind::LBrace | TokenKind::LBraceBlock => "{",
            TokenKind::RBrace => "}",
            TokenKind::Semicolon => ";",
            _ => "?",
        }
    }
}

/// Keyword lookup. Returns `None` for plain identifiers.
pub fn keyword(name: &str) -> Option<TokenKind> {
    let kind = match name {
        "if" => TokenKind::KwIf,
        "unless" => TokenKind::KwUnless,
        "elsif" => TokenKind::KwElsif,
        "else" => TokenKind::KwElse,
        "then" => TokenKind::KwThen,
        "while" => TokenKind::KwWhile,
        "until" => TokenKind::KwUntil,
        "do" => TokenKind::KwDo,
        "end" => TokenKind::KwEnd,
        "def" => TokenKind::KwDef,
        "class" => TokenKind::KwClass,
        "module" => TokenKind::KwModule,
        "return" => TokenKind::KwReturn,
        "break" => TokenKind::KwBreak,
        "next" => TokenKind::KwNext,
        "yield" => TokenKind::KwYield,
        "super" => TokenKind::KwSuper,
        "self" => TokenKind::KwSelf,
        "nil" => TokenKind::KwNil,
        "true" => TokenKind::KwTrue,
        "false" => TokenKind::KwFalse,
        "and" => TokenKind::KwAnd,
        "or" => TokenKind::KwOr,
        "not" => TokenKind::KwNot,
        "case" => TokenKind::KwCase,
        "when" => TokenKind::KwWhen,
        "begin" => TokenKind::KwBegin,
        "rescue" => TokenKind::KwRescue,
        "ensure" => TokenKind::KwEnsure,
        _ => return None,
    };
    Some(kind)
}

/// Token with source location
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    /// Whitespace separated this token from the previous one.
    pub spaced: bool,
}
