//! Abstract Syntax Tree types

use crate::util::span::Span;
use std::collections::HashSet;
use std::rc::Rc;

/// Statement list
pub type Body = Vec<Expr>;

/// Expression node
#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    #[inline]
    pub fn new(
        kind: ExprKind,
        span: Span,
    ) -> Self {
        Self { kind, span }
    }
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    Nil,
    True,
    False,
    SelfRef,
    Int(i64),
    Float(f64),
    Str(Vec<StrSegment>),
    Sym(String),
    DSym(Vec<StrSegment>),
    Regexp {
        parts: Vec<StrSegment>,
        flags: String,
    },
    Array(Vec<Arg>),
    Hash(Vec<(Expr, Expr)>),
    Range {
        lo: Box<Expr>,
        hi: Box<Expr>,
        exclusive: bool,
    },
    LocalVar(String),
    IVar(String),
    GVar(String),
    Const {
        scope: Option<Box<Expr>>,
        name: String,
    },
    Assign {
        target: Box<Target>,
        value: Box<Expr>,
    },
    /// `target op= value`; `op` is the operator without `=`.
    OpAssign {
        target: Box<Target>,
        op: String,
        value: Box<Expr>,
    },
    Call(Box<CallExpr>),
    /// `super` with `args: None` forwards the current arguments.
    Super {
        args: Option<Vec<Arg>>,
        block: Option<BlockArg>,
    },
    Yield(Vec<Arg>),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    If {
        cond: Box<Expr>,
        then_body: Body,
        else_body: Body,
    },
    While {
        cond: Box<Expr>,
        body: Body,
        until: bool,
        /// `begin ... end while cond` runs the body first.
        do_while: bool,
    },
    Case {
        subject: Option<Box<Expr>>,
        whens: Vec<WhenClause>,
        else_body: Option<Body>,
    },
    Begin(Box<BeginBlock>),
    Seq(Body),
    Def(Rc<MethodDef>),
    Class(Rc<ClassDef>),
    Return(Option<Box<Expr>>),
    Break(Option<Box<Expr>>, JumpTarget),
    Next(Option<Box<Expr>>, JumpTarget),
}

/// Piece of an interpolated literal
#[derive(Debug, Clone)]
pub enum StrSegment {
    Lit(String),
    Code(Body),
}

/// Call argument
#[derive(Debug, Clone)]
pub enum Arg {
    Expr(Expr),
    Splat(Expr),
}

#[derive(Debug, Clone)]
pub struct CallExpr {
    pub recv: Option<Expr>,
    pub name: String,
    pub args: Vec<Arg>,
    pub block: Option<BlockArg>,
    /// Bare identifier with no receiver, arguments or parentheses.
    pub vcall: bool,
}

#[derive(Debug, Clone)]
pub enum BlockArg {
    Literal(Rc<BlockDef>),
    /// `&expr`
    Pass(Box<Expr>),
}

#[derive(Debug)]
pub struct BlockDef {
    pub params: Params,
    pub body: Body,
    pub span: Span,
}

#[derive(Debug, Clone, Default)]
pub struct Params {
    pub required: Vec<String>,
    pub optional: Vec<(String, Expr)>,
    pub rest: Option<String>,
    pub block: Option<String>,
}

impl Params {
    pub fn is_empty(&self) -> bool {
        self.required.is_empty()
            && self.optional.is_empty()
            && self.rest.is_none()
            && self.block.is_none()
    }
}

#[derive(Debug)]
pub struct MethodDef {
    pub name: String,
    /// `def self.name`
    pub singleton: bool,
    pub params: Params,
    pub body: BeginBlock,
    pub span: Span,
}

#[derive(Debug)]
pub struct ClassDef {
    pub name: String,
    /// `module` rather than `class`
    pub module: bool,
    pub superclass: Option<Expr>,
    pub body: Body,
    pub span: Span,
}

#[derive(Debug, Clone, Default)]
pub struct BeginBlock {
    pub body: Body,
    pub rescues: Vec<RescueClause>,
    pub else_body: Option<Body>,
    pub ensure: Option<Body>,
}

#[derive(Debug, Clone)]
pub struct RescueClause {
    /// Empty means `StandardError`.
    pub classes: Vec<Expr>,
    pub var: Option<String>,
    pub body: Body,
}

#[derive(Debug, Clone)]
pub struct WhenClause {
    pub values: Vec<Arg>,
    pub body: Body,
}

/// Assignable place
#[derive(Debug, Clone)]
pub enum Target {
    Local(String),
    IVar(String),
    GVar(String),
    Const(String),
    Index { recv: Expr, args: Vec<Arg> },
    Attr { recv: Expr, name: String },
}

/// What a `break`/`next` leaves, resolved from the enclosing construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JumpTarget {
    Loop,
    Block,
    /// Not inside a loop or block.
    Invalid,
}

/// Parsed statement list
#[derive(Debug, Clone, Default)]
pub struct Program {
    pub body: Body,
    /// `break`/`next` keywords with nothing to leave.
    pub invalid_jumps: Vec<(&'static str, Span)>,
    /// Top-level locals, including ones assigned only on untaken branches.
    pub locals: HashSet<String>,
}
