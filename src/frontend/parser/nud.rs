//! Prefix expression parsing (nud - null denotation)

use super::ast::*;
use super::state::*;
use super::ParseError;
use crate::frontend::lexer::{self, StrPart, TokenKind};
use crate::util::span::Span;
use std::rc::Rc;

impl<'a> ParserState<'a> {
    /// Parse an expression whose operators bind at least as tight as `min_bp`.
    pub fn parse_expression(
        &mut self,
        min_bp: u8,
    ) -> PResult<Expr> {
        let mut lhs = self.parse_prefix()?;
        loop {
            if matches!(self.kind(), TokenKind::Assign | TokenKind::OpAssign(_))
                && is_assignable(&lhs)
            {
                lhs = self.parse_assignment(lhs)?;
                continue;
            }
            let Some((lbp, rbp)) = self.infix_info() else {
                break;
            };
            if lbp < min_bp {
                break;
            }
            lhs = self.parse_infix(lhs, rbp)?;
        }
        Ok(lhs)
    }

    fn parse_prefix(&mut self) -> PResult<Expr> {
        let token = self.current().clone();
        let span = token.span;
        let simple = |kind| Ok(Expr::new(kind, span));
        match token.kind {
            TokenKind::Int(v) => {
                self.bump();
                simple(ExprKind::Int(v))
            }
            TokenKind::Float(v) => {
                self.bump();
                simple(ExprKind::Float(v))
            }
            TokenKind::Str(parts) => {
                self.bump();
                let segments = self.interpolate(&parts, span)?;
                simple(ExprKind::Str(segments))
            }
            TokenKind::DSymbol(parts) => {
                self.bump();
                let segments = self.interpolate(&parts, span)?;
                simple(ExprKind::DSym(segments))
            }
            TokenKind::Symbol(name) => {
                self.bump();
                simple(ExprKind::Sym(name))
            }
            TokenKind::Regexp { parts, flags } => {
                self.bump();
                let parts = self.interpolate(&parts, span)?;
                simple(ExprKind::Regexp { parts, flags })
            }
            TokenKind::Words { items, symbols } => {
                self.bump();
                let elements = items
                    .into_iter()
                    .map(|word| {
                        let kind = if symbols {
                            ExprKind::Sym(word)
                        } else {
                            ExprKind::Str(vec![StrSegment::Lit(word)])
                        };
                        Arg::Expr(Expr::new(kind, span))
                    })
                    .collect();
                simple(ExprKind::Array(elements))
            }
            TokenKind::KwNil => {
                self.bump();
                simple(ExprKind::Nil)
            }
            TokenKind::KwTrue => {
                self.bump();
                simple(ExprKind::True)
            }
            TokenKind::KwFalse => {
                self.bump();
                simple(ExprKind::False)
            }
            TokenKind::KwSelf => {
                self.bump();
                simple(ExprKind::SelfRef)
            }
            TokenKind::IVar(name) => {
                self.bump();
                simple(ExprKind::IVar(name))
            }
            TokenKind::GVar(name) => {
                self.bump();
                simple(ExprKind::GVar(name))
            }
            TokenKind::Const(name) => {
                self.bump();
                if self.at(&TokenKind::LParen) && !self.current().spaced {
                    let (args, pass) = self.parse_paren_args()?;
                    let block = self.parse_block_opt(pass)?;
                    return Ok(self.call(None, name, args, block, false, span));
                }
                simple(ExprKind::Const { scope: None, name })
            }
            TokenKind::Ident(name) => {
                self.bump();
                self.parse_identifier(name, span)
            }
            TokenKind::UMinus => {
                self.bump();
                self.parse_negative(span)
            }
            TokenKind::UPlus => {
                self.bump();
                let operand = self.parse_expression(BP_UMINUS)?;
                Ok(self.call(Some(operand), "+@".into(), Vec::new(), None, false, span))
            }
            TokenKind::Bang => {
                self.bump();
                let operand = self.parse_expression(BP_UNARY)?;
                let span = self.span_from(span);
                Ok(Expr::new(ExprKind::Not(Box::new(operand)), span))
            }
            TokenKind::Tilde => {
                self.bump();
                let operand = self.parse_expression(BP_UNARY)?;
                Ok(self.call(Some(operand), "~".into(), Vec::new(), None, false, span))
            }
            TokenKind::KwNot => self.parse_not_operand(),
            TokenKind::LParen => self.parse_group(),
            TokenKind::LBracket => self.parse_array_literal(),
            TokenKind::LBrace => self.parse_hash_literal(),
            TokenKind::KwIf => self.parse_if(false),
            TokenKind::KwUnless => self.parse_if(true),
            TokenKind::KwWhile => self.parse_while(false),
            TokenKind::KwUntil => self.parse_while(true),
            TokenKind::KwCase => self.parse_case(),
            TokenKind::KwBegin => self.parse_begin(),
            TokenKind::KwDef => self.parse_def(),
            TokenKind::KwClass | TokenKind::KwModule => self.parse_class(),
            TokenKind::KwReturn => self.parse_return(),
            TokenKind::KwBreak => self.parse_jump("break"),
            TokenKind::KwNext => self.parse_jump("next"),
            TokenKind::KwYield => self.parse_yield(),
            TokenKind::KwSuper => self.parse_super(),
            _ => Err(self.unexpected(None)),
        }
    }

    /// `-` in operand position: folds into a literal unless `**` follows.
    fn parse_negative(
        &mut self,
        start: Span,
    ) -> PResult<Expr> {
        let folds = !self.current().spaced && self.peek_nth(1).kind != TokenKind::Pow;
        match self.kind().clone() {
            TokenKind::Int(v) if folds => {
                self.bump();
                Ok(Expr::new(ExprKind::Int(-v), self.span_from(start)))
            }
            TokenKind::Float(v) if folds => {
                self.bump();
                Ok(Expr::new(ExprKind::Float(-v), self.span_from(start)))
            }
            _ => {
                let operand = self.parse_expression(BP_UMINUS)?;
                Ok(self.call(Some(operand), "-@".into(), Vec::new(), None, false, start))
            }
        }
    }

    fn parse_identifier(
        &mut self,
        name: String,
        span: Span,
    ) -> PResult<Expr> {
        let paren_call = self.at(&TokenKind::LParen) && !self.current().spaced;
        if self.is_local(&name) && !paren_call {
            return Ok(Expr::new(ExprKind::LocalVar(name), span));
        }
        if paren_call {
            let (args, pass) = self.parse_paren_args()?;
            let block = self.parse_block_opt(pass)?;
            return Ok(self.call(None, name, args, block, false, span));
        }
        if self.command_arg_start() {
            let (args, pass) = self.without_do_block(|p| p.parse_arg_list(None))?;
            let block = self.parse_block_opt(pass)?;
            return Ok(self.call(None, name, args, block, false, span));
        }
        let block = self.parse_block_opt(None)?;
        let vcall = block.is_none();
        Ok(self.call(None, name, Vec::new(), block, vcall, span))
    }

    pub(crate) fn call(
        &self,
        recv: Option<Expr>,
        name: String,
        args: Vec<Arg>,
        block: Option<BlockArg>,
        vcall: bool,
        start: Span,
    ) -> Expr {
        let start = recv.as_ref().map_or(start, |r| r.span);
        Expr::new(
            ExprKind::Call(Box::new(CallExpr {
                recv,
                name,
                args,
                block,
                vcall,
            })),
            self.span_from(start),
        )
    }

    /// The token at the cursor starts an unparenthesized argument.
    pub(crate) fn command_arg_start(&self) -> bool {
        let token = self.current();
        if !token.spaced {
            return false;
        }
        match token.kind {
            TokenKind::Int(_)
            | TokenKind::Float(_)
            | TokenKind::Str(_)
            | TokenKind::Symbol(_)
            | TokenKind::DSymbol(_)
            | TokenKind::Regexp { .. }
            | TokenKind::Words { .. }
            | TokenKind::Ident(_)
            | TokenKind::Const(_)
            | TokenKind::IVar(_)
            | TokenKind::GVar(_)
            | TokenKind::Label(_)
            | TokenKind::KwNil
            | TokenKind::KwTrue
            | TokenKind::KwFalse
            | TokenKind::KwSelf
            | TokenKind::KwDef
            | TokenKind::KwYield
            | TokenKind::KwSuper
            | TokenKind::UMinus
            | TokenKind::UPlus
            | TokenKind::Bang
            | TokenKind::Tilde
            | TokenKind::LBracket
            | TokenKind::LParen => true,
            TokenKind::Star | TokenKind::Amp => !self.peek_nth(1).spaced,
            _ => false,
        }
    }

    /// `( args )` right after a method name.
    pub(crate) fn parse_paren_args(&mut self) -> PResult<(Vec<Arg>, Option<Expr>)> {
        self.bump();
        let parsed = self.with_do_block(|p| p.parse_arg_list(Some(&TokenKind::RParen)))?;
        self.expect(&TokenKind::RParen, "')'")?;
        Ok(parsed)
    }

    /// Comma separated arguments. `label: v` and `k => v` pairs are gathered
    /// into one trailing hash. Returns the arguments and any `&block` argument.
    pub(crate) fn parse_arg_list(
        &mut self,
        close: Option<&TokenKind>,
    ) -> PResult<(Vec<Arg>, Option<Expr>)> {
        let mut args = Vec::new();
        let mut pairs = Vec::new();
        let mut pass = None;
        let start = self.current().span;
        loop {
            if let Some(close) = close {
                self.skip_newlines();
                if self.at(close) {
                    break;
                }
            }
            match self.kind().clone() {
                TokenKind::Star => {
                    self.bump();
                    args.push(Arg::Splat(self.parse_expression(BP_OROR)?));
                }
                TokenKind::Amp => {
                    self.bump();
                    pass = Some(self.parse_expression(BP_OROR)?);
                }
                TokenKind::Label(name) => {
                    let span = self.bump().span;
                    self.skip_newlines();
                    let value = self.parse_expression(BP_LOWEST)?;
                    pairs.push((Expr::new(ExprKind::Sym(name), span), value));
                }
                _ => {
                    let expr = self.parse_expression(BP_LOWEST)?;
                    if self.eat(&TokenKind::Arrow) {
                        self.skip_newlines();
                        let value = self.parse_expression(BP_LOWEST)?;
                        pairs.push((expr, value));
                    } else {
                        args.push(Arg::Expr(expr));
                    }
                }
            }
            if close.is_some() {
                self.skip_newlines();
            }
            if pass.is_some() || !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        if !pairs.is_empty() {
            let span = self.span_from(start);
            args.push(Arg::Expr(Expr::new(ExprKind::Hash(pairs), span)));
        }
        Ok((args, pass))
    }

    /// Attach a `{ }` or `do end` block, merging with a `&block` argument.
    pub(crate) fn parse_block_opt(
        &mut self,
        pass: Option<Expr>,
    ) -> PResult<Option<BlockArg>> {
        let span = self.current().span;
        let literal = if self.at(&TokenKind::LBraceBlock) {
            Some(self.parse_brace_block()?)
        } else if self.at(&TokenKind::KwDo) && self.do_block_allowed() {
            Some(self.parse_do_block()?)
        } else {
            None
        };
        match (pass, literal) {
            (Some(_), Some(_)) => Err(self.invalid("both block arg and actual block given", span)),
            (Some(pass), None) => Ok(Some(BlockArg::Pass(Box::new(pass)))),
            (None, Some(block)) => Ok(Some(BlockArg::Literal(block))),
            (None, None) => Ok(None),
        }
    }

    fn parse_brace_block(&mut self) -> PResult<Rc<BlockDef>> {
        let start = self.bump().span;
        self.push_scope(false);
        self.push_jump(JumpContext::Block);
        let params = self.parse_block_params()?;
        let body = self.with_do_block(|p| p.parse_stmts(&[TokenKind::RBrace]))?;
        self.expect(&TokenKind::RBrace, "'}'")?;
        self.pop_jump();
        self.pop_scope();
        Ok(Rc::new(BlockDef {
            params,
            body,
            span: self.span_from(start),
        }))
    }

    fn parse_do_block(&mut self) -> PResult<Rc<BlockDef>> {
        let start = self.bump().span;
        self.push_scope(false);
        self.push_jump(JumpContext::Block);
        let params = self.parse_block_params()?;
        let block = self.with_do_block(|p| p.parse_begin_body())?;
        self.expect_end()?;
        self.pop_jump();
        self.pop_scope();
        let span = self.span_from(start);
        let body = if block.rescues.is_empty() && block.else_body.is_none() && block.ensure.is_none()
        {
            block.body
        } else {
            vec![Expr::new(ExprKind::Begin(Box::new(block)), span)]
        };
        Ok(Rc::new(BlockDef { params, body, span }))
    }

    fn parse_block_params(&mut self) -> PResult<Params> {
        if !self.eat(&TokenKind::Pipe) {
            return Ok(Params::default());
        }
        if self.eat(&TokenKind::Pipe) {
            return Ok(Params::default());
        }
        let params = self.parse_param_list(None)?;
        self.expect(&TokenKind::Pipe, "'|'")?;
        Ok(params)
    }

    /// Parameter names for `def` and blocks. `close` is the bracket when the
    /// list is parenthesized; newlines are skipped inside it.
    pub(crate) fn parse_param_list(
        &mut self,
        close: Option<&TokenKind>,
    ) -> PResult<Params> {
        let mut params = Params::default();
        loop {
            if close.is_some() {
                self.skip_newlines();
            }
            let token = self.current().clone();
            match token.kind {
                TokenKind::Ident(name) => {
                    self.bump();
                    self.declare(&name);
                    if self.eat(&TokenKind::Assign) {
                        let default = self.parse_expression(BP_TERNARY)?;
                        params.optional.push((name, default));
                    } else if !params.optional.is_empty() || params.rest.is_some() {
                        return Err(self.invalid(
                            "required arguments after optional arguments are not supported",
                            token.span,
                        ));
                    } else {
                        params.required.push(name);
                    }
                }
                TokenKind::Star | TokenKind::Amp => {
                    self.bump();
                    let TokenKind::Ident(name) = self.kind().clone() else {
                        return Err(self.unexpected(Some("parameter name")));
                    };
                    self.bump();
                    self.declare(&name);
                    if token.kind == TokenKind::Star {
                        params.rest = Some(name);
                    } else {
                        params.block = Some(name);
                    }
                }
                TokenKind::Label(_) => {
                    return Err(self.invalid("keyword arguments are not supported", token.span));
                }
                _ => return Err(self.unexpected(Some("parameter name"))),
            }
            if close.is_some() {
                self.skip_newlines();
            }
            if params.block.is_some() || !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        Ok(params)
    }

    fn parse_group(&mut self) -> PResult<Expr> {
        let start = self.bump().span;
        let body = self.with_do_block(|p| {
            p.skip_terms();
            p.parse_stmts(&[TokenKind::RParen])
        })?;
        self.expect(&TokenKind::RParen, "')'")?;
        let span = self.span_from(start);
        let mut body = body;
        match body.len() {
            0 => Ok(Expr::new(ExprKind::Nil, span)),
            1 => Ok(body.remove(0)),
            _ => Ok(Expr::new(ExprKind::Seq(body), span)),
        }
    }

    fn parse_array_literal(&mut self) -> PResult<Expr> {
        let start = self.bump().span;
        let (args, pass) = self.with_do_block(|p| p.parse_arg_list(Some(&TokenKind::RBracket)))?;
        if pass.is_some() {
            return Err(self.invalid("block argument should not be given", start));
        }
        self.expect(&TokenKind::RBracket, "']'")?;
        Ok(Expr::new(ExprKind::Array(args), self.span_from(start)))
    }

    fn parse_hash_literal(&mut self) -> PResult<Expr> {
        let start = self.bump().span;
        let pairs = self.with_do_block(|p| {
            let mut pairs = Vec::new();
            loop {
                p.skip_newlines();
                if p.at(&TokenKind::RBrace) {
                    break;
                }
                let key = if let TokenKind::Label(name) = p.kind().clone() {
                    let span = p.bump().span;
                    Expr::new(ExprKind::Sym(name), span)
                } else {
                    let key = p.parse_expression(BP_LOWEST)?;
                    p.expect(&TokenKind::Arrow, "'=>'")?;
                    key
                };
                p.skip_newlines();
                let value = p.parse_expression(BP_LOWEST)?;
                pairs.push((key, value));
                p.skip_newlines();
                if !p.eat(&TokenKind::Comma) {
                    break;
                }
            }
            p.skip_newlines();
            Ok(pairs)
        })?;
        self.expect(&TokenKind::RBrace, "'}'")?;
        Ok(Expr::new(ExprKind::Hash(pairs), self.span_from(start)))
    }

    fn interpolate(
        &mut self,
        parts: &[StrPart],
        span: Span,
    ) -> PResult<Vec<StrSegment>> {
        parts
            .iter()
            .map(|part| match part {
                StrPart::Lit(text) => Ok(StrSegment::Lit(text.clone())),
                StrPart::Code(code) => self.parse_interpolation(code, span).map(StrSegment::Code),
            })
            .collect()
    }

    /// Parse the body of `#{...}` with the locals visible here.
    fn parse_interpolation(
        &mut self,
        code: &str,
        span: Span,
    ) -> PResult<Body> {
        let locals = self.visible_locals();
        let lexed = lexer::tokenize(code, &locals);
        if let Some(error) = lexed.error {
            return Err(ParseError::Lex(error));
        }
        if lexed.in_literal {
            return Err(self.invalid("unterminated string meets end of interpolation", span));
        }
        let mut inner = ParserState::new(&lexed.tokens, &locals);
        match inner.parse_program() {
            Ok(program) => {
                self.add_invalid_jumps(program.invalid_jumps);
                Ok(program.body)
            }
            Err(error) => Err(error.inside_interpolation()),
        }
    }
}

/// Expressions that may appear left of `=`. Literals like `self` are
/// accepted here so the assignment reports a precise error.
fn is_assignable(expr: &Expr) -> bool {
    match &expr.kind {
        ExprKind::LocalVar(_)
        | ExprKind::IVar(_)
        | ExprKind::GVar(_)
        | ExprKind::Const { scope: None, .. }
        | ExprKind::SelfRef
        | ExprKind::Nil
        | ExprKind::True
        | ExprKind::False => true,
        ExprKind::Call(call) => {
            call.block.is_none()
                && (call.vcall
                    || (call.recv.is_some() && call.name == "[]")
                    || (call.recv.is_some() && call.args.is_empty() && is_attr_name(&call.name)))
        }
        _ => false,
    }
}

pub(crate) fn is_attr_name(name: &str) -> bool {
    name.chars().next().is_some_and(|c| c == '_' || c.is_alphabetic())
        && !name.ends_with(['?', '!', '='])
}
