//! Statement and compound construct parsing

use super::ast::*;
use super::state::*;
use super::ParseError;
use crate::frontend::lexer::TokenKind;
use crate::util::span::Span;
use std::rc::Rc;

/// Tokens that end a begin/def/do body section
const BODY_ENDS: &[TokenKind] = &[
    TokenKind::KwRescue,
    TokenKind::KwElse,
    TokenKind::KwEnsure,
    TokenKind::KwEnd,
];

impl<'a> ParserState<'a> {
    /// Parse the whole token stream.
    pub fn parse_program(&mut self) -> PResult<Program> {
        let body = self.parse_stmts(&[])?;
        if !self.at_end() {
            return Err(self.unexpected(None));
        }
        Ok(Program {
            body,
            invalid_jumps: self.take_invalid_jumps(),
            locals: self.top_locals(),
        })
    }

    /// Statements up to (not including) one of `ends` or end of input.
    pub fn parse_stmts(
        &mut self,
        ends: &[TokenKind],
    ) -> PResult<Body> {
        let mut body = Vec::new();
        loop {
            self.skip_terms();
            if self.at_end() || ends.iter().any(|t| self.at(t)) {
                break;
            }
            body.push(self.parse_stmt()?);
            if !(self.at_term() || self.at_end() || ends.iter().any(|t| self.at(t))) {
                return Err(self.unexpected(None));
            }
        }
        Ok(body)
    }

    /// One statement with trailing `if`/`unless`/`while`/`until`/`rescue` modifiers.
    pub fn parse_stmt(&mut self) -> PResult<Expr> {
        let mut expr = self.parse_not_expr()?;
        loop {
            let modifier = self.kind().clone();
            let start = expr.span;
            match modifier {
                TokenKind::KwIf | TokenKind::KwUnless => {
                    self.bump();
                    let cond = self.parse_not_expr()?;
                    let (then_body, else_body) = if modifier == TokenKind::KwIf {
                        (vec![expr], Vec::new())
                    } else {
                        (Vec::new(), vec![expr])
                    };
                    expr = Expr::new(
                        ExprKind::If {
                            cond: Box::new(cond),
                            then_body,
                            else_body,
                        },
                        self.span_from(start),
                    );
                }
                TokenKind::KwWhile | TokenKind::KwUntil => {
                    self.bump();
                    let cond = self.parse_not_expr()?;
                    let do_while = matches!(expr.kind, ExprKind::Begin(_));
                    expr = Expr::new(
                        ExprKind::While {
                            cond: Box::new(cond),
                            body: vec![expr],
                            until: modifier == TokenKind::KwUntil,
                            do_while,
                        },
                        self.span_from(start),
                    );
                }
                TokenKind::KwRescue => {
                    self.bump();
                    let fallback = self.parse_not_expr()?;
                    let span = self.span_from(start);
                    expr = match expr.kind {
                        ExprKind::Assign { target, value } => Expr::new(
                            ExprKind::Assign {
                                target,
                                value: Box::new(rescue_modifier(*value, fallback, span)),
                            },
                            span,
                        ),
                        kind => rescue_modifier(Expr::new(kind, start), fallback, span),
                    };
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    /// `a and b`, `a or b`
    pub fn parse_not_expr(&mut self) -> PResult<Expr> {
        let mut lhs = self.parse_not_operand()?;
        loop {
            let and = match self.kind() {
                TokenKind::KwAnd => true,
                TokenKind::KwOr => false,
                _ => break,
            };
            self.bump();
            let rhs = self.parse_not_operand()?;
            let span = self.span_from(lhs.span);
            let kind = if and {
                ExprKind::And(Box::new(lhs), Box::new(rhs))
            } else {
                ExprKind::Or(Box::new(lhs), Box::new(rhs))
            };
            lhs = Expr::new(kind, span);
        }
        Ok(lhs)
    }

    /// `not expr`
    pub(crate) fn parse_not_operand(&mut self) -> PResult<Expr> {
        if self.at(&TokenKind::KwNot) {
            let start = self.bump().span;
            let operand = self.parse_not_operand()?;
            return Ok(Expr::new(
                ExprKind::Not(Box::new(operand)),
                self.span_from(start),
            ));
        }
        self.parse_expression(BP_LOWEST)
    }

    /// Separator after a condition: newline, `;` or `then`.
    fn parse_then(&mut self) -> PResult<()> {
        if self.at_term() {
            self.skip_terms();
            self.eat(&TokenKind::KwThen);
            Ok(())
        } else if self.eat(&TokenKind::KwThen) {
            Ok(())
        } else {
            Err(self.unexpected(Some("'then' or ';' or '\\n'")))
        }
    }

    pub(crate) fn parse_if(
        &mut self,
        negate: bool,
    ) -> PResult<Expr> {
        let start = self.bump().span;
        let mut node = self.parse_if_tail(negate, start)?;
        self.expect_end()?;
        node.span = self.span_from(start);
        Ok(node)
    }

    /// Condition, branches and any `elsif` chain; leaves the final `end`.
    fn parse_if_tail(
        &mut self,
        negate: bool,
        start: Span,
    ) -> PResult<Expr> {
        let cond = self.parse_not_expr()?;
        self.parse_then()?;
        let then_body =
            self.parse_stmts(&[TokenKind::KwElsif, TokenKind::KwElse, TokenKind::KwEnd])?;
        let else_body = if self.at(&TokenKind::KwElsif) {
            let elsif = self.bump().span;
            vec![self.parse_if_tail(false, elsif)?]
        } else if self.eat(&TokenKind::KwElse) {
            self.parse_stmts(&[TokenKind::KwEnd])?
        } else {
            Vec::new()
        };
        let (then_body, else_body) = if negate {
            (else_body, then_body)
        } else {
            (then_body, else_body)
        };
        Ok(Expr::new(
            ExprKind::If {
                cond: Box::new(cond),
                then_body,
                else_body,
            },
            self.span_from(start),
        ))
    }

    pub(crate) fn parse_while(
        &mut self,
        until: bool,
    ) -> PResult<Expr> {
        let start = self.bump().span;
        let cond = self.without_do_block(|p| p.parse_not_expr())?;
        if !self.eat(&TokenKind::KwDo) {
            if !self.at_term() {
                return Err(self.unexpected(Some("'do' or ';' or '\\n'")));
            }
            self.skip_terms();
        }
        self.push_jump(JumpContext::Loop);
        let body = self.with_do_block(|p| p.parse_stmts(&[TokenKind::KwEnd]))?;
        self.pop_jump();
        self.expect_end()?;
        Ok(Expr::new(
            ExprKind::While {
                cond: Box::new(cond),
                body,
                until,
                do_while: false,
            },
            self.span_from(start),
        ))
    }

    pub(crate) fn parse_case(&mut self) -> PResult<Expr> {
        let start = self.bump().span;
        let subject = if self.at_term() {
            None
        } else {
            Some(Box::new(self.parse_not_expr()?))
        };
        self.skip_terms();
        if !self.at(&TokenKind::KwWhen) {
            return Err(self.unexpected(Some("'when'")));
        }
        let mut whens = Vec::new();
        while self.eat(&TokenKind::KwWhen) {
            let mut values = Vec::new();
            loop {
                if self.eat(&TokenKind::Star) {
                    values.push(Arg::Splat(self.parse_expression(BP_OROR)?));
                } else {
                    values.push(Arg::Expr(self.parse_expression(BP_LOWEST)?));
                }
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
            self.parse_then()?;
            let body =
                self.parse_stmts(&[TokenKind::KwWhen, TokenKind::KwElse, TokenKind::KwEnd])?;
            whens.push(WhenClause { values, body });
        }
        let else_body = if self.eat(&TokenKind::KwElse) {
            Some(self.parse_stmts(&[TokenKind::KwEnd])?)
        } else {
            None
        };
        self.expect_end()?;
        Ok(Expr::new(
            ExprKind::Case {
                subject,
                whens,
                else_body,
            },
            self.span_from(start),
        ))
    }

    pub(crate) fn parse_begin(&mut self) -> PResult<Expr> {
        let start = self.bump().span;
        let block = self.parse_begin_body()?;
        self.expect_end()?;
        Ok(Expr::new(
            ExprKind::Begin(Box::new(block)),
            self.span_from(start),
        ))
    }

    /// Body with optional `rescue`, `else` and `ensure` sections; leaves `end`.
    pub(crate) fn parse_begin_body(&mut self) -> PResult<BeginBlock> {
        let body = self.parse_stmts(BODY_ENDS)?;
        let mut rescues = Vec::new();
        while self.eat(&TokenKind::KwRescue) {
            let mut classes = Vec::new();
            while !(self.at_term()
                || self.at_end()
                || self.at(&TokenKind::KwThen)
                || self.at(&TokenKind::Arrow))
            {
                classes.push(self.parse_expression(BP_TERNARY)?);
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
            let var = if self.eat(&TokenKind::Arrow) {
                let TokenKind::Ident(name) = self.kind().clone() else {
                    return Err(self.unexpected(Some("variable name")));
                };
                self.bump();
                self.declare(&name);
                Some(name)
            } else {
                None
            };
            self.parse_then()?;
            let body = self.parse_stmts(BODY_ENDS)?;
            rescues.push(RescueClause { classes, var, body });
        }
        let else_body = if self.eat(&TokenKind::KwElse) {
            Some(self.parse_stmts(&[TokenKind::KwEnsure, TokenKind::KwEnd])?)
        } else {
            None
        };
        let ensure = if self.eat(&TokenKind::KwEnsure) {
            Some(self.parse_stmts(&[TokenKind::KwEnd])?)
        } else {
            None
        };
        Ok(BeginBlock {
            body,
            rescues,
            else_body,
            ensure,
        })
    }

    pub(crate) fn parse_def(&mut self) -> PResult<Expr> {
        let start = self.bump().span;
        let (singleton, name) = self.parse_def_name()?;
        self.push_scope(true);
        self.push_jump(JumpContext::Method);
        self.enter_def();
        let params = if self.at(&TokenKind::LParen) {
            self.bump();
            self.skip_newlines();
            let params = if self.at(&TokenKind::RParen) {
                Params::default()
            } else {
                self.parse_param_list(Some(&TokenKind::RParen))?
            };
            self.expect(&TokenKind::RParen, "')'")?;
            params
        } else if matches!(
            self.kind(),
            TokenKind::Ident(_) | TokenKind::Star | TokenKind::Amp
        ) {
            self.parse_param_list(None)?
        } else {
            Params::default()
        };
        let body = self.with_do_block(|p| p.parse_begin_body())?;
        self.expect_end()?;
        self.leave_def();
        self.pop_jump();
        self.pop_scope();
        let span = self.span_from(start);
        Ok(Expr::new(
            ExprKind::Def(Rc::new(MethodDef {
                name,
                singleton,
                params,
                body,
                span,
            })),
            span,
        ))
    }

    fn parse_def_name(&mut self) -> PResult<(bool, String)> {
        let token = self.current().clone();
        match token.kind {
            TokenKind::KwSelf => {
                self.bump();
                self.expect(&TokenKind::Dot, "'.'")?;
                match self.kind().clone() {
                    TokenKind::Ident(name) | TokenKind::Const(name) => {
                        self.bump();
                        Ok((true, name))
                    }
                    TokenKind::Eof => Err(ParseError::MissingMethodName {
                        span: self.current().span,
                    }),
                    _ => Err(self.unexpected(Some("method name"))),
                }
            }
            TokenKind::Ident(name) | TokenKind::Const(name) => {
                self.bump();
                Ok((false, name))
            }
            TokenKind::Eof => Err(ParseError::MissingMethodName { span: token.span }),
            _ => Err(self.unexpected(Some("method name"))),
        }
    }

    /// `class Name [< Super]` or `module Name`, up to the matching `end`
    pub(crate) fn parse_class(&mut self) -> PResult<Expr> {
        let module = self.kind() == &TokenKind::KwModule;
        let start = self.bump().span;
        if self.in_def() {
            let what = if module { "module" } else { "class" };
            return Err(self.invalid(format!("{} definition in method body", what), start));
        }
        let name = match self.kind().clone() {
            TokenKind::Const(name) => {
                self.bump();
                name
            }
            TokenKind::Ident(_) => {
                return Err(self.invalid("class/module name must be CONSTANT", self.current().span));
            }
            _ => return Err(self.unexpected(Some("constant"))),
        };
        let superclass = if !module && self.eat(&TokenKind::Lt) {
            Some(self.parse_expression(BP_LOWEST)?)
        } else {
            None
        };
        if !self.at_term() {
            return Err(self.unexpected(None));
        }
        self.push_scope(true);
        self.push_jump(JumpContext::Method);
        let body = self.with_do_block(|p| p.parse_stmts(&[TokenKind::KwEnd]))?;
        self.expect_end()?;
        self.pop_jump();
        self.pop_scope();
        let span = self.span_from(start);
        Ok(Expr::new(
            ExprKind::Class(Rc::new(ClassDef {
                name,
                module,
                superclass,
                body,
                span,
            })),
            span,
        ))
    }

    /// A value may follow `return`, `break` or `next` on this line.
    fn value_follows(&self) -> bool {
        !matches!(
            self.kind(),
            TokenKind::Newline
                | TokenKind::Semicolon
                | TokenKind::Eof
                | TokenKind::KwEnd
                | TokenKind::RBrace
                | TokenKind::RParen
                | TokenKind::RBracket
                | TokenKind::Comma
                | TokenKind::Colon
                | TokenKind::KwIf
                | TokenKind::KwUnless
                | TokenKind::KwWhile
                | TokenKind::KwUntil
                | TokenKind::KwRescue
                | TokenKind::KwElse
                | TokenKind::KwElsif
                | TokenKind::KwWhen
                | TokenKind::KwEnsure
                | TokenKind::KwThen
                | TokenKind::KwDo
                | TokenKind::KwAnd
                | TokenKind::KwOr
        )
    }

    fn parse_jump_value(&mut self) -> PResult<Option<Box<Expr>>> {
        if self.value_follows() {
            Ok(Some(Box::new(self.parse_expression(BP_LOWEST)?)))
        } else {
            Ok(None)
        }
    }

    pub(crate) fn parse_return(&mut self) -> PResult<Expr> {
        let start = self.bump().span;
        let value = self.parse_jump_value()?;
        Ok(Expr::new(ExprKind::Return(value), self.span_from(start)))
    }

    pub(crate) fn parse_jump(
        &mut self,
        keyword: &'static str,
    ) -> PResult<Expr> {
        let start = self.bump().span;
        let target = self.jump_target(keyword, start);
        let value = self.parse_jump_value()?;
        let kind = if keyword == "break" {
            ExprKind::Break(value, target)
        } else {
            ExprKind::Next(value, target)
        };
        Ok(Expr::new(kind, self.span_from(start)))
    }

    pub(crate) fn parse_yield(&mut self) -> PResult<Expr> {
        let start = self.bump().span;
        let args = if self.at(&TokenKind::LParen) && !self.current().spaced {
            self.parse_paren_args()?.0
        } else if self.command_arg_start() {
            self.parse_arg_list(None)?.0
        } else {
            Vec::new()
        };
        Ok(Expr::new(ExprKind::Yield(args), self.span_from(start)))
    }

    pub(crate) fn parse_super(&mut self) -> PResult<Expr> {
        let start = self.bump().span;
        let (args, pass) = if self.at(&TokenKind::LParen) && !self.current().spaced {
            let (args, pass) = self.parse_paren_args()?;
            (Some(args), pass)
        } else if self.command_arg_start() {
            let (args, pass) = self.without_do_block(|p| p.parse_arg_list(None))?;
            (Some(args), pass)
        } else {
            (None, None)
        };
        let block = self.parse_block_opt(pass)?;
        Ok(Expr::new(
            ExprKind::Super { args, block },
            self.span_from(start),
        ))
    }
}

fn rescue_modifier(
    body: Expr,
    fallback: Expr,
    span: Span,
) -> Expr {
    Expr::new(
        ExprKind::Begin(Box::new(BeginBlock {
            body: vec![body],
            rescues: vec![RescueClause {
                classes: Vec::new(),
                var: None,
                body: vec![fallback],
            }],
            else_body: None,
            ensure: None,
        })),
        span,
    )
}
