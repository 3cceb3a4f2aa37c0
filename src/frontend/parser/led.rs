//! Infix expression parsing (led - left denotation)

use super::ast::*;
use super::nud::is_attr_name;
use super::state::*;
use crate::frontend::lexer::TokenKind;

/// Method name called by a binary operator token
fn binary_method(kind: &TokenKind) -> Option<&'static str> {
    let name = match kind {
        TokenKind::Plus => "+",
        TokenKind::Minus => "-",
        TokenKind::Star => "*",
        TokenKind::Pow => "**",
        TokenKind::Slash => "/",
        TokenKind::Percent => "%",
        TokenKind::EqEq => "==",
        TokenKind::EqEqEq => "===",
        TokenKind::NotEq => "!=",
        TokenKind::Match => "=~",
        TokenKind::Lt => "<",
        TokenKind::Gt => ">",
        TokenKind::Le => "<=",
        TokenKind::Ge => ">=",
        TokenKind::Cmp => "<=>",
        TokenKind::Amp => "&",
        TokenKind::Pipe => "|",
        TokenKind::Caret => "^",
        TokenKind::Shl => "<<",
        TokenKind::Shr => ">>",
        _ => return None,
    };
    Some(name)
}

impl<'a> ParserState<'a> {
    /// Left and right binding power of the infix operator at the cursor
    #[inline]
    pub(crate) fn infix_info(&self) -> Option<(u8, u8)> {
        let bp = match self.kind() {
            TokenKind::Question => (BP_TERNARY, BP_TERNARY),
            TokenKind::DotDot | TokenKind::DotDotDot => (BP_RANGE, BP_RANGE + 1),
            TokenKind::OrOr => (BP_OROR, BP_OROR + 1),
            TokenKind::AndAnd => (BP_ANDAND, BP_ANDAND + 1),
            TokenKind::EqEq
            | TokenKind::NotEq
            | TokenKind::EqEqEq
            | TokenKind::Cmp
            | TokenKind::Match
            | TokenKind::NotMatch => (BP_EQ, BP_EQ + 1),
            TokenKind::Lt | TokenKind::Gt | TokenKind::Le | TokenKind::Ge => (BP_CMP, BP_CMP + 1),
            TokenKind::Pipe | TokenKind::Caret => (BP_BOR, BP_BOR + 1),
            TokenKind::Amp => (BP_BAND, BP_BAND + 1),
            TokenKind::Shl | TokenKind::Shr => (BP_SHIFT, BP_SHIFT + 1),
            TokenKind::Plus | TokenKind::Minus => (BP_ADD, BP_ADD + 1),
            TokenKind::Star | TokenKind::Slash | TokenKind::Percent => (BP_MUL, BP_MUL + 1),
            // right associative
            TokenKind::Pow => (BP_POW, BP_POW),
            TokenKind::Dot | TokenKind::ColonColon | TokenKind::LBracket => (BP_CALL, BP_CALL + 1),
            _ => return None,
        };
        Some(bp)
    }

    pub(crate) fn parse_infix(
        &mut self,
        lhs: Expr,
        rbp: u8,
    ) -> PResult<Expr> {
        let op = self.bump();
        let start = lhs.span;
        match op.kind {
            TokenKind::Question => {
                let then_expr = self.parse_expression(BP_TERNARY)?;
                self.expect(&TokenKind::Colon, "':'")?;
                let else_expr = self.parse_expression(BP_TERNARY)?;
                Ok(Expr::new(
                    ExprKind::If {
                        cond: Box::new(lhs),
                        then_body: vec![then_expr],
                        else_body: vec![else_expr],
                    },
                    self.span_from(start),
                ))
            }
            TokenKind::DotDot | TokenKind::DotDotDot => {
                // endless: `(1..)`, `a[2..]`
                let hi = if matches!(
                    self.kind(),
                    TokenKind::RParen | TokenKind::RBracket | TokenKind::KwThen
                ) {
                    Expr::new(ExprKind::Nil, op.span)
                } else {
                    self.parse_expression(rbp)?
                };
                Ok(Expr::new(
                    ExprKind::Range {
                        lo: Box::new(lhs),
                        hi: Box::new(hi),
                        exclusive: op.kind == TokenKind::DotDotDot,
                    },
                    self.span_from(start),
                ))
            }
            TokenKind::OrOr => {
                let rhs = self.parse_expression(rbp)?;
                Ok(Expr::new(
                    ExprKind::Or(Box::new(lhs), Box::new(rhs)),
                    self.span_from(start),
                ))
            }
            TokenKind::AndAnd => {
                let rhs = self.parse_expression(rbp)?;
                Ok(Expr::new(
                    ExprKind::And(Box::new(lhs), Box::new(rhs)),
                    self.span_from(start),
                ))
            }
            TokenKind::NotMatch => {
                let rhs = self.parse_expression(rbp)?;
                let matched = self.call(Some(lhs), "=~".into(), vec![Arg::Expr(rhs)], None, false, start);
                Ok(Expr::new(ExprKind::Not(Box::new(matched)), self.span_from(start)))
            }
            TokenKind::Dot => self.parse_method_call(lhs),
            TokenKind::ColonColon => {
                if let TokenKind::Const(name) = self.kind().clone() {
                    let paren_call =
                        self.peek_nth(1).kind == TokenKind::LParen && !self.peek_nth(1).spaced;
                    if !paren_call {
                        self.bump();
                        return Ok(Expr::new(
                            ExprKind::Const {
                                scope: Some(Box::new(lhs)),
                                name,
                            },
                            self.span_from(start),
                        ));
                    }
                }
                self.parse_method_call(lhs)
            }
            TokenKind::LBracket => {
                let (args, pass) =
                    self.with_do_block(|p| p.parse_arg_list(Some(&TokenKind::RBracket)))?;
                self.expect(&TokenKind::RBracket, "']'")?;
                let block = self.parse_block_opt(pass)?;
                Ok(self.call(Some(lhs), "[]".into(), args, block, false, start))
            }
            ref kind => {
                let Some(name) = binary_method(kind) else {
                    return Err(self.unexpected(None));
                };
                let rhs = self.parse_expression(rbp)?;
                Ok(self.call(Some(lhs), name.into(), vec![Arg::Expr(rhs)], None, false, start))
            }
        }
    }

    /// Method name and arguments after `.` or `::`.
    fn parse_method_call(
        &mut self,
        recv: Expr,
    ) -> PResult<Expr> {
        let start = recv.span;
        let name = match self.kind().clone() {
            TokenKind::Ident(name) | TokenKind::Const(name) => {
                self.bump();
                name
            }
            TokenKind::LParen => "call".to_string(),
            _ => return Err(self.unexpected(Some("method name"))),
        };
        let (args, pass) = if self.at(&TokenKind::LParen) && !self.current().spaced {
            self.parse_paren_args()?
        } else if self.command_arg_start() {
            self.without_do_block(|p| p.parse_arg_list(None))?
        } else {
            (Vec::new(), None)
        };
        let block = self.parse_block_opt(pass)?;
        Ok(self.call(Some(recv), name, args, block, false, start))
    }

    /// `lhs = value` and `lhs op= value`. Right associative.
    pub(crate) fn parse_assignment(
        &mut self,
        lhs: Expr,
    ) -> PResult<Expr> {
        let start = lhs.span;
        let op = self.bump();
        let target = self.assign_target(lhs)?;
        let value = self.parse_expression(BP_ASSIGN)?;
        let kind = match op.kind {
            TokenKind::OpAssign(op) => ExprKind::OpAssign {
                target: Box::new(target),
                op,
                value: Box::new(value),
            },
            _ => ExprKind::Assign {
                target: Box::new(target),
                value: Box::new(value),
            },
        };
        Ok(Expr::new(kind, self.span_from(start)))
    }

    fn assign_target(
        &mut self,
        lhs: Expr,
    ) -> PResult<Target> {
        let span = lhs.span;
        match lhs.kind {
            ExprKind::LocalVar(name) => Ok(Target::Local(name)),
            ExprKind::IVar(name) => Ok(Target::IVar(name)),
            ExprKind::GVar(name) => Ok(Target::GVar(name)),
            ExprKind::Const { scope: None, name } => {
                if self.in_def() {
                    Err(self.invalid("dynamic constant assignment", span))
                } else {
                    Ok(Target::Const(name))
                }
            }
            ExprKind::SelfRef => Err(self.invalid("Can't change the value of self", span)),
            ExprKind::Nil => Err(self.invalid("Can't assign to nil", span)),
            ExprKind::True => Err(self.invalid("Can't assign to true", span)),
            ExprKind::False => Err(self.invalid("Can't assign to false", span)),
            ExprKind::Call(call) => {
                let CallExpr {
                    recv,
                    name,
                    args,
                    vcall,
                    ..
                } = *call;
                match recv {
                    None if vcall => {
                        self.declare(&name);
                        Ok(Target::Local(name))
                    }
                    Some(recv) if name == "[]" => Ok(Target::Index { recv, args }),
                    Some(recv) if args.is_empty() && is_attr_name(&name) => {
                        Ok(Target::Attr { recv, name })
                    }
                    _ => Err(self.invalid("syntax error, unexpected '='", span)),
                }
            }
            _ => Err(self.invalid("syntax error, unexpected '='", span)),
        }
    }
}
