// parser/expr.rs
//
// Pratt expression parsing. Glint calls are juxtaposition: `foo a b` calls
// `foo` with two arguments, so a postfix expression followed by something
// that can start an expression extends into a call.

use super::{ParseError, Parser};
use crate::ast::{BinaryOp, CastKind, ExprKind, UnaryOp};
use crate::errors::ParserError;
use crate::token::TokenType;
use crate::types::TypeId;
use crate::ExprId;

impl<'src> Parser<'src> {
    pub(super) fn expression(&mut self, min_bp: u8) -> Result<ExprId, ParseError> {
        let mut lhs = self.unary()?;

        loop {
            // Casts bind tighter than any binary operator.
            if matches!(self.current.ty, TokenType::KwAs | TokenType::KwAsBang) && min_bp <= 23 {
                let kind = if self.current.ty == TokenType::KwAsBang {
                    CastKind::Hard
                } else {
                    CastKind::Soft
                };
                self.advance();
                let ty = self.parse_type()?;
                let span = self
                    .module
                    .expr(lhs)
                    .span
                    .merge(self.previous.span);
                lhs = self
                    .module
                    .alloc_expr(ExprKind::Cast { kind, operand: lhs }, ty, span);
                continue;
            }

            let Some((op, l_bp, r_bp)) = binary_op(self.current.ty) else {
                break;
            };
            if l_bp < min_bp {
                break;
            }
            self.advance();
            let rhs = self.expression(r_bp)?;
            let span = self.module.expr(lhs).span.merge(self.module.expr(rhs).span);
            lhs = self.module.alloc_expr(
                ExprKind::Binary { op, lhs, rhs },
                TypeId::UNKNOWN,
                span,
            );
        }

        Ok(lhs)
    }

    fn unary(&mut self) -> Result<ExprId, ParseError> {
        let op = match self.current.ty {
            TokenType::Ampersand => Some(UnaryOp::Addr),
            TokenType::At => Some(UnaryOp::Deref),
            TokenType::Minus => Some(UnaryOp::Minus),
            TokenType::Tilde => Some(UnaryOp::BitNot),
            TokenType::Bang => Some(UnaryOp::Not),
            TokenType::KwHas => Some(UnaryOp::Has),
            _ => None,
        };
        if let Some(op) = op {
            let start = self.current.span;
            self.advance();
            let operand = self.unary()?;
            let span = start.merge(self.module.expr(operand).span);
            return Ok(self.module.alloc_expr(
                ExprKind::Unary { op, operand },
                TypeId::UNKNOWN,
                span,
            ));
        }

        if matches!(self.current.ty, TokenType::KwSizeof | TokenType::KwAlignof) {
            let is_sizeof = self.current.ty == TokenType::KwSizeof;
            let start = self.current.span;
            self.advance();
            let operand = self.unary()?;
            let span = start.merge(self.module.expr(operand).span);
            let kind = if is_sizeof {
                ExprKind::Sizeof { operand }
            } else {
                ExprKind::Alignof { operand }
            };
            return Ok(self.module.alloc_expr(kind, TypeId::UNKNOWN, span));
        }

        self.postfix()
    }

    /// Primary expression plus member access, subscripts, and
    /// juxtaposition-call arguments.
    fn postfix(&mut self) -> Result<ExprId, ParseError> {
        let mut expr = self.primary()?;

        loop {
            match self.current.ty {
                TokenType::Dot => {
                    self.advance();
                    let name_token = self.current.clone();
                    self.consume(TokenType::Identifier, "member name")?;
                    let name = self.module.interner.intern(&name_token.lexeme);
                    let span = self.module.expr(expr).span.merge(name_token.span);
                    expr = self.module.alloc_expr(
                        ExprKind::MemberAccess {
                            object: expr,
                            name,
                            strukt: None,
                            member_index: None,
                        },
                        TypeId::UNKNOWN,
                        span,
                    );
                }
                TokenType::LBracket => {
                    self.advance();
                    let index = self.expression(0)?;
                    self.consume(TokenType::RBracket, "]")?;
                    let span = self.module.expr(expr).span.merge(self.previous.span);
                    expr = self.module.alloc_expr(
                        ExprKind::Binary {
                            op: BinaryOp::Subscript,
                            lhs: expr,
                            rhs: index,
                        },
                        TypeId::UNKNOWN,
                        span,
                    );
                }
                // `()` forces a zero-argument call.
                TokenType::LParen if self.peek_type() == TokenType::RParen => {
                    self.advance();
                    self.advance();
                    let span = self.module.expr(expr).span.merge(self.previous.span);
                    expr = self.module.alloc_expr(
                        ExprKind::Call {
                            callee: expr,
                            args: Vec::new(),
                        },
                        TypeId::UNKNOWN,
                        span,
                    );
                }
                _ if !self.no_juxtaposition && self.starts_call_argument() => {
                    let mut args = Vec::new();
                    while self.starts_call_argument() {
                        args.push(self.call_argument()?);
                    }
                    let span = args
                        .last()
                        .map(|&a| self.module.expr(expr).span.merge(self.module.expr(a).span))
                        .unwrap_or(self.module.expr(expr).span);
                    expr = self.module.alloc_expr(
                        ExprKind::Call { callee: expr, args },
                        TypeId::UNKNOWN,
                        span,
                    );
                }
                _ => break,
            }
        }

        Ok(expr)
    }

    /// Whether the current token can begin a juxtaposed call argument.
    fn starts_call_argument(&self) -> bool {
        matches!(
            self.current.ty,
            TokenType::Identifier
                | TokenType::Integer
                | TokenType::String
                | TokenType::LParen
                | TokenType::Colon
                | TokenType::KwTrue
                | TokenType::KwFalse
        )
    }

    /// A call argument is a postfix expression: tight enough that operators
    /// end the argument list, loose enough for `foo bar.baz (x + 1)`.
    fn call_argument(&mut self) -> Result<ExprId, ParseError> {
        let mut expr = self.primary()?;
        loop {
            match self.current.ty {
                TokenType::Dot => {
                    self.advance();
                    let name_token = self.current.clone();
                    self.consume(TokenType::Identifier, "member name")?;
                    let name = self.module.interner.intern(&name_token.lexeme);
                    let span = self.module.expr(expr).span.merge(name_token.span);
                    expr = self.module.alloc_expr(
                        ExprKind::MemberAccess {
                            object: expr,
                            name,
                            strukt: None,
                            member_index: None,
                        },
                        TypeId::UNKNOWN,
                        span,
                    );
                }
                TokenType::LBracket => {
                    self.advance();
                    let index = self.expression(0)?;
                    self.consume(TokenType::RBracket, "]")?;
                    let span = self.module.expr(expr).span.merge(self.previous.span);
                    expr = self.module.alloc_expr(
                        ExprKind::Binary {
                            op: BinaryOp::Subscript,
                            lhs: expr,
                            rhs: index,
                        },
                        TypeId::UNKNOWN,
                        span,
                    );
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn primary(&mut self) -> Result<ExprId, ParseError> {
        let span = self.current.span;
        match self.current.ty {
            TokenType::Integer => {
                let value = parse_integer(&self.current.lexeme).ok_or_else(|| {
                    ParseError::from(crate::errors::LexerError::IntegerOverflow {
                        span: span.into(),
                    })
                })?;
                self.advance();
                Ok(self
                    .module
                    .alloc_expr(ExprKind::IntegerLiteral(value), TypeId::UNKNOWN, span))
            }
            TokenType::KwTrue | TokenType::KwFalse => {
                let value = (self.current.ty == TokenType::KwTrue) as i64;
                self.advance();
                Ok(self
                    .module
                    .alloc_expr(ExprKind::IntegerLiteral(value), TypeId::BOOL, span))
            }
            TokenType::String => {
                let content = unescape(&self.current.lexeme);
                let sym = self.module.interner.intern(&content);
                self.advance();
                Ok(self
                    .module
                    .alloc_expr(ExprKind::StringLiteral(sym), TypeId::UNKNOWN, span))
            }
            TokenType::Identifier => {
                let name = self.module.interner.intern(&self.current.lexeme.clone());
                self.advance();
                Ok(self.module.alloc_expr(
                    ExprKind::NameRef {
                        name,
                        scope: self.current_scope,
                        target: None,
                    },
                    TypeId::UNKNOWN,
                    span,
                ))
            }
            // `:type` puts a type in expression position; calling it is a
            // cast or a compound literal.
            TokenType::Colon => {
                self.advance();
                let ty = self.parse_type()?;
                let span = span.merge(self.previous.span);
                Ok(self.module.alloc_expr(ExprKind::TypeExpr, ty, span))
            }
            TokenType::LParen => {
                self.advance();
                let saved = self.no_juxtaposition;
                self.no_juxtaposition = false;
                let expr = self.expression(0);
                self.no_juxtaposition = saved;
                let expr = expr?;
                self.consume(TokenType::RParen, ")")?;
                Ok(expr)
            }
            TokenType::LBrace => self.block(),
            TokenType::KwIf => self.if_expression(),
            TokenType::KwWhile => self.while_expression(),
            TokenType::KwFor => self.for_expression(),
            _ => Err(ParserError::ExpectedExpression {
                found: self.current.ty.as_str().to_string(),
                span: span.into(),
            }
            .into()),
        }
    }

    /// A condition keeps juxtaposition calls out of the way; parenthesise
    /// a call to use one (`if (check x) …`).
    fn condition(&mut self) -> Result<ExprId, ParseError> {
        let saved = self.no_juxtaposition;
        self.no_juxtaposition = true;
        let cond = self.expression(0);
        self.no_juxtaposition = saved;
        cond
    }

    fn if_expression(&mut self) -> Result<ExprId, ParseError> {
        let start = self.current.span;
        self.advance(); // consume 'if'
        let cond = self.condition()?;
        let then = self.branch_expression()?;
        let otherwise = if self.match_token(TokenType::KwElse) {
            Some(self.branch_expression()?)
        } else {
            None
        };
        let end = otherwise
            .map(|e| self.module.expr(e).span)
            .unwrap_or(self.module.expr(then).span);
        Ok(self.module.alloc_expr(
            ExprKind::If {
                cond,
                then,
                otherwise,
            },
            TypeId::UNKNOWN,
            start.merge(end),
        ))
    }

    /// A branch of `if`/`while`/`for`: a block or a single expression.
    fn branch_expression(&mut self) -> Result<ExprId, ParseError> {
        if self.check(TokenType::LBrace) {
            self.block()
        } else if self.check(TokenType::KwIf) {
            self.if_expression()
        } else if self.check(TokenType::KwReturn) {
            let start = self.current.span;
            self.advance();
            let value = if self.check(TokenType::Semicolon) || self.check(TokenType::KwElse) {
                None
            } else {
                Some(self.expression(0)?)
            };
            let end = value.map(|v| self.module.expr(v).span).unwrap_or(start);
            Ok(self
                .module
                .alloc_expr(ExprKind::Return { value }, TypeId::VOID, start.merge(end)))
        } else {
            self.expression(0)
        }
    }

    fn while_expression(&mut self) -> Result<ExprId, ParseError> {
        let start = self.current.span;
        self.advance(); // consume 'while'
        let cond = self.condition()?;
        let body = self.branch_expression()?;
        let span = start.merge(self.module.expr(body).span);
        Ok(self
            .module
            .alloc_expr(ExprKind::While { cond, body }, TypeId::UNKNOWN, span))
    }

    /// `for (init; cond; increment) body`
    fn for_expression(&mut self) -> Result<ExprId, ParseError> {
        let start = self.current.span;
        self.advance(); // consume 'for'
        self.consume(TokenType::LParen, "(")?;
        let init = self.statement()?;
        let cond = self.expression(0)?;
        self.consume(TokenType::Semicolon, ";")?;
        let increment = self.expression(0)?;
        self.consume(TokenType::RParen, ")")?;
        let body = self.branch_expression()?;
        let span = start.merge(self.module.expr(body).span);
        Ok(self.module.alloc_expr(
            ExprKind::For {
                init,
                cond,
                increment,
                body,
            },
            TypeId::UNKNOWN,
            span,
        ))
    }
}

/// Binding powers: returns `(op, left_bp, right_bp)`.
fn binary_op(ty: TokenType) -> Option<(BinaryOp, u8, u8)> {
    Some(match ty {
        TokenType::ColonEq => (BinaryOp::Assign, 2, 1),
        TokenType::KwOr => (BinaryOp::Or, 3, 4),
        TokenType::KwAnd => (BinaryOp::And, 5, 6),
        TokenType::Eq => (BinaryOp::Eq, 7, 8),
        TokenType::Ne => (BinaryOp::Ne, 7, 8),
        TokenType::Lt => (BinaryOp::Lt, 9, 10),
        TokenType::Gt => (BinaryOp::Gt, 9, 10),
        TokenType::Le => (BinaryOp::Le, 9, 10),
        TokenType::Ge => (BinaryOp::Ge, 9, 10),
        TokenType::Pipe => (BinaryOp::BitOr, 11, 12),
        TokenType::Caret => (BinaryOp::BitXor, 13, 14),
        TokenType::Ampersand => (BinaryOp::BitAnd, 15, 16),
        TokenType::Shl => (BinaryOp::Shl, 17, 18),
        TokenType::Shr => (BinaryOp::Shr, 17, 18),
        TokenType::Plus => (BinaryOp::Add, 19, 20),
        TokenType::Minus => (BinaryOp::Sub, 19, 20),
        TokenType::Star => (BinaryOp::Mul, 21, 22),
        TokenType::Slash => (BinaryOp::Div, 21, 22),
        TokenType::Percent => (BinaryOp::Rem, 21, 22),
        _ => return None,
    })
}

fn parse_integer(lexeme: &str) -> Option<i64> {
    let text: String = lexeme.chars().filter(|&c| c != '_').collect();
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16).ok().map(|v| v as i64)
    } else {
        text.parse::<u64>().ok().map(|v| v as i64)
    }
}

/// Strip quotes and process escapes. The lexer has already validated them.
fn unescape(lexeme: &str) -> String {
    let inner = lexeme
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(lexeme);
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}
