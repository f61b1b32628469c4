// parser/types.rs
//
// Type syntax:
//   @T          pointer            &T          reference
//   [T N]       fixed array        [T dynamic] dynamic array
//   ret(params) function           struct/union/sum/enum { … }
//   builtin keywords, named types

use super::{ParseError, Parser};
use crate::ast::ExprKind;
use crate::errors::ParserError;
use crate::span::Span;
use crate::token::TokenType;
use crate::types::{FuncAttrs, Member, Param, StructType, TypeId, TypeKind};

impl<'src> Parser<'src> {
    pub(super) fn parse_type(&mut self) -> Result<TypeId, ParseError> {
        let span = self.current.span;
        match self.current.ty {
            TokenType::At => {
                self.advance();
                let elem = self.parse_type()?;
                Ok(self.module.types.alloc(TypeKind::Pointer { elem }, span))
            }
            TokenType::Ampersand => {
                self.advance();
                let elem = self.parse_type()?;
                Ok(self.module.types.alloc(TypeKind::Reference { elem }, span))
            }
            _ => {
                let base = self.base_type()?;
                self.function_type_suffix(base, span)
            }
        }
    }

    /// `ret(params) attrs…` — a parameter list after a type makes it a
    /// function type.
    fn function_type_suffix(
        &mut self,
        ret: TypeId,
        span: Span,
    ) -> Result<TypeId, ParseError> {
        if !self.check(TokenType::LParen) {
            return Ok(ret);
        }
        self.advance();

        let mut params = Vec::new();
        while !self.check(TokenType::RParen) && !self.check(TokenType::Eof) {
            let param_span = self.current.span;
            let name = if self.check(TokenType::Identifier)
                && self.peek_type() == TokenType::Colon
            {
                let sym = self.module.interner.intern(&self.current.lexeme.clone());
                self.advance();
                self.advance(); // consume ':'
                Some(sym)
            } else {
                self.match_token(TokenType::Colon);
                None
            };
            let ty = self.parse_type()?;
            params.push(Param {
                name,
                ty,
                span: param_span.merge(self.previous.span),
            });
            if !self.match_token(TokenType::Comma) {
                break;
            }
        }
        self.consume(TokenType::RParen, ")")?;

        let mut attrs = FuncAttrs::default();
        while self.current.ty.is_func_attr() {
            match self.current.ty {
                TokenType::KwConst => attrs.const_ = true,
                TokenType::KwDiscardable => attrs.discardable = true,
                TokenType::KwInline => attrs.inline = true,
                TokenType::KwNoinline => attrs.noinline = true,
                TokenType::KwNoreturn => attrs.noreturn = true,
                TokenType::KwPure => attrs.pure = true,
                TokenType::KwUsed => attrs.used = true,
                _ => unreachable!(),
            }
            self.advance();
        }

        Ok(self
            .module
            .types
            .alloc(TypeKind::Function { ret, params, attrs }, span))
    }

    fn base_type(&mut self) -> Result<TypeId, ParseError> {
        let span = self.current.span;
        if let Some(builtin) = builtin_type(self.current.ty) {
            self.advance();
            return Ok(builtin);
        }
        match self.current.ty {
            TokenType::Identifier => {
                let name = self.module.interner.intern(&self.current.lexeme.clone());
                self.advance();
                Ok(self.module.types.alloc(
                    TypeKind::Named {
                        name,
                        scope: self.current_scope,
                    },
                    span,
                ))
            }
            TokenType::LBracket => self.array_type(span),
            TokenType::KwStruct => {
                self.advance();
                let members = self.member_list(false)?;
                Ok(self.module.types.alloc(
                    TypeKind::Struct(StructType {
                        members,
                        byte_size: 0,
                        alignment: 0,
                    }),
                    span,
                ))
            }
            TokenType::KwUnion => {
                self.advance();
                let members = self.member_list(false)?;
                Ok(self.module.types.alloc(
                    TypeKind::Union {
                        members,
                        byte_size: 0,
                        alignment: 0,
                    },
                    span,
                ))
            }
            TokenType::KwSum => {
                self.advance();
                let members = self.member_list(true)?;
                Ok(self.module.types.alloc(
                    TypeKind::Sum {
                        members,
                        byte_size: 0,
                        alignment: 0,
                        shadow: None,
                    },
                    span,
                ))
            }
            TokenType::KwEnum => self.enum_type(span),
            TokenType::LParen => {
                self.advance();
                let inner = self.parse_type()?;
                self.consume(TokenType::RParen, ")")?;
                Ok(inner)
            }
            _ => Err(ParserError::ExpectedType {
                found: self.current.ty.as_str().to_string(),
                span: span.into(),
            }
            .into()),
        }
    }

    /// `[T N]`, `[T dynamic]`, or `[T dynamic N]`.
    fn array_type(&mut self, span: Span) -> Result<TypeId, ParseError> {
        self.advance(); // consume '['
        let elem = self.parse_type()?;

        if self.match_token(TokenType::KwDynamic) {
            let initial_size = if self.check(TokenType::RBracket) {
                None
            } else {
                Some(self.expression(0)?)
            };
            self.consume(TokenType::RBracket, "]")?;
            return Ok(self.module.types.alloc(
                TypeKind::DynamicArray {
                    elem,
                    initial_size,
                    shadow: None,
                },
                span,
            ));
        }

        if self.check(TokenType::RBracket) {
            return Err(ParserError::BadArrayType { span: span.into() }.into());
        }
        let size = self.expression(0)?;
        self.consume(TokenType::RBracket, "]")?;
        Ok(self.module.types.alloc(TypeKind::Array { elem, size }, span))
    }

    /// `{ name : type [default] , … }` — `default` expressions are accepted
    /// on sum members and discarded; the tag lowering supplies zero values.
    fn member_list(&mut self, allow_defaults: bool) -> Result<Vec<Member>, ParseError> {
        self.consume(TokenType::LBrace, "{")?;
        let mut members = Vec::new();
        while !self.check(TokenType::RBrace) && !self.check(TokenType::Eof) {
            let name_token = self.current.clone();
            self.consume(TokenType::Identifier, "member name")?;
            let name = self.module.interner.intern(&name_token.lexeme);
            self.consume(TokenType::Colon, ":")?;
            let ty = self.parse_type()?;
            if allow_defaults
                && !matches!(
                    self.current.ty,
                    TokenType::Comma | TokenType::Semicolon | TokenType::RBrace
                )
            {
                self.expression(0)?;
            }
            members.push(Member {
                name,
                ty,
                byte_offset: 0,
                span: name_token.span,
            });
            if !self.match_token(TokenType::Comma) && !self.match_token(TokenType::Semicolon) {
                break;
            }
        }
        self.consume(TokenType::RBrace, "}")?;
        Ok(members)
    }

    /// `enum [underlying] { name [: value] , … }`
    fn enum_type(&mut self, span: Span) -> Result<TypeId, ParseError> {
        self.advance(); // consume 'enum'
        let underlying = if self.check(TokenType::LBrace) {
            TypeId::INT
        } else {
            self.parse_type()?
        };

        let scope = self.module.new_scope(Some(self.current_scope));
        let saved = self.current_scope;
        self.current_scope = scope;

        let result: Result<Vec<crate::ast::ExprId>, ParseError> = (|| {
            self.consume(TokenType::LBrace, "{")?;
            let mut enumerators = Vec::new();
            while !self.check(TokenType::RBrace) && !self.check(TokenType::Eof) {
                let name_token = self.current.clone();
                self.consume(TokenType::Identifier, "enumerator name")?;
                let name = self.module.interner.intern(&name_token.lexeme);
                let init = if self.match_token(TokenType::Colon) {
                    Some(self.expression(0)?)
                } else {
                    None
                };
                enumerators.push(self.module.alloc_expr(
                    ExprKind::EnumeratorDecl { name, init },
                    TypeId::UNKNOWN,
                    name_token.span,
                ));
                if !self.match_token(TokenType::Comma) && !self.match_token(TokenType::Semicolon) {
                    break;
                }
            }
            self.consume(TokenType::RBrace, "}")?;
            Ok(enumerators)
        })();
        self.current_scope = saved;
        let enumerators = result?;

        Ok(self.module.types.alloc(
            TypeKind::Enum {
                underlying,
                enumerators,
                scope,
            },
            span,
        ))
    }
}

fn builtin_type(ty: TokenType) -> Option<TypeId> {
    Some(match ty {
        TokenType::KwVoid => TypeId::VOID,
        TokenType::KwBool => TypeId::BOOL,
        TokenType::KwByte => TypeId::BYTE,
        TokenType::KwInt => TypeId::INT,
        TokenType::KwUint => TypeId::UINT,
        TokenType::KwCChar => TypeId::C_CHAR,
        TokenType::KwCShort => TypeId::C_SHORT,
        TokenType::KwCInt => TypeId::C_INT,
        TokenType::KwCLong => TypeId::C_LONG,
        TokenType::KwCLongLong => TypeId::C_LONG_LONG,
        TokenType::KwCUChar => TypeId::C_UCHAR,
        TokenType::KwCUShort => TypeId::C_USHORT,
        TokenType::KwCUInt => TypeId::C_UINT,
        TokenType::KwCULong => TypeId::C_ULONG,
        TokenType::KwCULongLong => TypeId::C_ULONG_LONG,
        _ => return None,
    })
}
