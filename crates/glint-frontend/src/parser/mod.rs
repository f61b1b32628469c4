// parser/mod.rs
//
// Recursive-descent parser building arena nodes directly into a Module.
// Declarations are entered into their scopes here; semantic analysis only
// adds parameter and enumerator declarations later.

mod expr;
mod types;

#[cfg(test)]
mod tests;

use miette::Diagnostic;
use thiserror::Error;

use crate::ast::{ExprKind, Linkage};
use crate::errors::{LexerError, ParserError};
use crate::intern::Symbol;
use crate::lexer::Lexer;
use crate::module::Module;
use crate::scope::ScopeId;
use crate::span::Span;
use crate::token::{Token, TokenType};
use crate::types::{FuncAttrs, TypeId, TypeKind};
use crate::{ExprId, ImportRef};

#[derive(Error, Debug, Diagnostic)]
pub enum ParseError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Lexer(#[from] LexerError),
    #[error(transparent)]
    #[diagnostic(transparent)]
    Parser(#[from] ParserError),
}

pub struct Parser<'src> {
    lexer: Lexer<'src>,
    pub(super) current: Token,
    pub(super) previous: Token,
    pub(super) module: Module,
    pub(super) current_scope: ScopeId,
    /// Set while parsing an `if`/`while` condition: juxtaposition-call
    /// arguments are suppressed so the branch expression is not swallowed
    /// as an argument. Parentheses re-enable them.
    pub(super) no_juxtaposition: bool,
}

impl<'src> Parser<'src> {
    pub fn new(module_name: &str, source: &'src str) -> Self {
        let mut lexer = Lexer::new(source);
        let current = lexer.next_token();
        let module = Module::new(module_name);
        let current_scope = module.global_scope;
        Self {
            lexer,
            current,
            previous: Token::new(TokenType::Eof, "", Span::default()),
            module,
            current_scope,
            no_juxtaposition: false,
        }
    }

    /// Parse a whole module. Top-level statements become the body of a
    /// synthesised `main` function returning `int`.
    pub fn parse_module(mut self) -> Result<Module, ParseError> {
        let global = self.module.global_scope;
        let main_scope = self.module.new_scope(Some(global));
        self.module.top_level_scope = main_scope;
        self.current_scope = main_scope;

        let mut top_level = Vec::new();
        while !self.check(TokenType::Eof) {
            if self.check(TokenType::KwImport) {
                self.import_directive()?;
                continue;
            }
            let stmt = self.statement()?;
            top_level.push(stmt);
        }

        if let Some(err) = self.lexer.take_errors().into_iter().next() {
            return Err(err.into());
        }

        let body_span = top_level
            .first()
            .map(|&e| self.module.expr(e).span)
            .unwrap_or_default();
        let body = self.module.alloc_expr(
            ExprKind::Block {
                children: top_level,
            },
            TypeId::UNKNOWN,
            body_span,
        );

        let main_ty = self.module.types.alloc(
            TypeKind::Function {
                ret: TypeId::INT,
                params: Vec::new(),
                attrs: FuncAttrs::default(),
            },
            Span::default(),
        );
        let main_name = self.module.interner.intern("main");
        let main = self.module.alloc_expr(
            ExprKind::FuncDecl {
                name: main_name,
                body: Some(body),
                scope: main_scope,
                linkage: Linkage::Exported,
                param_decls: Vec::new(),
            },
            main_ty,
            Span::default(),
        );
        self.declare_checked(global, main_name, main)?;
        self.module.functions.insert(0, main);
        self.module.top_level_func = Some(main);

        Ok(self.module)
    }

    fn import_directive(&mut self) -> Result<(), ParseError> {
        let start = self.current.span;
        self.advance(); // consume 'import'
        let name_token = self.current.clone();
        self.consume(TokenType::Identifier, "module name")?;
        let name = self.module.interner.intern(&name_token.lexeme);
        self.consume(TokenType::Semicolon, ";")?;
        self.module.imports.push(ImportRef {
            name,
            span: start.merge(name_token.span),
        });
        Ok(())
    }

    // ------------------------------------------------------------------
    // Statements and declarations
    // ------------------------------------------------------------------

    pub(super) fn statement(&mut self) -> Result<ExprId, ParseError> {
        match self.current.ty {
            TokenType::KwImport => Err(ParserError::NestedImport {
                span: self.current.span.into(),
            }
            .into()),
            TokenType::KwStatic => {
                self.advance();
                self.declaration(DeclPosition::Static)
            }
            TokenType::KwExport => {
                self.advance();
                self.declaration(DeclPosition::Exported)
            }
            TokenType::KwType => self.type_declaration(),
            // Control flow and blocks stand on their own; a trailing
            // semicolon is allowed but not required.
            TokenType::KwIf
            | TokenType::KwWhile
            | TokenType::KwFor
            | TokenType::LBrace => {
                let expr = self.expression(0)?;
                self.match_token(TokenType::Semicolon);
                Ok(expr)
            }
            TokenType::KwReturn => {
                let expr = self.return_statement()?;
                self.consume(TokenType::Semicolon, ";")?;
                Ok(expr)
            }
            TokenType::Identifier
                if matches!(
                    self.peek_type(),
                    TokenType::Colon | TokenType::ColonColon | TokenType::ColonEq
                ) =>
            {
                self.declaration(DeclPosition::Local)
            }
            _ => {
                let expr = self.expression(0)?;
                self.consume(TokenType::Semicolon, ";")?;
                Ok(expr)
            }
        }
    }

    fn return_statement(&mut self) -> Result<ExprId, ParseError> {
        let start = self.current.span;
        self.advance(); // consume 'return'
        let value = if self.check(TokenType::Semicolon) {
            None
        } else {
            Some(self.expression(0)?)
        };
        let end = value.map(|v| self.module.expr(v).span).unwrap_or(start);
        Ok(self.module.alloc_expr(
            ExprKind::Return { value },
            TypeId::VOID,
            start.merge(end),
        ))
    }

    /// `ident : type [= init] ;`, `ident :: type [= init] ;`, or
    /// `ident := init ;`. The `:=` form declares an inferred-type variable
    /// when the name is not yet in scope, and is an assignment otherwise.
    fn declaration(&mut self, position: DeclPosition) -> Result<ExprId, ParseError> {
        let name_token = self.current.clone();
        self.consume(TokenType::Identifier, "declaration name")?;
        let name = self.module.interner.intern(&name_token.lexeme);

        if self.match_token(TokenType::ColonEq) {
            let declared = !self
                .module
                .find_recursive(self.current_scope, name)
                .is_empty();
            if declared && position == DeclPosition::Local {
                // Assignment to an existing name.
                let lhs = self.module.alloc_expr(
                    ExprKind::NameRef {
                        name,
                        scope: self.current_scope,
                        target: None,
                    },
                    TypeId::UNKNOWN,
                    name_token.span,
                );
                let rhs = self.expression(0)?;
                let span = name_token.span.merge(self.module.expr(rhs).span);
                let assign = self.module.alloc_expr(
                    ExprKind::Binary {
                        op: crate::ast::BinaryOp::Assign,
                        lhs,
                        rhs,
                    },
                    TypeId::UNKNOWN,
                    span,
                );
                self.consume(TokenType::Semicolon, ";")?;
                return Ok(assign);
            }
            let init = self.expression(0)?;
            self.consume(TokenType::Semicolon, ";")?;
            return self.finish_var_decl(name, name_token.span, TypeId::UNKNOWN, Some(init), position);
        }

        if !self.match_token(TokenType::ColonColon) {
            self.consume(TokenType::Colon, ":")?;
        }
        let ty = self.parse_type()?;

        if self.module.types.is_function(ty) {
            return self.finish_func_decl(name, name_token.span, ty, position);
        }

        let init = if self.match_token(TokenType::Eq) {
            Some(self.expression(0)?)
        } else {
            None
        };
        self.consume(TokenType::Semicolon, ";")?;
        self.finish_var_decl(name, name_token.span, ty, init, position)
    }

    fn finish_var_decl(
        &mut self,
        name: Symbol,
        span: Span,
        ty: TypeId,
        init: Option<ExprId>,
        position: DeclPosition,
    ) -> Result<ExprId, ParseError> {
        let (scope, linkage) = match position {
            DeclPosition::Local => (self.current_scope, Linkage::LocalVar),
            DeclPosition::Static => (self.module.global_scope, Linkage::Internal),
            DeclPosition::Exported => (self.module.global_scope, Linkage::Exported),
        };
        let decl = self
            .module
            .alloc_expr(ExprKind::VarDecl { name, init, linkage }, ty, span);
        self.declare_checked(scope, name, decl)?;
        Ok(decl)
    }

    /// Scope a function or type declaration lands in. File-level
    /// declarations are hoisted past the synthesised top-level function's
    /// body scope so they are visible from every function.
    fn decl_scope(&self) -> ScopeId {
        if self.current_scope == self.module.top_level_scope {
            self.module.global_scope
        } else {
            self.current_scope
        }
    }

    fn finish_func_decl(
        &mut self,
        name: Symbol,
        span: Span,
        ty: TypeId,
        position: DeclPosition,
    ) -> Result<ExprId, ParseError> {
        let decl_scope = self.decl_scope();
        let fn_scope = self.module.new_scope(Some(decl_scope));

        let body = if self.check(TokenType::LBrace) {
            let saved = self.current_scope;
            self.current_scope = fn_scope;
            let body = self.block_in_current_scope()?;
            self.current_scope = saved;
            self.match_token(TokenType::Semicolon);
            Some(body)
        } else if self.match_token(TokenType::Eq) {
            let saved = self.current_scope;
            self.current_scope = fn_scope;
            let body = self.expression(0)?;
            self.current_scope = saved;
            self.consume(TokenType::Semicolon, ";")?;
            Some(body)
        } else {
            self.consume(TokenType::Semicolon, ";")?;
            None
        };

        let linkage = match position {
            DeclPosition::Exported => Linkage::Exported,
            _ => Linkage::Internal,
        };
        let decl = self.module.alloc_expr(
            ExprKind::FuncDecl {
                name,
                body,
                scope: fn_scope,
                linkage,
                param_decls: Vec::new(),
            },
            ty,
            span,
        );
        // Functions declared inside a function body live in the enclosing
        // lexical scope; exported ones go to the global scope.
        let scope = match position {
            DeclPosition::Local => decl_scope,
            _ => self.module.global_scope,
        };
        self.declare_checked(scope, name, decl)?;
        self.module.functions.push(decl);
        Ok(decl)
    }

    /// `type Name : <type> ;` declares a named type; `type Name = <type> ;`
    /// declares an alias.
    fn type_declaration(&mut self) -> Result<ExprId, ParseError> {
        self.advance(); // consume 'type'
        let name_token = self.current.clone();
        self.consume(TokenType::Identifier, "type name")?;
        let name = self.module.interner.intern(&name_token.lexeme);

        let alias = if self.match_token(TokenType::Eq) {
            true
        } else {
            self.consume(TokenType::Colon, ":")?;
            false
        };
        let ty = self.parse_type()?;
        self.consume(TokenType::Semicolon, ";")?;

        let kind = if alias {
            ExprKind::TypeAliasDecl { name }
        } else {
            ExprKind::TypeDecl { name }
        };
        let decl = self.module.alloc_expr(kind, ty, name_token.span);
        let scope = self.decl_scope();
        self.declare_checked(scope, name, decl)?;
        Ok(decl)
    }

    fn declare_checked(
        &mut self,
        scope: ScopeId,
        name: Symbol,
        decl: ExprId,
    ) -> Result<(), ParseError> {
        if let Err(previous) = self.module.declare(scope, name, decl) {
            let name = self.module.interner.resolve(name).to_string();
            return Err(ParserError::Redeclaration {
                name,
                span: self.module.expr(decl).span.into(),
                previous: self.module.expr(previous).span.into(),
            }
            .into());
        }
        Ok(())
    }

    /// `{ stmt* }` introducing a fresh scope.
    pub(super) fn block(&mut self) -> Result<ExprId, ParseError> {
        let scope = self.module.new_scope(Some(self.current_scope));
        let saved = self.current_scope;
        self.current_scope = scope;
        let block = self.block_in_current_scope();
        self.current_scope = saved;
        block
    }

    /// `{ stmt* }` parsed in the already-current scope (function bodies use
    /// the function scope directly so parameters resolve).
    pub(super) fn block_in_current_scope(&mut self) -> Result<ExprId, ParseError> {
        let start = self.current.span;
        self.consume(TokenType::LBrace, "{")?;
        let mut children = Vec::new();
        while !self.check(TokenType::RBrace) && !self.check(TokenType::Eof) {
            children.push(self.statement()?);
        }
        self.consume(TokenType::RBrace, "}")?;
        let span = start.merge(self.previous.span);
        Ok(self
            .module
            .alloc_expr(ExprKind::Block { children }, TypeId::UNKNOWN, span))
    }

    // ------------------------------------------------------------------
    // Token helpers
    // ------------------------------------------------------------------

    pub(super) fn advance(&mut self) {
        self.previous = std::mem::replace(&mut self.current, self.lexer.next_token());
    }

    pub(super) fn check(&self, ty: TokenType) -> bool {
        self.current.ty == ty
    }

    pub(super) fn match_token(&mut self, ty: TokenType) -> bool {
        if self.check(ty) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(super) fn consume(&mut self, ty: TokenType, expected: &str) -> Result<(), ParseError> {
        if self.check(ty) {
            self.advance();
            Ok(())
        } else {
            Err(ParserError::ExpectedToken {
                expected: expected.to_string(),
                found: self.current.ty.as_str().to_string(),
                span: self.current.span.into(),
            }
            .into())
        }
    }

    /// One token of lookahead past `current`.
    pub(super) fn peek_type(&self) -> TokenType {
        self.lexer.clone().next_token().ty
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeclPosition {
    /// Inside a function body (or the top-level function).
    Local,
    /// `static` — hoisted to the module's global scope.
    Static,
    /// `export` — global scope with exported linkage.
    Exported,
}
