//! Glint front end: lexer, parser, AST, types, scopes, and the compilation
//! context shared with semantic analysis.

pub mod ast;
pub mod context;
pub mod display;
pub mod errors;
pub mod intern;
pub mod lexer;
pub mod module;
pub mod parser;
pub mod scope;
pub mod span;
pub mod token;
pub mod types;

pub use ast::*;
pub use context::{Context, SourceFile};
pub use display::AstPrinter;
pub use errors::{LexerError, ParserError};
pub use intern::{Interner, Symbol};
pub use lexer::Lexer;
pub use module::{ImportRef, Module};
pub use parser::{ParseError, Parser};
pub use scope::ScopeId;
pub use span::{FileId, Span};
pub use token::{Token, TokenType};
pub use types::{
    BuiltinType, FfiType, FuncAttrs, Member, Param, StructType, TypeId, TypeKind, TypeNode,
    TypeStore,
};
