// errors.rs
//! Lexer (E0xxx) and parser (E1xxx) errors.

use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

#[derive(Error, Debug, Diagnostic, Clone)]
pub enum LexerError {
    #[error("unexpected character '{ch}'")]
    #[diagnostic(code(E0001))]
    UnexpectedCharacter {
        ch: char,
        #[label("not valid here")]
        span: SourceSpan,
    },

    #[error("unterminated string literal")]
    #[diagnostic(code(E0002))]
    UnterminatedString {
        #[label("string starts here")]
        span: SourceSpan,
    },

    #[error("unknown escape sequence '\\{ch}'")]
    #[diagnostic(code(E0003))]
    UnknownEscape {
        ch: char,
        #[label("in this string")]
        span: SourceSpan,
    },

    #[error("integer literal too large")]
    #[diagnostic(code(E0004))]
    IntegerOverflow {
        #[label("does not fit in 64 bits")]
        span: SourceSpan,
    },
}

#[derive(Error, Debug, Diagnostic, Clone)]
pub enum ParserError {
    #[error("expected expression, found '{found}'")]
    #[diagnostic(code(E1001))]
    ExpectedExpression {
        found: String,
        #[label("expected expression")]
        span: SourceSpan,
    },

    #[error("expected '{expected}', found '{found}'")]
    #[diagnostic(code(E1002))]
    ExpectedToken {
        expected: String,
        found: String,
        #[label("unexpected token")]
        span: SourceSpan,
    },

    #[error("expected type, found '{found}'")]
    #[diagnostic(code(E1003))]
    ExpectedType {
        found: String,
        #[label("expected a type")]
        span: SourceSpan,
    },

    #[error("expected identifier")]
    #[diagnostic(code(E1004))]
    ExpectedIdentifier {
        #[label("expected identifier")]
        span: SourceSpan,
    },

    #[error("array type must have a length or 'dynamic'")]
    #[diagnostic(code(E1005), help("write '[T N]' for a fixed array or '[T dynamic]'"))]
    BadArrayType {
        #[label("in this array type")]
        span: SourceSpan,
    },

    #[error("'import' is only allowed at the top level")]
    #[diagnostic(code(E1006))]
    NestedImport {
        #[label("move this to the top of the file")]
        span: SourceSpan,
    },

    #[error("redeclaration of '{name}'")]
    #[diagnostic(code(E1007))]
    Redeclaration {
        name: String,
        #[label("conflicting declaration")]
        span: SourceSpan,
        #[label("previously declared here")]
        previous: SourceSpan,
    },
}
