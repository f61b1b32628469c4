// token.rs

use crate::span::Span;

/// Single source of truth for keyword-to-token mapping.
///
/// Each entry `"text" => Variant` generates:
/// - A match arm in `TokenType::keyword_type`: `"text" => Some(TokenType::Variant)`
/// - A match arm in `TokenType::as_str`:       `Self::Variant => "text"`
macro_rules! define_keywords {
    ( $( $text:literal => $variant:ident ),+ $(,)? ) => {
        impl TokenType {
            /// Check if a string is a keyword and return its token type.
            pub fn keyword_type(text: &str) -> Option<TokenType> {
                match text {
                    $( $text => Some(TokenType::$variant), )+
                    _ => None,
                }
            }

            /// String representation for keyword tokens (used by `as_str`).
            fn keyword_as_str(&self) -> Option<&'static str> {
                match self {
                    $( Self::$variant => Some($text), )+
                    _ => None,
                }
            }
        }
    };
}

define_keywords! {
    // Language keywords
    "import"      => KwImport,
    "export"      => KwExport,
    "static"      => KwStatic,
    "if"          => KwIf,
    "else"        => KwElse,
    "while"       => KwWhile,
    "for"         => KwFor,
    "return"      => KwReturn,
    "struct"      => KwStruct,
    "union"       => KwUnion,
    "sum"         => KwSum,
    "enum"        => KwEnum,
    "sizeof"      => KwSizeof,
    "alignof"     => KwAlignof,
    "has"         => KwHas,
    "and"         => KwAnd,
    "or"          => KwOr,
    "as"          => KwAs,
    "true"        => KwTrue,
    "false"       => KwFalse,
    "dynamic"     => KwDynamic,
    "type"        => KwType,
    // Function attributes
    "const"       => KwConst,
    "discardable" => KwDiscardable,
    "inline"      => KwInline,
    "noinline"    => KwNoinline,
    "noreturn"    => KwNoreturn,
    "pure"        => KwPure,
    "used"        => KwUsed,
    // Type keywords
    "void"        => KwVoid,
    "bool"        => KwBool,
    "byte"        => KwByte,
    "int"         => KwInt,
    "uint"        => KwUint,
    "cchar"       => KwCChar,
    "cshort"      => KwCShort,
    "cint"        => KwCInt,
    "clong"       => KwCLong,
    "clonglong"   => KwCLongLong,
    "cuchar"      => KwCUChar,
    "cushort"     => KwCUShort,
    "cuint"       => KwCUInt,
    "culong"      => KwCULong,
    "culonglong"  => KwCULongLong,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenType {
    // Literals and names
    Identifier,
    Integer,
    String,

    // Punctuation
    Colon,      // :
    ColonColon, // ::
    ColonEq,    // :=
    Semicolon,  // ;
    Comma,      // ,
    Dot,        // .
    LParen,     // (
    RParen,     // )
    LBrace,     // {
    RBrace,     // }
    LBracket,   // [
    RBracket,   // ]
    At,         // @
    Ampersand,  // &
    Plus,       // +
    Minus,      // -
    Star,       // *
    Slash,      // /
    Percent,    // %
    Shl,        // <<
    Shr,        // >>
    Pipe,       // |
    Caret,      // ^
    Tilde,      // ~
    Bang,       // !
    Eq,         // =  (equality; also the initialiser separator in declarations)
    Ne,         // !=
    Lt,         // <
    Gt,         // >
    Le,         // <=
    Ge,         // >=

    // `as!` — the hard cast form
    KwAsBang,

    // Keywords (generated by define_keywords!)
    KwImport,
    KwExport,
    KwStatic,
    KwIf,
    KwElse,
    KwWhile,
    KwFor,
    KwReturn,
    KwStruct,
    KwUnion,
    KwSum,
    KwEnum,
    KwSizeof,
    KwAlignof,
    KwHas,
    KwAnd,
    KwOr,
    KwAs,
    KwTrue,
    KwFalse,
    KwDynamic,
    KwType,
    KwConst,
    KwDiscardable,
    KwInline,
    KwNoinline,
    KwNoreturn,
    KwPure,
    KwUsed,
    KwVoid,
    KwBool,
    KwByte,
    KwInt,
    KwUint,
    KwCChar,
    KwCShort,
    KwCInt,
    KwCLong,
    KwCLongLong,
    KwCUChar,
    KwCUShort,
    KwCUInt,
    KwCULong,
    KwCULongLong,

    Eof,
}

impl TokenType {
    pub fn as_str(&self) -> &'static str {
        if let Some(s) = self.keyword_as_str() {
            return s;
        }
        match self {
            Self::Identifier => "identifier",
            Self::Integer => "integer literal",
            Self::String => "string literal",
            Self::Colon => ":",
            Self::ColonColon => "::",
            Self::ColonEq => ":=",
            Self::Semicolon => ";",
            Self::Comma => ",",
            Self::Dot => ".",
            Self::LParen => "(",
            Self::RParen => ")",
            Self::LBrace => "{",
            Self::RBrace => "}",
            Self::LBracket => "[",
            Self::RBracket => "]",
            Self::At => "@",
            Self::Ampersand => "&",
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Star => "*",
            Self::Slash => "/",
            Self::Percent => "%",
            Self::Shl => "<<",
            Self::Shr => ">>",
            Self::Pipe => "|",
            Self::Caret => "^",
            Self::Tilde => "~",
            Self::Bang => "!",
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Gt => ">",
            Self::Le => "<=",
            Self::Ge => ">=",
            Self::KwAsBang => "as!",
            Self::Eof => "end of file",
            _ => unreachable!("keyword handled by keyword_as_str"),
        }
    }

    /// Whether this token is one of the builtin type keywords.
    pub fn is_type_keyword(&self) -> bool {
        matches!(
            self,
            Self::KwVoid
                | Self::KwBool
                | Self::KwByte
                | Self::KwInt
                | Self::KwUint
                | Self::KwCChar
                | Self::KwCShort
                | Self::KwCInt
                | Self::KwCLong
                | Self::KwCLongLong
                | Self::KwCUChar
                | Self::KwCUShort
                | Self::KwCUInt
                | Self::KwCULong
                | Self::KwCULongLong
        )
    }

    /// Whether this token is a function-type attribute keyword.
    pub fn is_func_attr(&self) -> bool {
        matches!(
            self,
            Self::KwConst
                | Self::KwDiscardable
                | Self::KwInline
                | Self::KwNoinline
                | Self::KwNoreturn
                | Self::KwPure
                | Self::KwUsed
        )
    }
}

/// A lexed token with its source text and location.
#[derive(Debug, Clone)]
pub struct Token {
    pub ty: TokenType,
    pub lexeme: String,
    pub span: Span,
}

impl Token {
    pub fn new(ty: TokenType, lexeme: &str, span: Span) -> Self {
        Self {
            ty,
            lexeme: lexeme.to_string(),
            span,
        }
    }
}
