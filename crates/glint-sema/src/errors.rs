// errors.rs
//! Semantic analysis diagnostics (E2xxx, W2xxx) and the structural failures
//! that abort the pass.

#![allow(unused_assignments)] // False positives from thiserror derive

use glint_frontend::Span;
use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

#[derive(Error, Debug, Diagnostic, Clone)]
pub enum SemanticError {
    #[error("expression is not convertible to type {to}")]
    #[diagnostic(code(E2001))]
    NotConvertible {
        to: String,
        #[label("cannot convert this")]
        span: SourceSpan,
    },

    #[error("invalid type for loop condition: {found}")]
    #[diagnostic(code(E2002))]
    LoopConditionNotBool {
        found: String,
        #[label("expected bool")]
        span: SourceSpan,
    },

    #[error("invalid type for if condition: {found}")]
    #[diagnostic(code(E2003))]
    IfConditionNotBool {
        found: String,
        #[label("expected bool")]
        span: SourceSpan,
    },

    #[error("function returning void must not return a value")]
    #[diagnostic(code(E2004))]
    ReturnValueInVoidFunction {
        #[label("remove this value")]
        span: SourceSpan,
    },

    #[error("non-void function must return a value")]
    #[diagnostic(code(E2005))]
    MissingReturnValue {
        #[label("this return needs a value")]
        span: SourceSpan,
    },

    #[error("type of return expression is not convertible to return type {ret}")]
    #[diagnostic(code(E2006))]
    ReturnTypeMismatch {
        ret: String,
        #[label("wrong return value type")]
        span: SourceSpan,
    },

    #[error("cannot infer type of untyped compound literal")]
    #[diagnostic(code(E2007))]
    CannotInferCompoundLiteral {
        #[label("no type available here")]
        span: SourceSpan,
    },

    #[error("type {ty} has no enumerator named '{name}'")]
    #[diagnostic(code(E2008))]
    NoSuchEnumerator {
        ty: String,
        name: String,
        #[label("unknown enumerator")]
        span: SourceSpan,
    },

    #[error("enumerator {name} cannot be used before it is defined")]
    #[diagnostic(code(E2009))]
    EnumeratorUsedBeforeDefined {
        name: String,
        #[label("used here")]
        span: SourceSpan,
    },

    #[error("{container} {ty} has no member named '{name}'")]
    #[diagnostic(code(E2010))]
    NoSuchMember {
        container: &'static str,
        ty: String,
        name: String,
        #[label("unknown member")]
        span: SourceSpan,
    },

    #[error("LHS of member access must be a struct, but was {found}")]
    #[diagnostic(code(E2011))]
    MemberAccessNotStruct {
        found: String,
        #[label("not a struct")]
        span: SourceSpan,
    },

    #[error("overload set contains two overloads with the same parameter types")]
    #[diagnostic(code(E2012))]
    OverloadsSameParameters {
        #[label("this overload")]
        span: SourceSpan,
        #[label("conflicting overload is here")]
        conflicting: SourceSpan,
    },

    #[error("cannot take address of rvalue")]
    #[diagnostic(code(E2013))]
    AddressOfRvalue {
        #[label("not an lvalue")]
        span: SourceSpan,
    },

    #[error("cannot dereference non-pointer type {found}")]
    #[diagnostic(code(E2014))]
    DerefNonPointer {
        found: String,
        #[label("expected a pointer")]
        span: SourceSpan,
    },

    #[error("operand of unary prefix operator '{op}' must be {expected}, but was {found}")]
    #[diagnostic(code(E2015))]
    UnaryOperandType {
        op: &'static str,
        expected: &'static str,
        found: String,
        #[label("wrong operand type")]
        span: SourceSpan,
    },

    #[error("operand of 'has' must be a member access to a sum type")]
    #[diagnostic(code(E2016))]
    HasOperandNotSumMember {
        #[label("not a sum-type member access")]
        span: SourceSpan,
    },

    #[error("cannot perform arithmetic on {lhs} and {rhs}")]
    #[diagnostic(code(E2017))]
    ArithmeticOperands {
        lhs: String,
        rhs: String,
        #[label("invalid operand types")]
        span: SourceSpan,
    },

    #[error("LHS of subscript must be a pointer or array, but was {found}")]
    #[diagnostic(code(E2018))]
    SubscriptBase {
        found: String,
        #[label("cannot be indexed")]
        span: SourceSpan,
    },

    #[error("RHS of subscript must be an integer")]
    #[diagnostic(code(E2019))]
    SubscriptIndexNotInteger {
        #[label("expected an integer index")]
        span: SourceSpan,
    },

    #[error("array subscript out of bounds")]
    #[diagnostic(code(E2020))]
    SubscriptOutOfBounds {
        #[label("index outside the array")]
        span: SourceSpan,
    },

    #[error("cannot compare {lhs} and {rhs}")]
    #[diagnostic(code(E2021))]
    CannotCompare {
        lhs: String,
        rhs: String,
        #[label("invalid comparison")]
        span: SourceSpan,
    },

    #[error("cannot compare unrelated pointer types {lhs} and {rhs}")]
    #[diagnostic(code(E2022))]
    ComparePointerTypes {
        lhs: String,
        rhs: String,
        #[label("unrelated pointer types")]
        span: SourceSpan,
    },

    #[error("LHS of assignment must be an lvalue")]
    #[diagnostic(code(E2023))]
    AssignToRvalue {
        #[label("cannot assign to this")]
        span: SourceSpan,
    },

    #[error("cannot assign to a sum type; access one of its members using '.'")]
    #[diagnostic(code(E2024))]
    AssignToSumType {
        #[label("assign to a member instead")]
        span: SourceSpan,
    },

    #[error("type of expression {found} is not convertible to variable type {expected}")]
    #[diagnostic(code(E2025))]
    AssignTypeMismatch {
        found: String,
        expected: String,
        #[label("wrong value type")]
        span: SourceSpan,
    },

    #[error("type of initialiser, {found}, is not convertible to variable type {expected}")]
    #[diagnostic(code(E2026))]
    InitTypeMismatch {
        found: String,
        expected: String,
        #[label("initialiser has the wrong type")]
        span: SourceSpan,
    },

    #[error("unknown symbol '{name}'")]
    #[diagnostic(code(E2027))]
    UnknownSymbol {
        name: String,
        #[label("not found in scope")]
        span: SourceSpan,
        #[label("a declaration exists at the top level; did you mean to make it 'static'?")]
        top_level: Option<SourceSpan>,
        #[label("maybe you meant '{suggestion}', defined here?")]
        suggested: Option<SourceSpan>,
        suggestion: String,
    },

    #[error("reference to '{name}', which is no longer viable; probably a use-after-free")]
    #[diagnostic(code(E2028))]
    UseAfterFree {
        name: String,
        #[label("already freed")]
        span: SourceSpan,
    },

    #[error("cannot use '{name}' in its own initialiser")]
    #[diagnostic(code(E2029))]
    SelfReferentialInit {
        name: String,
        #[label("declaration is still being analysed")]
        span: SourceSpan,
    },

    #[error("cannot call non-function(-pointer) type {found}")]
    #[diagnostic(code(E2030))]
    NotAFunction {
        found: String,
        #[label("not callable")]
        span: SourceSpan,
    },

    #[error("incorrect number of arguments for function; expected {expected} instead of {found}")]
    #[diagnostic(code(E2031))]
    ArgumentCount {
        expected: usize,
        found: usize,
        #[label("wrong number of arguments")]
        span: SourceSpan,
    },

    #[error("type of argument {found} is not convertible to parameter type {expected}")]
    #[diagnostic(code(E2032))]
    ArgumentTypeMismatch {
        found: String,
        expected: String,
        #[label("wrong argument type")]
        span: SourceSpan,
    },

    #[error("discarding return value of function not marked as 'discardable'")]
    #[diagnostic(code(E2033))]
    DiscardNonDiscardable {
        #[label("result ignored here")]
        span: SourceSpan,
    },

    #[error("invalid cast from {from} to {to}")]
    #[diagnostic(code(E2034))]
    InvalidCast {
        from: String,
        to: String,
        #[label("cannot cast")]
        span: SourceSpan,
    },

    #[error("invalid cast of rvalue to reference type")]
    #[diagnostic(code(E2035))]
    CastRvalueToReference {
        #[label("needs an lvalue")]
        span: SourceSpan,
    },

    #[error("cast from {from} to {to} is unsafe; if this is intended, use 'as!' instead")]
    #[diagnostic(code(E2036))]
    UnsafeCastNeedsHardForm {
        from: String,
        to: String,
        #[label("unsafe cast")]
        span: SourceSpan,
    },

    #[error("{intrinsic} {requirement}")]
    #[diagnostic(code(E2037))]
    IntrinsicArity {
        intrinsic: &'static str,
        requirement: &'static str,
        #[label("wrong arguments")]
        span: SourceSpan,
    },

    #[error("argument to __builtin_inline() must be a (non-builtin) function call")]
    #[diagnostic(code(E2038))]
    InlineArgumentNotCall {
        #[label("not a call")]
        span: SourceSpan,
    },

    #[error("'{name}' is not a type")]
    #[diagnostic(code(E2039))]
    NotAType {
        name: String,
        #[label("used as a type here")]
        span: SourceSpan,
        #[label("because of declaration here")]
        declared: SourceSpan,
    },

    #[error("'{name}' does not name a type")]
    #[diagnostic(code(E2040))]
    UnknownTypeName {
        name: String,
        #[label("unknown type")]
        span: SourceSpan,
    },

    #[error("cannot create {container} of reference type {elem}")]
    #[diagnostic(code(E2041))]
    ReferenceElement {
        container: &'static str,
        elem: String,
        #[label("references cannot go here")]
        span: SourceSpan,
    },

    #[error("array size must be greater than 0")]
    #[diagnostic(code(E2042))]
    ArraySizeNotPositive {
        #[label("invalid size")]
        span: SourceSpan,
    },

    #[error("array with variable size should have been made a dynamic array by the parser")]
    #[diagnostic(code(E2043))]
    ArraySizeNotConstant {
        #[label("size is not a constant")]
        span: SourceSpan,
    },

    #[error("sum type must have more than one member")]
    #[diagnostic(code(E2044), help("use a struct, or something"))]
    SumTypeTooFewMembers {
        #[label("needs at least two members")]
        span: SourceSpan,
    },

    #[error("function returning void cannot be 'discardable'")]
    #[diagnostic(code(E2045))]
    VoidDiscardable {
        #[label("attribute conflicts with the return type")]
        span: SourceSpan,
    },

    #[error("'noreturn' function cannot be '{attr}'")]
    #[diagnostic(code(E2046))]
    NoreturnConflict {
        attr: &'static str,
        #[label("conflicting attributes")]
        span: SourceSpan,
    },

    #[error("function cannot be both 'inline' and 'noinline'")]
    #[diagnostic(code(E2047))]
    InlineNoinline {
        #[label("conflicting attributes")]
        span: SourceSpan,
    },

    #[error("bit width of integer type cannot be 0")]
    #[diagnostic(code(E2048))]
    ZeroWidthInteger {
        #[label("invalid width")]
        span: SourceSpan,
    },

    #[error("disallowed underlying type of enum; only integer-like types are allowed")]
    #[diagnostic(code(E2049))]
    EnumUnderlyingNotInteger {
        #[label("not an integer type")]
        span: SourceSpan,
    },

    #[error("duplicate enumerator '{name}'")]
    #[diagnostic(code(E2050))]
    DuplicateEnumerator {
        name: String,
        #[label("already declared in this enum")]
        span: SourceSpan,
    },

    #[error("invalid init expression for enumerator {name}")]
    #[diagnostic(code(E2051))]
    EnumInitInvalid {
        name: String,
        #[label("bad initialiser")]
        span: SourceSpan,
    },

    #[error("init expression for enumerator {name} is not convertible to the underlying type")]
    #[diagnostic(code(E2052))]
    EnumInitNotConvertible {
        name: String,
        #[label("wrong initialiser type")]
        span: SourceSpan,
        #[label("enum defined here")]
        enum_span: Option<SourceSpan>,
    },

    #[error("init expression for enumerator {name} is not a constant expression")]
    #[diagnostic(code(E2053), help("try using an integer constant like `69', if stuck"))]
    EnumInitNotConstant {
        name: String,
        #[label("cannot evaluate at compile time")]
        span: SourceSpan,
    },

    #[error("you forgot to free this dynamic array")]
    #[diagnostic(code(E2054))]
    DanglingDynamicArray {
        #[label("declared here, never freed or returned")]
        span: SourceSpan,
    },

    #[error("declaration conflicts with parameter name")]
    #[diagnostic(code(E2055))]
    DeclConflictsWithParameter {
        #[label("conflicting declaration")]
        span: SourceSpan,
        #[label("parameter declared here")]
        parameter: SourceSpan,
    },

    #[error("function `{name}` has non-void return type, and must return a value")]
    #[diagnostic(code(E2056))]
    FunctionMustReturnValue {
        name: String,
        #[label("no value produced")]
        span: SourceSpan,
    },

    #[error("type of last expression {found} is not convertible to return type {ret}")]
    #[diagnostic(code(E2057))]
    LastExprNotConvertible {
        found: String,
        ret: String,
        #[label("this becomes the return value")]
        span: SourceSpan,
    },

    #[error("unhandled expression in {op}")]
    #[diagnostic(code(E2058))]
    SizeofUnhandled {
        op: &'static str,
        #[label("cannot take the size of this")]
        span: SourceSpan,
    },
}

#[derive(Error, Debug, Diagnostic, Clone)]
pub enum SemanticWarning {
    #[error("you typed '{typed}'; we are treating it as '{actual}' because it's so close")]
    #[diagnostic(code(W2001), severity(Warning))]
    TreatingAs {
        typed: String,
        actual: String,
        #[label("misspelled here")]
        span: SourceSpan,
        #[label("declared here")]
        declared: SourceSpan,
    },

    #[error("expression result unused")]
    #[diagnostic(code(W2002), severity(Warning))]
    UnusedResult {
        #[label("this value is discarded")]
        span: SourceSpan,
    },

    #[error("'used' has no effect on this function")]
    #[diagnostic(code(W2003), severity(Warning))]
    UsedHasNoEffect {
        #[label("only internal functions are affected")]
        span: SourceSpan,
    },
}

/// A semantic error together with the span it was reported at.
#[derive(Debug, Clone)]
pub struct TypeError {
    pub error: SemanticError,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct TypeWarning {
    pub warning: SemanticWarning,
    pub span: Span,
}

/// Structural failures. These abort the analysis pass; the driver maps them
/// to exit code 18 (fatal) or 17 (internal compiler error).
#[derive(Error, Debug, Diagnostic)]
pub enum FatalError {
    #[error("could not find imported module {name} in any include directory\npaths tried:\n{paths_tried}")]
    #[diagnostic(code(F0001), help("pass -I <dir> to add metadata search directories"))]
    ImportNotFound {
        name: String,
        paths_tried: String,
        #[label("imported here")]
        span: SourceSpan,
    },

    #[error("metadata for module {name} at {path} has invalid magic bytes")]
    #[diagnostic(code(F0002))]
    BadMetadataMagic { name: String, path: String },

    #[error("found metadata for module {name} at {path}, but the file is empty")]
    #[diagnostic(code(F0003))]
    EmptyMetadata { name: String, path: String },

    #[error("metadata for module {name} at {path} is corrupt: {reason}")]
    #[diagnostic(code(F0004))]
    CorruptMetadata {
        name: String,
        path: String,
        reason: String,
    },

    #[error("internal compiler error: {0}")]
    #[diagnostic(code(ICE))]
    Ice(#[from] IceError),
}

/// A compiler bug marker. Exit code 17.
#[derive(Error, Debug, Diagnostic, Clone)]
#[error("{message}")]
pub struct IceError {
    pub message: String,
}

impl IceError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
