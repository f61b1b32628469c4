// ast.rs
//
// Expression nodes live in the module's arena and are addressed by ExprId.
// Analysis rewrites nodes by writing a new ExprId into the slot that refers
// to them, never by re-linking ownership.

use crate::intern::Symbol;
use crate::scope::ScopeId;
use crate::span::Span;
use crate::types::TypeId;

/// Handle to an expression node in the module arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExprId(pub u32);

impl std::fmt::Display for ExprId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "expr#{}", self.0)
    }
}

/// Per-node analysis status. Controls re-entry, error propagation, and the
/// use-after-free diagnostic for freed dynamic arrays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SemaState {
    #[default]
    NotAnalysed,
    InProgress,
    Done,
    Errored,
    /// A freed dynamic array declaration. Referencing it again is an error.
    NoLongerViable,
}

impl SemaState {
    pub fn done_or_errored(self) -> bool {
        matches!(self, SemaState::Done | SemaState::Errored)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Linkage {
    /// Local variable inside a function.
    LocalVar,
    /// Internal to this module.
    Internal,
    /// Visible to importers of this module.
    Exported,
    /// Declared in another module, brought in by deserialised metadata.
    Imported,
    /// Internal, but kept alive (`used` attribute).
    Used,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// `&` address-of
    Addr,
    /// `@` dereference
    Deref,
    /// `-` negation, or dynamic-array free
    Minus,
    /// `~` bitwise not
    BitNot,
    /// `!` logical not
    Not,
    /// `has` sum-type member test
    Has,
}

impl UnaryOp {
    pub fn as_str(self) -> &'static str {
        match self {
            UnaryOp::Addr => "&",
            UnaryOp::Deref => "@",
            UnaryOp::Minus => "-",
            UnaryOp::BitNot => "~",
            UnaryOp::Not => "!",
            UnaryOp::Has => "has",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    And,
    Or,
    /// `[ ]` pointer/array subscript
    Subscript,
    Mul,
    Div,
    Rem,
    Add,
    Sub,
    Shl,
    Shr,
    BitAnd,
    BitOr,
    BitXor,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    /// `:=`
    Assign,
}

impl BinaryOp {
    pub fn as_str(self) -> &'static str {
        match self {
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
            BinaryOp::Subscript => "[]",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::Eq => "=",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Gt => ">",
            BinaryOp::Le => "<=",
            BinaryOp::Ge => ">=",
            BinaryOp::Assign => ":=",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastKind {
    /// Inserted by the conversion engine.
    Implicit,
    LValueToRValue,
    LValueToReference,
    ReferenceToLValue,
    /// `as`
    Soft,
    /// `as!`
    Hard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntrinsicKind {
    Debugtrap,
    Filename,
    Inline,
    Line,
    MemCopy,
    MemSet,
    Syscall,
}

impl IntrinsicKind {
    pub fn name(self) -> &'static str {
        match self {
            IntrinsicKind::Debugtrap => "__builtin_debugtrap",
            IntrinsicKind::Filename => "__builtin_filename",
            IntrinsicKind::Inline => "__builtin_inline",
            IntrinsicKind::Line => "__builtin_line",
            IntrinsicKind::MemCopy => "__builtin_memcpy",
            IntrinsicKind::MemSet => "__builtin_memset",
            IntrinsicKind::Syscall => "__builtin_syscall",
        }
    }
}

/// A compile-time evaluated value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvalValue {
    Int(i64),
    String(Symbol),
}

impl EvalValue {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            EvalValue::Int(v) => Some(*v),
            EvalValue::String(_) => None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    IntegerLiteral(i64),
    StringLiteral(Symbol),
    /// `T(a, b, …)` with more than one value, or an untyped `{…}` literal.
    CompoundLiteral {
        values: Vec<ExprId>,
    },
    /// Declared type lives in `Expr::ty` (Unknown when inferred).
    VarDecl {
        name: Symbol,
        init: Option<ExprId>,
        linkage: Linkage,
    },
    FuncDecl {
        name: Symbol,
        body: Option<ExprId>,
        scope: ScopeId,
        linkage: Linkage,
        param_decls: Vec<ExprId>,
    },
    /// Declares a named type; the declared type lives in `Expr::ty`.
    TypeDecl {
        name: Symbol,
    },
    TypeAliasDecl {
        name: Symbol,
    },
    EnumeratorDecl {
        name: Symbol,
        init: Option<ExprId>,
    },
    NameRef {
        name: Symbol,
        scope: ScopeId,
        target: Option<ExprId>,
    },
    /// Sema-created reference to an imported module name. Member access on a
    /// name ref to this resolves against the module's global scope.
    ModuleRef {
        name: Symbol,
    },
    /// A type in expression position (`:int`). The type is `Expr::ty`.
    TypeExpr,
    Block {
        children: Vec<ExprId>,
    },
    If {
        cond: ExprId,
        then: ExprId,
        otherwise: Option<ExprId>,
    },
    While {
        cond: ExprId,
        body: ExprId,
    },
    For {
        init: ExprId,
        cond: ExprId,
        increment: ExprId,
        body: ExprId,
    },
    Return {
        value: Option<ExprId>,
    },
    Call {
        callee: ExprId,
        args: Vec<ExprId>,
    },
    IntrinsicCall {
        intrinsic: IntrinsicKind,
        args: Vec<ExprId>,
    },
    /// Target type lives in `Expr::ty`.
    Cast {
        kind: CastKind,
        operand: ExprId,
    },
    Unary {
        op: UnaryOp,
        operand: ExprId,
    },
    Binary {
        op: BinaryOp,
        lhs: ExprId,
        rhs: ExprId,
    },
    MemberAccess {
        object: ExprId,
        name: Symbol,
        /// Struct type (or shadow struct) the access was finalised against.
        strukt: Option<TypeId>,
        member_index: Option<usize>,
    },
    Sizeof {
        operand: ExprId,
    },
    Alignof {
        operand: ExprId,
    },
    OverloadSet {
        overloads: Vec<ExprId>,
    },
    /// A compile-time constant, wrapping the expression it was computed from.
    Constant {
        operand: Option<ExprId>,
        value: EvalValue,
    },
}

impl ExprKind {
    /// Whether this node is a declaration.
    pub fn is_decl(&self) -> bool {
        matches!(
            self,
            ExprKind::VarDecl { .. }
                | ExprKind::FuncDecl { .. }
                | ExprKind::TypeDecl { .. }
                | ExprKind::TypeAliasDecl { .. }
                | ExprKind::EnumeratorDecl { .. }
        )
    }

    /// Name of a declaration node, if it has one.
    pub fn decl_name(&self) -> Option<Symbol> {
        match self {
            ExprKind::VarDecl { name, .. }
            | ExprKind::FuncDecl { name, .. }
            | ExprKind::TypeDecl { name }
            | ExprKind::TypeAliasDecl { name }
            | ExprKind::EnumeratorDecl { name, .. } => Some(*name),
            _ => None,
        }
    }
}

/// An expression node. All nodes carry a type (possibly Unknown), an lvalue
/// flag, a source location, and a sema state.
#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    pub ty: TypeId,
    pub state: SemaState,
    pub lvalue: bool,
    pub span: Span,
}

impl Expr {
    /// Successfully analysed and usable.
    pub fn ok(&self) -> bool {
        self.state == SemaState::Done
    }
}
