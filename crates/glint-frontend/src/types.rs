// types.rs
//
// Type nodes live in a per-module arena with reserved low indices for the
// builtin and C FFI types, so the common types are compile-time constants.

use crate::ast::{ExprId, SemaState};
use crate::intern::Symbol;
use crate::scope::ScopeId;
use crate::span::Span;

/// Handle to a type node in the module's type arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeId(pub u32);

impl TypeId {
    // Reserved TypeIds, guaranteed to be interned at these indices by
    // TypeStore::new().
    pub const UNKNOWN: TypeId = TypeId(0);
    pub const VOID: TypeId = TypeId(1);
    pub const BOOL: TypeId = TypeId(2);
    pub const BYTE: TypeId = TypeId(3);
    pub const INT: TypeId = TypeId(4);
    pub const UINT: TypeId = TypeId(5);
    /// Sentinel type of a name ref that resolved to an overload set.
    pub const OVERLOAD_SET: TypeId = TypeId(6);

    pub const C_CHAR: TypeId = TypeId(7);
    pub const C_SHORT: TypeId = TypeId(8);
    pub const C_INT: TypeId = TypeId(9);
    pub const C_LONG: TypeId = TypeId(10);
    pub const C_LONG_LONG: TypeId = TypeId(11);
    pub const C_UCHAR: TypeId = TypeId(12);
    pub const C_USHORT: TypeId = TypeId(13);
    pub const C_UINT: TypeId = TypeId(14);
    pub const C_ULONG: TypeId = TypeId(15);
    pub const C_ULONG_LONG: TypeId = TypeId(16);

    /// `@void`, the untyped pointer.
    pub const VOID_PTR: TypeId = TypeId(17);

    /// First non-reserved index.
    pub const FIRST_DYNAMIC: u32 = 18;

    #[inline]
    pub fn is_unknown(self) -> bool {
        self == Self::UNKNOWN
    }

    #[inline]
    pub fn is_void(self) -> bool {
        self == Self::VOID
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinType {
    Unknown,
    Void,
    Bool,
    Byte,
    Int,
    UInt,
    OverloadSet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiType {
    CChar,
    CShort,
    CInt,
    CLong,
    CLongLong,
    CUChar,
    CUShort,
    CUInt,
    CULong,
    CULongLong,
}

impl FfiType {
    pub fn is_signed(self) -> bool {
        matches!(
            self,
            FfiType::CChar | FfiType::CShort | FfiType::CInt | FfiType::CLong | FfiType::CLongLong
        )
    }

    /// Width on the (fixed, 64-bit SysV) target.
    pub fn byte_size(self) -> usize {
        match self {
            FfiType::CChar | FfiType::CUChar => 1,
            FfiType::CShort | FfiType::CUShort => 2,
            FfiType::CInt | FfiType::CUInt => 4,
            FfiType::CLong | FfiType::CULong | FfiType::CLongLong | FfiType::CULongLong => 8,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            FfiType::CChar => "cchar",
            FfiType::CShort => "cshort",
            FfiType::CInt => "cint",
            FfiType::CLong => "clong",
            FfiType::CLongLong => "clonglong",
            FfiType::CUChar => "cuchar",
            FfiType::CUShort => "cushort",
            FfiType::CUInt => "cuint",
            FfiType::CULong => "culong",
            FfiType::CULongLong => "culonglong",
        }
    }
}

/// A named member of a struct, union, or sum type.
#[derive(Debug, Clone)]
pub struct Member {
    pub name: Symbol,
    pub ty: TypeId,
    /// Byte offset within the aggregate. Always 0 for union and sum members.
    pub byte_offset: usize,
    pub span: Span,
}

#[derive(Debug, Clone, Default)]
pub struct StructType {
    pub members: Vec<Member>,
    pub byte_size: usize,
    pub alignment: usize,
}

/// Function type attribute set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FuncAttrs {
    pub const_: bool,
    pub discardable: bool,
    pub inline: bool,
    pub noinline: bool,
    pub noreturn: bool,
    pub pure: bool,
    pub used: bool,
}

#[derive(Debug, Clone)]
pub struct Param {
    pub name: Option<Symbol>,
    pub ty: TypeId,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum TypeKind {
    Builtin(BuiltinType),
    Ffi(FfiType),
    Integer {
        signed: bool,
        bits: u16,
    },
    /// An unresolved type name. Never survives successful analysis.
    Named {
        name: Symbol,
        scope: ScopeId,
    },
    Pointer {
        elem: TypeId,
    },
    Reference {
        elem: TypeId,
    },
    Array {
        elem: TypeId,
        /// Length expression; replaced by its evaluated constant by analysis.
        size: ExprId,
    },
    DynamicArray {
        elem: TypeId,
        initial_size: Option<ExprId>,
        /// `{data, length, capacity}` runtime representation.
        shadow: Option<TypeId>,
    },
    Struct(StructType),
    Union {
        members: Vec<Member>,
        byte_size: usize,
        alignment: usize,
    },
    Sum {
        members: Vec<Member>,
        byte_size: usize,
        alignment: usize,
        /// `{tag, data}` runtime representation.
        shadow: Option<TypeId>,
    },
    Enum {
        underlying: TypeId,
        /// EnumeratorDecl expressions, in declaration order.
        enumerators: Vec<ExprId>,
        scope: ScopeId,
    },
    Function {
        ret: TypeId,
        params: Vec<Param>,
        attrs: FuncAttrs,
    },
}

#[derive(Debug, Clone)]
pub struct TypeNode {
    pub kind: TypeKind,
    pub state: SemaState,
    pub span: Span,
}

#[derive(Debug)]
pub struct TypeStore {
    nodes: Vec<TypeNode>,
}

impl TypeStore {
    pub fn new() -> Self {
        let mut store = Self { nodes: Vec::new() };
        let mut builtin = |kind: TypeKind| {
            store.nodes.push(TypeNode {
                kind,
                state: SemaState::Done,
                span: Span::default(),
            });
        };

        builtin(TypeKind::Builtin(BuiltinType::Unknown));
        builtin(TypeKind::Builtin(BuiltinType::Void));
        builtin(TypeKind::Builtin(BuiltinType::Bool));
        builtin(TypeKind::Builtin(BuiltinType::Byte));
        builtin(TypeKind::Builtin(BuiltinType::Int));
        builtin(TypeKind::Builtin(BuiltinType::UInt));
        builtin(TypeKind::Builtin(BuiltinType::OverloadSet));
        builtin(TypeKind::Ffi(FfiType::CChar));
        builtin(TypeKind::Ffi(FfiType::CShort));
        builtin(TypeKind::Ffi(FfiType::CInt));
        builtin(TypeKind::Ffi(FfiType::CLong));
        builtin(TypeKind::Ffi(FfiType::CLongLong));
        builtin(TypeKind::Ffi(FfiType::CUChar));
        builtin(TypeKind::Ffi(FfiType::CUShort));
        builtin(TypeKind::Ffi(FfiType::CUInt));
        builtin(TypeKind::Ffi(FfiType::CULong));
        builtin(TypeKind::Ffi(FfiType::CULongLong));
        builtin(TypeKind::Pointer {
            elem: TypeId::VOID,
        });

        debug_assert_eq!(store.nodes.len() as u32, TypeId::FIRST_DYNAMIC);
        store
    }

    pub fn alloc(&mut self, kind: TypeKind, span: Span) -> TypeId {
        let id = TypeId(self.nodes.len() as u32);
        self.nodes.push(TypeNode {
            kind,
            state: SemaState::NotAnalysed,
            span,
        });
        id
    }

    pub fn get(&self, id: TypeId) -> &TypeNode {
        &self.nodes[id.0 as usize]
    }

    pub fn get_mut(&mut self, id: TypeId) -> &mut TypeNode {
        &mut self.nodes[id.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn is_pointer(&self, id: TypeId) -> bool {
        matches!(self.get(id).kind, TypeKind::Pointer { .. })
    }

    pub fn is_reference(&self, id: TypeId) -> bool {
        matches!(self.get(id).kind, TypeKind::Reference { .. })
    }

    pub fn is_function(&self, id: TypeId) -> bool {
        matches!(self.get(id).kind, TypeKind::Function { .. })
    }

    pub fn is_array(&self, id: TypeId) -> bool {
        matches!(self.get(id).kind, TypeKind::Array { .. })
    }

    pub fn is_dynamic_array(&self, id: TypeId) -> bool {
        matches!(self.get(id).kind, TypeKind::DynamicArray { .. })
    }

    pub fn is_enum(&self, id: TypeId) -> bool {
        matches!(self.get(id).kind, TypeKind::Enum { .. })
    }

    pub fn is_sum(&self, id: TypeId) -> bool {
        matches!(self.get(id).kind, TypeKind::Sum { .. })
    }

    /// Element type of pointers, references, arrays, and dynamic arrays.
    pub fn elem(&self, id: TypeId) -> Option<TypeId> {
        match self.get(id).kind {
            TypeKind::Pointer { elem }
            | TypeKind::Reference { elem }
            | TypeKind::Array { elem, .. }
            | TypeKind::DynamicArray { elem, .. } => Some(elem),
            _ => None,
        }
    }

    /// A plain integer type (bool excluded unless `include_bool`).
    pub fn is_integer(&self, id: TypeId, include_bool: bool) -> bool {
        match &self.get(id).kind {
            TypeKind::Builtin(BuiltinType::Bool) => include_bool,
            TypeKind::Builtin(BuiltinType::Byte)
            | TypeKind::Builtin(BuiltinType::Int)
            | TypeKind::Builtin(BuiltinType::UInt)
            | TypeKind::Ffi(_)
            | TypeKind::Integer { .. } => true,
            _ => false,
        }
    }

    pub fn is_unsigned_int(&self, id: TypeId) -> bool {
        match &self.get(id).kind {
            TypeKind::Builtin(BuiltinType::Byte) | TypeKind::Builtin(BuiltinType::UInt) => true,
            TypeKind::Ffi(ffi) => !ffi.is_signed(),
            TypeKind::Integer { signed, .. } => !signed,
            _ => false,
        }
    }

    /// Peel pointers and references down to the underlying value type.
    pub fn strip_pointers_and_references(&self, mut id: TypeId) -> TypeId {
        loop {
            match self.get(id).kind {
                TypeKind::Pointer { elem } | TypeKind::Reference { elem } => id = elem,
                _ => return id,
            }
        }
    }

    pub fn sema_errored(&self, id: TypeId) -> bool {
        self.get(id).state == SemaState::Errored
    }

    pub fn name_of_builtin(&self, id: TypeId) -> Option<&'static str> {
        match &self.get(id).kind {
            TypeKind::Builtin(b) => Some(match b {
                BuiltinType::Unknown => "<unknown>",
                BuiltinType::Void => "void",
                BuiltinType::Bool => "bool",
                BuiltinType::Byte => "byte",
                BuiltinType::Int => "int",
                BuiltinType::UInt => "uint",
                BuiltinType::OverloadSet => "<overload set>",
            }),
            TypeKind::Ffi(f) => Some(f.name()),
            _ => None,
        }
    }
}

impl Default for TypeStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_ids_are_stable() {
        let store = TypeStore::new();
        assert!(matches!(
            store.get(TypeId::VOID).kind,
            TypeKind::Builtin(BuiltinType::Void)
        ));
        assert!(matches!(
            store.get(TypeId::C_INT).kind,
            TypeKind::Ffi(FfiType::CInt)
        ));
        assert!(matches!(
            store.get(TypeId::VOID_PTR).kind,
            TypeKind::Pointer { elem: TypeId::VOID }
        ));
        assert_eq!(store.len() as u32, TypeId::FIRST_DYNAMIC);
    }

    #[test]
    fn strip_pointers_and_references() {
        let mut store = TypeStore::new();
        let p = store.alloc(
            TypeKind::Pointer { elem: TypeId::INT },
            Span::default(),
        );
        let r = store.alloc(TypeKind::Reference { elem: p }, Span::default());
        assert_eq!(store.strip_pointers_and_references(r), TypeId::INT);
        assert_eq!(store.elem(r), Some(p));
    }

    #[test]
    fn integer_classification() {
        let store = TypeStore::new();
        assert!(store.is_integer(TypeId::INT, false));
        assert!(store.is_integer(TypeId::C_UINT, false));
        assert!(!store.is_integer(TypeId::BOOL, false));
        assert!(store.is_integer(TypeId::BOOL, true));
        assert!(store.is_unsigned_int(TypeId::UINT));
        assert!(store.is_unsigned_int(TypeId::BYTE));
        assert!(!store.is_unsigned_int(TypeId::INT));
    }
}
