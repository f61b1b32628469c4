// module.rs
//
// The module owns every AST and type node through its arenas. Handles stay
// valid for the module's lifetime; analysis rewrites slots, not nodes.

use crate::ast::{Expr, ExprId, ExprKind, SemaState};
use crate::intern::{Interner, Symbol};
use crate::scope::{ScopeData, ScopeId};
use crate::span::Span;
use crate::types::{TypeId, TypeKind, TypeStore};

/// A single `import` directive.
#[derive(Debug, Clone)]
pub struct ImportRef {
    pub name: Symbol,
    pub span: Span,
}

#[derive(Debug)]
pub struct Module {
    pub name: String,
    pub interner: Interner,
    pub types: TypeStore,
    exprs: Vec<Expr>,
    scopes: Vec<ScopeData>,
    /// Function declarations in declaration order. The synthesised top-level
    /// function comes first.
    pub functions: Vec<ExprId>,
    pub imports: Vec<ImportRef>,
    /// The scope holding exported and file-level declarations.
    pub global_scope: ScopeId,
    /// Body scope of the synthesised top-level function.
    pub top_level_scope: ScopeId,
    /// The synthesised top-level function, once the parser has built it.
    pub top_level_func: Option<ExprId>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        let mut scopes = Vec::new();
        scopes.push(ScopeData::new(None));
        let global_scope = ScopeId(0);
        Self {
            name: name.into(),
            interner: Interner::new(),
            types: TypeStore::new(),
            exprs: Vec::new(),
            scopes,
            functions: Vec::new(),
            imports: Vec::new(),
            global_scope,
            top_level_scope: global_scope,
            top_level_func: None,
        }
    }

    // ------------------------------------------------------------------
    // Expression arena
    // ------------------------------------------------------------------

    pub fn alloc_expr(&mut self, kind: ExprKind, ty: TypeId, span: Span) -> ExprId {
        let id = ExprId(self.exprs.len() as u32);
        self.exprs.push(Expr {
            kind,
            ty,
            state: SemaState::NotAnalysed,
            lvalue: false,
            span,
        });
        id
    }

    pub fn expr(&self, id: ExprId) -> &Expr {
        &self.exprs[id.0 as usize]
    }

    pub fn expr_mut(&mut self, id: ExprId) -> &mut Expr {
        &mut self.exprs[id.0 as usize]
    }

    pub fn expr_count(&self) -> usize {
        self.exprs.len()
    }

    // ------------------------------------------------------------------
    // Scopes
    // ------------------------------------------------------------------

    pub fn new_scope(&mut self, parent: Option<ScopeId>) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(ScopeData::new(parent));
        id
    }

    pub fn scope(&self, id: ScopeId) -> &ScopeData {
        &self.scopes[id.0 as usize]
    }

    /// Declarations for `name` in this scope only.
    pub fn find(&self, scope: ScopeId, name: Symbol) -> &[ExprId] {
        self.scope(scope).find(name)
    }

    /// Declarations for `name`, walking parent scopes until the first hit.
    pub fn find_recursive(&self, scope: ScopeId, name: Symbol) -> &[ExprId] {
        let mut current = Some(scope);
        while let Some(id) = current {
            let found = self.scope(id).find(name);
            if !found.is_empty() {
                return found;
            }
            current = self.scope(id).parent();
        }
        &[]
    }

    /// Declare `decl` as `name` in `scope`. An identifier may resolve to
    /// several function declarations (an overload set); any other collision
    /// is a conflict, reported by returning the previous declaration.
    pub fn declare(&mut self, scope: ScopeId, name: Symbol, decl: ExprId) -> Result<(), ExprId> {
        let existing = self.scope(scope).find(name);
        if let Some(&first) = existing.first() {
            let both_functions = matches!(self.expr(first).kind, ExprKind::FuncDecl { .. })
                && matches!(self.expr(decl).kind, ExprKind::FuncDecl { .. });
            if !both_functions {
                return Err(first);
            }
        }
        self.scopes[scope.0 as usize].insert(name, decl);
        Ok(())
    }

    /// Every declaration visible from `scope`, nearest scope first, in
    /// declaration order within each scope. Used for spelling suggestions.
    pub fn all_symbols_recursive(&self, scope: ScopeId) -> Vec<ExprId> {
        let mut out = Vec::new();
        let mut current = Some(scope);
        while let Some(id) = current {
            for (_, decls) in self.scope(id).symbols_in_order() {
                out.extend(decls.iter().copied());
            }
            current = self.scope(id).parent();
        }
        out
    }

    // ------------------------------------------------------------------
    // Type queries
    // ------------------------------------------------------------------

    /// Evaluated length of a fixed-size array type, if known.
    pub fn array_len(&self, ty: TypeId) -> Option<i64> {
        let TypeKind::Array { size, .. } = self.types.get(ty).kind else {
            return None;
        };
        match &self.expr(size).kind {
            ExprKind::IntegerLiteral(v) => Some(*v),
            ExprKind::Constant { value, .. } => value.as_int(),
            _ => None,
        }
    }

    /// Structural type equality.
    pub fn types_equal(&self, a: TypeId, b: TypeId) -> bool {
        if a == b {
            return true;
        }
        match (&self.types.get(a).kind, &self.types.get(b).kind) {
            (TypeKind::Builtin(x), TypeKind::Builtin(y)) => x == y,
            (TypeKind::Ffi(x), TypeKind::Ffi(y)) => x == y,
            (
                TypeKind::Integer { signed: s1, bits: b1 },
                TypeKind::Integer { signed: s2, bits: b2 },
            ) => s1 == s2 && b1 == b2,
            (TypeKind::Named { name: n1, scope: s1 }, TypeKind::Named { name: n2, scope: s2 }) => {
                n1 == n2 && s1 == s2
            }
            (TypeKind::Pointer { elem: e1 }, TypeKind::Pointer { elem: e2 })
            | (TypeKind::Reference { elem: e1 }, TypeKind::Reference { elem: e2 }) => {
                self.types_equal(*e1, *e2)
            }
            (TypeKind::Array { elem: e1, .. }, TypeKind::Array { elem: e2, .. }) => {
                self.types_equal(*e1, *e2)
                    && match (self.array_len(a), self.array_len(b)) {
                        (Some(l1), Some(l2)) => l1 == l2,
                        _ => false,
                    }
            }
            (
                TypeKind::DynamicArray { elem: e1, .. },
                TypeKind::DynamicArray { elem: e2, .. },
            ) => self.types_equal(*e1, *e2),
            (TypeKind::Struct(s1), TypeKind::Struct(s2)) => {
                self.members_equal(&s1.members, &s2.members)
            }
            (
                TypeKind::Union { members: m1, .. },
                TypeKind::Union { members: m2, .. },
            )
            | (TypeKind::Sum { members: m1, .. }, TypeKind::Sum { members: m2, .. }) => {
                self.members_equal(m1, m2)
            }
            (
                TypeKind::Function { ret: r1, params: p1, .. },
                TypeKind::Function { ret: r2, params: p2, .. },
            ) => {
                self.types_equal(*r1, *r2)
                    && p1.len() == p2.len()
                    && p1
                        .iter()
                        .zip(p2.iter())
                        .all(|(x, y)| self.types_equal(x.ty, y.ty))
            }
            // Enums are nominal.
            (TypeKind::Enum { .. }, TypeKind::Enum { .. }) => false,
            _ => false,
        }
    }

    fn members_equal(&self, a: &[crate::types::Member], b: &[crate::types::Member]) -> bool {
        a.len() == b.len()
            && a.iter()
                .zip(b.iter())
                .all(|(x, y)| x.name == y.name && self.types_equal(x.ty, y.ty))
    }

    /// Size in bytes on the (fixed, 64-bit) target.
    pub fn size_of(&self, ty: TypeId) -> usize {
        use crate::types::BuiltinType;
        match &self.types.get(ty).kind {
            TypeKind::Builtin(b) => match b {
                BuiltinType::Unknown | BuiltinType::Void => 0,
                BuiltinType::Bool | BuiltinType::Byte => 1,
                BuiltinType::Int | BuiltinType::UInt | BuiltinType::OverloadSet => 8,
            },
            TypeKind::Ffi(f) => f.byte_size(),
            TypeKind::Integer { bits, .. } => (*bits as usize).div_ceil(8),
            TypeKind::Named { .. } => 0,
            TypeKind::Pointer { .. } | TypeKind::Reference { .. } | TypeKind::Function { .. } => 8,
            TypeKind::Array { elem, .. } => {
                let len = self.array_len(ty).unwrap_or(0).max(0) as usize;
                self.size_of(*elem) * len
            }
            TypeKind::DynamicArray { shadow, .. } => match shadow {
                Some(s) => self.size_of(*s),
                None => 24,
            },
            TypeKind::Struct(s) => s.byte_size,
            TypeKind::Union { byte_size, .. } | TypeKind::Sum { byte_size, .. } => *byte_size,
            TypeKind::Enum { underlying, .. } => self.size_of(*underlying),
        }
    }

    /// Alignment in bytes on the (fixed, 64-bit) target.
    pub fn align_of(&self, ty: TypeId) -> usize {
        use crate::types::BuiltinType;
        match &self.types.get(ty).kind {
            TypeKind::Builtin(b) => match b {
                BuiltinType::Unknown | BuiltinType::Void => 1,
                BuiltinType::Bool | BuiltinType::Byte => 1,
                BuiltinType::Int | BuiltinType::UInt | BuiltinType::OverloadSet => 8,
            },
            TypeKind::Ffi(f) => f.byte_size(),
            TypeKind::Integer { bits, .. } => {
                (*bits as usize).div_ceil(8).next_power_of_two().min(8).max(1)
            }
            TypeKind::Named { .. } => 1,
            TypeKind::Pointer { .. } | TypeKind::Reference { .. } | TypeKind::Function { .. } => 8,
            TypeKind::Array { elem, .. } => self.align_of(*elem),
            TypeKind::DynamicArray { .. } => 8,
            TypeKind::Struct(s) => s.alignment.max(1),
            TypeKind::Union { alignment, .. } | TypeKind::Sum { alignment, .. } => {
                (*alignment).max(1)
            }
            TypeKind::Enum { underlying, .. } => self.align_of(*underlying),
        }
    }
}

/// Round `value` up to the next multiple of `align`.
pub fn align_to(value: usize, align: usize) -> usize {
    if align <= 1 {
        return value;
    }
    value.div_ceil(align) * align
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn align_to_rounds_up() {
        assert_eq!(align_to(0, 8), 0);
        assert_eq!(align_to(1, 8), 8);
        assert_eq!(align_to(8, 8), 8);
        assert_eq!(align_to(9, 4), 12);
        assert_eq!(align_to(5, 1), 5);
    }

    #[test]
    fn declare_rejects_non_function_conflicts() {
        let mut module = Module::new("test");
        let name = module.interner.intern("x");
        let scope = module.global_scope;
        let a = module.alloc_expr(
            ExprKind::VarDecl {
                name,
                init: None,
                linkage: crate::ast::Linkage::Internal,
            },
            TypeId::INT,
            Span::default(),
        );
        let b = module.alloc_expr(
            ExprKind::VarDecl {
                name,
                init: None,
                linkage: crate::ast::Linkage::Internal,
            },
            TypeId::INT,
            Span::default(),
        );
        assert!(module.declare(scope, name, a).is_ok());
        assert_eq!(module.declare(scope, name, b), Err(a));
    }

    #[test]
    fn declare_allows_function_overloads() {
        let mut module = Module::new("test");
        let name = module.interner.intern("f");
        let scope = module.global_scope;
        let fn_scope = module.new_scope(Some(scope));
        let mk = |module: &mut Module| {
            module.alloc_expr(
                ExprKind::FuncDecl {
                    name,
                    body: None,
                    scope: fn_scope,
                    linkage: crate::ast::Linkage::Internal,
                    param_decls: Vec::new(),
                },
                TypeId::UNKNOWN,
                Span::default(),
            )
        };
        let a = mk(&mut module);
        let b = mk(&mut module);
        assert!(module.declare(scope, name, a).is_ok());
        assert!(module.declare(scope, name, b).is_ok());
        assert_eq!(module.find(scope, name).len(), 2);
    }

    #[test]
    fn find_recursive_walks_parents() {
        let mut module = Module::new("test");
        let name = module.interner.intern("outer");
        let global = module.global_scope;
        let inner = module.new_scope(Some(global));
        let decl = module.alloc_expr(
            ExprKind::VarDecl {
                name,
                init: None,
                linkage: crate::ast::Linkage::Internal,
            },
            TypeId::INT,
            Span::default(),
        );
        module.declare(global, name, decl).unwrap();
        assert!(module.find(inner, name).is_empty());
        assert_eq!(module.find_recursive(inner, name), &[decl]);
    }
}
