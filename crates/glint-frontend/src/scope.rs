// scope.rs
//
// Scopes form a tree owned by the module. An identifier maps to a list of
// declarations: several function declarations may share a name (an overload
// set), anything else must be unique.

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::ast::ExprId;
use crate::intern::Symbol;

/// Handle to a scope in the module's scope arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(pub u32);

pub type DeclList = SmallVec<[ExprId; 1]>;

#[derive(Debug, Default)]
pub struct ScopeData {
    pub(crate) parent: Option<ScopeId>,
    pub(crate) symbols: FxHashMap<Symbol, DeclList>,
    /// Insertion order, for deterministic symbol walks.
    pub(crate) order: Vec<Symbol>,
}

impl ScopeData {
    pub fn new(parent: Option<ScopeId>) -> Self {
        Self {
            parent,
            symbols: FxHashMap::default(),
            order: Vec::new(),
        }
    }

    pub fn parent(&self) -> Option<ScopeId> {
        self.parent
    }

    /// Declarations for `name` in this scope only.
    pub fn find(&self, name: Symbol) -> &[ExprId] {
        self.symbols.get(&name).map(|l| l.as_slice()).unwrap_or(&[])
    }

    pub(crate) fn insert(&mut self, name: Symbol, decl: ExprId) {
        let list = self.symbols.entry(name).or_default();
        if list.is_empty() {
            self.order.push(name);
        }
        list.push(decl);
    }

    /// All declarations of this scope, in declaration order.
    pub fn symbols_in_order(&self) -> impl Iterator<Item = (Symbol, &DeclList)> {
        self.order.iter().map(|name| (*name, &self.symbols[name]))
    }
}
