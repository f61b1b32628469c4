// analyzer/name_ref.rs
//
// Name resolution, including the auto-spellcheck: an unknown identifier
// whose OSA distance to a visible declaration is exactly one (same length,
// more than three characters) is silently retargeted with a warning.

use glint_frontend::{ExprId, ExprKind, ScopeId, SemaState, Symbol, TypeId};

use super::Sema;
use crate::errors::{SemanticError, SemanticWarning};
use crate::spellcheck::osa_distance;

impl<'a> Sema<'a> {
    pub(super) fn analyse_name_ref(&mut self, id: ExprId, name: Symbol, scope: ScopeId) {
        let syms = self.module.find_recursive(scope, name).to_vec();

        if syms.is_empty() {
            self.resolve_unknown_name(id, name, scope);
            return;
        }

        // Exactly one non-function declaration, or one-or-more function
        // declarations forming an overload set.
        if !matches!(self.module.expr(syms[0]).kind, ExprKind::FuncDecl { .. }) {
            let target = syms[0];
            let mut slot = target;
            self.analyse(&mut slot, None);
            debug_assert_eq!(slot, target, "declarations are analysed in place");

            let span = self.module.expr(id).span;
            match self.module.expr(target).state {
                SemaState::NoLongerViable => {
                    self.error(
                        span,
                        SemanticError::UseAfterFree {
                            name: self.module.interner.resolve(name).to_string(),
                            span: span.into(),
                        },
                    );
                }
                // The declaration is mid-analysis: the name is being used
                // inside its own initialiser.
                SemaState::InProgress => {
                    self.error(
                        span,
                        SemanticError::SelfReferentialInit {
                            name: self.module.interner.resolve(name).to_string(),
                            span: span.into(),
                        },
                    );
                    self.set_errored(id);
                    return;
                }
                _ => {}
            }

            self.retarget(id, target);
            return;
        }

        if syms.len() == 1 {
            let target = syms[0];
            if let ExprKind::NameRef { target: t, .. } = &mut self.module.expr_mut(id).kind {
                *t = Some(target);
            }
            self.module.expr_mut(id).ty = self.module.expr(target).ty;
            return;
        }

        // Several functions share the name: build and validate an overload
        // set. Its type is a sentinel; the real type depends on the call.
        let span = self.module.expr(id).span;
        let overload_set = self.module.alloc_expr(
            ExprKind::OverloadSet { overloads: syms },
            TypeId::OVERLOAD_SET,
            span,
        );
        let mut slot = overload_set;
        self.analyse(&mut slot, None);
        if self.module.expr(slot).state == SemaState::Errored {
            self.set_errored(id);
        }
        if let ExprKind::NameRef { target: t, .. } = &mut self.module.expr_mut(id).kind {
            *t = Some(slot);
        }
        self.module.expr_mut(id).ty = TypeId::OVERLOAD_SET;
    }

    fn resolve_unknown_name(&mut self, id: ExprId, name: Symbol, scope: ScopeId) {
        // An import's name refers to the module itself.
        for import in self.module.imports.clone() {
            if import.name == name {
                let span = self.module.expr(id).span;
                let module_ref =
                    self.module
                        .alloc_expr(ExprKind::ModuleRef { name }, TypeId::VOID, span);
                self.module.expr_mut(module_ref).state = SemaState::Done;
                if let ExprKind::NameRef { target, .. } = &mut self.module.expr_mut(id).kind {
                    *target = Some(module_ref);
                }
                self.module.expr_mut(id).ty = TypeId::VOID;
                return;
            }
        }

        // Find the closest visible declaration to what was typed.
        let name_str = self.module.interner.resolve(name).to_string();
        let mut least: Option<(ExprId, usize)> = None;
        for decl in self.module.all_symbols_recursive(scope) {
            let Some(decl_name) = self.module.expr(decl).kind.decl_name() else {
                continue;
            };
            let distance = osa_distance(&name_str, self.module.interner.resolve(decl_name));
            debug_assert_ne!(
                distance, 0,
                "a zero-distance symbol would have been found by lookup"
            );
            if least.map(|(_, d)| distance < d).unwrap_or(true) {
                least = Some((decl, distance));
            }
        }

        // Auto-spellcheck: distance one, same length, and long enough that
        // the match is unambiguous. The common case is two transposed
        // characters (acbd for abcd). Three-letter names are too easy to
        // mistake for each other, so they only get a note.
        if let Some((decl, 1)) = least {
            let decl_name = self.module.expr(decl).kind.decl_name().unwrap();
            let decl_str = self.module.interner.resolve(decl_name).to_string();
            if name_str.len() > 3 && name_str.len() == decl_str.len() {
                let span = self.module.expr(id).span;
                let declared = self.module.expr(decl).span;
                self.warn(
                    span,
                    SemanticWarning::TreatingAs {
                        typed: name_str,
                        actual: decl_str,
                        span: span.into(),
                        declared: declared.into(),
                    },
                );
                self.retarget(id, decl);
                return;
            }
        }

        // A declaration in the top-level function's scope is invisible from
        // other functions; suggest `static`.
        let top_level = self
            .module
            .find(self.module.top_level_scope, name)
            .first()
            .map(|&d| self.module.expr(d).span.into());

        // Only suggest short names when they are very close; suggesting
        // `fas` for `bar` helps nobody.
        let mut suggested = None;
        let mut suggestion = String::new();
        if let Some((decl, distance)) = least {
            let decl_name = self.module.expr(decl).kind.decl_name().unwrap();
            let decl_str = self.module.interner.resolve(decl_name);
            let short_name = decl_str.len() < 5;
            if !short_name || distance <= 1 {
                suggested = Some(self.module.expr(decl).span.into());
                suggestion = decl_str.to_string();
            }
        }

        let span = self.module.expr(id).span;
        self.error(
            span,
            SemanticError::UnknownSymbol {
                name: self.module.interner.resolve(name).to_string(),
                span: span.into(),
                top_level,
                suggested,
                suggestion,
            },
        );
        self.set_errored(id);
    }

    fn retarget(&mut self, id: ExprId, target: ExprId) {
        let target_ty = self.module.expr(target).ty;
        let target_lvalue = self.module.expr(target).lvalue;
        if let ExprKind::NameRef { target: t, .. } = &mut self.module.expr_mut(id).kind {
            *t = Some(target);
        }
        self.module.expr_mut(id).ty = target_ty;
        if target_lvalue {
            self.module.expr_mut(id).lvalue = true;
        }
    }
}
