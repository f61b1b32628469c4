// analyzer/types.rs
//
// Type analysis. Named types resolve in place (the slot is overwritten with
// the resolved node); aggregates get their layout computed here.

use glint_frontend::{ExprKind, SemaState, TypeId, TypeKind};
use rustc_hash::FxHashSet;

use super::{layout, Sema};
use crate::errors::SemanticError;
use crate::eval;

impl<'a> Sema<'a> {
    /// Analyse the type in `slot`, possibly replacing it. Returns whether
    /// the type is usable.
    pub(crate) fn analyse_type(&mut self, slot: &mut TypeId) -> bool {
        let id = *slot;
        if self.module.types.get(id).state != SemaState::NotAnalysed {
            return self.module.types.get(id).state == SemaState::Done;
        }
        self.module.types.get_mut(id).state = SemaState::InProgress;

        match self.module.types.get(id).kind.clone() {
            // Builtins and FFI types are born analysed.
            TypeKind::Builtin(_) | TypeKind::Ffi(_) => {}

            TypeKind::Named { name, scope } => {
                self.resolve_named_type(slot, id, name, scope);
            }

            TypeKind::Pointer { elem } => {
                let mut elem_slot = elem;
                self.analyse_type(&mut elem_slot);
                if self.module.types.is_reference(elem_slot) {
                    if self.module.types.get(elem_slot).state == SemaState::Done {
                        let span = self.module.types.get(id).span;
                        self.error(
                            span,
                            SemanticError::ReferenceElement {
                                container: "pointer",
                                elem: self.type_name(elem_slot),
                                span: span.into(),
                            },
                        );
                    }
                    self.module.types.get_mut(id).state = SemaState::Errored;
                }
                self.set_elem(id, elem_slot);
            }

            TypeKind::Reference { elem } => {
                let mut elem_slot = elem;
                self.analyse_type(&mut elem_slot);
                // Collapse ref-to-ref.
                while let TypeKind::Reference { elem: inner } =
                    self.module.types.get(elem_slot).kind
                {
                    elem_slot = inner;
                }
                self.set_elem(id, elem_slot);
            }

            TypeKind::Array { elem, size } => {
                let mut elem_slot = elem;
                self.analyse_type(&mut elem_slot);
                elem_slot = self.decl_type_decay(elem_slot);
                self.check_element_not_reference(id, elem_slot, "array");
                self.set_elem(id, elem_slot);

                let mut size_slot = size;
                self.analyse(&mut size_slot, None);
                if self.module.expr(size_slot).ok() {
                    match eval::evaluate(self.module, size_slot).and_then(|v| v.as_int()) {
                        Some(value) => {
                            if value < 1 {
                                let span = self.module.types.get(id).span;
                                self.error(
                                    span,
                                    SemanticError::ArraySizeNotPositive { span: span.into() },
                                );
                                self.module.types.get_mut(id).state = SemaState::Errored;
                            }
                            let span = self.module.expr(size_slot).span;
                            let constant = self.module.alloc_expr(
                                ExprKind::Constant {
                                    operand: Some(size_slot),
                                    value: glint_frontend::EvalValue::Int(value),
                                },
                                TypeId::INT,
                                span,
                            );
                            self.module.expr_mut(constant).state = SemaState::Done;
                            size_slot = constant;
                        }
                        None => {
                            let span = self.module.types.get(id).span;
                            self.error(
                                span,
                                SemanticError::ArraySizeNotConstant { span: span.into() },
                            );
                            self.module.types.get_mut(id).state = SemaState::Errored;
                        }
                    }
                }
                if let TypeKind::Array { size, .. } = &mut self.module.types.get_mut(id).kind {
                    *size = size_slot;
                }
            }

            TypeKind::DynamicArray { elem, initial_size, .. } => {
                let mut elem_slot = elem;
                self.analyse_type(&mut elem_slot);
                elem_slot = self.decl_type_decay(elem_slot);
                self.check_element_not_reference(id, elem_slot, "dynamic array");
                self.set_elem(id, elem_slot);

                let shadow = layout::build_dynamic_array_shadow(self.module, id);
                if let TypeKind::DynamicArray { shadow: s, .. } =
                    &mut self.module.types.get_mut(id).kind
                {
                    *s = Some(shadow);
                }

                if let Some(init) = initial_size {
                    let mut init_slot = init;
                    self.analyse(&mut init_slot, None);
                    if let TypeKind::DynamicArray { initial_size, .. } =
                        &mut self.module.types.get_mut(id).kind
                    {
                        *initial_size = Some(init_slot);
                    }
                }
            }

            TypeKind::Sum { members, .. } => {
                if members.len() < 2 {
                    let span = self.module.types.get(id).span;
                    self.error(span, SemanticError::SumTypeTooFewMembers { span: span.into() });
                    self.module.types.get_mut(id).state = SemaState::Errored;
                    return false;
                }

                let mut byte_size = 0usize;
                let mut alignment = 1usize;
                let mut new_members = members;
                for member in new_members.iter_mut() {
                    let mut mty = member.ty;
                    self.analyse_type(&mut mty);
                    mty = self.decl_type_decay(mty);
                    member.ty = mty;
                    if self.module.types.sema_errored(mty) {
                        self.module.types.get_mut(id).state = SemaState::Errored;
                        continue;
                    }
                    byte_size = byte_size.max(self.module.size_of(mty));
                    alignment = alignment.max(self.module.align_of(mty));
                }
                if let TypeKind::Sum {
                    members,
                    byte_size: bs,
                    alignment: al,
                    ..
                } = &mut self.module.types.get_mut(id).kind
                {
                    *members = new_members;
                    *bs = byte_size;
                    *al = alignment;
                }

                let shadow = layout::build_sum_shadow(self.module, id);
                if let TypeKind::Sum { shadow: s, .. } = &mut self.module.types.get_mut(id).kind
                {
                    *s = Some(shadow);
                }
            }

            TypeKind::Union { members, .. } => {
                let mut byte_size = 0usize;
                let mut alignment = 1usize;
                let mut new_members = members;
                for member in new_members.iter_mut() {
                    let mut mty = member.ty;
                    self.analyse_type(&mut mty);
                    mty = self.decl_type_decay(mty);
                    member.ty = mty;
                    if self.module.types.sema_errored(mty) {
                        self.module.types.get_mut(id).state = SemaState::Errored;
                        continue;
                    }
                    byte_size = byte_size.max(self.module.size_of(mty));
                    alignment = alignment.max(self.module.align_of(mty));
                }
                if let TypeKind::Union {
                    members,
                    byte_size: bs,
                    alignment: al,
                } = &mut self.module.types.get_mut(id).kind
                {
                    *members = new_members;
                    *bs = byte_size;
                    *al = alignment;
                }
            }

            TypeKind::Function { ret, params, attrs } => {
                let mut ret_slot = ret;
                self.analyse_type(&mut ret_slot);

                let mut new_params = params;
                for param in new_params.iter_mut() {
                    let mut pty = self.decl_type_decay(param.ty);
                    self.analyse_type(&mut pty);
                    param.ty = pty;
                }
                if let TypeKind::Function { ret, params, .. } =
                    &mut self.module.types.get_mut(id).kind
                {
                    *ret = ret_slot;
                    *params = new_params;
                }

                let span = self.module.types.get(id).span;
                if self.module.types.get(ret_slot).state == SemaState::Done
                    && ret_slot.is_void()
                    && attrs.discardable
                {
                    self.error(span, SemanticError::VoidDiscardable { span: span.into() });
                }
                if attrs.noreturn {
                    if attrs.const_ {
                        self.error(
                            span,
                            SemanticError::NoreturnConflict {
                                attr: "const",
                                span: span.into(),
                            },
                        );
                    }
                    if attrs.pure {
                        self.error(
                            span,
                            SemanticError::NoreturnConflict {
                                attr: "pure",
                                span: span.into(),
                            },
                        );
                    }
                }
                if attrs.inline && attrs.noinline {
                    self.error(span, SemanticError::InlineNoinline { span: span.into() });
                }
            }

            TypeKind::Integer { bits, .. } => {
                if bits == 0 {
                    let span = self.module.types.get(id).span;
                    self.error(span, SemanticError::ZeroWidthInteger { span: span.into() });
                    self.module.types.get_mut(id).state = SemaState::Errored;
                }
            }

            TypeKind::Struct(s) => {
                let mut byte_size = 0usize;
                let mut alignment = 1usize;
                let mut members = s.members;
                for member in members.iter_mut() {
                    let mut mty = member.ty;
                    self.analyse_type(&mut mty);
                    mty = self.decl_type_decay(mty);
                    member.ty = mty;
                    if self.module.types.sema_errored(mty) {
                        self.module.types.get_mut(id).state = SemaState::Errored;
                        continue;
                    }

                    let msize = self.module.size_of(mty);
                    let malign = self.module.align_of(mty).max(1);
                    member.byte_offset =
                        glint_frontend::module::align_to(byte_size, malign);
                    byte_size = member.byte_offset + msize;
                    alignment = alignment.max(malign);
                }

                // Empty structs have a size of 0.
                let byte_size = if byte_size == 0 {
                    0
                } else {
                    glint_frontend::module::align_to(byte_size, alignment)
                };
                if let TypeKind::Struct(s) = &mut self.module.types.get_mut(id).kind {
                    s.members = members;
                    s.byte_size = byte_size;
                    s.alignment = alignment;
                }
            }

            TypeKind::Enum { .. } => {
                if !self.analyse_enum(id) {
                    return false;
                }
            }
        }

        if !self.module.types.get(*slot).state.done_or_errored() {
            self.module.types.get_mut(*slot).state = SemaState::Done;
        }
        self.module.types.get(*slot).state == SemaState::Done
    }

    fn set_elem(&mut self, id: TypeId, new_elem: TypeId) {
        match &mut self.module.types.get_mut(id).kind {
            TypeKind::Pointer { elem }
            | TypeKind::Reference { elem }
            | TypeKind::Array { elem, .. }
            | TypeKind::DynamicArray { elem, .. } => *elem = new_elem,
            _ => unreachable!("set_elem on a type without an element"),
        }
    }

    fn check_element_not_reference(&mut self, id: TypeId, elem: TypeId, container: &'static str) {
        if self.module.types.is_reference(elem) {
            if self.module.types.get(elem).state == SemaState::Done {
                let span = self.module.types.get(id).span;
                self.error(
                    span,
                    SemanticError::ReferenceElement {
                        container,
                        elem: self.type_name(elem),
                        span: span.into(),
                    },
                );
            }
            self.module.types.get_mut(id).state = SemaState::Errored;
        }
    }

    /// Walk the scope chain for a type declaration; replace the slot with
    /// the resolved type.
    fn resolve_named_type(
        &mut self,
        slot: &mut TypeId,
        id: TypeId,
        name: glint_frontend::Symbol,
        scope: glint_frontend::ScopeId,
    ) {
        let span = self.module.types.get(id).span;
        let mut resolved = None;
        let mut current = Some(scope);

        while let Some(scope_id) = current {
            let syms = self.module.find(scope_id, name);
            let Some(&sym) = syms.first() else {
                current = self.module.scope(scope_id).parent();
                continue;
            };

            match self.module.expr(sym).kind {
                ExprKind::TypeDecl { .. } | ExprKind::TypeAliasDecl { .. } => {
                    let mut e = sym;
                    self.analyse(&mut e, None);
                    debug_assert_eq!(e, sym);
                    resolved = Some(self.module.expr(sym).ty);
                }
                _ => {
                    let declared = self.module.expr(sym).span;
                    self.error(
                        span,
                        SemanticError::NotAType {
                            name: self.module.interner.resolve(name).to_string(),
                            span: span.into(),
                            declared: declared.into(),
                        },
                    );
                    self.module.types.get_mut(id).state = SemaState::Errored;
                }
            }
            break;
        }

        match resolved {
            Some(ty) => *slot = ty,
            None => {
                if self.module.types.get(id).state != SemaState::Errored {
                    self.error(
                        span,
                        SemanticError::UnknownTypeName {
                            name: self.module.interner.resolve(name).to_string(),
                            span: span.into(),
                        },
                    );
                    self.module.types.get_mut(id).state = SemaState::Errored;
                }
            }
        }
    }

    /// Validate the underlying type, reject duplicate names, and assign a
    /// value to every enumerator. Returns false on a hard enum error.
    fn analyse_enum(&mut self, id: TypeId) -> bool {
        let TypeKind::Enum {
            underlying,
            enumerators,
            scope,
        } = self.module.types.get(id).kind.clone()
        else {
            unreachable!();
        };
        let enum_span = self.module.types.get(id).span;

        let mut underlying_slot = underlying;
        if !self.analyse_type(&mut underlying_slot) {
            self.module.types.get_mut(id).state = SemaState::Errored;
            return false;
        }
        if let TypeKind::Enum { underlying, .. } = &mut self.module.types.get_mut(id).kind {
            *underlying = underlying_slot;
        }

        if !self.module.types.is_integer(underlying_slot, true) {
            self.error(
                enum_span,
                SemanticError::EnumUnderlyingNotInteger {
                    span: enum_span.into(),
                },
            );
            self.module.types.get_mut(id).state = SemaState::Errored;
            return false;
        }

        // Duplicate enumerator names.
        let mut seen = FxHashSet::default();
        for &enumerator in &enumerators {
            let ExprKind::EnumeratorDecl { name, .. } = self.module.expr(enumerator).kind
            else {
                continue;
            };
            if !seen.insert(name) {
                let span = self.module.expr(enumerator).span;
                self.error(
                    span,
                    SemanticError::DuplicateEnumerator {
                        name: self.module.interner.resolve(name).to_string(),
                        span: span.into(),
                    },
                );
                self.module.types.get_mut(id).state = SemaState::Errored;
                return false;
            }
        }

        let mut next_value: i64 = -1;
        for &enumerator in &enumerators {
            let ExprKind::EnumeratorDecl { name, init } = self.module.expr(enumerator).kind
            else {
                continue;
            };
            self.module.expr_mut(enumerator).ty = id;

            let Some(init) = init else {
                // No initialiser: previous + 1, starting at 0.
                next_value += 1;
                let span = self.module.expr(enumerator).span;
                let constant = self.module.alloc_expr(
                    ExprKind::Constant {
                        operand: None,
                        value: glint_frontend::EvalValue::Int(next_value),
                    },
                    id,
                    span,
                );
                self.module.expr_mut(constant).state = SemaState::Done;
                if let ExprKind::EnumeratorDecl { init, .. } =
                    &mut self.module.expr_mut(enumerator).kind
                {
                    *init = Some(constant);
                }
                self.module.expr_mut(enumerator).state = SemaState::Done;
                let _ = self.module.declare(scope, name, enumerator);
                continue;
            };

            let mut init_slot = init;
            if !self.analyse(&mut init_slot, None) {
                let span = self.module.expr(init_slot).span;
                self.error(
                    span,
                    SemanticError::EnumInitInvalid {
                        name: self.module.interner.resolve(name).to_string(),
                        span: span.into(),
                    },
                );
                self.module.expr_mut(enumerator).state = SemaState::Errored;
                self.module.types.get_mut(id).state = SemaState::Errored;
                return false;
            }

            if !self.convert(&mut init_slot, underlying_slot) {
                let span = self.module.expr(init_slot).span;
                self.error(
                    span,
                    SemanticError::EnumInitNotConvertible {
                        name: self.module.interner.resolve(name).to_string(),
                        span: span.into(),
                        enum_span: Some(enum_span.into()),
                    },
                );
                self.module.expr_mut(enumerator).state = SemaState::Errored;
                self.module.types.get_mut(id).state = SemaState::Errored;
                return false;
            }

            // Enums are named constants; a non-constant initialiser is a
            // hard error.
            let Some(value) = eval::evaluate(self.module, init_slot).and_then(|v| v.as_int())
            else {
                let span = self.module.expr(init_slot).span;
                self.error(
                    span,
                    SemanticError::EnumInitNotConstant {
                        name: self.module.interner.resolve(name).to_string(),
                        span: span.into(),
                    },
                );
                self.module.expr_mut(enumerator).state = SemaState::Errored;
                self.module.types.get_mut(id).state = SemaState::Errored;
                return false;
            };

            let span = self.module.expr(init_slot).span;
            let constant = self.module.alloc_expr(
                ExprKind::Constant {
                    operand: Some(init_slot),
                    value: glint_frontend::EvalValue::Int(value),
                },
                underlying_slot,
                span,
            );
            self.module.expr_mut(constant).state = SemaState::Done;
            if let ExprKind::EnumeratorDecl { init, .. } =
                &mut self.module.expr_mut(enumerator).kind
            {
                *init = Some(constant);
            }
            self.module.expr_mut(enumerator).state = SemaState::Done;
            next_value = value;

            let _ = self.module.declare(scope, name, enumerator);
        }

        true
    }
}
