// analyzer/access.rs
//
// Member access dispatches on what the object is: a module reference, a
// type name (enumerators), a union, a sum, or a struct (including the
// shadow struct of a dynamic array).

use glint_frontend::{CastKind, ExprId, ExprKind, Member, SemaState, Symbol, TypeKind};

use super::Sema;
use crate::errors::SemanticError;
use crate::eval;

impl<'a> Sema<'a> {
    pub(super) fn analyse_member_access(
        &mut self,
        slot: &mut ExprId,
        id: ExprId,
        object: ExprId,
        name: Symbol,
    ) {
        let mut object = object;
        if !self.analyse(&mut object, None) {
            self.set_errored(id);
            self.write_object(id, object);
            return;
        }
        self.write_object(id, object);

        // Accessing a member of an imported module resolves the name in the
        // module's global scope instead.
        if let ExprKind::NameRef {
            target: Some(target),
            ..
        } = self.module.expr(object).kind
            && matches!(self.module.expr(target).kind, ExprKind::ModuleRef { .. })
        {
            let span = self.module.expr(id).span;
            let global = self.module.global_scope;
            let name_ref = self.module.alloc_expr(
                ExprKind::NameRef {
                    name,
                    scope: global,
                    target: None,
                },
                glint_frontend::TypeId::UNKNOWN,
                span,
            );
            *slot = name_ref;
            self.analyse(slot, None);
            return;
        }

        // The object may be a type name.
        if let ExprKind::NameRef {
            target: Some(target),
            ..
        } = self.module.expr(object).kind
            && matches!(self.module.expr(target).kind, ExprKind::TypeDecl { .. })
        {
            self.type_name_member(slot, id, target, name);
            return;
        }

        let stripped = self
            .module
            .types
            .strip_pointers_and_references(self.module.expr(object).ty);

        // Union member: the access is a reinterpretation of the storage.
        if let TypeKind::Union { members, .. } = &self.module.types.get(stripped).kind {
            let Some(member) = find_member(members, name) else {
                self.no_such_member(id, "union", stripped, name);
                return;
            };
            let member_ty = member.ty;
            let span = self.module.expr(id).span;
            let lvalue = self.module.expr(object).lvalue;
            let cast = self.module.alloc_expr(
                ExprKind::Cast {
                    kind: CastKind::Hard,
                    operand: object,
                },
                member_ty,
                span,
            );
            self.module.expr_mut(cast).lvalue = lvalue;
            *slot = cast;
            return;
        }

        // Sum member: the expression keeps the sum's type so the tag check
        // and data access can be generated later; reading it as a value
        // narrows it to the member type (see lvalue_to_rvalue).
        if let TypeKind::Sum {
            members, shadow, ..
        } = &self.module.types.get(stripped).kind
        {
            let Some(index) = member_index(members, name) else {
                self.no_such_member(id, "sum type", stripped, name);
                return;
            };
            let shadow = *shadow;
            self.module.expr_mut(id).ty = stripped;
            if let ExprKind::MemberAccess {
                strukt,
                member_index,
                ..
            } = &mut self.module.expr_mut(id).kind
            {
                *strukt = shadow;
                *member_index = Some(index);
            }
            self.module.expr_mut(id).lvalue = true;
            return;
        }

        // Otherwise the object must be a struct, or something carrying one.
        let struct_ty = match &self.module.types.get(stripped).kind {
            TypeKind::Struct(_) => stripped,
            TypeKind::DynamicArray { shadow, .. } => {
                shadow.expect("dynamic array shadow materialised by type analysis")
            }
            _ => {
                let span = self.module.expr(object).span;
                self.error(
                    span,
                    SemanticError::MemberAccessNotStruct {
                        found: self.type_name(self.module.expr(object).ty),
                        span: span.into(),
                    },
                );
                self.set_errored(id);
                return;
            }
        };

        let TypeKind::Struct(s) = &self.module.types.get(struct_ty).kind else {
            unreachable!("struct_ty is a struct");
        };
        let Some(index) = member_index(&s.members, name) else {
            self.no_such_member(id, "struct", struct_ty, name);
            return;
        };
        let member_ty = s.members[index].ty;

        if let ExprKind::MemberAccess {
            strukt,
            member_index,
            ..
        } = &mut self.module.expr_mut(id).kind
        {
            *strukt = Some(struct_ty);
            *member_index = Some(index);
        }

        // Dereference until we have an lvalue of the struct itself; the
        // access is an lvalue iff the object is.
        let lvalue = self.implicit_dereference(&mut object);
        self.write_object(id, object);
        self.module.expr_mut(id).lvalue = lvalue;
        self.module.expr_mut(id).ty = member_ty;
    }

    /// `EnumName.member` becomes the enumerator's constant.
    fn type_name_member(
        &mut self,
        slot: &mut ExprId,
        id: ExprId,
        type_decl: ExprId,
        name: Symbol,
    ) {
        let decl_ty = self.module.expr(type_decl).ty;
        let span = self.module.expr(id).span;

        match self.module.types.get(decl_ty).kind.clone() {
            TypeKind::Enum { enumerators, .. } => {
                let found = enumerators.iter().copied().find(|&e| {
                    self.module.expr(e).kind.decl_name() == Some(name)
                });
                let Some(enumerator) = found else {
                    self.error(
                        span,
                        SemanticError::NoSuchEnumerator {
                            ty: self.type_name(decl_ty),
                            name: self.module.interner.resolve(name).to_string(),
                            span: span.into(),
                        },
                    );
                    self.set_errored(id);
                    return;
                };

                match self.module.expr(enumerator).state {
                    SemaState::Errored => {
                        self.set_errored(id);
                        return;
                    }
                    SemaState::Done => {}
                    _ => {
                        self.error(
                            span,
                            SemanticError::EnumeratorUsedBeforeDefined {
                                name: self.module.interner.resolve(name).to_string(),
                                span: span.into(),
                            },
                        );
                        self.set_errored(id);
                        return;
                    }
                }

                let enum_ty = self.module.expr(enumerator).ty;
                self.module.expr_mut(id).ty = enum_ty;
                self.module.expr_mut(id).state = SemaState::Done;

                let ExprKind::EnumeratorDecl { init, .. } = self.module.expr(enumerator).kind
                else {
                    unreachable!();
                };
                let value = init
                    .and_then(|i| eval::evaluate(self.module, i))
                    .expect("analysed enumerator has a constant value");
                let constant = self.module.alloc_expr(
                    ExprKind::Constant {
                        operand: Some(id),
                        value,
                    },
                    enum_ty,
                    span,
                );
                *slot = constant;
            }
            TypeKind::Struct(_) => {
                self.set_ice("type introspection is not implemented");
                self.set_errored(id);
            }
            _ => {
                self.set_ice("member access on a type name that is not an enum");
                self.set_errored(id);
            }
        }
    }

    fn no_such_member(
        &mut self,
        id: ExprId,
        container: &'static str,
        ty: glint_frontend::TypeId,
        name: Symbol,
    ) {
        let span = self.module.expr(id).span;
        self.error(
            span,
            SemanticError::NoSuchMember {
                container,
                ty: self.type_name(ty),
                name: self.module.interner.resolve(name).to_string(),
                span: span.into(),
            },
        );
        self.set_errored(id);
    }

    fn write_object(&mut self, id: ExprId, object: ExprId) {
        if let ExprKind::MemberAccess { object: o, .. } = &mut self.module.expr_mut(id).kind {
            *o = object;
        }
    }
}

fn find_member(members: &[Member], name: Symbol) -> Option<&Member> {
    members.iter().find(|m| m.name == name)
}

fn member_index(members: &[Member], name: Symbol) -> Option<usize> {
    members.iter().position(|m| m.name == name)
}
