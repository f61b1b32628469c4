// analyzer/unary.rs

use glint_frontend::{ExprId, ExprKind, SemaState, TypeId, TypeKind, UnaryOp};

use super::Sema;
use crate::errors::SemanticError;

impl<'a> Sema<'a> {
    pub(super) fn analyse_unary(&mut self, id: ExprId, op: UnaryOp, operand: ExprId) {
        let mut operand = operand;
        if !self.analyse(&mut operand, None) {
            self.set_errored(id);
            self.write_unary_operand(id, operand);
            return;
        }

        let span = self.module.expr(id).span;
        match op {
            // Address of an lvalue or function.
            UnaryOp::Addr => {
                if !self.module.expr(operand).lvalue {
                    self.error(span, SemanticError::AddressOfRvalue { span: span.into() });
                    self.set_errored(id);
                } else {
                    let ty = self.module.expr(operand).ty;
                    let ptr = self.ptr_to(ty);
                    self.module.expr_mut(id).ty = ptr;
                }
            }

            // Turn a pointer back into an lvalue.
            UnaryOp::Deref => {
                self.lvalue_to_rvalue(&mut operand, true);
                let ty = self.module.expr(operand).ty;
                match self.module.types.get(ty).kind {
                    TypeKind::Pointer { elem } => {
                        self.module.expr_mut(id).ty = elem;
                        self.module.expr_mut(id).lvalue = true;
                    }
                    _ => {
                        self.error(
                            span,
                            SemanticError::DerefNonPointer {
                                found: self.type_name(ty),
                                span: span.into(),
                            },
                        );
                        self.set_errored(id);
                    }
                }
            }

            // Negate an integer, or free a dynamic array.
            UnaryOp::Minus => {
                if self
                    .module
                    .types
                    .is_dynamic_array(self.module.expr(operand).ty)
                {
                    self.module.expr_mut(id).ty = TypeId::VOID;
                    match self.module.expr(operand).kind {
                        ExprKind::NameRef {
                            target: Some(target),
                            ..
                        } => {
                            // Any later reference to the declaration is a
                            // use-after-free.
                            self.module.expr_mut(target).state = SemaState::NoLongerViable;
                            self.forget_dangling(target);
                        }
                        _ => {
                            self.set_ice(
                                "only a name reference can free a dynamic array",
                            );
                            self.set_errored(id);
                        }
                    }
                    self.write_unary_operand(id, operand);
                    return;
                }

                self.lvalue_to_rvalue(&mut operand, true);
                let ty = self.module.expr(operand).ty;
                if !self.module.types.is_integer(ty, false) {
                    self.error(
                        span,
                        SemanticError::UnaryOperandType {
                            op: "-",
                            expected: "an integer type",
                            found: self.type_name(ty),
                            span: span.into(),
                        },
                    );
                    self.set_errored(id);
                } else {
                    self.module.expr_mut(id).ty = ty;
                }
            }

            UnaryOp::BitNot => {
                self.lvalue_to_rvalue(&mut operand, true);
                let ty = self.module.expr(operand).ty;
                if !self.module.types.is_integer(ty, false) {
                    self.error(
                        span,
                        SemanticError::UnaryOperandType {
                            op: "~",
                            expected: "an integer type",
                            found: self.type_name(ty),
                            span: span.into(),
                        },
                    );
                    self.set_errored(id);
                } else {
                    self.module.expr_mut(id).ty = ty;
                }
            }

            // `!` accepts bool, integer, or pointer; the result is always
            // bool, so the node is usable even on bad input.
            UnaryOp::Not => {
                self.lvalue_to_rvalue(&mut operand, true);
                let ty = self.module.expr(operand).ty;
                if !self.module.types.is_pointer(ty) && !self.module.types.is_integer(ty, true) {
                    self.error(
                        span,
                        SemanticError::UnaryOperandType {
                            op: "!",
                            expected: "a bool, integer, or pointer type",
                            found: self.type_name(ty),
                            span: span.into(),
                        },
                    );
                }
                self.module.expr_mut(id).ty = TypeId::BOOL;
            }

            // Does the sum currently hold this member?
            UnaryOp::Has => {
                let ty = self.module.expr(operand).ty;
                if !self.module.types.is_sum(ty) {
                    let op_span = self.module.expr(operand).span;
                    self.error(
                        op_span,
                        SemanticError::UnaryOperandType {
                            op: "has",
                            expected: "a sum type",
                            found: self.type_name(ty),
                            span: op_span.into(),
                        },
                    );
                    self.set_errored(id);
                } else if !matches!(
                    self.module.expr(operand).kind,
                    ExprKind::MemberAccess { .. }
                ) {
                    let op_span = self.module.expr(operand).span;
                    self.error(
                        op_span,
                        SemanticError::HasOperandNotSumMember {
                            span: op_span.into(),
                        },
                    );
                    self.set_errored(id);
                } else {
                    self.module.expr_mut(id).ty = TypeId::BOOL;
                }
            }
        }

        self.write_unary_operand(id, operand);
    }

    fn write_unary_operand(&mut self, id: ExprId, operand: ExprId) {
        if let ExprKind::Unary { operand: o, .. } = &mut self.module.expr_mut(id).kind {
            *o = operand;
        }
    }
}
