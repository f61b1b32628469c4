// analyzer/binary.rs

use glint_frontend::{BinaryOp, EvalValue, ExprId, ExprKind, SemaState, TypeId, TypeKind};

use super::Sema;
use crate::errors::SemanticError;
use crate::eval;

impl<'a> Sema<'a> {
    pub(super) fn analyse_binary(&mut self, id: ExprId, op: BinaryOp, lhs: ExprId, rhs: ExprId) {
        let mut lhs = lhs;
        let mut rhs = rhs;

        // Give up if either operand is bad.
        let lhs_ok = self.analyse(&mut lhs, None);
        let rhs_ok = self.analyse(&mut rhs, None);
        if !lhs_ok || !rhs_ok {
            self.set_errored(id);
            self.write_operands(id, lhs, rhs);
            return;
        }

        let span = self.module.expr(id).span;
        match op {
            BinaryOp::And | BinaryOp::Or => {
                self.lvalue_to_rvalue(&mut lhs, true);
                self.lvalue_to_rvalue(&mut rhs, true);
                let lt = self.module.expr(lhs).ty;
                let rt = self.module.expr(rhs).ty;
                if !self.module.types.is_integer(lt, true)
                    || !self.module.types.is_integer(rt, true)
                {
                    self.error(
                        span,
                        SemanticError::ArithmeticOperands {
                            lhs: self.type_name(lt),
                            rhs: self.type_name(rt),
                            span: span.into(),
                        },
                    );
                    self.set_errored(id);
                    self.write_operands(id, lhs, rhs);
                    return;
                }

                for side in [&mut lhs, &mut rhs] {
                    if !self.convert(side, TypeId::BOOL) {
                        let side_span = self.module.expr(*side).span;
                        self.error(
                            side_span,
                            SemanticError::NotConvertible {
                                to: self.type_name(TypeId::BOOL),
                                span: side_span.into(),
                            },
                        );
                        self.set_errored(id);
                    }
                }
                self.module.expr_mut(id).ty = TypeId::BOOL;
            }

            BinaryOp::Subscript => {
                self.analyse_subscript(id, &mut lhs, &mut rhs);
            }

            // Pointer arithmetic lives in the subscript operator, so these
            // are integer-only.
            BinaryOp::Mul
            | BinaryOp::Div
            | BinaryOp::Rem
            | BinaryOp::Add
            | BinaryOp::Sub
            | BinaryOp::Shl
            | BinaryOp::Shr
            | BinaryOp::BitAnd
            | BinaryOp::BitOr
            | BinaryOp::BitXor => {
                self.lvalue_to_rvalue(&mut lhs, true);
                self.lvalue_to_rvalue(&mut rhs, true);
                let lt = self.module.expr(lhs).ty;
                let rt = self.module.expr(rhs).ty;
                if !self.module.types.is_integer(lt, false)
                    || !self.module.types.is_integer(rt, false)
                {
                    self.error(
                        span,
                        SemanticError::ArithmeticOperands {
                            lhs: self.type_name(lt),
                            rhs: self.type_name(rt),
                            span: span.into(),
                        },
                    );
                    self.set_errored(id);
                    self.write_operands(id, lhs, rhs);
                    return;
                }

                if !self.convert_to_common_type(&mut lhs, &mut rhs) {
                    self.error(
                        span,
                        SemanticError::ArithmeticOperands {
                            lhs: self.type_name(lt),
                            rhs: self.type_name(rt),
                            span: span.into(),
                        },
                    );
                    self.set_errored(id);
                    self.write_operands(id, lhs, rhs);
                    return;
                }

                let common = self.module.expr(lhs).ty;
                self.module.expr_mut(id).ty = common;
            }

            BinaryOp::Eq
            | BinaryOp::Ne
            | BinaryOp::Lt
            | BinaryOp::Gt
            | BinaryOp::Le
            | BinaryOp::Ge => {
                self.lvalue_to_rvalue(&mut lhs, true);
                self.lvalue_to_rvalue(&mut rhs, true);
                let lt = self.module.expr(lhs).ty;
                let rt = self.module.expr(rhs).ty;

                let both_int = self.module.types.is_integer(lt, false)
                    && self.module.types.is_integer(rt, false);
                let both_bool = lt == TypeId::BOOL && rt == TypeId::BOOL;
                let both_ptr =
                    self.module.types.is_pointer(lt) && self.module.types.is_pointer(rt);

                if both_int {
                    if !self.convert_to_common_type(&mut lhs, &mut rhs) {
                        self.error(
                            span,
                            SemanticError::CannotCompare {
                                lhs: self.type_name(lt),
                                rhs: self.type_name(rt),
                                span: span.into(),
                            },
                        );
                        self.set_errored(id);
                        self.write_operands(id, lhs, rhs);
                        return;
                    }
                } else if both_bool {
                    // Fine as-is.
                } else if both_ptr {
                    if !self.module.types_equal(lt, rt) {
                        self.error(
                            span,
                            SemanticError::ComparePointerTypes {
                                lhs: self.type_name(lt),
                                rhs: self.type_name(rt),
                                span: span.into(),
                            },
                        );
                    }
                } else {
                    self.error(
                        span,
                        SemanticError::CannotCompare {
                            lhs: self.type_name(lt),
                            rhs: self.type_name(rt),
                            span: span.into(),
                        },
                    );
                }

                self.module.expr_mut(id).ty = TypeId::BOOL;
            }

            BinaryOp::Assign => {
                self.lvalue_to_rvalue(&mut rhs, true);
                self.implicit_de_reference(&mut lhs);
                if !self.module.expr(lhs).lvalue {
                    self.error(span, SemanticError::AssignToRvalue { span: span.into() });
                    self.set_errored(id);
                    self.write_operands(id, lhs, rhs);
                    return;
                }

                // The node's type is known whether or not the assignment is
                // valid, so it is never marked errored past this point.
                let lhs_ty = self.module.expr(lhs).ty;
                self.module.expr_mut(id).ty = lhs_ty;
                self.module.expr_mut(id).lvalue = true;

                // A sum type is only assignable through a member access.
                let mut target_ty = lhs_ty;
                if let TypeKind::Sum { members, .. } = &self.module.types.get(lhs_ty).kind {
                    match self.module.expr(lhs).kind {
                        ExprKind::MemberAccess {
                            member_index: Some(index),
                            ..
                        } => target_ty = members[index].ty,
                        _ => {
                            let lhs_span = self.module.expr(lhs).span;
                            self.error(
                                lhs_span,
                                SemanticError::AssignToSumType {
                                    span: lhs_span.into(),
                                },
                            );
                            self.set_errored(id);
                            self.write_operands(id, lhs, rhs);
                            return;
                        }
                    }
                }

                if !self.convert(&mut rhs, target_ty) {
                    let rhs_span = self.module.expr(rhs).span;
                    self.error(
                        rhs_span,
                        SemanticError::AssignTypeMismatch {
                            found: self.type_name(self.module.expr(rhs).ty),
                            expected: self.type_name(target_ty),
                            span: rhs_span.into(),
                        },
                    );
                }
            }
        }

        self.write_operands(id, lhs, rhs);
    }

    /// Pointer or array subscript, bounds-checked when both the index and
    /// the array length are compile-time constants.
    fn analyse_subscript(&mut self, id: ExprId, lhs: &mut ExprId, rhs: &mut ExprId) {
        let span = self.module.expr(id).span;
        self.implicit_de_reference(lhs);
        let base_ty = self.module.expr(*lhs).ty;

        let result = match self.module.types.get(base_ty).kind {
            TypeKind::Pointer { .. } => base_ty,
            TypeKind::Array { elem, .. } => self.ptr_to(elem),
            _ => {
                self.error(
                    span,
                    SemanticError::SubscriptBase {
                        found: self.type_name(base_ty),
                        span: span.into(),
                    },
                );
                self.set_errored(id);
                return;
            }
        };
        self.module.expr_mut(id).ty = result;

        self.lvalue_to_rvalue(rhs, true);
        if !self.convert(rhs, TypeId::INT) {
            let rhs_span = self.module.expr(*rhs).span;
            self.error(
                rhs_span,
                SemanticError::SubscriptIndexNotInteger {
                    span: rhs_span.into(),
                },
            );
            return;
        }

        if let TypeKind::Array { size, .. } = self.module.types.get(base_ty).kind
            && matches!(self.module.expr(size).kind, ExprKind::Constant { .. })
            && let Some(EvalValue::Int(index)) = eval::evaluate(self.module, *rhs)
        {
            let len = self.module.array_len(base_ty).unwrap_or(0);
            if index < 0 || index >= len {
                self.error(span, SemanticError::SubscriptOutOfBounds { span: span.into() });
            }

            // We already have the value; keep it for code generation.
            let rhs_span = self.module.expr(*rhs).span;
            let constant = self.module.alloc_expr(
                ExprKind::Constant {
                    operand: Some(*rhs),
                    value: EvalValue::Int(index),
                },
                self.module.expr(*rhs).ty,
                rhs_span,
            );
            self.module.expr_mut(constant).state = SemaState::Done;
            *rhs = constant;
        }
    }

    fn write_operands(&mut self, id: ExprId, lhs: ExprId, rhs: ExprId) {
        if let ExprKind::Binary { lhs: l, rhs: r, .. } = &mut self.module.expr_mut(id).kind {
            *l = lhs;
            *r = rhs;
        }
    }
}
