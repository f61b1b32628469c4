// analyzer/cast.rs
//
// Explicit casts accept everything the conversion engine accepts, plus
// integer narrowing. Reinterpretations — integer/enum, pointer/integer,
// pointer/pointer, and same-size bit casts — require the hard form (`as!`).

use glint_frontend::{CastKind, ExprId, ExprKind};

use super::Sema;
use crate::errors::SemanticError;

impl<'a> Sema<'a> {
    pub(super) fn analyse_cast(&mut self, id: ExprId, kind: CastKind, operand: ExprId) {
        // Sema-created casts are correct by construction; just set
        // lvalue-ness.
        if matches!(
            kind,
            CastKind::Implicit
                | CastKind::LValueToRValue
                | CastKind::LValueToReference
                | CastKind::ReferenceToLValue
        ) {
            self.module.expr_mut(id).lvalue = kind == CastKind::ReferenceToLValue;
            return;
        }

        let to = self.module.expr(id).ty;
        let mut operand = operand;
        if !self.analyse(&mut operand, Some(to)) {
            self.write_operand(id, operand);
            return;
        }

        // If the conversion engine accepts it, the cast is fine. Even on
        // failure this applies lvalue-to-rvalue conversion, which is what
        // the checks below expect.
        if self.convert(&mut operand, to) {
            self.write_operand(id, operand);
            return;
        }
        self.write_operand(id, operand);

        // Reference-based conversions were Convert()'s business; past this
        // point a reference target is simply wrong.
        let from = self.module.expr(operand).ty;
        let span = self.module.expr(id).span;
        if self.module.types.is_reference(to) {
            self.error(span, SemanticError::CastRvalueToReference { span: span.into() });
            return;
        }

        let from_int_like = self.module.types.is_integer(from, true);
        let to_int_like = self.module.types.is_integer(to, true);
        let from_ptr = self.module.types.is_pointer(from);
        let to_ptr = self.module.types.is_pointer(to);
        let hard = kind == CastKind::Hard;

        // Narrowing between integer-like types is allowed explicitly.
        if from_int_like && to_int_like {
            return;
        }

        // Integer/enum, pointer/integer, and pointer/pointer casts are
        // reinterpretations; they demand the hard form.
        let reinterpret = (from_int_like && self.module.types.is_enum(to))
            || (self.module.types.is_enum(from) && to_int_like)
            || (from_ptr && to_int_like)
            || (from_int_like && to_ptr)
            || (from_ptr && to_ptr);
        if reinterpret {
            if !hard {
                self.error(
                    span,
                    SemanticError::UnsafeCastNeedsHardForm {
                        from: self.type_name(from),
                        to: self.type_name(to),
                        span: span.into(),
                    },
                );
            }
            return;
        }

        // Same-size reinterpretation, hard form only.
        if self.module.size_of(from) == self.module.size_of(to) {
            if !hard {
                self.error(
                    span,
                    SemanticError::UnsafeCastNeedsHardForm {
                        from: self.type_name(from),
                        to: self.type_name(to),
                        span: span.into(),
                    },
                );
            }
            return;
        }

        self.error(
            span,
            SemanticError::InvalidCast {
                from: self.type_name(from),
                to: self.type_name(to),
                span: span.into(),
            },
        );
    }

    fn write_operand(&mut self, id: ExprId, operand: ExprId) {
        if let ExprKind::Cast { operand: o, .. } = &mut self.module.expr_mut(id).kind {
            *o = operand;
        }
    }
}
