// convert.rs
//
// The implicit conversion engine. One routine scores (and optionally
// applies) a conversion; `convert` performs, `try_convert` only scores.
// Scores: -2 = operand types contain errors, -1 = impossible, >= 0 = cost.

use glint_frontend::{
    CastKind, EvalValue, ExprId, ExprKind, SemaState, TypeId, TypeKind, UnaryOp,
};

use crate::analyzer::Sema;
use crate::errors::SemanticError;
use crate::eval;

pub const TYPES_CONTAIN_ERRORS: i32 = -2;
pub const CONVERSION_IMPOSSIBLE: i32 = -1;
pub const NO_OP: i32 = 0;

impl<'a> Sema<'a> {
    /// Perform the conversion, rewriting the slot. Errored expressions are
    /// treated as convertible so one error does not cascade.
    pub(crate) fn convert(&mut self, slot: &mut ExprId, to: TypeId) -> bool {
        if self.module.expr(*slot).state == SemaState::Errored {
            return true;
        }
        self.convert_impl(slot, to, true) >= 0
    }

    /// Score the conversion without changing the expression.
    pub(crate) fn try_convert(&mut self, slot: &mut ExprId, to: TypeId) -> i32 {
        self.convert_impl(slot, to, false)
    }

    /// Perform the conversion; report a diagnostic if it is impossible.
    pub(crate) fn convert_or_error(&mut self, slot: &mut ExprId, to: TypeId) {
        if !self.convert(slot, to) {
            let span = self.module.expr(*slot).span;
            self.error(
                span,
                SemanticError::NotConvertible {
                    to: self.module.display_type(to),
                    span: span.into(),
                },
            );
        }
    }

    fn convert_impl(&mut self, slot: &mut ExprId, to: TypeId, perform: bool) -> i32 {
        // `from` tracks the type the expression would have after the
        // conversions applied so far, so scoring works without rewriting.
        let mut from = self.module.expr(*slot).ty;

        if self.module.types.sema_errored(from) || self.module.types.sema_errored(to) {
            return TYPES_CONTAIN_ERRORS;
        }

        let mut score: i32 = 0;

        // Any type converts to void.
        if to.is_void() {
            return NO_OP;
        }

        // Any type converts to itself.
        if self.module.types_equal(from, to) {
            return NO_OP;
        }

        // Reference binding requires an lvalue; everything else starts with
        // lvalue-to-rvalue conversion.
        if let TypeKind::Reference { elem } = self.module.types.get(to).kind
            && self.module.types_equal(from, elem)
        {
            if self.module.expr(*slot).lvalue {
                if perform {
                    self.wrap_with_cast(slot, to, CastKind::LValueToReference);
                }
                return NO_OP;
            }
            return CONVERSION_IMPOSSIBLE;
        }

        score += i32::from(self.module.expr(*slot).lvalue);
        if perform {
            self.lvalue_to_rvalue(slot, false);
        }

        // Reference-to-reference conversions.
        if self.module.types.is_reference(from) && self.module.types.is_reference(to) {
            if self.module.types_equal(from, to) {
                return NO_OP;
            }

            // A reference to an array converts to a reference to its first
            // element.
            let from_elem = self.module.types.elem(from).unwrap();
            let to_elem = self.module.types.elem(to).unwrap();
            if let TypeKind::Array { elem, .. } = self.module.types.get(from_elem).kind
                && self.module.types_equal(elem, to_elem)
            {
                if perform {
                    self.insert_implicit_cast(slot, to);
                }
                return score + 1;
            }

            return CONVERSION_IMPOSSIBLE;
        }

        // Strip the source reference.
        if let TypeKind::Reference { elem } = self.module.types.get(from).kind {
            score += 1;
            from = elem;
            if perform {
                self.lvalue_to_rvalue(slot, true);
            }
        }

        if self.module.types_equal(from, to) {
            return score;
        }

        // Function types convert to their corresponding function pointer
        // types.
        if self.module.types.is_function(from)
            && let TypeKind::Pointer { elem } = self.module.types.get(to).kind
            && self.module.types_equal(elem, from)
        {
            if perform {
                self.insert_implicit_cast(slot, to);
            }
            return NO_OP;
        }

        // Deproceduring: a zero-argument function value becomes a call.
        if self.deprocedure_result(*slot, from).is_some() {
            if perform {
                let ok = self.deprocedure(slot);
                debug_assert!(ok);
            }
            return score + 1;
        }

        // Pointer-to-pointer conversions.
        if self.module.types.is_pointer(from) && self.module.types.is_pointer(to) {
            // A pointer to an array converts to a pointer to its first
            // element.
            let from_elem = self.module.types.elem(from).unwrap();
            let to_elem = self.module.types.elem(to).unwrap();
            if let TypeKind::Array { elem, .. } = self.module.types.get(from_elem).kind
                && self.module.types_equal(elem, to_elem)
            {
                if perform {
                    self.insert_implicit_cast(slot, to);
                }
                return score + 1;
            }

            // Any pointer converts to `@void`.
            if self.module.types_equal(to, TypeId::VOID_PTR) {
                if perform {
                    self.insert_implicit_cast(slot, to);
                }
                return score + 1;
            }
        }

        // Array-to-array: the source must fit in the destination.
        // FIXME: Element compatibility is not checked; there is no source
        // expression of the element type to feed back through here.
        if self.module.types.is_array(from) && self.module.types.is_array(to) {
            let from_len = self.module.array_len(from).unwrap_or(0);
            let to_len = self.module.array_len(to).unwrap_or(0);
            if from_len > to_len {
                return CONVERSION_IMPOSSIBLE;
            }
            if perform {
                self.insert_implicit_cast(slot, to);
            }
            return score + 1;
        }

        // Integer-to-boolean and vice versa.
        let from_int = self.module.types.is_integer(from, false);
        let to_int = self.module.types.is_integer(to, false);
        if (from_int && to == TypeId::BOOL) || (from == TypeId::BOOL && to_int) {
            if perform {
                self.insert_implicit_cast(slot, to);
            }
            return score + 1;
        }

        // Integer-to-integer.
        if from_int && to_int {
            // A compile-time constant converts iff its value fits.
            if let Some(EvalValue::Int(val)) = eval::evaluate(self.module, *slot) {
                if !self.int_value_fits(val, from, to) {
                    return CONVERSION_IMPOSSIBLE;
                }
                if perform {
                    self.insert_implicit_cast(slot, to);
                    let old = *slot;
                    let span = self.module.expr(old).span;
                    let constant = self.module.alloc_expr(
                        ExprKind::Constant {
                            operand: Some(old),
                            value: EvalValue::Int(val),
                        },
                        to,
                        span,
                    );
                    self.module.expr_mut(constant).state = SemaState::Done;
                    *slot = constant;
                }
                return score + 1;
            }

            // Otherwise, whatever doesn't lose bytes ships.
            if self.module.size_of(from) <= self.module.size_of(to) {
                if perform {
                    self.insert_implicit_cast(slot, to);
                }
                return score + 1;
            }

            return CONVERSION_IMPOSSIBLE;
        }

        // One last deproceduring attempt.
        if self.deprocedure_result(*slot, from).is_some() {
            if perform {
                self.deprocedure(slot);
            }
            return score + 1;
        }

        CONVERSION_IMPOSSIBLE
    }

    /// Whether a constant integer value fits in `to`.
    fn int_value_fits(&self, val: i64, from: TypeId, to: TypeId) -> bool {
        let to_unsigned = self.module.types.is_unsigned_int(to);
        let from_unsigned = self.module.types.is_unsigned_int(from);

        // Signed-to-unsigned of a negative value never fits.
        if val < 0 && to_unsigned {
            return false;
        }

        let bits = self.module.size_of(to) * 8;
        if bits >= 64 {
            return true;
        }
        if from_unsigned || val >= 0 {
            let max = if to_unsigned {
                (1u64 << bits) - 1
            } else {
                (1u64 << (bits - 1)) - 1
            };
            (val as u64) <= max
        } else {
            let min = -(1i64 << (bits - 1));
            val >= min
        }
    }

    /// Bias toward the non-literal side when exactly one side is an integer
    /// literal; otherwise try both directions.
    pub(crate) fn convert_to_common_type(&mut self, a: &mut ExprId, b: &mut ExprId) -> bool {
        let a_lit = matches!(self.module.expr(*a).kind, ExprKind::IntegerLiteral(_));
        let b_lit = matches!(self.module.expr(*b).kind, ExprKind::IntegerLiteral(_));
        if !(a_lit && b_lit) {
            if a_lit {
                let ty = self.module.expr(*b).ty;
                return self.convert(a, ty);
            }
            if b_lit {
                let ty = self.module.expr(*a).ty;
                return self.convert(b, ty);
            }
        }
        let b_ty = self.module.expr(*b).ty;
        if self.convert(a, b_ty) {
            return true;
        }
        let a_ty = self.module.expr(*a).ty;
        self.convert(b, a_ty)
    }

    /// In declaration positions, function types decay to function pointers.
    pub(crate) fn decl_type_decay(&mut self, ty: TypeId) -> TypeId {
        if self.module.types.is_function(ty) {
            self.ptr_to(ty)
        } else {
            ty
        }
    }

    /// If `expr` (of type `from`) is a zero-argument function value that may
    /// be implicitly invoked, the call's return type.
    fn deprocedure_result(&self, expr: ExprId, from: TypeId) -> Option<TypeId> {
        let fty = if self.module.types.is_function(from) {
            from
        } else if self.module.types.is_pointer(from) {
            let elem = self.module.types.elem(from)?;
            if !self.module.types.is_function(elem) {
                return None;
            }
            elem
        } else {
            return None;
        };

        // Declarations and blocks are never deprocedured automatically.
        let kind = &self.module.expr(expr).kind;
        if kind.is_decl() || matches!(kind, ExprKind::Block { .. }) {
            return None;
        }

        let TypeKind::Function { ret, params, .. } = &self.module.types.get(fty).kind else {
            return None;
        };
        if !params.is_empty() {
            return None;
        }
        Some(*ret)
    }

    /// Replace a zero-argument function value with a call to it.
    pub(crate) fn deprocedure(&mut self, slot: &mut ExprId) -> bool {
        let from = self.module.expr(*slot).ty;
        if self.deprocedure_result(*slot, from).is_none() {
            return false;
        }

        let callee = *slot;
        let span = self.module.expr(callee).span;
        let call = self.module.alloc_expr(
            ExprKind::Call {
                callee,
                args: Vec::new(),
            },
            TypeId::UNKNOWN,
            span,
        );
        *slot = call;
        self.analyse(slot, None);
        true
    }

    /// Analyse and discard an expression's value: enforce `discardable`,
    /// deprocedure once, and warn about side-effect-free statements.
    pub(crate) fn discard(&mut self, slot: &mut ExprId) {
        let expr = self.module.expr(*slot);
        if !expr.ok() || expr.ty.is_void() {
            return;
        }

        if let ExprKind::Call { callee, .. } = expr.kind {
            let callee_ty = self
                .module
                .types
                .strip_pointers_and_references(self.module.expr(callee).ty);
            if let TypeKind::Function { attrs, .. } = self.module.types.get(callee_ty).kind
                && !attrs.discardable
            {
                let span = self.module.expr(*slot).span;
                self.error(span, SemanticError::DiscardNonDiscardable { span: span.into() });
            }
        }

        if self.deprocedure(slot) {
            return;
        }

        if !self.has_side_effects(*slot) {
            let span = self.module.expr(*slot).span;
            self.warn(
                span,
                crate::errors::SemanticWarning::UnusedResult { span: span.into() },
            );
        }
    }

    pub(crate) fn analyse_and_discard(&mut self, slot: &mut ExprId) -> bool {
        if !self.analyse(slot, None) {
            return false;
        }
        self.discard(slot);
        true
    }

    pub(crate) fn has_side_effects(&self, id: ExprId) -> bool {
        let expr = self.module.expr(id);
        match &expr.kind {
            // Declarations and control transfers always count.
            ExprKind::While { .. }
            | ExprKind::For { .. }
            | ExprKind::Return { .. }
            | ExprKind::TypeDecl { .. }
            | ExprKind::TypeAliasDecl { .. }
            | ExprKind::VarDecl { .. }
            | ExprKind::FuncDecl { .. }
            | ExprKind::EnumeratorDecl { .. } => true,

            ExprKind::IntegerLiteral(_)
            | ExprKind::StringLiteral(_)
            | ExprKind::OverloadSet { .. }
            | ExprKind::NameRef { .. }
            | ExprKind::ModuleRef { .. }
            | ExprKind::TypeExpr
            | ExprKind::Sizeof { .. }
            | ExprKind::Alignof { .. } => false,

            ExprKind::Cast { operand, .. } | ExprKind::Unary { operand, .. } => {
                self.has_side_effects(*operand)
            }
            ExprKind::MemberAccess { object, .. } => self.has_side_effects(*object),
            ExprKind::CompoundLiteral { values } => {
                values.iter().any(|&v| self.has_side_effects(v))
            }
            ExprKind::Block { children } => children.iter().any(|&c| self.has_side_effects(c)),
            ExprKind::Constant { operand, .. } => {
                operand.map(|o| self.has_side_effects(o)).unwrap_or(false)
            }
            ExprKind::Binary { op, lhs, rhs } => {
                self.has_side_effects(*lhs)
                    || self.has_side_effects(*rhs)
                    || *op == glint_frontend::BinaryOp::Assign
            }
            ExprKind::If {
                cond,
                then,
                otherwise,
            } => {
                self.has_side_effects(*cond)
                    || self.has_side_effects(*then)
                    || otherwise.map(|e| self.has_side_effects(e)).unwrap_or(false)
            }
            ExprKind::Call { callee, args } => {
                if self.has_side_effects(*callee) {
                    return true;
                }
                if args.iter().any(|&a| self.has_side_effects(a)) {
                    return true;
                }
                let callee_ty = self
                    .module
                    .types
                    .strip_pointers_and_references(self.module.expr(*callee).ty);
                match &self.module.types.get(callee_ty).kind {
                    TypeKind::Function { attrs, .. } => !attrs.pure && !attrs.const_,
                    _ => false,
                }
            }
            ExprKind::IntrinsicCall { intrinsic, args } => {
                use glint_frontend::IntrinsicKind::*;
                match intrinsic {
                    Debugtrap | MemCopy | MemSet | Syscall => true,
                    Filename | Line => false,
                    Inline => {
                        expr.state == SemaState::Errored
                            || args.first().map(|&a| self.has_side_effects(a)).unwrap_or(true)
                    }
                }
            }
        }
    }

    /// Peel one reference so the expression is an lvalue again. Returns
    /// whether the result is an lvalue.
    pub(crate) fn implicit_de_reference(&mut self, slot: &mut ExprId) -> bool {
        let ty = self.module.expr(*slot).ty;
        if let TypeKind::Reference { elem } = self.module.types.get(ty).kind {
            self.lvalue_to_rvalue(slot, false);
            self.wrap_with_cast(slot, elem, CastKind::ReferenceToLValue);
        }
        self.module.expr(*slot).lvalue
    }

    /// Peel references, then dereference pointers until the value is no
    /// longer a pointer. Returns whether the result is an lvalue.
    pub(crate) fn implicit_dereference(&mut self, slot: &mut ExprId) -> bool {
        let ty = self.module.expr(*slot).ty;
        if let TypeKind::Reference { elem } = self.module.types.get(ty).kind {
            self.lvalue_to_rvalue(slot, false);
            self.wrap_with_cast(slot, elem, CastKind::ReferenceToLValue);
        }

        while self.module.types.is_pointer(self.module.expr(*slot).ty) {
            let operand = *slot;
            let span = self.module.expr(operand).span;
            let deref = self.module.alloc_expr(
                ExprKind::Unary {
                    op: UnaryOp::Deref,
                    operand,
                },
                TypeId::UNKNOWN,
                span,
            );
            *slot = deref;
            let ok = self.analyse(slot, None);
            debug_assert!(ok, "implicit dereference of a pointer cannot fail");
        }

        self.module.expr(*slot).lvalue
    }

    pub(crate) fn insert_implicit_cast(&mut self, slot: &mut ExprId, ty: TypeId) {
        self.wrap_with_cast(slot, ty, CastKind::Implicit);
    }

    pub(crate) fn insert_pointer_to_integer_cast(&mut self, slot: &mut ExprId) {
        if self.module.types.is_pointer(self.module.expr(*slot).ty) {
            self.insert_implicit_cast(slot, TypeId::INT);
        }
    }

    pub(crate) fn lvalue_to_rvalue(&mut self, slot: &mut ExprId, strip_ref: bool) {
        if self.module.expr(*slot).state == SemaState::Errored {
            return;
        }

        // A member access into a sum type keeps the sum's type until it is
        // read as a value; at that point it takes the accessed member's type
        // and is re-finalised against the shadow struct's `data` member.
        let id = *slot;
        let expr_ty = self.module.expr(id).ty;
        if let ExprKind::MemberAccess {
            member_index: Some(midx),
            ..
        } = self.module.expr(id).kind
            && let TypeKind::Sum {
                members,
                shadow: Some(shadow),
                ..
            } = &self.module.types.get(expr_ty).kind
        {
            let member_ty = members[midx].ty;
            let shadow = *shadow;
            if let ExprKind::MemberAccess {
                strukt,
                member_index,
                ..
            } = &mut self.module.expr_mut(id).kind
            {
                *strukt = Some(shadow);
                *member_index = Some(1); // index of `data` in the shadow struct
            }
            self.module.expr_mut(id).ty = member_ty;
        }

        if self.module.expr(*slot).lvalue {
            let ty = self.module.expr(*slot).ty;
            self.wrap_with_cast(slot, ty, CastKind::LValueToRValue);
        }

        if strip_ref
            && let TypeKind::Reference { elem } = self.module.types.get(self.module.expr(*slot).ty).kind
        {
            self.wrap_with_cast(slot, elem, CastKind::ReferenceToLValue);
            self.lvalue_to_rvalue(slot, true);
        }
    }

    pub(crate) fn ptr_to(&mut self, ty: TypeId) -> TypeId {
        let span = self.module.types.get(ty).span;
        let mut ptr = self.module.types.alloc(TypeKind::Pointer { elem: ty }, span);
        self.analyse_type(&mut ptr);
        ptr
    }

    pub(crate) fn wrap_with_cast(&mut self, slot: &mut ExprId, ty: TypeId, kind: CastKind) {
        let operand = *slot;
        let span = self.module.expr(operand).span;
        let mut cast = self
            .module
            .alloc_expr(ExprKind::Cast { kind, operand }, ty, span);
        self.analyse(&mut cast, None);
        *slot = cast;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::Sema;
    use glint_frontend::{Context, Module, Span};

    fn literal(module: &mut Module, value: i64, ty: TypeId) -> ExprId {
        let id = module.alloc_expr(ExprKind::IntegerLiteral(value), ty, Span::default());
        module.expr_mut(id).state = SemaState::Done;
        id
    }

    fn sema<'a>(ctx: &'a Context, module: &'a mut Module) -> Sema<'a> {
        Sema {
            ctx,
            module,
            curr_func: None,
            dangling: Vec::new(),
            errors: Vec::new(),
            warnings: Vec::new(),
            ice: None,
        }
    }

    #[test]
    fn conversion_to_same_type_is_a_no_op() {
        let ctx = Context::new();
        let mut module = Module::new("test");
        let expr = literal(&mut module, 3, TypeId::INT);
        let mut sema = sema(&ctx, &mut module);

        let mut slot = expr;
        assert_eq!(sema.try_convert(&mut slot, TypeId::INT), NO_OP);
        assert!(sema.convert(&mut slot, TypeId::INT));
        assert_eq!(slot, expr, "no-op conversion must not rewrite");
    }

    #[test]
    fn anything_converts_to_void_for_free() {
        let ctx = Context::new();
        let mut module = Module::new("test");
        let expr = literal(&mut module, 3, TypeId::INT);
        let mut sema = sema(&ctx, &mut module);

        let mut slot = expr;
        assert_eq!(sema.try_convert(&mut slot, TypeId::VOID), NO_OP);
        assert_eq!(slot, expr);
    }

    #[test]
    fn constant_narrowing_checks_the_value() {
        let ctx = Context::new();
        let mut module = Module::new("test");
        let fits = literal(&mut module, 255, TypeId::INT);
        let too_big = literal(&mut module, 300, TypeId::INT);
        let negative = literal(&mut module, -1, TypeId::INT);
        let mut sema = sema(&ctx, &mut module);

        let mut slot = fits;
        assert_eq!(sema.try_convert(&mut slot, TypeId::BYTE), 1);

        let mut slot = too_big;
        assert_eq!(sema.try_convert(&mut slot, TypeId::BYTE), CONVERSION_IMPOSSIBLE);

        // Signed-to-unsigned of a negative value never fits.
        let mut slot = negative;
        assert_eq!(sema.try_convert(&mut slot, TypeId::UINT), CONVERSION_IMPOSSIBLE);
    }

    #[test]
    fn integer_and_bool_cost_one() {
        let ctx = Context::new();
        let mut module = Module::new("test");
        let int = literal(&mut module, 1, TypeId::INT);
        let boolean = literal(&mut module, 1, TypeId::BOOL);
        let mut sema = sema(&ctx, &mut module);

        let mut slot = int;
        assert_eq!(sema.try_convert(&mut slot, TypeId::BOOL), 1);
        let mut slot = boolean;
        assert_eq!(sema.try_convert(&mut slot, TypeId::INT), 1);
    }

    #[test]
    fn reference_binding_needs_an_lvalue() {
        let ctx = Context::new();
        let mut module = Module::new("test");
        let rvalue = literal(&mut module, 1, TypeId::INT);
        let lvalue = literal(&mut module, 1, TypeId::INT);
        module.expr_mut(lvalue).lvalue = true;
        let ref_int = module.types.alloc(
            glint_frontend::TypeKind::Reference { elem: TypeId::INT },
            Span::default(),
        );
        module.types.get_mut(ref_int).state = SemaState::Done;
        let mut sema = sema(&ctx, &mut module);

        let mut slot = rvalue;
        assert_eq!(sema.try_convert(&mut slot, ref_int), CONVERSION_IMPOSSIBLE);

        let mut slot = lvalue;
        assert_eq!(sema.try_convert(&mut slot, ref_int), NO_OP);
        assert!(sema.convert(&mut slot, ref_int));
        assert!(matches!(
            sema.module.expr(slot).kind,
            ExprKind::Cast {
                kind: CastKind::LValueToReference,
                ..
            }
        ));
    }
}
