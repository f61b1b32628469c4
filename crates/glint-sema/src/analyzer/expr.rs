// analyzer/expr.rs
//
// Expression analysis entry point and the per-kind cases small enough to
// live in the dispatch file. Invariants:
//
//   - A node marked Done or Errored is never analysed again.
//   - On return, the node in the slot is Done unless it is Errored. The
//     slot may hold a different node than on entry (rewrites).

use glint_frontend::{ExprId, ExprKind, SemaState, TypeId, TypeKind};

use super::Sema;
use crate::errors::SemanticError;

impl<'a> Sema<'a> {
    /// Analyse the expression in `slot`, rewriting it where the language
    /// demands it. `expected` is the type used for top-down inference.
    /// Returns whether the final expression is usable.
    pub(crate) fn analyse(&mut self, slot: &mut ExprId, expected: Option<TypeId>) -> bool {
        let id = *slot;

        // Don't analyse the same expression twice. Re-entry on an
        // in-progress node reports not-ok; the name-reference path turns
        // that into the self-referential-initialiser diagnostic.
        if self.module.expr(id).state != SemaState::NotAnalysed {
            return self.module.expr(id).ok();
        }
        self.module.expr_mut(id).state = SemaState::InProgress;

        // Analyse the type annotation, if the node carries one.
        let mut ty = self.module.expr(id).ty;
        if !ty.is_unknown() {
            self.analyse_type(&mut ty);
            self.module.expr_mut(id).ty = ty;
        }

        match self.module.expr(id).kind.clone() {
            ExprKind::For {
                init,
                cond,
                increment,
                body,
            } => {
                let mut init = init;
                let mut increment = increment;
                self.analyse_and_discard(&mut init);
                self.analyse_and_discard(&mut increment);
                let (cond, body) = self.analyse_loop(cond, body);
                if let ExprKind::For {
                    init: i,
                    cond: c,
                    increment: n,
                    body: b,
                } = &mut self.module.expr_mut(id).kind
                {
                    *i = init;
                    *c = cond;
                    *n = increment;
                    *b = body;
                }
                self.module.expr_mut(id).ty = TypeId::VOID;
            }

            ExprKind::While { cond, body } => {
                let (cond, body) = self.analyse_loop(cond, body);
                if let ExprKind::While { cond: c, body: b } = &mut self.module.expr_mut(id).kind
                {
                    *c = cond;
                    *b = body;
                }
                self.module.expr_mut(id).ty = TypeId::VOID;
            }

            ExprKind::Return { value } => self.analyse_return(id, value),

            ExprKind::If {
                cond,
                then,
                otherwise,
            } => self.analyse_if(id, cond, then, otherwise),

            ExprKind::Block { children } => self.analyse_block(id, children, expected),

            ExprKind::Cast { kind, operand } => self.analyse_cast(id, kind, operand),

            ExprKind::IntrinsicCall { intrinsic, args } => {
                self.analyse_intrinsic_call(slot, id, intrinsic, args);
            }

            // Overload resolution never sees an expected type: there is no
            // resolution over return types.
            ExprKind::Call { callee, args } => self.analyse_call(slot, id, callee, args),

            ExprKind::VarDecl { init, .. } => self.analyse_var_decl(id, init),

            // Enumerators are analysed by their enum type.
            ExprKind::EnumeratorDecl { .. } => {}

            ExprKind::CompoundLiteral { values } => {
                self.analyse_compound_literal(id, values, expected);
            }

            ExprKind::MemberAccess { object, name, .. } => {
                self.analyse_member_access(slot, id, object, name);
            }

            ExprKind::Sizeof { operand } => {
                let value = self.measure_operand(id, operand, "sizeof", |m, t| m.size_of(t));
                *slot = value;
            }

            ExprKind::Alignof { operand } => {
                let value = self.measure_operand(id, operand, "alignof", |m, t| m.align_of(t));
                *slot = value;
            }

            ExprKind::OverloadSet { overloads } => self.analyse_overload_set(id, overloads),

            ExprKind::Unary { op, operand } => self.analyse_unary(id, op, operand),

            ExprKind::Binary { op, lhs, rhs } => self.analyse_binary(id, op, lhs, rhs),

            ExprKind::NameRef { name, scope, .. } => self.analyse_name_ref(id, name, scope),

            ExprKind::FuncDecl { .. } => {
                debug_assert!(
                    self.module.types.is_function(self.module.expr(id).ty),
                    "function declaration without a function type"
                );
            }

            ExprKind::IntegerLiteral(_) => {
                if self.module.expr(id).ty.is_unknown() {
                    self.module.expr_mut(id).ty = TypeId::INT;
                }
            }

            ExprKind::StringLiteral(sym) => {
                let len = self.module.interner.resolve(sym).len() as i64;
                let span = self.module.expr(id).span;
                let size = self
                    .module
                    .alloc_expr(ExprKind::IntegerLiteral(len), TypeId::INT, span);
                let mut array = self.module.types.alloc(
                    TypeKind::Array {
                        elem: TypeId::BYTE,
                        size,
                    },
                    span,
                );
                self.analyse_type(&mut array);
                self.module.expr_mut(id).ty = array;
            }

            // The work for these is analysing the type, done above; or they
            // are created by sema and already complete.
            ExprKind::TypeExpr
            | ExprKind::TypeDecl { .. }
            | ExprKind::TypeAliasDecl { .. }
            | ExprKind::ModuleRef { .. }
            | ExprKind::Constant { .. } => {}
        }

        // The slot may hold a rewritten node by now.
        if !self.module.expr(*slot).state.done_or_errored() {
            self.module.expr_mut(*slot).state = SemaState::Done;
        }
        self.module.expr(*slot).ok()
    }

    /// Shared condition/body handling for `while` and the loop part of
    /// `for`. Loops are statements; their type is void.
    fn analyse_loop(&mut self, cond: ExprId, body: ExprId) -> (ExprId, ExprId) {
        let mut cond = cond;
        let mut body = body;
        self.analyse(&mut cond, None);
        if !self.convert(&mut cond, TypeId::BOOL) {
            let span = self.module.expr(cond).span;
            self.error(
                span,
                SemanticError::LoopConditionNotBool {
                    found: self.type_name(self.module.expr(cond).ty),
                    span: span.into(),
                },
            );
        }
        self.lvalue_to_rvalue(&mut cond, true);
        self.analyse_and_discard(&mut body);
        (cond, body)
    }

    fn analyse_return(&mut self, id: ExprId, value: Option<ExprId>) {
        let ret_type = self.current_return_type();
        let mut value = value;

        if let Some(v) = &mut value {
            self.analyse(v, Some(ret_type));

            // Returning a dynamic array hands ownership to the caller.
            if self.module.types.is_dynamic_array(self.module.expr(*v).ty)
                && let ExprKind::NameRef {
                    target: Some(target),
                    ..
                } = self.module.expr(*v).kind
            {
                self.forget_dangling(target);
            }
        }

        if ret_type.is_void() {
            // A value of type void is fine; a call returning void is the
            // common case.
            if let Some(v) = value
                && self.module.expr(v).ok()
                && !self.module.expr(v).ty.is_void()
            {
                let span = self.module.expr(id).span;
                self.error(
                    span,
                    SemanticError::ReturnValueInVoidFunction { span: span.into() },
                );
            }
        } else if let Some(v) = &mut value {
            if !self.convert(v, ret_type) {
                let span = self.module.expr(id).span;
                self.error(
                    span,
                    SemanticError::ReturnTypeMismatch {
                        ret: self.type_name(ret_type),
                        span: span.into(),
                    },
                );
            }
            if !self.module.types.is_reference(ret_type) {
                self.lvalue_to_rvalue(v, true);
            }
        } else {
            let span = self.module.expr(id).span;
            self.error(span, SemanticError::MissingReturnValue { span: span.into() });
        }

        if let ExprKind::Return { value: v } = &mut self.module.expr_mut(id).kind {
            *v = value;
        }
    }

    fn analyse_if(
        &mut self,
        id: ExprId,
        cond: ExprId,
        then: ExprId,
        otherwise: Option<ExprId>,
    ) {
        let mut cond = cond;
        self.analyse(&mut cond, None);
        if !self.convert(&mut cond, TypeId::BOOL) {
            let span = self.module.expr(cond).span;
            self.error(
                span,
                SemanticError::IfConditionNotBool {
                    found: self.type_name(self.module.expr(cond).ty),
                    span: span.into(),
                },
            );
        }
        self.lvalue_to_rvalue(&mut cond, true);

        let mut then = then;
        let mut otherwise = otherwise;
        self.analyse(&mut then, None);
        if let Some(e) = &mut otherwise {
            self.analyse(e, None);
        }

        if !self.module.expr(then).ok()
            || otherwise.map(|e| !self.module.expr(e).ok()).unwrap_or(false)
        {
            self.set_errored(id);
        }

        // If both branches exist and convert to a common non-void type, the
        // `if` is a value; otherwise it is a statement.
        self.module.expr_mut(id).ty = TypeId::VOID;
        if let Some(e) = &mut otherwise
            && !self.module.expr(then).ty.is_void()
            && !self.module.expr(*e).ty.is_void()
            && self.convert_to_common_type(&mut then, e)
        {
            self.module.expr_mut(id).ty = self.module.expr(then).ty;
            let then_lv = self.module.expr(then).lvalue;
            let else_lv = self.module.expr(*e).lvalue;
            if then_lv && else_lv {
                self.module.expr_mut(id).lvalue = true;
            } else if then_lv {
                self.lvalue_to_rvalue(&mut then, true);
            } else if else_lv {
                self.lvalue_to_rvalue(e, true);
            }
        }

        if self.module.expr(id).ty.is_void() {
            self.discard(&mut then);
            if let Some(e) = &mut otherwise {
                self.discard(e);
            }
        }

        if let ExprKind::If {
            cond: c,
            then: t,
            otherwise: o,
        } = &mut self.module.expr_mut(id).kind
        {
            *c = cond;
            *t = then;
            *o = otherwise;
        }
    }

    /// The type of a block is the type of its last expression; inference
    /// reaches only the last expression.
    fn analyse_block(&mut self, id: ExprId, children: Vec<ExprId>, expected: Option<TypeId>) {
        if children.is_empty() {
            self.module.expr_mut(id).ty = TypeId::VOID;
            return;
        }

        let last_index = children.len() - 1;
        let mut new_children = children;
        for (index, child) in new_children.iter_mut().enumerate() {
            let last = index == last_index;
            if !self.analyse(child, if last { expected } else { None }) {
                self.set_errored(id);
            }
            if !last && self.module.expr(*child).ok() {
                self.discard(child);
            }
        }

        if self.module.expr(id).state != SemaState::Errored {
            let last = *new_children.last().unwrap();
            self.module.expr_mut(id).lvalue = self.module.expr(last).lvalue;
            self.module.expr_mut(id).ty = self.module.expr(last).ty;
        }

        if let ExprKind::Block { children } = &mut self.module.expr_mut(id).kind {
            *children = new_children;
        }
    }

    fn analyse_var_decl(&mut self, id: ExprId, init: Option<ExprId>) {
        let mut init = init;

        if let Some(v) = &mut init {
            // Top-down inference only applies when the declared type is
            // known; bottom-up when it is not.
            let declared = self.module.expr(id).ty;
            let infer_type = declared.is_unknown();
            let expected = if infer_type {
                None
            } else {
                Some(self.decl_type_decay(declared))
            };
            self.analyse(v, expected);

            if infer_type {
                if self.module.expr(*v).ok() {
                    let init_ty = self.module.expr(*v).ty;
                    self.module.expr_mut(id).ty = init_ty;
                } else {
                    self.set_errored(id);
                    if let ExprKind::VarDecl { init: i, .. } = &mut self.module.expr_mut(id).kind
                    {
                        *i = init;
                    }
                    return;
                }
            }
        }

        // In declarations, function types decay to function pointers.
        let decayed = self.decl_type_decay(self.module.expr(id).ty);
        self.module.expr_mut(id).ty = decayed;

        // A failed initialiser conversion does not poison the declaration:
        // the declared type itself is well-formed.
        if let Some(v) = &mut init {
            if !self.convert(v, decayed) {
                let span = self.module.expr(*v).span;
                self.error(
                    span,
                    SemanticError::InitTypeMismatch {
                        found: self.type_name(self.module.expr(*v).ty),
                        expected: self.type_name(decayed),
                        span: span.into(),
                    },
                );
            }
            // Reference declarations bind; reading the value here would
            // undo the binding.
            if !self.module.types.is_reference(decayed) {
                self.lvalue_to_rvalue(v, true);
            }
        }

        if self.module.types.is_dynamic_array(decayed) && self.curr_func.is_some() {
            self.dangling.push(id);
        }

        self.module.expr_mut(id).lvalue = true;
        if let ExprKind::VarDecl { init: i, .. } = &mut self.module.expr_mut(id).kind {
            *i = init;
        }
    }

    fn analyse_compound_literal(
        &mut self,
        id: ExprId,
        values: Vec<ExprId>,
        expected: Option<TypeId>,
    ) {
        let mut new_values = values;
        for value in new_values.iter_mut() {
            if self.analyse(value, None) {
                self.lvalue_to_rvalue(value, true);
            } else {
                self.set_errored(id);
            }
        }
        if let ExprKind::CompoundLiteral { values } = &mut self.module.expr_mut(id).kind {
            *values = new_values;
        }

        if self.module.expr(id).ty.is_unknown() {
            match expected {
                Some(expected) => self.module.expr_mut(id).ty = expected,
                None => {
                    let span = self.module.expr(id).span;
                    self.error(
                        span,
                        SemanticError::CannotInferCompoundLiteral { span: span.into() },
                    );
                    return;
                }
            }
        }
        let mut ty = self.module.expr(id).ty;
        self.analyse_type(&mut ty);
        self.module.expr_mut(id).ty = ty;
    }

    /// `sizeof`/`alignof`: analyse the operand, then collapse to an integer
    /// literal of the measured byte count.
    fn measure_operand(
        &mut self,
        id: ExprId,
        operand: ExprId,
        op: &'static str,
        measure: impl Fn(&glint_frontend::Module, TypeId) -> usize,
    ) -> ExprId {
        let mut operand = operand;
        self.analyse(&mut operand, None);

        let ty = self.module.expr(operand).ty;
        let value = if ty.is_unknown() {
            let span = self.module.expr(id).span;
            self.error(span, SemanticError::SizeofUnhandled { op, span: span.into() });
            0
        } else {
            measure(self.module, ty)
        };

        let span = self.module.expr(id).span;
        self.module
            .alloc_expr(ExprKind::IntegerLiteral(value as i64), TypeId::INT, span)
    }

    /// An overload set must not contain two overloads with the same
    /// parameter types. Signatures are analysed before any body, so the
    /// parameter lists are final here.
    fn analyse_overload_set(&mut self, id: ExprId, overloads: Vec<ExprId>) {
        let param_types: Vec<Vec<TypeId>> = overloads
            .iter()
            .map(|&o| match &self.module.types.get(self.module.expr(o).ty).kind {
                TypeKind::Function { params, .. } => params.iter().map(|p| p.ty).collect(),
                _ => Vec::new(),
            })
            .collect();

        for i in 0..overloads.len() {
            for j in i + 1..overloads.len() {
                if param_types[i].len() != param_types[j].len() {
                    continue;
                }
                let same = param_types[i]
                    .iter()
                    .zip(param_types[j].iter())
                    .all(|(&a, &b)| self.module.types_equal(a, b));
                if same {
                    let span = self.module.expr(overloads[i]).span;
                    let conflicting = self.module.expr(overloads[j]).span;
                    self.error(
                        span,
                        SemanticError::OverloadsSameParameters {
                            span: span.into(),
                            conflicting: conflicting.into(),
                        },
                    );
                    self.set_errored(id);
                }
            }
        }
    }
}
