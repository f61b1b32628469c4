// analyzer/call.rs
//
// Calls are the most overloaded syntax in the language: a builtin name
// becomes an intrinsic, a type becomes a cast or compound literal, an
// integer becomes a multiplication chain, and an overload set would go to
// overload resolution (which does not exist yet).

use glint_frontend::{
    BinaryOp, CastKind, EvalValue, ExprId, ExprKind, IntrinsicKind, SemaState, TypeId, TypeKind,
};

use super::Sema;
use crate::errors::SemanticError;

fn intrinsic_from_name(name: &str) -> Option<IntrinsicKind> {
    Some(match name {
        "__builtin_debugtrap" => IntrinsicKind::Debugtrap,
        "__builtin_filename" => IntrinsicKind::Filename,
        "__builtin_inline" => IntrinsicKind::Inline,
        "__builtin_line" => IntrinsicKind::Line,
        "__builtin_memcpy" => IntrinsicKind::MemCopy,
        "__builtin_memset" => IntrinsicKind::MemSet,
        "__builtin_syscall" => IntrinsicKind::Syscall,
        _ => return None,
    })
}

impl<'a> Sema<'a> {
    pub(super) fn analyse_call(
        &mut self,
        slot: &mut ExprId,
        id: ExprId,
        callee: ExprId,
        args: Vec<ExprId>,
    ) {
        // Builtins first: the name never resolves, the call becomes an
        // intrinsic and is re-analysed as one.
        if let ExprKind::NameRef { name, .. } = self.module.expr(callee).kind
            && let Some(intrinsic) =
                intrinsic_from_name(self.module.interner.resolve(name))
        {
            let span = self.module.expr(id).span;
            let call = self.module.alloc_expr(
                ExprKind::IntrinsicCall {
                    intrinsic,
                    args: args.clone(),
                },
                TypeId::UNKNOWN,
                span,
            );
            *slot = call;
            self.analyse(slot, None);
            return;
        }

        let mut args = args;
        for arg in args.iter_mut() {
            self.analyse(arg, None);
        }

        let mut callee = callee;
        if !self.analyse(&mut callee, None) {
            self.set_errored(id);
            self.write_call(id, callee, args);
            return;
        }

        // An overload-set callee would need overload resolution.
        if self.module.expr(callee).ty == TypeId::OVERLOAD_SET {
            if args
                .iter()
                .any(|&a| self.module.expr(a).state == SemaState::Errored)
            {
                self.set_errored(id);
                self.write_call(id, callee, args);
                return;
            }
            self.set_ice("sorry, overload resolution is currently not implemented");
            self.set_errored(id);
            self.write_call(id, callee, args);
            return;
        }

        // Calling a type is a cast (one argument) or a compound literal.
        let callee_is_type = matches!(self.module.expr(callee).kind, ExprKind::TypeExpr)
            || matches!(
                self.module.expr(callee).kind,
                ExprKind::NameRef { target: Some(t), .. }
                    if matches!(self.module.expr(t).kind, ExprKind::TypeDecl { .. })
            );
        if callee_is_type {
            for arg in args.iter_mut() {
                self.lvalue_to_rvalue(arg, true);
            }
            let target_ty = self.module.expr(callee).ty;
            let span = self.module.expr(id).span;
            if args.len() == 1 {
                *slot = self.module.alloc_expr(
                    ExprKind::Cast {
                        kind: CastKind::Hard,
                        operand: args[0],
                    },
                    target_ty,
                    span,
                );
            } else {
                *slot = self.module.alloc_expr(
                    ExprKind::CompoundLiteral { values: args },
                    target_ty,
                    span,
                );
            }
            return;
        }

        // A function pointer callee is dereferenced.
        let callee_ty = self.module.expr(callee).ty;
        if let TypeKind::Pointer { elem } = self.module.types.get(callee_ty).kind
            && self.module.types.is_function(elem)
        {
            self.insert_implicit_cast(&mut callee, elem);
        }

        // An integer callee multiplies its arguments: `100 x y` is
        // `100 * (x * y)`.
        let callee_ty = self.module.expr(callee).ty;
        if self.module.types.is_integer(callee_ty, false) {
            // `100()` has nothing to multiply.
            if args.is_empty() {
                let span = self.module.expr(id).span;
                if !self.has_side_effects(id) {
                    self.warn(
                        span,
                        crate::errors::SemanticWarning::UnusedResult { span: span.into() },
                    );
                }
                self.module.expr_mut(id).ty = callee_ty;
                self.write_call(id, callee, args);
                return;
            }

            let mut rhs = *args.last().unwrap();
            for &lhs in args.iter().rev().skip(1) {
                let span = self
                    .module
                    .expr(lhs)
                    .span
                    .merge(self.module.expr(rhs).span);
                rhs = self.module.alloc_expr(
                    ExprKind::Binary {
                        op: BinaryOp::Mul,
                        lhs,
                        rhs,
                    },
                    TypeId::UNKNOWN,
                    span,
                );
            }
            let span = self.module.expr(id).span;
            *slot = self.module.alloc_expr(
                ExprKind::Binary {
                    op: BinaryOp::Mul,
                    lhs: callee,
                    rhs,
                },
                TypeId::UNKNOWN,
                span,
            );
            self.analyse(slot, None);
            return;
        }

        if !self.module.types.is_function(callee_ty) {
            let span = self.module.expr(callee).span;
            self.error(
                span,
                SemanticError::NotAFunction {
                    found: self.type_name(callee_ty),
                    span: span.into(),
                },
            );
            self.set_errored(id);
            self.write_call(id, callee, args);
            return;
        }

        let TypeKind::Function { ret, params, .. } = self.module.types.get(callee_ty).kind.clone()
        else {
            unreachable!();
        };
        self.module.expr_mut(id).ty = ret;

        if args.len() != params.len() {
            let span = self.module.expr(id).span;
            self.error(
                span,
                SemanticError::ArgumentCount {
                    expected: params.len(),
                    found: args.len(),
                    span: span.into(),
                },
            );
        }

        // Reference parameters bind directly; everything else gets
        // lvalue-to-rvalue before converting.
        for (arg, param) in args.iter_mut().zip(params.iter()) {
            if !self.module.types.is_reference(param.ty) {
                self.lvalue_to_rvalue(arg, true);
            }
            if !self.convert(arg, param.ty) {
                let span = self.module.expr(*arg).span;
                self.error(
                    span,
                    SemanticError::ArgumentTypeMismatch {
                        found: self.type_name(self.module.expr(*arg).ty),
                        expected: self.type_name(param.ty),
                        span: span.into(),
                    },
                );
            }
        }

        self.write_call(id, callee, args);
    }

    pub(super) fn analyse_intrinsic_call(
        &mut self,
        slot: &mut ExprId,
        id: ExprId,
        intrinsic: IntrinsicKind,
        args: Vec<ExprId>,
    ) {
        let span = self.module.expr(id).span;
        let mut args = args;
        match intrinsic {
            IntrinsicKind::Debugtrap => {
                if !args.is_empty() {
                    self.error(
                        span,
                        SemanticError::IntrinsicArity {
                            intrinsic: "__builtin_debugtrap()",
                            requirement: "takes no arguments",
                            span: span.into(),
                        },
                    );
                }
                self.module.expr_mut(id).ty = TypeId::VOID;
            }

            IntrinsicKind::Filename => {
                if !args.is_empty() {
                    self.error(
                        span,
                        SemanticError::IntrinsicArity {
                            intrinsic: "__builtin_filename()",
                            requirement: "takes no arguments",
                            span: span.into(),
                        },
                    );
                }

                let filename = self
                    .ctx
                    .files()
                    .first()
                    .map(|f| f.name.clone())
                    .unwrap_or_else(|| "<unknown>".to_string());
                let sym = self.module.interner.intern(&filename);

                // Give the constant the string literal's array type.
                let mut literal =
                    self.module
                        .alloc_expr(ExprKind::StringLiteral(sym), TypeId::UNKNOWN, span);
                self.analyse(&mut literal, None);
                let str_ty = self.module.expr(literal).ty;

                self.module.expr_mut(id).ty = str_ty;
                self.module.expr_mut(id).state = SemaState::Done;
                *slot = self.module.alloc_expr(
                    ExprKind::Constant {
                        operand: Some(id),
                        value: EvalValue::String(sym),
                    },
                    str_ty,
                    span,
                );
            }

            IntrinsicKind::Line => {
                if !args.is_empty() {
                    self.error(
                        span,
                        SemanticError::IntrinsicArity {
                            intrinsic: "__builtin_line()",
                            requirement: "takes no arguments",
                            span: span.into(),
                        },
                    );
                }
                self.module.expr_mut(id).ty = TypeId::INT;
                self.module.expr_mut(id).state = SemaState::Done;
                *slot = self.module.alloc_expr(
                    ExprKind::Constant {
                        operand: Some(id),
                        value: EvalValue::Int(span.line as i64),
                    },
                    TypeId::INT,
                    span,
                );
            }

            IntrinsicKind::Inline => {
                if args.len() != 1 {
                    self.error(
                        span,
                        SemanticError::IntrinsicArity {
                            intrinsic: "__builtin_inline()",
                            requirement: "takes exactly one argument",
                            span: span.into(),
                        },
                    );
                }

                if let Some(call) = args.first_mut() {
                    if !self.analyse(call, None) {
                        self.set_errored(id);
                    }
                    if !matches!(self.module.expr(*call).kind, ExprKind::Call { .. }) {
                        let call_span = self.module.expr(*call).span;
                        self.error(
                            call_span,
                            SemanticError::InlineArgumentNotCall {
                                span: call_span.into(),
                            },
                        );
                    }
                    if self.module.expr(*call).ok() {
                        let ty = self.module.expr(*call).ty;
                        self.module.expr_mut(id).ty = ty;
                    }
                }
            }

            IntrinsicKind::MemCopy | IntrinsicKind::MemSet => {
                let (name, second_ty) = match intrinsic {
                    IntrinsicKind::MemCopy => ("__builtin_memcpy()", TypeId::VOID_PTR),
                    _ => ("__builtin_memset()", TypeId::BYTE),
                };
                if args.len() != 3 {
                    self.error(
                        span,
                        SemanticError::IntrinsicArity {
                            intrinsic: name,
                            requirement: "takes exactly three arguments",
                            span: span.into(),
                        },
                    );
                } else {
                    for arg in args.iter_mut() {
                        self.analyse(arg, None);
                    }
                    self.convert_or_error(&mut args[0], TypeId::VOID_PTR);
                    self.convert_or_error(&mut args[1], second_ty);
                    self.convert_or_error(&mut args[2], TypeId::INT);
                    for arg in args.iter_mut() {
                        self.lvalue_to_rvalue(arg, true);
                    }
                }
                // Unlike the C routines, these return nothing.
                self.module.expr_mut(id).ty = TypeId::VOID;
            }

            IntrinsicKind::Syscall => {
                if args.is_empty() || args.len() > 7 {
                    self.error(
                        span,
                        SemanticError::IntrinsicArity {
                            intrinsic: "__builtin_syscall()",
                            requirement: "takes between 1 and 7 arguments",
                            span: span.into(),
                        },
                    );
                }
                for arg in args.iter_mut() {
                    self.analyse(arg, None);
                    self.insert_pointer_to_integer_cast(arg);
                    self.convert_or_error(arg, TypeId::INT);
                    self.lvalue_to_rvalue(arg, true);
                }
                self.module.expr_mut(id).ty = TypeId::INT;
            }
        }

        if let ExprKind::IntrinsicCall { args: a, .. } = &mut self.module.expr_mut(id).kind {
            *a = args;
        }
    }

    fn write_call(&mut self, id: ExprId, callee: ExprId, args: Vec<ExprId>) {
        if let ExprKind::Call { callee: c, args: a } = &mut self.module.expr_mut(id).kind {
            *c = callee;
            *a = args;
        }
    }
}
