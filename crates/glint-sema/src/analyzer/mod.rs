// analyzer/mod.rs
//
// The semantic analyser. One mutually recursive pass over the module:
// imports load first, then every function signature, then every body.

mod access;
mod binary;
mod call;
mod cast;
mod expr;
pub(crate) mod layout;
mod name_ref;
mod types;
mod unary;

use glint_frontend::{
    Context, ExprId, ExprKind, Linkage, Module, SemaState, Span, TypeId, TypeKind,
};

use crate::errors::{
    FatalError, IceError, SemanticError, SemanticWarning, TypeError, TypeWarning,
};
use crate::loader;

/// Everything the pass reports besides the rewritten module itself.
#[derive(Debug, Default)]
pub struct AnalysisResult {
    pub errors: Vec<TypeError>,
    pub warnings: Vec<TypeWarning>,
}

impl AnalysisResult {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Analyse `module` in place. `Err` is a structural failure (missing import,
/// corrupt metadata, internal error); ordinary type errors are collected in
/// the result and also set the context error flag.
pub fn analyse(ctx: &Context, module: &mut Module) -> Result<AnalysisResult, FatalError> {
    if ctx.has_error() {
        return Ok(AnalysisResult::default());
    }
    let mut sema = Sema {
        ctx,
        module,
        curr_func: None,
        dangling: Vec::new(),
        errors: Vec::new(),
        warnings: Vec::new(),
        ice: None,
    };
    sema.analyse_module()?;
    if let Some(ice) = sema.ice {
        return Err(ice.into());
    }
    Ok(AnalysisResult {
        errors: sema.errors,
        warnings: sema.warnings,
    })
}

pub struct Sema<'a> {
    pub(crate) ctx: &'a Context,
    pub(crate) module: &'a mut Module,
    pub(crate) curr_func: Option<ExprId>,
    /// Dynamic-array declarations of the current function that have not been
    /// freed or returned yet.
    pub(crate) dangling: Vec<ExprId>,
    pub(crate) errors: Vec<TypeError>,
    pub(crate) warnings: Vec<TypeWarning>,
    pub(crate) ice: Option<IceError>,
}

impl<'a> Sema<'a> {
    #[tracing::instrument(skip(self))]
    fn analyse_module(&mut self) -> Result<(), FatalError> {
        // Load imported modules. A missing or corrupt import aborts the pass.
        let imports = self.module.imports.clone();
        for import in &imports {
            loader::load_import(self.ctx, self.module, import)?;
        }

        // Signatures first: overloads and calls need every parameter list
        // decayed before any body is analysed.
        let functions = self.module.functions.clone();
        for &func in &functions {
            self.analyse_function_signature(func);
        }

        for &func in &functions {
            self.analyse_function_body(func);
        }

        Ok(())
    }

    fn analyse_function_signature(&mut self, decl: ExprId) {
        let mut ty = self.module.expr(decl).ty;
        self.analyse_type(&mut ty);
        self.module.expr_mut(decl).ty = ty;

        // `used` is ignored on functions that aren't internal; on internal
        // functions it upgrades the linkage so the symbol is kept.
        let used = matches!(
            &self.module.types.get(ty).kind,
            TypeKind::Function { attrs, .. } if attrs.used
        );
        if used {
            let ExprKind::FuncDecl { linkage, .. } = &mut self.module.expr_mut(decl).kind else {
                return;
            };
            if *linkage != Linkage::Internal {
                let span = self.module.expr(decl).span;
                self.warn(span, SemanticWarning::UsedHasNoEffect { span: span.into() });
            } else {
                *linkage = Linkage::Used;
            }
        }
    }

    fn analyse_function_body(&mut self, decl: ExprId) {
        let saved_func = self.curr_func.replace(decl);
        let saved_dangling = std::mem::take(&mut self.dangling);

        self.analyse_function_body_inner(decl);

        self.curr_func = saved_func;
        self.dangling = saved_dangling;
    }

    fn analyse_function_body_inner(&mut self, decl: ExprId) {
        let fty = self.module.expr(decl).ty;
        let TypeKind::Function { ret, params, .. } = self.module.types.get(fty).kind.clone()
        else {
            return;
        };
        let ExprKind::FuncDecl {
            scope, body, name, ..
        } = self.module.expr(decl).kind.clone()
        else {
            return;
        };

        let Some(mut body) = body else {
            return;
        };

        // Declare the named parameters as locals in the function scope.
        let mut param_decls = Vec::new();
        for param in &params {
            let Some(param_name) = param.name else {
                continue;
            };

            let existing = self.module.find(scope, param_name);
            if let Some(&existing) = existing.first() {
                let existing_span = self.module.expr(existing).span;
                self.error(
                    existing_span,
                    SemanticError::DeclConflictsWithParameter {
                        span: existing_span.into(),
                        parameter: param.span.into(),
                    },
                );
                continue;
            }

            let d = self.module.alloc_expr(
                ExprKind::VarDecl {
                    name: param_name,
                    init: None,
                    linkage: Linkage::LocalVar,
                },
                param.ty,
                param.span,
            );
            self.module
                .declare(scope, param_name, d)
                .expect("conflict checked above");
            let mut slot = d;
            self.analyse(&mut slot, None);
            param_decls.push(slot);
        }
        if let ExprKind::FuncDecl { param_decls: p, .. } = &mut self.module.expr_mut(decl).kind {
            *p = param_decls;
        }

        // Parameters are owned by the caller; they never dangle.
        self.dangling.clear();

        self.analyse(&mut body, Some(ret));
        if let ExprKind::FuncDecl { body: b, .. } = &mut self.module.expr_mut(decl).kind {
            *b = Some(body);
        }

        if self.ctx.has_error() {
            return;
        }

        // The last expression must be (or become) a return.
        if !ret.is_void() {
            if !self.wrap_trailing_return(decl, body, ret, name) {
                return;
            }
        } else {
            self.finish_void_body(decl, body);
        }

        // Everything still in the set leaked.
        for leaked in self.dangling.clone() {
            let span = self.module.expr(leaked).span;
            self.error(span, SemanticError::DanglingDynamicArray { span: span.into() });
        }
    }

    /// For a non-void function, convert the body's trailing expression to
    /// the return type and wrap it in a return. The program entry point is
    /// special: it gets a synthesised `return 0` instead. Returns false
    /// when the body was rejected.
    fn wrap_trailing_return(
        &mut self,
        decl: ExprId,
        body: ExprId,
        ret: TypeId,
        name: glint_frontend::Symbol,
    ) -> bool {
        let is_main = self.module.interner.resolve(name) == "main";
        let is_block = matches!(self.module.expr(body).kind, ExprKind::Block { .. });
        if is_block {
            let ExprKind::Block { children } = self.module.expr(body).kind.clone() else {
                unreachable!();
            };

            if let Some(&last) = children.last()
                && matches!(self.module.expr(last).kind, ExprKind::Return { .. })
            {
                return true;
            }

            if is_main {
                let zero = self
                    .module
                    .alloc_expr(ExprKind::IntegerLiteral(0), TypeId::INT, Span::default());
                self.module.expr_mut(zero).state = SemaState::Done;
                let ret_expr = self.module.alloc_expr(
                    ExprKind::Return { value: Some(zero) },
                    TypeId::VOID,
                    Span::default(),
                );
                self.module.expr_mut(ret_expr).state = SemaState::Done;
                if let ExprKind::Block { children } = &mut self.module.expr_mut(body).kind {
                    children.push(ret_expr);
                }
                return true;
            }

            if children.is_empty() {
                let span = self.module.expr(decl).span;
                self.error(
                    span,
                    SemanticError::FunctionMustReturnValue {
                        name: self.module.interner.resolve(name).to_string(),
                        span: span.into(),
                    },
                );
                return false;
            }

            let mut last = *children.last().unwrap();
            if !self.return_trailing_value(&mut last, ret) {
                return false;
            }
            if let ExprKind::Block { children } = &mut self.module.expr_mut(body).kind {
                *children.last_mut().unwrap() = last;
            }
            true
        } else {
            let mut last = body;
            if matches!(self.module.expr(last).kind, ExprKind::Return { .. }) {
                return true;
            }
            if !self.return_trailing_value(&mut last, ret) {
                return false;
            }
            if let ExprKind::FuncDecl { body: b, .. } = &mut self.module.expr_mut(decl).kind {
                *b = Some(last);
            }
            true
        }
    }

    /// Convert the trailing expression and wrap it in a `Return`.
    fn return_trailing_value(&mut self, slot: &mut ExprId, ret: TypeId) -> bool {
        // Ownership of a returned dynamic array transfers to the caller.
        if self.module.types.is_dynamic_array(self.module.expr(*slot).ty)
            && let ExprKind::NameRef {
                target: Some(target),
                ..
            } = self.module.expr(*slot).kind
        {
            self.forget_dangling(target);
        }

        if !self.convert(slot, ret) {
            let span = self.module.expr(*slot).span;
            self.error(
                span,
                SemanticError::LastExprNotConvertible {
                    found: self.module.display_type(self.module.expr(*slot).ty),
                    ret: self.module.display_type(ret),
                    span: span.into(),
                },
            );
            return false;
        }
        if !self.module.types.is_reference(ret) {
            self.lvalue_to_rvalue(slot, true);
        }

        let span = self.module.expr(*slot).span;
        let ret_expr = self.module.alloc_expr(
            ExprKind::Return { value: Some(*slot) },
            TypeId::VOID,
            span,
        );
        self.module.expr_mut(ret_expr).state = SemaState::Done;
        *slot = ret_expr;
        true
    }

    /// Append an empty return to a void block body and discard the result.
    fn finish_void_body(&mut self, decl: ExprId, body: ExprId) {
        if let ExprKind::Block { children } = self.module.expr(body).kind.clone() {
            let needs_return = children
                .last()
                .map(|&last| !matches!(self.module.expr(last).kind, ExprKind::Return { .. }))
                .unwrap_or(true);
            if needs_return {
                let ret_expr = self.module.alloc_expr(
                    ExprKind::Return { value: None },
                    TypeId::VOID,
                    Span::default(),
                );
                self.module.expr_mut(ret_expr).state = SemaState::Done;
                if let ExprKind::Block { children } = &mut self.module.expr_mut(body).kind {
                    children.push(ret_expr);
                }
            }
        }

        let mut slot = body;
        self.discard(&mut slot);
        if let ExprKind::FuncDecl { body: b, .. } = &mut self.module.expr_mut(decl).kind {
            *b = Some(slot);
        }
    }

    // ------------------------------------------------------------------
    // Shared helpers
    // ------------------------------------------------------------------

    pub(crate) fn error(&mut self, span: glint_frontend::Span, error: SemanticError) {
        self.ctx.set_error();
        self.errors.push(TypeError { error, span });
    }

    pub(crate) fn warn(&mut self, span: glint_frontend::Span, warning: SemanticWarning) {
        self.warnings.push(TypeWarning { warning, span });
    }

    /// Record an internal-error marker; the pass finishes and then fails.
    pub(crate) fn set_ice(&mut self, message: impl Into<String>) {
        if self.ice.is_none() {
            self.ice = Some(IceError::new(message));
        }
    }

    pub(crate) fn type_name(&self, ty: TypeId) -> String {
        self.module.display_type(ty)
    }

    pub(crate) fn set_errored(&mut self, expr: ExprId) {
        self.module.expr_mut(expr).state = SemaState::Errored;
    }

    /// Return type of the function currently being analysed.
    pub(crate) fn current_return_type(&self) -> TypeId {
        let Some(func) = self.curr_func else {
            return TypeId::VOID;
        };
        match &self.module.types.get(self.module.expr(func).ty).kind {
            TypeKind::Function { ret, .. } => *ret,
            _ => TypeId::VOID,
        }
    }

    pub(crate) fn forget_dangling(&mut self, target: ExprId) {
        self.dangling.retain(|&d| d != target);
    }
}
