// display.rs
//
// Human-readable rendering of types and the (possibly analysed) AST.

use crate::ast::{Expr, ExprId, ExprKind};
use crate::module::Module;
use crate::types::{TypeId, TypeKind};

impl Module {
    /// Render a type for diagnostics, e.g. `@[int 3]`.
    pub fn display_type(&self, ty: TypeId) -> String {
        self.display_type_depth(ty, 0)
    }

    fn display_type_depth(&self, ty: TypeId, depth: usize) -> String {
        if depth > 8 {
            return "…".to_string();
        }
        if let Some(name) = self.types.name_of_builtin(ty) {
            return name.to_string();
        }
        match &self.types.get(ty).kind {
            TypeKind::Builtin(_) | TypeKind::Ffi(_) => unreachable!("handled by name_of_builtin"),
            TypeKind::Integer { signed, bits } => {
                format!("{}{}", if *signed { "s" } else { "u" }, bits)
            }
            TypeKind::Named { name, .. } => self.interner.resolve(*name).to_string(),
            TypeKind::Pointer { elem } => format!("@{}", self.display_type_depth(*elem, depth + 1)),
            TypeKind::Reference { elem } => {
                format!("&{}", self.display_type_depth(*elem, depth + 1))
            }
            TypeKind::Array { elem, .. } => match self.array_len(ty) {
                Some(len) => format!("[{} {}]", self.display_type_depth(*elem, depth + 1), len),
                None => format!("[{} ?]", self.display_type_depth(*elem, depth + 1)),
            },
            TypeKind::DynamicArray { elem, .. } => {
                format!("[{} dynamic]", self.display_type_depth(*elem, depth + 1))
            }
            TypeKind::Struct(s) => {
                let members: Vec<String> = s
                    .members
                    .iter()
                    .map(|m| {
                        format!(
                            "{}: {}",
                            self.interner.resolve(m.name),
                            self.display_type_depth(m.ty, depth + 1)
                        )
                    })
                    .collect();
                format!("struct {{ {} }}", members.join(", "))
            }
            TypeKind::Union { members, .. } => {
                let members: Vec<String> = members
                    .iter()
                    .map(|m| {
                        format!(
                            "{}: {}",
                            self.interner.resolve(m.name),
                            self.display_type_depth(m.ty, depth + 1)
                        )
                    })
                    .collect();
                format!("union {{ {} }}", members.join(", "))
            }
            TypeKind::Sum { members, .. } => {
                let members: Vec<String> = members
                    .iter()
                    .map(|m| {
                        format!(
                            "{}: {}",
                            self.interner.resolve(m.name),
                            self.display_type_depth(m.ty, depth + 1)
                        )
                    })
                    .collect();
                format!("sum {{ {} }}", members.join(", "))
            }
            TypeKind::Enum { underlying, .. } => {
                format!("enum of {}", self.display_type_depth(*underlying, depth + 1))
            }
            TypeKind::Function { ret, params, .. } => {
                let params: Vec<String> = params
                    .iter()
                    .map(|p| self.display_type_depth(p.ty, depth + 1))
                    .collect();
                format!(
                    "{}({})",
                    self.display_type_depth(*ret, depth + 1),
                    params.join(", ")
                )
            }
        }
    }
}

/// Indented tree printer for `--ast` output.
pub struct AstPrinter<'m> {
    module: &'m Module,
    out: String,
}

impl<'m> AstPrinter<'m> {
    pub fn new(module: &'m Module) -> Self {
        Self {
            module,
            out: String::new(),
        }
    }

    pub fn print_module(mut self) -> String {
        self.line(0, &format!("Module {}", self.module.name));
        for import in &self.module.imports {
            let name = self.module.interner.resolve(import.name).to_string();
            self.line(1, &format!("Import {name}"));
        }
        for &func in &self.module.functions.clone() {
            self.print_expr(func, 1);
        }
        self.out
    }

    fn line(&mut self, indent: usize, text: &str) {
        for _ in 0..indent {
            self.out.push_str("  ");
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn header(&self, expr: &Expr, label: String) -> String {
        let ty = self.module.display_type(expr.ty);
        if expr.lvalue {
            format!("{label} :{ty} lvalue")
        } else {
            format!("{label} :{ty}")
        }
    }

    fn resolve(&self, sym: crate::Symbol) -> String {
        self.module.interner.resolve(sym).to_string()
    }

    fn print_expr(&mut self, id: ExprId, indent: usize) {
        let expr = self.module.expr(id).clone();
        match &expr.kind {
            ExprKind::IntegerLiteral(v) => {
                let h = self.header(&expr, format!("Integer {v}"));
                self.line(indent, &h);
            }
            ExprKind::StringLiteral(s) => {
                let h = self.header(&expr, format!("String {:?}", self.resolve(*s)));
                self.line(indent, &h);
            }
            ExprKind::CompoundLiteral { values } => {
                let h = self.header(&expr, "CompoundLiteral".to_string());
                self.line(indent, &h);
                for &v in values {
                    self.print_expr(v, indent + 1);
                }
            }
            ExprKind::VarDecl { name, init, .. } => {
                let h = self.header(&expr, format!("VarDecl {}", self.resolve(*name)));
                self.line(indent, &h);
                if let Some(init) = init {
                    self.print_expr(*init, indent + 1);
                }
            }
            ExprKind::FuncDecl { name, body, .. } => {
                let h = self.header(&expr, format!("FuncDecl {}", self.resolve(*name)));
                self.line(indent, &h);
                if let Some(body) = body {
                    self.print_expr(*body, indent + 1);
                }
            }
            ExprKind::TypeDecl { name } => {
                let h = self.header(&expr, format!("TypeDecl {}", self.resolve(*name)));
                self.line(indent, &h);
            }
            ExprKind::TypeAliasDecl { name } => {
                let h = self.header(&expr, format!("TypeAliasDecl {}", self.resolve(*name)));
                self.line(indent, &h);
            }
            ExprKind::EnumeratorDecl { name, .. } => {
                let h = self.header(&expr, format!("EnumeratorDecl {}", self.resolve(*name)));
                self.line(indent, &h);
            }
            ExprKind::NameRef { name, .. } => {
                let h = self.header(&expr, format!("NameRef {}", self.resolve(*name)));
                self.line(indent, &h);
            }
            ExprKind::ModuleRef { name } => {
                let h = self.header(&expr, format!("ModuleRef {}", self.resolve(*name)));
                self.line(indent, &h);
            }
            ExprKind::TypeExpr => {
                let h = self.header(&expr, "Type".to_string());
                self.line(indent, &h);
            }
            ExprKind::Block { children } => {
                let h = self.header(&expr, "Block".to_string());
                self.line(indent, &h);
                for &child in children {
                    self.print_expr(child, indent + 1);
                }
            }
            ExprKind::If { cond, then, otherwise } => {
                let h = self.header(&expr, "If".to_string());
                self.line(indent, &h);
                self.print_expr(*cond, indent + 1);
                self.print_expr(*then, indent + 1);
                if let Some(e) = otherwise {
                    self.print_expr(*e, indent + 1);
                }
            }
            ExprKind::While { cond, body } => {
                let h = self.header(&expr, "While".to_string());
                self.line(indent, &h);
                self.print_expr(*cond, indent + 1);
                self.print_expr(*body, indent + 1);
            }
            ExprKind::For { init, cond, increment, body } => {
                let h = self.header(&expr, "For".to_string());
                self.line(indent, &h);
                self.print_expr(*init, indent + 1);
                self.print_expr(*cond, indent + 1);
                self.print_expr(*increment, indent + 1);
                self.print_expr(*body, indent + 1);
            }
            ExprKind::Return { value } => {
                let h = self.header(&expr, "Return".to_string());
                self.line(indent, &h);
                if let Some(v) = value {
                    self.print_expr(*v, indent + 1);
                }
            }
            ExprKind::Call { callee, args } => {
                let h = self.header(&expr, "Call".to_string());
                self.line(indent, &h);
                self.print_expr(*callee, indent + 1);
                for &arg in args {
                    self.print_expr(arg, indent + 1);
                }
            }
            ExprKind::IntrinsicCall { intrinsic, args } => {
                let h = self.header(&expr, format!("Intrinsic {}", intrinsic.name()));
                self.line(indent, &h);
                for &arg in args {
                    self.print_expr(arg, indent + 1);
                }
            }
            ExprKind::Cast { kind, operand } => {
                let h = self.header(&expr, format!("Cast {kind:?}"));
                self.line(indent, &h);
                self.print_expr(*operand, indent + 1);
            }
            ExprKind::Unary { op, operand } => {
                let h = self.header(&expr, format!("Unary {}", op.as_str()));
                self.line(indent, &h);
                self.print_expr(*operand, indent + 1);
            }
            ExprKind::Binary { op, lhs, rhs } => {
                let h = self.header(&expr, format!("Binary {}", op.as_str()));
                self.line(indent, &h);
                self.print_expr(*lhs, indent + 1);
                self.print_expr(*rhs, indent + 1);
            }
            ExprKind::MemberAccess { object, name, .. } => {
                let h = self.header(&expr, format!("MemberAccess .{}", self.resolve(*name)));
                self.line(indent, &h);
                self.print_expr(*object, indent + 1);
            }
            ExprKind::Sizeof { operand } => {
                let h = self.header(&expr, "Sizeof".to_string());
                self.line(indent, &h);
                self.print_expr(*operand, indent + 1);
            }
            ExprKind::Alignof { operand } => {
                let h = self.header(&expr, "Alignof".to_string());
                self.line(indent, &h);
                self.print_expr(*operand, indent + 1);
            }
            ExprKind::OverloadSet { overloads } => {
                let h = self.header(&expr, format!("OverloadSet ({})", overloads.len()));
                self.line(indent, &h);
            }
            ExprKind::Constant { value, .. } => {
                let text = match value {
                    crate::ast::EvalValue::Int(v) => format!("Constant {v}"),
                    crate::ast::EvalValue::String(s) => format!("Constant {:?}", self.resolve(*s)),
                };
                let h = self.header(&expr, text);
                self.line(indent, &h);
            }
        }
    }
}
