// eval.rs
//
// Compile-time constant evaluation. Used for enum values, array sizes,
// integer conversion fitting, and subscript bounds checks. Returns None
// when the expression cannot be evaluated at compile time.

use glint_frontend::{BinaryOp, EvalValue, ExprId, ExprKind, Module, TypeId, UnaryOp};

pub fn evaluate(module: &Module, id: ExprId) -> Option<EvalValue> {
    let expr = module.expr(id);
    match &expr.kind {
        ExprKind::IntegerLiteral(v) => Some(EvalValue::Int(*v)),
        ExprKind::StringLiteral(s) => Some(EvalValue::String(*s)),
        ExprKind::Constant { value, .. } => Some(value.clone()),

        ExprKind::NameRef { target, .. } => {
            let target = (*target)?;
            match &module.expr(target).kind {
                // Enumerators are named constants.
                ExprKind::EnumeratorDecl { init, .. } => evaluate(module, (*init)?),
                _ => None,
            }
        }

        ExprKind::Cast { operand, .. } => {
            let value = evaluate(module, *operand)?;
            let EvalValue::Int(v) = value else {
                return Some(value);
            };
            Some(EvalValue::Int(truncate_to(module, v, expr.ty)))
        }

        ExprKind::Unary { op, operand } => {
            let v = evaluate(module, *operand)?.as_int()?;
            let out = match op {
                UnaryOp::Minus => v.wrapping_neg(),
                UnaryOp::BitNot => !v,
                UnaryOp::Not => i64::from(v == 0),
                UnaryOp::Addr | UnaryOp::Deref | UnaryOp::Has => return None,
            };
            Some(EvalValue::Int(out))
        }

        ExprKind::Binary { op, lhs, rhs } => {
            let l = evaluate(module, *lhs)?.as_int()?;
            let r = evaluate(module, *rhs)?.as_int()?;
            let out = match op {
                BinaryOp::Add => l.wrapping_add(r),
                BinaryOp::Sub => l.wrapping_sub(r),
                BinaryOp::Mul => l.wrapping_mul(r),
                BinaryOp::Div => {
                    if r == 0 {
                        return None;
                    }
                    l.wrapping_div(r)
                }
                BinaryOp::Rem => {
                    if r == 0 {
                        return None;
                    }
                    l.wrapping_rem(r)
                }
                BinaryOp::Shl => l.wrapping_shl(r as u32 & 63),
                BinaryOp::Shr => l.wrapping_shr(r as u32 & 63),
                BinaryOp::BitAnd => l & r,
                BinaryOp::BitOr => l | r,
                BinaryOp::BitXor => l ^ r,
                BinaryOp::Eq => i64::from(l == r),
                BinaryOp::Ne => i64::from(l != r),
                BinaryOp::Lt => i64::from(l < r),
                BinaryOp::Gt => i64::from(l > r),
                BinaryOp::Le => i64::from(l <= r),
                BinaryOp::Ge => i64::from(l >= r),
                BinaryOp::And => i64::from(l != 0 && r != 0),
                BinaryOp::Or => i64::from(l != 0 || r != 0),
                BinaryOp::Assign | BinaryOp::Subscript => return None,
            };
            Some(EvalValue::Int(out))
        }

        // A block is constant when every child is.
        ExprKind::Block { children } => {
            let (&last, rest) = children.split_last()?;
            for &child in rest {
                evaluate(module, child)?;
            }
            evaluate(module, last)
        }

        _ => None,
    }
}

/// Wrap a value to the width (and signedness) of `ty`.
fn truncate_to(module: &Module, v: i64, ty: TypeId) -> i64 {
    if ty == TypeId::BOOL {
        return i64::from(v != 0);
    }
    if !module.types.is_integer(ty, false) {
        return v;
    }
    let bits = module.size_of(ty) * 8;
    if bits == 0 || bits >= 64 {
        return v;
    }
    let masked = (v as u64) & ((1u64 << bits) - 1);
    if module.types.is_unsigned_int(ty) {
        masked as i64
    } else {
        // Sign extend from `bits`.
        let shift = 64 - bits;
        ((masked as i64) << shift) >> shift
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glint_frontend::Parser;

    fn eval_source(source: &str) -> Option<EvalValue> {
        let module = Parser::new("test", source)
            .parse_module()
            .expect("source parses");
        let main = module.top_level_func.unwrap();
        let ExprKind::FuncDecl { body: Some(body), .. } = &module.expr(main).kind else {
            panic!("main body");
        };
        let ExprKind::Block { children } = &module.expr(*body).kind else {
            panic!("block body");
        };
        evaluate(&module, *children.last().unwrap())
    }

    #[test]
    fn integer_arithmetic() {
        assert_eq!(eval_source("1 + 2 * 3;"), Some(EvalValue::Int(7)));
        assert_eq!(eval_source("(1 << 4) - 1;"), Some(EvalValue::Int(15)));
        assert_eq!(eval_source("7 % 3;"), Some(EvalValue::Int(1)));
    }

    #[test]
    fn division_by_zero_is_not_constant() {
        assert_eq!(eval_source("1 / 0;"), None);
        assert_eq!(eval_source("1 % 0;"), None);
    }

    #[test]
    fn comparisons_and_logic() {
        assert_eq!(eval_source("3 < 4;"), Some(EvalValue::Int(1)));
        assert_eq!(eval_source("3 = 4;"), Some(EvalValue::Int(0)));
        assert_eq!(eval_source("1 and 0;"), Some(EvalValue::Int(0)));
        assert_eq!(eval_source("0 or 2;"), Some(EvalValue::Int(1)));
    }

    #[test]
    fn unary_operators() {
        assert_eq!(eval_source("-5;"), Some(EvalValue::Int(-5)));
        assert_eq!(eval_source("~0;"), Some(EvalValue::Int(-1)));
        assert_eq!(eval_source("!0;"), Some(EvalValue::Int(1)));
    }

    #[test]
    fn names_are_not_constant() {
        assert_eq!(eval_source("x := 4; x + 1;"), None);
    }
}
