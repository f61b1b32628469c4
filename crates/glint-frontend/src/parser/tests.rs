// parser/tests.rs

use crate::ast::{BinaryOp, ExprKind};
use crate::module::Module;
use crate::parser::Parser;
use crate::types::TypeKind;

fn parse(source: &str) -> Module {
    Parser::new("test", source)
        .parse_module()
        .expect("source should parse")
}

/// Children of the synthesised top-level function's body block.
fn top_level(module: &Module) -> Vec<crate::ExprId> {
    let main = module.top_level_func.expect("main synthesised");
    let ExprKind::FuncDecl { body: Some(body), .. } = &module.expr(main).kind else {
        panic!("main has a body");
    };
    let ExprKind::Block { children } = &module.expr(*body).kind else {
        panic!("main body is a block");
    };
    children.clone()
}

#[test]
fn typed_declaration_with_initialiser() {
    let module = parse("foo : int = 3;");
    let stmts = top_level(&module);
    assert_eq!(stmts.len(), 1);
    let ExprKind::VarDecl { name, init, .. } = &module.expr(stmts[0]).kind else {
        panic!("expected VarDecl");
    };
    assert_eq!(module.interner.resolve(*name), "foo");
    assert!(init.is_some());
    assert_eq!(module.expr(stmts[0]).ty, crate::TypeId::INT);
}

#[test]
fn colon_eq_declares_fresh_name_and_assigns_known_name() {
    let module = parse("foo : int = 3; bar := foo + 2; bar := 7;");
    let stmts = top_level(&module);
    assert_eq!(stmts.len(), 3);
    assert!(matches!(
        module.expr(stmts[1]).kind,
        ExprKind::VarDecl { .. }
    ));
    assert!(matches!(
        module.expr(stmts[2]).kind,
        ExprKind::Binary {
            op: BinaryOp::Assign,
            ..
        }
    ));
}

#[test]
fn array_and_dynamic_array_types() {
    let module = parse("arr : [int 3]; d :: [int dynamic];");
    let stmts = top_level(&module);
    assert!(matches!(
        module.types.get(module.expr(stmts[0]).ty).kind,
        TypeKind::Array { .. }
    ));
    assert!(matches!(
        module.types.get(module.expr(stmts[1]).ty).kind,
        TypeKind::DynamicArray { .. }
    ));
}

#[test]
fn sum_type_members() {
    let module = parse("x : sum { a :int 0, b :int 1 };");
    let stmts = top_level(&module);
    let TypeKind::Sum { members, .. } = &module.types.get(module.expr(stmts[0]).ty).kind else {
        panic!("expected sum type");
    };
    assert_eq!(members.len(), 2);
    assert_eq!(module.interner.resolve(members[0].name), "a");
    assert_eq!(module.interner.resolve(members[1].name), "b");
}

#[test]
fn function_declaration_with_params() {
    let module = parse("add : int(a :int, b :int) { return a + b; }");
    let add = module
        .functions
        .iter()
        .copied()
        .find(|&f| {
            module.expr(f).kind.decl_name().map(|n| module.interner.resolve(n))
                == Some("add")
        })
        .expect("add declared");
    let TypeKind::Function { params, ret, .. } = &module.types.get(module.expr(add).ty).kind
    else {
        panic!("expected function type");
    };
    assert_eq!(params.len(), 2);
    assert_eq!(*ret, crate::TypeId::INT);
}

#[test]
fn juxtaposition_call() {
    let module = parse("f : int(x :int); f 42;");
    let stmts = top_level(&module);
    let ExprKind::Call { args, .. } = &module.expr(stmts[1]).kind else {
        panic!("expected juxtaposed call, got {:?}", module.expr(stmts[1]).kind);
    };
    assert_eq!(args.len(), 1);
}

#[test]
fn call_with_parenthesised_argument() {
    let module = parse("f : int(x :int); f(42);");
    let stmts = top_level(&module);
    assert!(matches!(module.expr(stmts[1]).kind, ExprKind::Call { .. }));
}

#[test]
fn hard_and_soft_casts() {
    let module = parse("a := 1; a as int; a as! @void;");
    let stmts = top_level(&module);
    let ExprKind::Cast { kind: soft, .. } = module.expr(stmts[1]).kind else {
        panic!("expected cast");
    };
    let ExprKind::Cast { kind: hard, .. } = module.expr(stmts[2]).kind else {
        panic!("expected cast");
    };
    assert_eq!(soft, crate::ast::CastKind::Soft);
    assert_eq!(hard, crate::ast::CastKind::Hard);
}

#[test]
fn imports_are_recorded() {
    let module = parse("import stdlib;\nimport math;\nx : int = 0;");
    assert_eq!(module.imports.len(), 2);
    assert_eq!(module.interner.resolve(module.imports[0].name), "stdlib");
    assert_eq!(module.interner.resolve(module.imports[1].name), "math");
}

#[test]
fn enum_type_with_values() {
    let module = parse("type Color : enum { red, green : 5, blue };");
    let stmts = top_level(&module);
    let TypeKind::Enum { enumerators, .. } =
        &module.types.get(module.expr(stmts[0]).ty).kind
    else {
        panic!("expected enum type");
    };
    assert_eq!(enumerators.len(), 3);
    let ExprKind::EnumeratorDecl { init, .. } = &module.expr(enumerators[1]).kind else {
        panic!("expected enumerator");
    };
    assert!(init.is_some());
}

#[test]
fn member_access_and_subscript() {
    let module = parse("s : struct { x: int }; s.x; s.x[0];");
    let stmts = top_level(&module);
    assert!(matches!(
        module.expr(stmts[1]).kind,
        ExprKind::MemberAccess { .. }
    ));
    assert!(matches!(
        module.expr(stmts[2]).kind,
        ExprKind::Binary {
            op: BinaryOp::Subscript,
            ..
        }
    ));
}

#[test]
fn redeclaration_is_rejected() {
    let result = Parser::new("test", "x : int = 1; x : int = 2;").parse_module();
    assert!(result.is_err());
}

#[test]
fn function_overloads_are_accepted() {
    let module = parse("f : void(a :int); f : void(a :bool);");
    let count = module
        .functions
        .iter()
        .filter(|&&f| {
            module.expr(f).kind.decl_name().map(|n| module.interner.resolve(n)) == Some("f")
        })
        .count();
    assert_eq!(count, 2);
}
