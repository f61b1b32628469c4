// tests/sema_scenarios.rs
//
// End-to-end checks: real Glint source through parse + analyse.

use glint_frontend::{Context, ExprId, ExprKind, Module, Parser, TypeId, TypeKind};
use glint_sema::{AnalysisResult, FatalError, SemanticError, SemanticWarning};

fn analyse(source: &str) -> (Module, AnalysisResult) {
    let ctx = Context::new();
    let mut module = Parser::new("test", source)
        .parse_module()
        .expect("source should parse");
    let result = glint_sema::analyse(&ctx, &mut module).expect("no structural failure");
    (module, result)
}

fn assert_clean(result: &AnalysisResult) {
    assert!(
        result.errors.is_empty(),
        "expected no errors, got: {:?}",
        result.errors
    );
}

/// Find a declaration by name in the top-level or global scope.
fn decl(module: &Module, name: &str) -> ExprId {
    let sym = module.interner.lookup(name).expect("name interned");
    module
        .find(module.top_level_scope, sym)
        .first()
        .copied()
        .or_else(|| module.find(module.global_scope, sym).first().copied())
        .unwrap_or_else(|| panic!("'{name}' not declared"))
}

fn init_of(module: &Module, name: &str) -> ExprId {
    let ExprKind::VarDecl { init: Some(init), .. } = module.expr(decl(module, name)).kind else {
        panic!("'{name}' has no initialiser");
    };
    init
}

// ---------------------------------------------------------------------------
// Inference and conversions
// ---------------------------------------------------------------------------

#[test]
fn inferred_declaration_takes_initialiser_type() {
    let (module, result) = analyse("foo : int = 3; bar := foo + 2;");
    assert_clean(&result);
    assert_eq!(module.expr(decl(&module, "bar")).ty, TypeId::INT);
}

#[test]
fn literal_fits_byte() {
    let (_, result) = analyse("ok : byte = 255;");
    assert_clean(&result);
}

#[test]
fn literal_too_big_for_byte_is_rejected() {
    let (_, result) = analyse("bad : byte = 300;");
    assert!(result
        .errors
        .iter()
        .any(|e| matches!(e.error, SemanticError::InitTypeMismatch { .. })));
}

#[test]
fn negative_literal_never_fits_unsigned() {
    let (_, result) = analyse("bad : uint = -1;");
    assert!(result
        .errors
        .iter()
        .any(|e| matches!(e.error, SemanticError::InitTypeMismatch { .. })));
}

#[test]
fn integer_converts_to_bool_and_back() {
    let (_, result) = analyse("flag : bool = 1; n : int = true;");
    assert_clean(&result);
}

#[test]
fn reference_binds_lvalues_only() {
    let (_, result) = analyse("x : int = 1; r : &int = x;");
    assert_clean(&result);

    let (_, result) = analyse("r : &int = 5;");
    assert!(result
        .errors
        .iter()
        .any(|e| matches!(e.error, SemanticError::InitTypeMismatch { .. })));
}

#[test]
fn nested_references_collapse() {
    let (module, result) = analyse("x : int = 1; r : &&int = x;");
    assert_clean(&result);
    let r_ty = module.expr(decl(&module, "r")).ty;
    let TypeKind::Reference { elem } = module.types.get(r_ty).kind else {
        panic!("expected a reference type");
    };
    assert_eq!(elem, TypeId::INT, "ref ref int must collapse to ref int");
}

#[test]
fn function_type_decays_to_pointer_in_declarations() {
    let (module, result) = analyse("g : int(); h := g;");
    assert_clean(&result);
    let h_ty = module.expr(decl(&module, "h")).ty;
    let TypeKind::Pointer { elem } = module.types.get(h_ty).kind else {
        panic!("expected a function pointer");
    };
    assert!(module.types.is_function(elem));
}

#[test]
fn zero_argument_function_deprocedures() {
    let (module, result) = analyse("g : int(); y : int = g;");
    assert_clean(&result);
    assert!(matches!(
        module.expr(init_of(&module, "y")).kind,
        ExprKind::Call { .. }
    ));
}

// ---------------------------------------------------------------------------
// Arrays and bounds
// ---------------------------------------------------------------------------

#[test]
fn constant_subscript_is_bounds_checked() {
    let (_, result) = analyse("arr : [int 3]; arr[5];");
    assert!(result
        .errors
        .iter()
        .any(|e| matches!(e.error, SemanticError::SubscriptOutOfBounds { .. })));
}

#[test]
fn in_bounds_subscript_is_fine() {
    let (_, result) = analyse("arr : [int 3]; x := arr[2];");
    assert_clean(&result);
}

#[test]
fn array_size_must_be_positive() {
    let (_, result) = analyse("arr : [int 0];");
    assert!(result
        .errors
        .iter()
        .any(|e| matches!(e.error, SemanticError::ArraySizeNotPositive { .. })));
}

// ---------------------------------------------------------------------------
// Sum types
// ---------------------------------------------------------------------------

#[test]
fn assigning_to_a_sum_directly_is_an_error() {
    let (_, result) = analyse("f : void() { x : sum { a :int 0, b :int 1 }; x := 4; }");
    assert!(result
        .errors
        .iter()
        .any(|e| matches!(e.error, SemanticError::AssignToSumType { .. })));
}

#[test]
fn sum_member_assignment_finalises_against_the_shadow() {
    let (module, result) = analyse("f : void() { x : sum { a :int 0, b :int 1 }; x.a := 4; }");
    assert_clean(&result);

    // The member access keeps the sum's type and records the member index;
    // IR generation uses the shadow struct from there.
    let access = (0..module.expr_count() as u32)
        .map(ExprId)
        .find(|&id| matches!(module.expr(id).kind, ExprKind::MemberAccess { .. }))
        .expect("member access analysed");
    let ExprKind::MemberAccess {
        strukt: Some(shadow),
        member_index: Some(0),
        ..
    } = module.expr(access).kind
    else {
        panic!("member access not finalised: {:?}", module.expr(access).kind);
    };
    assert!(module.types.is_sum(module.expr(access).ty));

    let TypeKind::Struct(s) = &module.types.get(shadow).kind else {
        panic!("shadow must be a struct");
    };
    assert_eq!(module.interner.resolve(s.members[0].name), "tag");
    assert_eq!(module.interner.resolve(s.members[1].name), "data");
}

#[test]
fn sum_tag_enumerators_mirror_member_names() {
    let (module, result) = analyse("x : sum { left :int 0, right :byte 0 };");
    // The trailing declaration is `main`'s value; ignore its conversion.
    let _ = result;

    let sum_ty = module.expr(decl(&module, "x")).ty;
    let TypeKind::Sum { shadow: Some(shadow), .. } = module.types.get(sum_ty).kind else {
        panic!("sum shadow materialised");
    };
    let TypeKind::Struct(s) = &module.types.get(shadow).kind else {
        panic!("shadow is a struct");
    };
    let TypeKind::Enum { enumerators, .. } = &module.types.get(s.members[0].ty).kind else {
        panic!("tag is an enum");
    };
    let names: Vec<&str> = enumerators
        .iter()
        .map(|&e| {
            let name = module.expr(e).kind.decl_name().unwrap();
            module.interner.resolve(name)
        })
        .collect();
    assert_eq!(names, ["left", "right"]);
}

#[test]
fn sum_needs_at_least_two_members() {
    let (_, result) = analyse("x : sum { only :int 0 };");
    assert!(result
        .errors
        .iter()
        .any(|e| matches!(e.error, SemanticError::SumTypeTooFewMembers { .. })));
}

#[test]
fn has_checks_a_sum_member_access() {
    let (_, result) =
        analyse("f : void() { x : sum { a :int 0, b :int 1 }; ok : bool = has x.a; }");
    assert_clean(&result);
}

// ---------------------------------------------------------------------------
// Dangling dynamic arrays
// ---------------------------------------------------------------------------

#[test]
fn unfreed_dynamic_array_leaks() {
    let (_, result) = analyse(
        "consume : void(x :[int dynamic]);\n\
         use : void() { d :: [int dynamic]; consume d; }",
    );
    assert!(result
        .errors
        .iter()
        .any(|e| matches!(e.error, SemanticError::DanglingDynamicArray { .. })));
}

#[test]
fn freeing_clears_the_dangling_set() {
    let (_, result) = analyse("use : void() { d :: [int dynamic]; -d; }");
    assert_clean(&result);
}

#[test]
fn returning_transfers_ownership() {
    let (_, result) = analyse("make : [int dynamic]() { d :: [int dynamic]; d; }");
    assert_clean(&result);
}

#[test]
fn explicit_return_transfers_ownership() {
    let (_, result) = analyse("make : [int dynamic]() { d :: [int dynamic]; return d; }");
    assert_clean(&result);
}

#[test]
fn use_after_free_is_reported() {
    let (_, result) = analyse("use : void() { d :: [int dynamic]; -d; d; }");
    assert!(result
        .errors
        .iter()
        .any(|e| matches!(e.error, SemanticError::UseAfterFree { .. })));
}

#[test]
fn parameters_are_owned_by_the_caller() {
    let (_, result) = analyse("f : void(d :[int dynamic]) { d; }");
    assert!(
        !result
            .errors
            .iter()
            .any(|e| matches!(e.error, SemanticError::DanglingDynamicArray { .. })),
        "parameters must not be counted as dangling"
    );
}

// ---------------------------------------------------------------------------
// Name resolution and spellcheck
// ---------------------------------------------------------------------------

#[test]
fn unknown_symbol_gets_a_suggestion_note() {
    let (_, result) = analyse("fas : int = 1; bas;");
    assert_eq!(result.errors.len(), 1, "{:?}", result.errors);
    let SemanticError::UnknownSymbol {
        name,
        suggestion,
        suggested,
        ..
    } = &result.errors[0].error
    else {
        panic!("expected UnknownSymbol, got {:?}", result.errors[0].error);
    };
    assert_eq!(name, "bas");
    assert_eq!(suggestion, "fas");
    assert!(suggested.is_some());
    assert!(
        !result
            .warnings
            .iter()
            .any(|w| matches!(w.warning, SemanticWarning::TreatingAs { .. })),
        "three-letter identifiers must not be silently rewritten"
    );
}

#[test]
fn transposed_identifier_is_silently_retargeted() {
    let (module, result) = analyse("abcd : int = 1; acbd;");
    assert_clean(&result);
    let warning = result
        .warnings
        .iter()
        .find_map(|w| match &w.warning {
            SemanticWarning::TreatingAs { typed, actual, .. } => {
                Some((typed.clone(), actual.clone()))
            }
            _ => None,
        })
        .expect("retarget warning emitted");
    assert_eq!(warning, ("acbd".to_string(), "abcd".to_string()));

    // The reference really resolves to the declaration.
    let target = (0..module.expr_count() as u32).map(ExprId).find_map(|id| {
        match module.expr(id).kind {
            ExprKind::NameRef {
                target: Some(t), ..
            } => Some(t),
            _ => None,
        }
    });
    assert_eq!(target, Some(decl(&module, "abcd")));
}

#[test]
fn self_referential_initialiser_is_an_error() {
    let (_, result) = analyse("x := x + 1;");
    assert!(result
        .errors
        .iter()
        .any(|e| matches!(e.error, SemanticError::SelfReferentialInit { .. })));
}

#[test]
fn top_level_declaration_suggests_static() {
    let (_, result) = analyse("counter : int = 0;\nbump : void() { counter; }");
    let found = result.errors.iter().any(|e| {
        matches!(
            &e.error,
            SemanticError::UnknownSymbol { name, top_level: Some(_), .. } if name == "counter"
        )
    });
    assert!(found, "{:?}", result.errors);
}

#[test]
fn static_declarations_are_visible_everywhere() {
    let (_, result) = analyse("static counter : int = 0;\nbump : int() { counter; }");
    assert_clean(&result);
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

#[test]
fn enumerators_count_up_from_zero() {
    let (module, result) = analyse("type E : enum { a, b : 5, c }; x := E.c;");
    assert_clean(&result);
    let ExprKind::Constant { value, .. } = &module.expr(init_of(&module, "x")).kind else {
        panic!("enum member access must collapse to a constant");
    };
    assert_eq!(value.as_int(), Some(6));
}

#[test]
fn plain_enum_values_are_sequential() {
    let (module, result) = analyse("type E : enum { a, b, c };");
    assert_clean(&result);
    let e_ty = module.expr(decl(&module, "E")).ty;
    let TypeKind::Enum { enumerators, .. } = module.types.get(e_ty).kind.clone() else {
        panic!("expected an enum");
    };
    for (index, enumerator) in enumerators.iter().enumerate() {
        let ExprKind::EnumeratorDecl { init: Some(init), .. } = module.expr(*enumerator).kind
        else {
            panic!("enumerator has a value");
        };
        let ExprKind::Constant { value, .. } = &module.expr(init).kind else {
            panic!("value is a constant");
        };
        assert_eq!(value.as_int(), Some(index as i64));
    }
}

#[test]
fn duplicate_enumerators_are_rejected() {
    let (_, result) = analyse("type E : enum { a, a };");
    assert!(result
        .errors
        .iter()
        .any(|e| matches!(e.error, SemanticError::DuplicateEnumerator { .. })));
}

#[test]
fn unknown_enumerator_is_reported() {
    let (_, result) = analyse("type E : enum { a }; E.missing;");
    assert!(result
        .errors
        .iter()
        .any(|e| matches!(e.error, SemanticError::NoSuchEnumerator { .. })));
}

// ---------------------------------------------------------------------------
// Structs, sizeof, member access
// ---------------------------------------------------------------------------

#[test]
fn sizeof_collapses_to_the_padded_size() {
    let (module, result) =
        analyse("s : struct { a: byte, b: int, c: byte }; n := sizeof s;");
    assert_clean(&result);
    assert!(matches!(
        module.expr(init_of(&module, "n")).kind,
        ExprKind::IntegerLiteral(24)
    ));
}

#[test]
fn alignof_collapses_to_the_alignment() {
    let (module, result) = analyse("s : struct { a: byte, b: int }; n := alignof s;");
    assert_clean(&result);
    assert!(matches!(
        module.expr(init_of(&module, "n")).kind,
        ExprKind::IntegerLiteral(8)
    ));
}

#[test]
fn empty_struct_has_size_zero() {
    let (module, result) = analyse("s : struct { }; n := sizeof s;");
    assert_clean(&result);
    assert!(matches!(
        module.expr(init_of(&module, "n")).kind,
        ExprKind::IntegerLiteral(0)
    ));
}

#[test]
fn struct_member_access_takes_the_member_type() {
    let (module, result) = analyse("s : struct { x: int, y: bool }; v := s.y;");
    assert_clean(&result);
    assert_eq!(module.expr(decl(&module, "v")).ty, TypeId::BOOL);
}

#[test]
fn dynamic_array_exposes_its_shadow_members() {
    let (module, result) = analyse("f : void() { d :: [int dynamic]; n : int = d.length; -d; }");
    assert_clean(&result);
    let _ = module;
}

#[test]
fn unknown_struct_member_is_reported() {
    let (_, result) = analyse("s : struct { x: int }; s.missing;");
    assert!(result
        .errors
        .iter()
        .any(|e| matches!(e.error, SemanticError::NoSuchMember { .. })));
}

#[test]
fn member_access_on_scalar_is_an_error() {
    let (_, result) = analyse("x : int = 1; x.field;");
    assert!(result
        .errors
        .iter()
        .any(|e| matches!(e.error, SemanticError::MemberAccessNotStruct { .. })));
}

// ---------------------------------------------------------------------------
// Control flow
// ---------------------------------------------------------------------------

#[test]
fn if_arms_share_a_common_type() {
    let (module, result) = analyse("a := 1; b := 2; c := if (a < b) a else b;");
    assert_clean(&result);
    assert_eq!(module.expr(decl(&module, "c")).ty, TypeId::INT);
}

#[test]
fn if_without_common_type_is_void() {
    let (_, result) = analyse("f : void() { a := 1; if (a < 2) a := 5; }");
    assert_clean(&result);
}

#[test]
fn loop_condition_must_convert_to_bool() {
    let (_, result) = analyse("s : struct { x: int }; while s { }");
    assert!(result
        .errors
        .iter()
        .any(|e| matches!(e.error, SemanticError::LoopConditionNotBool { .. })));
}

#[test]
fn while_loop_with_assignment_body() {
    let (_, result) = analyse("i := 0; while i < 10 { i := i + 1; }");
    assert_clean(&result);
}

#[test]
fn void_function_must_not_return_a_value() {
    let (_, result) = analyse("f : void() { return 1; }");
    assert!(result
        .errors
        .iter()
        .any(|e| matches!(e.error, SemanticError::ReturnValueInVoidFunction { .. })));
}

#[test]
fn non_void_function_must_return_a_value() {
    let (_, result) = analyse("f : int() { return; }");
    assert!(result
        .errors
        .iter()
        .any(|e| matches!(e.error, SemanticError::MissingReturnValue { .. })));
}

#[test]
fn trailing_expression_becomes_the_return_value() {
    let (_, result) = analyse("f : int(a :int) { a + 1; }");
    assert_clean(&result);
}

// ---------------------------------------------------------------------------
// Calls
// ---------------------------------------------------------------------------

#[test]
fn call_arguments_convert_to_parameter_types() {
    let (_, result) = analyse("f : void(a :int, b :bool); f 1 true;");
    assert_clean(&result);
}

#[test]
fn wrong_argument_count_is_reported() {
    let (_, result) = analyse("f : void(a :int); f 1 2;");
    assert!(result
        .errors
        .iter()
        .any(|e| matches!(e.error, SemanticError::ArgumentCount { .. })));
}

#[test]
fn calling_a_struct_is_an_error() {
    let (_, result) = analyse("s : struct { x: int }; s 1;");
    assert!(result
        .errors
        .iter()
        .any(|e| matches!(e.error, SemanticError::NotAFunction { .. })));
}

#[test]
fn integer_callee_multiplies_its_arguments() {
    let (module, result) = analyse("x := 2; y := 100 x;");
    assert_clean(&result);
    // `100 x` is `100 * x`.
    let init = init_of(&module, "y");
    assert!(matches!(
        module.expr(init).kind,
        ExprKind::Binary {
            op: glint_frontend::BinaryOp::Mul,
            ..
        }
    ));
    assert_eq!(module.expr(init).ty, TypeId::INT);
}

#[test]
fn calling_a_type_is_a_hard_cast() {
    let (module, result) = analyse("b : byte = 3; n := :int b;");
    assert_clean(&result);
    assert!(matches!(
        module.expr(init_of(&module, "n")).kind,
        ExprKind::Cast {
            kind: glint_frontend::CastKind::Hard,
            ..
        }
    ));
}

#[test]
fn duplicate_overloads_are_rejected() {
    let (_, result) = analyse("f : void(a :int); f : void(b :int); x := f;");
    assert!(result
        .errors
        .iter()
        .any(|e| matches!(e.error, SemanticError::OverloadsSameParameters { .. })));
}

#[test]
fn calling_an_overload_set_is_unimplemented() {
    let ctx = Context::new();
    let mut module = Parser::new("test", "f : void(a :int); f : void(a :bool); f 1;")
        .parse_module()
        .expect("parses");
    let result = glint_sema::analyse(&ctx, &mut module);
    assert!(matches!(result, Err(FatalError::Ice(_))));
}

// ---------------------------------------------------------------------------
// Casts
// ---------------------------------------------------------------------------

#[test]
fn pointer_to_integer_needs_the_hard_form() {
    let (_, result) = analyse("p : @int; n := p as int;");
    assert!(result
        .errors
        .iter()
        .any(|e| matches!(e.error, SemanticError::UnsafeCastNeedsHardForm { .. })));

    let (_, result) = analyse("p : @int; n := p as! int;");
    assert_clean(&result);
}

#[test]
fn integer_to_enum_needs_the_hard_form() {
    let (_, result) = analyse("type E : enum { a, b }; v := 1 as E;");
    assert!(result
        .errors
        .iter()
        .any(|e| matches!(e.error, SemanticError::UnsafeCastNeedsHardForm { .. })));

    let (_, result) = analyse("type E : enum { a, b }; v := 1 as! E;");
    assert_clean(&result);
}

#[test]
fn enum_to_integer_needs_the_hard_form() {
    let (_, result) = analyse("type E : enum { a, b }; v := E.b as! int;");
    assert_clean(&result);
}

#[test]
fn widening_casts_are_soft() {
    let (_, result) = analyse("b : byte = 1; n := b as int;");
    assert_clean(&result);
}

// ---------------------------------------------------------------------------
// Intrinsics
// ---------------------------------------------------------------------------

#[test]
fn builtin_line_collapses_to_a_constant() {
    let (module, result) = analyse("n := __builtin_line();");
    assert_clean(&result);
    let ExprKind::Constant { value, .. } = &module.expr(init_of(&module, "n")).kind else {
        panic!("__builtin_line must collapse to a constant");
    };
    assert_eq!(value.as_int(), Some(1));
}

#[test]
fn builtin_syscall_types_as_int() {
    let (module, result) = analyse("n : int = __builtin_syscall 60 0;");
    assert_clean(&result);
    let _ = module;
}

#[test]
fn builtin_memcpy_checks_its_arguments() {
    let (_, result) = analyse(
        "f : void(dst :@void, src :@void, n :int) { __builtin_memcpy dst src n; }",
    );
    assert_clean(&result);

    let (_, result) = analyse("f : void(dst :@void) { __builtin_memcpy dst; }");
    assert!(result
        .errors
        .iter()
        .any(|e| matches!(e.error, SemanticError::IntrinsicArity { .. })));
}

#[test]
fn builtin_debugtrap_takes_no_arguments() {
    let (_, result) = analyse("f : void() { __builtin_debugtrap 1; }");
    assert!(result
        .errors
        .iter()
        .any(|e| matches!(e.error, SemanticError::IntrinsicArity { .. })));
}

// ---------------------------------------------------------------------------
// Discarding
// ---------------------------------------------------------------------------

#[test]
fn discarding_a_pure_expression_warns() {
    let (_, result) = analyse("f : void() { x := 1; x + 1; x := 2; }");
    assert_clean(&result);
    assert!(result
        .warnings
        .iter()
        .any(|w| matches!(w.warning, SemanticWarning::UnusedResult { .. })));
}

#[test]
fn discarding_a_non_discardable_call_is_an_error() {
    let (_, result) = analyse("g : int(); f : void() { g(); g; }");
    assert!(result
        .errors
        .iter()
        .any(|e| matches!(e.error, SemanticError::DiscardNonDiscardable { .. })));
}

#[test]
fn discardable_calls_may_be_discarded() {
    let (_, result) = analyse("g : int() discardable; f : void() { g; }");
    assert_clean(&result);
}
