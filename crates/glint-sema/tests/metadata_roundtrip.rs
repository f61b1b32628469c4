// tests/metadata_roundtrip.rs
//
// The serialiser and deserialiser are inverses: a module's exported surface
// survives the trip through a metadata blob, loose or embedded in an ELF
// object.

use std::fs;

use glint_frontend::{Context, ExprKind, Module, Parser};
use glint_sema::metadata::{self, MetadataError, ModuleDescription};
use tempfile::TempDir;

fn analysed(source: &str) -> Module {
    let ctx = Context::new();
    let mut module = Parser::new("util", source)
        .parse_module()
        .expect("source should parse");
    let result = glint_sema::analyse(&ctx, &mut module).expect("no structural failure");
    assert!(result.is_clean(), "fixture module analyses cleanly: {:?}", result.errors);
    module
}

const UTIL_SOURCE: &str = "\
export add : int(a :int, b :int) { a + b; }\n\
export limit : int = 64;\n\
type Pair : struct { x: int, y: int };\n\
type Mode : enum { read, write : 4 };\n";

fn kind_label(kind: &ExprKind) -> &'static str {
    match kind {
        ExprKind::VarDecl { .. } => "var",
        ExprKind::FuncDecl { .. } => "func",
        ExprKind::TypeDecl { .. } => "type",
        ExprKind::TypeAliasDecl { .. } => "alias",
        _ => "other",
    }
}

#[test]
fn blob_starts_with_version_and_magic() {
    let module = analysed(UTIL_SOURCE);
    let blob = metadata::serialise(&module).unwrap();
    assert_eq!(
        &blob[..4],
        &[
            ModuleDescription::DEFAULT_VERSION,
            ModuleDescription::MAGIC_BYTE0,
            ModuleDescription::MAGIC_BYTE1,
            ModuleDescription::MAGIC_BYTE2,
        ]
    );
    assert!(ModuleDescription::has_valid_magic(&blob));
}

#[test]
fn round_trip_preserves_the_global_scope() {
    let original = analysed(UTIL_SOURCE);
    let blob = metadata::serialise(&original).unwrap();

    let mut fresh = Module::new("fresh");
    metadata::deserialise(&mut fresh, &blob).unwrap();

    for (name, decls) in original.scope(original.global_scope).symbols_in_order() {
        let name_str = original.interner.resolve(name);
        for &decl in decls.iter() {
            let expr = original.expr(decl);
            let fresh_sym = fresh
                .interner
                .lookup(name_str)
                .unwrap_or_else(|| panic!("'{name_str}' missing after round trip"));
            let fresh_decls = fresh.find(fresh.global_scope, fresh_sym);
            assert!(!fresh_decls.is_empty(), "'{name_str}' missing after round trip");
            let fresh_expr = fresh.expr(fresh_decls[0]);

            assert_eq!(
                kind_label(&expr.kind),
                kind_label(&fresh_expr.kind),
                "declaration kind of '{name_str}'"
            );
            assert_eq!(
                original.display_type(expr.ty),
                fresh.display_type(fresh_expr.ty),
                "type of '{name_str}'"
            );
        }
    }
}

#[test]
fn round_trip_twice_is_stable() {
    let original = analysed(UTIL_SOURCE);
    let blob = metadata::serialise(&original).unwrap();

    let mut once = Module::new("once");
    metadata::deserialise(&mut once, &blob).unwrap();
    // Imported declarations are not re-exported, so a second serialisation
    // of an import-only module is empty of declarations but well-formed.
    let blob_again = metadata::serialise(&once).unwrap();
    assert!(ModuleDescription::has_valid_magic(&blob_again));
}

#[test]
fn unresolved_types_cannot_be_serialised() {
    // Parsed but never analysed: the named type is still a name.
    let module = Parser::new("raw", "type Alias = int;\nuse_it : Alias = 3;")
        .parse_module()
        .expect("parses");
    // The named type only appears under `use_it`, which lives in the
    // top-level scope, so force the issue with a global.
    let module2 = Parser::new("raw", "export broken : NoSuchType;")
        .parse_module()
        .expect("parses");
    let _ = module;
    assert_eq!(
        metadata::serialise(&module2).unwrap_err(),
        MetadataError::UnresolvedType
    );
}

#[test]
fn imported_symbols_resolve_and_type_check() {
    let util = analysed(UTIL_SOURCE);
    let blob = metadata::serialise(&util).unwrap();

    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("util.gmeta"), &blob).unwrap();

    let mut ctx = Context::new();
    ctx.add_include_directory(dir.path());
    let source = "\
import util;\n\
r : int = util.add 1 2;\n\
q : int = add 3 4;\n\
lim := limit;\n";
    let mut module = Parser::new("main", source).parse_module().expect("parses");
    let result = glint_sema::analyse(&ctx, &mut module).expect("import loads");
    assert!(result.is_clean(), "{:?}", result.errors);
}

#[test]
fn imported_enum_and_struct_types_are_usable() {
    let util = analysed(UTIL_SOURCE);
    let blob = metadata::serialise(&util).unwrap();

    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("util.gmeta"), &blob).unwrap();

    let mut ctx = Context::new();
    ctx.add_include_directory(dir.path());
    let source = "\
import util;\n\
m := Mode.write;\n\
p : Pair;\n\
x : int = p.x;\n";
    let mut module = Parser::new("main", source).parse_module().expect("parses");
    let result = glint_sema::analyse(&ctx, &mut module).expect("import loads");
    assert!(result.is_clean(), "{:?}", result.errors);

    // Mode.write kept its explicit value.
    let m_sym = module.interner.lookup("m").unwrap();
    let m_decl = module.find(module.top_level_scope, m_sym)[0];
    let ExprKind::VarDecl { init: Some(init), .. } = module.expr(m_decl).kind else {
        panic!("m has an initialiser");
    };
    let ExprKind::Constant { value, .. } = &module.expr(init).kind else {
        panic!("enum access is a constant, got {:?}", module.expr(init).kind);
    };
    assert_eq!(value.as_int(), Some(4));
}

#[test]
fn metadata_embedded_in_an_object_file_loads() {
    let util = analysed(UTIL_SOURCE);
    let blob = metadata::serialise(&util).unwrap();
    let object = glint_sema::elf::object_with_section(glint_sema::METADATA_SECTION_NAME, &blob);

    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("libutil.o"), &object).unwrap();

    let mut ctx = Context::new();
    ctx.add_include_directory(dir.path());
    let mut module = Parser::new("main", "import util;\nn : int = add 1 2;")
        .parse_module()
        .expect("parses");
    let result = glint_sema::analyse(&ctx, &mut module).expect("import loads");
    assert!(result.is_clean(), "{:?}", result.errors);
}
