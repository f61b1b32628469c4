// tests/driver.rs
//
// End-to-end driver checks: run the real binary against small programs and
// inspect exit codes and outputs.

use std::fs;
use std::process::Command;

use tempfile::TempDir;

fn lcc() -> Command {
    Command::new(env!("CARGO_BIN_EXE_lcc"))
}

#[test]
fn clean_program_exits_zero_and_writes_metadata() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("prog.int");
    let output = dir.path().join("prog.gmeta");
    fs::write(&input, "export answer : int() { 42; }\n").unwrap();

    let status = lcc()
        .arg(&input)
        .arg("-o")
        .arg(&output)
        .status()
        .expect("binary runs");
    assert_eq!(status.code(), Some(0));

    let blob = fs::read(&output).unwrap();
    assert_eq!(&blob[..4], &[1, 0xC0, 0xFF, 0xEE]);
}

#[test]
fn object_output_wraps_metadata_in_an_elf_section() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("prog.int");
    let output = dir.path().join("libprog.o");
    fs::write(&input, "export answer : int() { 42; }\n").unwrap();

    let status = lcc()
        .arg(&input)
        .arg("-o")
        .arg(&output)
        .status()
        .expect("binary runs");
    assert_eq!(status.code(), Some(0));

    let object = fs::read(&output).unwrap();
    assert_eq!(&object[..4], b"\x7fELF");
}

#[test]
fn type_errors_exit_one() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("bad.int");
    fs::write(&input, "arr : [int 3]; arr[5];\n").unwrap();

    let status = lcc().arg(&input).status().expect("binary runs");
    assert_eq!(status.code(), Some(1));
}

#[test]
fn missing_import_is_fatal() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("prog.int");
    fs::write(&input, "import nosuch;\n").unwrap();

    let status = lcc()
        .arg(&input)
        .arg("-I")
        .arg(dir.path())
        .status()
        .expect("binary runs");
    assert_eq!(status.code(), Some(18));
}

#[test]
fn unknown_extension_is_fatal() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("prog.txt");
    fs::write(&input, "").unwrap();

    let status = lcc().arg(&input).status().expect("binary runs");
    assert_eq!(status.code(), Some(18));
}

#[test]
fn syntax_only_skips_analysis() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("prog.int");
    // Would fail analysis (unknown symbol), but parses fine.
    fs::write(&input, "mystery;\n").unwrap();

    let status = lcc()
        .arg("--syntax-only")
        .arg(&input)
        .status()
        .expect("binary runs");
    assert_eq!(status.code(), Some(0));
}

#[test]
fn ast_dump_names_the_module() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("prog.int");
    fs::write(&input, "x : int = 1;\n").unwrap();

    let out = lcc().arg("--ast").arg(&input).output().expect("binary runs");
    assert_eq!(out.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("Module prog"), "{stdout}");
    assert!(stdout.contains("VarDecl x"), "{stdout}");
}

#[test]
fn compiled_metadata_can_be_imported_back() {
    let dir = TempDir::new().unwrap();
    let util = dir.path().join("util.int");
    let util_meta = dir.path().join("util.gmeta");
    fs::write(&util, "export double : int(x :int) { 2 x; }\n").unwrap();

    let status = lcc()
        .arg(&util)
        .arg("-o")
        .arg(&util_meta)
        .status()
        .expect("binary runs");
    assert_eq!(status.code(), Some(0));

    let main = dir.path().join("main.int");
    fs::write(&main, "import util;\nn : int = util.double 21;\n").unwrap();
    let status = lcc()
        .arg(&main)
        .arg("-I")
        .arg(dir.path())
        .status()
        .expect("binary runs");
    assert_eq!(status.code(), Some(0));
}
