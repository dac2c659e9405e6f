// Compiles the sample programs under tests/fixtures and checks the IR shape

use badaclang::{compile_file, compile_source, CompileOptions};
use std::fs;
use std::path::{Path, PathBuf};

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn compile_fixture(name: &str) -> String {
    let source = fs::read_to_string(fixture(name)).expect("Failed to read fixture");
    compile_source(&source, &CompileOptions::new(name))
        .expect("Compilation failed")
        .to_string()
}

#[test]
fn test_vm_fixture() {
    let ir = compile_fixture("vm.c");

    assert!(ir.starts_with("; ModuleID = 'vm.c'\nsource_filename = \"vm.c\"\n"));
    assert!(ir.contains("%struct.instruction_t = type <{ i32, i32, i32 }>"));
    assert!(ir.contains("declare i32 @printf(ptr, ...)"));
    assert!(ir.contains("define i32 @instruction_eval(%struct.instruction_t %arg.0)"));
    assert!(ir.contains("%inst.addr0 = alloca %struct.instruction_t, align 4"));
    assert!(ir.contains("    i32 3, label %switch.case.3\n  ]"));
    assert!(ir.contains("sdiv i32"));
    assert!(ir.contains("define i32 @main(i32 %arg.0, ptr %arg.1)"));
    assert!(ir.contains("load %struct.instruction_t, ptr %inst.addr2"));
    assert!(ir.contains("call i32 (ptr, ...) @printf(ptr @.str.0, i32 "));
}

#[test]
fn test_guess_fixture() {
    let ir = compile_fixture("guess.c");

    assert!(ir.contains("declare i32 @scanf(ptr, ...)"));
    assert!(ir.contains("%guesses.addr4 = alloca [10 x i32], align 4"));
    assert!(ir.contains("store i32 -1, ptr %guess.addr5"));
    assert!(ir.contains("call i32 (ptr, ...) @scanf(ptr @.str.1, ptr %guess.addr5)"));
    assert!(ir.contains("land.rhs."));
    assert!(ir.contains("@.str.0 = private unnamed_addr constant [35 x i8] c\"Guess a number between 1 and 100!\\0A\\00\""));
}

#[test]
fn test_search_fixture() {
    let ir = compile_fixture("search.c");

    assert!(ir.contains("declare i32 @puts(ptr)"));
    assert!(ir.contains("store [10 x i32] zeroinitializer, ptr %x.addr0"));
    assert!(ir.contains("call i32 @linear_search(i32 6, ptr %x.addr0, i32 10)"));
    assert!(ir.contains("call i32 @linear_search(i32 16, ptr %x.addr0, i32 10)"));
    assert!(ir.contains("lor.rhs."));
    assert!(ir.contains("ret i32 1"));
}

#[test]
fn test_endian_fixture() {
    let ir = compile_fixture("endian.c");

    assert!(ir.contains("store i32 305419896, ptr %x.addr0"));
    assert!(ir.contains("store ptr %x.addr0, ptr %p.addr1"));
    assert!(ir.contains("sext i8"));
}

#[test]
fn test_printf_fixture() {
    let ir = compile_fixture("printf.c");

    assert!(ir.contains("@.str.1 = private unnamed_addr constant [6 x i8] c\"world\\00\""));
    assert!(ir.contains("call i32 (ptr, ...) @printf(ptr @.str.0, ptr @.str.1, i32 "));
    assert!(ir.contains("getelementptr inbounds i8, ptr %r"));
}

#[test]
fn test_compile_file_writes_module() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("search.ll");

    compile_file(&fixture("search.c"), &output, &CompileOptions::new("search.c")).unwrap();

    let written = fs::read_to_string(&output).unwrap();
    assert_eq!(written, compile_fixture("search.c"));
}

#[test]
fn test_compile_file_failure_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("bad.c");
    let output = dir.path().join("bad.ll");
    fs::write(&input, "int main() { return missing; }").unwrap();

    assert!(compile_file(&input, &output, &CompileOptions::new("bad.c")).is_err());
    assert!(!output.exists());
}
