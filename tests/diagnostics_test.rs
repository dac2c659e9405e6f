// Rendered diagnostics for programs the compiler rejects

use badaclang::sema::SemanticError;
use badaclang::{compile_source, render_diagnostic, CompileError, CompileOptions};
use std::path::Path;

fn diagnostic(source: &str) -> String {
    let err = compile_source(source, &CompileOptions::new("bad.c")).expect_err("Compilation should fail");
    render_diagnostic(Path::new("bad.c"), &err)
}

#[test]
fn test_undeclared_identifier_diagnostic() {
    assert_eq!(
        diagnostic("int main() {\n    return count;\n}\n"),
        "bad.c:2:12: error: use of undeclared identifier 'count'"
    );
}

#[test]
fn test_argument_count_diagnostic() {
    let rendered = diagnostic(
        r#"
extern int printf(const char *, ...);
int main() {
    printf();
    return 0;
}
"#,
    );
    assert!(rendered.starts_with("bad.c:4:"), "got: {}", rendered);
    assert!(rendered.ends_with("error: function 'printf' expects at least 1 argument(s), found 0"));
}

#[test]
fn test_misplaced_break_diagnostic() {
    let rendered = diagnostic("int main() {\n  break;\n}\n");
    assert_eq!(
        rendered,
        "bad.c:2:3: error: 'break' statement not in loop or switch statement"
    );
}

#[test]
fn test_unknown_member_diagnostic() {
    let rendered = diagnostic("struct point { int x; };\nint f(struct point *p) { return p->z; }\n");
    assert!(rendered.ends_with("error: no member named 'z' in 'struct point'"));
}

#[test]
fn test_first_error_wins() {
    let err = compile_source(
        "int main() { return a + b; }",
        &CompileOptions::new("bad.c"),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        CompileError::Semantic(SemanticError::UndeclaredIdentifier { ref name, .. }) if name == "a"
    ));
}

#[test]
fn test_parse_error_diagnostic() {
    let rendered = diagnostic("int main() {\n  return 0\n}\n");
    assert!(rendered.starts_with("bad.c:3:1: error: "), "got: {}", rendered);
}

#[test]
fn test_unterminated_string_is_lex_error() {
    let err = compile_source("char *s = \"abc;\n", &CompileOptions::new("bad.c")).unwrap_err();
    assert!(matches!(err, CompileError::Lex(_)));
}

#[test]
fn test_duplicate_case_diagnostic() {
    let rendered = diagnostic("int f(int x) {\n  switch (x) { case 2: break; case 1 + 1: break; }\n  return 0;\n}\n");
    assert!(rendered.ends_with("error: duplicate case value '2'"));
}
