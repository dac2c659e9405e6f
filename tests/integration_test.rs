// Integration tests for the C to LLVM IR compiler

use badaclang::{compile_source, CompileOptions};

fn compile(source: &str) -> String {
    compile_source(source, &CompileOptions::new("test.c"))
        .expect("Compilation failed")
        .to_string()
}

#[test]
fn test_parameters_live_in_slots() {
    let ir = compile(
        r#"
        int add(int a, int b) {
            return a + b;
        }
    "#,
    );

    let expected = "define i32 @add(i32 %arg.0, i32 %arg.1) {
entry:
  %a.addr0 = alloca i32, align 4
  %b.addr1 = alloca i32, align 4
  store i32 %arg.0, ptr %a.addr0
  store i32 %arg.1, ptr %b.addr1
  %r0 = load i32, ptr %a.addr0
  %r1 = load i32, ptr %b.addr1
  %r2 = add i32 %r0, %r1
  ret i32 %r2
}";
    assert!(ir.contains(expected), "IR was:\n{}", ir);
}

#[test]
fn test_function_call() {
    let ir = compile(
        r#"
        int add(int a, int b) {
            return a + b;
        }

        int main() {
            int result = add(3, 4);
            return result;
        }
    "#,
    );

    assert!(ir.contains("%r0 = call i32 @add(i32 3, i32 4)"));
    assert!(ir.contains("store i32 %r0, ptr %result.addr0"));
}

#[test]
fn test_if_else_blocks() {
    let ir = compile(
        r#"
        int max(int a, int b) {
            if (a > b) {
                return a;
            } else {
                return b;
            }
        }
    "#,
    );

    assert!(ir.contains("%r2 = icmp sgt i32 %r0, %r1"));
    assert!(ir.contains("br i1 %r2, label %if.then.0, label %if.else.1"));
    assert!(ir.contains("if.then.0:"));
    assert!(ir.contains("if.else.1:"));
    // The merge block is unreachable and closed with a zero return
    assert!(ir.contains("if.end.2:\n  ret i32 0"));
}

#[test]
fn test_while_loop_blocks() {
    let ir = compile(
        r#"
        int count(int n) {
            int i = 0;
            while (i < n) {
                i++;
            }
            return i;
        }
    "#,
    );

    assert!(ir.contains("br label %while.cond.0"));
    assert!(ir.contains("br i1 %r2, label %while.body.1, label %while.end.2"));
    assert!(ir.contains("while.body.1:"));
    assert!(ir.contains("%r4 = add i32 %r3, 1"));
}

#[test]
fn test_for_loop_with_continue_and_break() {
    let ir = compile(
        r#"
        int f(int n) {
            int s = 0;
            int i;
            for (i = 0; i < n; i++) {
                if (i == 3) continue;
                if (i == 7) break;
                s += i;
            }
            return s;
        }
    "#,
    );

    assert!(ir.contains("for.cond.0:"));
    assert!(ir.contains("for.body.1:"));
    assert!(ir.contains("for.inc.2:"));
    assert!(ir.contains("for.end.3:"));
    assert!(ir.contains("br label %for.inc.2"));
    assert!(ir.contains("br label %for.end.3"));
}

#[test]
fn test_do_while_runs_body_first() {
    let ir = compile(
        r#"
        int f() {
            int i = 0;
            do {
                i = i + 1;
            } while (i < 10);
            return i;
        }
    "#,
    );

    let body = ir.find("do.body.0:").expect("missing body block");
    let cond = ir.find("do.cond.1:").expect("missing condition block");
    assert!(body < cond);
    assert!(ir.contains("label %do.body.0, label %do.end.2"));
}

#[test]
fn test_switch_fallthrough_and_default() {
    let ir = compile(
        r#"
        int f(int x) {
            int r = 0;
            switch (x) {
                case 1:
                    r = 10;
                case 2:
                    r = r + 1;
                    break;
                default:
                    r = -1;
            }
            return r;
        }
    "#,
    );

    assert!(ir.contains("switch i32 %r0, label %switch.default.2 ["));
    assert!(ir.contains("    i32 1, label %switch.case.0\n"));
    assert!(ir.contains("    i32 2, label %switch.case.1\n"));
    // Case 1 falls through into case 2
    assert!(ir.contains("store i32 10, ptr %r.addr1\n  br label %switch.case.1"));
    assert!(ir.contains("br label %switch.end.3"));
}

#[test]
fn test_switch_without_default_exits() {
    let ir = compile(
        r#"
        int f(int x) {
            switch (x) {
                case 0: return 1;
            }
            return 0;
        }
    "#,
    );

    assert!(ir.contains("switch i32 %r0, label %switch.end.1 ["));
}

#[test]
fn test_short_circuit_and() {
    let ir = compile(
        r#"
        int both(int a, int b) {
            return a && b;
        }
    "#,
    );

    assert!(ir.contains("br i1 %r1, label %land.rhs.0, label %land.end.1"));
    assert!(ir.contains("%r4 = phi i1 [ false, %entry ], [ %r3, %land.rhs.0 ]"));
    assert!(ir.contains("%r5 = zext i1 %r4 to i32"));
}

#[test]
fn test_short_circuit_or() {
    let ir = compile(
        r#"
        int either(int a, int b) {
            return a || b;
        }
    "#,
    );

    assert!(ir.contains("br i1 %r1, label %lor.end.1, label %lor.rhs.0"));
    assert!(ir.contains("phi i1 [ true, %entry ]"));
}

#[test]
fn test_struct_member_access() {
    let ir = compile(
        r#"
        struct Point {
            char tag;
            int x;
            int y;
        };

        int get_y(struct Point *p) {
            return p->y;
        }
    "#,
    );

    assert!(ir.contains("%struct.Point = type <{ i8, [3 x i8], i32, i32 }>"));
    assert!(ir.contains("%r1 = getelementptr inbounds i8, ptr %r0, i64 8"));
    assert!(ir.contains("%r2 = load i32, ptr %r1"));
}

#[test]
fn test_struct_passed_by_value() {
    let ir = compile(
        r#"
        struct Pair { int a; int b; };

        int sum(struct Pair p) {
            return p.a + p.b;
        }

        int main() {
            struct Pair q;
            q.a = 1;
            q.b = 2;
            return sum(q);
        }
    "#,
    );

    assert!(ir.contains("define i32 @sum(%struct.Pair %arg.0)"));
    assert!(ir.contains("%p.addr0 = alloca %struct.Pair, align 4"));
    assert!(ir.contains("load %struct.Pair, ptr %q.addr0"));
}

#[test]
fn test_local_array_initializer() {
    let ir = compile(
        r#"
        int main() {
            int x[4] = {7, 8};
            return x[1];
        }
    "#,
    );

    assert!(ir.contains("%x.addr0 = alloca [4 x i32], align 4"));
    assert!(ir.contains("store [4 x i32] zeroinitializer, ptr %x.addr0"));
    assert!(ir.contains("store i32 7, ptr %x.addr0"));
    assert!(ir.contains("%r0 = getelementptr inbounds i8, ptr %x.addr0, i64 4\n  store i32 8, ptr %r0"));
}

#[test]
fn test_local_char_array_from_string() {
    let ir = compile(
        r#"
        int main() {
            char s[] = "hi";
            return s[0];
        }
    "#,
    );

    assert!(ir.contains("%s.addr0 = alloca [3 x i8], align 1"));
    assert!(ir.contains("store [3 x i8] c\"hi\\00\", ptr %s.addr0"));
}

#[test]
fn test_enum_constants_fold() {
    let ir = compile(
        r#"
        enum color { RED, GREEN = 5, BLUE };

        int main() {
            return BLUE;
        }
    "#,
    );

    assert!(ir.contains("ret i32 6"));
}

#[test]
fn test_main_without_return_returns_zero() {
    let ir = compile("int main() { int x = 1; }");
    assert!(ir.contains("store i32 1, ptr %x.addr0\n  ret i32 0"));
}

#[test]
fn test_void_function_falls_off_end() {
    let ir = compile("void f() { }");
    assert!(ir.contains("define void @f() {\nentry:\n  ret void\n}"));
}

#[test]
fn test_code_after_return_gets_its_own_block() {
    let ir = compile(
        r#"
        int f(int a) {
            return 1;
            a = 2;
        }
    "#,
    );

    assert!(ir.contains("  ret i32 1\n\ndead.0:\n  store i32 2, ptr %a.addr0\n  ret i32 0"));
}

#[test]
fn test_every_block_is_terminated() {
    let module = compile_source(
        "int f(int x) { while (1) { if (x) return 1; else break; } return 2; return 3; }",
        &CompileOptions::new("t.c"),
    )
    .unwrap();
    let f = module.function("f").unwrap();
    assert!(f.blocks.iter().all(|b| b.is_terminated()));
}

#[test]
fn test_ternary_uses_phi() {
    let ir = compile(
        r#"
        int pick(int c, int a, int b) {
            return c ? a : b;
        }
    "#,
    );

    assert!(ir.contains("label %cond.true.0, label %cond.false.1"));
    assert!(ir.contains("phi i32 [ %r2, %cond.true.0 ], [ %r3, %cond.false.1 ]"));
}

#[test]
fn test_global_variables() {
    let ir = compile(
        r#"
        int counter = 3;
        char *name = "badaclang";
        int table[3] = {1, 2, 3};

        int main() {
            counter = counter + 1;
            return table[2];
        }
    "#,
    );

    assert!(ir.contains("@counter = global i32 3, align 4"));
    assert!(ir.contains("@name = global ptr @.str.0, align 8"));
    assert!(ir.contains("@table = global [3 x i32] [i32 1, i32 2, i32 3], align 4"));
    assert!(ir.contains("load i32, ptr @counter"));
    assert!(ir.contains("getelementptr inbounds i8, ptr @table, i64 8"));
}

#[test]
fn test_multiple_declarators() {
    let ir = compile(
        r#"
        int main() {
            int a = 1, *b = &a;
            return *b;
        }
    "#,
    );

    assert!(ir.contains("store ptr %a.addr0, ptr %b.addr1"));
}

#[test]
fn test_macro_expansion() {
    let ir = compile(
        r#"
        #define LIMIT 42
        int main() {
            return LIMIT;
        }
    "#,
    );

    assert!(ir.contains("ret i32 42"));
}

/// Local value names defined in the function `name`: parameters and every
/// `%x = ...` result.
fn local_definitions(ir: &str, name: &str) -> Vec<String> {
    let header = format!("define i32 @{}(", name);
    let start = ir.find(&header).expect("missing function");
    let body = &ir[start..];
    let body = &body[..body.find("\n}").expect("unterminated function")];

    let mut names = Vec::new();
    let first_line = body.lines().next().unwrap_or_default();
    let params = &first_line[header.len()..first_line.rfind(')').unwrap_or(header.len())];
    for param in params.split(", ").filter(|p| !p.is_empty()) {
        names.push(param.rsplit(' ').next().unwrap_or_default().to_string());
    }
    for line in body.lines().skip(1) {
        if let Some((lhs, _)) = line.trim_start().split_once(" = ") {
            if lhs.starts_with('%') {
                names.push(lhs.to_string());
            }
        }
    }
    names
}

#[test]
fn test_parameter_and_slot_names_never_clash() {
    let ir = compile(
        r#"
        int f(int addr1) {
            int arg;
            arg = addr1;
            return arg;
        }

        int main() {
            return f(3);
        }
    "#,
    );

    let names = local_definitions(&ir, "f");
    assert!(names.contains(&"%arg.addr1".to_string()), "IR was:\n{}", ir);
    let mut unique = names.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(unique.len(), names.len(), "duplicate local names in:\n{}", ir);
}

#[test]
fn test_global_pointer_into_global_object() {
    let ir = compile(
        r#"
        struct Pair { int a; int b; };
        int table[3] = {1, 2, 3};
        struct Pair pair;
        int *last = &table[2];
        int *second = &pair.b;

        int main() {
            return *last;
        }
    "#,
    );

    assert!(ir.contains("@last = global ptr getelementptr inbounds (i8, ptr @table, i64 8), align 8"));
    assert!(ir.contains("@second = global ptr getelementptr inbounds (i8, ptr @pair, i64 4), align 8"));
}
