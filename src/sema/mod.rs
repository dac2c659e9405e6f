//! Name and type resolution
//!
//! The resolver makes one pass over a parsed [`Program`]:
//!
//! 1. File scope, in declaration order: struct layouts, enum constants,
//!    function signatures, and global variables with their constant
//!    initializers.
//! 2. Every function body, in declaration order, with a fresh scope stack
//!    rooted at file scope and a fresh [`SlotTable`].
//!
//! The tree is annotated in place: every expression gets its type, identifiers
//! get a [`Binding`](crate::parser::ast::Binding), local declarations get a
//! slot, case labels get their folded value, and implicit conversions become
//! explicit `ImplicitCast`/`Decay` nodes. What the IR generator needs beyond
//! the tree is returned as a [`Resolution`].

pub mod const_eval;
mod declarations;
pub mod errors;
mod expressions;
pub mod scope;
mod statements;

pub use errors::SemanticError;

use crate::memory::layout::Layouts;
use crate::memory::slots::SlotTable;
use crate::parser::ast::{Declaration, Program};
use crate::types::{FunctionType, Type};
use rustc_hash::{FxHashMap, FxHashSet};
use scope::ScopeStack;

/// A function known at file scope.
#[derive(Debug, Clone)]
pub struct FunctionInfo {
    pub name: String,
    pub signature: FunctionType,
    /// Whether some declaration supplied a body.
    pub defined: bool,
}

/// Compile-time value of a global initializer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstValue {
    /// All-zero bytes of whatever type is being initialized.
    Zero,
    Int(i64),
    Null,
    /// Inline bytes of a `char` array; padded with zeros to the array length.
    Bytes(Vec<u8>),
    /// Pointer to a string literal.
    StringRef(Vec<u8>),
    /// Address `offset` bytes into a global object.
    Address(String, i64),
    Array(Vec<ConstValue>),
    Struct(Vec<ConstValue>),
}

#[derive(Debug, Clone)]
pub struct GlobalInfo {
    pub name: String,
    pub ty: Type,
    /// Declared `extern` and never defined in this unit.
    pub is_extern: bool,
    pub init: ConstValue,
}

/// Everything the IR generator needs besides the annotated tree.
#[derive(Debug, Default)]
pub struct Resolution {
    pub layouts: Layouts,
    /// Struct tags in definition order.
    pub struct_order: Vec<String>,
    pub enums: Vec<String>,
    /// Functions in first-declaration order.
    pub functions: Vec<FunctionInfo>,
    pub globals: Vec<GlobalInfo>,
    /// Slot tables of defined functions, by function name.
    pub slots: FxHashMap<String, SlotTable>,
}

impl Resolution {
    pub fn function(&self, name: &str) -> Option<&FunctionInfo> {
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn global(&self, name: &str) -> Option<&GlobalInfo> {
        self.globals.iter().find(|g| g.name == name)
    }
}

/// State of the function body being resolved.
#[derive(Debug)]
struct FunctionContext {
    name: String,
    return_type: Type,
    slots: SlotTable,
    /// Enclosing loops; `continue` needs one.
    loops: usize,
    /// Enclosing loops and switches; `break` needs one.
    breakables: usize,
}

impl FunctionContext {
    fn new(name: &str, return_type: Type) -> Self {
        FunctionContext {
            name: name.to_string(),
            return_type,
            slots: SlotTable::new(),
            loops: 0,
            breakables: 0,
        }
    }
}

pub struct Resolver {
    scopes: ScopeStack,
    layouts: Layouts,
    struct_order: Vec<String>,
    enums: FxHashSet<String>,
    enum_order: Vec<String>,
    functions: Vec<FunctionInfo>,
    function_index: FxHashMap<String, usize>,
    globals: Vec<GlobalInfo>,
    global_index: FxHashMap<String, usize>,
    /// Globals that already received an explicit initializer.
    initialized: FxHashSet<String>,
    slots: FxHashMap<String, SlotTable>,
    /// Function body being resolved; an empty placeholder at file scope.
    current: FunctionContext,
}

/// Resolve `program` in place.
pub fn resolve(program: &mut Program) -> Result<Resolution, SemanticError> {
    let mut resolver = Resolver::new();
    resolver.resolve_program(program)?;
    Ok(resolver.finish())
}

impl Resolver {
    pub fn new() -> Self {
        Resolver {
            scopes: ScopeStack::new(),
            layouts: Layouts::default(),
            struct_order: Vec::new(),
            enums: FxHashSet::default(),
            enum_order: Vec::new(),
            functions: Vec::new(),
            function_index: FxHashMap::default(),
            globals: Vec::new(),
            global_index: FxHashMap::default(),
            initialized: FxHashSet::default(),
            slots: FxHashMap::default(),
            current: FunctionContext::new("", Type::Void),
        }
    }

    pub fn resolve_program(&mut self, program: &mut Program) -> Result<(), SemanticError> {
        for decl in program.declarations.iter_mut() {
            match decl {
                Declaration::Struct(def) => self.declare_struct(def)?,
                Declaration::Enum(def) => self.declare_enum(def)?,
                Declaration::Function(def) => self.declare_function(def)?,
                Declaration::Variable(var) => self.declare_global(var)?,
            }
        }

        for decl in program.declarations.iter_mut() {
            if let Declaration::Function(def) = decl {
                if def.body.is_some() {
                    self.resolve_function_body(def)?;
                }
            }
        }

        tracing::debug!(
            structs = self.struct_order.len(),
            functions = self.functions.len(),
            globals = self.globals.len(),
            "resolved translation unit"
        );
        Ok(())
    }

    pub fn finish(self) -> Resolution {
        Resolution {
            layouts: self.layouts,
            struct_order: self.struct_order,
            enums: self.enum_order,
            functions: self.functions,
            globals: self.globals,
            slots: self.slots,
        }
    }
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ast::*;
    use crate::parser::parse::Parser;
    use crate::types::IntType;

    fn resolved(source: &str) -> (Program, Resolution) {
        let mut program = Parser::new(source).unwrap().parse_program().unwrap();
        let resolution = resolve(&mut program).unwrap();
        (program, resolution)
    }

    fn resolve_err(source: &str) -> SemanticError {
        let mut program = Parser::new(source).unwrap().parse_program().unwrap();
        resolve(&mut program).unwrap_err()
    }

    fn body(program: &Program, name: &str) -> Vec<Stmt> {
        program
            .declarations
            .iter()
            .find_map(|d| match d {
                Declaration::Function(f) if f.name == name => f.body.clone(),
                _ => None,
            })
            .unwrap()
    }

    fn returned(program: &Program, name: &str) -> Expr {
        body(program, name)
            .into_iter()
            .find_map(|s| match s {
                Stmt::Return { expr, .. } => expr,
                _ => None,
            })
            .unwrap()
    }

    #[test]
    fn test_enum_constants_are_sequential() {
        let (_, resolution) = resolved("enum op { ADD, SUB, MUL = 7, DIV }; int x = DIV;");
        assert_eq!(resolution.enums, vec!["op".to_string()]);
        assert_eq!(resolution.global("x").unwrap().init, ConstValue::Int(8));
    }

    #[test]
    fn test_struct_layout_is_recorded() {
        let (_, resolution) = resolved("struct s { char c; int i; }; struct s g;");
        let layout = &resolution.layouts["s"];
        assert_eq!(layout.size, 8);
        assert_eq!(layout.field("i").map(|f| f.offset), Some(4));
        assert_eq!(resolution.global("g").unwrap().init, ConstValue::Zero);
    }

    #[test]
    fn test_self_referential_struct() {
        let (_, resolution) = resolved("struct node { int v; struct node *next; };");
        assert_eq!(resolution.layouts["node"].size, 16);
    }

    #[test]
    fn test_parameters_get_slots_first() {
        let (_, resolution) = resolved("int f(int a, char *b) { int c; { int d; } return a; }");
        let slots = &resolution.slots["f"];
        let names: Vec<_> = slots.iter().map(|(_, s)| s.name.clone()).collect();
        assert_eq!(names, vec!["a", "b", "c", "d"]);
        assert_eq!(slots.params().count(), 2);
    }

    #[test]
    fn test_array_parameter_is_pointer() {
        let (_, resolution) = resolved("int main(int argc, char *argv[]) { return argc; }");
        let main = resolution.function("main").unwrap();
        assert_eq!(main.signature.params[1], Type::Char.pointer_to().pointer_to());
    }

    #[test]
    fn test_char_arithmetic_is_promoted() {
        let (program, _) = resolved("int f(char c) { return c + 1; }");
        let expr = returned(&program, "f");
        assert_eq!(expr.ty(), &Type::INT);
        let ExprKind::BinaryOp { left, .. } = &expr.kind else {
            panic!("Expected addition");
        };
        assert!(matches!(left.kind, ExprKind::ImplicitCast(_)));
    }

    #[test]
    fn test_pointer_plus_int_has_pointer_type() {
        let (program, _) = resolved("char *f(char *p, int i) { return p + i; }");
        let expr = returned(&program, "f");
        assert_eq!(expr.ty(), &Type::Char.pointer_to());
        let ExprKind::BinaryOp { right, .. } = &expr.kind else {
            panic!("Expected addition");
        };
        assert_eq!(right.ty(), &Type::LONG);
    }

    #[test]
    fn test_pointer_difference_is_long() {
        let (program, _) = resolved("long f(int *a, int *b) { return a - b; }");
        assert_eq!(returned(&program, "f").ty(), &Type::LONG);
    }

    #[test]
    fn test_array_decays_in_value_context() {
        let (program, _) = resolved("int *f() { int x[4]; return x; }");
        let expr = returned(&program, "f");
        assert!(matches!(expr.kind, ExprKind::Decay(_)));
        assert_eq!(expr.ty(), &Type::INT.pointer_to());
    }

    #[test]
    fn test_unsigned_wins_at_equal_width() {
        let (program, _) = resolved("unsigned f(unsigned a, int b) { return a / b; }");
        assert_eq!(returned(&program, "f").ty(), &Type::Int(IntType::UINT));
    }

    #[test]
    fn test_variadic_arguments_are_promoted() {
        let (program, _) = resolved(
            "int printf(const char *fmt, ...); int main() { char c = 'a'; printf(\"%c\", c); return 0; }",
        );
        let stmts = body(&program, "main");
        let Stmt::Expression(Expr {
            kind: ExprKind::FunctionCall { args, .. },
            ..
        }) = &stmts[1]
        else {
            panic!("Expected call statement");
        };
        assert_eq!(args[0].ty(), &Type::Char.pointer_to());
        assert_eq!(args[1].ty(), &Type::INT);
    }

    #[test]
    fn test_sizeof_is_folded() {
        let (program, _) = resolved("struct p { int x; char c; }; long f() { return sizeof(struct p); }");
        let expr = returned(&program, "f");
        let inner = match &expr.kind {
            ExprKind::ImplicitCast(inner) => inner,
            other => panic!("Expected conversion to long, got {:?}", other),
        };
        assert!(matches!(inner.kind, ExprKind::IntLiteral(8)));
    }

    #[test]
    fn test_case_labels_are_folded() {
        let (program, _) = resolved(
            "enum e { A, B }; int f(int x) { switch (x) { case B + 1: return 1; default: return 0; } }",
        );
        let Stmt::Switch { cases, .. } = &body(&program, "f")[0] else {
            panic!("Expected switch");
        };
        assert!(matches!(cases[0], CaseNode::Case { constant: Some(2), .. }));
    }

    #[test]
    fn test_global_initializers() {
        let (_, resolution) = resolved(
            "int x[4] = {1, 2}; char s[] = \"hi\"; char *p = \"yo\"; int *q = 0; int *r = &x[0];",
        );
        assert_eq!(
            resolution.global("x").unwrap().init,
            ConstValue::Array(vec![
                ConstValue::Int(1),
                ConstValue::Int(2),
                ConstValue::Zero,
                ConstValue::Zero
            ])
        );
        assert_eq!(resolution.global("s").unwrap().ty, Type::Char.array_of(3));
        assert_eq!(resolution.global("s").unwrap().init, ConstValue::Bytes(b"hi".to_vec()));
        assert_eq!(resolution.global("p").unwrap().init, ConstValue::StringRef(b"yo".to_vec()));
        assert_eq!(resolution.global("q").unwrap().init, ConstValue::Null);
        assert!(matches!(resolution.global("r").unwrap().init, ConstValue::Address(ref n, 0) if n == "x"));
    }

    #[test]
    fn test_global_address_offsets_fold() {
        let (_, resolution) = resolved(
            "struct P { char c; int v; }; int a[3]; struct P p; \
             int *q = &a[2]; int *e = a + 1; int *f = &p.v; char *g = (char *)&a[1];",
        );
        assert_eq!(resolution.global("q").unwrap().init, ConstValue::Address("a".into(), 8));
        assert_eq!(resolution.global("e").unwrap().init, ConstValue::Address("a".into(), 4));
        assert_eq!(resolution.global("f").unwrap().init, ConstValue::Address("p".into(), 4));
        assert_eq!(resolution.global("g").unwrap().init, ConstValue::Address("a".into(), 4));
    }

    #[test]
    fn test_identical_prototype_then_definition() {
        let (_, resolution) = resolved("int f(int); int f(int a) { return a; }");
        assert_eq!(resolution.functions.len(), 1);
        assert!(resolution.functions[0].defined);
    }

    #[test]
    fn test_undeclared_identifier() {
        let err = resolve_err("int main() { return y; }");
        assert!(matches!(err, SemanticError::UndeclaredIdentifier { ref name, .. } if name == "y"));
        assert_eq!(err.location(), SourceLocation::new(1, 21));
    }

    #[test]
    fn test_redefinition_of_local() {
        let err = resolve_err("int main() { int a; char a; return 0; }");
        assert!(matches!(err, SemanticError::Redefinition { .. }));
    }

    #[test]
    fn test_shadowing_in_inner_block_is_allowed() {
        resolved("int main() { int a = 1; { int a = 2; } return a; }");
    }

    #[test]
    fn test_function_redefinition() {
        let err = resolve_err("int f() { return 0; } int f() { return 1; }");
        assert!(matches!(err, SemanticError::Redefinition { .. }));
    }

    #[test]
    fn test_conflicting_prototype() {
        let err = resolve_err("int f(int); long f(int a) { return a; }");
        assert!(matches!(err, SemanticError::TypeMismatch { .. }));
    }

    #[test]
    fn test_argument_count() {
        let err = resolve_err("int f(int a, int b) { return a; } int main() { return f(1); }");
        assert!(matches!(
            err,
            SemanticError::ArgumentCount {
                expected: 2,
                found: 1,
                variadic: false,
                ..
            }
        ));
    }

    #[test]
    fn test_unknown_field() {
        let err = resolve_err("struct s { int a; }; int f(struct s v) { return v.b; }");
        assert!(matches!(err, SemanticError::UnknownField { ref field, .. } if field == "b"));
    }

    #[test]
    fn test_assign_to_non_lvalue() {
        let err = resolve_err("int main() { 1 = 2; return 0; }");
        assert!(matches!(err, SemanticError::NotAnLvalue { .. }));
    }

    #[test]
    fn test_break_outside_loop() {
        let err = resolve_err("int main() { break; }");
        assert!(matches!(err, SemanticError::MisplacedJump { keyword: "break", .. }));
    }

    #[test]
    fn test_continue_inside_switch_only() {
        let err = resolve_err("int f(int x) { switch (x) { case 0: continue; } return 0; }");
        assert!(matches!(err, SemanticError::MisplacedJump { keyword: "continue", .. }));
    }

    #[test]
    fn test_duplicate_case() {
        let err = resolve_err("int f(int x) { switch (x) { case 1: case 1: break; } return 0; }");
        assert!(matches!(err, SemanticError::DuplicateCase { value: 1, .. }));
    }

    #[test]
    fn test_non_constant_case() {
        let err = resolve_err("int f(int x) { switch (x) { case x: break; } return 0; }");
        assert!(matches!(err, SemanticError::NotConstant { .. }));
    }

    #[test]
    fn test_pointer_from_integer_rejected() {
        let err = resolve_err("int main() { int *p = 5; return 0; }");
        assert!(matches!(err, SemanticError::TypeMismatch { .. }));
    }

    #[test]
    fn test_return_value_from_void_function() {
        let err = resolve_err("void f() { return 1; }");
        assert!(matches!(err, SemanticError::TypeMismatch { .. }));
    }

    #[test]
    fn test_unknown_struct() {
        let err = resolve_err("struct missing g;");
        assert!(matches!(err, SemanticError::UndeclaredIdentifier { ref name, .. } if name == "struct missing"));
    }

    #[test]
    fn test_call_of_variable() {
        let err = resolve_err("int x; int main() { return x(); }");
        assert!(matches!(err, SemanticError::TypeMismatch { .. }));
    }
}
