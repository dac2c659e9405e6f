// AST (Abstract Syntax Tree) definitions for the C compiler

use crate::memory::slots::SlotId;
use crate::types::Type;
use std::fmt;

/// Source location information for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

impl SourceLocation {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Base type as written in the source
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BaseType {
    Void,
    Char,
    /// Integer specifiers: width in bits and signedness.
    Integer { bits: u32, signed: bool },
    Struct(String),
    Enum(String),
}

/// Syntactic type: base type, pointer depth, and array dimensions
///
/// `int *x[10]` is `{ base: Int, pointer_depth: 1, array_dims: [Some(10)] }`;
/// dimensions are listed outermost first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeName {
    pub base: BaseType,
    pub pointer_depth: usize,
    pub array_dims: Vec<Option<usize>>, // None for unsized dimension
}

impl TypeName {
    pub fn new(base: BaseType) -> Self {
        TypeName {
            base,
            pointer_depth: 0,
            array_dims: Vec::new(),
        }
    }

    pub fn with_pointer(mut self) -> Self {
        self.pointer_depth += 1;
        self
    }

    pub fn with_array(mut self, size: Option<usize>) -> Self {
        self.array_dims.push(size);
        self
    }
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    // Comparison
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    // Logical
    And,
    Or,
    // Bitwise
    BitAnd,
    BitOr,
    BitXor,
    BitShl,
    BitShr,
}

impl BinOp {
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge
        )
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinOp::And | BinOp::Or)
    }
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::And => "&&",
            BinOp::Or => "||",
            BinOp::BitAnd => "&",
            BinOp::BitOr => "|",
            BinOp::BitXor => "^",
            BinOp::BitShl => "<<",
            BinOp::BitShr => ">>",
        };
        write!(f, "{}", symbol)
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Neg,     // -x
    Not,     // !x
    BitNot,  // ~x
    PreInc,  // ++x
    PreDec,  // --x
    PostInc, // x++
    PostDec, // x--
    Deref,   // *x
    AddrOf,  // &x
}

impl fmt::Display for UnOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            UnOp::Neg => "-",
            UnOp::Not => "!",
            UnOp::BitNot => "~",
            UnOp::PreInc | UnOp::PostInc => "++",
            UnOp::PreDec | UnOp::PostDec => "--",
            UnOp::Deref => "*",
            UnOp::AddrOf => "&",
        };
        write!(f, "{}", symbol)
    }
}

/// What an identifier use refers to, filled in by the resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
    /// Parameter or local variable living in a function slot.
    Local(SlotId),
    Global(String),
    EnumConstant(i64),
}

/// Expression node
///
/// `ty` is `None` straight out of the parser; the resolver sets it on every
/// node it visits.
#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    pub location: SourceLocation,
    pub ty: Option<Type>,
}

impl Expr {
    pub fn new(kind: ExprKind, location: SourceLocation) -> Self {
        Self {
            kind,
            location,
            ty: None,
        }
    }

    /// Resolved type; `void` if the resolver has not visited this node.
    pub fn ty(&self) -> &Type {
        self.ty.as_ref().unwrap_or(&Type::Void)
    }
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    IntLiteral(i64),
    CharLiteral(i8),
    StringLiteral(Vec<u8>),
    Variable {
        name: String,
        binding: Option<Binding>,
    },
    BinaryOp {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    UnaryOp {
        op: UnOp,
        operand: Box<Expr>,
    },
    Assignment {
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// `lhs op= rhs`; `op` is the arithmetic operator.
    CompoundAssignment {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    TernaryOp {
        condition: Box<Expr>,
        true_expr: Box<Expr>,
        false_expr: Box<Expr>,
    },
    FunctionCall {
        name: String,
        args: Vec<Expr>,
    },
    ArrayAccess {
        array: Box<Expr>,
        index: Box<Expr>,
    },
    MemberAccess {
        object: Box<Expr>,
        member: String,
    },
    PointerMemberAccess {
        object: Box<Expr>,
        member: String,
    },
    Cast {
        target_type: TypeName,
        expr: Box<Expr>,
    },
    SizeofType(TypeName),
    SizeofExpr(Box<Expr>),

    // Inserted by the resolver
    /// Conversion of the operand to this node's type.
    ImplicitCast(Box<Expr>),
    /// Array operand used as a pointer to its first element.
    Decay(Box<Expr>),
}

/// Brace-enclosed or scalar initializer
#[derive(Debug, Clone)]
pub enum Initializer {
    Expr(Expr),
    List(Vec<Initializer>, SourceLocation),
}

impl Initializer {
    pub fn location(&self) -> SourceLocation {
        match self {
            Initializer::Expr(expr) => expr.location,
            Initializer::List(_, location) => *location,
        }
    }
}

/// Variable declaration (local or global)
#[derive(Debug, Clone)]
pub struct VarDecl {
    pub name: String,
    pub var_type: TypeName,
    pub init: Option<Initializer>,
    pub is_extern: bool,
    pub location: SourceLocation,
    /// Slot assigned by the resolver to local variables.
    pub slot: Option<SlotId>,
}

/// Function parameter
#[derive(Debug, Clone)]
pub struct Param {
    pub name: Option<String>,
    pub param_type: TypeName,
    pub location: SourceLocation,
}

/// Struct field
#[derive(Debug, Clone)]
pub struct Field {
    pub name: String,
    pub field_type: TypeName,
    pub location: SourceLocation,
}

/// Struct definition
#[derive(Debug, Clone)]
pub struct StructDef {
    pub name: String,
    pub fields: Vec<Field>,
    pub location: SourceLocation,
}

/// One `NAME [= value]` entry of an enum
#[derive(Debug, Clone)]
pub struct Enumerator {
    pub name: String,
    pub value: Option<Expr>,
    pub location: SourceLocation,
}

/// Enum definition; anonymous enums have no name.
#[derive(Debug, Clone)]
pub struct EnumDef {
    pub name: Option<String>,
    pub enumerators: Vec<Enumerator>,
    pub location: SourceLocation,
}

/// Function prototype or definition; `body` is `None` for prototypes.
#[derive(Debug, Clone)]
pub struct FunctionDef {
    pub name: String,
    pub params: Vec<Param>,
    pub variadic: bool,
    pub return_type: TypeName,
    pub body: Option<Vec<Stmt>>,
    pub location: SourceLocation,
}

/// Switch case
#[derive(Debug, Clone)]
pub enum CaseNode {
    Case {
        value: Expr,
        /// Folded value of the label, filled in by the resolver.
        constant: Option<i64>,
        statements: Vec<Stmt>,
        location: SourceLocation,
    },
    Default {
        statements: Vec<Stmt>,
        location: SourceLocation,
    },
}

impl CaseNode {
    pub fn statements(&self) -> &[Stmt] {
        match self {
            CaseNode::Case { statements, .. } | CaseNode::Default { statements, .. } => statements,
        }
    }
}

/// Statement node
#[derive(Debug, Clone)]
pub enum Stmt {
    Declaration(Vec<VarDecl>),
    Expression(Expr),
    Block {
        statements: Vec<Stmt>,
        location: SourceLocation,
    },
    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
        location: SourceLocation,
    },
    While {
        condition: Expr,
        body: Box<Stmt>,
        location: SourceLocation,
    },
    DoWhile {
        body: Box<Stmt>,
        condition: Expr,
        location: SourceLocation,
    },
    For {
        init: Option<Box<Stmt>>,
        condition: Option<Expr>,
        increment: Option<Expr>,
        body: Box<Stmt>,
        location: SourceLocation,
    },
    Switch {
        expr: Expr,
        cases: Vec<CaseNode>,
        location: SourceLocation,
    },
    Return {
        expr: Option<Expr>,
        location: SourceLocation,
    },
    Break(SourceLocation),
    Continue(SourceLocation),
    Empty(SourceLocation),
}

/// Top-level declarations
#[derive(Debug, Clone)]
pub enum Declaration {
    Function(FunctionDef),
    Struct(StructDef),
    Enum(EnumDef),
    Variable(VarDecl),
}

impl Declaration {
    pub fn location(&self) -> SourceLocation {
        match self {
            Declaration::Function(f) => f.location,
            Declaration::Struct(s) => s.location,
            Declaration::Enum(e) => e.location,
            Declaration::Variable(v) => v.location,
        }
    }
}

/// Top-level program structure (one translation unit)
#[derive(Debug, Clone, Default)]
pub struct Program {
    pub declarations: Vec<Declaration>,
}

impl Program {
    pub fn new() -> Self {
        Program::default()
    }
}
