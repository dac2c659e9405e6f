//! Textual LLVM IR
//!
//! A small, closed model of the subset of LLVM assembly the generator emits.
//! Every node renders itself through [`fmt::Display`]; rendering a
//! [`Module`] produces a complete `.ll` file.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IrType {
    Void,
    /// Result of comparisons.
    I1,
    Int(u32),
    Ptr,
    Array(Box<IrType>, usize),
    /// Named struct type `%struct.NAME`.
    Struct(String),
}

impl IrType {
    pub const I8: IrType = IrType::Int(8);
    pub const I32: IrType = IrType::Int(32);
    pub const I64: IrType = IrType::Int(64);

    pub fn is_aggregate(&self) -> bool {
        matches!(self, IrType::Array(..) | IrType::Struct(_))
    }
}

impl fmt::Display for IrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IrType::Void => write!(f, "void"),
            IrType::I1 => write!(f, "i1"),
            IrType::Int(bits) => write!(f, "i{}", bits),
            IrType::Ptr => write!(f, "ptr"),
            IrType::Array(element, len) => write!(f, "[{} x {}]", len, element),
            IrType::Struct(name) => write!(f, "%struct.{}", name),
        }
    }
}

/// An instruction operand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Const(i64),
    Null,
    /// Virtual register `%rN`.
    Reg(usize),
    /// Named local value: a slot `%x.addr0` or an incoming `%arg.0`.
    Local(String),
    /// Address of a global `@name`.
    Global(String),
    /// `true`/`false` of type `i1`.
    Bool(bool),
    /// `zeroinitializer`, the zero of any type.
    Zero,
    /// Inline `c"..."` value of a char array.
    Bytes(Vec<u8>),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Const(value) => write!(f, "{}", value),
            Operand::Null => write!(f, "null"),
            Operand::Reg(n) => write!(f, "%r{}", n),
            Operand::Local(name) => write!(f, "%{}", name),
            Operand::Global(name) => write!(f, "@{}", name),
            Operand::Bool(value) => write!(f, "{}", value),
            Operand::Zero => write!(f, "zeroinitializer"),
            Operand::Bytes(bytes) => write!(f, "c\"{}\"", escape_bytes(bytes)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    SDiv,
    UDiv,
    SRem,
    URem,
    And,
    Or,
    Xor,
    Shl,
    AShr,
    LShr,
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BinaryOp::Add => "add",
            BinaryOp::Sub => "sub",
            BinaryOp::Mul => "mul",
            BinaryOp::SDiv => "sdiv",
            BinaryOp::UDiv => "udiv",
            BinaryOp::SRem => "srem",
            BinaryOp::URem => "urem",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
            BinaryOp::Xor => "xor",
            BinaryOp::Shl => "shl",
            BinaryOp::AShr => "ashr",
            BinaryOp::LShr => "lshr",
        };
        write!(f, "{}", name)
    }
}

/// `icmp` condition codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Predicate {
    Eq,
    Ne,
    Slt,
    Sle,
    Sgt,
    Sge,
    Ult,
    Ule,
    Ugt,
    Uge,
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Predicate::Eq => "eq",
            Predicate::Ne => "ne",
            Predicate::Slt => "slt",
            Predicate::Sle => "sle",
            Predicate::Sgt => "sgt",
            Predicate::Sge => "sge",
            Predicate::Ult => "ult",
            Predicate::Ule => "ule",
            Predicate::Ugt => "ugt",
            Predicate::Uge => "uge",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastOp {
    Trunc,
    ZExt,
    SExt,
    PtrToInt,
    IntToPtr,
}

impl fmt::Display for CastOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CastOp::Trunc => "trunc",
            CastOp::ZExt => "zext",
            CastOp::SExt => "sext",
            CastOp::PtrToInt => "ptrtoint",
            CastOp::IntToPtr => "inttoptr",
        };
        write!(f, "{}", name)
    }
}

/// Non-terminator instructions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    Alloca {
        dest: Operand,
        ty: IrType,
        align: usize,
    },
    Load {
        dest: Operand,
        ty: IrType,
        ptr: Operand,
    },
    Store {
        ty: IrType,
        value: Operand,
        ptr: Operand,
    },
    Binary {
        dest: Operand,
        op: BinaryOp,
        ty: IrType,
        lhs: Operand,
        rhs: Operand,
    },
    ICmp {
        dest: Operand,
        pred: Predicate,
        ty: IrType,
        lhs: Operand,
        rhs: Operand,
    },
    Cast {
        dest: Operand,
        op: CastOp,
        from: IrType,
        value: Operand,
        to: IrType,
    },
    /// Byte-addressed `getelementptr inbounds i8, ptr BASE, i64 OFFSET`.
    Gep {
        dest: Operand,
        base: Operand,
        offset: Operand,
    },
    Call {
        dest: Option<Operand>,
        return_type: IrType,
        /// Full function type, spelled out for variadic callees.
        signature: Option<String>,
        callee: String,
        args: Vec<(IrType, Operand)>,
    },
    Phi {
        dest: Operand,
        ty: IrType,
        incoming: Vec<(Operand, String)>,
    },
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Alloca { dest, ty, align } => {
                write!(f, "{} = alloca {}, align {}", dest, ty, align)
            }
            Instruction::Load { dest, ty, ptr } => write!(f, "{} = load {}, ptr {}", dest, ty, ptr),
            Instruction::Store { ty, value, ptr } => write!(f, "store {} {}, ptr {}", ty, value, ptr),
            Instruction::Binary {
                dest,
                op,
                ty,
                lhs,
                rhs,
            } => write!(f, "{} = {} {} {}, {}", dest, op, ty, lhs, rhs),
            Instruction::ICmp {
                dest,
                pred,
                ty,
                lhs,
                rhs,
            } => write!(f, "{} = icmp {} {} {}, {}", dest, pred, ty, lhs, rhs),
            Instruction::Cast {
                dest,
                op,
                from,
                value,
                to,
            } => write!(f, "{} = {} {} {} to {}", dest, op, from, value, to),
            Instruction::Gep { dest, base, offset } => write!(
                f,
                "{} = getelementptr inbounds i8, ptr {}, i64 {}",
                dest, base, offset
            ),
            Instruction::Call {
                dest,
                return_type,
                signature,
                callee,
                args,
            } => {
                if let Some(dest) = dest {
                    write!(f, "{} = ", dest)?;
                }
                match signature {
                    Some(signature) => write!(f, "call {} @{}(", signature, callee)?,
                    None => write!(f, "call {} @{}(", return_type, callee)?,
                }
                for (i, (ty, arg)) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{} {}", ty, arg)?;
                }
                write!(f, ")")
            }
            Instruction::Phi { dest, ty, incoming } => {
                write!(f, "{} = phi {} ", dest, ty)?;
                for (i, (value, label)) in incoming.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "[ {}, %{} ]", value, label)?;
                }
                Ok(())
            }
        }
    }
}

/// The single control transfer that ends a basic block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Terminator {
    Br(String),
    CondBr {
        cond: Operand,
        then_label: String,
        else_label: String,
    },
    Switch {
        ty: IrType,
        value: Operand,
        default: String,
        cases: Vec<(i64, String)>,
    },
    Ret(Option<(IrType, Operand)>),
}

impl fmt::Display for Terminator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Terminator::Br(label) => write!(f, "br label %{}", label),
            Terminator::CondBr {
                cond,
                then_label,
                else_label,
            } => write!(
                f,
                "br i1 {}, label %{}, label %{}",
                cond, then_label, else_label
            ),
            Terminator::Switch {
                ty,
                value,
                default,
                cases,
            } => {
                writeln!(f, "switch {} {}, label %{} [", ty, value, default)?;
                for (constant, label) in cases {
                    writeln!(f, "    {} {}, label %{}", ty, constant, label)?;
                }
                write!(f, "  ]")
            }
            Terminator::Ret(None) => write!(f, "ret void"),
            Terminator::Ret(Some((ty, value))) => write!(f, "ret {} {}", ty, value),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicBlock {
    pub label: String,
    pub instructions: Vec<Instruction>,
    pub terminator: Option<Terminator>,
}

impl BasicBlock {
    pub fn new(label: impl Into<String>) -> Self {
        BasicBlock {
            label: label.into(),
            instructions: Vec::new(),
            terminator: None,
        }
    }

    pub fn is_terminated(&self) -> bool {
        self.terminator.is_some()
    }
}

impl fmt::Display for BasicBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}:", self.label)?;
        for instruction in &self.instructions {
            writeln!(f, "  {}", instruction)?;
        }
        match &self.terminator {
            Some(terminator) => writeln!(f, "  {}", terminator),
            None => writeln!(f, "  unreachable"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
    pub name: String,
    pub return_type: IrType,
    /// Parameter types and their `%arg.N` names.
    pub params: Vec<(IrType, String)>,
    pub blocks: Vec<BasicBlock>,
}

impl Function {
    pub fn block(&self, label: &str) -> Option<&BasicBlock> {
        self.blocks.iter().find(|b| b.label == label)
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "define {} @{}(", self.return_type, self.name)?;
        for (i, (ty, name)) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{} %{}", ty, name)?;
        }
        writeln!(f, ") {{")?;
        for (i, block) in self.blocks.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", block)?;
        }
        writeln!(f, "}}")
    }
}

/// External function, rendered as a `declare` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub name: String,
    pub return_type: IrType,
    pub params: Vec<IrType>,
    pub variadic: bool,
}

/// `RET (PARAMS...)` as written in `call` instructions of variadic callees.
pub fn function_type(return_type: &IrType, params: &[IrType], variadic: bool) -> String {
    let mut list: Vec<String> = params.iter().map(|p| p.to_string()).collect();
    if variadic {
        list.push("...".to_string());
    }
    format!("{} ({})", return_type, list.join(", "))
}

impl fmt::Display for Declaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut list: Vec<String> = self.params.iter().map(|p| p.to_string()).collect();
        if self.variadic {
            list.push("...".to_string());
        }
        writeln!(
            f,
            "declare {} @{}({})",
            self.return_type,
            self.name,
            list.join(", ")
        )
    }
}

/// Typed constant used in global initializers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constant {
    Int(i64),
    Null,
    /// `zeroinitializer`, valid for every type.
    Zero,
    /// `c"..."` bytes of a char array, already padded to its length.
    Bytes(Vec<u8>),
    /// Address of a global or string constant.
    Global(String),
    /// Byte offset into a global, as a constant `getelementptr`.
    GlobalOffset(String, i64),
    Array(Vec<(IrType, Constant)>),
    Struct(Vec<(IrType, Constant)>),
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Int(value) => write!(f, "{}", value),
            Constant::Null => write!(f, "null"),
            Constant::Zero => write!(f, "zeroinitializer"),
            Constant::Bytes(bytes) => write!(f, "c\"{}\"", escape_bytes(bytes)),
            Constant::Global(name) => write!(f, "@{}", name),
            Constant::GlobalOffset(name, offset) => {
                write!(f, "getelementptr inbounds (i8, ptr @{}, i64 {})", name, offset)
            }
            Constant::Array(elements) => {
                write!(f, "[")?;
                write_elements(f, elements)?;
                write!(f, "]")
            }
            Constant::Struct(elements) => {
                write!(f, "<{{ ")?;
                write_elements(f, elements)?;
                write!(f, " }}>")
            }
        }
    }
}

fn write_elements(f: &mut fmt::Formatter<'_>, elements: &[(IrType, Constant)]) -> fmt::Result {
    for (i, (ty, value)) in elements.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{} {}", ty, value)?;
    }
    Ok(())
}

/// Escape bytes for a `c"..."` literal: printable ASCII other than `"` and
/// `\` is kept, everything else becomes `\XX`.
pub fn escape_bytes(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for &b in bytes {
        if (0x20..0x7f).contains(&b) && b != b'"' && b != b'\\' {
            out.push(b as char);
        } else {
            out.push_str(&format!("\\{:02X}", b));
        }
    }
    out
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Global {
    pub name: String,
    pub ty: IrType,
    /// `None` for an `external global`.
    pub init: Option<Constant>,
    pub align: usize,
}

impl fmt::Display for Global {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.init {
            Some(init) => writeln!(
                f,
                "@{} = global {} {}, align {}",
                self.name, self.ty, init, self.align
            ),
            None => writeln!(
                f,
                "@{} = external global {}, align {}",
                self.name, self.ty, self.align
            ),
        }
    }
}

/// Interned string literal `@.str.N`; `bytes` excludes the terminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringConstant {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl fmt::Display for StringConstant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut bytes = self.bytes.clone();
        bytes.push(0);
        writeln!(
            f,
            "@{} = private unnamed_addr constant [{} x i8] c\"{}\", align 1",
            self.name,
            bytes.len(),
            escape_bytes(&bytes)
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Module {
    pub name: String,
    /// Named struct types with their packed element lists.
    pub struct_types: Vec<(String, Vec<IrType>)>,
    pub strings: Vec<StringConstant>,
    pub globals: Vec<Global>,
    pub declarations: Vec<Declaration>,
    pub functions: Vec<Function>,
}

impl Module {
    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name == name)
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "; ModuleID = '{}'", self.name)?;
        writeln!(f, "source_filename = \"{}\"", self.name)?;

        if !self.struct_types.is_empty() {
            writeln!(f)?;
        }
        for (name, elements) in &self.struct_types {
            let list: Vec<String> = elements.iter().map(|e| e.to_string()).collect();
            if list.is_empty() {
                writeln!(f, "%struct.{} = type <{{}}>", name)?;
            } else {
                writeln!(f, "%struct.{} = type <{{ {} }}>", name, list.join(", "))?;
            }
        }

        if !self.strings.is_empty() || !self.globals.is_empty() {
            writeln!(f)?;
        }
        for string in &self.strings {
            write!(f, "{}", string)?;
        }
        for global in &self.globals {
            write!(f, "{}", global)?;
        }

        if !self.declarations.is_empty() {
            writeln!(f)?;
        }
        for declaration in &self.declarations {
            write!(f, "{}", declaration)?;
        }

        for function in &self.functions {
            writeln!(f)?;
            write!(f, "{}", function)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_types_render() {
        assert_eq!(IrType::Array(Box::new(IrType::I32), 4).to_string(), "[4 x i32]");
        assert_eq!(IrType::Struct("point".into()).to_string(), "%struct.point");
        assert_eq!(IrType::Ptr.to_string(), "ptr");
    }

    #[test]
    fn test_escape_bytes() {
        assert_eq!(escape_bytes(b"hi\n\0"), "hi\\0A\\00");
        assert_eq!(escape_bytes(b"\"q\\"), "\\22q\\5C");
    }

    #[test]
    fn test_variadic_call_spells_function_type() {
        let call = Instruction::Call {
            dest: Some(Operand::Reg(3)),
            return_type: IrType::I32,
            signature: Some(function_type(&IrType::I32, &[IrType::Ptr], true)),
            callee: "printf".into(),
            args: vec![(IrType::Ptr, Operand::Global(".str.0".into())), (IrType::I32, Operand::Const(9))],
        };
        assert_eq!(
            call.to_string(),
            "%r3 = call i32 (ptr, ...) @printf(ptr @.str.0, i32 9)"
        );
    }

    #[test]
    fn test_switch_renders_cases() {
        let switch = Terminator::Switch {
            ty: IrType::I32,
            value: Operand::Reg(0),
            default: "switch.end.3".into(),
            cases: vec![(0, "switch.case.1".into()), (1, "switch.case.2".into())],
        };
        let text = switch.to_string();
        assert!(text.starts_with("switch i32 %r0, label %switch.end.3 ["));
        assert!(text.contains("i32 1, label %switch.case.2"));
    }

    #[test]
    fn test_global_struct_constant() {
        let global = Global {
            name: "g".into(),
            ty: IrType::Struct("s".into()),
            init: Some(Constant::Struct(vec![
                (IrType::I8, Constant::Int(1)),
                (IrType::Array(Box::new(IrType::I8), 3), Constant::Zero),
                (IrType::I32, Constant::Int(2)),
            ])),
            align: 4,
        };
        assert_eq!(
            global.to_string(),
            "@g = global %struct.s <{ i8 1, [3 x i8] zeroinitializer, i32 2 }>, align 4\n"
        );
    }

    #[test]
    fn test_declaration() {
        let decl = Declaration {
            name: "puts".into(),
            return_type: IrType::I32,
            params: vec![IrType::Ptr],
            variadic: false,
        };
        assert_eq!(decl.to_string(), "declare i32 @puts(ptr)\n");
    }
}
