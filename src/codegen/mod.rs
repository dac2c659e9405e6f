//! LLVM IR generation
//!
//! Turns a resolved [`Program`] into an [`ir::Module`]:
//! - [`ir`]: the IR model and its textual rendering
//! - `builder`: basic block bookkeeping for one function
//! - `function`: per-function state, prologue and epilogue
//! - `expressions` / `statements`: lowering of the annotated tree
//! - `globals`: struct types, global data and the string pool
//!
//! # Lowering Model
//!
//! Every parameter and local lives in a stack slot allocated at the top of
//! `entry`; all reads and writes go through `load`/`store`. Pointers are
//! opaque `ptr` values and every address computation is a byte offset, so
//! struct field offsets and pointer scaling come straight from the
//! resolver's layouts.

mod builder;
pub mod errors;
mod expressions;
mod function;
mod globals;
pub mod ir;
mod statements;

pub use errors::CodegenError;

use crate::parser::ast::{Declaration, Program};
use crate::sema::Resolution;
use crate::types::Type;
use function::FunctionGenerator;
use globals::StringPool;
use ir::IrType;

/// IR type of a C type.
pub(crate) fn ir_type(ty: &Type) -> IrType {
    match ty {
        Type::Void => IrType::Void,
        Type::Char => IrType::I8,
        Type::Int(it) => IrType::Int(it.bits),
        Type::Enum(_) => IrType::I32,
        Type::Pointer(_) | Type::Function(_) => IrType::Ptr,
        Type::Array(element, len) => IrType::Array(Box::new(ir_type(element)), *len),
        Type::Struct(name) => IrType::Struct(name.clone()),
    }
}

/// Generate the module for a resolved program.
pub fn generate(
    program: &Program,
    resolution: &Resolution,
    module_name: &str,
) -> Result<ir::Module, CodegenError> {
    let mut strings = StringPool::default();
    let mut module = ir::Module {
        name: module_name.to_string(),
        struct_types: globals::struct_types(resolution),
        ..Default::default()
    };

    for global in &resolution.globals {
        module
            .globals
            .push(globals::global(global, &resolution.layouts, &mut strings));
    }

    for info in resolution.functions.iter().filter(|f| !f.defined) {
        module.declarations.push(globals::declaration(info));
    }

    for decl in &program.declarations {
        let Declaration::Function(def) = decl else {
            continue;
        };
        if def.body.is_none() {
            continue;
        }
        let function = FunctionGenerator::new(def, resolution, &mut strings)?.generate(def)?;
        tracing::trace!(
            function = %function.name,
            blocks = function.blocks.len(),
            "generated function"
        );
        module.functions.push(function);
    }

    module.strings = strings.into_constants();
    tracing::debug!(
        functions = module.functions.len(),
        declarations = module.declarations.len(),
        strings = module.strings.len(),
        "generated module"
    );
    Ok(module)
}

/// Zero value of `ty` as an operand.
pub(crate) fn zero_of(ty: &IrType) -> ir::Operand {
    match ty {
        IrType::Ptr => ir::Operand::Null,
        IrType::I1 => ir::Operand::Bool(false),
        IrType::Int(_) => ir::Operand::Const(0),
        _ => ir::Operand::Zero,
    }
}
