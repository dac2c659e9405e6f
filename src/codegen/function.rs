//! Per-function generation state

use super::builder::FunctionBuilder;
use super::errors::CodegenError;
use super::globals::StringPool;
use super::ir::{self, Instruction, IrType, Operand, Terminator};
use super::{ir_type, zero_of};
use crate::memory::alignof_type;
use crate::memory::layout::Layouts;
use crate::memory::slots::{SlotId, SlotTable};
use crate::parser::ast::{FunctionDef, SourceLocation};
use crate::sema::Resolution;
use crate::types::Type;

/// Where `break` and `continue` go inside one loop or switch.
#[derive(Debug, Clone)]
pub(super) struct JumpTargets {
    pub(super) break_label: String,
    /// `None` for a switch, which `continue` skips over.
    pub(super) continue_label: Option<String>,
}

/// Generates the body of one function.
pub(crate) struct FunctionGenerator<'a> {
    pub(super) resolution: &'a Resolution,
    pub(super) strings: &'a mut StringPool,
    pub(super) builder: FunctionBuilder,
    /// Slot addresses and object types, indexed by `SlotId`.
    slot_addrs: Vec<(Operand, Type)>,
    pub(super) jumps: Vec<JumpTargets>,
    return_type: Type,
    /// Counter for spill slots of aggregate temporaries.
    temps: usize,
}

impl<'a> FunctionGenerator<'a> {
    pub(crate) fn new(
        def: &FunctionDef,
        resolution: &'a Resolution,
        strings: &'a mut StringPool,
    ) -> Result<Self, CodegenError> {
        let info = resolution.function(&def.name).ok_or_else(|| {
            CodegenError::internal(format!("function '{}' was not resolved", def.name), def.location)
        })?;
        Ok(FunctionGenerator {
            resolution,
            strings,
            builder: FunctionBuilder::new(),
            slot_addrs: Vec::new(),
            jumps: Vec::new(),
            return_type: info.signature.return_type.clone(),
            temps: 0,
        })
    }

    pub(super) fn layouts(&self) -> &Layouts {
        &self.resolution.layouts
    }

    /// Lower the whole function: slots, parameter stores, body, and the
    /// fallback return closing any open block.
    pub(crate) fn generate(mut self, def: &FunctionDef) -> Result<ir::Function, CodegenError> {
        let resolution = self.resolution;
        let slots = resolution.slots.get(&def.name).ok_or_else(|| {
            CodegenError::internal(format!("no slots recorded for '{}'", def.name), def.location)
        })?;
        let params = self.prologue(slots);

        if let Some(body) = &def.body {
            for stmt in body {
                self.gen_stmt(stmt)?;
            }
        }

        let return_type = ir_type(&self.return_type);
        let fallback = match return_type {
            IrType::Void => Terminator::Ret(None),
            ref ty => Terminator::Ret(Some((ty.clone(), zero_of(ty)))),
        };
        Ok(ir::Function {
            name: def.name.clone(),
            return_type,
            params,
            blocks: self.builder.finish(fallback),
        })
    }

    /// Allocate every slot and store the incoming parameters into theirs.
    fn prologue(&mut self, slots: &SlotTable) -> Vec<(IrType, String)> {
        let mut params = Vec::new();
        for (id, slot) in slots.iter() {
            let ty = ir_type(&slot.ty);
            let align = alignof_type(&slot.ty, self.layouts());
            let addr = self
                .builder
                .alloca(format!("{}.addr{}", slot.name, id.0), ty.clone(), align);
            if slot.is_param {
                // `arg.N` never has the `NAME.addrN` shape of a slot
                let incoming = format!("arg.{}", id.0);
                self.builder.emit(Instruction::Store {
                    ty: ty.clone(),
                    value: Operand::Local(incoming.clone()),
                    ptr: addr.clone(),
                });
                params.push((ty, incoming));
            }
            self.slot_addrs.push((addr, slot.ty.clone()));
        }
        params
    }

    fn slot(&self, slot: SlotId, location: SourceLocation) -> Result<&(Operand, Type), CodegenError> {
        self.slot_addrs
            .get(slot.0)
            .ok_or_else(|| CodegenError::internal(format!("unknown slot {}", slot.0), location))
    }

    pub(super) fn slot_addr(&self, slot: SlotId, location: SourceLocation) -> Result<Operand, CodegenError> {
        self.slot(slot, location).map(|(addr, _)| addr.clone())
    }

    pub(super) fn slot_type(&self, slot: SlotId, location: SourceLocation) -> Result<Type, CodegenError> {
        self.slot(slot, location).map(|(_, ty)| ty.clone())
    }

    /// Stack slot for an aggregate value that has no address of its own.
    pub(super) fn spill(&mut self, ty: &Type, value: Operand) -> Operand {
        let ir_ty = ir_type(ty);
        let align = alignof_type(ty, self.layouts());
        let addr = self
            .builder
            .alloca(format!("spill.{}", self.temps), ir_ty.clone(), align);
        self.temps += 1;
        self.builder.emit(Instruction::Store {
            ty: ir_ty,
            value,
            ptr: addr.clone(),
        });
        addr
    }

    pub(super) fn return_type(&self) -> &Type {
        &self.return_type
    }
}
