//! Basic block construction for one function

use super::ir::{BasicBlock, Instruction, IrType, Operand, Terminator};

/// Appends instructions to the current block of a function under
/// construction.
///
/// Once a block has its terminator, nothing more is appended to it: a
/// further instruction opens a fresh `dead.N` block, and a further
/// terminator is dropped. Slot allocations are collected separately and
/// placed at the top of `entry` by [`FunctionBuilder::finish`].
#[derive(Debug)]
pub(crate) struct FunctionBuilder {
    blocks: Vec<BasicBlock>,
    current: usize,
    allocas: Vec<Instruction>,
    next_reg: usize,
    next_label: usize,
}

impl FunctionBuilder {
    pub(crate) fn new() -> Self {
        FunctionBuilder {
            blocks: vec![BasicBlock::new("entry")],
            current: 0,
            allocas: Vec::new(),
            next_reg: 0,
            next_label: 0,
        }
    }

    pub(crate) fn fresh_reg(&mut self) -> Operand {
        let reg = Operand::Reg(self.next_reg);
        self.next_reg += 1;
        reg
    }

    /// Reserve a label `<construct>.<N>`; the block is created by
    /// [`FunctionBuilder::start_block`].
    pub(crate) fn new_label(&mut self, construct: &str) -> String {
        let label = format!("{}.{}", construct, self.next_label);
        self.next_label += 1;
        label
    }

    /// Make `label` the current block. The previous block falls through to
    /// it if it was left open.
    pub(crate) fn start_block(&mut self, label: String) {
        self.terminate(Terminator::Br(label.clone()));
        self.blocks.push(BasicBlock::new(label));
        self.current = self.blocks.len() - 1;
    }

    pub(crate) fn current_label(&self) -> &str {
        &self.blocks[self.current].label
    }

    pub(crate) fn is_terminated(&self) -> bool {
        self.blocks[self.current].is_terminated()
    }

    pub(crate) fn emit(&mut self, instruction: Instruction) {
        if self.is_terminated() {
            let label = self.new_label("dead");
            self.blocks.push(BasicBlock::new(label));
            self.current = self.blocks.len() - 1;
        }
        self.blocks[self.current].instructions.push(instruction);
    }

    /// Emit an instruction producing a fresh register and return it.
    pub(crate) fn emit_value(&mut self, make: impl FnOnce(Operand) -> Instruction) -> Operand {
        let dest = self.fresh_reg();
        self.emit(make(dest.clone()));
        dest
    }

    pub(crate) fn terminate(&mut self, terminator: Terminator) {
        let block = &mut self.blocks[self.current];
        if block.terminator.is_none() {
            block.terminator = Some(terminator);
        }
    }

    pub(crate) fn alloca(&mut self, name: String, ty: IrType, align: usize) -> Operand {
        let dest = Operand::Local(name);
        self.allocas.push(Instruction::Alloca {
            dest: dest.clone(),
            ty,
            align,
        });
        dest
    }

    /// Close every open block with `fallback` and return the blocks, slot
    /// allocations first.
    pub(crate) fn finish(mut self, fallback: Terminator) -> Vec<BasicBlock> {
        for block in self.blocks.iter_mut() {
            if block.terminator.is_none() {
                block.terminator = Some(fallback.clone());
            }
        }
        let entry = &mut self.blocks[0];
        let body = std::mem::take(&mut entry.instructions);
        entry.instructions = self.allocas;
        entry.instructions.extend(body);
        self.blocks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_and_registers_are_monotonic() {
        let mut builder = FunctionBuilder::new();
        assert_eq!(builder.new_label("if.then"), "if.then.0");
        assert_eq!(builder.new_label("if.end"), "if.end.1");
        assert_eq!(builder.fresh_reg(), Operand::Reg(0));
        assert_eq!(builder.fresh_reg(), Operand::Reg(1));
    }

    #[test]
    fn test_no_instruction_after_terminator() {
        let mut builder = FunctionBuilder::new();
        builder.terminate(Terminator::Ret(None));
        builder.terminate(Terminator::Br("x.0".into()));
        builder.emit(Instruction::Store {
            ty: IrType::I32,
            value: Operand::Const(1),
            ptr: Operand::Local("a.addr0".into()),
        });

        let blocks = builder.finish(Terminator::Ret(None));
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].terminator, Some(Terminator::Ret(None)));
        assert!(blocks[0].instructions.is_empty());
        assert_eq!(blocks[1].label, "dead.0");
        assert!(blocks.iter().all(|b| b.is_terminated()));
    }

    #[test]
    fn test_allocas_lead_entry() {
        let mut builder = FunctionBuilder::new();
        builder.emit(Instruction::Store {
            ty: IrType::I32,
            value: Operand::Const(1),
            ptr: Operand::Local("a.addr0".into()),
        });
        builder.alloca("a.addr0".into(), IrType::I32, 4);

        let blocks = builder.finish(Terminator::Ret(None));
        assert!(matches!(blocks[0].instructions[0], Instruction::Alloca { .. }));
    }

    #[test]
    fn test_start_block_falls_through() {
        let mut builder = FunctionBuilder::new();
        let label = builder.new_label("while.cond");
        builder.start_block(label.clone());
        assert_eq!(builder.current_label(), "while.cond.0");

        let blocks = builder.finish(Terminator::Ret(None));
        assert_eq!(blocks[0].terminator, Some(Terminator::Br(label)));
    }
}
