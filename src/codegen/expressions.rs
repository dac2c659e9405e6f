//! Expression lowering
//!
//! `gen_value` yields an expression's value as an operand of its IR type,
//! `gen_address` the address of an lvalue, and `gen_condition` an `i1` for
//! branching. Comparisons and `&&`/`||` produce `i1` directly and are only
//! widened to `int` when used as values.

use super::errors::CodegenError;
use super::function::FunctionGenerator;
use super::ir::{self, BinaryOp, CastOp, Instruction, IrType, Operand, Predicate, Terminator};
use super::{ir_type, zero_of};
use crate::memory::element_size;
use crate::parser::ast::*;
use crate::types::{IntType, Type};

fn int_of(ty: &Type, location: SourceLocation) -> Result<IntType, CodegenError> {
    ty.int_type()
        .ok_or_else(|| CodegenError::internal(format!("expected an integer type, found '{}'", ty), location))
}

/// Integer constant of type `it`, rendered in its signed form.
fn constant(value: i64, it: IntType) -> Operand {
    Operand::Const(IntType::signed(it.bits).wrap(value))
}

fn arithmetic(op: BinOp, signed: bool) -> Option<BinaryOp> {
    let op = match op {
        BinOp::Add => BinaryOp::Add,
        BinOp::Sub => BinaryOp::Sub,
        BinOp::Mul => BinaryOp::Mul,
        BinOp::Div if signed => BinaryOp::SDiv,
        BinOp::Div => BinaryOp::UDiv,
        BinOp::Mod if signed => BinaryOp::SRem,
        BinOp::Mod => BinaryOp::URem,
        BinOp::BitAnd => BinaryOp::And,
        BinOp::BitOr => BinaryOp::Or,
        BinOp::BitXor => BinaryOp::Xor,
        BinOp::BitShl => BinaryOp::Shl,
        BinOp::BitShr if signed => BinaryOp::AShr,
        BinOp::BitShr => BinaryOp::LShr,
        _ => return None,
    };
    Some(op)
}

fn predicate(op: BinOp, signed: bool) -> Option<Predicate> {
    let pred = match op {
        BinOp::Eq => Predicate::Eq,
        BinOp::Ne => Predicate::Ne,
        BinOp::Lt if signed => Predicate::Slt,
        BinOp::Le if signed => Predicate::Sle,
        BinOp::Gt if signed => Predicate::Sgt,
        BinOp::Ge if signed => Predicate::Sge,
        BinOp::Lt => Predicate::Ult,
        BinOp::Le => Predicate::Ule,
        BinOp::Gt => Predicate::Ugt,
        BinOp::Ge => Predicate::Uge,
        _ => return None,
    };
    Some(pred)
}

/// Whether `expr` is lowered as an `i1` condition first.
fn is_boolean(expr: &Expr) -> bool {
    match &expr.kind {
        ExprKind::BinaryOp { op, .. } => op.is_comparison() || op.is_logical(),
        ExprKind::UnaryOp { op: UnOp::Not, .. } => true,
        _ => false,
    }
}

impl FunctionGenerator<'_> {
    pub(super) fn load(&mut self, ty: &Type, ptr: Operand) -> Operand {
        let ty = ir_type(ty);
        self.builder.emit_value(|dest| Instruction::Load { dest, ty, ptr })
    }

    pub(super) fn store(&mut self, ty: &Type, value: Operand, ptr: Operand) {
        self.builder.emit(Instruction::Store {
            ty: ir_type(ty),
            value,
            ptr,
        });
    }

    /// `base + offset` bytes.
    pub(super) fn offset(&mut self, base: Operand, offset: Operand) -> Operand {
        if offset == Operand::Const(0) {
            return base;
        }
        self.builder
            .emit_value(|dest| Instruction::Gep { dest, base, offset })
    }

    /// `index * size` as an `i64` byte offset.
    fn scale(&mut self, index: Operand, size: usize) -> Operand {
        match index {
            Operand::Const(n) => Operand::Const(n.wrapping_mul(size as i64)),
            index if size == 1 => index,
            index => self.builder.emit_value(|dest| Instruction::Binary {
                dest,
                op: BinaryOp::Mul,
                ty: IrType::I64,
                lhs: index,
                rhs: Operand::Const(size as i64),
            }),
        }
    }

    fn negate(&mut self, offset: Operand) -> Operand {
        match offset {
            Operand::Const(n) => Operand::Const(n.wrapping_neg()),
            offset => self.builder.emit_value(|dest| Instruction::Binary {
                dest,
                op: BinaryOp::Sub,
                ty: IrType::I64,
                lhs: Operand::Const(0),
                rhs: offset,
            }),
        }
    }

    /// Step `pointer` by `index` elements of `pointee`, backwards for `Sub`.
    fn pointer_step(
        &mut self,
        pointer: Operand,
        index: Operand,
        pointee: &Type,
        op: BinOp,
    ) -> Operand {
        let size = element_size(pointee, self.layouts());
        let mut offset = self.scale(index, size);
        if op == BinOp::Sub {
            offset = self.negate(offset);
        }
        self.offset(pointer, offset)
    }

    fn integer_op(&mut self, op: BinOp, it: IntType, lhs: Operand, rhs: Operand, location: SourceLocation) -> Result<Operand, CodegenError> {
        let op = arithmetic(op, it.signed)
            .ok_or_else(|| CodegenError::internal(format!("'{}' is not an arithmetic operator", op), location))?;
        Ok(self.builder.emit_value(|dest| Instruction::Binary {
            dest,
            op,
            ty: IrType::Int(it.bits),
            lhs,
            rhs,
        }))
    }

    /// Convert `value` from `from` to `to`.
    pub(super) fn convert(
        &mut self,
        value: Operand,
        from: &Type,
        to: &Type,
        location: SourceLocation,
    ) -> Result<Operand, CodegenError> {
        if to.is_void() {
            return Ok(Operand::Zero);
        }
        let cast = match (from.int_type(), to.int_type()) {
            (Some(f), Some(t)) => {
                if let Operand::Const(c) = value {
                    return Ok(constant(f.wrap(c), t));
                }
                if f.bits == t.bits {
                    return Ok(value);
                }
                let op = if t.bits < f.bits {
                    CastOp::Trunc
                } else if f.signed {
                    CastOp::SExt
                } else {
                    CastOp::ZExt
                };
                (op, IrType::Int(f.bits), IrType::Int(t.bits))
            }
            (Some(f), None) if to.is_pointer() => {
                if matches!(value, Operand::Const(c) if f.wrap(c) == 0) {
                    return Ok(Operand::Null);
                }
                (CastOp::IntToPtr, IrType::Int(f.bits), IrType::Ptr)
            }
            (None, Some(t)) if from.is_pointer() => (CastOp::PtrToInt, IrType::Ptr, IrType::Int(t.bits)),
            (None, None) if from.is_pointer() == to.is_pointer() => return Ok(value),
            _ => {
                return Err(CodegenError::internal(
                    format!("cannot convert '{}' to '{}'", from, to),
                    location,
                ))
            }
        };
        let (op, from, to) = cast;
        Ok(self.builder.emit_value(|dest| Instruction::Cast {
            dest,
            op,
            from,
            value,
            to,
        }))
    }

    pub(super) fn gen_value(&mut self, expr: &Expr) -> Result<Operand, CodegenError> {
        let location = expr.location;
        if is_boolean(expr) {
            let cond = self.gen_condition(expr)?;
            return Ok(self.builder.emit_value(|dest| Instruction::Cast {
                dest,
                op: CastOp::ZExt,
                from: IrType::I1,
                value: cond,
                to: ir_type(expr.ty()),
            }));
        }

        match &expr.kind {
            ExprKind::IntLiteral(n) => Ok(match expr.ty().int_type() {
                Some(it) => constant(*n, it),
                None => Operand::Const(*n),
            }),
            ExprKind::CharLiteral(c) => Ok(Operand::Const(*c as i64)),
            ExprKind::Variable {
                binding: Some(Binding::EnumConstant(value)),
                ..
            } => Ok(Operand::Const(*value)),
            ExprKind::StringLiteral(_)
            | ExprKind::Variable { .. }
            | ExprKind::ArrayAccess { .. }
            | ExprKind::MemberAccess { .. }
            | ExprKind::PointerMemberAccess { .. }
            | ExprKind::UnaryOp {
                op: UnOp::Deref, ..
            } => {
                let addr = self.gen_address(expr)?;
                Ok(self.load(expr.ty(), addr))
            }
            ExprKind::UnaryOp { op, operand } => self.gen_unary(*op, operand, expr.ty(), location),
            ExprKind::BinaryOp { op, left, right } => self.gen_binary(*op, left, right, expr.ty(), location),
            ExprKind::Assignment { lhs, rhs } => {
                let addr = self.gen_address(lhs)?;
                let value = self.gen_value(rhs)?;
                self.store(lhs.ty(), value.clone(), addr);
                Ok(value)
            }
            ExprKind::CompoundAssignment { op, lhs, rhs } => self.gen_compound(*op, lhs, rhs, location),
            ExprKind::TernaryOp {
                condition,
                true_expr,
                false_expr,
            } => self.gen_ternary(condition, true_expr, false_expr, expr.ty()),
            ExprKind::FunctionCall { name, args } => self.gen_call(name, args, location),
            ExprKind::Cast { expr: inner, .. } | ExprKind::ImplicitCast(inner) => {
                let value = self.gen_value(inner)?;
                self.convert(value, inner.ty(), expr.ty(), location)
            }
            ExprKind::Decay(inner) => self.gen_address(inner),
            ExprKind::SizeofType(_) | ExprKind::SizeofExpr(_) => {
                Err(CodegenError::internal("'sizeof' was not folded", location))
            }
        }
    }

    /// Address of an lvalue. Aggregate rvalues (a struct returned by a
    /// call, say) are spilled to a temporary slot first.
    pub(super) fn gen_address(&mut self, expr: &Expr) -> Result<Operand, CodegenError> {
        let location = expr.location;
        match &expr.kind {
            ExprKind::Variable {
                binding: Some(Binding::Local(slot)),
                ..
            } => self.slot_addr(*slot, location),
            ExprKind::Variable {
                binding: Some(Binding::Global(name)),
                ..
            } => Ok(Operand::Global(name.clone())),
            ExprKind::StringLiteral(bytes) => Ok(Operand::Global(self.strings.intern(bytes))),
            ExprKind::UnaryOp {
                op: UnOp::Deref,
                operand,
            } => self.gen_value(operand),
            ExprKind::ArrayAccess { array, index } => {
                let base = self.gen_value(array)?;
                let index = self.gen_value(index)?;
                Ok(self.pointer_step(base, index, expr.ty(), BinOp::Add))
            }
            ExprKind::MemberAccess { object, member } => {
                let base = self.gen_address(object)?;
                self.field_address(base, object.ty(), member, location)
            }
            ExprKind::PointerMemberAccess { object, member } => {
                let base = self.gen_value(object)?;
                let pointee = object.ty().pointee().cloned().unwrap_or(Type::Void);
                self.field_address(base, &pointee, member, location)
            }
            _ if matches!(expr.ty(), Type::Struct(_) | Type::Array(..)) => {
                let value = self.gen_value(expr)?;
                Ok(self.spill(expr.ty(), value))
            }
            _ => Err(CodegenError::internal("expression has no address", location)),
        }
    }

    fn field_address(
        &mut self,
        base: Operand,
        object: &Type,
        member: &str,
        location: SourceLocation,
    ) -> Result<Operand, CodegenError> {
        let offset = match object {
            Type::Struct(tag) => self
                .layouts()
                .get(tag)
                .and_then(|layout| layout.field(member))
                .map(|field| field.offset),
            _ => None,
        }
        .ok_or_else(|| {
            CodegenError::internal(format!("no field '{}' in '{}'", member, object), location)
        })?;
        Ok(self.offset(base, Operand::Const(offset as i64)))
    }

    /// Lower `expr` to an `i1`.
    pub(super) fn gen_condition(&mut self, expr: &Expr) -> Result<Operand, CodegenError> {
        match &expr.kind {
            ExprKind::BinaryOp { op, left, right } if op.is_comparison() => {
                let lhs = self.gen_value(left)?;
                let rhs = self.gen_value(right)?;
                let operands = left.ty();
                let signed = operands.int_type().is_some_and(|it| it.signed);
                let pred = predicate(*op, signed).ok_or_else(|| {
                    CodegenError::internal(format!("'{}' is not a comparison", op), expr.location)
                })?;
                let ty = ir_type(operands);
                Ok(self.builder.emit_value(|dest| Instruction::ICmp {
                    dest,
                    pred,
                    ty,
                    lhs,
                    rhs,
                }))
            }
            ExprKind::BinaryOp { op, left, right } if op.is_logical() => {
                self.gen_logical(*op, left, right)
            }
            ExprKind::UnaryOp {
                op: UnOp::Not,
                operand,
            } => {
                let cond = self.gen_condition(operand)?;
                Ok(self.builder.emit_value(|dest| Instruction::Binary {
                    dest,
                    op: BinaryOp::Xor,
                    ty: IrType::I1,
                    lhs: cond,
                    rhs: Operand::Bool(true),
                }))
            }
            _ => {
                let value = self.gen_value(expr)?;
                let ty = ir_type(expr.ty());
                let zero = zero_of(&ty);
                Ok(self.builder.emit_value(|dest| Instruction::ICmp {
                    dest,
                    pred: Predicate::Ne,
                    ty,
                    lhs: value,
                    rhs: zero,
                }))
            }
        }
    }

    /// Short-circuit `&&`/`||`: the right side runs in its own block and an
    /// `i1` phi merges the two outcomes.
    fn gen_logical(&mut self, op: BinOp, left: &Expr, right: &Expr) -> Result<Operand, CodegenError> {
        let is_and = op == BinOp::And;
        let lhs = self.gen_condition(left)?;
        let lhs_block = self.builder.current_label().to_string();

        let prefix = if is_and { "land" } else { "lor" };
        let rhs_label = self.builder.new_label(&format!("{}.rhs", prefix));
        let end_label = self.builder.new_label(&format!("{}.end", prefix));
        let (then_label, else_label) = if is_and {
            (rhs_label.clone(), end_label.clone())
        } else {
            (end_label.clone(), rhs_label.clone())
        };
        self.builder.terminate(Terminator::CondBr {
            cond: lhs,
            then_label,
            else_label,
        });

        self.builder.start_block(rhs_label);
        let rhs = self.gen_condition(right)?;
        let rhs_block = self.builder.current_label().to_string();
        self.builder.start_block(end_label);

        Ok(self.builder.emit_value(|dest| Instruction::Phi {
            dest,
            ty: IrType::I1,
            incoming: vec![(Operand::Bool(!is_and), lhs_block), (rhs, rhs_block)],
        }))
    }

    fn gen_ternary(
        &mut self,
        condition: &Expr,
        true_expr: &Expr,
        false_expr: &Expr,
        ty: &Type,
    ) -> Result<Operand, CodegenError> {
        let cond = self.gen_condition(condition)?;
        let true_label = self.builder.new_label("cond.true");
        let false_label = self.builder.new_label("cond.false");
        let end_label = self.builder.new_label("cond.end");
        self.builder.terminate(Terminator::CondBr {
            cond,
            then_label: true_label.clone(),
            else_label: false_label.clone(),
        });

        self.builder.start_block(true_label);
        let true_value = self.gen_value(true_expr)?;
        let true_block = self.builder.current_label().to_string();
        self.builder.terminate(Terminator::Br(end_label.clone()));

        self.builder.start_block(false_label);
        let false_value = self.gen_value(false_expr)?;
        let false_block = self.builder.current_label().to_string();
        self.builder.start_block(end_label);

        if ty.is_void() {
            return Ok(Operand::Zero);
        }
        let ty = ir_type(ty);
        Ok(self.builder.emit_value(|dest| Instruction::Phi {
            dest,
            ty,
            incoming: vec![(true_value, true_block), (false_value, false_block)],
        }))
    }

    fn gen_unary(
        &mut self,
        op: UnOp,
        operand: &Expr,
        ty: &Type,
        location: SourceLocation,
    ) -> Result<Operand, CodegenError> {
        match op {
            UnOp::Neg | UnOp::BitNot => {
                let it = int_of(ty, location)?;
                let value = self.gen_value(operand)?;
                if let Operand::Const(c) = value {
                    let folded = if op == UnOp::Neg { c.wrapping_neg() } else { !c };
                    return Ok(constant(folded, it));
                }
                let (op, lhs, rhs) = if op == UnOp::Neg {
                    (BinaryOp::Sub, Operand::Const(0), value)
                } else {
                    (BinaryOp::Xor, value, Operand::Const(-1))
                };
                Ok(self.builder.emit_value(|dest| Instruction::Binary {
                    dest,
                    op,
                    ty: IrType::Int(it.bits),
                    lhs,
                    rhs,
                }))
            }
            UnOp::AddrOf => self.gen_address(operand),
            UnOp::PreInc | UnOp::PreDec | UnOp::PostInc | UnOp::PostDec => {
                let addr = self.gen_address(operand)?;
                let old = self.load(ty, addr.clone());
                let step = if matches!(op, UnOp::PreInc | UnOp::PostInc) {
                    BinOp::Add
                } else {
                    BinOp::Sub
                };
                let new = match ty.pointee() {
                    Some(pointee) => {
                        let pointee = pointee.clone();
                        self.pointer_step(old.clone(), Operand::Const(1), &pointee, step)
                    }
                    None => {
                        let it = int_of(ty, location)?;
                        self.integer_op(step, it, old.clone(), Operand::Const(1), location)?
                    }
                };
                self.store(ty, new.clone(), addr);
                Ok(if matches!(op, UnOp::PreInc | UnOp::PreDec) {
                    new
                } else {
                    old
                })
            }
            // Handled as a condition or an lvalue
            UnOp::Not | UnOp::Deref => Err(CodegenError::internal(
                format!("unexpected unary '{}'", op),
                location,
            )),
        }
    }

    fn gen_binary(
        &mut self,
        op: BinOp,
        left: &Expr,
        right: &Expr,
        ty: &Type,
        location: SourceLocation,
    ) -> Result<Operand, CodegenError> {
        let (lt, rt) = (left.ty(), right.ty());
        match op {
            BinOp::Add | BinOp::Sub if lt.is_pointer() && rt.is_integer() => {
                let base = self.gen_value(left)?;
                let index = self.gen_value(right)?;
                let pointee = lt.pointee().cloned().unwrap_or(Type::Void);
                Ok(self.pointer_step(base, index, &pointee, op))
            }
            BinOp::Add if lt.is_integer() && rt.is_pointer() => {
                let index = self.gen_value(left)?;
                let base = self.gen_value(right)?;
                let pointee = rt.pointee().cloned().unwrap_or(Type::Void);
                Ok(self.pointer_step(base, index, &pointee, op))
            }
            BinOp::Sub if lt.is_pointer() && rt.is_pointer() => {
                let lhs = self.gen_value(left)?;
                let rhs = self.gen_value(right)?;
                let lhs = self.convert(lhs, lt, &Type::LONG, location)?;
                let rhs = self.convert(rhs, rt, &Type::LONG, location)?;
                let bytes = self.integer_op(BinOp::Sub, IntType::LONG, lhs, rhs, location)?;
                let size = lt.pointee().map_or(1, |p| element_size(p, self.layouts()));
                if size == 1 {
                    return Ok(bytes);
                }
                self.integer_op(BinOp::Div, IntType::LONG, bytes, Operand::Const(size as i64), location)
            }
            _ => {
                let it = int_of(ty, location)?;
                let lhs = self.gen_value(left)?;
                let rhs = self.gen_value(right)?;
                self.integer_op(op, it, lhs, rhs, location)
            }
        }
    }

    /// `lhs op= rhs`: the operation runs in the type of `rhs`, which the
    /// resolver set to the common type, and the result is converted back.
    fn gen_compound(
        &mut self,
        op: BinOp,
        lhs: &Expr,
        rhs: &Expr,
        location: SourceLocation,
    ) -> Result<Operand, CodegenError> {
        let target = lhs.ty();
        let addr = self.gen_address(lhs)?;
        let old = self.load(target, addr.clone());

        let new = match target.pointee() {
            Some(pointee) => {
                let pointee = pointee.clone();
                let index = self.gen_value(rhs)?;
                self.pointer_step(old, index, &pointee, op)
            }
            None => {
                let common = rhs.ty();
                let widened = self.convert(old, target, common, location)?;
                let value = self.gen_value(rhs)?;
                let it = int_of(common, location)?;
                let result = self.integer_op(op, it, widened, value, location)?;
                self.convert(result, common, target, location)?
            }
        };
        self.store(target, new.clone(), addr);
        Ok(new)
    }

    fn gen_call(&mut self, name: &str, args: &[Expr], location: SourceLocation) -> Result<Operand, CodegenError> {
        let resolution = self.resolution;
        let info = resolution
            .function(name)
            .ok_or_else(|| CodegenError::internal(format!("unknown function '{}'", name), location))?;

        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            let value = self.gen_value(arg)?;
            values.push((ir_type(arg.ty()), value));
        }

        let return_type = ir_type(&info.signature.return_type);
        let signature = info.signature.variadic.then(|| {
            let params: Vec<IrType> = info.signature.params.iter().map(ir_type).collect();
            ir::function_type(&return_type, &params, true)
        });
        let dest = (return_type != IrType::Void).then(|| self.builder.fresh_reg());
        self.builder.emit(Instruction::Call {
            dest: dest.clone(),
            return_type,
            signature,
            callee: name.to_string(),
            args: values,
        });
        Ok(dest.unwrap_or(Operand::Zero))
    }
}
