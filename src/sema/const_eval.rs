//! Constant folding over resolved expressions
//!
//! Used for enum values, case labels, and global initializers. Arithmetic
//! happens in `i64` and is wrapped to each node's resolved integer type, so
//! folded values match what the generated code would compute.

use super::ConstValue;
use crate::memory::element_size;
use crate::memory::layout::Layouts;
use crate::parser::ast::{BinOp, Binding, Expr, ExprKind, UnOp};
use crate::types::{IntType, Type};

fn int_type(expr: &Expr) -> IntType {
    expr.ty().int_type().unwrap_or(IntType::LONG)
}

/// Value of an integer constant expression, or `None` if `expr` is not one.
pub fn eval(expr: &Expr) -> Option<i64> {
    let value = match &expr.kind {
        ExprKind::IntLiteral(n) => *n,
        ExprKind::CharLiteral(c) => *c as i64,
        ExprKind::Variable {
            binding: Some(Binding::EnumConstant(value)),
            ..
        } => *value,
        ExprKind::ImplicitCast(inner) | ExprKind::Cast { expr: inner, .. } => {
            if !expr.ty().is_integer() {
                return None;
            }
            eval(inner)?
        }
        ExprKind::UnaryOp { op, operand } => {
            let v = eval(operand)?;
            match op {
                UnOp::Neg => v.wrapping_neg(),
                UnOp::BitNot => !v,
                UnOp::Not => (v == 0) as i64,
                _ => return None,
            }
        }
        ExprKind::BinaryOp { op, left, right } => {
            let l = eval(left)?;
            // Short-circuit operators may leave the right side unevaluated
            match op {
                BinOp::And if l == 0 => return Some(0),
                BinOp::Or if l != 0 => return Some(1),
                _ => {}
            }
            let r = eval(right)?;
            // Operands were converted to a common type by the resolver
            let operand_type = int_type(left);
            binary(*op, l, r, operand_type)?
        }
        ExprKind::TernaryOp {
            condition,
            true_expr,
            false_expr,
        } => {
            if eval(condition)? != 0 {
                eval(true_expr)?
            } else {
                eval(false_expr)?
            }
        }
        _ => return None,
    };

    Some(int_type(expr).wrap(value))
}

fn binary(op: BinOp, l: i64, r: i64, operands: IntType) -> Option<i64> {
    let (ul, ur) = (
        IntType::unsigned(operands.bits).wrap(l) as u64,
        IntType::unsigned(operands.bits).wrap(r) as u64,
    );
    let value = match op {
        BinOp::Add => l.wrapping_add(r),
        BinOp::Sub => l.wrapping_sub(r),
        BinOp::Mul => l.wrapping_mul(r),
        BinOp::Div | BinOp::Mod if r == 0 => return None,
        BinOp::Div if operands.signed => l.wrapping_div(r),
        BinOp::Div => (ul / ur) as i64,
        BinOp::Mod if operands.signed => l.wrapping_rem(r),
        BinOp::Mod => (ul % ur) as i64,
        BinOp::BitAnd => l & r,
        BinOp::BitOr => l | r,
        BinOp::BitXor => l ^ r,
        BinOp::BitShl => l.wrapping_shl(r as u32),
        BinOp::BitShr if operands.signed => l.wrapping_shr(r as u32),
        BinOp::BitShr => ul.wrapping_shr(r as u32) as i64,
        BinOp::Eq => (l == r) as i64,
        BinOp::Ne => (l != r) as i64,
        BinOp::Lt if operands.signed => (l < r) as i64,
        BinOp::Le if operands.signed => (l <= r) as i64,
        BinOp::Gt if operands.signed => (l > r) as i64,
        BinOp::Ge if operands.signed => (l >= r) as i64,
        BinOp::Lt => (ul < ur) as i64,
        BinOp::Le => (ul <= ur) as i64,
        BinOp::Gt => (ul > ur) as i64,
        BinOp::Ge => (ul >= ur) as i64,
        BinOp::And => (l != 0 && r != 0) as i64,
        BinOp::Or => (l != 0 || r != 0) as i64,
    };
    Some(value)
}

/// Value of a constant pointer initializer: null, a string literal, or an
/// address inside a global object (`&g`, `&g[k]`, `&g.f`, `g + k`).
pub fn address(expr: &Expr, layouts: &Layouts) -> Option<ConstValue> {
    match &expr.kind {
        ExprKind::ImplicitCast(inner) | ExprKind::Cast { expr: inner, .. }
            if inner.ty().is_integer() =>
        {
            (eval(inner)? == 0).then_some(ConstValue::Null)
        }
        ExprKind::Decay(inner) => match &inner.kind {
            ExprKind::StringLiteral(bytes) => Some(ConstValue::StringRef(bytes.clone())),
            _ => object(inner, layouts).map(|(name, offset)| ConstValue::Address(name, offset)),
        },
        _ => pointer(expr, layouts).map(|(name, offset)| ConstValue::Address(name, offset)),
    }
}

/// Global and byte offset a constant pointer expression points to.
fn pointer(expr: &Expr, layouts: &Layouts) -> Option<(String, i64)> {
    match &expr.kind {
        ExprKind::ImplicitCast(inner) | ExprKind::Cast { expr: inner, .. } if inner.ty().is_pointer() => {
            pointer(inner, layouts)
        }
        ExprKind::Decay(inner) => object(inner, layouts),
        ExprKind::UnaryOp {
            op: UnOp::AddrOf,
            operand,
        } => object(operand, layouts),
        ExprKind::BinaryOp {
            op: op @ (BinOp::Add | BinOp::Sub),
            left,
            right,
        } => {
            let (base, index) = if left.ty().is_pointer() {
                (left, right)
            } else if *op == BinOp::Add {
                (right, left)
            } else {
                return None;
            };
            let (name, offset) = pointer(base, layouts)?;
            let step = eval(index)?.wrapping_mul(element_size(expr.ty().pointee()?, layouts) as i64);
            let step = if *op == BinOp::Sub { step.wrapping_neg() } else { step };
            Some((name, offset.wrapping_add(step)))
        }
        _ => None,
    }
}

/// Global and byte offset of the object an lvalue designates.
fn object(expr: &Expr, layouts: &Layouts) -> Option<(String, i64)> {
    match &expr.kind {
        ExprKind::Variable {
            binding: Some(Binding::Global(name)),
            ..
        } => Some((name.clone(), 0)),
        ExprKind::ArrayAccess { array, index } => {
            let (name, offset) = pointer(array, layouts)?;
            let step = eval(index)?.wrapping_mul(element_size(expr.ty(), layouts) as i64);
            Some((name, offset.wrapping_add(step)))
        }
        ExprKind::MemberAccess { object: inner, member } => {
            let (name, offset) = object(inner, layouts)?;
            let Type::Struct(tag) = inner.ty() else {
                return None;
            };
            let field = layouts.get(tag)?.field(member)?;
            Some((name, offset + field.offset as i64))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ast::SourceLocation;
    use crate::types::Type;

    fn lit(n: i64, ty: Type) -> Expr {
        let mut e = Expr::new(ExprKind::IntLiteral(n), SourceLocation::default());
        e.ty = Some(ty);
        e
    }

    fn bin(op: BinOp, l: Expr, r: Expr, ty: Type) -> Expr {
        let mut e = Expr::new(
            ExprKind::BinaryOp {
                op,
                left: Box::new(l),
                right: Box::new(r),
            },
            SourceLocation::default(),
        );
        e.ty = Some(ty);
        e
    }

    #[test]
    fn test_signed_arithmetic() {
        let e = bin(BinOp::Sub, lit(2, Type::INT), lit(5, Type::INT), Type::INT);
        assert_eq!(eval(&e), Some(-3));
    }

    #[test]
    fn test_wraps_to_int() {
        let e = bin(
            BinOp::Mul,
            lit(0x10000, Type::INT),
            lit(0x10000, Type::INT),
            Type::INT,
        );
        assert_eq!(eval(&e), Some(0));
    }

    #[test]
    fn test_unsigned_comparison() {
        let uint = Type::Int(IntType::UINT);
        let e = bin(BinOp::Lt, lit(-1, uint.clone()), lit(1, uint), Type::INT);
        assert_eq!(eval(&e), Some(0));
    }

    #[test]
    fn test_division_by_zero_is_not_constant() {
        let e = bin(BinOp::Div, lit(1, Type::INT), lit(0, Type::INT), Type::INT);
        assert_eq!(eval(&e), None);
    }

    #[test]
    fn test_short_circuit_skips_right() {
        let unknown = Expr::new(
            ExprKind::Variable {
                name: "x".into(),
                binding: None,
            },
            SourceLocation::default(),
        );
        let e = bin(BinOp::And, lit(0, Type::INT), unknown, Type::INT);
        assert_eq!(eval(&e), Some(0));
    }
}
