//! Expression typing and implicit conversions

use super::const_eval;
use super::errors::SemanticError;
use super::scope::Storage;
use super::Resolver;
use crate::memory::sizeof_type;
use crate::parser::ast::*;
use crate::types::{usual_arithmetic, IntType, Type};

/// Replace `expr` by `wrapper(expr)` typed `ty`.
fn wrap(expr: &mut Expr, wrapper: fn(Box<Expr>) -> ExprKind, ty: Type) {
    let location = expr.location;
    let inner = std::mem::replace(expr, Expr::new(ExprKind::IntLiteral(0), location));
    *expr = Expr {
        kind: wrapper(Box::new(inner)),
        location,
        ty: Some(ty),
    };
}

/// Convert `expr` to `target`, inserting an `ImplicitCast` when the type changes.
pub(super) fn convert(expr: &mut Expr, target: &Type) {
    if expr.ty() != target {
        wrap(expr, ExprKind::ImplicitCast, target.clone());
    }
}

fn decay(expr: &mut Expr) {
    let ty = expr.ty().decay();
    wrap(expr, ExprKind::Decay, ty);
}

fn is_lvalue(expr: &Expr) -> bool {
    match &expr.kind {
        ExprKind::Variable {
            binding: Some(Binding::Local(_) | Binding::Global(_)),
            ..
        } => true,
        ExprKind::UnaryOp {
            op: UnOp::Deref, ..
        }
        | ExprKind::ArrayAccess { .. }
        | ExprKind::PointerMemberAccess { .. } => true,
        ExprKind::MemberAccess { object, .. } => is_lvalue(object),
        _ => false,
    }
}

fn is_null_constant(expr: &Expr) -> bool {
    expr.ty().is_integer() && const_eval::eval(expr) == Some(0)
}

fn invalid_operands(op: impl std::fmt::Display, l: &Type, r: &Type, location: SourceLocation) -> SemanticError {
    SemanticError::mismatch(
        format!("invalid operands to binary expression ('{}' {} '{}')", l, op, r),
        location,
    )
}

impl Resolver {
    /// Resolve `expr` where its value is used: arrays decay to pointers.
    pub(super) fn resolve_value(&mut self, expr: &mut Expr) -> Result<(), SemanticError> {
        self.resolve_expr(expr)?;
        if expr.ty().is_array() {
            decay(expr);
        }
        Ok(())
    }

    /// Resolve a controlling expression; it must be scalar.
    pub(super) fn resolve_condition(&mut self, expr: &mut Expr) -> Result<(), SemanticError> {
        self.resolve_value(expr)?;
        if !expr.ty().is_scalar() {
            return Err(SemanticError::mismatch(
                format!("used type '{}' where scalar is required", expr.ty()),
                expr.location,
            ));
        }
        Ok(())
    }

    /// Check that `expr` may be stored to as `target` and convert it.
    pub(super) fn assign_convert(
        &self,
        expr: &mut Expr,
        target: &Type,
        context: &str,
    ) -> Result<(), SemanticError> {
        let source = expr.ty();
        let compatible = source == target
            || (target.is_integer() && source.is_integer())
            || (target.is_pointer() && source.is_pointer())
            || (target.is_pointer() && is_null_constant(expr));
        if !compatible {
            return Err(SemanticError::mismatch(
                format!(
                    "incompatible types in {}: cannot convert '{}' to '{}'",
                    context, source, target
                ),
                expr.location,
            ));
        }
        convert(expr, target);
        Ok(())
    }

    fn require_modifiable(&self, expr: &Expr) -> Result<(), SemanticError> {
        if !is_lvalue(expr) || expr.ty().is_array() {
            return Err(SemanticError::NotAnLvalue {
                location: expr.location,
            });
        }
        Ok(())
    }

    fn field_type(
        &self,
        tag: &str,
        member: &str,
        location: SourceLocation,
    ) -> Result<Type, SemanticError> {
        let layout = self.layouts.get(tag).ok_or_else(|| {
            SemanticError::mismatch(
                format!("incomplete definition of type 'struct {}'", tag),
                location,
            )
        })?;
        layout
            .field(member)
            .map(|f| f.ty.clone())
            .ok_or_else(|| SemanticError::UnknownField {
                struct_name: tag.to_string(),
                field: member.to_string(),
                location,
            })
    }

    /// Replace a `sizeof` node by its value.
    fn fold_sizeof(&mut self, expr: &mut Expr) -> Result<(), SemanticError> {
        let location = expr.location;
        let ty = match &mut expr.kind {
            ExprKind::SizeofType(name) => self.resolve_type(name, location)?,
            ExprKind::SizeofExpr(inner) => {
                self.resolve_expr(inner)?;
                inner.ty().clone()
            }
            _ => return Ok(()),
        };
        if matches!(ty, Type::Function(_) | Type::Array(_, 0)) {
            return Err(SemanticError::mismatch(
                format!("invalid application of 'sizeof' to type '{}'", ty),
                location,
            ));
        }

        expr.kind = ExprKind::IntLiteral(sizeof_type(&ty, &self.layouts) as i64);
        expr.ty = Some(Type::Int(IntType::ULONG));
        Ok(())
    }

    /// Resolve `expr` and set its type, without array decay at the top.
    pub(super) fn resolve_expr(&mut self, expr: &mut Expr) -> Result<(), SemanticError> {
        if matches!(expr.kind, ExprKind::SizeofType(_) | ExprKind::SizeofExpr(_)) {
            return self.fold_sizeof(expr);
        }

        let location = expr.location;
        let ty = match &mut expr.kind {
            ExprKind::IntLiteral(n) => {
                if i32::try_from(*n).is_ok() {
                    Type::INT
                } else if *n >= 0 {
                    Type::LONG
                } else {
                    // Only literals above i64::MAX wrap negative
                    Type::Int(IntType::ULONG)
                }
            }
            ExprKind::CharLiteral(_) => Type::INT,
            ExprKind::StringLiteral(bytes) => Type::Char.array_of(bytes.len() + 1),

            ExprKind::Variable { name, binding } => {
                let symbol = self.scopes.lookup(name).ok_or_else(|| {
                    SemanticError::UndeclaredIdentifier {
                        name: name.clone(),
                        location,
                    }
                })?;
                let (resolved, ty) = match (&symbol.storage, symbol.slot) {
                    (Storage::Local | Storage::Parameter, Some(slot)) => {
                        (Binding::Local(slot), symbol.ty.clone())
                    }
                    (Storage::EnumConstant(value), _) => (Binding::EnumConstant(*value), Type::INT),
                    (Storage::Function, _) => {
                        return Err(SemanticError::mismatch(
                            format!(
                                "function '{}' used as a value; function pointers are not supported",
                                name
                            ),
                            location,
                        ))
                    }
                    _ => (Binding::Global(name.clone()), symbol.ty.clone()),
                };
                *binding = Some(resolved);
                ty
            }

            ExprKind::BinaryOp { op, left, right } => {
                self.resolve_value(left)?;
                self.resolve_value(right)?;
                self.binary_type(*op, left, right, location)?
            }

            ExprKind::UnaryOp { op, operand } => self.unary_type(*op, operand, location)?,

            ExprKind::Assignment { lhs, rhs } => {
                self.resolve_expr(lhs)?;
                self.require_modifiable(lhs)?;
                self.resolve_value(rhs)?;
                let target = lhs.ty().clone();
                self.assign_convert(rhs, &target, "assignment")?;
                target
            }

            ExprKind::CompoundAssignment { op, lhs, rhs } => {
                self.resolve_expr(lhs)?;
                self.require_modifiable(lhs)?;
                self.resolve_value(rhs)?;
                let target = lhs.ty().clone();
                match (target.int_type(), rhs.ty().int_type()) {
                    // The operation happens in the common type, carried by `rhs`
                    (Some(a), Some(b)) => convert(rhs, &Type::Int(usual_arithmetic(a, b))),
                    (None, Some(_)) if target.is_pointer() && matches!(op, BinOp::Add | BinOp::Sub) => {
                        convert(rhs, &Type::LONG)
                    }
                    _ => return Err(invalid_operands(format!("{}=", op), &target, rhs.ty(), location)),
                }
                target
            }

            ExprKind::TernaryOp {
                condition,
                true_expr,
                false_expr,
            } => {
                self.resolve_condition(condition)?;
                self.resolve_value(true_expr)?;
                self.resolve_value(false_expr)?;
                let (t, f) = (true_expr.ty().clone(), false_expr.ty().clone());
                match (t.int_type(), f.int_type()) {
                    (Some(a), Some(b)) => {
                        let common = Type::Int(usual_arithmetic(a, b));
                        convert(true_expr, &common);
                        convert(false_expr, &common);
                        common
                    }
                    _ if t == f => t,
                    _ if t.is_pointer() && (f.is_pointer() || is_null_constant(false_expr)) => {
                        convert(false_expr, &t);
                        t
                    }
                    _ if f.is_pointer() && is_null_constant(true_expr) => {
                        convert(true_expr, &f);
                        f
                    }
                    _ => {
                        return Err(SemanticError::mismatch(
                            format!("incompatible operand types ('{}' and '{}')", t, f),
                            location,
                        ))
                    }
                }
            }

            ExprKind::FunctionCall { name, args } => {
                let symbol = self.scopes.lookup(name).cloned().ok_or_else(|| {
                    SemanticError::UndeclaredIdentifier {
                        name: name.clone(),
                        location,
                    }
                })?;
                let Type::Function(signature) = symbol.ty else {
                    return Err(SemanticError::mismatch(
                        format!("called object '{}' is not a function", name),
                        location,
                    ));
                };

                let fixed = signature.params.len();
                if args.len() < fixed || (!signature.variadic && args.len() > fixed) {
                    return Err(SemanticError::ArgumentCount {
                        function: name.clone(),
                        expected: fixed,
                        found: args.len(),
                        variadic: signature.variadic,
                        location,
                    });
                }

                for (i, arg) in args.iter_mut().enumerate() {
                    self.resolve_value(arg)?;
                    match signature.params.get(i) {
                        Some(param) => self.assign_convert(
                            arg,
                            param,
                            &format!("argument {} of '{}'", i + 1, name),
                        )?,
                        None => {
                            if arg.ty().is_void() {
                                return Err(SemanticError::mismatch(
                                    "argument has type 'void'",
                                    arg.location,
                                ));
                            }
                            let promoted = arg.ty().default_promotion();
                            convert(arg, &promoted);
                        }
                    }
                }
                signature.return_type.clone()
            }

            ExprKind::ArrayAccess { array, index } => {
                self.resolve_value(array)?;
                self.resolve_value(index)?;
                // `i[a]` is `a[i]`
                if array.ty().is_integer() && index.ty().is_pointer() {
                    std::mem::swap(array, index);
                }
                let element = match array.ty() {
                    Type::Pointer(inner) if !inner.is_void() => (**inner).clone(),
                    other => {
                        return Err(SemanticError::mismatch(
                            format!("subscripted value of type '{}' is not an array or pointer", other),
                            location,
                        ))
                    }
                };
                if !index.ty().is_integer() {
                    return Err(SemanticError::mismatch(
                        "array subscript is not an integer",
                        index.location,
                    ));
                }
                convert(index, &Type::LONG);
                element
            }

            ExprKind::MemberAccess { object, member } => {
                self.resolve_expr(object)?;
                let tag = match object.ty() {
                    Type::Struct(tag) => tag.clone(),
                    other => {
                        return Err(SemanticError::mismatch(
                            format!("member reference base type '{}' is not a structure", other),
                            location,
                        ))
                    }
                };
                self.field_type(&tag, member, location)?
            }

            ExprKind::PointerMemberAccess { object, member } => {
                self.resolve_value(object)?;
                let tag = match object.ty() {
                    Type::Pointer(inner) => match &**inner {
                        Type::Struct(tag) => Some(tag.clone()),
                        _ => None,
                    },
                    _ => None,
                };
                let tag = tag.ok_or_else(|| {
                    SemanticError::mismatch(
                        format!(
                            "member reference type '{}' is not a pointer to a structure",
                            object.ty()
                        ),
                        location,
                    )
                })?;
                self.field_type(&tag, member, location)?
            }

            ExprKind::Cast { target_type, expr: inner } => {
                let target = self.resolve_type(target_type, location)?;
                self.resolve_value(inner)?;
                let source = inner.ty();
                let allowed = target.is_void()
                    || (target.is_scalar() && source.is_scalar())
                    || target == *source;
                if !allowed || target.is_array() {
                    return Err(SemanticError::mismatch(
                        format!("invalid cast from '{}' to '{}'", source, target),
                        location,
                    ));
                }
                target
            }

            // Already resolved
            ExprKind::ImplicitCast(_) | ExprKind::Decay(_) => expr.ty.clone().unwrap_or(Type::Void),
            ExprKind::SizeofType(_) | ExprKind::SizeofExpr(_) => Type::Int(IntType::ULONG),
        };

        expr.ty = Some(ty);
        Ok(())
    }

    fn unary_type(
        &mut self,
        op: UnOp,
        operand: &mut Expr,
        location: SourceLocation,
    ) -> Result<Type, SemanticError> {
        match op {
            UnOp::Neg | UnOp::BitNot => {
                self.resolve_value(operand)?;
                let it = operand.ty().int_type().ok_or_else(|| {
                    SemanticError::mismatch(
                        format!("invalid argument type '{}' to unary expression", operand.ty()),
                        location,
                    )
                })?;
                let promoted = Type::Int(it.promote());
                convert(operand, &promoted);
                Ok(promoted)
            }
            UnOp::Not => {
                self.resolve_condition(operand)?;
                Ok(Type::INT)
            }
            UnOp::Deref => {
                self.resolve_value(operand)?;
                match operand.ty() {
                    Type::Pointer(inner) if !inner.is_void() => Ok((**inner).clone()),
                    other => Err(SemanticError::mismatch(
                        format!("indirection requires a non-void pointer operand ('{}' invalid)", other),
                        location,
                    )),
                }
            }
            UnOp::AddrOf => {
                self.resolve_expr(operand)?;
                if !is_lvalue(operand) {
                    return Err(SemanticError::mismatch(
                        "cannot take the address of an rvalue",
                        location,
                    ));
                }
                Ok(operand.ty().clone().pointer_to())
            }
            UnOp::PreInc | UnOp::PreDec | UnOp::PostInc | UnOp::PostDec => {
                self.resolve_expr(operand)?;
                self.require_modifiable(operand)?;
                if !operand.ty().is_scalar() {
                    return Err(SemanticError::mismatch(
                        format!("cannot increment value of type '{}'", operand.ty()),
                        location,
                    ));
                }
                Ok(operand.ty().clone())
            }
        }
    }

    fn binary_type(
        &mut self,
        op: BinOp,
        left: &mut Expr,
        right: &mut Expr,
        location: SourceLocation,
    ) -> Result<Type, SemanticError> {
        let (lt, rt) = (left.ty().clone(), right.ty().clone());

        if op.is_logical() {
            if !lt.is_scalar() || !rt.is_scalar() {
                return Err(invalid_operands(op, &lt, &rt, location));
            }
            return Ok(Type::INT);
        }

        if op.is_comparison() {
            match (lt.int_type(), rt.int_type()) {
                (Some(a), Some(b)) => {
                    let common = Type::Int(usual_arithmetic(a, b));
                    convert(left, &common);
                    convert(right, &common);
                }
                _ if lt.is_pointer() && rt.is_pointer() => {}
                _ if lt.is_pointer() && is_null_constant(right) => convert(right, &lt),
                _ if rt.is_pointer() && is_null_constant(left) => convert(left, &rt),
                _ => return Err(invalid_operands(op, &lt, &rt, location)),
            }
            return Ok(Type::INT);
        }

        match op {
            BinOp::Add | BinOp::Sub if lt.is_pointer() && rt.is_integer() => {
                convert(right, &Type::LONG);
                Ok(lt)
            }
            BinOp::Add if lt.is_integer() && rt.is_pointer() => {
                convert(left, &Type::LONG);
                Ok(rt)
            }
            BinOp::Sub if lt.is_pointer() && rt.is_pointer() => {
                if lt != rt {
                    return Err(invalid_operands(op, &lt, &rt, location));
                }
                Ok(Type::LONG)
            }
            BinOp::BitShl | BinOp::BitShr => match (lt.int_type(), rt.int_type()) {
                (Some(a), Some(_)) => {
                    // Both sides take the promoted left type
                    let result = Type::Int(a.promote());
                    convert(left, &result);
                    convert(right, &result);
                    Ok(result)
                }
                _ => Err(invalid_operands(op, &lt, &rt, location)),
            },
            _ => match (lt.int_type(), rt.int_type()) {
                (Some(a), Some(b)) => {
                    let common = Type::Int(usual_arithmetic(a, b));
                    convert(left, &common);
                    convert(right, &common);
                    Ok(common)
                }
                _ => Err(invalid_operands(op, &lt, &rt, location)),
            },
        }
    }
}
