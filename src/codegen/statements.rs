//! Statement lowering
//!
//! Each control construct lowers to a fixed block pattern:
//!
//! ```text
//! if:      cond -> if.then / if.else -> if.end
//! while:   while.cond -> while.body -> while.cond | while.end
//! do:      do.body -> do.cond -> do.body | do.end
//! for:     init; for.cond -> for.body -> for.inc -> for.cond | for.end
//! switch:  switch on the value -> switch.case.N (falling through) -> switch.end
//! ```

use super::errors::CodegenError;
use super::function::{FunctionGenerator, JumpTargets};
use super::ir::{IrType, Operand, Terminator};
use super::{ir_type, zero_of};
use crate::memory::sizeof_type;
use crate::parser::ast::*;
use crate::types::{IntType, Type};

impl FunctionGenerator<'_> {
    pub(super) fn gen_stmt(&mut self, stmt: &Stmt) -> Result<(), CodegenError> {
        match stmt {
            Stmt::Declaration(decls) => {
                for var in decls {
                    self.gen_local(var)?;
                }
            }
            Stmt::Expression(expr) => {
                self.gen_value(expr)?;
            }
            Stmt::Block { statements, .. } => {
                for stmt in statements {
                    self.gen_stmt(stmt)?;
                }
            }
            Stmt::If {
                condition,
                then_branch,
                else_branch,
                ..
            } => self.gen_if(condition, then_branch, else_branch.as_deref())?,
            Stmt::While {
                condition, body, ..
            } => self.gen_while(condition, body)?,
            Stmt::DoWhile {
                body, condition, ..
            } => self.gen_do_while(body, condition)?,
            Stmt::For {
                init,
                condition,
                increment,
                body,
                ..
            } => self.gen_for(init.as_deref(), condition.as_ref(), increment.as_ref(), body)?,
            Stmt::Switch {
                expr,
                cases,
                location,
            } => self.gen_switch(expr, cases, *location)?,
            Stmt::Return { expr, location } => self.gen_return(expr.as_ref(), *location)?,
            Stmt::Break(location) => {
                let target = self
                    .jumps
                    .last()
                    .map(|j| j.break_label.clone())
                    .ok_or_else(|| CodegenError::internal("'break' outside loop or switch", *location))?;
                self.builder.terminate(Terminator::Br(target));
            }
            Stmt::Continue(location) => {
                let target = self
                    .jumps
                    .iter()
                    .rev()
                    .find_map(|j| j.continue_label.clone())
                    .ok_or_else(|| CodegenError::internal("'continue' outside loop", *location))?;
                self.builder.terminate(Terminator::Br(target));
            }
            Stmt::Empty(_) => {}
        }
        Ok(())
    }

    /// Initialize a local. Brace lists zero the whole object first, then
    /// store the listed elements.
    fn gen_local(&mut self, var: &VarDecl) -> Result<(), CodegenError> {
        let (Some(slot), Some(init)) = (var.slot, &var.init) else {
            return Ok(());
        };
        let addr = self.slot_addr(slot, var.location)?;
        let ty = self.slot_type(slot, var.location)?;

        if let Initializer::List(..) = init {
            self.store(&ty, zero_of(&ir_type(&ty)), addr.clone());
        }
        self.gen_initializer(init, &ty, addr)
    }

    fn gen_initializer(&mut self, init: &Initializer, ty: &Type, addr: Operand) -> Result<(), CodegenError> {
        match init {
            Initializer::Expr(expr) => {
                if let (ExprKind::StringLiteral(bytes), Type::Array(_, len)) = (&expr.kind, ty) {
                    let mut bytes = bytes.clone();
                    bytes.resize(*len, 0);
                    self.store(ty, Operand::Bytes(bytes), addr);
                    return Ok(());
                }
                let value = self.gen_value(expr)?;
                self.store(ty, value, addr);
            }
            Initializer::List(items, location) => match ty {
                Type::Array(element, _) => {
                    let size = sizeof_type(element, self.layouts());
                    for (i, item) in items.iter().enumerate() {
                        let element_addr = self.offset(addr.clone(), Operand::Const((i * size) as i64));
                        self.gen_initializer(item, element, element_addr)?;
                    }
                }
                Type::Struct(tag) => {
                    let fields: Vec<(usize, Type)> = self
                        .layouts()
                        .get(tag)
                        .map(|layout| layout.fields.iter().map(|f| (f.offset, f.ty.clone())).collect())
                        .ok_or_else(|| CodegenError::internal(format!("unknown struct '{}'", tag), *location))?;
                    for (item, (offset, field_ty)) in items.iter().zip(fields) {
                        let field_addr = self.offset(addr.clone(), Operand::Const(offset as i64));
                        self.gen_initializer(item, &field_ty, field_addr)?;
                    }
                }
                _ => {
                    if let Some(item) = items.first() {
                        self.gen_initializer(item, ty, addr)?;
                    }
                }
            },
        }
        Ok(())
    }

    fn gen_if(&mut self, condition: &Expr, then_branch: &Stmt, else_branch: Option<&Stmt>) -> Result<(), CodegenError> {
        let cond = self.gen_condition(condition)?;
        let then_label = self.builder.new_label("if.then");
        let else_label = else_branch.map(|_| self.builder.new_label("if.else"));
        let end_label = self.builder.new_label("if.end");

        self.builder.terminate(Terminator::CondBr {
            cond,
            then_label: then_label.clone(),
            else_label: else_label.clone().unwrap_or_else(|| end_label.clone()),
        });

        self.builder.start_block(then_label);
        self.gen_stmt(then_branch)?;
        self.builder.terminate(Terminator::Br(end_label.clone()));

        if let (Some(else_label), Some(else_branch)) = (else_label, else_branch) {
            self.builder.start_block(else_label);
            self.gen_stmt(else_branch)?;
        }
        self.builder.start_block(end_label);
        Ok(())
    }

    fn gen_loop_body(&mut self, body: &Stmt, break_label: &str, continue_label: &str) -> Result<(), CodegenError> {
        self.jumps.push(JumpTargets {
            break_label: break_label.to_string(),
            continue_label: Some(continue_label.to_string()),
        });
        let result = self.gen_stmt(body);
        self.jumps.pop();
        result
    }

    fn gen_while(&mut self, condition: &Expr, body: &Stmt) -> Result<(), CodegenError> {
        let cond_label = self.builder.new_label("while.cond");
        let body_label = self.builder.new_label("while.body");
        let end_label = self.builder.new_label("while.end");

        self.builder.start_block(cond_label.clone());
        let cond = self.gen_condition(condition)?;
        self.builder.terminate(Terminator::CondBr {
            cond,
            then_label: body_label.clone(),
            else_label: end_label.clone(),
        });

        self.builder.start_block(body_label);
        self.gen_loop_body(body, &end_label, &cond_label)?;
        self.builder.terminate(Terminator::Br(cond_label));

        self.builder.start_block(end_label);
        Ok(())
    }

    fn gen_do_while(&mut self, body: &Stmt, condition: &Expr) -> Result<(), CodegenError> {
        let body_label = self.builder.new_label("do.body");
        let cond_label = self.builder.new_label("do.cond");
        let end_label = self.builder.new_label("do.end");

        self.builder.start_block(body_label.clone());
        self.gen_loop_body(body, &end_label, &cond_label)?;

        self.builder.start_block(cond_label);
        let cond = self.gen_condition(condition)?;
        self.builder.terminate(Terminator::CondBr {
            cond,
            then_label: body_label,
            else_label: end_label.clone(),
        });

        self.builder.start_block(end_label);
        Ok(())
    }

    fn gen_for(
        &mut self,
        init: Option<&Stmt>,
        condition: Option<&Expr>,
        increment: Option<&Expr>,
        body: &Stmt,
    ) -> Result<(), CodegenError> {
        if let Some(init) = init {
            self.gen_stmt(init)?;
        }
        let cond_label = self.builder.new_label("for.cond");
        let body_label = self.builder.new_label("for.body");
        let inc_label = self.builder.new_label("for.inc");
        let end_label = self.builder.new_label("for.end");

        self.builder.start_block(cond_label.clone());
        match condition {
            Some(condition) => {
                let cond = self.gen_condition(condition)?;
                self.builder.terminate(Terminator::CondBr {
                    cond,
                    then_label: body_label.clone(),
                    else_label: end_label.clone(),
                });
            }
            None => self.builder.terminate(Terminator::Br(body_label.clone())),
        }

        self.builder.start_block(body_label);
        self.gen_loop_body(body, &end_label, &inc_label)?;

        self.builder.start_block(inc_label);
        if let Some(increment) = increment {
            self.gen_value(increment)?;
        }
        self.builder.terminate(Terminator::Br(cond_label));

        self.builder.start_block(end_label);
        Ok(())
    }

    /// `switch` lowers to the IR `switch` terminator. Case blocks are laid
    /// out in source order and fall through into each other; the default
    /// target is the `default` label if there is one, else the exit.
    fn gen_switch(&mut self, expr: &Expr, cases: &[CaseNode], location: SourceLocation) -> Result<(), CodegenError> {
        let value = self.gen_value(expr)?;
        let it = expr
            .ty()
            .int_type()
            .ok_or_else(|| CodegenError::internal("switch on a non-integer", location))?;

        let labels: Vec<String> = cases
            .iter()
            .map(|case| match case {
                CaseNode::Case { .. } => self.builder.new_label("switch.case"),
                CaseNode::Default { .. } => self.builder.new_label("switch.default"),
            })
            .collect();
        let end_label = self.builder.new_label("switch.end");

        let mut default = end_label.clone();
        let mut targets = Vec::new();
        for (case, label) in cases.iter().zip(&labels) {
            match case {
                CaseNode::Case {
                    constant: Some(constant),
                    ..
                } => targets.push((IntType::signed(it.bits).wrap(*constant), label.clone())),
                CaseNode::Case { location, .. } => {
                    return Err(CodegenError::internal("case label was not folded", *location))
                }
                CaseNode::Default { .. } => default = label.clone(),
            }
        }
        self.builder.terminate(Terminator::Switch {
            ty: ir_type(expr.ty()),
            value,
            default,
            cases: targets,
        });

        self.jumps.push(JumpTargets {
            break_label: end_label.clone(),
            continue_label: None,
        });
        let mut result = Ok(());
        for (case, label) in cases.iter().zip(labels) {
            self.builder.start_block(label);
            result = case.statements().iter().try_for_each(|stmt| self.gen_stmt(stmt));
            if result.is_err() {
                break;
            }
        }
        self.jumps.pop();
        result?;

        self.builder.start_block(end_label);
        Ok(())
    }

    fn gen_return(&mut self, expr: Option<&Expr>, location: SourceLocation) -> Result<(), CodegenError> {
        let terminator = match expr {
            Some(expr) => {
                let value = self.gen_value(expr)?;
                let ty = ir_type(self.return_type());
                if ty == IrType::Void {
                    return Err(CodegenError::internal("value returned from void function", location));
                }
                Terminator::Ret(Some((ty, value)))
            }
            None => Terminator::Ret(None),
        };
        self.builder.terminate(terminator);
        Ok(())
    }
}
