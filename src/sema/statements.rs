//! Statement checking inside function bodies

use super::const_eval;
use super::errors::SemanticError;
use super::expressions::convert;
use super::scope::{Storage, Symbol};
use super::Resolver;
use crate::parser::ast::*;
use crate::types::{IntType, Type};
use rustc_hash::FxHashSet;

impl Resolver {
    pub(super) fn resolve_stmt(&mut self, stmt: &mut Stmt) -> Result<(), SemanticError> {
        match stmt {
            Stmt::Declaration(decls) => {
                for var in decls.iter_mut() {
                    self.resolve_local(var)?;
                }
            }
            Stmt::Expression(expr) => self.resolve_value(expr)?,
            Stmt::Block { statements, .. } => self.resolve_scoped(statements)?,
            Stmt::If {
                condition,
                then_branch,
                else_branch,
                ..
            } => {
                self.resolve_condition(condition)?;
                self.resolve_stmt(then_branch)?;
                if let Some(else_branch) = else_branch {
                    self.resolve_stmt(else_branch)?;
                }
            }
            Stmt::While {
                condition, body, ..
            } => {
                self.resolve_condition(condition)?;
                self.resolve_loop_body(body)?;
            }
            Stmt::DoWhile {
                body, condition, ..
            } => {
                self.resolve_loop_body(body)?;
                self.resolve_condition(condition)?;
            }
            Stmt::For {
                init,
                condition,
                increment,
                body,
                ..
            } => {
                // The init declaration is scoped to the loop
                self.scopes.push();
                let result = self.resolve_for(init, condition, increment, body);
                self.scopes.pop();
                result?;
            }
            Stmt::Switch { expr, cases, .. } => {
                self.resolve_value(expr)?;
                let switch_type = expr
                    .ty()
                    .int_type()
                    .ok_or_else(|| {
                        SemanticError::mismatch(
                            format!(
                                "statement requires expression of integer type ('{}' invalid)",
                                expr.ty()
                            ),
                            expr.location,
                        )
                    })?
                    .promote();
                convert(expr, &Type::Int(switch_type));

                self.scopes.push();
                self.current.breakables += 1;
                let result = self.resolve_cases(cases, switch_type);
                self.current.breakables -= 1;
                self.scopes.pop();
                result?;
            }
            Stmt::Return { expr, location } => self.resolve_return(expr.as_mut(), *location)?,
            Stmt::Break(location) => {
                if self.current.breakables == 0 {
                    return Err(SemanticError::MisplacedJump {
                        keyword: "break",
                        location: *location,
                    });
                }
            }
            Stmt::Continue(location) => {
                if self.current.loops == 0 {
                    return Err(SemanticError::MisplacedJump {
                        keyword: "continue",
                        location: *location,
                    });
                }
            }
            Stmt::Empty(_) => {}
        }
        Ok(())
    }

    fn resolve_scoped(&mut self, statements: &mut [Stmt]) -> Result<(), SemanticError> {
        self.scopes.push();
        let result = statements.iter_mut().try_for_each(|s| self.resolve_stmt(s));
        self.scopes.pop();
        result
    }

    fn resolve_loop_body(&mut self, body: &mut Stmt) -> Result<(), SemanticError> {
        self.current.loops += 1;
        self.current.breakables += 1;
        let result = self.resolve_stmt(body);
        self.current.loops -= 1;
        self.current.breakables -= 1;
        result
    }

    fn resolve_for(
        &mut self,
        init: &mut Option<Box<Stmt>>,
        condition: &mut Option<Expr>,
        increment: &mut Option<Expr>,
        body: &mut Stmt,
    ) -> Result<(), SemanticError> {
        if let Some(init) = init {
            self.resolve_stmt(init)?;
        }
        if let Some(condition) = condition {
            self.resolve_condition(condition)?;
        }
        if let Some(increment) = increment {
            self.resolve_value(increment)?;
        }
        self.resolve_loop_body(body)
    }

    fn resolve_cases(&mut self, cases: &mut [CaseNode], switch_type: IntType) -> Result<(), SemanticError> {
        let mut seen = FxHashSet::default();
        let mut has_default = false;

        for case in cases.iter_mut() {
            match case {
                CaseNode::Case {
                    value,
                    constant,
                    statements,
                    location,
                } => {
                    self.resolve_value(value)?;
                    let folded = const_eval::eval(value).ok_or(SemanticError::NotConstant {
                        location: value.location,
                    })?;
                    let folded = switch_type.wrap(folded);
                    if !seen.insert(folded) {
                        return Err(SemanticError::DuplicateCase {
                            value: folded,
                            location: *location,
                        });
                    }
                    *constant = Some(folded);
                    for stmt in statements.iter_mut() {
                        self.resolve_stmt(stmt)?;
                    }
                }
                CaseNode::Default {
                    statements,
                    location,
                } => {
                    if has_default {
                        return Err(SemanticError::Redefinition {
                            name: "default".to_string(),
                            location: *location,
                        });
                    }
                    has_default = true;
                    for stmt in statements.iter_mut() {
                        self.resolve_stmt(stmt)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn resolve_return(&mut self, expr: Option<&mut Expr>, location: SourceLocation) -> Result<(), SemanticError> {
        let return_type = self.current.return_type.clone();
        match expr {
            Some(expr) => {
                if return_type.is_void() {
                    return Err(SemanticError::mismatch(
                        format!("void function '{}' should not return a value", self.current.name),
                        expr.location,
                    ));
                }
                self.resolve_value(expr)?;
                self.assign_convert(expr, &return_type, "return")
            }
            None if !return_type.is_void() => Err(SemanticError::mismatch(
                format!("non-void function '{}' should return a value", self.current.name),
                location,
            )),
            None => Ok(()),
        }
    }

    fn resolve_local(&mut self, var: &mut VarDecl) -> Result<(), SemanticError> {
        let mut ty = self.resolve_type(&var.var_type, var.location)?;
        self.check_object_type(&ty, &var.name, var.location)?;

        if var.is_extern {
            return self.declare_block_extern(var, ty);
        }

        // The initializer is resolved before the name comes into scope
        if let Some(init) = &mut var.init {
            self.resolve_initializer(init, &mut ty)?;
        }
        if matches!(ty, Type::Array(_, 0)) {
            return Err(SemanticError::mismatch(
                format!("array '{}' needs an explicit size or an initializer", var.name),
                var.location,
            ));
        }

        let slot = self.current.slots.allocate(&var.name, ty.clone(), false);
        var.slot = Some(slot);
        self.scopes.declare(
            Symbol {
                name: var.name.clone(),
                ty,
                storage: Storage::Local,
                slot: Some(slot),
            },
            var.location,
        )
    }

    /// `extern` inside a function refers to a file-scope object.
    fn declare_block_extern(&mut self, var: &VarDecl, ty: Type) -> Result<(), SemanticError> {
        if var.init.is_some() {
            return Err(SemanticError::mismatch(
                format!("'extern' variable '{}' cannot have an initializer", var.name),
                var.location,
            ));
        }

        match self.global_index.get(&var.name).and_then(|&i| self.globals.get(i)) {
            Some(global) if global.ty != ty => {
                return Err(SemanticError::mismatch(
                    format!("conflicting types for '{}'", var.name),
                    var.location,
                ))
            }
            Some(_) => {}
            None => self.add_global(&var.name, ty.clone(), true, None),
        }

        self.scopes.declare(
            Symbol {
                name: var.name.clone(),
                ty,
                storage: Storage::Global,
                slot: None,
            },
            var.location,
        )
    }
}
