//! File-scope declarations, function bodies, and initializers

use super::const_eval;
use super::errors::SemanticError;
use super::scope::{Storage, Symbol};
use super::{ConstValue, FunctionContext, FunctionInfo, GlobalInfo, Resolver};
use crate::memory::layout::StructLayout;
use crate::parser::ast::*;
use crate::types::{FunctionType, IntType, Type};

fn is_char_like(ty: &Type) -> bool {
    ty.int_type().is_some_and(|it| it.bits == 8)
}

impl Resolver {
    /// Translate a syntactic type.
    ///
    /// Struct objects need a complete struct; a pointer to a struct that is
    /// not defined yet is fine. An unsized outermost dimension becomes length
    /// 0 for the initializer to fill in.
    pub(super) fn resolve_type(
        &self,
        name: &TypeName,
        location: SourceLocation,
    ) -> Result<Type, SemanticError> {
        let mut ty = match &name.base {
            BaseType::Void => Type::Void,
            BaseType::Char => Type::Char,
            BaseType::Integer { bits, signed } => Type::Int(IntType {
                bits: *bits,
                signed: *signed,
            }),
            BaseType::Struct(tag) => {
                if name.pointer_depth == 0 && !self.layouts.contains_key(tag) {
                    return Err(SemanticError::UndeclaredIdentifier {
                        name: format!("struct {}", tag),
                        location,
                    });
                }
                Type::Struct(tag.clone())
            }
            BaseType::Enum(tag) => {
                if !self.enums.contains(tag) {
                    return Err(SemanticError::UndeclaredIdentifier {
                        name: format!("enum {}", tag),
                        location,
                    });
                }
                Type::Enum(tag.clone())
            }
        };

        for _ in 0..name.pointer_depth {
            ty = ty.pointer_to();
        }

        for (i, dim) in name.array_dims.iter().enumerate().rev() {
            let len = match dim {
                Some(len) => *len,
                None if i == 0 => 0,
                None => {
                    return Err(SemanticError::mismatch(
                        "array has incomplete element type",
                        location,
                    ))
                }
            };
            ty = ty.array_of(len);
        }

        Ok(ty)
    }

    /// Objects cannot have type `void` or be arrays of `void`.
    pub(super) fn check_object_type(
        &self,
        ty: &Type,
        name: &str,
        location: SourceLocation,
    ) -> Result<(), SemanticError> {
        let mut element = ty;
        while let Type::Array(inner, _) = element {
            element = inner;
        }
        if element.is_void() {
            return Err(SemanticError::mismatch(
                format!("variable '{}' has incomplete type '{}'", name, ty),
                location,
            ));
        }
        Ok(())
    }

    fn resolve_param_type(&self, param: &Param) -> Result<Type, SemanticError> {
        // Array parameters are adjusted to pointers to their element type
        let mut adjusted = param.param_type.clone();
        let is_array = !adjusted.array_dims.is_empty();
        if is_array {
            adjusted.array_dims.remove(0);
        }

        let mut ty = self.resolve_type(&adjusted, param.location)?;
        if is_array {
            ty = ty.pointer_to();
        }
        if ty.is_void() {
            return Err(SemanticError::mismatch(
                "parameter has incomplete type 'void'",
                param.location,
            ));
        }
        Ok(ty)
    }

    fn function_signature(&self, def: &FunctionDef) -> Result<FunctionType, SemanticError> {
        let return_type = self.resolve_type(&def.return_type, def.location)?;
        if return_type.is_array() {
            return Err(SemanticError::mismatch(
                format!("function '{}' cannot return an array", def.name),
                def.location,
            ));
        }

        let params = def
            .params
            .iter()
            .map(|p| self.resolve_param_type(p))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(FunctionType {
            return_type,
            params,
            variadic: def.variadic,
        })
    }

    pub(super) fn declare_struct(&mut self, def: &StructDef) -> Result<(), SemanticError> {
        if self.layouts.contains_key(&def.name) {
            return Err(SemanticError::Redefinition {
                name: format!("struct {}", def.name),
                location: def.location,
            });
        }

        let mut fields: Vec<(String, Type)> = Vec::with_capacity(def.fields.len());
        for field in &def.fields {
            let ty = self.resolve_type(&field.field_type, field.location)?;
            self.check_object_type(&ty, &field.name, field.location)?;
            if matches!(ty, Type::Array(_, 0)) {
                return Err(SemanticError::mismatch(
                    format!("field '{}' has incomplete type '{}'", field.name, ty),
                    field.location,
                ));
            }
            if fields.iter().any(|(name, _)| *name == field.name) {
                return Err(SemanticError::Redefinition {
                    name: field.name.clone(),
                    location: field.location,
                });
            }
            fields.push((field.name.clone(), ty));
        }

        let layout = StructLayout::compute(&def.name, &fields, &self.layouts);
        tracing::trace!(
            name = %def.name,
            size = layout.size,
            align = layout.align,
            "computed struct layout"
        );
        self.layouts.insert(def.name.clone(), layout);
        self.struct_order.push(def.name.clone());
        Ok(())
    }

    pub(super) fn declare_enum(&mut self, def: &mut EnumDef) -> Result<(), SemanticError> {
        if let Some(name) = &def.name {
            if !self.enums.insert(name.clone()) {
                return Err(SemanticError::Redefinition {
                    name: format!("enum {}", name),
                    location: def.location,
                });
            }
            self.enum_order.push(name.clone());
        }

        let mut next: i64 = 0;
        for enumerator in def.enumerators.iter_mut() {
            let value = match &mut enumerator.value {
                Some(expr) => {
                    self.resolve_value(expr)?;
                    const_eval::eval(expr).ok_or(SemanticError::NotConstant {
                        location: expr.location,
                    })?
                }
                None => next,
            };
            let value = IntType::INT.wrap(value);

            self.scopes.declare(
                Symbol {
                    name: enumerator.name.clone(),
                    ty: Type::INT,
                    storage: Storage::EnumConstant(value),
                    slot: None,
                },
                enumerator.location,
            )?;
            next = value.wrapping_add(1);
        }
        Ok(())
    }

    pub(super) fn declare_function(&mut self, def: &FunctionDef) -> Result<(), SemanticError> {
        let signature = self.function_signature(def)?;
        let defined = def.body.is_some();

        let existing = self
            .scopes
            .lookup_current(&def.name)
            .map(|symbol| symbol.storage.clone());
        match existing {
            Some(Storage::Function) => {
                let info = self
                    .function_index
                    .get(&def.name)
                    .and_then(|&index| self.functions.get_mut(index))
                    .ok_or_else(|| SemanticError::UndeclaredIdentifier {
                        name: def.name.clone(),
                        location: def.location,
                    })?;
                if info.signature != signature {
                    return Err(SemanticError::mismatch(
                        format!("conflicting types for '{}'", def.name),
                        def.location,
                    ));
                }
                if defined && info.defined {
                    return Err(SemanticError::Redefinition {
                        name: def.name.clone(),
                        location: def.location,
                    });
                }
                info.defined |= defined;
            }
            Some(_) => {
                return Err(SemanticError::Redefinition {
                    name: def.name.clone(),
                    location: def.location,
                })
            }
            None => {
                self.scopes.declare(
                    Symbol {
                        name: def.name.clone(),
                        ty: Type::Function(Box::new(signature.clone())),
                        storage: Storage::Function,
                        slot: None,
                    },
                    def.location,
                )?;
                self.function_index
                    .insert(def.name.clone(), self.functions.len());
                self.functions.push(FunctionInfo {
                    name: def.name.clone(),
                    signature,
                    defined,
                });
            }
        }
        Ok(())
    }

    pub(super) fn declare_global(&mut self, var: &mut VarDecl) -> Result<(), SemanticError> {
        let mut ty = self.resolve_type(&var.var_type, var.location)?;
        self.check_object_type(&ty, &var.name, var.location)?;

        let init = match &mut var.init {
            Some(init) => {
                self.resolve_initializer(init, &mut ty)?;
                Some(self.constant_initializer(init, &ty)?)
            }
            None => None,
        };

        if matches!(ty, Type::Array(_, 0)) && !var.is_extern {
            return Err(SemanticError::mismatch(
                format!("array '{}' needs an explicit size or an initializer", var.name),
                var.location,
            ));
        }

        let has_init = init.is_some();
        let existing = self
            .scopes
            .lookup_current(&var.name)
            .map(|symbol| symbol.storage.clone());
        match existing {
            Some(Storage::Global) => {
                let global = self
                    .global_index
                    .get(&var.name)
                    .and_then(|&index| self.globals.get_mut(index))
                    .ok_or_else(|| SemanticError::UndeclaredIdentifier {
                        name: var.name.clone(),
                        location: var.location,
                    })?;
                if global.ty != ty {
                    return Err(SemanticError::mismatch(
                        format!("conflicting types for '{}'", var.name),
                        var.location,
                    ));
                }
                if has_init && !self.initialized.insert(var.name.clone()) {
                    return Err(SemanticError::Redefinition {
                        name: var.name.clone(),
                        location: var.location,
                    });
                }
                if let Some(init) = init {
                    global.init = init;
                }
                if !var.is_extern || has_init {
                    global.is_extern = false;
                }
            }
            Some(_) => {
                return Err(SemanticError::Redefinition {
                    name: var.name.clone(),
                    location: var.location,
                })
            }
            None => {
                self.scopes.declare(
                    Symbol {
                        name: var.name.clone(),
                        ty: ty.clone(),
                        storage: Storage::Global,
                        slot: None,
                    },
                    var.location,
                )?;
                if has_init {
                    self.initialized.insert(var.name.clone());
                }
                self.add_global(&var.name, ty, var.is_extern && !has_init, init);
            }
        }
        Ok(())
    }

    pub(super) fn add_global(&mut self, name: &str, ty: Type, is_extern: bool, init: Option<ConstValue>) {
        self.global_index.insert(name.to_string(), self.globals.len());
        self.globals.push(GlobalInfo {
            name: name.to_string(),
            ty,
            is_extern,
            init: init.unwrap_or(ConstValue::Zero),
        });
    }

    pub(super) fn resolve_function_body(&mut self, def: &mut FunctionDef) -> Result<(), SemanticError> {
        let signature = self
            .function_index
            .get(&def.name)
            .and_then(|&index| self.functions.get(index))
            .map(|info| info.signature.clone())
            .ok_or_else(|| SemanticError::UndeclaredIdentifier {
                name: def.name.clone(),
                location: def.location,
            })?;

        self.current = FunctionContext::new(&def.name, signature.return_type.clone());
        self.scopes.push();

        for (param, ty) in def.params.iter().zip(signature.params) {
            let name = param.name.clone().unwrap_or_default();
            let slot = self.current.slots.allocate(&name, ty.clone(), true);
            self.scopes.declare(
                Symbol {
                    name,
                    ty,
                    storage: Storage::Parameter,
                    slot: Some(slot),
                },
                param.location,
            )?;
        }

        // Parameters and the outermost block share one scope
        if let Some(body) = &mut def.body {
            for stmt in body.iter_mut() {
                self.resolve_stmt(stmt)?;
            }
        }

        self.scopes.pop();
        let context = std::mem::replace(&mut self.current, FunctionContext::new("", Type::Void));
        tracing::trace!(
            function = %context.name,
            slots = context.slots.len(),
            "resolved function body"
        );
        self.slots.insert(context.name, context.slots);
        Ok(())
    }

    /// Type-check an initializer against `ty`, completing an unsized array
    /// length from the initializer.
    pub(super) fn resolve_initializer(
        &mut self,
        init: &mut Initializer,
        ty: &mut Type,
    ) -> Result<(), SemanticError> {
        match init {
            Initializer::List(items, location) => match ty {
                Type::Array(element, len) => {
                    if *len != 0 && items.len() > *len {
                        return Err(SemanticError::mismatch(
                            "excess elements in array initializer",
                            *location,
                        ));
                    }
                    for item in items.iter_mut() {
                        let mut element_ty = (**element).clone();
                        self.resolve_initializer(item, &mut element_ty)?;
                    }
                    if *len == 0 {
                        if items.is_empty() {
                            return Err(SemanticError::mismatch(
                                "zero-length array initializer",
                                *location,
                            ));
                        }
                        *len = items.len();
                    }
                    Ok(())
                }
                Type::Struct(tag) => {
                    let field_types: Vec<Type> = self
                        .layouts
                        .get(tag.as_str())
                        .map(|layout| layout.fields.iter().map(|f| f.ty.clone()).collect())
                        .unwrap_or_default();
                    if items.len() > field_types.len() {
                        return Err(SemanticError::mismatch(
                            "excess elements in struct initializer",
                            *location,
                        ));
                    }
                    for (item, mut field_ty) in items.iter_mut().zip(field_types) {
                        self.resolve_initializer(item, &mut field_ty)?;
                    }
                    Ok(())
                }
                scalar => match items.as_mut_slice() {
                    [single] => self.resolve_initializer(single, scalar),
                    [] => Err(SemanticError::mismatch("empty scalar initializer", *location)),
                    _ => Err(SemanticError::mismatch(
                        "excess elements in scalar initializer",
                        *location,
                    )),
                },
            },
            Initializer::Expr(expr) => {
                if let (Type::Array(element, len), ExprKind::StringLiteral(bytes)) =
                    (&mut *ty, &expr.kind)
                {
                    if is_char_like(element) {
                        if *len == 0 {
                            *len = bytes.len() + 1;
                        } else if bytes.len() > *len {
                            return Err(SemanticError::mismatch(
                                "initializer-string for char array is too long",
                                expr.location,
                            ));
                        }
                        expr.ty = Some(Type::Array(element.clone(), *len));
                        return Ok(());
                    }
                }
                if ty.is_array() {
                    return Err(SemanticError::mismatch(
                        "array initializer must be an initializer list",
                        expr.location,
                    ));
                }

                self.resolve_value(expr)?;
                self.assign_convert(expr, ty, "initialization")
            }
        }
    }

    /// Fold a resolved global initializer to its constant value.
    fn constant_initializer(&self, init: &Initializer, ty: &Type) -> Result<ConstValue, SemanticError> {
        match init {
            Initializer::List(items, _) => match ty {
                Type::Array(element, len) => {
                    let mut values = items
                        .iter()
                        .map(|item| self.constant_initializer(item, element))
                        .collect::<Result<Vec<_>, _>>()?;
                    values.resize(*len, ConstValue::Zero);
                    Ok(ConstValue::Array(values))
                }
                Type::Struct(tag) => {
                    let field_types: Vec<&Type> = self
                        .layouts
                        .get(tag.as_str())
                        .map(|layout| layout.fields.iter().map(|f| &f.ty).collect())
                        .unwrap_or_default();
                    let mut values = items
                        .iter()
                        .zip(&field_types)
                        .map(|(item, field_ty)| self.constant_initializer(item, field_ty))
                        .collect::<Result<Vec<_>, _>>()?;
                    values.resize(field_types.len(), ConstValue::Zero);
                    Ok(ConstValue::Struct(values))
                }
                _ => match items.first() {
                    Some(item) => self.constant_initializer(item, ty),
                    None => Ok(ConstValue::Zero),
                },
            },
            Initializer::Expr(expr) => {
                let not_constant = SemanticError::NotConstant {
                    location: expr.location,
                };
                match (ty, &expr.kind) {
                    (Type::Array(..), ExprKind::StringLiteral(bytes)) => {
                        Ok(ConstValue::Bytes(bytes.clone()))
                    }
                    (Type::Pointer(_), _) => const_eval::address(expr, &self.layouts).ok_or(not_constant),
                    (Type::Struct(_), _) => Err(not_constant),
                    _ => const_eval::eval(expr).map(ConstValue::Int).ok_or(not_constant),
                }
            }
        }
    }
}
