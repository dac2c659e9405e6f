//! Module-level data: struct types, globals, declarations, string literals

use super::ir::{self, Constant, IrType, StringConstant};
use super::ir_type;
use crate::memory::alignof_type;
use crate::memory::layout::{Layouts, Member};
use crate::sema::{ConstValue, FunctionInfo, GlobalInfo, Resolution};
use crate::types::Type;
use rustc_hash::FxHashMap;

/// Interned string literals, named `.str.N` in first-use order.
#[derive(Debug, Default)]
pub(crate) struct StringPool {
    index: FxHashMap<Vec<u8>, String>,
    constants: Vec<StringConstant>,
}

impl StringPool {
    /// Name of the constant holding `bytes` plus a terminating NUL.
    pub(crate) fn intern(&mut self, bytes: &[u8]) -> String {
        if let Some(name) = self.index.get(bytes) {
            return name.clone();
        }
        let name = format!(".str.{}", self.constants.len());
        self.index.insert(bytes.to_vec(), name.clone());
        self.constants.push(StringConstant {
            name: name.clone(),
            bytes: bytes.to_vec(),
        });
        name
    }

    pub(crate) fn into_constants(self) -> Vec<StringConstant> {
        self.constants
    }
}

/// Packed element list of a struct: fields with explicit padding arrays.
pub(crate) fn struct_elements(name: &str, layouts: &Layouts) -> Vec<IrType> {
    let Some(layout) = layouts.get(name) else {
        return Vec::new();
    };
    layout
        .members(layouts)
        .into_iter()
        .map(|member| match member {
            Member::Field(field) => ir_type(&field.ty),
            Member::Padding(n) => IrType::Array(Box::new(IrType::I8), n),
        })
        .collect()
}

pub(crate) fn struct_types(resolution: &Resolution) -> Vec<(String, Vec<IrType>)> {
    resolution
        .struct_order
        .iter()
        .map(|name| (name.clone(), struct_elements(name, &resolution.layouts)))
        .collect()
}

pub(crate) fn declaration(info: &FunctionInfo) -> ir::Declaration {
    ir::Declaration {
        name: info.name.clone(),
        return_type: ir_type(&info.signature.return_type),
        params: info.signature.params.iter().map(ir_type).collect(),
        variadic: info.signature.variadic,
    }
}

pub(crate) fn global(info: &GlobalInfo, layouts: &Layouts, strings: &mut StringPool) -> ir::Global {
    let init = if info.is_extern {
        None
    } else {
        Some(constant(&info.init, &info.ty, layouts, strings))
    };
    ir::Global {
        name: info.name.clone(),
        ty: ir_type(&info.ty),
        init,
        align: alignof_type(&info.ty, layouts),
    }
}

/// Lower a folded initializer of type `ty`.
fn constant(value: &ConstValue, ty: &Type, layouts: &Layouts, strings: &mut StringPool) -> Constant {
    match value {
        ConstValue::Zero => match ty {
            Type::Pointer(_) => Constant::Null,
            _ if ty.is_integer() => Constant::Int(0),
            _ => Constant::Zero,
        },
        ConstValue::Int(n) => Constant::Int(*n),
        ConstValue::Null => Constant::Null,
        ConstValue::Bytes(bytes) => {
            let mut bytes = bytes.clone();
            if let Type::Array(_, len) = ty {
                bytes.resize(*len, 0);
            }
            Constant::Bytes(bytes)
        }
        ConstValue::StringRef(bytes) => Constant::Global(strings.intern(bytes)),
        ConstValue::Address(name, 0) => Constant::Global(name.clone()),
        ConstValue::Address(name, offset) => Constant::GlobalOffset(name.clone(), *offset),
        ConstValue::Array(items) => {
            let element = ty.pointee().cloned().unwrap_or(Type::Void);
            Constant::Array(
                items
                    .iter()
                    .map(|item| (ir_type(&element), constant(item, &element, layouts, strings)))
                    .collect(),
            )
        }
        ConstValue::Struct(items) => {
            let Type::Struct(name) = ty else {
                return Constant::Zero;
            };
            let Some(layout) = layouts.get(name) else {
                return Constant::Zero;
            };
            let mut items = items.iter();
            let elements = layout
                .members(layouts)
                .into_iter()
                .map(|member| match member {
                    Member::Field(field) => {
                        let value = items.next().unwrap_or(&ConstValue::Zero);
                        (ir_type(&field.ty), constant(value, &field.ty, layouts, strings))
                    }
                    Member::Padding(n) => (IrType::Array(Box::new(IrType::I8), n), Constant::Zero),
                })
                .collect();
            Constant::Struct(elements)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_pool_deduplicates() {
        let mut pool = StringPool::default();
        assert_eq!(pool.intern(b"a"), ".str.0");
        assert_eq!(pool.intern(b"b"), ".str.1");
        assert_eq!(pool.intern(b"a"), ".str.0");
        assert_eq!(pool.into_constants().len(), 2);
    }

    #[test]
    fn test_char_array_bytes_are_padded() {
        let mut pool = StringPool::default();
        let value = constant(
            &ConstValue::Bytes(b"ab".to_vec()),
            &Type::Char.array_of(4),
            &Layouts::default(),
            &mut pool,
        );
        assert_eq!(value, Constant::Bytes(b"ab\0\0".to_vec()));
    }

    #[test]
    fn test_address_with_offset_is_constant_gep() {
        let mut pool = StringPool::default();
        let layouts = Layouts::default();
        let ptr = Type::INT.pointer_to();
        assert_eq!(
            constant(&ConstValue::Address("a".into(), 0), &ptr, &layouts, &mut pool),
            Constant::Global("a".into())
        );
        let value = constant(&ConstValue::Address("a".into(), 8), &ptr, &layouts, &mut pool);
        assert_eq!(value.to_string(), "getelementptr inbounds (i8, ptr @a, i64 8)");
    }

    #[test]
    fn test_extern_global_has_no_initializer() {
        let info = GlobalInfo {
            name: "errno".into(),
            ty: Type::INT,
            is_extern: true,
            init: ConstValue::Zero,
        };
        let global = global(&info, &Layouts::default(), &mut StringPool::default());
        assert_eq!(global.to_string(), "@errno = external global i32, align 4\n");
    }
}
