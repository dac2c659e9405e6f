//! Memory model shared by the resolver and the IR generator
//!
//! This module provides the byte-level view of C objects:
//! - [`layout`]: Struct layouts (field offsets, size, alignment)
//! - [`slots`]: Per-function storage slots for parameters and locals
//!
//! # Type Sizes
//!
//! Sizes follow the LP64 data model of the targets clang links for:
//! - `char`: 1 byte, `short`: 2, `int`/`enum`: 4, `long`: 8
//! - `pointer`: 8 bytes (regardless of pointee type)
//! - `struct`: fields at their natural alignment, size rounded up to the
//!   largest field alignment
//!
//! # Pointer Arithmetic
//!
//! Pointer arithmetic is scaled by pointee size:
//! ```text
//! ptr + n  →  ptr + (n * sizeof(*ptr))
//! ```
//!
//! [`element_size`] gives the scale; `void*` steps by one byte.

pub mod layout;
pub mod slots;

use crate::types::Type;
use layout::Layouts;

pub const POINTER_SIZE: usize = 8;

/// Calculate the size of a type in bytes
pub fn sizeof_type(t: &Type, layouts: &Layouts) -> usize {
    match t {
        Type::Char => 1,
        Type::Int(it) => (it.bits / 8) as usize,
        Type::Enum(_) => 4,
        Type::Pointer(_) => POINTER_SIZE,
        Type::Array(element, len) => sizeof_type(element, layouts) * len,
        Type::Struct(name) => layouts.get(name).map_or(0, |l| l.size),
        // GNU C treats these as one byte wide
        Type::Void | Type::Function(_) => 1,
    }
}

/// Calculate the alignment of a type in bytes
pub fn alignof_type(t: &Type, layouts: &Layouts) -> usize {
    match t {
        Type::Array(element, _) => alignof_type(element, layouts),
        Type::Struct(name) => layouts.get(name).map_or(1, |l| l.align),
        other => sizeof_type(other, layouts),
    }
}

/// Scale for pointer arithmetic on a pointer to (or array of) `pointee`.
pub fn element_size(pointee: &Type, layouts: &Layouts) -> usize {
    sizeof_type(pointee, layouts).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::IntType;

    #[test]
    fn test_scalar_sizes() {
        let layouts = Layouts::default();
        assert_eq!(sizeof_type(&Type::Char, &layouts), 1);
        assert_eq!(sizeof_type(&Type::Int(IntType::SHORT), &layouts), 2);
        assert_eq!(sizeof_type(&Type::INT, &layouts), 4);
        assert_eq!(sizeof_type(&Type::LONG, &layouts), 8);
        assert_eq!(sizeof_type(&Type::Char.pointer_to(), &layouts), 8);
        assert_eq!(sizeof_type(&Type::Enum("e".into()), &layouts), 4);
    }

    #[test]
    fn test_array_sizes() {
        let layouts = Layouts::default();
        let grid = Type::INT.array_of(3).array_of(2);
        assert_eq!(sizeof_type(&grid, &layouts), 24);
        assert_eq!(alignof_type(&grid, &layouts), 4);
    }

    #[test]
    fn test_void_pointer_steps_one_byte() {
        let layouts = Layouts::default();
        assert_eq!(element_size(&Type::Void, &layouts), 1);
    }
}
