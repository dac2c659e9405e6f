//! Semantic types
//!
//! [`Type`] is what the resolver attaches to every expression. It differs from
//! the parser's syntactic [`TypeName`](crate::parser::ast::TypeName): struct and
//! enum names are checked, array parameters are adjusted to pointers, and the
//! integer specifier soup (`unsigned long int`, ...) collapses to an
//! [`IntType`].
//!
//! The conversion rules used by the resolver (integer promotion, the usual
//! arithmetic conversions, default argument promotion) live here too.

use std::fmt;

/// Fixed-width integer: width in bits and signedness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IntType {
    pub bits: u32,
    pub signed: bool,
}

impl IntType {
    pub const CHAR: IntType = IntType::signed(8);
    pub const SHORT: IntType = IntType::signed(16);
    pub const INT: IntType = IntType::signed(32);
    pub const UINT: IntType = IntType::unsigned(32);
    pub const LONG: IntType = IntType::signed(64);
    pub const ULONG: IntType = IntType::unsigned(64);

    pub const fn signed(bits: u32) -> Self {
        Self { bits, signed: true }
    }

    pub const fn unsigned(bits: u32) -> Self {
        Self {
            bits,
            signed: false,
        }
    }

    /// Integer promotion: anything narrower than `int` becomes `int`.
    pub fn promote(self) -> Self {
        if self.bits < 32 {
            IntType::INT
        } else {
            self
        }
    }

    /// Truncate/extend `value` to this width, honouring signedness.
    pub fn wrap(self, value: i64) -> i64 {
        if self.bits >= 64 {
            return value;
        }
        let shift = 64 - self.bits;
        if self.signed {
            (value << shift) >> shift
        } else {
            ((value as u64) << shift >> shift) as i64
        }
    }
}

/// A function's signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionType {
    pub return_type: Type,
    pub params: Vec<Type>,
    pub variadic: bool,
}

/// Resolved C type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    Void,
    /// Plain `char`: 8 bits, signed on every target this compiler emits for.
    Char,
    Int(IntType),
    Pointer(Box<Type>),
    Array(Box<Type>, usize),
    Struct(String),
    /// Enums are backed by `int`.
    Enum(String),
    Function(Box<FunctionType>),
}

impl Type {
    pub const INT: Type = Type::Int(IntType::INT);
    pub const LONG: Type = Type::Int(IntType::LONG);

    pub fn pointer_to(self) -> Type {
        Type::Pointer(Box::new(self))
    }

    pub fn array_of(self, len: usize) -> Type {
        Type::Array(Box::new(self), len)
    }

    /// Width/signedness of an integer-like type (`char`, integers, enums).
    pub fn int_type(&self) -> Option<IntType> {
        match self {
            Type::Char => Some(IntType::CHAR),
            Type::Int(it) => Some(*it),
            Type::Enum(_) => Some(IntType::INT),
            _ => None,
        }
    }

    pub fn is_integer(&self) -> bool {
        self.int_type().is_some()
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self, Type::Pointer(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Type::Array(..))
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Type::Void)
    }

    /// Integers and pointers: the types usable as conditions.
    pub fn is_scalar(&self) -> bool {
        self.is_integer() || self.is_pointer()
    }

    /// Pointee of a pointer, or element of an array.
    pub fn pointee(&self) -> Option<&Type> {
        match self {
            Type::Pointer(inner) | Type::Array(inner, _) => Some(inner),
            _ => None,
        }
    }

    /// Array-to-pointer decay; other types are returned unchanged.
    pub fn decay(&self) -> Type {
        match self {
            Type::Array(element, _) => Type::Pointer(element.clone()),
            other => other.clone(),
        }
    }

    /// Default argument promotion for variadic trailing arguments.
    pub fn default_promotion(&self) -> Type {
        match self.int_type() {
            Some(it) => Type::Int(it.promote()),
            None => self.decay(),
        }
    }
}

/// The usual arithmetic conversions for two integer operands.
pub fn usual_arithmetic(a: IntType, b: IntType) -> IntType {
    let (a, b) = (a.promote(), b.promote());
    if a == b {
        return a;
    }
    if a.signed == b.signed {
        return if a.bits >= b.bits { a } else { b };
    }

    let (unsigned, signed) = if a.signed { (b, a) } else { (a, b) };
    if unsigned.bits >= signed.bits {
        unsigned
    } else {
        // The wider signed type represents every value of the unsigned one.
        signed
    }
}

impl fmt::Display for IntType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.signed {
            write!(f, "unsigned ")?;
        }
        match self.bits {
            8 => write!(f, "char"),
            16 => write!(f, "short"),
            32 => write!(f, "int"),
            _ => write!(f, "long"),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Void => write!(f, "void"),
            Type::Char => write!(f, "char"),
            Type::Int(it) => write!(f, "{}", it),
            Type::Pointer(inner) => write!(f, "{}*", inner),
            Type::Array(inner, len) => write!(f, "{}[{}]", inner, len),
            Type::Struct(name) => write!(f, "struct {}", name),
            Type::Enum(name) => write!(f, "enum {}", name),
            Type::Function(func) => {
                write!(f, "{}(", func.return_type)?;
                for (i, param) in func.params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", param)?;
                }
                if func.variadic {
                    if !func.params.is_empty() {
                        write!(f, ", ")?;
                    }
                    write!(f, "...")?;
                }
                write!(f, ")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usual_arithmetic_conversions() {
        assert_eq!(usual_arithmetic(IntType::CHAR, IntType::CHAR), IntType::INT);
        assert_eq!(usual_arithmetic(IntType::INT, IntType::LONG), IntType::LONG);
        assert_eq!(usual_arithmetic(IntType::INT, IntType::UINT), IntType::UINT);
        assert_eq!(usual_arithmetic(IntType::UINT, IntType::LONG), IntType::LONG);
        assert_eq!(usual_arithmetic(IntType::ULONG, IntType::LONG), IntType::ULONG);
        assert_eq!(usual_arithmetic(IntType::SHORT, IntType::UINT), IntType::UINT);
    }

    #[test]
    fn test_wrap() {
        assert_eq!(IntType::CHAR.wrap(0x178), 0x78);
        assert_eq!(IntType::CHAR.wrap(0xff), -1);
        assert_eq!(IntType::unsigned(8).wrap(-1), 255);
        assert_eq!(IntType::INT.wrap(0x1_0000_0001), 1);
    }

    #[test]
    fn test_decay_and_promotion() {
        let array = Type::Char.array_of(4);
        assert_eq!(array.decay(), Type::Char.pointer_to());
        assert_eq!(Type::Char.default_promotion(), Type::INT);
        assert_eq!(Type::Enum("e".into()).default_promotion(), Type::INT);
        assert_eq!(Type::LONG.default_promotion(), Type::LONG);
    }

    #[test]
    fn test_display() {
        let ty = Type::Char.pointer_to().pointer_to();
        assert_eq!(ty.to_string(), "char**");
        assert_eq!(Type::Int(IntType::UINT).to_string(), "unsigned int");
    }
}
