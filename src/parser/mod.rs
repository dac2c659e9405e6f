//! C source code parser
//!
//! This module transforms C source text into an Abstract Syntax Tree (AST):
//! - [`lexer`]: Tokenization (source text → tokens), including object-like macros
//! - [`parse`]: The [`Parser`](parse::Parser) and its error type
//! - [`ast`]: AST node definitions
//!
//! # Supported C Subset
//!
//! - Types: `char`, `short`, `int`, `long` (signed and unsigned), `void`,
//!   structs, enums, pointers, arrays
//! - Statements: declarations, expressions, `if`, `while`, `do`, `for`,
//!   `switch`, `return`, `break`, `continue`
//! - Expressions: arithmetic, logical, bitwise, ternary, casts, `sizeof`,
//!   calls to named functions
//! - Preprocessor: `#define NAME tokens` and `#undef`; every other directive
//!   line (such as `#include`) is skipped
//! - No typedefs, unions, floating point, or function pointers
//!
//! # Parser Implementation
//!
//! Hand-written recursive descent parser with precedence climbing for binary operators.
//! No external parser generator dependencies.

pub mod ast;
mod declarations;
mod expressions;
pub mod lexer;
pub mod parse;
mod statements;
