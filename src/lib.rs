//! # Introduction
//!
//! badaclang compiles a subset of C to textual LLVM IR. The resulting `.ll`
//! file is turned into an executable by an unmodified `clang`:
//!
//! ```text
//! badaclang prog.c -o prog.ll && clang prog.ll -o prog
//! ```
//!
//! ## Compilation pipeline
//!
//! ```text
//! Source → Lexer → Parser → AST → Resolver → IR Generator → .ll
//! ```
//!
//! 1. [`parser`]: tokenises the source (expanding object-like macros) and
//!    builds an AST.
//! 2. [`sema`]: binds identifiers, computes struct layouts and enum values,
//!    types every expression and makes implicit conversions explicit.
//! 3. [`memory`]: sizes, alignments, struct layouts and per-function slots
//!    shared by the resolver and the generator.
//! 4. [`codegen`]: lowers the annotated AST to an [`codegen::ir::Module`].
//! 5. [`driver`]: runs the stages and reports the first diagnostic.
//!
//! ## Supported C subset
//!
//! Types: `char`, `short`, `int`, `long` (signed and unsigned), `void`,
//! enums, structs, pointers, arrays.
//! Control flow: `if/else`, `while`, `do-while`, `for`, `switch/case`,
//! `break`, `continue`, `return`.
//! Calls to `extern` functions, including variadic ones such as `printf`.

pub mod codegen;
pub mod driver;
pub mod logger;
pub mod memory;
pub mod parser;
pub mod sema;
pub mod types;

pub use driver::{compile_file, compile_source, render_diagnostic, CompileError, CompileOptions};
