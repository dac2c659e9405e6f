//! Compilation pipeline
//!
//! Runs lexer, parser, resolver and IR generator in sequence. The first
//! diagnostic from any stage ends compilation; nothing is written on failure.

use crate::codegen::{self, ir, CodegenError};
use crate::parser::ast::SourceLocation;
use crate::parser::lexer::{LexError, Lexer};
use crate::parser::parse::{ParseError, Parser};
use crate::sema::{self, SemanticError};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompileError {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Semantic(#[from] SemanticError),

    #[error(transparent)]
    Codegen(#[from] CodegenError),

    #[error("cannot access '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CompileError {
    /// Source position of a diagnostic; `None` for I/O failures.
    pub fn location(&self) -> Option<SourceLocation> {
        match self {
            CompileError::Lex(err) => Some(err.location),
            CompileError::Parse(err) => Some(err.location),
            CompileError::Semantic(err) => Some(err.location()),
            CompileError::Codegen(err) => Some(err.location()),
            CompileError::Io { .. } => None,
        }
    }
}

/// Options for one compilation.
#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    /// Name recorded as the module's `source_filename`.
    pub module_name: String,
}

impl CompileOptions {
    pub fn new(module_name: impl Into<String>) -> Self {
        CompileOptions {
            module_name: module_name.into(),
        }
    }
}

/// Compile C source text to an IR module.
pub fn compile_source(source: &str, options: &CompileOptions) -> Result<ir::Module, CompileError> {
    let tokens = Lexer::new(source).tokenize()?;
    tracing::debug!(tokens = tokens.len(), "lexed source");

    let mut program = Parser::from_tokens(tokens).parse_program()?;
    tracing::debug!(declarations = program.declarations.len(), "parsed program");

    let resolution = sema::resolve(&mut program)?;
    let module = codegen::generate(&program, &resolution, &options.module_name)?;
    Ok(module)
}

/// Compile `input` and write the IR text to `output`.
pub fn compile_file(input: &Path, output: &Path, options: &CompileOptions) -> Result<(), CompileError> {
    let source = fs::read_to_string(input).map_err(|source| CompileError::Io {
        path: input.to_path_buf(),
        source,
    })?;

    let module = compile_source(&source, options)?;
    fs::write(output, module.to_string()).map_err(|source| CompileError::Io {
        path: output.to_path_buf(),
        source,
    })?;
    tracing::info!(input = %input.display(), output = %output.display(), "wrote module");
    Ok(())
}

/// `FILE:LINE:COL: error: MESSAGE`, or `FILE: error: MESSAGE` without a
/// source position.
pub fn render_diagnostic(path: &Path, err: &CompileError) -> String {
    match err.location() {
        Some(location) => format!("{}:{}: error: {}", path.display(), location, err),
        None => format!("{}: error: {}", path.display(), err),
    }
}

/// Default output path: the input with its extension replaced by `.ll`.
pub fn default_output(input: &Path) -> PathBuf {
    input.with_extension("ll")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> CompileOptions {
        CompileOptions::new("test.c")
    }

    #[test]
    fn test_lex_error_is_reported_as_lex() {
        let err = compile_source("int main() { return 0 @ 1; }", &options()).unwrap_err();
        assert!(matches!(err, CompileError::Lex(_)));
        assert_eq!(err.location(), Some(SourceLocation::new(1, 23)));
    }

    #[test]
    fn test_parse_error_is_reported_as_parse() {
        let err = compile_source("int main() { return 0 }", &options()).unwrap_err();
        assert!(matches!(err, CompileError::Parse(_)));
    }

    #[test]
    fn test_semantic_error_is_reported_as_semantic() {
        let err = compile_source("int main() { return y; }", &options()).unwrap_err();
        assert!(matches!(err, CompileError::Semantic(_)));
    }

    #[test]
    fn test_render_diagnostic() {
        let err = compile_source("int main() {\n  return y;\n}", &options()).unwrap_err();
        assert_eq!(
            render_diagnostic(Path::new("prog.c"), &err),
            "prog.c:2:10: error: use of undeclared identifier 'y'"
        );
    }

    #[test]
    fn test_default_output() {
        assert_eq!(default_output(Path::new("dir/prog.c")), PathBuf::from("dir/prog.ll"));
    }

    #[test]
    fn test_missing_input_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = compile_file(&dir.path().join("nope.c"), &dir.path().join("nope.ll"), &options())
            .unwrap_err();
        assert!(matches!(err, CompileError::Io { .. }));
        assert!(err.location().is_none());
    }
}
