//! IR generation errors
//!
//! The generator only sees trees the resolver accepted, so these report
//! broken resolver annotations rather than problems in the user's program.

use crate::parser::ast::SourceLocation;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodegenError {
    #[error("internal compiler error: {message}")]
    Internal {
        message: String,
        location: SourceLocation,
    },
}

impl CodegenError {
    pub fn location(&self) -> SourceLocation {
        match self {
            CodegenError::Internal { location, .. } => *location,
        }
    }

    pub(crate) fn internal(message: impl Into<String>, location: SourceLocation) -> Self {
        CodegenError::Internal {
            message: message.into(),
            location,
        }
    }
}
