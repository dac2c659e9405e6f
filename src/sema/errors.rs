//! Semantic error types
//!
//! Every failure the resolver can report is one variant of
//! [`SemanticError`]; each carries the source location it points at.

use crate::parser::ast::SourceLocation;
use thiserror::Error;

fn at_least(variadic: &bool) -> &'static str {
    if *variadic {
        "at least "
    } else {
        ""
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SemanticError {
    #[error("use of undeclared identifier '{name}'")]
    UndeclaredIdentifier {
        name: String,
        location: SourceLocation,
    },

    #[error("redefinition of '{name}'")]
    Redefinition {
        name: String,
        location: SourceLocation,
    },

    #[error("{message}")]
    TypeMismatch {
        message: String,
        location: SourceLocation,
    },

    #[error("no member named '{field}' in 'struct {struct_name}'")]
    UnknownField {
        struct_name: String,
        field: String,
        location: SourceLocation,
    },

    #[error(
        "function '{function}' expects {}{expected} argument(s), found {found}",
        at_least(.variadic)
    )]
    ArgumentCount {
        function: String,
        expected: usize,
        found: usize,
        variadic: bool,
        location: SourceLocation,
    },

    #[error("expression is not assignable")]
    NotAnLvalue { location: SourceLocation },

    #[error("'{keyword}' statement not in loop or switch statement")]
    MisplacedJump {
        keyword: &'static str,
        location: SourceLocation,
    },

    #[error("expression is not an integer constant expression")]
    NotConstant { location: SourceLocation },

    #[error("duplicate case value '{value}'")]
    DuplicateCase {
        value: i64,
        location: SourceLocation,
    },
}

impl SemanticError {
    pub fn location(&self) -> SourceLocation {
        match self {
            SemanticError::UndeclaredIdentifier { location, .. }
            | SemanticError::Redefinition { location, .. }
            | SemanticError::TypeMismatch { location, .. }
            | SemanticError::UnknownField { location, .. }
            | SemanticError::ArgumentCount { location, .. }
            | SemanticError::NotAnLvalue { location }
            | SemanticError::MisplacedJump { location, .. }
            | SemanticError::NotConstant { location }
            | SemanticError::DuplicateCase { location, .. } => *location,
        }
    }

    pub(crate) fn mismatch(message: impl Into<String>, location: SourceLocation) -> Self {
        SemanticError::TypeMismatch {
            message: message.into(),
            location,
        }
    }
}
