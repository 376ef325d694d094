//! Translation and invocation error types
//!
//! This module defines [`TranslateError`], which represents all errors that
//! can occur while lowering a function or invoking a translated one (as
//! opposed to parse errors, which carry their own type and are wrapped here
//! at the session boundary).

use crate::parser::parser::ParseError;
use std::fmt;

/// Errors raised by translation and invocation.
#[derive(Debug, Clone)]
pub enum TranslateError {
    /// Source text failed to parse
    Parse(ParseError),

    /// The requested function is not declared anywhere in the session
    NotFound { name: String },

    /// An identifier in a function body resolves to nothing
    UnresolvedIdentifier { name: String, func: String },

    /// The construct is recognized but deliberately not translated
    UnsupportedConstruct { construct: String, func: String },

    /// A type-level inconsistency in the source being lowered
    TypeMismatch { message: String, func: String },

    /// Member access names a field the record does not have
    MissingField {
        record: String,
        field: String,
        func: String,
    },

    /// The function is declared but its definition has not been seen
    NotAvailable { name: String },

    /// Call-site argument count does not match the declaration
    ArityMismatch {
        func: String,
        expected: usize,
        got: usize,
    },

    /// A host argument cannot be converted to the parameter's type
    ArgumentCoercion {
        func: String,
        index: usize,
        message: String,
    },

    /// A function required its own translation to finish first
    CyclicTranslation { name: String },

    /// Argument buffer arena exhausted
    OutOfMemory { requested: usize, limit: usize },

    /// Failure while executing a translated body
    Evaluation { message: String },
}

impl fmt::Display for TranslateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TranslateError::Parse(err) => write!(f, "{}", err),
            TranslateError::NotFound { name } => {
                write!(f, "function '{}' is not declared", name)
            }
            TranslateError::UnresolvedIdentifier { name, func } => {
                write!(f, "in '{}': identifier '{}' does not resolve", func, name)
            }
            TranslateError::UnsupportedConstruct { construct, func } => {
                write!(f, "in '{}': {} is not supported", func, construct)
            }
            TranslateError::TypeMismatch { message, func } => {
                write!(f, "in '{}': {}", func, message)
            }
            TranslateError::MissingField {
                record,
                field,
                func,
            } => {
                write!(f, "in '{}': {} has no field '{}'", func, record, field)
            }
            TranslateError::NotAvailable { name } => {
                write!(f, "function '{}' is declared but not yet available", name)
            }
            TranslateError::ArityMismatch {
                func,
                expected,
                got,
            } => {
                write!(
                    f,
                    "'{}' takes {} argument(s), {} given",
                    func, expected, got
                )
            }
            TranslateError::ArgumentCoercion {
                func,
                index,
                message,
            } => {
                write!(f, "'{}' argument {}: {}", func, index, message)
            }
            TranslateError::CyclicTranslation { name } => {
                write!(f, "translation of '{}' depends on itself", name)
            }
            TranslateError::OutOfMemory { requested, limit } => {
                write!(
                    f,
                    "argument buffer of {} bytes exceeds the {} byte arena",
                    requested, limit
                )
            }
            TranslateError::Evaluation { message } => {
                write!(f, "evaluation failed: {}", message)
            }
        }
    }
}

impl std::error::Error for TranslateError {}

impl From<ParseError> for TranslateError {
    fn from(err: ParseError) -> Self {
        TranslateError::Parse(err)
    }
}
