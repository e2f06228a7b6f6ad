//! Errors raised while translating a predicate

use thiserror::Error;

/// Errors that can occur while turning a predicate into XPath
#[derive(Error, Debug)]
pub enum WherepathError {
    /// An operand could not be read as the literal type the condition needs,
    /// e.g. a non-numeric position.
    #[error("malformed {what}: {value:?}")]
    MalformedOperand { what: &'static str, value: String },
    /// A conjunct that no rule understands (only reported in strict mode).
    #[error("unsupported predicate: {0}")]
    UnsupportedPredicate(String),
    #[error("parse error at position {position}: {message}")]
    Parse { message: String, position: usize },
    #[error("unbound variable '{0}'")]
    UnboundVariable(String),
    #[error("invalid predicate JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl WherepathError {
    pub(crate) fn malformed(what: &'static str, value: impl Into<String>) -> Self {
        WherepathError::MalformedOperand { what, value: value.into() }
    }
}
