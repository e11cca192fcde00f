use thiserror::Error;

/// Failure kinds of a translation pass.
///
/// Kinds raised while handling a line are wrapped in
/// [`Error::Line`](crate::Error::Line) together with the offending text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum TranslateError {
    #[error("syntax error: {0}")]
    SyntaxError(String),

    #[error("undefined variable: {0}")]
    UndefinedVariable(String),

    #[error("invalid expression: {0}")]
    InvalidExpression(String),

    #[error("type mismatch: cannot apply '{operation}' to {found}")]
    TypeMismatch {
        operation: &'static str,
        found: &'static str,
    },

    #[error("structural error: {0}")]
    StructuralError(String),

    #[error("variable already declared: {0}")]
    DuplicateVariable(String),

    #[error("integer overflow in: {0}")]
    Overflow(String),

    #[error("serialization error: {0}")]
    SerializationError(String),
}
