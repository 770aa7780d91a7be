//! Error types for protocol values.

use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors raised while building protocol values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// A record selector expression could not be parsed.
    #[error("invalid record selector {expression:?}: {reason}")]
    InvalidSelector {
        /// The rejected expression.
        expression: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A schema type name is not one of the supported JSON types.
    #[error("unknown field type: {0}")]
    UnknownFieldType(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ProtocolError::InvalidSelector {
            expression: "plugins".into(),
            reason: "must start with '$'".into(),
        };
        assert!(err.to_string().contains("plugins"));
        assert!(err.to_string().contains("must start with"));

        let err = ProtocolError::UnknownFieldType("date".into());
        assert_eq!(err.to_string(), "unknown field type: date");
    }
}
