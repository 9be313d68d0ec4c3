//! Error types for the portable schema model.

/// Errors produced while building, validating, or deserializing a schema.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    /// A declared schema violates a structural invariant.
    #[error("invalid schema: {reason} (at {location})")]
    Invalid {
        /// What is wrong.
        reason: String,
        /// Where it is wrong, e.g. `users.email` or `users#idx_email`.
        location: String,
    },

    /// A serialized type carried a kind this model does not know.
    #[error("unknown portable type kind '{kind}'")]
    UnknownTypeKind {
        /// The unrecognized kind tag.
        kind: String,
    },

    /// A serialized type carried parameters that do not fit its kind.
    #[error("invalid parameters for type '{kind}': {reason}")]
    InvalidTypeParams {
        /// The kind tag the parameters were given for.
        kind: String,
        /// Why the parameters were rejected.
        reason: String,
    },
}

/// Result type for schema model operations.
pub type Result<T> = std::result::Result<T, SchemaError>;
