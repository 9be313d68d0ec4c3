//! Error types for the migration engine.

use schemaforge_core::error::SchemaError;

use crate::dialect::Dialect;
use crate::operations::MigrationOperation;

/// Errors that can occur while diffing, generating, inspecting, or applying.
#[derive(Debug, thiserror::Error)]
pub enum MigrateError {
    /// The inspector could not read the database catalog.
    #[error("catalog query failed on {dialect}: {detail}")]
    CatalogQueryFailed {
        /// Dialect whose catalog was being read.
        dialect: Dialect,
        /// Underlying error text.
        detail: String,
    },

    /// A type translator has no mapping for a portable type variant.
    #[error("type {variant} is not supported on {dialect}")]
    UnsupportedType {
        /// Dialect missing the mapping.
        dialect: Dialect,
        /// Variant name of the unsupported portable type.
        variant: String,
    },

    /// A declared schema violates a structural invariant.
    #[error("invalid schema: {reason} (at {location})")]
    InvalidSchema {
        /// What is wrong.
        reason: String,
        /// Where it is wrong.
        location: String,
    },

    /// Policy rejected a plan containing destructive operations.
    #[error("plan contains {} destructive operation(s) and allow_destructive is off", .operations.len())]
    DestructiveDenied {
        /// The offending operations, so the caller can prompt or opt in.
        operations: Vec<MigrationOperation>,
    },

    /// A statement failed at the database.
    #[error("operation {operation_index} failed: {detail}\n  ddl: {ddl_text}")]
    ExecutionFailed {
        /// Index of the failed operation within the plan.
        operation_index: usize,
        /// The DDL text that failed.
        ddl_text: String,
        /// Underlying error text.
        detail: String,
    },

    /// Cancellation was observed between operations.
    #[error("migration cancelled")]
    Cancelled,

    /// Database driver error outside the execution loop.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Driver-level failure on a connection the engine does not manage
    /// through sqlx.
    #[error("connection error on {dialect}: {detail}")]
    ConnectionFailed {
        /// Dialect of the failing connection.
        dialect: Dialect,
        /// Underlying error text.
        detail: String,
    },

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<SchemaError> for MigrateError {
    fn from(err: SchemaError) -> Self {
        match err {
            SchemaError::Invalid { reason, location } => Self::InvalidSchema { reason, location },
            other => Self::InvalidSchema {
                reason: other.to_string(),
                location: String::new(),
            },
        }
    }
}

/// Result type for migration operations.
pub type Result<T> = std::result::Result<T, MigrateError>;
