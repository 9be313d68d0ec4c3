//! # schemaforge-core
//!
//! The portable schema model: dialect-neutral value types describing tables,
//! columns, keys, indices, constraints, types, and defaults.
//!
//! This crate is deliberately I/O-free. Schemas are immutable values built
//! through chained builders:
//!
//! ```rust
//! use schemaforge_core::prelude::*;
//!
//! let schema = Schema::new("app").table(
//!     Table::new("users")
//!         .column(Column::new("id", PortableType::Uuid).not_null())
//!         .column(
//!             Column::new("email", PortableType::VarChar { max_length: 255 })
//!                 .not_null(),
//!         )
//!         .column(
//!             Column::new("created_at", PortableType::DateTime { precision: 6 })
//!                 .default_portable("now()"),
//!         )
//!         .primary_key(PrimaryKey::new(vec!["id".into()])),
//! );
//!
//! assert!(schemaforge_core::validate::validate_schema(&schema).is_ok());
//! ```
//!
//! Serialization follows a tagged-value convention for types
//! (`{ "kind": "Decimal", "precision": 18, "scale": 2 }`) with the compact
//! string form (`"Decimal(18,2)"`) accepted on input; semantic defaults are
//! omitted on output, and unknown kinds or fields are rejected.

pub mod error;
pub mod schema;
pub mod types;
pub mod validate;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::error::{Result, SchemaError};
    pub use crate::schema::{
        CheckConstraint, Column, EffectiveDefault, ForeignKey, ForeignKeyAction, Index,
        PrimaryKey, Schema, Table, UniqueConstraint,
    };
    pub use crate::types::{PortableType, DEFAULT_GEOGRAPHY_SRID, MAX_LENGTH};
    pub use crate::validate::{validate_schema, validate_table};
}
