//! Core types shared across the migration pipeline: the identifier service,
//! the introspected schema model, and the row value representation.

pub mod ident;
pub mod schema;
pub mod value;

pub use ident::{fold, qualify, quote};
pub use schema::{Column, ForeignKey, Index, Schema, SourceObjects, Table};
pub use value::SqlValue;
