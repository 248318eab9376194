//! Generic relational data-access layer over a single-file SQLite database.
//!
//! The crate provides four things on top of the embedded engine:
//!
//! - [`DbPool`]: split read/write pooling with single-writer discipline and
//!   scoped transactions;
//! - CRUD primitives ([`DbPool::get_by_id`], [`DbPool::insert`],
//!   [`DbPool::update_by_id`], [`DbPool::delete_by_id`], [`DbPool::exists`])
//!   with optimistic concurrency control via a `version` column;
//! - [`QueryBuilder`]: a fluent SELECT accumulator whose optional filters
//!   are no-ops when absent;
//! - a constraint-error translator turning engine message text into a typed
//!   taxonomy ([`ConstraintError`]), plus placeholder chunking for bulk
//!   writes.
//!
//! Callers supply table names and column-to-value/destination maps
//! explicitly; no schema objects or reflection-based binding exist at this
//! layer. Table and column names are trusted internal inputs, never raw
//! external input.
//!
//! ```no_run
//! use sqlite_dal::prelude::*;
//!
//! # async fn demo() -> Result<(), DbError> {
//! let pool = DbPool::open("app.db").await?;
//!
//! let id = pool
//!     .insert(
//!         "tenants",
//!         &FieldValues::new()
//!             .set("tenant_name", "Acme")
//!             .set("contact_email", "a@acme.com"),
//!     )
//!     .await?;
//!
//! let mut name = String::new();
//! let mut bindings = FieldBindings::new();
//! bindings.bind("tenant_name", FieldSlot::Text(&mut name));
//! pool.get_by_id("tenants", id, bindings).await?;
//! # Ok(())
//! # }
//! ```

mod chunk;
mod constraint;
mod crud;
mod error;
mod pool;
mod query_builder;
mod results;
mod strcase;
mod transaction;
mod types;

pub mod prelude;

pub use chunk::{get_chunk_size, process_in_chunks};
pub use constraint::{ConstraintError, ConstraintKind, MalformedDetailMode};
pub use error::DbError;
pub use pool::{DbPool, DbPoolBuilder};
pub use query_builder::{QueryBuilder, QueryOperator, build_search_select_fields};
pub use results::Row;
pub use transaction::TxHandle;
pub use types::{DbValue, FieldBindings, FieldSlot, FieldValues};
