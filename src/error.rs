use thiserror::Error;

use crate::constraint::ConstraintError;

/// All errors surfaced by this crate.
///
/// Callers are expected to match the sentinel variants (`RecordNotFound`,
/// `EditConflict`, `Constraint`) and map them to transport-level responses.
/// Caller-contract variants (`ProtectedField`, `NoFields`, ...) indicate a bug
/// in the calling code and are reported before any statement reaches the
/// engine.
#[derive(Debug, Error)]
pub enum DbError {
    /// No row matched an id-scoped operation.
    #[error("record not found")]
    RecordNotFound,

    /// A version-checked update matched zero rows: the row exists but the
    /// caller's view of it was stale.
    #[error("edit conflict")]
    EditConflict,

    /// A write violated a database constraint.
    #[error(transparent)]
    Constraint(#[from] ConstraintError),

    /// The field map of a write operation tried to set `id` or `version`.
    #[error("field '{0}' cannot be set directly")]
    ProtectedField(&'static str),

    /// A write operation or read projection was given an empty field map.
    #[error("no fields provided")]
    NoFields,

    /// A bulk operation was given an empty argument list.
    #[error("no arguments provided")]
    NoArguments,

    /// A bulk operation was given a zero fields-per-row count.
    #[error("invalid number of fields: {0}")]
    InvalidFieldCount(usize),

    /// A bulk operation was given a zero chunk size.
    #[error("invalid chunk size: {0}")]
    InvalidChunkSize(usize),

    /// A fetched value could not be assigned to its destination slot.
    #[error("column '{column}': cannot bind {found} value into {expected} destination")]
    Binding {
        column: String,
        expected: &'static str,
        found: &'static str,
    },

    /// The internal per-operation deadline fired. Never reinterpreted as a
    /// constraint or not-found condition.
    #[error("operation timed out")]
    Timeout(#[from] tokio::time::error::Elapsed),

    /// Pool checkout or worker dispatch failed.
    #[error("connection error: {0}")]
    Connection(String),

    /// A driver error the translator does not recognize, passed through
    /// unchanged.
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    /// A recognized constraint message whose detail section could not be
    /// parsed, under [`MalformedDetailMode::Passthrough`](crate::MalformedDetailMode).
    #[error("unhandled database error: {0}")]
    Unhandled(String),

    /// Same condition as [`DbError::Unhandled`], surfaced distinctly under
    /// [`MalformedDetailMode::Distinct`](crate::MalformedDetailMode).
    #[error("unparseable constraint detail: {0}")]
    MalformedConstraintDetail(String),
}
