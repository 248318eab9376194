//! Translation of SQLite error text into a structured constraint taxonomy.
//!
//! The embedded engine reports constraint violations as message strings. This
//! module recognizes the four constraint prefixes plus the "no rows" sentinel
//! and produces typed errors; anything else passes through unchanged.

use serde::Serialize;
use thiserror::Error;

use crate::error::DbError;

const NOT_NULL_PREFIX: &str = "NOT NULL constraint failed: ";
const UNIQUE_PREFIX: &str = "UNIQUE constraint failed: ";
const FOREIGN_KEY_PREFIX: &str = "FOREIGN KEY constraint failed";
const CHECK_PREFIX: &str = "CHECK constraint failed: ";

/// The kind of constraint a failed write violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintKind {
    NotNull,
    Unique,
    ForeignKey,
    Check,
}

impl std::fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ConstraintKind::NotNull => "NOT NULL",
            ConstraintKind::Unique => "UNIQUE",
            ConstraintKind::ForeignKey => "FOREIGN KEY",
            ConstraintKind::Check => "CHECK",
        };
        f.write_str(label)
    }
}

/// A structured constraint violation produced by translating a failed write.
///
/// `details` holds the violated column names for NOT NULL and UNIQUE
/// violations, the check expression for CHECK violations, and is empty for
/// FOREIGN KEY violations (the engine does not name the column).
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{kind} constraint failed: {}", .details.join(", "))]
pub struct ConstraintError {
    pub kind: ConstraintKind,
    pub details: Vec<String>,
}

/// How to surface a recognized constraint message whose detail section does
/// not parse as a `table.column` list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MalformedDetailMode {
    /// Wrap the original message in [`DbError::Unhandled`].
    #[default]
    Passthrough,
    /// Surface it as [`DbError::MalformedConstraintDetail`].
    Distinct,
}

/// Translate a driver error into the crate taxonomy.
///
/// `QueryReturnedNoRows` becomes [`DbError::RecordNotFound`]. Constraint
/// messages become [`ConstraintError`]. Any other error passes through as
/// [`DbError::Sqlite`] untouched.
pub fn translate(err: rusqlite::Error, mode: MalformedDetailMode) -> DbError {
    if matches!(err, rusqlite::Error::QueryReturnedNoRows) {
        return DbError::RecordNotFound;
    }

    let message = match &err {
        rusqlite::Error::SqliteFailure(_, Some(message)) => message.clone(),
        _ => return DbError::Sqlite(err),
    };

    if let Some(rest) = message.strip_prefix(NOT_NULL_PREFIX) {
        return constraint_with_fields(ConstraintKind::NotNull, rest, &message, mode);
    }

    if let Some(rest) = message.strip_prefix(UNIQUE_PREFIX) {
        return constraint_with_fields(ConstraintKind::Unique, rest, &message, mode);
    }

    if message.starts_with(FOREIGN_KEY_PREFIX) {
        return ConstraintError {
            kind: ConstraintKind::ForeignKey,
            details: Vec::new(),
        }
        .into();
    }

    if let Some(rest) = message.strip_prefix(CHECK_PREFIX) {
        return ConstraintError {
            kind: ConstraintKind::Check,
            details: vec![rest.to_string()],
        }
        .into();
    }

    DbError::Sqlite(err)
}

fn constraint_with_fields(
    kind: ConstraintKind,
    rest: &str,
    full_message: &str,
    mode: MalformedDetailMode,
) -> DbError {
    match parse_field_list(rest) {
        Some(fields) => ConstraintError {
            kind,
            details: fields,
        }
        .into(),
        None => match mode {
            MalformedDetailMode::Passthrough => DbError::Unhandled(full_message.to_string()),
            MalformedDetailMode::Distinct => {
                DbError::MalformedConstraintDetail(full_message.to_string())
            }
        },
    }
}

/// Parse a comma-separated `table.column` list, returning the column names.
fn parse_field_list(detail: &str) -> Option<Vec<String>> {
    let mut fields = Vec::new();
    for item in detail.split(',') {
        let (table, column) = item.trim().split_once('.')?;
        if table.is_empty() || column.is_empty() || column.contains('.') {
            return None;
        }
        fields.push(column.to_string());
    }
    Some(fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sqlite_failure(message: &str) -> rusqlite::Error {
        rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CONSTRAINT),
            Some(message.to_string()),
        )
    }

    #[test]
    fn translates_unique_violation() {
        let err = translate(
            sqlite_failure("UNIQUE constraint failed: tenants.tenant_name"),
            MalformedDetailMode::Passthrough,
        );
        match err {
            DbError::Constraint(c) => {
                assert_eq!(c.kind, ConstraintKind::Unique);
                assert_eq!(c.details, vec!["tenant_name".to_string()]);
            }
            other => panic!("expected constraint error, got {other:?}"),
        }
    }

    #[test]
    fn translates_multi_column_not_null() {
        let err = translate(
            sqlite_failure("NOT NULL constraint failed: users.email, users.name"),
            MalformedDetailMode::Passthrough,
        );
        match err {
            DbError::Constraint(c) => {
                assert_eq!(c.kind, ConstraintKind::NotNull);
                assert_eq!(c.details, vec!["email".to_string(), "name".to_string()]);
            }
            other => panic!("expected constraint error, got {other:?}"),
        }
    }

    #[test]
    fn translates_foreign_key_without_details() {
        let err = translate(
            sqlite_failure("FOREIGN KEY constraint failed"),
            MalformedDetailMode::Passthrough,
        );
        match err {
            DbError::Constraint(c) => {
                assert_eq!(c.kind, ConstraintKind::ForeignKey);
                assert!(c.details.is_empty());
            }
            other => panic!("expected constraint error, got {other:?}"),
        }
    }

    #[test]
    fn translates_check_with_expression() {
        let err = translate(
            sqlite_failure("CHECK constraint failed: plan IN ('free', 'paid')"),
            MalformedDetailMode::Passthrough,
        );
        match err {
            DbError::Constraint(c) => {
                assert_eq!(c.kind, ConstraintKind::Check);
                assert_eq!(c.details, vec!["plan IN ('free', 'paid')".to_string()]);
            }
            other => panic!("expected constraint error, got {other:?}"),
        }
    }

    #[test]
    fn no_rows_becomes_record_not_found() {
        let err = translate(
            rusqlite::Error::QueryReturnedNoRows,
            MalformedDetailMode::Passthrough,
        );
        assert!(matches!(err, DbError::RecordNotFound));
    }

    #[test]
    fn unrecognized_message_passes_through() {
        let err = translate(
            sqlite_failure("database is locked"),
            MalformedDetailMode::Passthrough,
        );
        assert!(matches!(err, DbError::Sqlite(_)));
    }

    #[test]
    fn malformed_detail_passthrough_wraps_message() {
        let err = translate(
            sqlite_failure("UNIQUE constraint failed: not-a-column-list"),
            MalformedDetailMode::Passthrough,
        );
        match err {
            DbError::Unhandled(message) => assert!(message.contains("not-a-column-list")),
            other => panic!("expected unhandled error, got {other:?}"),
        }
    }

    #[test]
    fn malformed_detail_distinct_is_its_own_kind() {
        let err = translate(
            sqlite_failure("UNIQUE constraint failed: not-a-column-list"),
            MalformedDetailMode::Distinct,
        );
        assert!(matches!(err, DbError::MalformedConstraintDetail(_)));
    }

    #[test]
    fn display_names_the_fields() {
        let err = ConstraintError {
            kind: ConstraintKind::Unique,
            details: vec!["tenant_name".to_string()],
        };
        assert_eq!(err.to_string(), "UNIQUE constraint failed: tenant_name");
    }
}
