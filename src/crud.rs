//! Single-row CRUD primitives with optimistic concurrency control.
//!
//! Each operation validates its arguments before any statement is issued,
//! builds a positional-placeholder statement from the caller's field map,
//! and normalizes driver failures through the constraint translator. The
//! same five operations exist on [`DbPool`] (async, bounded by the internal
//! 3 second deadline) and on [`TxHandle`] (synchronous, inside a
//! transaction).

use crate::constraint::{MalformedDetailMode, translate};
use crate::error::DbError;
use crate::pool::DbPool;
use crate::transaction::TxHandle;
use crate::types::{DbValue, FieldBindings, FieldValues};

impl DbPool {
    /// Fetch one row by id, assigning columns into the supplied bindings.
    ///
    /// # Errors
    ///
    /// Returns `DbError::RecordNotFound` for a negative id or a missing row,
    /// `DbError::NoFields` for an empty binding set, and translated driver
    /// errors otherwise.
    pub async fn get_by_id(
        &self,
        table: &str,
        id: i64,
        bindings: FieldBindings<'_>,
    ) -> Result<(), DbError> {
        if id < 0 {
            return Err(DbError::RecordNotFound);
        }
        if bindings.is_empty() {
            return Err(DbError::NoFields);
        }

        let columns = bindings.columns();
        let table = table.to_owned();
        let detail_mode = self.detail_mode;
        let values = self
            .read(move |conn| get_row(conn, detail_mode, &table, id, &columns))
            .await?;
        bindings.assign(values)
    }

    /// Check whether a row with `id` exists.
    ///
    /// Existence checks are advisory: any failure, including a timeout,
    /// degrades to `false` rather than propagating.
    pub async fn exists(&self, table: &str, id: i64) -> bool {
        if id < 0 {
            return false;
        }
        let table = table.to_owned();
        self.read(move |conn| exists_row(conn, &table, id))
            .await
            .unwrap_or(false)
    }

    /// Insert a row, returning the generated id.
    ///
    /// # Errors
    ///
    /// Returns `DbError::NoFields` for an empty field map,
    /// `DbError::ProtectedField` if the map sets `id` or `version`, and a
    /// typed [`ConstraintError`](crate::ConstraintError) for constraint
    /// violations.
    pub async fn insert(&self, table: &str, fields: &FieldValues) -> Result<i64, DbError> {
        check_write_fields(fields)?;
        let table = table.to_owned();
        let fields = fields.clone();
        let detail_mode = self.detail_mode;
        self.write(move |conn| insert_row(conn, detail_mode, &table, &fields))
            .await
    }

    /// Update a row by id if its version still matches, returning the new
    /// version.
    ///
    /// The predicate covers both `id` and `version`: a concurrent writer
    /// that already advanced the version makes this statement match zero
    /// rows, which surfaces as `DbError::EditConflict`: the row still
    /// exists, the caller's view of it was stale. The caller re-reads and
    /// retries; no retry happens here.
    ///
    /// # Errors
    ///
    /// Returns `DbError::RecordNotFound` for negative id/version,
    /// `DbError::ProtectedField`/`DbError::NoFields` for contract
    /// violations, `DbError::EditConflict` on version mismatch, and
    /// translated driver errors otherwise.
    pub async fn update_by_id(
        &self,
        table: &str,
        id: i64,
        expected_version: i32,
        fields: &FieldValues,
    ) -> Result<i32, DbError> {
        if id < 0 || expected_version < 0 {
            return Err(DbError::RecordNotFound);
        }
        check_write_fields(fields)?;
        let table = table.to_owned();
        let fields = fields.clone();
        let detail_mode = self.detail_mode;
        self.write(move |conn| update_row(conn, detail_mode, &table, id, expected_version, &fields))
            .await
    }

    /// Delete a row by id.
    ///
    /// # Errors
    ///
    /// Returns `DbError::RecordNotFound` for a negative id or when no row
    /// was deleted.
    pub async fn delete_by_id(&self, table: &str, id: i64) -> Result<(), DbError> {
        if id < 0 {
            return Err(DbError::RecordNotFound);
        }
        let table = table.to_owned();
        let detail_mode = self.detail_mode;
        self.write(move |conn| delete_row(conn, detail_mode, &table, id))
            .await
    }
}

impl TxHandle<'_> {
    /// Transaction-scoped [`DbPool::get_by_id`].
    ///
    /// # Errors
    ///
    /// Same contract as the pool-level operation.
    pub fn get_by_id(
        &self,
        table: &str,
        id: i64,
        bindings: FieldBindings<'_>,
    ) -> Result<(), DbError> {
        if id < 0 {
            return Err(DbError::RecordNotFound);
        }
        if bindings.is_empty() {
            return Err(DbError::NoFields);
        }
        let columns = bindings.columns();
        let values = get_row(self.conn(), self.detail_mode, table, id, &columns)?;
        bindings.assign(values)
    }

    /// Transaction-scoped [`DbPool::exists`].
    pub fn exists(&self, table: &str, id: i64) -> bool {
        if id < 0 {
            return false;
        }
        exists_row(self.conn(), table, id).unwrap_or(false)
    }

    /// Transaction-scoped [`DbPool::insert`].
    ///
    /// # Errors
    ///
    /// Same contract as the pool-level operation.
    pub fn insert(&self, table: &str, fields: &FieldValues) -> Result<i64, DbError> {
        check_write_fields(fields)?;
        insert_row(self.conn(), self.detail_mode, table, fields)
    }

    /// Transaction-scoped [`DbPool::update_by_id`].
    ///
    /// # Errors
    ///
    /// Same contract as the pool-level operation.
    pub fn update_by_id(
        &self,
        table: &str,
        id: i64,
        expected_version: i32,
        fields: &FieldValues,
    ) -> Result<i32, DbError> {
        if id < 0 || expected_version < 0 {
            return Err(DbError::RecordNotFound);
        }
        check_write_fields(fields)?;
        update_row(self.conn(), self.detail_mode, table, id, expected_version, fields)
    }

    /// Transaction-scoped [`DbPool::delete_by_id`].
    ///
    /// # Errors
    ///
    /// Same contract as the pool-level operation.
    pub fn delete_by_id(&self, table: &str, id: i64) -> Result<(), DbError> {
        if id < 0 {
            return Err(DbError::RecordNotFound);
        }
        delete_row(self.conn(), self.detail_mode, table, id)
    }
}

/// `id` and `version` are engine-managed; a field map naming them is a
/// caller bug, rejected before any statement is issued.
fn check_write_fields(fields: &FieldValues) -> Result<(), DbError> {
    if fields.is_empty() {
        return Err(DbError::NoFields);
    }
    if fields.contains("id") {
        return Err(DbError::ProtectedField("id"));
    }
    if fields.contains("version") {
        return Err(DbError::ProtectedField("version"));
    }
    Ok(())
}

fn get_row(
    conn: &rusqlite::Connection,
    detail_mode: MalformedDetailMode,
    table: &str,
    id: i64,
    columns: &[String],
) -> Result<Vec<DbValue>, DbError> {
    let sql = format!(
        "SELECT {} FROM {table} WHERE id = ?1",
        columns.join(",")
    );
    conn.query_row(&sql, [id], |row| {
        let mut values = Vec::with_capacity(columns.len());
        for index in 0..columns.len() {
            values.push(DbValue::from_sql(row.get_ref(index)?));
        }
        Ok(values)
    })
    .map_err(|e| translate(e, detail_mode))
}

fn exists_row(conn: &rusqlite::Connection, table: &str, id: i64) -> Result<bool, DbError> {
    let sql = format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE id = ?1)");
    let found = conn.query_row(&sql, [id], |row| row.get::<_, bool>(0))?;
    Ok(found)
}

fn insert_row(
    conn: &rusqlite::Connection,
    detail_mode: MalformedDetailMode,
    table: &str,
    fields: &FieldValues,
) -> Result<i64, DbError> {
    let mut columns = Vec::with_capacity(fields.len());
    let mut placeholders = Vec::with_capacity(fields.len());
    let mut values = Vec::with_capacity(fields.len());
    for (index, (column, value)) in fields.iter().enumerate() {
        columns.push(column.to_string());
        placeholders.push(format!("?{}", index + 1));
        values.push(value.to_sql());
    }

    let sql = format!(
        "INSERT INTO {table} ({}) VALUES ({}) RETURNING id",
        columns.join(","),
        placeholders.join(",")
    );
    conn.query_row(&sql, rusqlite::params_from_iter(values), |row| {
        row.get::<_, i64>(0)
    })
    .map_err(|e| translate(e, detail_mode))
}

fn update_row(
    conn: &rusqlite::Connection,
    detail_mode: MalformedDetailMode,
    table: &str,
    id: i64,
    expected_version: i32,
    fields: &FieldValues,
) -> Result<i32, DbError> {
    let mut assignments = Vec::with_capacity(fields.len() + 1);
    let mut values = Vec::with_capacity(fields.len() + 2);
    for (index, (column, value)) in fields.iter().enumerate() {
        assignments.push(format!("{column} = ?{}", index + 1));
        values.push(value.to_sql());
    }
    assignments.push("version = version + 1".to_string());

    let id_position = fields.len() + 1;
    let version_position = fields.len() + 2;
    let sql = format!(
        "UPDATE {table} SET {} WHERE id = ?{id_position} AND version = ?{version_position} RETURNING version",
        assignments.join(", ")
    );
    values.push(rusqlite::types::Value::Integer(id));
    values.push(rusqlite::types::Value::Integer(i64::from(expected_version)));

    match conn.query_row(&sql, rusqlite::params_from_iter(values), |row| {
        row.get::<_, i32>(0)
    }) {
        Ok(new_version) => Ok(new_version),
        // Zero rows means the id/version predicate missed: the row exists at
        // a different version (or not at all); callers treat it as a stale
        // read, not a missing record.
        Err(rusqlite::Error::QueryReturnedNoRows) => Err(DbError::EditConflict),
        Err(e) => Err(translate(e, detail_mode)),
    }
}

fn delete_row(
    conn: &rusqlite::Connection,
    detail_mode: MalformedDetailMode,
    table: &str,
    id: i64,
) -> Result<(), DbError> {
    let sql = format!("DELETE FROM {table} WHERE id = ?1");
    let affected = conn
        .execute(&sql, [id])
        .map_err(|e| translate(e, detail_mode))?;
    if affected == 0 {
        return Err(DbError::RecordNotFound);
    }
    Ok(())
}
