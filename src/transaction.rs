//! Scoped transactions on the write connection.
//!
//! [`DbPool::with_transaction`] is the only way to compose multi-statement
//! writes; it guarantees all-or-nothing visibility of the combined write.
//! Transactions are not nested: the callback performs all its work through
//! the [`TxHandle`] it receives, never through the outer pool.

use crate::constraint::MalformedDetailMode;
use crate::error::DbError;
use crate::pool::{DbPool, run_query};
use crate::results::Row;
use crate::types::{DbValue, to_sql_vec};

/// Transaction-scoped execution handle satisfying the same contract as the
/// pool, minus transaction entry.
///
/// Handed to the `with_transaction` callback; all methods run synchronously
/// on the write-pool worker thread.
pub struct TxHandle<'a> {
    conn: &'a rusqlite::Connection,
    pub(crate) detail_mode: MalformedDetailMode,
}

impl<'a> TxHandle<'a> {
    fn new(conn: &'a rusqlite::Connection, detail_mode: MalformedDetailMode) -> Self {
        Self { conn, detail_mode }
    }

    pub(crate) fn conn(&self) -> &rusqlite::Connection {
        self.conn
    }

    /// Execute a SELECT inside the transaction, invoking `row_fn` per row.
    ///
    /// # Errors
    ///
    /// Returns the first error from the statement or from `row_fn`.
    pub fn query<T, F>(&self, sql: &str, params: &[DbValue], row_fn: F) -> Result<Vec<T>, DbError>
    where
        F: FnMut(&Row) -> Result<T, DbError>,
    {
        // Reads inside a transaction go through the write connection so the
        // transaction sees its own uncommitted writes.
        let params = to_sql_vec(params);
        run_query(self.conn, sql, &params, row_fn)
    }

    /// Execute a SELECT expected to return a single row.
    ///
    /// # Errors
    ///
    /// Returns `DbError::RecordNotFound` if no row matched.
    pub fn query_row(&self, sql: &str, params: &[DbValue]) -> Result<Row, DbError> {
        let rows = self.query(sql, params, |row| Ok(row.clone()))?;
        rows.into_iter().next().ok_or(DbError::RecordNotFound)
    }

    /// Execute a DML statement, returning rows affected.
    ///
    /// # Errors
    ///
    /// Returns the driver error unchanged.
    pub fn exec(&self, sql: &str, params: &[DbValue]) -> Result<usize, DbError> {
        let params = to_sql_vec(params);
        let mut stmt = self.conn.prepare(sql)?;
        let affected = stmt.execute(rusqlite::params_from_iter(params.iter().cloned()))?;
        Ok(affected)
    }
}

impl DbPool {
    /// Run `f` inside a transaction on the write connection.
    ///
    /// On any error returned by `f` the transaction is rolled back before the
    /// error propagates; a rollback failure is logged, not propagated, since
    /// the original error remains authoritative. On success the transaction
    /// commits.
    ///
    /// # Errors
    ///
    /// Returns the error from `f`, or from beginning/committing the
    /// transaction.
    pub async fn with_transaction<T, F>(&self, f: F) -> Result<T, DbError>
    where
        F: FnOnce(&mut TxHandle<'_>) -> Result<T, DbError> + Send + 'static,
        T: Send + 'static,
    {
        let detail_mode = self.detail_mode;
        self.write_untimed(move |conn| {
            let tx = conn.transaction()?;
            let result = {
                let mut handle = TxHandle::new(&tx, detail_mode);
                f(&mut handle)
            };
            match result {
                Ok(value) => {
                    tx.commit()?;
                    Ok(value)
                }
                Err(err) => {
                    if let Err(rollback_err) = tx.rollback() {
                        tracing::error!(error = %rollback_err, "transaction rollback failed");
                    }
                    Err(err)
                }
            }
        })
        .await
    }
}
