//! Split read/write connection pooling over a single database file.
//!
//! SQLite serializes writers at the file level; letting the driver open a
//! second write connection only manufactures lock-contention errors. The
//! write pool is therefore capped at exactly one connection, so concurrent
//! writers queue at checkout instead of racing inside the engine. Reads go
//! through a separate read-only pool with configurable concurrency.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use deadpool_sqlite::{Config, Pool, PoolConfig, Runtime};

use crate::constraint::MalformedDetailMode;
use crate::error::DbError;
use crate::results::Row;
use crate::types::{DbValue, to_sql_vec};

/// Bound applied under the caller's own deadline to every pooled operation.
pub(crate) const OP_TIMEOUT: Duration = Duration::from_secs(3);

/// Process-wide handle to the write and read pools of one database file.
///
/// Opened once at startup, closed once at shutdown. Cloning shares the
/// underlying pools.
#[derive(Clone)]
pub struct DbPool {
    write: Pool,
    read: Pool,
    shared: bool,
    closed: Arc<AtomicBool>,
    pub(crate) detail_mode: MalformedDetailMode,
}

impl std::fmt::Debug for DbPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbPool")
            .field("shared", &self.shared)
            .field("closed", &self.closed.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

/// Fluent options for opening a [`DbPool`].
#[derive(Debug, Clone)]
pub struct DbPoolBuilder {
    path: String,
    read_pool_size: Option<usize>,
    detail_mode: MalformedDetailMode,
}

impl DbPoolBuilder {
    fn new(path: String) -> Self {
        Self {
            path,
            read_pool_size: None,
            detail_mode: MalformedDetailMode::default(),
        }
    }

    /// Cap the read pool at `size` connections (default: deadpool's default).
    #[must_use]
    pub fn read_pool_size(mut self, size: usize) -> Self {
        self.read_pool_size = Some(size);
        self
    }

    /// Choose how recognized-but-unparseable constraint details surface.
    #[must_use]
    pub fn malformed_details(mut self, mode: MalformedDetailMode) -> Self {
        self.detail_mode = mode;
        self
    }

    /// Open both pools and ping them.
    ///
    /// # Errors
    ///
    /// Returns `DbError::Connection` if either pool cannot be created or its
    /// first connection cannot be pinged. The host should treat this as fatal.
    pub async fn open(self) -> Result<DbPool, DbError> {
        let write = make_pool(&format!("file:{}?mode=rwc", self.path), Some(1))?;
        ping(&write, "PRAGMA journal_mode = WAL; PRAGMA foreign_keys = ON;").await?;

        let read = make_pool(&format!("file:{}?mode=ro", self.path), self.read_pool_size)?;
        ping(&read, "PRAGMA foreign_keys = ON; SELECT 1;").await?;

        tracing::debug!(path = %self.path, "opened sqlite read/write pools");

        Ok(DbPool {
            write,
            read,
            shared: false,
            closed: Arc::new(AtomicBool::new(false)),
            detail_mode: self.detail_mode,
        })
    }
}

impl DbPool {
    #[must_use]
    pub fn builder(path: impl Into<String>) -> DbPoolBuilder {
        DbPoolBuilder::new(path.into())
    }

    /// Open a pool over `path` with default options.
    ///
    /// # Errors
    ///
    /// Returns `DbError::Connection` if either pool cannot be opened or pinged.
    pub async fn open(path: impl Into<String>) -> Result<Self, DbError> {
        Self::builder(path).open().await
    }

    /// Open a single shared connection serving both reads and writes.
    ///
    /// Intended for tests and other non-production contexts (`:memory:`
    /// databases in particular). `close` closes the connection once.
    ///
    /// # Errors
    ///
    /// Returns `DbError::Connection` if the pool cannot be opened or pinged.
    pub async fn open_single(path: impl Into<String>) -> Result<Self, DbError> {
        let path = path.into();
        let pool = make_pool(&path, Some(1))?;
        ping(&pool, "PRAGMA foreign_keys = ON;").await?;

        Ok(DbPool {
            write: pool.clone(),
            read: pool,
            shared: true,
            closed: Arc::new(AtomicBool::new(false)),
            detail_mode: MalformedDetailMode::default(),
        })
    }

    /// Execute a SELECT on the read pool, invoking `row_fn` once per row.
    ///
    /// Rows are streamed from the statement; only what `row_fn` returns is
    /// retained.
    ///
    /// # Errors
    ///
    /// Returns the first error from the statement or from `row_fn`.
    pub async fn query<T, F>(
        &self,
        sql: &str,
        params: &[DbValue],
        row_fn: F,
    ) -> Result<Vec<T>, DbError>
    where
        F: FnMut(&Row) -> Result<T, DbError> + Send + 'static,
        T: Send + 'static,
    {
        let sql = sql.to_owned();
        let params = to_sql_vec(params);
        self.read(move |conn| run_query(conn, &sql, &params, row_fn))
            .await
    }

    /// Execute a SELECT expected to return a single row on the read pool.
    ///
    /// # Errors
    ///
    /// Returns `DbError::RecordNotFound` if no row matched.
    pub async fn query_row(&self, sql: &str, params: &[DbValue]) -> Result<Row, DbError> {
        let rows = self.query(sql, params, |row| Ok(row.clone())).await?;
        rows.into_iter().next().ok_or(DbError::RecordNotFound)
    }

    /// Execute a DML statement on the write pool, returning rows affected.
    ///
    /// # Errors
    ///
    /// Returns the driver error unchanged; callers wanting the constraint
    /// taxonomy should use the CRUD primitives instead.
    pub async fn exec(&self, sql: &str, params: &[DbValue]) -> Result<usize, DbError> {
        let sql = sql.to_owned();
        let params = to_sql_vec(params);
        self.write(move |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let affected = stmt.execute(rusqlite::params_from_iter(params.iter().cloned()))?;
            Ok(affected)
        })
        .await
    }

    /// Close both pools. Panics on a second close: closing twice is a
    /// resource-lifecycle bug, not a recoverable runtime condition.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            panic!("database pool closed twice");
        }
        self.write.close();
        if !self.shared {
            self.read.close();
        }
    }

    pub(crate) async fn read<T, F>(&self, f: F) -> Result<T, DbError>
    where
        F: FnOnce(&mut rusqlite::Connection) -> Result<T, DbError> + Send + 'static,
        T: Send + 'static,
    {
        Ok(tokio::time::timeout(OP_TIMEOUT, run_on(&self.read, f)).await??)
    }

    pub(crate) async fn write<T, F>(&self, f: F) -> Result<T, DbError>
    where
        F: FnOnce(&mut rusqlite::Connection) -> Result<T, DbError> + Send + 'static,
        T: Send + 'static,
    {
        Ok(tokio::time::timeout(OP_TIMEOUT, run_on(&self.write, f)).await??)
    }

    /// Write-pool dispatch without the per-operation deadline. Transactions
    /// run here so a multi-statement callback is not cut off mid-flight.
    pub(crate) async fn write_untimed<T, F>(&self, f: F) -> Result<T, DbError>
    where
        F: FnOnce(&mut rusqlite::Connection) -> Result<T, DbError> + Send + 'static,
        T: Send + 'static,
    {
        run_on(&self.write, f).await
    }
}

fn make_pool(path: &str, max_size: Option<usize>) -> Result<Pool, DbError> {
    let mut cfg = Config::new(path);
    if let Some(size) = max_size {
        cfg.pool = Some(PoolConfig::new(size));
    }
    cfg.create_pool(Runtime::Tokio1)
        .map_err(|e| DbError::Connection(format!("failed to create sqlite pool: {e}")))
}

async fn ping(pool: &Pool, pragma: &'static str) -> Result<(), DbError> {
    let conn = pool
        .get()
        .await
        .map_err(|e| DbError::Connection(format!("sqlite pool checkout failed: {e}")))?;
    conn.interact(move |conn| conn.execute_batch(pragma).map_err(DbError::from))
        .await
        .map_err(|e| DbError::Connection(format!("sqlite worker dispatch failed: {e}")))?
}

async fn run_on<T, F>(pool: &Pool, f: F) -> Result<T, DbError>
where
    F: FnOnce(&mut rusqlite::Connection) -> Result<T, DbError> + Send + 'static,
    T: Send + 'static,
{
    let conn = pool
        .get()
        .await
        .map_err(|e| DbError::Connection(format!("sqlite pool checkout failed: {e}")))?;
    conn.interact(f)
        .await
        .map_err(|e| DbError::Connection(format!("sqlite worker dispatch failed: {e}")))?
}

/// Stream rows from a prepared SELECT through `row_fn`.
pub(crate) fn run_query<T, F>(
    conn: &rusqlite::Connection,
    sql: &str,
    params: &[rusqlite::types::Value],
    mut row_fn: F,
) -> Result<Vec<T>, DbError>
where
    F: FnMut(&Row) -> Result<T, DbError>,
{
    let mut stmt = conn.prepare(sql)?;
    let columns: Arc<Vec<String>> = Arc::new(
        stmt.column_names()
            .into_iter()
            .map(str::to_string)
            .collect(),
    );

    let mut rows = stmt.query(rusqlite::params_from_iter(params.iter().cloned()))?;
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        let mut values = Vec::with_capacity(columns.len());
        for index in 0..columns.len() {
            values.push(DbValue::from_sql(row.get_ref(index)?));
        }
        out.push(row_fn(&Row::new(Arc::clone(&columns), values))?);
    }
    Ok(out)
}
