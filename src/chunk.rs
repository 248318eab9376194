//! Batch sizing and placeholder-group generation for bulk writes.
//!
//! SQLite caps the number of bound parameters per statement; multi-row
//! inserts have to stay under that ceiling. [`get_chunk_size`] computes the
//! largest safe batch and [`process_in_chunks`] partitions an argument list
//! into such batches, handing each one to a callback together with its
//! placeholder-group string.

use crate::error::DbError;

/// Parameter ceiling enforced by the engine.
const MAX_PLACEHOLDERS: usize = 65_000;

/// The largest batch size keeping `batch * num_fields` under the engine's
/// placeholder ceiling, capped at `num_rows`.
#[must_use]
pub fn get_chunk_size(num_rows: usize, num_fields: usize) -> usize {
    if num_fields == 0 {
        return 0;
    }
    num_rows.min(MAX_PLACEHOLDERS / num_fields)
}

/// Render the placeholder group for one row within a batch, e.g. `(?3, ?4)`
/// for the second row of a two-field batch. Numbering runs continuously
/// within a batch and resets at each batch boundary.
fn placeholder_group(row: usize, num_fields: usize) -> String {
    let start = row * num_fields;
    let placeholders: Vec<String> = (0..num_fields)
        .map(|field| format!("?{}", start + field + 1))
        .collect();
    format!("({})", placeholders.join(", "))
}

/// Partition `items` into batches of at most `chunk_size`, invoking
/// `callback` with each batch and its matching placeholder-group string
/// (`(?1, ?2),(?3, ?4),...`).
///
/// # Errors
///
/// Returns `DbError::NoArguments` for an empty item list,
/// `DbError::InvalidFieldCount` for a zero fields-per-row count,
/// `DbError::InvalidChunkSize` for a zero chunk size, and the first error
/// returned by `callback`.
pub fn process_in_chunks<T, F>(
    items: &[T],
    chunk_size: usize,
    num_fields: usize,
    mut callback: F,
) -> Result<(), DbError>
where
    F: FnMut(&[T], &str) -> Result<(), DbError>,
{
    if items.is_empty() {
        return Err(DbError::NoArguments);
    }
    if num_fields == 0 {
        return Err(DbError::InvalidFieldCount(num_fields));
    }
    if chunk_size == 0 {
        return Err(DbError::InvalidChunkSize(chunk_size));
    }

    for chunk in items.chunks(chunk_size) {
        let groups: Vec<String> = (0..chunk.len())
            .map(|row| placeholder_group(row, num_fields))
            .collect();
        callback(chunk, &groups.join(","))?;
    }
    Ok(())
}
