use sqlite_dal::prelude::*;
use tempfile::tempdir;
use tokio::runtime::Runtime;

#[test]
fn chunked_bulk_insert_loads_every_row() -> Result<(), Box<dyn std::error::Error>> {
    let rt = Runtime::new()?;
    let dir = tempdir()?;
    let db_path = dir.path().join("bulk.db").to_string_lossy().into_owned();

    rt.block_on(async {
        let pool = DbPool::open(&db_path).await?;
        pool.exec(
            "CREATE TABLE items (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                item_name TEXT NOT NULL,
                quantity INTEGER NOT NULL,
                version INTEGER NOT NULL DEFAULT 1
            )",
            &[],
        )
        .await?;

        let rows: Vec<(String, i64)> = (1..=25).map(|n| (format!("item-{n}"), n * 10)).collect();
        // Deliberately small chunk size to force multiple batches.
        let chunk_size = 10;

        pool.with_transaction(move |tx| {
            process_in_chunks(&rows, chunk_size, 2, |chunk, placeholders| {
                let sql = format!("INSERT INTO items (item_name, quantity) VALUES {placeholders}");
                let mut params = Vec::with_capacity(chunk.len() * 2);
                for (name, quantity) in chunk {
                    params.push(DbValue::from(name.clone()));
                    params.push(DbValue::from(*quantity));
                }
                let affected = tx.exec(&sql, &params)?;
                assert_eq!(affected, chunk.len());
                Ok(())
            })
        })
        .await?;

        let totals = QueryBuilder::new()
            .select(&["COUNT(*)", "SUM(quantity)"])
            .from("items")
            .execute(&pool, |row| {
                Ok((
                    row.get_index(0).and_then(DbValue::as_int).unwrap_or(0),
                    row.get_index(1).and_then(DbValue::as_int).unwrap_or(0),
                ))
            })
            .await?;
        assert_eq!(totals, vec![(25, (1..=25).map(|n| n * 10).sum())]);

        pool.close();
        Ok(())
    })
}

#[test]
fn chunk_size_respects_the_placeholder_ceiling() {
    // 7 fields per row caps a batch at 9285 rows (9285 * 7 = 64995).
    let chunk = get_chunk_size(100_000, 7);
    assert_eq!(chunk, 9285);
    assert!(chunk * 7 <= 65_000);

    // Small workloads fit in a single batch.
    assert_eq!(get_chunk_size(40, 7), 40);
}
