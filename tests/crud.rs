use sqlite_dal::prelude::*;
use tempfile::tempdir;
use tokio::runtime::Runtime;

async fn open_tenants_pool(path: &str) -> Result<DbPool, DbError> {
    let pool = DbPool::open(path).await?;
    pool.exec(
        "CREATE TABLE IF NOT EXISTS tenants (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            tenant_name TEXT NOT NULL UNIQUE,
            contact_email TEXT NOT NULL,
            plan TEXT NOT NULL DEFAULT 'free',
            active INTEGER NOT NULL DEFAULT 1,
            version INTEGER NOT NULL DEFAULT 1
        )",
        &[],
    )
    .await?;
    Ok(pool)
}

#[test]
fn insert_get_update_delete_roundtrip() -> Result<(), Box<dyn std::error::Error>> {
    let rt = Runtime::new()?;
    let dir = tempdir()?;
    let db_path = dir.path().join("crud.db").to_string_lossy().into_owned();

    rt.block_on(async {
        let pool = open_tenants_pool(&db_path).await?;

        let id = pool
            .insert(
                "tenants",
                &FieldValues::new()
                    .set("tenant_name", "Acme")
                    .set("contact_email", "a@acme.com"),
            )
            .await?;
        assert_eq!(id, 1);
        assert!(pool.exists("tenants", id).await);

        let mut name = String::new();
        let mut email = String::new();
        let mut version = 0_i64;
        let mut bindings = FieldBindings::new();
        bindings
            .bind("tenant_name", FieldSlot::Text(&mut name))
            .bind("contact_email", FieldSlot::Text(&mut email))
            .bind("version", FieldSlot::Int(&mut version));
        pool.get_by_id("tenants", id, bindings).await?;
        assert_eq!(name, "Acme");
        assert_eq!(email, "a@acme.com");
        assert_eq!(version, 1);

        let new_version = pool
            .update_by_id(
                "tenants",
                id,
                1,
                &FieldValues::new().set("plan", "paid"),
            )
            .await?;
        assert_eq!(new_version, 2);

        let mut plan = String::new();
        let mut version = 0_i64;
        let mut bindings = FieldBindings::new();
        bindings
            .bind("plan", FieldSlot::Text(&mut plan))
            .bind("version", FieldSlot::Int(&mut version));
        pool.get_by_id("tenants", id, bindings).await?;
        assert_eq!(plan, "paid");
        assert_eq!(version, 2);

        pool.delete_by_id("tenants", id).await?;
        assert!(!pool.exists("tenants", id).await);

        pool.close();
        Ok(())
    })
}

#[test]
fn missing_and_negative_ids_are_not_found() -> Result<(), Box<dyn std::error::Error>> {
    let rt = Runtime::new()?;
    let dir = tempdir()?;
    let db_path = dir.path().join("notfound.db").to_string_lossy().into_owned();

    rt.block_on(async {
        let pool = open_tenants_pool(&db_path).await?;

        let mut name = String::new();
        let mut bindings = FieldBindings::new();
        bindings.bind("tenant_name", FieldSlot::Text(&mut name));
        let err = pool.get_by_id("tenants", 999, bindings).await.unwrap_err();
        assert!(matches!(err, DbError::RecordNotFound));

        // Negative ids never reach the engine, even for unknown tables.
        let mut name = String::new();
        let mut bindings = FieldBindings::new();
        bindings.bind("tenant_name", FieldSlot::Text(&mut name));
        let err = pool
            .get_by_id("no_such_table", -1, bindings)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::RecordNotFound));

        let err = pool.delete_by_id("tenants", 999).await.unwrap_err();
        assert!(matches!(err, DbError::RecordNotFound));
        let err = pool.delete_by_id("tenants", -3).await.unwrap_err();
        assert!(matches!(err, DbError::RecordNotFound));

        assert!(!pool.exists("tenants", 999).await);
        assert!(!pool.exists("tenants", -1).await);
        // Advisory by contract: failures degrade to false instead of erroring.
        assert!(!pool.exists("no_such_table", 1).await);

        pool.close();
        Ok(())
    })
}

#[test]
fn duplicate_name_surfaces_unique_constraint() -> Result<(), Box<dyn std::error::Error>> {
    let rt = Runtime::new()?;
    let dir = tempdir()?;
    let db_path = dir.path().join("unique.db").to_string_lossy().into_owned();

    rt.block_on(async {
        let pool = open_tenants_pool(&db_path).await?;

        let fields = FieldValues::new()
            .set("tenant_name", "Acme")
            .set("contact_email", "a@acme.com");
        let id = pool.insert("tenants", &fields).await?;
        assert_eq!(id, 1);

        let err = pool.insert("tenants", &fields).await.unwrap_err();
        match err {
            DbError::Constraint(c) => {
                assert_eq!(c.kind, ConstraintKind::Unique);
                assert_eq!(c.details, vec!["tenant_name".to_string()]);
            }
            other => panic!("expected unique constraint error, got {other:?}"),
        }

        pool.close();
        Ok(())
    })
}

#[test]
fn write_field_maps_cannot_touch_id_or_version() -> Result<(), Box<dyn std::error::Error>> {
    let rt = Runtime::new()?;
    let dir = tempdir()?;
    let db_path = dir.path().join("guard.db").to_string_lossy().into_owned();

    rt.block_on(async {
        let pool = open_tenants_pool(&db_path).await?;
        let id = pool
            .insert(
                "tenants",
                &FieldValues::new()
                    .set("tenant_name", "Acme")
                    .set("contact_email", "a@acme.com"),
            )
            .await?;

        let err = pool
            .update_by_id(
                "tenants",
                id,
                1,
                &FieldValues::new().set("id", 42_i64).set("plan", "paid"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::ProtectedField("id")));

        let err = pool
            .update_by_id(
                "tenants",
                id,
                1,
                &FieldValues::new().set("plan", "paid").set("version", 9_i64),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::ProtectedField("version")));

        let err = pool
            .update_by_id("tenants", id, 1, &FieldValues::new())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NoFields));

        let err = pool
            .insert("tenants", &FieldValues::new().set("id", 7_i64))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::ProtectedField("id")));

        // Nothing above reached the engine.
        let mut plan = String::new();
        let mut bindings = FieldBindings::new();
        bindings.bind("plan", FieldSlot::Text(&mut plan));
        pool.get_by_id("tenants", id, bindings).await?;
        assert_eq!(plan, "free");

        pool.close();
        Ok(())
    })
}

#[test]
fn null_columns_land_in_optional_slots() -> Result<(), Box<dyn std::error::Error>> {
    let rt = Runtime::new()?;
    let dir = tempdir()?;
    let db_path = dir.path().join("nulls.db").to_string_lossy().into_owned();

    rt.block_on(async {
        let pool = DbPool::open(&db_path).await?;
        pool.exec(
            "CREATE TABLE notes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                body TEXT,
                pinned_at TEXT,
                version INTEGER NOT NULL DEFAULT 1
            )",
            &[],
        )
        .await?;

        let absent: Option<&str> = None;
        let id = pool
            .insert(
                "notes",
                &FieldValues::new()
                    .set("body", "hello")
                    .set("pinned_at", absent),
            )
            .await?;

        let mut body: Option<String> = None;
        let mut pinned_at: Option<String> = Some("stale".to_string());
        let mut bindings = FieldBindings::new();
        bindings
            .bind("body", FieldSlot::OptText(&mut body))
            .bind("pinned_at", FieldSlot::OptText(&mut pinned_at));
        pool.get_by_id("notes", id, bindings).await?;

        assert_eq!(body.as_deref(), Some("hello"));
        assert_eq!(pinned_at, None);

        pool.close();
        Ok(())
    })
}
