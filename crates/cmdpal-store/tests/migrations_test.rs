// Integration tests for the migration framework

use rusqlite::Connection;

fn setup_test_db() -> Connection {
    Connection::open_in_memory().expect("Failed to create in-memory database")
}

#[test]
fn test_apply_migrations_on_empty_db() {
    // Given: An empty SQLite database
    let mut conn = setup_test_db();

    // When: Migrations are applied
    let result = cmdpal_store::migrations::apply_migrations(&mut conn);

    // Then: They succeed and both tables exist
    assert!(
        result.is_ok(),
        "Migrations should succeed: {:?}",
        result.err()
    );
    let tables = get_table_names(&conn);
    assert_eq!(tables, vec!["schema_version".to_string(), "state".to_string()]);
}

#[test]
fn test_migration_idempotency() {
    // Given: A database with migrations already applied
    let mut conn = setup_test_db();
    cmdpal_store::migrations::apply_migrations(&mut conn).unwrap();

    // When: Migrations are re-run
    let result = cmdpal_store::migrations::apply_migrations(&mut conn);

    // Then: Re-running succeeds without duplicate version rows
    assert!(result.is_ok(), "Re-running migrations should succeed");
    let version_count: i64 = conn
        .query_row("SELECT COUNT(*) FROM schema_version", [], |row| row.get(0))
        .unwrap();
    assert_eq!(version_count, 1);
}

#[test]
fn test_checksum_is_recorded() {
    let mut conn = setup_test_db();
    cmdpal_store::migrations::apply_migrations(&mut conn).unwrap();

    let checksum: String = conn
        .query_row(
            "SELECT checksum FROM schema_version WHERE migration_id = ?1",
            ["001_state_schema"],
            |row| row.get(0),
        )
        .unwrap();

    assert_eq!(checksum.len(), 64, "SHA256 checksum should be 64 hex chars");
}

#[test]
fn test_edited_migration_is_rejected() {
    // Given: A recorded checksum that no longer matches the embedded SQL
    let mut conn = setup_test_db();
    cmdpal_store::migrations::apply_migrations(&mut conn).unwrap();
    conn.execute(
        "UPDATE schema_version SET checksum = ?1 WHERE migration_id = ?2",
        [cmdpal_store::migrations::compute_checksum("-- old"), "001_state_schema".to_string()],
    )
    .unwrap();

    // When / Then: The runner refuses to continue
    let err = cmdpal_store::migrations::apply_migrations(&mut conn).unwrap_err();
    assert_eq!(err.code(), "ERR_PERSISTENCE");
    assert!(err.message().contains("Checksum mismatch"));
}

fn get_table_names(conn: &Connection) -> Vec<String> {
    let mut stmt = conn
        .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
        .unwrap();

    let tables = stmt
        .query_map([], |row| row.get(0))
        .unwrap()
        .collect::<Result<Vec<String>, _>>()
        .unwrap();

    tables
}
