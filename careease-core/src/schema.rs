/// DDL to create the schema_version tracking table.
///
/// Applied unconditionally on every open, before the version is read.
pub const SCHEMA_VERSION_DDL: &str = "
    CREATE TABLE IF NOT EXISTS schema_version (
        version INTEGER NOT NULL
    ) STRICT;
";

/// DDL for the v1 schema: a single key/value `settings` table.
///
/// Keys are fixed strings owned by `db.rs` (`auth_token`, `theme`). Nothing else
/// in the client writes here.
pub const SCHEMA_V1_SQL: &str = "
    CREATE TABLE IF NOT EXISTS settings (
        key         TEXT    PRIMARY KEY,
        value       TEXT    NOT NULL,
        updated_at  INTEGER NOT NULL
    ) STRICT;
";

/// Ordered `(version, ddl)` steps. Append only; never edit a shipped step.
const MIGRATIONS: &[(i64, &str)] = &[(1, SCHEMA_V1_SQL)];

/// Brings `db` up to the newest version in [`MIGRATIONS`]. Safe to call on
/// every open.
///
/// # Errors
///
/// Returns `rusqlite::Error` if a step fails; that step's transaction is
/// rolled back.
pub fn migrate(db: &mut rusqlite::Connection) -> rusqlite::Result<()> {
    db.execute_batch(SCHEMA_VERSION_DDL)?;

    let current: i64 = db.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    for &(version, ddl) in MIGRATIONS.iter().filter(|(v, _)| *v > current) {
        let tx = db.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;
        tx.execute_batch(ddl)?;
        tx.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
        tx.commit()?;
    }

    Ok(())
}
