//! Schema migrations for the record store
//!
//! Applied versions are tracked in `appdb_schema_version`; each step runs in
//! its own transaction, so `migrate` can be called on every open.

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Connection};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::info;

use crate::store::error::StoreResult;

pub const CURRENT_SCHEMA_VERSION: i32 = 3;

struct Step {
    version: i32,
    name: &'static str,
    sql: &'static str,
}

const STEPS: &[Step] = &[
    Step {
        version: 1,
        name: "namespaces and records",
        sql: r#"
            CREATE TABLE IF NOT EXISTS namespaces (
                id TEXT PRIMARY KEY,
                created_at INTEGER NOT NULL
            );

            -- (namespace, id) is the only lookup path into records
            CREATE TABLE IF NOT EXISTS records (
                namespace TEXT NOT NULL REFERENCES namespaces(id),
                id TEXT NOT NULL,
                data TEXT NOT NULL,
                updated_at INTEGER NOT NULL,
                PRIMARY KEY (namespace, id)
            );
        "#,
    },
    Step {
        version: 2,
        name: "records by last write",
        sql: "CREATE INDEX IF NOT EXISTS idx_records_updated ON records(namespace, updated_at);",
    },
    Step {
        version: 3,
        name: "namespace owners",
        // NULL for the registry namespace and for namespaces created before v3
        sql: "ALTER TABLE namespaces ADD COLUMN owner TEXT;",
    },
];

pub(crate) fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

fn applied_version(conn: &Connection) -> rusqlite::Result<i32> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS appdb_schema_version (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        );",
    )?;
    let version: Option<i32> =
        conn.query_row("SELECT MAX(version) FROM appdb_schema_version", [], |row| {
            row.get(0)
        })?;
    Ok(version.unwrap_or(0))
}

/// Highest schema version applied to the database behind `pool`
pub(crate) fn current_version(pool: &Pool<SqliteConnectionManager>) -> StoreResult<i32> {
    let conn = pool.get()?;
    Ok(applied_version(&conn)?)
}

/// Apply every step newer than the database's version
pub fn migrate(pool: &Pool<SqliteConnectionManager>) -> StoreResult<()> {
    let mut conn = pool.get()?;
    let from = applied_version(&conn)?;

    for step in STEPS.iter().filter(|s| s.version > from) {
        let tx = conn.transaction()?;
        tx.execute_batch(step.sql)?;
        tx.execute(
            "INSERT INTO appdb_schema_version (version, applied_at) VALUES (?, ?)",
            params![step.version, now_millis()],
        )?;
        tx.commit()?;

        info!(version = step.version, step = step.name, "applied migration");
    }

    Ok(())
}
