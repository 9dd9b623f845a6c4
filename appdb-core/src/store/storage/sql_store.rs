//! SQLite-backed storage shared by every namespace
//!
//! All record statements bind the namespace id next to the record id; there
//! is no statement that reads or writes records without naming a namespace.

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension, TransactionBehavior};
use serde_json::Value;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

use super::migrations::{self, now_millis};
use crate::config::StorageConfig;
use crate::store::error::{StoreError, StoreResult};
use crate::store::record::{NamespaceId, Record};

/// SQL storage for namespaces and their records
pub struct SqlRecordStore {
    pool: Pool<SqliteConnectionManager>,
}

fn with_pragmas(manager: SqliteConnectionManager, busy_timeout: Duration) -> SqliteConnectionManager {
    manager.with_init(move |conn| {
        conn.busy_timeout(busy_timeout)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")
    })
}

impl SqlRecordStore {
    /// Wrap an existing pool and bring its schema up to date
    pub fn new(pool: Pool<SqliteConnectionManager>) -> StoreResult<Self> {
        migrations::migrate(&pool)?;
        Ok(Self { pool })
    }

    /// Open (or create) the database file named in `config`
    pub fn open(config: &StorageConfig) -> StoreResult<Self> {
        Self::open_path(&config.database_path, config.pool_size, config.busy_timeout)
    }

    pub fn open_path(path: &Path, pool_size: u32, busy_timeout: Duration) -> StoreResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let manager = with_pragmas(SqliteConnectionManager::file(path), busy_timeout);
        let pool = Pool::builder().max_size(pool_size).build(manager)?;

        info!(path = %path.display(), pool_size, "opened record store");
        Self::new(pool)
    }

    /// In-memory store.
    ///
    /// Every SQLite in-memory connection is its own database, so the pool is
    /// capped at one connection. Callers must not hold a connection while
    /// asking for another.
    pub fn memory() -> StoreResult<Self> {
        let manager = with_pragmas(SqliteConnectionManager::memory(), Duration::from_secs(5));
        let pool = Pool::builder().max_size(1).build(manager)?;
        Self::new(pool)
    }

    // ===== Namespace Operations =====

    /// Create the namespace if missing. Returns `true` when it was created.
    pub fn ensure_namespace(&self, namespace: &NamespaceId) -> StoreResult<bool> {
        let conn = self.pool.get()?;
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO namespaces (id, created_at) VALUES (?, ?)",
            params![namespace.as_str(), now_millis()],
        )?;

        if inserted > 0 {
            debug!(namespace = %namespace, "created namespace");
        }
        Ok(inserted > 0)
    }

    /// Create the namespace for `owner`, or confirm `owner` already holds it.
    ///
    /// Returns `true` when the namespace was created. Fails with
    /// [`StoreError::NamespaceOwned`] when another owner holds it. An unowned
    /// namespace from an older schema goes to its first claimant.
    pub fn claim_namespace(&self, namespace: &NamespaceId, owner: &str) -> StoreResult<bool> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let created = tx.execute(
            "INSERT OR IGNORE INTO namespaces (id, created_at, owner) VALUES (?, ?, ?)",
            params![namespace.as_str(), now_millis(), owner],
        )? > 0;
        if !created {
            tx.execute(
                "UPDATE namespaces SET owner = ? WHERE id = ? AND owner IS NULL",
                params![owner, namespace.as_str()],
            )?;
        }

        let holder: Option<String> = tx.query_row(
            "SELECT owner FROM namespaces WHERE id = ?",
            params![namespace.as_str()],
            |row| row.get(0),
        )?;
        if holder.as_deref() != Some(owner) {
            return Err(StoreError::NamespaceOwned(namespace.to_string()));
        }

        tx.commit()?;
        if created {
            debug!(namespace = %namespace, "created namespace");
        }
        Ok(created)
    }

    #[cfg(test)]
    pub(crate) fn namespace_exists(&self, namespace: &NamespaceId) -> StoreResult<bool> {
        let conn = self.pool.get()?;
        let found = conn
            .query_row(
                "SELECT 1 FROM namespaces WHERE id = ?",
                params![namespace.as_str()],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// All namespace ids, sorted
    pub fn list_namespaces(&self) -> StoreResult<Vec<NamespaceId>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare("SELECT id FROM namespaces ORDER BY id")?;
        let ids = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .map(|id| id.map(NamespaceId::new))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    // ===== Record Operations =====

    pub fn get_record(&self, namespace: &NamespaceId, id: &str) -> StoreResult<Option<Value>> {
        let conn = self.pool.get()?;
        let raw: Option<String> = conn
            .query_row(
                "SELECT data FROM records WHERE namespace = ? AND id = ?",
                params![namespace.as_str(), id],
                |row| row.get(0),
            )
            .optional()?;

        raw.map(|text| serde_json::from_str(&text))
            .transpose()
            .map_err(StoreError::from)
    }

    /// Every record in the namespace, ordered by id
    pub fn list_records(&self, namespace: &NamespaceId) -> StoreResult<Vec<Record>> {
        let conn = self.pool.get()?;
        let mut stmt =
            conn.prepare("SELECT id, data FROM records WHERE namespace = ? ORDER BY id")?;

        let rows = stmt
            .query_map(params![namespace.as_str()], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, text)| Ok(Record::new(id, serde_json::from_str(&text)?)))
            .collect()
    }

    /// Insert or fully replace one record in a single statement
    pub fn upsert_record(&self, namespace: &NamespaceId, id: &str, data: &Value) -> StoreResult<()> {
        let text = serde_json::to_string(data)?;
        let conn = self.pool.get()?;

        let result = conn.execute(
            "INSERT INTO records (namespace, id, data, updated_at) VALUES (?, ?, ?, ?)
             ON CONFLICT(namespace, id) DO UPDATE SET
                data = excluded.data,
                updated_at = excluded.updated_at",
            params![namespace.as_str(), id, text, now_millis()],
        );

        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY =>
            {
                Err(StoreError::UnknownNamespace(namespace.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Delete one record. Returns `true` when a row was removed.
    pub fn delete_record(&self, namespace: &NamespaceId, id: &str) -> StoreResult<bool> {
        let conn = self.pool.get()?;
        let removed = conn.execute(
            "DELETE FROM records WHERE namespace = ? AND id = ?",
            params![namespace.as_str(), id],
        )?;
        Ok(removed > 0)
    }

    /// Highest applied schema migration
    pub fn schema_version(&self) -> StoreResult<i32> {
        migrations::current_version(&self.pool)
    }

    /// Check out a connection and run a trivial query
    pub fn health_check(&self) -> StoreResult<()> {
        let conn = self.pool.get()?;
        conn.query_row("SELECT 1", [], |_| Ok(()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store_with(namespaces: &[&str]) -> SqlRecordStore {
        let store = SqlRecordStore::memory().unwrap();
        for ns in namespaces {
            store.ensure_namespace(&NamespaceId::from(*ns)).unwrap();
        }
        store
    }

    #[test]
    fn test_ensure_namespace_reports_creation_once() {
        let store = SqlRecordStore::memory().unwrap();
        let ns = NamespaceId::from("dev_a");

        assert!(!store.namespace_exists(&ns).unwrap());
        assert!(store.ensure_namespace(&ns).unwrap());
        assert!(!store.ensure_namespace(&ns).unwrap());
        assert!(store.namespace_exists(&ns).unwrap());
        assert_eq!(store.list_namespaces().unwrap(), vec![ns]);
    }

    #[test]
    fn test_claim_namespace_is_exclusive_to_its_owner() {
        let store = SqlRecordStore::memory().unwrap();
        let ns = NamespaceId::from("dev_a");

        assert!(store.claim_namespace(&ns, "dev-A").unwrap());
        assert!(!store.claim_namespace(&ns, "dev-A").unwrap());

        let err = store.claim_namespace(&ns, "dev-B").unwrap_err();
        assert!(matches!(err, StoreError::NamespaceOwned(n) if n == "dev_a"));
        assert!(!store.claim_namespace(&ns, "dev-A").unwrap());
    }

    #[test]
    fn test_unowned_namespace_goes_to_first_claimant() {
        let store = store_with(&["dev_legacy"]);
        let ns = NamespaceId::from("dev_legacy");

        assert!(!store.claim_namespace(&ns, "dev-A").unwrap());
        assert!(store.claim_namespace(&ns, "dev-B").is_err());
    }

    #[test]
    fn test_schema_version_is_current_after_open() {
        let store = SqlRecordStore::memory().unwrap();
        assert_eq!(store.schema_version().unwrap(), migrations::CURRENT_SCHEMA_VERSION);
    }

    #[test]
    fn test_upsert_replaces_whole_payload() {
        let store = store_with(&["dev_a"]);
        let ns = NamespaceId::from("dev_a");

        store.upsert_record(&ns, "k", &json!({"a": 1, "b": 2})).unwrap();
        store.upsert_record(&ns, "k", &json!({"c": 3})).unwrap();

        assert_eq!(store.get_record(&ns, "k").unwrap(), Some(json!({"c": 3})));
    }

    #[test]
    fn test_same_id_in_two_namespaces_is_two_records() {
        let store = store_with(&["dev_a", "dev_b"]);
        let a = NamespaceId::from("dev_a");
        let b = NamespaceId::from("dev_b");

        store.upsert_record(&a, "user1", &json!("from a")).unwrap();
        assert_eq!(store.get_record(&b, "user1").unwrap(), None);

        store.upsert_record(&b, "user1", &json!("from b")).unwrap();
        assert_eq!(store.get_record(&a, "user1").unwrap(), Some(json!("from a")));
        assert_eq!(store.list_records(&b).unwrap().len(), 1);

        assert!(store.delete_record(&a, "user1").unwrap());
        assert_eq!(store.get_record(&b, "user1").unwrap(), Some(json!("from b")));
    }

    #[test]
    fn test_write_to_unknown_namespace_is_rejected() {
        let store = SqlRecordStore::memory().unwrap();
        let err = store
            .upsert_record(&NamespaceId::from("dev_ghost"), "k", &json!({}))
            .unwrap_err();
        assert!(matches!(err, StoreError::UnknownNamespace(ns) if ns == "dev_ghost"));
    }

    #[test]
    fn test_list_records_is_ordered_by_id() {
        let store = store_with(&["dev_a"]);
        let ns = NamespaceId::from("dev_a");
        for id in ["c", "a", "b"] {
            store.upsert_record(&ns, id, &json!(id)).unwrap();
        }

        let ids: Vec<_> = store
            .list_records(&ns)
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("appdb.sqlite3");
        let ns = NamespaceId::from("dev_a");

        {
            let store = SqlRecordStore::open_path(&path, 2, Duration::from_secs(1)).unwrap();
            store.ensure_namespace(&ns).unwrap();
            store.upsert_record(&ns, "k", &json!({"kept": true})).unwrap();
        }

        let store = SqlRecordStore::open_path(&path, 2, Duration::from_secs(1)).unwrap();
        assert_eq!(store.get_record(&ns, "k").unwrap(), Some(json!({"kept": true})));
        store.health_check().unwrap();
    }
}
