//! Per-namespace record store
//!
//! `put`, `remove` are single statements. `merge` is a read followed by a
//! separate write with nothing held in between: two merges racing on the same
//! id resolve last-writer-wins.

use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::debug;

use super::error::{StoreError, StoreResult};
use super::record::NamespaceId;
use super::storage::SqlRecordStore;

/// Key/value view over a single namespace
#[derive(Clone)]
pub struct NamespaceStore {
    backend: Arc<SqlRecordStore>,
    namespace: NamespaceId,
}

fn require_id(id: &str) -> StoreResult<()> {
    if id.is_empty() {
        return Err(StoreError::InvalidArgument("key is required".to_string()));
    }
    Ok(())
}

fn is_empty_payload(data: &Value) -> bool {
    match data {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Union `partial`'s top-level fields over `existing`.
///
/// A non-object `existing` counts as `{}`; a `null` partial changes nothing;
/// any other non-object partial replaces the value outright.
pub fn shallow_merge(existing: Option<Value>, partial: Value) -> Value {
    let mut base = match existing {
        Some(Value::Object(fields)) => fields,
        _ => Map::new(),
    };

    match partial {
        Value::Object(fields) => {
            base.extend(fields);
            Value::Object(base)
        }
        Value::Null => Value::Object(base),
        other => other,
    }
}

impl NamespaceStore {
    pub fn new(backend: Arc<SqlRecordStore>, namespace: NamespaceId) -> Self {
        Self { backend, namespace }
    }

    pub fn namespace(&self) -> &NamespaceId {
        &self.namespace
    }

    /// Stored data for `id`, or `None` when absent
    pub fn get(&self, id: &str) -> StoreResult<Option<Value>> {
        require_id(id)?;
        self.backend.get_record(&self.namespace, id)
    }

    /// Every id in the namespace mapped to its data
    pub fn get_all(&self) -> StoreResult<Map<String, Value>> {
        let records = self.backend.list_records(&self.namespace)?;
        Ok(records.into_iter().map(|r| (r.id, r.data)).collect())
    }

    /// Full replace; creates the record if absent
    pub fn put(&self, id: &str, data: Value) -> StoreResult<()> {
        require_id(id)?;
        if is_empty_payload(&data) {
            return Err(StoreError::InvalidArgument("data is required".to_string()));
        }

        self.backend.upsert_record(&self.namespace, id, &data)?;
        debug!(namespace = %self.namespace, id, "put record");
        Ok(())
    }

    /// Shallow field-union of `partial` over the stored data. Returns the
    /// written value.
    pub fn merge(&self, id: &str, partial: Value) -> StoreResult<Value> {
        require_id(id)?;

        let existing = self.backend.get_record(&self.namespace, id)?;
        let merged = shallow_merge(existing, partial);
        self.backend.upsert_record(&self.namespace, id, &merged)?;

        debug!(namespace = %self.namespace, id, "merged record");
        Ok(merged)
    }

    /// Delete if present. Returns whether anything was removed; absence is not
    /// an error.
    pub fn remove(&self, id: &str) -> StoreResult<bool> {
        require_id(id)?;
        let removed = self.backend.delete_record(&self.namespace, id)?;
        debug!(namespace = %self.namespace, id, removed, "removed record");
        Ok(removed)
    }
}
