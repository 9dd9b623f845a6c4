//! Namespace registry
//!
//! Developer registrations live as ordinary records in the well-known
//! registry namespace, keyed `developers/<credential>`, with the derived
//! `namespaceId` folded into the stored metadata.

use serde_json::{Map, Value};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::StorageConfig;
use crate::store::{NamespaceId, NamespaceStore, SqlRecordStore, StoreError};

/// Field of the registry record carrying the derived namespace
pub const NAMESPACE_FIELD: &str = "namespaceId";

/// Metadata field that, when present, replaces the credential as derivation input
pub const DEVELOPER_KEY_FIELD: &str = "developerKey";

const RECORD_PREFIX: &str = "developers/";

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("No Developer Key provided.")]
    MissingCredential,

    #[error("Invalid Developer Key.")]
    UnknownCredential,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Maps developer credentials to their isolated namespaces
pub struct NamespaceRegistry {
    backend: Arc<SqlRecordStore>,
    records: NamespaceStore,
    prefix: String,
}

/// Registry record id for a credential
pub fn registry_key(credential: &str) -> String {
    format!("{RECORD_PREFIX}{credential}")
}

impl NamespaceRegistry {
    /// Creates the registry namespace itself if this is a fresh database
    pub fn new(backend: Arc<SqlRecordStore>, config: &StorageConfig) -> Result<Self, RegistryError> {
        let registry_ns = NamespaceId::new(config.registry_namespace.clone());
        if backend.ensure_namespace(&registry_ns)? {
            info!(namespace = %registry_ns, "created registry namespace");
        }

        Ok(Self {
            records: NamespaceStore::new(backend.clone(), registry_ns),
            backend,
            prefix: config.namespace_prefix.clone(),
        })
    }

    pub fn registry_namespace(&self) -> &NamespaceId {
        self.records.namespace()
    }

    /// Namespace id for a credential and its metadata, without touching storage
    pub fn derive(&self, credential: &str, metadata: &Map<String, Value>) -> NamespaceId {
        let input = metadata
            .get(DEVELOPER_KEY_FIELD)
            .and_then(Value::as_str)
            .filter(|key| !key.is_empty())
            .unwrap_or(credential);
        NamespaceId::for_developer(&self.prefix, input)
    }

    /// Register (or re-register) a developer.
    ///
    /// The derived namespace is claimed for `credential` before the registry
    /// record is written, so a credential that resolves always points at
    /// existing storage it owns. Deriving a namespace held by another
    /// credential, or the registry namespace, fails with `InvalidArgument`.
    pub fn register(&self, credential: &str, metadata: Value) -> Result<NamespaceId, RegistryError> {
        if credential.is_empty() {
            return Err(RegistryError::InvalidArgument(
                "developer key is required".to_string(),
            ));
        }
        let Value::Object(mut fields) = metadata else {
            return Err(RegistryError::InvalidArgument(
                "developer data must be an object".to_string(),
            ));
        };

        let namespace = self.derive(credential, &fields);
        if &namespace == self.registry_namespace() {
            return Err(RegistryError::InvalidArgument(format!(
                "namespace {namespace} is reserved"
            )));
        }
        let created = match self.backend.claim_namespace(&namespace, credential) {
            Ok(created) => created,
            Err(StoreError::NamespaceOwned(_)) => {
                warn!(namespace = %namespace, "rejected claim on another developer's namespace");
                return Err(RegistryError::InvalidArgument(format!(
                    "namespace {namespace} is registered to another developer"
                )));
            }
            Err(e) => return Err(e.into()),
        };

        fields.insert(
            NAMESPACE_FIELD.to_string(),
            Value::String(namespace.as_str().to_string()),
        );
        self.records.put(&registry_key(credential), Value::Object(fields))?;

        info!(namespace = %namespace, created, "registered developer");
        Ok(namespace)
    }

    /// Namespace for a credential; fails when it is missing or unregistered
    pub fn resolve(&self, credential: Option<&str>) -> Result<NamespaceId, RegistryError> {
        let credential = credential
            .filter(|c| !c.is_empty())
            .ok_or(RegistryError::MissingCredential)?;

        let record = self
            .records
            .get(&registry_key(credential))?
            .ok_or(RegistryError::UnknownCredential)?;

        let namespace = record
            .get(NAMESPACE_FIELD)
            .and_then(Value::as_str)
            .ok_or(RegistryError::UnknownCredential)?;

        debug!(namespace, "resolved developer key");
        Ok(NamespaceId::new(namespace))
    }

    /// Record store for a resolved namespace
    pub fn open(&self, namespace: NamespaceId) -> NamespaceStore {
        NamespaceStore::new(self.backend.clone(), namespace)
    }

    /// Stored registration data for a credential
    pub fn lookup(&self, credential: &str) -> Result<Option<Value>, RegistryError> {
        if credential.is_empty() {
            return Ok(None);
        }
        Ok(self.records.get(&registry_key(credential))?)
    }
}
