//! Auth state machine
//!
//! An auth record is an ordinary record whose data carries `email`,
//! `password` and `authenticated`. Passwords are compared as opaque strings.
//!
//! `sign_in` and `sign_out` read and then write in two separate steps with no
//! lock held across them; a concurrent sign-in and sign-out on the same id
//! resolve last-writer-wins.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, info};

use crate::store::{NamespaceStore, StoreError};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("User not found.")]
    NotFound,

    #[error("Invalid email or password.")]
    InvalidCredentials,

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type AuthResult<T> = Result<T, AuthError>;

/// Authentication status reported by `get_auth`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AuthState {
    Authenticated,
    NotAuthenticated,
}

/// Email/password pair taken from a request payload
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    /// Pull `email` and `password` out of a request's `data` object
    pub fn from_payload(data: &Value) -> AuthResult<Self> {
        let field = |name: &str| {
            data.get(name)
                .and_then(Value::as_str)
                .map(str::to_owned)
                .ok_or_else(|| AuthError::InvalidArgument(format!("{name} is required")))
        };
        Ok(Self {
            email: field("email")?,
            password: field("password")?,
        })
    }
}

/// Stored shape of an auth record. Unknown fields ride along in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default)]
    pub authenticated: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AuthRecord {
    /// `None` when the stored data is not an object of the auth shape
    pub fn from_data(data: Value) -> Option<Self> {
        if !data.is_object() {
            return None;
        }
        serde_json::from_value(data).ok()
    }

    pub fn matches(&self, credentials: &Credentials) -> bool {
        self.email.as_deref() == Some(credentials.email.as_str())
            && self.password.as_deref() == Some(credentials.password.as_str())
    }

    fn into_data(self) -> AuthResult<Value> {
        serde_json::to_value(self).map_err(|e| AuthError::Store(e.into()))
    }
}

/// Auth transitions over the records of one namespace
pub struct AuthStateMachine<'a> {
    records: &'a NamespaceStore,
}

fn require_id(id: &str) -> AuthResult<()> {
    if id.is_empty() {
        return Err(AuthError::InvalidArgument("key is required".to_string()));
    }
    Ok(())
}

impl<'a> AuthStateMachine<'a> {
    pub fn new(records: &'a NamespaceStore) -> Self {
        Self { records }
    }

    fn load(&self, id: &str) -> AuthResult<Value> {
        require_id(id)?;
        self.records.get(id)?.ok_or(AuthError::NotFound)
    }

    fn store(&self, id: &str, record: AuthRecord) -> AuthResult<()> {
        self.records.put(id, record.into_data()?)?;
        Ok(())
    }

    /// Write a fresh auth record, signed in. Replaces whatever was at `id`.
    ///
    /// Other fields of `profile` (besides the credentials) are kept.
    pub fn create_user(&self, id: &str, profile: &Value) -> AuthResult<()> {
        require_id(id)?;
        let credentials = Credentials::from_payload(profile)?;

        let mut extra = profile.as_object().cloned().unwrap_or_default();
        for field in ["email", "password", "authenticated"] {
            extra.remove(field);
        }

        self.store(
            id,
            AuthRecord {
                email: Some(credentials.email),
                password: Some(credentials.password),
                authenticated: true,
                extra,
            },
        )?;

        info!(namespace = %self.records.namespace(), id, "created user");
        Ok(())
    }

    /// Mark the record authenticated if both email and password match
    pub fn sign_in(&self, id: &str, credentials: &Credentials) -> AuthResult<()> {
        let mut record =
            AuthRecord::from_data(self.load(id)?).ok_or(AuthError::InvalidCredentials)?;

        if !record.matches(credentials) {
            debug!(namespace = %self.records.namespace(), id, "sign-in rejected");
            return Err(AuthError::InvalidCredentials);
        }

        record.authenticated = true;
        self.store(id, record)?;

        info!(namespace = %self.records.namespace(), id, "user signed in");
        Ok(())
    }

    pub fn sign_out(&self, id: &str) -> AuthResult<()> {
        let mut record = AuthRecord::from_data(self.load(id)?).ok_or_else(|| {
            AuthError::InvalidArgument(format!("record {id} is not an auth record"))
        })?;

        record.authenticated = false;
        self.store(id, record)?;

        info!(namespace = %self.records.namespace(), id, "user signed out");
        Ok(())
    }

    /// Never fails on a missing record: absence reads as not authenticated
    pub fn get_auth(&self, id: &str) -> AuthResult<AuthState> {
        require_id(id)?;

        let authenticated = self
            .records
            .get(id)?
            .and_then(AuthRecord::from_data)
            .is_some_and(|record| record.authenticated);

        Ok(if authenticated {
            AuthState::Authenticated
        } else {
            AuthState::NotAuthenticated
        })
    }
}
