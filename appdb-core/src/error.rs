//! Failure taxonomy surfaced at the dispatcher boundary

use thiserror::Error;

use crate::auth::AuthError;
use crate::registry::RegistryError;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("{0}")]
    InvalidArgument(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    InvalidCredentials(String),

    #[error("Unsupported action: {0}")]
    UnsupportedAction(String),

    #[error("Storage failure: {0}")]
    StorageFailure(String),
}

impl DispatchError {
    /// HTTP status code for this failure
    pub fn status_code(&self) -> u16 {
        match self {
            DispatchError::InvalidArgument(_) => 400,
            DispatchError::Unauthorized(_) => 401,
            DispatchError::InvalidCredentials(_) => 401,
            DispatchError::NotFound(_) => 404,
            DispatchError::UnsupportedAction(_) => 405,
            DispatchError::StorageFailure(_) => 500,
        }
    }

    /// Short label used in logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            DispatchError::InvalidArgument(_) => "invalid_argument",
            DispatchError::Unauthorized(_) => "unauthorized",
            DispatchError::NotFound(_) => "not_found",
            DispatchError::InvalidCredentials(_) => "invalid_credentials",
            DispatchError::UnsupportedAction(_) => "unsupported_action",
            DispatchError::StorageFailure(_) => "storage_failure",
        }
    }
}

impl From<StoreError> for DispatchError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InvalidArgument(msg) => DispatchError::InvalidArgument(msg),
            other => DispatchError::StorageFailure(other.to_string()),
        }
    }
}

impl From<AuthError> for DispatchError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidArgument(msg) => DispatchError::InvalidArgument(msg),
            AuthError::NotFound => DispatchError::NotFound(err.to_string()),
            AuthError::InvalidCredentials => DispatchError::InvalidCredentials(err.to_string()),
            AuthError::Store(e) => e.into(),
        }
    }
}

impl From<RegistryError> for DispatchError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::InvalidArgument(msg) => DispatchError::InvalidArgument(msg),
            RegistryError::MissingCredential | RegistryError::UnknownCredential => {
                DispatchError::Unauthorized(err.to_string())
            }
            RegistryError::Store(e) => e.into(),
        }
    }
}

pub type DispatchResult<T> = Result<T, DispatchError>;
