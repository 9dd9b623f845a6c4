//! Request dispatcher
//!
//! Every request except `SETDEV` must carry a registered developer key; the
//! key is resolved to a namespace before the action name is even looked at,
//! so an unregistered caller learns nothing beyond `Unauthorized`.

use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info_span, warn};

use super::request::{Action, InboundRequest};
use super::response::{DispatchResponse, AUTHENTICATED_MESSAGE, NOT_AUTHENTICATED_MESSAGE};
use crate::auth::{AuthState, AuthStateMachine, Credentials};
use crate::config::StorageConfig;
use crate::error::{DispatchError, DispatchResult};
use crate::metrics;
use crate::registry::{NamespaceRegistry, RegistryError};
use crate::store::{NamespaceStore, SqlRecordStore};

/// Routes request envelopes to the registry, record store and auth machine
pub struct Dispatcher {
    backend: Arc<SqlRecordStore>,
    registry: NamespaceRegistry,
}

impl Dispatcher {
    pub fn new(backend: Arc<SqlRecordStore>, config: &StorageConfig) -> Result<Self, RegistryError> {
        let registry = NamespaceRegistry::new(backend.clone(), config)?;
        Ok(Self { backend, registry })
    }

    pub fn registry(&self) -> &NamespaceRegistry {
        &self.registry
    }

    pub fn backend(&self) -> &Arc<SqlRecordStore> {
        &self.backend
    }

    /// Handle one request. Failures come back as error envelopes, never as
    /// `Err`.
    pub fn dispatch(&self, request: &InboundRequest) -> DispatchResponse {
        let action = request.envelope.action.parse::<Action>();
        let label = action.as_ref().map(Action::as_str).unwrap_or("UNKNOWN");

        let span = info_span!("dispatch", action = label);
        let _enter = span.enter();
        let timer = metrics::Timer::new(metrics::REQUEST_DURATION, label);

        let response = match self.route(request, action) {
            Ok(response) => response,
            Err(err) => {
                warn!(kind = err.kind(), error = %err, "request failed");
                err.into()
            }
        };

        timer.stop();
        metrics::record_request(label, response.status);
        debug!(status = response.status, "request handled");
        response
    }

    fn route(
        &self,
        request: &InboundRequest,
        action: DispatchResult<Action>,
    ) -> DispatchResult<DispatchResponse> {
        if let Ok(Action::SetDev) = action {
            return self.set_dev(request);
        }

        let namespace = self.registry.resolve(request.developer_key.as_deref())?;
        let action = action?;
        let records = self.registry.open(namespace);
        let key = request.key_for(action);
        let data = request.envelope.data.clone().unwrap_or_default();

        match action {
            Action::SetDev => self.set_dev(request),
            Action::CreateUser => {
                AuthStateMachine::new(&records).create_user(require_key(key)?, &data)?;
                Ok(DispatchResponse::success("User created successfully."))
            }
            Action::SignIn => {
                let credentials = Credentials::from_payload(&data)?;
                AuthStateMachine::new(&records).sign_in(require_key(key)?, &credentials)?;
                Ok(DispatchResponse::success("User signed in."))
            }
            Action::SignOut => {
                AuthStateMachine::new(&records).sign_out(require_key(key)?)?;
                Ok(DispatchResponse::success("User signed out."))
            }
            Action::GetAuth => match AuthStateMachine::new(&records).get_auth(require_key(key)?)? {
                AuthState::Authenticated => Ok(DispatchResponse::success(AUTHENTICATED_MESSAGE)),
                AuthState::NotAuthenticated => {
                    Ok(DispatchResponse::error(403, NOT_AUTHENTICATED_MESSAGE))
                }
            },
            Action::Get => get(&records, key),
            Action::Set => {
                records.put(require_key(key)?, data)?;
                Ok(DispatchResponse::success("Data stored successfully."))
            }
            Action::Put => {
                records.merge(require_key(key)?, data)?;
                Ok(DispatchResponse::success("Data updated successfully."))
            }
            Action::Delete => {
                let key = key.ok_or_else(|| {
                    DispatchError::InvalidArgument("Key is required for deletion.".to_string())
                })?;
                records.remove(key)?;
                Ok(DispatchResponse::success("Data removed successfully."))
            }
        }
    }

    fn set_dev(&self, request: &InboundRequest) -> DispatchResult<DispatchResponse> {
        let credential = require_key(request.key_for(Action::SetDev))?;
        let metadata = request.envelope.data.clone().unwrap_or_default();

        self.registry.register(credential, metadata)?;
        Ok(DispatchResponse::success("Developer data stored successfully."))
    }
}

fn require_key(key: Option<&str>) -> DispatchResult<&str> {
    key.ok_or_else(|| DispatchError::InvalidArgument("Key is required.".to_string()))
}

fn get(records: &NamespaceStore, key: Option<&str>) -> DispatchResult<DispatchResponse> {
    let Some(key) = key else {
        return Ok(DispatchResponse::payload(Value::Object(records.get_all()?)));
    };

    Ok(match records.get(key)? {
        Some(data) => DispatchResponse::payload(data),
        None => DispatchResponse::no_data(),
    })
}
