//! AppDB: a multi-tenant record store with email/password auth
//!
//! Developers register a key with `SETDEV` and get an isolated namespace.
//! Every other request names that key, is resolved to the namespace, and is
//! routed to the record store or the auth state machine by the [`Dispatcher`].

pub mod auth;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod health;
pub mod http;
pub mod logging;
pub mod metrics;
pub mod registry;
pub mod shutdown;
pub mod store;

pub use auth::{AuthError, AuthState, AuthStateMachine, Credentials};
pub use config::{Config, ConfigError};
pub use dispatch::{Action, DispatchResponse, Dispatcher, InboundRequest, RequestEnvelope};
pub use error::DispatchError;
pub use logging::{init_logging, init_logging_with_config, LogConfig, LogFormat, LogLevel};
pub use registry::{NamespaceRegistry, RegistryError};
pub use store::{NamespaceId, NamespaceStore, SqlRecordStore, StoreError};
