//! Record storage
//!
//! - **Storage**: one SQLite database holding every namespace
//! - **NamespaceStore**: the per-namespace key/value view the rest of the
//!   crate works with; it cannot address records outside its namespace

pub mod error;
pub mod namespace;
pub mod record;
pub mod storage;

pub use error::{StoreError, StoreResult};
pub use namespace::NamespaceStore;
pub use record::{NamespaceId, Record};
pub use storage::SqlRecordStore;
