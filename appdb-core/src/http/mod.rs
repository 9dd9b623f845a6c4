//! HTTP worker endpoint
//!
//! `POST /worker-endpoint?key=<k>` with a `Developer-Key` header carries the
//! request envelope; `/health` and `/metrics` are operational routes.

pub mod api;
pub mod handlers;
pub mod server;
pub mod state;

pub use api::build_router;
pub use server::AppDbServer;
pub use state::AppState;
