//! Request dispatch: envelope decoding, routing and response shaping

pub mod dispatcher;
pub mod request;
pub mod response;

pub use dispatcher::Dispatcher;
pub use request::{Action, InboundRequest, RequestEnvelope};
pub use response::DispatchResponse;
