//! Response envelope

use serde::Serialize;
use serde_json::{json, Value};

use crate::error::DispatchError;

pub const NO_DATA_MESSAGE: &str = "No data found";
pub const AUTHENTICATED_MESSAGE: &str = "User is authenticated!";
pub const NOT_AUTHENTICATED_MESSAGE: &str = "User not authenticated";

/// Status code plus JSON body, independent of any transport
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispatchResponse {
    pub status: u16,
    pub body: Value,
}

impl DispatchResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    /// 200 `{status: "success", message}`
    pub fn success(message: impl Into<String>) -> Self {
        Self::new(200, json!({"status": "success", "message": message.into()}))
    }

    /// `{status: "error", message}` under the given status
    pub fn error(status: u16, message: impl Into<String>) -> Self {
        Self::new(status, json!({"status": "error", "message": message.into()}))
    }

    /// Raw payload, 200
    pub fn payload(data: Value) -> Self {
        Self::new(200, data)
    }

    /// `GET` on an absent id
    pub fn no_data() -> Self {
        Self::new(404, json!({"message": NO_DATA_MESSAGE}))
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

impl From<DispatchError> for DispatchResponse {
    fn from(err: DispatchError) -> Self {
        Self::error(err.status_code(), err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_envelope_shape() {
        let resp: DispatchResponse =
            DispatchError::InvalidArgument("Key is required for deletion.".into()).into();
        assert_eq!(resp.status, 400);
        assert_eq!(
            resp.body,
            json!({"status": "error", "message": "Key is required for deletion."})
        );
        assert!(!resp.is_success());
    }

    #[test]
    fn test_no_data_is_404_with_message() {
        let resp = DispatchResponse::no_data();
        assert_eq!(resp.status, 404);
        assert_eq!(resp.body["message"], "No data found");
    }
}
