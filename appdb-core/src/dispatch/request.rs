//! Inbound request envelope

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::error::{DispatchError, DispatchResult};

/// Operation requested by the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    SetDev,
    CreateUser,
    SignIn,
    SignOut,
    GetAuth,
    Get,
    Set,
    Put,
    Delete,
}

impl Action {
    pub const ALL: [Action; 9] = [
        Action::SetDev,
        Action::CreateUser,
        Action::SignIn,
        Action::SignOut,
        Action::GetAuth,
        Action::Get,
        Action::Set,
        Action::Put,
        Action::Delete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::SetDev => "SETDEV",
            Action::CreateUser => "CREATEUSER",
            Action::SignIn => "SIGNIN",
            Action::SignOut => "SIGNOUT",
            Action::GetAuth => "GETAUTH",
            Action::Get => "GET",
            Action::Set => "SET",
            Action::Put => "PUT",
            Action::Delete => "DELETE",
        }
    }

    /// `SIGNOUT` and `GETAUTH` are keyed by the query string first
    pub fn prefers_query_key(&self) -> bool {
        matches!(self, Action::SignOut | Action::GetAuth)
    }
}

impl FromStr for Action {
    type Err = DispatchError;

    /// Names match exactly; `get` is not `GET`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| DispatchError::UnsupportedAction(s.to_string()))
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// JSON body: `{action, key, data}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestEnvelope {
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub data: Option<Value>,
}

impl RequestEnvelope {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            ..Default::default()
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Decode a raw body. An empty body is a bare `GET`, which is what
    /// clients send when reading.
    pub fn from_body(body: &[u8]) -> DispatchResult<Self> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::new(Action::Get.as_str()));
        }
        serde_json::from_slice(body)
            .map_err(|e| DispatchError::InvalidArgument(format!("Malformed request body: {e}")))
    }
}

/// Everything the dispatcher needs about one request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InboundRequest {
    pub envelope: RequestEnvelope,
    /// `?key=` from the URL
    pub query_key: Option<String>,
    /// `Developer-Key` header
    pub developer_key: Option<String>,
}

fn non_empty(key: Option<&String>) -> Option<&str> {
    key.map(String::as_str).filter(|k| !k.is_empty())
}

impl InboundRequest {
    pub fn new(envelope: RequestEnvelope) -> Self {
        Self {
            envelope,
            ..Default::default()
        }
    }

    pub fn with_query_key(mut self, key: impl Into<String>) -> Self {
        self.query_key = Some(key.into());
        self
    }

    pub fn with_developer_key(mut self, key: impl Into<String>) -> Self {
        self.developer_key = Some(key.into());
        self
    }

    /// Record id for `action`, preferring whichever key source that action
    /// reads first and falling back to the other. Empty keys count as absent.
    pub fn key_for(&self, action: Action) -> Option<&str> {
        let body = non_empty(self.envelope.key.as_ref());
        let query = non_empty(self.query_key.as_ref());
        if action.prefers_query_key() {
            query.or(body)
        } else {
            body.or(query)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_action_names_are_exact() {
        for action in Action::ALL {
            assert_eq!(action.as_str().parse::<Action>().unwrap(), action);
        }
        assert!(matches!(
            "get".parse::<Action>(),
            Err(DispatchError::UnsupportedAction(a)) if a == "get"
        ));
        assert!("PATCH".parse::<Action>().is_err());
    }

    #[test]
    fn test_envelope_from_body() {
        let env = RequestEnvelope::from_body(br#"{"action":"SET","key":"k","data":{"a":1}}"#)
            .unwrap();
        assert_eq!(
            env,
            RequestEnvelope::new("SET").with_key("k").with_data(json!({"a": 1}))
        );

        let env = RequestEnvelope::from_body(br#"{"action":"SIGNOUT","key":null,"data":null}"#)
            .unwrap();
        assert_eq!(env.key, None);
        assert_eq!(env.data, None);
    }

    #[test]
    fn test_empty_body_is_get() {
        assert_eq!(RequestEnvelope::from_body(b"").unwrap().action, "GET");
        assert_eq!(RequestEnvelope::from_body(b"  \n").unwrap().action, "GET");
    }

    #[test]
    fn test_malformed_body_is_invalid_argument() {
        let err = RequestEnvelope::from_body(b"{not json").unwrap_err();
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn test_key_source_per_action() {
        let req = InboundRequest::new(RequestEnvelope::new("GETAUTH").with_key("body"))
            .with_query_key("query");

        assert_eq!(req.key_for(Action::GetAuth), Some("query"));
        assert_eq!(req.key_for(Action::SignOut), Some("query"));
        assert_eq!(req.key_for(Action::Get), Some("body"));
        assert_eq!(req.key_for(Action::Delete), Some("body"));
    }

    #[test]
    fn test_key_source_falls_back() {
        let body_only = InboundRequest::new(RequestEnvelope::new("SIGNOUT").with_key("body"));
        assert_eq!(body_only.key_for(Action::SignOut), Some("body"));

        let query_only = InboundRequest::new(RequestEnvelope::new("GET")).with_query_key("q");
        assert_eq!(query_only.key_for(Action::Get), Some("q"));

        let empty = InboundRequest::new(RequestEnvelope::new("DELETE").with_key(""))
            .with_query_key("");
        assert_eq!(empty.key_for(Action::Delete), None);
    }
}
