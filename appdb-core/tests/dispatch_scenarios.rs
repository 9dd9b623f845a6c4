//! Multi-developer scenarios driven through the dispatcher

use appdb_core::config::StorageConfig;
use appdb_core::dispatch::{DispatchResponse, Dispatcher, InboundRequest, RequestEnvelope};
use appdb_core::store::SqlRecordStore;
use serde_json::{json, Value};
use std::sync::Arc;

struct Harness {
    dispatcher: Dispatcher,
}

impl Harness {
    fn new() -> Self {
        let backend = Arc::new(SqlRecordStore::memory().unwrap());
        Self {
            dispatcher: Dispatcher::new(backend, &StorageConfig::default()).unwrap(),
        }
    }

    fn register(&self, dev: &str, data: Value) -> DispatchResponse {
        self.dispatcher.dispatch(&InboundRequest::new(
            RequestEnvelope::new("SETDEV").with_key(dev).with_data(data),
        ))
    }

    fn send(&self, dev: &str, envelope: RequestEnvelope) -> DispatchResponse {
        self.dispatcher
            .dispatch(&InboundRequest::new(envelope).with_developer_key(dev))
    }

    fn get_all(&self, dev: &str) -> Value {
        self.send(dev, RequestEnvelope::new("GET")).body
    }
}

#[test]
fn test_unregistered_developer_cannot_read_registered_data() {
    let h = Harness::new();
    assert!(h.register("dev-A", json!({"name": "Alice"})).is_success());

    let put = RequestEnvelope::new("SET")
        .with_key("user1")
        .with_data(json!({"email": "a@x.com"}));
    assert!(h.send("dev-A", put).is_success());

    let resp = h.send("dev-B", RequestEnvelope::new("GET").with_key("user1"));
    assert_eq!(resp.status, 401);
    assert_eq!(resp.body["status"], "error");
}

#[test]
fn test_developer_key_metadata_cannot_reach_another_namespace() {
    let h = Harness::new();
    assert!(h.register("dev-A", json!({})).is_success());
    let put = RequestEnvelope::new("SET")
        .with_key("user1")
        .with_data(json!({"email": "a@x.com"}));
    assert!(h.send("dev-A", put).is_success());

    let resp = h.register("dev-B", json!({"developerKey": "dev-A"}));
    assert_eq!(resp.status, 400);
    assert_eq!(resp.body["status"], "error");

    let resp = h.send("dev-B", RequestEnvelope::new("GET").with_key("user1"));
    assert_eq!(resp.status, 401);
    assert_eq!(h.get_all("dev-A"), json!({"user1": {"email": "a@x.com"}}));
}

#[test]
fn test_unauthorized_requests_never_mutate() {
    let h = Harness::new();
    h.register("dev-A", json!({}));
    h.send(
        "dev-A",
        RequestEnvelope::new("SET").with_key("k").with_data(json!("original")),
    );

    for envelope in [
        RequestEnvelope::new("SET").with_key("k").with_data(json!("hijacked")),
        RequestEnvelope::new("PUT").with_key("k").with_data(json!({"x": 1})),
        RequestEnvelope::new("DELETE").with_key("k"),
    ] {
        assert_eq!(h.send("dev-A-typo", envelope).status, 401);
    }

    assert_eq!(h.get_all("dev-A"), json!({"k": "original"}));
}

#[test]
fn test_two_developers_same_id_stay_isolated() {
    let h = Harness::new();
    h.register("dev-A", json!({}));
    h.register("dev-B", json!({}));

    h.send(
        "dev-A",
        RequestEnvelope::new("SET").with_key("user1").with_data(json!({"owner": "A"})),
    );
    h.send(
        "dev-B",
        RequestEnvelope::new("SET").with_key("user1").with_data(json!({"owner": "B"})),
    );
    h.send("dev-B", RequestEnvelope::new("DELETE").with_key("user1"));

    assert_eq!(h.get_all("dev-A"), json!({"user1": {"owner": "A"}}));
    assert_eq!(h.get_all("dev-B"), json!({}));
}

#[test]
fn test_auth_state_is_per_developer() {
    let h = Harness::new();
    h.register("dev-A", json!({}));
    h.register("dev-B", json!({}));

    let create = RequestEnvelope::new("CREATEUSER")
        .with_key("u1")
        .with_data(json!({"email": "a@x.com", "password": "secret1"}));
    assert!(h.send("dev-A", create).is_success());

    let get_auth = |dev: &str| {
        h.dispatcher.dispatch(
            &InboundRequest::new(RequestEnvelope::new("GETAUTH"))
                .with_developer_key(dev)
                .with_query_key("u1"),
        )
    };
    assert_eq!(get_auth("dev-A").status, 200);
    assert_eq!(get_auth("dev-B").status, 403);
}

#[test]
fn test_reregistration_keeps_namespace_and_data() {
    let h = Harness::new();
    h.register("dev-A", json!({"plan": "free"}));
    h.send(
        "dev-A",
        RequestEnvelope::new("SET").with_key("k").with_data(json!(1)),
    );

    assert!(h.register("dev-A", json!({"plan": "pro"})).is_success());

    assert_eq!(h.get_all("dev-A"), json!({"k": 1}));
    let stored = h.dispatcher.registry().lookup("dev-A").unwrap().unwrap();
    assert_eq!(stored, json!({"plan": "pro", "namespaceId": "dev_dev-A"}));
}

#[test]
fn test_registry_records_are_not_reachable_as_data() {
    let h = Harness::new();
    h.register("dev-A", json!({"secret": "s3"}));

    let resp = h.send("dev-A", RequestEnvelope::new("GET").with_key("developers/dev-A"));
    assert_eq!(resp, DispatchResponse::no_data());
}

#[test]
fn test_delete_without_key_leaves_store_untouched() {
    let h = Harness::new();
    h.register("dev-A", json!({}));
    h.send(
        "dev-A",
        RequestEnvelope::new("SET").with_key("keep").with_data(json!(true)),
    );

    let resp = h.send("dev-A", RequestEnvelope::new("DELETE"));
    assert_eq!(resp.status, 400);
    assert_eq!(h.get_all("dev-A"), json!({"keep": true}));
}

#[test]
fn test_delete_is_idempotent() {
    let h = Harness::new();
    h.register("dev-A", json!({}));
    h.send(
        "dev-A",
        RequestEnvelope::new("SET").with_key("k").with_data(json!(1)),
    );

    assert!(h.send("dev-A", RequestEnvelope::new("DELETE").with_key("k")).is_success());
    assert!(h.send("dev-A", RequestEnvelope::new("DELETE").with_key("k")).is_success());
    assert_eq!(
        h.send("dev-A", RequestEnvelope::new("GET").with_key("k")),
        DispatchResponse::no_data()
    );
}

#[test]
fn test_merge_through_put_action() {
    let h = Harness::new();
    h.register("dev-A", json!({}));

    h.send(
        "dev-A",
        RequestEnvelope::new("PUT").with_key("k").with_data(json!({"a": 1, "b": 2})),
    );
    h.send(
        "dev-A",
        RequestEnvelope::new("PUT").with_key("k").with_data(json!({"b": 20, "c": 30})),
    );

    let resp = h.send("dev-A", RequestEnvelope::new("GET").with_key("k"));
    assert_eq!(resp.body, json!({"a": 1, "b": 20, "c": 30}));
}

#[test]
fn test_wrong_password_keeps_signed_out_state() {
    let h = Harness::new();
    h.register("dev-A", json!({}));
    h.send(
        "dev-A",
        RequestEnvelope::new("CREATEUSER")
            .with_key("u1")
            .with_data(json!({"email": "a@x.com", "password": "secret1"})),
    );
    h.dispatcher.dispatch(
        &InboundRequest::new(RequestEnvelope::new("SIGNOUT"))
            .with_developer_key("dev-A")
            .with_query_key("u1"),
    );

    let resp = h.send(
        "dev-A",
        RequestEnvelope::new("SIGNIN")
            .with_key("u1")
            .with_data(json!({"email": "a@x.com", "password": "guess"})),
    );
    assert_eq!(resp.status, 401);
    assert_eq!(resp.body["message"], "Invalid email or password.");

    let stored = h.send("dev-A", RequestEnvelope::new("GET").with_key("u1")).body;
    assert_eq!(stored["authenticated"], json!(false));
}
