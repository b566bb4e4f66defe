// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! The per-call log record written by the transport, captured with an
//! in-memory tracing layer.

use agentnet_core::application::repository_factory::Repositories;
use agentnet_core::application::{StandardAgentRegistry, StandardThreadManager};
use agentnet_core::domain::agent::UnknownAgentPolicy;
use agentnet_core::domain::network_config::PaginationConfig;
use agentnet_core::infrastructure::HttpLivenessProbe;
use agentnet_core::presentation::jsonrpc::{
    router, JsonRpcService, TransportConfig, SERVICE_NAMESPACE,
};
use axum::body::Body;
use axum::http::{header, Request};
use axum::Router;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceExt;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::Layer;

const CALL_RECORD: &str = "[JSON-RPC] call";

#[derive(Debug, Clone)]
struct Record {
    level: Level,
    fields: HashMap<String, String>,
}

/// Keeps every event the transport emits so tests can inspect the fields.
#[derive(Clone, Default)]
struct CaptureLayer {
    records: Arc<Mutex<Vec<Record>>>,
}

impl CaptureLayer {
    fn calls(&self) -> Vec<Record> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.fields.get("message").map(String::as_str) == Some(CALL_RECORD))
            .cloned()
            .collect()
    }
}

struct FieldMap<'a>(&'a mut HashMap<String, String>);

impl Visit for FieldMap<'_> {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.0.insert(field.name().to_string(), value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.0.insert(field.name().to_string(), format!("{:?}", value));
    }
}

impl<S: Subscriber> Layer<S> for CaptureLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut fields = HashMap::new();
        event.record(&mut FieldMap(&mut fields));
        self.records.lock().unwrap().push(Record {
            level: *event.metadata().level(),
            fields,
        });
    }
}

fn app() -> Router {
    let repos = Repositories::in_memory();
    let checker = HttpLivenessProbe::new(Duration::from_secs(1)).unwrap();
    let registry = StandardAgentRegistry::new(
        repos.agents.clone(),
        Arc::new(checker),
        repos.sessions.clone(),
        UnknownAgentPolicy::Omit,
    );
    let threads =
        StandardThreadManager::new(repos.threads, repos.sessions, PaginationConfig::default());
    let service = JsonRpcService::new(Arc::new(registry), Arc::new(threads));
    router(service, TransportConfig::default(), None)
}

async fn rpc(app: &Router, method: &str, params: Value) -> Value {
    let envelope = json!({
        "jsonrpc": "2.0",
        "method": format!("{}.{}", SERVICE_NAMESPACE, method),
        "params": params,
        "id": 1,
    });
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/rpc")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(envelope.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_each_call_writes_one_record() {
    let capture = CaptureLayer::default();
    let _guard =
        tracing::subscriber::set_default(tracing_subscriber::registry().with(capture.clone()));
    let app = app();

    let created = rpc(&app, "CreateThread", json!({"participants": ["alice"]})).await;
    assert!(created.get("error").is_none());

    let calls = capture.calls();
    assert_eq!(calls.len(), 1);
    let record = &calls[0];
    assert_eq!(record.level, Level::INFO);
    assert_eq!(record.fields["method"], format!("{}.CreateThread", SERVICE_NAMESPACE));
    assert_eq!(record.fields["status_code"], "200");
    assert!(record.fields.contains_key("duration_ms"));
    assert!(!record.fields.contains_key("error"));
    assert!(!record.fields.contains_key("code"));

    rpc(&app, "GetNumMessages", json!({"thread_id": created["result"]["thread_id"]})).await;
    assert_eq!(capture.calls().len(), 2);
}

#[tokio::test]
async fn test_failed_call_logs_cause_chain_but_replies_without_it() {
    let capture = CaptureLayer::default();
    let _guard =
        tracing::subscriber::set_default(tracing_subscriber::registry().with(capture.clone()));
    let app = app();

    let created = rpc(&app, "CreateThread", json!({"participants": ["alice"]})).await;
    let reply = rpc(
        &app,
        "AddMessage",
        json!({
            "thread_id": created["result"]["thread_id"],
            "sender": "alice",
            "tool_calls": [{"name": "search", "arguments": "{oops"}],
        }),
    )
    .await;
    assert_eq!(reply["error"]["code"], -32602);
    let client_message = reply["error"]["message"].as_str().unwrap();
    assert!(client_message.contains("search"));
    assert!(!client_message.contains("line 1"), "cause leaked: {}", client_message);

    let calls = capture.calls();
    assert_eq!(calls.len(), 2);
    let record = &calls[1];
    assert_eq!(record.level, Level::ERROR);
    assert_eq!(record.fields["method"], format!("{}.AddMessage", SERVICE_NAMESPACE));
    assert_eq!(record.fields["status_code"], "400");
    assert_eq!(record.fields["code"], "-32602");
    assert!(record.fields["duration_ms"].parse::<f64>().unwrap() >= 0.0);

    let detail = &record.fields["error"];
    assert!(detail.starts_with(client_message), "detail: {}", detail);
    assert!(detail.contains("line 1 column 2"), "detail: {}", detail);
}

#[tokio::test]
async fn test_rejected_envelope_is_logged_once() {
    let capture = CaptureLayer::default();
    let _guard =
        tracing::subscriber::set_default(tracing_subscriber::registry().with(capture.clone()));
    let app = app();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/rpc")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let reply: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(reply["error"]["code"], -32700);
    assert_eq!(reply["error"]["message"], "parse error");

    let calls = capture.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].fields["code"], "-32700");
    assert!(calls[0].fields["error"].starts_with("parse error: "));
}
