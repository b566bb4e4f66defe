// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # JSON-RPC HTTP Transport
//!
//! One POST endpoint carrying JSON-RPC 2.0 envelopes, plus `/health` and an
//! optional Prometheus `/metrics` route.
//!
//! Every call runs under a [`CallContext`] with the configured deadline and a
//! cancellation token that fires if the request future is dropped (client
//! went away). After completion the transport emits exactly one log entry
//! and records the per-method metrics. JSON-RPC error replies are sent with
//! HTTP 200; the logged status code is 400 when the call failed.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response as HttpResponse};
use axum::routing::{get, post};
use axum::{Json, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::domain::context::CallContext;
use crate::domain::error::NetworkError;
use crate::presentation::jsonrpc::protocol::{
    error_code, local_method, map_error, Request, Response, RpcError, RpcErrorCode,
    JSONRPC_VERSION,
};
use crate::presentation::jsonrpc::service::JsonRpcService;
use crate::presentation::jsonrpc::types::Method;

pub const REQUESTS_TOTAL: &str = "agentnet_rpc_requests_total";
pub const REQUEST_DURATION_SECONDS: &str = "agentnet_rpc_request_duration_seconds";

/// `method` label for envelopes that never named a method
const INVALID_METHOD_LABEL: &str = "<invalid>";
/// `method` label for names outside the service's method set
const UNKNOWN_METHOD_LABEL: &str = "<unknown>";

/// Routing and deadline settings for [`router`].
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub rpc_path: String,
    pub request_timeout: Duration,
    /// Served only when a Prometheus handle is supplied
    pub metrics_path: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            rpc_path: "/rpc".to_string(),
            request_timeout: Duration::from_secs(30),
            metrics_path: "/metrics".to_string(),
        }
    }
}

struct AppState {
    service: JsonRpcService,
    request_timeout: Duration,
    metrics: Option<PrometheusHandle>,
    start_time: Instant,
}

pub fn router(
    service: JsonRpcService,
    config: TransportConfig,
    metrics: Option<PrometheusHandle>,
) -> Router {
    let serve_metrics = metrics.is_some();
    let state = Arc::new(AppState {
        service,
        request_timeout: config.request_timeout,
        metrics,
        start_time: Instant::now(),
    });

    let mut app = Router::new()
        .route(&config.rpc_path, post(rpc_handler))
        .route("/health", get(health_handler));
    if serve_metrics {
        app = app.route(&config.metrics_path, get(metrics_handler));
    }
    app.with_state(state)
}

async fn health_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "uptime_seconds": state.start_time.elapsed().as_secs(),
    }))
}

async fn metrics_handler(State(state): State<Arc<AppState>>) -> HttpResponse {
    match &state.metrics {
        Some(handle) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

fn is_json_content_type(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case("application/json"))
}

/// Why an envelope was rejected before dispatch.
fn protocol_failure(code: RpcErrorCode, message: impl Into<String>) -> NetworkError {
    NetworkError::with_code(code.code(), message)
}

/// Validate the envelope; yields the request id (when readable) and the request.
fn parse_envelope(body: &[u8]) -> (Value, Result<Request, NetworkError>) {
    let raw: Value = match serde_json::from_slice(body) {
        Ok(v) => v,
        Err(e) => {
            return (
                Value::Null,
                Err(protocol_failure(RpcErrorCode::ParseError, "parse error").with_source(e)),
            )
        }
    };

    let Some(object) = raw.as_object() else {
        return (
            Value::Null,
            Err(protocol_failure(RpcErrorCode::InvalidRequest, "request must be a JSON object")),
        );
    };
    let id = object.get("id").cloned().unwrap_or(Value::Null);

    let request: Request = match serde_json::from_value(raw) {
        Ok(r) => r,
        Err(e) => {
            return (
                id,
                Err(
                    protocol_failure(RpcErrorCode::InvalidRequest, "invalid request")
                        .with_source(e),
                ),
            )
        }
    };
    if request.jsonrpc != JSONRPC_VERSION {
        return (
            id,
            Err(protocol_failure(
                RpcErrorCode::InvalidRequest,
                format!("jsonrpc must be \"{}\"", JSONRPC_VERSION),
            )),
        );
    }

    (id, Ok(request))
}

async fn rpc_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> HttpResponse {
    if !is_json_content_type(&headers) {
        return (
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            "rpc: unrecognized Content-Type, expected application/json",
        )
            .into_response();
    }

    // Fires the context's cancellation if this future is dropped mid-call
    let cancel = CancellationToken::new();
    let _cancel_on_drop = cancel.clone().drop_guard();
    let ctx = CallContext::background()
        .with_timeout(state.request_timeout)
        .with_cancellation(cancel);

    let (id, parsed) = parse_envelope(&body);
    let (method, outcome) = match parsed {
        Ok(request) => {
            let outcome = match local_method(&request.method) {
                Some(method) => state.service.call(&ctx, method, request.params).await,
                None => Err(protocol_failure(
                    RpcErrorCode::MethodNotFound,
                    format!("method {} not found", request.method),
                )),
            };
            (request.method, outcome)
        }
        Err(err) => (String::new(), Err(err)),
    };

    let response = finish(&ctx, &method, id, outcome);
    Json(response).into_response()
}

/// Log, record metrics and build the envelope for a completed call.
fn finish(
    ctx: &CallContext,
    method: &str,
    id: Value,
    outcome: Result<Value, NetworkError>,
) -> Response {
    let elapsed = ctx.elapsed();
    let duration_ms = elapsed.as_secs_f64() * 1000.0;

    let (status, response) = match outcome {
        Ok(result) => {
            info!(
                method = %method,
                status_code = 200,
                duration_ms,
                "[JSON-RPC] call"
            );
            ("ok", Response::success(id, result))
        }
        Err(err) => {
            let rpc: RpcError = map_error(&err);
            error!(
                method = %method,
                status_code = 400,
                code = error_code(err.kind()),
                duration_ms,
                error = %err.detail(),
                "[JSON-RPC] call"
            );
            ("error", Response::error(id, rpc))
        }
    };

    let label = metric_label(method);
    metrics::counter!(REQUESTS_TOTAL, "method" => label, "status" => status).increment(1);
    metrics::histogram!(REQUEST_DURATION_SECONDS, "method" => label)
        .record(elapsed.as_secs_f64());

    response
}

/// Metric label for a qualified method name. Only the service's own methods
/// get a series of their own; client-chosen names never reach the recorder.
fn metric_label(method: &str) -> &'static str {
    if method.is_empty() {
        return INVALID_METHOD_LABEL;
    }
    local_method(method)
        .and_then(Method::parse)
        .map_or(UNKNOWN_METHOD_LABEL, |m| m.as_str())
}
