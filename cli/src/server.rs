// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Server process: wires storage, services and the JSON-RPC router, then
//! serves until Ctrl+C or SIGTERM.

use anyhow::{Context, Result};
use axum::Router;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};

use agentnet_core::application::repository_factory::create_repositories;
use agentnet_core::application::{StandardAgentRegistry, StandardThreadManager};
use agentnet_core::domain::network_config::NetworkConfigManifest;
use agentnet_core::infrastructure::HttpLivenessProbe;
use agentnet_core::presentation::jsonrpc::server::{REQUESTS_TOTAL, REQUEST_DURATION_SECONDS};
use agentnet_core::presentation::jsonrpc::{router, JsonRpcService, TransportConfig};

/// Build the HTTP application for `config`. Connects and bootstraps the
/// database when the postgres backend is selected.
pub async fn build_app(
    config: &NetworkConfigManifest,
    metrics: Option<PrometheusHandle>,
) -> Result<Router> {
    let spec = &config.spec;

    let backend = spec.storage.backend().context("Invalid storage configuration")?;
    let repos = create_repositories(&backend)
        .await
        .context("Failed to initialize storage")?;

    let probe = HttpLivenessProbe::new(spec.registry.probe_timeout())
        .context("Failed to build liveness probe")?;
    let registry = Arc::new(StandardAgentRegistry::new(
        repos.agents.clone(),
        Arc::new(probe),
        repos.sessions.clone(),
        spec.registry.unknown_agents,
    ));
    let threads = Arc::new(StandardThreadManager::new(
        repos.threads.clone(),
        repos.sessions.clone(),
        spec.pagination,
    ));

    let transport = TransportConfig {
        rpc_path: spec.server.rpc_path.clone(),
        request_timeout: spec.server.request_timeout(),
        metrics_path: spec.observability.metrics.path.clone(),
    };

    Ok(router(JsonRpcService::new(registry, threads), transport, metrics))
}

fn install_metrics_recorder() -> Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .context("Failed to install Prometheus recorder")?;

    metrics::describe_counter!(REQUESTS_TOTAL, "JSON-RPC calls by method and outcome");
    metrics::describe_histogram!(
        REQUEST_DURATION_SECONDS,
        metrics::Unit::Seconds,
        "JSON-RPC call latency by method"
    );
    Ok(handle)
}

pub async fn serve(config: NetworkConfigManifest) -> Result<()> {
    config.validate().context("Configuration validation failed")?;
    info!(
        node = %config.metadata.name,
        backend = ?config.spec.storage.backend,
        "Configuration loaded"
    );

    let metrics = if config.spec.observability.metrics.enabled {
        Some(install_metrics_recorder()?)
    } else {
        None
    };

    let app = build_app(&config, metrics).await?;

    let addr = format!("{}:{}", config.spec.server.bind_address, config.spec.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!(
        "agentnet listening on {} (rpc path {})",
        addr, config.spec.server.rpc_path
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("agentnet shutting down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_default_config_serves_rpc_in_memory() {
        let mut config = NetworkConfigManifest::default();
        config.spec.server.rpc_path = "/v1/rpc".to_string();
        let app = build_app(&config, None).await.unwrap();

        let envelope = json!({
            "jsonrpc": "2.0",
            "method": "habiliai-agentnetwork-v1.CreateThread",
            "params": {"participants": ["alice"]},
            "id": 1,
        });
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/v1/rpc")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(envelope.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let reply: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(reply["result"]["thread_id"], 1);
    }

    #[tokio::test]
    async fn test_postgres_without_settings_is_rejected() {
        let mut config = NetworkConfigManifest::default();
        config.spec.storage.backend =
            agentnet_core::domain::network_config::StorageBackendKind::Postgres;
        config.spec.storage.postgres = None;

        let err = build_app(&config, None).await.unwrap_err();
        assert!(format!("{:#}", err).contains("spec.storage.postgres"));
    }
}
