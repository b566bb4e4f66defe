// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Network Configuration Types
//
// Defines the configuration schema for an agentnet node, including:
// - Kubernetes-style manifest format (apiVersion/kind/metadata/spec)
// - HTTP server binding and per-call deadline
// - Storage backend selection and tenant schema
// - Registry probe and pagination policy
// - Logging and metrics settings

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::domain::agent::UnknownAgentPolicy;
use crate::domain::repository::{PostgresConfig, StorageBackend};

pub const API_VERSION: &str = "agentnet/v1";
pub const KIND: &str = "NetworkConfig";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level Kubernetes-style network configuration manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfigManifest {
    /// API version (must be "agentnet/v1")
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Resource kind (must be "NetworkConfig")
    pub kind: String,

    pub metadata: ManifestMetadata,

    #[serde(default)]
    pub spec: NetworkConfigSpec,
}

/// Manifest metadata (Kubernetes-style)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestMetadata {
    /// Human-readable node name
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<HashMap<String, String>>,
}

/// Content under `spec:`
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NetworkConfigSpec {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub registry: RegistryConfig,

    #[serde(default)]
    pub pagination: PaginationConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Network bind address (e.g. "0.0.0.0" or "127.0.0.1")
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Path of the JSON-RPC endpoint
    #[serde(default = "default_rpc_path")]
    pub rpc_path: String,

    /// Deadline applied to every call
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            rpc_path: default_rpc_path(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackendKind {
    #[default]
    InMemory,
    Postgres,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackendKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postgres: Option<PostgresSettings>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostgresSettings {
    /// Connection URL (supports "env:VAR_NAME")
    pub url: String,

    /// Tenant namespace selected at the start of every session
    #[serde(default = "default_schema")]
    pub schema: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl StorageConfig {
    /// Resolve into the backend the repositories are built from.
    pub fn backend(&self) -> Result<StorageBackend, ConfigError> {
        match self.backend {
            StorageBackendKind::InMemory => Ok(StorageBackend::InMemory),
            StorageBackendKind::Postgres => {
                let pg = self.postgres.as_ref().ok_or_else(|| {
                    ConfigError::Invalid(
                        "spec.storage.postgres is required for the postgres backend".to_string(),
                    )
                })?;
                Ok(StorageBackend::PostgreSQL(PostgresConfig {
                    connection_string: resolve_env_value(&pg.url)?,
                    schema: pg.schema.clone(),
                    max_connections: pg.max_connections,
                }))
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Timeout for one liveness probe
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,

    /// How GetAgentRuntimeInfo treats names that are not registered
    #[serde(default)]
    pub unknown_agents: UnknownAgentPolicy,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            probe_timeout_ms: default_probe_timeout_ms(),
            unknown_agents: UnknownAgentPolicy::default(),
        }
    }
}

impl RegistryConfig {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PaginationConfig {
    /// Page size used when a request asks for 0 items
    #[serde(default = "default_page_limit")]
    pub default_limit: usize,

    /// Upper bound on any page size
    #[serde(default = "default_max_page_limit")]
    pub max_limit: usize,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_limit: default_page_limit(),
            max_limit: default_max_page_limit(),
        }
    }
}

impl PaginationConfig {
    /// Effective page size for a requested limit.
    pub fn effective_limit(&self, requested: u32) -> usize {
        match requested as usize {
            0 => self.default_limit.min(self.max_limit),
            n => n.min(self.max_limit),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ObservabilityConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (e.g., "info", "debug", "trace")
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable metrics exposition
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Metrics path (e.g., "/metrics")
    #[serde(default = "default_metrics_path")]
    pub path: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: default_metrics_path(),
        }
    }
}

// Default value functions
fn default_true() -> bool {
    true
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_rpc_path() -> String {
    "/rpc".to_string()
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

fn default_schema() -> String {
    "public".to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_probe_timeout_ms() -> u64 {
    3_000
}

fn default_page_limit() -> usize {
    50
}

fn default_max_page_limit() -> usize {
    500
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

impl Default for NetworkConfigManifest {
    fn default() -> Self {
        let hostname = hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .unwrap_or_else(|| "agentnet-node".to_string());

        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            metadata: ManifestMetadata {
                name: hostname,
                version: Some("1.0.0".to_string()),
                labels: None,
            },
            spec: NetworkConfigSpec::default(),
        }
    }
}

/// Resolve `env:VAR_NAME` references; any other value is returned as-is.
fn resolve_env_value(value: &str) -> Result<String, ConfigError> {
    match value.strip_prefix("env:") {
        Some(var) => std::env::var(var)
            .map_err(|_| ConfigError::Invalid(format!("environment variable {} is not set", var))),
        None => Ok(value.to_string()),
    }
}

/// A schema name is interpolated into `SET search_path`, so only plain identifiers are accepted.
pub fn is_valid_schema_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl NetworkConfigManifest {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&content)
    }

    /// Save configuration to YAML file
    pub fn to_yaml_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let yaml = self.to_yaml_string()?;
        std::fs::write(path, yaml).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn to_yaml_string(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Parse configuration from YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Discover configuration file using precedence order
    /// 1. AGENTNET_CONFIG_PATH environment variable
    /// 2. ./agentnet-config.yaml (working directory)
    /// 3. ~/.agentnet/config.yaml (user home)
    /// 4. /etc/agentnet/config.yaml (system, Unix) or C:\ProgramData\Agentnet\config.yaml (Windows)
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("AGENTNET_CONFIG_PATH") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./agentnet-config.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".agentnet").join("config.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        #[cfg(unix)]
        let system_config = PathBuf::from("/etc/agentnet/config.yaml");
        #[cfg(windows)]
        let system_config = PathBuf::from("C:\\ProgramData\\Agentnet\\config.yaml");

        if system_config.exists() {
            return Some(system_config);
        }

        None
    }

    /// Load configuration with discovery, fallback to default
    pub fn load_or_default(cli_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        // Explicit CLI path fails if missing or invalid
        if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            let mut config = Self::from_yaml_file(&path)?;
            config.apply_env_overrides();
            return Ok(config);
        }

        if let Some(config_path) = Self::discover_config() {
            tracing::info!("Loading configuration from discovered path: {:?}", config_path);
            let mut config = Self::from_yaml_file(config_path)?;
            config.apply_env_overrides();
            Ok(config)
        } else {
            tracing::warn!("No configuration file found in standard locations. Using defaults.");
            let mut config = Self::default();
            config.apply_env_overrides();
            Ok(config)
        }
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("AGENTNET_DATABASE_URL") {
            tracing::info!("Environment override: AGENTNET_DATABASE_URL (postgres backend)");
            self.spec.storage.backend = StorageBackendKind::Postgres;
            match self.spec.storage.postgres.as_mut() {
                Some(pg) => pg.url = url,
                None => {
                    self.spec.storage.postgres = Some(PostgresSettings {
                        url,
                        schema: default_schema(),
                        max_connections: default_max_connections(),
                    })
                }
            }
        }

        if let Ok(schema) = std::env::var("AGENTNET_DB_SCHEMA") {
            match self.spec.storage.postgres.as_mut() {
                Some(pg) => {
                    tracing::info!("Environment override: AGENTNET_DB_SCHEMA={}", schema);
                    pg.schema = schema;
                }
                None => tracing::warn!(
                    "AGENTNET_DB_SCHEMA is set but no postgres storage is configured. Ignoring."
                ),
            }
        }

        if let Ok(val) = std::env::var("AGENTNET_LOG_FORMAT") {
            match val.to_lowercase().as_str() {
                "json" => self.spec.observability.logging.format = LogFormat::Json,
                "text" => self.spec.observability.logging.format = LogFormat::Text,
                _ => tracing::warn!(
                    "Invalid value for AGENTNET_LOG_FORMAT: '{}'. Expected json/text. Ignoring.",
                    val
                ),
            }
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        fn invalid(msg: String) -> Result<(), ConfigError> {
            Err(ConfigError::Invalid(msg))
        }

        if self.api_version != API_VERSION {
            return invalid(format!(
                "Invalid apiVersion: '{}'. Must be '{}'",
                self.api_version, API_VERSION
            ));
        }

        if self.kind != KIND {
            return invalid(format!("Invalid kind: '{}'. Must be '{}'", self.kind, KIND));
        }

        if self.metadata.name.is_empty() {
            return invalid("metadata.name cannot be empty".to_string());
        }

        let server = &self.spec.server;
        if !server.rpc_path.starts_with('/') {
            return invalid(format!(
                "spec.server.rpc_path must start with '/': {}",
                server.rpc_path
            ));
        }
        if server.rpc_path == "/health" || server.rpc_path == self.spec.observability.metrics.path {
            return invalid(format!(
                "spec.server.rpc_path collides with another route: {}",
                server.rpc_path
            ));
        }
        if server.request_timeout_ms == 0 {
            return invalid("spec.server.request_timeout_ms must be greater than 0".to_string());
        }

        if self.spec.storage.backend == StorageBackendKind::Postgres {
            let Some(pg) = self.spec.storage.postgres.as_ref() else {
                return invalid(
                    "spec.storage.postgres is required for the postgres backend".to_string(),
                );
            };
            if pg.url.is_empty() {
                return invalid("spec.storage.postgres.url cannot be empty".to_string());
            }
            if !is_valid_schema_name(&pg.schema) {
                return invalid(format!(
                    "spec.storage.postgres.schema '{}' must be an identifier \
                     (ASCII letters, digits, '_')",
                    pg.schema
                ));
            }
            if pg.max_connections == 0 {
                return invalid(
                    "spec.storage.postgres.max_connections must be greater than 0".to_string(),
                );
            }
        }

        if self.spec.registry.probe_timeout_ms == 0 {
            return invalid("spec.registry.probe_timeout_ms must be greater than 0".to_string());
        }

        let pagination = &self.spec.pagination;
        if pagination.default_limit == 0 || pagination.max_limit == 0 {
            return invalid("spec.pagination limits must be greater than 0".to_string());
        }
        if pagination.default_limit > pagination.max_limit {
            return invalid(format!(
                "spec.pagination.default_limit ({}) exceeds max_limit ({})",
                pagination.default_limit, pagination.max_limit
            ));
        }

        let metrics = &self.spec.observability.metrics;
        if metrics.enabled && !metrics.path.starts_with('/') {
            return invalid("spec.observability.metrics.path must start with '/'".to_string());
        }

        Ok(())
    }
}
