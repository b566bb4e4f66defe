// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! JSON-RPC 2.0 envelope and error mapping

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::error::{ErrorKind, NetworkError};

/// Namespace every method is addressed under: `<namespace>.<Method>`.
pub const SERVICE_NAMESPACE: &str = "habiliai-agentnetwork-v1";

pub const JSONRPC_VERSION: &str = "2.0";

/// Fixed JSON-RPC error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RpcErrorCode {
    ParseError,
    InvalidRequest,
    MethodNotFound,
    InvalidParams,
    InternalError,
    ServerError,
}

impl RpcErrorCode {
    pub const fn code(self) -> i32 {
        match self {
            Self::ParseError => -32700,
            Self::InvalidRequest => -32600,
            Self::MethodNotFound => -32601,
            Self::InvalidParams => -32602,
            Self::InternalError => -32603,
            Self::ServerError => -32000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    #[serde(default)]
    pub id: Value,
}

impl Request {
    /// Request for `<namespace>.<method>` with `params` as the single argument object
    pub fn new(method: &str, params: Value, id: u64) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: qualified_method(method),
            params: Some(params),
            id: Value::from(id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcError {
    pub fn new(code: RpcErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: code.code(),
            message: message.into(),
            data: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub jsonrpc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
    #[serde(default)]
    pub id: Value,
}

impl Response {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            result: Some(result),
            error: None,
            id,
        }
    }

    pub fn error(id: Value, error: RpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            result: None,
            error: Some(error),
            id,
        }
    }
}

pub fn qualified_method(method: &str) -> String {
    format!("{}.{}", SERVICE_NAMESPACE, method)
}

/// Split `<namespace>.<Method>`; None if the namespace is not ours.
pub fn local_method(qualified: &str) -> Option<&str> {
    qualified
        .strip_prefix(SERVICE_NAMESPACE)
        .and_then(|rest| rest.strip_prefix('.'))
        .filter(|m| !m.is_empty())
}

/// Wire code for a classified failure.
pub fn error_code(kind: ErrorKind) -> i32 {
    match kind {
        ErrorKind::InvalidParams => RpcErrorCode::InvalidParams.code(),
        ErrorKind::InvalidRequest => RpcErrorCode::InvalidRequest.code(),
        ErrorKind::NotFound | ErrorKind::NoMore => RpcErrorCode::ServerError.code(),
        ErrorKind::Internal => RpcErrorCode::InternalError.code(),
        ErrorKind::WireCode(code) => code,
    }
}

/// Client-facing error object. Carries only the top-level message; the cause
/// chain stays in the server log.
pub fn map_error(err: &NetworkError) -> RpcError {
    RpcError {
        code: error_code(err.kind()),
        message: err.message().to_string(),
        data: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds_map_to_fixed_codes() {
        assert_eq!(error_code(ErrorKind::InvalidParams), -32602);
        assert_eq!(error_code(ErrorKind::InvalidRequest), -32600);
        assert_eq!(error_code(ErrorKind::NotFound), -32000);
        assert_eq!(error_code(ErrorKind::NoMore), -32000);
        assert_eq!(error_code(ErrorKind::Internal), -32603);
        assert_eq!(error_code(ErrorKind::WireCode(-32601)), -32601);
    }

    #[test]
    fn test_map_error_hides_cause() {
        let err = NetworkError::internal("failed to add message")
            .with_source(std::io::Error::other("disk full"));
        let rpc = map_error(&err);
        assert_eq!(rpc.code, -32603);
        assert_eq!(rpc.message, "failed to add message");
    }

    #[test]
    fn test_local_method() {
        assert_eq!(local_method("habiliai-agentnetwork-v1.CreateThread"), Some("CreateThread"));
        assert_eq!(local_method("other-v1.CreateThread"), None);
        assert_eq!(local_method("habiliai-agentnetwork-v1."), None);
        assert_eq!(local_method("habiliai-agentnetwork-v1CreateThread"), None);
    }
}
