// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! JSON-RPC 2.0 surface of the agent network
//!
//! - `protocol`: envelope records, wire error codes, error mapping
//! - `types`: per-method request and reply records
//! - `service`: method dispatch onto the registry and thread manager
//! - `server`: axum router, call context, logging and metrics

pub mod protocol;
pub mod server;
pub mod service;
pub mod types;

pub use protocol::{map_error, Request, Response, RpcError, RpcErrorCode, SERVICE_NAMESPACE};
pub use server::{router, TransportConfig};
pub use service::JsonRpcService;
