// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! agentnet Rust SDK
//!
//! Register agents, look up peers and exchange thread messages over the
//! agentnet JSON-RPC service.

pub mod client;

pub use client::{AgentNetworkClient, ClientError};
pub use agentnet_core::domain::agent::AgentInfo;
pub use agentnet_core::presentation::jsonrpc::types::{
    AgentRuntimeInfo, GetMessagesRequest, GetMessagesResponse, GetThreadsResponse, MessageInfo,
    MessageToolCall, ThreadInfo,
};
