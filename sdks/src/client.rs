// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use agentnet_core::domain::agent::AgentInfo;
use agentnet_core::presentation::jsonrpc::types::*;
use agentnet_core::presentation::jsonrpc::{Request, Response};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("server returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("rpc error {code}: {message}")]
    Rpc { code: i32, message: String },

    #[error("failed to decode reply: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ClientError {
    /// JSON-RPC error code, when the server answered with one
    pub fn rpc_code(&self) -> Option<i32> {
        match self {
            Self::Rpc { code, .. } => Some(*code),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;

/// Client for the agentnet JSON-RPC service.
pub struct AgentNetworkClient {
    endpoint: String,
    client: Client,
    next_id: AtomicU64,
}

impl AgentNetworkClient {
    /// Create a client posting to `endpoint`, e.g. `http://localhost:8080/rpc`.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            client: Client::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Use a preconfigured HTTP client (timeouts, proxies).
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn call<P, R>(&self, method: Method, params: &P) -> Result<R>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = Request::new(method.as_str(), serde_json::to_value(params)?, id);
        debug!(method = %method, id, "Sending JSON-RPC request");

        let response = self.client.post(&self.endpoint).json(&request).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let envelope: Response = serde_json::from_slice(&response.bytes().await?)?;
        if let Some(err) = envelope.error {
            return Err(ClientError::Rpc {
                code: err.code,
                message: err.message,
            });
        }
        Ok(serde_json::from_value(envelope.result.unwrap_or_default())?)
    }

    /// Probe each named agent's health endpoint through the service.
    pub async fn check_live(&self, names: &[String]) -> Result<()> {
        let _: EmptyResponse = self
            .call(Method::CheckLive, &CheckLiveRequest { names: names.to_vec() })
            .await?;
        Ok(())
    }

    pub async fn register_agent(&self, addr: &str, info: Vec<AgentInfo>) -> Result<()> {
        let _: EmptyResponse = self
            .call(
                Method::RegisterAgent,
                &RegisterAgentRequest {
                    addr: addr.to_string(),
                    info,
                },
            )
            .await?;
        Ok(())
    }

    pub async fn deregister_agent(&self, names: &[String]) -> Result<()> {
        let _: EmptyResponse = self
            .call(Method::DeregisterAgent, &DeregisterAgentRequest { names: names.to_vec() })
            .await?;
        Ok(())
    }

    pub async fn get_agent_runtime_info(&self, names: &[String]) -> Result<Vec<AgentRuntimeInfo>> {
        let reply: GetAgentRuntimeInfoResponse = self
            .call(
                Method::GetAgentRuntimeInfo,
                &GetAgentRuntimeInfoRequest {
                    names: names.to_vec(),
                    all: false,
                },
            )
            .await?;
        Ok(reply.agent_runtime_info)
    }

    pub async fn get_all_agent_runtime_info(&self) -> Result<Vec<AgentRuntimeInfo>> {
        let reply: GetAgentRuntimeInfoResponse = self
            .call(
                Method::GetAgentRuntimeInfo,
                &GetAgentRuntimeInfoRequest {
                    names: Vec::new(),
                    all: true,
                },
            )
            .await?;
        Ok(reply.agent_runtime_info)
    }

    /// Returns the new thread id.
    pub async fn create_thread(
        &self,
        instruction: &str,
        participants: Vec<String>,
        metadata: HashMap<String, String>,
    ) -> Result<u32> {
        let reply: CreateThreadResponse = self
            .call(
                Method::CreateThread,
                &CreateThreadRequest {
                    instruction: instruction.to_string(),
                    participants,
                    metadata,
                },
            )
            .await?;
        Ok(reply.thread_id)
    }

    pub async fn get_thread(&self, thread_id: u32) -> Result<ThreadInfo> {
        self.call(Method::GetThread, &GetThreadRequest { thread_id }).await
    }

    pub async fn get_threads(&self, cursor: u32, limit: u32) -> Result<GetThreadsResponse> {
        self.call(Method::GetThreads, &GetThreadsRequest { cursor, limit }).await
    }

    /// Every thread, fetched one page at a time.
    pub async fn get_all_threads(&self, page_size: u32) -> Result<Vec<ThreadInfo>> {
        let mut cursor = 0;
        let mut threads = Vec::new();
        loop {
            let page = self.get_threads(cursor, page_size).await?;
            if page.threads.is_empty() || page.next_cursor == cursor {
                break;
            }
            cursor = page.next_cursor;
            threads.extend(page.threads);
        }
        Ok(threads)
    }

    pub async fn invite(&self, thread_id: u32, agent_name: &str) -> Result<()> {
        let _: EmptyResponse = self
            .call(
                Method::Invite,
                &InviteRequest {
                    thread_id,
                    agent_name: agent_name.to_string(),
                },
            )
            .await?;
        Ok(())
    }

    /// Returns the new message id.
    pub async fn add_message(
        &self,
        thread_id: u32,
        sender: &str,
        content: &str,
        tool_calls: Vec<MessageToolCall>,
    ) -> Result<u32> {
        let reply: AddMessageResponse = self
            .call(
                Method::AddMessage,
                &AddMessageRequest {
                    thread_id,
                    sender: sender.to_string(),
                    content: content.to_string(),
                    tool_calls,
                },
            )
            .await?;
        Ok(reply.message_id)
    }

    pub async fn get_messages(&self, request: GetMessagesRequest) -> Result<GetMessagesResponse> {
        self.call(Method::GetMessages, &request).await
    }

    /// Every message of a thread in `order`, following `next_cursor` until
    /// the service has nothing more.
    pub async fn get_all_messages(&self, thread_id: u32, order: &str) -> Result<Vec<MessageInfo>> {
        let mut cursor = 0;
        let mut messages = Vec::new();
        loop {
            let page = self
                .get_messages(GetMessagesRequest {
                    thread_id,
                    order: order.to_string(),
                    limit: 0,
                    cursor,
                })
                .await?;
            if page.messages.is_empty() {
                break;
            }
            cursor = page.next_cursor;
            messages.extend(page.messages);
        }
        Ok(messages)
    }

    pub async fn get_num_messages(&self, thread_id: u32) -> Result<u32> {
        let reply: GetNumMessagesResponse = self
            .call(Method::GetNumMessages, &GetNumMessagesRequest { thread_id })
            .await?;
        Ok(reply.num_messages)
    }

    /// Thread ids where `agent_name` was mentioned since the last call.
    pub async fn is_mentioned_once(&self, agent_name: &str) -> Result<Vec<u32>> {
        let reply: IsMentionedResponse = self
            .call(
                Method::IsMentionedOnce,
                &IsMentionedRequest {
                    agent_name: agent_name.to_string(),
                },
            )
            .await?;
        Ok(reply.thread_ids)
    }
}
