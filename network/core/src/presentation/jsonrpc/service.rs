// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Method dispatch for the `habiliai-agentnetwork-v1` service
//!
//! Decodes the params of each method into its request record, calls the
//! registry or thread manager, and encodes the reply record. Transport
//! concerns (envelope, logging, metrics) live in `server`.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use crate::application::registry::AgentRegistry;
use crate::application::thread_manager::ThreadManager;
use crate::domain::context::CallContext;
use crate::domain::error::{NetworkError, NetworkResult};
use crate::domain::thread::{MessageId, MessageOrder, ThreadId};
use crate::presentation::jsonrpc::protocol::RpcErrorCode;
use crate::presentation::jsonrpc::types::*;

#[derive(Clone)]
pub struct JsonRpcService {
    registry: Arc<dyn AgentRegistry>,
    threads: Arc<dyn ThreadManager>,
}

/// Params arrive as the request object itself or as a one-element array
/// holding it. Absent or null params decode as the all-default request.
fn decode_params<T>(method: Method, params: Option<Value>) -> NetworkResult<T>
where
    T: DeserializeOwned + Default,
{
    let value = match params {
        None | Some(Value::Null) => return Ok(T::default()),
        Some(Value::Array(mut items)) => match items.len() {
            0 => return Ok(T::default()),
            1 => items.remove(0),
            n => {
                return Err(NetworkError::invalid_params(format!(
                    "{} expects a single params object, got {} positional params",
                    method, n
                )))
            }
        },
        Some(other) => other,
    };

    if value.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(value).map_err(|e| {
        NetworkError::invalid_params(format!("failed to decode {} params: {}", method, e))
    })
}

fn encode_reply<T: Serialize>(reply: &T) -> NetworkResult<Value> {
    serde_json::to_value(reply)
        .map_err(|e| NetworkError::internal("failed to encode reply").with_source(e))
}

impl JsonRpcService {
    pub fn new(registry: Arc<dyn AgentRegistry>, threads: Arc<dyn ThreadManager>) -> Self {
        Self { registry, threads }
    }

    /// Invoke `method` (unqualified) with raw `params`.
    pub async fn call(
        &self,
        ctx: &CallContext,
        method: &str,
        params: Option<Value>,
    ) -> NetworkResult<Value> {
        let method = Method::parse(method).ok_or_else(|| {
            NetworkError::with_code(
                RpcErrorCode::MethodNotFound.code(),
                format!("method {} not found", method),
            )
        })?;

        match method {
            Method::CheckLive => {
                let req: CheckLiveRequest = decode_params(method, params)?;
                self.registry.check_live(ctx, &req.names).await?;
                encode_reply(&EmptyResponse {})
            }
            Method::GetAgentRuntimeInfo => {
                let req: GetAgentRuntimeInfoRequest = decode_params(method, params)?;
                encode_reply(&self.get_agent_runtime_info(ctx, req).await?)
            }
            Method::RegisterAgent => {
                let req: RegisterAgentRequest = decode_params(method, params)?;
                self.registry.register_agent(ctx, &req.addr, req.info).await?;
                encode_reply(&EmptyResponse {})
            }
            Method::DeregisterAgent => {
                let req: DeregisterAgentRequest = decode_params(method, params)?;
                self.registry.deregister_agent(ctx, &req.names).await?;
                encode_reply(&EmptyResponse {})
            }
            Method::GetMessages => {
                let req: GetMessagesRequest = decode_params(method, params)?;
                encode_reply(&self.get_messages(ctx, req).await?)
            }
            Method::GetNumMessages => {
                let req: GetNumMessagesRequest = decode_params(method, params)?;
                let count = self.threads.get_num_messages(ctx, ThreadId(req.thread_id)).await?;
                encode_reply(&GetNumMessagesResponse {
                    num_messages: u32::try_from(count).unwrap_or(u32::MAX),
                })
            }
            Method::CreateThread => {
                let req: CreateThreadRequest = decode_params(method, params)?;
                let thread = self
                    .threads
                    .create_thread(ctx, &req.instruction, req.participants, req.metadata)
                    .await?;
                encode_reply(&CreateThreadResponse { thread_id: thread.id.0 })
            }
            Method::GetThread => {
                let req: GetThreadRequest = decode_params(method, params)?;
                let thread = self.threads.get_thread_by_id(ctx, ThreadId(req.thread_id)).await?;
                encode_reply(&ThreadInfo::from(thread))
            }
            Method::GetThreads => {
                let req: GetThreadsRequest = decode_params(method, params)?;
                let page = self.threads.get_threads(ctx, ThreadId(req.cursor), req.limit).await?;
                debug!(
                    count = page.threads.len(),
                    next_cursor = %page.next_cursor,
                    "Listed threads"
                );
                encode_reply(&GetThreadsResponse {
                    threads: page.threads.into_iter().map(ThreadInfo::from).collect(),
                    next_cursor: page.next_cursor.0,
                })
            }
            Method::AddMessage => {
                let req: AddMessageRequest = decode_params(method, params)?;
                let content = req.message_content()?;
                let message = self
                    .threads
                    .add_message(ctx, ThreadId(req.thread_id), &req.sender, content)
                    .await?;
                encode_reply(&AddMessageResponse { message_id: message.id.0 })
            }
            Method::Invite => {
                let req: InviteRequest = decode_params(method, params)?;
                self.threads.invite(ctx, ThreadId(req.thread_id), &req.agent_name).await?;
                encode_reply(&EmptyResponse {})
            }
            Method::IsMentionedOnce => {
                let req: IsMentionedRequest = decode_params(method, params)?;
                let thread_ids = self.threads.is_mentioned_once(ctx, &req.agent_name).await?;
                debug!(agent = %req.agent_name, thread_ids = ?thread_ids, "Delivered mentions");
                encode_reply(&IsMentionedResponse {
                    thread_ids: thread_ids.into_iter().map(|id| id.0).collect(),
                })
            }
        }
    }

    async fn get_agent_runtime_info(
        &self,
        ctx: &CallContext,
        req: GetAgentRuntimeInfoRequest,
    ) -> NetworkResult<GetAgentRuntimeInfoResponse> {
        let runtimes = if req.all {
            self.registry.get_all_agent_runtime_info(ctx).await?
        } else {
            self.registry.get_agent_runtime_info(ctx, &req.names).await?
        };

        Ok(GetAgentRuntimeInfoResponse {
            agent_runtime_info: runtimes.into_iter().map(AgentRuntimeInfo::from).collect(),
        })
    }

    /// Pages through the thread from `cursor` with `limit` as the page size
    /// until an empty page, returning everything collected.
    async fn get_messages(
        &self,
        ctx: &CallContext,
        req: GetMessagesRequest,
    ) -> NetworkResult<GetMessagesResponse> {
        let order = MessageOrder::parse(&req.order).ok_or_else(|| {
            NetworkError::invalid_params(format!(
                "order must be \"latest\" or \"oldest\", got {:?}",
                req.order
            ))
        })?;
        let thread_id = ThreadId(req.thread_id);

        let mut cursor = MessageId(req.cursor);
        let mut messages = Vec::new();
        loop {
            let page = self
                .threads
                .get_messages(ctx, thread_id, order, cursor, req.limit)
                .await?;
            if page.is_empty() {
                break;
            }
            for message in &page {
                messages.push(MessageInfo::encode(message)?);
                cursor = message.id;
            }
        }

        Ok(GetMessagesResponse {
            messages,
            next_cursor: cursor.0,
        })
    }
}
