// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Wire records for the `habiliai-agentnetwork-v1` service
//!
//! Field names and omission rules are part of the protocol; agents in other
//! languages decode these shapes directly. Request records default every
//! missing field to its zero value, and list fields accept `null`.
//!
//! Tool-call `arguments` and `result` travel as JSON-encoded strings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::domain::agent::{AgentInfo, AgentRuntime};
use crate::domain::error::{NetworkError, NetworkResult};
use crate::domain::thread::{Message, MessageContent, Thread, ToolCall};

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Methods exposed by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    CheckLive,
    GetAgentRuntimeInfo,
    RegisterAgent,
    DeregisterAgent,
    GetMessages,
    GetNumMessages,
    CreateThread,
    GetThread,
    GetThreads,
    AddMessage,
    Invite,
    IsMentionedOnce,
}

impl Method {
    pub const ALL: [Method; 12] = [
        Method::CheckLive,
        Method::GetAgentRuntimeInfo,
        Method::RegisterAgent,
        Method::DeregisterAgent,
        Method::GetMessages,
        Method::GetNumMessages,
        Method::CreateThread,
        Method::GetThread,
        Method::GetThreads,
        Method::AddMessage,
        Method::Invite,
        Method::IsMentionedOnce,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::CheckLive => "CheckLive",
            Method::GetAgentRuntimeInfo => "GetAgentRuntimeInfo",
            Method::RegisterAgent => "RegisterAgent",
            Method::DeregisterAgent => "DeregisterAgent",
            Method::GetMessages => "GetMessages",
            Method::GetNumMessages => "GetNumMessages",
            Method::CreateThread => "CreateThread",
            Method::GetThread => "GetThread",
            Method::GetThreads => "GetThreads",
            Method::AddMessage => "AddMessage",
            Method::Invite => "Invite",
            Method::IsMentionedOnce => "IsMentionedOnce",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.as_str() == name)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reply of methods that return nothing: `{}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmptyResponse {}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckLiveRequest {
    #[serde(deserialize_with = "null_as_default")]
    pub names: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeregisterAgentRequest {
    #[serde(deserialize_with = "null_as_default")]
    pub names: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegisterAgentRequest {
    pub addr: String,
    #[serde(deserialize_with = "null_as_default")]
    pub info: Vec<AgentInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GetAgentRuntimeInfoRequest {
    #[serde(skip_serializing_if = "Vec::is_empty", deserialize_with = "null_as_default")]
    pub names: Vec<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub all: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRuntimeInfo {
    pub info: AgentInfo,
    pub addr: String,
}

impl From<AgentRuntime> for AgentRuntimeInfo {
    fn from(runtime: AgentRuntime) -> Self {
        Self {
            info: runtime.info,
            addr: runtime.addr,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GetAgentRuntimeInfoResponse {
    #[serde(default, skip_serializing_if = "Vec::is_empty", deserialize_with = "null_as_default")]
    pub agent_runtime_info: Vec<AgentRuntimeInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GetMessagesRequest {
    pub thread_id: u32,
    /// "latest" or "oldest"; empty means oldest
    pub order: String,
    pub limit: u32,
    pub cursor: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageToolCall {
    pub name: String,
    /// JSON-encoded arguments
    pub arguments: String,
    /// JSON-encoded result
    pub result: String,
}

fn decode_embedded(field: &str, tool: &str, raw: &str) -> NetworkResult<serde_json::Value> {
    if raw.is_empty() {
        return Ok(serde_json::Value::Null);
    }
    serde_json::from_str(raw).map_err(|e| {
        NetworkError::invalid_params(format!("tool call {} {} is not valid JSON", tool, field))
            .with_source(e)
    })
}

fn encode_embedded(field: &str, tool: &str, value: &serde_json::Value) -> NetworkResult<String> {
    serde_json::to_string(value).map_err(|e| {
        NetworkError::internal(format!("failed to encode tool call {} {}", tool, field))
            .with_source(e)
    })
}

impl MessageToolCall {
    pub fn encode(call: &ToolCall) -> NetworkResult<Self> {
        Ok(Self {
            name: call.name.clone(),
            arguments: encode_embedded("arguments", &call.name, &call.arguments)?,
            result: encode_embedded("result", &call.name, &call.result)?,
        })
    }

    pub fn decode(&self) -> NetworkResult<ToolCall> {
        Ok(ToolCall {
            name: self.name.clone(),
            arguments: decode_embedded("arguments", &self.name, &self.arguments)?,
            result: decode_embedded("result", &self.name, &self.result)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageInfo {
    pub id: u32,
    #[serde(default)]
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub sender: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tool_calls: Vec<MessageToolCall>,
}

impl MessageInfo {
    pub fn encode(message: &Message) -> NetworkResult<Self> {
        let tool_calls = message
            .content
            .tool_calls
            .iter()
            .map(MessageToolCall::encode)
            .collect::<NetworkResult<Vec<_>>>()?;

        Ok(Self {
            id: message.id.0,
            content: message.content.text.clone(),
            created_at: message.created_at,
            updated_at: message.updated_at,
            sender: message.sender.clone(),
            tool_calls,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GetMessagesResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub messages: Vec<MessageInfo>,
    #[serde(default)]
    pub next_cursor: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GetNumMessagesRequest {
    pub thread_id: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GetNumMessagesResponse {
    #[serde(default)]
    pub num_messages: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateThreadRequest {
    pub instruction: String,
    #[serde(deserialize_with = "null_as_default")]
    pub participants: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateThreadResponse {
    #[serde(default)]
    pub thread_id: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GetThreadRequest {
    pub thread_id: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadInfo {
    pub id: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub instruction: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub participants: Vec<String>,
}

impl From<Thread> for ThreadInfo {
    fn from(thread: Thread) -> Self {
        Self {
            id: thread.id.0,
            created_at: thread.created_at,
            updated_at: thread.updated_at,
            instruction: thread.instruction,
            participants: thread.participants,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GetThreadsRequest {
    pub cursor: u32,
    pub limit: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GetThreadsResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub threads: Vec<ThreadInfo>,
    #[serde(default)]
    pub next_cursor: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AddMessageRequest {
    pub thread_id: u32,
    pub sender: String,
    pub content: String,
    #[serde(deserialize_with = "null_as_default")]
    pub tool_calls: Vec<MessageToolCall>,
}

impl AddMessageRequest {
    /// Message body with tool-call payloads decoded from their string form.
    pub fn message_content(&self) -> NetworkResult<MessageContent> {
        let tool_calls = self
            .tool_calls
            .iter()
            .map(MessageToolCall::decode)
            .collect::<NetworkResult<Vec<_>>>()?;

        Ok(MessageContent {
            text: self.content.clone(),
            tool_calls,
            error: None,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AddMessageResponse {
    #[serde(default)]
    pub message_id: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InviteRequest {
    pub thread_id: u32,
    pub agent_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IsMentionedRequest {
    pub agent_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IsMentionedResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub thread_ids: Vec<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::ErrorKind;
    use serde_json::json;

    #[test]
    fn test_requests_tolerate_missing_and_null_fields() {
        let req: CreateThreadRequest =
            serde_json::from_value(json!({"participants": null})).unwrap();
        assert!(req.participants.is_empty());
        assert!(req.instruction.is_empty());

        let req: GetMessagesRequest = serde_json::from_value(json!({"thread_id": 3})).unwrap();
        assert_eq!(req.thread_id, 3);
        assert_eq!(req.order, "");
        assert_eq!(req.limit, 0);
    }

    #[test]
    fn test_agent_runtime_info_omits_empty_fields() {
        let resp = GetAgentRuntimeInfoResponse::default();
        assert_eq!(serde_json::to_value(&resp).unwrap(), json!({}));

        let req = GetAgentRuntimeInfoRequest { names: vec![], all: true };
        assert_eq!(serde_json::to_value(&req).unwrap(), json!({"all": true}));
    }

    #[test]
    fn test_tool_call_payloads_are_double_encoded() {
        let call = ToolCall {
            name: "get_weather".to_string(),
            arguments: json!({"location": "Seoul", "unit": "c"}),
            result: json!({"temp": 21.5}),
        };
        let wire = MessageToolCall::encode(&call).unwrap();
        assert_eq!(wire.arguments, r#"{"location":"Seoul","unit":"c"}"#);
        assert_eq!(wire.decode().unwrap(), call);
    }

    #[test]
    fn test_empty_tool_call_strings_decode_as_null() {
        let wire = MessageToolCall {
            name: "noop".to_string(),
            arguments: String::new(),
            result: String::new(),
        };
        let call = wire.decode().unwrap();
        assert!(call.arguments.is_null());
        assert!(call.result.is_null());
    }

    #[test]
    fn test_invalid_tool_call_json_is_invalid_params() {
        let req = AddMessageRequest {
            thread_id: 1,
            sender: "alice".to_string(),
            content: "hi".to_string(),
            tool_calls: vec![MessageToolCall {
                name: "broken".to_string(),
                arguments: "{not json".to_string(),
                result: "null".to_string(),
            }],
        };
        let err = req.message_content().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParams);
    }

    #[test]
    fn test_method_names() {
        for method in Method::ALL {
            assert_eq!(Method::parse(method.as_str()), Some(method));
        }
        assert_eq!(Method::parse("DropTables"), None);
    }
}
