// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # agentnet core
//!
//! Agent directory and thread coordination service for a mesh of agent
//! processes. Agents register their endpoints here, post into shared threads
//! and poll for mentions over a JSON-RPC 2.0 endpoint.
//!
//! # Architecture
//!
//! - **Layer:** Core System
//! - **Purpose:** Domain model, application services, persistence adapters
//!   and the JSON-RPC transport

pub mod domain;
pub mod application;
pub mod infrastructure;
pub mod presentation;

pub use domain::*;
