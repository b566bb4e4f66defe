// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Domain Layer
//!
//! Entities, the failure taxonomy, repository contracts and the node
//! configuration manifest.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Implements the agentnet data model

pub mod agent;
pub mod thread;
pub mod mention;
pub mod context;
pub mod error;
pub mod repository;
pub mod network_config;
