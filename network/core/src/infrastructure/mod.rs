// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod db;
pub mod probe;
pub mod repositories;
pub mod session;

pub use probe::HttpLivenessProbe;
pub use repositories::{InMemoryAgentRepository, InMemoryThreadRepository};
pub use session::{PgSessionBackend, Session, SessionBackend, SessionFactory};
