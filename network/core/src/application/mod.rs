// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod session;
pub mod registry;
pub mod thread_manager;
pub mod repository_factory;

// Re-export services for convenience
pub use registry::{AgentRegistry, LivenessProbe, ProbeError, StandardAgentRegistry};
pub use session::{PassthroughSessionScope, SessionScope};
pub use thread_manager::{StandardThreadManager, ThreadManager, ThreadPage};
