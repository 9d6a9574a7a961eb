//! # hivebot Agent
//!
//! The reasoning core: the tool-calling agent loop, the background
//! subagent manager, and the runtime dispatcher that connects both to the
//! message bus.

pub mod loop_runner;
pub mod runtime;
pub mod subagent;
pub mod tools;

pub use loop_runner::{AgentLoop, MAX_ITERATIONS_MESSAGE};
pub use runtime::{AgentRuntime, ShutdownHandle};
pub use subagent::{SubagentManager, SubagentOrigin};
pub use tools::{ReplyContext, SendMessageTool, SpawnSubagentTool};
