//! # hivebot Core
//!
//! Domain types, traits, and error definitions for the hivebot agent runtime.
//! This crate has **zero framework dependencies**: it defines the domain
//! model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every subsystem boundary is defined as a trait or value type here.
//! Implementations live in their respective crates. This enables:
//! - Swapping implementations via configuration
//! - Easy testing with mock/stub implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod bus;
pub mod error;
pub mod message;
pub mod provider;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use bus::{InboundMessage, MessageBus, OutboundMessage};
pub use error::{BusError, Error, ProviderError, Result, ToolError};
pub use message::{Conversation, ConversationId, Message, MessageToolCall, Role};
pub use provider::{ChatRequest, ChatResponse, Provider, ToolCallRequest, ToolDefinition, Usage};
pub use tool::{Tool, ToolCall, ToolRegistry, ToolResult};
