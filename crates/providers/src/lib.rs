//! LLM provider implementations for hivebot.
//!
//! The agent loop talks to the [`hivebot_core::Provider`] trait; this crate
//! supplies the concrete backends. `OpenAiCompatProvider` covers the vast
//! majority of hosted and local endpoints (OpenAI, OpenRouter, Ollama,
//! vLLM, Together, Fireworks, ...).
//!
//! Every provider honors the infallible-chat contract: transport and API
//! failures come back as an error-shaped [`hivebot_core::ChatResponse`]
//! with `finish_reason = "error"`, never as a panic or an `Err` the loop
//! would have to handle.

pub mod openai_compat;

pub use openai_compat::OpenAiCompatProvider;
