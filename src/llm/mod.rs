//! Remote chat completions
//!
//! - **config**: provider selection, credentials and sampling parameters
//! - **context**: conversation history in provider-neutral form
//! - **providers**: OpenAI and Gemini wire formats
//! - **client**: HTTP client with per-request cancellation
//! - **pipeline**: channel-based worker that keeps requests off the UI thread
//!
//! # Usage
//!
//! ```rust,ignore
//! use murmur::llm::{AiClient, AiConfig, LlmCommand, LlmEvent, LlmPipeline, Provider};
//! use std::sync::Arc;
//!
//! let client = Arc::new(AiClient::new(AiConfig::new(Provider::Gemini).with_env_defaults())?);
//! let pipeline = LlmPipeline::new(client);
//! let cmd_tx = pipeline.command_sender();
//! let event_rx = pipeline.event_receiver();
//! pipeline.start_worker()?;
//!
//! cmd_tx.send(LlmCommand::Complete { request_id, history })?;
//! if let Ok(LlmEvent::Reply { result, .. }) = event_rx.recv() {
//!     println!("{}", result?);
//! }
//! ```

pub mod client;
pub mod config;
pub mod context;
pub mod pipeline;
pub mod providers;

pub use client::{AiClient, ChatBackend};
pub use config::{AiConfig, Provider, DEFAULT_MODEL};
pub use context::{history_from, ConversationMessage, MessageRole};
pub use pipeline::{LlmCommand, LlmEvent, LlmPipeline};
