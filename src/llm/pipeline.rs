//! Background worker that runs chat completions off the UI thread
//!
//! The UI sends [`LlmCommand`]s and drains [`LlmEvent`]s once per frame.
//! Each completion runs as its own task on the worker's runtime, so a
//! `Cancel` is handled while a request is still in flight.

use crate::llm::client::ChatBackend;
use crate::llm::config::AiConfig;
use crate::llm::context::ConversationMessage;
use crate::{MurmurError, Result};
use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use std::sync::Arc;
use tokio::runtime::Runtime;
use tracing::{debug, error, info};
use uuid::Uuid;

/// Default capacity of the command channel
pub const DEFAULT_CHANNEL_CAPACITY: usize = 32;

/// Commands that can be sent to the LLM pipeline
#[derive(Debug, Clone)]
pub enum LlmCommand {
    /// Request the reply to `history`
    Complete {
        /// Correlates the reply with the pending request
        request_id: Uuid,
        /// Conversation so far, newest turn last
        history: Vec<ConversationMessage>,
    },

    /// Abort whatever request is in flight
    Cancel,

    /// Use new provider settings for later requests
    Configure(AiConfig),

    /// Shutdown the pipeline
    Shutdown,
}

/// Events emitted by the LLM pipeline
#[derive(Debug, Clone)]
pub enum LlmEvent {
    /// A request finished, successfully or not
    Reply {
        request_id: Uuid,
        result: Result<String>,
    },

    /// The worker could not start or stopped unexpectedly
    Failed(MurmurError),

    /// Pipeline has shut down
    Shutdown,
}

/// LLM pipeline with channel-based communication
pub struct LlmPipeline {
    backend: Arc<dyn ChatBackend>,
    command_tx: Sender<LlmCommand>,
    command_rx: Receiver<LlmCommand>,
    event_tx: Sender<LlmEvent>,
    event_rx: Receiver<LlmEvent>,
}

impl LlmPipeline {
    pub fn new(backend: Arc<dyn ChatBackend>) -> Self {
        Self::with_capacity(backend, DEFAULT_CHANNEL_CAPACITY)
    }

    /// Commands are bounded by `capacity`. Events are not: replies are sent
    /// from runtime tasks, which must never block on a stalled UI.
    pub fn with_capacity(backend: Arc<dyn ChatBackend>, capacity: usize) -> Self {
        let (command_tx, command_rx) = bounded(capacity);
        let (event_tx, event_rx) = unbounded();

        Self {
            backend,
            command_tx,
            command_rx,
            event_tx,
            event_rx,
        }
    }

    /// Get a sender for commands
    pub fn command_sender(&self) -> Sender<LlmCommand> {
        self.command_tx.clone()
    }

    /// Get a receiver for events
    pub fn event_receiver(&self) -> Receiver<LlmEvent> {
        self.event_rx.clone()
    }

    /// Start the pipeline worker thread
    pub fn start_worker(self) -> Result<()> {
        let Self {
            backend,
            command_rx,
            event_tx,
            ..
        } = self;

        std::thread::Builder::new()
            .name("murmur-llm".into())
            .spawn(move || run_worker(backend, command_rx, event_tx))
            .map_err(|e| MurmurError::ChannelError(format!("Failed to spawn LLM worker: {e}")))?;

        Ok(())
    }
}

fn run_worker(
    backend: Arc<dyn ChatBackend>,
    command_rx: Receiver<LlmCommand>,
    event_tx: Sender<LlmEvent>,
) {
    info!("LLM pipeline worker starting");

    let runtime = match Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            let _ = event_tx.send(LlmEvent::Failed(MurmurError::ChannelError(format!(
                "Runtime creation failed: {e}"
            ))));
            let _ = event_tx.send(LlmEvent::Shutdown);
            return;
        }
    };

    loop {
        match command_rx.recv() {
            Ok(LlmCommand::Complete {
                request_id,
                history,
            }) => {
                debug!("Processing request {} ({} messages)", request_id, history.len());
                let backend = Arc::clone(&backend);
                let event_tx = event_tx.clone();
                runtime.spawn(async move {
                    let result = backend.complete(&history).await;
                    if event_tx.send(LlmEvent::Reply { request_id, result }).is_err() {
                        debug!("Reply for {} dropped, receiver gone", request_id);
                    }
                });
            }

            Ok(LlmCommand::Cancel) => {
                backend.abort();
            }

            Ok(LlmCommand::Configure(config)) => {
                backend.configure(config);
            }

            Ok(LlmCommand::Shutdown) => {
                info!("LLM pipeline worker shutting down");
                backend.abort();
                let _ = event_tx.send(LlmEvent::Shutdown);
                break;
            }

            Err(_) => {
                debug!("Command channel closed");
                backend.abort();
                break;
            }
        }
    }

    runtime.shutdown_background();
    info!("LLM pipeline worker stopped");
}
