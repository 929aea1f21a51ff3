//! Outbound chat-completion calls with cancellation

use crate::llm::config::AiConfig;
use crate::llm::context::ConversationMessage;
use crate::llm::providers::{build_request, parse_response, Auth};
use crate::{MurmurError, Result};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Request timeout for a single completion
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Anything that can turn a conversation into one reply
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Produce the assistant reply to `history`, whose last entry is the newest turn
    async fn complete(&self, history: &[ConversationMessage]) -> Result<String>;

    /// Cancel the call in flight, if any
    fn abort(&self);

    /// Replace provider settings for later calls
    fn configure(&self, _config: AiConfig) {}
}

/// HTTP client for the configured provider.
///
/// At most one call is in flight per client: starting a new call cancels the
/// previous one, which then resolves to [`MurmurError::Aborted`].
pub struct AiClient {
    http: reqwest::Client,
    config: RwLock<AiConfig>,
    current: Mutex<Option<(u64, CancellationToken)>>,
    next_call: AtomicU64,
}

impl AiClient {
    pub fn new(config: AiConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| MurmurError::Config(format!("HTTP client: {e}")))?;

        Ok(Self {
            http,
            config: RwLock::new(config),
            current: Mutex::new(None),
            next_call: AtomicU64::new(0),
        })
    }

    pub fn config(&self) -> AiConfig {
        self.config.read().clone()
    }

    /// Swap provider settings; calls already in flight keep the old ones
    pub fn set_config(&self, config: AiConfig) {
        info!("AI provider set to {}", config.provider);
        *self.config.write() = config;
    }

    /// Whether a call is currently in flight
    pub fn is_busy(&self) -> bool {
        self.current.lock().is_some()
    }

    fn begin_call(&self) -> (u64, CancellationToken) {
        let call_id = self.next_call.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();
        if let Some((_, previous)) = self.current.lock().replace((call_id, token.clone())) {
            debug!("Cancelling previous request");
            previous.cancel();
        }
        (call_id, token)
    }

    fn end_call(&self, call_id: u64) {
        let mut current = self.current.lock();
        // A newer call may already own the slot
        if current.as_ref().is_some_and(|(id, _)| *id == call_id) {
            *current = None;
        }
    }

    async fn send(&self, config: &AiConfig, history: &[ConversationMessage]) -> Result<String> {
        let request = build_request(config, history)?;

        let builder = self.http.post(&request.url).json(&request.body);
        let builder = match &request.auth {
            Auth::Bearer(key) => builder.bearer_auth(key),
            Auth::QueryKey(key) => builder.query(&[("key", key)]),
        };

        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;
        debug!("{} responded {} ({} bytes)", request.provider, status, body.len());

        parse_response(
            request.provider,
            status.as_u16(),
            status.canonical_reason().unwrap_or("Unknown status"),
            &body,
        )
    }
}

#[async_trait]
impl ChatBackend for AiClient {
    async fn complete(&self, history: &[ConversationMessage]) -> Result<String> {
        let config = self.config();
        debug!(
            "Sending {} messages to {} (API key {})",
            history.len(),
            config.provider,
            if config.credential().is_some() { "set" } else { "not set" }
        );

        let (call_id, token) = self.begin_call();
        let started = Instant::now();

        let result = tokio::select! {
            _ = token.cancelled() => Err(MurmurError::Aborted),
            result = self.send(&config, history) => result,
        };

        self.end_call(call_id);

        match &result {
            Ok(reply) => info!(
                "{} replied with {} chars in {}ms",
                config.provider,
                reply.chars().count(),
                started.elapsed().as_millis()
            ),
            Err(MurmurError::Aborted) => debug!("{} request aborted", config.provider),
            Err(e) => warn!("{} request failed: {}", config.provider, e),
        }

        result
    }

    fn abort(&self) {
        if let Some((_, token)) = self.current.lock().take() {
            info!("Aborting in-flight request");
            token.cancel();
        }
    }

    fn configure(&self, config: AiConfig) {
        self.set_config(config);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::config::Provider;

    #[tokio::test]
    async fn test_missing_key_fails_without_network() {
        let client = AiClient::new(AiConfig::new(Provider::OpenAi)).unwrap();
        let err = client
            .complete(&[ConversationMessage::user("test")])
            .await
            .unwrap_err();
        assert_eq!(err, MurmurError::MissingCredential("OpenAI".into()));
        assert!(!client.is_busy());
    }

    #[tokio::test]
    async fn test_new_call_cancels_previous() {
        let client = AiClient::new(AiConfig::default()).unwrap();
        let (first_id, first) = client.begin_call();
        let (second_id, second) = client.begin_call();

        assert!(first.is_cancelled());
        assert!(!second.is_cancelled());

        // The stale call finishing must not clear the newer one
        client.end_call(first_id);
        assert!(client.is_busy());

        client.end_call(second_id);
        assert!(!client.is_busy());
    }

    #[tokio::test]
    async fn test_abort_cancels_current_call() {
        let client = AiClient::new(AiConfig::default()).unwrap();
        let (_, token) = client.begin_call();

        client.abort();
        assert!(token.is_cancelled());
        assert!(!client.is_busy());
    }

    #[test]
    fn test_set_config() {
        let client = AiClient::new(AiConfig::default()).unwrap();
        client.set_config(AiConfig::new(Provider::OpenAi).with_api_key("sk"));
        assert_eq!(client.config().provider, Provider::OpenAi);
    }
}
