use anyhow::{anyhow, Context, Result};
use murmur::integration::{IntegrationConfig, SettingsStore};
use murmur::llm::AiClient;
use murmur::messages::SlotBackend;
use murmur::speech::{RecognitionProvider, SynthesisProvider};
use murmur::ui::Services;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "murmur=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Murmur");

    let config = IntegrationConfig::from_env();
    config.validate().map_err(|e| anyhow!(e))?;

    let storage: Arc<dyn SlotBackend> =
        Arc::new(config.open_storage().context("Failed to open data directory")?);

    let mut settings = SettingsStore::load(Arc::clone(&storage));
    settings.apply_env_defaults();
    let client = AiClient::new(settings.ai_config().clone()).context("Failed to build HTTP client")?;

    let (recognition, synthesis) = speech_providers();
    let services = Services {
        storage,
        backend: Arc::new(client),
        recognition,
        synthesis,
    };

    murmur::ui::run(config, services).map_err(|e| anyhow!("UI error: {e}"))?;

    info!("Murmur shut down");
    Ok(())
}

/// Platform speech engines for this build.
///
/// A platform port registers its recognizer here as a
/// `RecognitionProvider::Available(Box<dyn RecognitionEngineFactory>)` and its
/// voice as `SynthesisProvider::Available(Box<dyn SpeechEngine>, events)`.
/// None are linked into the desktop build yet.
fn speech_providers() -> (RecognitionProvider, SynthesisProvider) {
    warn!("No speech engine linked; voice input and read-aloud are disabled");
    (RecognitionProvider::Unavailable, SynthesisProvider::Unavailable)
}
