//! Configuration for the integration layer
//!
//! [`IntegrationConfig`] carries the startup knobs for every component.
//! [`SettingsStore`] holds the user-editable settings and AI config and
//! writes them to the settings slot on every change.

use crate::llm::config::{AiConfig, Provider};
use crate::messages::{FileSlots, Slot, SlotBackend, SETTINGS_SLOT};
use crate::speech::recognition::{RecognitionOptions, DEFAULT_MAX_RESTARTS};
use crate::speech::synthesis::DEFAULT_KEEP_ALIVE;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Environment variable that overrides the storage directory
pub const DATA_DIR_ENV: &str = "MURMUR_DATA_DIR";

/// Delay between revealed characters of a reply
pub const DEFAULT_TYPEWRITER_INTERVAL: Duration = Duration::from_millis(30);

pub const RATE_RANGE: (f32, f32) = (0.5, 2.0);
pub const PITCH_RANGE: (f32, f32) = (0.5, 2.0);
pub const VOLUME_RANGE: (f32, f32) = (0.0, 1.0);

pub fn clamp_rate(rate: f32) -> f32 {
    rate.clamp(RATE_RANGE.0, RATE_RANGE.1)
}

pub fn clamp_pitch(pitch: f32) -> f32 {
    pitch.clamp(PITCH_RANGE.0, PITCH_RANGE.1)
}

pub fn clamp_volume(volume: f32) -> f32 {
    volume.clamp(VOLUME_RANGE.0, VOLUME_RANGE.1)
}

/// Configuration for the complete integration
#[derive(Clone, Debug)]
pub struct IntegrationConfig {
    /// Storage directory; `None` uses the platform data directory
    pub data_dir: Option<PathBuf>,

    /// Options passed to each recognition engine
    pub recognition: RecognitionOptions,

    /// Consecutive engine restarts without a result before giving up
    pub max_recognition_restarts: u32,

    pub typewriter_interval: Duration,

    /// Synthesis keep-alive period
    pub keep_alive_interval: Duration,

    /// Capacity of the worker and engine channels
    pub channel_capacity: usize,
}

impl Default for IntegrationConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            recognition: RecognitionOptions::default(),
            max_recognition_restarts: DEFAULT_MAX_RESTARTS,
            typewriter_interval: DEFAULT_TYPEWRITER_INTERVAL,
            keep_alive_interval: DEFAULT_KEEP_ALIVE,
            channel_capacity: 32,
        }
    }
}

impl IntegrationConfig {
    /// Defaults with `MURMUR_DATA_DIR` applied
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(dir) = std::env::var_os(DATA_DIR_ENV).filter(|d| !d.is_empty()) {
            config.data_dir = Some(PathBuf::from(dir));
        }
        config
    }

    /// Set the storage directory
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    /// Set the recognition locale
    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.recognition.locale = locale.into();
        self
    }

    pub fn with_typewriter_interval(mut self, interval: Duration) -> Self {
        self.typewriter_interval = interval;
        self
    }

    /// Open the slot storage this config points at
    pub fn open_storage(&self) -> Result<FileSlots> {
        match &self.data_dir {
            Some(dir) => FileSlots::new(dir),
            None => FileSlots::in_data_dir(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.channel_capacity == 0 {
            return Err("Channel capacity must be at least 1".to_string());
        }
        if self.typewriter_interval.is_zero() {
            return Err("Typewriter interval must be positive".to_string());
        }
        if self.keep_alive_interval.is_zero() {
            return Err("Keep-alive interval must be positive".to_string());
        }
        if self.recognition.locale.trim().is_empty() {
            return Err("Recognition locale is required".to_string());
        }
        Ok(())
    }
}

/// User-editable voice settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub voice_enabled: bool,

    /// Speak each reply once it has been revealed
    pub auto_play_voice: bool,

    pub voice_volume: f32,
    pub voice_rate: f32,
    pub voice_pitch: f32,

    /// Voice name; `None` picks one by language
    pub preferred_voice: Option<String>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            voice_enabled: true,
            auto_play_voice: true,
            voice_volume: 1.0,
            voice_rate: 1.0,
            voice_pitch: 1.0,
            preferred_voice: None,
        }
    }
}

impl AppSettings {
    /// Bring rate, pitch and volume into range
    pub fn clamped(mut self) -> Self {
        self.voice_rate = clamp_rate(self.voice_rate);
        self.voice_pitch = clamp_pitch(self.voice_pitch);
        self.voice_volume = clamp_volume(self.voice_volume);
        self
    }
}

/// Partial update to [`AppSettings`]; `None` fields are left alone
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SettingsPatch {
    pub voice_enabled: Option<bool>,
    pub auto_play_voice: Option<bool>,
    pub voice_volume: Option<f32>,
    pub voice_rate: Option<f32>,
    pub voice_pitch: Option<f32>,
    /// `Some(None)` clears the preferred voice
    pub preferred_voice: Option<Option<String>>,
}

impl SettingsPatch {
    fn apply(self, settings: &mut AppSettings) {
        if let Some(v) = self.voice_enabled {
            settings.voice_enabled = v;
        }
        if let Some(v) = self.auto_play_voice {
            settings.auto_play_voice = v;
        }
        if let Some(v) = self.voice_volume {
            settings.voice_volume = clamp_volume(v);
        }
        if let Some(v) = self.voice_rate {
            settings.voice_rate = clamp_rate(v);
        }
        if let Some(v) = self.voice_pitch {
            settings.voice_pitch = clamp_pitch(v);
        }
        if let Some(v) = self.preferred_voice {
            settings.preferred_voice = v;
        }
    }
}

/// Partial update to [`AiConfig`]; `None` fields are left alone
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AiConfigPatch {
    pub provider: Option<Provider>,
    /// `Some(None)` clears the stored key
    pub api_key: Option<Option<String>>,
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub endpoint: Option<Option<String>>,
}

impl AiConfigPatch {
    fn apply(self, config: &mut AiConfig) {
        if let Some(v) = self.provider {
            config.provider = v;
        }
        if let Some(v) = self.api_key {
            config.api_key = v.filter(|key| !key.trim().is_empty());
        }
        if let Some(v) = self.model {
            config.model = v;
        }
        if let Some(v) = self.temperature {
            config.temperature = v.clamp(0.0, 2.0);
        }
        if let Some(v) = self.max_tokens {
            config.max_tokens = v.max(1);
        }
        if let Some(v) = self.endpoint {
            config.endpoint = v.filter(|url| !url.trim().is_empty());
        }
    }
}

/// Everything persisted in the settings slot
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoredSettings {
    pub settings: AppSettings,
    pub ai: AiConfig,
}

/// Settings and AI config, persisted on every change
pub struct SettingsStore {
    slot: Slot<StoredSettings>,
    stored: StoredSettings,
    /// Config in use: the stored one, plus environment defaults if enabled
    effective_ai: AiConfig,
    use_env: bool,
}

impl SettingsStore {
    /// Load from `backend`, falling back to defaults when missing or corrupt
    pub fn load(backend: Arc<dyn SlotBackend>) -> Self {
        let slot = Slot::new(backend, SETTINGS_SLOT);
        let mut stored: StoredSettings = slot.load_or_default();
        stored.settings = stored.settings.clamped();
        debug!("Loaded settings (provider {})", stored.ai.provider);
        let effective_ai = stored.ai.clone();
        Self {
            slot,
            stored,
            effective_ai,
            use_env: false,
        }
    }

    pub fn settings(&self) -> &AppSettings {
        &self.stored.settings
    }

    pub fn ai_config(&self) -> &AiConfig {
        &self.effective_ai
    }

    /// The config as persisted, without environment defaults
    pub fn stored_ai_config(&self) -> &AiConfig {
        &self.stored.ai
    }

    pub fn update_settings(&mut self, patch: SettingsPatch) -> Result<()> {
        patch.apply(&mut self.stored.settings);
        self.persist()
    }

    pub fn update_ai_config(&mut self, patch: AiConfigPatch) -> Result<()> {
        patch.apply(&mut self.stored.ai);
        self.refresh_effective();
        info!("AI config updated (provider {})", self.effective_ai.provider);
        self.persist()
    }

    /// Fill unset provider and key from the environment without persisting them
    pub fn apply_env_defaults(&mut self) {
        self.use_env = true;
        self.refresh_effective();
    }

    /// Restore the voice settings and AI config defaults
    pub fn reset_settings(&mut self) -> Result<()> {
        info!("Resetting settings to defaults");
        self.stored = StoredSettings::default();
        self.refresh_effective();
        self.persist()
    }

    fn refresh_effective(&mut self) {
        self.effective_ai = if self.use_env {
            self.stored.ai.clone().with_env_defaults()
        } else {
            self.stored.ai.clone()
        };
    }

    fn persist(&self) -> Result<()> {
        self.slot.save(&self.stored)
    }
}
