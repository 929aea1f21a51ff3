//! Integration layer
//!
//! Ties storage, settings and the AI client together behind the chat session
//! manager that the UI drives.

mod config;
mod session;

pub use config::{
    clamp_pitch, clamp_rate, clamp_volume, AiConfigPatch, AppSettings, IntegrationConfig,
    SettingsPatch, SettingsStore, StoredSettings, DATA_DIR_ENV, DEFAULT_TYPEWRITER_INTERVAL,
};
pub use session::{ChatSessionManager, PendingRequest};
