pub mod integration;
pub mod llm;
pub mod messages;
pub mod speech;
pub mod ui;
pub mod utils;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MurmurError {
    #[error("Capability not supported: {0}")]
    UnsupportedCapability(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Speech recognition failed: {0}")]
    RecognitionFailed(String),

    #[error("Speech synthesis failed: {0}")]
    SynthesisFailed(String),

    #[error("Missing API key for {0}")]
    MissingCredential(String),

    #[error("{provider} API error{}: {message}", status_suffix(.status))]
    ProviderError {
        provider: String,
        status: Option<u16>,
        message: String,
    },

    #[error("{0} API returned an empty result")]
    EmptyResult(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Request aborted")]
    Aborted,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Channel error: {0}")]
    ChannelError(String),
}

impl From<std::io::Error> for MurmurError {
    fn from(e: std::io::Error) -> Self {
        MurmurError::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for MurmurError {
    fn from(e: serde_json::Error) -> Self {
        MurmurError::Storage(e.to_string())
    }
}

impl From<reqwest::Error> for MurmurError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            MurmurError::MalformedResponse(e.to_string())
        } else {
            MurmurError::Network(e.to_string())
        }
    }
}

impl MurmurError {
    /// Check if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            // Needs a different platform or build
            MurmurError::UnsupportedCapability(_) => false,
            // Needs the user to change something first
            MurmurError::PermissionDenied(_) => false,
            MurmurError::MissingCredential(_) => false,
            MurmurError::Config(_) => false,
            // Transient, a retry may succeed
            MurmurError::RecognitionFailed(_) => true,
            MurmurError::SynthesisFailed(_) => true,
            MurmurError::ProviderError { .. } => true,
            MurmurError::EmptyResult(_) => true,
            MurmurError::MalformedResponse(_) => true,
            MurmurError::Aborted => true,
            MurmurError::Network(_) => true,
            MurmurError::Storage(_) => true,
            MurmurError::ChannelError(_) => false,
        }
    }

    /// Whether the error should be shown in the error banner.
    ///
    /// An abort is the user's own doing and is not reported back to them.
    pub fn is_user_visible(&self) -> bool {
        !matches!(self, MurmurError::Aborted)
    }

    /// Get a user-friendly description
    pub fn user_message(&self) -> String {
        match self {
            MurmurError::UnsupportedCapability(what) => {
                format!("{what} is not supported on this system.")
            }
            MurmurError::PermissionDenied(_) => {
                "Microphone access was denied. Please check your permissions.".to_string()
            }
            MurmurError::RecognitionFailed(_) => {
                "Speech recognition failed. Please try again.".to_string()
            }
            MurmurError::SynthesisFailed(_) => {
                "Speech synthesis failed. The reply is still shown as text.".to_string()
            }
            MurmurError::MissingCredential(provider) => {
                format!("No API key configured for {provider}. Add one in Settings.")
            }
            MurmurError::ProviderError { .. } => self.to_string(),
            MurmurError::EmptyResult(_) => {
                "The AI service returned an empty reply. Please try again.".to_string()
            }
            MurmurError::MalformedResponse(_) => {
                "The AI service returned a response that could not be read.".to_string()
            }
            MurmurError::Aborted => "Request cancelled.".to_string(),
            MurmurError::Network(_) => {
                "Could not reach the AI service. Check your connection.".to_string()
            }
            MurmurError::Storage(_) => "Could not save local data.".to_string(),
            MurmurError::Config(_) => {
                "Configuration error. Please check settings.".to_string()
            }
            MurmurError::ChannelError(_) => {
                "Internal communication error. Please restart the application.".to_string()
            }
        }
    }
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" ({s})")).unwrap_or_default()
}

pub type Result<T> = std::result::Result<T, MurmurError>;
