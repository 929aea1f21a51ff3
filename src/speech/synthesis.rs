//! Speech synthesis session
//!
//! Speaks assistant replies through a platform [`SpeechEngine`]. Some engines
//! silently stall on long utterances, so while speaking the session nudges the
//! engine with a pause/resume every keep-alive interval (see [`SynthesisSession::tick`]).

use crate::integration::{clamp_pitch, clamp_rate, clamp_volume, AppSettings};
use crate::{MurmurError, Result};
use crossbeam_channel::Receiver;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Interval between keep-alive nudges while speaking
pub const DEFAULT_KEEP_ALIVE: Duration = Duration::from_secs(10);

/// Language prefix used to pick a voice when none is preferred
pub const DEFAULT_VOICE_LANG: &str = "zh";

/// A voice offered by the engine
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Voice {
    pub name: String,
    pub lang: String,
}

impl Voice {
    pub fn new(name: impl Into<String>, lang: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lang: lang.into(),
        }
    }
}

/// Text plus the voice parameters it should be spoken with
#[derive(Clone, Debug, PartialEq)]
pub struct Utterance {
    /// Unique per session; engines echo it back in [`SynthesisEvent`]s
    pub id: u64,
    pub text: String,
    pub voice: Option<String>,
    pub lang: Option<String>,
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SynthesisErrorCode {
    /// Speech was cut off by a newer utterance or `cancel`
    Interrupted,
    Canceled,
    AudioBusy,
    Network,
    Other(String),
}

impl SynthesisErrorCode {
    /// Interruptions are the normal result of stopping and are not errors
    pub fn is_interruption(&self) -> bool {
        matches!(self, SynthesisErrorCode::Interrupted | SynthesisErrorCode::Canceled)
    }
}

impl fmt::Display for SynthesisErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SynthesisErrorCode::Interrupted => f.write_str("interrupted"),
            SynthesisErrorCode::Canceled => f.write_str("canceled"),
            SynthesisErrorCode::AudioBusy => f.write_str("audio-busy"),
            SynthesisErrorCode::Network => f.write_str("network"),
            SynthesisErrorCode::Other(code) => f.write_str(code),
        }
    }
}

/// Engine notifications. `End` and `Error` name the utterance they belong
/// to, so a late notification from a cancelled utterance can be told apart
/// from the one playing now.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SynthesisEvent {
    End { utterance: u64 },
    Error {
        utterance: u64,
        code: SynthesisErrorCode,
    },
    /// The voice list changed and should be re-read
    VoicesChanged,
}

/// A platform text-to-speech engine
pub trait SpeechEngine: Send {
    fn voices(&self) -> Vec<Voice>;
    fn speak(&mut self, utterance: &Utterance) -> Result<()>;
    fn cancel(&mut self);
    fn pause(&mut self);
    fn resume(&mut self);
    fn is_speaking(&self) -> bool;
    fn is_paused(&self) -> bool;
}

/// Whether the platform offers speech synthesis at all
pub enum SynthesisProvider {
    Available(Box<dyn SpeechEngine>, Receiver<SynthesisEvent>),
    Unavailable,
}

/// Preferred voice by name, else the first matching `lang_prefix`, else the first
pub fn pick_voice<'a>(voices: &'a [Voice], preferred: Option<&str>, lang_prefix: &str) -> Option<&'a Voice> {
    preferred
        .and_then(|name| voices.iter().find(|v| v.name == name))
        .or_else(|| voices.iter().find(|v| v.lang.contains(lang_prefix)))
        .or_else(|| voices.first())
}

pub struct SynthesisSession {
    engine: Option<Box<dyn SpeechEngine>>,
    events: Option<Receiver<SynthesisEvent>>,

    voices: Vec<Voice>,
    selected_voice: Option<Voice>,
    preferred_voice: Option<String>,
    lang_prefix: String,

    rate: f32,
    pitch: f32,
    volume: f32,

    speaking: bool,
    error: Option<MurmurError>,

    /// Id of the utterance playing now
    current: Option<u64>,
    next_id: u64,

    keep_alive: Duration,
    last_nudge: Option<Instant>,
}

impl SynthesisSession {
    pub fn new(provider: SynthesisProvider) -> Self {
        let (engine, events) = match provider {
            SynthesisProvider::Available(engine, events) => (Some(engine), Some(events)),
            SynthesisProvider::Unavailable => (None, None),
        };

        let mut session = Self {
            engine,
            events,
            voices: Vec::new(),
            selected_voice: None,
            preferred_voice: None,
            lang_prefix: DEFAULT_VOICE_LANG.to_string(),
            rate: 1.0,
            pitch: 1.0,
            volume: 1.0,
            speaking: false,
            error: None,
            current: None,
            next_id: 1,
            keep_alive: DEFAULT_KEEP_ALIVE,
            last_nudge: None,
        };
        session.refresh_voices();
        session
    }

    pub fn with_keep_alive(mut self, interval: Duration) -> Self {
        self.keep_alive = interval;
        self
    }

    pub fn with_voice_lang(mut self, lang_prefix: impl Into<String>) -> Self {
        self.lang_prefix = lang_prefix.into();
        self.reselect_voice();
        self
    }

    pub fn is_supported(&self) -> bool {
        self.engine.is_some()
    }

    pub fn is_speaking(&self) -> bool {
        self.speaking
    }

    pub fn error(&self) -> Option<&MurmurError> {
        self.error.as_ref()
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    pub fn voices(&self) -> &[Voice] {
        &self.voices
    }

    pub fn selected_voice(&self) -> Option<&Voice> {
        self.selected_voice.as_ref()
    }

    pub fn rate(&self) -> f32 {
        self.rate
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// Speak `text`, cancelling anything already playing
    pub fn speak(&mut self, text: &str) -> Result<()> {
        let Some(engine) = self.engine.as_mut() else {
            let err = MurmurError::UnsupportedCapability("speech synthesis".into());
            self.error = Some(err.clone());
            return Err(err);
        };

        engine.cancel();
        self.speaking = false;
        self.current = None;
        self.last_nudge = None;

        if text.trim().is_empty() {
            return Ok(());
        }

        let id = self.next_id;
        self.next_id += 1;
        let utterance = Utterance {
            id,
            text: text.to_string(),
            voice: self.selected_voice.as_ref().map(|v| v.name.clone()),
            lang: self.selected_voice.as_ref().map(|v| v.lang.clone()),
            rate: self.rate,
            pitch: self.pitch,
            volume: self.volume,
        };

        if engine.is_paused() {
            engine.resume();
        }

        if let Err(e) = engine.speak(&utterance) {
            warn!("Speech synthesis failed to start: {}", e);
            let err = MurmurError::SynthesisFailed(e.to_string());
            self.error = Some(err.clone());
            return Err(err);
        }

        debug!("Speaking utterance {} ({} chars)", id, text.chars().count());
        self.speaking = true;
        self.current = Some(id);
        self.error = None;
        self.last_nudge = Some(Instant::now());
        Ok(())
    }

    pub fn stop(&mut self) {
        if let Some(engine) = self.engine.as_mut() {
            engine.cancel();
        }
        self.speaking = false;
        self.current = None;
        self.last_nudge = None;
    }

    pub fn pause(&mut self) {
        if let Some(engine) = self.engine.as_mut() {
            engine.pause();
        }
    }

    pub fn resume(&mut self) {
        if let Some(engine) = self.engine.as_mut() {
            engine.resume();
        }
    }

    /// Prefer the voice called `name`; falls back per [`pick_voice`] if it is unknown
    pub fn select_voice(&mut self, name: Option<&str>) {
        self.preferred_voice = name.map(str::to_string);
        self.reselect_voice();
    }

    pub fn set_rate(&mut self, rate: f32) {
        self.rate = clamp_rate(rate);
    }

    pub fn set_pitch(&mut self, pitch: f32) {
        self.pitch = clamp_pitch(pitch);
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.volume = clamp_volume(volume);
    }

    pub fn apply_settings(&mut self, settings: &AppSettings) {
        self.set_rate(settings.voice_rate);
        self.set_pitch(settings.voice_pitch);
        self.set_volume(settings.voice_volume);
        if self.preferred_voice != settings.preferred_voice {
            self.select_voice(settings.preferred_voice.as_deref());
        }
    }

    /// Apply every queued engine event in order; `End` and `Error` for any
    /// utterance but the current one are dropped
    pub fn poll_events(&mut self) {
        let Some(events) = self.events.clone() else {
            return;
        };

        while let Ok(event) = events.try_recv() {
            match event {
                SynthesisEvent::End { utterance } | SynthesisEvent::Error { utterance, .. }
                    if self.current != Some(utterance) =>
                {
                    debug!("Ignoring event for stale utterance {}", utterance);
                }
                SynthesisEvent::End { utterance } => {
                    debug!("Utterance {} finished", utterance);
                    self.finish_current();
                }
                SynthesisEvent::Error { code, .. } if code.is_interruption() => {
                    self.finish_current();
                }
                SynthesisEvent::Error { code, .. } => {
                    warn!("Speech synthesis error: {}", code);
                    self.finish_current();
                    self.error = Some(MurmurError::SynthesisFailed(code.to_string()));
                }
                SynthesisEvent::VoicesChanged => self.refresh_voices(),
            }
        }
    }

    fn finish_current(&mut self) {
        self.speaking = false;
        self.current = None;
        self.last_nudge = None;
    }

    /// Keep-alive: pause and resume the engine once per interval while it speaks
    pub fn tick(&mut self, now: Instant) {
        let Some(last) = self.last_nudge else {
            return;
        };
        let Some(engine) = self.engine.as_mut() else {
            return;
        };

        if !engine.is_speaking() {
            self.last_nudge = None;
            return;
        }

        if now.saturating_duration_since(last) >= self.keep_alive {
            engine.pause();
            engine.resume();
            self.last_nudge = Some(now);
        }
    }

    fn refresh_voices(&mut self) {
        if let Some(engine) = self.engine.as_ref() {
            self.voices = engine.voices();
            info!("{} synthesis voices available", self.voices.len());
        }
        self.reselect_voice();
    }

    fn reselect_voice(&mut self) {
        self.selected_voice =
            pick_voice(&self.voices, self.preferred_voice.as_deref(), &self.lang_prefix).cloned();
    }
}

impl Drop for SynthesisSession {
    fn drop(&mut self) {
        if let Some(engine) = self.engine.as_mut() {
            engine.cancel();
        }
    }
}
