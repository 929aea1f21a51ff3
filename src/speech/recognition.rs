//! Speech recognition session
//!
//! Wraps a platform recognition engine behind [`RecognitionEngine`] and keeps
//! the listening state machine (`Idle -> Listening -> Idle`) on the UI thread.
//! Engines report through a crossbeam channel which the session drains once
//! per frame in [`RecognitionSession::poll_events`].

use crate::{MurmurError, Result};
use crossbeam_channel::{bounded, Receiver, Sender};
use std::fmt;
use tracing::{debug, info, warn};

/// Default recognition locale
pub const DEFAULT_LOCALE: &str = "zh-CN";

/// Default bound on consecutive restarts that produced no result
pub const DEFAULT_MAX_RESTARTS: u32 = 5;

/// Options handed to the engine on creation
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecognitionOptions {
    /// Keep listening across pauses in speech
    pub continuous: bool,

    /// Report hypotheses before they are final
    pub interim_results: bool,

    /// BCP-47 language tag
    pub locale: String,
}

impl Default for RecognitionOptions {
    fn default() -> Self {
        Self {
            continuous: true,
            interim_results: true,
            locale: DEFAULT_LOCALE.to_string(),
        }
    }
}

impl RecognitionOptions {
    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = locale.into();
        self
    }
}

/// Microphone permission as reported by the platform
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    Denied,
    /// Not decided yet; the engine will ask on first start
    Prompt,
}

/// One recognized segment
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecognitionResult {
    pub transcript: String,
    pub is_final: bool,
}

impl RecognitionResult {
    pub fn interim(transcript: impl Into<String>) -> Self {
        Self {
            transcript: transcript.into(),
            is_final: false,
        }
    }

    pub fn final_text(transcript: impl Into<String>) -> Self {
        Self {
            transcript: transcript.into(),
            is_final: true,
        }
    }
}

/// Error codes an engine may report
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecognitionErrorCode {
    NoSpeech,
    NotAllowed,
    Aborted,
    Network,
    AudioCapture,
    Other(String),
}

impl fmt::Display for RecognitionErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecognitionErrorCode::NoSpeech => f.write_str("no-speech"),
            RecognitionErrorCode::NotAllowed => f.write_str("not-allowed"),
            RecognitionErrorCode::Aborted => f.write_str("aborted"),
            RecognitionErrorCode::Network => f.write_str("network"),
            RecognitionErrorCode::AudioCapture => f.write_str("audio-capture"),
            RecognitionErrorCode::Other(code) => f.write_str(code),
        }
    }
}

/// Events delivered by a recognition engine
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecognitionEvent {
    /// Results from `result_index` onward changed
    Result {
        result_index: usize,
        results: Vec<RecognitionResult>,
    },
    Error(RecognitionErrorCode),
    /// The engine stopped listening
    End,
}

/// A running platform recognizer
pub trait RecognitionEngine: Send {
    fn start(&mut self) -> Result<()>;
    fn stop(&mut self);
    fn abort(&mut self);
    fn is_active(&self) -> bool;
}

/// Creates recognizers; one per [`RecognitionSession::start`]
pub trait RecognitionEngineFactory: Send {
    fn create(
        &self,
        options: &RecognitionOptions,
        events: Sender<RecognitionEvent>,
    ) -> Result<Box<dyn RecognitionEngine>>;

    fn check_permission(&self) -> PermissionStatus;
}

/// Whether the platform offers speech recognition at all
pub enum RecognitionProvider {
    Available(Box<dyn RecognitionEngineFactory>),
    Unavailable,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecognitionStatus {
    Idle,
    Listening,
}

/// Joins the changed results: all final segments, or the interim ones if none are final
fn merge_results(result_index: usize, results: &[RecognitionResult]) -> String {
    let changed = || results.iter().skip(result_index);

    let finals: String = changed()
        .filter(|r| r.is_final)
        .map(|r| r.transcript.as_str())
        .collect();
    if !finals.is_empty() {
        return finals;
    }

    changed()
        .filter(|r| !r.is_final)
        .map(|r| r.transcript.as_str())
        .collect()
}

pub struct RecognitionSession {
    provider: RecognitionProvider,
    options: RecognitionOptions,
    max_restarts: u32,
    channel_capacity: usize,

    engine: Option<Box<dyn RecognitionEngine>>,
    event_rx: Receiver<RecognitionEvent>,

    /// Checked once per session and cached
    permission: Option<PermissionStatus>,

    /// The user wants to be listening
    intent: bool,
    status: RecognitionStatus,

    /// Published transcript
    transcript: String,

    /// Last known value, authoritative when a session ends
    last_transcript: String,

    restarts_without_result: u32,
    error: Option<MurmurError>,
}

impl RecognitionSession {
    pub fn new(provider: RecognitionProvider, options: RecognitionOptions) -> Self {
        // Placeholder receiver until the first engine is created
        let (_, event_rx) = bounded(1);

        Self {
            provider,
            options,
            max_restarts: DEFAULT_MAX_RESTARTS,
            channel_capacity: 64,
            engine: None,
            event_rx,
            permission: None,
            intent: false,
            status: RecognitionStatus::Idle,
            transcript: String::new(),
            last_transcript: String::new(),
            restarts_without_result: 0,
            error: None,
        }
    }

    pub fn with_max_restarts(mut self, max_restarts: u32) -> Self {
        self.max_restarts = max_restarts;
        self
    }

    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }

    pub fn is_supported(&self) -> bool {
        matches!(self.provider, RecognitionProvider::Available(_))
    }

    pub fn status(&self) -> RecognitionStatus {
        self.status
    }

    pub fn is_listening(&self) -> bool {
        self.status == RecognitionStatus::Listening
    }

    /// Stopped, but the engine has not reported `End` yet and may still
    /// deliver a late final result
    pub fn is_finishing(&self) -> bool {
        !self.intent && self.engine.is_some()
    }

    pub fn transcript(&self) -> &str {
        &self.transcript
    }

    pub fn last_transcript(&self) -> &str {
        &self.last_transcript
    }

    pub fn error(&self) -> Option<&MurmurError> {
        self.error.as_ref()
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    pub fn options(&self) -> &RecognitionOptions {
        &self.options
    }

    /// Begin listening with a fresh engine and an empty transcript
    pub fn start(&mut self) -> Result<()> {
        let permission = match &self.provider {
            RecognitionProvider::Unavailable => {
                return Err(self.fail_idle(MurmurError::UnsupportedCapability(
                    "speech recognition".into(),
                )));
            }
            RecognitionProvider::Available(factory) => {
                *self.permission.get_or_insert_with(|| factory.check_permission())
            }
        };

        if permission == PermissionStatus::Denied {
            return Err(self.fail_idle(MurmurError::PermissionDenied(
                "microphone access was denied".into(),
            )));
        }

        self.discard_engine();
        self.transcript.clear();
        self.last_transcript.clear();
        self.error = None;
        self.restarts_without_result = 0;

        if let Err(e) = self.spawn_engine() {
            return Err(self.fail_idle(e));
        }

        self.intent = true;
        self.status = RecognitionStatus::Listening;
        info!("Recognition started ({})", self.options.locale);
        Ok(())
    }

    /// Stop listening and publish the cached transcript; no-op when idle
    pub fn stop(&mut self) {
        if !self.intent && self.status == RecognitionStatus::Idle {
            return;
        }

        self.intent = false;
        if let Some(engine) = self.engine.as_mut() {
            if engine.is_active() {
                engine.stop();
            }
        }

        self.transcript = self.last_transcript.clone();
        self.status = RecognitionStatus::Idle;
        info!("Recognition stopped");
    }

    /// Forget the transcript without touching the listening state
    pub fn reset_transcript(&mut self) {
        self.transcript.clear();
        self.last_transcript.clear();
    }

    /// Apply every queued engine event in order
    pub fn poll_events(&mut self) {
        while let Ok(event) = self.event_rx.try_recv() {
            self.handle_event(event);
        }
    }

    fn handle_event(&mut self, event: RecognitionEvent) {
        match event {
            RecognitionEvent::Result {
                result_index,
                results,
            } => {
                let text = merge_results(result_index, &results);
                debug!("Recognition result: {:?}", text);
                self.restarts_without_result = 0;
                self.last_transcript = text.clone();
                self.transcript = text;
            }

            RecognitionEvent::Error(RecognitionErrorCode::NoSpeech) => {
                debug!("No speech detected");
            }

            RecognitionEvent::Error(RecognitionErrorCode::NotAllowed) => {
                warn!("Microphone permission denied by engine");
                self.permission = Some(PermissionStatus::Denied);
                self.fail_idle(MurmurError::PermissionDenied(
                    "microphone access was denied".into(),
                ));
            }

            RecognitionEvent::Error(RecognitionErrorCode::Aborted) if !self.intent => {
                debug!("Recognition aborted after stop");
            }

            RecognitionEvent::Error(code) => {
                warn!("Recognition error: {}", code);
                self.fail_idle(MurmurError::RecognitionFailed(code.to_string()));
            }

            RecognitionEvent::End if self.intent => self.restart(),

            RecognitionEvent::End => {
                self.transcript = self.last_transcript.clone();
                self.engine = None;
                self.status = RecognitionStatus::Idle;
            }
        }
    }

    fn restart(&mut self) {
        if self.restarts_without_result >= self.max_restarts {
            warn!(
                "Recognition ended {} times without a result, giving up",
                self.restarts_without_result
            );
            self.fail_idle(MurmurError::RecognitionFailed(
                "recognition ended repeatedly".into(),
            ));
            return;
        }

        self.restarts_without_result += 1;
        debug!("Restarting recognition (attempt {})", self.restarts_without_result);

        let restarted = match self.engine.as_mut() {
            Some(engine) => engine.start(),
            None => self.spawn_engine(),
        };
        if let Err(e) = restarted {
            self.fail_idle(e);
        }
    }

    fn spawn_engine(&mut self) -> Result<()> {
        let RecognitionProvider::Available(factory) = &self.provider else {
            return Err(MurmurError::UnsupportedCapability("speech recognition".into()));
        };

        let (event_tx, event_rx) = bounded(self.channel_capacity);
        let mut engine = factory.create(&self.options, event_tx)?;
        engine.start()?;

        self.event_rx = event_rx;
        self.engine = Some(engine);
        Ok(())
    }

    fn discard_engine(&mut self) {
        if let Some(mut engine) = self.engine.take() {
            engine.abort();
        }
    }

    /// Record `error`, drop the engine and return to idle
    fn fail_idle(&mut self, error: MurmurError) -> MurmurError {
        self.intent = false;
        self.status = RecognitionStatus::Idle;
        self.discard_engine();
        self.error = Some(error.clone());
        error
    }
}

impl Drop for RecognitionSession {
    fn drop(&mut self) {
        self.discard_engine();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Default)]
    struct EngineCalls {
        sender: Option<Sender<RecognitionEvent>>,
        created: usize,
        starts: usize,
        aborts: usize,
    }

    struct FakeEngine {
        calls: Arc<Mutex<EngineCalls>>,
        active: bool,
    }

    impl RecognitionEngine for FakeEngine {
        fn start(&mut self) -> Result<()> {
            self.calls.lock().starts += 1;
            self.active = true;
            Ok(())
        }

        fn stop(&mut self) {
            self.active = false;
        }

        fn abort(&mut self) {
            self.calls.lock().aborts += 1;
            self.active = false;
        }

        fn is_active(&self) -> bool {
            self.active
        }
    }

    struct FakeFactory {
        calls: Arc<Mutex<EngineCalls>>,
        permission: PermissionStatus,
    }

    impl RecognitionEngineFactory for FakeFactory {
        fn create(
            &self,
            _options: &RecognitionOptions,
            events: Sender<RecognitionEvent>,
        ) -> Result<Box<dyn RecognitionEngine>> {
            let mut calls = self.calls.lock();
            calls.sender = Some(events);
            calls.created += 1;
            Ok(Box::new(FakeEngine {
                calls: Arc::clone(&self.calls),
                active: false,
            }))
        }

        fn check_permission(&self) -> PermissionStatus {
            self.permission
        }
    }

    fn session(permission: PermissionStatus) -> (RecognitionSession, Arc<Mutex<EngineCalls>>) {
        let calls = Arc::new(Mutex::new(EngineCalls::default()));
        let factory = FakeFactory {
            calls: Arc::clone(&calls),
            permission,
        };
        let session = RecognitionSession::new(
            RecognitionProvider::Available(Box::new(factory)),
            RecognitionOptions::default(),
        );
        (session, calls)
    }

    fn emit(calls: &Arc<Mutex<EngineCalls>>, event: RecognitionEvent) {
        let calls = calls.lock();
        calls.sender.as_ref().unwrap().send(event).unwrap();
    }

    #[test]
    fn test_merge_prefers_final_segments() {
        let results = vec![
            RecognitionResult::final_text("你"),
            RecognitionResult::interim("好吗"),
            RecognitionResult::final_text("好"),
        ];
        assert_eq!(merge_results(0, &results), "你好");
        assert_eq!(merge_results(1, &results), "好");
        assert_eq!(merge_results(1, &results[..2]), "好吗");
        assert_eq!(merge_results(5, &results), "");
    }

    #[test]
    fn test_default_options() {
        let options = RecognitionOptions::default();
        assert!(options.continuous);
        assert!(options.interim_results);
        assert_eq!(options.locale, "zh-CN");
    }

    #[test]
    fn test_unsupported_start_stays_idle() {
        let mut session =
            RecognitionSession::new(RecognitionProvider::Unavailable, RecognitionOptions::default());
        let err = session.start().unwrap_err();
        assert!(matches!(err, MurmurError::UnsupportedCapability(_)));
        assert_eq!(session.status(), RecognitionStatus::Idle);
        assert!(session.error().is_some());
    }

    #[test]
    fn test_denied_permission() {
        let (mut session, calls) = session(PermissionStatus::Denied);
        assert!(matches!(session.start(), Err(MurmurError::PermissionDenied(_))));
        assert!(!session.is_listening());
        assert_eq!(calls.lock().created, 0);
    }

    #[test]
    fn test_start_discards_previous_engine() {
        let (mut session, calls) = session(PermissionStatus::Granted);
        session.start().unwrap();
        session.start().unwrap();

        let calls = calls.lock();
        assert_eq!(calls.created, 2);
        assert_eq!(calls.aborts, 1);
    }

    #[test]
    fn test_end_while_listening_restarts() {
        let (mut session, calls) = session(PermissionStatus::Granted);
        session.start().unwrap();

        emit(&calls, RecognitionEvent::End);
        session.poll_events();

        assert!(session.is_listening());
        assert_eq!(calls.lock().starts, 2);
    }

    #[test]
    fn test_no_speech_is_swallowed() {
        let (mut session, calls) = session(PermissionStatus::Granted);
        session.start().unwrap();

        emit(&calls, RecognitionEvent::Error(RecognitionErrorCode::NoSpeech));
        session.poll_events();

        assert!(session.is_listening());
        assert!(session.error().is_none());
    }

    #[test]
    fn test_not_allowed_caches_denial() {
        let (mut session, calls) = session(PermissionStatus::Prompt);
        session.start().unwrap();

        emit(&calls, RecognitionEvent::Error(RecognitionErrorCode::NotAllowed));
        session.poll_events();

        assert!(!session.is_listening());
        assert!(matches!(session.error(), Some(MurmurError::PermissionDenied(_))));
        assert!(matches!(session.start(), Err(MurmurError::PermissionDenied(_))));
    }

    #[test]
    fn test_network_error_forces_idle() {
        let (mut session, calls) = session(PermissionStatus::Granted);
        session.start().unwrap();

        emit(&calls, RecognitionEvent::Error(RecognitionErrorCode::Network));
        session.poll_events();

        assert_eq!(session.status(), RecognitionStatus::Idle);
        assert_eq!(
            session.error(),
            Some(&MurmurError::RecognitionFailed("network".into()))
        );
    }

    #[test]
    fn test_reset_transcript_keeps_listening() {
        let (mut session, calls) = session(PermissionStatus::Granted);
        session.start().unwrap();
        emit(
            &calls,
            RecognitionEvent::Result {
                result_index: 0,
                results: vec![RecognitionResult::interim("hello")],
            },
        );
        session.poll_events();
        assert_eq!(session.transcript(), "hello");

        session.reset_transcript();
        assert_eq!(session.transcript(), "");
        assert_eq!(session.last_transcript(), "");
        assert!(session.is_listening());
    }
}
