//! Test doubles shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use crossbeam_channel::{unbounded, Sender};
use murmur::llm::{ChatBackend, ConversationMessage};
use murmur::speech::{
    PermissionStatus, RecognitionEngine, RecognitionEngineFactory, RecognitionEvent,
    RecognitionOptions, RecognitionProvider, RecognitionResult, SpeechEngine, SynthesisErrorCode, SynthesisEvent,
    SynthesisProvider, Utterance, Voice,
};
use murmur::MurmurError;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// Replies from a fixed script and records what it was asked
pub struct ScriptedBackend {
    replies: Mutex<VecDeque<murmur::Result<String>>>,
    pub seen: Mutex<Vec<Vec<ConversationMessage>>>,
}

impl ScriptedBackend {
    pub fn new(replies: Vec<murmur::Result<String>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            seen: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ChatBackend for ScriptedBackend {
    async fn complete(&self, history: &[ConversationMessage]) -> murmur::Result<String> {
        self.seen.lock().push(history.to_vec());
        self.replies
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(MurmurError::EmptyResult("Script".into())))
    }

    fn abort(&self) {}
}

/// What the fake recognizer has been asked to do
#[derive(Default)]
pub struct MicLog {
    pub created: usize,
    pub starts: usize,
    pub stops: usize,
    pub aborts: usize,
    pub active: bool,
    pub events: Option<Sender<RecognitionEvent>>,
}

/// Handle the test keeps to drive the fake recognizer
#[derive(Clone, Default)]
pub struct FakeMic {
    pub calls: Arc<Mutex<MicLog>>,
    pub permission: Option<PermissionStatus>,
}

impl FakeMic {
    pub fn provider(&self) -> RecognitionProvider {
        RecognitionProvider::Available(Box::new(self.clone()))
    }

    /// Deliver an event as the newest engine would
    pub fn emit(&self, event: RecognitionEvent) {
        if let Some(tx) = &self.calls.lock().events {
            let _ = tx.try_send(event);
        }
    }

    pub fn hear(&self, results: Vec<RecognitionResult>) {
        self.emit(RecognitionEvent::Result {
            result_index: 0,
            results,
        });
    }
}

struct FakeMicEngine {
    calls: Arc<Mutex<MicLog>>,
}

impl RecognitionEngine for FakeMicEngine {
    fn start(&mut self) -> murmur::Result<()> {
        let mut calls = self.calls.lock();
        calls.starts += 1;
        calls.active = true;
        Ok(())
    }

    fn stop(&mut self) {
        let mut calls = self.calls.lock();
        calls.stops += 1;
        calls.active = false;
    }

    fn abort(&mut self) {
        let mut calls = self.calls.lock();
        calls.aborts += 1;
        calls.active = false;
    }

    fn is_active(&self) -> bool {
        self.calls.lock().active
    }
}

impl RecognitionEngineFactory for FakeMic {
    fn create(
        &self,
        _options: &RecognitionOptions,
        events: Sender<RecognitionEvent>,
    ) -> murmur::Result<Box<dyn RecognitionEngine>> {
        let mut calls = self.calls.lock();
        calls.created += 1;
        calls.events = Some(events);
        Ok(Box::new(FakeMicEngine {
            calls: Arc::clone(&self.calls),
        }))
    }

    fn check_permission(&self) -> PermissionStatus {
        self.permission.unwrap_or(PermissionStatus::Granted)
    }
}

/// What the fake speaker has been asked to do
#[derive(Default)]
pub struct SpeakerLog {
    pub spoken: Vec<Utterance>,
    pub cancels: usize,
    pub pauses: usize,
    pub resumes: usize,
    pub speaking: bool,
    pub paused: bool,
}

impl SpeakerLog {
    /// Id of the utterance most recently handed to the engine
    pub fn last_id(&self) -> u64 {
        self.spoken.last().map(|u| u.id).unwrap_or_default()
    }
}

/// Reports `Interrupted` for the playing utterance when cancelled, as browsers do
pub struct FakeSpeaker {
    log: Arc<Mutex<SpeakerLog>>,
    voices: Vec<Voice>,
    events: Sender<SynthesisEvent>,
}

impl SpeechEngine for FakeSpeaker {
    fn voices(&self) -> Vec<Voice> {
        self.voices.clone()
    }

    fn speak(&mut self, utterance: &Utterance) -> murmur::Result<()> {
        let mut log = self.log.lock();
        log.spoken.push(utterance.clone());
        log.speaking = true;
        Ok(())
    }

    fn cancel(&mut self) {
        let mut log = self.log.lock();
        log.cancels += 1;
        if log.speaking {
            let _ = self.events.send(SynthesisEvent::Error {
                utterance: log.last_id(),
                code: SynthesisErrorCode::Interrupted,
            });
        }
        log.speaking = false;
    }

    fn pause(&mut self) {
        let mut log = self.log.lock();
        log.pauses += 1;
        log.paused = true;
    }

    fn resume(&mut self) {
        let mut log = self.log.lock();
        log.resumes += 1;
        log.paused = false;
    }

    fn is_speaking(&self) -> bool {
        self.log.lock().speaking
    }

    fn is_paused(&self) -> bool {
        self.log.lock().paused
    }
}

/// A speaker with two voices, plus the handles to observe and drive it
pub fn fake_speaker() -> (SynthesisProvider, Arc<Mutex<SpeakerLog>>, Sender<SynthesisEvent>) {
    let log = Arc::new(Mutex::new(SpeakerLog::default()));
    let (tx, rx) = unbounded();
    let engine = FakeSpeaker {
        log: Arc::clone(&log),
        voices: vec![Voice::new("Samantha", "en-US"), Voice::new("Tingting", "zh-CN")],
        events: tx.clone(),
    };
    (SynthesisProvider::Available(Box::new(engine), rx), log, tx)
}
