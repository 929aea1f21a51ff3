//! Speech input and output
//!
//! Both directions are driven through platform engines behind traits, so the
//! sessions here only hold state and policy:
//! - `recognition`: microphone transcription with transparent restarts
//! - `synthesis`: speaking replies with voice selection and keep-alive

pub mod recognition;
pub mod synthesis;

pub use recognition::{
    PermissionStatus, RecognitionEngine, RecognitionEngineFactory, RecognitionErrorCode,
    RecognitionEvent, RecognitionOptions, RecognitionProvider, RecognitionResult,
    RecognitionSession, RecognitionStatus,
};
pub use synthesis::{
    pick_voice, SpeechEngine, SynthesisErrorCode, SynthesisEvent, SynthesisProvider,
    SynthesisSession, Utterance, Voice,
};
