//! Application state management
//!
//! `AppState` is owned by the UI thread and is the only place where the chat
//! manager, settings and speech sessions are mutated. Background work reports
//! back through channels drained in [`AppState::poll_events`].

use crate::integration::{
    AiConfigPatch, AppSettings, ChatSessionManager, IntegrationConfig, PendingRequest,
    SettingsPatch, SettingsStore,
};
use crate::llm::{AiConfig, ChatBackend, LlmCommand, LlmEvent, LlmPipeline};
use crate::messages::{ChatThread, Message, Role, SlotBackend};
use crate::speech::{RecognitionProvider, RecognitionSession, SynthesisProvider, SynthesisSession};
use crate::ui::typewriter::Typewriter;
use crate::{MurmurError, Result};
use crossbeam_channel::{Receiver, Sender, TrySendError};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Top-level pages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Home,
    Chat,
    Settings,
    About,
    NotFound,
}

impl Route {
    pub fn from_path(path: &str) -> Self {
        match path.trim_end_matches('/') {
            "" => Route::Home,
            "/chat" => Route::Chat,
            "/settings" => Route::Settings,
            "/about" => Route::About,
            _ => Route::NotFound,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Route::Home => "Home",
            Route::Chat => "Chat",
            Route::Settings => "Settings",
            Route::About => "About",
            Route::NotFound => "Not found",
        }
    }
}

/// Platform and network collaborators injected at startup
pub struct Services {
    pub storage: Arc<dyn SlotBackend>,
    pub backend: Arc<dyn ChatBackend>,
    pub recognition: RecognitionProvider,
    pub synthesis: SynthesisProvider,
}

/// Text fields on the settings page that are committed on demand
#[derive(Debug, Clone, Default)]
pub struct SettingsForm {
    pub api_key: String,
    pub model: String,
    pub endpoint: String,
}

impl SettingsForm {
    fn from_config(config: &AiConfig) -> Self {
        Self {
            api_key: config.api_key.clone().unwrap_or_default(),
            model: config.model.clone(),
            endpoint: config.endpoint.clone().unwrap_or_default(),
        }
    }
}

pub struct AppState {
    pub route: Route,

    /// Chat input text
    pub input_text: String,

    /// Quick-start text on the home page
    pub home_prompt: String,

    pub settings_form: SettingsForm,

    manager: ChatSessionManager,
    settings: SettingsStore,
    recognition: RecognitionSession,
    synthesis: SynthesisSession,

    llm_tx: Sender<LlmCommand>,
    llm_rx: Receiver<LlmEvent>,

    /// One per thread, bound to the latest reply received this session
    typewriters: HashMap<Uuid, Typewriter>,
    typewriter_interval: Duration,

    /// Message currently being read aloud
    speaking_message: Option<Uuid>,

    was_listening: bool,

    /// Listening stopped but the engine may still deliver the final result
    draining_transcript: bool,

    /// Last transcript copied into the input while draining
    bridged_transcript: String,

    /// Errors that belong to no other component
    app_error: Option<MurmurError>,
}

impl AppState {
    /// Load persisted state and start the request worker
    pub fn new(config: &IntegrationConfig, services: Services) -> Result<Self> {
        let mut settings = SettingsStore::load(Arc::clone(&services.storage));
        settings.apply_env_defaults();
        let manager = ChatSessionManager::load(services.storage);

        let pipeline = LlmPipeline::with_capacity(services.backend, config.channel_capacity);
        let llm_tx = pipeline.command_sender();
        let llm_rx = pipeline.event_receiver();
        pipeline.start_worker()?;

        let recognition = RecognitionSession::new(services.recognition, config.recognition.clone())
            .with_max_restarts(config.max_recognition_restarts)
            .with_channel_capacity(config.channel_capacity);
        let mut synthesis =
            SynthesisSession::new(services.synthesis).with_keep_alive(config.keep_alive_interval);
        synthesis.apply_settings(settings.settings());

        let state = Self {
            route: Route::Home,
            input_text: String::new(),
            home_prompt: String::new(),
            settings_form: SettingsForm::from_config(settings.stored_ai_config()),
            manager,
            settings,
            recognition,
            synthesis,
            llm_tx,
            llm_rx,
            typewriters: HashMap::new(),
            typewriter_interval: config.typewriter_interval,
            speaking_message: None,
            was_listening: false,
            draining_transcript: false,
            bridged_transcript: String::new(),
            app_error: None,
        };
        state.push_ai_config();

        info!("Application state ready");
        Ok(state)
    }

    pub fn manager(&self) -> &ChatSessionManager {
        &self.manager
    }

    pub fn settings(&self) -> &AppSettings {
        self.settings.settings()
    }

    pub fn ai_config(&self) -> &AiConfig {
        self.settings.ai_config()
    }

    pub fn recognition(&self) -> &RecognitionSession {
        &self.recognition
    }

    pub fn synthesis(&self) -> &SynthesisSession {
        &self.synthesis
    }

    pub fn current_thread(&self) -> Option<&ChatThread> {
        self.manager.current_chat()
    }

    pub fn is_loading(&self) -> bool {
        self.manager.is_loading()
    }

    pub fn is_listening(&self) -> bool {
        self.recognition.is_listening()
    }

    pub fn is_speaking_message(&self, id: Uuid) -> bool {
        self.speaking_message == Some(id)
    }

    pub fn can_send(&self) -> bool {
        !self.input_text.trim().is_empty() && !self.is_loading()
    }

    /// Text to show for `message`: the typewriter's prefix for the reply it
    /// is revealing, the full content otherwise
    pub fn display_text<'a>(&'a self, thread_id: Uuid, message: &'a Message) -> &'a str {
        match self.typewriters.get(&thread_id) {
            Some(typewriter) if typewriter.message_id() == Some(message.id) => {
                typewriter.visible_text()
            }
            _ => &message.content,
        }
    }

    pub fn is_revealing(&self, message_id: Uuid) -> bool {
        self.typewriters
            .values()
            .any(|t| t.message_id() == Some(message_id) && t.is_revealing())
    }

    /// Whether anything is animating or waiting on background work
    pub fn needs_repaint(&self) -> bool {
        self.is_loading()
            || self.is_listening()
            || self.draining_transcript
            || self.synthesis.is_speaking()
            || self.typewriters.values().any(Typewriter::is_revealing)
    }

    /// The most relevant error for the banner
    pub fn error_message(&self) -> Option<String> {
        self.manager
            .error()
            .or(self.recognition.error())
            .or(self.synthesis.error())
            .or(self.app_error.as_ref())
            .filter(|e| e.is_user_visible())
            .map(MurmurError::user_message)
    }

    pub fn dismiss_error(&mut self) {
        self.manager.clear_error();
        self.recognition.clear_error();
        self.synthesis.clear_error();
        self.app_error = None;
    }

    pub fn navigate(&mut self, route: Route) {
        debug!("Navigating to {:?}", route);
        if route == Route::Settings {
            self.settings_form = SettingsForm::from_config(self.settings.stored_ai_config());
        }
        self.route = route;
    }

    /// Drain worker and engine events and advance animations
    pub fn poll_events(&mut self, now: Instant) {
        while let Ok(event) = self.llm_rx.try_recv() {
            match event {
                LlmEvent::Reply { request_id, result } => self.apply_reply(request_id, result),
                LlmEvent::Failed(e) => {
                    error!("LLM worker failed: {}", e);
                    self.app_error = Some(e);
                }
                LlmEvent::Shutdown => debug!("LLM worker shut down"),
            }
        }

        self.recognition.poll_events();
        self.bridge_transcript();

        self.synthesis.poll_events();
        self.synthesis.tick(now);
        if !self.synthesis.is_speaking() {
            self.speaking_message = None;
        }

        let finished: Vec<Uuid> = self
            .typewriters
            .iter_mut()
            .filter_map(|(thread_id, typewriter)| typewriter.tick(now).then_some(*thread_id))
            .collect();
        for thread_id in finished {
            self.autoplay(thread_id);
        }
    }

    /// Send the chat input in the active thread
    pub fn send_input(&mut self) {
        if self.recognition.is_listening() {
            self.recognition.stop();
            self.was_listening = false;
        }
        self.draining_transcript = false;

        let text = self.input_text.trim().to_string();
        if let Some(pending) = self.manager.send_message(&text) {
            self.input_text.clear();
            self.recognition.reset_transcript();
            self.dispatch(pending);
        }
    }

    /// Start a new thread from the home page prompt
    pub fn start_chat_from_home(&mut self) {
        let text = std::mem::take(&mut self.home_prompt);
        if let Some(pending) = self.manager.create_new_chat(Some(&text)) {
            self.dispatch(pending);
        }
        self.route = Route::Chat;
    }

    pub fn new_chat(&mut self) {
        self.manager.create_new_chat(None);
        self.route = Route::Chat;
    }

    pub fn select_chat(&mut self, id: Uuid) {
        if self.manager.set_current_chat(id) {
            self.route = Route::Chat;
        }
    }

    pub fn rename_chat(&mut self, id: Uuid, title: &str) {
        self.manager.rename_chat(id, title);
    }

    pub fn delete_chat(&mut self, id: Uuid) {
        let pending = self.manager.pending_request_id();
        self.manager.delete_chat(id);
        self.typewriters.remove(&id);
        self.cancel_if_dropped(pending);
    }

    pub fn clear_all_chats(&mut self) {
        let pending = self.manager.pending_request_id();
        self.manager.clear_all_chats();
        self.typewriters.clear();
        self.cancel_if_dropped(pending);
    }

    /// Stop waiting for the current reply
    pub fn stop_generation(&mut self) {
        if self.manager.abort_current_request().is_some() {
            self.send_command(LlmCommand::Cancel);
        }
    }

    pub fn toggle_listening(&mut self) {
        if self.recognition.is_listening() {
            self.recognition.stop();
        } else if self.recognition.start().is_ok() {
            self.input_text.clear();
            self.draining_transcript = false;
        }
    }

    /// Read `message` aloud, or stop if it is the one already playing
    pub fn toggle_speech(&mut self, message: &Message) {
        if self.speaking_message == Some(message.id) {
            self.synthesis.stop();
            self.speaking_message = None;
            return;
        }

        if self.synthesis.speak(&message.content).is_ok() {
            self.speaking_message = Some(message.id);
        }
    }

    /// Reveal a reply immediately (clicking the bubble)
    pub fn skip_reveal(&mut self, thread_id: Uuid) {
        let finished = self
            .typewriters
            .get_mut(&thread_id)
            .is_some_and(Typewriter::finish);
        if finished {
            self.autoplay(thread_id);
        }
    }

    pub fn update_settings(&mut self, patch: SettingsPatch) {
        if let Err(e) = self.settings.update_settings(patch) {
            warn!("Failed to save settings: {}", e);
            self.app_error = Some(e);
        }
        self.synthesis.apply_settings(self.settings.settings());
        if !self.settings.settings().voice_enabled {
            self.synthesis.stop();
        }
    }

    pub fn update_ai_config(&mut self, patch: AiConfigPatch) {
        if let Err(e) = self.settings.update_ai_config(patch) {
            warn!("Failed to save AI config: {}", e);
            self.app_error = Some(e);
        }
        self.push_ai_config();
    }

    /// Commit the settings form's text fields
    pub fn save_settings_form(&mut self) {
        let form = self.settings_form.clone();
        let model = form.model.trim();
        self.update_ai_config(AiConfigPatch {
            api_key: Some(Some(form.api_key.trim().to_string())),
            model: Some(if model.is_empty() {
                crate::llm::DEFAULT_MODEL.to_string()
            } else {
                model.to_string()
            }),
            endpoint: Some(Some(form.endpoint.trim().to_string())),
            ..Default::default()
        });
    }

    pub fn reset_settings(&mut self) {
        if let Err(e) = self.settings.reset_settings() {
            warn!("Failed to reset settings: {}", e);
            self.app_error = Some(e);
        }
        self.synthesis.apply_settings(self.settings.settings());
        self.settings_form = SettingsForm::from_config(self.settings.stored_ai_config());
        self.push_ai_config();
    }

    /// Speak a fixed sample with the current voice settings
    pub fn test_voice(&mut self) {
        self.speaking_message = None;
        let _ = self.synthesis.speak("你好，这是语音测试。Hello, this is a voice test.");
    }

    fn dispatch(&mut self, pending: PendingRequest) {
        let request_id = pending.request_id;
        self.route = Route::Chat;
        self.send_command(LlmCommand::Complete {
            request_id,
            history: pending.history,
        });
    }

    fn send_command(&mut self, command: LlmCommand) {
        let request_id = match &command {
            LlmCommand::Complete { request_id, .. } => Some(*request_id),
            _ => None,
        };

        match self.llm_tx.try_send(command) {
            Ok(()) => {}
            Err(e) => {
                let reason = match e {
                    TrySendError::Full(_) => "request queue is full",
                    TrySendError::Disconnected(_) => "request worker is not running",
                };
                warn!("Could not reach LLM worker: {}", reason);
                if let Some(request_id) = request_id {
                    self.manager
                        .complete_request(request_id, Err(MurmurError::ChannelError(reason.into())));
                }
            }
        }
    }

    fn push_ai_config(&self) {
        if self
            .llm_tx
            .try_send(LlmCommand::Configure(self.settings.ai_config().clone()))
            .is_err()
        {
            warn!("Could not forward AI config to the worker");
        }
    }

    fn cancel_if_dropped(&mut self, pending: Option<Uuid>) {
        if pending.is_some() && self.manager.pending_request_id().is_none() {
            self.send_command(LlmCommand::Cancel);
        }
    }

    fn apply_reply(&mut self, request_id: Uuid, result: Result<String>) {
        let thread_id = self
            .manager
            .pending_thread_id()
            .filter(|_| self.manager.pending_request_id() == Some(request_id));
        let succeeded = result.is_ok();
        if !self.manager.complete_request(request_id, result) || !succeeded {
            return;
        }

        let Some(thread_id) = thread_id else {
            return;
        };
        let Some(reply) = self
            .manager
            .thread(thread_id)
            .and_then(ChatThread::last_message)
            .filter(|m| m.role == Role::Assistant)
        else {
            return;
        };

        let interval = self.typewriter_interval;
        self.typewriters
            .entry(thread_id)
            .or_insert_with(|| Typewriter::new(interval))
            .observe(reply);
    }

    fn autoplay(&mut self, thread_id: Uuid) {
        let settings = self.settings.settings();
        if !settings.voice_enabled || !settings.auto_play_voice || !self.synthesis.is_supported() {
            return;
        }
        if self.manager.current_chat_id() != Some(thread_id) {
            return;
        }

        let Some(reply) = self
            .manager
            .thread(thread_id)
            .and_then(ChatThread::last_message)
            .filter(|m| m.role == Role::Assistant)
            .cloned()
        else {
            return;
        };

        if self.synthesis.speak(&reply.content).is_ok() {
            self.speaking_message = Some(reply.id);
        }
    }

    /// Mirror the transcript into the input while listening, then keep
    /// landing it there until the engine ends so a late final result is
    /// not lost
    fn bridge_transcript(&mut self) {
        let listening = self.recognition.is_listening();

        if listening {
            let transcript = self.recognition.transcript();
            if !transcript.is_empty() && transcript != self.input_text {
                self.input_text = transcript.to_string();
            }
        } else {
            if self.was_listening {
                self.draining_transcript = true;
                self.bridged_transcript.clear();
            }

            if self.draining_transcript {
                let final_text = Some(self.recognition.transcript())
                    .filter(|t| !t.is_empty())
                    .unwrap_or(self.recognition.last_transcript());
                if !final_text.is_empty() && final_text != self.bridged_transcript {
                    self.input_text = final_text.to_string();
                    self.bridged_transcript = final_text.to_string();
                }
                if !self.recognition.is_finishing() {
                    self.draining_transcript = false;
                }
            }
        }

        self.was_listening = listening;
    }
}

impl Drop for AppState {
    fn drop(&mut self) {
        let _ = self.llm_tx.try_send(LlmCommand::Shutdown);
    }
}
