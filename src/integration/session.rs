//! Chat session manager
//!
//! Owns the chat threads, the active thread and the single outstanding AI
//! request. Sending is split in two halves so the network call can run
//! elsewhere: [`ChatSessionManager::send_message`] records the user turn and a
//! loading placeholder and hands back a [`PendingRequest`];
//! [`ChatSessionManager::complete_request`] applies the outcome. Every
//! mutation is written through to the chats slot.

use crate::llm::client::ChatBackend;
use crate::llm::context::{history_from, ConversationMessage};
use crate::messages::{title_from_text, ChatData, ChatThread, Message, Slot, SlotBackend, CHATS_SLOT};
use crate::{MurmurError, Result};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// A request handed to the AI client
#[derive(Clone, Debug, PartialEq)]
pub struct PendingRequest {
    pub request_id: Uuid,
    pub thread_id: Uuid,
    pub placeholder_id: Uuid,
    /// Thread messages without the placeholder, newest last
    pub history: Vec<ConversationMessage>,
}

#[derive(Clone, Copy, Debug)]
struct InFlight {
    request_id: Uuid,
    thread_id: Uuid,
    placeholder_id: Uuid,
}

pub struct ChatSessionManager {
    slot: Slot<ChatData>,
    data: ChatData,
    in_flight: Option<InFlight>,
    error: Option<MurmurError>,
}

impl ChatSessionManager {
    /// Load chat history from `backend`; missing or corrupt data starts empty
    pub fn load(backend: Arc<dyn SlotBackend>) -> Self {
        let slot = Slot::new(backend, CHATS_SLOT);
        let mut data: ChatData = slot.load_or_default();

        // Placeholders left behind by an interrupted run can never complete
        for thread in &mut data.threads {
            thread.messages.retain(|m| !m.is_loading);
        }
        if data.current().is_none() {
            data.current_chat_id = None;
        }

        info!("Loaded {} chat threads", data.threads.len());
        Self {
            slot,
            data,
            in_flight: None,
            error: None,
        }
    }

    pub fn threads(&self) -> &[ChatThread] {
        &self.data.threads
    }

    pub fn current_chat_id(&self) -> Option<Uuid> {
        self.data.current_chat_id
    }

    pub fn current_chat(&self) -> Option<&ChatThread> {
        self.data.current()
    }

    pub fn thread(&self, id: Uuid) -> Option<&ChatThread> {
        self.data.thread(id)
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Id of the request awaiting completion, if any
    pub fn pending_request_id(&self) -> Option<Uuid> {
        self.in_flight.map(|f| f.request_id)
    }

    /// Thread the pending request will reply into
    pub fn pending_thread_id(&self) -> Option<Uuid> {
        self.in_flight.map(|f| f.thread_id)
    }

    pub fn error(&self) -> Option<&MurmurError> {
        self.error.as_ref()
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    /// Record a user turn in the active thread, creating one if needed.
    ///
    /// Returns `None` for blank text or while another request is in flight.
    pub fn send_message(&mut self, text: &str) -> Option<PendingRequest> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        if let Some(in_flight) = self.in_flight {
            warn!(
                "Ignoring message while request {} is in flight",
                in_flight.request_id
            );
            return None;
        }

        let thread_id = match self.data.current_chat_id.filter(|id| self.data.thread(*id).is_some()) {
            Some(id) => id,
            None => self.insert_thread(),
        };
        self.begin_request(thread_id, text)
    }

    /// Send and await the reply from `backend` directly, without a worker
    pub async fn send_and_wait(&mut self, backend: &dyn ChatBackend, text: &str) -> Result<()> {
        let Some(pending) = self.send_message(text) else {
            return Ok(());
        };

        let result = backend.complete(&pending.history).await;
        let outcome = result.as_ref().map(|_| ()).map_err(|e| e.clone());
        self.complete_request(pending.request_id, result);
        outcome
    }

    /// Apply the outcome of `request_id`; stale ids are ignored.
    ///
    /// Returns whether the outcome was applied.
    pub fn complete_request(&mut self, request_id: Uuid, result: Result<String>) -> bool {
        let Some(in_flight) = self.in_flight.filter(|f| f.request_id == request_id) else {
            debug!("Ignoring stale completion for {}", request_id);
            return false;
        };
        self.in_flight = None;

        let Some(thread) = self.data.thread_mut(in_flight.thread_id) else {
            debug!("Thread {} is gone, dropping reply", in_flight.thread_id);
            return false;
        };

        match result {
            Ok(reply) => {
                if let Some(placeholder) = thread.find_message_mut(in_flight.placeholder_id) {
                    *placeholder = Message::assistant(reply);
                }
                if thread.messages.len() == 2 {
                    if let Some(first) = thread.messages.first().filter(|m| m.is_user()) {
                        thread.title = title_from_text(&first.content);
                    }
                }
                thread.touch();
            }
            Err(e) => {
                thread.remove_message(in_flight.placeholder_id);
                thread.touch();
                if e == MurmurError::Aborted {
                    debug!("Request {} aborted", request_id);
                } else {
                    warn!("Request {} failed: {}", request_id, e);
                    self.error = Some(e);
                }
            }
        }

        self.persist();
        true
    }

    /// Start a fresh thread at the top of the list and make it active.
    ///
    /// With `initial_text`, immediately sends it in the new thread.
    pub fn create_new_chat(&mut self, initial_text: Option<&str>) -> Option<PendingRequest> {
        let thread_id = self.insert_thread();
        self.error = None;

        let Some(text) = initial_text.map(str::trim).filter(|t| !t.is_empty()) else {
            self.persist();
            return None;
        };
        if self.in_flight.is_some() {
            warn!("Ignoring initial message while another request is in flight");
            self.persist();
            return None;
        }
        self.begin_request(thread_id, text)
    }

    pub fn set_current_chat(&mut self, id: Uuid) -> bool {
        if self.data.thread(id).is_none() {
            return false;
        }
        self.data.current_chat_id = Some(id);
        self.persist();
        true
    }

    pub fn rename_chat(&mut self, id: Uuid, title: &str) -> bool {
        let title = title.trim();
        let Some(thread) = self.data.thread_mut(id).filter(|_| !title.is_empty()) else {
            return false;
        };
        thread.title = title.to_string();
        thread.touch();
        self.persist();
        true
    }

    /// Remove a thread; if it was active the first remaining thread becomes active
    pub fn delete_chat(&mut self, id: Uuid) -> bool {
        let Some(index) = self.data.threads.iter().position(|t| t.id == id) else {
            return false;
        };
        self.data.threads.remove(index);

        if self.in_flight.is_some_and(|f| f.thread_id == id) {
            self.in_flight = None;
        }
        if self.data.current_chat_id == Some(id) {
            self.data.current_chat_id = self.data.threads.first().map(|t| t.id);
        }

        info!("Deleted chat {}", id);
        self.persist();
        true
    }

    pub fn clear_all_chats(&mut self) {
        self.data = ChatData::default();
        self.in_flight = None;
        self.error = None;
        info!("Cleared all chats");
        self.persist();
    }

    /// Give up on the outstanding request and drop its placeholder.
    ///
    /// Returns the aborted request id so the caller can cancel the network call.
    pub fn abort_current_request(&mut self) -> Option<Uuid> {
        let in_flight = self.in_flight.take()?;
        if let Some(thread) = self.data.thread_mut(in_flight.thread_id) {
            thread.remove_message(in_flight.placeholder_id);
        }

        info!("Aborted request {}", in_flight.request_id);
        self.persist();
        Some(in_flight.request_id)
    }

    fn insert_thread(&mut self) -> Uuid {
        let thread = ChatThread::new();
        let id = thread.id;
        self.data.threads.insert(0, thread);
        self.data.current_chat_id = Some(id);
        debug!("Created chat {}", id);
        id
    }

    fn begin_request(&mut self, thread_id: Uuid, text: &str) -> Option<PendingRequest> {
        let thread = self.data.thread_mut(thread_id)?;

        thread.messages.push(Message::user(text));
        let history = history_from(&thread.messages);
        let placeholder = Message::placeholder();
        let placeholder_id = placeholder.id;
        thread.messages.push(placeholder);
        thread.touch();

        let request_id = Uuid::new_v4();
        self.in_flight = Some(InFlight {
            request_id,
            thread_id,
            placeholder_id,
        });
        self.error = None;
        self.persist();

        debug!("Request {} queued with {} messages", request_id, history.len());
        Some(PendingRequest {
            request_id,
            thread_id,
            placeholder_id,
            history,
        })
    }

    fn persist(&mut self) {
        if let Err(e) = self.slot.save(&self.data) {
            warn!("Failed to save chats: {}", e);
            self.error = Some(e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::MemorySlots;

    fn manager() -> ChatSessionManager {
        ChatSessionManager::load(Arc::new(MemorySlots::new()))
    }

    #[test]
    fn test_blank_message_is_noop() {
        let mut manager = manager();
        assert!(manager.send_message("   \n").is_none());
        assert!(manager.threads().is_empty());
        assert!(!manager.is_loading());
    }

    #[test]
    fn test_send_creates_thread_and_placeholder() {
        let mut manager = manager();
        let pending = manager.send_message("  hello  ").unwrap();

        let thread = manager.current_chat().unwrap();
        assert_eq!(thread.id, pending.thread_id);
        assert_eq!(thread.messages.len(), 2);
        assert_eq!(thread.messages[0].content, "hello");
        assert!(thread.messages[1].is_loading);
        assert_eq!(pending.history, vec![ConversationMessage::user("hello")]);
        assert!(manager.is_loading());
    }

    #[test]
    fn test_second_send_is_rejected_while_loading() {
        let mut manager = manager();
        manager.send_message("one").unwrap();
        assert!(manager.send_message("two").is_none());
        assert_eq!(manager.current_chat().unwrap().messages.len(), 2);
    }

    #[test]
    fn test_title_set_after_first_exchange_only() {
        let mut manager = manager();
        let pending = manager.send_message("What is the weather like today?").unwrap();
        manager.complete_request(pending.request_id, Ok("Sunny".into()));
        assert_eq!(
            manager.current_chat().unwrap().title,
            "What is the weather like today..."
        );

        let pending = manager.send_message("And tomorrow?").unwrap();
        manager.complete_request(pending.request_id, Ok("Rain".into()));
        assert_eq!(
            manager.current_chat().unwrap().title,
            "What is the weather like today..."
        );
    }

    #[test]
    fn test_stale_completion_is_ignored() {
        let mut manager = manager();
        let pending = manager.send_message("hi").unwrap();

        assert!(!manager.complete_request(Uuid::new_v4(), Ok("nope".into())));
        assert!(manager.is_loading());
        assert!(manager.complete_request(pending.request_id, Ok("yes".into())));
        assert!(!manager.complete_request(pending.request_id, Ok("again".into())));
    }

    #[test]
    fn test_abort_error_is_not_surfaced() {
        let mut manager = manager();
        let pending = manager.send_message("hi").unwrap();
        manager.complete_request(pending.request_id, Err(MurmurError::Aborted));

        assert!(manager.error().is_none());
        assert_eq!(manager.current_chat().unwrap().messages.len(), 1);
    }

    #[test]
    fn test_rename_and_select() {
        let mut manager = manager();
        manager.create_new_chat(None);
        let first = manager.current_chat_id().unwrap();
        manager.create_new_chat(None);
        let second = manager.current_chat_id().unwrap();

        assert_eq!(manager.threads()[0].id, second);
        assert!(manager.set_current_chat(first));
        assert!(!manager.set_current_chat(Uuid::new_v4()));
        assert!(manager.rename_chat(first, "  Groceries "));
        assert!(!manager.rename_chat(first, "   "));
        assert_eq!(manager.current_chat().unwrap().title, "Groceries");
    }

    #[test]
    fn test_delete_active_selects_first_remaining() {
        let mut manager = manager();
        manager.create_new_chat(None);
        let older = manager.current_chat_id().unwrap();
        manager.create_new_chat(None);
        let newer = manager.current_chat_id().unwrap();

        assert!(manager.set_current_chat(older));
        assert!(manager.delete_chat(older));
        assert_eq!(manager.current_chat_id(), Some(newer));
    }

    #[test]
    fn test_load_drops_orphaned_placeholders() {
        let backend: Arc<dyn SlotBackend> = Arc::new(MemorySlots::new());
        {
            let mut manager = ChatSessionManager::load(Arc::clone(&backend));
            manager.send_message("interrupted").unwrap();
        }

        let manager = ChatSessionManager::load(backend);
        let thread = manager.current_chat().unwrap();
        assert_eq!(thread.messages.len(), 1);
        assert!(!manager.is_loading());
    }
}
