//! Persistence tests
//!
//! Settings and chat history written to real files in a temporary directory.

use murmur::integration::{
    AiConfigPatch, AppSettings, ChatSessionManager, IntegrationConfig, SettingsPatch, SettingsStore,
};
use murmur::llm::Provider;
use murmur::messages::{FileSlots, SlotBackend, CHATS_SLOT, SETTINGS_SLOT};
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

fn file_storage(dir: &TempDir) -> Arc<dyn SlotBackend> {
    Arc::new(FileSlots::new(dir.path()).unwrap())
}

#[test]
fn test_settings_round_trip() {
    let dir = TempDir::new().unwrap();
    {
        let mut store = SettingsStore::load(file_storage(&dir));
        store
            .update_settings(SettingsPatch {
                auto_play_voice: Some(false),
                voice_rate: Some(1.5),
                preferred_voice: Some(Some("Tingting".into())),
                ..Default::default()
            })
            .unwrap();
        store
            .update_ai_config(AiConfigPatch {
                provider: Some(Provider::OpenAi),
                api_key: Some(Some("sk-test".into())),
                model: Some("gpt-4o-mini".into()),
                ..Default::default()
            })
            .unwrap();
    }

    let store = SettingsStore::load(file_storage(&dir));
    assert!(!store.settings().auto_play_voice);
    assert_eq!(store.settings().voice_rate, 1.5);
    assert_eq!(store.settings().preferred_voice.as_deref(), Some("Tingting"));
    assert_eq!(store.ai_config().provider, Provider::OpenAi);
    assert_eq!(store.ai_config().credential(), Some("sk-test"));
    assert_eq!(store.ai_config().resolved_model(), "gpt-4o-mini");
}

#[test]
fn test_corrupt_settings_fall_back_to_defaults() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join(format!("{SETTINGS_SLOT}.json")), "{ not json").unwrap();

    let store = SettingsStore::load(file_storage(&dir));
    assert_eq!(store.settings(), &AppSettings::default());
}

#[test]
fn test_out_of_range_stored_values_are_clamped() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join(format!("{SETTINGS_SLOT}.json")),
        r#"{"settings": {"voice_rate": 9.0, "voice_volume": 3.0}}"#,
    )
    .unwrap();

    let store = SettingsStore::load(file_storage(&dir));
    assert_eq!(store.settings().voice_rate, 2.0);
    assert_eq!(store.settings().voice_volume, 1.0);
    assert!(store.settings().voice_enabled);
}

#[test]
fn test_corrupt_chats_start_empty() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join(format!("{CHATS_SLOT}.json")), "[1, 2").unwrap();

    let manager = ChatSessionManager::load(file_storage(&dir));
    assert!(manager.threads().is_empty());
    assert!(manager.current_chat_id().is_none());
}

#[test]
fn test_deleting_only_thread_persists_empty_state() {
    let dir = TempDir::new().unwrap();
    {
        let mut manager = ChatSessionManager::load(file_storage(&dir));
        let pending = manager.create_new_chat(Some("only one")).unwrap();
        manager.complete_request(pending.request_id, Ok("reply".into()));
        assert!(manager.delete_chat(pending.thread_id));
        assert!(manager.current_chat_id().is_none());
    }

    let manager = ChatSessionManager::load(file_storage(&dir));
    assert!(manager.threads().is_empty());
    assert!(manager.current_chat_id().is_none());
}

#[test]
fn test_new_threads_are_listed_first() {
    let dir = TempDir::new().unwrap();
    let (older, newer) = {
        let mut manager = ChatSessionManager::load(file_storage(&dir));
        manager.create_new_chat(None);
        let older = manager.current_chat_id().unwrap();
        manager.create_new_chat(None);
        let newer = manager.current_chat_id().unwrap();
        (older, newer)
    };

    let manager = ChatSessionManager::load(file_storage(&dir));
    let ids: Vec<_> = manager.threads().iter().map(|t| t.id).collect();
    assert_eq!(ids, [newer, older]);
    assert_eq!(manager.current_chat_id(), Some(newer));
}

#[test]
fn test_open_storage_uses_configured_dir() {
    let dir = TempDir::new().unwrap();
    let config = IntegrationConfig::default().with_data_dir(dir.path().join("data"));

    let slots = config.open_storage().unwrap();
    assert_eq!(slots.dir(), dir.path().join("data"));
    assert!(slots.dir().is_dir());

    slots.save("scratch", "{}").unwrap();
    assert!(!dir.path().join("data/scratch.json.tmp").exists());
    assert_eq!(slots.load("scratch").unwrap().as_deref(), Some("{}"));
}
