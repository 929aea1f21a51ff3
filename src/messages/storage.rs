//! Durable key-value slots for settings and chat history
//!
//! Each slot holds one JSON document. Slots are loaded independently at startup
//! and rewritten in full on every mutation.

use crate::{MurmurError, Result};
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Slot holding application settings and the AI provider config
pub const SETTINGS_SLOT: &str = "settings";

/// Slot holding all chat threads and the active thread id
pub const CHATS_SLOT: &str = "chats";

/// Raw storage for named slots
pub trait SlotBackend: Send + Sync {
    /// Read a slot, `None` if it was never written
    fn load(&self, key: &str) -> Result<Option<String>>;

    /// Replace the contents of a slot
    fn save(&self, key: &str, value: &str) -> Result<()>;

    /// Delete a slot
    fn remove(&self, key: &str) -> Result<()>;
}

/// Slots stored as `<dir>/<key>.json`
#[derive(Debug, Clone)]
pub struct FileSlots {
    dir: PathBuf,
}

impl FileSlots {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Slots in the platform data directory, e.g. `~/.local/share/murmur`
    pub fn in_data_dir() -> Result<Self> {
        let base = dirs::data_dir()
            .ok_or_else(|| MurmurError::Storage("no data directory on this platform".into()))?;
        Self::new(base.join("murmur"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl SlotBackend for FileSlots {
    fn load(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");

        // Write then rename so a crash never leaves a half-written slot
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(value.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &path)?;

        debug!("Saved slot {} ({} bytes)", key, value.len());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory slots, shared between clones
#[derive(Debug, Clone, Default)]
pub struct MemorySlots {
    slots: Arc<RwLock<HashMap<String, String>>>,
}

impl MemorySlots {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.slots.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.read().is_empty()
    }
}

impl SlotBackend for MemorySlots {
    fn load(&self, key: &str) -> Result<Option<String>> {
        Ok(self.slots.read().get(key).cloned())
    }

    fn save(&self, key: &str, value: &str) -> Result<()> {
        self.slots.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.slots.write().remove(key);
        Ok(())
    }
}

/// A typed view over one slot
pub struct Slot<T> {
    backend: Arc<dyn SlotBackend>,
    key: &'static str,
    _phantom: PhantomData<T>,
}

impl<T> Clone for Slot<T> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            key: self.key,
            _phantom: PhantomData,
        }
    }
}

impl<T> Slot<T>
where
    T: Serialize + DeserializeOwned + Default,
{
    pub fn new(backend: Arc<dyn SlotBackend>, key: &'static str) -> Self {
        Self {
            backend,
            key,
            _phantom: PhantomData,
        }
    }

    pub fn key(&self) -> &'static str {
        self.key
    }

    /// Load the stored value, propagating read and parse errors
    pub fn try_load(&self) -> Result<Option<T>> {
        match self.backend.load(self.key)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Load the stored value, falling back to the default when the slot is
    /// missing or unreadable
    pub fn load_or_default(&self) -> T {
        match self.try_load() {
            Ok(Some(value)) => value,
            Ok(None) => T::default(),
            Err(e) => {
                warn!("Slot {} could not be loaded, using defaults: {}", self.key, e);
                T::default()
            }
        }
    }

    pub fn save(&self, value: &T) -> Result<()> {
        let raw = serde_json::to_string_pretty(value)?;
        self.backend.save(self.key, &raw)
    }

    pub fn clear(&self) -> Result<()> {
        self.backend.remove(self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Counter {
        value: u32,
        label: String,
    }

    #[test]
    fn test_memory_slot_round_trip() {
        let backend: Arc<dyn SlotBackend> = Arc::new(MemorySlots::new());
        let slot: Slot<Counter> = Slot::new(backend, "counter");

        assert!(slot.try_load().unwrap().is_none());

        let value = Counter {
            value: 7,
            label: "seven".into(),
        };
        slot.save(&value).unwrap();
        assert_eq!(slot.load_or_default(), value);
    }

    #[test]
    fn test_file_slot_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let backend: Arc<dyn SlotBackend> = Arc::new(FileSlots::new(dir.path()).unwrap());
        let slot: Slot<Counter> = Slot::new(backend, "counter");

        slot.save(&Counter {
            value: 3,
            label: "three".into(),
        })
        .unwrap();

        assert!(dir.path().join("counter.json").exists());
        assert!(!dir.path().join("counter.json.tmp").exists());
        assert_eq!(slot.load_or_default().value, 3);
    }

    #[test]
    fn test_corrupt_slot_falls_back_to_default() {
        let backend = MemorySlots::new();
        backend.save("counter", "{ not json").unwrap();
        let slot: Slot<Counter> = Slot::new(Arc::new(backend), "counter");

        assert!(slot.try_load().is_err());
        assert_eq!(slot.load_or_default(), Counter::default());
    }

    #[test]
    fn test_clear_slot() {
        let backend = MemorySlots::new();
        let slot: Slot<Counter> = Slot::new(Arc::new(backend.clone()), "counter");
        slot.save(&Counter::default()).unwrap();
        assert_eq!(backend.len(), 1);

        slot.clear().unwrap();
        assert!(backend.is_empty());
    }
}
