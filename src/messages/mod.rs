pub mod storage;
pub mod types;

pub use storage::{FileSlots, MemorySlots, Slot, SlotBackend, CHATS_SLOT, SETTINGS_SLOT};
pub use types::{title_from_text, ChatData, ChatThread, Message, Role};
