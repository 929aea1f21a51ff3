//! UI Components for Murmur
//!
//! Each component borrows the [`AppState`](crate::ui::AppState) for one frame
//! and applies user actions to it after rendering.

mod input_bar;
mod message_list;
mod settings_panel;
mod thread_list;

pub use input_bar::InputBar;
pub use message_list::MessageList;
pub use settings_panel::SettingsPanel;
pub use thread_list::ThreadList;
