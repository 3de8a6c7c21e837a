pub mod backend;
pub mod config;
pub mod controller;
pub mod logging;
pub mod quick_actions;
pub mod state;
pub mod store;
pub mod testing;
pub mod theme;

// Re-export main types for convenience
pub use backend::{BackendError, ChatBackend, ChatReply, ChatRequest, RafikiClient};
pub use config::Config;
pub use controller::{ConversationController, Outcome, PendingReply, Phase, SubmitError};
pub use quick_actions::{QuickAction, QUICK_ACTIONS};
pub use state::{ChatRole, Turn, TurnLog};
pub use store::{FileStore, MemoryStore, PreferenceStore};
pub use theme::{Palette, Theme};
