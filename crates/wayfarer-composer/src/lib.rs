//! Message/state composer (spec §4.H): the ordered conversation held with
//! the model — a system prompt assembled from the action registry, a task
//! message, and exactly one "current browser state" message replaced rather
//! than appended every step, with middle-history trimming to keep the
//! conversation bounded.

pub mod composer;
pub mod config;
pub mod message;
pub mod prompt;
pub mod state;

pub use composer::Composer;
pub use config::ComposerConfig;
pub use message::{Conversation, Message, Role};
pub use prompt::build_system_prompt;
pub use state::{format_state_message, BrowserStateView, PageStats, ScrollInfo};
