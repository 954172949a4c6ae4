//! Terminal output: capability detection, theme, renderers and prompts

pub mod context;
pub mod error;
pub mod icon;
pub mod progress;
pub mod prompt;
pub mod terminal;
pub mod theme;

pub use context::UiContext;
pub use error::format_error;
pub use progress::{format_event, spawn_renderer};
pub use prompt::TerminalPrompt;
