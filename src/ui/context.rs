use crate::ui::terminal::{detect_capabilities, TerminalCapabilities};

/// Output settings shared by every renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UiContext {
    pub color: bool,
    pub unicode: bool,
    pub interactive: bool,
    pub verbose: bool,
}

impl UiContext {
    pub fn detect(verbose: bool) -> Self {
        Self::from_caps(detect_capabilities(), verbose)
    }

    pub(crate) fn from_caps(caps: TerminalCapabilities, verbose: bool) -> Self {
        Self {
            color: caps.supports_color,
            unicode: caps.supports_unicode,
            interactive: caps.stdin_tty && caps.stdout_tty && !caps.is_ci,
            verbose,
        }
    }

    /// No color, ASCII icons, never prompts
    pub fn plain() -> Self {
        Self {
            color: false,
            unicode: false,
            interactive: false,
            verbose: false,
        }
    }
}
