//! Interactive stage prompt

use std::io;

use dialoguer::Input;

use crate::application::stage::StagePrompt;
use crate::ui::context::UiContext;
use crate::ui::theme::prompt_theme;

#[derive(Debug, Clone, Copy)]
pub struct TerminalPrompt {
    ui: UiContext,
}

impl TerminalPrompt {
    pub fn new(ui: UiContext) -> Self {
        Self { ui }
    }
}

impl StagePrompt for TerminalPrompt {
    fn is_interactive(&self) -> bool {
        self.ui.interactive
    }

    fn ask(&mut self, message: &str) -> io::Result<String> {
        let theme = prompt_theme(self.ui.color);
        Input::<String>::with_theme(theme.as_ref())
            .with_prompt(message)
            .interact_text()
            .map_err(io::Error::other)
    }
}
