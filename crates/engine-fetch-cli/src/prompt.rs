//! Interactive keep-archive question.

use dialoguer::Input;
use std::path::Path;

use engine_fetch::{InstallError, RetentionPrompt};

/// Asks on the terminal; answers with an empty string when stdin is not a TTY
pub struct TerminalPrompt {
    interactive: bool,
}

impl TerminalPrompt {
    pub fn new() -> Self {
        Self {
            interactive: console::user_attended(),
        }
    }
}

impl RetentionPrompt for TerminalPrompt {
    fn ask_keep(&self, archive: &Path) -> engine_fetch::Result<String> {
        if !self.interactive {
            return Ok(String::new());
        }

        let name = archive
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| archive.display().to_string());

        Input::<String>::new()
            .with_prompt(format!(
                "==> Would you like to save '{}'? So you don't have to download it later. [Yes/no]",
                name
            ))
            .allow_empty(true)
            .interact_text()
            .map_err(|e| InstallError::Prompt(e.to_string()))
    }
}
