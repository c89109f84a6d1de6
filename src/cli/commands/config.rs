//! Config command implementation.

use crate::cli::{ConfigAction, Output};
use crate::config::Settings;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Run the config command against `config_path` (or the default location).
pub fn run_config(action: &ConfigAction, config_path: Option<PathBuf>, settings: Settings) -> Result<()> {
    let path = config_path.unwrap_or_else(Settings::default_config_path);

    match action {
        ConfigAction::Show => println!("{}", render_redacted(&settings)?),
        ConfigAction::Path => println!("{}", path.display()),
        ConfigAction::Edit => {
            if !path.exists() {
                settings.save_to(&path)?;
                Output::info(&format!("Wrote defaults to {}", path.display()));
            }
            edit(&path);
        }
    }

    Ok(())
}

/// Settings as TOML with the API key masked.
fn render_redacted(settings: &Settings) -> Result<String> {
    toml::to_string_pretty(&settings.redacted()).context("Failed to serialize config")
}

fn edit(path: &Path) {
    let editor = std::env::var("EDITOR")
        .or_else(|_| std::env::var("VISUAL"))
        .unwrap_or_else(|_| "vi".to_string());

    Output::info(&format!("Opening {} in {}...", path.display(), editor));

    match std::process::Command::new(&editor).arg(path).status() {
        Ok(status) if status.success() => Output::success("Config saved."),
        Ok(status) => Output::warning(&format!("{} exited with {}", editor, status)),
        Err(e) => {
            Output::error(&format!("Could not start {}: {}", editor, e));
            Output::kv("Config file", &path.display().to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_show_never_prints_the_key() {
        let mut settings = Settings::default();
        settings.llm.api_key = Some("gsk_secret".to_string());

        let rendered = render_redacted(&settings).unwrap();
        assert!(!rendered.contains("gsk_secret"));
        assert!(rendered.contains("<redacted>"));
        assert!(rendered.contains("[llm]"));
    }
}
