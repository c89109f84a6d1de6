//! CLI output formatting utilities.

use crate::agent::ThoughtEvent;
use crate::text::truncate_chars;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Longest tool output echoed to the terminal.
const PREVIEW_CHARS: usize = 160;

/// Output helper for CLI formatting.
pub struct Output;

impl Output {
    /// Print an info message.
    pub fn info(msg: &str) {
        println!("{} {}", style(">>").cyan().bold(), msg);
    }

    /// Print a success message.
    pub fn success(msg: &str) {
        println!("{} {}", style(">>").green().bold(), msg);
    }

    /// Print a warning message.
    pub fn warning(msg: &str) {
        eprintln!("{} {}", style(">>").yellow().bold(), msg);
    }

    /// Print an error message.
    pub fn error(msg: &str) {
        eprintln!("{} {}", style(">>").red().bold(), msg);
    }

    /// Print a header.
    pub fn header(msg: &str) {
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Print a key-value pair.
    pub fn kv(key: &str, value: &str) {
        println!("  {}: {}", style(key).dim(), value);
    }

    /// Print an intermediate reasoning step, dimmed.
    pub fn thought(event: &ThoughtEvent) {
        let line = match event {
            ThoughtEvent::Thought { text } => format!("  {}", text.trim()),
            ThoughtEvent::ToolStarted { tool, input } => format!("  [{}] {}", tool, input),
            ThoughtEvent::ToolFinished { tool, output } => format!(
                "  [{}] {}",
                tool,
                content_preview(output, PREVIEW_CHARS)
            ),
            ThoughtEvent::ToolFailed { tool, error } => {
                format!("  [{}] {} {}", tool, style("✗").red(), error)
            }
        };
        println!("{}", style(line).dim());
    }

    /// Create a spinner.
    pub fn spinner(msg: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        if let Ok(spinner_style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            pb.set_style(spinner_style);
        }
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }
}

/// Single-line preview with ellipsis.
fn content_preview(content: &str, max_chars: usize) -> String {
    let content = content.replace('\n', " ");
    if content.chars().count() <= max_chars {
        content
    } else {
        format!("{}...", truncate_chars(&content, max_chars))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_preview() {
        assert_eq!(content_preview("short\ntext", 20), "short text");
        assert_eq!(content_preview("äöüäöü", 3), "äöü...");
    }
}
