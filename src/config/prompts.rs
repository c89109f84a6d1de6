//! Prompt templates for Scout.
//!
//! Prompts can be customized by placing TOML files in the custom prompts directory.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Prompts {
    pub chat: ChatPrompts,
    pub summarize: SummarizePrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: HashMap<String, String>,
}

/// Prompts for the search agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatPrompts {
    pub system: String,
    /// First assistant message of every session.
    pub greeting: String,
}

impl Default for ChatPrompts {
    fn default() -> Self {
        Self {
            system: r#"You are a helpful assistant that can search the web.

You receive the conversation so far as lines of the form "role: content".
Answer the last user message.

Tools:
- 'search' for current events and general web questions
- 'wikipedia' for people, places, companies, history and other encyclopedic facts
- 'arxiv' for questions about scientific papers in physics, mathematics, computer science and related fields

Think step-by-step about what information you need, then use the appropriate tools.
Call a tool only when you need information you do not already have.
When you have enough information, reply with the final answer only."#
                .to_string(),
            greeting: "Hi, I'm a chatbot who can search the web. How can I help you?".to_string(),
        }
    }
}

/// Prompt for content summarization.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummarizePrompts {
    pub template: String,
}

impl Default for SummarizePrompts {
    fn default() -> Self {
        Self {
            template: "Provide a summary of the following content in 300 words:\nContent:{{text}}"
                .to_string(),
        }
    }
}

fn placeholder_regex() -> &'static regex::Regex {
    static RE: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| regex::Regex::new(r"\{\{(\w+)\}\}").expect("Invalid regex"))
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = crate::config::Settings::expand_path(dir);

            let chat_path = custom_path.join("chat.toml");
            if chat_path.exists() {
                let content = std::fs::read_to_string(&chat_path)?;
                prompts.chat = toml::from_str(&content)?;
            }

            let summarize_path = custom_path.join("summarize.toml");
            if summarize_path.exists() {
                let content = std::fs::read_to_string(&summarize_path)?;
                prompts.summarize = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Load prompts as configured in the settings.
    pub fn from_settings(settings: &crate::config::Settings) -> crate::error::Result<Self> {
        Self::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )
    }

    /// Render a prompt template with the given variables.
    ///
    /// Placeholders are filled in one pass; substituted values are never
    /// scanned for further placeholders. Unknown placeholders are left as is.
    pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
        placeholder_regex()
            .replace_all(template, |caps: &regex::Captures| {
                vars.get(&caps[1])
                    .cloned()
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(&self, template: &str, vars: &HashMap<String, String>) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_prompts() {
        let prompts = Prompts::default();
        assert!(!prompts.chat.system.is_empty());
        assert!(prompts.summarize.template.contains("{{text}}"));
        assert!(prompts.chat.greeting.contains("How can I help you?"));
    }

    #[test]
    fn test_render_template() {
        let template = "Hello {{name}}, you have {{count}} messages.";
        let mut vars = HashMap::new();
        vars.insert("name".to_string(), "Alice".to_string());
        vars.insert("count".to_string(), "5".to_string());

        let result = Prompts::render(template, &vars);
        assert_eq!(result, "Hello Alice, you have 5 messages.");
    }

    #[test]
    fn test_provided_vars_override_custom() {
        let mut prompts = Prompts::default();
        prompts.variables.insert("text".to_string(), "from config".to_string());
        prompts.variables.insert("audience".to_string(), "engineers".to_string());

        let mut vars = HashMap::new();
        vars.insert("text".to_string(), "from caller".to_string());

        let out = prompts.render_with_custom("{{text}} for {{audience}}", &vars);
        assert_eq!(out, "from caller for engineers");
    }

    #[test]
    fn test_substituted_content_is_not_a_template() {
        let mut prompts = Prompts::default();
        prompts.variables.insert("audience".to_string(), "engineers".to_string());

        let mut vars = HashMap::new();
        vars.insert(
            "text".to_string(),
            "Write {{audience}} and {{unknown}} literally.".to_string(),
        );

        let out = prompts.render_with_custom("For {{audience}}: {{text}} {{missing}}", &vars);
        assert_eq!(
            out,
            "For engineers: Write {{audience}} and {{unknown}} literally. {{missing}}"
        );
    }

    #[test]
    fn test_load_custom_summarize_prompt() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("summarize.toml"),
            "template = \"TL;DR: {{text}}\"\n",
        )
        .unwrap();

        let prompts = Prompts::load(dir.path().to_str(), None).unwrap();
        assert_eq!(prompts.summarize.template, "TL;DR: {{text}}");
        assert!(prompts.chat.system.contains("search"));
    }
}
