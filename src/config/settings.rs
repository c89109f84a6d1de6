//! Configuration settings for Scout.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub llm: LlmSettings,
    pub agent: AgentSettings,
    pub tools: ToolSettings,
    pub fetch: FetchSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
        }
    }
}

/// Hosted LLM settings. Any OpenAI-compatible endpoint works; Groq is the default.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// Base URL of the OpenAI-compatible API.
    pub api_base: String,
    /// API key. Usually supplied via `GROQ_API_KEY` or `--api-key` instead.
    pub api_key: Option<String>,
    /// Model used by the chat agent.
    pub chat_model: String,
    /// Model used for summarization.
    pub summary_model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            api_base: "https://api.groq.com/openai/v1".to_string(),
            api_key: None,
            chat_model: "llama-3.1-8b-instant".to_string(),
            summary_model: "llama-3.1-8b-instant".to_string(),
            temperature: 0.7,
            timeout_secs: 300,
        }
    }
}

// Hand-written so the key never reaches logs.
impl std::fmt::Debug for LlmSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmSettings")
            .field("api_base", &self.api_base)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("chat_model", &self.chat_model)
            .field("summary_model", &self.summary_model)
            .field("temperature", &self.temperature)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Reasoning loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    /// Maximum LLM calls in one reasoning run.
    pub max_iterations: usize,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self { max_iterations: 15 }
    }
}

/// Result budget for a single retrieval tool.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolLimits {
    /// Number of upstream results to include.
    pub top_k_results: usize,
    /// Maximum characters of the formatted result.
    pub max_chars: usize,
}

/// Retrieval tool settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolSettings {
    pub search: ToolLimits,
    pub wikipedia: ToolLimits,
    pub arxiv: ToolLimits,
    /// Wikipedia language edition.
    pub wikipedia_lang: String,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            search: ToolLimits {
                top_k_results: 5,
                max_chars: 1000,
            },
            wikipedia: ToolLimits {
                top_k_results: 1,
                max_chars: 200,
            },
            arxiv: ToolLimits {
                top_k_results: 1,
                max_chars: 200,
            },
            wikipedia_lang: "en".to_string(),
        }
    }
}

/// Document fetching settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    /// User-Agent header sent with page and transcript requests.
    pub user_agent: String,
    /// Verify TLS certificates when loading pages.
    pub verify_tls: bool,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Preferred transcript language code.
    pub transcript_language: String,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 13_5_1) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/116.0.0.0 Safari/537.36"
                .to_string(),
            verify_tls: true,
            timeout_secs: 60,
            transcript_language: "en".to_string(),
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::ScoutError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("scout")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Resolve the API key, preferring an explicit override over the config file.
    ///
    /// Blank keys count as missing.
    pub fn api_key(&self, override_key: Option<&str>) -> Option<String> {
        fn non_blank(key: &str) -> Option<&str> {
            Some(key.trim()).filter(|k| !k.is_empty())
        }

        override_key
            .and_then(non_blank)
            .or_else(|| self.llm.api_key.as_deref().and_then(non_blank))
            .map(str::to_string)
    }

    /// Copy of the settings that is safe to print.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if copy.llm.api_key.is_some() {
            copy.llm.api_key = Some("<redacted>".to_string());
        }
        copy
    }
}
