//! Configuration module for Scout.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{ChatPrompts, Prompts, SummarizePrompts};
pub use settings::{
    AgentSettings, FetchSettings, GeneralSettings, LlmSettings, PromptSettings, Settings,
    ToolLimits, ToolSettings,
};
