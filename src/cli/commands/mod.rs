//! CLI command implementations.

mod chat;
mod config;
mod serve;
mod summarize;

pub use chat::run_chat;
pub use config::run_config;
pub use serve::run_serve;
pub use summarize::run_summarize;
