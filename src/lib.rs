//! Scout - web-search chatbot and content summarizer
//!
//! A CLI and HTTP service that answers questions with help from web search,
//! Wikipedia and arXiv, and summarizes YouTube videos and web pages.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Configuration and prompt templates
//! - `llm` - Hosted model access (any OpenAI-compatible API, Groq by default)
//! - `tools` - Retrieval tools: web search, Wikipedia, arXiv
//! - `agent` - Tool-calling reasoning loop
//! - `chat` - Session transcript and per-turn routing
//! - `fetch` - YouTube transcripts and web page text
//! - `summarize` - Single-call summarization of fetched content
//!
//! # Example
//!
//! ```rust,no_run
//! use scout::agent::NullObserver;
//! use scout::chat::{Session, TurnRouter};
//! use scout::config::{Prompts, Settings};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let prompts = Prompts::from_settings(&settings)?;
//!     let router = TurnRouter::from_settings(&settings, &prompts, "gsk_...", None)?;
//!
//!     let mut session = Session::new(&prompts.chat.greeting);
//!     let outcome = router
//!         .handle_turn(&mut session, "Who proposed the Turing test?", &mut NullObserver)
//!         .await;
//!     println!("{}", outcome.response);
//!
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod chat;
pub mod cli;
pub mod config;
pub mod error;
pub mod fetch;
pub mod llm;
pub mod summarize;
pub mod text;
pub mod tools;

pub use error::{Result, ScoutError};
