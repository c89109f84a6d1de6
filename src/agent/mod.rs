//! Reasoning with tools.
//!
//! Provides an LLM agent that can call the retrieval tools (web search,
//! Wikipedia, Arxiv) zero or more times before answering, reporting each
//! step to a [`ThoughtObserver`].

mod events;
mod runner;

pub use events::{CollectingObserver, NullObserver, ThoughtEvent, ThoughtObserver};
pub use runner::{Agent, AgentResponse, ToolCallRecord};
