//! Intermediate reasoning events.

use serde::Serialize;

/// Something the agent did on its way to an answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ThoughtEvent {
    /// Text the model produced alongside tool calls.
    Thought { text: String },
    /// A tool is about to run.
    ToolStarted { tool: String, input: String },
    /// A tool returned.
    ToolFinished { tool: String, output: String },
    /// A tool failed or the call could not be parsed; the model sees the error.
    ToolFailed { tool: String, error: String },
}

impl std::fmt::Display for ThoughtEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ThoughtEvent::Thought { text } => write!(f, "{}", text),
            ThoughtEvent::ToolStarted { tool, input } => write!(f, "[{}] {}", tool, input),
            ThoughtEvent::ToolFinished { tool, output } => write!(f, "[{}] -> {}", tool, output),
            ThoughtEvent::ToolFailed { tool, error } => write!(f, "[{}] failed: {}", tool, error),
        }
    }
}

/// Receives thought events synchronously, on the calling task.
pub trait ThoughtObserver: Send {
    fn on_event(&mut self, event: &ThoughtEvent);
}

/// Observer that ignores everything.
#[derive(Debug, Default)]
pub struct NullObserver;

impl ThoughtObserver for NullObserver {
    fn on_event(&mut self, _event: &ThoughtEvent) {}
}

/// Observer that keeps every event, e.g. to return them from an HTTP handler.
#[derive(Debug, Default)]
pub struct CollectingObserver {
    pub events: Vec<ThoughtEvent>,
}

impl ThoughtObserver for CollectingObserver {
    fn on_event(&mut self, event: &ThoughtEvent) {
        self.events.push(event.clone());
    }
}

impl<F> ThoughtObserver for F
where
    F: FnMut(&ThoughtEvent) + Send,
{
    fn on_event(&mut self, event: &ThoughtEvent) {
        self(event)
    }
}
