//! Agent runner with tool calling loop.

use super::events::{ThoughtEvent, ThoughtObserver};
use crate::error::{Result, ScoutError};
use crate::llm::{LlmBackend, LlmMessage, ToolInvocation};
use crate::tools::{parse_tool_call, ToolSet};
use std::sync::Arc;
use tracing::{debug, info};

/// Agent that answers by calling retrieval tools until it has enough to reply.
pub struct Agent {
    backend: Arc<dyn LlmBackend>,
    tools: ToolSet,
    max_iterations: usize,
    system_prompt: String,
}

impl Agent {
    /// Create a new agent over the given backend and tools.
    pub fn new(backend: Arc<dyn LlmBackend>, tools: ToolSet, system_prompt: &str) -> Self {
        Self {
            backend,
            tools,
            max_iterations: 15,
            system_prompt: system_prompt.to_string(),
        }
    }

    /// Set maximum iterations for the agent loop.
    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    /// Run the agent over a serialized conversation.
    ///
    /// Tool failures and unparseable tool calls are reported back to the
    /// model so it can recover; backend failures abort the run.
    pub async fn run(
        &self,
        context: &str,
        observer: &mut dyn ThoughtObserver,
    ) -> Result<AgentResponse> {
        let mut messages = vec![
            LlmMessage::system(self.system_prompt.clone()),
            LlmMessage::user(context),
        ];
        let specs = self.tools.specs();

        let mut iterations = 0;
        let mut tool_calls_made = Vec::new();

        loop {
            iterations += 1;
            if iterations > self.max_iterations {
                return Err(ScoutError::Agent(format!(
                    "Agent exceeded maximum iterations ({})",
                    self.max_iterations
                )));
            }

            debug!("Agent iteration {}", iterations);

            let reply = self.backend.chat(&messages, &specs).await?;

            if !reply.wants_tools() {
                let content = reply.content.unwrap_or_default();
                if content.trim().is_empty() {
                    return Err(ScoutError::Agent("Model returned an empty answer".to_string()));
                }
                return Ok(AgentResponse {
                    content,
                    tool_calls: tool_calls_made,
                    iterations,
                });
            }

            if let Some(text) = reply.content.as_deref().filter(|t| !t.trim().is_empty()) {
                observer.on_event(&ThoughtEvent::Thought {
                    text: text.to_string(),
                });
            }

            messages.push(LlmMessage::Assistant {
                content: reply.content.clone(),
                tool_calls: reply.tool_calls.clone(),
            });

            for call in &reply.tool_calls {
                let record = self.execute_tool_call(call, observer).await;

                messages.push(LlmMessage::Tool {
                    call_id: call.id.clone(),
                    content: record.result.clone(),
                });

                tool_calls_made.push(record);
            }
        }
    }

    /// Execute a single tool call and return a record of it.
    async fn execute_tool_call(
        &self,
        call: &ToolInvocation,
        observer: &mut dyn ThoughtObserver,
    ) -> ToolCallRecord {
        info!("Agent calling tool: {} with args: {}", call.name, call.arguments);

        let result = match parse_tool_call(&call.name, &call.arguments) {
            Ok((kind, query)) => {
                observer.on_event(&ThoughtEvent::ToolStarted {
                    tool: kind.name().to_string(),
                    input: query.clone(),
                });

                match self.tools.run(kind, &query).await {
                    Ok(output) => {
                        observer.on_event(&ThoughtEvent::ToolFinished {
                            tool: kind.name().to_string(),
                            output: output.result_text.clone(),
                        });
                        output.result_text
                    }
                    Err(e) => {
                        observer.on_event(&ThoughtEvent::ToolFailed {
                            tool: kind.name().to_string(),
                            error: e.to_string(),
                        });
                        format!("Tool error: {}", e)
                    }
                }
            }
            Err(e) => {
                observer.on_event(&ThoughtEvent::ToolFailed {
                    tool: call.name.clone(),
                    error: e.to_string(),
                });
                format!("Failed to parse tool call: {}", e)
            }
        };

        ToolCallRecord {
            name: call.name.clone(),
            arguments: call.arguments.clone(),
            result,
        }
    }
}

/// Response from an agent run.
#[derive(Debug)]
pub struct AgentResponse {
    /// The final response content from the agent.
    pub content: String,
    /// Record of all tool calls made during execution.
    pub tool_calls: Vec<ToolCallRecord>,
    /// Number of iterations (LLM calls) used.
    pub iterations: usize,
}

/// Record of a tool call made by the agent.
#[derive(Debug, Clone)]
pub struct ToolCallRecord {
    /// Name of the tool called.
    pub name: String,
    /// JSON arguments passed to the tool.
    pub arguments: String,
    /// Result returned by the tool.
    pub result: String,
}

impl std::fmt::Display for ToolCallRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.name, self.arguments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::events::CollectingObserver;
    use crate::llm::testing::ScriptedBackend;
    use crate::llm::LlmReply;
    use crate::tools::testing::FakeTool;
    use crate::tools::ToolKind;

    fn tool_call(id: &str, name: &str, arguments: &str) -> LlmReply {
        LlmReply {
            content: None,
            tool_calls: vec![ToolInvocation {
                id: id.to_string(),
                name: name.to_string(),
                arguments: arguments.to_string(),
            }],
        }
    }

    #[test]
    fn test_tool_call_record_display() {
        let record = ToolCallRecord {
            name: "search".to_string(),
            arguments: r#"{"query": "test"}"#.to_string(),
            result: "Found results".to_string(),
        };
        assert_eq!(format!("{}", record), r#"search({"query": "test"})"#);
    }

    #[tokio::test]
    async fn test_direct_answer_without_tools() {
        let backend = ScriptedBackend::new(vec![Ok(LlmReply::text("Paris."))]);
        let agent = Agent::new(backend.clone(), ToolSet::new(), "system");

        let mut observer = CollectingObserver::default();
        let response = agent.run("user: capital of France?", &mut observer).await.unwrap();

        assert_eq!(response.content, "Paris.");
        assert_eq!(response.iterations, 1);
        assert!(observer.events.is_empty());
        assert_eq!(backend.chat_calls(), 1);
    }

    #[tokio::test]
    async fn test_tool_loop_feeds_results_back() {
        let wiki = FakeTool::ok(ToolKind::Wikipedia, "Page: Paris\nSummary: Capital of France.");
        let tools = ToolSet::new().with_tool(wiki.clone());
        let backend = ScriptedBackend::new(vec![
            Ok(tool_call("call_1", "wikipedia", r#"{"query": "Paris"}"#)),
            Ok(LlmReply::text("Paris is the capital of France.")),
        ]);
        let agent = Agent::new(backend.clone(), tools, "system");

        let mut observer = CollectingObserver::default();
        let response = agent.run("user: capital of France?", &mut observer).await.unwrap();

        assert_eq!(response.content, "Paris is the capital of France.");
        assert_eq!(response.tool_calls.len(), 1);
        assert_eq!(wiki.call_count(), 1);
        assert_eq!(
            observer.events,
            vec![
                ThoughtEvent::ToolStarted {
                    tool: "wikipedia".to_string(),
                    input: "Paris".to_string()
                },
                ThoughtEvent::ToolFinished {
                    tool: "wikipedia".to_string(),
                    output: "Page: Paris\nSummary: Capital of France.".to_string()
                },
            ]
        );

        // Second request carries the assistant tool call and the tool result
        let seen = backend.last_messages();
        assert_eq!(seen.len(), 4);
        assert_eq!(
            seen[3],
            LlmMessage::Tool {
                call_id: "call_1".to_string(),
                content: "Page: Paris\nSummary: Capital of France.".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_tool_failure_is_reported_to_model() {
        let tools = ToolSet::new().with_tool(FakeTool::failing(ToolKind::Search, "rate limited"));
        let backend = ScriptedBackend::new(vec![
            Ok(tool_call("c1", "search", r#"{"query": "news"}"#)),
            Ok(tool_call("c2", "calculator", r#"{"query": "1+1"}"#)),
            Ok(LlmReply::text("Sorry, search is unavailable.")),
        ]);
        let agent = Agent::new(backend.clone(), tools, "system");

        let mut observer = CollectingObserver::default();
        let response = agent.run("user: news?", &mut observer).await.unwrap();

        assert_eq!(response.content, "Sorry, search is unavailable.");
        assert!(response.tool_calls[0].result.starts_with("Tool error:"));
        assert!(response.tool_calls[1].result.starts_with("Failed to parse tool call:"));
        assert!(matches!(observer.events[1], ThoughtEvent::ToolFailed { .. }));
    }

    #[tokio::test]
    async fn test_max_iterations() {
        let tools = ToolSet::new().with_tool(FakeTool::ok(ToolKind::Search, "more"));
        let backend = ScriptedBackend::repeating(tool_call("c", "search", r#"{"query": "loop"}"#));
        let agent = Agent::new(backend, tools, "system").with_max_iterations(3);

        let err = agent.run("user: loop", &mut CollectingObserver::default()).await.unwrap_err();
        assert!(err.to_string().contains("maximum iterations (3)"));
    }

    #[tokio::test]
    async fn test_backend_error_propagates() {
        let backend = ScriptedBackend::new(vec![Err("503 Service Unavailable".to_string())]);
        let agent = Agent::new(backend, ToolSet::new(), "system");

        let err = agent.run("user: hi", &mut CollectingObserver::default()).await.unwrap_err();
        assert!(err.to_string().contains("503"));
    }
}
