//! Per-turn routing between a direct paper lookup and the search agent.

use super::session::Session;
use crate::agent::{Agent, ThoughtObserver};
use crate::config::{Prompts, Settings};
use crate::error::Result;
use crate::llm::OpenAiBackend;
use crate::tools::{ToolKind, ToolSet};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Messages containing this (case-insensitive) go straight to the arxiv tool.
pub const ARXIV_MARKER: &str = "arxiv:";

/// Prefix of the assistant message that replaces a failed turn.
pub const ERROR_PREFIX: &str = "❌ Error: ";

/// How one turn will be handled.
#[derive(Debug, Clone, PartialEq)]
pub enum RoutingDecision {
    /// Run a single tool; its output is the answer.
    DirectTool { tool: ToolKind, query: String },
    /// Hand the whole conversation to the agent.
    DelegatedReasoning { context: String },
}

impl RoutingDecision {
    pub fn route(&self) -> Route {
        match self {
            RoutingDecision::DirectTool { tool, .. } => Route::DirectTool(*tool),
            RoutingDecision::DelegatedReasoning { .. } => Route::DelegatedReasoning,
        }
    }
}

/// The path a turn took, without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    DirectTool(ToolKind),
    DelegatedReasoning,
}

/// Decide how to handle `message`.
///
/// `session` must already contain `message` as its last entry; the agent
/// receives the full transcript, not just the latest message.
pub fn classify(message: &str, session: &Session) -> RoutingDecision {
    if message.to_lowercase().contains(ARXIV_MARKER) {
        RoutingDecision::DirectTool {
            tool: ToolKind::Arxiv,
            query: message.to_string(),
        }
    } else {
        RoutingDecision::DelegatedReasoning {
            context: session.transcript(),
        }
    }
}

/// Result of one completed turn.
#[derive(Debug, Clone, Serialize)]
pub struct TurnOutcome {
    pub route: Route,
    /// The assistant message appended to the session.
    pub response: String,
    /// Whether the response is an error message.
    pub failed: bool,
}

/// Handles chat turns against a session.
pub struct TurnRouter {
    tools: ToolSet,
    agent: Agent,
}

impl TurnRouter {
    pub fn new(tools: ToolSet, agent: Agent) -> Self {
        Self { tools, agent }
    }

    /// Wire up the hosted model, the standard tools and the agent.
    pub fn from_settings(
        settings: &Settings,
        prompts: &Prompts,
        api_key: &str,
        model: Option<&str>,
    ) -> Result<Self> {
        let model = model.unwrap_or(&settings.llm.chat_model);
        let backend = Arc::new(OpenAiBackend::new(api_key, &settings.llm, model)?);
        let tools = ToolSet::from_settings(settings)?;
        let agent = Agent::new(backend, tools.clone(), &prompts.chat.system)
            .with_max_iterations(settings.agent.max_iterations);

        Ok(Self::new(tools, agent))
    }

    /// Run one turn: record the user message, answer it, record the answer.
    ///
    /// Never fails. Any error becomes an assistant message starting with
    /// [`ERROR_PREFIX`], so the session always gains exactly one user and one
    /// assistant message. Both are committed together once the turn has an
    /// answer; a turn dropped mid-flight leaves the session unchanged.
    #[instrument(skip(self, session, observer), fields(session_len = session.len()))]
    pub async fn handle_turn(
        &self,
        session: &mut Session,
        input: &str,
        observer: &mut dyn ThoughtObserver,
    ) -> TurnOutcome {
        let mut staged = session.clone();
        staged.push_user(input);

        let decision = classify(input, &staged);
        let route = decision.route();
        debug!(?route, "Turn classified");

        let (response, failed) = match self.execute(decision, observer).await {
            Ok(text) => (text, false),
            Err(e) => {
                warn!("Turn failed: {}", e);
                (format!("{}{}", ERROR_PREFIX, e), true)
            }
        };

        staged.push_assistant(&response);
        *session = staged;
        info!(?route, failed, "Turn completed");

        TurnOutcome {
            route,
            response,
            failed,
        }
    }

    async fn execute(
        &self,
        decision: RoutingDecision,
        observer: &mut dyn ThoughtObserver,
    ) -> Result<String> {
        debug!("Executing turn");
        match decision {
            RoutingDecision::DirectTool { tool, query } => {
                Ok(self.tools.run(tool, &query).await?.result_text)
            }
            RoutingDecision::DelegatedReasoning { context } => {
                Ok(self.agent.run(&context, observer).await?.content)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{CollectingObserver, NullObserver};
    use crate::chat::Role;
    use crate::llm::testing::ScriptedBackend;
    use crate::llm::{LlmMessage, LlmReply};
    use crate::tools::testing::FakeTool;

    fn session_with(message: &str) -> Session {
        let mut session = Session::new("how can I help you?");
        session.push_user(message);
        session
    }

    fn router(backend: Arc<ScriptedBackend>, tools: ToolSet) -> TurnRouter {
        let agent = Agent::new(backend, tools.clone(), "system");
        TurnRouter::new(tools, agent)
    }

    #[test]
    fn test_arxiv_marker_routes_to_tool() {
        let message = "arxiv: 1706.03762";
        let decision = classify(message, &session_with(message));
        assert_eq!(
            decision,
            RoutingDecision::DirectTool {
                tool: ToolKind::Arxiv,
                query: "arxiv: 1706.03762".to_string()
            }
        );
    }

    #[test]
    fn test_marker_is_case_insensitive_and_anywhere() {
        for message in ["ArXiv: attention", "please look up ARXIV:2310.06825", "x arxiv:y"] {
            assert_eq!(
                classify(message, &session_with(message)).route(),
                Route::DirectTool(ToolKind::Arxiv),
                "{}",
                message
            );
        }
    }

    #[test]
    fn test_other_messages_delegate_with_full_transcript() {
        let message = "what is the capital of France";
        let decision = classify(message, &session_with(message));
        assert_eq!(
            decision,
            RoutingDecision::DelegatedReasoning {
                context: "assistant: how can I help you?\nuser: what is the capital of France"
                    .to_string()
            }
        );

        // Mentioning arxiv without the colon is not the marker
        let message = "what is arxiv";
        assert_eq!(
            classify(message, &session_with(message)).route(),
            Route::DelegatedReasoning
        );
    }

    #[tokio::test]
    async fn test_direct_tool_response_is_verbatim() {
        let arxiv = FakeTool::ok(ToolKind::Arxiv, "Published: 2017-06-12\nTitle: Attention Is All You Need");
        let backend = ScriptedBackend::new(vec![]);
        let router = router(backend.clone(), ToolSet::new().with_tool(arxiv.clone()));

        let mut session = Session::default();
        let outcome = router
            .handle_turn(&mut session, "arxiv: 1706.03762", &mut NullObserver)
            .await;

        assert_eq!(outcome.route, Route::DirectTool(ToolKind::Arxiv));
        assert!(!outcome.failed);
        assert_eq!(session.last().unwrap().content, "Published: 2017-06-12\nTitle: Attention Is All You Need");
        assert_eq!(arxiv.call_count(), 1);
        assert_eq!(backend.chat_calls(), 0);
    }

    #[tokio::test]
    async fn test_delegated_turn_sends_transcript_to_agent() {
        let backend = ScriptedBackend::new(vec![
            Ok(LlmReply::text("Paris.")),
            Ok(LlmReply::text("About 2.1 million.")),
        ]);
        let router = router(backend.clone(), ToolSet::new());

        let mut session = Session::new("how can I help you?");
        router
            .handle_turn(&mut session, "capital of France?", &mut NullObserver)
            .await;
        router
            .handle_turn(&mut session, "population?", &mut NullObserver)
            .await;

        let sent = backend.last_messages();
        assert_eq!(
            sent[1],
            LlmMessage::user(
                "assistant: how can I help you?\nuser: capital of France?\nassistant: Paris.\nuser: population?"
            )
        );
        assert_eq!(session.last().unwrap().content, "About 2.1 million.");
    }

    #[tokio::test]
    async fn test_session_grows_by_two_per_turn_and_alternates() {
        let backend = ScriptedBackend::repeating(LlmReply::text("ok"));
        let tools = ToolSet::new().with_tool(FakeTool::failing(ToolKind::Arxiv, "down"));
        let router = router(backend, tools);

        let mut session = Session::default();
        let inputs = ["hello", "arxiv: 1234.5678", "thanks"];
        for input in inputs {
            router.handle_turn(&mut session, input, &mut NullObserver).await;
        }

        assert_eq!(session.len(), 1 + 2 * inputs.len());
        for (i, message) in session.messages().iter().enumerate() {
            let expected = if i % 2 == 0 { Role::Assistant } else { Role::User };
            assert_eq!(message.role, expected, "message {}", i);
        }
    }

    #[tokio::test]
    async fn test_tool_failure_becomes_error_message() {
        let tools = ToolSet::new().with_tool(FakeTool::failing(ToolKind::Arxiv, "connection reset"));
        let router = router(ScriptedBackend::new(vec![]), tools);

        let mut session = Session::default();
        let outcome = router
            .handle_turn(&mut session, "arxiv: 1706.03762", &mut NullObserver)
            .await;

        assert!(outcome.failed);
        assert_eq!(session.len(), 3);
        let last = session.last().unwrap();
        assert_eq!(last.role, Role::Assistant);
        assert!(last.content.starts_with(ERROR_PREFIX));
        assert!(last.content.contains("connection reset"));
    }

    #[tokio::test]
    async fn test_backend_failure_becomes_error_message() {
        let backend = ScriptedBackend::new(vec![Err("invalid api key".to_string())]);
        let router = router(backend, ToolSet::new());

        let mut session = Session::default();
        let mut observer = CollectingObserver::default();
        let outcome = router.handle_turn(&mut session, "hi", &mut observer).await;

        assert_eq!(outcome.route, Route::DelegatedReasoning);
        assert!(outcome.response.starts_with("❌ Error: "));
        assert_eq!(session.len(), 3);
    }

    /// Backend that never answers.
    struct StalledBackend;

    #[async_trait::async_trait]
    impl crate::llm::LlmBackend for StalledBackend {
        fn model(&self) -> &str {
            "stalled"
        }

        async fn chat(
            &self,
            _messages: &[LlmMessage],
            _tools: &[crate::llm::ToolSpec],
        ) -> Result<LlmReply> {
            std::future::pending().await
        }

        async fn generate(
            &self,
            _prompt: &str,
            _on_token: Option<crate::llm::TokenSink<'_>>,
        ) -> Result<String> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_abandoned_turn_leaves_session_unchanged() {
        let agent = Agent::new(Arc::new(StalledBackend), ToolSet::new(), "system");
        let router = TurnRouter::new(ToolSet::new(), agent);

        let mut session = Session::new("how can I help you?");
        let mut observer = NullObserver;
        let turn = router.handle_turn(&mut session, "hello", &mut observer);
        let timed_out = tokio::time::timeout(std::time::Duration::from_millis(50), turn).await;
        assert!(timed_out.is_err());

        assert_eq!(session.len(), 1);
        assert_eq!(session.last().unwrap().role, Role::Assistant);

        // The next turn still pairs up cleanly.
        let router = router_with_reply("hi there");
        router.handle_turn(&mut session, "hello again", &mut NullObserver).await;
        assert_eq!(session.len(), 3);
        assert_eq!(session.messages()[1].content, "hello again");
        assert_eq!(session.messages()[2].content, "hi there");
    }

    fn router_with_reply(reply: &str) -> TurnRouter {
        router(ScriptedBackend::repeating(LlmReply::text(reply)), ToolSet::new())
    }

    #[tokio::test]
    async fn test_thoughts_are_not_stored_in_session() {
        let tools = ToolSet::new().with_tool(FakeTool::ok(ToolKind::Search, "snippet"));
        let backend = ScriptedBackend::new(vec![
            Ok(LlmReply {
                content: Some("I should search.".to_string()),
                tool_calls: vec![crate::llm::ToolInvocation {
                    id: "c1".to_string(),
                    name: "search".to_string(),
                    arguments: r#"{"query": "weather"}"#.to_string(),
                }],
            }),
            Ok(LlmReply::text("Sunny.")),
        ]);
        let router = router(backend, tools);

        let mut session = Session::default();
        let mut observer = CollectingObserver::default();
        router.handle_turn(&mut session, "weather?", &mut observer).await;

        assert_eq!(observer.events.len(), 3);
        assert_eq!(session.len(), 3);
        assert!(session.messages().iter().all(|m| !m.content.contains("I should search.")));
    }
}
