//! Web-search chatbot: session transcript and turn routing.

mod router;
mod session;

pub use router::{
    classify, Route, RoutingDecision, TurnOutcome, TurnRouter, ARXIV_MARKER, ERROR_PREFIX,
};
pub use session::{Message, Role, Session};
