//! unibio-chat: Orchestration layer
//!
//! Mediates between the model's function-call requests and the tool
//! catalog:
//!
//! - `dispatcher` / `http_dispatcher`: the two tool dispatch backends
//! - `session`: message history and model round-trips
//! - `agent`: the bounded orchestration loop
//! - `synthesizer`: guaranteed non-empty final answers
//! - `sessions` / `router`: the HTTP chat front-end

pub mod agent;
pub mod dispatcher;
pub mod http_dispatcher;
pub mod router;
pub mod session;
pub mod sessions;
pub mod synthesizer;

// Re-export main types
pub use agent::{AgentFactory, Answer, BioAgent, ChatReply, Failure, DEFAULT_SYSTEM_PROMPT};
pub use dispatcher::{
    build_dispatcher, function_declarations, DirectDispatcher, SharedDispatcher, ToolDispatcher,
};
pub use http_dispatcher::HttpDispatcher;
pub use router::{create_router, ChatServiceRouter, ChatState};
pub use session::{ConversationSession, TurnInput, TurnOutcome};
pub use sessions::{SessionInfo, SessionManager};
pub use synthesizer::synthesize;

/// Prelude for convenient imports
pub mod prelude {
    pub use super::{AgentFactory, BioAgent, ChatReply, SessionManager, ToolDispatcher};
}
