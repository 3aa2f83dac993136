//! unibio-llm: LLM provider integration
//!
//! | Provider | Base URL | Auth Method |
//! |----------|----------|-------------|
//! | Gemini | `https://generativelanguage.googleapis.com/v1beta` | `?key={API_KEY}` |
//!
//! The conversation layer depends only on [`LlmProvider`]; tests substitute
//! scripted providers.

pub mod gemini;
pub mod provider;

pub use gemini::{GeminiClient, AVAILABLE_MODELS};
pub use provider::{
    BoxedProvider, ChatMessage, ChatRequest, ChatResponse, FunctionDeclaration, LlmProvider,
    ModelInfo, Part, Role, TokenUsage, ToolChoice,
};

/// Prelude for convenient imports
pub mod prelude {
    pub use super::gemini::GeminiClient;
    pub use super::provider::{
        ChatMessage, ChatRequest, ChatResponse, FunctionDeclaration, LlmProvider, Part, Role,
    };
}
