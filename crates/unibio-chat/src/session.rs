//! Conversation session
//!
//! Owns the message history and the model connection. One call to
//! [`ConversationSession::next_turn`] is one round-trip: append the input,
//! send the whole history with the tool declarations, append the reply and
//! classify it.

use anyhow::Result;
use serde_json::Value;
use tracing::{debug, info};

use unibio_core::ToolCallRequest;
use unibio_llm::{
    BoxedProvider, ChatMessage, ChatRequest, FunctionDeclaration, Role, ToolChoice,
};

/// What gets appended before a model round-trip
#[derive(Debug, Clone)]
pub enum TurnInput {
    UserText(String),
    /// `(tool name, response object)` for every call of a batch, in order
    FunctionResponses(Vec<(String, Value)>),
}

impl TurnInput {
    fn into_message(self) -> ChatMessage {
        match self {
            TurnInput::UserText(text) => ChatMessage::user(text),
            TurnInput::FunctionResponses(responses) => ChatMessage::tool_responses(responses),
        }
    }
}

/// Classified model turn
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    FinalText(String),
    /// The model asked for tool calls; `text` is whatever it said alongside
    PendingCalls {
        calls: Vec<ToolCallRequest>,
        text: String,
    },
}

impl TurnOutcome {
    /// Single classification step for a model message
    pub fn classify(message: &ChatMessage) -> Self {
        let calls = message.function_calls();
        let text = message.text();
        if calls.is_empty() {
            TurnOutcome::FinalText(text)
        } else {
            TurnOutcome::PendingCalls { calls, text }
        }
    }
}

pub struct ConversationSession {
    provider: BoxedProvider,
    model: String,
    declarations: Vec<FunctionDeclaration>,
    system_instruction: Option<String>,
    history: Vec<ChatMessage>,
}

impl ConversationSession {
    pub fn new(
        provider: BoxedProvider,
        model: impl Into<String>,
        declarations: Vec<FunctionDeclaration>,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            declarations,
            system_instruction: None,
            history: Vec::new(),
        }
    }

    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }

    /// Reset the history, or seed it with an earlier conversation
    pub fn start(&mut self, history: Option<Vec<ChatMessage>>) {
        self.history = history.unwrap_or_default();
        debug!(messages = self.history.len(), "Session started");
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn declarations(&self) -> &[FunctionDeclaration] {
        &self.declarations
    }

    pub fn provider(&self) -> &BoxedProvider {
        &self.provider
    }

    /// Point the session at another model. History is kept.
    pub fn switch_model(&mut self, model: impl Into<String>) {
        let model = model.into();
        info!("Switching model: {} -> {}", self.model, model);
        self.model = model;
    }

    /// One model round-trip.
    ///
    /// On failure the appended input is removed again, so the history is
    /// exactly what it was before the call.
    pub async fn next_turn(&mut self, input: TurnInput) -> Result<TurnOutcome> {
        let mark = self.history.len();
        self.history.push(input.into_message());

        let mut request = ChatRequest::new(self.history.clone())
            .with_tools(self.declarations.clone())
            .with_tool_choice(ToolChoice::Auto);
        if let Some(ref instruction) = self.system_instruction {
            request = request.with_system_instruction(instruction.clone());
        }

        match self.provider.chat_with_request(&self.model, request).await {
            Ok(response) => {
                let outcome = TurnOutcome::classify(&response.message);
                self.history.push(response.message);
                Ok(outcome)
            }
            Err(e) => {
                self.history.truncate(mark);
                Err(e)
            }
        }
    }

    /// Truncate the history back to `len` messages
    pub fn rollback_to(&mut self, len: usize) {
        if len < self.history.len() {
            debug!(dropped = self.history.len() - len, "Rolling back history");
            self.history.truncate(len);
        }
    }

    /// Drop a trailing model turn whose calls were never answered, so the
    /// next user message forms a valid conversation.
    pub fn conclude(&mut self) {
        let dangling = self
            .history
            .last()
            .map(|m| m.role == Role::Model && m.has_function_calls())
            .unwrap_or(false);
        if dangling {
            debug!("Dropping unanswered function calls from history");
            self.history.pop();
        }
    }
}
