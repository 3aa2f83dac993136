//! Orchestration loop
//!
//! ```text
//! AwaitingModel ──PendingCalls──▶ ExecutingTools ──batch results──▶ AwaitingModel
//!       │                                                               │
//!       └──FinalText / ceiling reached──▶ Done ◀─────────────────────────┘
//! ```
//!
//! A `send_message` call runs at most `max_iterations` tool rounds. Each
//! round executes every requested call in order and sends all results back
//! in a single model turn. Model faults end the call with a failed reply
//! and restore the history to what it was before the message.

use futures::FutureExt;
use serde::Serialize;
use serde_json::Value;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use unibio_core::config::DEFAULT_MAX_ITERATIONS;
use unibio_core::{AppConfig, CallRecord};
use unibio_llm::{BoxedProvider, ChatMessage, FunctionDeclaration, ModelInfo, AVAILABLE_MODELS};

use crate::dispatcher::SharedDispatcher;
use crate::session::{ConversationSession, TurnInput, TurnOutcome};
use crate::synthesizer::synthesize;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a molecular biology lab assistant. \
Use the available tools for primer design, primer analysis, specificity checks, \
restriction mapping, Gibson assembly and NCBI or PubMed lookups instead of guessing \
numbers. After the tools return, explain the results clearly and point out anything \
the user should double-check at the bench.";

/// Result of one `send_message`
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ChatReply {
    Answered(Answer),
    Failed(Failure),
}

#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub success: bool,
    pub response: String,
    pub model: String,
    pub function_calls: Vec<CallRecord>,
    pub iterations: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct Failure {
    pub success: bool,
    pub error: String,
    pub model: String,
}

impl ChatReply {
    fn answered(
        response: String,
        model: &str,
        function_calls: Vec<CallRecord>,
        iterations: usize,
    ) -> Self {
        ChatReply::Answered(Answer {
            success: true,
            response,
            model: model.to_string(),
            function_calls,
            iterations,
        })
    }

    fn failed(error: String, model: &str) -> Self {
        ChatReply::Failed(Failure {
            success: false,
            error,
            model: model.to_string(),
        })
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ChatReply::Answered(_))
    }

    pub fn model(&self) -> &str {
        match self {
            ChatReply::Answered(a) => &a.model,
            ChatReply::Failed(f) => &f.model,
        }
    }

    /// Text to show a user: the answer, or the error
    pub fn display_text(&self) -> String {
        match self {
            ChatReply::Answered(a) => a.response.clone(),
            ChatReply::Failed(f) => format!("Error: {}", f.error),
        }
    }

    pub fn function_calls(&self) -> &[CallRecord] {
        match self {
            ChatReply::Answered(a) => &a.function_calls,
            ChatReply::Failed(_) => &[],
        }
    }
}

/// Conversational agent: a session plus a dispatcher
pub struct BioAgent {
    session: ConversationSession,
    dispatcher: SharedDispatcher,
    max_iterations: usize,
}

impl BioAgent {
    pub fn new(
        provider: BoxedProvider,
        dispatcher: SharedDispatcher,
        declarations: Vec<FunctionDeclaration>,
        model: impl Into<String>,
    ) -> Self {
        let model = model.into();
        if !is_known_model(&model) {
            warn!("{} is not in the standard model list, proceeding anyway", model);
        }
        Self {
            session: ConversationSession::new(provider, model, declarations),
            dispatcher,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.session = self.session.with_system_instruction(instruction);
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn model(&self) -> &str {
        self.session.model()
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    pub fn history(&self) -> &[ChatMessage] {
        self.session.history()
    }

    pub fn dispatcher(&self) -> &SharedDispatcher {
        &self.dispatcher
    }

    /// Reset the conversation, optionally seeding it
    pub fn start_chat(&mut self, history: Option<Vec<ChatMessage>>) {
        self.session.start(history);
    }

    pub fn clear_history(&mut self) {
        self.session.start(None);
    }

    /// Change model between messages; the conversation carries over
    pub fn switch_model(&mut self, model: impl Into<String>) {
        let model = model.into();
        if !is_known_model(&model) {
            warn!("{} is not in the standard model list", model);
        }
        self.session.switch_model(model);
    }

    pub async fn list_available_models(&self) -> anyhow::Result<Vec<ModelInfo>> {
        self.session.provider().list_models().await
    }

    /// Send with the configured iteration ceiling
    pub async fn send(&mut self, message: &str) -> ChatReply {
        let max = self.max_iterations;
        self.send_message(message, max).await
    }

    /// Run the orchestration loop for one user message.
    ///
    /// Never fails: model errors and panics inside the loop come back as
    /// `ChatReply::Failed`.
    pub async fn send_message(&mut self, message: &str, max_iterations: usize) -> ChatReply {
        let model = self.model().to_string();
        let mark = self.session.history().len();
        info!(model = %model, max_iterations, "Processing user message");

        let outcome = AssertUnwindSafe(self.run_loop(message, max_iterations))
            .catch_unwind()
            .await;

        let reply = match outcome {
            Ok(Ok(reply)) => {
                self.session.conclude();
                return reply;
            }
            Ok(Err(e)) => {
                error!("Chat turn failed: {:#}", e);
                ChatReply::failed(format!("{:#}", e), &model)
            }
            Err(panic) => {
                let msg = panic
                    .downcast_ref::<String>()
                    .cloned()
                    .or_else(|| panic.downcast_ref::<&str>().map(|s| s.to_string()))
                    .unwrap_or_else(|| "unknown panic".to_string());
                error!("Chat turn panicked: {}", msg);
                ChatReply::failed(format!("internal error: {}", msg), &model)
            }
        };

        // a failed message leaves no trace in the conversation
        self.session.rollback_to(mark);
        reply
    }

    async fn run_loop(&mut self, message: &str, max_iterations: usize) -> anyhow::Result<ChatReply> {
        let mut calls: Vec<CallRecord> = Vec::new();
        let mut iterations = 0;

        let mut outcome = self
            .session
            .next_turn(TurnInput::UserText(message.to_string()))
            .await?;

        let final_text = loop {
            let (requests, text) = match outcome {
                TurnOutcome::FinalText(text) => break text,
                TurnOutcome::PendingCalls { calls, text } => (calls, text),
            };

            if iterations >= max_iterations {
                warn!(
                    iterations,
                    pending = requests.len(),
                    interim_text = !text.trim().is_empty(),
                    "Iteration limit reached with calls still pending"
                );
                // text sent alongside pending calls is an interim remark, not an answer
                break String::new();
            }

            let mut responses: Vec<(String, Value)> = Vec::with_capacity(requests.len());
            for request in &requests {
                info!(tool = %request.name, "Agent calling tool");
                let args = Value::Object(request.arguments.clone());
                debug!(tool = %request.name, args = %args, "Tool arguments");

                let result = self.dispatcher.execute_request(request).await;
                if !result.success {
                    debug!(tool = %request.name, error = ?result.error, "Tool reported failure");
                }
                responses.push((request.name.clone(), result.to_model_response()));
                calls.push(CallRecord::new(request, result));
            }

            outcome = self
                .session
                .next_turn(TurnInput::FunctionResponses(responses))
                .await?;
            iterations += 1;
        };

        let response = synthesize(&final_text, &calls);
        info!(
            iterations,
            tool_calls = calls.len(),
            "Chat turn complete"
        );
        Ok(ChatReply::answered(response, self.model(), calls, iterations))
    }
}

fn is_known_model(model: &str) -> bool {
    AVAILABLE_MODELS.iter().any(|(id, _)| *id == model)
}

/// Builds agents that share a provider, a dispatcher and the declarations
#[derive(Clone)]
pub struct AgentFactory {
    provider: BoxedProvider,
    dispatcher: SharedDispatcher,
    declarations: Arc<Vec<FunctionDeclaration>>,
    default_model: String,
    max_iterations: usize,
    system_instruction: Option<String>,
}

impl AgentFactory {
    pub fn new(
        provider: BoxedProvider,
        dispatcher: SharedDispatcher,
        declarations: Vec<FunctionDeclaration>,
        default_model: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            dispatcher,
            declarations: Arc::new(declarations),
            default_model: default_model.into(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            system_instruction: Some(DEFAULT_SYSTEM_PROMPT.to_string()),
        }
    }

    pub fn from_config(
        config: &AppConfig,
        provider: BoxedProvider,
        dispatcher: SharedDispatcher,
        declarations: Vec<FunctionDeclaration>,
    ) -> Self {
        Self::new(provider, dispatcher, declarations, config.default_model.clone())
            .with_max_iterations(config.max_iterations)
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_system_instruction(mut self, instruction: Option<String>) -> Self {
        self.system_instruction = instruction;
        self
    }

    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    pub fn provider(&self) -> &BoxedProvider {
        &self.provider
    }

    pub fn dispatcher(&self) -> &SharedDispatcher {
        &self.dispatcher
    }

    /// New agent with an empty history
    pub fn create(&self, model: Option<&str>) -> BioAgent {
        let model = model.unwrap_or(&self.default_model);
        let agent = BioAgent::new(
            self.provider.clone(),
            self.dispatcher.clone(),
            self.declarations.as_ref().clone(),
            model,
        )
        .with_max_iterations(self.max_iterations);
        match self.system_instruction {
            Some(ref instruction) => agent.with_system_instruction(instruction.clone()),
            None => agent,
        }
    }
}
