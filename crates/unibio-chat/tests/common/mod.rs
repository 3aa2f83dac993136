//! Shared fixtures: a scripted model and a builtin tool executor

#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use unibio_chat::{function_declarations, BioAgent, DirectDispatcher};
use unibio_llm::{ChatMessage, ChatRequest, ChatResponse, LlmProvider, ModelInfo, Part, Role};
use unibio_tools::{EntrezClient, SimpleTool, ToolExecutor, ToolRegistry, ToolSchema};

pub const TEMPLATE: &str = "ATGGTGAGCAAGGGCGAGGAGCTGTTCACCGGGGTGGTGCCCATCCTGGTCGAGCTGGACGGCGACGTAAACGGCCACAAGTTCAGCGTGTCCGGCGAGGGCGAGGGCGATGCCACCTACGGCAAGCTGACCCTGAAGTTCATCTGCACCACCGGCAAGCTGCCCGTGCCCTGGCCCACCCTCGTGACCACCCTGACCTACGGCGTGCAGTGCTTCAGCCGCTACCCCGACCACATGAAGCAGCACGACTTCTTCAAGTCCGCCATGCCCGAAGGCTACGTCCAGGAGCGCACCATCTTCTTCAAGGACGACGGCAACTACAAGACCCGCGCCGAGGTGAAGTTCGAGGGCGACACCCTGGTGAACCGCATCGAGCTGAAGGGCATCGACTTCAAGGAGGACGGCAACATCCTGGGG";

/// One scripted model behavior
#[derive(Clone)]
pub enum Step {
    Reply(ChatMessage),
    Fail(String),
    Panic(String),
}

/// Model stand-in that replays a script and records every request
pub struct ScriptedProvider {
    script: Mutex<VecDeque<Step>>,
    repeat: Option<Step>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedProvider {
    pub fn new(steps: Vec<Step>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(steps.into()),
            repeat: None,
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Plays `steps`, then `step` forever
    pub fn then_forever(steps: Vec<Step>, step: Step) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(steps.into()),
            repeat: Some(step),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn provider_name(&self) -> &str {
        "scripted"
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        Ok(vec![ModelInfo {
            id: "scripted-model".into(),
            name: "scripted-model".into(),
            description: None,
            available: true,
        }])
    }

    async fn chat_with_request(&self, model: &str, request: ChatRequest) -> Result<ChatResponse> {
        self.requests.lock().unwrap().push(request);
        let step = {
            let mut script = self.script.lock().unwrap();
            script.pop_front().or_else(|| self.repeat.clone())
        };
        match step {
            Some(Step::Reply(message)) => Ok(ChatResponse {
                message,
                model: model.to_string(),
                finish_reason: Some("STOP".into()),
                usage: None,
            }),
            Some(Step::Fail(msg)) => Err(anyhow!(msg)),
            Some(Step::Panic(msg)) => panic!("{}", msg),
            None => Err(anyhow!("script exhausted")),
        }
    }
}

pub fn text(s: &str) -> Step {
    Step::Reply(ChatMessage::model(s))
}

/// A model turn requesting the given calls, in order
pub fn calls(requests: &[(&str, Value)]) -> Step {
    let parts = requests
        .iter()
        .map(|(name, args)| Part::function_call(*name, to_map(args.clone())))
        .collect();
    Step::Reply(ChatMessage::new(Role::Model, parts))
}

/// Like `calls`, with a text part ahead of the requests
pub fn calls_with_text(text: &str, requests: &[(&str, Value)]) -> Step {
    let mut parts = vec![Part::text(text)];
    parts.extend(
        requests
            .iter()
            .map(|(name, args)| Part::function_call(*name, to_map(args.clone()))),
    );
    Step::Reply(ChatMessage::new(Role::Model, parts))
}

pub fn to_map(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Builtin catalog plus two misbehaving tools; NCBI traffic goes to a
/// closed local port.
pub fn registry() -> ToolRegistry {
    let entrez = EntrezClient::new(None, None, Duration::from_secs(2))
        .unwrap()
        .with_base_url("http://127.0.0.1:9");
    let mut registry = unibio_tools::builtin_registry(Arc::new(entrez)).unwrap();
    registry
        .register(Arc::new(SimpleTool::new(
            ToolSchema::new("explode", "Always fails"),
            |_| Err(anyhow!("reagent missing")),
        )))
        .unwrap();
    registry
        .register(Arc::new(SimpleTool::new(
            ToolSchema::new("crash", "Always panics"),
            |_| -> Result<Value> { panic!("centrifuge imbalance") },
        )))
        .unwrap();
    registry
}

pub fn executor() -> Arc<ToolExecutor> {
    Arc::new(ToolExecutor::with_defaults(Arc::new(registry())))
}

pub fn agent(provider: Arc<ScriptedProvider>) -> BioAgent {
    let executor = executor();
    let declarations = function_declarations(executor.registry());
    BioAgent::new(
        provider,
        Arc::new(DirectDispatcher::new(executor)),
        declarations,
        "gemini-2.5-flash",
    )
}
