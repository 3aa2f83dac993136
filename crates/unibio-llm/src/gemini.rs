//! Google Gemini API Client
//!
//! API-key authentication against the Google AI Studio endpoint:
//!
//! ```text
//! POST {api_url}/models/{model}:generateContent?key={API_KEY}
//! ```
//!
//! Function calling follows the `generateContent` wire format. A model turn
//! may hold several `functionCall` parts; each may carry a `thoughtSignature`
//! that has to be sent back verbatim in the next request or the API rejects
//! the conversation. Function responses travel in a `user` turn as
//! `functionResponse` parts.
//!
//! Requests are never retried here. Rate-limit and server errors surface to
//! the caller as-is.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{debug, error, info};

use unibio_core::AppConfig;

use crate::provider::{
    ChatMessage, ChatRequest, ChatResponse, LlmProvider, ModelInfo, Part, Role, TokenUsage,
    ToolChoice,
};

/// Gemini API endpoints
pub mod endpoints {
    /// Google AI Studio (API key mode)
    pub const GOOGLE_AI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
}

/// Models offered for switching, with a short description each
pub const AVAILABLE_MODELS: &[(&str, &str)] = &[
    ("gemini-2.5-flash", "Latest, fastest"),
    ("gemini-2.5-pro", "Latest Pro model"),
    ("gemini-2.0-flash", "Gemini 2.0 Flash"),
    ("gemini-1.5-pro", "Most capable, larger context"),
    ("gemini-1.5-flash", "Fast, good balance"),
    ("gemini-1.5-flash-8b", "Smallest, fastest"),
];

// =============================================================================
// WIRE FORMAT
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<GeminiTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_config: Option<GeminiToolConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiTool {
    function_declarations: Vec<GeminiFunctionDeclaration>,
}

#[derive(Debug, Serialize)]
struct GeminiFunctionDeclaration {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiToolConfig {
    function_calling_config: FunctionCallingConfig,
}

#[derive(Debug, Serialize)]
struct FunctionCallingConfig {
    mode: &'static str, // "AUTO", "ANY", "NONE"
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

/// Shared by requests and responses
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_call: Option<GeminiFunctionCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_response: Option<GeminiFunctionResponse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    thought_signature: Option<String>,
    /// Set on internal reasoning parts, which are not part of the answer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    thought: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiFunctionCall {
    name: String,
    #[serde(default)]
    args: Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiFunctionResponse {
    name: String,
    response: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    prompt_token_count: Option<u32>,
    candidates_token_count: Option<u32>,
    total_token_count: Option<u32>,
}

// =============================================================================
// MAPPING
// =============================================================================

fn wire_role(role: Role) -> &'static str {
    match role {
        Role::Model => "model",
        Role::User | Role::Tool => "user",
    }
}

fn to_wire_part(part: &Part) -> GeminiPart {
    match part {
        Part::Text { text } => GeminiPart {
            text: Some(text.clone()),
            ..Default::default()
        },
        Part::FunctionCall {
            name,
            args,
            thought_signature,
        } => GeminiPart {
            function_call: Some(GeminiFunctionCall {
                name: name.clone(),
                args: Value::Object(args.clone()),
            }),
            thought_signature: thought_signature.clone(),
            ..Default::default()
        },
        Part::FunctionResponse { name, response } => GeminiPart {
            function_response: Some(GeminiFunctionResponse {
                name: name.clone(),
                response: response.clone(),
            }),
            ..Default::default()
        },
    }
}

fn build_request(request: &ChatRequest) -> GeminiRequest {
    let contents = request
        .messages
        .iter()
        .map(|m| GeminiContent {
            role: Some(wire_role(m.role).to_string()),
            parts: m.parts.iter().map(to_wire_part).collect(),
        })
        .collect();

    let system_instruction = request.system_instruction.as_ref().map(|s| GeminiContent {
        role: None,
        parts: vec![GeminiPart {
            text: Some(s.clone()),
            ..Default::default()
        }],
    });

    let (tools, tool_config) = if request.tools.is_empty() {
        (None, None)
    } else {
        let function_declarations = request
            .tools
            .iter()
            .map(|t| GeminiFunctionDeclaration {
                name: t.name.clone(),
                description: t.description.clone(),
                parameters: t.parameters.clone(),
            })
            .collect();
        let mode = match request.tool_choice {
            ToolChoice::Auto => "AUTO",
            ToolChoice::Required => "ANY",
            ToolChoice::None => "NONE",
        };
        (
            Some(vec![GeminiTool {
                function_declarations,
            }]),
            Some(GeminiToolConfig {
                function_calling_config: FunctionCallingConfig { mode },
            }),
        )
    };

    let generation_config = if request.temperature.is_some() || request.max_tokens.is_some() {
        Some(GenerationConfig {
            temperature: request.temperature,
            max_output_tokens: request.max_tokens,
        })
    } else {
        None
    };

    GeminiRequest {
        contents,
        system_instruction,
        generation_config,
        tools,
        tool_config,
    }
}

fn from_wire_part(part: GeminiPart) -> Option<Part> {
    if part.thought == Some(true) {
        return None;
    }
    if let Some(call) = part.function_call {
        let args = match call.args {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        return Some(Part::FunctionCall {
            name: call.name,
            args,
            thought_signature: part.thought_signature,
        });
    }
    if let Some(response) = part.function_response {
        return Some(Part::FunctionResponse {
            name: response.name,
            response: response.response,
        });
    }
    part.text.map(|text| Part::Text { text })
}

fn parse_response(model: &str, response: GeminiResponse) -> Result<ChatResponse> {
    let usage = response.usage_metadata.map(|u| TokenUsage {
        prompt_tokens: u.prompt_token_count.unwrap_or(0),
        completion_tokens: u.candidates_token_count.unwrap_or(0),
        total_tokens: u.total_token_count.unwrap_or(0),
    });

    let candidate = match response.candidates.into_iter().next() {
        Some(c) => c,
        None => {
            let reason = response
                .prompt_feedback
                .and_then(|f| f.block_reason)
                .unwrap_or_else(|| "no candidates returned".to_string());
            return Err(anyhow!("Gemini returned no response: {}", reason));
        }
    };

    let parts: Vec<Part> = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(from_wire_part).collect())
        .unwrap_or_default();

    Ok(ChatResponse {
        message: ChatMessage::new(Role::Model, parts),
        model: model.to_string(),
        finish_reason: candidate.finish_reason,
        usage,
    })
}

// =============================================================================
// CLIENT IMPLEMENTATION
// =============================================================================

/// Google Gemini Client (API key mode)
pub struct GeminiClient {
    client: Client,
    api_key: String,
    /// Base API URL
    api_url: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build Gemini HTTP client")?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            api_url: endpoints::GOOGLE_AI_BASE_URL.to_string(),
        })
    }

    /// Create from resolved configuration; fails when no API key is set
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let api_key = config.require_api_key()?;
        Self::new(api_key, config.model_timeout)
    }

    /// Point the client at a different base URL (proxies, tests)
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.api_url = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    fn build_url(&self, model: &str, action: &str) -> String {
        format!(
            "{}/models/{}:{}?key={}",
            self.api_url, model, action, self.api_key
        )
    }
}

#[async_trait]
impl LlmProvider for GeminiClient {
    fn provider_name(&self) -> &str {
        "gemini"
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        Ok(AVAILABLE_MODELS
            .iter()
            .map(|(id, description)| ModelInfo {
                id: id.to_string(),
                name: id.to_string(),
                description: Some(description.to_string()),
                available: true,
            })
            .collect())
    }

    async fn chat_with_request(&self, model: &str, request: ChatRequest) -> Result<ChatResponse> {
        let url = self.build_url(model, "generateContent");
        info!(
            "Gemini chat_with_request: model={}, messages={}, tools={}",
            model,
            request.messages.len(),
            request.tools.len()
        );

        let body = build_request(&request);
        debug!("Gemini request to: {}", url.split('?').next().unwrap_or(&url));

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                // the URL carries the API key
                let e = e.without_url();
                error!("Gemini HTTP request failed: {}", e);
                anyhow!("Failed to send Gemini request: {}", e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Gemini API error {}: {}", status, body);
            return Err(anyhow!("Gemini API error {}: {}", status, body));
        }

        let raw_body = response
            .text()
            .await
            .context("Failed to read Gemini response body")?;
        let parsed: GeminiResponse = serde_json::from_str(&raw_body).map_err(|e| {
            let preview: String = raw_body.chars().take(1000).collect();
            error!("Failed to parse Gemini response: {}", e);
            anyhow!("Failed to parse Gemini response: {}. Raw: {}", e, preview)
        })?;

        let result = parse_response(model, parsed)?;
        let calls = result.message.function_calls();
        if !calls.is_empty() {
            info!("Gemini returned {} function calls", calls.len());
            for call in &calls {
                let args = Value::Object(call.arguments.clone());
                debug!("  Function call: {}({})", call.name, args);
            }
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::FunctionDeclaration;
    use axum::extract::{Path, Query};
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::json;
    use std::collections::HashMap;

    fn sample_request() -> ChatRequest {
        let mut args = Map::new();
        args.insert("sequence".into(), json!("ATGC"));
        let call = Part::FunctionCall {
            name: "analyze_primer".into(),
            args,
            thought_signature: Some("sig-1".into()),
        };
        ChatRequest::new(vec![
            ChatMessage::user("Analyze ATGC"),
            ChatMessage::new(Role::Model, vec![call]),
            ChatMessage::tool_responses(vec![(
                "analyze_primer".to_string(),
                json!({"result": {"success": true}}),
            )]),
        ])
        .with_tools(vec![FunctionDeclaration {
            name: "analyze_primer".into(),
            description: "Analyze a primer".into(),
            parameters: json!({"type": "object", "properties": {}}),
        }])
        .with_system_instruction("You are a lab assistant.")
    }

    #[test]
    fn test_build_request_wire_format() {
        let body = serde_json::to_value(build_request(&sample_request())).unwrap();

        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "Analyze ATGC");
        assert_eq!(body["contents"][1]["role"], "model");
        assert_eq!(
            body["contents"][1]["parts"][0]["functionCall"]["name"],
            "analyze_primer"
        );
        assert_eq!(body["contents"][1]["parts"][0]["thoughtSignature"], "sig-1");
        assert_eq!(body["contents"][2]["role"], "user");
        assert_eq!(
            body["contents"][2]["parts"][0]["functionResponse"]["response"]["result"]["success"],
            true
        );
        assert_eq!(
            body["systemInstruction"]["parts"][0]["text"],
            "You are a lab assistant."
        );
        assert_eq!(
            body["tools"][0]["functionDeclarations"][0]["name"],
            "analyze_primer"
        );
        assert_eq!(body["toolConfig"]["functionCallingConfig"]["mode"], "AUTO");
        assert!(body.get("generationConfig").is_none());
    }

    #[test]
    fn test_parse_function_calls_and_skip_thoughts() {
        let raw = json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [
                        {"text": "thinking...", "thought": true},
                        {"functionCall": {"name": "design_primers", "args": {"sequence": "ATGC"}},
                         "thoughtSignature": "abc"},
                        {"functionCall": {"name": "find_restriction_sites"}}
                    ]
                },
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 10, "candidatesTokenCount": 5, "totalTokenCount": 15}
        });
        let parsed: GeminiResponse = serde_json::from_value(raw).unwrap();
        let response = parse_response("gemini-2.5-flash", parsed).unwrap();

        assert_eq!(response.message.parts.len(), 2);
        assert_eq!(response.message.text(), "");
        match &response.message.parts[0] {
            Part::FunctionCall {
                name,
                thought_signature,
                ..
            } => {
                assert_eq!(name, "design_primers");
                assert_eq!(thought_signature.as_deref(), Some("abc"));
            }
            other => panic!("unexpected part {:?}", other),
        }
        let calls = response.message.function_calls();
        assert!(calls[1].arguments.is_empty());
        assert_eq!(response.finish_reason.as_deref(), Some("STOP"));
        assert_eq!(response.usage.unwrap().total_tokens, 15);
    }

    #[test]
    fn test_parse_blocked_prompt() {
        let parsed: GeminiResponse =
            serde_json::from_value(json!({"promptFeedback": {"blockReason": "SAFETY"}})).unwrap();
        let err = parse_response("m", parsed).unwrap_err();
        assert!(err.to_string().contains("SAFETY"));
    }

    #[test]
    fn test_parse_missing_content() {
        let parsed: GeminiResponse =
            serde_json::from_value(json!({"candidates": [{"finishReason": "MAX_TOKENS"}]}))
                .unwrap();
        let response = parse_response("m", parsed).unwrap();
        assert!(response.message.parts.is_empty());
        assert_eq!(response.message.text(), "");
    }

    async fn spawn_mock(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_chat_against_mock_endpoint() {
        let router = Router::new().route(
            "/models/:call",
            post(
                |Path(call): Path<String>,
                 Query(query): Query<HashMap<String, String>>,
                 Json(body): Json<Value>| async move {
                    assert_eq!(call, "gemini-2.5-flash:generateContent");
                    assert_eq!(query.get("key").map(String::as_str), Some("test-key"));
                    let echoed = body["contents"][0]["parts"][0]["text"].clone();
                    Json(json!({
                        "candidates": [{
                            "content": {"role": "model", "parts": [{"text": echoed}]},
                            "finishReason": "STOP"
                        }]
                    }))
                },
            ),
        );
        let base = spawn_mock(router).await;

        let client = GeminiClient::new("test-key", Duration::from_secs(5))
            .unwrap()
            .with_endpoint(base);
        let response = client
            .chat_with_request(
                "gemini-2.5-flash",
                ChatRequest::new(vec![ChatMessage::user("hello")]),
            )
            .await
            .unwrap();
        assert_eq!(response.message.text(), "hello");
        assert_eq!(response.model, "gemini-2.5-flash");
    }

    #[tokio::test]
    async fn test_function_call_reply_over_http() {
        let router = Router::new().route(
            "/models/:call",
            post(|| async {
                Json(json!({
                    "candidates": [{
                        "content": {"role": "model", "parts": [{
                            "functionCall": {
                                "name": "find_restriction_sites",
                                "args": {"sequence": "GAATTC"}
                            }
                        }]},
                        "finishReason": "STOP"
                    }]
                }))
            }),
        );
        let base = spawn_mock(router).await;

        let client = GeminiClient::new("test-key", Duration::from_secs(5))
            .unwrap()
            .with_endpoint(base);
        let response = client
            .chat_with_request(
                "gemini-2.5-flash",
                ChatRequest::new(vec![ChatMessage::user("map GAATTC")]),
            )
            .await
            .unwrap();
        let calls = response.message.function_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "find_restriction_sites");
        assert_eq!(calls[0].arguments["sequence"], "GAATTC");
    }

    #[tokio::test]
    async fn test_http_error_is_not_retried() {
        let hits = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter = hits.clone();
        let router = Router::new().route(
            "/models/:call",
            post(move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                    (axum::http::StatusCode::TOO_MANY_REQUESTS, "quota exceeded")
                }
            }),
        );
        let base = spawn_mock(router).await;

        let client = GeminiClient::new("k", Duration::from_secs(5))
            .unwrap()
            .with_endpoint(base);
        let err = client
            .chat_with_request("gemini-2.5-flash", ChatRequest::new(vec![ChatMessage::user("x")]))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("429"));
        assert_eq!(hits.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_model_listing() {
        let client = GeminiClient::new("k", Duration::from_secs(1)).unwrap();
        let models = tokio_test::assert_ok!(client.list_models().await);
        assert_eq!(models.len(), AVAILABLE_MODELS.len());
        assert!(client.is_model_available("gemini-2.5-pro").await.unwrap());
        assert!(!client.is_model_available("gpt-4").await.unwrap());
    }
}
