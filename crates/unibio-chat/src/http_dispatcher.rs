//! Networked dispatch backend
//!
//! Calls a separately deployed tool service:
//!
//! ```text
//! POST {base_url}/api/tools/{name}/execute   body = arguments object
//! GET  {base_url}/health                      readiness probe (5s)
//! ```
//!
//! Only names present in the local registry are sent, so both backends
//! accept exactly the advertised catalog. The service answers with a
//! `ToolResult` object. Transport faults are turned into failed results
//! with a message per fault kind.

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use unibio_core::{AppConfig, DispatchBackend, ToolResult};
use unibio_tools::{ExecutorConfig, ToolRegistry};

use crate::dispatcher::ToolDispatcher;

const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

pub struct HttpDispatcher {
    client: Client,
    base_url: String,
    base: Url,
    /// The advertised catalog; also gives each tool's latency class
    registry: Arc<ToolRegistry>,
    timeouts: ExecutorConfig,
}

impl HttpDispatcher {
    pub fn new(
        base_url: impl Into<String>,
        registry: Arc<ToolRegistry>,
        timeouts: ExecutorConfig,
    ) -> anyhow::Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let base = Url::parse(&base_url)
            .map_err(|e| anyhow::anyhow!("Invalid tool service URL '{}': {}", base_url, e))?;
        if base.cannot_be_a_base() {
            anyhow::bail!("Invalid tool service URL '{}'", base_url);
        }
        let client = Client::builder()
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build tool service client: {}", e))?;
        Ok(Self {
            client,
            base_url,
            base,
            registry,
            timeouts,
        })
    }

    pub fn from_config(config: &AppConfig, registry: Arc<ToolRegistry>) -> anyhow::Result<Self> {
        Self::new(
            config.api_base_url.clone(),
            registry,
            ExecutorConfig::from_app_config(config),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `{base}/api/tools/{name}/execute` with the name as one encoded segment
    fn execute_url(&self, name: &str) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .push("api")
                .push("tools")
                .push(name)
                .push("execute");
        }
        url
    }

    fn transport_error(&self, name: &str, limit: Duration, err: &reqwest::Error) -> String {
        if err.is_timeout() {
            format!(
                "request to {} timed out after {} seconds",
                name,
                limit.as_secs_f64()
            )
        } else if err.is_connect() {
            format!("could not connect to tool service at {}", self.base_url)
        } else {
            format!("request to {} failed: {}", name, err)
        }
    }
}

#[async_trait]
impl ToolDispatcher for HttpDispatcher {
    fn backend(&self) -> DispatchBackend {
        DispatchBackend::Http
    }

    async fn execute(&self, name: &str, arguments: &Map<String, Value>) -> ToolResult {
        let start = Instant::now();
        let elapsed = || start.elapsed().as_millis() as u64;

        let Some(tool) = self.registry.resolve(name) else {
            warn!(tool = %name, "Refusing to dispatch unknown tool");
            return ToolResult::error(format!("unknown function: {}", name), elapsed());
        };
        let limit = self.timeouts.timeout_for(tool.latency());
        let url = self.execute_url(name);
        debug!(tool = %name, url = %url, "Dispatching tool call over HTTP");

        let response = match self
            .client
            .post(url)
            .timeout(limit)
            .json(arguments)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                let message = self.transport_error(name, limit, &e);
                warn!(tool = %name, "{}", message);
                return ToolResult::error(message, elapsed());
            }
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return ToolResult::error(self.transport_error(name, limit, &e), elapsed()),
        };

        // unknown tools come back as 404 with a well-formed result
        if status.is_success() || status == StatusCode::NOT_FOUND {
            if let Ok(result) = serde_json::from_str::<ToolResult>(&body) {
                return result;
            }
        }

        if !status.is_success() {
            warn!(tool = %name, status = status.as_u16(), "Tool service returned an error");
            return ToolResult::error(
                format!("tool service returned HTTP {}: {}", status.as_u16(), body.trim()),
                elapsed(),
            );
        }

        ToolResult::error(
            format!("invalid response from tool service for {}", name),
            elapsed(),
        )
    }

    async fn health_check(&self) -> bool {
        let url = format!("{}/health", self.base_url);
        match self.client.get(&url).timeout(HEALTH_TIMEOUT).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!("Tool service health check failed: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use unibio_tools::{ParamKind, ParamSpec, SimpleTool, ToolSchema};

    fn catalog() -> Arc<ToolRegistry> {
        let mut registry = ToolRegistry::new();
        let schema = ToolSchema::new("analyze_primer", "Analyze a primer").param(
            ParamSpec::required("sequence", ParamKind::String, "Primer sequence"),
        );
        registry
            .register(Arc::new(SimpleTool::new(schema, |_| Ok(json!({})))))
            .unwrap();
        Arc::new(registry)
    }

    #[tokio::test]
    async fn test_connection_refused() {
        let dispatcher =
            HttpDispatcher::new("http://127.0.0.1:9/", catalog(), ExecutorConfig::default())
                .unwrap();
        assert_eq!(dispatcher.base_url(), "http://127.0.0.1:9");
        assert!(!dispatcher.health_check().await);

        let args = json!({"sequence": "ATGC"}).as_object().cloned().unwrap();
        let result = dispatcher.execute("analyze_primer", &args).await;
        assert!(!result.success);
        assert_eq!(
            result.error.as_deref(),
            Some("could not connect to tool service at http://127.0.0.1:9")
        );
    }

    #[test]
    fn test_execute_url_encodes_the_name() {
        let dispatcher =
            HttpDispatcher::new("http://tools.local:8000/", catalog(), ExecutorConfig::default())
                .unwrap();
        assert_eq!(
            dispatcher.execute_url("analyze_primer").as_str(),
            "http://tools.local:8000/api/tools/analyze_primer/execute"
        );
        let odd = dispatcher.execute_url("a/b?c#d");
        assert_eq!(odd.path(), "/api/tools/a%2Fb%3Fc%23d/execute");
        assert!(odd.query().is_none());
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        assert!(HttpDispatcher::new("not a url", catalog(), ExecutorConfig::default()).is_err());
    }
}
