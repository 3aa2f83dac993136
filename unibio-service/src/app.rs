//! Component wiring shared by every subcommand

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};

use unibio_chat::{build_dispatcher, function_declarations, AgentFactory, SharedDispatcher};
use unibio_core::AppConfig;
use unibio_llm::{BoxedProvider, FunctionDeclaration, GeminiClient};
use unibio_tools::{EntrezClient, ExecutorConfig, ToolExecutor};

pub struct App {
    pub config: AppConfig,
    pub executor: Arc<ToolExecutor>,
    pub dispatcher: SharedDispatcher,
    pub declarations: Vec<FunctionDeclaration>,
}

impl App {
    pub fn build(config: AppConfig) -> Result<Self> {
        let entrez = Arc::new(EntrezClient::from_config(&config)?);
        let registry = Arc::new(unibio_tools::builtin_registry(entrez)?);
        info!("Initialized tool registry with {} tools", registry.len());

        let executor = Arc::new(ToolExecutor::new(
            registry.clone(),
            ExecutorConfig::from_app_config(&config),
        ));
        let dispatcher = build_dispatcher(&config, executor.clone())?;
        let declarations = function_declarations(&registry);

        Ok(Self {
            config,
            executor,
            dispatcher,
            declarations,
        })
    }

    /// Agent factory backed by Gemini; fails without an API key
    pub fn agent_factory(&self) -> Result<AgentFactory> {
        let client = GeminiClient::from_config(&self.config)
            .context("the chat agent needs a Gemini API key")?;
        let provider: BoxedProvider = Arc::new(client);
        Ok(AgentFactory::from_config(
            &self.config,
            provider,
            self.dispatcher.clone(),
            self.declarations.clone(),
        ))
    }

    /// Warn when the networked tool service is unreachable
    pub async fn check_dispatcher(&self) -> bool {
        let healthy = self.dispatcher.health_check().await;
        if !healthy {
            warn!(
                "Tool service at {} is not responding; tool calls will fail until it is up",
                self.config.api_base_url
            );
        }
        healthy
    }
}
