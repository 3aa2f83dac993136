//! UniBio Service
//!
//! Single binary exposing the molecular-biology agent:
//! - HTTP API (tool catalog at /api/tools, chat at /api/chat)
//! - Interactive terminal chat
//! - One-shot questions from the command line

use anyhow::{bail, Result};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use unibio_chat::{ChatReply, ChatServiceRouter, ChatState, SessionManager};
use unibio_core::{AppConfig, DispatchBackend};
use unibio_http::axum;
use unibio_http::prelude::*;
use unibio_tools::{ToolsServiceRouter, ToolsState};

mod app;
mod repl;

use app::App;

#[derive(Parser, Debug)]
#[command(name = "unibio-service")]
#[command(about = "Molecular biology assistant: tool service, chat API and terminal chat")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Tool dispatch backend (direct or http)
    #[arg(long, global = true)]
    backend: Option<String>,

    /// Model used for new conversations
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// Upper bound on tool-execution rounds per message
    #[arg(long, global = true)]
    max_iterations: Option<usize>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Run the HTTP server (default)
    Serve {
        /// Bind address (host:port)
        #[arg(short, long)]
        bind: Option<String>,

        /// Disable CORS
        #[arg(long)]
        no_cors: bool,

        /// Disable compression
        #[arg(long)]
        no_compression: bool,

        /// Per-request timeout in seconds
        #[arg(long, default_value = "300")]
        request_timeout: u64,
    },
    /// Interactive chat in the terminal
    Chat,
    /// Ask a single question and print the answer
    Ask {
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
    },
    /// List the tool catalog
    Tools {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

impl Args {
    fn apply_overrides(&self, config: &mut AppConfig) -> Result<()> {
        if let Some(backend) = &self.backend {
            config.backend = backend.parse::<DispatchBackend>()?;
        }
        if let Some(model) = &self.model {
            config.default_model = model.clone();
        }
        if let Some(max) = self.max_iterations {
            config.max_iterations = max;
        }
        if let Some(Commands::Serve { bind: Some(bind), .. }) = &self.command {
            config.bind = bind.clone();
        }
        Ok(())
    }

    fn is_interactive(&self) -> bool {
        matches!(
            self.command,
            Some(Commands::Chat) | Some(Commands::Ask { .. }) | Some(Commands::Tools { .. })
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from UNIBIO_ENV_FILE, /etc/unibio or .env (if present)
    let env_file = unibio_core::config::load_environment();

    let args = Args::parse();

    // Terminal commands stay quiet unless RUST_LOG says otherwise
    let level = if args.is_interactive() { "warn" } else { "info" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("unibio_service={}", level).parse()?)
                .add_directive(format!("unibio_http={}", level).parse()?)
                .add_directive(format!("unibio_chat={}", level).parse()?)
                .add_directive(format!("unibio_tools={}", level).parse()?)
                .add_directive(format!("unibio_llm={}", level).parse()?)
                .add_directive("tower_http=info".parse()?),
        )
        .init();

    if let Some(path) = env_file {
        info!("Loaded environment from {}", path);
    }

    let mut config = AppConfig::from_env()?;
    args.apply_overrides(&mut config)?;
    info!(
        "Dispatch backend: {}, default model: {}",
        config.backend, config.default_model
    );

    let app = App::build(config)?;

    match args.command {
        Some(Commands::Chat) => {
            let factory = app.agent_factory()?;
            app.check_dispatcher().await;
            repl::run(factory.create(None)).await
        }
        Some(Commands::Ask { question }) => ask(&app, &question.join(" ")).await,
        Some(Commands::Tools { json }) => print_tools(&app, json),
        Some(Commands::Serve {
            no_cors,
            no_compression,
            request_timeout,
            ..
        }) => serve(app, !no_cors, !no_compression, request_timeout).await,
        None => serve(app, true, true, 300).await,
    }
}

async fn serve(app: App, cors: bool, compression: bool, request_timeout: u64) -> Result<()> {
    info!("Starting UniBio Service...");

    let mut router_builder = RouterBuilder::new();

    // Mount Tools (the HTTP dispatch backend calls these)
    {
        let tools_state = ToolsState::new(app.executor.clone());
        router_builder = router_builder
            .service::<ToolsServiceRouter>(unibio_tools::create_router(tools_state));
    }

    // Mount Chat
    match app.agent_factory() {
        Ok(factory) => {
            let sessions = Arc::new(SessionManager::new(factory));
            router_builder = router_builder.service::<ChatServiceRouter>(
                unibio_chat::create_router(ChatState::new(sessions)),
            );
        }
        Err(e) => warn!("Chat API disabled: {:#}", e),
    }

    let endpoints: Vec<String> = router_builder
        .services()
        .iter()
        .map(|(prefix, _)| prefix.to_string())
        .chain(["/health".to_string()])
        .collect();
    let info_body = Arc::new(serde_json::json!({
        "status": "healthy",
        "service": "unibio-service",
        "version": env!("CARGO_PKG_VERSION"),
        "available_endpoints": endpoints,
    }));

    let root_body = info_body.clone();
    router_builder = router_builder
        .route("/", get(move || service_info(root_body.clone())))
        .route("/health", get(move || service_info(info_body.clone())));

    let server = HttpServer::builder()
        .bind(app.config.bind.clone())
        .router(router_builder.build())
        .middleware(
            MiddlewareConfig::new()
                .timeout(Duration::from_secs(request_timeout))
                .compression(compression),
        )
        .cors(cors)
        .build()?;

    if app.config.backend == DispatchBackend::Http {
        // The tool service may be this very process, so only log
        let dispatcher = app.dispatcher.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            if !dispatcher.health_check().await {
                warn!("Tool service is not responding to health checks yet");
            }
        });
    }

    server.serve_with_shutdown(shutdown_signal()).await?;
    Ok(())
}

async fn service_info(body: Arc<serde_json::Value>) -> axum::Json<serde_json::Value> {
    axum::Json((*body).clone())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}

async fn ask(app: &App, question: &str) -> Result<()> {
    let factory = app.agent_factory()?;
    app.check_dispatcher().await;
    let mut agent = factory.create(None);

    match agent.send(question).await {
        ChatReply::Answered(answer) => {
            println!("{}", answer.response);
            if !answer.function_calls.is_empty() {
                let names: Vec<&str> = answer
                    .function_calls
                    .iter()
                    .map(|c| c.tool_name.as_str())
                    .collect();
                eprintln!(
                    "\n[{} | {} round(s) | tools: {}]",
                    answer.model,
                    answer.iterations,
                    names.join(", ")
                );
            }
            Ok(())
        }
        ChatReply::Failed(failure) => bail!("{}", failure.error),
    }
}

fn print_tools(app: &App, json: bool) -> Result<()> {
    let registry = app.executor.registry();
    if json {
        let tools: Vec<serde_json::Value> = registry
            .tools()
            .iter()
            .map(|tool| {
                serde_json::json!({
                    "name": tool.name(),
                    "description": tool.description(),
                    "category": tool.category(),
                    "latency": tool.latency().to_string(),
                    "parameters": tool.schema().parameters_json(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&tools)?);
        return Ok(());
    }

    println!("{:<28} {:<12} {:<6} DESCRIPTION", "NAME", "CATEGORY", "SPEED");
    for tool in registry.tools() {
        let description = tool.description().lines().next().unwrap_or_default();
        println!(
            "{:<28} {:<12} {:<6} {}",
            tool.name(),
            tool.category(),
            tool.latency().to_string(),
            description
        );
    }
    println!("\n{} tools", registry.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides() {
        let args = Args::parse_from([
            "unibio-service",
            "--backend",
            "http",
            "--model",
            "gemini-2.5-pro",
            "--max-iterations",
            "7",
            "serve",
            "--bind",
            "127.0.0.1:9001",
        ]);
        let mut config = AppConfig::from_lookup(|_| None).unwrap();
        args.apply_overrides(&mut config).unwrap();
        assert_eq!(config.backend, DispatchBackend::Http);
        assert_eq!(config.default_model, "gemini-2.5-pro");
        assert_eq!(config.max_iterations, 7);
        assert_eq!(config.bind, "127.0.0.1:9001");
        assert!(!args.is_interactive());
    }

    #[test]
    fn test_bad_backend_rejected() {
        let args = Args::parse_from(["unibio-service", "--backend", "carrier-pigeon", "tools"]);
        let mut config = AppConfig::from_lookup(|_| None).unwrap();
        tokio_test::assert_err!(args.apply_overrides(&mut config));
        assert!(args.is_interactive());
    }

    #[test]
    fn test_ask_collects_words() {
        let args = Args::parse_from(["unibio-service", "ask", "what", "is", "EcoRI?"]);
        match args.command {
            Some(Commands::Ask { question }) => assert_eq!(question.join(" "), "what is EcoRI?"),
            other => panic!("unexpected command {:?}", other),
        }
    }
}
