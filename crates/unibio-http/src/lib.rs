//! unibio-http: Central HTTP Server
//!
//! All HTTP handling for unibio lives here. Other crates export routers
//! that get composed here.
//!
//! Architecture:
//! ```text
//! unibio-service binary
//!     └── unibio-http (this crate)
//!         ├── Middleware stack (CORS, tracing, compression, timeout)
//!         └── Router composition
//!             ├── /health       → service status
//!             ├── /api/tools/*  → unibio_tools::create_router()
//!             └── /api/chat/*   → unibio_chat::create_router()
//! ```

pub mod middleware;
pub mod router;
pub mod server;

// Re-export main types
pub use middleware::{MiddlewareConfig, MiddlewareStack, REQUEST_ID_HEADER};
pub use router::{RouterBuilder, ServiceRouter};
pub use server::{HttpServer, HttpServerBuilder, ServerConfig};

// Re-export axum for convenience - other crates use this
pub use axum;
pub use tower;
pub use tower_http;

/// Error types for the HTTP server
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Invalid bind address '{0}'")]
    InvalidAddress(String),

    #[error("Server binding error: {0}")]
    BindError(#[from] std::io::Error),

    #[error("Router configuration error: {0}")]
    RouterError(String),
}

pub type Result<T> = std::result::Result<T, ServerError>;

/// Prelude for convenient imports by other crates
pub mod prelude {
    pub use super::axum::{
        extract::{Json, Path, Query, State},
        response::{IntoResponse, Response},
        routing::{delete, get, post, put},
        Router,
    };
    pub use super::middleware::{MiddlewareConfig, MiddlewareStack};
    pub use super::router::{RouterBuilder, ServiceRouter};
    pub use super::server::{HttpServer, HttpServerBuilder, ServerConfig};
    pub use super::Result;
}
