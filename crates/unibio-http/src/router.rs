//! Router Composition
//!
//! Each crate implements ServiceRouter to expose its routes; the service
//! binary nests them here.

use axum::Router;
use tracing::info;

/// Trait for crates that provide HTTP routes
///
/// ```ignore
/// pub struct ToolsServiceRouter;
///
/// impl ServiceRouter for ToolsServiceRouter {
///     fn prefix() -> &'static str {
///         "/api/tools"
///     }
///
///     fn name() -> &'static str {
///         "tools"
///     }
/// }
/// ```
pub trait ServiceRouter: Send + Sync {
    /// The URL prefix for this service (e.g., "/api/chat")
    fn prefix() -> &'static str;

    /// Service name for logging
    fn name() -> &'static str;

    fn description() -> &'static str {
        ""
    }
}

/// Builder for composing multiple service routers
pub struct RouterBuilder {
    router: Router,
    services: Vec<(&'static str, &'static str)>, // (prefix, name)
}

impl RouterBuilder {
    pub fn new() -> Self {
        Self {
            router: Router::new(),
            services: Vec::new(),
        }
    }

    /// Add a router at a specific prefix
    pub fn nest(mut self, prefix: &'static str, name: &'static str, router: Router) -> Self {
        info!("Mounting service '{}' at {}", name, prefix);
        self.router = self.router.nest(prefix, router);
        self.services.push((prefix, name));
        self
    }

    /// Mount a router under the prefix its `ServiceRouter` declares
    pub fn service<S: ServiceRouter>(self, router: Router) -> Self {
        self.nest(S::prefix(), S::name(), router)
    }

    /// Add a route directly to the root router
    pub fn route(mut self, path: &str, method_router: axum::routing::MethodRouter) -> Self {
        self.router = self.router.route(path, method_router);
        self
    }

    /// Merge another router (no prefix)
    pub fn merge(mut self, router: Router) -> Self {
        self.router = self.router.merge(router);
        self
    }

    /// Get list of mounted services
    pub fn services(&self) -> &[(&'static str, &'static str)] {
        &self.services
    }

    pub fn build(self) -> Router {
        self.router
    }
}

impl Default for RouterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::routing::get;
    use tower::ServiceExt;

    struct EchoService;

    impl ServiceRouter for EchoService {
        fn prefix() -> &'static str {
            "/api/echo"
        }

        fn name() -> &'static str {
            "echo"
        }
    }

    #[tokio::test]
    async fn test_nested_services() {
        let builder = RouterBuilder::new()
            .service::<EchoService>(Router::new().route("/ping", get(|| async { "pong" })))
            .route("/health", get(|| async { "ok" }));
        assert_eq!(builder.services(), &[("/api/echo", "echo")]);

        let app = builder.build();
        let response = app
            .clone()
            .oneshot(Request::get("/api/echo/ping").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(Request::get("/missing").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
