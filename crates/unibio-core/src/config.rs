//! Environment Configuration
//!
//! Two layers:
//!
//! 1. `load_environment()` copies `KEY=VALUE` lines from an environment file
//!    into the process environment (never overriding variables that are
//!    already set).
//! 2. `AppConfig::from_env()` resolves every setting once at startup. The
//!    resulting value is passed into constructors; nothing below the binary
//!    reads the environment on its own.
//!
//! ```rust,no_run
//! use unibio_core::config::{load_environment, AppConfig};
//!
//! load_environment();
//! let config = AppConfig::from_env().expect("invalid configuration");
//! ```

use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::types::LatencyClass;

/// Environment file paths, checked in order
pub const ENV_FILE_PATHS: &[&str] = &["/etc/unibio/environment", "/etc/unibio.env", ".env"];

/// Override for the environment file location
pub const ENV_FILE_VAR: &str = "UNIBIO_ENV_FILE";

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_BIND: &str = "0.0.0.0:8000";
pub const DEFAULT_MAX_ITERATIONS: usize = 5;

/// Load environment variables from the first environment file found.
///
/// Returns the path that was loaded, or None if no file was found.
pub fn load_environment() -> Option<String> {
    if let Ok(custom_path) = std::env::var(ENV_FILE_VAR) {
        if let Some(path) = try_load_env_file(&custom_path) {
            return Some(path);
        }
    }

    for path in ENV_FILE_PATHS {
        if let Some(loaded_path) = try_load_env_file(path) {
            return Some(loaded_path);
        }
    }

    debug!("No environment file found, using existing environment");
    None
}

fn try_load_env_file(path: &str) -> Option<String> {
    if !Path::new(path).exists() {
        return None;
    }

    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            warn!("Failed to read environment file {}: {}", path, e);
            return None;
        }
    };

    let mut loaded = 0;
    let mut skipped = 0;
    for (key, value) in content.lines().filter_map(parse_env_line) {
        if std::env::var(&key).is_ok() {
            skipped += 1;
            continue;
        }
        debug!(key = %key, secret = is_secret(&key), "Loaded environment variable");
        std::env::set_var(&key, &value);
        loaded += 1;
    }

    info!(
        "Loaded {} environment variables from {} ({} already set)",
        loaded, path, skipped
    );
    Some(path.to_string())
}

fn is_secret(key: &str) -> bool {
    key.contains("KEY") || key.contains("TOKEN") || key.contains("SECRET")
}

/// Parse a single `KEY=VALUE` line. Comments and blank lines yield None.
fn parse_env_line(line: &str) -> Option<(String, String)> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    let line = line.strip_prefix("export ").unwrap_or(line);

    let (key, value) = line.split_once('=')?;
    let key = key.trim();
    let value = value.trim();
    if key.is_empty() {
        return None;
    }

    let value = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
        .unwrap_or(value);

    Some((key.to_string(), value.to_string()))
}

/// Which tool dispatch strategy the chat front-end uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DispatchBackend {
    /// Call handlers in-process
    #[default]
    Direct,
    /// Call the tool service over HTTP
    Http,
}

impl FromStr for DispatchBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "direct" | "local" => Ok(DispatchBackend::Direct),
            "http" | "api" | "remote" => Ok(DispatchBackend::Http),
            other => Err(Error::configuration(format!(
                "unknown dispatch backend '{}' (expected 'direct' or 'http')",
                other
            ))),
        }
    }
}

impl std::fmt::Display for DispatchBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DispatchBackend::Direct => write!(f, "direct"),
            DispatchBackend::Http => write!(f, "http"),
        }
    }
}

/// Settings resolved once at process start
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub gemini_api_key: Option<String>,
    pub default_model: String,
    /// Base URL of the tool service used by the HTTP dispatch backend
    pub api_base_url: String,
    pub bind: String,
    pub tool_timeout: Duration,
    pub slow_tool_timeout: Duration,
    pub model_timeout: Duration,
    pub max_iterations: usize,
    pub backend: DispatchBackend,
    pub ncbi_email: Option<String>,
    pub ncbi_api_key: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            gemini_api_key: None,
            default_model: DEFAULT_MODEL.to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            bind: DEFAULT_BIND.to_string(),
            tool_timeout: Duration::from_secs(30),
            slow_tool_timeout: Duration::from_secs(60),
            model_timeout: Duration::from_secs(120),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            backend: DispatchBackend::Direct,
            ncbi_email: None,
            ncbi_api_key: None,
        }
    }
}

impl AppConfig {
    /// Resolve configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let secs = |key: &str, default: Duration| -> Result<Duration> {
            match get(key) {
                Some(raw) => raw
                    .parse::<u64>()
                    .ok()
                    .filter(|s| *s > 0)
                    .map(Duration::from_secs)
                    .ok_or_else(|| {
                        Error::configuration(format!("{} must be a positive number of seconds, got '{}'", key, raw))
                    }),
                None => Ok(default),
            }
        };

        let max_iterations = match get("MAX_ITERATIONS") {
            Some(raw) => raw.parse::<usize>().map_err(|_| {
                Error::configuration(format!("MAX_ITERATIONS must be an integer, got '{}'", raw))
            })?,
            None => defaults.max_iterations,
        };

        let backend = match get("DISPATCH_BACKEND") {
            Some(raw) => raw.parse()?,
            None => defaults.backend,
        };

        Ok(Self {
            gemini_api_key: get("GEMINI_API_KEY").or_else(|| get("GOOGLE_API_KEY")),
            default_model: get("DEFAULT_GEMINI_MODEL").unwrap_or(defaults.default_model),
            api_base_url: get("API_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.api_base_url),
            bind: get("UNIBIO_BIND").unwrap_or(defaults.bind),
            tool_timeout: secs("TOOL_TIMEOUT_SECS", defaults.tool_timeout)?,
            slow_tool_timeout: secs("SLOW_TOOL_TIMEOUT_SECS", defaults.slow_tool_timeout)?,
            model_timeout: secs("MODEL_TIMEOUT_SECS", defaults.model_timeout)?,
            max_iterations,
            backend,
            ncbi_email: get("NCBI_EMAIL"),
            ncbi_api_key: get("NCBI_API_KEY"),
        })
    }

    /// The Gemini API key, or a configuration error naming the variable.
    pub fn require_api_key(&self) -> Result<&str> {
        self.gemini_api_key.as_deref().ok_or_else(|| {
            Error::configuration("GEMINI_API_KEY is not set; add it to the environment or a .env file")
        })
    }

    pub fn timeout_for(&self, latency: LatencyClass) -> Duration {
        match latency {
            LatencyClass::Fast => self.tool_timeout,
            LatencyClass::Slow => self.slow_tool_timeout,
        }
    }
}
