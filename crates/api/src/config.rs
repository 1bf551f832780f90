use std::path::PathBuf;
use std::time::Duration;

use axum::http::HeaderValue;
use pricebridge_core::worker::invoker::WorkerCommand;

/// Errors raised while reading configuration from the environment.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} must be {expected}, got '{value}'")]
    Invalid {
        var: &'static str,
        expected: &'static str,
        value: String,
    },

    #[error("{0} must not be empty")]
    Empty(&'static str),

    #[error("Invalid CORS origin '{0}'")]
    InvalidOrigin(String),

    #[error("REQUEST_TIMEOUT_SECS ({request_secs}s) must exceed WORKER_TIMEOUT_MS ({worker_ms}ms)")]
    TimeoutOrder { request_secs: u64, worker_ms: u64 },
}

/// How to run the external prediction program.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Interpreter or binary to execute (default: `python3`).
    pub executable: PathBuf,
    /// Script handed to the executable as its first argument (default: `predict.py`).
    pub script: PathBuf,
    /// Wall-clock bound per worker invocation (default: 10 s).
    pub timeout: Duration,
}

impl WorkerConfig {
    pub fn command(&self) -> WorkerCommand {
        WorkerCommand::new(&self.executable, &self.script, self.timeout)
    }
}

/// Server configuration loaded from environment variables.
///
/// Built once at startup and immutable afterwards.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `5000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// Outer HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Prediction worker invocation.
    pub worker: WorkerConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                                  |
    /// |------------------------|------------------------------------------|
    /// | `HOST`                 | `0.0.0.0`                                |
    /// | `PORT`                 | `5000`                                   |
    /// | `CORS_ORIGINS`         | `https://houseprice-deploy.onrender.com` |
    /// | `WORKER_EXECUTABLE`    | `python3`                                |
    /// | `WORKER_SCRIPT`        | `predict.py`                             |
    /// | `WORKER_TIMEOUT_MS`    | `10000`                                  |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                                     |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Same as [`ServerConfig::from_env`], reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.to_string());

        let host = var("HOST", "0.0.0.0");
        let port: u16 = parse_var("PORT", var("PORT", "5000"), "a valid port number")?;

        let cors_origins: Vec<String> = var("CORS_ORIGINS", "https://houseprice-deploy.onrender.com")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if cors_origins.is_empty() {
            return Err(ConfigError::Empty("CORS_ORIGINS"));
        }
        if let Some(bad) = cors_origins
            .iter()
            .find(|o| HeaderValue::from_str(o).is_err())
        {
            return Err(ConfigError::InvalidOrigin(bad.clone()));
        }

        let executable = var("WORKER_EXECUTABLE", "python3");
        if executable.trim().is_empty() {
            return Err(ConfigError::Empty("WORKER_EXECUTABLE"));
        }
        let script = var("WORKER_SCRIPT", "predict.py");
        if script.trim().is_empty() {
            return Err(ConfigError::Empty("WORKER_SCRIPT"));
        }

        let worker_timeout_ms: u64 = parse_var(
            "WORKER_TIMEOUT_MS",
            var("WORKER_TIMEOUT_MS", "10000"),
            "a positive number of milliseconds",
        )?;
        if worker_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                var: "WORKER_TIMEOUT_MS",
                expected: "a positive number of milliseconds",
                value: "0".to_string(),
            });
        }

        let request_timeout_secs: u64 = parse_var(
            "REQUEST_TIMEOUT_SECS",
            var("REQUEST_TIMEOUT_SECS", "30"),
            "a number of seconds",
        )?;
        if request_timeout_secs.saturating_mul(1000) <= worker_timeout_ms {
            return Err(ConfigError::TimeoutOrder {
                request_secs: request_timeout_secs,
                worker_ms: worker_timeout_ms,
            });
        }

        Ok(Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            worker: WorkerConfig {
                executable: executable.into(),
                script: script.into(),
                timeout: Duration::from_millis(worker_timeout_ms),
            },
        })
    }
}

fn parse_var<T: std::str::FromStr>(
    var: &'static str,
    value: String,
    expected: &'static str,
) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid {
            var,
            expected,
            value,
        })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
