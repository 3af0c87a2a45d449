//! Environment-based exporter configuration.

use std::net::SocketAddr;

use thiserror::Error;

/// Exit status for fatal configuration errors (EX_CONFIG).
pub const EXIT_CONFIG_ERROR: i32 = 78;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value {value:?} for {var}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format {other:?}")),
        }
    }
}

/// Runtime configuration, sourced from environment variables at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Log verbosity (`LOG_LEVEL`, default `info`).
    pub log_level: String,
    /// Log output format (`LOG_FORMAT`, `text` or `json`, default `text`).
    pub log_format: LogFormat,
    /// Typesense admin API key (`TYPESENSE_API_KEY`, required).
    pub api_key: String,
    /// Typesense host (`TYPESENSE_HOST`, required).
    pub host: String,
    /// Typesense API port (`TYPESENSE_PORT`, default 8108).
    pub api_port: u16,
    /// Local port for the scrape endpoint (`METRICS_PORT`, default 9090).
    pub metrics_port: u16,
    /// Scheme used to reach Typesense (`TYPESENSE_PROTOCOL`, default `http`).
    pub protocol: String,
    /// Kubernetes namespace the exporter runs in (`POD_NAMESPACE`, default `~empty`).
    pub namespace: String,
    /// Cluster identity attached as a label to every sample
    /// (`TYPESENSE_CLUSTER`, required).
    pub cluster: String,
}

impl Config {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Read configuration through an arbitrary variable lookup.
    ///
    /// Tests inject a lookup here instead of mutating process-global
    /// environment state.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let config = Self {
            log_level: optional(&lookup, "LOG_LEVEL", "info"),
            log_format: log_format(&lookup)?,
            api_key: required(&lookup, "TYPESENSE_API_KEY")?,
            host: required(&lookup, "TYPESENSE_HOST")?,
            api_port: port(&lookup, "TYPESENSE_PORT", 8108)?,
            metrics_port: port(&lookup, "METRICS_PORT", 9090)?,
            protocol: optional(&lookup, "TYPESENSE_PROTOCOL", "http"),
            namespace: optional(&lookup, "POD_NAMESPACE", "~empty"),
            cluster: required(&lookup, "TYPESENSE_CLUSTER")?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate cross-field constraints.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.protocol != "http" && self.protocol != "https" {
            return Err(ConfigError::Invalid {
                var: "TYPESENSE_PROTOCOL",
                value: self.protocol.clone(),
                reason: "expected \"http\" or \"https\"".to_string(),
            });
        }
        Ok(())
    }

    /// Base URL of the upstream diagnostics API.
    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.protocol, self.host, self.api_port)
    }

    /// Address the scrape endpoint listens on.
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.metrics_port))
    }
}

fn optional(lookup: &impl Fn(&str) -> Option<String>, var: &str, default: &str) -> String {
    match lookup(var) {
        Some(value) if !value.is_empty() => value,
        _ => default.to_string(),
    }
}

fn required(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<String, ConfigError> {
    match lookup(var) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(ConfigError::Missing(var)),
    }
}

fn port(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: u16,
) -> Result<u16, ConfigError> {
    match lookup(var) {
        Some(raw) if !raw.is_empty() => match raw.parse() {
            Ok(port) => Ok(port),
            Err(_) => Err(ConfigError::Invalid {
                var,
                value: raw,
                reason: "expected a port number".to_string(),
            }),
        },
        _ => Ok(default),
    }
}

fn log_format(lookup: &impl Fn(&str) -> Option<String>) -> Result<LogFormat, ConfigError> {
    match lookup("LOG_FORMAT") {
        Some(raw) if !raw.is_empty() => raw.parse().map_err(|reason| ConfigError::Invalid {
            var: "LOG_FORMAT",
            value: raw,
            reason,
        }),
        _ => Ok(LogFormat::default()),
    }
}
