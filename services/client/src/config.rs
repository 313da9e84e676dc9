use tracing::Level;
use url::Url;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    /// The chat server's http(s) origin. `https` selects a `wss` socket.
    pub server_url: Url,
    /// The canonical locator the session id is written into.
    pub page_url: Url,
    pub auto_connect: bool,
    pub log_level: Level,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let server_url_str = std::env::var("CHATWIRE_SERVER_URL")
            .unwrap_or_else(|_| "http://localhost:8000".to_string());
        let server_url = parse_http_url("CHATWIRE_SERVER_URL", &server_url_str)?;

        let page_url = match std::env::var("CHATWIRE_PAGE_URL") {
            Ok(page) => parse_http_url("CHATWIRE_PAGE_URL", &page)?,
            Err(_) => server_url.join("frontend").map_err(|e| {
                ConfigError::InvalidValue("CHATWIRE_SERVER_URL".to_string(), e.to_string())
            })?,
        };

        let auto_connect = match std::env::var("CHATWIRE_AUTO_CONNECT") {
            Ok(value) => parse_bool("CHATWIRE_AUTO_CONNECT", &value)?,
            Err(_) => false,
        };

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        Ok(Self {
            server_url,
            page_url,
            auto_connect,
            log_level,
        })
    }
}

/// Parses an absolute http(s) URL, naming `var` in the error.
pub fn parse_http_url(var: &str, value: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidValue(var.to_string(), e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ConfigError::InvalidValue(
            var.to_string(),
            format!("unsupported scheme '{other}'"),
        )),
    }
}

fn parse_bool(var: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::InvalidValue(
            var.to_string(),
            format!("'{}' is not a boolean", value),
        )),
    }
}
