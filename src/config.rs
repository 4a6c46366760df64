use {
    crate::aggregator::MAX_DNS_EVENTS,
    std::{env, time::Duration},
};

const DEFAULT_API_URL: &str = "http://127.0.0.1:8080/api";
const WS_PATH: &str = "/ws/dns";

#[derive(Debug)]
pub enum ConfigError {
    MissingVariable(String),
    InvalidValue(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::MissingVariable(var) => write!(f, "Missing environment variable: {}", var),
            ConfigError::InvalidValue(msg) => write!(f, "Invalid configuration value: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// REST base, e.g. `http://127.0.0.1:8080/api`
    pub api_url: String,
    /// Push channel, e.g. `ws://127.0.0.1:8080/ws/dns`
    pub ws_url: String,
    /// DNS feed capacity
    pub max_dns_events: usize,
    pub http_timeout: Duration,
    pub reconnect_initial_secs: u64,
    pub reconnect_max_secs: u64,
    pub reconnect_max_retries: u32,
    pub rust_log: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `DASHBOARD_API_URL` (default: http://127.0.0.1:8080/api)
    /// - `DASHBOARD_WS_URL` (default: derived from the API URL, path /ws/dns)
    /// - `MAX_DNS_EVENTS` (default: 200)
    /// - `HTTP_TIMEOUT_SECS` (default: 10)
    /// - `RECONNECT_INITIAL_SECS` (default: 1)
    /// - `RECONNECT_MAX_SECS` (default: 30)
    /// - `RECONNECT_MAX_RETRIES` (default: 20)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup (process env, a parsed `.env`, a test map).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_url = lookup("DASHBOARD_API_URL")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        if !api_url.starts_with("http://") && !api_url.starts_with("https://") {
            return Err(ConfigError::InvalidValue(
                "DASHBOARD_API_URL must start with http:// or https://".to_string(),
            ));
        }

        let ws_url = match lookup("DASHBOARD_WS_URL").map(|s| s.trim().to_string()).filter(|s| !s.is_empty()) {
            Some(url) => url,
            None => derive_ws_url(&api_url)?,
        };

        if !ws_url.starts_with("ws://") && !ws_url.starts_with("wss://") {
            return Err(ConfigError::InvalidValue(
                "DASHBOARD_WS_URL must start with ws:// or wss://".to_string(),
            ));
        }

        let max_dns_events = parse_or(&lookup, "MAX_DNS_EVENTS", MAX_DNS_EVENTS);
        if max_dns_events == 0 {
            return Err(ConfigError::InvalidValue("MAX_DNS_EVENTS must be greater than 0".to_string()));
        }

        Ok(Self {
            api_url,
            ws_url,
            max_dns_events,
            http_timeout: Duration::from_secs(parse_or(&lookup, "HTTP_TIMEOUT_SECS", 10)),
            reconnect_initial_secs: parse_or(&lookup, "RECONNECT_INITIAL_SECS", 1),
            reconnect_max_secs: parse_or(&lookup, "RECONNECT_MAX_SECS", 30),
            reconnect_max_retries: parse_or(&lookup, "RECONNECT_MAX_RETRIES", 20),
            rust_log: lookup("RUST_LOG"),
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr + std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            log::warn!("Invalid {} '{}', defaulting to {}", key, raw, default);
            default
        }),
        None => default,
    }
}

/// `http://host:port/api` → `ws://host:port/ws/dns` (`https` → `wss`).
fn derive_ws_url(api_url: &str) -> Result<String, ConfigError> {
    let (scheme, rest) = if let Some(rest) = api_url.strip_prefix("https://") {
        ("wss", rest)
    } else if let Some(rest) = api_url.strip_prefix("http://") {
        ("ws", rest)
    } else {
        return Err(ConfigError::InvalidValue(format!("Cannot derive push URL from {}", api_url)));
    };

    let host = rest.split('/').next().unwrap_or_default();
    if host.is_empty() {
        return Err(ConfigError::MissingVariable("DASHBOARD_WS_URL".to_string()));
    }
    Ok(format!("{}://{}{}", scheme, host, WS_PATH))
}
