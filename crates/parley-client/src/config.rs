use std::str::FromStr;
use std::time::Duration;

use crate::errors::ClientError;

/// Default backend used by the mobile client.
pub const DEFAULT_BASE_URL: &str = "https://hammad712-rohde-auth.hf.space";

/// How response bodies of streaming endpoints are delivered to the parser.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DeliveryMode {
    /// Read the body chunk by chunk and decode records as they arrive.
    #[default]
    Streamed,
    /// Wait for the whole body, then decode every record in order.
    ///
    /// Used when the transport cannot expose a readable body stream.
    Buffered,
}

impl FromStr for DeliveryMode {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "streamed" | "stream" | "incremental" => Ok(Self::Streamed),
            "buffered" | "buffer" => Ok(Self::Buffered),
            other => Err(ClientError::Config(format!(
                "unknown delivery mode `{other}` (expected `streamed` or `buffered`)"
            ))),
        }
    }
}

/// Configuration carried by a [`crate::Client`].
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Base URL of the backend, without a trailing path.
    pub base_url: String,
    /// Bearer token attached to every request when present.
    pub access_token: Option<String>,
    /// Timeout for request/response calls (login, profile).
    pub timeout: Duration,
    /// Timeout for establishing connections.
    pub connect_timeout: Duration,
    /// Maximum quiet period while reading a streamed body.
    ///
    /// `None` waits forever, which matches the mobile client.
    pub idle_timeout: Option<Duration>,
    /// Body delivery strategy for streaming endpoints.
    pub delivery: DeliveryMode,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            access_token: None,
            timeout: Duration::from_secs(120),
            connect_timeout: Duration::from_secs(10),
            idle_timeout: None,
            delivery: DeliveryMode::Streamed,
        }
    }
}

impl ClientConfig {
    /// Creates a config for the given backend with defaults for everything else.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Builds a config from `PARLEY_*` environment variables.
    ///
    /// - `PARLEY_BASE_URL`: backend base URL.
    /// - `PARLEY_ACCESS_TOKEN`: bearer token.
    /// - `PARLEY_TIMEOUT_SECS`: request timeout.
    /// - `PARLEY_IDLE_TIMEOUT_SECS`: stream idle timeout.
    /// - `PARLEY_DELIVERY`: `streamed` or `buffered`.
    pub fn from_env() -> Result<Self, ClientError> {
        let mut config = Self::default();
        if let Some(base_url) = env_value("PARLEY_BASE_URL") {
            config.base_url = base_url;
        }
        config.access_token = env_value("PARLEY_ACCESS_TOKEN");
        if let Some(secs) = env_value("PARLEY_TIMEOUT_SECS") {
            config.timeout = Duration::from_secs(parse_secs("PARLEY_TIMEOUT_SECS", &secs)?);
        }
        if let Some(secs) = env_value("PARLEY_IDLE_TIMEOUT_SECS") {
            config.idle_timeout = Some(Duration::from_secs(parse_secs(
                "PARLEY_IDLE_TIMEOUT_SECS",
                &secs,
            )?));
        }
        if let Some(mode) = env_value("PARLEY_DELIVERY") {
            config.delivery = mode.parse()?;
        }
        config.validate()?;
        Ok(config)
    }

    /// Overrides the base URL.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Sets the bearer token.
    pub fn access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Overrides the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the stream idle timeout.
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = Some(timeout);
        self
    }

    /// Selects the body delivery strategy.
    pub fn delivery(mut self, delivery: DeliveryMode) -> Self {
        self.delivery = delivery;
        self
    }

    pub(crate) fn validate(&self) -> Result<(), ClientError> {
        let base = self.base_url.trim();
        if base.is_empty() {
            return Err(ClientError::Config("base_url must not be empty".into()));
        }
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(ClientError::Config(format!(
                "base_url must start with http:// or https:// (got `{base}`)"
            )));
        }
        Ok(())
    }

    /// Joins `path` onto the base URL.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_secs(key: &str, raw: &str) -> Result<u64, ClientError> {
    raw.parse()
        .map_err(|_| ClientError::Config(format!("{key} must be a whole number of seconds")))
}
