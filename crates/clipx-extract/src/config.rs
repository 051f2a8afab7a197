//! Extractor configuration.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Default strategy order: cheapest and least rate-limited first.
pub const DEFAULT_STRATEGIES: &[StrategyKind] = &[
    StrategyKind::Embed,
    StrategyKind::Syndication,
    StrategyKind::Authenticated,
];

/// Identifies one upstream retrieval strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyKind {
    /// HTML embed scrape through the rewritten embed host
    Embed,
    /// Public syndication JSON endpoint
    Syndication,
    /// Bearer-authenticated post lookup
    Authenticated,
    /// Bearer-authenticated legacy status lookup
    Legacy,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::Embed => "embed",
            StrategyKind::Syndication => "syndication",
            StrategyKind::Authenticated => "authenticated",
            StrategyKind::Legacy => "legacy",
        }
    }

    /// True if the strategy spends authenticated quota.
    pub fn requires_credentials(&self) -> bool {
        matches!(self, StrategyKind::Authenticated | StrategyKind::Legacy)
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "embed" | "embed_scrape" => Ok(StrategyKind::Embed),
            "syndication" => Ok(StrategyKind::Syndication),
            "authenticated" | "api" => Ok(StrategyKind::Authenticated),
            "legacy" => Ok(StrategyKind::Legacy),
            other => Err(ConfigError::UnknownStrategy(other.to_string())),
        }
    }
}

/// Parse a comma-separated strategy order, e.g. `embed,syndication,authenticated`.
pub fn parse_strategy_order(raw: &str) -> ConfigResult<Vec<StrategyKind>> {
    let order = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(StrategyKind::from_str)
        .collect::<ConfigResult<Vec<_>>>()?;

    if order.is_empty() {
        return Err(ConfigError::NoStrategies);
    }
    Ok(order)
}

/// Client id/secret pair for the credential exchange.
#[derive(Clone)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl ClientCredentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }
}

impl fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Upstream base URLs.
#[derive(Debug, Clone)]
pub struct Endpoints {
    /// Base for the token exchange, post lookup and legacy lookup
    pub api_base: String,
    /// Full URL of the syndication summary endpoint
    pub syndication_url: String,
    /// Embed host replacing twitter.com
    pub embed_twitter_base: String,
    /// Embed host replacing x.com
    pub embed_x_base: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            api_base: "https://api.twitter.com".to_string(),
            syndication_url: "https://cdn.syndication.twimg.com/tweet-result".to_string(),
            embed_twitter_base: "https://fxtwitter.com".to_string(),
            embed_x_base: "https://fixupx.com".to_string(),
        }
    }
}

impl Endpoints {
    /// Point every upstream at one base URL. Used by tests against a mock server.
    pub fn single_host(base: impl Into<String>) -> Self {
        let base = base.into().trim_end_matches('/').to_string();
        Self {
            api_base: base.clone(),
            syndication_url: format!("{}/tweet-result", base),
            embed_twitter_base: base.clone(),
            embed_x_base: base,
        }
    }

    pub fn token_url(&self) -> String {
        format!("{}/oauth2/token", self.api_base.trim_end_matches('/'))
    }

    pub fn post_lookup_url(&self, post_id: &str) -> String {
        format!("{}/2/tweets/{}", self.api_base.trim_end_matches('/'), post_id)
    }

    pub fn legacy_lookup_url(&self) -> String {
        format!("{}/1.1/statuses/show.json", self.api_base.trim_end_matches('/'))
    }
}

/// Extraction pipeline configuration.
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    /// Client credentials; authenticated strategies fail without them
    pub credentials: Option<ClientCredentials>,
    /// How long an assembled result is served from cache
    pub cache_ttl: Duration,
    /// Cache size bound (0 = unbounded)
    pub cache_max_entries: usize,
    /// Rate window length for the authenticated quota
    pub rate_window: Duration,
    /// Authenticated calls allowed per post per window
    pub rate_max_per_window: u32,
    /// Per-request HTTP timeout
    pub request_timeout: Duration,
    /// Connect timeout
    pub connect_timeout: Duration,
    /// Upper bound for a whole strategy attempt
    pub strategy_timeout: Duration,
    /// Validity horizon of an exchanged token
    pub token_ttl: Duration,
    /// Strategy order
    pub strategies: Vec<StrategyKind>,
    /// Upstream base URLs
    pub endpoints: Endpoints,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            credentials: None,
            cache_ttl: Duration::from_secs(60 * 60),
            cache_max_entries: 0,
            rate_window: Duration::from_secs(15 * 60),
            rate_max_per_window: 50,
            request_timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(5),
            strategy_timeout: Duration::from_secs(20),
            token_ttl: Duration::from_secs(60 * 60),
            strategies: DEFAULT_STRATEGIES.to_vec(),
            endpoints: Endpoints::default(),
        }
    }
}

impl ExtractorConfig {
    /// Create config from environment variables.
    pub fn from_env() -> ConfigResult<Self> {
        let defaults = Self::default();

        let credentials = match (
            non_empty_env("CLIPX_CLIENT_ID"),
            non_empty_env("CLIPX_CLIENT_SECRET"),
        ) {
            (Some(id), Some(secret)) => Some(ClientCredentials::new(id, secret)),
            _ => None,
        };

        let strategies = match non_empty_env("CLIPX_STRATEGIES") {
            Some(raw) => parse_strategy_order(&raw)?,
            None => defaults.strategies,
        };

        let rate_max_per_window: u32 = env_or("CLIPX_RATE_MAX_PER_WINDOW", defaults.rate_max_per_window)?;
        if rate_max_per_window == 0 {
            return Err(ConfigError::invalid("CLIPX_RATE_MAX_PER_WINDOW", "0"));
        }

        let endpoints = Endpoints {
            api_base: non_empty_env("CLIPX_API_BASE_URL").unwrap_or(defaults.endpoints.api_base),
            syndication_url: non_empty_env("CLIPX_SYNDICATION_URL")
                .unwrap_or(defaults.endpoints.syndication_url),
            embed_twitter_base: non_empty_env("CLIPX_EMBED_TWITTER_BASE")
                .unwrap_or(defaults.endpoints.embed_twitter_base),
            embed_x_base: non_empty_env("CLIPX_EMBED_X_BASE").unwrap_or(defaults.endpoints.embed_x_base),
        };

        Ok(Self {
            credentials,
            cache_ttl: env_secs("CLIPX_CACHE_TTL_SECS", defaults.cache_ttl)?,
            cache_max_entries: env_or("CLIPX_CACHE_MAX_ENTRIES", defaults.cache_max_entries)?,
            rate_window: env_secs("CLIPX_RATE_WINDOW_SECS", defaults.rate_window)?,
            rate_max_per_window,
            request_timeout: env_secs("CLIPX_REQUEST_TIMEOUT_SECS", defaults.request_timeout)?,
            connect_timeout: env_secs("CLIPX_CONNECT_TIMEOUT_SECS", defaults.connect_timeout)?,
            strategy_timeout: env_secs("CLIPX_STRATEGY_TIMEOUT_SECS", defaults.strategy_timeout)?,
            token_ttl: env_secs("CLIPX_TOKEN_TTL_SECS", defaults.token_ttl)?,
            strategies,
            endpoints,
        })
    }

    /// Rate window rounded up to whole minutes, as reported to callers.
    pub fn rate_window_minutes(&self) -> u64 {
        minutes_ceil(self.rate_window)
    }
}

/// Round a duration up to whole minutes.
pub fn minutes_ceil(duration: Duration) -> u64 {
    duration.as_secs().div_ceil(60)
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_or<T: FromStr>(key: &str, default: T) -> ConfigResult<T> {
    match non_empty_env(key) {
        Some(raw) => raw.parse().map_err(|_| ConfigError::invalid(key, raw)),
        None => Ok(default),
    }
}

fn env_secs(key: &str, default: Duration) -> ConfigResult<Duration> {
    env_or(key, default.as_secs()).map(Duration::from_secs)
}
