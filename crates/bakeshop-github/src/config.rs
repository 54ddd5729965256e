//! GitHub source configuration.

use std::time::Duration;

/// Default time responses stay cached: two days.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(2 * 24 * 60 * 60);

/// Configuration for a [`GithubSource`](crate::source::GithubSource).
#[derive(Debug, Clone)]
pub struct GithubConfig {
    /// API host.
    pub host: String,
    /// OAuth token. Sent as an `Authorization: token` header and as an
    /// `access_token` query parameter when set.
    pub token: Option<String>,
    /// How long fetched payloads and recorded failures stay valid.
    pub cache_ttl: Duration,
    /// Namespace prefix for cache keys.
    pub cache_prefix: String,
    /// Minimum spacing between external calls. Zero disables throttling.
    pub throttle: Duration,
    /// Per-request HTTP timeout.
    pub timeout: Duration,
    /// User agent sent with every request.
    pub user_agent: String,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            host: "api.github.com".to_string(),
            token: None,
            cache_ttl: DEFAULT_CACHE_TTL,
            cache_prefix: "github".to_string(),
            throttle: Duration::from_secs(1),
            timeout: Duration::from_secs(30),
            user_agent: format!("bakeshop/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl GithubConfig {
    /// Set the API host.
    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the OAuth token.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Set the cache TTL.
    #[must_use]
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Set the cache key prefix.
    #[must_use]
    pub fn with_cache_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.cache_prefix = prefix.into();
        self
    }

    /// Set the throttle interval. Zero disables throttling.
    #[must_use]
    pub fn with_throttle(mut self, throttle: Duration) -> Self {
        self.throttle = throttle;
        self
    }

    /// Set the HTTP timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
