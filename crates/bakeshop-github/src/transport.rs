//! HTTP transport for the GitHub API.

use crate::config::GithubConfig;
use crate::error::{Result, SourceError};
use http::StatusCode;
use reqwest::{
    Client,
    header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT},
};
use std::future::Future;
use std::pin::Pin;
use tracing::debug;
use url::Url;

/// Raw response a transport hands back.
///
/// Non-2xx statuses are data here, not errors; only transport faults
/// (DNS, TLS, timeouts) surface as `Err` from [`ApiTransport::get`].
#[derive(Debug, Clone)]
pub struct RawResponse {
    /// HTTP status code.
    pub status: StatusCode,
    /// Canonical reason phrase, when known.
    pub reason: Option<String>,
    /// Response body as text.
    pub body: String,
}

/// Abstraction over the HTTP layer so sources can be exercised without a
/// network.
pub trait ApiTransport: Send + Sync {
    /// Issue a GET request.
    ///
    /// # Errors
    /// Returns an error only for transport faults; HTTP error statuses
    /// come back as a normal [`RawResponse`].
    fn get<'a>(
        &'a self,
        url: &'a Url,
    ) -> Pin<Box<dyn Future<Output = Result<RawResponse>> + Send + 'a>>;
}

/// Production transport backed by reqwest.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    headers: HeaderMap,
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("client", &"reqwest::Client")
            .finish()
    }
}

impl HttpTransport {
    /// Build a transport from source configuration.
    ///
    /// # Errors
    /// Returns error if the client cannot be built.
    pub fn new(config: &GithubConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(config.timeout)
            .timeout(config.timeout)
            .tcp_nodelay(true)
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| SourceError::Config {
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            headers: default_headers(config),
        })
    }
}

fn default_headers(config: &GithubConfig) -> HeaderMap {
    let mut headers = HeaderMap::new();

    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    if let Ok(ua) = HeaderValue::from_str(&config.user_agent) {
        headers.insert(USER_AGENT, ua);
    }

    if let Some(token) = &config.token
        && let Ok(value) = HeaderValue::from_str(&format!("token {token}"))
    {
        headers.insert(AUTHORIZATION, value);
    }

    headers
}

impl ApiTransport for HttpTransport {
    fn get<'a>(
        &'a self,
        url: &'a Url,
    ) -> Pin<Box<dyn Future<Output = Result<RawResponse>> + Send + 'a>> {
        Box::pin(async move {
            debug!(url = %url, "GET request starting");

            let response = self
                .client
                .get(url.as_str())
                .headers(self.headers.clone())
                .send()
                .await
                .map_err(|e| SourceError::Network {
                    url: url.to_string(),
                    message: e.to_string(),
                })?;

            let status = response.status();
            let reason = status.canonical_reason().map(str::to_owned);

            debug!(url = %url, status = %status, "GET request completed");

            let body = response.text().await.map_err(|e| SourceError::Network {
                url: url.to_string(),
                message: e.to_string(),
            })?;

            Ok(RawResponse {
                status,
                reason,
                body,
            })
        })
    }
}
