//! HTTP fetcher built on `reqwest`.
//!
//! Issues a single GET per target. Redirects follow the client default and
//! certificate validation is off unless asked for, since most services found
//! by sweeping a range present self-signed certificates.

use super::traits::{FetchedResponse, Fetcher, FetcherFactory};
use crate::error::{NetworkError, ScanError, ScanResult};
use async_trait::async_trait;
use reqwest::Client;
use std::error::Error as StdError;
use std::time::Duration;

/// Default `User-Agent` header sent with every probe.
pub const DEFAULT_USER_AGENT: &str = concat!("httpsweep/", env!("CARGO_PKG_VERSION"));

/// Client settings shared by every fetcher of a scan.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Total time allowed for connect, request and body.
    pub timeout: Duration,
    pub user_agent: String,
    pub accept_invalid_certs: bool,
}

impl HttpConfig {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept_invalid_certs: true,
        }
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_certificate_checks(mut self, verify: bool) -> Self {
        self.accept_invalid_certs = !verify;
        self
    }
}

/// A fetcher owning one `reqwest::Client`.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &HttpConfig) -> ScanResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.timeout)
            .user_agent(config.user_agent.as_str())
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .pool_max_idle_per_host(1)
            .build()
            .map_err(|e| ScanError::Client(e.to_string()))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedResponse, NetworkError> {
        let response = self.client.get(url).send().await.map_err(classify)?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response.bytes().await.map_err(classify)?.to_vec();

        Ok(FetchedResponse {
            status,
            headers,
            body,
        })
    }
}

/// Builds an [`HttpFetcher`] per worker slot.
#[derive(Debug, Clone)]
pub struct HttpFetcherFactory {
    config: HttpConfig,
}

impl HttpFetcherFactory {
    pub fn new(config: HttpConfig) -> Self {
        Self { config }
    }
}

impl FetcherFactory for HttpFetcherFactory {
    fn build(&self) -> ScanResult<Box<dyn Fetcher>> {
        Ok(Box::new(HttpFetcher::new(&self.config)?))
    }
}

/// Map a reqwest failure onto a probe failure class.
fn classify(err: reqwest::Error) -> NetworkError {
    let message = error_chain(&err);
    let lower = message.to_lowercase();

    if err.is_timeout() || lower.contains("timed out") {
        NetworkError::Timeout(message)
    } else if ["certificate", "tls", "ssl", "handshake"]
        .iter()
        .any(|needle| lower.contains(needle))
    {
        NetworkError::Tls(message)
    } else if err.is_connect() {
        NetworkError::Connect(message)
    } else {
        NetworkError::Request(message)
    }
}

/// Join an error and its sources into one line.
fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}
