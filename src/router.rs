//! Diagnostic report fetch from the local router.

use reqwest::header::{HeaderMap, HeaderValue};

/// Source of raw diagnostic report bytes.
#[allow(async_fn_in_trait)]
pub trait DiagnosticSource {
    /// Fetch the current diagnostic report as raw bytes.
    async fn fetch_report(&self) -> Result<Vec<u8>, RouterError>;
}

/// Router fetch error types.
#[derive(Debug)]
pub enum RouterError {
    /// Network/HTTP error
    Network(String),
    /// The router answered with a non-success status
    Status(u16),
}

impl std::fmt::Display for RouterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RouterError::Network(msg) => write!(f, "Router network error: {msg}"),
            RouterError::Status(status) => write!(f, "Router returned status {status}"),
        }
    }
}

impl std::error::Error for RouterError {}

/// HTTP client for the router's diagnostic report endpoint.
pub struct RouterClient {
    client: reqwest::Client,
    url: String,
}

impl RouterClient {
    /// Create a client for the given report URL.
    ///
    /// Certificate validation is disabled: the endpoint is a local device
    /// with a self-signed certificate.
    pub fn new(url: impl Into<String>) -> Result<Self, RouterError> {
        let client = reqwest::Client::builder()
            .default_headers(browser_headers())
            .danger_accept_invalid_certs(true)
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| RouterError::Network(e.to_string()))?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

impl DiagnosticSource for RouterClient {
    async fn fetch_report(&self) -> Result<Vec<u8>, RouterError> {
        tracing::info!(url = %self.url, "Getting diagnostic report from router");
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| RouterError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RouterError::Status(status.as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| RouterError::Network(e.to_string()))?;
        Ok(body.to_vec())
    }
}

/// Headers mimicking a browser session.
///
/// The router only serves the diagnostic report to what looks like a browser;
/// these values were captured from a real session and must be reproduced
/// verbatim.
fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("Connection", HeaderValue::from_static("keep-alive"));
    headers.insert("Upgrade-Insecure-Requests", HeaderValue::from_static("1"));
    headers.insert(
        "User-Agent",
        HeaderValue::from_static(
            "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) \
             Chrome/76.0.3809.100 Safari/537.36",
        ),
    );
    headers.insert(
        "Accept",
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,image/apng,\
             */*;q=0.8,application/signed-exchange;v=b3",
        ),
    );
    headers.insert("Accept-Encoding", HeaderValue::from_static("gzip, deflate"));
    headers.insert(
        "Accept-Language",
        HeaderValue::from_static("en-US,en;q=0.9,it;q=0.8"),
    );
    headers
}
