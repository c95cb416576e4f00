//! Blocking HTTP client for http plan steps.

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use reqwest::Method;
use reqwest::blocking::Client;
use tracing::{debug, instrument, warn};

/// Status and body of a completed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status_code: u16,
    pub body: String,
}

/// HTTP client with a fixed per-request timeout.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    timeout: Duration,
}

impl HttpClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("build http client")?;
        Ok(Self { client, timeout })
    }

    /// Issue a request. Any status code is a response; only transport failures are errors.
    #[instrument(
        skip_all,
        fields(method = %method, url = %url, timeout_secs = self.timeout.as_secs())
    )]
    pub fn request(&self, method: &str, url: &str, body: Option<&str>) -> Result<HttpResponse> {
        let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
            .map_err(|_| anyhow!("invalid http method '{method}'"))?;
        let mut request = self.client.request(method.clone(), url);
        if let Some(body) = body {
            request = request.body(body.to_string());
        }

        debug!("sending request");
        let response = request.send().map_err(|err| {
            warn!(err = %err, "http request failed");
            anyhow!("{method} {url}: {err}")
        })?;
        let status_code = response.status().as_u16();
        let body = response
            .text()
            .with_context(|| format!("read body of {method} {url}"))?;
        debug!(status_code, body_len = body.len(), "response received");
        Ok(HttpResponse { status_code, body })
    }
}
