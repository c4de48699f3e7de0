//! HTTP Client Implementation using Reqwest

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy},
};
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

const USER_AGENT: &str = concat!("listsync-core/", env!("CARGO_PKG_VERSION"));

/// Reqwest-based HTTP client implementation
///
/// Provides HTTP operations with:
/// - Connection pooling via reqwest
/// - Automatic retry with exponential backoff on 429/5xx and transport errors
/// - TLS via rustls
pub struct ReqwestHttpClient {
    client: Client,
    /// URL probed by `is_connected`; without one the client assumes it is
    /// online and lets requests fail on their own.
    probe_url: Option<String>,
}

impl ReqwestHttpClient {
    /// Create a new HTTP client with default configuration
    pub fn try_new() -> Result<Self> {
        Self::with_timeout(Duration::from_secs(30))
    }

    /// Create a new HTTP client with custom timeout
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(10)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| {
                BridgeError::NotAvailable(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self::with_client(client))
    }

    /// Wrap an already configured reqwest client
    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            probe_url: None,
        }
    }

    /// Use `url` (typically a media server's public info endpoint) for
    /// connectivity checks
    pub fn with_probe_url(mut self, url: impl Into<String>) -> Self {
        self.probe_url = Some(url.into());
        self
    }

    /// Convert bridge HttpMethod to reqwest Method
    fn convert_method(method: HttpMethod) -> reqwest::Method {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
            HttpMethod::Head => reqwest::Method::HEAD,
        }
    }

    /// Build reqwest request from bridge request
    fn build_request(&self, request: HttpRequest) -> reqwest::RequestBuilder {
        let method = Self::convert_method(request.method);
        let mut req = self.client.request(method, &request.url);

        for (key, value) in request.headers {
            req = req.header(key, value);
        }

        if let Some(body) = request.body {
            req = req.body(body);
        }

        if let Some(timeout) = request.timeout {
            req = req.timeout(timeout);
        }

        req
    }

    fn transport_error(e: &reqwest::Error) -> BridgeError {
        if e.is_timeout() {
            BridgeError::OperationFailed("Request timed out".to_string())
        } else if e.is_connect() {
            BridgeError::OperationFailed(format!("Connection failed: {}", e))
        } else {
            BridgeError::OperationFailed(e.to_string())
        }
    }

    async fn send_once(&self, request: HttpRequest) -> Result<HttpResponse> {
        let response = self
            .build_request(request)
            .send()
            .await
            .map_err(|e| Self::transport_error(&e))?;

        let status = response.status().as_u16();
        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|s| (k.to_string(), s.to_string())))
            .collect();

        let body = response
            .bytes()
            .await
            .map_err(|e| BridgeError::OperationFailed(e.to_string()))?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.execute_with_retry(request, RetryPolicy::default())
            .await
    }

    async fn execute_with_retry(
        &self,
        request: HttpRequest,
        policy: RetryPolicy,
    ) -> Result<HttpResponse> {
        let max_attempts = policy.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            debug!(
                attempt,
                max_attempts,
                method = ?request.method,
                url = %request.url,
                "Executing HTTP request"
            );

            let outcome = self.send_once(request.clone()).await;
            let error = match outcome {
                Ok(response) if !response.is_retryable() => return Ok(response),
                Ok(response) => {
                    warn!(
                        status = response.status,
                        attempt, "HTTP request failed with retryable status"
                    );
                    if attempt >= max_attempts {
                        // Hand the final response back so callers can map
                        // the status themselves.
                        return Ok(response);
                    }
                    None
                }
                Err(e) => {
                    warn!(error = %e, attempt, "HTTP request failed");
                    Some(e)
                }
            };

            if attempt >= max_attempts {
                return Err(error.unwrap_or_else(|| {
                    BridgeError::OperationFailed("All retry attempts exhausted".to_string())
                }));
            }

            let delay = policy.delay_for(attempt);
            debug!(delay_ms = delay.as_millis() as u64, "Retrying after delay");
            sleep(delay).await;
        }
    }

    async fn is_connected(&self) -> bool {
        let Some(url) = self.probe_url.as_deref() else {
            return true;
        };

        self.client
            .head(url)
            .timeout(Duration::from_secs(5))
            .send()
            .await
            .is_ok()
    }
}
