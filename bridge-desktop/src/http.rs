//! HTTP Client Implementation using Reqwest

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, MultipartForm, RetryPolicy},
};
use reqwest::{multipart, Client};
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Reqwest-based HTTP client implementation
///
/// Provides HTTP operations with:
/// - Connection pooling via reqwest
/// - Automatic retry with exponential backoff on 5xx/429 and connection errors
/// - TLS via rustls
/// - `multipart/form-data` bodies for file uploads
pub struct ReqwestHttpClient {
    client: Client,
}

impl ReqwestHttpClient {
    /// Create a new HTTP client with default configuration
    pub fn new() -> Result<Self> {
        // Metadata uploads of large data files can take a while
        Self::with_timeout(Duration::from_secs(600))
    }

    /// Create a new HTTP client with custom timeout
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(4)
            .user_agent(concat!("sbsync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                BridgeError::NotAvailable(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self { client })
    }

    /// Create a new HTTP client with custom configuration
    pub fn with_client(client: Client) -> Self {
        Self { client }
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

    /// Convert a bridge multipart form into a reqwest form
    fn convert_form(form: MultipartForm) -> Result<multipart::Form> {
        let mut out = multipart::Form::new();
        for part in form.parts {
            let mut p = multipart::Part::bytes(part.data.to_vec());
            if let Some(file_name) = part.file_name {
                p = p.file_name(file_name);
            }
            if let Some(content_type) = part.content_type {
                p = p.mime_str(&content_type).map_err(|e| {
                    BridgeError::OperationFailed(format!(
                        "Invalid content type '{}': {}",
                        content_type, e
                    ))
                })?;
            }
            out = out.part(part.name, p);
        }
        Ok(out)
    }

    /// Build reqwest request from bridge request
    fn build_request(&self, request: HttpRequest) -> Result<reqwest::RequestBuilder> {
        let method = Self::convert_method(request.method);
        let mut req = self.client.request(method, &request.url);

        for (key, value) in request.headers {
            req = req.header(key, value);
        }

        if let Some(form) = request.multipart {
            req = req.multipart(Self::convert_form(form)?);
        } else if let Some(body) = request.body {
            req = req.body(body);
        }

        if let Some(timeout) = request.timeout {
            req = req.timeout(timeout);
        }

        Ok(req)
    }

    /// Send once. Transport errors, 5xx and 429 come back as `Retry`.
    async fn attempt(&self, request: &HttpRequest) -> Result<Attempt> {
        let response = match self.build_request(request.clone())?.send().await {
            Ok(response) => response,
            Err(e) => return Ok(Attempt::Retry(describe_send_error(&e))),
        };

        let status = response.status().as_u16();
        if status >= 500 || status == 429 {
            return Ok(Attempt::Retry(BridgeError::OperationFailed(format!(
                "HTTP {} from {}",
                status, request.url
            ))));
        }
        Ok(Attempt::Done(into_response(response).await?))
    }
}

enum Attempt {
    Done(HttpResponse),
    Retry(BridgeError),
}

fn describe_send_error(e: &reqwest::Error) -> BridgeError {
    let message = if e.is_timeout() {
        "Request timed out".to_string()
    } else if e.is_connect() {
        format!("Connection failed: {}", e)
    } else {
        e.to_string()
    };
    BridgeError::OperationFailed(message)
}

async fn into_response(response: reqwest::Response) -> Result<HttpResponse> {
    let status = response.status().as_u16();
    let headers: HashMap<String, String> = response
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect();
    let body = response
        .bytes()
        .await
        .map_err(|e| BridgeError::OperationFailed(format!("Failed to read body: {}", e)))?;

    Ok(HttpResponse {
        status,
        headers,
        body,
    })
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
        let mut last_error = None;

        for attempt in 0..policy.max_attempts {
            if attempt > 0 {
                let delay = policy.delay_for(attempt - 1);
                debug!(attempt, delay_ms = delay.as_millis() as u64, "Retrying request");
                sleep(delay).await;
            }

            match self.attempt(&request).await? {
                Attempt::Done(response) => return Ok(response),
                Attempt::Retry(error) => {
                    warn!(
                        url = %request.url,
                        attempt = attempt + 1,
                        max_attempts = policy.max_attempts,
                        error = %error,
                        "HTTP request failed"
                    );
                    last_error = Some(error);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            BridgeError::OperationFailed("No request attempts allowed".to_string())
        }))
    }
}
