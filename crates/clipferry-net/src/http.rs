//! One-shot HTTP client for the relay and LAN endpoints
//!
//! Stateless request/response over a shared connection pool. Non-2xx
//! statuses are not errors at this layer; the status comes back to the
//! caller, who decides. Only transport failures (DNS, TCP, TLS,
//! timeout) surface as [`NetworkError::Transport`].

use serde::Serialize;

use crate::Result;

/// Response of a relay call: status plus body
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    /// Whether the status is in the 2xx range
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Raw-bytes response for blob downloads
#[derive(Debug, Clone)]
pub struct HttpBytes {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpBytes {
    /// Whether the status is in the 2xx range
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// HTTP client with TLS 1.2 minimum and redirect following
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: reqwest::Client,
}

impl HttpClient {
    /// Build the client; fails only on TLS backend initialization
    pub fn new() -> Result<Self> {
        let inner = reqwest::Client::builder()
            .use_rustls_tls()
            .min_tls_version(reqwest::tls::Version::TLS_1_2)
            .build()?;
        Ok(Self { inner })
    }

    /// POST a body with an explicit content type
    pub async fn post(&self, url: &str, body: String, content_type: &str) -> Result<HttpResponse> {
        let response = self
            .inner
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(body)
            .send()
            .await?;
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Ok(HttpResponse { status, body })
    }

    /// POST a value serialized as JSON
    pub async fn post_json<T: Serialize>(&self, url: &str, value: &T) -> Result<HttpResponse> {
        let body = serde_json::to_string(value)
            .map_err(|e| crate::NetworkError::Transport(format!("serialize body: {}", e)))?;
        self.post(url, body, "application/json").await
    }

    /// PUT raw bytes as `application/octet-stream`
    pub async fn put(&self, url: &str, bytes: Vec<u8>) -> Result<HttpResponse> {
        let response = self
            .inner
            .put(url)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(bytes)
            .send()
            .await?;
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Ok(HttpResponse { status, body })
    }

    /// GET raw bytes with custom headers
    pub async fn get(&self, url: &str, headers: &[(&str, &str)]) -> Result<HttpBytes> {
        let mut request = self.inner.get(url);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }
        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();
        Ok(HttpBytes { status, body })
    }
}
