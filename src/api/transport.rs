//! Wire layer: sends one HTTP request and hands back status plus JSON body.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use url::Url;

use crate::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
  Get,
  Post,
  Put,
  Delete,
}

impl Method {
  pub fn as_str(&self) -> &'static str {
    match self {
      Method::Get => "GET",
      Method::Post => "POST",
      Method::Put => "PUT",
      Method::Delete => "DELETE",
    }
  }
}

/// A request relative to the API base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
  pub method: Method,
  /// Path starting with `/`, e.g. `/buckets/42`
  pub path: String,
  pub bearer: Option<String>,
  pub body: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
  pub status: u16,
  /// Parsed JSON body, None when the body was empty or not JSON
  pub body: Option<Value>,
}

impl ApiResponse {
  pub fn is_success(&self) -> bool {
    (200..300).contains(&self.status)
  }
}

/// Something that can carry an [`ApiRequest`] to the remote service.
#[async_trait]
pub trait Transport: Send + Sync {
  /// Send the request. Errors are transport failures only (DNS, TLS, timeout);
  /// HTTP error statuses come back as a normal response.
  async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError>;
}

/// reqwest-based transport used against the real service.
pub struct HttpTransport {
  client: reqwest::Client,
  base_url: Url,
}

impl HttpTransport {
  pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
    let base_url = Url::parse(base_url.trim_end_matches('/'))
      .map_err(|e| ApiError::request_failed(format!("Invalid API URL {}: {}", base_url, e)))?;

    let client = reqwest::Client::builder()
      .timeout(timeout)
      .user_agent(concat!("consolectl/", env!("CARGO_PKG_VERSION")))
      .build()
      .map_err(|e| ApiError::request_failed(format!("Failed to create HTTP client: {}", e)))?;

    Ok(Self { client, base_url })
  }

  fn url_for(&self, path: &str) -> Result<Url, ApiError> {
    let joined = format!("{}{}", self.base_url.as_str().trim_end_matches('/'), path);
    Url::parse(&joined).map_err(|e| ApiError::request_failed(format!("Invalid URL {}: {}", joined, e)))
  }
}

#[async_trait]
impl Transport for HttpTransport {
  async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
    let url = self.url_for(&request.path)?;

    let mut builder = match request.method {
      Method::Get => self.client.get(url),
      Method::Post => self.client.post(url),
      Method::Put => self.client.put(url),
      Method::Delete => self.client.delete(url),
    };

    if let Some(token) = &request.bearer {
      builder = builder.bearer_auth(token);
    }
    if let Some(body) = &request.body {
      builder = builder.json(body);
    }

    let response = builder
      .send()
      .await
      .map_err(|e| ApiError::request_failed(e.to_string()))?;

    let status = response.status().as_u16();
    let text = response
      .text()
      .await
      .map_err(|e| ApiError::request_failed(e.to_string()))?;

    let body = if text.trim().is_empty() {
      None
    } else {
      match serde_json::from_str(&text) {
        Ok(value) => Some(value),
        Err(e) if (200..300).contains(&status) => return Err(ApiError::parse(e)),
        // Error pages are often HTML; the caller falls back to a static message
        Err(_) => None,
      }
    };

    Ok(ApiResponse { status, body })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_url_for_keeps_base_path() {
    let transport = HttpTransport::new("https://api.example.com/v1/", Duration::from_secs(5)).unwrap();
    assert_eq!(
      transport.url_for("/buckets/7").unwrap().as_str(),
      "https://api.example.com/v1/buckets/7"
    );
  }

  #[test]
  fn test_url_for_keeps_encoded_segments() {
    let transport = HttpTransport::new("https://api.example.com/v1", Duration::from_secs(5)).unwrap();
    assert_eq!(
      transport.url_for("/buckets/..%2Fapps%2F7").unwrap().as_str(),
      "https://api.example.com/v1/buckets/..%2Fapps%2F7"
    );
    let url = transport.url_for("/buckets/x%3Fadmin=true%23f").unwrap();
    assert_eq!(url.path(), "/v1/buckets/x%3Fadmin=true%23f");
    assert_eq!(url.query(), None);
    assert_eq!(url.fragment(), None);
  }

  #[test]
  fn test_invalid_base_url_is_rejected() {
    assert!(HttpTransport::new("not a url", Duration::from_secs(5)).is_err());
  }

  #[test]
  fn test_success_range() {
    let ok = ApiResponse {
      status: 204,
      body: None,
    };
    let err = ApiResponse {
      status: 404,
      body: None,
    };
    assert!(ok.is_success());
    assert!(!err.is_success());
  }
}
