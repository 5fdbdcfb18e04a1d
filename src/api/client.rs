use serde_json::{json, Value};
use std::sync::Arc;

use super::api_types::{error_message, unwrap_envelope, CurrentUser, LoginResponse};
use super::transport::{ApiRequest, Method, Transport};
use crate::error::ApiError;
use crate::session::Session;

/// Console API client: attaches the bearer token and normalizes failures.
#[derive(Clone)]
pub struct ApiClient {
  transport: Arc<dyn Transport>,
  session: Arc<Session>,
}

impl ApiClient {
  pub fn new(transport: Arc<dyn Transport>, session: Arc<Session>) -> Self {
    Self { transport, session }
  }

  pub fn session(&self) -> &Session {
    &self.session
  }

  /// Authenticated GET
  pub async fn get(&self, path: &str, fallback: &str) -> Result<Value, ApiError> {
    self.send(Method::Get, path, None, true, fallback).await
  }

  /// Authenticated POST with a JSON body
  pub async fn post(&self, path: &str, body: Value, fallback: &str) -> Result<Value, ApiError> {
    self.send(Method::Post, path, Some(body), true, fallback).await
  }

  /// Authenticated PUT with a JSON body
  pub async fn put(&self, path: &str, body: Value, fallback: &str) -> Result<Value, ApiError> {
    self.send(Method::Put, path, Some(body), true, fallback).await
  }

  /// Authenticated DELETE. An empty response body comes back as `Value::Null`.
  pub async fn delete(&self, path: &str, fallback: &str) -> Result<Value, ApiError> {
    self.send(Method::Delete, path, None, true, fallback).await
  }

  /// Exchange credentials for a token and store it in the session.
  pub async fn login(&self, email: &str, password: &str) -> Result<(), ApiError> {
    let body = json!({ "email": email, "password": password });
    let response = self
      .send(Method::Post, "/auth/login", Some(body), false, "Login failed")
      .await?;

    let login: LoginResponse = serde_json::from_value(response).map_err(ApiError::parse)?;
    self.session.set_token(&login.token);
    tracing::info!(email, "logged in");
    Ok(())
  }

  /// Drop the stored token.
  pub fn logout(&self) {
    self.session.clear();
    tracing::info!("logged out");
  }

  /// Fetch the account the current token belongs to.
  pub async fn me(&self) -> Result<CurrentUser, ApiError> {
    let body = self.get("/auth/me", "Failed to fetch user").await?;
    unwrap_envelope(body, "user")
  }

  async fn send(
    &self,
    method: Method,
    path: &str,
    body: Option<Value>,
    authenticated: bool,
    fallback: &str,
  ) -> Result<Value, ApiError> {
    // Fail before touching the network when there is nothing to authenticate with
    let bearer = if authenticated {
      Some(self.session.token()?)
    } else {
      None
    };

    let request = ApiRequest {
      method,
      path: path.to_string(),
      bearer,
      body,
    };

    tracing::debug!(method = method.as_str(), path, "sending request");

    let response = self.transport.send(request).await.map_err(|e| match e {
      ApiError::Parse { .. } => e,
      other => {
        tracing::warn!(method = method.as_str(), path, error = %other, "request failed");
        ApiError::request_failed(fallback)
      }
    })?;

    if response.is_success() {
      return Ok(response.body.unwrap_or(Value::Null));
    }

    let message = response
      .body
      .as_ref()
      .and_then(error_message)
      .unwrap_or_else(|| fallback.to_string());

    tracing::warn!(
      method = method.as_str(),
      path,
      status = response.status,
      %message,
      "request rejected"
    );

    Err(ApiError::request_failed(message))
  }
}
