//! Scripted transport for exercising the client without a network.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use super::transport::{ApiRequest, ApiResponse, Method, Transport};
use crate::error::ApiError;

type Reply = Result<ApiResponse, ApiError>;

/// Replays canned replies per (method, path) and records every request.
///
/// The last reply queued for a route is sticky, so a single `respond` call
/// answers any number of identical requests.
#[derive(Default)]
pub struct ScriptedTransport {
  routes: Mutex<HashMap<(Method, String), VecDeque<Reply>>>,
  requests: Mutex<Vec<ApiRequest>>,
}

impl ScriptedTransport {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn respond(&self, method: Method, path: &str, status: u16, body: Value) -> &Self {
    self.push(
      method,
      path,
      Ok(ApiResponse {
        status,
        body: Some(body),
      }),
    )
  }

  pub fn respond_empty(&self, method: Method, path: &str, status: u16) -> &Self {
    self.push(method, path, Ok(ApiResponse { status, body: None }))
  }

  pub fn fail(&self, method: Method, path: &str, error: ApiError) -> &Self {
    self.push(method, path, Err(error))
  }

  pub fn requests(&self) -> Vec<ApiRequest> {
    self.requests.lock().unwrap().clone()
  }

  pub fn request_count(&self) -> usize {
    self.requests.lock().unwrap().len()
  }

  fn push(&self, method: Method, path: &str, reply: Reply) -> &Self {
    self
      .routes
      .lock()
      .unwrap()
      .entry((method, path.to_string()))
      .or_default()
      .push_back(reply);
    self
  }
}

#[async_trait]
impl Transport for ScriptedTransport {
  async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
    let key = (request.method, request.path.clone());
    self.requests.lock().unwrap().push(request);

    let mut routes = self.routes.lock().unwrap();
    let queue = routes.get_mut(&key).ok_or_else(|| {
      ApiError::request_failed(format!("unscripted request {} {}", key.0.as_str(), key.1))
    })?;

    if queue.len() > 1 {
      queue.pop_front().unwrap()
    } else {
      queue
        .front()
        .cloned()
        .unwrap_or_else(|| Err(ApiError::request_failed("no reply queued")))
    }
  }
}
