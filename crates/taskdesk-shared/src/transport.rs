use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ApiError;

#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub enum Method {
  Get,
  Post,
  Put,
  Patch,
  Delete
}

impl Method {
  pub fn as_str(self) -> &'static str {
    match self {
      | Method::Get => "GET",
      | Method::Post => "POST",
      | Method::Put => "PUT",
      | Method::Patch => "PATCH",
      | Method::Delete => "DELETE"
    }
  }
}

/// A request relative to the API base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
  pub method:        Method,
  pub path:          String,
  pub body:          Option<Value>,
  pub bearer:        Option<String>,
  /// Carries the session token and takes part in refresh-on-401.
  pub authenticated: bool,
  /// Set once the gateway has refreshed and re-issued this request.
  pub retried:       bool
}

impl ApiRequest {
  pub fn new(
    method: Method,
    path: impl Into<String>
  ) -> Self {
    Self {
      method,
      path: path.into(),
      body: None,
      bearer: None,
      authenticated: true,
      retried: false
    }
  }

  pub fn get(path: impl Into<String>) -> Self {
    Self::new(Method::Get, path)
  }

  pub fn post(
    path: impl Into<String>
  ) -> Self {
    Self::new(Method::Post, path)
  }

  pub fn put(path: impl Into<String>) -> Self {
    Self::new(Method::Put, path)
  }

  pub fn patch(
    path: impl Into<String>
  ) -> Self {
    Self::new(Method::Patch, path)
  }

  pub fn delete(
    path: impl Into<String>
  ) -> Self {
    Self::new(Method::Delete, path)
  }

  pub fn json<B: Serialize + ?Sized>(
    mut self,
    body: &B
  ) -> Result<Self, ApiError> {
    let value = serde_json::to_value(body)
      .map_err(|err| {
        ApiError::Decode(format!(
          "failed to encode request \
           body: {err}"
        ))
      })?;
    self.body = Some(value);
    Ok(self)
  }

  /// Login, register and refresh go out without a token and are never
  /// intercepted.
  pub fn public(mut self) -> Self {
    self.authenticated = false;
    self
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
  pub status: u16,
  pub body:   String
}

impl ApiResponse {
  pub fn new(
    status: u16,
    body: impl Into<String>
  ) -> Self {
    Self {
      status,
      body: body.into()
    }
  }

  pub fn is_success(&self) -> bool {
    (200..300).contains(&self.status)
  }

  pub fn into_result(
    self
  ) -> Result<Self, ApiError> {
    if self.is_success() {
      Ok(self)
    } else {
      Err(ApiError::from_response(
        self.status,
        &self.body
      ))
    }
  }

  pub fn json<T: DeserializeOwned>(
    &self
  ) -> Result<T, ApiError> {
    let body = if self.body.trim().is_empty()
    {
      "null"
    } else {
      self.body.as_str()
    };
    serde_json::from_str(body).map_err(
      |err| {
        ApiError::Decode(format!(
          "failed to decode response \
           body: {err}"
        ))
      }
    )
  }
}

/// Sends one HTTP exchange. Implementations report transport failures
/// as [`ApiError::Network`] and return every status code as a
/// response; classification happens in the gateway.
#[allow(async_fn_in_trait)]
pub trait Transport {
  async fn send(
    &self,
    request: &ApiRequest
  ) -> Result<ApiResponse, ApiError>;
}

#[cfg(any(test, feature = "testkit"))]
pub use mock::MockTransport;

#[cfg(any(test, feature = "testkit"))]
mod mock {
  use std::collections::VecDeque;
  use std::sync::Arc;

  use parking_lot::Mutex;

  use super::*;

  #[derive(Debug, Clone)]
  struct Expectation {
    method: Method,
    path:   String,
    reply:  Result<ApiResponse, ApiError>
  }

  impl Expectation {
    fn matches(
      &self,
      request: &ApiRequest
    ) -> bool {
      if self.method != request.method {
        return false;
      }
      match self.path.strip_suffix('*') {
        | Some(prefix) => {
          request.path.starts_with(prefix)
        }
        | None => self.path == request.path
      }
    }
  }

  #[derive(Debug, Default)]
  struct MockState {
    expectations: VecDeque<Expectation>,
    requests:     Vec<ApiRequest>
  }

  /// Scripted transport for tests.
  ///
  /// Each expectation answers the first later request with the same
  /// method and path (a trailing `*` matches by prefix) and is then
  /// consumed. Unmatched requests fail with a network error. Clones
  /// share the script and the request log.
  #[derive(Debug, Clone, Default)]
  pub struct MockTransport {
    state: Arc<Mutex<MockState>>
  }

  impl MockTransport {
    pub fn new() -> Self {
      Self::default()
    }

    pub fn expect(
      &self,
      method: Method,
      path: &str,
      status: u16,
      body: &str
    ) -> &Self {
      self.push(
        method,
        path,
        Ok(ApiResponse::new(status, body))
      )
    }

    pub fn expect_json(
      &self,
      method: Method,
      path: &str,
      status: u16,
      body: Value
    ) -> &Self {
      self.expect(
        method,
        path,
        status,
        &body.to_string()
      )
    }

    pub fn expect_network_error(
      &self,
      method: Method,
      path: &str
    ) -> &Self {
      self.push(
        method,
        path,
        Err(ApiError::Network(
          "connection refused".to_string()
        ))
      )
    }

    fn push(
      &self,
      method: Method,
      path: &str,
      reply: Result<ApiResponse, ApiError>
    ) -> &Self {
      self.state.lock().expectations.push_back(
        Expectation {
          method,
          path: path.to_string(),
          reply
        }
      );
      self
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
      self.state.lock().requests.clone()
    }

    /// Paths of every request sent so far, prefixed by method.
    pub fn calls(&self) -> Vec<String> {
      self
        .state
        .lock()
        .requests
        .iter()
        .map(|request| {
          format!(
            "{} {}",
            request.method.as_str(),
            request.path
          )
        })
        .collect()
    }

    pub fn pending(&self) -> usize {
      self.state.lock().expectations.len()
    }
  }

  impl Transport for MockTransport {
    async fn send(
      &self,
      request: &ApiRequest
    ) -> Result<ApiResponse, ApiError> {
      let mut state = self.state.lock();
      state.requests.push(request.clone());
      let position = state
        .expectations
        .iter()
        .position(|exp| exp.matches(request));
      match position
        .and_then(|idx| state.expectations.remove(idx))
      {
        | Some(expectation) => {
          expectation.reply
        }
        | None => Err(ApiError::Network(
          format!(
            "unexpected request {} {}",
            request.method.as_str(),
            request.path
          )
        ))
      }
    }
  }
}
