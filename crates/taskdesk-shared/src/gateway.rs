//! The single HTTP entry point for task and auth calls.
//!
//! Authenticated requests get the stored access token as a bearer
//! header. A 401 on such a request triggers exactly one refresh and one
//! re-issue; when the refresh fails the session is dropped and the
//! session-expired listener runs.

use std::fmt;
use std::rc::Rc;

use serde::de::DeserializeOwned;
use tracing::{
  debug,
  info,
  warn
};

use crate::error::ApiError;
use crate::model::{
  RefreshRequest,
  RefreshResponse
};
use crate::session::{
  SessionStore,
  Storage
};
use crate::transport::{
  ApiRequest,
  ApiResponse,
  Transport
};

pub const REFRESH_PATH: &str =
  "/auth/refresh/";

pub type SessionListener = Rc<dyn Fn()>;

#[derive(Clone)]
pub struct Gateway<T, S> {
  transport:  T,
  session:    SessionStore<S>,
  on_expired: Option<SessionListener>
}

impl<T, S> fmt::Debug for Gateway<T, S> {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.debug_struct("Gateway")
      .field(
        "has_expiry_listener",
        &self.on_expired.is_some()
      )
      .finish_non_exhaustive()
  }
}

impl<T, S> Gateway<T, S>
where
  T: Transport,
  S: Storage
{
  pub fn new(
    transport: T,
    session: SessionStore<S>
  ) -> Self {
    Self {
      transport,
      session,
      on_expired: None
    }
  }

  /// Called after a failed refresh has cleared the session.
  pub fn with_session_expired<F>(
    mut self,
    listener: F
  ) -> Self
  where
    F: Fn() + 'static
  {
    self.on_expired = Some(Rc::new(listener));
    self
  }

  pub fn session(&self) -> &SessionStore<S> {
    &self.session
  }

  pub fn transport(&self) -> &T {
    &self.transport
  }

  #[tracing::instrument(
    skip(self, request),
    fields(method = request.method.as_str(), path = %request.path)
  )]
  pub async fn send(
    &self,
    mut request: ApiRequest
  ) -> Result<ApiResponse, ApiError> {
    if request.authenticated {
      request.bearer = self.session.token();
    }

    let response =
      self.transport.send(&request).await?;
    debug!(
      status = response.status,
      "response received"
    );

    if response.status != 401
      || !request.authenticated
      || request.retried
    {
      return response.into_result();
    }

    request.retried = true;
    info!(
      "access token rejected; \
       refreshing session"
    );

    let access = match self
      .refresh_access()
      .await
    {
      | Ok(access) => access,
      | Err(err) => {
        warn!(
          error = %err,
          "token refresh failed; \
           ending session"
        );
        self.expire_session();
        return Err(err);
      }
    };

    request.bearer = Some(access);
    let retried =
      self.transport.send(&request).await?;
    debug!(
      status = retried.status,
      "retried request answered"
    );
    retried.into_result()
  }

  pub async fn send_json<R>(
    &self,
    request: ApiRequest
  ) -> Result<R, ApiError>
  where
    R: DeserializeOwned
  {
    self.send(request).await?.json()
  }

  /// Exchanges the stored refresh token for a new access token and
  /// persists it. Does not touch the session on failure.
  #[tracing::instrument(skip(self))]
  pub async fn refresh_access(
    &self
  ) -> Result<String, ApiError> {
    let Some(refresh) =
      self.session.refresh_token()
    else {
      return Err(ApiError::Auth {
        detail: "no refresh token stored"
          .to_string()
      });
    };

    let request =
      ApiRequest::post(REFRESH_PATH)
        .json(&RefreshRequest { refresh })?
        .public();
    let tokens: RefreshResponse = self
      .transport
      .send(&request)
      .await?
      .into_result()?
      .json()?;

    self
      .session
      .set_access_token(&tokens.access)?;
    if let Some(rotated) =
      tokens.refresh.as_deref()
    {
      self
        .session
        .set_refresh_token(rotated)?;
    }
    debug!("access token refreshed");
    Ok(tokens.access)
  }

  fn expire_session(&self) {
    if let Err(error) = self.session.logout()
    {
      warn!(
        %error,
        "failed clearing expired session"
      );
    }
    if let Some(listener) = &self.on_expired
    {
      listener();
    }
  }
}

#[cfg(test)]
mod gateway_tests {
  use std::cell::Cell;

  use serde_json::json;

  use super::*;
  use crate::session::MemoryStorage;
  use crate::transport::{
    Method,
    MockTransport
  };

  fn gateway_with_tokens(
    transport: &MockTransport
  ) -> Gateway<MockTransport, MemoryStorage>
  {
    let session = SessionStore::new(
      MemoryStorage::new()
    );
    session
      .save_tokens("stale", "refresh-1")
      .expect("tokens");
    Gateway::new(transport.clone(), session)
  }

  #[tokio::test]
  async fn attaches_bearer_token() {
    let transport = MockTransport::new();
    transport.expect(
      Method::Get,
      "/auth/me/",
      200,
      "{}"
    );
    let gateway =
      gateway_with_tokens(&transport);

    gateway
      .send(ApiRequest::get("/auth/me/"))
      .await
      .expect("ok");

    let sent = transport.requests();
    assert_eq!(
      sent[0].bearer.as_deref(),
      Some("stale")
    );
  }

  #[tokio::test]
  async fn unauthorized_refreshes_once_and_retries_once()
  {
    let transport = MockTransport::new();
    transport
      .expect(
        Method::Get,
        "/tasks/statistics/",
        401,
        r#"{"detail": "Given token not valid"}"#
      )
      .expect_json(
        Method::Post,
        REFRESH_PATH,
        200,
        json!({"access": "fresh"})
      )
      .expect(
        Method::Get,
        "/tasks/statistics/",
        200,
        "{}"
      );
    let gateway =
      gateway_with_tokens(&transport);

    gateway
      .send(ApiRequest::get(
        "/tasks/statistics/"
      ))
      .await
      .expect("retried request succeeds");

    assert_eq!(
      transport.calls(),
      vec![
        "GET /tasks/statistics/",
        "POST /auth/refresh/",
        "GET /tasks/statistics/"
      ]
    );
    let sent = transport.requests();
    assert_eq!(
      sent[1].body,
      Some(json!({"refresh": "refresh-1"}))
    );
    assert!(sent[1].bearer.is_none());
    assert_eq!(
      sent[2].bearer.as_deref(),
      Some("fresh")
    );
    assert!(sent[2].retried);
    assert_eq!(
      gateway.session().token().as_deref(),
      Some("fresh")
    );
  }

  #[tokio::test]
  async fn second_unauthorized_is_surfaced_without_another_refresh()
  {
    let transport = MockTransport::new();
    transport
      .expect(Method::Get, "/tasks/*", 401, "{}")
      .expect_json(
        Method::Post,
        REFRESH_PATH,
        200,
        json!({"access": "fresh"})
      )
      .expect(
        Method::Get,
        "/tasks/*",
        401,
        r#"{"detail": "still no"}"#
      );
    let gateway =
      gateway_with_tokens(&transport);

    let err = gateway
      .send(ApiRequest::get(
        "/tasks/?page=1"
      ))
      .await
      .expect_err("second 401 surfaces");

    assert!(err.is_auth());
    assert_eq!(transport.calls().len(), 3);
    assert_eq!(transport.pending(), 0);
    assert!(
      gateway.session().is_authenticated()
    );
  }

  #[tokio::test]
  async fn failed_refresh_clears_session_and_notifies()
  {
    let transport = MockTransport::new();
    transport
      .expect(Method::Get, "/tasks/*", 401, "{}")
      .expect(
        Method::Post,
        REFRESH_PATH,
        401,
        r#"{"detail": "Token is blacklisted"}"#
      );
    let notified = Rc::new(Cell::new(0));
    let counter = notified.clone();
    let gateway =
      gateway_with_tokens(&transport)
        .with_session_expired(move || {
          counter.set(counter.get() + 1)
        });

    let err = gateway
      .send(ApiRequest::get(
        "/tasks/?page=1"
      ))
      .await
      .expect_err("refresh failure");

    assert_eq!(
      err.detail(),
      Some("Token is blacklisted")
    );
    assert!(
      !gateway.session().is_authenticated()
    );
    assert!(
      gateway.session().refresh_token().is_none()
    );
    assert_eq!(notified.get(), 1);
    assert_eq!(transport.calls().len(), 2);
  }

  #[tokio::test]
  async fn public_requests_are_not_intercepted()
  {
    let transport = MockTransport::new();
    transport.expect(
      Method::Post,
      "/auth/login/",
      401,
      r#"{"detail": "No active account found with the given credentials"}"#
    );
    let gateway =
      gateway_with_tokens(&transport);

    let err = gateway
      .send(
        ApiRequest::post("/auth/login/")
          .public()
      )
      .await
      .expect_err("bad credentials");

    assert!(err.is_auth());
    assert_eq!(transport.calls().len(), 1);
    assert!(transport.requests()[0]
      .bearer
      .is_none());
  }

  #[tokio::test]
  async fn rotated_refresh_token_is_stored()
  {
    let transport = MockTransport::new();
    transport.expect_json(
      Method::Post,
      REFRESH_PATH,
      200,
      json!({"access": "a2", "refresh": "r2"})
    );
    let gateway =
      gateway_with_tokens(&transport);

    let access = gateway
      .refresh_access()
      .await
      .expect("refresh");

    assert_eq!(access, "a2");
    assert_eq!(
      gateway
        .session()
        .refresh_token()
        .as_deref(),
      Some("r2")
    );
  }

  #[tokio::test]
  async fn missing_refresh_token_fails_without_a_request()
  {
    let transport = MockTransport::new();
    let gateway = Gateway::new(
      transport.clone(),
      SessionStore::new(MemoryStorage::new())
    );

    let err = gateway
      .refresh_access()
      .await
      .expect_err("no refresh token");

    assert!(err.is_auth());
    assert!(transport.calls().is_empty());
  }
}
