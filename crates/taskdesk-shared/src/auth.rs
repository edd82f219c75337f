use tracing::{
  info,
  instrument,
  warn
};

use crate::error::ApiError;
use crate::gateway::Gateway;
use crate::model::{
  LoginRequest,
  PasswordChange,
  ProfileUpdate,
  RegisterRequest,
  TokenPair,
  User,
  UserEnvelope
};
use crate::session::Storage;
use crate::transport::{
  ApiRequest,
  Transport
};

pub const REGISTER_PATH: &str =
  "/auth/register/";
pub const LOGIN_PATH: &str = "/auth/login/";
pub const ME_PATH: &str = "/auth/me/";
pub const PROFILE_UPDATE_PATH: &str =
  "/auth/profile/update/";
pub const CHANGE_PASSWORD_PATH: &str =
  "/auth/change-password/";

#[derive(Debug)]
pub struct AuthClient<'g, T, S> {
  gateway: &'g Gateway<T, S>
}

impl<'g, T, S> AuthClient<'g, T, S>
where
  T: Transport,
  S: Storage
{
  pub fn new(
    gateway: &'g Gateway<T, S>
  ) -> Self {
    Self { gateway }
  }

  /// Creates the account. Does not log in.
  #[instrument(skip(self, request), fields(username = %request.username))]
  pub async fn register(
    &self,
    request: &RegisterRequest
  ) -> Result<Option<User>, ApiError> {
    let envelope: UserEnvelope = self
      .gateway
      .send_json(
        ApiRequest::post(REGISTER_PATH)
          .json(request)?
          .public()
      )
      .await?;
    info!("account registered");
    Ok(envelope.user)
  }

  /// Obtains a token pair, stores it, then loads and caches the
  /// profile.
  #[instrument(skip(self, password))]
  pub async fn login(
    &self,
    username: &str,
    password: &str
  ) -> Result<User, ApiError> {
    let body = LoginRequest {
      username: username.to_string(),
      password: password.to_string()
    };
    let tokens: TokenPair = self
      .gateway
      .send_json(
        ApiRequest::post(LOGIN_PATH)
          .json(&body)?
          .public()
      )
      .await?;
    self
      .gateway
      .session()
      .save_tokens(
        &tokens.access,
        &tokens.refresh
      )?;
    let user = match self.me().await {
      | Ok(user) => user,
      | Err(err) => {
        if let Err(error) =
          self.gateway.session().logout()
        {
          warn!(
            %error,
            "failed clearing tokens of an \
             unfinished login"
          );
        }
        return Err(err);
      }
    };
    info!(user_id = user.id, "logged in");
    Ok(user)
  }

  pub async fn register_and_login(
    &self,
    request: &RegisterRequest
  ) -> Result<User, ApiError> {
    self.register(request).await?;
    self
      .login(
        &request.username,
        &request.password
      )
      .await
  }

  pub async fn refresh(
    &self
  ) -> Result<String, ApiError> {
    self.gateway.refresh_access().await
  }

  /// Fetches the current user and refreshes the cached copy.
  #[instrument(skip(self))]
  pub async fn me(
    &self
  ) -> Result<User, ApiError> {
    let user: User = self
      .gateway
      .send_json(ApiRequest::get(ME_PATH))
      .await?;
    self.gateway.session().save_user(&user)?;
    Ok(user)
  }

  #[instrument(skip(self, update))]
  pub async fn update_profile(
    &self,
    update: &ProfileUpdate
  ) -> Result<User, ApiError> {
    let envelope: UserEnvelope = self
      .gateway
      .send_json(
        ApiRequest::put(PROFILE_UPDATE_PATH)
          .json(update)?
      )
      .await?;
    let user = envelope.user.ok_or_else(
      || {
        ApiError::Decode(
          "profile update response \
           carried no user"
            .to_string()
        )
      }
    )?;
    self.gateway.session().save_user(&user)?;
    Ok(user)
  }

  #[instrument(skip_all)]
  pub async fn change_password(
    &self,
    change: &PasswordChange
  ) -> Result<(), ApiError> {
    self
      .gateway
      .send(
        ApiRequest::post(
          CHANGE_PASSWORD_PATH
        )
        .json(change)?
      )
      .await
      .map(drop)
  }

  pub fn logout(&self) -> Result<(), ApiError> {
    self.gateway.session().logout()?;
    info!("logged out");
    Ok(())
  }
}

#[cfg(test)]
mod auth_tests {
  use serde_json::json;

  use super::*;
  use crate::session::{
    MemoryStorage,
    SessionStore
  };
  use crate::transport::{
    Method,
    MockTransport
  };

  fn user_json() -> serde_json::Value {
    json!({
      "id": 1,
      "username": "ada",
      "email": "ada@example.com",
      "first_name": "Ada",
      "last_name": "Lovelace"
    })
  }

  fn fresh_gateway(
    transport: &MockTransport
  ) -> Gateway<MockTransport, MemoryStorage>
  {
    Gateway::new(
      transport.clone(),
      SessionStore::new(MemoryStorage::new())
    )
  }

  #[tokio::test]
  async fn login_stores_tokens_and_user() {
    let transport = MockTransport::new();
    transport
      .expect_json(
        Method::Post,
        LOGIN_PATH,
        200,
        json!({"access": "a1", "refresh": "r1"})
      )
      .expect_json(
        Method::Get,
        ME_PATH,
        200,
        user_json()
      );
    let gateway = fresh_gateway(&transport);

    let user = AuthClient::new(&gateway)
      .login("ada", "secret")
      .await
      .expect("login");

    assert_eq!(user.username, "ada");
    let session = gateway.session();
    assert_eq!(
      session.token().as_deref(),
      Some("a1")
    );
    assert_eq!(session.user(), Some(user));
    let sent = transport.requests();
    assert!(!sent[0].authenticated);
    assert_eq!(
      sent[1].bearer.as_deref(),
      Some("a1")
    );
  }

  #[tokio::test]
  async fn rejected_login_leaves_no_session()
  {
    let transport = MockTransport::new();
    transport.expect(
      Method::Post,
      LOGIN_PATH,
      401,
      r#"{"detail": "No active account found with the given credentials"}"#
    );
    let gateway = fresh_gateway(&transport);

    let err = AuthClient::new(&gateway)
      .login("ada", "wrong")
      .await
      .expect_err("rejected");

    assert!(err.is_auth());
    assert!(
      !gateway.session().is_authenticated()
    );
  }

  #[tokio::test]
  async fn failed_profile_load_discards_fresh_tokens()
  {
    let transport = MockTransport::new();
    transport
      .expect_json(
        Method::Post,
        LOGIN_PATH,
        200,
        json!({"access": "a1", "refresh": "r1"})
      )
      .expect(
        Method::Get,
        ME_PATH,
        500,
        r#"{"detail": "boom"}"#
      );
    let gateway = fresh_gateway(&transport);

    let err = AuthClient::new(&gateway)
      .login("ada", "secret")
      .await
      .expect_err("profile failed");

    assert!(!err.is_auth());
    let session = gateway.session();
    assert!(!session.is_authenticated());
    assert_eq!(session.refresh_token(), None);
    assert!(session.storage().is_empty());
  }

  #[tokio::test]
  async fn register_surfaces_field_errors()
  {
    let transport = MockTransport::new();
    transport.expect(
      Method::Post,
      REGISTER_PATH,
      400,
      r#"{"email": ["Enter a valid email address."]}"#
    );
    let gateway = fresh_gateway(&transport);

    let err = AuthClient::new(&gateway)
      .register_and_login(
        &RegisterRequest::default()
      )
      .await
      .expect_err("invalid");

    let fields =
      err.field_errors().expect("fields");
    assert!(fields.contains_key("email"));
    assert_eq!(transport.calls().len(), 1);
  }

  #[tokio::test]
  async fn logout_clears_the_session() {
    let transport = MockTransport::new();
    let gateway = fresh_gateway(&transport);
    gateway
      .session()
      .save_tokens("a", "r")
      .expect("tokens");

    AuthClient::new(&gateway)
      .logout()
      .expect("logout");

    assert!(
      !gateway.session().is_authenticated()
    );
  }
}
