//! Persisted session state: the access and refresh tokens plus the
//! cached user profile.
//!
//! All access goes through [`SessionStore`], which owns the three keys
//! and clears them together on logout. The backing [`Storage`] decides
//! where they live (memory, a file on disk, browser local storage).

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{
  debug,
  warn
};

use crate::error::StorageError;
use crate::model::User;

pub const ACCESS_KEY: &str = "access";
pub const REFRESH_KEY: &str = "refresh";
pub const USER_KEY: &str = "user";

pub const SESSION_KEYS: [&str; 3] =
  [ACCESS_KEY, REFRESH_KEY, USER_KEY];

/// String key/value persistence.
///
/// `set_many` and `remove_many` must apply all of their entries in a
/// single write so a reader never observes half a session.
pub trait Storage {
  fn get(&self, key: &str) -> Option<String>;

  fn set_many(
    &self,
    entries: &[(&str, &str)]
  ) -> Result<(), StorageError>;

  fn remove_many(
    &self,
    keys: &[&str]
  ) -> Result<(), StorageError>;

  fn set(
    &self,
    key: &str,
    value: &str
  ) -> Result<(), StorageError> {
    self.set_many(&[(key, value)])
  }
}

/// Process-local storage. Clones share the same entries.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
  entries:
    Arc<Mutex<BTreeMap<String, String>>>
}

impl MemoryStorage {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn len(&self) -> usize {
    self.entries.lock().len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.lock().is_empty()
  }
}

impl Storage for MemoryStorage {
  fn get(&self, key: &str) -> Option<String> {
    self.entries.lock().get(key).cloned()
  }

  fn set_many(
    &self,
    entries: &[(&str, &str)]
  ) -> Result<(), StorageError> {
    let mut map = self.entries.lock();
    for (key, value) in entries {
      map.insert(
        (*key).to_string(),
        (*value).to_string()
      );
    }
    Ok(())
  }

  fn remove_many(
    &self,
    keys: &[&str]
  ) -> Result<(), StorageError> {
    let mut map = self.entries.lock();
    for key in keys {
      map.remove(*key);
    }
    Ok(())
  }
}

#[derive(Debug, Clone)]
pub struct SessionStore<S> {
  storage: S
}

impl<S: Storage> SessionStore<S> {
  pub fn new(storage: S) -> Self {
    Self { storage }
  }

  pub fn storage(&self) -> &S {
    &self.storage
  }

  #[tracing::instrument(skip_all)]
  pub fn save_tokens(
    &self,
    access: &str,
    refresh: &str
  ) -> Result<(), StorageError> {
    debug!("storing token pair");
    self.storage.set_many(&[
      (ACCESS_KEY, access),
      (REFRESH_KEY, refresh)
    ])
  }

  pub fn set_access_token(
    &self,
    access: &str
  ) -> Result<(), StorageError> {
    self.storage.set(ACCESS_KEY, access)
  }

  pub fn set_refresh_token(
    &self,
    refresh: &str
  ) -> Result<(), StorageError> {
    self.storage.set(REFRESH_KEY, refresh)
  }

  pub fn token(&self) -> Option<String> {
    self
      .storage
      .get(ACCESS_KEY)
      .filter(|token| !token.is_empty())
  }

  pub fn refresh_token(
    &self
  ) -> Option<String> {
    self
      .storage
      .get(REFRESH_KEY)
      .filter(|token| !token.is_empty())
  }

  pub fn is_authenticated(&self) -> bool {
    self.token().is_some()
  }

  pub fn save_user(
    &self,
    user: &User
  ) -> Result<(), StorageError> {
    let encoded =
      serde_json::to_string(user)
        .map_err(|err| {
          StorageError::Encode(
            err.to_string()
          )
        })?;
    self.storage.set(USER_KEY, &encoded)
  }

  pub fn user(&self) -> Option<User> {
    let raw = self.storage.get(USER_KEY)?;
    match serde_json::from_str(&raw) {
      | Ok(user) => Some(user),
      | Err(error) => {
        warn!(
          %error,
          "ignoring unreadable cached user"
        );
        None
      }
    }
  }

  /// Drops the whole session in one storage write.
  #[tracing::instrument(skip_all)]
  pub fn logout(
    &self
  ) -> Result<(), StorageError> {
    debug!("clearing session");
    self.storage.remove_many(&SESSION_KEYS)
  }
}
