use taskdesk_shared::{
  Storage,
  StorageError
};

/// Session storage in `window.localStorage`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BrowserStorage;

impl BrowserStorage {
  fn local() -> Result<web_sys::Storage, StorageError> {
    web_sys::window()
      .and_then(|window| {
        window
          .local_storage()
          .ok()
          .flatten()
      })
      .ok_or_else(|| {
        StorageError::Unavailable(
          "localStorage is not available"
            .to_string()
        )
      })
  }
}

impl Storage for BrowserStorage {
  fn get(&self, key: &str) -> Option<String> {
    Self::local()
      .ok()?
      .get_item(key)
      .ok()
      .flatten()
  }

  fn set_many(
    &self,
    entries: &[(&str, &str)]
  ) -> Result<(), StorageError> {
    let storage = Self::local()?;
    for (key, value) in entries {
      storage.set_item(key, value).map_err(
        |err| {
          StorageError::Write(format!(
            "{key}: {err:?}"
          ))
        }
      )?;
    }
    Ok(())
  }

  fn remove_many(
    &self,
    keys: &[&str]
  ) -> Result<(), StorageError> {
    let storage = Self::local()?;
    for key in keys {
      storage.remove_item(key).map_err(
        |err| {
          StorageError::Write(format!(
            "{key}: {err:?}"
          ))
        }
      )?;
    }
    Ok(())
  }
}
