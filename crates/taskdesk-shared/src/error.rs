use std::collections::BTreeMap;

use serde_json::Value;

/// Field name to human readable message.
pub type FieldErrors =
  BTreeMap<String, String>;

#[derive(
  Debug,
  Clone,
  PartialEq,
  Eq,
  thiserror::Error,
)]
pub enum StorageError {
  #[error("session storage unavailable: {0}")]
  Unavailable(String),
  #[error("failed writing session storage: {0}")]
  Write(String),
  #[error("failed encoding session value: {0}")]
  Encode(String)
}

#[derive(
  Debug,
  Clone,
  PartialEq,
  thiserror::Error,
)]
pub enum ApiError {
  /// Rejected credentials or a refresh that could not be completed.
  #[error("authentication failed: {detail}")]
  Auth { detail: String },

  #[error("validation failed: {}", summarize(.fields, .detail.as_deref()))]
  Validation {
    fields: FieldErrors,
    detail: Option<String>
  },

  #[error("server responded with HTTP {status}{}", .detail.as_deref().map(|d| format!(": {d}")).unwrap_or_default())]
  Server {
    status: u16,
    detail: Option<String>
  },

  #[error("network error: {0}")]
  Network(String),

  #[error("unexpected payload: {0}")]
  Decode(String),

  #[error(transparent)]
  Storage(#[from] StorageError)
}

impl ApiError {
  /// Classifies a non-2xx response.
  pub fn from_response(
    status: u16,
    body: &str
  ) -> Self {
    let parsed =
      serde_json::from_str::<Value>(body)
        .ok();
    let detail = parsed
      .as_ref()
      .and_then(extract_detail);

    match status {
      | 401 => ApiError::Auth {
        detail: detail.unwrap_or_else(
          || {
            "authentication \
             credentials were not \
             accepted"
              .to_string()
          }
        )
      },
      | 400 => {
        let fields = parsed
          .as_ref()
          .map(extract_field_errors)
          .unwrap_or_default();
        ApiError::Validation {
          fields,
          detail
        }
      }
      | _ => ApiError::Server {
        status,
        detail
      }
    }
  }

  /// The server supplied explanation, if any.
  pub fn detail(&self) -> Option<&str> {
    match self {
      | ApiError::Auth { detail } => {
        Some(detail.as_str())
      }
      | ApiError::Validation {
        detail,
        ..
      }
      | ApiError::Server {
        detail,
        ..
      } => detail.as_deref(),
      | _ => None
    }
  }

  pub fn field_errors(
    &self
  ) -> Option<&FieldErrors> {
    match self {
      | ApiError::Validation {
        fields,
        ..
      } if !fields.is_empty() => {
        Some(fields)
      }
      | _ => None
    }
  }

  pub fn is_auth(&self) -> bool {
    matches!(self, ApiError::Auth { .. })
  }
}

const DETAIL_KEYS: [&str; 3] =
  ["detail", "error", "non_field_errors"];

fn extract_detail(
  value: &Value
) -> Option<String> {
  let object = value.as_object()?;
  DETAIL_KEYS.iter().find_map(|key| {
    object.get(*key).and_then(flatten_message)
  })
}

fn extract_field_errors(
  value: &Value
) -> FieldErrors {
  let Some(object) = value.as_object()
  else {
    return FieldErrors::new();
  };

  object
    .iter()
    .filter(|(key, _)| {
      !DETAIL_KEYS.contains(&key.as_str())
    })
    .filter_map(|(key, value)| {
      flatten_message(value)
        .map(|msg| (key.clone(), msg))
    })
    .collect()
}

fn flatten_message(
  value: &Value
) -> Option<String> {
  match value {
    | Value::String(text) => {
      Some(text.clone())
    }
    | Value::Array(items) => {
      let parts: Vec<String> = items
        .iter()
        .filter_map(flatten_message)
        .collect();
      if parts.is_empty() {
        None
      } else {
        Some(parts.join(" "))
      }
    }
    | _ => None
  }
}

fn summarize(
  fields: &FieldErrors,
  detail: Option<&str>
) -> String {
  let mut parts: Vec<String> = fields
    .iter()
    .map(|(field, msg)| {
      format!("{field}: {msg}")
    })
    .collect();
  if let Some(detail) = detail {
    parts.insert(0, detail.to_string());
  }
  if parts.is_empty() {
    "request rejected".to_string()
  } else {
    parts.join("; ")
  }
}
