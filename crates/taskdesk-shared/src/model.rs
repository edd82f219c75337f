use std::fmt;
use std::str::FromStr;

use chrono::{
  DateTime,
  Utc
};
use serde::{
  Deserialize,
  Serialize
};

pub type TaskId = u64;

#[derive(
  Debug,
  Clone,
  Copy,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
  Hash,
  Default,
)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
  Low,
  #[default]
  Medium,
  High
}

impl TaskPriority {
  pub const ALL: [TaskPriority; 3] = [
    TaskPriority::Low,
    TaskPriority::Medium,
    TaskPriority::High
  ];

  pub fn as_str(self) -> &'static str {
    match self {
      | TaskPriority::Low => "low",
      | TaskPriority::Medium => "medium",
      | TaskPriority::High => "high"
    }
  }

  pub fn label(self) -> &'static str {
    match self {
      | TaskPriority::Low => "Low",
      | TaskPriority::Medium => "Medium",
      | TaskPriority::High => "High"
    }
  }
}

impl fmt::Display for TaskPriority {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(
  Debug, Clone, PartialEq, Eq,
  thiserror::Error,
)]
#[error("unknown {kind}: {value}")]
pub struct ParseEnumError {
  pub kind:  &'static str,
  pub value: String
}

impl FromStr for TaskPriority {
  type Err = ParseEnumError;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str()
    {
      | "low" | "l" => Ok(Self::Low),
      | "medium" | "m" => {
        Ok(Self::Medium)
      }
      | "high" | "h" => Ok(Self::High),
      | other => Err(ParseEnumError {
        kind:  "priority",
        value: other.to_string()
      })
    }
  }
}

/// Server-side list filter on the boolean completion status.
#[derive(
  Debug,
  Clone,
  Copy,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
  Hash,
)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
  Pending,
  Completed
}

impl StatusFilter {
  pub fn as_query(self) -> &'static str {
    match self {
      | StatusFilter::Pending => {
        "pending"
      }
      | StatusFilter::Completed => {
        "completed"
      }
    }
  }
}

impl FromStr for StatusFilter {
  type Err = ParseEnumError;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str()
    {
      | "pending" => Ok(Self::Pending),
      | "completed" | "done" => {
        Ok(Self::Completed)
      }
      | other => Err(ParseEnumError {
        kind:  "status filter",
        value: other.to_string()
      })
    }
  }
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
)]
pub struct Task {
  pub id:          TaskId,
  pub title:       String,
  #[serde(default)]
  pub description: Option<String>,
  #[serde(default)]
  pub priority:    TaskPriority,
  #[serde(default)]
  pub due_date:    Option<DateTime<Utc>>,
  #[serde(default)]
  pub status:      bool,
  pub created_at:  DateTime<Utc>,
  #[serde(default)]
  pub updated_at:  Option<DateTime<Utc>>
}

impl Task {
  pub fn is_overdue(
    &self,
    now: DateTime<Utc>
  ) -> bool {
    !self.status
      && self
        .due_date
        .map(|due| due < now)
        .unwrap_or(false)
  }

  pub fn status_label(&self) -> &'static str {
    if self.status {
      "Completed"
    } else {
      "Pending"
    }
  }
}

/// One page of the task list.
///
/// The list endpoint is paginated (`{results, count}`), but a bare
/// array is accepted too and treated as a single complete page.
#[derive(
  Debug, Clone, PartialEq, Deserialize,
)]
#[serde(from = "TaskListBody")]
pub struct TaskPage {
  pub results: Vec<Task>,
  pub count:   u64
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TaskListBody {
  Paged {
    results: Vec<Task>,
    #[serde(default)]
    count:   Option<u64>
  },
  Plain(Vec<Task>)
}

impl From<TaskListBody> for TaskPage {
  fn from(body: TaskListBody) -> Self {
    match body {
      | TaskListBody::Paged {
        results,
        count
      } => {
        let count = count.unwrap_or(
          results.len() as u64
        );
        Self { results, count }
      }
      | TaskListBody::Plain(results) => {
        let count = results.len() as u64;
        Self { results, count }
      }
    }
  }
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Default,
)]
pub struct Statistics {
  pub total_tasks:           u64,
  pub completed_tasks:       u64,
  pub pending_tasks:         u64,
  pub completion_percentage: f64
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
pub struct User {
  pub id:         u64,
  pub username:   String,
  #[serde(default)]
  pub email:      String,
  #[serde(default)]
  pub first_name: String,
  #[serde(default)]
  pub last_name:  String
}

impl User {
  pub fn display_name(&self) -> String {
    let full = format!(
      "{} {}",
      self.first_name.trim(),
      self.last_name.trim()
    );
    let full = full.trim();
    if full.is_empty() {
      self.username.clone()
    } else {
      full.to_string()
    }
  }
}

/// Body for `POST /tasks/` and `PUT /tasks/{id}/`.
#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
)]
pub struct TaskPayload {
  pub title:       String,
  pub description: String,
  pub priority:    TaskPriority,
  pub due_date:    Option<DateTime<Utc>>
}

/// Body for `PATCH /tasks/{id}/`; absent fields are left untouched.
#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Default,
)]
pub struct TaskPatch {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub title:       Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub priority:    Option<TaskPriority>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub due_date:
    Option<Option<DateTime<Utc>>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub status:      Option<bool>
}

#[derive(
  Debug, Clone, Serialize, Deserialize,
)]
pub(crate) struct TaskEnvelope {
  #[serde(default)]
  pub message: Option<String>,
  pub task:    Task
}

#[derive(
  Debug, Clone, Serialize, Deserialize,
)]
pub struct LoginRequest {
  pub username: String,
  pub password: String
}

#[derive(
  Debug, Clone, Serialize, Deserialize,
)]
pub struct TokenPair {
  pub access:  String,
  pub refresh: String
}

#[derive(
  Debug, Clone, Serialize, Deserialize,
)]
pub(crate) struct RefreshRequest {
  pub refresh: String
}

#[derive(
  Debug, Clone, Serialize, Deserialize,
)]
pub(crate) struct RefreshResponse {
  pub access:  String,
  #[serde(default)]
  pub refresh: Option<String>
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
  Default,
)]
pub struct RegisterRequest {
  pub username:   String,
  pub email:      String,
  pub first_name: String,
  pub last_name:  String,
  pub password:   String,
  pub password2:  String
}

#[derive(
  Debug, Clone, Serialize, Deserialize,
)]
pub(crate) struct UserEnvelope {
  #[serde(default)]
  pub message: Option<String>,
  #[serde(default)]
  pub user:    Option<User>
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
  Default,
)]
pub struct ProfileUpdate {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub email:      Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub first_name: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub last_name:  Option<String>
}

impl ProfileUpdate {
  pub fn is_empty(&self) -> bool {
    self.email.is_none()
      && self.first_name.is_none()
      && self.last_name.is_none()
  }
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
  Default,
)]
pub struct PasswordChange {
  pub old_password:  String,
  pub new_password:  String,
  pub new_password2: String
}

#[cfg(test)]
mod model_tests {
  use super::*;

  const TASK_JSON: &str = r#"{
    "id": 7,
    "title": "Write report",
    "description": null,
    "status": false,
    "status_display": "Pending",
    "priority": "high",
    "priority_display": "High",
    "created_at": "2026-10-01T09:30:00.123456Z",
    "updated_at": "2026-10-02T10:00:00+00:00",
    "due_date": "2026-10-20T23:59:59Z"
  }"#;

  #[test]
  fn task_deserializes_server_shape_and_ignores_display_fields()
  {
    let task: Task =
      serde_json::from_str(TASK_JSON)
        .expect("task json");
    assert_eq!(task.id, 7);
    assert_eq!(
      task.priority,
      TaskPriority::High
    );
    assert!(task.description.is_none());
    assert!(task.due_date.is_some());
    assert_eq!(
      task.status_label(),
      "Pending"
    );
  }

  #[test]
  fn task_page_accepts_paged_and_bare_bodies()
  {
    let paged = format!(
      r#"{{"count": 25, "next": null, "previous": null, "results": [{TASK_JSON}]}}"#
    );
    let page: TaskPage =
      serde_json::from_str(&paged)
        .expect("paged body");
    assert_eq!(page.count, 25);
    assert_eq!(page.results.len(), 1);

    let bare = format!("[{TASK_JSON}]");
    let page: TaskPage =
      serde_json::from_str(&bare)
        .expect("bare body");
    assert_eq!(page.count, 1);
  }

  #[test]
  fn overdue_only_applies_to_pending_tasks()
  {
    let mut task: Task =
      serde_json::from_str(TASK_JSON)
        .expect("task json");
    let later = "2026-11-01T00:00:00Z"
      .parse::<DateTime<Utc>>()
      .expect("timestamp");
    assert!(task.is_overdue(later));
    task.status = true;
    assert!(!task.is_overdue(later));
  }

  #[test]
  fn patch_serializes_only_present_fields()
  {
    let patch = TaskPatch {
      priority: Some(TaskPriority::Low),
      due_date: Some(None),
      ..TaskPatch::default()
    };
    let value =
      serde_json::to_value(&patch)
        .expect("patch json");
    assert_eq!(
      value,
      serde_json::json!({
        "priority": "low",
        "due_date": null
      })
    );
  }

  #[test]
  fn display_name_falls_back_to_username()
  {
    let user = User {
      id:         1,
      username:   "sam".to_string(),
      email:      String::new(),
      first_name: " ".to_string(),
      last_name:  String::new()
    };
    assert_eq!(user.display_name(), "sam");
  }
}
