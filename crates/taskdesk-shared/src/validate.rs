use std::sync::LazyLock;

use chrono::{
  NaiveDate,
  NaiveTime
};
use regex::Regex;

use crate::error::FieldErrors;
use crate::model::{
  PasswordChange,
  RegisterRequest,
  Task,
  TaskPayload,
  TaskPriority
};

pub const TITLE_MIN: usize = 3;
pub const TITLE_MAX: usize = 255;
pub const DESCRIPTION_MAX: usize = 5000;
pub const DATE_FORMAT: &str = "%Y-%m-%d";

const REQUIRED: &str =
  "This field is required.";

static EMAIL: LazyLock<Regex> =
  LazyLock::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$")
      .expect("email pattern compiles")
  });

/// The create/edit form as typed by the user.
#[derive(
  Debug, Clone, PartialEq, Eq, Default,
)]
pub struct TaskDraft {
  pub title:       String,
  pub description: String,
  pub priority:    TaskPriority,
  /// `YYYY-MM-DD`, or empty for no due date.
  pub due_date:    String
}

impl TaskDraft {
  pub fn from_task(task: &Task) -> Self {
    Self {
      title:       task.title.clone(),
      description: task
        .description
        .clone()
        .unwrap_or_default(),
      priority:    task.priority,
      due_date:    task
        .due_date
        .map(|due| {
          due
            .date_naive()
            .format(DATE_FORMAT)
            .to_string()
        })
        .unwrap_or_default()
    }
  }

  pub fn field(
    &self,
    name: &str
  ) -> Option<String> {
    match name {
      | "title" => Some(self.title.clone()),
      | "description" => {
        Some(self.description.clone())
      }
      | "priority" => Some(
        self.priority.as_str().to_string()
      ),
      | "due_date" => {
        Some(self.due_date.clone())
      }
      | _ => None
    }
  }
}

/// Checks a draft the way the form does before anything is sent.
/// A due date is sent as the last second of that day, UTC.
pub fn validate_task_draft(
  draft: &TaskDraft,
  today: NaiveDate
) -> Result<TaskPayload, FieldErrors> {
  let mut errors = FieldErrors::new();

  let title = draft.title.trim();
  let title_len = title.chars().count();
  if title.is_empty() {
    errors.insert(
      "title".to_string(),
      "Title is required".to_string()
    );
  } else if title_len < TITLE_MIN {
    errors.insert(
      "title".to_string(),
      format!(
        "Title must be at least \
         {TITLE_MIN} characters"
      )
    );
  } else if title_len > TITLE_MAX {
    errors.insert(
      "title".to_string(),
      format!(
        "Title must be less than \
         {TITLE_MAX} characters"
      )
    );
  }

  if draft.description.chars().count()
    > DESCRIPTION_MAX
  {
    errors.insert(
      "description".to_string(),
      format!(
        "Description must be less than \
         {DESCRIPTION_MAX} characters"
      )
    );
  }

  let due = draft.due_date.trim();
  let mut due_date = None;
  if !due.is_empty() {
    match NaiveDate::parse_from_str(
      due,
      DATE_FORMAT
    ) {
      | Ok(date) if date < today => {
        errors.insert(
          "due_date".to_string(),
          "Due date cannot be in the past"
            .to_string()
        );
      }
      | Ok(date) => {
        let end_of_day = NaiveTime::from_hms_opt(
          23, 59, 59
        )
        .unwrap_or(NaiveTime::MIN);
        due_date = Some(
          date.and_time(end_of_day).and_utc()
        );
      }
      | Err(_) => {
        errors.insert(
          "due_date".to_string(),
          "Due date must be a valid date \
           (YYYY-MM-DD)"
            .to_string()
        );
      }
    }
  }

  if !errors.is_empty() {
    return Err(errors);
  }

  Ok(TaskPayload {
    title: title.to_string(),
    description: draft.description.clone(),
    priority: draft.priority,
    due_date
  })
}

pub fn validate_login(
  username: &str,
  password: &str
) -> Result<(), FieldErrors> {
  let mut errors = FieldErrors::new();
  require(&mut errors, "username", username);
  require(&mut errors, "password", password);
  finish(errors)
}

pub fn validate_registration(
  request: &RegisterRequest
) -> Result<(), FieldErrors> {
  let mut errors = FieldErrors::new();
  require(
    &mut errors,
    "username",
    &request.username
  );
  require(&mut errors, "email", &request.email);
  require(
    &mut errors,
    "first_name",
    &request.first_name
  );
  require(
    &mut errors,
    "last_name",
    &request.last_name
  );
  require(
    &mut errors,
    "password",
    &request.password
  );
  require(
    &mut errors,
    "password2",
    &request.password2
  );

  let email = request.email.trim();
  if !email.is_empty() && !EMAIL.is_match(email)
  {
    errors.insert(
      "email".to_string(),
      "Enter a valid email address."
        .to_string()
    );
  }

  if !request.password2.is_empty()
    && request.password != request.password2
  {
    errors.insert(
      "password2".to_string(),
      "Passwords do not match".to_string()
    );
  }

  finish(errors)
}

pub fn validate_password_change(
  change: &PasswordChange
) -> Result<(), FieldErrors> {
  let mut errors = FieldErrors::new();
  require(
    &mut errors,
    "old_password",
    &change.old_password
  );
  require(
    &mut errors,
    "new_password",
    &change.new_password
  );
  if change.new_password
    != change.new_password2
  {
    errors.insert(
      "new_password2".to_string(),
      "New passwords do not match"
        .to_string()
    );
  }
  finish(errors)
}

fn require(
  errors: &mut FieldErrors,
  field: &str,
  value: &str
) {
  if value.trim().is_empty() {
    errors.insert(
      field.to_string(),
      REQUIRED.to_string()
    );
  }
}

fn finish(
  errors: FieldErrors
) -> Result<(), FieldErrors> {
  if errors.is_empty() {
    Ok(())
  } else {
    Err(errors)
  }
}
