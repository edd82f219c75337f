use percent_encoding::{
  AsciiSet,
  NON_ALPHANUMERIC,
  utf8_percent_encode
};
use tracing::instrument;

use crate::error::ApiError;
use crate::gateway::Gateway;
use crate::model::{
  Statistics,
  StatusFilter,
  Task,
  TaskEnvelope,
  TaskId,
  TaskPage,
  TaskPatch,
  TaskPayload
};
use crate::session::Storage;
use crate::transport::{
  ApiRequest,
  Transport
};

pub const TASKS_PATH: &str = "/tasks/";
pub const STATISTICS_PATH: &str =
  "/tasks/statistics/";
pub const DEFAULT_ORDERING: &str =
  "-created_at";
pub const PAGE_SIZE: u32 = 10;

const QUERY_VALUE: &AsciiSet =
  &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskQuery {
  pub page:     u32,
  pub status:   Option<StatusFilter>,
  pub search:   String,
  pub ordering: String
}

impl Default for TaskQuery {
  fn default() -> Self {
    Self {
      page:     1,
      status:   None,
      search:   String::new(),
      ordering: DEFAULT_ORDERING
        .to_string()
    }
  }
}

impl TaskQuery {
  /// `/tasks/?page=..&ordering=..` plus `status` and `search` when set.
  pub fn to_path(&self) -> String {
    let mut path = format!(
      "{TASKS_PATH}?page={}&ordering={}",
      self.page.max(1),
      encode(&self.ordering)
    );
    if let Some(status) = self.status {
      path.push_str("&status=");
      path.push_str(status.as_query());
    }
    if !self.search.is_empty() {
      path.push_str("&search=");
      path.push_str(&encode(&self.search));
    }
    path
  }
}

fn encode(value: &str) -> String {
  utf8_percent_encode(value, QUERY_VALUE)
    .to_string()
}

/// `ceil(count / PAGE_SIZE)`, never less than one page. The server
/// paginates at a fixed size and accepts no override.
pub fn total_pages(count: u64) -> u32 {
  let pages =
    count.div_ceil(u64::from(PAGE_SIZE));
  u32::try_from(pages)
    .unwrap_or(u32::MAX)
    .max(1)
}

pub fn task_path(id: TaskId) -> String {
  format!("{TASKS_PATH}{id}/")
}

#[derive(Debug)]
pub struct TaskClient<'g, T, S> {
  gateway: &'g Gateway<T, S>
}

impl<'g, T, S> TaskClient<'g, T, S>
where
  T: Transport,
  S: Storage
{
  pub fn new(
    gateway: &'g Gateway<T, S>
  ) -> Self {
    Self { gateway }
  }

  #[instrument(skip(self), fields(page = query.page, status = ?query.status))]
  pub async fn list(
    &self,
    query: &TaskQuery
  ) -> Result<TaskPage, ApiError> {
    self
      .gateway
      .send_json(ApiRequest::get(
        query.to_path()
      ))
      .await
  }

  #[instrument(skip(self))]
  pub async fn get(
    &self,
    id: TaskId
  ) -> Result<Task, ApiError> {
    self
      .gateway
      .send_json(ApiRequest::get(task_path(
        id
      )))
      .await
  }

  #[instrument(skip(self, payload), fields(title_len = payload.title.len()))]
  pub async fn create(
    &self,
    payload: &TaskPayload
  ) -> Result<Task, ApiError> {
    let request =
      ApiRequest::post(TASKS_PATH)
        .json(payload)?;
    self.gateway.send_json(request).await
  }

  #[instrument(skip(self, payload))]
  pub async fn update(
    &self,
    id: TaskId,
    payload: &TaskPayload
  ) -> Result<Task, ApiError> {
    let request =
      ApiRequest::put(task_path(id))
        .json(payload)?;
    self.gateway.send_json(request).await
  }

  #[instrument(skip(self, patch))]
  pub async fn patch(
    &self,
    id: TaskId,
    patch: &TaskPatch
  ) -> Result<Task, ApiError> {
    let request =
      ApiRequest::patch(task_path(id))
        .json(patch)?;
    self.gateway.send_json(request).await
  }

  #[instrument(skip(self))]
  pub async fn delete(
    &self,
    id: TaskId
  ) -> Result<(), ApiError> {
    self
      .gateway
      .send(ApiRequest::delete(task_path(
        id
      )))
      .await
      .map(drop)
  }

  #[instrument(skip(self))]
  pub async fn mark_complete(
    &self,
    id: TaskId
  ) -> Result<Task, ApiError> {
    self.set_completion(id, true).await
  }

  #[instrument(skip(self))]
  pub async fn mark_incomplete(
    &self,
    id: TaskId
  ) -> Result<Task, ApiError> {
    self.set_completion(id, false).await
  }

  async fn set_completion(
    &self,
    id: TaskId,
    complete: bool
  ) -> Result<Task, ApiError> {
    let action = if complete {
      "mark_complete"
    } else {
      "mark_incomplete"
    };
    let envelope: TaskEnvelope = self
      .gateway
      .send_json(ApiRequest::post(
        format!("{TASKS_PATH}{id}/{action}/")
      ))
      .await?;
    Ok(envelope.task)
  }

  #[instrument(skip(self))]
  pub async fn statistics(
    &self
  ) -> Result<Statistics, ApiError> {
    self
      .gateway
      .send_json(ApiRequest::get(
        STATISTICS_PATH
      ))
      .await
  }
}
