//! Application state and the reducer that drives it.
//!
//! [`Controller::update`] takes one [`Msg`] (a user intent or the
//! result of earlier I/O) and returns the [`Command`]s to run. It never
//! performs I/O itself; a runtime executes the commands and feeds their
//! results back in as messages.
//!
//! List fetches are numbered. A list response whose number is older
//! than the newest issued fetch is dropped, so a slow earlier response
//! can not overwrite a fresher page.

use std::time::Duration;

use chrono::NaiveDate;
use tracing::{
  debug,
  error,
  warn
};

use crate::error::{
  ApiError,
  FieldErrors
};
use crate::model::{
  RegisterRequest,
  Statistics,
  StatusFilter,
  Task,
  TaskId,
  TaskPage,
  TaskPayload,
  User
};
use crate::tasks::{
  TaskQuery,
  total_pages
};
use crate::validate::{
  TaskDraft,
  validate_login,
  validate_registration,
  validate_task_draft
};

pub const SEARCH_DEBOUNCE: Duration =
  Duration::from_millis(500);
pub const MESSAGE_TTL: Duration =
  Duration::from_secs(3);

pub const LOAD_FAILED: &str =
  "Failed to load tasks. Please try again.";
pub const SESSION_EXPIRED: &str =
  "Your session has expired. Please log \
   in again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
  pub search_debounce: Duration,
  pub message_ttl:     Duration
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      search_debounce: SEARCH_DEBOUNCE,
      message_ttl:     MESSAGE_TTL
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
  Unauthenticated,
  Authenticated
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthView {
  Login,
  Register
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListState {
  Idle,
  Loading,
  Loaded,
  Errored(String)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BannerKind {
  Success,
  Error
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Banner {
  pub kind: BannerKind,
  pub text: String,
  id:       u64
}

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
)]
pub enum Timer {
  SearchDebounce(u64),
  ClearBanner(u64)
}

/// Page, status filter and search term of the visible list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryState {
  pub page:   u32,
  pub filter: Option<StatusFilter>,
  pub search: String
}

impl Default for QueryState {
  fn default() -> Self {
    Self {
      page:   1,
      filter: None,
      search: String::new()
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
  Create(TaskPayload),
  Update(TaskId, TaskPayload),
  Delete(TaskId),
  SetComplete(TaskId, bool)
}

impl Mutation {
  fn success_message(&self) -> &'static str {
    match self {
      | Mutation::Create(_) => {
        "Task created successfully!"
      }
      | Mutation::Update(..) => {
        "Task updated successfully!"
      }
      | Mutation::Delete(_) => {
        "Task deleted successfully!"
      }
      | Mutation::SetComplete(_, true) => {
        "Task marked as completed"
      }
      | Mutation::SetComplete(_, false) => {
        "Task marked as incomplete"
      }
    }
  }

  fn failure_message(
    &self,
    err: &ApiError
  ) -> String {
    match self {
      | Mutation::Create(_)
      | Mutation::Update(..) => err
        .detail()
        .map(str::to_string)
        .unwrap_or_else(|| {
          "Failed to save task. Please \
           try again."
            .to_string()
        }),
      | Mutation::Delete(_) => {
        "Failed to delete task. Please \
         try again."
          .to_string()
      }
      | Mutation::SetComplete(..) => {
        "Failed to update task status. \
         Please try again."
          .to_string()
      }
    }
  }
}

/// Effects requested by the controller.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
  LoadProfile,
  Login {
    username: String,
    password: String
  },
  Register(RegisterRequest),
  ClearSession,
  FetchTasks {
    request: u64,
    query:   TaskQuery
  },
  FetchStatistics,
  Mutate(Mutation),
  /// Arms `timer`, replacing any earlier arming of the same timer.
  StartTimer {
    timer: Timer,
    after: Duration
  },
  CancelTimer(Timer)
}

#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
  Started {
    has_session: bool
  },
  ProfileLoaded(Result<User, ApiError>),
  ShowLogin,
  ShowRegister,
  LoginSubmitted {
    username: String,
    password: String
  },
  RegisterSubmitted(RegisterRequest),
  AuthFinished(Result<User, ApiError>),
  LogoutRequested,
  SessionExpired,
  FilterChanged(Option<StatusFilter>),
  SearchChanged(String),
  PageRequested(u32),
  Refresh,
  TasksFetched {
    request: u64,
    result:  Result<TaskPage, ApiError>
  },
  StatisticsFetched(
    Result<Statistics, ApiError>
  ),
  DraftEdited(TaskDraft),
  SubmitDraft {
    today: NaiveDate
  },
  EditRequested(Task),
  EditCancelled,
  ToggleComplete(TaskId),
  SetComplete {
    id:       TaskId,
    complete: bool
  },
  DeleteRequested(TaskId),
  DeleteConfirmed,
  DeleteCancelled,
  MutationFinished(Result<(), ApiError>),
  TimerFired(Timer),
  DismissBanner
}

#[derive(Debug, Clone)]
pub struct Controller {
  settings:        Settings,
  auth:            AuthState,
  auth_view:       AuthView,
  auth_busy:       bool,
  auth_error:      Option<String>,
  auth_fields:     FieldErrors,
  user:            Option<User>,
  query:           QueryState,
  list:            ListState,
  tasks:           Vec<Task>,
  total_pages:     u32,
  statistics:      Option<Statistics>,
  draft:           TaskDraft,
  draft_errors:    FieldErrors,
  editing:         Option<Task>,
  pending_delete:  Option<TaskId>,
  in_flight:       Option<Mutation>,
  banner:          Option<Banner>,
  fetch_seq:       u64,
  fetch_page:      u32,
  search_seq:      u64,
  pending_search:  Option<u64>,
  banner_seq:      u64
}

impl Default for Controller {
  fn default() -> Self {
    Self::new(Settings::default())
  }
}

impl Controller {
  pub fn new(settings: Settings) -> Self {
    Self {
      settings,
      auth: AuthState::Unauthenticated,
      auth_view: AuthView::Login,
      auth_busy: false,
      auth_error: None,
      auth_fields: FieldErrors::new(),
      user: None,
      query: QueryState::default(),
      list: ListState::Idle,
      tasks: Vec::new(),
      total_pages: 1,
      statistics: None,
      draft: TaskDraft::default(),
      draft_errors: FieldErrors::new(),
      editing: None,
      pending_delete: None,
      in_flight: None,
      banner: None,
      fetch_seq: 0,
      fetch_page: 1,
      search_seq: 0,
      pending_search: None,
      banner_seq: 0
    }
  }

  pub fn settings(&self) -> &Settings {
    &self.settings
  }

  pub fn auth_state(&self) -> AuthState {
    self.auth
  }

  pub fn is_authenticated(&self) -> bool {
    self.auth == AuthState::Authenticated
  }

  pub fn auth_view(&self) -> AuthView {
    self.auth_view
  }

  pub fn auth_busy(&self) -> bool {
    self.auth_busy
  }

  pub fn auth_error(&self) -> Option<&str> {
    self.auth_error.as_deref()
  }

  pub fn auth_fields(&self) -> &FieldErrors {
    &self.auth_fields
  }

  pub fn user(&self) -> Option<&User> {
    self.user.as_ref()
  }

  pub fn query(&self) -> &QueryState {
    &self.query
  }

  pub fn list_state(&self) -> &ListState {
    &self.list
  }

  pub fn tasks(&self) -> &[Task] {
    &self.tasks
  }

  pub fn total_pages(&self) -> u32 {
    self.total_pages
  }

  pub fn statistics(
    &self
  ) -> Option<&Statistics> {
    self.statistics.as_ref()
  }

  pub fn draft(&self) -> &TaskDraft {
    &self.draft
  }

  pub fn draft_errors(&self) -> &FieldErrors {
    &self.draft_errors
  }

  pub fn editing(&self) -> Option<&Task> {
    self.editing.as_ref()
  }

  pub fn pending_delete(
    &self
  ) -> Option<TaskId> {
    self.pending_delete
  }

  pub fn banner(&self) -> Option<&Banner> {
    self.banner.as_ref()
  }

  /// True while a list fetch or a mutation is outstanding.
  pub fn is_loading(&self) -> bool {
    self.list == ListState::Loading
      || self.in_flight.is_some()
  }

  pub fn update(
    &mut self,
    msg: Msg
  ) -> Vec<Command> {
    match msg {
      | Msg::Started { has_session } => {
        if has_session {
          self.auth_busy = true;
          vec![Command::LoadProfile]
        } else {
          vec![]
        }
      }
      | Msg::ProfileLoaded(Ok(user)) => {
        self.auth_busy = false;
        self.user = Some(user);
        self.authenticate()
      }
      | Msg::ProfileLoaded(Err(err)) => {
        warn!(
          error = %err,
          "stored session rejected; \
           logging out"
        );
        self.auth_busy = false;
        vec![Command::ClearSession]
      }
      | Msg::ShowLogin => {
        self.switch_auth_view(AuthView::Login);
        vec![]
      }
      | Msg::ShowRegister => {
        self.switch_auth_view(
          AuthView::Register
        );
        vec![]
      }
      | Msg::LoginSubmitted {
        username,
        password
      } => {
        if self.auth_busy
          || self.is_authenticated()
        {
          return vec![];
        }
        self.auth_error = None;
        if let Err(fields) =
          validate_login(&username, &password)
        {
          self.auth_fields = fields;
          return vec![];
        }
        self.auth_fields.clear();
        self.auth_busy = true;
        vec![Command::Login {
          username,
          password
        }]
      }
      | Msg::RegisterSubmitted(request) => {
        if self.auth_busy
          || self.is_authenticated()
        {
          return vec![];
        }
        self.auth_error = None;
        if let Err(fields) =
          validate_registration(&request)
        {
          self.auth_fields = fields;
          return vec![];
        }
        self.auth_fields.clear();
        self.auth_busy = true;
        vec![Command::Register(request)]
      }
      | Msg::AuthFinished(Ok(user)) => {
        self.auth_busy = false;
        self.auth_error = None;
        self.auth_fields.clear();
        self.auth_view = AuthView::Login;
        self.user = Some(user);
        self.authenticate()
      }
      | Msg::AuthFinished(Err(err)) => {
        self.auth_busy = false;
        self.fail_auth(err);
        vec![]
      }
      | Msg::LogoutRequested => {
        let mut commands =
          self.reset_session();
        commands.push(Command::ClearSession);
        commands
      }
      | Msg::SessionExpired => {
        if !self.is_authenticated() {
          return vec![];
        }
        let commands = self.reset_session();
        self.auth_error =
          Some(SESSION_EXPIRED.to_string());
        commands
      }
      | Msg::FilterChanged(filter) => {
        self.query.filter = filter;
        self.query.page = 1;
        if self.is_authenticated() {
          vec![self.fetch(1)]
        } else {
          vec![]
        }
      }
      | Msg::SearchChanged(term) => {
        self.query.search = term;
        self.query.page = 1;
        if !self.is_authenticated() {
          return vec![];
        }
        let mut commands = Vec::with_capacity(2);
        if let Some(previous) =
          self.pending_search.take()
        {
          commands.push(Command::CancelTimer(
            Timer::SearchDebounce(previous)
          ));
        }
        self.search_seq += 1;
        self.pending_search =
          Some(self.search_seq);
        commands.push(Command::StartTimer {
          timer: Timer::SearchDebounce(
            self.search_seq
          ),
          after: self.settings.search_debounce
        });
        commands
      }
      | Msg::PageRequested(page) => {
        if !self.is_authenticated() {
          return vec![];
        }
        let page =
          page.clamp(1, self.total_pages);
        vec![self.fetch(page)]
      }
      | Msg::Refresh => {
        if !self.is_authenticated() {
          return vec![];
        }
        vec![self.fetch(self.query.page)]
      }
      | Msg::TasksFetched {
        request,
        result
      } => self.tasks_fetched(request, result),
      | Msg::StatisticsFetched(Ok(stats)) => {
        self.statistics = Some(stats);
        vec![]
      }
      | Msg::StatisticsFetched(Err(err)) => {
        warn!(
          error = %err,
          "failed fetching statistics"
        );
        vec![]
      }
      | Msg::DraftEdited(draft) => {
        let previous = std::mem::replace(
          &mut self.draft,
          draft
        );
        self.draft_errors.retain(|field, _| {
          previous.field(field)
            == self.draft.field(field)
        });
        vec![]
      }
      | Msg::SubmitDraft { today } => {
        if self.in_flight.is_some()
          || !self.is_authenticated()
        {
          return vec![];
        }
        match validate_task_draft(
          &self.draft,
          today
        ) {
          | Err(errors) => {
            self.draft_errors = errors;
            vec![]
          }
          | Ok(payload) => {
            self.draft_errors.clear();
            let mutation = match &self.editing
            {
              | Some(task) => Mutation::Update(
                task.id, payload
              ),
              | None => {
                Mutation::Create(payload)
              }
            };
            self.start_mutation(mutation)
          }
        }
      }
      | Msg::EditRequested(task) => {
        self.draft =
          TaskDraft::from_task(&task);
        self.draft_errors.clear();
        self.editing = Some(task);
        vec![]
      }
      | Msg::EditCancelled => {
        self.editing = None;
        self.draft = TaskDraft::default();
        self.draft_errors.clear();
        vec![]
      }
      | Msg::ToggleComplete(id) => {
        let Some(task) = self
          .tasks
          .iter()
          .find(|task| task.id == id)
        else {
          warn!(
            id,
            "toggle requested for a task \
             not on this page"
          );
          return vec![];
        };
        let complete = !task.status;
        self.update(Msg::SetComplete {
          id,
          complete
        })
      }
      | Msg::SetComplete { id, complete } => {
        if self.in_flight.is_some()
          || !self.is_authenticated()
        {
          return vec![];
        }
        self.start_mutation(
          Mutation::SetComplete(id, complete)
        )
      }
      | Msg::DeleteRequested(id) => {
        if self.is_authenticated() {
          self.pending_delete = Some(id);
        }
        vec![]
      }
      | Msg::DeleteConfirmed => {
        if self.in_flight.is_some() {
          return vec![];
        }
        match self.pending_delete.take() {
          | Some(id) => self.start_mutation(
            Mutation::Delete(id)
          ),
          | None => vec![]
        }
      }
      | Msg::DeleteCancelled => {
        self.pending_delete = None;
        vec![]
      }
      | Msg::MutationFinished(result) => {
        self.mutation_finished(result)
      }
      | Msg::TimerFired(timer) => {
        self.timer_fired(timer)
      }
      | Msg::DismissBanner => {
        self.banner = None;
        vec![]
      }
    }
  }

  fn switch_auth_view(
    &mut self,
    view: AuthView
  ) {
    if self.auth_view == view {
      return;
    }
    self.auth_view = view;
    self.auth_error = None;
    self.auth_fields.clear();
  }

  fn fail_auth(&mut self, err: ApiError) {
    warn!(error = %err, "authentication failed");
    if let Some(fields) = err.field_errors() {
      self.auth_fields = fields.clone();
    }
    let fallback = match self.auth_view {
      | AuthView::Login => {
        "Login failed. Please try again."
      }
      | AuthView::Register => {
        "Registration failed. Please try \
         again."
      }
    };
    self.auth_error = match err.detail() {
      | Some(detail) => {
        Some(detail.to_string())
      }
      | None if err.field_errors().is_some() => {
        None
      }
      | None => Some(fallback.to_string())
    };
  }

  fn authenticate(&mut self) -> Vec<Command> {
    self.auth = AuthState::Authenticated;
    self.query.page = 1;
    vec![self.fetch(1)]
  }

  fn reset_session(&mut self) -> Vec<Command> {
    let mut commands = Vec::new();
    if let Some(pending) =
      self.pending_search.take()
    {
      commands.push(Command::CancelTimer(
        Timer::SearchDebounce(pending)
      ));
    }
    let settings = self.settings;
    let fetch_seq = self.fetch_seq;
    let banner_seq = self.banner_seq;
    let search_seq = self.search_seq;
    *self = Self::new(settings);
    // Keep numbering monotonic so stragglers from the old session are
    // recognised as stale.
    self.fetch_seq = fetch_seq;
    self.banner_seq = banner_seq;
    self.search_seq = search_seq;
    commands
  }

  fn fetch(&mut self, page: u32) -> Command {
    self.fetch_seq += 1;
    self.fetch_page = page;
    self.list = ListState::Loading;
    debug!(
      request = self.fetch_seq,
      page,
      "fetching tasks"
    );
    Command::FetchTasks {
      request: self.fetch_seq,
      query:   TaskQuery {
        page,
        status: self.query.filter,
        search: self.query.search.clone(),
        ..TaskQuery::default()
      }
    }
  }

  fn tasks_fetched(
    &mut self,
    request: u64,
    result: Result<TaskPage, ApiError>
  ) -> Vec<Command> {
    if request != self.fetch_seq
      || !self.is_authenticated()
    {
      debug!(
        request,
        latest = self.fetch_seq,
        "dropping stale task list response"
      );
      return vec![];
    }

    match result {
      | Ok(page) => {
        self.total_pages =
          total_pages(page.count);
        self.tasks = page.results;
        self.query.page = self.fetch_page;
        self.list = ListState::Loaded;
        vec![Command::FetchStatistics]
      }
      | Err(err) => {
        error!(
          error = %err,
          "failed fetching tasks"
        );
        self.list =
          ListState::Errored(LOAD_FAILED.to_string());
        vec![]
      }
    }
  }

  fn start_mutation(
    &mut self,
    mutation: Mutation
  ) -> Vec<Command> {
    debug!(?mutation, "starting mutation");
    self.in_flight = Some(mutation.clone());
    vec![Command::Mutate(mutation)]
  }

  fn mutation_finished(
    &mut self,
    result: Result<(), ApiError>
  ) -> Vec<Command> {
    let Some(mutation) = self.in_flight.take()
    else {
      return vec![];
    };

    match result {
      | Ok(()) => {
        if matches!(
          mutation,
          Mutation::Create(_)
            | Mutation::Update(..)
        ) {
          self.editing = None;
          self.draft = TaskDraft::default();
        }
        let mut commands = vec![self.show_banner(
          BannerKind::Success,
          mutation.success_message().to_string()
        )];
        if self.is_authenticated() {
          commands.push(
            self.fetch(self.query.page)
          );
        }
        commands
      }
      | Err(err) => {
        error!(
          error = %err,
          ?mutation,
          "mutation failed"
        );
        if let Some(fields) = err.field_errors()
        {
          self.draft_errors = fields.clone();
        }
        let text =
          mutation.failure_message(&err);
        vec![self.show_banner(
          BannerKind::Error,
          text
        )]
      }
    }
  }

  fn show_banner(
    &mut self,
    kind: BannerKind,
    text: String
  ) -> Command {
    self.banner_seq += 1;
    self.banner = Some(Banner {
      kind,
      text,
      id: self.banner_seq
    });
    Command::StartTimer {
      timer: Timer::ClearBanner(
        self.banner_seq
      ),
      after: self.settings.message_ttl
    }
  }

  fn timer_fired(
    &mut self,
    timer: Timer
  ) -> Vec<Command> {
    match timer {
      | Timer::SearchDebounce(seq) => {
        if self.pending_search != Some(seq) {
          return vec![];
        }
        self.pending_search = None;
        if !self.is_authenticated() {
          return vec![];
        }
        self.query.page = 1;
        vec![self.fetch(1)]
      }
      | Timer::ClearBanner(id) => {
        if self
          .banner
          .as_ref()
          .is_some_and(|banner| banner.id == id)
        {
          self.banner = None;
        }
        vec![]
      }
    }
  }
}

#[cfg(test)]
mod controller_tests {
  use chrono::{
    DateTime,
    Utc
  };

  use super::*;
  use crate::model::TaskPriority;

  fn user() -> User {
    User {
      id:         1,
      username:   "ada".to_string(),
      email:      "ada@example.com"
        .to_string(),
      first_name: "Ada".to_string(),
      last_name:  "Lovelace".to_string()
    }
  }

  fn task(id: TaskId, done: bool) -> Task {
    Task {
      id,
      title: format!("task {id}"),
      description: Some("notes".to_string()),
      priority: TaskPriority::High,
      due_date: Some(
        "2026-12-24T23:59:59Z"
          .parse::<DateTime<Utc>>()
          .expect("due")
      ),
      status: done,
      created_at: "2026-10-01T09:00:00Z"
        .parse::<DateTime<Utc>>()
        .expect("created"),
      updated_at: None
    }
  }

  fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 16)
      .expect("date")
  }

  fn fetch_of(
    commands: &[Command]
  ) -> Option<(u64, TaskQuery)> {
    commands.iter().find_map(|command| {
      match command {
        | Command::FetchTasks {
          request,
          query
        } => Some((*request, query.clone())),
        | _ => None
      }
    })
  }

  /// Logged in with page one loaded from a 25 task result.
  fn logged_in() -> Controller {
    let mut controller =
      Controller::default();
    controller.update(Msg::Started {
      has_session: true
    });
    let commands = controller
      .update(Msg::ProfileLoaded(Ok(user())));
    let (request, _) =
      fetch_of(&commands).expect("fetch");
    controller.update(Msg::TasksFetched {
      request,
      result: Ok(TaskPage {
        results: vec![
          task(1, false),
          task(2, true),
        ],
        count:   25
      })
    });
    controller
  }

  #[test]
  fn stored_session_loads_profile_then_first_page()
  {
    let mut controller =
      Controller::default();
    assert_eq!(
      controller.update(Msg::Started {
        has_session: true
      }),
      vec![Command::LoadProfile]
    );

    let commands = controller
      .update(Msg::ProfileLoaded(Ok(user())));
    let (request, query) =
      fetch_of(&commands).expect("fetch");
    assert_eq!(
      query.to_path(),
      "/tasks/?page=1&ordering=-created_at"
    );
    assert!(controller.is_loading());

    let commands =
      controller.update(Msg::TasksFetched {
        request,
        result: Ok(TaskPage {
          results: vec![task(1, false)],
          count:   25
        })
      });
    assert_eq!(commands, vec![
      Command::FetchStatistics
    ]);
    assert_eq!(controller.total_pages(), 3);
    assert_eq!(
      controller.list_state(),
      &ListState::Loaded
    );
  }

  #[test]
  fn rejected_profile_forces_logout() {
    let mut controller =
      Controller::default();
    controller.update(Msg::Started {
      has_session: true
    });
    let commands = controller.update(
      Msg::ProfileLoaded(Err(ApiError::Auth {
        detail: "expired".to_string()
      }))
    );
    assert_eq!(commands, vec![
      Command::ClearSession
    ]);
    assert!(!controller.is_authenticated());
  }

  #[test]
  fn no_session_stays_at_the_gate() {
    let mut controller =
      Controller::default();
    assert!(
      controller
        .update(Msg::Started {
          has_session: false
        })
        .is_empty()
    );
    assert_eq!(
      controller.auth_state(),
      AuthState::Unauthenticated
    );
  }

  #[test]
  fn rapid_search_changes_fire_one_fetch_with_the_last_term()
  {
    let mut controller = logged_in();
    let mut armed = Vec::new();
    for term in ["m", "mi", "mil", "milk"] {
      for command in controller.update(
        Msg::SearchChanged(term.to_string())
      ) {
        match command {
          | Command::StartTimer {
            timer,
            after
          } => {
            assert_eq!(after, SEARCH_DEBOUNCE);
            armed.push(timer);
          }
          | Command::CancelTimer(_) => {}
          | other => {
            panic!("unexpected {other:?}")
          }
        }
      }
    }

    let mut fetches = Vec::new();
    for timer in armed {
      let commands = controller
        .update(Msg::TimerFired(timer));
      fetches.extend(fetch_of(&commands));
    }

    assert_eq!(fetches.len(), 1);
    let (_, query) = &fetches[0];
    assert_eq!(query.search, "milk");
    assert_eq!(query.page, 1);
  }

  #[test]
  fn each_search_change_cancels_the_previous_timer()
  {
    let mut controller = logged_in();
    let first = controller.update(
      Msg::SearchChanged("a".to_string())
    );
    assert_eq!(first.len(), 1);
    let second = controller.update(
      Msg::SearchChanged("ab".to_string())
    );
    assert_eq!(
      second[0],
      Command::CancelTimer(
        Timer::SearchDebounce(1)
      )
    );
  }

  #[test]
  fn search_before_login_is_only_recorded()
  {
    let mut controller =
      Controller::default();
    let commands = controller.update(
      Msg::SearchChanged("milk".to_string())
    );
    assert!(commands.is_empty());

    controller.update(Msg::Started {
      has_session: true
    });
    let commands = controller
      .update(Msg::ProfileLoaded(Ok(user())));
    let (_, query) =
      fetch_of(&commands).expect("fetch");
    assert_eq!(query.search, "milk");
  }

  #[test]
  fn filter_change_resets_to_first_page() {
    let mut controller = logged_in();
    let commands =
      controller.update(Msg::PageRequested(3));
    let (request, query) =
      fetch_of(&commands).expect("fetch");
    assert_eq!(query.page, 3);
    controller.update(Msg::TasksFetched {
      request,
      result: Ok(TaskPage {
        results: vec![task(21, false)],
        count:   25
      })
    });
    assert_eq!(controller.query().page, 3);

    let commands = controller.update(
      Msg::FilterChanged(Some(
        StatusFilter::Completed
      ))
    );
    let (_, query) =
      fetch_of(&commands).expect("fetch");
    assert_eq!(controller.query().page, 1);
    assert_eq!(query.page, 1);
    assert_eq!(
      query.to_path(),
      "/tasks/?page=1&ordering=-created_at\
       &status=completed"
    );
  }

  #[test]
  fn page_requests_are_clamped() {
    let mut controller = logged_in();
    let (_, query) = fetch_of(
      &controller.update(Msg::PageRequested(9))
    )
    .expect("fetch");
    assert_eq!(query.page, 3);
    let (_, query) = fetch_of(
      &controller.update(Msg::PageRequested(0))
    )
    .expect("fetch");
    assert_eq!(query.page, 1);
  }

  #[test]
  fn stale_list_responses_are_dropped() {
    let mut controller = logged_in();
    let (slow, _) = fetch_of(
      &controller.update(Msg::FilterChanged(
        Some(StatusFilter::Pending)
      ))
    )
    .expect("first");
    let (fresh, _) = fetch_of(
      &controller.update(Msg::FilterChanged(
        Some(StatusFilter::Completed)
      ))
    )
    .expect("second");

    controller.update(Msg::TasksFetched {
      request: fresh,
      result:  Ok(TaskPage {
        results: vec![task(2, true)],
        count:   1
      })
    });
    let late =
      controller.update(Msg::TasksFetched {
        request: slow,
        result:  Ok(TaskPage {
          results: vec![task(1, false)],
          count:   1
        })
      });

    assert!(late.is_empty());
    assert_eq!(controller.tasks().len(), 1);
    assert_eq!(controller.tasks()[0].id, 2);
  }

  #[test]
  fn failed_fetch_sets_generic_error() {
    let mut controller = logged_in();
    let (request, _) = fetch_of(
      &controller.update(Msg::Refresh)
    )
    .expect("fetch");
    let commands =
      controller.update(Msg::TasksFetched {
        request,
        result: Err(ApiError::Network(
          "timeout".to_string()
        ))
      });
    assert!(commands.is_empty());
    assert_eq!(
      controller.list_state(),
      &ListState::Errored(
        LOAD_FAILED.to_string()
      )
    );
  }

  #[test]
  fn statistics_failure_keeps_the_list() {
    let mut controller = logged_in();
    controller.update(Msg::StatisticsFetched(
      Err(ApiError::Network(
        "down".to_string()
      ))
    ));
    assert_eq!(
      controller.list_state(),
      &ListState::Loaded
    );
    assert_eq!(controller.tasks().len(), 2);
    assert!(controller.statistics().is_none());
  }

  #[test]
  fn short_title_never_reaches_the_network()
  {
    let mut controller = logged_in();
    controller.update(Msg::DraftEdited(
      TaskDraft {
        title: "ab".to_string(),
        ..TaskDraft::default()
      }
    ));
    let commands = controller
      .update(Msg::SubmitDraft { today: today() });
    assert!(commands.is_empty());
    assert_eq!(
      controller
        .draft_errors()
        .get("title")
        .map(String::as_str),
      Some(
        "Title must be at least 3 \
         characters"
      )
    );
    assert!(!controller.is_loading());
  }

  #[test]
  fn create_success_shows_banner_and_refetches_current_page()
  {
    let mut controller = logged_in();
    controller.update(Msg::DraftEdited(
      TaskDraft {
        title: "Buy milk".to_string(),
        ..TaskDraft::default()
      }
    ));
    let commands = controller
      .update(Msg::SubmitDraft { today: today() });
    assert!(matches!(
      commands.as_slice(),
      [Command::Mutate(Mutation::Create(_))]
    ));
    assert!(controller.is_loading());

    let commands = controller
      .update(Msg::MutationFinished(Ok(())));
    assert!(matches!(
      commands[0],
      Command::StartTimer {
        timer: Timer::ClearBanner(_),
        after: MESSAGE_TTL
      }
    ));
    let (_, query) =
      fetch_of(&commands).expect("refetch");
    assert_eq!(query.page, 1);
    assert_eq!(
      controller.banner().map(|b| b.text.as_str()),
      Some("Task created successfully!")
    );
    assert_eq!(
      controller.draft(),
      &TaskDraft::default()
    );
  }

  #[test]
  fn banner_clears_only_for_its_own_timer()
  {
    let mut controller = logged_in();
    controller.update(Msg::SetComplete {
      id:       1,
      complete: true
    });
    let commands = controller
      .update(Msg::MutationFinished(Ok(())));
    let Command::StartTimer { timer, .. } =
      commands[0]
    else {
      panic!("expected banner timer");
    };

    controller.update(Msg::TimerFired(
      Timer::ClearBanner(999)
    ));
    assert!(controller.banner().is_some());
    controller.update(Msg::TimerFired(timer));
    assert!(controller.banner().is_none());
  }

  #[test]
  fn edit_flow_updates_and_leaves_edit_mode()
  {
    let mut controller = logged_in();
    let target = controller.tasks()[0].clone();
    controller
      .update(Msg::EditRequested(target.clone()));
    assert_eq!(controller.draft().title, "task 1");
    assert_eq!(
      controller.draft().due_date,
      "2026-12-24"
    );

    let mut draft = controller.draft().clone();
    draft.title = "task one".to_string();
    controller.update(Msg::DraftEdited(draft));
    let commands = controller
      .update(Msg::SubmitDraft { today: today() });
    match commands.as_slice() {
      | [Command::Mutate(Mutation::Update(
        id,
        payload
      ))] => {
        assert_eq!(*id, target.id);
        assert_eq!(payload.title, "task one");
      }
      | other => panic!("unexpected {other:?}")
    }

    controller
      .update(Msg::MutationFinished(Ok(())));
    assert!(controller.editing().is_none());
    assert_eq!(
      controller.banner().map(|b| b.text.as_str()),
      Some("Task updated successfully!")
    );
  }

  #[test]
  fn cancelling_edit_restores_create_mode()
  {
    let mut controller = logged_in();
    let target = controller.tasks()[0].clone();
    controller.update(Msg::EditRequested(target));
    controller.update(Msg::EditCancelled);
    assert!(controller.editing().is_none());
    assert_eq!(
      controller.draft(),
      &TaskDraft::default()
    );
  }

  #[test]
  fn delete_waits_for_confirmation() {
    let mut controller = logged_in();
    assert!(
      controller
        .update(Msg::DeleteRequested(2))
        .is_empty()
    );
    assert_eq!(
      controller.pending_delete(),
      Some(2)
    );
    assert!(
      controller
        .update(Msg::DeleteCancelled)
        .is_empty()
    );
    assert!(
      controller
        .update(Msg::DeleteConfirmed)
        .is_empty()
    );

    controller.update(Msg::DeleteRequested(2));
    assert_eq!(
      controller.update(Msg::DeleteConfirmed),
      vec![Command::Mutate(Mutation::Delete(
        2
      ))]
    );
    let commands = controller
      .update(Msg::MutationFinished(Ok(())));
    let fetches: Vec<_> = commands
      .iter()
      .filter(|command| {
        matches!(
          command,
          Command::FetchTasks { .. }
        )
      })
      .collect();
    assert_eq!(fetches.len(), 1);
  }

  #[test]
  fn toggle_flips_cached_status() {
    let mut controller = logged_in();
    assert_eq!(
      controller.update(Msg::ToggleComplete(2)),
      vec![Command::Mutate(
        Mutation::SetComplete(2, false)
      )]
    );
  }

  #[test]
  fn mutations_are_ignored_while_one_is_in_flight()
  {
    let mut controller = logged_in();
    controller.update(Msg::ToggleComplete(1));
    assert!(
      controller
        .update(Msg::ToggleComplete(2))
        .is_empty()
    );
  }

  #[test]
  fn failed_mutation_reports_and_does_not_refetch()
  {
    let mut controller = logged_in();
    controller.update(Msg::DeleteRequested(1));
    controller.update(Msg::DeleteConfirmed);
    let commands = controller.update(
      Msg::MutationFinished(Err(
        ApiError::Server {
          status: 500,
          detail: None
        }
      ))
    );
    assert!(fetch_of(&commands).is_none());
    let banner =
      controller.banner().expect("banner");
    assert_eq!(banner.kind, BannerKind::Error);
    assert_eq!(
      banner.text,
      "Failed to delete task. Please try \
       again."
    );
    assert!(!controller.is_loading());
  }

  #[test]
  fn login_failure_uses_server_detail() {
    let mut controller =
      Controller::default();
    let commands =
      controller.update(Msg::LoginSubmitted {
        username: "ada".to_string(),
        password: "nope".to_string()
      });
    assert_eq!(commands.len(), 1);
    controller.update(Msg::AuthFinished(Err(
      ApiError::Auth {
        detail: "No active account found \
                 with the given credentials"
          .to_string()
      }
    )));
    assert_eq!(
      controller.auth_error(),
      Some(
        "No active account found with the \
         given credentials"
      )
    );
    assert!(!controller.auth_busy());
  }

  #[test]
  fn register_validation_errors_stay_local()
  {
    let mut controller =
      Controller::default();
    controller.update(Msg::ShowRegister);
    let commands = controller.update(
      Msg::RegisterSubmitted(
        RegisterRequest::default()
      )
    );
    assert!(commands.is_empty());
    assert!(
      controller
        .auth_fields()
        .contains_key("username")
    );
  }

  #[test]
  fn logout_clears_everything() {
    let mut controller = logged_in();
    controller.update(Msg::StatisticsFetched(
      Ok(Statistics::default())
    ));
    controller.update(Msg::SearchChanged(
      "x".to_string()
    ));
    let commands =
      controller.update(Msg::LogoutRequested);
    assert_eq!(
      commands.last(),
      Some(&Command::ClearSession)
    );
    assert!(commands.contains(
      &Command::CancelTimer(
        Timer::SearchDebounce(1)
      )
    ));
    assert!(!controller.is_authenticated());
    assert!(controller.tasks().is_empty());
    assert!(controller.statistics().is_none());
  }

  #[test]
  fn session_expiry_returns_to_login_with_notice()
  {
    let mut controller = logged_in();
    controller.update(Msg::SessionExpired);
    assert!(!controller.is_authenticated());
    assert_eq!(
      controller.auth_error(),
      Some(SESSION_EXPIRED)
    );
  }

  #[test]
  fn expiry_notice_survives_the_login_view_mounting()
  {
    let mut controller = logged_in();
    controller.update(Msg::SessionExpired);
    assert!(
      controller
        .update(Msg::ShowLogin)
        .is_empty()
    );
    assert_eq!(
      controller.auth_error(),
      Some(SESSION_EXPIRED)
    );

    controller.update(Msg::ShowRegister);
    assert_eq!(controller.auth_error(), None);
  }

  #[test]
  fn pages_follow_the_fixed_server_page_size()
  {
    let mut controller = logged_in();
    assert_eq!(controller.total_pages(), 3);
    let (_, query) = fetch_of(
      &controller.update(Msg::PageRequested(3))
    )
    .expect("fetch");
    assert_eq!(query.page, 3);
    assert_eq!(
      query.to_path(),
      "/tasks/?page=3&ordering=-created_at"
    );
  }
}
