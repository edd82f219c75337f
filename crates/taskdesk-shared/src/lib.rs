//! Task desk client core shared by the terminal and browser front ends.
//!
//! Nothing in here touches a socket, a clock or a disk directly: HTTP
//! goes through [`Transport`], persistence through [`Storage`], and
//! time arrives as messages to the [`Controller`].

pub mod auth;
pub mod controller;
pub mod effects;
pub mod error;
pub mod gateway;
pub mod model;
pub mod session;
pub mod tasks;
pub mod transport;
pub mod validate;

pub use auth::AuthClient;
pub use controller::{
  AuthState,
  AuthView,
  Banner,
  BannerKind,
  Command,
  Controller,
  ListState,
  Msg,
  Mutation,
  QueryState,
  Settings,
  Timer
};
pub use effects::perform;
pub use error::{
  ApiError,
  FieldErrors,
  StorageError
};
pub use gateway::Gateway;
pub use model::{
  PasswordChange,
  ProfileUpdate,
  RegisterRequest,
  Statistics,
  StatusFilter,
  Task,
  TaskId,
  TaskPage,
  TaskPatch,
  TaskPayload,
  TaskPriority,
  User
};
pub use session::{
  MemoryStorage,
  SessionStore,
  Storage
};
pub use tasks::{
  TaskClient,
  TaskQuery
};
#[cfg(any(test, feature = "testkit"))]
pub use transport::MockTransport;
pub use transport::{
  ApiRequest,
  ApiResponse,
  Method,
  Transport
};
pub use validate::TaskDraft;
