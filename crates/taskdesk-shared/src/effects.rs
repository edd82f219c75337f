//! Runs controller commands against the API.
//!
//! Timer commands are left to the runtime that owns the clock;
//! [`perform`] ignores them.

use tracing::{
  debug,
  warn
};

use crate::auth::AuthClient;
use crate::controller::{
  Command,
  Msg,
  Mutation
};
use crate::error::ApiError;
use crate::gateway::Gateway;
use crate::session::Storage;
use crate::tasks::TaskClient;
use crate::transport::Transport;

/// Executes one I/O command and returns the message carrying its
/// result, if the controller needs one.
pub async fn perform<T, S>(
  gateway: &Gateway<T, S>,
  command: Command
) -> Option<Msg>
where
  T: Transport,
  S: Storage
{
  let auth = AuthClient::new(gateway);
  let tasks = TaskClient::new(gateway);

  match command {
    | Command::LoadProfile => {
      Some(Msg::ProfileLoaded(auth.me().await))
    }
    | Command::Login {
      username,
      password
    } => Some(Msg::AuthFinished(
      auth.login(&username, &password).await
    )),
    | Command::Register(request) => {
      Some(Msg::AuthFinished(
        auth
          .register_and_login(&request)
          .await
      ))
    }
    | Command::ClearSession => {
      if let Err(error) = auth.logout() {
        warn!(%error, "failed clearing session");
      }
      None
    }
    | Command::FetchTasks {
      request,
      query
    } => Some(Msg::TasksFetched {
      request,
      result: tasks.list(&query).await
    }),
    | Command::FetchStatistics => {
      Some(Msg::StatisticsFetched(
        tasks.statistics().await
      ))
    }
    | Command::Mutate(mutation) => {
      Some(Msg::MutationFinished(
        mutate(&tasks, mutation).await
      ))
    }
    | Command::StartTimer { .. }
    | Command::CancelTimer(_) => {
      debug!(
        ?command,
        "timer command left to the runtime"
      );
      None
    }
  }
}

async fn mutate<T, S>(
  tasks: &TaskClient<'_, T, S>,
  mutation: Mutation
) -> Result<(), ApiError>
where
  T: Transport,
  S: Storage
{
  match mutation {
    | Mutation::Create(payload) => {
      tasks.create(&payload).await.map(drop)
    }
    | Mutation::Update(id, payload) => tasks
      .update(id, &payload)
      .await
      .map(drop),
    | Mutation::Delete(id) => {
      tasks.delete(id).await
    }
    | Mutation::SetComplete(id, true) => {
      tasks.mark_complete(id).await.map(drop)
    }
    | Mutation::SetComplete(id, false) => tasks
      .mark_incomplete(id)
      .await
      .map(drop)
  }
}
