use chrono::{
  DateTime,
  Utc
};
use taskdesk_shared::{
  ListState,
  Task,
  TaskId
};
use yew::{
  Callback,
  Html,
  Properties,
  function_component,
  html
};

use super::TaskItem;

#[derive(Properties, PartialEq)]
pub struct TaskListProps {
  pub tasks:     Vec<Task>,
  pub state:     ListState,
  pub now:       DateTime<Utc>,
  pub busy:      bool,
  pub on_toggle: Callback<TaskId>,
  pub on_edit:   Callback<Task>,
  pub on_delete: Callback<TaskId>,
  pub on_retry:  Callback<()>
}

#[function_component(TaskList)]
pub fn task_list(
  props: &TaskListProps
) -> Html {
  match &props.state {
    | ListState::Errored(message) => {
      let on_retry = props.on_retry.clone();
      return html! {
          <div class="panel empty">
              <div class="alert error">{ message }</div>
              <button class="btn" onclick={move |_| on_retry.emit(())}>{ "Retry" }</button>
          </div>
      };
    }
    | ListState::Loading
      if props.tasks.is_empty() =>
    {
      return html! {
          <div class="panel empty muted">{ "Loading tasks…" }</div>
      };
    }
    | _ => {}
  }

  if props.tasks.is_empty() {
    return html! {
        <div class="panel empty muted">{ "No tasks found." }</div>
    };
  }

  html! {
      <ul class="panel task-list">
          {
              for props.tasks.iter().map(|task| html! {
                  <TaskItem
                      key={task.id}
                      task={task.clone()}
                      now={props.now}
                      busy={props.busy}
                      on_toggle={props.on_toggle.clone()}
                      on_edit={props.on_edit.clone()}
                      on_delete={props.on_delete.clone()}
                  />
              })
          }
      </ul>
  }
}
