use chrono::{
  DateTime,
  Local,
  Utc
};
use taskdesk_shared::validate::DATE_FORMAT;
use taskdesk_shared::{
  Task,
  TaskId
};
use yew::{
  Callback,
  Html,
  Properties,
  classes,
  function_component,
  html
};

#[derive(Properties, PartialEq)]
pub struct TaskItemProps {
  pub task:      Task,
  pub now:       DateTime<Utc>,
  pub busy:      bool,
  pub on_toggle: Callback<TaskId>,
  pub on_edit:   Callback<Task>,
  pub on_delete: Callback<TaskId>
}

#[function_component(TaskItem)]
pub fn task_item(
  props: &TaskItemProps
) -> Html {
  let task = &props.task;
  let overdue = task.is_overdue(props.now);

  let on_toggle = {
    let cb = props.on_toggle.clone();
    let id = task.id;
    move |_: yew::MouseEvent| cb.emit(id)
  };
  let on_edit = {
    let cb = props.on_edit.clone();
    let task = task.clone();
    move |_: yew::MouseEvent| cb.emit(task.clone())
  };
  let on_delete = {
    let cb = props.on_delete.clone();
    let id = task.id;
    move |_: yew::MouseEvent| cb.emit(id)
  };

  let due = task.due_date.map(|due| {
    due
      .with_timezone(&Local)
      .format(DATE_FORMAT)
      .to_string()
  });

  html! {
      <li class={classes!("task", task.status.then_some("done"), overdue.then_some("overdue"))}>
          <input
              type="checkbox"
              checked={task.status}
              disabled={props.busy}
              onclick={on_toggle}
          />
          <div class="body">
              <div class="title">{ &task.title }</div>
              {
                  match task.description.as_deref().filter(|d| !d.trim().is_empty()) {
                      Some(description) => html! { <div class="muted">{ description }</div> },
                      None => html! {},
                  }
              }
              <div class="meta">
                  <span class={classes!("priority", task.priority.as_str())}>{ task.priority.label() }</span>
                  {
                      match due {
                          Some(due) if overdue => html! { <span class="due">{ format!("Due {due} (overdue)") }</span> },
                          Some(due) => html! { <span class="due">{ format!("Due {due}") }</span> },
                          None => html! {},
                      }
                  }
              </div>
          </div>
          <div class="actions">
              <button class="btn" disabled={props.busy} onclick={on_edit}>{ "Edit" }</button>
              <button class="btn danger" disabled={props.busy} onclick={on_delete}>{ "Delete" }</button>
          </div>
      </li>
  }
}
