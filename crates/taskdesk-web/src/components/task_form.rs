use taskdesk_shared::validate::{
  DESCRIPTION_MAX,
  TITLE_MAX,
  TaskDraft
};
use taskdesk_shared::{
  FieldErrors,
  TaskPriority
};
use yew::{
  Callback,
  Html,
  Properties,
  SubmitEvent,
  TargetCast,
  function_component,
  html
};

use super::{
  field_error,
  input_value
};

#[derive(Properties, PartialEq)]
pub struct TaskFormProps {
  pub draft:     TaskDraft,
  pub errors:    FieldErrors,
  pub editing:   bool,
  pub busy:      bool,
  pub on_change: Callback<TaskDraft>,
  pub on_submit: Callback<()>,
  pub on_cancel: Callback<()>
}

#[function_component(TaskForm)]
pub fn task_form(
  props: &TaskFormProps
) -> Html {
  let edit = |apply: fn(&mut TaskDraft, String)| {
    let draft = props.draft.clone();
    let on_change = props.on_change.clone();
    Callback::from(move |value: String| {
      let mut next = draft.clone();
      apply(&mut next, value);
      on_change.emit(next);
    })
  };

  let on_title = edit(|d, v| d.title = v)
    .reform(|e: yew::InputEvent| input_value(&e));
  let on_due = edit(|d, v| d.due_date = v)
    .reform(|e: yew::InputEvent| input_value(&e));
  let on_description =
    edit(|d, v| d.description = v).reform(
      |e: yew::InputEvent| {
        let area: web_sys::HtmlTextAreaElement =
          e.target_unchecked_into();
        area.value()
      }
    );
  let on_priority = edit(|d, v| {
    d.priority = v.parse().unwrap_or_default()
  })
  .reform(|e: yew::Event| {
    let select: web_sys::HtmlSelectElement =
      e.target_unchecked_into();
    select.value()
  });

  let onsubmit = {
    let on_submit = props.on_submit.clone();
    Callback::from(move |e: SubmitEvent| {
      e.prevent_default();
      on_submit.emit(());
    })
  };
  let on_cancel = props.on_cancel.clone();

  let (heading, action) = if props.editing {
    ("Edit task", "Update task")
  } else {
    ("New task", "Add task")
  };

  html! {
      <form class="panel task-form" {onsubmit}>
          <div class="header">{ heading }</div>
          <label>{ "Title" }</label>
          <input
              value={props.draft.title.clone()}
              oninput={on_title}
              maxlength={TITLE_MAX.to_string()}
              placeholder="What needs doing?"
          />
          { field_error(&props.errors, "title") }
          <label>{ "Description" }</label>
          <textarea
              value={props.draft.description.clone()}
              oninput={on_description}
              maxlength={DESCRIPTION_MAX.to_string()}
              rows="3"
          />
          { field_error(&props.errors, "description") }
          <div class="row-2">
              <div>
                  <label>{ "Priority" }</label>
                  <select onchange={on_priority}>
                      {
                          for TaskPriority::ALL.iter().map(|priority| html! {
                              <option
                                  value={priority.as_str()}
                                  selected={*priority == props.draft.priority}
                              >
                                  { priority.label() }
                              </option>
                          })
                      }
                  </select>
              </div>
              <div>
                  <label>{ "Due date" }</label>
                  <input type="date" value={props.draft.due_date.clone()} oninput={on_due} />
                  { field_error(&props.errors, "due_date") }
              </div>
          </div>
          <div class="actions">
              <button class="btn primary" type="submit" disabled={props.busy}>{ action }</button>
              {
                  if props.editing {
                      html! {
                          <button class="btn" type="button" onclick={move |_| on_cancel.emit(())}>
                              { "Cancel" }
                          </button>
                      }
                  } else {
                      html! {}
                  }
              }
          </div>
      </form>
  }
}
