mod auth_forms;
mod banner;
mod filter_bar;
mod pagination;
mod statistics;
mod task_form;
mod task_item;
mod task_list;

pub use auth_forms::{
  LoginForm,
  RegisterForm
};
pub use banner::{
  BannerView,
  ConfirmDelete
};
pub use filter_bar::FilterBar;
pub use pagination::Pagination;
pub use statistics::StatsBar;
pub use task_form::TaskForm;
pub use task_item::TaskItem;
pub use task_list::TaskList;

use taskdesk_shared::FieldErrors;
use yew::{
  Html,
  html
};

/// Inline message under a form field.
pub(crate) fn field_error(
  errors: &FieldErrors,
  field: &str
) -> Html {
  match errors.get(field) {
    | Some(message) => html! {
        <div class="field-error">{ message }</div>
    },
    | None => html! {}
  }
}

pub(crate) fn input_value(
  event: &yew::InputEvent
) -> String {
  use yew::TargetCast;
  let input: web_sys::HtmlInputElement =
    event.target_unchecked_into();
  input.value()
}
