use taskdesk_shared::{
  Banner,
  BannerKind,
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
pub struct BannerProps {
  pub banner:     Option<Banner>,
  pub on_dismiss: Callback<()>
}

#[function_component(BannerView)]
pub fn banner_view(
  props: &BannerProps
) -> Html {
  let Some(banner) = &props.banner else {
    return html! {};
  };
  let kind = match banner.kind {
    | BannerKind::Success => "success",
    | BannerKind::Error => "error"
  };
  let on_dismiss = props.on_dismiss.clone();

  html! {
      <div class={classes!("alert", kind)} role="status">
          <span>{ &banner.text }</span>
          <button class="close" onclick={move |_| on_dismiss.emit(())}>{ "×" }</button>
      </div>
  }
}

#[derive(Properties, PartialEq)]
pub struct ConfirmDeleteProps {
  pub pending:    Option<TaskId>,
  pub on_confirm: Callback<()>,
  pub on_cancel:  Callback<()>
}

/// Modal shown while a delete waits for confirmation.
#[function_component(ConfirmDelete)]
pub fn confirm_delete(
  props: &ConfirmDeleteProps
) -> Html {
  if props.pending.is_none() {
    return html! {};
  }
  let on_confirm = props.on_confirm.clone();
  let on_cancel = props.on_cancel.clone();

  html! {
      <div class="modal-backdrop">
          <div class="modal panel">
              <div class="header">{ "Delete task" }</div>
              <p>{ "Are you sure you want to delete this task?" }</p>
              <div class="actions">
                  <button class="btn danger" onclick={move |_| on_confirm.emit(())}>{ "Delete" }</button>
                  <button class="btn" onclick={move |_| on_cancel.emit(())}>{ "Cancel" }</button>
              </div>
          </div>
      </div>
  }
}
