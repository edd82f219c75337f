use taskdesk_shared::{
  FieldErrors,
  RegisterRequest
};
use yew::{
  Callback,
  Html,
  Properties,
  SubmitEvent,
  function_component,
  html,
  use_state
};
use yew_router::prelude::Link;

use super::{
  field_error,
  input_value
};
use crate::app::Route;

#[derive(Properties, PartialEq)]
pub struct LoginFormProps {
  pub error:     Option<String>,
  pub fields:    FieldErrors,
  pub busy:      bool,
  pub on_submit: Callback<(String, String)>
}

#[function_component(LoginForm)]
pub fn login_form(
  props: &LoginFormProps
) -> Html {
  let username = use_state(String::new);
  let password = use_state(String::new);

  let onsubmit = {
    let username = username.clone();
    let password = password.clone();
    let on_submit = props.on_submit.clone();
    Callback::from(move |e: SubmitEvent| {
      e.prevent_default();
      on_submit.emit((
        (*username).clone(),
        (*password).clone()
      ));
    })
  };
  let on_username = {
    let username = username.clone();
    Callback::from(move |e| {
      username.set(input_value(&e))
    })
  };
  let on_password = {
    let password = password.clone();
    Callback::from(move |e| {
      password.set(input_value(&e))
    })
  };

  html! {
      <form class="panel auth" {onsubmit}>
          <div class="header">{ "Log in" }</div>
          {
              match &props.error {
                  Some(error) => html! { <div class="alert error">{ error }</div> },
                  None => html! {},
              }
          }
          <label>{ "Username" }</label>
          <input value={(*username).clone()} oninput={on_username} autocomplete="username" />
          { field_error(&props.fields, "username") }
          <label>{ "Password" }</label>
          <input type="password" value={(*password).clone()} oninput={on_password} autocomplete="current-password" />
          { field_error(&props.fields, "password") }
          <button class="btn primary" type="submit" disabled={props.busy}>
              { if props.busy { "Logging in…" } else { "Log in" } }
          </button>
          <div class="muted">
              { "No account yet? " }
              <Link<Route> to={Route::Register}>{ "Register" }</Link<Route>>
          </div>
      </form>
  }
}

#[derive(Properties, PartialEq)]
pub struct RegisterFormProps {
  pub error:     Option<String>,
  pub fields:    FieldErrors,
  pub busy:      bool,
  pub on_submit: Callback<RegisterRequest>
}

#[function_component(RegisterForm)]
pub fn register_form(
  props: &RegisterFormProps
) -> Html {
  let form = use_state(RegisterRequest::default);

  let edit = |apply: fn(&mut RegisterRequest, String)| {
    let form = form.clone();
    Callback::from(move |e| {
      let mut next = (*form).clone();
      apply(&mut next, input_value(&e));
      form.set(next);
    })
  };

  let onsubmit = {
    let form = form.clone();
    let on_submit = props.on_submit.clone();
    Callback::from(move |e: SubmitEvent| {
      e.prevent_default();
      on_submit.emit((*form).clone());
    })
  };

  html! {
      <form class="panel auth" {onsubmit}>
          <div class="header">{ "Create an account" }</div>
          {
              match &props.error {
                  Some(error) => html! { <div class="alert error">{ error }</div> },
                  None => html! {},
              }
          }
          <label>{ "Username" }</label>
          <input value={form.username.clone()} oninput={edit(|f, v| f.username = v)} />
          { field_error(&props.fields, "username") }
          <label>{ "Email" }</label>
          <input type="email" value={form.email.clone()} oninput={edit(|f, v| f.email = v)} />
          { field_error(&props.fields, "email") }
          <div class="row-2">
              <div>
                  <label>{ "First name" }</label>
                  <input value={form.first_name.clone()} oninput={edit(|f, v| f.first_name = v)} />
                  { field_error(&props.fields, "first_name") }
              </div>
              <div>
                  <label>{ "Last name" }</label>
                  <input value={form.last_name.clone()} oninput={edit(|f, v| f.last_name = v)} />
                  { field_error(&props.fields, "last_name") }
              </div>
          </div>
          <label>{ "Password" }</label>
          <input type="password" value={form.password.clone()} oninput={edit(|f, v| f.password = v)} autocomplete="new-password" />
          { field_error(&props.fields, "password") }
          <label>{ "Confirm password" }</label>
          <input type="password" value={form.password2.clone()} oninput={edit(|f, v| f.password2 = v)} autocomplete="new-password" />
          { field_error(&props.fields, "password2") }
          <button class="btn primary" type="submit" disabled={props.busy}>
              { if props.busy { "Creating account…" } else { "Register" } }
          </button>
          <div class="muted">
              { "Already registered? " }
              <Link<Route> to={Route::Login}>{ "Log in" }</Link<Route>>
          </div>
      </form>
  }
}
