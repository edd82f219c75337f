use chrono::{
  Local,
  Utc
};
use taskdesk_shared::{
  Msg,
  Settings
};
use yew::{
  Callback,
  Html,
  Properties,
  function_component,
  html,
  use_effect_with,
  use_force_update,
  use_memo
};
use yew_router::prelude::{
  BrowserRouter,
  Redirect,
  Routable,
  Switch
};

use crate::components::{
  BannerView,
  ConfirmDelete,
  FilterBar,
  LoginForm,
  Pagination,
  RegisterForm,
  StatsBar,
  TaskForm,
  TaskList
};
use crate::store::Store;

#[derive(Clone, Routable, PartialEq)]
pub enum Route {
  #[at("/")]
  Tasks,
  #[at("/login")]
  Login,
  #[at("/register")]
  Register,
  #[not_found]
  #[at("/404")]
  NotFound
}

#[function_component(App)]
pub fn app() -> Html {
  let rerender = use_force_update();
  let store = use_memo((), move |_| {
    Store::new(
      Settings::default(),
      Callback::from(move |_| {
        rerender.force_update()
      })
    )
  });

  {
    let store = (*store).clone();
    use_effect_with((), move |_| {
      let has_session = store.has_session();
      tracing::debug!(
        has_session,
        "frontend mounted"
      );
      store.dispatch(Msg::Started {
        has_session
      });
      || ()
    });
  }

  let store = (*store).clone();
  let revision = store.revision();
  let render = move |route: Route| {
    switch(route, &store, revision)
  };

  html! {
      <BrowserRouter>
          <main class="shell">
              <Switch<Route> {render} />
          </main>
      </BrowserRouter>
  }
}

fn switch(
  route: Route,
  store: &Store,
  revision: u64
) -> Html {
  let (authenticated, busy) = store.with(|c| {
    (c.is_authenticated(), c.auth_busy())
  });
  let store = store.clone();

  match route {
    | Route::Tasks if authenticated => html! {
        <TasksPage {store} {revision} />
    },
    | Route::Tasks if busy => html! {
        <div class="panel empty muted">{ "Loading…" }</div>
    },
    | Route::Tasks => html! {
        <Redirect<Route> to={Route::Login} />
    },
    | Route::Login | Route::Register
      if authenticated =>
    {
      html! { <Redirect<Route> to={Route::Tasks} /> }
    }
    | Route::Login => html! {
        <LoginPage {store} {revision} />
    },
    | Route::Register => html! {
        <RegisterPage {store} {revision} />
    },
    | Route::NotFound => html! {
        <Redirect<Route> to={Route::Tasks} />
    }
  }
}

#[derive(Properties, PartialEq)]
struct PageProps {
  store:    Store,
  revision: u64
}

#[function_component(LoginPage)]
fn login_page(props: &PageProps) -> Html {
  {
    let store = props.store.clone();
    use_effect_with((), move |_| {
      store.dispatch(Msg::ShowLogin);
      || ()
    });
  }

  let (error, fields, busy) =
    props.store.with(|c| {
      (
        c.auth_error().map(str::to_string),
        c.auth_fields().clone(),
        c.auth_busy()
      )
    });
  let on_submit = props.store.callback(
    |(username, password)| {
      Msg::LoginSubmitted {
        username,
        password
      }
    }
  );

  html! {
      <LoginForm {error} {fields} {busy} {on_submit} />
  }
}

#[function_component(RegisterPage)]
fn register_page(
  props: &PageProps
) -> Html {
  {
    let store = props.store.clone();
    use_effect_with((), move |_| {
      store.dispatch(Msg::ShowRegister);
      || ()
    });
  }

  let (error, fields, busy) =
    props.store.with(|c| {
      (
        c.auth_error().map(str::to_string),
        c.auth_fields().clone(),
        c.auth_busy()
      )
    });
  let on_submit = props
    .store
    .callback(Msg::RegisterSubmitted);

  html! {
      <RegisterForm {error} {fields} {busy} {on_submit} />
  }
}

#[function_component(TasksPage)]
fn tasks_page(props: &PageProps) -> Html {
  let store = &props.store;
  let snapshot = store.with(|c| {
    (
      c.user().map(|u| u.display_name()),
      c.banner().cloned(),
      c.statistics().cloned(),
      c.draft().clone(),
      c.draft_errors().clone(),
      c.editing().is_some(),
      c.query().clone(),
      c.tasks().to_vec(),
      c.list_state().clone(),
      c.total_pages(),
      c.pending_delete(),
      c.is_loading()
    )
  });
  let (
    user,
    banner,
    stats,
    draft,
    draft_errors,
    editing,
    query,
    tasks,
    state,
    total_pages,
    pending_delete,
    busy
  ) = snapshot;

  let on_logout =
    store.callback(|_: yew::MouseEvent| {
      Msg::LogoutRequested
    });
  let on_submit = store.callback(|()| {
    Msg::SubmitDraft {
      today: Local::now().date_naive()
    }
  });

  html! {
      <>
          <header class="topbar">
              <div class="brand">{ "Taskdesk" }</div>
              <div class="user">
                  <span>{ user.unwrap_or_default() }</span>
                  <button class="btn" onclick={on_logout}>{ "Log out" }</button>
              </div>
          </header>
          <BannerView
              {banner}
              on_dismiss={store.callback(|()| Msg::DismissBanner)}
          />
          <StatsBar {stats} />
          <TaskForm
              {draft}
              errors={draft_errors}
              {editing}
              {busy}
              on_change={store.callback(Msg::DraftEdited)}
              {on_submit}
              on_cancel={store.callback(|()| Msg::EditCancelled)}
          />
          <FilterBar
              filter={query.filter}
              search={query.search.clone()}
              on_filter={store.callback(Msg::FilterChanged)}
              on_search={store.callback(Msg::SearchChanged)}
          />
          <TaskList
              {tasks}
              {state}
              now={Utc::now()}
              {busy}
              on_toggle={store.callback(Msg::ToggleComplete)}
              on_edit={store.callback(Msg::EditRequested)}
              on_delete={store.callback(Msg::DeleteRequested)}
              on_retry={store.callback(|()| Msg::Refresh)}
          />
          <Pagination
              page={query.page}
              total={total_pages}
              on_page={store.callback(Msg::PageRequested)}
          />
          <ConfirmDelete
              pending={pending_delete}
              on_confirm={store.callback(|()| Msg::DeleteConfirmed)}
              on_cancel={store.callback(|()| Msg::DeleteCancelled)}
          />
      </>
  }
}
