use std::cell::{
  Cell,
  RefCell
};
use std::collections::BTreeMap;
use std::rc::{
  Rc,
  Weak
};

use gloo::timers::callback::Timeout;
use taskdesk_shared::{
  Command,
  Controller,
  Gateway,
  Msg,
  SessionStore,
  Settings,
  Timer,
  perform
};
use yew::Callback;

use crate::api::{
  FetchTransport,
  api_base_url
};
use crate::storage::BrowserStorage;

pub type WebGateway =
  Gateway<FetchTransport, BrowserStorage>;

struct Inner {
  controller: RefCell<Controller>,
  gateway:    WebGateway,
  timers:     RefCell<BTreeMap<Timer, Timeout>>,
  revision:   Cell<u64>,
  rerender:   Callback<()>
}

/// Shared handle to the controller and everything that runs its
/// commands. Cloning is cheap; clones drive the same state.
#[derive(Clone)]
pub struct Store(Rc<Inner>);

impl PartialEq for Store {
  fn eq(&self, other: &Self) -> bool {
    Rc::ptr_eq(&self.0, &other.0)
  }
}

impl Store {
  pub fn new(
    settings: Settings,
    rerender: Callback<()>
  ) -> Self {
    let inner =
      Rc::new_cyclic(|weak: &Weak<Inner>| {
        let weak = weak.clone();
        let gateway = Gateway::new(
          FetchTransport::new(api_base_url()),
          SessionStore::new(BrowserStorage)
        )
        .with_session_expired(move || {
          if let Some(inner) = weak.upgrade() {
            tracing::info!(
              "session expired; returning \
               to login"
            );
            Store(inner)
              .dispatch(Msg::SessionExpired);
          }
        });

        Inner {
          controller: RefCell::new(
            Controller::new(settings)
          ),
          gateway,
          timers: RefCell::new(BTreeMap::new()),
          revision: Cell::new(0),
          rerender
        }
      });
    Self(inner)
  }

  pub fn has_session(&self) -> bool {
    self.0.gateway.session().is_authenticated()
  }

  /// Bumped on every dispatch so views can tell state apart.
  pub fn revision(&self) -> u64 {
    self.0.revision.get()
  }

  /// Runs `view` against the current state.
  pub fn with<R>(
    &self,
    view: impl FnOnce(&Controller) -> R
  ) -> R {
    view(&self.0.controller.borrow())
  }

  pub fn dispatch(&self, msg: Msg) {
    let commands = self
      .0
      .controller
      .borrow_mut()
      .update(msg);
    self.0.revision.set(self.revision() + 1);
    self.0.rerender.emit(());
    for command in commands {
      self.execute(command);
    }
  }

  /// A callback that turns its argument into a message.
  pub fn callback<T, F>(
    &self,
    to_msg: F
  ) -> Callback<T>
  where
    T: 'static,
    F: Fn(T) -> Msg + 'static
  {
    let store = self.clone();
    Callback::from(move |value| {
      store.dispatch(to_msg(value))
    })
  }

  fn execute(&self, command: Command) {
    match command {
      | Command::StartTimer { timer, after } => {
        let store = self.clone();
        let millis = u32::try_from(
          after.as_millis()
        )
        .unwrap_or(u32::MAX);
        let handle =
          Timeout::new(millis, move || {
            store.dispatch(Msg::TimerFired(
              timer
            ));
            store.forget_timer(timer);
          });
        // replacing an entry drops, and so cancels, the old timeout
        self
          .0
          .timers
          .borrow_mut()
          .insert(timer, handle);
      }
      | Command::CancelTimer(timer) => {
        self.0.timers.borrow_mut().remove(&timer);
      }
      | command => {
        let store = self.clone();
        wasm_bindgen_futures::spawn_local(
          async move {
            if let Some(msg) =
              perform(&store.0.gateway, command)
                .await
            {
              store.dispatch(msg);
            }
          }
        );
      }
    }
  }

  /// Drops a fired timeout once its callback has returned.
  fn forget_timer(&self, timer: Timer) {
    let store = self.clone();
    wasm_bindgen_futures::spawn_local(
      async move {
        store.0.timers.borrow_mut().remove(&timer);
      }
    );
  }
}
