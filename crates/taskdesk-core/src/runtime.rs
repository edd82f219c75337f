use std::collections::{BTreeMap, VecDeque};

use taskdesk_shared::{Command, Controller, Gateway, Msg, Storage, Timer, Transport, perform};
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info, trace};

/// Drives a [`Controller`] on the current tokio runtime.
///
/// I/O commands are awaited one at a time in the order they were
/// issued; their results are queued and fed back before anything else
/// runs. Timers live on the tokio clock, so tests can pause time.
pub struct Runtime<T, S> {
    controller: Controller,
    gateway: Gateway<T, S>,
    queue: VecDeque<Msg>,
    timers: BTreeMap<Timer, Instant>,
}

impl<T, S> std::fmt::Debug for Runtime<T, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("queued", &self.queue.len())
            .field("timers", &self.timers)
            .finish_non_exhaustive()
    }
}

impl<T, S> Runtime<T, S>
where
    T: Transport,
    S: Storage,
{
    pub fn new(controller: Controller, gateway: Gateway<T, S>) -> Self {
        Self {
            controller,
            gateway,
            queue: VecDeque::new(),
            timers: BTreeMap::new(),
        }
    }

    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    pub fn gateway(&self) -> &Gateway<T, S> {
        &self.gateway
    }

    pub fn armed_timers(&self) -> Vec<Timer> {
        self.timers.keys().copied().collect()
    }

    /// Feeds `msg` and everything it causes until no I/O is left.
    /// Armed timers are not waited for.
    #[tracing::instrument(skip(self, msg))]
    pub async fn dispatch(&mut self, msg: Msg) {
        self.queue.push_back(msg);
        self.drain().await;
    }

    /// Like [`Runtime::dispatch`], then waits out pending search
    /// debounces. Banner timers stay armed.
    pub async fn settle(&mut self) {
        self.drain().await;
        while let Some(timer) = self.next_timer(|timer| matches!(timer, Timer::SearchDebounce(_))) {
            self.fire(timer).await;
        }
    }

    /// Waits for every armed timer, banners included.
    pub async fn run_timers(&mut self) {
        self.drain().await;
        while let Some(timer) = self.next_timer(|_| true) {
            self.fire(timer).await;
        }
    }

    fn next_timer(&self, wanted: impl Fn(&Timer) -> bool) -> Option<Timer> {
        self.timers
            .iter()
            .filter(|(timer, _)| wanted(timer))
            .min_by_key(|(_, deadline)| **deadline)
            .map(|(timer, _)| *timer)
    }

    async fn fire(&mut self, timer: Timer) {
        let Some(deadline) = self.timers.remove(&timer) else {
            return;
        };
        sleep_until(deadline).await;
        trace!(?timer, "timer fired");
        self.queue.push_back(Msg::TimerFired(timer));
        self.drain().await;
    }

    async fn drain(&mut self) {
        while let Some(msg) = self.queue.pop_front() {
            let commands = self.controller.update(msg);
            for command in commands {
                self.execute(command).await;
            }
        }
    }

    async fn execute(&mut self, command: Command) {
        match command {
            Command::StartTimer { timer, after } => {
                debug!(?timer, ?after, "arming timer");
                self.timers.insert(timer, Instant::now() + after);
            }
            Command::CancelTimer(timer) => {
                debug!(?timer, "cancelling timer");
                self.timers.remove(&timer);
            }
            command => {
                if let Some(msg) = perform(&self.gateway, command).await {
                    self.queue.push_back(msg);
                }
                if self.controller.is_authenticated()
                    && !self.gateway.session().is_authenticated()
                {
                    info!("session ended underneath the controller");
                    self.queue.push_back(Msg::SessionExpired);
                }
            }
        }
    }
}

#[cfg(test)]
mod runtime_tests {
    use std::time::Duration;

    use serde_json::json;
    use taskdesk_shared::{MemoryStorage, Method, MockTransport, SessionStore};

    use super::*;

    fn runtime(transport: &MockTransport) -> Runtime<MockTransport, MemoryStorage> {
        let session = SessionStore::new(MemoryStorage::new());
        session.save_tokens("a", "r").expect("tokens");
        Runtime::new(
            Controller::default(),
            Gateway::new(transport.clone(), session),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_timers_never_fire() {
        let transport = MockTransport::new();
        transport
            .expect_json(
                Method::Get,
                "/auth/me/",
                200,
                json!({"id": 1, "username": "ada"}),
            )
            .expect_json(
                Method::Get,
                "/tasks/*",
                200,
                json!({"count": 0, "results": []}),
            )
            .expect_json(
                Method::Get,
                "/tasks/statistics/",
                200,
                json!({
                    "total_tasks": 0,
                    "completed_tasks": 0,
                    "pending_tasks": 0,
                    "completion_percentage": 0.0
                }),
            );
        let mut runtime = runtime(&transport);
        runtime.dispatch(Msg::Started { has_session: true }).await;

        runtime.dispatch(Msg::SearchChanged("a".to_string())).await;
        runtime.dispatch(Msg::SearchChanged("ab".to_string())).await;

        assert_eq!(runtime.armed_timers(), vec![Timer::SearchDebounce(2)]);
        transport.expect_json(
            Method::Get,
            "/tasks/?page=1&ordering=-created_at&search=ab",
            200,
            json!({"count": 0, "results": []}),
        );

        let started = Instant::now();
        runtime.run_timers().await;
        assert!(Instant::now() - started >= Duration::from_millis(500));
        let searches: Vec<_> = transport
            .calls()
            .into_iter()
            .filter(|call| call.contains("search="))
            .collect();
        assert_eq!(searches, vec!["GET /tasks/?page=1&ordering=-created_at&search=ab"]);
    }
}
