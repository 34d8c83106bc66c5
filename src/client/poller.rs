//! Background monitoring of one controller
//!
//! # State Machine
//!
//! ```text
//! Idle ──► Running ──► StoppingRequested ──► Stopped
//!             ▲                                 │
//!             └─────────────────────────────────┘
//!                       (start again)
//! ```
//!
//! The loop is fixed-delay: request, decode, update, notify, then sleep for
//! one period. At most one request is outstanding at any time.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::link::Link;
use super::registry::Registry;
use super::fetch_state;
use crate::error::{InsenError, Result};
use crate::insen::protocol::ControllerState;

/// Observer invoked on the poller task with every decoded snapshot
pub type StateObserver = Box<dyn FnMut(ControllerState) + Send + 'static>;

/// Lifecycle of the poller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerState {
    Idle,
    Running,
    StoppingRequested,
    Stopped,
}

/// Handle to the single monitoring task of a client
pub struct Poller {
    state: PollerState,
    controller_id: Option<u8>,
    cancel: Option<CancellationToken>,
    task: Option<JoinHandle<()>>,
}

impl Poller {
    pub fn new() -> Self {
        Self {
            state: PollerState::Idle,
            controller_id: None,
            cancel: None,
            task: None,
        }
    }

    pub fn state(&self) -> PollerState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == PollerState::Running
    }

    /// Controller polled by the current (or last) run
    pub fn controller_id(&self) -> Option<u8> {
        self.controller_id
    }

    /// Spawn the monitoring task
    ///
    /// Returns `Ok(false)` without spawning anything if already running.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPollRate` if `rate_hz` is zero
    pub(crate) fn start(
        &mut self,
        link: Link,
        registry: Registry,
        controller_id: u8,
        rate_hz: u32,
        observer: StateObserver,
    ) -> Result<bool> {
        if self.is_running() {
            info!("Monitoring already active");
            return Ok(false);
        }

        if rate_hz == 0 {
            return Err(InsenError::InvalidPollRate(rate_hz));
        }

        let period = Duration::from_secs(1) / rate_hz;
        let cancel = CancellationToken::new();

        self.task = Some(tokio::spawn(run(
            link,
            registry,
            controller_id,
            period,
            observer,
            cancel.clone(),
        )));
        self.cancel = Some(cancel);
        self.controller_id = Some(controller_id);
        self.state = PollerState::Running;

        info!("Started monitoring controller {} at {} Hz", controller_id, rate_hz);
        Ok(true)
    }

    /// Cancel the task and wait until it has exited
    ///
    /// No observer call happens after this returns. No-op unless running.
    pub async fn stop(&mut self) {
        if !self.is_running() {
            return;
        }

        self.state = PollerState::StoppingRequested;
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }

        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("Monitoring task ended abnormally: {}", e);
            }
        }

        self.state = PollerState::Stopped;
        info!("Stopped monitoring");
    }
}

impl Default for Poller {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        if let Some(cancel) = &self.cancel {
            cancel.cancel();
        }
    }
}

async fn run(
    link: Link,
    registry: Registry,
    controller_id: u8,
    period: Duration,
    mut observer: StateObserver,
    cancel: CancellationToken,
) {
    debug!("Poll loop for controller {} running every {:?}", controller_id, period);

    loop {
        if cancel.is_cancelled() {
            break;
        }

        let result = fetch_state(&link, &registry, controller_id).await;

        if cancel.is_cancelled() {
            break;
        }

        match result {
            Ok(Some(state)) => notify(&mut observer, state),
            Ok(None) => {}
            Err(e) => debug!("Poll of controller {} failed: {}", controller_id, e),
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(period) => {}
        }
    }

    debug!("Poll loop for controller {} exited", controller_id);
}

/// Call the observer, containing any panic to this one notification
fn notify(observer: &mut StateObserver, state: ControllerState) {
    let controller_id = state.id;
    if let Err(panic) = catch_unwind(AssertUnwindSafe(|| observer(state))) {
        warn!(
            "Observer panicked for controller {}: {}",
            controller_id,
            panic_message(panic.as_ref())
        );
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        *msg
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.as_str()
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serial::port_trait::mocks::ScriptedPort;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    async fn connected_link() -> Link {
        let link = Link::default();
        link.attach(Box::new(ScriptedPort::peripheral())).await;
        link
    }

    #[test]
    fn test_new_poller_is_idle() {
        let poller = Poller::new();
        assert_eq!(poller.state(), PollerState::Idle);
        assert_eq!(poller.controller_id(), None);
    }

    #[tokio::test]
    async fn test_stop_when_idle_is_noop() {
        let mut poller = Poller::new();
        poller.stop().await;
        assert_eq!(poller.state(), PollerState::Idle);
    }

    #[tokio::test]
    async fn test_zero_rate_rejected() {
        let mut poller = Poller::new();
        let result = poller.start(connected_link().await, Registry::new(), 0, 0, Box::new(|_| {}));

        assert!(matches!(result, Err(InsenError::InvalidPollRate(0))));
        assert_eq!(poller.state(), PollerState::Idle);
    }

    #[tokio::test]
    async fn test_start_stop_transitions() {
        let mut poller = Poller::new();
        let registry = Registry::new();

        let started = poller
            .start(connected_link().await, registry.clone(), 1, 100, Box::new(|_| {}))
            .unwrap();
        assert!(started);
        assert_eq!(poller.state(), PollerState::Running);
        assert_eq!(poller.controller_id(), Some(1));

        tokio::time::sleep(Duration::from_millis(50)).await;
        poller.stop().await;

        assert_eq!(poller.state(), PollerState::Stopped);
        assert_eq!(registry.get(1).unwrap().battery, 77);
    }

    #[tokio::test]
    async fn test_panicking_observer_does_not_stop_loop() {
        let mut poller = Poller::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        poller
            .start(
                connected_link().await,
                Registry::new(),
                0,
                200,
                Box::new(move |_| {
                    if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                        panic!("observer failure");
                    }
                }),
            )
            .unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;
        poller.stop().await;

        assert!(calls.load(Ordering::SeqCst) >= 2, "loop died after the panic");
    }

    #[test]
    fn test_panic_message() {
        let boxed: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(boxed.as_ref()), "static");

        let boxed: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(boxed.as_ref()), "owned");

        let boxed: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(boxed.as_ref()), "non-string panic payload");
    }
}
