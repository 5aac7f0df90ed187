//! Async controller for one SwitchBot Bot.
//!
//! [`BotController`] owns a [`StateMachine`] inside a background tokio task.
//! Caller requests and transport events are serialized through that task,
//! so the machine is never touched from two places at once. Effects that
//! need the Bluetooth stack go through a second task that issues them one
//! at a time, in order; their completions come back as [`TransportEvent`]s
//! like everything else.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use switchbot_core::{BleTransport, BotController, CompletionNotifier, FileLog};
//! use switchbot_types::PeripheralIdentity;
//!
//! # async fn example() -> switchbot_core::Result<()> {
//! let identity = PeripheralIdentity::new("AA:BB:CC:DD:EE:FF", "Kitchen")?;
//! let (transport, events) = BleTransport::new(identity.clone()).await?;
//! let (notifier, done) = CompletionNotifier::channel();
//!
//! let controller = BotController::new(
//!     identity,
//!     Arc::new(transport),
//!     events,
//!     Arc::new(FileLog::open_default()),
//!     notifier,
//! )?;
//! controller.press()?;
//! let success = done.await.unwrap_or(false);
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::future::pending;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Sleep, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use switchbot_types::{Command, ConnectionState, PeripheralIdentity};

use crate::error::{Error, Result};
use crate::events::{Effect, EventReceiver, GattStatus, Input, LinkEvent, TransportEvent};
use crate::executor::DISCONNECT_DELAY;
use crate::log::LogSink;
use crate::machine::StateMachine;
use crate::transport::Transport;

/// One-shot completion callback.
///
/// Invoked at most once per controller with `true` when the command was
/// written and the grace period elapsed, `false` when the link or discovery
/// failed first.
pub struct CompletionNotifier(Box<dyn FnOnce(bool) + Send + 'static>);

impl CompletionNotifier {
    /// Wrap a callback.
    pub fn new(callback: impl FnOnce(bool) + Send + 'static) -> Self {
        Self(Box::new(callback))
    }

    /// A notifier that ignores the outcome.
    pub fn noop() -> Self {
        Self::new(|_| {})
    }

    /// A notifier paired with a receiver for async callers.
    ///
    /// The receiver errors if the controller is dropped before completing.
    pub fn channel() -> (Self, oneshot::Receiver<bool>) {
        let (tx, rx) = oneshot::channel();
        let notifier = Self::new(move |success| {
            let _ = tx.send(success);
        });
        (notifier, rx)
    }

    fn notify(self, success: bool) {
        (self.0)(success);
    }
}

impl fmt::Debug for CompletionNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CompletionNotifier")
    }
}

/// Tunables for [`BotController`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Delay between the write acknowledgment and the disconnect.
    pub disconnect_delay: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            disconnect_delay: DISCONNECT_DELAY,
        }
    }
}

impl ControllerConfig {
    /// Create a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the post-write delay.
    #[must_use]
    pub fn disconnect_delay(mut self, delay: Duration) -> Self {
        self.disconnect_delay = delay;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.disconnect_delay.is_zero() {
            return Err(Error::invalid_config("disconnect_delay must be > 0"));
        }
        Ok(())
    }
}

/// Handle to a running controller.
///
/// Dropping it stops the background task. A pending delayed disconnect is
/// dropped with the task and the completion callback is not invoked; if the
/// link is still up, a best-effort disconnect is issued.
pub struct BotController {
    identity: PeripheralIdentity,
    requests: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<ConnectionState>,
    cancel_token: CancellationToken,
    handle: JoinHandle<()>,
}

impl fmt::Debug for BotController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BotController")
            .field("identity", &self.identity)
            .field("state", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}

impl BotController {
    /// Start a controller with the default configuration.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new<T: Transport + 'static>(
        identity: PeripheralIdentity,
        transport: Arc<T>,
        events: EventReceiver,
        log: Arc<dyn LogSink>,
        notifier: CompletionNotifier,
    ) -> Result<Self> {
        Self::with_config(
            identity,
            transport,
            events,
            log,
            notifier,
            ControllerConfig::default(),
        )
    }

    /// Start a controller with a custom configuration.
    pub fn with_config<T: Transport + 'static>(
        identity: PeripheralIdentity,
        transport: Arc<T>,
        events: EventReceiver,
        log: Arc<dyn LogSink>,
        notifier: CompletionNotifier,
        config: ControllerConfig,
    ) -> Result<Self> {
        config.validate()?;
        let runtime = Handle::try_current()
            .map_err(|e| Error::invalid_config(format!("controller needs a tokio runtime: {e}")))?;

        let (requests, request_rx) = mpsc::unbounded_channel();
        let (failures, failure_rx) = mpsc::unbounded_channel();
        let (queue, queue_rx) = mpsc::unbounded_channel();
        let (state_tx, state) = watch::channel(ConnectionState::Disconnected);
        let cancel_token = CancellationToken::new();
        let transport: Arc<dyn Transport> = transport;

        runtime.spawn(run_requests(
            Arc::clone(&transport),
            queue_rx,
            failures,
            cancel_token.clone(),
        ));
        let runner = Runner {
            machine: StateMachine::new(identity.clone(), config.disconnect_delay),
            transport,
            log,
            notifier: Some(notifier),
            state: state_tx,
            queue,
            cancel: cancel_token.clone(),
            timer: None,
        };
        let handle = runtime.spawn(runner.run(request_rx, events, failure_rx));

        Ok(Self {
            identity,
            requests,
            state,
            cancel_token,
            handle,
        })
    }

    /// The peripheral this controller drives.
    pub fn identity(&self) -> &PeripheralIdentity {
        &self.identity
    }

    /// Last known link state.
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Receiver that observes link state changes.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// Schedule a press.
    pub fn press(&self) -> Result<()> {
        self.send(Command::Press)
    }

    /// Schedule a switch-on.
    pub fn turn_on(&self) -> Result<()> {
        self.send(Command::TurnOn)
    }

    /// Schedule a switch-off.
    pub fn turn_off(&self) -> Result<()> {
        self.send(Command::TurnOff)
    }

    /// Schedule `command`, replacing any command not yet written.
    pub fn send(&self, command: Command) -> Result<()> {
        if self.cancel_token.is_cancelled() {
            return Err(Error::ControllerClosed);
        }
        self.requests
            .send(command)
            .map_err(|_| Error::ControllerClosed)
    }

    /// Stop the controller.
    pub fn close(self) {
        self.cancel_token.cancel();
    }

    /// Whether the background task is still running.
    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl Drop for BotController {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

struct Runner {
    machine: StateMachine,
    transport: Arc<dyn Transport>,
    log: Arc<dyn LogSink>,
    notifier: Option<CompletionNotifier>,
    state: watch::Sender<ConnectionState>,
    queue: mpsc::UnboundedSender<Effect>,
    cancel: CancellationToken,
    timer: Option<Pin<Box<Sleep>>>,
}

impl Runner {
    async fn run(
        mut self,
        mut requests: mpsc::UnboundedReceiver<Command>,
        mut events: EventReceiver,
        mut failures: mpsc::UnboundedReceiver<TransportEvent>,
    ) {
        loop {
            let input = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                Some(command) = requests.recv() => Input::Schedule(command),
                Some(event) = events.recv() => Input::Transport(event),
                Some(event) = failures.recv() => Input::Transport(event),
                _ = wait_timer(&mut self.timer) => Input::DisconnectTimerElapsed,
            };
            if matches!(input, Input::DisconnectTimerElapsed) {
                self.timer = None;
            }
            self.apply(input);
        }
        self.shutdown();
    }

    fn apply(&mut self, input: Input) {
        let transition = self.machine.handle(input);
        self.state.send_replace(transition.state);
        for effect in transition.effects {
            self.perform(effect);
        }
    }

    fn perform(&mut self, effect: Effect) {
        match effect {
            Effect::ArmDisconnectTimer(delay) => {
                if self.timer.is_none() {
                    debug!(?delay, "Arming disconnect timer");
                    self.timer = Some(Box::pin(sleep(delay)));
                }
            }
            Effect::Complete { success } => {
                if let Some(notifier) = self.notifier.take() {
                    notifier.notify(success);
                }
            }
            Effect::Log(message) => self.log.append(&message),
            request => {
                let _ = self.queue.send(request);
            }
        }
    }

    fn shutdown(self) {
        if self.machine.state() == ConnectionState::Disconnected {
            return;
        }
        debug!(
            "Controller for '{}' closed while {}, disconnecting",
            self.machine.identity().display_name(),
            self.machine.state()
        );
        let transport = self.transport;
        tokio::spawn(async move {
            if let Err(e) = transport.disconnect().await {
                warn!("Failed to disconnect on close: {}", e);
            }
        });
    }
}

async fn wait_timer(timer: &mut Option<Pin<Box<Sleep>>>) {
    match timer {
        Some(deadline) => deadline.as_mut().await,
        None => pending().await,
    }
}

async fn issue(transport: &dyn Transport, effect: &Effect) -> Result<()> {
    match *effect {
        Effect::Connect => transport.connect().await,
        Effect::Reconnect => transport.reconnect().await,
        Effect::DiscoverServices => transport.discover_services().await,
        Effect::Write {
            capability,
            payload,
        } => transport.write(capability, payload).await,
        Effect::Disconnect => transport.disconnect().await,
        _ => Ok(()),
    }
}

/// Issue transport requests one at a time, in the order the runner queued them.
async fn run_requests(
    transport: Arc<dyn Transport>,
    mut queue: mpsc::UnboundedReceiver<Effect>,
    failures: mpsc::UnboundedSender<TransportEvent>,
    cancel: CancellationToken,
) {
    loop {
        let effect = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            effect = queue.recv() => match effect {
                Some(effect) => effect,
                None => break,
            },
        };
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            outcome = issue(transport.as_ref(), &effect) => outcome,
        };
        let Err(e) = outcome else { continue };

        warn!("Transport request {:?} failed: {}", effect, e);
        if matches!(effect, Effect::Write { .. }) {
            // The payload never reached the peripheral; drop the link.
            if let Err(e) = transport.disconnect().await {
                debug!("Disconnect after failed write also failed: {}", e);
            }
        }
        if let Some(event) = failure_event(&effect) {
            let _ = failures.send(event);
        }
    }
}

/// Event standing in for a transport request that returned `Err`.
///
/// A write that errors out was never issued, so it counts as a lost link
/// rather than an acknowledgment.
fn failure_event(effect: &Effect) -> Option<TransportEvent> {
    match effect {
        Effect::Connect | Effect::Reconnect | Effect::Disconnect | Effect::Write { .. } => {
            Some(TransportEvent::ConnectionStateChanged(LinkEvent::Disconnected))
        }
        Effect::DiscoverServices => Some(TransportEvent::ServicesDiscovered {
            status: GattStatus::FAILURE,
            services: Vec::new(),
        }),
        _ => None,
    }
}
