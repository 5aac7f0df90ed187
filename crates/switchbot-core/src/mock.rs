//! Mock transport for testing without Bluetooth hardware.
//!
//! [`MockTransport`] records every request the controller issues and lets
//! the test deliver transport events by hand, so each step of a command
//! lifecycle can be asserted. With [`MockTransportBuilder::auto_respond`]
//! it behaves like a well-mannered peripheral instead and answers every
//! request with the matching success event.
//!
//! # Features
//!
//! - **Call recording**: [`MockTransport::calls`] returns requests in order
//! - **Event injection**: [`MockTransport::emit`] delivers any event
//! - **Failure injection**: [`MockTransport::fail_on`] makes an operation return `Err`
//! - **Latency**: [`MockTransportBuilder::latency`] delays an operation before it
//!   reaches the peripheral

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use switchbot_types::uuid::{COMMAND_RESPONSE, COMMUNICATION_SERVICE, SEND_COMMAND};

use crate::error::{Error, Result};
use crate::events::{
    ControlCapability, EventReceiver, EventSender, GattStatus, LinkEvent, ServiceInfo,
    TransportEvent, event_channel,
};
use crate::transport::Transport;

/// A request received by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCall {
    /// `connect()`
    Connect,
    /// `reconnect()`
    Reconnect,
    /// `disconnect()`
    Disconnect,
    /// `discover_services()`
    DiscoverServices,
    /// `write()`
    Write {
        /// Target characteristic.
        capability: ControlCapability,
        /// Bytes written.
        payload: [u8; 3],
    },
}

/// Operation selector for failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOperation {
    /// `connect()`
    Connect,
    /// `reconnect()`
    Reconnect,
    /// `disconnect()`
    Disconnect,
    /// `discover_services()`
    DiscoverServices,
    /// `write()`
    Write,
}

/// A scriptable [`Transport`].
pub struct MockTransport {
    events: EventSender,
    calls: Mutex<Vec<TransportCall>>,
    failures: Mutex<HashSet<MockOperation>>,
    auto_respond: bool,
    services: Vec<ServiceInfo>,
    write_status: GattStatus,
    latency: HashMap<MockOperation, Duration>,
    call_signal: Notify,
}

impl std::fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTransport")
            .field("auto_respond", &self.auto_respond)
            .field("calls", &self.calls())
            .finish_non_exhaustive()
    }
}

impl MockTransport {
    /// Create a manual mock: no event is sent unless the test emits it.
    pub fn new() -> (Arc<Self>, EventReceiver) {
        MockTransportBuilder::new().build()
    }

    /// Create a mock that answers every request with a success event.
    pub fn responsive() -> (Arc<Self>, EventReceiver) {
        MockTransportBuilder::new().auto_respond(true).build()
    }

    /// Services a SwitchBot Bot exposes.
    pub fn bot_services() -> Vec<ServiceInfo> {
        vec![ServiceInfo::new(
            COMMUNICATION_SERVICE,
            [SEND_COMMAND, COMMAND_RESPONSE],
        )]
    }

    /// Requests received so far, in order.
    pub fn calls(&self) -> Vec<TransportCall> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Payloads written so far.
    pub fn writes(&self) -> Vec<[u8; 3]> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                TransportCall::Write { payload, .. } => Some(payload),
                _ => None,
            })
            .collect()
    }

    /// Deliver an event to the controller.
    pub fn emit(&self, event: TransportEvent) {
        // The controller may already be gone.
        let _ = self.events.send(event);
    }

    /// Make `operation` return an error from now on.
    pub fn fail_on(&self, operation: MockOperation) {
        self.failures
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(operation);
    }

    /// Wait until at least `count` requests have been received.
    pub async fn wait_for_calls(&self, count: usize) {
        loop {
            let notified = self.call_signal.notified();
            if self.calls.lock().unwrap_or_else(|e| e.into_inner()).len() >= count {
                return;
            }
            notified.await;
        }
    }

    async fn record(&self, call: TransportCall, operation: MockOperation) -> Result<()> {
        if let Some(delay) = self.latency.get(&operation) {
            tokio::time::sleep(*delay).await;
        }
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(call);
        self.call_signal.notify_waiters();

        let failing = self
            .failures
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&operation);
        if !failing {
            return Ok(());
        }
        Err(match operation {
            MockOperation::Connect | MockOperation::Reconnect => {
                Error::device_not_found("mock peripheral")
            }
            _ => Error::NotConnected,
        })
    }

    fn respond(&self, event: TransportEvent) {
        if self.auto_respond {
            self.emit(event);
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(&self) -> Result<()> {
        self.record(TransportCall::Connect, MockOperation::Connect).await?;
        self.respond(TransportEvent::ConnectionStateChanged(LinkEvent::Connected));
        Ok(())
    }

    async fn reconnect(&self) -> Result<()> {
        self.record(TransportCall::Reconnect, MockOperation::Reconnect).await?;
        self.respond(TransportEvent::ConnectionStateChanged(LinkEvent::Connected));
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        self.record(TransportCall::Disconnect, MockOperation::Disconnect).await?;
        self.respond(TransportEvent::ConnectionStateChanged(
            LinkEvent::Disconnected,
        ));
        Ok(())
    }

    async fn discover_services(&self) -> Result<()> {
        self.record(TransportCall::DiscoverServices, MockOperation::DiscoverServices).await?;
        self.respond(TransportEvent::ServicesDiscovered {
            status: GattStatus::SUCCESS,
            services: self.services.clone(),
        });
        Ok(())
    }

    async fn write(&self, capability: ControlCapability, payload: [u8; 3]) -> Result<()> {
        self.record(
            TransportCall::Write {
                capability,
                payload,
            },
            MockOperation::Write,
        )
        .await?;
        self.respond(TransportEvent::CharacteristicWriteComplete {
            status: self.write_status,
        });
        Ok(())
    }
}

/// Builder for [`MockTransport`].
#[derive(Debug, Clone)]
pub struct MockTransportBuilder {
    auto_respond: bool,
    services: Vec<ServiceInfo>,
    write_status: GattStatus,
    failures: HashSet<MockOperation>,
    latency: HashMap<MockOperation, Duration>,
}

impl Default for MockTransportBuilder {
    fn default() -> Self {
        Self {
            auto_respond: false,
            services: MockTransport::bot_services(),
            write_status: GattStatus::SUCCESS,
            failures: HashSet::new(),
            latency: HashMap::new(),
        }
    }
}

impl MockTransportBuilder {
    /// Create a new builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer each request with its success event.
    #[must_use]
    pub fn auto_respond(mut self, enabled: bool) -> Self {
        self.auto_respond = enabled;
        self
    }

    /// Services reported by auto-responded discovery.
    #[must_use]
    pub fn services(mut self, services: Vec<ServiceInfo>) -> Self {
        self.services = services;
        self
    }

    /// Status reported by auto-responded writes.
    #[must_use]
    pub fn write_status(mut self, status: GattStatus) -> Self {
        self.write_status = status;
        self
    }

    /// Make an operation fail from the start.
    #[must_use]
    pub fn fail_on(mut self, operation: MockOperation) -> Self {
        self.failures.insert(operation);
        self
    }

    /// Delay `operation` by `delay` before it is recorded.
    #[must_use]
    pub fn latency(mut self, operation: MockOperation, delay: Duration) -> Self {
        self.latency.insert(operation, delay);
        self
    }

    /// Build the mock and the event receiver to hand to the controller.
    pub fn build(self) -> (Arc<MockTransport>, EventReceiver) {
        let (events, receiver) = event_channel();
        let transport = MockTransport {
            events,
            calls: Mutex::new(Vec::new()),
            failures: Mutex::new(self.failures),
            auto_respond: self.auto_respond,
            services: self.services,
            write_status: self.write_status,
            latency: self.latency,
            call_signal: Notify::new(),
        };
        (Arc::new(transport), receiver)
    }
}
