//! btleplug-backed [`Transport`].
//!
//! The peripheral is located among the adapter's known devices by address.
//! If the adapter has not seen it yet, a short lookup scan runs until the
//! address shows up; this is not general device discovery, the address must
//! already be known to the caller.

use std::sync::Mutex as StdMutex;
use std::time::Duration;

use async_trait::async_trait;
use btleplug::api::{Central, CentralEvent, Manager as _, Peripheral as _, ScanFilter, WriteType};
use btleplug::platform::{Adapter, Manager, Peripheral};
use futures::StreamExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

use switchbot_types::PeripheralIdentity;

use crate::error::{Error, Result};
use crate::events::{
    ControlCapability, EventReceiver, EventSender, GattStatus, LinkEvent, ServiceInfo,
    TransportEvent, event_channel,
};
use crate::transport::Transport;
use crate::util::{format_peripheral_id, matches_address};

/// Default timeout for BLE connection operations.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Default timeout for service discovery.
const DEFAULT_DISCOVERY_TIMEOUT: Duration = Duration::from_secs(10);

/// Default timeout for the command write.
const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(10);

/// Default time spent scanning for an unknown address.
const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(10);

/// Interval between adapter polls during a lookup scan.
const LOOKUP_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Timeouts for [`BleTransport`].
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use switchbot_core::TransportConfig;
///
/// let config = TransportConfig::default()
///     .connection_timeout(Duration::from_secs(25))
///     .lookup_timeout(Duration::from_secs(20));
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    /// Timeout for establishing a BLE connection.
    pub connection_timeout: Duration,
    /// Timeout for service discovery.
    pub discovery_timeout: Duration,
    /// Timeout for the command write.
    pub write_timeout: Duration,
    /// How long to scan for a peripheral the adapter has not seen yet.
    pub lookup_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connection_timeout: DEFAULT_CONNECT_TIMEOUT,
            discovery_timeout: DEFAULT_DISCOVERY_TIMEOUT,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
            lookup_timeout: DEFAULT_LOOKUP_TIMEOUT,
        }
    }
}

impl TransportConfig {
    /// Create a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the connection timeout.
    #[must_use]
    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    /// Set the service discovery timeout.
    #[must_use]
    pub fn discovery_timeout(mut self, timeout: Duration) -> Self {
        self.discovery_timeout = timeout;
        self
    }

    /// Set the write timeout.
    #[must_use]
    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Set the lookup scan timeout.
    #[must_use]
    pub fn lookup_timeout(mut self, timeout: Duration) -> Self {
        self.lookup_timeout = timeout;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        let timeouts = [
            ("connection_timeout", self.connection_timeout),
            ("discovery_timeout", self.discovery_timeout),
            ("write_timeout", self.write_timeout),
            ("lookup_timeout", self.lookup_timeout),
        ];
        for (name, value) in timeouts {
            if value.is_zero() {
                return Err(Error::invalid_config(format!("{name} must be > 0")));
            }
        }
        Ok(())
    }
}

/// Get the first available Bluetooth adapter.
pub async fn get_adapter() -> Result<Adapter> {
    let manager = Manager::new()
        .await
        .map_err(|e| Error::TransportUnavailable(e.to_string()))?;
    let adapters = manager
        .adapters()
        .await
        .map_err(|e| Error::TransportUnavailable(e.to_string()))?;

    adapters
        .into_iter()
        .next()
        .ok_or_else(|| Error::TransportUnavailable("no Bluetooth adapter".to_string()))
}

/// Transport for a real SwitchBot Bot over the host's first adapter.
pub struct BleTransport {
    identity: PeripheralIdentity,
    adapter: Adapter,
    /// Connection handle, allocated by the first `connect`.
    peripheral: Mutex<Option<Peripheral>>,
    events: EventSender,
    watcher: StdMutex<Option<JoinHandle<()>>>,
    config: TransportConfig,
}

impl std::fmt::Debug for BleTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BleTransport")
            .field("identity", &self.identity)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl BleTransport {
    /// Create a transport with default timeouts.
    ///
    /// Fails with [`Error::TransportUnavailable`] when the host has no
    /// Bluetooth adapter.
    pub async fn new(identity: PeripheralIdentity) -> Result<(Self, EventReceiver)> {
        Self::with_config(identity, TransportConfig::default()).await
    }

    /// Create a transport with custom timeouts.
    pub async fn with_config(
        identity: PeripheralIdentity,
        config: TransportConfig,
    ) -> Result<(Self, EventReceiver)> {
        config.validate()?;
        let adapter = get_adapter().await?;
        let (events, receiver) = event_channel();
        let transport = Self {
            identity,
            adapter,
            peripheral: Mutex::new(None),
            events,
            watcher: StdMutex::new(None),
            config,
        };
        Ok((transport, receiver))
    }

    /// The peripheral this transport talks to.
    pub fn identity(&self) -> &PeripheralIdentity {
        &self.identity
    }

    fn emit(&self, event: TransportEvent) {
        if self.events.send(event).is_err() {
            debug!("Event receiver dropped");
        }
    }

    async fn handle(&self) -> Result<Peripheral> {
        self.peripheral
            .lock()
            .await
            .clone()
            .ok_or(Error::NotConnected)
    }

    async fn locate(&self) -> Result<Peripheral> {
        let address = self.identity.address();
        if let Some(peripheral) = find_peripheral_by_address(&self.adapter, address).await? {
            debug!("Found {} among known peripherals", address);
            return Ok(peripheral);
        }

        info!("Scanning for {}...", address);
        self.adapter.start_scan(ScanFilter::default()).await?;
        let found = timeout(
            self.config.lookup_timeout,
            poll_for_peripheral(&self.adapter, address),
        )
        .await;
        if let Err(e) = self.adapter.stop_scan().await {
            warn!("Failed to stop lookup scan: {}", e);
        }

        match found {
            Ok(result) => result,
            Err(_) => Err(Error::device_not_found(address)),
        }
    }

    /// Connect `peripheral` and start watching for its disconnection.
    async fn open(&self, peripheral: &Peripheral) -> Result<()> {
        // Subscribe first so a drop right after connecting is not missed.
        let mut central_events = self.adapter.events().await?;

        info!("Connecting to '{}'...", self.identity.display_name());
        timeout(self.config.connection_timeout, peripheral.connect())
            .await
            .map_err(|_| Error::timeout("connect to device", self.config.connection_timeout))??;

        let target = peripheral.id();
        let events = self.events.clone();
        let watcher = tokio::spawn(async move {
            while let Some(event) = central_events.next().await {
                if let CentralEvent::DeviceDisconnected(id) = event
                    && id == target
                {
                    debug!("Peripheral {} disconnected", format_peripheral_id(&id));
                    let _ = events.send(TransportEvent::ConnectionStateChanged(
                        LinkEvent::Disconnected,
                    ));
                    break;
                }
            }
        });
        self.replace_watcher(Some(watcher));

        self.emit(TransportEvent::ConnectionStateChanged(LinkEvent::Connected));
        Ok(())
    }

    fn replace_watcher(&self, watcher: Option<JoinHandle<()>>) {
        let mut slot = self.watcher.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = slot.take() {
            previous.abort();
        }
        *slot = watcher;
    }
}

impl Drop for BleTransport {
    fn drop(&mut self) {
        self.replace_watcher(None);
    }
}

#[async_trait]
impl Transport for BleTransport {
    #[tracing::instrument(level = "info", skip_all, fields(address = %self.identity.address()))]
    async fn connect(&self) -> Result<()> {
        let peripheral = self.locate().await?;
        *self.peripheral.lock().await = Some(peripheral.clone());
        self.open(&peripheral).await
    }

    #[tracing::instrument(level = "info", skip_all, fields(address = %self.identity.address()))]
    async fn reconnect(&self) -> Result<()> {
        // The first connect may have failed before a handle was stored.
        let stored = self.peripheral.lock().await.clone();
        match stored {
            Some(peripheral) => self.open(&peripheral).await,
            None => self.connect().await,
        }
    }

    #[tracing::instrument(level = "info", skip_all, fields(address = %self.identity.address()))]
    async fn disconnect(&self) -> Result<()> {
        let peripheral = self.handle().await?;
        // The explicit event below replaces the watcher's.
        self.replace_watcher(None);
        let result = peripheral.disconnect().await;
        self.emit(TransportEvent::ConnectionStateChanged(
            LinkEvent::Disconnected,
        ));
        result.map_err(Error::from)
    }

    #[tracing::instrument(level = "debug", skip_all, fields(address = %self.identity.address()))]
    async fn discover_services(&self) -> Result<()> {
        let peripheral = self.handle().await?;
        timeout(self.config.discovery_timeout, peripheral.discover_services())
            .await
            .map_err(|_| Error::timeout("discover services", self.config.discovery_timeout))??;

        let services: Vec<ServiceInfo> = peripheral
            .services()
            .iter()
            .map(|service| {
                debug!("  Service: {}", service.uuid);
                ServiceInfo::new(
                    service.uuid,
                    service.characteristics.iter().map(|c| c.uuid),
                )
            })
            .collect();
        debug!("Found {} services", services.len());

        self.emit(TransportEvent::ServicesDiscovered {
            status: GattStatus::SUCCESS,
            services,
        });
        Ok(())
    }

    #[tracing::instrument(level = "debug", skip_all, fields(address = %self.identity.address()))]
    async fn write(&self, capability: ControlCapability, payload: [u8; 3]) -> Result<()> {
        let peripheral = self.handle().await?;
        let characteristic = peripheral
            .characteristics()
            .into_iter()
            .find(|c| {
                c.uuid == capability.characteristic && c.service_uuid == capability.service
            })
            .ok_or_else(|| {
                Error::characteristic_not_found(
                    capability.characteristic.to_string(),
                    peripheral.services().len(),
                )
            })?;

        debug!("Writing {:02x?} to {}", payload, characteristic.uuid);
        timeout(
            self.config.write_timeout,
            peripheral.write(&characteristic, &payload, WriteType::WithResponse),
        )
        .await
        .map_err(|_| Error::timeout("write command", self.config.write_timeout))??;

        self.emit(TransportEvent::CharacteristicWriteComplete {
            status: GattStatus::SUCCESS,
        });
        Ok(())
    }
}

async fn poll_for_peripheral(adapter: &Adapter, address: &str) -> Result<Peripheral> {
    loop {
        if let Some(peripheral) = find_peripheral_by_address(adapter, address).await? {
            return Ok(peripheral);
        }
        sleep(LOOKUP_POLL_INTERVAL).await;
    }
}

async fn find_peripheral_by_address(
    adapter: &Adapter,
    address: &str,
) -> Result<Option<Peripheral>> {
    for peripheral in adapter.peripherals().await? {
        let id = format_peripheral_id(&peripheral.id());
        let reported = match peripheral.properties().await {
            Ok(Some(props)) => props.address.to_string(),
            _ => String::new(),
        };
        if matches_address(address, &reported, &id) {
            debug!("Matched {} as {}", address, id);
            return Ok(Some(peripheral));
        }
    }
    Ok(None)
}
