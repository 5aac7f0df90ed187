//! Capability resolver: finds the control characteristic after connecting.

use thiserror::Error;
use uuid::Uuid;

use switchbot_types::uuid::SEND_COMMAND;

use crate::events::{ControlCapability, GattStatus, ServiceInfo};

/// Why a discovery result did not yield the control characteristic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// The stack reported a discovery error.
    #[error("service discovery failed with status {0}")]
    DiscoveryFailed(GattStatus),

    /// Discovery succeeded but no service exposes the characteristic.
    #[error("characteristic {uuid} not found in {service_count} services")]
    NotFound {
        /// The characteristic that was sought.
        uuid: Uuid,
        /// Number of services searched.
        service_count: usize,
    },
}

/// Looks up one fixed characteristic and caches it for the controller's lifetime.
#[derive(Debug, Clone)]
pub struct CapabilityResolver {
    target: Uuid,
    cached: Option<ControlCapability>,
}

impl Default for CapabilityResolver {
    fn default() -> Self {
        Self::new(SEND_COMMAND)
    }
}

impl CapabilityResolver {
    /// Create a resolver for the given characteristic UUID.
    pub fn new(target: Uuid) -> Self {
        Self {
            target,
            cached: None,
        }
    }

    /// The characteristic being sought.
    pub fn target(&self) -> Uuid {
        self.target
    }

    /// The cached capability, if discovery has succeeded.
    pub fn capability(&self) -> Option<ControlCapability> {
        self.cached
    }

    /// Whether the capability is known.
    pub fn is_resolved(&self) -> bool {
        self.cached.is_some()
    }

    /// Match a discovery result against the target characteristic.
    ///
    /// The first service exposing the characteristic wins. Once resolved,
    /// the cached capability is returned and the new result is ignored; the
    /// cache is never cleared.
    pub fn resolve(
        &mut self,
        status: GattStatus,
        services: &[ServiceInfo],
    ) -> Result<ControlCapability, ResolveError> {
        if let Some(capability) = self.cached {
            return Ok(capability);
        }
        if !status.is_success() {
            return Err(ResolveError::DiscoveryFailed(status));
        }

        let capability = services
            .iter()
            .find(|service| service.characteristics.contains(&self.target))
            .map(|service| ControlCapability {
                service: service.uuid,
                characteristic: self.target,
            })
            .ok_or(ResolveError::NotFound {
                uuid: self.target,
                service_count: services.len(),
            })?;

        self.cached = Some(capability);
        Ok(capability)
    }
}
