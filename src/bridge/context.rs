//! Write-once state shared between the lifecycle controller and the stack's
//! event dispatch.

use std::sync::OnceLock;

use super::callbacks::Callbacks;
use crate::matter::ids::EndpointId;

/// Registrations made during init and read lock-free afterwards.
#[derive(Debug, Default)]
pub struct BridgeContext {
    callbacks: OnceLock<Callbacks>,
    endpoint_id: OnceLock<EndpointId>,
    discriminator: OnceLock<u16>,
}

impl BridgeContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if callbacks were already registered.
    pub fn set_callbacks(&self, callbacks: Callbacks) -> bool {
        self.callbacks.set(callbacks).is_ok()
    }

    pub fn callbacks(&self) -> Option<&Callbacks> {
        self.callbacks.get()
    }

    /// Returns false if an endpoint was already recorded.
    pub fn set_endpoint_id(&self, endpoint_id: EndpointId) -> bool {
        self.endpoint_id.set(endpoint_id).is_ok()
    }

    pub fn endpoint_id(&self) -> Option<EndpointId> {
        self.endpoint_id.get().copied()
    }

    /// Returns false if a discriminator was already recorded.
    pub fn set_discriminator(&self, discriminator: u16) -> bool {
        self.discriminator.set(discriminator).is_ok()
    }

    pub fn discriminator(&self) -> Option<u16> {
        self.discriminator.get().copied()
    }
}
