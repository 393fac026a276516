//! Identify requests to the actuator.
//!
//! Every START maps to a fixed-duration identify; effect id and variant are
//! logged but not differentiated.

use std::sync::Arc;

use log::info;

use super::context::BridgeContext;
use crate::matter::ids::EndpointId;
use crate::matter::platform::IdentifyEvent;

/// Identify duration handed to the actuator on START, in seconds.
pub const IDENTIFY_DEFAULT_DURATION_S: u16 = 10;

pub struct IdentifyHandler {
    context: Arc<BridgeContext>,
}

impl IdentifyHandler {
    pub fn new(context: Arc<BridgeContext>) -> Self {
        Self { context }
    }

    pub fn handle(&self, endpoint_id: EndpointId, event: IdentifyEvent) {
        let duration_s = match event {
            IdentifyEvent::Start {
                effect_id,
                effect_variant,
            } => {
                info!(
                    "[Identify] Start on endpoint {} (effect {}, variant {})",
                    endpoint_id, effect_id, effect_variant
                );
                IDENTIFY_DEFAULT_DURATION_S
            }
            IdentifyEvent::Stop => {
                info!("[Identify] Stop on endpoint {}", endpoint_id);
                0
            }
        };

        if let Some(callbacks) = self.context.callbacks() {
            callbacks.notify_identify(duration_s);
        }
    }
}
