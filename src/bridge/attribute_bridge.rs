//! Inbound path: controller attribute writes to actuator motion.
//!
//! The stack reports every write it is about to commit, on every endpoint and
//! cluster. Only a pre-update of the window-covering target position on the
//! bridged endpoint reaches the position callback; everything else is observed
//! and let through. The handler never vetoes a write and never writes back to
//! the attribute that triggered it.

use std::sync::Arc;

use log::{debug, trace};

use super::context::BridgeContext;
use crate::matter::attribute_store::{AttrValue, AttributePath};
use crate::matter::ids::{ClusterId, WindowCoveringAttribute};
use crate::matter::platform::{PlatformError, UpdatePhase};

pub struct AttributeBridge {
    context: Arc<BridgeContext>,
}

impl AttributeBridge {
    pub fn new(context: Arc<BridgeContext>) -> Self {
        Self { context }
    }

    /// Handle one attribute update notification. Always succeeds.
    pub fn handle_update(
        &self,
        phase: UpdatePhase,
        path: AttributePath,
        value: &AttrValue,
    ) -> Result<(), PlatformError> {
        if phase != UpdatePhase::PreUpdate {
            return Ok(());
        }

        let Some(endpoint_id) = self.context.endpoint_id() else {
            return Ok(());
        };
        if path.endpoint_id != endpoint_id {
            return Ok(());
        }

        if path.cluster() != Some(ClusterId::WindowCovering)
            || WindowCoveringAttribute::from_repr(path.attribute_id)
                != Some(WindowCoveringAttribute::TargetPositionLiftPercent100ths)
        {
            trace!(
                "[Bridge] Ignoring update of cluster {:#06x} attribute {:#06x}",
                path.cluster_id, path.attribute_id
            );
            return Ok(());
        }

        let Some(target) = value.as_u16() else {
            debug!("[Bridge] Target position written as {:?}, ignoring", value);
            return Ok(());
        };

        debug!("[Bridge] Target position -> {}", target);
        if let Some(callbacks) = self.context.callbacks() {
            callbacks.notify_position(target);
        }
        Ok(())
    }
}
