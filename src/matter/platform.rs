//! Boundary between the vent bridge and the Matter protocol stack.
//!
//! The bridge never talks to a transport directly. It drives a
//! [`MatterPlatform`] (node and endpoint creation, attribute access, fabric
//! state, commissioning data, radio start) and receives inbound traffic through
//! the [`PlatformEvents`] sink it registers when the node is created.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::attribute_store::{AttrValue, AttributePath, AttributeStore, StoreError};
use super::ids::{ClusterId, CoveringType, EndpointId, OperationalStatus, ROOT_ENDPOINT_ID};

/// Errors reported by a platform implementation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlatformError {
    #[error("platform is not ready")]
    NotReady,

    #[error("node creation failed: {0}")]
    NodeCreation(String),

    #[error("endpoint creation failed: {0}")]
    EndpointCreation(String),

    #[error("stack start failed: {0}")]
    Start(String),

    #[error("commissioning data unavailable: {0}")]
    CommissioningData(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Phase of an attribute write as seen by the event sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdatePhase {
    /// The stack is about to commit the value.
    PreUpdate,
    /// The value has been committed.
    PostUpdate,
    /// A controller read the attribute.
    Read,
}

/// Identify request delivered by the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifyEvent {
    Start { effect_id: u8, effect_variant: u8 },
    Stop,
}

/// Inbound events from the stack.
///
/// Called on the stack's own context; implementations must return quickly and
/// never block.
pub trait PlatformEvents: Send + Sync {
    /// Attribute write notification. The returned status is handed back to the
    /// stack; an error vetoes the write.
    fn on_attribute_update(
        &self,
        phase: UpdatePhase,
        path: AttributePath,
        value: &AttrValue,
    ) -> Result<(), PlatformError>;

    /// Identify start/stop on an endpoint.
    fn on_identify(&self, endpoint_id: EndpointId, event: IdentifyEvent);
}

/// Static configuration of the window-covering endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowCoveringConfig {
    pub covering_type: CoveringType,
    pub config_status: u8,
    pub operational_status: u8,
    pub end_product_type: CoveringType,
    pub mode: u8,
    /// Endpoint creation flags (none used by the vent).
    pub flags: u32,
}

impl Default for WindowCoveringConfig {
    fn default() -> Self {
        Self {
            covering_type: CoveringType::Rollershade,
            config_status: 0,
            operational_status: OperationalStatus::STOPPED,
            end_product_type: CoveringType::Rollershade,
            mode: 0,
            flags: 0,
        }
    }
}

/// Radio operating mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RadioMode {
    /// The radio is driven by the host itself.
    #[default]
    Native,
}

/// Radio / transport configuration passed to [`MatterPlatform::start`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RadioConfig {
    pub mode: RadioMode,
    pub radio_queue_depth: usize,
    pub task_queue_depth: usize,
}

impl Default for RadioConfig {
    fn default() -> Self {
        Self {
            mode: RadioMode::Native,
            radio_queue_depth: 10,
            task_queue_depth: 10,
        }
    }
}

/// Everything the stack needs to go live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartConfig {
    pub radio: RadioConfig,
    pub discriminator: u16,
}

/// Commissioning parameters held by the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommissioningData {
    pub vendor_id: u16,
    pub product_id: u16,
    pub passcode: u32,
}

/// Protocol stack operations used by the bridge.
///
/// Attribute access has default implementations over [`MatterPlatform::store`],
/// which every platform exposes so that cluster handlers and the bridge share
/// one view of the data model.
pub trait MatterPlatform: Send + Sync {
    /// Create the protocol node, registering the inbound event sink.
    fn create_node(&self, events: Arc<dyn PlatformEvents>) -> Result<(), PlatformError>;

    /// Create the window-covering endpoint and return its assigned id.
    fn create_window_covering_endpoint(
        &self,
        config: &WindowCoveringConfig,
    ) -> Result<EndpointId, PlatformError>;

    /// Attribute store backing the data model.
    fn store(&self) -> &AttributeStore;

    /// Number of fabrics the node currently belongs to.
    fn fabric_count(&self) -> usize;

    /// Commissioning parameters (vendor, product, passcode, rendezvous).
    fn commissioning_data(&self) -> Result<CommissioningData, PlatformError>;

    /// Configure the radio and engage the stack.
    fn start(&self, config: &StartConfig) -> Result<(), PlatformError>;

    /// Schedule clearing of all fabrics. Completes asynchronously.
    fn schedule_factory_reset(&self);

    fn root_endpoint(&self) -> EndpointId {
        ROOT_ENDPOINT_ID
    }

    fn has_cluster(&self, endpoint_id: EndpointId, cluster: ClusterId) -> bool {
        self.store().has_cluster(endpoint_id, cluster as u32)
    }

    fn update_attribute(&self, path: AttributePath, value: AttrValue) -> Result<(), PlatformError> {
        self.store().set(path, value).map_err(PlatformError::from)
    }

    fn read_attribute(&self, path: &AttributePath) -> Option<AttrValue> {
        self.store().get(path)
    }
}

/// Attributes seeded on a freshly created window-covering endpoint.
pub(crate) fn window_covering_defaults(
    endpoint_id: EndpointId,
    config: &WindowCoveringConfig,
) -> Vec<(AttributePath, AttrValue)> {
    use super::ids::WindowCoveringAttribute as A;

    let path = |attr| AttributePath::window_covering(endpoint_id, attr);
    vec![
        (path(A::Type), AttrValue::U8(config.covering_type as u8)),
        (path(A::ConfigStatus), AttrValue::U8(config.config_status)),
        (path(A::CurrentPositionLiftPercentage), AttrValue::NullableU8(None)),
        (path(A::OperationalStatus), AttrValue::U8(config.operational_status)),
        (path(A::TargetPositionLiftPercent100ths), AttrValue::NullableU16(None)),
        (path(A::EndProductType), AttrValue::U8(config.end_product_type as u8)),
        (path(A::CurrentPositionLiftPercent100ths), AttrValue::NullableU16(None)),
        (path(A::Mode), AttrValue::U8(config.mode)),
    ]
}

/// Attributes seeded on the Identify cluster of an endpoint.
pub(crate) fn identify_defaults(endpoint_id: EndpointId) -> Vec<(AttributePath, AttrValue)> {
    use super::ids::{IdentifyAttribute, IdentifyType};

    vec![
        (
            AttributePath::identify(endpoint_id, IdentifyAttribute::IdentifyTime),
            AttrValue::U16(0),
        ),
        (
            AttributePath::identify(endpoint_id, IdentifyAttribute::IdentifyType),
            AttrValue::U8(IdentifyType::Actuator as u8),
        ),
    ]
}

/// Declare and seed the clusters of a window-covering endpoint in `store`.
pub(crate) fn seed_window_covering(
    store: &AttributeStore,
    endpoint_id: EndpointId,
    config: &WindowCoveringConfig,
) -> Result<(), PlatformError> {
    store.declare_cluster(endpoint_id, ClusterId::Descriptor as u32);
    store.declare_cluster(endpoint_id, ClusterId::WindowCovering as u32);
    store.declare_cluster(endpoint_id, ClusterId::Identify as u32);

    for (path, value) in window_covering_defaults(endpoint_id, config)
        .into_iter()
        .chain(identify_defaults(endpoint_id))
    {
        store.init_value(path, value)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matter::ids::WindowCoveringAttribute;

    #[test]
    fn test_default_window_covering_config() {
        let config = WindowCoveringConfig::default();
        assert_eq!(config.covering_type, CoveringType::Rollershade);
        assert_eq!(config.end_product_type, CoveringType::Rollershade);
        assert_eq!(config.config_status, 0);
        assert_eq!(config.operational_status, 0);
        assert_eq!(config.mode, 0);
        assert_eq!(config.flags, 0);
    }

    #[test]
    fn test_seeded_endpoint_starts_indeterminate() {
        let store = AttributeStore::new();
        seed_window_covering(&store, 1, &WindowCoveringConfig::default()).unwrap();

        let current = store
            .get(&AttributePath::window_covering(
                1,
                WindowCoveringAttribute::CurrentPositionLiftPercent100ths,
            ))
            .unwrap();
        assert!(current.is_null());
        assert!(store.has_cluster(1, ClusterId::Identify as u32));
        assert!(!store.has_cluster(0, ClusterId::WindowCovering as u32));
        assert_eq!(store.cluster_version(1, ClusterId::WindowCovering as u32), 0);
    }

    #[test]
    fn test_radio_defaults() {
        let radio = RadioConfig::default();
        assert_eq!(radio.mode, RadioMode::Native);
        assert_eq!(radio.radio_queue_depth, 10);
        assert_eq!(radio.task_queue_depth, 10);
    }
}
