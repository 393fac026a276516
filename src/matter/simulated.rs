//! In-process Matter platform.
//!
//! Stands in for a real stack in `--simulate` mode and in tests: it keeps the
//! data model in an [`AttributeStore`], lets callers play the controller
//! (attribute writes, identify, fabric changes) and can be told to fail any
//! fallible operation.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use log::{debug, info, warn};
use parking_lot::{Mutex, RwLock};

use super::attribute_store::{AttrValue, AttributePath, AttributeStore, StoreError};
use super::ids::{
    BasicInformationAttribute, ClusterId, EndpointId, IdentifyAttribute, ROOT_ENDPOINT_ID,
};
use super::platform::{
    CommissioningData, IdentifyEvent, MatterPlatform, PlatformError, PlatformEvents, StartConfig,
    UpdatePhase, WindowCoveringConfig, seed_window_covering,
};

/// First endpoint id handed out after the root endpoint.
const FIRST_DYNAMIC_ENDPOINT: EndpointId = 1;

/// Operations the simulated platform should fail on.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimulatedFailures {
    pub node: bool,
    pub endpoint: bool,
    pub start: bool,
    pub commissioning_data: bool,
}

/// Simulated Matter stack.
pub struct SimulatedPlatform {
    store: AttributeStore,
    events: RwLock<Option<Arc<dyn PlatformEvents>>>,
    endpoints: Mutex<Vec<EndpointId>>,
    fabrics: AtomicUsize,
    started: Mutex<Option<StartConfig>>,
    reset_pending: AtomicBool,
    failures: Mutex<SimulatedFailures>,
    commissioning: CommissioningData,
}

impl Default for SimulatedPlatform {
    fn default() -> Self {
        Self::new(CommissioningData {
            vendor_id: 0xFFF1,
            product_id: 0x8001,
            passcode: 20_202_021,
        })
    }
}

impl SimulatedPlatform {
    /// Platform whose root endpoint carries a BasicInformation cluster.
    pub fn new(commissioning: CommissioningData) -> Self {
        let platform = Self::without_basic_information(commissioning);
        platform.add_basic_information();
        platform
    }

    /// Platform whose root endpoint lacks BasicInformation.
    pub fn without_basic_information(commissioning: CommissioningData) -> Self {
        Self {
            store: AttributeStore::new(),
            events: RwLock::new(None),
            endpoints: Mutex::new(Vec::new()),
            fabrics: AtomicUsize::new(0),
            started: Mutex::new(None),
            reset_pending: AtomicBool::new(false),
            failures: Mutex::new(SimulatedFailures::default()),
            commissioning,
        }
    }

    fn add_basic_information(&self) {
        let cluster = ClusterId::BasicInformation as u32;
        self.store.declare_cluster(ROOT_ENDPOINT_ID, cluster);
        let seed = [
            (
                BasicInformationAttribute::VendorName,
                AttrValue::CharString(String::new()),
            ),
            (
                BasicInformationAttribute::VendorId,
                AttrValue::U16(self.commissioning.vendor_id),
            ),
            (
                BasicInformationAttribute::ProductName,
                AttrValue::CharString(String::new()),
            ),
            (
                BasicInformationAttribute::ProductId,
                AttrValue::U16(self.commissioning.product_id),
            ),
        ];
        for (attr, value) in seed {
            let path = AttributePath::basic_information(ROOT_ENDPOINT_ID, attr);
            if let Err(e) = self.store.init_value(path, value) {
                warn!("[Sim] Failed to seed {:?}: {}", attr, e);
            }
        }
    }

    /// Replace the failure injection settings.
    pub fn set_failures(&self, failures: SimulatedFailures) {
        *self.failures.lock() = failures;
    }

    /// Endpoints created so far, in creation order.
    pub fn endpoints(&self) -> Vec<EndpointId> {
        self.endpoints.lock().clone()
    }

    /// Configuration passed to the last successful `start`.
    pub fn started_with(&self) -> Option<StartConfig> {
        *self.started.lock()
    }

    /// Play a controller attribute write: pre-update, commit, post-update.
    ///
    /// A pre-update veto leaves the stored value untouched.
    pub fn controller_write(
        &self,
        path: AttributePath,
        value: AttrValue,
    ) -> Result<(), PlatformError> {
        if !self.store.has_cluster(path.endpoint_id, path.cluster_id) {
            return Err(PlatformError::Store(StoreError::UnsupportedCluster {
                endpoint_id: path.endpoint_id,
                cluster_id: path.cluster_id,
            }));
        }

        let events = self.events.read().clone();
        if let Some(events) = &events {
            events.on_attribute_update(UpdatePhase::PreUpdate, path, &value)?;
        }

        debug!("[Sim] Controller wrote {:?} = {:?}", path, value);
        self.store.set(path, value.clone())?;

        if let Some(events) = &events {
            events.on_attribute_update(UpdatePhase::PostUpdate, path, &value)?;
        }
        Ok(())
    }

    /// Play a controller identify request on an endpoint.
    pub fn trigger_identify(&self, endpoint_id: EndpointId, event: IdentifyEvent) {
        let time = match event {
            IdentifyEvent::Start { .. } => crate::bridge::identify::IDENTIFY_DEFAULT_DURATION_S,
            IdentifyEvent::Stop => 0,
        };
        let path = AttributePath::identify(endpoint_id, IdentifyAttribute::IdentifyTime);
        if self.store.has_cluster(endpoint_id, ClusterId::Identify as u32) {
            if let Err(e) = self.store.set(path, AttrValue::U16(time)) {
                debug!("[Sim] IdentifyTime update on endpoint {} failed: {}", endpoint_id, e);
            }
        }

        if let Some(events) = self.events.read().clone() {
            events.on_identify(endpoint_id, event);
        }
    }

    /// Commission the node into one more fabric.
    pub fn add_fabric(&self) -> usize {
        let count = self.fabrics.fetch_add(1, Ordering::SeqCst) + 1;
        info!("[Sim] Fabric added ({} total)", count);
        count
    }

    /// Remove one fabric, if any.
    pub fn remove_fabric(&self) -> usize {
        let previous = self
            .fabrics
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .unwrap_or(0);
        let count = previous.saturating_sub(1);
        info!("[Sim] Fabric removed ({} total)", count);
        count
    }

    /// Whether a factory reset is scheduled but not yet performed.
    pub fn reset_pending(&self) -> bool {
        self.reset_pending.load(Ordering::SeqCst)
    }

    /// Run deferred work. Returns true if a factory reset was performed.
    pub fn process_pending(&self) -> bool {
        if !self.reset_pending.swap(false, Ordering::SeqCst) {
            return false;
        }
        self.fabrics.store(0, Ordering::SeqCst);
        info!("[Sim] Factory reset complete, all fabrics cleared");
        true
    }
}

impl MatterPlatform for SimulatedPlatform {
    fn create_node(&self, events: Arc<dyn PlatformEvents>) -> Result<(), PlatformError> {
        if self.failures.lock().node {
            return Err(PlatformError::NodeCreation("injected failure".into()));
        }
        *self.events.write() = Some(events);
        info!("[Sim] Node created");
        Ok(())
    }

    fn create_window_covering_endpoint(
        &self,
        config: &WindowCoveringConfig,
    ) -> Result<EndpointId, PlatformError> {
        if self.failures.lock().endpoint {
            return Err(PlatformError::EndpointCreation("injected failure".into()));
        }
        if self.events.read().is_none() {
            return Err(PlatformError::NotReady);
        }

        let mut endpoints = self.endpoints.lock();
        let endpoint_id = endpoints
            .last()
            .map_or(FIRST_DYNAMIC_ENDPOINT, |last| last + 1);
        seed_window_covering(&self.store, endpoint_id, config)?;
        endpoints.push(endpoint_id);

        info!("[Sim] Window covering endpoint {} created", endpoint_id);
        Ok(endpoint_id)
    }

    fn store(&self) -> &AttributeStore {
        &self.store
    }

    fn fabric_count(&self) -> usize {
        self.fabrics.load(Ordering::SeqCst)
    }

    fn commissioning_data(&self) -> Result<CommissioningData, PlatformError> {
        if self.failures.lock().commissioning_data {
            return Err(PlatformError::CommissioningData("injected failure".into()));
        }
        Ok(self.commissioning)
    }

    fn start(&self, config: &StartConfig) -> Result<(), PlatformError> {
        if self.failures.lock().start {
            return Err(PlatformError::Start("injected failure".into()));
        }
        if self.events.read().is_none() {
            return Err(PlatformError::NotReady);
        }
        info!(
            "[Sim] Stack started ({:?} radio, queues {}/{}, discriminator {})",
            config.radio.mode,
            config.radio.radio_queue_depth,
            config.radio.task_queue_depth,
            config.discriminator
        );
        *self.started.lock() = Some(*config);
        Ok(())
    }

    fn schedule_factory_reset(&self) {
        info!("[Sim] Factory reset scheduled");
        self.reset_pending.store(true, Ordering::SeqCst);
    }
}
