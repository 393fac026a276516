//! Vent bridge: lifecycle, inbound dispatch and outbound reporting.
//!
//! [`VentBridge`] owns the node handle and the window-covering endpoint. It
//! moves through `Uninitialized -> Initialized -> Started`; every other
//! operation is a synchronous one-shot call that can run concurrently with the
//! stack's own dispatch.

pub mod attribute_bridge;
pub mod callbacks;
pub mod commissioning;
pub mod context;
pub mod endpoint;
pub mod identify;
pub mod reporter;

use std::sync::{Arc, OnceLock};

use log::{debug, error, info};
use parking_lot::Mutex;

use crate::commissioning::clear_c_string;
use crate::error::{BridgeError, Result};
use crate::identity::HardwareIdentity;
use crate::matter::attribute_store::{AttrValue, AttributePath};
use crate::matter::ids::EndpointId;
use crate::matter::platform::{
    IdentifyEvent, MatterPlatform, PlatformError, PlatformEvents, RadioConfig, StartConfig,
    UpdatePhase,
};

use attribute_bridge::AttributeBridge;
use commissioning::{CommissioningFacade, PairingInfo};
use context::BridgeContext;
use endpoint::VentEndpoint;
use identify::IdentifyHandler;

pub use callbacks::{ActuatorSink, Callbacks};
pub use reporter::{ReportObserver, StateReporter};

/// Lifecycle state of a [`VentBridge`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    Uninitialized,
    Initialized,
    Started,
}

/// Device-level settings applied during init and start.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub vendor_name: String,
    pub product_name: String,
    pub radio: RadioConfig,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            vendor_name: "SmartVent".to_string(),
            product_name: "Smart HVAC Vent".to_string(),
            radio: RadioConfig::default(),
        }
    }
}

/// Event sink registered with the platform at node creation.
struct BridgeEvents {
    attributes: AttributeBridge,
    identify: IdentifyHandler,
}

impl PlatformEvents for BridgeEvents {
    fn on_attribute_update(
        &self,
        phase: UpdatePhase,
        path: AttributePath,
        value: &AttrValue,
    ) -> std::result::Result<(), PlatformError> {
        self.attributes.handle_update(phase, path, value)
    }

    fn on_identify(&self, endpoint_id: EndpointId, event: IdentifyEvent) {
        self.identify.handle(endpoint_id, event);
    }
}

/// Bridge between a motorized vent and the Matter data model.
pub struct VentBridge<P: MatterPlatform + 'static> {
    platform: Arc<P>,
    config: BridgeConfig,
    context: Arc<BridgeContext>,
    endpoint: OnceLock<VentEndpoint>,
    state: Mutex<BridgeState>,
    observer: Option<Arc<dyn ReportObserver>>,
    reporter: OnceLock<StateReporter>,
}

impl<P: MatterPlatform + 'static> VentBridge<P> {
    pub fn new(platform: Arc<P>, config: BridgeConfig) -> Self {
        Self {
            platform,
            config,
            context: Arc::new(BridgeContext::new()),
            endpoint: OnceLock::new(),
            state: Mutex::new(BridgeState::Uninitialized),
            observer: None,
            reporter: OnceLock::new(),
        }
    }

    /// Install a diagnostic hook for rejected reports. Takes effect at init.
    pub fn with_report_observer(mut self, observer: Arc<dyn ReportObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn platform(&self) -> &Arc<P> {
        &self.platform
    }

    pub fn state(&self) -> BridgeState {
        *self.state.lock()
    }

    /// Endpoint id of the window covering, once initialized.
    pub fn endpoint_id(&self) -> Option<EndpointId> {
        self.endpoint.get().map(VentEndpoint::id)
    }

    /// The window-covering endpoint, once initialized.
    pub fn endpoint(&self) -> Option<&VentEndpoint> {
        self.endpoint.get()
    }

    /// Commissioning discriminator, once initialized.
    pub fn discriminator(&self) -> Option<u16> {
        self.context.discriminator()
    }

    /// Outbound reporting handle for actuator drivers, once initialized.
    pub fn reporter(&self) -> Option<StateReporter> {
        self.reporter.get().cloned()
    }

    /// Derive the discriminator, then create the node and window-covering
    /// endpoint.
    ///
    /// Callbacks and the endpoint id are handed to dispatch only after every
    /// fallible step has passed, so a failed init leaves nothing that reacts
    /// to controller traffic.
    pub fn init(&self, callbacks: Callbacks, identity: &dyn HardwareIdentity) -> Result<()> {
        let mut state = self.state.lock();
        if *state != BridgeState::Uninitialized {
            return Err(BridgeError::AlreadyInitialized);
        }

        info!(
            "[Bridge] Initializing (position callback: {}, identify callback: {})",
            callbacks.has_position(),
            callbacks.has_identify()
        );

        let eui = identity.eui64().inspect_err(|e| {
            error!("[Bridge] Failed to read hardware identity: {}", e);
        })?;
        let discriminator = eui.discriminator();
        info!(
            "[Bridge] Discriminator {} (0x{:03X}) from EUI-64 {}",
            discriminator, discriminator, eui
        );

        let events = Arc::new(BridgeEvents {
            attributes: AttributeBridge::new(self.context.clone()),
            identify: IdentifyHandler::new(self.context.clone()),
        });
        self.platform.create_node(events).map_err(|e| {
            error!("[Bridge] Failed to create Matter node: {}", e);
            BridgeError::InitFailed(e.to_string())
        })?;

        let endpoint = VentEndpoint::create(
            self.platform.as_ref(),
            &self.config.vendor_name,
            &self.config.product_name,
        )
        .map_err(|e| {
            error!("[Bridge] Failed to create window covering endpoint: {}", e);
            BridgeError::InitFailed(e.to_string())
        })?;
        endpoint.publish_names(self.platform.as_ref());

        if !self.context.set_callbacks(callbacks) {
            return Err(BridgeError::InitFailed(
                "callbacks already registered by an earlier attempt".into(),
            ));
        }
        self.context.set_discriminator(discriminator);
        // Arms the attribute bridge
        self.context.set_endpoint_id(endpoint.id());

        let platform: Arc<dyn MatterPlatform> = self.platform.clone();
        let _ = self.reporter.set(StateReporter::new(
            platform,
            endpoint.id(),
            self.observer.clone(),
        ));
        let _ = self.endpoint.set(endpoint);

        *state = BridgeState::Initialized;
        Ok(())
    }

    /// Configure the radio and engage the stack.
    pub fn start(&self) -> Result<()> {
        let mut state = self.state.lock();
        match *state {
            BridgeState::Uninitialized => return Err(BridgeError::NotInitialized),
            BridgeState::Started => return Err(BridgeError::AlreadyStarted),
            BridgeState::Initialized => {}
        }
        let discriminator = self
            .context
            .discriminator()
            .ok_or(BridgeError::NotInitialized)?;

        let config = StartConfig {
            radio: self.config.radio,
            discriminator,
        };
        info!(
            "[Bridge] Starting stack ({:?} radio, queue depths {}/{})",
            config.radio.mode, config.radio.radio_queue_depth, config.radio.task_queue_depth
        );
        self.platform.start(&config).map_err(|e| {
            error!("[Bridge] Failed to start Matter stack: {}", e);
            BridgeError::StartFailed(e.to_string())
        })?;

        *state = BridgeState::Started;
        info!("[Bridge] Stack started");
        Ok(())
    }

    /// Publish the vent position (percent100ths). Never fails.
    pub fn report_position(&self, percent100ths: u16) {
        match self.reporter.get() {
            Some(reporter) => reporter.report_position(percent100ths),
            None => debug!("[Bridge] Position report before init dropped"),
        }
    }

    /// Publish the OperationalStatus byte. Never fails.
    pub fn report_operational_status(&self, status: u8) {
        match self.reporter.get() {
            Some(reporter) => reporter.report_operational_status(status),
            None => debug!("[Bridge] Status report before init dropped"),
        }
    }

    pub fn is_commissioned(&self) -> bool {
        self.platform.fabric_count() > 0
    }

    /// Manual pairing code as a NUL-terminated string in `buf`.
    pub fn pairing_code(&self, buf: &mut [u8]) -> Result<usize> {
        self.fill_with_facade(buf, |facade, buf| facade.pairing_code(buf))
    }

    /// `MT:` QR payload as a NUL-terminated string in `buf`.
    pub fn qr_payload(&self, buf: &mut [u8]) -> Result<usize> {
        self.fill_with_facade(buf, |facade, buf| facade.qr_payload(buf))
    }

    pub fn pairing_code_string(&self) -> Result<String> {
        self.facade()?.pairing_code_string()
    }

    pub fn qr_payload_string(&self) -> Result<String> {
        self.facade()?.qr_payload_string()
    }

    pub fn pairing_info(&self) -> Result<PairingInfo> {
        self.facade()?.pairing_info()
    }

    /// Schedule clearing of all fabrics. Completes after this returns.
    pub fn factory_reset(&self) {
        info!("[Bridge] Factory reset requested");
        self.platform.schedule_factory_reset();
    }

    fn fill_with_facade(
        &self,
        buf: &mut [u8],
        fill: impl FnOnce(CommissioningFacade<'_, P>, &mut [u8]) -> Result<usize>,
    ) -> Result<usize> {
        if buf.is_empty() {
            return Err(BridgeError::EmptyBuffer);
        }
        match self.facade() {
            Ok(facade) => fill(facade, buf),
            Err(e) => {
                clear_c_string(buf);
                Err(e)
            }
        }
    }

    fn facade(&self) -> Result<CommissioningFacade<'_, P>> {
        let discriminator = self
            .context
            .discriminator()
            .ok_or(BridgeError::NotInitialized)?;
        Ok(CommissioningFacade::new(self.platform.as_ref(), discriminator))
    }
}
