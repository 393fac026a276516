//! Outbound path: actuator state to WindowCovering attributes.
//!
//! Reporting is fire-and-forget. A failed store write is logged and handed to
//! the optional [`ReportObserver`]; the caller never sees it.

use std::sync::Arc;

use log::{debug, warn};

use crate::matter::attribute_store::{AttrValue, AttributePath};
use crate::matter::ids::{EndpointId, OperationalStatus, WindowCoveringAttribute};
use crate::matter::platform::{MatterPlatform, PlatformError};
use crate::matter::units::{clamp_percent100ths, percent100ths_to_percent};

/// Diagnostic hook for reports the stack rejected.
pub trait ReportObserver: Send + Sync {
    fn report_failed(&self, path: AttributePath, error: &PlatformError);
}

/// Cloneable handle that writes actuator state into the data model.
#[derive(Clone)]
pub struct StateReporter {
    platform: Arc<dyn MatterPlatform>,
    endpoint_id: EndpointId,
    observer: Option<Arc<dyn ReportObserver>>,
}

impl StateReporter {
    pub fn new(
        platform: Arc<dyn MatterPlatform>,
        endpoint_id: EndpointId,
        observer: Option<Arc<dyn ReportObserver>>,
    ) -> Self {
        Self {
            platform,
            endpoint_id,
            observer,
        }
    }

    pub fn endpoint_id(&self) -> EndpointId {
        self.endpoint_id
    }

    /// Publish the current position in percent100ths. Values above 10000 are
    /// clamped.
    pub fn report_position(&self, percent100ths: u16) {
        let value = clamp_percent100ths(percent100ths);
        if value != percent100ths {
            debug!("[Reporter] Clamped position {} to {}", percent100ths, value);
        }

        self.write(
            WindowCoveringAttribute::CurrentPositionLiftPercent100ths,
            AttrValue::NullableU16(Some(value)),
        );
        self.write(
            WindowCoveringAttribute::CurrentPositionLiftPercentage,
            AttrValue::NullableU8(Some(percent100ths_to_percent(value))),
        );
    }

    /// Publish the OperationalStatus byte (0 = stopped, non-zero = moving).
    pub fn report_operational_status(&self, status: u8) {
        debug!(
            "[Reporter] Operational status {:#04x} ({:?})",
            status,
            OperationalStatus::from_byte(status)
        );
        self.write(
            WindowCoveringAttribute::OperationalStatus,
            AttrValue::U8(status),
        );
    }

    fn write(&self, attr: WindowCoveringAttribute, value: AttrValue) {
        let path = AttributePath::window_covering(self.endpoint_id, attr);
        if let Err(e) = self.platform.update_attribute(path, value) {
            warn!("[Reporter] Failed to update {:?}: {}", attr, e);
            if let Some(observer) = &self.observer {
                observer.report_failed(path, &e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matter::platform::{IdentifyEvent, PlatformEvents, UpdatePhase, WindowCoveringConfig};
    use crate::matter::simulated::SimulatedPlatform;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct FailureLog(Mutex<Vec<AttributePath>>);

    impl ReportObserver for FailureLog {
        fn report_failed(&self, path: AttributePath, _error: &PlatformError) {
            self.0.lock().push(path);
        }
    }

    fn platform_with_endpoint() -> (Arc<SimulatedPlatform>, EndpointId) {
        struct NoEvents;
        impl PlatformEvents for NoEvents {
            fn on_attribute_update(
                &self,
                _phase: UpdatePhase,
                _path: AttributePath,
                _value: &AttrValue,
            ) -> Result<(), PlatformError> {
                Ok(())
            }

            fn on_identify(&self, _endpoint_id: EndpointId, _event: IdentifyEvent) {}
        }

        let platform = Arc::new(SimulatedPlatform::default());
        platform.create_node(Arc::new(NoEvents)).unwrap();
        let ep = platform
            .create_window_covering_endpoint(&WindowCoveringConfig::default())
            .unwrap();
        (platform, ep)
    }

    #[test]
    fn test_position_updates_both_attributes() {
        let (platform, ep) = platform_with_endpoint();
        let reporter = StateReporter::new(platform.clone(), ep, None);

        reporter.report_position(4250);

        assert_eq!(
            platform.read_attribute(&AttributePath::window_covering(
                ep,
                WindowCoveringAttribute::CurrentPositionLiftPercent100ths
            )),
            Some(AttrValue::NullableU16(Some(4250)))
        );
        assert_eq!(
            platform.read_attribute(&AttributePath::window_covering(
                ep,
                WindowCoveringAttribute::CurrentPositionLiftPercentage
            )),
            Some(AttrValue::NullableU8(Some(42)))
        );
    }

    #[test]
    fn test_position_is_clamped() {
        let (platform, ep) = platform_with_endpoint();
        let reporter = StateReporter::new(platform.clone(), ep, None);

        reporter.report_position(12_000);

        assert_eq!(
            platform.read_attribute(&AttributePath::window_covering(
                ep,
                WindowCoveringAttribute::CurrentPositionLiftPercent100ths
            )),
            Some(AttrValue::NullableU16(Some(10_000)))
        );
    }

    #[test]
    fn test_failures_reach_observer_only() {
        let (platform, _) = platform_with_endpoint();
        let log = Arc::new(FailureLog::default());
        // Endpoint 9 has no WindowCovering cluster.
        let reporter = StateReporter::new(platform, 9, Some(log.clone()));

        reporter.report_position(100);
        reporter.report_operational_status(OperationalStatus::MOVING);

        assert_eq!(log.0.lock().len(), 3);
    }
}
