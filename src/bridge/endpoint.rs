//! The bridged window-covering endpoint.
//!
//! Holds the endpoint id the node assigned and the descriptive strings
//! published on the root endpoint's BasicInformation cluster.

use log::{info, warn};

use crate::matter::attribute_store::{AttrValue, AttributePath};
use crate::matter::ids::{BasicInformationAttribute, ClusterId, EndpointId, WindowCoveringAttribute};
use crate::matter::platform::{MatterPlatform, PlatformError, WindowCoveringConfig};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VentEndpoint {
    id: EndpointId,
    vendor_name: String,
    product_name: String,
}

impl VentEndpoint {
    /// Create the window-covering endpoint (rollershade, stopped, mode 0).
    pub fn create<P: MatterPlatform + ?Sized>(
        platform: &P,
        vendor_name: &str,
        product_name: &str,
    ) -> Result<Self, PlatformError> {
        let id = platform.create_window_covering_endpoint(&WindowCoveringConfig::default())?;
        info!("[Endpoint] Window covering endpoint {} created", id);
        Ok(Self {
            id,
            vendor_name: vendor_name.to_string(),
            product_name: product_name.to_string(),
        })
    }

    pub fn id(&self) -> EndpointId {
        self.id
    }

    pub fn vendor_name(&self) -> &str {
        &self.vendor_name
    }

    pub fn product_name(&self) -> &str {
        &self.product_name
    }

    pub fn attribute(&self, attr: WindowCoveringAttribute) -> AttributePath {
        AttributePath::window_covering(self.id, attr)
    }

    /// Write VendorName and ProductName to the root endpoint. A missing
    /// BasicInformation cluster or a rejected write is logged and skipped.
    pub fn publish_names<P: MatterPlatform + ?Sized>(&self, platform: &P) {
        let root = platform.root_endpoint();
        if !platform.has_cluster(root, ClusterId::BasicInformation) {
            warn!(
                "[Endpoint] BasicInformation cluster missing on endpoint {}, skipping vendor/product names",
                root
            );
            return;
        }

        let names = [
            (BasicInformationAttribute::VendorName, &self.vendor_name),
            (BasicInformationAttribute::ProductName, &self.product_name),
        ];
        for (attr, name) in names {
            let path = AttributePath::basic_information(root, attr);
            if let Err(e) = platform.update_attribute(path, AttrValue::CharString(name.clone())) {
                warn!("[Endpoint] Failed to set {:?}: {}", attr, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::matter::platform::{IdentifyEvent, PlatformEvents, UpdatePhase};
    use crate::matter::simulated::SimulatedPlatform;

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

        fn on_identify(&self, _endpoint_id: u16, _event: IdentifyEvent) {}
    }

    fn platform_with_node(platform: SimulatedPlatform) -> SimulatedPlatform {
        platform.create_node(Arc::new(NoEvents)).unwrap();
        platform
    }

    #[test]
    fn test_create_assigns_non_root_endpoint() {
        let platform = platform_with_node(SimulatedPlatform::default());
        let endpoint = VentEndpoint::create(&platform, "SmartVent", "Smart HVAC Vent").unwrap();

        assert_ne!(endpoint.id(), platform.root_endpoint());
        assert_eq!(
            endpoint.attribute(WindowCoveringAttribute::OperationalStatus),
            AttributePath::window_covering(endpoint.id(), WindowCoveringAttribute::OperationalStatus)
        );
        assert_eq!(
            platform.read_attribute(&endpoint.attribute(WindowCoveringAttribute::Mode)),
            Some(AttrValue::U8(0))
        );
    }

    #[test]
    fn test_create_without_node_fails() {
        let platform = SimulatedPlatform::default();
        assert_eq!(
            VentEndpoint::create(&platform, "a", "b"),
            Err(PlatformError::NotReady)
        );
    }

    #[test]
    fn test_publish_names() {
        let platform = platform_with_node(SimulatedPlatform::default());
        let endpoint = VentEndpoint::create(&platform, "Acme", "Bedroom Vent").unwrap();
        endpoint.publish_names(&platform);

        let read = |attr| {
            platform
                .read_attribute(&AttributePath::basic_information(0, attr))
                .unwrap()
        };
        assert_eq!(read(BasicInformationAttribute::VendorName).as_str(), Some("Acme"));
        assert_eq!(
            read(BasicInformationAttribute::ProductName).as_str(),
            Some("Bedroom Vent")
        );
    }

    #[test]
    fn test_publish_names_without_basic_information() {
        let commissioning = SimulatedPlatform::default().commissioning_data().unwrap();
        let platform = platform_with_node(SimulatedPlatform::without_basic_information(commissioning));
        let endpoint = VentEndpoint::create(&platform, "Acme", "Vent").unwrap();

        endpoint.publish_names(&platform);
        assert!(
            platform
                .read_attribute(&AttributePath::basic_information(
                    0,
                    BasicInformationAttribute::VendorName
                ))
                .is_none()
        );
    }
}
