//! Device information for the Matter stack.
//!
//! rs-matter serves BasicInformation from a `BasicInfoConfig` that must live
//! for the whole process, so the strings are leaked once at stack start.

use rs_matter::dm::clusters::basic_info::BasicInfoConfig;

/// Identity advertised through BasicInformation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceDetails {
    pub vendor_id: u16,
    pub product_id: u16,
    pub vendor_name: String,
    pub product_name: String,
    pub serial_no: String,
}

impl DeviceDetails {
    /// Serial number derived from the commissioning discriminator.
    pub fn serial_for(discriminator: u16) -> String {
        format!("VENT-{:03X}", discriminator)
    }

    /// Device name shown by controllers (product name without spaces).
    pub fn device_name(&self) -> String {
        self.product_name.split_whitespace().collect()
    }

    /// Leak into a `'static` config. Call once per process.
    pub fn leak(&self) -> &'static BasicInfoConfig<'static> {
        let leak = |s: String| -> &'static str { Box::leak(s.into_boxed_str()) };

        let serial_no = leak(self.serial_no.clone());
        Box::leak(Box::new(BasicInfoConfig {
            vid: self.vendor_id,
            pid: self.product_id,
            hw_ver: 1,
            hw_ver_str: "1",
            sw_ver: 1,
            sw_ver_str: env!("CARGO_PKG_VERSION"),
            serial_no,
            unique_id: serial_no,
            device_name: leak(self.device_name()),
            product_name: leak(self.product_name.clone()),
            vendor_name: leak(self.vendor_name.clone()),
            ..BasicInfoConfig::new()
        }))
    }
}
