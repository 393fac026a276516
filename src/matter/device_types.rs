//! Device type definitions for the vent node.

use rs_matter::dm::DeviceType;

/// Matter Window Covering device type
///
/// Device Type ID: 0x0202 (514 decimal)
/// Device Type Revision: 2
///
/// Required clusters:
/// - WindowCovering (0x0102)
/// - Identify (0x0003)
/// - Descriptor (standard)
pub const DEV_TYPE_WINDOW_COVERING: DeviceType = DeviceType {
    dtype: 0x0202,
    drev: 2,
};
