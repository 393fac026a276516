//! Matter identifiers used by the vent bridge.
//!
//! Numeric values are protocol constants and must match the Matter
//! specification exactly.

use strum::FromRepr;

/// Matter endpoint identifier.
pub type EndpointId = u16;

/// Root (administrative) endpoint.
pub const ROOT_ENDPOINT_ID: EndpointId = 0;

/// Cluster identifiers.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, FromRepr)]
#[repr(u32)]
pub enum ClusterId {
    Identify = 0x0003,
    Descriptor = 0x001D,
    BasicInformation = 0x0028,
    WindowCovering = 0x0102,
}

/// WindowCovering cluster (0x0102) attribute identifiers.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, FromRepr)]
#[repr(u32)]
pub enum WindowCoveringAttribute {
    Type = 0x0000,
    ConfigStatus = 0x0007,
    CurrentPositionLiftPercentage = 0x0008,
    OperationalStatus = 0x000A,
    TargetPositionLiftPercent100ths = 0x000B,
    EndProductType = 0x000D,
    CurrentPositionLiftPercent100ths = 0x000E,
    Mode = 0x0017,
}

/// WindowCovering cluster command identifiers.
#[derive(Clone, Copy, Debug, Eq, PartialEq, FromRepr)]
#[repr(u32)]
pub enum WindowCoveringCommand {
    UpOrOpen = 0x00,
    DownOrClose = 0x01,
    StopMotion = 0x02,
    GoToLiftPercentage = 0x05,
}

/// BasicInformation cluster (0x0028) attribute identifiers.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, FromRepr)]
#[repr(u32)]
pub enum BasicInformationAttribute {
    VendorName = 0x0001,
    VendorId = 0x0002,
    ProductName = 0x0003,
    ProductId = 0x0004,
}

/// Identify cluster (0x0003) attribute identifiers.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, FromRepr)]
#[repr(u32)]
pub enum IdentifyAttribute {
    IdentifyTime = 0x0000,
    IdentifyType = 0x0001,
}

/// Identify cluster command identifiers.
#[derive(Clone, Copy, Debug, Eq, PartialEq, FromRepr)]
#[repr(u32)]
pub enum IdentifyCommand {
    Identify = 0x00,
    TriggerEffect = 0x40,
}

/// IdentifyType attribute values.
#[derive(Clone, Copy, Debug, Eq, PartialEq, FromRepr)]
#[repr(u8)]
pub enum IdentifyType {
    None = 0x00,
    LightOutput = 0x01,
    VisibleIndicator = 0x02,
    AudibleBeep = 0x03,
    Display = 0x04,
    Actuator = 0x05,
}

/// WindowCovering `Type` / `EndProductType` values used by this device.
#[derive(Clone, Copy, Debug, Eq, PartialEq, FromRepr)]
#[repr(u8)]
pub enum CoveringType {
    Rollershade = 0x00,
}

/// Movement state derived from the OperationalStatus byte.
///
/// Zero means stopped, any other value means moving.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum OperationalStatus {
    Stopped,
    Moving,
}

impl OperationalStatus {
    /// Byte reported when stopped.
    pub const STOPPED: u8 = 0x00;
    /// Byte reported while moving (global movement bits = opening).
    pub const MOVING: u8 = 0x01;

    pub fn from_byte(status: u8) -> Self {
        if status == Self::STOPPED {
            OperationalStatus::Stopped
        } else {
            OperationalStatus::Moving
        }
    }

    pub fn as_byte(self) -> u8 {
        match self {
            OperationalStatus::Stopped => Self::STOPPED,
            OperationalStatus::Moving => Self::MOVING,
        }
    }

    pub fn is_moving(self) -> bool {
        self == OperationalStatus::Moving
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cluster_ids_match_protocol_values() {
        assert_eq!(ClusterId::WindowCovering as u32, 0x0102);
        assert_eq!(ClusterId::BasicInformation as u32, 0x0028);
        assert_eq!(ClusterId::Identify as u32, 0x0003);
        assert_eq!(ClusterId::from_repr(0x0102), Some(ClusterId::WindowCovering));
        assert_eq!(ClusterId::from_repr(0x0006), None);
    }

    #[test]
    fn test_window_covering_attribute_ids() {
        assert_eq!(
            WindowCoveringAttribute::TargetPositionLiftPercent100ths as u32,
            0x000B
        );
        assert_eq!(
            WindowCoveringAttribute::CurrentPositionLiftPercent100ths as u32,
            0x000E
        );
        assert_eq!(WindowCoveringAttribute::OperationalStatus as u32, 0x000A);
        assert_eq!(WindowCoveringAttribute::from_repr(0x0042), None);
    }

    #[test]
    fn test_operational_status_non_zero_is_moving() {
        assert_eq!(OperationalStatus::from_byte(0), OperationalStatus::Stopped);
        for byte in [1u8, 2, 5, 0xFF] {
            assert!(OperationalStatus::from_byte(byte).is_moving());
        }
        assert_eq!(OperationalStatus::Moving.as_byte(), 1);
        assert_eq!(OperationalStatus::Stopped.as_byte(), 0);
    }
}
