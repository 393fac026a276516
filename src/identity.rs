//! Hardware identity of the vent.
//!
//! The 12-bit commissioning discriminator is derived from the lower bits of the
//! device's EUI-64, so two vents of the same product advertise different values.

use std::fmt;
use std::str::FromStr;

use nix::ifaddrs::getifaddrs;
use nix::sys::socket::{AddressFamily, SockaddrLike};

use crate::commissioning::MAX_DISCRIMINATOR;
use crate::error::{BridgeError, Result};

/// IEEE EUI-64 hardware identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Eui64(pub [u8; 8]);

impl Eui64 {
    /// Expand a MAC-48 into a EUI-64 by inserting `FF:FE` in the middle.
    pub fn from_mac48(mac: [u8; 6]) -> Self {
        Self([mac[0], mac[1], mac[2], 0xFF, 0xFE, mac[3], mac[4], mac[5]])
    }

    pub fn as_bytes(&self) -> &[u8; 8] {
        &self.0
    }

    /// Lower 12 bits of the identifier.
    pub fn discriminator(&self) -> u16 {
        u16::from_be_bytes([self.0[6], self.0[7]]) & MAX_DISCRIMINATOR
    }
}

impl fmt::Display for Eui64 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, byte) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(":")?;
            }
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl FromStr for Eui64 {
    type Err = BridgeError;

    /// Accepts `aa:bb:cc:dd:ee:ff:00:11`, `aa-bb-..` or 16 bare hex digits.
    /// A 6-byte MAC is expanded to EUI-64.
    fn from_str(s: &str) -> Result<Self> {
        let hex: String = s
            .chars()
            .filter(|c| !matches!(c, ':' | '-'))
            .collect();
        if hex.len() % 2 != 0 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(BridgeError::InvalidIdentity(s.to_string()));
        }

        let bytes: Vec<u8> = (0..hex.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&hex[i..i + 2], 16))
            .collect::<std::result::Result<_, _>>()
            .map_err(|_| BridgeError::InvalidIdentity(s.to_string()))?;

        match bytes.len() {
            8 => {
                let mut eui = [0u8; 8];
                eui.copy_from_slice(&bytes);
                Ok(Self(eui))
            }
            6 => {
                let mut mac = [0u8; 6];
                mac.copy_from_slice(&bytes);
                Ok(Self::from_mac48(mac))
            }
            _ => Err(BridgeError::InvalidIdentity(s.to_string())),
        }
    }
}

/// Source of the device's hardware identity.
pub trait HardwareIdentity: Send + Sync {
    fn eui64(&self) -> Result<Eui64>;
}

/// Identity fixed at construction (configuration override, tests).
#[derive(Debug, Clone, Copy)]
pub struct FixedIdentity(pub Eui64);

impl HardwareIdentity for FixedIdentity {
    fn eui64(&self) -> Result<Eui64> {
        Ok(self.0)
    }
}

/// Identity read from the link-layer address of a network interface.
#[derive(Debug, Clone)]
pub struct InterfaceIdentity {
    interface_name: String,
}

impl InterfaceIdentity {
    pub fn new(interface_name: impl Into<String>) -> Self {
        Self {
            interface_name: interface_name.into(),
        }
    }
}

impl HardwareIdentity for InterfaceIdentity {
    fn eui64(&self) -> Result<Eui64> {
        let addrs = getifaddrs().map_err(|e| {
            BridgeError::InvalidIdentity(format!("failed to list interfaces: {}", e))
        })?;

        for ifaddr in addrs {
            if ifaddr.interface_name != self.interface_name {
                continue;
            }
            if let Some(addr) = ifaddr.address
                && addr.family() == Some(AddressFamily::Packet)
                && let Some(link_addr) = addr.as_link_addr()
                && let Some(mac) = link_addr.addr()
            {
                return Ok(Eui64::from_mac48(mac));
            }
        }

        Err(BridgeError::InvalidIdentity(format!(
            "no hardware address on interface '{}'",
            self.interface_name
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discriminator_takes_low_12_bits() {
        let eui = Eui64([0x60, 0x55, 0xf9, 0xff, 0xfe, 0x12, 0x3a, 0xbc]);
        assert_eq!(eui.discriminator(), 0xABC);
    }

    #[test]
    fn test_discriminator_is_deterministic_and_bounded() {
        for seed in 0u16..=512 {
            let [hi, lo] = seed.wrapping_mul(131).to_be_bytes();
            let eui = Eui64([1, 2, 3, 4, 5, 6, hi, lo]);
            let d = eui.discriminator();
            assert!(d <= 4095);
            assert_eq!(d, eui.discriminator());
        }
        assert_eq!(Eui64([0xff; 8]).discriminator(), 4095);
        assert_eq!(Eui64([0; 8]).discriminator(), 0);
    }

    #[test]
    fn test_from_mac48_inserts_fffe() {
        let eui = Eui64::from_mac48([0x60, 0x55, 0xf9, 0x12, 0x34, 0x56]);
        assert_eq!(eui.0, [0x60, 0x55, 0xf9, 0xff, 0xfe, 0x12, 0x34, 0x56]);
    }

    #[test]
    fn test_parse_colon_separated() {
        let eui: Eui64 = "60:55:f9:ff:fe:12:34:56".parse().unwrap();
        assert_eq!(eui.to_string(), "60:55:f9:ff:fe:12:34:56");
    }

    #[test]
    fn test_parse_mac48_expands() {
        let eui: Eui64 = "60-55-F9-12-34-56".parse().unwrap();
        assert_eq!(eui, Eui64::from_mac48([0x60, 0x55, 0xf9, 0x12, 0x34, 0x56]));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("zz:00".parse::<Eui64>().is_err());
        assert!("0102030405".parse::<Eui64>().is_err());
        assert!("abc".parse::<Eui64>().is_err());
    }

    #[test]
    fn test_fixed_identity() {
        let identity = FixedIdentity(Eui64([0; 8]));
        assert_eq!(identity.eui64().unwrap(), Eui64([0; 8]));
    }
}
