//! Commissioning facade.
//!
//! Answers "is this vent paired?" and produces the onboarding strings from
//! live platform state on every call. Nothing is cached.

use log::{debug, warn};
use serde::Serialize;

use crate::commissioning::{SetupPayload, clear_c_string, write_c_string};
use crate::error::{BridgeError, Result};
use crate::matter::platform::MatterPlatform;

/// Summary of the device's onboarding state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PairingInfo {
    pub discriminator: u16,
    pub vendor_id: u16,
    pub product_id: u16,
    pub manual_pairing_code: String,
    pub qr_payload: String,
    pub commissioned: bool,
}

/// Borrowed view over a platform plus the device discriminator.
pub struct CommissioningFacade<'a, P: MatterPlatform + ?Sized> {
    platform: &'a P,
    discriminator: u16,
}

impl<'a, P: MatterPlatform + ?Sized> CommissioningFacade<'a, P> {
    pub fn new(platform: &'a P, discriminator: u16) -> Self {
        Self {
            platform,
            discriminator,
        }
    }

    /// True iff the node belongs to at least one fabric right now.
    pub fn is_commissioned(&self) -> bool {
        self.platform.fabric_count() > 0
    }

    fn setup_payload(&self) -> Result<SetupPayload> {
        let data = self
            .platform
            .commissioning_data()
            .map_err(BridgeError::CommissioningUnavailable)?;
        Ok(SetupPayload {
            vendor_id: data.vendor_id,
            product_id: data.product_id,
            discriminator: self.discriminator,
            passcode: data.passcode,
        })
    }

    pub fn pairing_code_string(&self) -> Result<String> {
        Ok(self.setup_payload()?.manual_pairing_code()?)
    }

    pub fn qr_payload_string(&self) -> Result<String> {
        Ok(self.setup_payload()?.qr_code_text()?)
    }

    /// Write the manual pairing code into `buf` as a NUL-terminated string.
    ///
    /// Returns the number of characters written. A too-small buffer truncates
    /// and still succeeds; on failure a non-empty buffer holds `""`.
    pub fn pairing_code(&self, buf: &mut [u8]) -> Result<usize> {
        Self::fill(buf, "pairing code", || self.pairing_code_string())
    }

    /// Write the `MT:` QR payload into `buf`, same contract as
    /// [`Self::pairing_code`].
    pub fn qr_payload(&self, buf: &mut [u8]) -> Result<usize> {
        Self::fill(buf, "QR payload", || self.qr_payload_string())
    }

    pub fn pairing_info(&self) -> Result<PairingInfo> {
        let payload = self.setup_payload()?;
        Ok(PairingInfo {
            discriminator: payload.discriminator,
            vendor_id: payload.vendor_id,
            product_id: payload.product_id,
            manual_pairing_code: payload.manual_pairing_code()?,
            qr_payload: payload.qr_code_text()?,
            commissioned: self.is_commissioned(),
        })
    }

    fn fill(
        buf: &mut [u8],
        what: &str,
        generate: impl FnOnce() -> Result<String>,
    ) -> Result<usize> {
        if buf.is_empty() {
            return Err(BridgeError::EmptyBuffer);
        }

        match generate() {
            Ok(text) => {
                let written = write_c_string(&text, buf).ok_or(BridgeError::EmptyBuffer)?;
                if written < text.len() {
                    debug!(
                        "[Commissioning] {} truncated to {} of {} characters",
                        what,
                        written,
                        text.len()
                    );
                }
                Ok(written)
            }
            Err(e) => {
                warn!("[Commissioning] Failed to generate {}: {}", what, e);
                clear_c_string(buf);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matter::simulated::{SimulatedFailures, SimulatedPlatform};

    #[test]
    fn test_pairing_code_into_buffer() {
        let platform = SimulatedPlatform::default();
        let facade = CommissioningFacade::new(&platform, 3840);
        let mut buf = [0xAAu8; 32];

        let len = facade.pairing_code(&mut buf).unwrap();
        assert_eq!(len, 11);
        assert_eq!(&buf[..12], b"34970112332\0");
    }

    #[test]
    fn test_qr_payload_into_buffer() {
        let platform = SimulatedPlatform::default();
        let facade = CommissioningFacade::new(&platform, 3840);
        let mut buf = [0u8; 64];

        let len = facade.qr_payload(&mut buf).unwrap();
        assert_eq!(&buf[..len], b"MT:-24J042C00KA0648G00");
        assert_eq!(buf[len], 0);
    }

    #[test]
    fn test_zero_length_buffer() {
        let platform = SimulatedPlatform::default();
        let facade = CommissioningFacade::new(&platform, 3840);
        let mut buf: [u8; 0] = [];

        assert!(matches!(
            facade.pairing_code(&mut buf),
            Err(BridgeError::EmptyBuffer)
        ));
        assert!(matches!(
            facade.qr_payload(&mut buf),
            Err(BridgeError::EmptyBuffer)
        ));
    }

    #[test]
    fn test_truncation_is_success() {
        let platform = SimulatedPlatform::default();
        let facade = CommissioningFacade::new(&platform, 3840);
        let mut buf = [0xAAu8; 6];

        assert_eq!(facade.pairing_code(&mut buf).unwrap(), 5);
        assert_eq!(&buf, b"34970\0");
    }

    #[test]
    fn test_data_failure_clears_buffer() {
        let platform = SimulatedPlatform::default();
        platform.set_failures(SimulatedFailures {
            commissioning_data: true,
            ..Default::default()
        });
        let facade = CommissioningFacade::new(&platform, 3840);
        let mut buf = [0xAAu8; 16];

        assert!(matches!(
            facade.qr_payload(&mut buf),
            Err(BridgeError::CommissioningUnavailable(_))
        ));
        assert_eq!(buf[0], 0);
    }

    #[test]
    fn test_invalid_discriminator_fails_generation() {
        let platform = SimulatedPlatform::default();
        let facade = CommissioningFacade::new(&platform, 0x1000);
        let mut buf = [0xAAu8; 16];

        assert!(matches!(
            facade.pairing_code(&mut buf),
            Err(BridgeError::Payload(_))
        ));
        assert_eq!(buf[0], 0);
    }

    #[test]
    fn test_commissioned_tracks_fabrics() {
        let platform = SimulatedPlatform::default();
        let facade = CommissioningFacade::new(&platform, 3840);
        assert!(!facade.is_commissioned());
        platform.add_fabric();
        assert!(facade.is_commissioned());
        platform.remove_fabric();
        assert!(!facade.is_commissioned());
    }

    #[test]
    fn test_pairing_info() {
        let platform = SimulatedPlatform::default();
        let info = CommissioningFacade::new(&platform, 3840)
            .pairing_info()
            .unwrap();
        assert_eq!(info.manual_pairing_code, "34970112332");
        assert_eq!(info.qr_payload, "MT:-24J042C00KA0648G00");
        assert!(!info.commissioned);

        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["discriminator"], 3840);
    }
}
