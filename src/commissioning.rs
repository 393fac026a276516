//! Commissioning payloads.
//!
//! Builds the two onboarding artifacts a Matter controller accepts:
//! - the 11-digit manual pairing code (typed by a human)
//! - the `MT:` QR payload (scanned by a phone)
//!
//! Encoding is done by rs-matter's pairing module. Both are derived on demand
//! from a [`SetupPayload`]; nothing here caches.

use rs_matter::BasicCommData;
use rs_matter::dm::clusters::basic_info::BasicInfoConfig;
use rs_matter::pairing::DiscoveryCapabilities;
use rs_matter::pairing::qr::{CommFlowType, NoOptionalData, QrPayload, no_optional_data};
use thiserror::Error;

/// Largest valid 12-bit discriminator.
pub const MAX_DISCRIMINATOR: u16 = 0x0FFF;

/// Largest valid setup passcode.
pub const MAX_PASSCODE: u32 = 99_999_998;

/// Rendezvous advertised in every payload. The vent is commissioned over BLE.
pub const RENDEZVOUS: DiscoveryCapabilities = DiscoveryCapabilities::BLE;

/// Scratch space for rendering the QR text.
const QR_BUF_LEN: usize = 256;

/// Passcodes rejected by controllers because they are trivially guessable.
const INVALID_PASSCODES: [u32; 12] = [
    0, 11_111_111, 22_222_222, 33_333_333, 44_444_444, 55_555_555, 66_666_666, 77_777_777,
    88_888_888, 99_999_999, 12_345_678, 87_654_321,
];

/// Errors produced while encoding commissioning payloads.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PayloadError {
    #[error("discriminator {0:#x} does not fit in 12 bits")]
    InvalidDiscriminator(u16),

    #[error("setup passcode {0} is not allowed")]
    InvalidPasscode(u32),

    #[error("failed to encode payload: {0}")]
    Encoding(String),
}

/// Everything needed to derive the onboarding payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetupPayload {
    pub vendor_id: u16,
    pub product_id: u16,
    pub discriminator: u16,
    pub passcode: u32,
}

impl SetupPayload {
    /// Validate discriminator and passcode ranges.
    pub fn validate(&self) -> Result<(), PayloadError> {
        if self.discriminator > MAX_DISCRIMINATOR {
            return Err(PayloadError::InvalidDiscriminator(self.discriminator));
        }
        if self.passcode > MAX_PASSCODE || INVALID_PASSCODES.contains(&self.passcode) {
            return Err(PayloadError::InvalidPasscode(self.passcode));
        }
        Ok(())
    }

    fn comm_data(&self) -> BasicCommData {
        BasicCommData {
            password: self.passcode,
            discriminator: self.discriminator,
        }
    }

    /// Manual pairing code as 11 plain digits.
    pub fn manual_pairing_code(&self) -> Result<String, PayloadError> {
        self.validate()?;

        // rs-matter groups the digits for display; controllers accept either form
        let pretty = self.comm_data().compute_pretty_pairing_code().to_string();
        Ok(pretty.chars().filter(char::is_ascii_digit).collect())
    }

    /// `MT:` QR payload text for a standard commissioning flow.
    pub fn qr_code_text(&self) -> Result<String, PayloadError> {
        self.validate()?;

        let dev_det = BasicInfoConfig {
            vid: self.vendor_id,
            pid: self.product_id,
            ..BasicInfoConfig::new()
        };
        let payload: QrPayload<'_, NoOptionalData> = QrPayload::new_from_basic_info(
            RENDEZVOUS,
            CommFlowType::Standard,
            self.comm_data(),
            &dev_det,
            no_optional_data as _,
        );

        let mut buf = [0u8; QR_BUF_LEN];
        let (text, _) = payload
            .as_str(&mut buf)
            .map_err(|e| PayloadError::Encoding(e.to_string()))?;
        Ok(text.to_string())
    }
}

/// Copy `src` into a caller-allocated buffer as a NUL-terminated string.
///
/// Copies at most `buf.len() - 1` bytes and always terminates. Returns the
/// number of bytes copied (excluding the terminator), or `None` when the buffer
/// has no room even for the terminator.
pub fn write_c_string(src: &str, buf: &mut [u8]) -> Option<usize> {
    let capacity = buf.len().checked_sub(1)?;
    let len = src.len().min(capacity);
    buf[..len].copy_from_slice(&src.as_bytes()[..len]);
    buf[len] = 0;
    Some(len)
}

/// Clear a caller buffer to the empty C string (no-op on a zero-length buffer).
pub fn clear_c_string(buf: &mut [u8]) {
    if let Some(first) = buf.first_mut() {
        *first = 0;
    }
}
