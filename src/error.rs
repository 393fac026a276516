use thiserror::Error as ThisError;

use crate::commissioning::PayloadError;
use crate::matter::platform::PlatformError;

#[derive(ThisError, Debug)]
pub enum BridgeError {
    #[error("Failed to initialize Matter node: {0}")]
    InitFailed(String),

    #[error("Failed to start Matter stack: {0}")]
    StartFailed(String),

    #[error("Bridge is already initialized")]
    AlreadyInitialized,

    #[error("Bridge is not initialized")]
    NotInitialized,

    #[error("Bridge is already started")]
    AlreadyStarted,

    #[error("Output buffer has zero length")]
    EmptyBuffer,

    #[error("Commissioning data unavailable: {0}")]
    CommissioningUnavailable(PlatformError),

    #[error("Invalid hardware identity: {0}")]
    InvalidIdentity(String),

    #[error(transparent)]
    Payload(#[from] PayloadError),

    #[error(transparent)]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    SerdeJsonError(#[from] serde_json::Error),
}

impl BridgeError {
    /// Non-zero status code for callers that work with return codes.
    pub fn status_code(&self) -> i32 {
        match self {
            BridgeError::InitFailed(_) => -1,
            BridgeError::StartFailed(_) => -2,
            BridgeError::AlreadyInitialized => -3,
            BridgeError::NotInitialized => -4,
            BridgeError::AlreadyStarted => -5,
            BridgeError::EmptyBuffer => -6,
            BridgeError::CommissioningUnavailable(_) => -7,
            BridgeError::InvalidIdentity(_) => -8,
            BridgeError::Payload(_) => -9,
            BridgeError::IoError(_) => -10,
            BridgeError::SerdeJsonError(_) => -11,
        }
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
