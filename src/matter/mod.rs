mod device_info;
mod netif;
mod stack;

pub mod attribute_store;
pub mod clusters;
pub mod device_types;
pub mod ids;
pub mod notifier;
pub mod platform;
pub mod simulated;
pub mod units;

pub use attribute_store::{AttrValue, AttributePath, AttributeStore};
pub use netif::detect_interface;
pub use platform::{MatterPlatform, PlatformError, PlatformEvents};
pub use simulated::SimulatedPlatform;
pub use stack::{RsMatterPlatform, WINDOW_COVERING_ENDPOINT_ID, default_persist_path};
