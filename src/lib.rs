//! Vent Matter Bridge library.
//!
//! Exposes a motorized HVAC vent to Matter controllers as a window covering:
//! controller target writes become actuator commands, and actuator position and
//! movement are published back as WindowCovering attributes.

#![recursion_limit = "256"]

pub mod actuator;
pub mod bridge;
pub mod commissioning;
pub mod config;
pub mod error;
pub mod identity;
pub mod matter;
