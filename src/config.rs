use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::matter::platform::RadioConfig;
use crate::matter::units::ANGLE_CLOSED;

/// Load environment variables from .env file with robust parsing.
/// Handles values with spaces without requiring quotes.
pub fn load_dotenv() {
    load_dotenv_from(Path::new(".env"));
}

fn load_dotenv_from(env_path: &Path) {
    let Ok(content) = fs::read_to_string(env_path) else {
        return;
    };

    for (key, value) in parse_dotenv(&content) {
        // Env vars already set take precedence
        if std::env::var(key).is_err() {
            // SAFETY: called from main before the runtime spawns any threads
            unsafe { std::env::set_var(key, value) };
        }
    }
}

/// Split `.env` content into key/value pairs. Comments and blank lines are
/// skipped and surrounding quotes are removed.
fn parse_dotenv(content: &str) -> Vec<(&str, &str)> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let (key, value) = line.split_once('=')?;
            let mut value = value.trim();
            if value.len() >= 2
                && ((value.starts_with('"') && value.ends_with('"'))
                    || (value.starts_with('\'') && value.ends_with('\'')))
            {
                value = &value[1..value.len() - 1];
            }
            Some((key.trim(), value))
        })
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub matter: MatterConfig,
    pub radio: RadioConfig,
    pub actuator: ActuatorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatterConfig {
    pub vendor_name: String,
    pub product_name: String,
    pub vendor_id: u16,
    pub product_id: u16,
    pub passcode: u32,
    /// Network interface to bind; auto-detected when unset.
    pub interface: Option<String>,
    /// Hardware identity override (`aa:bb:..`); read from the interface when unset.
    pub eui64: Option<String>,
}

impl Default for MatterConfig {
    fn default() -> Self {
        Self {
            vendor_name: "SmartVent".to_string(),
            product_name: "Smart HVAC Vent".to_string(),
            vendor_id: 0xFFF1,
            product_id: 0x8001,
            passcode: 20202021,
            interface: None,
            eui64: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActuatorConfig {
    pub step_delay_ms: u64,
    pub initial_angle: u8,
}

impl Default for ActuatorConfig {
    fn default() -> Self {
        Self {
            step_delay_ms: 15,
            initial_angle: ANGLE_CLOSED,
        }
    }
}

/// Parse a u16 given as decimal or `0x` hex.
fn parse_u16(value: &str) -> Option<u16> {
    match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16).ok(),
        None => value.parse().ok(),
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(name) = var("VENT_VENDOR_NAME") {
            config.matter.vendor_name = name;
        }
        if let Some(name) = var("VENT_PRODUCT_NAME") {
            config.matter.product_name = name;
        }
        if let Some(vid) = var("MATTER_VENDOR_ID")
            && let Some(v) = parse_u16(&vid)
        {
            config.matter.vendor_id = v;
        }
        if let Some(pid) = var("MATTER_PRODUCT_ID")
            && let Some(p) = parse_u16(&pid)
        {
            config.matter.product_id = p;
        }
        if let Some(passcode) = var("MATTER_PASSCODE")
            && let Ok(p) = passcode.parse()
        {
            config.matter.passcode = p;
        }
        if let Some(interface) = var("MATTER_INTERFACE") {
            config.matter.interface = Some(interface);
        }
        if let Some(eui64) = var("VENT_EUI64") {
            config.matter.eui64 = Some(eui64);
        }

        // Radio
        if let Some(depth) = var("VENT_RADIO_QUEUE_DEPTH")
            && let Ok(d) = depth.parse()
        {
            config.radio.radio_queue_depth = d;
        }
        if let Some(depth) = var("VENT_TASK_QUEUE_DEPTH")
            && let Ok(d) = depth.parse()
        {
            config.radio.task_queue_depth = d;
        }

        // Actuator
        if let Some(delay) = var("VENT_STEP_DELAY_MS")
            && let Ok(d) = delay.parse()
        {
            config.actuator.step_delay_ms = d;
        }
        if let Some(angle) = var("VENT_INITIAL_ANGLE")
            && let Ok(a) = angle.parse()
        {
            config.actuator.initial_angle = a;
        }

        config
    }
}
