//! Configuration data structures and TOML parsing.
//!
//! The config file uses TOML format. Example:
//!
//! ```toml
//! [global]
//! log_level = "info"
//!
//! [global.thresholds]
//! bounce_interval_ms = 15
//! multi_click_interval_ms = 300
//! long_click_duration_ms = 750
//! long_press_interval_ms = 500
//! long_press_repeat = true
//! rate_limit_ms = 10
//! post_drag_rate_limit_ms = 500
//! drag_enabled = false
//! drag_threshold_px = 20
//! drag_interval_px = 10
//! drag_threshold_ms = 200
//! drag_interval_ms = 100
//!
//! [global.actions.clicked]
//! action = "xdotool click 1"
//! enabled = true
//!
//! [device.panel]
//! device_usb_id = "1234:5678"
//! enabled = true
//! rotation = 1
//! display_width = 240
//! display_height = 320
//!
//! [device.panel.actions.long_clicked]
//! action = "xdotool key Menu"
//! enabled = true
//!
//! [device.panel.thresholds]
//! bounce_interval_ms = 35
//! ```
//!
//! Every threshold is optional: a missing field falls back to the device's
//! global value and finally to the built-in default, so a bare `[device.x]`
//! section with just a USB id is a valid configuration.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde::Deserialize;
use thiserror::Error;

use crate::event::EventKind;

/// Top-level error type used throughout the crate.
#[derive(Debug, Error)]
pub enum TapkitError {
    #[error("Failed to read config file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ConfigParse { path: PathBuf, message: String },
}

/// Root of the TOML config file.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RawConfig {
    global: RawGlobal,
    #[serde(default)]
    device: HashMap<String, RawDevice>,
}

/// The `[global]` section.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RawGlobal {
    log_level: Option<String>,
    log_file: Option<String>,
    #[serde(default)]
    thresholds: RawThresholds,
    #[serde(default)]
    actions: HashMap<String, RawActionConfig>,
}

/// Threshold values - all optional so device sections can partially
/// override and anything left unset falls back to the defaults.
#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
struct RawThresholds {
    bounce_interval_ms: Option<u16>,
    multi_click_interval_ms: Option<u16>,
    long_click_duration_ms: Option<u16>,
    long_press_interval_ms: Option<u16>,
    long_press_repeat: Option<bool>,
    rate_limit_ms: Option<u16>,
    post_drag_rate_limit_ms: Option<u16>,
    drag_enabled: Option<bool>,
    drag_threshold_px: Option<u16>,
    drag_interval_px: Option<u16>,
    drag_threshold_ms: Option<u16>,
    drag_interval_ms: Option<u16>,
}

/// An action entry (shell command + enabled).
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
struct RawActionConfig {
    action: Option<String>,
    enabled: Option<bool>,
}

/// A `[device.<id>]` section.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RawDevice {
    device_usb_id: Option<String>,
    enabled: Option<bool>,
    rotation: Option<u8>,
    display_width: Option<u16>,
    display_height: Option<u16>,
    #[serde(default)]
    thresholds: RawThresholds,
    #[serde(default)]
    actions: HashMap<String, RawActionConfig>,
}

/// Fully resolved gesture thresholds - every value present.
///
/// `Default` yields the built-in values documented on each field.
#[derive(Debug, Clone, PartialEq)]
pub struct Thresholds {
    /// Debounce window in ms (default 15).
    pub bounce_interval_ms: u16,
    /// Idle gap that finalises click classification, in ms (default 300).
    pub multi_click_interval_ms: u16,
    /// Press duration boundary between click and long-click, in ms
    /// (default 750).
    pub long_click_duration_ms: u16,
    /// Spacing of repeated long-press events, in ms (default 500).
    pub long_press_interval_ms: u16,
    /// Whether long-press repeats while held (default true).
    pub long_press_repeat: bool,
    /// Minimum spacing between processed ticks, in ms (default 10).
    pub rate_limit_ms: u16,
    /// Tick spacing applied right after a drag release, in ms
    /// (default 500).
    pub post_drag_rate_limit_ms: u16,
    /// Whether drag detection runs at all (default false).
    pub drag_enabled: bool,
    /// Pixel distance before the first drag event (default 20).
    pub drag_threshold_px: u16,
    /// Pixel distance before subsequent drag events (default 10).
    pub drag_interval_px: u16,
    /// Time before the first drag event, in ms (default 200).
    pub drag_threshold_ms: u16,
    /// Time between subsequent drag events, in ms (default 100).
    pub drag_interval_ms: u16,
}

/// Action configuration (shell command + enabled).
#[derive(Debug, Clone)]
pub struct ActionConfig {
    pub action: Option<String>,
    pub enabled: bool,
}

/// Configuration for a single touch device.
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    pub device_usb_id: String,
    pub rotation: u8,
    pub display_width: u16,
    pub display_height: u16,
    pub actions: HashMap<String, ActionConfig>,
    pub thresholds: Thresholds,
}

/// Top-level parsed configuration.
#[derive(Debug)]
pub struct AppConfig {
    pub log_level: String,
    pub log_file: Option<String>,
    pub devices: HashMap<String, DeviceConfig>,
}

/// Generate merge, resolve, and the defaults for threshold fields.
macro_rules! threshold_fields {
    ($($field:ident: $ty:ty = $default:expr),+ $(,)?) => {
        impl RawThresholds {
            fn merge_with_fallback(&self, fallback: &RawThresholds) -> RawThresholds {
                RawThresholds {
                    $($field: self.$field.or(fallback.$field),)+
                }
            }

            fn resolve(self) -> Thresholds {
                Thresholds {
                    $($field: self.$field.unwrap_or($default),)+
                }
            }
        }

        impl Default for Thresholds {
            fn default() -> Self {
                Thresholds {
                    $($field: $default,)+
                }
            }
        }
    };
}

threshold_fields!(
    bounce_interval_ms: u16 = 15,
    multi_click_interval_ms: u16 = 300,
    long_click_duration_ms: u16 = 750,
    long_press_interval_ms: u16 = 500,
    long_press_repeat: bool = true,
    rate_limit_ms: u16 = 10,
    post_drag_rate_limit_ms: u16 = 500,
    drag_enabled: bool = false,
    drag_threshold_px: u16 = 20,
    drag_interval_px: u16 = 10,
    drag_threshold_ms: u16 = 200,
    drag_interval_ms: u16 = 100,
);

/// Merge action maps: global first, then device-specific overrides.
fn merge_actions(
    global: &HashMap<String, RawActionConfig>,
    device: &HashMap<String, RawActionConfig>,
) -> HashMap<String, ActionConfig> {
    let mut merged = HashMap::new();

    // Insert all global + device action names, device values override.
    for (name, ac) in global.iter().chain(device.iter()) {
        if name.parse::<EventKind>().is_err() {
            warn!("Action entry '{name}' does not match any event name – it will never fire.");
        }
        let entry = merged.entry(name.clone()).or_insert(ActionConfig {
            action: None,
            enabled: false,
        });
        if ac.action.is_some() {
            entry.action.clone_from(&ac.action);
        }
        if let Some(enabled) = ac.enabled {
            entry.enabled = enabled;
        }
    }

    merged
}

/// Parse a TOML config file and return the fully resolved `AppConfig`.
pub fn parse_config_file(path: &Path) -> Result<AppConfig, TapkitError> {
    let raw: RawConfig =
        toml::from_str(&fs::read_to_string(path).map_err(|e| TapkitError::ConfigRead {
            path: path.to_path_buf(),
            source: e,
        })?)
        .map_err(|e| TapkitError::ConfigParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    let mut devices = HashMap::new();

    for (device_id, raw_dev) in &raw.device {
        if !raw_dev.enabled.unwrap_or(false) {
            debug!("Device '{device_id}' is not enabled – skipping.");
            continue;
        }

        let Some(usb_id) = raw_dev.device_usb_id.as_deref().filter(|s| !s.is_empty()) else {
            warn!(
                "Device '{device_id}' is enabled but has no device_usb_id – skipping. \
                 Run 'tapkit --list-devices' to find your USB ID.",
            );
            continue;
        };

        devices.insert(
            device_id.clone(),
            DeviceConfig {
                device_usb_id: usb_id.to_string(),
                rotation: raw_dev.rotation.unwrap_or(0) & 3,
                display_width: raw_dev.display_width.unwrap_or(240),
                display_height: raw_dev.display_height.unwrap_or(320),
                actions: merge_actions(&raw.global.actions, &raw_dev.actions),
                thresholds: raw_dev
                    .thresholds
                    .merge_with_fallback(&raw.global.thresholds)
                    .resolve(),
            },
        );
    }

    Ok(AppConfig {
        log_level: raw.global.log_level.unwrap_or_else(|| "info".to_string()),
        log_file: raw.global.log_file,
        devices,
    })
}
