//! Semantic touch events and pure helper functions - no I/O, no hardware.
//!
//! `EventKind` is what the gesture engine reports to its subscriber and
//! what the daemon's action table is keyed by. The helpers here resolve
//! configured actions and parse USB ids; everything is a plain function
//! with no side-effects.

use std::collections::HashMap;

use strum::{Display, EnumString, IntoStaticStr};

use crate::config::ActionConfig;

/// The events a gesture engine can report.
///
/// At most one of the primary transition events fires per processed tick;
/// the drag and long-press checks may each add one more.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr)]
pub enum EventKind {
    /// A debounced touch has begun.
    #[strum(serialize = "pressed")]
    Pressed,
    /// A debounced touch has ended without dragging.
    #[strum(serialize = "released")]
    Released,
    /// One press/release pair, settled after the multi-click interval.
    #[strum(serialize = "clicked")]
    Clicked,
    /// Two rapid press/release pairs.
    #[strum(serialize = "double_clicked")]
    DoubleClicked,
    /// Three or more rapid press/release pairs.
    #[strum(serialize = "multi_clicked")]
    MultiClicked,
    /// A click whose press phase outlasted the long-click duration or saw
    /// a long-press fire.
    #[strum(serialize = "long_clicked")]
    LongClicked,
    /// The touch has been held past the long-click duration; repeats at
    /// the long-press interval when repeat is enabled.
    #[strum(serialize = "long_press")]
    LongPress,
    /// The touch has moved past the drag thresholds.
    #[strum(serialize = "dragged")]
    Dragged,
    /// A drag ended. Fired instead of `Released`; no click follows.
    #[strum(serialize = "dragged_released")]
    DraggedReleased,
    /// The engine was disabled.
    #[strum(serialize = "disabled")]
    Disabled,
}

/// Look up the shell action configured for an event.
///
/// Returns `Some(action)` if the event is configured, enabled, and has an
/// action string.
pub fn resolve_action(kind: EventKind, actions: &HashMap<String, ActionConfig>) -> Option<&str> {
    let name: &str = kind.into();
    actions
        .get(name)
        .filter(|ac| ac.enabled)
        .and_then(|ac| ac.action.as_deref())
}

/// Parse a USB vendor:product ID string into `(vendor, product)`.
///
/// Accepts formats like `"1234:5678"` or `"USB:1234:5678"`
/// (case-insensitive). Returns `None` if the format is invalid or the hex
/// values cannot be parsed.
pub fn parse_usb_id(raw: &str) -> Option<(u16, u16)> {
    let cleaned = raw.to_lowercase().replace("usb:", "");
    let (vendor_str, product_str) = cleaned.split_once(':')?;
    let vendor = u16::from_str_radix(vendor_str, 16).ok()?;
    let product = u16::from_str_radix(product_str, 16).ok()?;
    Some((vendor, product))
}
