//! Multi-device gesture manager and device discovery (I/O layer).
//!
//! The pure recognition logic lives in [`crate::engine`]; this module owns
//! the evdev handles. Each configured device gets its own thread running a
//! [`GestureEngine`] over an [`EvdevTouchSource`], which satisfies the
//! polled source contract by reading the device's absolute-axis state on
//! request rather than waiting for input events.

use std::process::{Command, ExitCode};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use evdev::{AbsoluteAxisType, Device, Key};
use log::{debug, error, info, warn};

use crate::config::{AppConfig, DeviceConfig, TapkitError, parse_config_file};
use crate::engine::GestureEngine;
use crate::event::{EventKind, parse_usb_id, resolve_action};
use crate::source::{PanelGeometry, TouchPoint, TouchSource};

/// How often each device thread polls its engine.
const POLL_INTERVAL: Duration = Duration::from_millis(2);

/// Consecutive failed axis reads before a device counts as disconnected.
const MAX_CONSECUTIVE_ERRORS: u32 = 50;

// -- EvdevTouchSource -----------------------------------------

/// A [`TouchSource`] backed by a Linux evdev device.
///
/// Samples come from the kernel's current absolute-axis state, so the
/// source is genuinely polled; the touched flag comes from `BTN_TOUCH`,
/// falling back to the pressure axis and then the multitouch tracking id
/// for panels that do not report the key.
pub struct EvdevTouchSource {
    device: Device,
    geometry: PanelGeometry,
    axis_x: AbsoluteAxisType,
    axis_y: AbsoluteAxisType,
    has_pressure: bool,
    has_btn_touch: bool,
    has_tracking_id: bool,
    error_count: u32,
}

impl EvdevTouchSource {
    pub fn new(device: Device) -> Self {
        let axes = device.supported_absolute_axes();
        let has = |axis: AbsoluteAxisType| axes.as_ref().is_some_and(|a| a.contains(axis));

        // Prefer the single-touch axes; some panels only speak multitouch.
        let (axis_x, axis_y) = if has(AbsoluteAxisType::ABS_X) {
            (AbsoluteAxisType::ABS_X, AbsoluteAxisType::ABS_Y)
        } else {
            (
                AbsoluteAxisType::ABS_MT_POSITION_X,
                AbsoluteAxisType::ABS_MT_POSITION_Y,
            )
        };
        let has_pressure = has(AbsoluteAxisType::ABS_PRESSURE);
        let has_tracking_id = has(AbsoluteAxisType::ABS_MT_TRACKING_ID);

        let has_btn_touch = device
            .supported_keys()
            .is_some_and(|keys| keys.contains(Key::BTN_TOUCH));

        let mut source = Self {
            device,
            geometry: PanelGeometry::new(),
            axis_x,
            axis_y,
            has_pressure,
            has_btn_touch,
            has_tracking_id,
            error_count: 0,
        };
        source.read_axis_ranges();
        source
    }

    /// Swap in a freshly opened device handle after a reconnect, keeping
    /// the configured rotation and display geometry.
    pub fn replace_device(&mut self, device: Device) {
        self.device = device;
        self.error_count = 0;
        self.read_axis_ranges();
    }

    /// Failed axis reads since the last successful one.
    pub fn consecutive_errors(&self) -> u32 {
        self.error_count
    }

    pub fn geometry(&self) -> &PanelGeometry {
        &self.geometry
    }

    fn read_axis_ranges(&mut self) {
        if let Ok(abs) = self.device.get_abs_state() {
            let x = abs[self.axis_x.0 as usize];
            let y = abs[self.axis_y.0 as usize];
            self.geometry.set_x_range(x.minimum, x.maximum);
            self.geometry.set_y_range(y.minimum, y.maximum);
            debug!(
                "Axis ranges: x {}..{}, y {}..{}",
                x.minimum, x.maximum, y.minimum, y.maximum
            );
        }
    }

    /// Read raw axis values and the touched flag. `None` on I/O failure.
    fn read_raw(&mut self) -> Option<(i32, i32, u16)> {
        let abs = match self.device.get_abs_state() {
            Ok(abs) => abs,
            Err(e) => {
                self.error_count += 1;
                if self.error_count == 1 {
                    debug!("Axis state read failed: {e}");
                }
                return None;
            }
        };
        self.error_count = 0;

        let raw_x = abs[self.axis_x.0 as usize].value;
        let raw_y = abs[self.axis_y.0 as usize].value;
        let pressure = if self.has_pressure {
            abs[AbsoluteAxisType::ABS_PRESSURE.0 as usize].value
        } else {
            0
        };

        let touched = if self.has_btn_touch {
            self.device
                .get_key_state()
                .map(|keys| keys.contains(Key::BTN_TOUCH))
                .unwrap_or(false)
        } else if self.has_pressure {
            pressure > 0
        } else if self.has_tracking_id {
            abs[AbsoluteAxisType::ABS_MT_TRACKING_ID.0 as usize].value != -1
        } else {
            false
        };

        let z = if touched {
            if self.has_pressure {
                pressure.clamp(1, u16::MAX as i32) as u16
            } else {
                1
            }
        } else {
            0
        };
        Some((raw_x, raw_y, z))
    }
}

impl TouchSource for EvdevTouchSource {
    fn begin(&mut self) -> bool {
        // The handle was already opened; a readable axis state is all the
        // panel needs.
        self.device.get_abs_state().is_ok()
    }

    fn touch_point(&mut self) -> TouchPoint {
        match self.read_raw() {
            Some((x, y, z)) => self.geometry.map(x, y, z),
            // Report untouched; the engine carries the last touched point
            // forward on its own.
            None => TouchPoint::default(),
        }
    }

    fn touch_point_raw(&mut self) -> TouchPoint {
        match self.read_raw() {
            Some((x, y, z)) => TouchPoint::new(
                x.clamp(0, u16::MAX as i32) as u16,
                y.clamp(0, u16::MAX as i32) as u16,
                z,
            ),
            None => TouchPoint::default(),
        }
    }

    fn set_rotation(&mut self, rotation: u8) {
        self.geometry.set_rotation(rotation);
    }

    fn set_display_width(&mut self, width_px: u16) {
        self.geometry.set_native_width(width_px);
    }

    fn set_display_height(&mut self, height_px: u16) {
        self.geometry.set_native_height(height_px);
    }
}

// -- GestureManager (top-level orchestrator) ------------------

/// Manages gesture recognition across multiple touch devices.
pub struct GestureManager {
    config: AppConfig,
    running: Arc<AtomicBool>,
}

impl GestureManager {
    pub fn new(config_path: impl AsRef<std::path::Path>) -> Result<Self, TapkitError> {
        Ok(Self {
            config: parse_config_file(config_path.as_ref())?,
            running: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Start polling all configured devices. Blocks until every device
    /// thread has exited.
    pub fn start(&mut self) {
        if self.config.devices.is_empty() {
            error!("No devices configured");
            return;
        }

        self.running.store(true, Ordering::Relaxed);
        info!("Starting gesture manager");

        let mut handles = Vec::new();

        for (device_id, device_config) in &self.config.devices {
            if let Some(device) = find_device(device_id, device_config) {
                let device_id = device_id.clone();
                let config = device_config.clone();
                let running = Arc::clone(&self.running);

                handles.push(
                    thread::Builder::new()
                        .name(format!("gesture-{device_id}"))
                        .spawn(move || {
                            run_device_loop(&device_id, device, &config, &running);
                        })
                        .expect("Failed to spawn device thread"),
                );
            } else {
                warn!("Device not found: {device_id}");
            }
        }

        if handles.is_empty() {
            error!("No devices found, exiting");
            return;
        }

        for handle in handles {
            let _ = handle.join();
        }
    }

    /// Stop all device loops.
    #[allow(dead_code)]
    pub fn stop(&self) {
        self.running.store(false, Ordering::Relaxed);
        info!("Gesture manager stopped");
    }

    /// Get a reference to the running flag for signal handling.
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Get the log level from the parsed configuration.
    pub fn config_log_level(&self) -> &str {
        &self.config.log_level
    }

    /// Get the optional log file path from the parsed configuration.
    pub fn config_log_file(&self) -> Option<&str> {
        self.config.log_file.as_deref()
    }
}

// -- Device I/O -----------------------------------------------

/// Check if a device reports absolute touch coordinates.
fn is_touch_device(device: &Device) -> bool {
    let Some(abs_axes) = device.supported_absolute_axes() else {
        return false;
    };
    (abs_axes.contains(AbsoluteAxisType::ABS_X) && abs_axes.contains(AbsoluteAxisType::ABS_Y))
        || (abs_axes.contains(AbsoluteAxisType::ABS_MT_POSITION_X)
            && abs_axes.contains(AbsoluteAxisType::ABS_MT_POSITION_Y))
}

/// Find a touchscreen device by USB vendor:product ID.
fn find_device(device_id: &str, config: &DeviceConfig) -> Option<Device> {
    let Some((vendor, product)) = parse_usb_id(&config.device_usb_id) else {
        warn!(
            "Device {device_id}: invalid USB ID format '{}' (expected vendor:product)",
            config.device_usb_id
        );
        return None;
    };

    for (path, device) in evdev::enumerate() {
        if !is_touch_device(&device) {
            continue;
        }
        let id = device.input_id();
        if id.vendor() == vendor && id.product() == product {
            info!(
                "Found device for {} by USB ID {}: {} ({})",
                device_id,
                config.device_usb_id,
                device.name().unwrap_or("unknown"),
                path.display()
            );
            return Some(device);
        }
    }

    warn!(
        "Device {}: no touch device with USB ID {} found",
        device_id, config.device_usb_id
    );
    None
}

/// Build the engine for a device and poll it until shutdown.
fn run_device_loop(
    device_id: &str,
    device: Device,
    config: &DeviceConfig,
    running: &Arc<AtomicBool>,
) {
    let mut source = EvdevTouchSource::new(device);
    source.set_display_width(config.display_width);
    source.set_display_height(config.display_height);
    source.set_rotation(config.rotation);

    info!(
        "Started processing device: {device_id} (USB {}, rotation {})",
        config.device_usb_id, config.rotation
    );

    let mut engine = GestureEngine::with_thresholds(source, config.thresholds.clone());
    let callback_id = device_id.to_string();
    let callback_config = config.clone();
    engine.set_callback(move |kind, _state| {
        execute_event(&callback_id, kind, &callback_config);
    });

    let epoch = Instant::now();
    if !engine.begin(0) {
        error!("Device {device_id}: failed to read initial state");
        return;
    }

    while running.load(Ordering::Relaxed) {
        engine.update(epoch.elapsed().as_millis() as u32);

        if engine.source().consecutive_errors() > MAX_CONSECUTIVE_ERRORS {
            warn!("Device {device_id} disconnected");
            if !attempt_reconnect(device_id, &mut engine, config, running) {
                break;
            }
        }

        thread::sleep(POLL_INTERVAL);
    }
}

/// Spawn the shell command configured for a recognized event.
fn execute_event(device_id: &str, kind: EventKind, config: &DeviceConfig) {
    let event_name: &str = kind.into();
    if let Some(action) = resolve_action(kind, &config.actions) {
        match Command::new("sh").arg("-c").arg(action).spawn() {
            Ok(_) => debug!("Spawned action: {action}"),
            Err(e) => error!("Failed to execute action '{action}': {e}"),
        }
        info!("{device_id}: {event_name}");
    }
}

/// Attempt to reconnect to a device after it disconnects.
fn attempt_reconnect(
    device_id: &str,
    engine: &mut GestureEngine<EvdevTouchSource>,
    config: &DeviceConfig,
    running: &Arc<AtomicBool>,
) -> bool {
    const MAX_RETRIES: usize = 10;
    const RETRY_INTERVAL: Duration = Duration::from_secs(5);

    for attempt in 1..=MAX_RETRIES {
        if !running.load(Ordering::Relaxed) {
            return false;
        }
        info!("Reconnect attempt {attempt}/{MAX_RETRIES} for {device_id}...");
        thread::sleep(RETRY_INTERVAL);

        if let Some(device) = find_device(device_id, config) {
            info!("Reconnected to {device_id}");
            engine.source_mut().replace_device(device);
            return true;
        }
    }
    error!("Failed to reconnect to {device_id} after {MAX_RETRIES} attempts");
    false
}

/// List all touch-capable devices.
pub fn list_touch_devices() -> ExitCode {
    println!("\n=== tapkit: Available Touchscreen Devices ===\n");
    let mut touch_count = 0;

    for (path, device) in evdev::enumerate() {
        if !is_touch_device(&device) {
            continue;
        }

        touch_count += 1;
        println!(
            "Device {touch_count}:\n\
             \x20 Path:      {}\n\
             \x20 Name:      {}\n\
             \x20 USB ID:    {:04x}:{:04x}\n\
             \x20 Phys:      {}\n",
            path.display(),
            device.name().unwrap_or("unknown"),
            device.input_id().vendor(),
            device.input_id().product(),
            device.physical_path().unwrap_or("N/A"),
        );
    }

    if touch_count == 0 {
        println!(
            "No touch devices found.\n\n\
             Troubleshooting:\n\
             \x20 - Check if touchscreen is connected\n\
             \x20 - Run 'libinput list-devices' to see all devices\n\
             \x20 - Run as root if devices are not visible"
        );
        return ExitCode::FAILURE;
    }

    println!(
        "Found {touch_count} touch device(s).\n\n\
         Add the USB ID to your tapkit.toml:\n\
         \x20 [device.<name>]\n\
         \x20 device_usb_id = \"<USB ID>\"\n\
         \x20 enabled = true"
    );
    ExitCode::SUCCESS
}
