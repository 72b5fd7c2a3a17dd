//! The gesture recognition state machine - the core of the crate.
//!
//! `GestureEngine` consumes debounced samples from a [`TouchSource`] once
//! per processed tick and reports semantic [`EventKind`]s to a single
//! subscriber. The driving loop calls [`GestureEngine::update`] at its own
//! cadence with a monotonic millisecond counter; the rate limiter decides
//! which calls do real work, so missed or extra calls only delay detection
//! and never corrupt state.
//!
//! All timing uses wrapping `u32` millisecond arithmetic and all distances
//! are compared squared - there is no square root and no allocation in the
//! per-tick path.

use log::debug;

use crate::config::Thresholds;
use crate::debounce::DebounceFilter;
use crate::event::EventKind;
use crate::source::{TouchPoint, TouchSource};

/// Delay before the first processed tick, letting the panel settle after
/// power-up.
const STARTUP_SETTLE_MS: u32 = 500;

/// Signed milliseconds from `then` to `now` on a wrapping counter.
///
/// A `then` that has been pushed into the future (the post-drag cooldown)
/// comes back negative; genuine elapsed intervals stay correct across
/// counter overflow as long as they are below half the counter range.
fn ms_since(now: u32, then: u32) -> i32 {
    now.wrapping_sub(then) as i32
}

fn squared_distance(a: TouchPoint, b: TouchPoint) -> u32 {
    let dx = (a.x as i32 - b.x as i32).unsigned_abs();
    let dy = (a.y as i32 - b.y as i32).unsigned_abs();
    dx.saturating_mul(dx).saturating_add(dy.saturating_mul(dy))
}

/// The start and current touch points of the running session, for widgets
/// doing their own hit-testing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TouchSnapshot {
    pub point: TouchPoint,
    pub start: TouchPoint,
}

/// The engine's observable session state, passed to the subscriber with
/// every event.
#[derive(Debug)]
pub struct GestureState {
    now: u32,
    touched: bool,
    click_counter: u8,
    prev_click_count: u8,
    click_fired: bool,
    dragging: bool,
    last_drag_ms: u32,
    last_state_change: u32,
    prev_duration: u16,
    long_press_counter: u16,
    touch_point: TouchPoint,
    start_point: TouchPoint,
    previous_point: TouchPoint,
    last_touched_point: TouchPoint,
}

impl Default for GestureState {
    fn default() -> Self {
        Self {
            now: 0,
            touched: false,
            click_counter: 0,
            prev_click_count: 0,
            // No click pending until a release arms it.
            click_fired: true,
            dragging: false,
            last_drag_ms: 0,
            last_state_change: 0,
            prev_duration: 0,
            long_press_counter: 0,
            touch_point: TouchPoint::default(),
            start_point: TouchPoint::default(),
            previous_point: TouchPoint::default(),
            last_touched_point: TouchPoint::default(),
        }
    }
}

impl GestureState {
    /// True while the panel is (debounced) touched.
    pub fn is_pressed(&self) -> bool {
        self.touched
    }

    /// True once a drag event has occurred in this session.
    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    /// The click count latched into the most recent classification event.
    pub fn click_count(&self) -> u8 {
        self.prev_click_count
    }

    /// How many times the long-press handler has fired during this press.
    pub fn long_press_count(&self) -> u16 {
        self.long_press_counter
    }

    /// Duration of the current pressed or released state in ms, saturated
    /// at `u16::MAX`.
    pub fn current_duration(&self) -> u16 {
        self.duration_ms().min(u16::MAX as u32) as u16
    }

    /// Duration of the previous pressed or released state in ms, latched
    /// at the last state change.
    pub fn previous_duration(&self) -> u16 {
        self.prev_duration
    }

    /// The current touch point. While untouched this is the last touched
    /// x/y with z forced to 0 - never a stale nonzero pressure.
    pub fn touch_point(&self) -> TouchPoint {
        if self.touch_point.is_touched() {
            self.touch_point
        } else {
            TouchPoint {
                z: 0,
                ..self.last_touched_point
            }
        }
    }

    /// The touch point as of the previous drag event - the basis for
    /// incremental deltas between successive drag events.
    pub fn previous_touch_point(&self) -> TouchPoint {
        self.previous_point
    }

    /// Where the current session started. Used for drag events.
    pub fn start_touch_point(&self) -> TouchPoint {
        self.start_point
    }

    /// The current and start points together, for widget hit-testing.
    pub fn snapshot(&self) -> TouchSnapshot {
        TouchSnapshot {
            point: self.touch_point(),
            start: self.start_point,
        }
    }

    fn duration_ms(&self) -> u32 {
        self.now.wrapping_sub(self.last_state_change)
    }
}

/// Callback type for the single subscriber slot.
pub type Callback = Box<dyn FnMut(EventKind, &GestureState)>;

/// The gesture recognition engine.
///
/// Owns its sample source and session state. Construct, optionally adjust
/// thresholds, [`set_callback`](Self::set_callback), call
/// [`begin`](Self::begin) once, then [`update`](Self::update) from the
/// driving loop.
pub struct GestureEngine<S: TouchSource> {
    source: S,
    debounce: DebounceFilter,
    thresholds: Thresholds,
    callback: Option<Callback>,
    enabled: bool,
    rate_limit_at: u32,
    state: GestureState,
}

impl<S: TouchSource> GestureEngine<S> {
    pub fn new(source: S) -> Self {
        Self::with_thresholds(source, Thresholds::default())
    }

    pub fn with_thresholds(source: S, thresholds: Thresholds) -> Self {
        Self {
            debounce: DebounceFilter::new(thresholds.bounce_interval_ms),
            source,
            thresholds,
            callback: None,
            enabled: true,
            rate_limit_at: 0,
            state: GestureState::default(),
        }
    }

    /// Initialise the engine and its source. The first processed tick is
    /// deferred so the panel can settle on startup.
    pub fn begin(&mut self, now: u32) -> bool {
        let ok = self.source.begin();
        self.rate_limit_at = now.wrapping_add(STARTUP_SETTLE_MS);
        ok
    }

    /// Advance the state machine. `now` is a monotonic millisecond
    /// counter; calls within the rate limit of the last processed tick are
    /// ignored entirely (the source is not polled).
    pub fn update(&mut self, now: u32) {
        if !self.enabled {
            return;
        }
        if ms_since(now, self.rate_limit_at) <= self.thresholds.rate_limit_ms as i32 {
            return;
        }
        self.rate_limit_at = now;
        self.state.now = now;

        if let Some(sample) = self.debounce.settle(now, self.source.touch_point()) {
            self.state.touch_point = sample;
            if sample.is_touched() {
                self.state.last_touched_point = sample;
            }
            if !self.state.touched && sample.is_touched() {
                self.change_state(true, now);
                self.state.start_point = sample;
                self.state.previous_point = sample;
                self.state.last_drag_ms = now;
                debug!("pressed at ({}, {})", sample.x, sample.y);
                self.invoke(EventKind::Pressed);
            } else if self.state.touched && !sample.is_touched() {
                self.change_state(false, now);
                if !self.state.dragging {
                    self.state.click_fired = false;
                    if self.state.long_press_counter == 0 {
                        self.state.click_counter = self.state.click_counter.saturating_add(1);
                        self.state.prev_click_count = self.state.click_counter;
                    }
                    self.invoke(EventKind::Released);
                } else {
                    // Resistive panels tend to press/release right after a
                    // drag, so the next processed tick is pushed out by the
                    // post-drag limit. No click follows a drag.
                    self.state.click_fired = true;
                    self.state.dragging = false;
                    self.state.long_press_counter = 0;
                    self.state.click_counter = 0;
                    self.rate_limit_at =
                        now.wrapping_add(self.thresholds.post_drag_rate_limit_ms as u32);
                    debug!("drag released");
                    self.invoke(EventKind::DraggedReleased);
                }
            }
        }

        if self.state.touched && self.state.touch_point.is_touched() {
            if self.thresholds.drag_enabled && self.have_dragged(now) {
                self.invoke(EventKind::Dragged);
                self.state.previous_point = self.state.touch_point;
            }
            let due = self.thresholds.long_click_duration_ms as u32
                + self.state.long_press_counter as u32
                    * self.thresholds.long_press_interval_ms as u32;
            if self.state.duration_ms() > due {
                self.state.long_press_counter += 1;
                if !self.state.dragging
                    && (self.thresholds.long_press_repeat || self.state.long_press_counter == 1)
                {
                    self.invoke(EventKind::LongPress);
                }
            }
        }

        // Fire the accumulated clicks once the multi-click window closes
        // with no further press.
        if !self.state.click_fired
            && !self.state.touched
            && self.state.duration_ms() > self.thresholds.multi_click_interval_ms as u32
        {
            self.state.click_fired = true;
            if self.state.prev_duration as u32 > self.thresholds.long_click_duration_ms as u32
                || self.state.long_press_counter > 0
            {
                self.state.click_counter = 0;
                self.state.prev_click_count = 1;
                self.invoke(EventKind::LongClicked);
                self.state.long_press_counter = 0;
            } else {
                match self.state.click_counter {
                    1 => self.invoke(EventKind::Clicked),
                    2 => self.invoke(EventKind::DoubleClicked),
                    _ => self.invoke(EventKind::MultiClicked),
                }
                self.state.click_counter = 0;
            }
        }
    }

    // -- Subscriber -----------------------------------------------

    /// Set the subscriber callback. Only one subscriber is held; setting
    /// replaces any previous one.
    pub fn set_callback(&mut self, callback: impl FnMut(EventKind, &GestureState) + 'static) {
        self.callback = Some(Box::new(callback));
    }

    /// Remove the subscriber. Dispatch becomes a silent no-op.
    pub fn unset_callback(&mut self) {
        self.callback = None;
    }

    /// Enable or disable the engine. Disabling zeroes the click and
    /// long-press counters and reports `Disabled`; a disabled engine
    /// discards all gesture processing but still accepts configuration
    /// changes.
    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled == enabled {
            return;
        }
        self.enabled = enabled;
        if !enabled {
            self.state.click_counter = 0;
            self.state.long_press_counter = 0;
            self.invoke(EventKind::Disabled);
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    // -- Configuration --------------------------------------------

    /// Replace every threshold at once (also updates the debounce window).
    pub fn set_thresholds(&mut self, thresholds: Thresholds) {
        self.debounce.set_interval(thresholds.bounce_interval_ms);
        self.thresholds = thresholds;
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    /// Set the debounce window in ms. Resistive panels usually need more
    /// than the default 15.
    pub fn set_debounce_interval(&mut self, ms: u16) {
        self.thresholds.bounce_interval_ms = ms;
        self.debounce.set_interval(ms);
    }

    /// Set the gap in ms that finalises double/triple/multi clicks.
    pub fn set_multi_click_interval(&mut self, ms: u16) {
        self.thresholds.multi_click_interval_ms = ms;
    }

    /// Set the press duration in ms that separates clicks from
    /// long-clicks.
    pub fn set_long_click_duration(&mut self, ms: u16) {
        self.thresholds.long_click_duration_ms = ms;
    }

    /// Choose whether the long-press event repeats while held.
    pub fn enable_long_press_repeat(&mut self, repeat: bool) {
        self.thresholds.long_press_repeat = repeat;
    }

    /// Set the interval in ms between long-press repeats.
    pub fn set_long_press_interval(&mut self, ms: u16) {
        self.thresholds.long_press_interval_ms = ms;
    }

    /// Set the minimum spacing between processed ticks.
    pub fn set_rate_limit(&mut self, ms: u16) {
        self.thresholds.rate_limit_ms = ms;
    }

    /// Set the tick spacing applied right after a drag release.
    pub fn set_post_drag_rate_limit(&mut self, ms: u16) {
        self.thresholds.post_drag_rate_limit_ms = ms;
    }

    /// Enable dragging (disabled by default). While a drag is engaged the
    /// long-press event is suppressed, though long-press counting and the
    /// long-click classification are retained if no drag event occurs.
    pub fn enable_dragging(&mut self, allow: bool) {
        self.thresholds.drag_enabled = allow;
    }

    pub fn is_drag_enabled(&self) -> bool {
        self.thresholds.drag_enabled
    }

    /// Pixel threshold before the *first* drag event.
    pub fn set_drag_threshold_px(&mut self, px: u16) {
        self.thresholds.drag_threshold_px = px;
    }

    /// Pixel threshold before *subsequent* drag events.
    pub fn set_drag_interval_px(&mut self, px: u16) {
        self.thresholds.drag_interval_px = px;
    }

    /// Time threshold in ms before the *first* drag event.
    pub fn set_drag_threshold_ms(&mut self, ms: u16) {
        self.thresholds.drag_threshold_ms = ms;
    }

    /// Time threshold in ms between *subsequent* drag events.
    pub fn set_drag_interval_ms(&mut self, ms: u16) {
        self.thresholds.drag_interval_ms = ms;
    }

    /// Set the panel rotation; forwarded to the source. Call whenever the
    /// display rotation changes.
    pub fn set_rotation(&mut self, rotation: u8) {
        self.source.set_rotation(rotation);
    }

    // -- Observable state -----------------------------------------

    pub fn state(&self) -> &GestureState {
        &self.state
    }

    pub fn is_pressed(&self) -> bool {
        self.state.is_pressed()
    }

    pub fn is_dragging(&self) -> bool {
        self.state.is_dragging()
    }

    pub fn click_count(&self) -> u8 {
        self.state.click_count()
    }

    pub fn long_press_count(&self) -> u16 {
        self.state.long_press_count()
    }

    pub fn current_duration(&self) -> u16 {
        self.state.current_duration()
    }

    pub fn previous_duration(&self) -> u16 {
        self.state.previous_duration()
    }

    /// See [`GestureState::touch_point`].
    pub fn touch_point(&self) -> TouchPoint {
        self.state.touch_point()
    }

    pub fn previous_touch_point(&self) -> TouchPoint {
        self.state.previous_touch_point()
    }

    pub fn start_touch_point(&self) -> TouchPoint {
        self.state.start_touch_point()
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    // -- Internals ------------------------------------------------

    fn invoke(&mut self, kind: EventKind) {
        // Dispatch is a no-op while disabled, except for the disable
        // notification itself.
        if !self.enabled && kind != EventKind::Disabled {
            return;
        }
        if let Some(cb) = self.callback.as_mut() {
            cb(kind, &self.state);
        }
    }

    fn change_state(&mut self, touched: bool, now: u32) {
        self.state.touched = touched;
        // Latch the finished session's duration before the timer resets;
        // click finalisation reads the latch, never a live timer.
        self.state.prev_duration = self.state.current_duration();
        self.state.last_state_change = now;
    }

    /// True if time+distance from the start point crossed the first-drag
    /// thresholds, or time-only plus distance the subsequent ones.
    fn have_dragged(&mut self, now: u32) -> bool {
        let (d_ms, d_px) = if self.state.dragging {
            (
                self.thresholds.drag_interval_ms,
                self.thresholds.drag_interval_px,
            )
        } else {
            (
                self.thresholds.drag_threshold_ms,
                self.thresholds.drag_threshold_px,
            )
        };
        if ms_since(now, self.state.last_drag_ms) > d_ms as i32 {
            let dist = squared_distance(self.state.touch_point, self.state.start_point);
            // Compared squared to avoid the sqrt.
            if dist > d_px as u32 * d_px as u32 {
                self.state.dragging = true;
                self.state.last_drag_ms = now;
                return true;
            }
        }
        false
    }
}
