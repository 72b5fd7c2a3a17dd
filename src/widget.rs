//! Widgets: the building blocks of an app's display.
//!
//! A widget holds a little bit of state and decides if redrawing is
//! required; actual pixel output belongs to the concrete widget. Extra
//! behaviour is composed through capability traits over a shared
//! [`WidgetCore`]: [`Touchable`] for widgets that react to touch within
//! their region, [`Iconic`] for widgets that draw an icon, and [`Pinned`]
//! for widgets that forward presses to a virtual pin.

use crate::engine::TouchSnapshot;
use crate::event::EventKind;
use crate::geom::Region;
use crate::icon::{Icon, IconParams};

/// Default foreground colour, white.
pub const WIDGET_COLOUR_DEFAULT_FG: u16 = 0xFFFF;
/// Default background colour, black.
pub const WIDGET_COLOUR_DEFAULT_BG: u16 = 0x0000;
/// Default pressed colour, light grey.
pub const WIDGET_COLOUR_DEFAULT_PRESSED: u16 = 0xD69A;
/// Default disabled foreground colour, dark grey.
pub const WIDGET_COLOUR_DEFAULT_DISABLED: u16 = 0x7BEF;

/// Display states for widgets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayState {
    /// Not yet set.
    #[default]
    None,
    /// Change icon and/or colour.
    Enabled,
    /// Change outline or background.
    Pressed,
    /// Change outline or background.
    Focussed,
    /// Change outline or background.
    Idle,
    /// Draw greyscaled; should not react to touch.
    Disabled,
    /// Should not be drawn.
    Hidden,
    /// Widget is in error state.
    Error,
}

/// The state every widget carries: its region, display state, redraw flag,
/// convenience colours, and a user-assigned id/value pair.
#[derive(Debug, Clone)]
pub struct WidgetCore {
    region: Region,
    state: DisplayState,
    previous_state: DisplayState,
    needs_redraw: bool,
    fg_colour: u16,
    bg_colour: u16,
    widget_id: u8,
    widget_value: u8,
}

impl WidgetCore {
    pub fn new(region: Region) -> Self {
        Self {
            region,
            state: DisplayState::None,
            previous_state: DisplayState::None,
            needs_redraw: true,
            fg_colour: WIDGET_COLOUR_DEFAULT_FG,
            bg_colour: WIDGET_COLOUR_DEFAULT_BG,
            widget_id: 0,
            widget_value: 0,
        }
    }

    /// Record a new display state. Returns true if it changed.
    fn apply_state(&mut self, new_state: DisplayState) -> bool {
        if new_state == self.state {
            return false;
        }
        self.previous_state = self.state;
        self.state = new_state;
        true
    }
}

/// The widget lifecycle and the state handling every widget shares.
///
/// Concrete widgets implement `core`/`core_mut` plus the lifecycle; the
/// provided methods delegate state, redraw, colour, and region handling to
/// the core, and `set_state` calls `on_state_changed` when the state
/// actually changes.
pub trait Widget {
    fn core(&self) -> &WidgetCore;
    fn core_mut(&mut self) -> &mut WidgetCore;

    /// Set up state that cannot be done in the constructor. Does nothing
    /// by default.
    fn begin(&mut self) {}

    /// Called when the screen starts; prepare and draw non-changing
    /// elements.
    fn start(&mut self);

    /// Draw the widget using current values.
    fn draw(&mut self);

    /// Clear the widget's region.
    fn clear(&mut self);

    /// Called when the widget is no longer used by the current screen.
    fn end(&mut self);

    /// Concrete widgets decide what to do when the state changes.
    fn on_state_changed(&mut self);

    // -- Provided -------------------------------------------------

    fn region(&self) -> &Region {
        &self.core().region
    }

    fn region_mut(&mut self) -> &mut Region {
        &mut self.core_mut().region
    }

    /// Indicate that the widget requires redrawing (usually because of a
    /// state change). Containers override this to fan out.
    fn redraw_required(&mut self, redraw: bool) {
        self.core_mut().needs_redraw = redraw;
    }

    fn is_redraw_required(&self) -> bool {
        self.core().needs_redraw
    }

    /// Set the display state, remembering the previous one.
    fn set_state(&mut self, new_state: DisplayState) {
        if self.core_mut().apply_state(new_state) {
            self.on_state_changed();
        }
    }

    fn state(&self) -> DisplayState {
        self.core().state
    }

    fn is_state(&self, state: DisplayState) -> bool {
        self.state() == state
    }

    fn previous_state(&self) -> DisplayState {
        self.core().previous_state
    }

    fn is_hidden(&self) -> bool {
        self.state() == DisplayState::Hidden
    }

    /// Widgets can use any colours; the foreground and background are
    /// provided for convenience.
    fn set_fg_colour(&mut self, colour: u16) {
        if colour == self.core().fg_colour {
            return;
        }
        self.core_mut().fg_colour = colour;
        self.redraw_required(true);
    }

    fn fg_colour(&self) -> u16 {
        self.core().fg_colour
    }

    fn set_bg_colour(&mut self, colour: u16) {
        if colour == self.core().bg_colour {
            return;
        }
        self.core_mut().bg_colour = colour;
        self.redraw_required(true);
    }

    fn bg_colour(&self) -> u16 {
        self.core().bg_colour
    }

    /// User-assigned widget id; not used internally and not unique.
    fn set_widget_id(&mut self, id: u8) {
        self.core_mut().widget_id = id;
    }

    fn widget_id(&self) -> u8 {
        self.core().widget_id
    }

    /// User-assigned widget value; not used internally.
    fn set_widget_value(&mut self, value: u8) {
        self.core_mut().widget_value = value;
    }

    fn widget_value(&self) -> u8 {
        self.core().widget_value
    }
}

// -- Capabilities ---------------------------------------------

/// A widget that can act on touch within its region.
///
/// Intended for changing the internal state or drawing of the widget; for
/// external actions use `widget.region().contains_coords(..)` directly or
/// an [`EventSlot`].
pub trait Touchable {
    /// Handle the touch event if appropriate. Return true if fully
    /// handled.
    fn on_touch_event(&mut self, kind: EventKind, touch: TouchSnapshot) -> bool;
}

/// Something that can be virtually pressed and released, e.g. to drive a
/// physical-button input from a touch widget.
pub trait VirtualPin {
    fn press(&mut self);
    fn release(&mut self);
}

/// A widget holding an optional [`VirtualPin`] so touches can press it.
pub trait Pinned: Widget {
    fn virtual_pin(&mut self) -> Option<&mut dyn VirtualPin>;

    /// Press the pin if one is set. Returns false when no pin is attached.
    fn press_virtual_pin(&mut self) -> bool {
        match self.virtual_pin() {
            Some(pin) => {
                pin.press();
                true
            }
            None => false,
        }
    }

    /// Release the pin if one is set.
    fn release_virtual_pin(&mut self) -> bool {
        match self.virtual_pin() {
            Some(pin) => {
                pin.release();
                true
            }
            None => false,
        }
    }

    /// Default mapping of touch events onto the pin: press when the touch
    /// lands inside the widget, release when the session that started
    /// inside it ends.
    fn pin_on_touch_event(&mut self, kind: EventKind, touch: TouchSnapshot) -> bool
    where
        Self: Sized,
    {
        if kind == EventKind::Pressed && self.region().contains_coords(touch.point.coords()) {
            return self.press_virtual_pin();
        }
        if kind == EventKind::Released && self.region().contains_coords(touch.start.coords()) {
            return self.release_virtual_pin();
        }
        false
    }
}

/// The icon reference and draw parameters an [`Iconic`] widget holds.
///
/// Icons are stateless and shared, so the slot keeps a `'static` borrow
/// and compares icons by address.
#[derive(Default)]
pub struct IconSlot {
    icon: Option<&'static dyn Icon>,
    params: IconParams,
}

impl IconSlot {
    pub fn icon(&self) -> Option<&'static dyn Icon> {
        self.icon
    }

    pub fn is_icon(&self, other: &'static dyn Icon) -> bool {
        match self.icon {
            Some(icon) => std::ptr::addr_eq(icon as *const dyn Icon, other as *const dyn Icon),
            None => false,
        }
    }

    pub fn params(&self) -> IconParams {
        self.params
    }

    pub fn set_params(&mut self, params: IconParams) {
        self.params = params;
    }

    fn replace(&mut self, icon: &'static dyn Icon) {
        self.icon = Some(icon);
    }
}

/// A widget that draws an icon.
pub trait Iconic: Widget {
    fn icon_slot(&self) -> &IconSlot;
    fn icon_slot_mut(&mut self) -> &mut IconSlot;

    /// Set the icon to draw. A no-op if it is already the current icon.
    fn set_icon(&mut self, icon: &'static dyn Icon) {
        if self.icon_slot().is_icon(icon) {
            return;
        }
        self.icon_slot_mut().replace(icon);
        self.redraw_required(true);
    }

    fn is_icon(&self, other: &'static dyn Icon) -> bool {
        self.icon_slot().is_icon(other)
    }

    fn set_icon_params(&mut self, params: IconParams) {
        self.icon_slot_mut().set_params(params);
    }

    fn icon_params(&self) -> IconParams {
        self.icon_slot().params()
    }
}

/// Single-subscriber callback slot for widgets that fire events.
///
/// A widget that owns its own slot should `std::mem::take` the slot around
/// `invoke` so the callback can borrow the widget mutably.
pub struct EventSlot<W: ?Sized> {
    callback: Option<Box<dyn FnMut(EventKind, &mut W)>>,
}

impl<W: ?Sized> Default for EventSlot<W> {
    fn default() -> Self {
        Self { callback: None }
    }
}

impl<W: ?Sized> EventSlot<W> {
    /// Set the callback, replacing any previous one.
    pub fn set(&mut self, callback: impl FnMut(EventKind, &mut W) + 'static) {
        self.callback = Some(Box::new(callback));
    }

    /// Unset the callback. Must be called if the callback captures
    /// something about to be destroyed.
    pub fn unset(&mut self) {
        self.callback = None;
    }

    pub fn is_set(&self) -> bool {
        self.callback.is_some()
    }

    /// Invoke the callback. Returns false if none is set.
    pub fn invoke(&mut self, kind: EventKind, widget: &mut W) -> bool {
        match self.callback.as_mut() {
            Some(cb) => {
                cb(kind, widget);
                true
            }
            None => false,
        }
    }
}

// -- Containers -----------------------------------------------

/// Index returned when a container is full or a lookup is out of range.
pub const INVALID_INDEX: usize = usize::MAX;

/// A fixed-capacity widget container addressed by index.
///
/// Draws all added widgets unless hidden, and always forwards `begin` and
/// `end`. Capacity is a compile-time constant; adding past it returns
/// [`INVALID_INDEX`].
pub struct WidgetContainer<const N: usize = 5> {
    core: WidgetCore,
    widgets: [Option<Box<dyn Widget>>; N],
    count: usize,
}

impl<const N: usize> WidgetContainer<N> {
    pub fn new(region: Region) -> Self {
        Self {
            core: WidgetCore::new(region),
            widgets: std::array::from_fn(|_| None),
            count: 0,
        }
    }

    /// Add a widget. Returns its index, or [`INVALID_INDEX`] when full.
    pub fn add_widget(&mut self, widget: Box<dyn Widget>) -> usize {
        if self.count >= N {
            return INVALID_INDEX;
        }
        self.widgets[self.count] = Some(widget);
        self.count += 1;
        self.count - 1
    }

    /// Remove the widget at `index`, shifting later widgets down.
    pub fn remove_widget(&mut self, index: usize) {
        if index >= self.count {
            return;
        }
        for i in index..self.count - 1 {
            self.widgets[i] = self.widgets[i + 1].take();
        }
        self.count -= 1;
        self.widgets[self.count] = None;
    }

    /// Remove all contained widgets.
    pub fn remove_all_widgets(&mut self) {
        for slot in &mut self.widgets {
            *slot = None;
        }
        self.count = 0;
    }

    /// Replace the widget at `index`. Returns false for an invalid index.
    pub fn replace_widget(&mut self, index: usize, widget: Box<dyn Widget>) -> bool {
        if index >= self.count {
            return false;
        }
        self.widgets[index] = Some(widget);
        true
    }

    pub fn widget(&self, index: usize) -> Option<&dyn Widget> {
        self.widgets.get(index)?.as_deref()
    }

    pub fn widget_mut(&mut self, index: usize) -> Option<&mut (dyn Widget + 'static)> {
        match self.widgets.get_mut(index)? {
            Some(w) => Some(w.as_mut()),
            None => None,
        }
    }

    /// The number of contained widgets.
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    fn for_each(&mut self, mut f: impl FnMut(&mut dyn Widget)) {
        for slot in self.widgets.iter_mut().take(self.count) {
            if let Some(widget) = slot {
                f(widget.as_mut());
            }
        }
    }
}

impl<const N: usize> Widget for WidgetContainer<N> {
    fn core(&self) -> &WidgetCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut WidgetCore {
        &mut self.core
    }

    fn begin(&mut self) {
        self.for_each(|w| w.begin());
    }

    fn start(&mut self) {
        self.for_each(|w| w.start());
        self.redraw_required(true);
    }

    fn draw(&mut self) {
        if self.is_hidden() {
            return;
        }
        self.for_each(|w| w.draw());
    }

    fn clear(&mut self) {
        if self.is_hidden() {
            return;
        }
        self.for_each(|w| w.clear());
    }

    fn end(&mut self) {
        self.for_each(|w| w.end());
    }

    fn on_state_changed(&mut self) {
        if self.state() == DisplayState::Hidden {
            return;
        }
        self.redraw_required(true);
    }

    fn redraw_required(&mut self, redraw: bool) {
        self.core.needs_redraw = redraw;
        self.for_each(|w| w.redraw_required(redraw));
    }
}

/// A [`WidgetContainer`] that sizes and positions its children into
/// horizontal slots of its own region.
pub struct RowContainer<const N: usize = 5> {
    inner: WidgetContainer<N>,
    widen_last: bool,
}

impl<const N: usize> RowContainer<N> {
    pub fn new(region: Region) -> Self {
        Self {
            inner: WidgetContainer::new(region),
            widen_last: true,
        }
    }

    /// Add a widget at a row position. The position only determines the
    /// child's region; the returned index addresses the widget.
    pub fn add(&mut self, mut widget: Box<dyn Widget>, position: u8) -> usize {
        if (position as usize) >= N {
            return INVALID_INDEX;
        }
        let row = *self.inner.region();
        place(&row, widget.as_mut(), position, N as u8, self.widen_last);
        self.inner.add_widget(widget)
    }

    /// Recalculate the region of the widget at `index` for `position`.
    pub fn set_widget_region(&mut self, index: usize, position: u8) {
        if (position as usize) >= N {
            return;
        }
        let row = *self.inner.region();
        let widen = self.widen_last;
        if let Some(widget) = self.inner.widget_mut(index) {
            place(&row, widget, position, N as u8, widen);
        }
    }

    /// Whether the last position absorbs the division remainder.
    pub fn set_widen_last(&mut self, widen: bool) {
        self.widen_last = widen;
    }

    pub fn container(&self) -> &WidgetContainer<N> {
        &self.inner
    }

    pub fn container_mut(&mut self) -> &mut WidgetContainer<N> {
        &mut self.inner
    }
}

fn place(row: &Region, widget: &mut dyn Widget, position: u8, slots: u8, widen_last: bool) {
    let region = widget.region_mut();
    region.set_x(row.x_div(slots, position));
    region.set_y(row.y());
    if widen_last && position == slots - 1 {
        let w = row.r() - region.x() + 1;
        region.set_w(w);
    } else {
        region.set_w(row.w_div(slots));
    }
    region.set_h(row.h());
}

impl<const N: usize> Widget for RowContainer<N> {
    fn core(&self) -> &WidgetCore {
        self.inner.core()
    }

    fn core_mut(&mut self) -> &mut WidgetCore {
        self.inner.core_mut()
    }

    fn begin(&mut self) {
        self.inner.begin();
    }

    fn start(&mut self) {
        self.inner.start();
    }

    fn draw(&mut self) {
        self.inner.draw();
    }

    fn clear(&mut self) {
        self.inner.clear();
    }

    fn end(&mut self) {
        self.inner.end();
    }

    fn on_state_changed(&mut self) {
        self.inner.on_state_changed();
    }

    fn redraw_required(&mut self, redraw: bool) {
        self.inner.redraw_required(redraw);
    }
}
