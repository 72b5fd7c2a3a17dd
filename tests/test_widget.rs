//! Tests for `tapkit::widget` and `tapkit::icon` - widget state handling,
//! capability traits, containers, and icon parameters.

use std::cell::RefCell;
use std::rc::Rc;

use tapkit::engine::TouchSnapshot;
use tapkit::event::EventKind;
use tapkit::geom::Region;
use tapkit::icon::{Icon, IconParams, disabled_grey};
use tapkit::source::TouchPoint;
use tapkit::widget::{
    DisplayState, EventSlot, INVALID_INDEX, IconSlot, Iconic, Pinned, RowContainer, Touchable,
    VirtualPin, Widget, WidgetContainer, WidgetCore,
};

// -- Test widget ----------------------------------------------

#[derive(Default)]
struct Counts {
    began: u32,
    started: u32,
    drawn: u32,
    cleared: u32,
    ended: u32,
    state_changes: u32,
}

struct TestWidget {
    core: WidgetCore,
    counts: Rc<RefCell<Counts>>,
}

impl TestWidget {
    fn new(region: Region) -> (Self, Rc<RefCell<Counts>>) {
        let counts = Rc::new(RefCell::new(Counts::default()));
        (
            Self {
                core: WidgetCore::new(region),
                counts: Rc::clone(&counts),
            },
            counts,
        )
    }
}

impl Widget for TestWidget {
    fn core(&self) -> &WidgetCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut WidgetCore {
        &mut self.core
    }

    fn begin(&mut self) {
        self.counts.borrow_mut().began += 1;
    }

    fn start(&mut self) {
        self.counts.borrow_mut().started += 1;
    }

    fn draw(&mut self) {
        self.counts.borrow_mut().drawn += 1;
    }

    fn clear(&mut self) {
        self.counts.borrow_mut().cleared += 1;
    }

    fn end(&mut self) {
        self.counts.borrow_mut().ended += 1;
    }

    fn on_state_changed(&mut self) {
        self.counts.borrow_mut().state_changes += 1;
    }
}

fn region() -> Region {
    Region::new(0, 0, 100, 40)
}

// -- Display state --------------------------------------------

#[test]
fn test_state_change_records_previous() {
    let (mut widget, counts) = TestWidget::new(region());
    assert_eq!(widget.state(), DisplayState::None);

    widget.set_state(DisplayState::Enabled);
    widget.set_state(DisplayState::Pressed);
    assert_eq!(widget.state(), DisplayState::Pressed);
    assert_eq!(widget.previous_state(), DisplayState::Enabled);
    assert!(widget.is_state(DisplayState::Pressed));
    assert_eq!(counts.borrow().state_changes, 2);
}

#[test]
fn test_same_state_is_not_a_change() {
    let (mut widget, counts) = TestWidget::new(region());
    widget.set_state(DisplayState::Enabled);
    widget.set_state(DisplayState::Enabled);
    assert_eq!(counts.borrow().state_changes, 1);
}

#[test]
fn test_hidden() {
    let (mut widget, _) = TestWidget::new(region());
    assert!(!widget.is_hidden());
    widget.set_state(DisplayState::Hidden);
    assert!(widget.is_hidden());
}

// -- Redraw and colours ---------------------------------------

#[test]
fn test_redraw_flag_starts_set() {
    let (mut widget, _) = TestWidget::new(region());
    assert!(widget.is_redraw_required());
    widget.redraw_required(false);
    assert!(!widget.is_redraw_required());
}

#[test]
fn test_colour_change_marks_redraw() {
    let (mut widget, _) = TestWidget::new(region());
    widget.redraw_required(false);

    // Setting the current colour again is a no-op.
    widget.set_fg_colour(widget.fg_colour());
    assert!(!widget.is_redraw_required());

    widget.set_fg_colour(0xF800);
    assert_eq!(widget.fg_colour(), 0xF800);
    assert!(widget.is_redraw_required());

    widget.redraw_required(false);
    widget.set_bg_colour(0x07E0);
    assert_eq!(widget.bg_colour(), 0x07E0);
    assert!(widget.is_redraw_required());
}

#[test]
fn test_widget_id_and_value() {
    let (mut widget, _) = TestWidget::new(region());
    widget.set_widget_id(7);
    widget.set_widget_value(42);
    assert_eq!(widget.widget_id(), 7);
    assert_eq!(widget.widget_value(), 42);
}

// -- EventSlot ------------------------------------------------

#[test]
fn test_event_slot_invoke() {
    let mut slot: EventSlot<TestWidget> = EventSlot::default();
    let (mut widget, _) = TestWidget::new(region());

    assert!(!slot.is_set());
    assert!(!slot.invoke(EventKind::Clicked, &mut widget));

    let fired = Rc::new(RefCell::new(Vec::new()));
    let fired_clone = Rc::clone(&fired);
    slot.set(move |kind, w: &mut TestWidget| {
        fired_clone.borrow_mut().push(kind);
        w.set_state(DisplayState::Pressed);
    });
    assert!(slot.is_set());
    assert!(slot.invoke(EventKind::Clicked, &mut widget));
    assert_eq!(*fired.borrow(), vec![EventKind::Clicked]);
    assert_eq!(widget.state(), DisplayState::Pressed);

    slot.unset();
    assert!(!slot.invoke(EventKind::Clicked, &mut widget));
}

// -- Touchable / Pinned ---------------------------------------

struct TestPin {
    presses: Rc<RefCell<Vec<&'static str>>>,
}

impl VirtualPin for TestPin {
    fn press(&mut self) {
        self.presses.borrow_mut().push("press");
    }

    fn release(&mut self) {
        self.presses.borrow_mut().push("release");
    }
}

struct PinWidget {
    core: WidgetCore,
    pin: Option<TestPin>,
}

impl Widget for PinWidget {
    fn core(&self) -> &WidgetCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut WidgetCore {
        &mut self.core
    }

    fn start(&mut self) {}
    fn draw(&mut self) {}
    fn clear(&mut self) {}
    fn end(&mut self) {}
    fn on_state_changed(&mut self) {}
}

impl Pinned for PinWidget {
    fn virtual_pin(&mut self) -> Option<&mut dyn VirtualPin> {
        match self.pin.as_mut() {
            Some(pin) => Some(pin),
            None => None,
        }
    }
}

fn snapshot(x: u16, y: u16, start_x: u16, start_y: u16) -> TouchSnapshot {
    TouchSnapshot {
        point: TouchPoint::new(x, y, 1),
        start: TouchPoint::new(start_x, start_y, 1),
    }
}

#[test]
fn test_pin_press_and_release_inside() {
    let presses = Rc::new(RefCell::new(Vec::new()));
    let mut widget = PinWidget {
        core: WidgetCore::new(Region::new(0, 0, 50, 50)),
        pin: Some(TestPin {
            presses: Rc::clone(&presses),
        }),
    };

    assert!(widget.pin_on_touch_event(EventKind::Pressed, snapshot(10, 10, 10, 10)));
    // The finger slid outside, but the session started inside: released.
    assert!(widget.pin_on_touch_event(EventKind::Released, snapshot(90, 90, 10, 10)));
    assert_eq!(*presses.borrow(), vec!["press", "release"]);
}

#[test]
fn test_pin_ignores_outside_touches() {
    let presses = Rc::new(RefCell::new(Vec::new()));
    let mut widget = PinWidget {
        core: WidgetCore::new(Region::new(0, 0, 50, 50)),
        pin: Some(TestPin {
            presses: Rc::clone(&presses),
        }),
    };

    assert!(!widget.pin_on_touch_event(EventKind::Pressed, snapshot(90, 90, 90, 90)));
    assert!(!widget.pin_on_touch_event(EventKind::Released, snapshot(90, 90, 90, 90)));
    assert!(presses.borrow().is_empty());
}

#[test]
fn test_pinned_without_pin() {
    let mut widget = PinWidget {
        core: WidgetCore::new(Region::new(0, 0, 50, 50)),
        pin: None,
    };
    assert!(!widget.press_virtual_pin());
    assert!(!widget.pin_on_touch_event(EventKind::Pressed, snapshot(10, 10, 10, 10)));
}

// -- Iconic ---------------------------------------------------

#[derive(Default)]
struct ProbeIcon {
    drawn: RefCell<Vec<(Region, IconParams)>>,
}

impl Icon for ProbeIcon {
    fn draw_icon(&self, region: Region, params: IconParams) {
        self.drawn.borrow_mut().push((region, params));
    }
}

struct IconWidget {
    core: WidgetCore,
    slot: IconSlot,
}

impl Widget for IconWidget {
    fn core(&self) -> &WidgetCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut WidgetCore {
        &mut self.core
    }

    fn start(&mut self) {}
    fn draw(&mut self) {}
    fn clear(&mut self) {}
    fn end(&mut self) {}
    fn on_state_changed(&mut self) {}
}

impl Iconic for IconWidget {
    fn icon_slot(&self) -> &IconSlot {
        &self.slot
    }

    fn icon_slot_mut(&mut self) -> &mut IconSlot {
        &mut self.slot
    }
}

#[test]
fn test_set_icon_marks_redraw_once() {
    let icon: &'static ProbeIcon = Box::leak(Box::new(ProbeIcon::default()));
    let other: &'static ProbeIcon = Box::leak(Box::new(ProbeIcon::default()));
    let mut widget = IconWidget {
        core: WidgetCore::new(region()),
        slot: IconSlot::default(),
    };
    widget.redraw_required(false);

    widget.set_icon(icon);
    assert!(widget.is_icon(icon));
    assert!(!widget.is_icon(other));
    assert!(widget.is_redraw_required());

    // Setting the same icon again is a no-op.
    widget.redraw_required(false);
    widget.set_icon(icon);
    assert!(!widget.is_redraw_required());
}

#[test]
fn test_icon_params_roundtrip_through_slot() {
    let mut widget = IconWidget {
        core: WidgetCore::new(region()),
        slot: IconSlot::default(),
    };
    widget.set_icon_params(IconParams::default().with_fg(0xF800).with_pad(0.1));
    assert_eq!(widget.icon_params().fg, 0xF800);
    assert_eq!(widget.icon_params().pad, 0.1);
}

// -- Icon drawing and params ----------------------------------

#[test]
fn test_icon_draw_defaults_radius() {
    let icon = ProbeIcon::default();
    icon.draw(Region::new(0, 0, 40, 20), IconParams::default());

    let drawn = icon.drawn.borrow();
    let (region, params) = &drawn[0];
    assert_eq!(region.w(), 40);
    // Half the short side.
    assert_eq!(params.radius, 10);
}

#[test]
fn test_icon_draw_pads_region() {
    let icon = ProbeIcon::default();
    icon.draw(
        Region::new(0, 0, 100, 100),
        IconParams::default().with_pad(10.0),
    );

    let drawn = icon.drawn.borrow();
    let (region, _) = &drawn[0];
    assert_eq!((region.x(), region.w()), (10, 80));
}

#[test]
fn test_icon_draw_greyscales_when_disabled() {
    let icon = ProbeIcon::default();
    icon.draw(
        Region::new(0, 0, 20, 20),
        IconParams::default()
            .with_fg(0xFFFF)
            .with_bg(0x0000)
            .with_enabled(false),
    );

    let drawn = icon.drawn.borrow();
    let (_, params) = &drawn[0];
    assert_eq!(params.fg, disabled_grey(0xFFFF));
    assert_eq!(params.bg, disabled_grey(0x0000));
}

#[test]
fn test_disabled_grey_compresses_extremes() {
    // White darkens, black lightens; both end up mid-band.
    assert_eq!(disabled_grey(0xFFFF), 0xA534);
    assert_eq!(disabled_grey(0x0000), 0x5ACB);
}

#[test]
fn test_icon_params_builders() {
    let params = IconParams::default()
        .with_fg(1)
        .with_bg(2)
        .with_alt(3)
        .with_radius(9)
        .with_pad(0.25)
        .with_enabled(false);
    assert_eq!(params.fg, 1);
    assert_eq!(params.bg, 2);
    assert_eq!(params.alt, 3);
    assert_eq!(params.radius, 9);
    assert_eq!(params.pad, 0.25);
    assert!(!params.enabled);
}

// -- Containers -----------------------------------------------

#[test]
fn test_container_capacity() {
    let mut container: WidgetContainer<2> = WidgetContainer::new(region());
    let (w1, _) = TestWidget::new(region());
    let (w2, _) = TestWidget::new(region());
    let (w3, _) = TestWidget::new(region());

    assert_eq!(container.add_widget(Box::new(w1)), 0);
    assert_eq!(container.add_widget(Box::new(w2)), 1);
    assert_eq!(container.add_widget(Box::new(w3)), INVALID_INDEX);
    assert_eq!(container.len(), 2);
}

#[test]
fn test_container_lifecycle_fanout() {
    let mut container: WidgetContainer<4> = WidgetContainer::new(region());
    let (w1, c1) = TestWidget::new(region());
    let (w2, c2) = TestWidget::new(region());
    container.add_widget(Box::new(w1));
    container.add_widget(Box::new(w2));

    container.begin();
    container.start();
    container.draw();
    container.clear();
    container.end();

    for counts in [&c1, &c2] {
        let counts = counts.borrow();
        assert_eq!(counts.began, 1);
        assert_eq!(counts.started, 1);
        assert_eq!(counts.drawn, 1);
        assert_eq!(counts.cleared, 1);
        assert_eq!(counts.ended, 1);
    }
}

#[test]
fn test_hidden_container_skips_draw_but_not_end() {
    let mut container: WidgetContainer<4> = WidgetContainer::new(region());
    let (w1, c1) = TestWidget::new(region());
    container.add_widget(Box::new(w1));

    container.set_state(DisplayState::Hidden);
    container.draw();
    container.clear();
    container.end();

    let counts = c1.borrow();
    assert_eq!(counts.drawn, 0);
    assert_eq!(counts.cleared, 0);
    assert_eq!(counts.ended, 1);
}

#[test]
fn test_container_redraw_fans_out() {
    let mut container: WidgetContainer<4> = WidgetContainer::new(region());
    let (w1, _) = TestWidget::new(region());
    container.add_widget(Box::new(w1));

    container.redraw_required(false);
    assert!(!container.widget(0).unwrap().is_redraw_required());
    container.redraw_required(true);
    assert!(container.widget(0).unwrap().is_redraw_required());
}

#[test]
fn test_container_remove_shifts_down() {
    let mut container: WidgetContainer<4> = WidgetContainer::new(region());
    for id in 0..3u8 {
        let (mut widget, _) = TestWidget::new(region());
        widget.set_widget_id(id);
        container.add_widget(Box::new(widget));
    }

    container.remove_widget(0);
    assert_eq!(container.len(), 2);
    assert_eq!(container.widget(0).unwrap().widget_id(), 1);
    assert_eq!(container.widget(1).unwrap().widget_id(), 2);
    assert!(container.widget(2).is_none());

    // Out-of-range removal is ignored.
    container.remove_widget(10);
    assert_eq!(container.len(), 2);
}

#[test]
fn test_container_replace_and_clear() {
    let mut container: WidgetContainer<4> = WidgetContainer::new(region());
    let (mut w1, _) = TestWidget::new(region());
    w1.set_widget_id(1);
    container.add_widget(Box::new(w1));

    let (mut w2, _) = TestWidget::new(region());
    w2.set_widget_id(2);
    assert!(container.replace_widget(0, Box::new(w2)));
    assert_eq!(container.widget(0).unwrap().widget_id(), 2);

    let (w3, _) = TestWidget::new(region());
    assert!(!container.replace_widget(5, Box::new(w3)));

    container.remove_all_widgets();
    assert!(container.is_empty());
}

// -- Row container --------------------------------------------

#[test]
fn test_row_container_places_children() {
    let mut row: RowContainer<4> = RowContainer::new(Region::new(0, 10, 100, 20));
    for position in 0..4u8 {
        let (widget, _) = TestWidget::new(Region::new(0, 0, 1, 1));
        assert!(row.add(Box::new(widget), position) != INVALID_INDEX);
    }

    let first = *row.container().widget(0).unwrap().region();
    assert_eq!((first.x(), first.y(), first.w(), first.h()), (0, 10, 25, 20));

    let third = *row.container().widget(2).unwrap().region();
    assert_eq!(third.x(), 50);
    assert_eq!(third.w(), 25);
}

#[test]
fn test_row_container_widens_last_slot() {
    // 102 px does not divide evenly by 4; the last slot absorbs the
    // remainder.
    let mut row: RowContainer<4> = RowContainer::new(Region::new(0, 0, 102, 20));
    for position in 0..4u8 {
        let (widget, _) = TestWidget::new(Region::new(0, 0, 1, 1));
        row.add(Box::new(widget), position);
    }

    let last = *row.container().widget(3).unwrap().region();
    assert_eq!(last.x(), 75);
    assert_eq!(last.w(), 27);
    assert_eq!(last.r(), 101);
}

#[test]
fn test_row_container_without_widen_last() {
    let mut row: RowContainer<4> = RowContainer::new(Region::new(0, 0, 102, 20));
    row.set_widen_last(false);
    let (widget, _) = TestWidget::new(Region::new(0, 0, 1, 1));
    row.add(Box::new(widget), 3);

    let last = *row.container().widget(0).unwrap().region();
    assert_eq!(last.w(), 25);
}

#[test]
fn test_row_container_rejects_out_of_range_position() {
    let mut row: RowContainer<2> = RowContainer::new(Region::new(0, 0, 100, 20));
    let (widget, _) = TestWidget::new(Region::new(0, 0, 1, 1));
    assert_eq!(row.add(Box::new(widget), 2), INVALID_INDEX);
    assert!(row.container().is_empty());
}

// -- Touchable on a plain widget ------------------------------

struct TouchCountingWidget {
    core: WidgetCore,
    touches: u32,
}

impl Widget for TouchCountingWidget {
    fn core(&self) -> &WidgetCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut WidgetCore {
        &mut self.core
    }

    fn start(&mut self) {}
    fn draw(&mut self) {}
    fn clear(&mut self) {}
    fn end(&mut self) {}
    fn on_state_changed(&mut self) {}
}

impl Touchable for TouchCountingWidget {
    fn on_touch_event(&mut self, kind: EventKind, touch: TouchSnapshot) -> bool {
        if kind == EventKind::Pressed && self.region().contains_coords(touch.point.coords()) {
            self.touches += 1;
            return true;
        }
        false
    }
}

#[test]
fn test_touchable_hit_testing() {
    let mut widget = TouchCountingWidget {
        core: WidgetCore::new(Region::new(0, 0, 50, 50)),
        touches: 0,
    };
    assert!(widget.on_touch_event(EventKind::Pressed, snapshot(25, 25, 25, 25)));
    assert!(!widget.on_touch_event(EventKind::Pressed, snapshot(80, 80, 80, 80)));
    assert_eq!(widget.touches, 1);
}
