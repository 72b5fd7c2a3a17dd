//! A touch keypad: keys organised into a grid.
//!
//! The keypad slices its region into `ROWS` x `COLS` cells at construction
//! and keeps a removal flag per key (a removed key is never drawn, hit, or
//! returned). As with other widgets, pixel output is delegated: concrete
//! renderers pass a closure to [`Keypad::draw_pending`].

use crate::engine::TouchSnapshot;
use crate::event::EventKind;
use crate::geom::Region;
use crate::widget::{DisplayState, Touchable, Widget, WidgetCore};

/// One key of a [`Keypad`].
pub struct Key {
    core: WidgetCore,
    row: u8,
    col: u8,
}

impl Key {
    fn new(region: Region, row: u8, col: u8) -> Self {
        Self {
            core: WidgetCore::new(region),
            row,
            col,
        }
    }

    /// The row position of this key in its keypad.
    pub fn row(&self) -> u8 {
        self.row
    }

    /// The column position of this key in its keypad.
    pub fn col(&self) -> u8 {
        self.col
    }
}

impl Widget for Key {
    fn core(&self) -> &WidgetCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut WidgetCore {
        &mut self.core
    }

    fn start(&mut self) {
        self.redraw_required(true);
    }

    fn draw(&mut self) {}

    fn clear(&mut self) {}

    fn end(&mut self) {}

    fn on_state_changed(&mut self) {
        self.redraw_required(true);
    }
}

/// A grid of touch keys.
pub struct Keypad<const ROWS: usize, const COLS: usize> {
    core: WidgetCore,
    keys: [[Key; COLS]; ROWS],
    removed: [[bool; COLS]; ROWS],
}

impl<const ROWS: usize, const COLS: usize> Keypad<ROWS, COLS> {
    pub fn new(region: Region) -> Self {
        let keys = std::array::from_fn(|r| {
            std::array::from_fn(|c| {
                Key::new(
                    Region::new(
                        region.x_div(COLS as u8, c as u8),
                        region.y_div(ROWS as u8, r as u8),
                        region.w_div(COLS as u8),
                        region.h_div(ROWS as u8),
                    ),
                    r as u8,
                    c as u8,
                )
            })
        });
        Self {
            core: WidgetCore::new(region),
            keys,
            removed: [[false; COLS]; ROWS],
        }
    }

    /// Apply a gesture event to the keypad.
    ///
    /// Returns the (row, col) of the live key containing the session's
    /// *start* point, after updating pressed/released key display states,
    /// or `None` when the session did not start inside the keypad.
    pub fn handle_touch(&mut self, kind: EventKind, touch: TouchSnapshot) -> Option<(usize, usize)> {
        if !self.region().contains_coords(touch.start.coords()) {
            return None;
        }
        let mut hit = None;
        for r in 0..ROWS {
            for c in 0..COLS {
                if self.removed[r][c] {
                    continue;
                }
                let key = &mut self.keys[r][c];
                let contains_start = key.region().contains_coords(touch.start.coords());
                if kind == EventKind::Pressed && contains_start {
                    key.set_state(DisplayState::Pressed);
                }
                if kind == EventKind::Released && key.is_state(DisplayState::Pressed) {
                    // Release any key that is pressed.
                    let previous = key.previous_state();
                    key.set_state(previous);
                }
                if contains_start && hit.is_none() {
                    hit = Some((r, c));
                }
            }
        }
        hit
    }

    /// Draw every key requiring a redraw via the passed renderer, then
    /// clear the flags.
    pub fn draw_pending(&mut self, mut render: impl FnMut(&Key)) {
        for r in 0..ROWS {
            for c in 0..COLS {
                if !self.removed[r][c] && self.keys[r][c].is_redraw_required() {
                    render(&self.keys[r][c]);
                    self.keys[r][c].redraw_required(false);
                }
            }
        }
        self.redraw_required(false);
    }

    /// The key at (row, col), or `None` when out of range or removed.
    pub fn key(&self, row: usize, col: usize) -> Option<&Key> {
        if row >= ROWS || col >= COLS || self.removed[row][col] {
            return None;
        }
        Some(&self.keys[row][col])
    }

    pub fn key_mut(&mut self, row: usize, col: usize) -> Option<&mut Key> {
        if row >= ROWS || col >= COLS || self.removed[row][col] {
            return None;
        }
        Some(&mut self.keys[row][col])
    }

    /// The region of a key, even a removed one. Out-of-range positions
    /// yield an empty region.
    pub fn key_region(&self, row: usize, col: usize) -> Region {
        if row >= ROWS || col >= COLS {
            return Region::default();
        }
        *self.keys[row][col].region()
    }

    /// Mark a key as removed (or un-removed with `remove = false`).
    pub fn remove_key(&mut self, row: usize, col: usize, remove: bool) {
        if row >= ROWS || col >= COLS {
            return;
        }
        self.removed[row][col] = remove;
    }
}

impl<const ROWS: usize, const COLS: usize> Widget for Keypad<ROWS, COLS> {
    fn core(&self) -> &WidgetCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut WidgetCore {
        &mut self.core
    }

    /// Enable all keys.
    fn begin(&mut self) {
        for row in &mut self.keys {
            for key in row {
                key.set_state(DisplayState::Enabled);
            }
        }
    }

    fn start(&mut self) {
        for row in &mut self.keys {
            for key in row {
                key.start();
            }
        }
        self.redraw_required(true);
    }

    /// Drawing is delegated to [`Keypad::draw_pending`].
    fn draw(&mut self) {}

    fn clear(&mut self) {}

    fn end(&mut self) {}

    fn on_state_changed(&mut self) {}
}

impl<const ROWS: usize, const COLS: usize> Touchable for Keypad<ROWS, COLS> {
    fn on_touch_event(&mut self, kind: EventKind, touch: TouchSnapshot) -> bool {
        self.handle_touch(kind, touch).is_some()
    }
}
