//! Stateless icons and their drawing parameters.
//!
//! An `Icon` holds no state of its own: everything that varies between
//! draws (colours, padding, radius, enabled) travels in `IconParams`.
//! Colours are RGB565; the disabled state is rendered by converting all
//! three colours to a compressed greyscale band.

use crate::geom::Region;

/// Parameters passed to an icon to alter its drawn state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IconParams {
    /// Foreground colour.
    pub fg: u16,
    /// Background colour.
    pub bg: u16,
    /// An alternate colour.
    pub alt: u16,
    /// If false, the colours are greyscaled before drawing.
    pub enabled: bool,
    pub scale: f32,
    /// Radius of a circular icon; 0 defaults to half the short side.
    pub radius: u16,
    /// 0 = no pad, >=1 = pixels, 0 to <1 = percentage of the region.
    pub pad: f32,
}

impl Default for IconParams {
    fn default() -> Self {
        Self {
            fg: 0xFFFF,
            bg: 0x0000,
            alt: 0,
            enabled: true,
            scale: 1.0,
            radius: 0,
            pad: 0.0,
        }
    }
}

impl IconParams {
    /// A copy of the params with the passed enabled flag.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// A copy of the params with the passed foreground colour.
    pub fn with_fg(mut self, fg: u16) -> Self {
        self.fg = fg;
        self
    }

    /// A copy of the params with the passed background colour.
    pub fn with_bg(mut self, bg: u16) -> Self {
        self.bg = bg;
        self
    }

    /// A copy of the params with the passed alternate colour.
    pub fn with_alt(mut self, alt: u16) -> Self {
        self.alt = alt;
        self
    }

    /// A copy of the params with the passed radius.
    pub fn with_radius(mut self, radius: u16) -> Self {
        self.radius = radius;
        self
    }

    /// A copy of the params with the passed padding.
    pub fn with_pad(mut self, pad: f32) -> Self {
        self.pad = pad;
        self
    }

    /// Convert all three colours to greyscale.
    pub fn to_greyscale(&mut self) {
        self.fg = disabled_grey(self.fg);
        self.bg = disabled_grey(self.bg);
        self.alt = disabled_grey(self.alt);
    }
}

/// Convert an RGB565 colour to the greyscale used for disabled widgets.
///
/// Weighted luma, remapped into a compressed band so white comes out a bit
/// darker and black a bit lighter.
pub fn disabled_grey(color: u16) -> u16 {
    let r5 = (color >> 11) & 0x1f;
    let g6 = (color >> 5) & 0x3f;
    let b5 = color & 0x1f;

    // To 8-bit per channel.
    let r = (r5 as i32 * 527 + 23) >> 6;
    let g = (g6 as i32 * 259 + 33) >> 6;
    let b = (b5 as i32 * 527 + 23) >> 6;

    // Weighted luma.
    let grey = (77 * r + 150 * g + 29 * b) >> 8;

    // Remap from 0-255 to 64-192, then pull toward the midpoint.
    let grey = (grey >> 1) + 64;
    let grey = 128 + (grey - 128) * 70 / 120;

    // Back to 5/6/5.
    let grey = grey.clamp(0, 255) as u16;
    ((grey >> 3) << 11) | ((grey >> 2) << 5) | (grey >> 3)
}

/// The icon drawing contract.
///
/// `draw` prepares the region and params (greyscale when disabled, apply
/// padding, default the radius) and hands off to `draw_icon`, which the
/// concrete icon implements against its drawing backend.
pub trait Icon {
    /// Draw the icon into `region` using `params`. Normally called instead
    /// of `draw_icon`.
    fn draw(&self, mut region: Region, mut params: IconParams) {
        if !params.enabled {
            params.to_greyscale();
        }
        if params.pad != 0.0 {
            region.pad(params.pad);
        }
        if params.radius == 0 {
            params.radius = region.h().min(region.w()) / 2;
        }
        self.draw_icon(region, params);
    }

    /// Actually draw the icon. Implemented by concrete icons, normally
    /// called via `draw`.
    fn draw_icon(&self, region: Region, params: IconParams);
}
