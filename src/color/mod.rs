//! Colors as the grammar sees them: 8-bit RGBA values, the HSV space the
//! color operators work in, the named-color table and color pools.
pub mod named;
pub mod pool;

pub use pool::ColorPool;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

/// Hue in degrees `[0, 360)`, saturation and value in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hsv {
    pub h: f64,
    pub s: f64,
    pub v: f64,
}

impl Default for Rgba {
    fn default() -> Self {
        Rgba::WHITE
    }
}

impl Rgba {
    pub const WHITE: Rgba = Rgba::rgb(0xff, 0xff, 0xff);
    pub const RED: Rgba = Rgba::rgb(0xff, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 0xff)
    }

    /// Decode the digits of a `#` literal (without the `#`).
    ///
    /// Accepted lengths:
    ///   • 3  `rgb`          – each nibble doubled (`f` → `ff`)
    ///   • 4  `argb`         – each nibble doubled
    ///   • 6  `rrggbb`
    ///   • 8  `aarrggbb`
    ///   • 9  `rrrgggbbb`    – top two digits of each channel
    ///   • 12 `rrrrggggbbbb` – top two digits of each channel
    pub fn from_hex(digits: &str) -> Option<Rgba> {
        let n: Vec<u8> = digits
            .chars()
            .map(|c| c.to_digit(16).map(|d| d as u8))
            .collect::<Option<_>>()?;

        let short = |i: usize| n[i] * 17;
        let pair = |i: usize| n[i] * 16 + n[i + 1];

        let rgba = match n.len() {
            3 => Rgba::rgb(short(0), short(1), short(2)),
            4 => Rgba::new(short(1), short(2), short(3), short(0)),
            6 => Rgba::rgb(pair(0), pair(2), pair(4)),
            8 => Rgba::new(pair(2), pair(4), pair(6), pair(0)),
            9 => Rgba::rgb(pair(0), pair(3), pair(6)),
            12 => Rgba::rgb(pair(0), pair(4), pair(8)),
            _ => return None,
        };
        Some(rgba)
    }

    pub fn to_hsv(self) -> Hsv {
        let r = self.r as f64 / 255.0;
        let g = self.g as f64 / 255.0;
        let b = self.b as f64 / 255.0;

        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let delta = max - min;

        let h = if delta == 0.0 {
            0.0
        } else if max == r {
            60.0 * ((g - b) / delta).rem_euclid(6.0)
        } else if max == g {
            60.0 * ((b - r) / delta + 2.0)
        } else {
            60.0 * ((r - g) / delta + 4.0)
        };
        let s = if max == 0.0 { 0.0 } else { delta / max };

        Hsv { h, s, v: max }
    }

    /// Six-sextant HSV → RGB. The hue wraps; `s` and `v` are clamped.
    pub fn from_hsv(hsv: Hsv, alpha: u8) -> Rgba {
        let h = hsv.h.rem_euclid(360.0);
        let s = hsv.s.clamp(0.0, 1.0);
        let v = hsv.v.clamp(0.0, 1.0);

        let c = v * s;
        let sector = h / 60.0;
        let x = c * (1.0 - (sector.rem_euclid(2.0) - 1.0).abs());
        let m = v - c;

        let (r, g, b) = match sector as u32 {
            0 => (c, x, 0.0),
            1 => (x, c, 0.0),
            2 => (0.0, c, x),
            3 => (0.0, x, c),
            4 => (x, 0.0, c),
            _ => (c, 0.0, x),
        };

        let channel = |f: f64| ((f + m) * 255.0).round().clamp(0.0, 255.0) as u8;
        Rgba::new(channel(r), channel(g), channel(b), alpha)
    }

    /// Interpolate towards `target` in HSV space.
    ///
    /// The hue travels the shorter way round the circle. A target with no
    /// saturation or no value has no meaningful hue, so the source hue is kept.
    pub fn blend(self, target: Rgba, strength: f64) -> Rgba {
        let t = strength.clamp(0.0, 1.0);
        let from = self.to_hsv();
        let to = target.to_hsv();

        let to_h = if to.s == 0.0 || to.v == 0.0 {
            from.h
        } else {
            to.h
        };
        let mut dh = to_h - from.h;
        if dh > 180.0 {
            dh -= 360.0;
        } else if dh < -180.0 {
            dh += 360.0;
        }

        let mixed = Hsv {
            h: (from.h + dh * t).rem_euclid(360.0),
            s: from.s + (to.s - from.s) * t,
            v: from.v + (to.v - from.v) * t,
        };
        Rgba::from_hsv(mixed, self.a)
    }
}
