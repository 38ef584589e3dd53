//! Normalized colors and the sources frames are sampled from.

use std::time::Duration;

/// An RGB color with each channel in `[0.0, 1.0]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const BLACK: Color = Color { r: 0.0, g: 0.0, b: 0.0 };

    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Color { r, g, b }
    }

    /// Parse a `RRGGBB` hex string (leading `#` optional)
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        Some(Color::new(
            channel(0)? as f32 / 255.0,
            channel(2)? as f32 / 255.0,
            channel(4)? as f32 / 255.0,
        ))
    }

    /// Convert from hue (turns, wraps) at full saturation and value
    pub fn from_hue(hue: f32) -> Self {
        let h = hue.rem_euclid(1.0) * 6.0;
        let x = 1.0 - (h % 2.0 - 1.0).abs();
        let (r, g, b) = match h as u32 {
            0 => (1.0, x, 0.0),
            1 => (x, 1.0, 0.0),
            2 => (0.0, 1.0, x),
            3 => (0.0, x, 1.0),
            4 => (x, 0.0, 1.0),
            _ => (1.0, 0.0, x),
        };
        Color::new(r, g, b)
    }

    /// Linear blend towards `other`, `t` in `[0, 1]`
    pub fn lerp(self, other: Color, t: f32) -> Self {
        let t = t.clamp(0.0, 1.0);
        Color::new(
            self.r + (other.r - self.r) * t,
            self.g + (other.g - self.g) * t,
            self.b + (other.b - self.b) * t,
        )
    }

    pub fn clamped(self) -> Self {
        Color::new(
            self.r.clamp(0.0, 1.0),
            self.g.clamp(0.0, 1.0),
            self.b.clamp(0.0, 1.0),
        )
    }

    /// Wire bytes. Each channel is scaled by 255 and truncated, never rounded.
    pub fn to_bytes(self) -> [u8; 3] {
        [
            (self.r * 255.0) as u8,
            (self.g * 255.0) as u8,
            (self.b * 255.0) as u8,
        ]
    }
}

/// Anything that can be sampled at a canvas coordinate.
///
/// The frame encoder queries each source exactly once per LED per frame.
pub trait ColorSource {
    fn sample(&self, x: usize, y: usize) -> Color;

    /// Called whenever the device canvas changes size
    fn set_canvas(&mut self, _width: usize, _height: usize) {}

    /// Advance animated sources by `elapsed`
    fn tick(&mut self, _elapsed: Duration) {}
}

/// Same color everywhere
#[derive(Debug, Clone)]
pub struct Solid(pub Color);

impl ColorSource for Solid {
    fn sample(&self, _x: usize, _y: usize) -> Color {
        self.0.clamped()
    }
}

/// Hue wheel spread over the long axis of the canvas, rotating over time
#[derive(Debug, Clone)]
pub struct Rainbow {
    length: usize,
    horizontal: bool,
    phase: f32,
    /// Full rotations per second
    speed: f32,
}

impl Rainbow {
    pub fn new(speed: f32) -> Self {
        Rainbow { length: 1, horizontal: false, phase: 0.0, speed }
    }
}

impl ColorSource for Rainbow {
    fn sample(&self, x: usize, y: usize) -> Color {
        let pos = if self.horizontal { x } else { y };
        Color::from_hue(pos as f32 / self.length as f32 + self.phase)
    }

    fn set_canvas(&mut self, width: usize, height: usize) {
        self.horizontal = width > height;
        self.length = width.max(height).max(1);
    }

    fn tick(&mut self, elapsed: Duration) {
        self.phase = (self.phase + elapsed.as_secs_f32() * self.speed).rem_euclid(1.0);
    }
}

/// Static two-color gradient along the long axis of the canvas
#[derive(Debug, Clone)]
pub struct Gradient {
    from: Color,
    to: Color,
    length: usize,
    horizontal: bool,
}

impl Gradient {
    pub fn new(from: Color, to: Color) -> Self {
        Gradient { from, to, length: 1, horizontal: false }
    }
}

impl ColorSource for Gradient {
    fn sample(&self, x: usize, y: usize) -> Color {
        let pos = if self.horizontal { x } else { y };
        let span = self.length.saturating_sub(1).max(1) as f32;
        self.from.lerp(self.to, pos as f32 / span).clamped()
    }

    fn set_canvas(&mut self, width: usize, height: usize) {
        self.horizontal = width > height;
        self.length = width.max(height).max(1);
    }
}
