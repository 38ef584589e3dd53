//! Device geometry: how LED indices map onto the color canvas.

use clap::ValueEnum;

/// Fixed canvas height of the vertical strip device
pub const VERTICAL_ROWS: usize = 120;

/// Coordinate mapping strategy for one device shape
pub trait Geometry {
    /// Canvas size `(width, height)` for the given LED count
    fn canvas(&self, led_count: usize) -> (usize, usize);

    /// Canvas coordinate `(x, y)` sampled for LED `index`
    fn map(&self, index: usize, led_count: usize) -> (usize, usize);
}

/// 1 pixel wide strip of fixed height, LEDs spread linearly over the rows
#[derive(Debug, Clone, Copy)]
pub struct VerticalStrip {
    pub rows: usize,
}

impl Default for VerticalStrip {
    fn default() -> Self {
        VerticalStrip { rows: VERTICAL_ROWS }
    }
}

impl Geometry for VerticalStrip {
    fn canvas(&self, _led_count: usize) -> (usize, usize) {
        (1, self.rows)
    }

    fn map(&self, index: usize, led_count: usize) -> (usize, usize) {
        // floor(index / led_count * rows), in integers
        (0, index * self.rows / led_count.max(1))
    }
}

/// `led_count` pixels wide, one tall; LED 0 sits at the rightmost column
#[derive(Debug, Clone, Copy, Default)]
pub struct HorizontalReversed;

impl Geometry for HorizontalReversed {
    fn canvas(&self, led_count: usize) -> (usize, usize) {
        (led_count, 1)
    }

    fn map(&self, index: usize, led_count: usize) -> (usize, usize) {
        (led_count.saturating_sub(1).saturating_sub(index), 0)
    }
}

/// Built-in device shapes selectable from the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum VariantKind {
    Vertical,
    Horizontal,
}

/// A device variant: its shape plus the defaults the host starts from
pub struct DeviceVariant {
    pub name: &'static str,
    pub default_led_count: usize,
    pub geometry: Box<dyn Geometry + Send>,
}

impl DeviceVariant {
    pub fn vertical() -> Self {
        DeviceVariant {
            name: "Adalight",
            default_led_count: 120,
            geometry: Box::new(VerticalStrip::default()),
        }
    }

    pub fn horizontal() -> Self {
        DeviceVariant {
            name: "Adalight Horizontal",
            default_led_count: 60,
            geometry: Box::new(HorizontalReversed),
        }
    }

    pub fn canvas(&self, led_count: usize) -> (usize, usize) {
        self.geometry.canvas(led_count)
    }
}

impl From<VariantKind> for DeviceVariant {
    fn from(kind: VariantKind) -> Self {
        match kind {
            VariantKind::Vertical => DeviceVariant::vertical(),
            VariantKind::Horizontal => DeviceVariant::horizontal(),
        }
    }
}

impl std::fmt::Debug for DeviceVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceVariant")
            .field("name", &self.name)
            .field("default_led_count", &self.default_led_count)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertical_identity_at_full_count() {
        let geometry = VerticalStrip::default();
        for i in 0..120 {
            assert_eq!(geometry.map(i, 120), (0, i));
        }
    }

    #[test]
    fn test_vertical_spreads_short_strip() {
        let geometry = VerticalStrip::default();
        assert_eq!(geometry.map(0, 60), (0, 0));
        assert_eq!(geometry.map(1, 60), (0, 2));
        assert_eq!(geometry.map(59, 60), (0, 118));
        assert_eq!(geometry.map(0, 1), (0, 0));
        assert_eq!(geometry.canvas(60), (1, 120));
    }

    #[test]
    fn test_horizontal_reversed() {
        let geometry = HorizontalReversed;
        assert_eq!(geometry.map(0, 60), (59, 0));
        assert_eq!(geometry.map(59, 60), (0, 0));
        assert_eq!(geometry.canvas(60), (60, 1));
    }

    #[test]
    fn test_variant_defaults() {
        assert_eq!(DeviceVariant::vertical().default_led_count, 120);
        assert_eq!(DeviceVariant::horizontal().default_led_count, 60);
        assert_eq!(DeviceVariant::from(VariantKind::Horizontal).canvas(30), (30, 1));
    }
}
