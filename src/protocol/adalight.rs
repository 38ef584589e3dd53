use crate::color::ColorSource;
use crate::geometry::Geometry;

/// Largest LED count a single Adalight frame is built for
pub const MAX_LEDS: usize = 120;

/// Header length: 'Ada' + LED count high + LED count low + checksum
pub const HEADER_LEN: usize = 6;

const MAGIC: [u8; 3] = [0x41, 0x64, 0x61]; // 'Ada'

/// Build the 6-byte Adalight header for `led_count` LEDs
pub fn build_header(led_count: usize) -> [u8; HEADER_LEN] {
    // The count on the wire is N-1
    let count = led_count.saturating_sub(1);
    let count_hi = (count >> 8) as u8;
    let count_lo = (count & 0xFF) as u8;
    let checksum = count_hi ^ count_lo ^ 0x55;

    [MAGIC[0], MAGIC[1], MAGIC[2], count_hi, count_lo, checksum]
}

/// Build an Adalight frame by sampling `source` once per LED.
///
/// `led_count` must already be clamped into `[1, MAX_LEDS]`.
pub fn build_adalight_frame(
    led_count: usize,
    source: &dyn ColorSource,
    geometry: &dyn Geometry,
) -> Vec<u8> {
    let mut frame = Vec::with_capacity(HEADER_LEN + led_count * 3);

    // Header
    frame.extend_from_slice(&build_header(led_count));

    // Pixel data, RGB order
    for index in 0..led_count {
        let (x, y) = geometry.map(index, led_count);
        frame.extend_from_slice(&source.sample(x, y).to_bytes());
    }

    frame
}

/// Build an all-black Adalight frame used to darken the strip
pub fn build_blackout_frame(led_count: usize) -> Vec<u8> {
    let mut frame = Vec::with_capacity(HEADER_LEN + led_count * 3);
    frame.extend_from_slice(&build_header(led_count));
    frame.resize(HEADER_LEN + led_count * 3, 0);
    frame
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;
    use crate::geometry::{HorizontalReversed, VerticalStrip};
    use std::cell::RefCell;

    struct Fixed(Color);

    impl ColorSource for Fixed {
        fn sample(&self, _x: usize, _y: usize) -> Color {
            self.0
        }
    }

    /// Records every coordinate sampled and encodes x into red, y into green
    struct CoordinateRecorder {
        sampled: RefCell<Vec<(usize, usize)>>,
    }

    impl ColorSource for CoordinateRecorder {
        fn sample(&self, x: usize, y: usize) -> Color {
            self.sampled.borrow_mut().push((x, y));
            Color::new((x as f32 + 0.5) / 255.0, (y as f32 + 0.5) / 255.0, 0.0)
        }
    }

    #[test]
    fn test_header_for_120_leds() {
        assert_eq!(build_header(120), [0x41, 0x64, 0x61, 0x00, 0x77, 0x22]);
    }

    #[test]
    fn test_header_for_60_leds() {
        assert_eq!(build_header(60), [0x41, 0x64, 0x61, 0x00, 0x3B, 0x6E]);
    }

    #[test]
    fn test_frame_length_and_checksum_for_every_count() {
        let source = Fixed(Color::new(0.5, 0.5, 0.5));
        for n in 1..=MAX_LEDS {
            let frame = build_adalight_frame(n, &source, &VerticalStrip::default());
            assert_eq!(frame.len(), HEADER_LEN + 3 * n);
            assert_eq!(&frame[..3], b"Ada");
            assert_eq!(frame[5], frame[3] ^ frame[4] ^ 0x55);
        }
    }

    #[test]
    fn test_channels_are_truncated() {
        // 0.999 * 255 = 254.745 -> 254, 0.5 * 255 = 127.5 -> 127
        let source = Fixed(Color::new(0.999, 0.5, 1.0));
        let frame = build_adalight_frame(1, &source, &VerticalStrip::default());
        assert_eq!(&frame[HEADER_LEN..], &[254, 127, 255]);
    }

    #[test]
    fn test_frame_follows_geometry_order() {
        let recorder = CoordinateRecorder { sampled: RefCell::new(Vec::new()) };
        let frame = build_adalight_frame(4, &recorder, &HorizontalReversed);

        assert_eq!(*recorder.sampled.borrow(), vec![(3, 0), (2, 0), (1, 0), (0, 0)]);
        assert_eq!(&frame[HEADER_LEN..HEADER_LEN + 3], &[3, 0, 0]);
        assert_eq!(&frame[frame.len() - 3..], &[0, 0, 0]);
    }

    #[test]
    fn test_blackout_frame() {
        for n in [1, 60, 120] {
            let frame = build_blackout_frame(n);
            assert_eq!(frame.len(), HEADER_LEN + 3 * n);
            assert_eq!(&frame[..HEADER_LEN], &build_header(n));
            assert!(frame[HEADER_LEN..].iter().all(|&b| b == 0));
        }
    }
}
