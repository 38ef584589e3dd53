mod adalight;

pub use adalight::{build_adalight_frame, build_blackout_frame, build_header, HEADER_LEN, MAX_LEDS};
