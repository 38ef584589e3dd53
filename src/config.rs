use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use crate::protocol::MAX_LEDS;

/// Port used when the host leaves the setting empty
pub const DEFAULT_PORT: &str = "COM4";

/// Settings exactly as the host stores them.
///
/// Values arrive as numbers or as text; nothing is validated here.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct HostSettings {
    #[serde(default, deserialize_with = "loose_string")]
    pub led_count: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub baud_rate: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub port: Option<String>,
}

impl HostSettings {
    pub fn new(led_count: impl ToString, baud_rate: impl ToString, port: impl ToString) -> Self {
        HostSettings {
            led_count: Some(led_count.to_string()),
            baud_rate: Some(baud_rate.to_string()),
            port: Some(port.to_string()),
        }
    }

    /// Fill in the port when the host has not set one
    pub fn or_port(mut self, port: &str) -> Self {
        if self.port.as_deref().map_or(true, |p| p.trim().is_empty()) {
            self.port = Some(port.to_string());
        }
        self
    }

    /// Clamped LED count, or `default` when the value does not parse
    pub fn led_count(&self, default: usize) -> usize {
        match self.led_count.as_deref().and_then(parse_leading_int) {
            Some(n) => n.clamp(1, MAX_LEDS as i64) as usize,
            None => default.clamp(1, MAX_LEDS),
        }
    }

    pub fn baud_rate(&self) -> BaudRate {
        self.baud_rate
            .as_deref()
            .and_then(BaudRate::parse)
            .unwrap_or_default()
    }

    pub fn port(&self) -> String {
        match self.port.as_deref().map(str::trim) {
            Some(port) if !port.is_empty() => port.to_string(),
            _ => DEFAULT_PORT.to_string(),
        }
    }
}

/// Leading integer of `value`: optional sign then digits, the rest ignored.
///
/// `"60.5"` reads as 60, `"460800.0"` as 460800. Values beyond `i64`
/// saturate so they still clamp. `None` when there are no leading digits.
fn parse_leading_int(value: &str) -> Option<i64> {
    let value = value.trim_start();
    let (negative, digits) = match value.as_bytes().first() {
        Some(b'-') => (true, &value[1..]),
        Some(b'+') => (false, &value[1..]),
        _ => (false, value),
    };

    let mut seen = false;
    let mut n: i64 = 0;
    for digit in digits.bytes().map_while(|b| (b as char).to_digit(10)) {
        seen = true;
        n = n.saturating_mul(10).saturating_add(digit as i64);
    }
    if !seen {
        return None;
    }
    Some(if negative { -n } else { n })
}

/// Accept a JSON string or number and keep it as text
fn loose_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Loose {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(Option::<Loose>::deserialize(deserializer)?.map(|value| match value {
        Loose::Text(text) => text,
        Loose::Number(number) => number.to_string(),
    }))
}

/// Baud rates the device firmware accepts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BaudRate {
    #[default]
    B115200,
    B460800,
    B500000,
}

impl BaudRate {
    pub const ALL: [BaudRate; 3] = [BaudRate::B115200, BaudRate::B460800, BaudRate::B500000];

    pub fn as_u32(self) -> u32 {
        match self {
            BaudRate::B115200 => 115_200,
            BaudRate::B460800 => 460_800,
            BaudRate::B500000 => 500_000,
        }
    }

    /// `None` for anything that is not one of the supported rates
    pub fn parse(value: &str) -> Option<Self> {
        let rate = u32::try_from(parse_leading_int(value)?).ok()?;
        BaudRate::ALL.into_iter().find(|b| b.as_u32() == rate)
    }
}

impl fmt::Display for BaudRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u32())
    }
}

/// Live device configuration owned by the connection manager
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceConfig {
    pub port: String,
    pub baud_rate: BaudRate,
    pub led_count: usize,
}

impl DeviceConfig {
    pub fn from_settings(settings: &HostSettings, default_led_count: usize) -> Self {
        DeviceConfig {
            port: settings.port(),
            baud_rate: settings.baud_rate(),
            led_count: settings.led_count(default_led_count),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_led_count_clamps() {
        assert_eq!(HostSettings::new(0, 115200, "COM4").led_count(120), 1);
        assert_eq!(HostSettings::new(-5, 115200, "COM4").led_count(120), 1);
        assert_eq!(HostSettings::new(500, 115200, "COM4").led_count(120), 120);
        assert_eq!(HostSettings::new(42, 115200, "COM4").led_count(120), 42);
    }

    #[test]
    fn test_unparseable_values_fall_back() {
        let settings = HostSettings::new("lots", "fast", "   ");
        assert_eq!(settings.led_count(60), 60);
        assert_eq!(settings.baud_rate(), BaudRate::B115200);
        assert_eq!(settings.port(), DEFAULT_PORT);

        let empty = HostSettings::default();
        assert_eq!(DeviceConfig::from_settings(&empty, 120), DeviceConfig {
            port: "COM4".to_string(),
            baud_rate: BaudRate::B115200,
            led_count: 120,
        });
    }

    #[test]
    fn test_baud_rate_parse() {
        assert_eq!(BaudRate::parse("460800"), Some(BaudRate::B460800));
        assert_eq!(BaudRate::parse(" 500000 "), Some(BaudRate::B500000));
        assert_eq!(BaudRate::parse("9600"), None);
        assert_eq!(HostSettings::new(60, 9600, "COM4").baud_rate(), BaudRate::B115200);
    }

    #[test]
    fn test_deserialize_numbers_and_strings() {
        let settings: HostSettings =
            serde_json::from_str(r#"{"led_count": 60, "baud_rate": "500000", "port": "/dev/ttyUSB0"}"#)
                .unwrap();
        assert_eq!(settings.led_count(120), 60);
        assert_eq!(settings.baud_rate(), BaudRate::B500000);
        assert_eq!(settings.port(), "/dev/ttyUSB0");

        let partial: HostSettings = serde_json::from_str(r#"{"port": "COM7"}"#).unwrap();
        assert_eq!(partial.led_count, None);
        assert_eq!(partial.port(), "COM7");
    }

    #[test]
    fn test_led_count_reads_leading_integer() {
        assert_eq!(HostSettings::new("60.5", 115200, "COM4").led_count(120), 60);
        assert_eq!(HostSettings::new(" 42 leds", 115200, "COM4").led_count(120), 42);
        assert_eq!(HostSettings::new("+7", 115200, "COM4").led_count(120), 7);
        assert_eq!(HostSettings::new("99999999999999999999", 115200, "COM4").led_count(60), 120);
        assert_eq!(HostSettings::new("-99999999999999999999", 115200, "COM4").led_count(60), 1);
        assert_eq!(HostSettings::new("-", 115200, "COM4").led_count(60), 60);
        assert_eq!(HostSettings::new(".5", 115200, "COM4").led_count(60), 60);
    }

    #[test]
    fn test_whole_valued_json_floats() {
        let settings: HostSettings =
            serde_json::from_str(r#"{"led_count": 60.0, "baud_rate": 460800.0}"#).unwrap();
        assert_eq!(settings.led_count(120), 60);
        assert_eq!(settings.baud_rate(), BaudRate::B460800);

        assert_eq!(BaudRate::parse("500000.0"), Some(BaudRate::B500000));
        assert_eq!(BaudRate::parse("-115200"), None);
        assert_eq!(BaudRate::parse("99999999999"), None);
    }

    #[test]
    fn test_or_port() {
        let empty = HostSettings::default().or_port("COM9");
        assert_eq!(empty.port(), "COM9");

        let set = HostSettings::new(60, 115200, "COM3").or_port("COM9");
        assert_eq!(set.port(), "COM3");
    }
}
