//! LED colors and per-device frames.
//!
//! A [`Frame`] is the ordered list of colors for every physical LED of one
//! device, index 0 first.  Transports push frames as a flat byte buffer whose
//! layout depends on the device's [`ColorChannelMode`].

use serde::{Deserialize, Serialize};

/// An RGB color with an optional dedicated white channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    /// White channel for RGBW strings.  `None` is sent as 0.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub w: Option<u8>,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const RED: Color = Color::rgb(255, 0, 0);
    pub const GREEN: Color = Color::rgb(0, 255, 0);
    pub const BLUE: Color = Color::rgb(0, 0, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, w: None }
    }

    pub const fn rgbw(r: u8, g: u8, b: u8, w: u8) -> Self {
        Self { r, g, b, w: Some(w) }
    }

    /// Parses `RRGGBB` or `#RRGGBB`.
    ///
    /// Returns `None` for anything else.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&hex[range], 16).ok();
        Some(Self::rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }

    pub fn is_black(&self) -> bool {
        self.r == 0 && self.g == 0 && self.b == 0 && self.w.unwrap_or(0) == 0
    }
}

/// Number and order of color channels a device expects per LED.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorChannelMode {
    /// Three bytes per LED: R, G, B.
    #[default]
    Rgb,
    /// Four bytes per LED: W, R, G, B.
    Rgbw,
}

impl ColorChannelMode {
    pub fn bytes_per_led(self) -> usize {
        match self {
            ColorChannelMode::Rgb => 3,
            ColorChannelMode::Rgbw => 4,
        }
    }
}

/// The ordered colors of all physical LEDs of one device.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Frame {
    colors: Vec<Color>,
}

impl Frame {
    pub fn new(colors: Vec<Color>) -> Self {
        Self { colors }
    }

    pub fn colors(&self) -> &[Color] {
        &self.colors
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Flattens the frame into the byte buffer pushed to the device.
    pub fn encode(&self, mode: ColorChannelMode) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.colors.len() * mode.bytes_per_led());
        for color in &self.colors {
            match mode {
                ColorChannelMode::Rgb => bytes.extend_from_slice(&[color.r, color.g, color.b]),
                ColorChannelMode::Rgbw => {
                    bytes.extend_from_slice(&[color.w.unwrap_or(0), color.r, color.g, color.b])
                }
            }
        }
        bytes
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_color_is_black() {
        assert_eq!(Color::default(), Color::BLACK);
        assert!(Color::default().is_black());
    }

    #[test]
    fn test_from_hex_accepts_leading_hash() {
        assert_eq!(Color::from_hex("#ff8000"), Some(Color::rgb(255, 128, 0)));
        assert_eq!(Color::from_hex("00FF00"), Some(Color::GREEN));
    }

    #[test]
    fn test_from_hex_rejects_malformed_input() {
        assert_eq!(Color::from_hex("fff"), None);
        assert_eq!(Color::from_hex("gg0000"), None);
        assert_eq!(Color::from_hex("#12345678"), None);
    }

    #[test]
    fn test_white_channel_makes_color_non_black() {
        assert!(!Color::rgbw(0, 0, 0, 10).is_black());
    }

    #[test]
    fn test_encode_rgb_uses_three_bytes_per_led() {
        // Arrange
        let frame = Frame::new(vec![Color::RED, Color::rgb(1, 2, 3)]);

        // Act
        let bytes = frame.encode(ColorChannelMode::Rgb);

        // Assert
        assert_eq!(bytes, vec![255, 0, 0, 1, 2, 3]);
    }

    #[test]
    fn test_encode_rgbw_puts_white_first_and_defaults_to_zero() {
        let frame = Frame::new(vec![Color::rgbw(1, 2, 3, 9), Color::BLUE]);
        let bytes = frame.encode(ColorChannelMode::Rgbw);
        assert_eq!(bytes, vec![9, 1, 2, 3, 0, 0, 0, 255]);
    }

    #[test]
    fn test_channel_mode_serializes_lowercase() {
        let json = serde_json::to_string(&ColorChannelMode::Rgbw).unwrap();
        assert_eq!(json, "\"rgbw\"");
    }
}
