//! Hex colors as written by Tiled (`#rrggbb`, `#aarrggbb`, `rrggbb`)

use serde::{Deserialize, Serialize};
use std::fmt;

/// 8-bit RGBA color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const WHITE: Self = Self::rgb(255, 255, 255);
    pub const BLACK: Self = Self::rgb(0, 0, 0);
    pub const MAGENTA: Self = Self::rgb(255, 0, 255);

    /// Parse `rrggbb` or `aarrggbb`, with or without a leading `#`
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.trim().trim_start_matches('#');
        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let byte = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();
        match digits.len() {
            6 => Some(Self::rgb(byte(0)?, byte(2)?, byte(4)?)),
            8 => Some(Self::rgba(byte(2)?, byte(4)?, byte(6)?, byte(0)?)),
            _ => None,
        }
    }

    /// `#rrggbb`, or `#aarrggbb` when the color is not fully opaque
    pub fn to_hex(&self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.a, self.r, self.g, self.b)
        }
    }

    /// Hex digits without the leading `#` (the form used by `trans`)
    pub fn to_hex_bare(&self) -> String {
        self.to_hex().trim_start_matches('#').to_string()
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_forms() {
        assert_eq!(Color::from_hex("ff00ff"), Some(Color::MAGENTA));
        assert_eq!(Color::from_hex("#00ff00"), Some(Color::rgb(0, 255, 0)));
        assert_eq!(Color::from_hex("#80ff0000"), Some(Color::rgba(255, 0, 0, 128)));
        assert_eq!(Color::from_hex("#ff00"), None);
        assert_eq!(Color::from_hex("zzzzzz"), None);
    }

    #[test]
    fn test_hex_output() {
        assert_eq!(Color::rgb(0x8b, 0x45, 0x13).to_hex(), "#8b4513");
        assert_eq!(Color::MAGENTA.to_hex_bare(), "ff00ff");
        assert_eq!(Color::rgba(255, 0, 0, 128).to_hex(), "#80ff0000");
    }
}
