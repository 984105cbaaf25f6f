use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid color: {0:?}")]
pub struct ColorParseError(pub String);

/// 16 bits per channel RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub red: u16,
    pub green: u16,
    pub blue: u16,
}

const NAMED_COLORS: &[(&str, (u8, u8, u8))] = &[
    ("black", (0x00, 0x00, 0x00)),
    ("white", (0xff, 0xff, 0xff)),
    ("red", (0xff, 0x00, 0x00)),
    ("green", (0x00, 0xff, 0x00)),
    ("blue", (0x00, 0x00, 0xff)),
    ("yellow", (0xff, 0xff, 0x00)),
    ("cyan", (0x00, 0xff, 0xff)),
    ("magenta", (0xff, 0x00, 0xff)),
    ("gray", (0xbe, 0xbe, 0xbe)),
    ("grey", (0xbe, 0xbe, 0xbe)),
    ("darkblue", (0x00, 0x00, 0x8b)),
    ("navy", (0x00, 0x00, 0x80)),
    ("orange", (0xff, 0xa5, 0x00)),
    ("brown", (0xa5, 0x2a, 0x2a)),
    ("purple", (0xa0, 0x20, 0xf0)),
    ("darkgray", (0xa9, 0xa9, 0xa9)),
    ("lightgray", (0xd3, 0xd3, 0xd3)),
];

impl Color {
    pub const fn from_rgb8(red: u8, green: u8, blue: u8) -> Self {
        Self {
            red: red as u16 * 0x101,
            green: green as u16 * 0x101,
            blue: blue as u16 * 0x101,
        }
    }

    /// Accepts `#rgb`, `#rrggbb`, `#rrrgggbbb`, `#rrrrggggbbbb` or a known
    /// color name. Anything else is rejected.
    pub fn parse(input: &str) -> Option<Color> {
        if let Some(hex) = input.strip_prefix('#') {
            return Self::parse_hex(hex);
        }
        let name = input.to_ascii_lowercase().replace(' ', "");
        NAMED_COLORS
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, (r, g, b))| Color::from_rgb8(*r, *g, *b))
    }

    fn parse_hex(hex: &str) -> Option<Color> {
        if !matches!(hex.len(), 3 | 6 | 9 | 12) || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        let digits = hex.len() / 3;
        let max = (1u32 << (4 * digits)) - 1;
        let channel = |i: usize| -> Option<u16> {
            let raw = u32::from_str_radix(&hex[i * digits..(i + 1) * digits], 16).ok()?;
            u16::try_from(raw * 0xffff / max).ok()
        };
        Some(Color {
            red: channel(0)?,
            green: channel(1)?,
            blue: channel(2)?,
        })
    }

    pub fn is_valid(input: &str) -> bool {
        Self::parse(input).is_some()
    }

    /// Short `#rrggbb` form, high byte of each channel.
    pub fn to_hex_rgb8(&self) -> String {
        format!(
            "#{:02x}{:02x}{:02x}",
            self.red >> 8,
            self.green >> 8,
            self.blue >> 8
        )
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:04x}{:04x}{:04x}", self.red, self.green, self.blue)
    }
}

impl FromStr for Color {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Color::parse(s).ok_or_else(|| ColorParseError(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_all_hex_widths() {
        let expected = Color::from_rgb8(0xaa, 0xbb, 0xcc);
        assert_eq!(Color::parse("#abc"), Some(expected));
        assert_eq!(Color::parse("#aabbcc"), Some(expected));
        assert_eq!(Color::parse("#aaaabbbbcccc"), Some(expected));
        assert!(Color::parse("#aaabbbccc").is_some());
    }

    #[test]
    fn rejects_malformed_values() {
        for bad in ["", "#", "#ab", "#abcd", "#gggggg", "aabbcc", "not-a-color", "#aabbcc "] {
            assert!(Color::parse(bad).is_none(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn names_and_display_round_trip() {
        let navy = Color::parse("Navy").unwrap();
        assert_eq!(navy.to_string(), "#000000008080");
        assert_eq!(navy.to_string().parse::<Color>().unwrap(), navy);
    }
}
