use std::fmt;

/// Straight (non-premultiplied) 8-bit RGBA colour.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);
    pub const BLACK: Color = Color::rgba(0, 0, 0, 255);
    pub const WHITE: Color = Color::rgba(255, 255, 255, 255);

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Color { r, g, b, a }
    }

    /// Builds a colour from Lottie float channels.
    ///
    /// Channels are normalised `0..=1`; documents that store `0..=255`
    /// are detected by any channel exceeding 1. A missing alpha is opaque.
    pub fn from_floats(channels: &[f32]) -> Self {
        let scale = if channels.iter().take(3).any(|c| *c > 1.0) {
            1.0
        } else {
            255.0
        };
        let channel = |i: usize, default: f32| {
            let v = channels.get(i).copied().unwrap_or(default) * scale;
            v.round().clamp(0.0, 255.0) as u8
        };
        let alpha = channels
            .get(3)
            .map(|a| (a * scale).round().clamp(0.0, 255.0) as u8)
            .unwrap_or(255);
        Color::rgba(channel(0, 0.0), channel(1, 0.0), channel(2, 0.0), alpha)
    }

    /// Parses `#rrggbb` or `#rrggbbaa`.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.trim().trim_start_matches('#');
        if !digits.is_ascii() {
            return None;
        }
        let byte = |i: usize| u8::from_str_radix(digits.get(i..i + 2)?, 16).ok();
        match digits.len() {
            6 => Some(Color::rgba(byte(0)?, byte(2)?, byte(4)?, 255)),
            8 => Some(Color::rgba(byte(0)?, byte(2)?, byte(4)?, byte(6)?)),
            _ => None,
        }
    }

    pub fn with_alpha(self, a: u8) -> Self {
        Color { a, ..self }
    }

    /// Scales alpha by `factor` in `0..=1`.
    pub fn mul_alpha(self, factor: f32) -> Self {
        let a = (self.a as f32 * factor.clamp(0.0, 1.0)).round() as u8;
        self.with_alpha(a)
    }

    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
    }
}
