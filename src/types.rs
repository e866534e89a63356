/// One of the four page sizes the in-game viewer accepts. The discriminant
/// doubles as the resolution code written into the container header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resolution {
    R480x248 = 0,
    R480x272 = 1,
    R480x480 = 2,
    R480x960 = 3,
}

impl Resolution {
    pub fn width(self) -> u32 {
        480
    }

    pub fn height(self) -> u32 {
        match self {
            Resolution::R480x248 => 248,
            Resolution::R480x272 => 272,
            Resolution::R480x480 => 480,
            Resolution::R480x960 => 960,
        }
    }

    pub fn code(self) -> u32 {
        self as u32
    }

    pub fn from_code(code: u32) -> Option<Resolution> {
        match code {
            0 => Some(Resolution::R480x248),
            1 => Some(Resolution::R480x272),
            2 => Some(Resolution::R480x480),
            3 => Some(Resolution::R480x960),
            _ => None,
        }
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width(), self.height())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };
    pub const WHITE: Rgb = Rgb {
        r: 255,
        g: 255,
        b: 255,
    };

    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parses `#rgb` / `#rrggbb` (leading `#` optional). `None` on anything else.
    pub fn from_hex(raw: &str) -> Option<Rgb> {
        let hex = raw.trim().trim_start_matches('#');
        let expanded: String;
        let hex = if hex.len() == 3 {
            expanded = hex.chars().flat_map(|c| [c, c]).collect();
            &expanded
        } else {
            hex
        };
        if hex.len() != 6 {
            return None;
        }
        let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
        let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
        let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
        Some(Rgb { r, g, b })
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Text inset from the page edges, in pixels. Symmetric: the same value
/// applies to the opposite edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Insets {
    pub x: u32,
    pub y: u32,
}

impl Insets {
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    pub fn all(value: u32) -> Self {
        Self { x: value, y: value }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolution_codes_round_trip() {
        for res in [
            Resolution::R480x248,
            Resolution::R480x272,
            Resolution::R480x480,
            Resolution::R480x960,
        ] {
            assert_eq!(Resolution::from_code(res.code()), Some(res));
        }
        assert_eq!(Resolution::from_code(4), None);
    }

    #[test]
    fn resolution_dimensions() {
        assert_eq!(Resolution::R480x272.width(), 480);
        assert_eq!(Resolution::R480x272.height(), 272);
        assert_eq!(Resolution::R480x960.height(), 960);
        assert_eq!(Resolution::R480x248.to_string(), "480x248");
    }

    #[test]
    fn hex_parses_long_and_short_forms() {
        assert_eq!(Rgb::from_hex("#ff8000"), Some(Rgb::new(255, 128, 0)));
        assert_eq!(Rgb::from_hex("0a0b0c"), Some(Rgb::new(10, 11, 12)));
        assert_eq!(Rgb::from_hex("#fff"), Some(Rgb::WHITE));
        assert_eq!(Rgb::from_hex("#ffff"), None);
        assert_eq!(Rgb::from_hex("zzzzzz"), None);
    }

    #[test]
    fn hex_round_trips() {
        let color = Rgb::new(1, 2, 3);
        assert_eq!(Rgb::from_hex(&color.to_hex()), Some(color));
    }
}
