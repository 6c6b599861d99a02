//! Color math for the LED strips

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// One 8-bit-per-channel color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Dim to `intensity`/255 of the original brightness
    pub fn scale(self, intensity: u8) -> Rgb {
        let f = |c: u8| ((c as u16 * intensity as u16) / 255) as u8;
        Rgb::new(f(self.r), f(self.g), f(self.b))
    }

    /// Linear blend, 0 = `self`, 255 = `other`
    pub fn mix(self, other: Rgb, amount: u8) -> Rgb {
        let f = |a: u8, b: u8| (a as i32 + (b as i32 - a as i32) * amount as i32 / 255) as u8;
        Rgb::new(f(self.r, other.r), f(self.g, other.g), f(self.b, other.b))
    }

    pub fn is_black(self) -> bool {
        self == Rgb::BLACK
    }

    /// Parse `"r,g,b"`
    pub fn parse_triplet(text: &str) -> Option<Rgb> {
        let mut parts = text.split(',').map(|p| p.trim().parse::<u8>());
        let (r, g, b) = (parts.next()?.ok()?, parts.next()?.ok()?, parts.next()?.ok()?);
        if parts.next().is_some() {
            return None;
        }
        Some(Rgb::new(r, g, b))
    }
}

impl From<(u8, u8, u8)> for Rgb {
    fn from((r, g, b): (u8, u8, u8)) -> Self {
        Rgb::new(r, g, b)
    }
}

impl From<[u8; 3]> for Rgb {
    fn from([r, g, b]: [u8; 3]) -> Self {
        Rgb::new(r, g, b)
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.r, self.g, self.b)
    }
}

/// Red → green → blue → red over `0..=255`
pub fn wheel(pos: u8) -> Rgb {
    match pos {
        0..=84 => Rgb::new(255 - pos * 3, pos * 3, 0),
        85..=169 => {
            let pos = pos - 85;
            Rgb::new(0, 255 - pos * 3, pos * 3)
        }
        _ => {
            let pos = pos - 170;
            Rgb::new(pos * 3, 0, 255 - pos * 3)
        }
    }
}

const BUILTIN: &[(&str, Rgb)] = &[
    ("orange", Rgb::new(220, 50, 0)),
    ("purple", Rgb::new(128, 0, 128)),
    ("blue_grey", Rgb::new(96, 125, 139)),
    ("blue", Rgb::new(50, 50, 255)),
    ("yellow", Rgb::new(220, 210, 0)),
    ("green", Rgb::new(0, 255, 0)),
    ("red", Rgb::new(255, 0, 0)),
    ("pink", Rgb::new(255, 192, 203)),
    ("cyan", Rgb::new(0, 150, 255)),
    ("magenta", Rgb::new(255, 0, 255)),
    ("white", Rgb::WHITE),
    ("black", Rgb::BLACK),
    ("teal", Rgb::new(0, 128, 128)),
    ("gold", Rgb::new(210, 160, 0)),
    ("lavender", Rgb::new(230, 230, 250)),
    ("turquoise", Rgb::new(64, 224, 208)),
];

/// Named colors: configured entries first, then the stock set
#[derive(Debug, Clone, Default)]
pub struct Palette {
    named: BTreeMap<String, Rgb>,
}

impl Palette {
    pub fn new(named: BTreeMap<String, Rgb>) -> Self {
        Self { named }
    }

    /// Resolve a color name or an `r,g,b` triplet
    pub fn resolve(&self, text: &str) -> Option<Rgb> {
        let key = text.trim();
        if let Some(color) = self.named.get(key) {
            return Some(*color);
        }
        let lower = key.to_ascii_lowercase();
        BUILTIN
            .iter()
            .find(|(name, _)| *name == lower)
            .map(|(_, color)| *color)
            .or_else(|| Rgb::parse_triplet(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_and_mix() {
        let purple = Rgb::new(128, 0, 128);
        assert_eq!(purple.scale(255), purple);
        assert_eq!(purple.scale(0), Rgb::BLACK);
        assert_eq!(Rgb::new(200, 100, 50).scale(127), Rgb::new(99, 49, 24));

        let red = Rgb::new(255, 0, 0);
        let blue = Rgb::new(0, 0, 255);
        assert_eq!(red.mix(blue, 0), red);
        assert_eq!(red.mix(blue, 255), blue);
        assert_eq!(blue.mix(red, 255), red);
    }

    #[test]
    fn test_wheel_segments() {
        assert_eq!(wheel(0), Rgb::new(255, 0, 0));
        assert_eq!(wheel(85), Rgb::new(0, 255, 0));
        assert_eq!(wheel(170), Rgb::new(0, 0, 255));
        assert_eq!(wheel(255), Rgb::new(255, 0, 0));
    }

    #[test]
    fn test_palette_resolution_order() {
        let mut named = BTreeMap::new();
        named.insert("purple".to_string(), Rgb::new(1, 2, 3));
        named.insert("lava".to_string(), Rgb::new(255, 40, 0));
        let palette = Palette::new(named);

        assert_eq!(palette.resolve("purple"), Some(Rgb::new(1, 2, 3)));
        assert_eq!(palette.resolve("lava"), Some(Rgb::new(255, 40, 0)));
        assert_eq!(palette.resolve("Gold"), Some(Rgb::new(210, 160, 0)));
        assert_eq!(palette.resolve(" 10, 20 ,30"), Some(Rgb::new(10, 20, 30)));
        assert_eq!(palette.resolve("10,20"), None);
        assert_eq!(palette.resolve("10,20,30,40"), None);
        assert_eq!(palette.resolve("300,0,0"), None);
        assert_eq!(palette.resolve("mauve"), None);
    }
}
