//! sRGB color values and the CIELAB conversions shared by the catalog,
//! quantizer and grid sampler.

use palette::{color_difference::EuclideanDistance, white_point::D65, FromColor, Lab, Srgb};
use regex::Regex;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::OnceLock;

/// An 8-bit sRGB color. Serialized as a `"#RRGGBB"` string.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Rgb(pub [u8; 3]);

static HEX_PATTERN: OnceLock<Regex> = OnceLock::new();

fn hex_pattern() -> &'static Regex {
    HEX_PATTERN.get_or_init(|| {
        Regex::new(r"^#?(?:(?P<long>[0-9A-Fa-f]{6})|(?P<short>[0-9A-Fa-f]{3}))$")
            .expect("hex color pattern is a valid regex")
    })
}

impl Rgb {
    pub const WHITE: Rgb = Rgb([255, 255, 255]);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self([r, g, b])
    }

    /// Parse `#RRGGBB`, `RRGGBB` or the `#RGB` shorthand.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let caps = hex_pattern().captures(hex.trim())?;
        let digits: String = if let Some(long) = caps.name("long") {
            long.as_str().to_string()
        } else {
            caps.name("short")?
                .as_str()
                .chars()
                .flat_map(|c| [c, c])
                .collect()
        };

        let r = u8::from_str_radix(&digits[0..2], 16).ok()?;
        let g = u8::from_str_radix(&digits[2..4], 16).ok()?;
        let b = u8::from_str_radix(&digits[4..6], 16).ok()?;
        Some(Self([r, g, b]))
    }

    pub fn to_hex(self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.0[0], self.0[1], self.0[2])
    }

    pub fn to_lab(self) -> Lab<D65, f32> {
        let srgb = Srgb::new(
            self.0[0] as f32 / 255.0,
            self.0[1] as f32 / 255.0,
            self.0[2] as f32 / 255.0,
        );
        Lab::from_color(srgb)
    }

    pub fn from_lab(lab: Lab<D65, f32>) -> Self {
        let srgb = Srgb::from_color(lab);
        let r = (srgb.red.clamp(0.0, 1.0) * 255.0).round() as u8;
        let g = (srgb.green.clamp(0.0, 1.0) * 255.0).round() as u8;
        let b = (srgb.blue.clamp(0.0, 1.0) * 255.0).round() as u8;
        Self([r, g, b])
    }

    /// Alpha blend an RGBA pixel onto a white background.
    pub fn composite_on_white(p: [u8; 4]) -> Self {
        let a = p[3] as f32 / 255.0;
        let r = (p[0] as f32 * a + 255.0 * (1.0 - a)) as u8;
        let g = (p[1] as f32 * a + 255.0 * (1.0 - a)) as u8;
        let b = (p[2] as f32 * a + 255.0 * (1.0 - a)) as u8;
        Self([r, g, b])
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for Rgb {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Rgb {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Rgb::from_hex(&raw)
            .ok_or_else(|| de::Error::custom(format!("invalid hex color '{raw}'")))
    }
}

/// Squared Euclidean distance in CIELAB. The single color metric used for
/// catalog matching, k-means assignment and cell sampling.
pub fn lab_distance_sq(a: Lab<D65, f32>, b: Lab<D65, f32>) -> f32 {
    a.distance_squared(b)
}

/// Index of the nearest color in `palette`; ties go to the lowest index.
pub fn nearest_index(target: Lab<D65, f32>, palette: &[Lab<D65, f32>]) -> usize {
    let mut best_idx = 0usize;
    let mut best_dist = f32::MAX;
    for (i, lab) in palette.iter().enumerate() {
        let dist = lab_distance_sq(target, *lab);
        if dist < best_dist {
            best_dist = dist;
            best_idx = i;
        }
    }
    best_idx
}
