use crate::foundation::error::{GfxError, GfxResult};
use serde::{Deserialize, Serialize};

pub use kurbo::{Affine, BezPath, Point, Rect, Shape, Vec2};

/// Straight-alpha color packed as `0xAARRGGBB`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "ColorRepr", into = "String")]
pub struct Color(pub u32);

impl Color {
    /// Opaque black.
    pub const BLACK: Self = Self(0xff00_0000);
    /// Opaque white.
    pub const WHITE: Self = Self(0xffff_ffff);
    /// Fully transparent black.
    pub const TRANSPARENT: Self = Self(0);

    /// Build an opaque color from 8-bit channels.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::rgba(r, g, b, 0xff)
    }

    /// Build a color from 8-bit straight-alpha channels.
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self(((a as u32) << 24) | ((r as u32) << 16) | ((g as u32) << 8) | (b as u32))
    }

    /// Packed `0xAARRGGBB` value.
    pub const fn argb(self) -> u32 {
        self.0
    }

    pub const fn alpha(self) -> u8 {
        (self.0 >> 24) as u8
    }

    pub fn is_opaque(self) -> bool {
        self.alpha() == 0xff
    }

    /// Same color with its alpha channel replaced.
    pub fn with_alpha(self, a: u8) -> Self {
        Self((self.0 & 0x00ff_ffff) | ((a as u32) << 24))
    }

    pub fn transparency(self) -> Transparency {
        match self.alpha() {
            0xff => Transparency::Opaque,
            _ => Transparency::Translucent,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ColorRepr {
    Argb(u32),
    Hex(String),
}

impl TryFrom<ColorRepr> for Color {
    type Error = GfxError;

    fn try_from(value: ColorRepr) -> Result<Self, Self::Error> {
        match value {
            ColorRepr::Argb(v) => Ok(Self(v)),
            ColorRepr::Hex(s) => parse_hex_color(&s),
        }
    }
}

impl From<Color> for String {
    fn from(value: Color) -> Self {
        format!("#{:08x}", value.0)
    }
}

/// Parse `#RRGGBB` or `#AARRGGBB`.
pub fn parse_hex_color(s: &str) -> GfxResult<Color> {
    let digits = s.strip_prefix('#').unwrap_or(s);
    let v = u32::from_str_radix(digits, 16)
        .map_err(|_| GfxError::illegal_argument(format!("invalid color '{s}'")))?;
    match digits.len() {
        6 => Ok(Color(0xff00_0000 | v)),
        8 => Ok(Color(v)),
        _ => Err(GfxError::illegal_argument(format!(
            "color '{s}' must have 6 or 8 hex digits"
        ))),
    }
}

/// Coarse opacity classification shared by colors, paints and surfaces.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transparency {
    Opaque,
    Bitmask,
    Translucent,
}

/// Pixel layout of a raster surface.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorModel {
    /// `0xAARRGGBB`, straight alpha.
    #[default]
    IntArgb,
    /// `0xAARRGGBB`, premultiplied alpha.
    IntArgbPre,
    /// `0x00RRGGBB`, alpha ignored.
    IntRgb,
    /// 8-bit luminance stored in the low byte.
    ByteGray,
}

impl ColorModel {
    pub fn transparency(self) -> Transparency {
        match self {
            Self::IntArgb | Self::IntArgbPre => Transparency::Translucent,
            Self::IntRgb | Self::ByteGray => Transparency::Opaque,
        }
    }

    /// Bits of a pixel that carry alpha. XOR writes preserve them.
    pub fn alpha_mask(self) -> u32 {
        match self {
            Self::IntArgb | Self::IntArgbPre => 0xff00_0000,
            Self::IntRgb | Self::ByteGray => 0,
        }
    }

    /// Convert a straight-alpha ARGB value into this model's pixel encoding.
    pub fn pixel_for(self, argb: u32) -> u32 {
        match self {
            Self::IntArgb => argb,
            Self::IntArgbPre => premultiply(argb),
            Self::IntRgb => argb & 0x00ff_ffff,
            Self::ByteGray => {
                let [_, r, g, b] = argb.to_be_bytes();
                (77 * r as u32 + 150 * g as u32 + 29 * b as u32 + 128) >> 8
            }
        }
    }

    /// Convert a pixel of this model back into straight-alpha ARGB.
    pub fn rgb_for(self, pixel: u32) -> u32 {
        match self {
            Self::IntArgb => pixel,
            Self::IntArgbPre => unpremultiply(pixel),
            Self::IntRgb => 0xff00_0000 | (pixel & 0x00ff_ffff),
            Self::ByteGray => {
                let g = pixel & 0xff;
                0xff00_0000 | (g << 16) | (g << 8) | g
            }
        }
    }
}

fn mul_div_255(c: u32, a: u32) -> u32 {
    (c * a + 127) / 255
}

pub(crate) fn premultiply(argb: u32) -> u32 {
    let [a, r, g, b] = argb.to_be_bytes();
    let a32 = a as u32;
    if a32 == 0xff {
        return argb;
    }
    (a32 << 24)
        | (mul_div_255(r as u32, a32) << 16)
        | (mul_div_255(g as u32, a32) << 8)
        | mul_div_255(b as u32, a32)
}

pub(crate) fn unpremultiply(pixel: u32) -> u32 {
    let [a, r, g, b] = pixel.to_be_bytes();
    let a32 = a as u32;
    match a32 {
        0 => 0,
        0xff => pixel,
        _ => {
            let un = |c: u8| ((c as u32 * 255 + a32 / 2) / a32).min(255);
            (a32 << 24) | (un(r) << 16) | (un(g) << 8) | un(b)
        }
    }
}

/// Integer device-space rectangle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IntRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl IntRect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Build from corner coordinates; inverted corners produce an empty rectangle.
    pub fn from_corners(x0: i32, y0: i32, x1: i32, y1: i32) -> Self {
        Self::new(x0, y0, x1.saturating_sub(x0).max(0), y1.saturating_sub(y0).max(0))
    }

    pub fn x2(self) -> i32 {
        self.x.saturating_add(self.width)
    }

    pub fn y2(self) -> i32 {
        self.y.saturating_add(self.height)
    }

    pub fn is_empty(self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    pub fn intersect(self, other: Self) -> Self {
        Self::from_corners(
            self.x.max(other.x),
            self.y.max(other.y),
            self.x2().min(other.x2()),
            self.y2().min(other.y2()),
        )
    }

    pub fn contains(self, x: i32, y: i32) -> bool {
        x >= self.x && x < self.x2() && y >= self.y && y < self.y2()
    }

    pub fn translate(self, dx: i32, dy: i32) -> Self {
        Self::new(
            self.x.saturating_add(dx),
            self.y.saturating_add(dy),
            self.width,
            self.height,
        )
    }

    pub fn to_rect(self) -> Rect {
        Rect::new(
            self.x as f64,
            self.y as f64,
            self.x2() as f64,
            self.y2() as f64,
        )
    }

    /// Pixels whose centers fall inside `r`.
    pub fn covering(r: Rect) -> Self {
        let r = r.abs();
        Self::from_corners(
            clip_round(r.x0),
            clip_round(r.y0),
            clip_round(r.x1),
            clip_round(r.y1),
        )
    }
}

/// Serde adapter storing a [`BezPath`] as SVG path data, e.g. `"M0 0 L4 0 L0 4 Z"`.
pub mod svg_path {
    use super::BezPath;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(path: &BezPath, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&path.to_svg())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<BezPath, D::Error> {
        let data = String::deserialize(d)?;
        BezPath::from_svg(&data)
            .map_err(|e| serde::de::Error::custom(format!("invalid svg path '{data}': {e}")))
    }
}

/// Round a device coordinate to the pixel boundary that selects pixel centers.
pub fn clip_round(v: f64) -> i32 {
    let v = (v - 0.5).ceil();
    if v.is_nan() {
        0
    } else {
        v.clamp(i32::MIN as f64, i32::MAX as f64) as i32
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
