use crate::context::hints::{AntialiasHint, FractionalMetricsHint, TextAntialiasHint};
use crate::context::state::TransformState;
use crate::foundation::core::{Affine, BezPath, Point, Rect, Shape};
use crate::render::kernels::GlyphImage;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// One entry of a font's per-size antialiasing table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GaspRange {
    /// Largest pixel size this entry covers.
    pub max_ppem: u16,
    pub antialias: bool,
}

/// Per-size antialiasing table, consulted by the `Gasp` text hint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GaspTable {
    pub ranges: Vec<GaspRange>,
}

impl Default for GaspTable {
    fn default() -> Self {
        Self {
            ranges: vec![
                GaspRange {
                    max_ppem: 8,
                    antialias: false,
                },
                GaspRange {
                    max_ppem: u16::MAX,
                    antialias: true,
                },
            ],
        }
    }
}

impl GaspTable {
    /// Sizes past the last range are antialiased.
    pub fn use_aa_for_size(&self, ppem: i32) -> bool {
        self.ranges
            .iter()
            .find(|r| ppem <= r.max_ppem as i32)
            .is_none_or(|r| r.antialias)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Font {
    pub family: String,
    /// Point size.
    pub size: f64,
    /// Glyph transform applied before the device transform.
    #[serde(default)]
    pub transform: Affine,
    #[serde(default)]
    pub gasp: GaspTable,
}

impl Default for Font {
    fn default() -> Self {
        Self::new("Dialog", 12.0)
    }
}

impl Font {
    pub fn new(family: impl Into<String>, size: f64) -> Self {
        Self {
            family: family.into(),
            size,
            transform: Affine::IDENTITY,
            gasp: GaspTable::default(),
        }
    }

    pub fn with_transform(mut self, transform: Affine) -> Self {
        self.transform = transform;
        self
    }

    pub fn is_transformed(&self) -> bool {
        self.transform != Affine::IDENTITY
    }

    pub fn use_aa_for_size(&self, ppem: i32) -> bool {
        self.gasp.use_aa_for_size(ppem)
    }
}

/// Resolved text antialiasing mode of a strike.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TextAaMode {
    Off,
    On,
    LcdHrgb,
    LcdVrgb,
}

/// Explicit text rendering parameters, independent of a context's hints.
#[derive(Clone, Debug, PartialEq)]
pub struct FontRenderContext {
    pub transform: Affine,
    pub antialiasing: TextAntialiasHint,
    pub fractional_metrics: FractionalMetricsHint,
}

/// Identity of a strike: everything glyph images depend on.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct StrikeKey {
    pub family: String,
    pub size_bits: u64,
    pub dev_tx: [u64; 4],
    pub glyph_tx: [u64; 4],
    pub aa: TextAaMode,
    pub fractional: bool,
}

fn linear_bits(t: Affine) -> [u64; 4] {
    let [a, b, c, d, _, _] = t.as_coeffs();
    [a.to_bits(), b.to_bits(), c.to_bits(), d.to_bits()]
}

/// Glyph source for one font at one device size and antialiasing mode.
#[derive(Clone, Debug, PartialEq)]
pub struct Strike {
    pub key: StrikeKey,
    pub pixel_height: i32,
    pub ascent: f64,
    pub descent: f64,
    pub advance: f64,
    pub aa: TextAaMode,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct FontMetrics {
    pub ascent: f64,
    pub descent: f64,
    pub leading: f64,
    /// Advance of an average glyph.
    pub advance: f64,
    pub height: f64,
}

/// Font and glyph rasterizer collaborator.
pub trait StrikeProvider: Send + Sync + fmt::Debug {
    /// Strike for `font` under the device and glyph transforms. Equal inputs yield the same
    /// strike.
    fn strike(
        &self,
        font: &Font,
        dev_tx: Affine,
        glyph_tx: Affine,
        aa: TextAaMode,
        fractional: bool,
    ) -> Arc<Strike>;

    /// Glyph coverage for `text` laid out from the device-space baseline `origin`.
    fn glyphs(&self, strike: &Strike, text: &str, origin: Point) -> Vec<GlyphImage>;

    /// Device-space glyph outlines for `text`.
    fn outlines(&self, strike: &Strike, text: &str, origin: Point) -> BezPath;

    fn metrics(&self, strike: &Strike) -> FontMetrics {
        FontMetrics {
            ascent: strike.ascent,
            descent: strike.descent,
            leading: 0.0,
            advance: strike.advance,
            height: strike.ascent + strike.descent,
        }
    }
}

/// Renders every visible character as a filled box. Used where no real rasterizer is
/// plugged in, and by tests.
#[derive(Debug, Default)]
pub struct BoxStrikeProvider {
    strikes: Mutex<HashMap<StrikeKey, Arc<Strike>>>,
}

impl BoxStrikeProvider {
    pub fn cached(&self) -> usize {
        self.strikes.lock().len()
    }

    fn boxes<'a>(strike: &'a Strike, text: &'a str, origin: Point) -> impl Iterator<Item = Rect> + 'a {
        text.chars().enumerate().filter_map(move |(i, ch)| {
            if ch.is_whitespace() {
                return None;
            }
            let x = origin.x + i as f64 * strike.advance;
            let inset = strike.advance * 0.1;
            Some(Rect::new(
                x + inset,
                origin.y - strike.ascent,
                x + strike.advance - inset,
                origin.y,
            ))
        })
    }
}

impl StrikeProvider for BoxStrikeProvider {
    fn strike(
        &self,
        font: &Font,
        dev_tx: Affine,
        glyph_tx: Affine,
        aa: TextAaMode,
        fractional: bool,
    ) -> Arc<Strike> {
        let key = StrikeKey {
            family: font.family.clone(),
            size_bits: font.size.to_bits(),
            dev_tx: linear_bits(dev_tx),
            glyph_tx: linear_bits(glyph_tx),
            aa,
            fractional,
        };
        let mut strikes = self.strikes.lock();
        Arc::clone(strikes.entry(key.clone()).or_insert_with(|| {
            let [a, b, _, _, _, _] = glyph_tx.as_coeffs();
            let pixel_height = pixel_height(glyph_tx);
            let mut advance = 0.6 * a.hypot(b);
            if !fractional {
                advance = advance.round().max(1.0);
            }
            Arc::new(Strike {
                key,
                pixel_height,
                ascent: (0.8 * pixel_height as f64).round(),
                descent: (0.2 * pixel_height as f64).round(),
                advance,
                aa,
            })
        }))
    }

    fn glyphs(&self, strike: &Strike, text: &str, origin: Point) -> Vec<GlyphImage> {
        let lcd = matches!(strike.aa, TextAaMode::LcdHrgb | TextAaMode::LcdVrgb);
        Self::boxes(strike, text, origin)
            .map(|r| {
                let x = r.x0.round() as i32;
                let y = r.y0.round() as i32;
                let width = ((r.x1.round() as i32) - x).max(1) as u32;
                let height = ((r.y1.round() as i32) - y).max(1) as u32;
                let mut coverage = Vec::with_capacity((width * height) as usize * 3);
                for _ in 0..height {
                    for gx in 0..width {
                        let edge = gx == 0 || gx + 1 == width;
                        match (strike.aa, edge) {
                            (TextAaMode::Off, _) | (_, false) => {
                                coverage.extend(std::iter::repeat_n(0xff, if lcd { 3 } else { 1 }))
                            }
                            (TextAaMode::On, true) => coverage.push(0x80),
                            (_, true) if gx == 0 => coverage.extend([0x40, 0x80, 0xc0]),
                            (_, true) => coverage.extend([0xc0, 0x80, 0x40]),
                        }
                    }
                }
                GlyphImage {
                    x,
                    y,
                    width,
                    height,
                    coverage,
                    lcd,
                }
            })
            .collect()
    }

    fn outlines(&self, strike: &Strike, text: &str, origin: Point) -> BezPath {
        let mut path = BezPath::new();
        for r in Self::boxes(strike, text, origin) {
            path.extend(r.path_elements(0.1));
        }
        path
    }
}

fn pixel_height(glyph_tx: Affine) -> i32 {
    let [_, _, c, d, _, _] = glyph_tx.as_coeffs();
    let scale_y = if c != 0.0 { c.hypot(d) } else { d };
    (scale_y.abs() + 0.5) as i32
}

/// Text rendering parameters resolved for one font in one context.
#[derive(Clone, Debug)]
pub struct FontInfo {
    /// Linear part of the device transform applied to glyphs.
    pub dev_tx: Affine,
    /// Full glyph transform: font transform and point size, then `dev_tx`.
    pub glyph_tx: Affine,
    /// Translation carried by the font transform.
    pub origin: Point,
    pub pixel_height: i32,
    pub aa: TextAaMode,
    pub fractional_metrics: bool,
    /// Subpixels ordered red first.
    pub lcd_rgb_order: bool,
    /// Glyphs are positioned at subpixel offsets.
    pub lcd_sub_pix_pos: bool,
    pub non_invertible: bool,
    pub strike: Arc<Strike>,
}

/// Context state [`resolve_font_info`] reads.
#[derive(Clone, Copy, Debug)]
pub(crate) struct FontInputs {
    pub transform: Affine,
    pub transform_state: TransformState,
    pub antialiasing: AntialiasHint,
    pub text_antialiasing: TextAntialiasHint,
    pub fractional_metrics: FractionalMetricsHint,
    pub can_render_lcd: bool,
    pub promote_off_to_aa: bool,
}

fn linear(t: Affine) -> Affine {
    let [a, b, c, d, _, _] = t.as_coeffs();
    Affine::new([a, b, c, d, 0.0, 0.0])
}

pub(crate) fn resolve_font_info(font: &Font, inputs: FontInputs, strikes: &dyn StrikeProvider) -> FontInfo {
    let scaled = Affine::scale(font.size);
    let dev_tx = if inputs.transform_state >= TransformState::TranslateScale {
        linear(inputs.transform)
    } else {
        Affine::IDENTITY
    };
    let (glyph_tx, origin) = if font.is_transformed() {
        let text = font.transform * scaled;
        let t = text.translation();
        (dev_tx * linear(text), Point::new(t.x, t.y))
    } else {
        (dev_tx * scaled, Point::ZERO)
    };
    let pixel_height = pixel_height(glyph_tx);

    let fractional = inputs.fractional_metrics == FractionalMetricsHint::On;
    let mut lcd_rgb_order = false;
    let mut lcd_sub_pix_pos = false;
    let mut aa = match inputs.text_antialiasing {
        TextAntialiasHint::Default if inputs.antialiasing == AntialiasHint::On => TextAaMode::On,
        TextAntialiasHint::Default | TextAntialiasHint::Off => TextAaMode::Off,
        TextAntialiasHint::On => TextAaMode::On,
        TextAntialiasHint::Gasp if font.use_aa_for_size(pixel_height) => TextAaMode::On,
        TextAntialiasHint::Gasp => TextAaMode::Off,
        _ if !inputs.can_render_lcd => TextAaMode::On,
        hint => {
            lcd_rgb_order = matches!(hint, TextAntialiasHint::LcdHrgb | TextAntialiasHint::LcdVrgb);
            let mode = match hint {
                TextAntialiasHint::LcdVrgb | TextAntialiasHint::LcdVbgr => TextAaMode::LcdVrgb,
                _ => TextAaMode::LcdHrgb,
            };
            lcd_sub_pix_pos = fractional && mode == TextAaMode::LcdHrgb;
            mode
        }
    };
    if inputs.promote_off_to_aa && aa == TextAaMode::Off {
        aa = TextAaMode::On;
    }

    FontInfo {
        dev_tx,
        glyph_tx,
        origin,
        pixel_height,
        aa,
        fractional_metrics: fractional,
        lcd_rgb_order,
        lcd_sub_pix_pos,
        non_invertible: glyph_tx.determinant().abs() <= f64::MIN_POSITIVE,
        strike: strikes.strike(font, dev_tx, glyph_tx, aa, fractional),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/context/font.rs"]
mod tests;
