use crate::foundation::core::{Affine, BezPath, Color, Point, Rect, Shape, Transparency};
use crate::foundation::error::{GfxError, GfxResult};
use crate::render::kernels::{PaintSource, SourceImage};
use crate::render::types::CompositeType;
use crate::surface::Surface;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Paint classification, ordered from cheapest to most general.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PaintState {
    OpaqueColor,
    AlphaColor,
    Gradient,
    LinearGradient,
    RadialGradient,
    Texture,
    Custom,
}

/// Composite classification. `Copy` means destination pixels are simply overwritten.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompositeState {
    Copy,
    Alpha,
    Xor,
    Custom,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StrokeState {
    Thin,
    ThinDashed,
    Wide,
    Custom,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformState {
    Identity,
    IntTranslate,
    AnyTranslate,
    /// Translation plus positive axis-aligned scaling.
    TranslateScale,
    Generic,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClipState {
    Device,
    Rectangular,
    Shape,
}

/// Porter-Duff rule of an [`AlphaComposite`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    Clear,
    Src,
    Dst,
    SrcOver,
    DstOver,
    SrcIn,
    DstIn,
    SrcOut,
    DstOut,
    SrcAtop,
    DstAtop,
    Xor,
}

/// Porter-Duff compositing with an extra constant alpha.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AlphaComposite {
    pub rule: Rule,
    pub alpha: f32,
}

impl AlphaComposite {
    pub const SRC_OVER: Self = Self {
        rule: Rule::SrcOver,
        alpha: 1.0,
    };
    pub const SRC: Self = Self {
        rule: Rule::Src,
        alpha: 1.0,
    };

    pub fn new(rule: Rule, alpha: f32) -> GfxResult<Self> {
        if !(0.0..=1.0).contains(&alpha) {
            return Err(GfxError::illegal_argument(format!(
                "composite alpha must be within 0..=1, got {alpha}"
            )));
        }
        Ok(Self { rule, alpha })
    }

    /// Kernel composite type. Full extra alpha selects the `NoEa` forms.
    pub fn composite_type(&self) -> CompositeType {
        let opaque = self.alpha >= 1.0;
        match self.rule {
            Rule::Clear => CompositeType::Clear,
            Rule::Src if opaque => CompositeType::SrcNoEa,
            Rule::Src => CompositeType::Src,
            Rule::Dst => CompositeType::Dst,
            Rule::SrcOver if opaque => CompositeType::SrcOverNoEa,
            Rule::SrcOver => CompositeType::SrcOver,
            Rule::DstOver => CompositeType::DstOver,
            Rule::SrcIn => CompositeType::SrcIn,
            Rule::DstIn => CompositeType::DstIn,
            Rule::SrcOut => CompositeType::SrcOut,
            Rule::DstOut => CompositeType::DstOut,
            Rule::SrcAtop => CompositeType::SrcAtop,
            Rule::DstAtop => CompositeType::DstAtop,
            Rule::Xor => CompositeType::AlphaXor,
        }
    }
}

/// XOR painting against a fixed color, resolved for one destination surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct XorComposite {
    pub xor_color: Color,
    pub xor_pixel: u32,
    pub alpha_mask: u32,
}

impl XorComposite {
    pub fn new(xor_color: Color, surface: &dyn Surface) -> Self {
        Self {
            xor_color,
            xor_pixel: surface.pixel_for(xor_color.argb()),
            alpha_mask: surface.color_model().alpha_mask(),
        }
    }
}

/// Application-defined compositing. Such composites read destination pixels back, which
/// surfaces may refuse.
pub trait CustomComposite: Send + Sync + fmt::Debug {
    /// Combine straight-alpha `src` with straight-alpha `dst`.
    fn compose(&self, src: u32, dst: u32) -> u32;
}

#[derive(Clone, Debug)]
pub enum Composite {
    Alpha(AlphaComposite),
    Xor(XorComposite),
    Custom(Arc<dyn CustomComposite>),
}

impl PartialEq for Composite {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Alpha(a), Self::Alpha(b)) => a == b,
            (Self::Xor(a), Self::Xor(b)) => a == b,
            (Self::Custom(a), Self::Custom(b)) => std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b)),
            _ => false,
        }
    }
}

impl Default for Composite {
    fn default() -> Self {
        Self::Alpha(AlphaComposite::SRC_OVER)
    }
}

impl Composite {
    pub fn extra_alpha(&self) -> f32 {
        match self {
            Self::Alpha(a) => a.alpha,
            _ => 1.0,
        }
    }
}

/// One color stop of a multi-stop gradient.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GradientStop {
    pub offset: f32,
    pub color: Color,
}

/// Two-point gradient, optionally cycling back and forth past its end points.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GradientPaint {
    pub p1: Point,
    pub c1: Color,
    pub p2: Point,
    pub c2: Color,
    #[serde(default)]
    pub cyclic: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LinearGradient {
    pub start: Point,
    pub end: Point,
    pub stops: Vec<GradientStop>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RadialGradient {
    pub center: Point,
    pub radius: f64,
    pub stops: Vec<GradientStop>,
}

/// Image tiled across user space, one copy per `anchor` rectangle.
#[derive(Clone, Debug, PartialEq)]
pub struct TexturePaint {
    pub image: Arc<SourceImage>,
    pub anchor: Rect,
}

/// Application-defined paint sampled in user space.
pub trait CustomPaint: Send + Sync + fmt::Debug {
    fn argb_at(&self, p: Point) -> u32;

    fn transparency(&self) -> Transparency {
        Transparency::Translucent
    }
}

#[derive(Clone, Debug)]
pub enum Paint {
    Color(Color),
    Gradient(GradientPaint),
    LinearGradient(LinearGradient),
    RadialGradient(RadialGradient),
    Texture(TexturePaint),
    Custom(Arc<dyn CustomPaint>),
}

impl PartialEq for Paint {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Color(a), Self::Color(b)) => a == b,
            (Self::Gradient(a), Self::Gradient(b)) => a == b,
            (Self::LinearGradient(a), Self::LinearGradient(b)) => a == b,
            (Self::RadialGradient(a), Self::RadialGradient(b)) => a == b,
            (Self::Texture(a), Self::Texture(b)) => a == b,
            (Self::Custom(a), Self::Custom(b)) => std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b)),
            _ => false,
        }
    }
}

fn stops_transparency(stops: &[GradientStop]) -> Transparency {
    if stops.iter().all(|s| s.color.is_opaque()) {
        Transparency::Opaque
    } else {
        Transparency::Translucent
    }
}

impl Paint {
    pub fn transparency(&self) -> Transparency {
        match self {
            Self::Color(c) => c.transparency(),
            Self::Gradient(g) => {
                if g.c1.is_opaque() && g.c2.is_opaque() {
                    Transparency::Opaque
                } else {
                    Transparency::Translucent
                }
            }
            Self::LinearGradient(g) => stops_transparency(&g.stops),
            Self::RadialGradient(g) => stops_transparency(&g.stops),
            Self::Texture(t) => {
                if t.image.argb.iter().all(|p| p >> 24 == 0xff) {
                    Transparency::Opaque
                } else {
                    Transparency::Translucent
                }
            }
            Self::Custom(c) => c.transparency(),
        }
    }

    /// Classification for non-color paints. Colors are classified by their effective alpha.
    pub(crate) fn state(&self) -> PaintState {
        match self {
            Self::Color(c) if c.is_opaque() => PaintState::OpaqueColor,
            Self::Color(_) => PaintState::AlphaColor,
            Self::Gradient(_) => PaintState::Gradient,
            Self::LinearGradient(_) => PaintState::LinearGradient,
            Self::RadialGradient(_) => PaintState::RadialGradient,
            Self::Texture(_) => PaintState::Texture,
            Self::Custom(_) => PaintState::Custom,
        }
    }

    /// Straight-alpha color of the paint at user-space point `p`.
    pub fn argb_at(&self, p: Point) -> u32 {
        match self {
            Self::Color(c) => c.argb(),
            Self::Gradient(g) => {
                let d = g.p2 - g.p1;
                let len2 = d.hypot2();
                let mut t = if len2 > 0.0 { (p - g.p1).dot(d) / len2 } else { 0.0 };
                if g.cyclic {
                    t = t.rem_euclid(2.0);
                    if t > 1.0 {
                        t = 2.0 - t;
                    }
                }
                lerp_argb(g.c1.argb(), g.c2.argb(), t.clamp(0.0, 1.0))
            }
            Self::LinearGradient(g) => {
                let d = g.end - g.start;
                let len2 = d.hypot2();
                let t = if len2 > 0.0 { (p - g.start).dot(d) / len2 } else { 0.0 };
                sample_stops(&g.stops, t)
            }
            Self::RadialGradient(g) => {
                let t = if g.radius > 0.0 {
                    (p - g.center).hypot() / g.radius
                } else {
                    1.0
                };
                sample_stops(&g.stops, t)
            }
            Self::Texture(t) => {
                let img = &t.image;
                if img.width == 0 || img.height == 0 || t.anchor.width() <= 0.0 || t.anchor.height() <= 0.0 {
                    return 0;
                }
                let u = (p.x - t.anchor.x0) / t.anchor.width() * img.width as f64;
                let v = (p.y - t.anchor.y0) / t.anchor.height() * img.height as f64;
                let x = (u.floor() as i64).rem_euclid(img.width as i64) as usize;
                let y = (v.floor() as i64).rem_euclid(img.height as i64) as usize;
                img.argb[y * img.width as usize + x]
            }
            Self::Custom(c) => c.argb_at(p),
        }
    }
}

fn lerp_argb(a: u32, b: u32, t: f64) -> u32 {
    let (a, b) = (a.to_be_bytes(), b.to_be_bytes());
    let mut out = [0u8; 4];
    for i in 0..4 {
        out[i] = (a[i] as f64 + (b[i] as f64 - a[i] as f64) * t).round() as u8;
    }
    u32::from_be_bytes(out)
}

fn sample_stops(stops: &[GradientStop], t: f64) -> u32 {
    let (Some(first), Some(last)) = (stops.first(), stops.last()) else {
        return 0;
    };
    let t = t.clamp(0.0, 1.0) as f32;
    if t <= first.offset {
        return first.color.argb();
    }
    for pair in stops.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if t <= b.offset {
            let span = b.offset - a.offset;
            let f = if span > 0.0 { (t - a.offset) / span } else { 1.0 };
            return lerp_argb(a.color.argb(), b.color.argb(), f as f64);
        }
    }
    last.color.argb()
}

/// Device-space sampler for a non-color paint.
#[derive(Debug)]
pub struct PaintSampler {
    paint: Paint,
    inverse: Affine,
}

impl PaintSampler {
    pub fn new(paint: Paint, transform: Affine) -> Self {
        Self {
            paint,
            inverse: transform.inverse(),
        }
    }
}

impl PaintSource for PaintSampler {
    fn argb_at(&self, x: f64, y: f64) -> u32 {
        self.paint.argb_at(self.inverse * Point::new(x, y))
    }
}

/// Application-defined stroke that turns an outline into the shape to fill.
pub trait CustomStroke: Send + Sync + fmt::Debug {
    fn stroked_shape(&self, path: &BezPath) -> BezPath;
}

#[derive(Clone, Debug)]
pub enum Stroke {
    Basic(kurbo::Stroke),
    Custom(Arc<dyn CustomStroke>),
}

impl Default for Stroke {
    fn default() -> Self {
        Self::Basic(kurbo::Stroke::new(1.0))
    }
}

impl Stroke {
    pub fn basic(width: f64) -> Self {
        Self::Basic(kurbo::Stroke::new(width))
    }

    /// Outline of `path` stroked with this stroke, in the same space as `path`.
    pub fn outline(&self, path: &BezPath, tolerance: f64) -> BezPath {
        match self {
            Self::Basic(s) => kurbo::stroke(path.iter(), s, &kurbo::StrokeOpts::default(), tolerance),
            Self::Custom(c) => c.stroked_shape(path),
        }
    }
}

/// A user clip in device space.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClipShape {
    Rect(Rect),
    /// SVG path data in JSON.
    Path(#[serde(with = "crate::foundation::core::svg_path")] BezPath),
}

impl ClipShape {
    /// Map through `t`. Rectangles stay rectangles under axis-aligned transforms.
    pub fn transformed(&self, t: Affine) -> Self {
        let [_, b, c, _, _, _] = t.as_coeffs();
        match self {
            Self::Rect(r) if b == 0.0 && c == 0.0 => Self::Rect(t.transform_rect_bbox(*r)),
            Self::Rect(r) => Self::Path(t * r.to_path(0.1)),
            Self::Path(p) => Self::Path(t * p.clone()),
        }
    }

    pub fn bounding_box(&self) -> Rect {
        match self {
            Self::Rect(r) => *r,
            Self::Path(p) => p.bounding_box(),
        }
    }

    pub fn to_path(&self) -> BezPath {
        match self {
            Self::Rect(r) => r.to_path(0.1),
            Self::Path(p) => p.clone(),
        }
    }
}

/// Classify `t`, returning its state and, for translations, the rounded integer offset.
pub fn classify_transform(t: Affine) -> (TransformState, i32, i32) {
    let [a, b, c, d, e, f] = t.as_coeffs();
    if b == 0.0 && c == 0.0 && a == 1.0 && d == 1.0 {
        if e == 0.0 && f == 0.0 {
            return (TransformState::Identity, 0, 0);
        }
        let (tx, ty) = ((e + 0.5).floor(), (f + 0.5).floor());
        let fits = |v: f64| (i32::MIN as f64..=i32::MAX as f64).contains(&v);
        let state = if tx == e && ty == f && fits(tx) && fits(ty) {
            TransformState::IntTranslate
        } else {
            TransformState::AnyTranslate
        };
        return (state, tx as i32, ty as i32);
    }
    if b == 0.0 && c == 0.0 && a >= 0.0 && d >= 0.0 {
        return (TransformState::TranslateScale, 0, 0);
    }
    (TransformState::Generic, 0, 0)
}

/// Square of the largest factor by which `t` stretches a unit vector.
pub fn max_stretch_squared(t: Affine) -> f64 {
    let [a, b, c, d, _, _] = t.as_coeffs();
    if a * c + b * d == 0.0 && a * a + b * b == c * c + d * d {
        return t.determinant().abs();
    }
    let ea = a * a + b * b;
    let eb = 2.0 * (a * c + b * d);
    let ec = c * c + d * d;
    let hypot = (eb * eb + (ea - ec) * (ea - ec)).sqrt();
    (ea + ec + hypot) / 2.0
}

/// Stroke classification for a basic stroke under transform state `ts`.
pub fn classify_basic_stroke(
    stroke: &kurbo::Stroke,
    transform: Affine,
    ts: TransformState,
    aa: bool,
    min_aa_pen_size: f64,
) -> StrokeState {
    let thin = |dashed: bool| {
        if dashed {
            StrokeState::ThinDashed
        } else {
            StrokeState::Thin
        }
    };
    let dashed = !stroke.dash_pattern.is_empty();
    let lw = stroke.width;
    if ts < TransformState::TranslateScale {
        let limit = if aa { min_aa_pen_size } else { 1.0 };
        return if lw <= limit {
            thin(dashed)
        } else {
            StrokeState::Wide
        };
    }
    let widthsq = max_stretch_squared(transform) * lw * lw;
    let limit = if aa {
        min_aa_pen_size * min_aa_pen_size
    } else {
        1.000000001
    };
    if widthsq <= limit {
        thin(dashed)
    } else {
        StrokeState::Wide
    }
}

#[cfg(test)]
#[path = "../../tests/unit/context/state.rs"]
mod tests;
