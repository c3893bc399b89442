//! JSON drawing scripts.
//!
//! A [`Script`] names a target surface, a set of source images and a list of [`Command`]s
//! applied in order to one [`GraphicsContext`]. Scripts drive the `gfxpipe` binary and the
//! end-to-end tests.

use crate::context::state::{GradientPaint, LinearGradient, RadialGradient, TexturePaint};
use crate::context::{AlphaComposite, ClipShape, Composite, Font, GraphicsContext, Paint, Rule};
use crate::context::{RenderingHint, Stroke};
use crate::foundation::core::{Affine, BezPath, Color, ColorModel, Rect, svg_path};
use crate::foundation::error::{GfxError, GfxResult};
use crate::render::SourceImage;
use crate::render::registry::PipeRegistry;
use crate::surface::{BufferedSurface, SharedSurface};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::sync::Arc;

const MAX_DIMENSION: u32 = 16_384;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Script {
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub model: ColorModel,
    /// Initial fill of the target; transparent when absent.
    #[serde(default)]
    pub background: Option<Color>,
    /// Named source images for `draw_image` and texture paints.
    #[serde(default)]
    pub images: BTreeMap<String, ImageSpec>,
    pub commands: Vec<Command>,
}

/// A small source image given inline, either as a solid fill or row-major pixels.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImageSpec {
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub model: ColorModel,
    #[serde(default = "default_image_fill")]
    pub fill: Color,
    #[serde(default)]
    pub pixels: Option<Vec<Color>>,
}

fn default_image_fill() -> Color {
    Color::TRANSPARENT
}

impl ImageSpec {
    fn argb(&self) -> GfxResult<Vec<u32>> {
        let len = self.width as usize * self.height as usize;
        match &self.pixels {
            Some(px) if px.len() != len => Err(GfxError::illegal_argument(format!(
                "image has {} pixels, expected {}x{}",
                px.len(),
                self.width,
                self.height
            ))),
            Some(px) => Ok(px.iter().map(|c| c.argb()).collect()),
            None => Ok(vec![self.fill.argb(); len]),
        }
    }

    fn to_surface(&self) -> GfxResult<Arc<BufferedSurface>> {
        let bytes = self
            .argb()?
            .into_iter()
            .flat_map(|p| {
                let [a, r, g, b] = p.to_be_bytes();
                [r, g, b, a]
            })
            .collect();
        let img = image::RgbaImage::from_raw(self.width, self.height, bytes)
            .ok_or_else(|| GfxError::illegal_argument("image dimensions do not match pixels"))?;
        Ok(BufferedSurface::from_rgba_image(&img, self.model))
    }

    fn to_source(&self) -> GfxResult<SourceImage> {
        Ok(SourceImage {
            origin_x: 0,
            origin_y: 0,
            width: self.width,
            height: self.height,
            argb: self.argb()?,
        })
    }
}

/// Integer rectangle argument shared by the rectangle verbs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Area {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapSpec {
    Butt,
    Round,
    #[default]
    Square,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinSpec {
    Bevel,
    #[default]
    Miter,
    Round,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StrokeSpec {
    pub width: f64,
    #[serde(default)]
    pub cap: CapSpec,
    #[serde(default)]
    pub join: JoinSpec,
    #[serde(default)]
    pub dash: Vec<f64>,
    #[serde(default)]
    pub dash_offset: f64,
}

impl StrokeSpec {
    pub fn to_stroke(&self) -> Stroke {
        let cap = match self.cap {
            CapSpec::Butt => kurbo::Cap::Butt,
            CapSpec::Round => kurbo::Cap::Round,
            CapSpec::Square => kurbo::Cap::Square,
        };
        let join = match self.join {
            JoinSpec::Bevel => kurbo::Join::Bevel,
            JoinSpec::Miter => kurbo::Join::Miter,
            JoinSpec::Round => kurbo::Join::Round,
        };
        let mut s = kurbo::Stroke::new(self.width).with_caps(cap).with_join(join);
        if !self.dash.is_empty() {
            s = s.with_dashes(self.dash_offset, self.dash.iter().copied());
        }
        Stroke::Basic(s)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PaintSpec {
    Color { color: Color },
    Gradient(GradientPaint),
    LinearGradient(LinearGradient),
    RadialGradient(RadialGradient),
    /// Tile a named script image across `anchor`-sized cells.
    Texture { image: String, anchor: Rect },
}

/// One script step. Serialized with an `op` tag, e.g. `{"op": "fill_rect", "x": 0, ...}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Command {
    SetColor { color: Color },
    SetBackground { color: Color },
    SetPaint { paint: PaintSpec },
    SetComposite {
        rule: Rule,
        #[serde(default = "default_alpha")]
        alpha: f32,
    },
    SetXorMode { color: Color },
    SetPaintMode,
    SetStroke(StrokeSpec),
    SetTransform { matrix: [f64; 6] },
    Translate { x: f64, y: f64 },
    TranslateInt { x: i32, y: i32 },
    Scale { x: f64, y: f64 },
    Rotate { theta: f64 },
    Shear { x: f64, y: f64 },
    SetClip { clip: Option<ClipShape> },
    SetClipRect(Area),
    ClipRect(Area),
    Clip { clip: ClipShape },
    Constrain(Area),
    SetHint { hint: RenderingHint },
    SetHints { hints: Vec<RenderingHint> },
    AddHints { hints: Vec<RenderingHint> },
    SetFont { font: Font },
    FillRect(Area),
    DrawRect(Area),
    ClearRect(Area),
    DrawLine { x1: i32, y1: i32, x2: i32, y2: i32 },
    DrawOval(Area),
    FillOval(Area),
    DrawRoundRect {
        #[serde(flatten)]
        area: Area,
        arc_w: i32,
        arc_h: i32,
    },
    FillRoundRect {
        #[serde(flatten)]
        area: Area,
        arc_w: i32,
        arc_h: i32,
    },
    DrawPolyline { xs: Vec<i32>, ys: Vec<i32> },
    DrawPolygon { xs: Vec<i32>, ys: Vec<i32> },
    FillPolygon { xs: Vec<i32>, ys: Vec<i32> },
    /// Path given as SVG path data.
    DrawPath {
        #[serde(with = "svg_path")]
        path: BezPath,
    },
    FillPath {
        #[serde(with = "svg_path")]
        path: BezPath,
    },
    DrawString { text: String, x: f64, y: f64 },
    CopyArea {
        #[serde(flatten)]
        area: Area,
        dx: i32,
        dy: i32,
    },
    DrawImage {
        image: String,
        x: i32,
        y: i32,
        #[serde(default)]
        bg: Option<Color>,
    },
}

fn default_alpha() -> f32 {
    1.0
}

impl Command {
    /// Whether this step changes context state rather than drawing.
    pub fn is_state_change(&self) -> bool {
        !matches!(
            self,
            Self::FillRect(_)
                | Self::DrawRect(_)
                | Self::ClearRect(_)
                | Self::DrawLine { .. }
                | Self::DrawOval(_)
                | Self::FillOval(_)
                | Self::DrawRoundRect { .. }
                | Self::FillRoundRect { .. }
                | Self::DrawPolyline { .. }
                | Self::DrawPolygon { .. }
                | Self::FillPolygon { .. }
                | Self::DrawPath { .. }
                | Self::FillPath { .. }
                | Self::DrawString { .. }
                | Self::CopyArea { .. }
                | Self::DrawImage { .. }
        )
    }

    fn apply(&self, ctx: &mut GraphicsContext, images: &Images<'_>) -> GfxResult<()> {
        match self {
            Self::SetColor { color } => ctx.set_color(*color),
            Self::SetBackground { color } => ctx.set_background(*color),
            Self::SetPaint { paint } => ctx.set_paint(images.paint(paint)?),
            Self::SetComposite { rule, alpha } => {
                ctx.set_composite(Composite::Alpha(AlphaComposite::new(*rule, *alpha)?))?
            }
            Self::SetXorMode { color } => ctx.set_xor_mode(*color),
            Self::SetPaintMode => ctx.set_paint_mode(),
            Self::SetStroke(spec) => ctx.set_stroke(spec.to_stroke())?,
            Self::SetTransform { matrix } => ctx.set_transform(Affine::new(*matrix)),
            Self::Translate { x, y } => ctx.translate(*x, *y),
            Self::TranslateInt { x, y } => ctx.translate_int(*x, *y),
            Self::Scale { x, y } => ctx.scale(*x, *y),
            Self::Rotate { theta } => ctx.rotate(*theta),
            Self::Shear { x, y } => ctx.shear(*x, *y),
            Self::SetClip { clip } => ctx.set_clip(clip.clone()),
            Self::SetClipRect(a) => ctx.set_clip_rect(a.x, a.y, a.w, a.h),
            Self::ClipRect(a) => ctx.clip_rect(a.x, a.y, a.w, a.h),
            Self::Clip { clip } => ctx.clip(clip.clone()),
            Self::Constrain(a) => ctx.constrain(a.x, a.y, a.w, a.h),
            Self::SetHint { hint } => ctx.set_rendering_hint(hint.clone())?,
            Self::SetHints { hints } => ctx.set_rendering_hints(hints.clone())?,
            Self::AddHints { hints } => ctx.add_rendering_hints(hints.clone())?,
            Self::SetFont { font } => ctx.set_font(font.clone()),
            Self::FillRect(a) => ctx.fill_rect(a.x, a.y, a.w, a.h)?,
            Self::DrawRect(a) => ctx.draw_rect(a.x, a.y, a.w, a.h)?,
            Self::ClearRect(a) => ctx.clear_rect(a.x, a.y, a.w, a.h)?,
            Self::DrawLine { x1, y1, x2, y2 } => ctx.draw_line(*x1, *y1, *x2, *y2)?,
            Self::DrawOval(a) => ctx.draw_oval(a.x, a.y, a.w, a.h)?,
            Self::FillOval(a) => ctx.fill_oval(a.x, a.y, a.w, a.h)?,
            Self::DrawRoundRect { area: a, arc_w, arc_h } => {
                ctx.draw_round_rect(a.x, a.y, a.w, a.h, *arc_w, *arc_h)?
            }
            Self::FillRoundRect { area: a, arc_w, arc_h } => {
                ctx.fill_round_rect(a.x, a.y, a.w, a.h, *arc_w, *arc_h)?
            }
            Self::DrawPolyline { xs, ys } => ctx.draw_polyline(xs, ys, xs.len().min(ys.len()))?,
            Self::DrawPolygon { xs, ys } => ctx.draw_polygon(xs, ys, xs.len().min(ys.len()))?,
            Self::FillPolygon { xs, ys } => ctx.fill_polygon(xs, ys, xs.len().min(ys.len()))?,
            Self::DrawPath { path } => ctx.draw(path)?,
            Self::FillPath { path } => ctx.fill(path)?,
            Self::DrawString { text, x, y } => ctx.draw_string(text, *x, *y)?,
            Self::CopyArea { area: a, dx, dy } => ctx.copy_area(a.x, a.y, a.w, a.h, *dx, *dy)?,
            Self::DrawImage { image, x, y, bg } => {
                let src = images.surface(image)?;
                if !ctx.draw_image(&src, *x, *y, *bg)? {
                    tracing::debug!(image = %image, "image source unreadable; draw skipped");
                }
            }
        }
        Ok(())
    }
}

struct Images<'a> {
    specs: &'a BTreeMap<String, ImageSpec>,
    surfaces: BTreeMap<&'a str, SharedSurface>,
}

impl Images<'_> {
    fn surface(&self, name: &str) -> GfxResult<SharedSurface> {
        self.surfaces
            .get(name)
            .cloned()
            .ok_or_else(|| GfxError::illegal_argument(format!("unknown image '{name}'")))
    }

    fn paint(&self, spec: &PaintSpec) -> GfxResult<Paint> {
        Ok(match spec {
            PaintSpec::Color { color } => Paint::Color(*color),
            PaintSpec::Gradient(g) => Paint::Gradient(g.clone()),
            PaintSpec::LinearGradient(g) => Paint::LinearGradient(g.clone()),
            PaintSpec::RadialGradient(g) => Paint::RadialGradient(g.clone()),
            PaintSpec::Texture { image, anchor } => {
                let img = self
                    .specs
                    .get(image)
                    .ok_or_else(|| GfxError::illegal_argument(format!("unknown image '{image}'")))?;
                if anchor.width() <= 0.0 || anchor.height() <= 0.0 {
                    return Err(GfxError::illegal_argument("texture anchor must be non-empty"));
                }
                Paint::Texture(TexturePaint {
                    image: Arc::new(img.to_source()?),
                    anchor: *anchor,
                })
            }
        })
    }
}

impl Script {
    pub fn from_json_str(s: &str) -> GfxResult<Self> {
        let script: Self = serde_json::from_str(s)
            .map_err(|e| GfxError::illegal_argument(format!("parse script: {e}")))?;
        script.validate()?;
        Ok(script)
    }

    pub fn from_reader<R: Read>(r: R) -> GfxResult<Self> {
        let script: Self = serde_json::from_reader(r)
            .map_err(|e| GfxError::illegal_argument(format!("parse script: {e}")))?;
        script.validate()?;
        Ok(script)
    }

    pub fn from_path(path: impl AsRef<Path>) -> GfxResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            GfxError::illegal_argument(format!("open script '{}': {e}", path.display()))
        })?;
        Self::from_reader(BufReader::new(f))
    }

    pub fn validate(&self) -> GfxResult<()> {
        let dims = std::iter::once((self.width, self.height))
            .chain(self.images.values().map(|i| (i.width, i.height)));
        for (w, h) in dims {
            if w == 0 || h == 0 || w > MAX_DIMENSION || h > MAX_DIMENSION {
                return Err(GfxError::illegal_argument(format!(
                    "surface size {w}x{h} must be within 1..={MAX_DIMENSION}"
                )));
            }
        }
        for (name, img) in &self.images {
            img.argb()
                .map_err(|e| GfxError::illegal_argument(format!("image '{name}': {e}")))?;
        }
        Ok(())
    }

    /// Run every command against a fresh target and return it.
    pub fn run(&self, registry: Arc<PipeRegistry>) -> GfxResult<Arc<BufferedSurface>> {
        self.run_with(registry, |_, _, _| Ok(()))
    }

    /// Like [`Script::run`], calling `observe` after each step with its index.
    #[tracing::instrument(level = "debug", skip_all, fields(width = self.width, height = self.height))]
    pub fn run_with(
        &self,
        registry: Arc<PipeRegistry>,
        mut observe: impl FnMut(usize, &Command, &mut GraphicsContext) -> GfxResult<()>,
    ) -> GfxResult<Arc<BufferedSurface>> {
        self.validate()?;
        let target = BufferedSurface::new(self.width, self.height, self.model);
        if let Some(bg) = self.background {
            target.clear_to(bg.argb());
        }

        let mut surfaces = BTreeMap::new();
        for (name, spec) in &self.images {
            let s: SharedSurface = spec.to_surface()?;
            surfaces.insert(name.as_str(), s);
        }
        let images = Images {
            specs: &self.images,
            surfaces,
        };

        let surface: SharedSurface = target.clone();
        let mut ctx = GraphicsContext::new(surface, registry);
        for (i, cmd) in self.commands.iter().enumerate() {
            cmd.apply(&mut ctx, &images)
                .inspect_err(|e| tracing::warn!(step = i, error = %e, "script step failed"))?;
            observe(i, cmd, &mut ctx)?;
        }
        ctx.dispose();
        tracing::debug!(stats = ?ctx.stats(), "script finished");
        Ok(target)
    }
}

#[cfg(test)]
#[path = "../tests/unit/script.rs"]
mod tests;
