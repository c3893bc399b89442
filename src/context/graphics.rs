use crate::context::dispatch::{self, Slot};
use crate::context::font::{
    Font, FontInfo, FontInputs, FontMetrics, FontRenderContext, TextAaMode, resolve_font_info,
};
use crate::context::hints::{
    AntialiasHint, FractionalMetricsHint, HintKey, Hints, RenderingHint, TextAntialiasHint,
};
use crate::context::state::{
    AlphaComposite, ClipShape, ClipState, Composite, CompositeState, Paint, PaintState,
    Stroke, StrokeState, TransformState, XorComposite, classify_basic_stroke, classify_transform,
};
use crate::foundation::core::{Affine, BezPath, Color, IntRect, Point, Rect, Shape, Transparency};
use crate::foundation::error::{GfxError, GfxResult};
use crate::pipe::{PipeSet, PipeSnapshot, TextPipeKind};
use crate::render::region::Region;
use crate::render::registry::PipeRegistry;
use crate::render::types::CompositeType;
use crate::surface::{NullSurface, SharedSurface};
use serde::Serialize;
use std::sync::Arc;

/// Counters describing how a context's pipes have been used.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ContextStats {
    /// Pipe selections run against the bound surface.
    pub validations: u64,
    /// Operations that hit an invalid pipe and revalidated.
    pub retries: u64,
    /// Operations abandoned after a failed retry.
    pub dropped: u64,
}

/// Mutable drawing state bound to one destination surface.
///
/// Every mutator classifies its new value; a change of classification resets the pipe slots
/// so the next drawing call re-selects them. Drawing calls recover from a surface that went
/// invalid underneath them by rebinding to its replacement and retrying once.
///
/// Contexts are single-writer. Sharing one between threads needs external locking.
#[derive(Clone, Debug)]
pub struct GraphicsContext {
    surface: SharedSurface,
    registry: Arc<PipeRegistry>,
    pipes: PipeSet,

    paint: Paint,
    foreground: Color,
    background: Color,
    composite: Composite,
    image_comp: CompositeType,
    stroke: Stroke,
    transform: Affine,
    trans_x: i32,
    trans_y: i32,
    hints: Hints,
    font: Font,

    paint_state: PaintState,
    composite_state: CompositeState,
    stroke_state: StrokeState,
    transform_state: TransformState,
    clip_state: ClipState,

    // composite-adjusted foreground and its destination pixel
    eargb: u32,
    pixel: u32,

    constrain_x: i32,
    constrain_y: i32,
    constrain_clip: Option<IntRect>,
    dev_clip: IntRect,
    // device space
    user_clip: Option<Vec<ClipShape>>,
    clip_region: Region,

    font_info: Option<FontInfo>,
    last_text_aa: Option<TextAaMode>,
    glyph_vector_font_info: Option<(Font, FontRenderContext, FontInfo)>,
    font_metrics: Option<FontMetrics>,

    disposed: bool,
    stats: ContextStats,
}

impl GraphicsContext {
    /// New context drawing black on white with the default font, stroke and hints.
    pub fn new(surface: SharedSurface, registry: Arc<PipeRegistry>) -> Self {
        let hints = Hints::new(registry.config().lcd_text_contrast);
        let foreground = Color::BLACK;
        let (paint_state, composite_state) = if foreground.is_opaque() {
            (PaintState::OpaqueColor, CompositeState::Copy)
        } else {
            (PaintState::AlphaColor, CompositeState::Alpha)
        };
        let mut ctx = Self {
            surface,
            registry,
            pipes: PipeSet::invalid(),
            paint: Paint::Color(foreground),
            foreground,
            background: Color::WHITE,
            composite: Composite::default(),
            image_comp: CompositeType::SrcOverNoEa,
            stroke: Stroke::default(),
            transform: Affine::IDENTITY,
            trans_x: 0,
            trans_y: 0,
            hints,
            font: Font::default(),
            paint_state,
            composite_state,
            stroke_state: StrokeState::Thin,
            transform_state: TransformState::Identity,
            clip_state: ClipState::Device,
            eargb: 0,
            pixel: 0,
            constrain_x: 0,
            constrain_y: 0,
            constrain_clip: None,
            dev_clip: IntRect::default(),
            user_clip: None,
            clip_region: Region::empty(),
            font_info: None,
            last_text_aa: None,
            glyph_vector_font_info: None,
            font_metrics: None,
            disposed: false,
            stats: ContextStats::default(),
        };
        ctx.validate_color();
        ctx.validate_stroke();
        let bounds = ctx.surface.bounds();
        ctx.set_dev_clip(bounds);
        ctx.invalidate_pipe();
        ctx
    }

    /// Child context sharing the surface, with its own copy of every attribute.
    pub fn create(&self) -> Self {
        let mut child = self.clone();
        child.stats = ContextStats::default();
        child
    }

    /// Rebind to the null surface. Later drawing calls succeed and draw nothing.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.surface = NullSurface::shared();
        self.invalidate_pipe();
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn surface(&self) -> &SharedSurface {
        &self.surface
    }

    pub fn registry(&self) -> &PipeRegistry {
        &self.registry
    }

    pub fn stats(&self) -> ContextStats {
        self.stats
    }

    // ---- classification codes ----

    pub fn paint_state(&self) -> PaintState {
        self.paint_state
    }

    pub fn composite_state(&self) -> CompositeState {
        self.composite_state
    }

    pub fn stroke_state(&self) -> StrokeState {
        self.stroke_state
    }

    pub fn transform_state(&self) -> TransformState {
        self.transform_state
    }

    pub fn clip_state(&self) -> ClipState {
        self.clip_state
    }

    /// Kernel composite type derived from the current composite.
    pub fn image_comp(&self) -> CompositeType {
        self.image_comp
    }

    // ---- pipes ----

    pub fn pipes(&self) -> &PipeSet {
        &self.pipes
    }

    /// Install a freshly selected pipe set. Called by surfaces from `validate_pipe`.
    pub fn set_pipes(&mut self, pipes: PipeSet) {
        self.pipes = pipes;
    }

    /// Current selection, validating first when any slot is invalid.
    pub fn validated_pipes(&mut self) -> GfxResult<PipeSnapshot> {
        if let Err(err) = self.ensure_pipes(true) {
            if !err.is_invalid_pipe() {
                return Err(err);
            }
            self.revalidate_all()?;
        }
        Ok(self.pipes.snapshot())
    }

    fn invalidate_pipe(&mut self) {
        tracing::trace!("pipes invalidated");
        self.pipes = PipeSet::invalid();
    }

    fn invalidate_font_info(&mut self) {
        self.font_info = None;
        self.font_metrics = None;
        self.glyph_vector_font_info = None;
    }

    fn validate_pipe(&mut self) -> GfxResult<()> {
        if !self.surface.is_valid() {
            return Err(GfxError::invalid_pipe("destination surface is invalid"));
        }
        self.stats.validations += 1;
        let surface = Arc::clone(&self.surface);
        surface.validate_pipe(self)
    }

    fn ensure_pipes(&mut self, text: bool) -> GfxResult<()> {
        let ready = if text {
            self.pipes.is_valid()
        } else {
            self.pipes.graphics_valid()
        };
        if ready { Ok(()) } else { self.validate_pipe() }
    }

    /// Rebind to the surface's replacement and recompute everything derived from it.
    #[tracing::instrument(level = "debug", skip(self))]
    fn revalidate_all(&mut self) -> GfxResult<()> {
        self.surface = self
            .surface
            .replacement()
            .unwrap_or_else(NullSurface::shared);
        self.invalidate_pipe();
        let bounds = self.surface.bounds();
        self.set_dev_clip(bounds);
        if self.paint_state <= PaintState::AlphaColor {
            self.validate_color();
        }
        if let Composite::Xor(xor) = &self.composite {
            let color = xor.xor_color;
            self.composite = Composite::Xor(XorComposite::new(color, &*self.surface));
        }
        self.validate_pipe()
    }

    /// Run `op` with valid pipes, revalidating and retrying once when the surface went
    /// invalid. A second failure drops the operation.
    fn run_op<T: Default>(
        &mut self,
        text: bool,
        mut op: impl FnMut(&mut Self) -> GfxResult<T>,
    ) -> GfxResult<T> {
        let mut attempt = |ctx: &mut Self| {
            ctx.ensure_pipes(text)?;
            op(ctx)
        };
        let result = match attempt(self) {
            Err(err) if err.is_invalid_pipe() => {
                self.stats.retries += 1;
                match self.revalidate_all() {
                    Err(err) if err.is_invalid_pipe() => {
                        self.stats.dropped += 1;
                        tracing::debug!(%err, "revalidation failed; operation dropped");
                        Ok(T::default())
                    }
                    Err(err) => Err(err),
                    Ok(()) => match attempt(self) {
                        Err(err) if err.is_invalid_pipe() => {
                            self.stats.dropped += 1;
                            tracing::debug!(%err, "retry failed; operation dropped");
                            Ok(T::default())
                        }
                        other => other,
                    },
                }
            }
            other => other,
        };
        self.surface.mark_dirty();
        result
    }

    // ---- color and paint ----

    pub fn paint(&self) -> &Paint {
        &self.paint
    }

    /// Foreground color; the last color set directly or through `set_paint`.
    pub fn color(&self) -> Color {
        self.foreground
    }

    pub fn background(&self) -> Color {
        self.background
    }

    pub fn set_background(&mut self, color: Color) {
        self.background = color;
    }

    /// Composite-adjusted foreground and its destination encoding.
    pub fn color_pixel(&self) -> (u32, u32) {
        (self.eargb, self.pixel)
    }

    fn validate_color(&mut self) {
        let eargb = if self.image_comp == CompositeType::Clear {
            0
        } else {
            let argb = self.foreground.argb();
            let scaled = self.composite_state <= CompositeState::Alpha
                && !matches!(
                    self.image_comp,
                    CompositeType::SrcNoEa | CompositeType::SrcOverNoEa
                );
            if scaled {
                let a = (self.composite.extra_alpha() * (argb >> 24) as f32).round() as u32;
                (argb & 0x00ff_ffff) | (a.min(0xff) << 24)
            } else {
                argb
            }
        };
        self.eargb = eargb;
        self.pixel = self.surface.pixel_for(eargb);
    }

    pub fn set_color(&mut self, color: Color) {
        if self.paint == Paint::Color(color) {
            return;
        }
        self.paint = Paint::Color(color);
        self.foreground = color;
        self.validate_color();
        let state = if self.eargb >> 24 == 0xff {
            PaintState::OpaqueColor
        } else {
            PaintState::AlphaColor
        };
        if state == self.paint_state {
            return;
        }
        self.paint_state = state;
        if self.image_comp == CompositeType::SrcOverNoEa {
            self.composite_state = if state == PaintState::OpaqueColor {
                CompositeState::Copy
            } else {
                CompositeState::Alpha
            };
        }
        self.invalidate_font_info();
        self.invalidate_pipe();
    }

    pub fn set_paint(&mut self, paint: Paint) {
        if let Paint::Color(color) = paint {
            self.set_color(color);
            return;
        }
        if self.paint == paint {
            return;
        }
        if self.image_comp == CompositeType::SrcOverNoEa {
            if paint.transparency() == Transparency::Opaque {
                self.composite_state = CompositeState::Copy;
            } else if self.composite_state == CompositeState::Copy {
                self.composite_state = CompositeState::Alpha;
            }
        }
        self.paint_state = paint.state();
        self.paint = paint;
        self.invalidate_font_info();
        self.invalidate_pipe();
    }

    // ---- composite ----

    pub fn composite(&self) -> &Composite {
        &self.composite
    }

    fn alpha_composite_state(&self, ac: &AlphaComposite) -> (CompositeState, CompositeType) {
        let ty = ac.composite_type();
        let state = match ty {
            CompositeType::SrcOverNoEa => {
                let opaque_paint = self.paint_state == PaintState::OpaqueColor
                    || (self.paint_state > PaintState::AlphaColor
                        && self.paint.transparency() == Transparency::Opaque);
                if opaque_paint {
                    CompositeState::Copy
                } else {
                    CompositeState::Alpha
                }
            }
            CompositeType::SrcNoEa | CompositeType::Src | CompositeType::Clear => {
                CompositeState::Copy
            }
            CompositeType::SrcIn if self.surface.transparency() == Transparency::Opaque => {
                CompositeState::Copy
            }
            _ => CompositeState::Alpha,
        };
        (state, ty)
    }

    /// Install `comp`. Custom composites fail with [`GfxError::Permission`] on surfaces that
    /// refuse pixel reads.
    pub fn set_composite(&mut self, comp: Composite) -> GfxResult<()> {
        if self.composite == comp {
            return Ok(());
        }
        let (state, ty) = match &comp {
            Composite::Alpha(ac) => self.alpha_composite_state(ac),
            Composite::Xor(_) => (CompositeState::Xor, CompositeType::Xor),
            Composite::Custom(_) => {
                self.surface.check_custom_composite()?;
                (CompositeState::Custom, CompositeType::General)
            }
        };
        self.install_composite(comp, state, ty);
        Ok(())
    }

    fn install_composite(&mut self, comp: Composite, state: CompositeState, ty: CompositeType) {
        if self.composite_state != state || self.image_comp != ty {
            self.composite_state = state;
            self.image_comp = ty;
            self.invalidate_pipe();
            self.invalidate_font_info();
        }
        self.composite = comp;
        if self.paint_state <= PaintState::AlphaColor {
            self.validate_color();
        }
    }

    /// Back to plain source-over painting.
    pub fn set_paint_mode(&mut self) {
        let comp = Composite::Alpha(AlphaComposite::SRC_OVER);
        if self.composite == comp {
            return;
        }
        let (state, ty) = self.alpha_composite_state(&AlphaComposite::SRC_OVER);
        self.install_composite(comp, state, ty);
    }

    /// Paint by XOR-ing pixels with the foreground and `color`.
    pub fn set_xor_mode(&mut self, color: Color) {
        let comp = Composite::Xor(XorComposite::new(color, &*self.surface));
        if self.composite == comp {
            return;
        }
        self.install_composite(comp, CompositeState::Xor, CompositeType::Xor);
    }

    // ---- stroke ----

    pub fn stroke(&self) -> &Stroke {
        &self.stroke
    }

    pub fn set_stroke(&mut self, stroke: Stroke) -> GfxResult<()> {
        if let Stroke::Basic(s) = &stroke {
            if !s.width.is_finite() || s.width < 0.0 {
                return Err(GfxError::illegal_argument(format!(
                    "stroke width must be finite and >= 0, got {}",
                    s.width
                )));
            }
            if s.dash_pattern.iter().any(|d| !d.is_finite() || *d < 0.0)
                || (!s.dash_pattern.is_empty() && s.dash_pattern.iter().all(|d| *d == 0.0))
            {
                return Err(GfxError::illegal_argument("invalid dash pattern"));
            }
        }
        self.stroke = stroke;
        self.validate_stroke();
        Ok(())
    }

    // Reclassify the stroke, invalidating pipes when its code changes.
    fn validate_stroke(&mut self) {
        let state = match &self.stroke {
            Stroke::Basic(s) => classify_basic_stroke(
                s,
                self.transform,
                self.transform_state,
                self.hints.antialiasing == AntialiasHint::On,
                self.registry.config().min_aa_pen_size,
            ),
            Stroke::Custom(_) => StrokeState::Custom,
        };
        if state != self.stroke_state {
            self.stroke_state = state;
            self.invalidate_pipe();
        }
    }

    // ---- transform ----

    pub fn transform(&self) -> Affine {
        self.transform
    }

    /// Integer device offset, meaningful while the transform is at most a translation.
    pub fn device_offset(&self) -> (i32, i32) {
        (self.trans_x, self.trans_y)
    }

    pub fn set_transform(&mut self, t: Affine) {
        self.transform = t;
        self.invalidate_transform();
    }

    /// Concatenate `t` after the current transform (user space is transformed by `t` first).
    pub fn concat_transform(&mut self, t: Affine) {
        self.transform *= t;
        self.invalidate_transform();
    }

    pub fn translate(&mut self, tx: f64, ty: f64) {
        self.concat_transform(Affine::translate((tx, ty)));
    }

    /// Integer translation. While the transform is at most an integer translation only the
    /// device offset changes.
    pub fn translate_int(&mut self, x: i32, y: i32) {
        if x == 0 && y == 0 {
            return;
        }
        self.transform *= Affine::translate((x as f64, y as f64));
        match (self.trans_x.checked_add(x), self.trans_y.checked_add(y)) {
            (Some(tx), Some(ty)) if self.transform_state <= TransformState::IntTranslate => {
                self.trans_x = tx;
                self.trans_y = ty;
                self.transform_state = if tx == 0 && ty == 0 {
                    TransformState::Identity
                } else {
                    TransformState::IntTranslate
                };
            }
            // offsets past i32 fall back to the floating-point classification
            _ => self.invalidate_transform(),
        }
    }

    pub fn scale(&mut self, sx: f64, sy: f64) {
        self.concat_transform(Affine::scale_non_uniform(sx, sy));
    }

    pub fn rotate(&mut self, theta: f64) {
        self.concat_transform(Affine::rotate(theta));
    }

    pub fn rotate_about(&mut self, theta: f64, x: f64, y: f64) {
        self.concat_transform(Affine::rotate_about(theta, Point::new(x, y)));
    }

    pub fn shear(&mut self, shx: f64, shy: f64) {
        self.concat_transform(Affine::skew(shx, shy));
    }

    fn invalidate_transform(&mut self) {
        let orig = self.transform_state;
        let (state, tx, ty) = classify_transform(self.transform);
        self.transform_state = state;
        self.trans_x = tx;
        self.trans_y = ty;
        if state >= TransformState::TranslateScale || orig >= TransformState::TranslateScale {
            self.invalidate_font_info();
            if state != orig {
                self.invalidate_pipe();
            }
        }
        if !matches!(self.stroke, Stroke::Custom(_)) {
            self.validate_stroke();
        }
    }

    // ---- hints ----

    pub fn hints(&self) -> &Hints {
        &self.hints
    }

    pub fn rendering_hint(&self, key: &HintKey) -> Option<RenderingHint> {
        self.hints.get(key)
    }

    pub fn rendering_hints(&self) -> Vec<RenderingHint> {
        self.hints.to_list()
    }

    pub fn set_rendering_hint(&mut self, hint: RenderingHint) -> GfxResult<()> {
        let change = self.hints.apply(hint)?;
        if change.state {
            self.invalidate_pipe();
        }
        if change.text {
            self.invalidate_font_info();
        }
        if change.stroke && !matches!(self.stroke, Stroke::Custom(_)) {
            self.validate_stroke();
        }
        Ok(())
    }

    /// Reset every hint to its default, then apply `hints`. Nothing changes when any hint is
    /// rejected.
    pub fn set_rendering_hints(&mut self, hints: Vec<RenderingHint>) -> GfxResult<()> {
        let mut next = Hints::new(self.registry.config().lcd_text_contrast);
        for hint in hints {
            next.apply(hint)?;
        }
        self.hints = next;
        self.invalidate_pipe();
        self.invalidate_font_info();
        if !matches!(self.stroke, Stroke::Custom(_)) {
            self.validate_stroke();
        }
        Ok(())
    }

    /// Apply `hints` on top of the current ones. Nothing changes when any hint is rejected.
    pub fn add_rendering_hints(&mut self, hints: Vec<RenderingHint>) -> GfxResult<()> {
        let mut probe = self.hints.clone();
        for hint in &hints {
            probe.apply(hint.clone())?;
        }
        for hint in hints {
            self.set_rendering_hint(hint)?;
        }
        Ok(())
    }

    // ---- font ----

    pub fn font(&self) -> &Font {
        &self.font
    }

    pub fn set_font(&mut self, font: Font) {
        if self.font == font {
            return;
        }
        if self.hints.text_antialiasing == TextAntialiasHint::Gasp && self.pipes.text.is_valid() {
            let aa_changed = match self.last_text_aa {
                None => true,
                Some(aa) => (aa == TextAaMode::On) != font.use_aa_for_size((font.size + 0.5) as i32),
            };
            if self.transform_state > TransformState::AnyTranslate
                || font.is_transformed()
                || aa_changed
            {
                tracing::trace!("text pipe invalidated by font change");
                self.pipes.text = TextPipeKind::Invalid;
            }
        }
        self.font = font;
        self.font_info = None;
        self.font_metrics = None;
    }

    fn font_inputs(
        &self,
        transform: Affine,
        text_antialiasing: TextAntialiasHint,
        fractional_metrics: FractionalMetricsHint,
    ) -> FontInputs {
        FontInputs {
            transform,
            transform_state: classify_transform(transform).0,
            antialiasing: self.hints.antialiasing,
            text_antialiasing,
            fractional_metrics,
            can_render_lcd: self.surface.can_render_lcd_text(self),
            promote_off_to_aa: self.registry.config().text_policy.promote_off_to_aa,
        }
    }

    /// Text parameters for the current font, transform and hints, computed on first use.
    pub fn font_info(&mut self) -> &FontInfo {
        let info = match self.font_info.take() {
            Some(info) => info,
            None => {
                let inputs = self.font_inputs(
                    self.transform,
                    self.hints.text_antialiasing,
                    self.hints.fractional_metrics,
                );
                let info = resolve_font_info(&self.font, inputs, self.registry.strikes());
                self.last_text_aa = Some(info.aa);
                info
            }
        };
        self.font_info.insert(info)
    }

    /// Text parameters for laying out `font` under an explicit render context. One entry is
    /// cached, keyed by both arguments.
    pub fn glyph_vector_font_info(&mut self, font: &Font, frc: &FontRenderContext) -> &FontInfo {
        let cached = self
            .glyph_vector_font_info
            .take()
            .filter(|(f, c, _)| f == font && c == frc);
        let entry = match cached {
            Some(entry) => entry,
            None => {
                let inputs =
                    self.font_inputs(frc.transform, frc.antialiasing, frc.fractional_metrics);
                let info = resolve_font_info(font, inputs, self.registry.strikes());
                (font.clone(), frc.clone(), info)
            }
        };
        &self.glyph_vector_font_info.insert(entry).2
    }

    pub fn font_metrics(&mut self) -> FontMetrics {
        if let Some(m) = self.font_metrics {
            return m;
        }
        let strike = Arc::clone(&self.font_info().strike);
        let m = self.registry.strikes().metrics(&strike);
        self.font_metrics = Some(m);
        m
    }

    // ---- clip ----

    pub fn clip_region(&self) -> &Region {
        &self.clip_region
    }

    /// Offset set by the last [`GraphicsContext::constrain`].
    pub fn constrain_origin(&self) -> (i32, i32) {
        (self.constrain_x, self.constrain_y)
    }

    /// Set the device clip, intersected with any constraint.
    pub fn set_dev_clip(&mut self, bounds: IntRect) {
        self.dev_clip = match self.constrain_clip {
            Some(c) => c.intersect(bounds),
            None => bounds,
        };
        self.validate_comp_clip();
    }

    /// Restrict drawing to a `w x h` area at `(x, y)` and move the origin there. Used to
    /// hand a sub-area of a surface to nested drawing code.
    pub fn constrain(&mut self, x: i32, y: i32, w: i32, h: i32) {
        if x != 0 || y != 0 {
            self.translate_int(x, y);
        }
        if self.transform_state > TransformState::TranslateScale {
            self.clip_rect(0, 0, w, h);
            return;
        }
        let [sx, _, _, sy, tx, ty] = self.transform.as_coeffs();
        let (x, y) = (tx as i32, ty as i32);
        self.constrain_x = x;
        self.constrain_y = y;
        let w = (w as f64 * sx).ceil() as i32;
        let h = (h as f64 * sy).ceil() as i32;
        let area = IntRect::new(x, y, w.max(0), h.max(0));
        let c = match self.constrain_clip {
            Some(c) => c.intersect(area),
            None => area,
        };
        if self.constrain_clip == Some(c) {
            return;
        }
        self.constrain_clip = Some(c);
        self.dev_clip = self.dev_clip.intersect(c);
        self.validate_comp_clip();
    }

    fn validate_comp_clip(&mut self) {
        let orig = self.clip_state;
        let mut region = Region::rect(self.dev_clip);
        match &self.user_clip {
            None => self.clip_state = ClipState::Device,
            Some(shapes) => {
                region = self.intersect_shapes(region, shapes);
                self.clip_state = if region.is_rectangular() {
                    ClipState::Rectangular
                } else {
                    ClipState::Shape
                };
            }
        }
        self.clip_region = region;
        if orig != self.clip_state && (orig == ClipState::Shape || self.clip_state == ClipState::Shape) {
            self.invalidate_font_info();
            self.invalidate_pipe();
        }
    }

    fn intersect_shapes(&self, mut region: Region, shapes: &[ClipShape]) -> Region {
        for shape in shapes {
            region = match shape {
                ClipShape::Rect(r) => region.intersect_rect(IntRect::covering(*r)),
                ClipShape::Path(p) => self.registry.rasterizer().rasterize(p, &region),
            };
        }
        region
    }

    /// Replace the user clip. `None` removes it.
    pub fn set_clip(&mut self, clip: Option<ClipShape>) {
        self.user_clip = clip.map(|c| vec![c.transformed(self.transform)]);
        self.validate_comp_clip();
    }

    pub fn set_clip_rect(&mut self, x: i32, y: i32, w: i32, h: i32) {
        self.set_clip(Some(ClipShape::Rect(int_rect(x, y, w, h))));
    }

    /// Intersect the user clip with `shape`.
    pub fn clip(&mut self, shape: ClipShape) {
        let dev = shape.transformed(self.transform);
        match self.user_clip.as_mut() {
            None => self.user_clip = Some(vec![dev]),
            Some(shapes) => match (shapes.last_mut(), dev) {
                (Some(ClipShape::Rect(last)), ClipShape::Rect(r)) => *last = last.intersect(r),
                (_, dev) => shapes.push(dev),
            },
        }
        self.validate_comp_clip();
    }

    pub fn clip_rect(&mut self, x: i32, y: i32, w: i32, h: i32) {
        self.clip(ClipShape::Rect(int_rect(x, y, w, h)));
    }

    /// The user clip in user space. `None` when there is no user clip or the transform
    /// cannot be inverted.
    ///
    /// A clip built from several intersected shapes comes back as their pixel coverage,
    /// independent of the device clip and any constraint.
    pub fn clip_shape(&self) -> Option<ClipShape> {
        let shapes = self.user_clip.as_ref()?;
        if self.transform.determinant() == 0.0 {
            return None;
        }
        let inverse = self.transform.inverse();
        match shapes.as_slice() {
            [one] => Some(one.transformed(inverse)),
            _ => {
                let bounds = shapes
                    .iter()
                    .map(|c| IntRect::covering(c.bounding_box()))
                    .reduce(IntRect::intersect)
                    .unwrap_or_default();
                let user = self.intersect_shapes(Region::rect(bounds), shapes);
                let mut path = BezPath::new();
                user.for_each_span(|y, x0, x1| {
                    let r = Rect::new(x0 as f64, y as f64, x1 as f64, (y + 1) as f64);
                    path.extend(r.path_elements(0.1));
                });
                Some(ClipShape::Path(inverse * path))
            }
        }
    }

    /// User-space bounds of the user clip.
    pub fn clip_bounds(&self) -> Option<Rect> {
        self.clip_shape().map(|c| c.bounding_box())
    }

    /// Whether the user-space rectangle may touch the clip.
    pub fn hit_clip(&self, x: i32, y: i32, w: i32, h: i32) -> bool {
        if w <= 0 || h <= 0 {
            return false;
        }
        let dev = self
            .transform
            .transform_rect_bbox(Rect::new(x as f64, y as f64, x as f64 + w as f64, y as f64 + h as f64));
        let area = IntRect::from_corners(
            dev.x0.floor() as i32,
            dev.y0.floor() as i32,
            dev.x1.ceil() as i32,
            dev.y1.ceil() as i32,
        );
        !area.intersect(self.clip_region.bounds()).is_empty()
    }

    // ---- drawing ----

    pub fn draw_line(&mut self, x1: i32, y1: i32, x2: i32, y2: i32) -> GfxResult<()> {
        self.run_op(false, |ctx| dispatch::draw_line(ctx, x1, y1, x2, y2))
    }

    pub fn draw_rect(&mut self, x: i32, y: i32, w: i32, h: i32) -> GfxResult<()> {
        self.run_op(false, |ctx| dispatch::draw_rect(ctx, x, y, w, h))
    }

    pub fn fill_rect(&mut self, x: i32, y: i32, w: i32, h: i32) -> GfxResult<()> {
        self.run_op(false, |ctx| dispatch::fill_rect(ctx, x, y, w, h))
    }

    /// Fill with the background color, ignoring paint and composite.
    ///
    /// Temporarily switches the context to source compositing; other threads using the same
    /// context would observe the switch.
    pub fn clear_rect(&mut self, x: i32, y: i32, w: i32, h: i32) -> GfxResult<()> {
        let comp = self.composite.clone();
        let paint = self.paint.clone();
        self.set_composite(Composite::Alpha(AlphaComposite::SRC))?;
        self.set_color(self.background);
        let result = self.fill_rect(x, y, w, h);
        self.set_paint(paint);
        self.set_composite(comp)?;
        result
    }

    fn check_points(xs: &[i32], ys: &[i32], n: usize) -> GfxResult<()> {
        if n > xs.len() || n > ys.len() {
            return Err(GfxError::illegal_argument(format!(
                "{n} points requested but only {} x and {} y coordinates given",
                xs.len(),
                ys.len()
            )));
        }
        Ok(())
    }

    pub fn draw_polyline(&mut self, xs: &[i32], ys: &[i32], n: usize) -> GfxResult<()> {
        Self::check_points(xs, ys, n)?;
        self.run_op(false, |ctx| dispatch::draw_poly(ctx, &xs[..n], &ys[..n], false))
    }

    pub fn draw_polygon(&mut self, xs: &[i32], ys: &[i32], n: usize) -> GfxResult<()> {
        Self::check_points(xs, ys, n)?;
        self.run_op(false, |ctx| dispatch::draw_poly(ctx, &xs[..n], &ys[..n], true))
    }

    pub fn fill_polygon(&mut self, xs: &[i32], ys: &[i32], n: usize) -> GfxResult<()> {
        Self::check_points(xs, ys, n)?;
        self.run_op(false, |ctx| dispatch::fill_polygon(ctx, &xs[..n], &ys[..n]))
    }

    pub fn draw_oval(&mut self, x: i32, y: i32, w: i32, h: i32) -> GfxResult<()> {
        let path = oval_path(x, y, w, h);
        self.run_op(false, |ctx| dispatch::draw_path(ctx, Slot::Draw, &path))
    }

    pub fn fill_oval(&mut self, x: i32, y: i32, w: i32, h: i32) -> GfxResult<()> {
        let path = oval_path(x, y, w, h);
        self.run_op(false, |ctx| dispatch::fill_path(ctx, Slot::Fill, &path))
    }

    pub fn draw_round_rect(
        &mut self,
        x: i32,
        y: i32,
        w: i32,
        h: i32,
        arc_w: i32,
        arc_h: i32,
    ) -> GfxResult<()> {
        let path = round_rect_path(x, y, w, h, arc_w, arc_h);
        self.run_op(false, |ctx| dispatch::draw_path(ctx, Slot::Draw, &path))
    }

    pub fn fill_round_rect(
        &mut self,
        x: i32,
        y: i32,
        w: i32,
        h: i32,
        arc_w: i32,
        arc_h: i32,
    ) -> GfxResult<()> {
        let path = round_rect_path(x, y, w, h, arc_w, arc_h);
        self.run_op(false, |ctx| dispatch::fill_path(ctx, Slot::Fill, &path))
    }

    /// Stroke the outline of `shape` with the current stroke.
    pub fn draw(&mut self, shape: &impl Shape) -> GfxResult<()> {
        let path = shape.to_path(0.1);
        self.run_op(false, |ctx| dispatch::draw_path(ctx, Slot::Shape, &path))
    }

    pub fn fill(&mut self, shape: &impl Shape) -> GfxResult<()> {
        match shape.as_rect() {
            Some(r) => self.run_op(false, |ctx| dispatch::fill_user_rect(ctx, Slot::Shape, r)),
            None => {
                let path = shape.to_path(0.1);
                self.run_op(false, |ctx| dispatch::fill_path(ctx, Slot::Shape, &path))
            }
        }
    }

    /// Draw `text` with its baseline starting at user-space `(x, y)`.
    pub fn draw_string(&mut self, text: &str, x: f64, y: f64) -> GfxResult<()> {
        if text.is_empty() {
            return Ok(());
        }
        self.run_op(true, |ctx| {
            let info = ctx.font_info().clone();
            dispatch::draw_text(ctx, &info, text, Point::new(x, y))
        })
    }

    pub fn draw_chars(
        &mut self,
        chars: &[char],
        offset: usize,
        len: usize,
        x: f64,
        y: f64,
    ) -> GfxResult<()> {
        let end = offset
            .checked_add(len)
            .filter(|&end| end <= chars.len())
            .ok_or_else(|| {
                GfxError::illegal_argument(format!(
                    "chars {offset}..{offset}+{len} out of range for {} chars",
                    chars.len()
                ))
            })?;
        let text: String = chars[offset..end].iter().collect();
        self.draw_string(&text, x, y)
    }

    /// Draw `src` with its top-left corner at user-space `(x, y)`, composited over `bg`
    /// first when given. Returns `false` when the source could not be read.
    pub fn draw_image(
        &mut self,
        src: &SharedSurface,
        x: i32,
        y: i32,
        bg: Option<Color>,
    ) -> GfxResult<bool> {
        self.run_op(false, |ctx| dispatch::draw_image(ctx, src, x, y, bg))
    }

    /// Copy a user-space area by `(dx, dy)` within the bound surface.
    pub fn copy_area(&mut self, x: i32, y: i32, w: i32, h: i32, dx: i32, dy: i32) -> GfxResult<()> {
        if w <= 0 || h <= 0 {
            return Ok(());
        }
        let (mut x, mut y, mut w, mut h, mut dx, mut dy) = (x, y, w, h, dx, dy);
        match self.transform_state {
            TransformState::Generic => {
                return Err(GfxError::illegal_state(
                    "copy_area is not supported under rotating or shearing transforms",
                ));
            }
            TransformState::TranslateScale => {
                let t = self.transform;
                let round = |p: Point| ((p.x - 0.5).ceil() as i32, (p.y - 0.5).ceil() as i32);
                let (x0, y0) = round(t * Point::new(x as f64, y as f64));
                let far = |a: i32, b: i32| a as f64 + b as f64;
                let (x1, y1) = round(t * Point::new(far(x, w), far(y, h)));
                let (x2, y2) = round(t * Point::new(far(x, dx), far(y, dy)));
                (x, y) = (x0, y0);
                (w, h) = (x1.saturating_sub(x0), y1.saturating_sub(y0));
                (dx, dy) = (x2.saturating_sub(x0), y2.saturating_sub(y0));
                if w < 0 {
                    w = w.saturating_neg();
                    x = x.saturating_sub(w);
                }
                if h < 0 {
                    h = h.saturating_neg();
                    y = y.saturating_sub(h);
                }
            }
            _ => {
                x = x.saturating_add(self.trans_x);
                y = y.saturating_add(self.trans_y);
            }
        }
        let area = IntRect::new(x, y, w, h);
        self.run_op(false, |ctx| {
            let surface = Arc::clone(&ctx.surface);
            if surface.copy_area(ctx, area, dx, dy)? {
                return Ok(());
            }
            dispatch::copy_area(ctx, area, dx, dy)
        })
    }
}

fn int_rect(x: i32, y: i32, w: i32, h: i32) -> Rect {
    Rect::new(x as f64, y as f64, x as f64 + w as f64, y as f64 + h as f64)
}

fn oval_path(x: i32, y: i32, w: i32, h: i32) -> BezPath {
    kurbo::Ellipse::from_rect(int_rect(x, y, w, h)).to_path(0.1)
}

// kurbo corners are circular; the smaller arc decides the radius.
fn round_rect_path(x: i32, y: i32, w: i32, h: i32, arc_w: i32, arc_h: i32) -> BezPath {
    let radius = (arc_w.min(arc_h).max(0) as f64) / 2.0;
    kurbo::RoundedRect::from_rect(int_rect(x, y, w, h), radius).to_path(0.1)
}

#[cfg(test)]
#[path = "../../tests/unit/context/graphics.rs"]
mod tests;
