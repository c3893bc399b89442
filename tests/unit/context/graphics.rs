use super::*;
use crate::context::font::Font;
use crate::context::hints::{AntialiasHint, RenderingHint, TextAntialiasHint};
use crate::context::state::{
    ClipShape, ClipState, Composite, CompositeState, CustomComposite, PaintState, TransformState,
};
use crate::foundation::core::{ColorModel, IntRect};
use crate::render::kernels::Raster;
use crate::state::State;
use crate::surface::{BufferedSurface, Surface, SurfaceCore};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

fn ctx_on(s: &Arc<BufferedSurface>) -> GraphicsContext {
    let shared: SharedSurface = s.clone();
    GraphicsContext::new(shared, Arc::new(PipeRegistry::default()))
}

fn fresh() -> (Arc<BufferedSurface>, GraphicsContext) {
    let s = BufferedSurface::new(16, 16, ColorModel::IntArgb);
    s.clear_to(0xffff_ffff);
    let c = ctx_on(&s);
    (s, c)
}

/// Surface whose pipe selection always reports it went invalid.
#[derive(Debug)]
struct Flaky {
    core: SurfaceCore,
    selections: Arc<AtomicUsize>,
    next: Mutex<Option<SharedSurface>>,
}

impl Flaky {
    fn new(selections: Arc<AtomicUsize>, next: Option<SharedSurface>) -> Arc<Self> {
        Arc::new(Self {
            core: SurfaceCore::new(ColorModel::IntArgb, State::Stable),
            selections,
            next: Mutex::new(next),
        })
    }
}

impl Surface for Flaky {
    fn core(&self) -> &SurfaceCore {
        &self.core
    }

    fn bounds(&self) -> IntRect {
        IntRect::new(0, 0, 16, 16)
    }

    fn replacement(&self) -> Option<SharedSurface> {
        self.next.lock().clone()
    }

    fn with_raster(
        &self,
        _f: &mut dyn FnMut(&mut Raster<'_>) -> GfxResult<()>,
    ) -> GfxResult<()> {
        Ok(())
    }

    fn validate_pipe(&self, _ctx: &mut GraphicsContext) -> GfxResult<()> {
        self.selections.fetch_add(1, Ordering::SeqCst);
        Err(GfxError::invalid_pipe("flaky surface"))
    }
}

#[test]
fn new_context_classifies_defaults() {
    let (_s, c) = fresh();
    assert_eq!(c.paint_state(), PaintState::OpaqueColor);
    assert_eq!(c.composite_state(), CompositeState::Copy);
    assert_eq!(c.stroke_state(), StrokeState::Thin);
    assert_eq!(c.transform_state(), TransformState::Identity);
    assert_eq!(c.clip_state(), ClipState::Device);
    assert_eq!(c.color_pixel(), (0xff00_0000, 0xff00_0000));
    assert!(!c.pipes().is_valid());
}

#[test]
fn pipes_are_selected_once_until_state_changes() {
    let (_s, mut c) = fresh();
    c.fill_rect(0, 0, 2, 2).unwrap();
    c.fill_rect(4, 4, 2, 2).unwrap();
    assert_eq!(c.stats().validations, 1);

    // same paint class
    c.set_color(Color(0xff12_3456));
    c.fill_rect(0, 0, 2, 2).unwrap();
    assert_eq!(c.stats().validations, 1);

    c.set_color(Color(0x8012_3456));
    assert_eq!(c.paint_state(), PaintState::AlphaColor);
    assert_eq!(c.composite_state(), CompositeState::Alpha);
    c.fill_rect(0, 0, 2, 2).unwrap();
    assert_eq!(c.stats().validations, 2);
}

#[test]
fn integer_translation_keeps_pipes() {
    let (_s, mut c) = fresh();
    c.fill_rect(0, 0, 1, 1).unwrap();
    c.translate_int(2, 3);
    assert_eq!(c.device_offset(), (2, 3));
    assert_eq!(c.transform_state(), TransformState::IntTranslate);
    assert!(c.pipes().is_valid());
    c.translate_int(-2, -3);
    assert_eq!(c.transform_state(), TransformState::Identity);
}

#[test]
fn integer_translation_past_i32_falls_back_to_any_translate() {
    let (s, mut c) = fresh();
    c.translate_int(i32::MAX, 0);
    assert_eq!(c.transform_state(), TransformState::IntTranslate);
    c.translate_int(10, 0);
    assert_eq!(c.transform_state(), TransformState::AnyTranslate);
    c.fill_rect(0, 0, 2, 2).unwrap();
    assert_eq!(s.argb(0, 0), Some(0xffff_ffff));

    c.translate_int(-i32::MAX, 0);
    assert_eq!(c.transform_state(), TransformState::IntTranslate);
    assert_eq!(c.device_offset(), (10, 0));
}

#[test]
fn scaling_reclassifies_transform_and_stroke() {
    let (_s, mut c) = fresh();
    c.fill_rect(0, 0, 1, 1).unwrap();
    c.scale(3.0, 3.0);
    assert_eq!(c.transform_state(), TransformState::TranslateScale);
    assert_eq!(c.stroke_state(), StrokeState::Wide);
    assert!(!c.pipes().is_valid());
}

#[test]
fn failing_selection_retries_once_then_drops() {
    let selections = Arc::new(AtomicUsize::new(0));
    let second: SharedSurface = Flaky::new(Arc::clone(&selections), None);
    let first: SharedSurface = Flaky::new(Arc::clone(&selections), Some(second));
    let mut c = GraphicsContext::new(first, Arc::new(PipeRegistry::default()));

    c.fill_rect(0, 0, 4, 4).unwrap();
    assert_eq!(selections.load(Ordering::SeqCst), 2);
    let stats = c.stats();
    assert_eq!(stats.retries, 1);
    assert_eq!(stats.dropped, 1);
}

#[test]
fn retry_draws_on_replacement() {
    let target = BufferedSurface::new(16, 16, ColorModel::IntArgb);
    let target_shared: SharedSurface = target.clone();
    let selections = Arc::new(AtomicUsize::new(0));
    let first: SharedSurface = Flaky::new(Arc::clone(&selections), Some(Arc::clone(&target_shared)));
    let mut c = GraphicsContext::new(first, Arc::new(PipeRegistry::default()));

    c.fill_rect(0, 0, 4, 4).unwrap();
    assert_eq!(selections.load(Ordering::SeqCst), 1);
    assert_eq!(c.stats().retries, 1);
    assert_eq!(c.stats().dropped, 0);
    assert!(Arc::ptr_eq(c.surface(), &target_shared));
    assert_eq!(target.argb(1, 1), Some(0xff00_0000));
}

#[test]
fn invalidated_surface_without_replacement_falls_back_to_null() {
    let (s, mut c) = fresh();
    s.invalidate();
    c.fill_rect(0, 0, 4, 4).unwrap();
    assert!(NullSurface::is_null(&**c.surface()));
    assert_eq!(c.stats().retries, 1);
    assert_eq!(c.stats().dropped, 0);
}

#[test]
fn successor_surface_receives_later_drawing() {
    let (s, mut c) = fresh();
    c.fill_rect(0, 0, 1, 1).unwrap();
    let next = BufferedSurface::new(16, 16, ColorModel::IntArgb);
    s.set_successor(next.clone());
    c.fill_rect(2, 2, 1, 1).unwrap();
    assert_eq!(next.argb(2, 2), Some(0xff00_0000));
}

#[test]
fn child_context_copies_state_and_resets_stats() {
    let (_s, mut c) = fresh();
    c.set_color(Color(0xff00_ff00));
    c.translate_int(1, 1);
    c.fill_rect(0, 0, 1, 1).unwrap();
    let mut child = c.create();
    assert_eq!(child.color(), Color(0xff00_ff00));
    assert_eq!(child.device_offset(), (1, 1));
    assert_eq!(child.stats(), ContextStats::default());
    child.translate_int(1, 0);
    assert_eq!(c.device_offset(), (1, 1));
}

#[test]
fn dispose_is_idempotent() {
    let (_s, mut c) = fresh();
    c.dispose();
    c.dispose();
    assert!(c.is_disposed());
    assert!(NullSurface::is_null(&**c.surface()));
    assert!(c.draw_string("x", 0.0, 10.0).is_ok());
}

#[test]
fn clip_getters_report_user_space() {
    let (_s, mut c) = fresh();
    assert_eq!(c.clip_shape(), None);
    c.translate_int(2, 2);
    c.set_clip_rect(0, 0, 4, 4);
    assert_eq!(c.clip_shape(), Some(ClipShape::Rect(Rect::new(0.0, 0.0, 4.0, 4.0))));
    assert_eq!(c.clip_region().bounds(), IntRect::new(2, 2, 4, 4));
    assert!(c.hit_clip(1, 1, 1, 1));
    assert!(!c.hit_clip(6, 6, 2, 2));
    assert!(!c.hit_clip(1, 1, 0, 1));

    c.clip_rect(2, 2, 10, 10);
    assert_eq!(c.clip_bounds(), Some(Rect::new(2.0, 2.0, 4.0, 4.0)));
    c.set_clip(None);
    assert_eq!(c.clip_state(), ClipState::Device);
}

#[test]
fn intersected_clip_shape_ignores_the_device_clip() {
    let (_s, mut c) = fresh();
    c.constrain(0, 0, 4, 4);
    c.set_clip_rect(0, 0, 10, 10);
    c.clip(ClipShape::Path(Rect::new(0.0, 0.0, 8.0, 8.0).to_path(0.1)));
    assert_eq!(c.clip_region().bounds(), IntRect::new(0, 0, 4, 4));
    assert_eq!(c.clip_bounds(), Some(Rect::new(0.0, 0.0, 8.0, 8.0)));

    c.translate_int(1, 1);
    assert_eq!(c.clip_bounds(), Some(Rect::new(-1.0, -1.0, 7.0, 7.0)));
}

#[test]
fn constrain_moves_origin_and_limits_device_clip() {
    let (s, mut c) = fresh();
    c.constrain(4, 4, 2, 2);
    assert_eq!(c.constrain_origin(), (4, 4));
    c.fill_rect(0, 0, 8, 8).unwrap();
    assert_eq!(s.argb(4, 4), Some(0xff00_0000));
    assert_eq!(s.argb(5, 5), Some(0xff00_0000));
    assert_eq!(s.argb(6, 6), Some(0xffff_ffff));
    assert_eq!(s.argb(3, 3), Some(0xffff_ffff));
}

#[test]
fn draw_chars_checks_range() {
    let (_s, mut c) = fresh();
    let chars = ['a', 'b', 'c'];
    assert!(c.draw_chars(&chars, 1, 2, 0.0, 10.0).is_ok());
    let err = c.draw_chars(&chars, 2, 2, 0.0, 10.0).unwrap_err();
    assert!(matches!(err, GfxError::IllegalArgument(_)));
    assert!(c.draw_chars(&chars, usize::MAX, 2, 0.0, 10.0).is_err());
}

#[test]
fn poly_point_count_is_checked() {
    let (_s, mut c) = fresh();
    let err = c.draw_polyline(&[0, 1], &[0], 2).unwrap_err();
    assert!(matches!(err, GfxError::IllegalArgument(_)));
}

#[test]
fn copy_area_rejects_rotation() {
    let (_s, mut c) = fresh();
    c.rotate(0.3);
    let err = c.copy_area(0, 0, 2, 2, 1, 1).unwrap_err();
    assert!(matches!(err, GfxError::IllegalState(_)));
}

#[test]
fn copy_area_scales_with_transform() {
    let (s, mut c) = fresh();
    c.fill_rect(0, 0, 2, 2).unwrap();
    c.scale(2.0, 2.0);
    c.copy_area(0, 0, 1, 1, 2, 0).unwrap();
    assert_eq!(s.argb(4, 0), Some(0xff00_0000));
    assert_eq!(s.argb(5, 1), Some(0xff00_0000));
}

#[test]
fn negative_stroke_width_is_rejected() {
    let (_s, mut c) = fresh();
    let err = c.set_stroke(Stroke::basic(-1.0)).unwrap_err();
    assert!(matches!(err, GfxError::IllegalArgument(_)));
    assert!(matches!(c.stroke(), Stroke::Basic(s) if s.width == 1.0));
}

#[test]
fn gasp_text_pipe_invalidated_when_font_crosses_threshold() {
    let (_s, mut c) = fresh();
    c.set_rendering_hint(RenderingHint::TextAntialiasing(TextAntialiasHint::Gasp))
        .unwrap();
    c.draw_string("a", 0.0, 12.0).unwrap();
    assert!(c.pipes().text.is_valid());

    c.set_font(Font::new("Dialog", 13.0));
    assert!(c.pipes().text.is_valid());

    c.set_font(Font::new("Dialog", 6.0));
    assert_eq!(c.pipes().text, TextPipeKind::Invalid);
}

#[test]
fn font_metrics_follow_font() {
    let (_s, mut c) = fresh();
    c.set_font(Font::new("Dialog", 10.0));
    let m = c.font_metrics();
    assert_eq!(m.ascent, 8.0);
    c.set_font(Font::new("Dialog", 20.0));
    assert_eq!(c.font_metrics().ascent, 16.0);
}

#[test]
fn rejected_hint_list_leaves_hints_unchanged() {
    let (_s, mut c) = fresh();
    c.set_rendering_hint(RenderingHint::Antialiasing(AntialiasHint::On))
        .unwrap();
    let err = c
        .set_rendering_hints(vec![
            RenderingHint::Antialiasing(AntialiasHint::Off),
            RenderingHint::TextLcdContrast(10),
        ])
        .unwrap_err();
    assert!(matches!(err, GfxError::IllegalArgument(_)));
    assert_eq!(c.hints().antialiasing, AntialiasHint::On);

    assert!(c
        .add_rendering_hints(vec![
            RenderingHint::Antialiasing(AntialiasHint::Off),
            RenderingHint::TextLcdContrast(300),
        ])
        .is_err());
    assert_eq!(c.hints().antialiasing, AntialiasHint::On);

    c.set_rendering_hints(Vec::new()).unwrap();
    assert_eq!(c.hints().antialiasing, AntialiasHint::Off);
}

#[derive(Debug)]
struct Keep;

impl CustomComposite for Keep {
    fn compose(&self, _src: u32, dst: u32) -> u32 {
        dst
    }
}

#[test]
fn custom_composite_needs_pixel_reads() {
    let locked = BufferedSurface::with_core(
        4,
        4,
        SurfaceCore::new(ColorModel::IntArgb, State::Stable).deny_pixel_reads(),
    );
    let mut c = ctx_on(&locked);
    let err = c.set_composite(Composite::Custom(Arc::new(Keep))).unwrap_err();
    assert!(matches!(err, GfxError::Permission(_)));
    assert_eq!(c.composite(), &Composite::default());

    let (_s, mut open) = fresh();
    open.set_composite(Composite::Custom(Arc::new(Keep))).unwrap();
    assert_eq!(open.composite_state(), CompositeState::Custom);
}

#[test]
fn xor_mode_round_trip_through_paint_mode() {
    let (_s, mut c) = fresh();
    c.set_xor_mode(Color::WHITE);
    assert_eq!(c.composite_state(), CompositeState::Xor);
    assert_eq!(c.image_comp(), CompositeType::Xor);
    c.set_paint_mode();
    assert_eq!(c.composite_state(), CompositeState::Copy);
    assert_eq!(c.image_comp(), CompositeType::SrcOverNoEa);
}

#[test]
fn validated_pipes_snapshot_names_every_slot() {
    let (_s, mut c) = fresh();
    let snap = c.validated_pipes().unwrap();
    let json = serde_json::to_value(&snap).unwrap();
    assert!(json.get("fill").is_some());
    assert!(json.get("text").is_some());
    assert_eq!(c.stats().validations, 1);
}
