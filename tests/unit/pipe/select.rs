use super::*;
use crate::context::hints::RenderingHint;
use crate::context::state::{AlphaComposite, ClipShape, Composite, CustomComposite, Rule};
use crate::foundation::core::{Affine, Color, ColorModel, Rect};
use crate::render::registry::PipeRegistry;
use crate::surface::{BufferedSurface, SharedSurface};

fn ctx_on(model: ColorModel) -> GraphicsContext {
    let surface: SharedSurface = BufferedSurface::new(16, 16, model);
    GraphicsContext::new(surface, Arc::new(PipeRegistry::default()))
}

fn ctx() -> GraphicsContext {
    ctx_on(ColorModel::IntArgb)
}

fn select(ctx: &mut GraphicsContext) -> PipeSet {
    let surface = Arc::clone(ctx.surface());
    validate_pipes(&*surface, ctx).unwrap();
    ctx.pipes().clone()
}

#[test]
fn opaque_color_selects_solid_loops() {
    let mut c = ctx();
    let set = select(&mut c);
    assert_eq!(set.draw, PipeKind::ColorPrimitives);
    assert_eq!(set.fill, PipeKind::ColorPrimitives);
    assert_eq!(set.shape, PipeKind::ColorViaPgram);
    assert_eq!(set.text, TextPipeKind::Solid);
    assert_eq!(set.image, ImagePipeKind::DrawImage);
    assert!(set.loops.is_some());
    assert!(set.alpha_fill.is_none());
}

#[test]
fn wide_stroke_draws_through_converter() {
    let mut c = ctx();
    c.set_stroke(crate::context::Stroke::basic(3.0)).unwrap();
    let set = select(&mut c);
    assert_eq!(set.draw, PipeKind::ColorViaPgram);
    assert_eq!(set.fill, PipeKind::ColorPrimitives);
}

#[test]
fn scaling_moves_draw_and_fill_to_converter() {
    let mut c = ctx();
    c.set_transform(Affine::scale(2.0));
    let set = select(&mut c);
    assert_eq!(set.draw, PipeKind::ColorViaPgram);
    assert_eq!(set.fill, PipeKind::ColorViaPgram);
}

#[test]
fn translucent_color_uses_paint_pipes_with_mask_fill() {
    let mut c = ctx();
    c.set_color(Color(0x80ff_0000));
    let set = select(&mut c);
    assert_eq!(set.draw, PipeKind::PaintViaShape);
    assert_eq!(set.shape, PipeKind::PaintShape);
    assert_eq!(set.text, TextPipeKind::Color);
    assert_eq!(set.alpha_fill.map(|k| k.name()), Some("mask_fill"));
}

#[test]
fn antialiasing_selects_pgram_capable_coverage_fill() {
    let mut c = ctx();
    c.set_rendering_hint(RenderingHint::Antialiasing(AntialiasHint::On))
        .unwrap();
    let set = select(&mut c);
    assert_eq!(set.draw, PipeKind::AaColorViaPgram);
    assert_eq!(set.shape, PipeKind::AaColorViaPgram);
    assert_eq!(set.text, TextPipeKind::Aa);
    assert!(set.alpha_fill.is_some());
}

#[test]
fn shaped_clip_under_antialiasing_selects_clip_variants() {
    let mut c = ctx();
    c.set_rendering_hint(RenderingHint::Antialiasing(AntialiasHint::On))
        .unwrap();
    let mut tri = kurbo::BezPath::new();
    tri.move_to((0.0, 0.0));
    tri.line_to((16.0, 0.0));
    tri.line_to((0.0, 16.0));
    tri.close_path();
    c.set_clip(Some(ClipShape::Path(tri)));
    assert_eq!(c.clip_state(), ClipState::Shape);
    let set = select(&mut c);
    assert_eq!(set.fill, PipeKind::AaClipColorViaShape);
    assert_eq!(set.text, TextPipeKind::ClipColor);
}

#[test]
fn xor_takes_priority_and_keeps_loops() {
    let mut c = ctx();
    c.set_xor_mode(Color::WHITE);
    c.set_rendering_hint(RenderingHint::Antialiasing(AntialiasHint::On))
        .unwrap();
    let set = select(&mut c);
    assert_eq!(set.fill, PipeKind::ColorPrimitives);
    assert_eq!(set.shape, PipeKind::ColorViaPgram);
    assert_eq!(set.text, TextPipeKind::Solid);
}

#[test]
fn custom_composite_uses_comp_pipes() {
    #[derive(Debug)]
    struct Keep;
    impl CustomComposite for Keep {
        fn compose(&self, _src: u32, dst: u32) -> u32 {
            dst
        }
    }
    let mut c = ctx();
    c.set_composite(Composite::Custom(Arc::new(Keep))).unwrap();
    let set = select(&mut c);
    assert_eq!(set.draw, PipeKind::CompViaShape);
    assert_eq!(set.shape, PipeKind::CompShape);
    assert_eq!(set.text, TextPipeKind::Comp);
    assert!(set.loops.is_none());
}

#[test]
fn lcd_text_needs_opaque_destination() {
    let mut c = ctx_on(ColorModel::IntRgb);
    c.set_rendering_hint(RenderingHint::TextAntialiasing(TextAntialiasHint::LcdHrgb))
        .unwrap();
    assert_eq!(select(&mut c).text, TextPipeKind::Lcd);

    let mut c = ctx();
    c.set_rendering_hint(RenderingHint::TextAntialiasing(TextAntialiasHint::LcdHrgb))
        .unwrap();
    assert_eq!(select(&mut c).text, TextPipeKind::Aa);
}

#[test]
fn fill_composite_type_collapses_copy_states() {
    let mut c = ctx();
    assert_eq!(fill_composite_type(&c), CompositeType::OpaqueSrcOverNoEa);
    c.set_composite(Composite::Alpha(AlphaComposite::SRC)).unwrap();
    assert_eq!(fill_composite_type(&c), CompositeType::SrcNoEa);
    c.set_composite(Composite::Alpha(AlphaComposite::new(Rule::SrcOver, 0.5).unwrap()))
        .unwrap();
    assert_eq!(fill_composite_type(&c), CompositeType::SrcOver);
}

#[test]
fn paint_surface_type_tracks_paint_state() {
    let mut c = ctx();
    assert_eq!(paint_surface_type(&c), SurfaceType::OpaqueColor);
    c.set_color(Color(0x1000_0000));
    assert_eq!(paint_surface_type(&c), SurfaceType::AnyColor);
}

#[test]
fn rectangular_clip_keeps_solid_pipes() {
    let mut c = ctx();
    c.set_clip(Some(ClipShape::Rect(Rect::new(2.0, 2.0, 8.0, 8.0))));
    assert_eq!(c.clip_state(), ClipState::Rectangular);
    assert_eq!(select(&mut c).fill, PipeKind::ColorPrimitives);
}
