use crate::context::GraphicsContext;
use crate::context::font::TextAaMode;
use crate::context::hints::{AntialiasHint, TextAntialiasHint};
use crate::context::state::{ClipState, CompositeState, PaintState, StrokeState, TransformState};
use crate::foundation::core::Transparency;
use crate::foundation::error::GfxResult;
use crate::pipe::kinds::{ImagePipeKind, PipeKind, PipeSet, TextPipeKind};
use crate::render::kernels::Kernel;
use crate::render::registry::RenderLoops;
use crate::render::types::{CompositeType, PrimitiveKind, SurfaceType};
use crate::surface::Surface;
use std::sync::Arc;

/// Select the five pipes for `ctx`'s current state on `surface` and install them.
///
/// Priority: XOR, then custom composites, then antialiasing, then non-solid paint or
/// blending or shaped clips, and finally the solid fast paths.
pub fn validate_pipes<S: Surface + ?Sized>(surface: &S, ctx: &mut GraphicsContext) -> GfxResult<()> {
    let mut set = PipeSet {
        image: ImagePipeKind::DrawImage,
        ..PipeSet::invalid()
    };
    let paint = ctx.paint_state();
    let comp = ctx.composite_state();
    let shape_clip = ctx.clip_state() == ClipState::Shape;
    let aa = ctx.hints().antialiasing == AntialiasHint::On;

    if comp == CompositeState::Xor {
        if paint > PaintState::AlphaColor {
            set_shapes(&mut set, PipeKind::PaintViaShape, PipeKind::PaintShape);
            set.text = TextPipeKind::Outline;
        } else {
            let converter = solid_converter(surface, ctx, &mut set);
            if shape_clip {
                set.draw = converter;
                set.fill = converter;
                set.text = TextPipeKind::Outline;
            } else {
                solid_draw_fill(ctx, &mut set, converter);
                set.text = TextPipeKind::Solid;
            }
        }
    } else if comp == CompositeState::Custom {
        if aa {
            let pipe = if shape_clip {
                PipeKind::AaClipCompViaShape
            } else {
                PipeKind::AaCompViaShape
            };
            set_shapes(&mut set, pipe, pipe);
            set.text = if shape_clip {
                TextPipeKind::ClipComp
            } else {
                TextPipeKind::Comp
            };
        } else {
            set_shapes(&mut set, PipeKind::CompViaShape, PipeKind::CompShape);
            set.text = if shape_clip {
                TextPipeKind::ClipComp
            } else {
                TextPipeKind::Comp
            };
        }
    } else if aa {
        let alpha_fill = surface.mask_fill(ctx);
        match &alpha_fill {
            Some(_) if shape_clip => {
                set_shapes(&mut set, PipeKind::AaClipColorViaShape, PipeKind::AaClipColorViaShape);
                set.text = TextPipeKind::ClipColor;
            }
            Some(fill) => {
                let converter = if fill.handles_parallelograms() {
                    PipeKind::AaColorViaPgram
                } else {
                    PipeKind::AaColorViaShape
                };
                set_shapes(&mut set, converter, converter);
                set.text = if paint > PaintState::AlphaColor || comp > CompositeState::Copy {
                    TextPipeKind::Color
                } else {
                    text_pipe(ctx, true)
                };
            }
            None if shape_clip => {
                set_shapes(&mut set, PipeKind::AaClipPaintViaShape, PipeKind::AaClipPaintViaShape);
                set.text = TextPipeKind::ClipPaint;
            }
            None => {
                set_shapes(&mut set, PipeKind::AaPaintViaShape, PipeKind::AaPaintViaShape);
                set.text = TextPipeKind::Paint;
            }
        }
        set.alpha_fill = alpha_fill;
    } else if paint > PaintState::AlphaColor || comp > CompositeState::Copy || shape_clip {
        set_shapes(&mut set, PipeKind::PaintViaShape, PipeKind::PaintShape);
        set.alpha_fill = surface.mask_fill(ctx);
        set.text = match (set.alpha_fill.is_some(), shape_clip) {
            (true, true) => TextPipeKind::ClipColor,
            (true, false) => TextPipeKind::Color,
            (false, true) => TextPipeKind::ClipPaint,
            (false, false) => TextPipeKind::Paint,
        };
    } else {
        let converter = solid_converter(surface, ctx, &mut set);
        solid_draw_fill(ctx, &mut set, converter);
        set.text = text_pipe(ctx, false);
    }

    if set.needs_loops() {
        set.loops = Some(surface.render_loops(ctx));
    }
    tracing::debug!(
        paint = ?paint,
        composite = ?comp,
        stroke = ?ctx.stroke_state(),
        transform = ?ctx.transform_state(),
        clip = ?ctx.clip_state(),
        draw = ?set.draw,
        fill = ?set.fill,
        shape = ?set.shape,
        text = ?set.text,
        "pipes selected"
    );
    ctx.set_pipes(set);
    Ok(())
}

fn set_shapes(set: &mut PipeSet, via: PipeKind, shape: PipeKind) {
    set.draw = via;
    set.fill = via;
    set.shape = shape;
}

// Pick the converter for solid colors and install the matching shape pipe.
fn solid_converter<S: Surface + ?Sized>(
    surface: &S,
    ctx: &GraphicsContext,
    set: &mut PipeSet,
) -> PipeKind {
    if surface.can_render_parallelograms(ctx) {
        set.shape = PipeKind::ColorViaPgram;
        PipeKind::ColorViaPgram
    } else {
        set.shape = PipeKind::ColorPrimitives;
        PipeKind::ColorViaShape
    }
}

fn solid_draw_fill(ctx: &GraphicsContext, set: &mut PipeSet, converter: PipeKind) {
    if ctx.transform_state() >= TransformState::TranslateScale {
        set.draw = converter;
        set.fill = converter;
    } else {
        set.draw = if ctx.stroke_state() == StrokeState::Thin {
            PipeKind::ColorPrimitives
        } else {
            converter
        };
        set.fill = PipeKind::ColorPrimitives;
    }
}

/// Glyph pipe for the text antialiasing hint; `aa_on` is the shape antialiasing state.
pub fn text_pipe(ctx: &mut GraphicsContext, aa_on: bool) -> TextPipeKind {
    match ctx.hints().text_antialiasing {
        TextAntialiasHint::Default if aa_on => TextPipeKind::Aa,
        TextAntialiasHint::Default | TextAntialiasHint::Off => TextPipeKind::Solid,
        TextAntialiasHint::On => TextPipeKind::Aa,
        _ => match ctx.font_info().aa {
            TextAaMode::LcdHrgb | TextAaMode::LcdVrgb => TextPipeKind::Lcd,
            TextAaMode::On => TextPipeKind::Aa,
            TextAaMode::Off => TextPipeKind::Solid,
        },
    }
}

/// Kernel source type describing the context's paint.
pub fn paint_surface_type(ctx: &GraphicsContext) -> SurfaceType {
    match ctx.paint_state() {
        PaintState::OpaqueColor => SurfaceType::OpaqueColor,
        PaintState::AlphaColor => SurfaceType::AnyColor,
        PaintState::Gradient => SurfaceType::GradientPaint,
        PaintState::LinearGradient => SurfaceType::LinearGradientPaint,
        PaintState::RadialGradient => SurfaceType::RadialGradientPaint,
        PaintState::Texture => SurfaceType::TexturePaint,
        PaintState::Custom => SurfaceType::AnyPaint,
    }
}

/// Composite type used to key fill kernels. Copy states collapse onto the store forms.
pub fn fill_composite_type(ctx: &GraphicsContext) -> CompositeType {
    let comp = ctx.image_comp();
    if ctx.composite_state() == CompositeState::Copy {
        if comp == CompositeType::SrcOverNoEa {
            CompositeType::OpaqueSrcOverNoEa
        } else {
            CompositeType::SrcNoEa
        }
    } else {
        comp
    }
}

pub fn locate_mask_fill<S: Surface + ?Sized>(
    surface: &S,
    ctx: &GraphicsContext,
) -> Option<Arc<dyn Kernel>> {
    ctx.registry().locate(
        PrimitiveKind::MaskFill,
        paint_surface_type(ctx),
        fill_composite_type(ctx),
        surface.surface_type(),
    )
}

pub fn render_loops_for<S: Surface + ?Sized>(surface: &S, ctx: &GraphicsContext) -> Arc<RenderLoops> {
    ctx.registry().render_loops(
        paint_surface_type(ctx),
        fill_composite_type(ctx),
        surface.surface_type(),
    )
}

/// Subpixel text needs a plain copy of a color onto an opaque destination inside a
/// rectangular clip, and a registered LCD glyph loop. The loop probe runs once per surface.
pub fn can_render_lcd_text<S: Surface + ?Sized>(surface: &S, ctx: &GraphicsContext) -> bool {
    if ctx.composite_state() <= CompositeState::Copy
        && ctx.paint_state() <= PaintState::AlphaColor
        && ctx.clip_state() <= ClipState::Rectangular
        && surface.transparency() == Transparency::Opaque
    {
        return *surface.core().probes().lcd.get_or_init(|| {
            ctx.registry()
                .locate(
                    PrimitiveKind::DrawGlyphListLcd,
                    SurfaceType::AnyColor,
                    CompositeType::SrcNoEa,
                    surface.surface_type(),
                )
                .is_some()
        });
    }
    false
}

/// Parallelogram fills need a plain color and either XOR or a non-antialiased copy outside
/// shaped clips, plus a registered loop. Probes run once per surface.
pub fn can_render_parallelograms<S: Surface + ?Sized>(surface: &S, ctx: &GraphicsContext) -> bool {
    if ctx.paint_state() > PaintState::AlphaColor {
        return false;
    }
    let probe = |comp: CompositeType| {
        ctx.registry()
            .locate(
                PrimitiveKind::FillParallelogram,
                SurfaceType::AnyColor,
                comp,
                surface.surface_type(),
            )
            .is_some()
    };
    let probes = surface.core().probes();
    if ctx.composite_state() == CompositeState::Xor {
        return *probes.pgram_xor.get_or_init(|| probe(CompositeType::Xor));
    }
    if ctx.composite_state() <= CompositeState::Copy
        && ctx.hints().antialiasing != AntialiasHint::On
        && ctx.clip_state() != ClipState::Shape
    {
        return *probes.pgram_solid.get_or_init(|| probe(CompositeType::SrcNoEa));
    }
    false
}

#[cfg(test)]
#[path = "../../tests/unit/pipe/select.rs"]
mod tests;
