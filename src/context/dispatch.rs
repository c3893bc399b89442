//! Executes drawing verbs through the pipes a context has selected.
//!
//! Each verb resolves its slot's [`PipeKind`] to a kernel family, converts its geometry to
//! device space in the form that family consumes, and runs every resulting kernel op inside
//! a single raster borrow of the destination.

use crate::context::GraphicsContext;
use crate::context::font::FontInfo;
use crate::context::hints::InterpolationHint;
use crate::context::state::{
    Composite, PaintSampler, PaintState, Stroke, StrokeState, TransformState,
};
use crate::foundation::core::{
    Affine, BezPath, Color, IntRect, Point, Rect, Shape, Transparency, Vec2,
};
use crate::foundation::error::GfxResult;
use crate::pipe::select::fill_composite_type;
use crate::pipe::{ImagePipeKind, PipeKind, PipeSet, TextPipeKind};
use crate::render::blend::composite_argb;
use crate::render::kernels::{
    GlyphImage, Kernel, KernelArgs, KernelOp, MaskFill, PaintSource, SourceImage, XorArgs,
};
use crate::render::region::Region;
use crate::render::registry::RenderLoops;
use crate::render::scanline::coverage_levels;
use crate::render::types::{CompositeType, PrimitiveKind};
use crate::surface::{ImageOp, SharedSurface};
use kurbo::{Cap, PathEl};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Pipe slot a shape verb renders through.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Slot {
    Draw,
    Fill,
    Shape,
}

impl Slot {
    fn kind(self, pipes: &PipeSet) -> PipeKind {
        match self {
            Self::Draw => pipes.draw,
            Self::Fill => pipes.fill,
            Self::Shape => pipes.shape,
        }
    }
}

/// Kernel family a pipe kind renders with.
enum Route {
    Null,
    /// Integer loop primitives resolved for the context.
    Loops,
    /// Coverage fills; `aa` selects supersampled coverage over bilevel spans.
    Mask { kernel: Arc<dyn Kernel>, aa: bool },
}

fn generic_mask() -> Arc<dyn Kernel> {
    Arc::new(MaskFill)
}

fn alpha_fill_or_generic(ctx: &GraphicsContext) -> Arc<dyn Kernel> {
    ctx.pipes().alpha_fill.clone().unwrap_or_else(generic_mask)
}

fn route(ctx: &GraphicsContext, kind: PipeKind) -> Route {
    use PipeKind as K;
    match kind {
        K::Invalid | K::Null => Route::Null,
        K::ColorPrimitives | K::ColorViaShape | K::ColorViaPgram => Route::Loops,
        K::PaintViaShape | K::PaintShape => Route::Mask {
            kernel: alpha_fill_or_generic(ctx),
            aa: false,
        },
        K::CompViaShape | K::CompShape => Route::Mask {
            kernel: generic_mask(),
            aa: false,
        },
        K::AaColorViaShape | K::AaColorViaPgram | K::AaClipColorViaShape => Route::Mask {
            kernel: alpha_fill_or_generic(ctx),
            aa: true,
        },
        K::AaCompViaShape | K::AaClipCompViaShape | K::AaPaintViaShape | K::AaClipPaintViaShape => {
            Route::Mask {
                kernel: generic_mask(),
                aa: true,
            }
        }
    }
}

fn loops(ctx: &GraphicsContext) -> Option<&RenderLoops> {
    ctx.pipes().loops.as_deref()
}

fn require(kernel: Option<Arc<dyn Kernel>>, primitive: &'static str) -> Option<Arc<dyn Kernel>> {
    if kernel.is_none() {
        tracing::debug!(primitive, "no kernel registered; skipping");
    }
    kernel
}

fn kernel_args<'a>(
    ctx: &'a GraphicsContext,
    comp: CompositeType,
    paint: Option<&'a dyn PaintSource>,
) -> KernelArgs<'a> {
    let composite = ctx.composite();
    let (color, pixel) = ctx.color_pixel();
    KernelArgs {
        clip: ctx.clip_region(),
        color,
        pixel,
        comp,
        extra_alpha: composite.extra_alpha(),
        xor: match composite {
            Composite::Xor(x) => Some(XorArgs {
                xor_pixel: x.xor_pixel,
                alpha_mask: x.alpha_mask,
            }),
            _ => None,
        },
        custom: match composite {
            Composite::Custom(c) => Some(&**c),
            _ => None,
        },
        paint,
    }
}

/// Run `ops` with `kernel` in one raster borrow of the context's surface.
fn execute(
    ctx: &GraphicsContext,
    kernel: &dyn Kernel,
    ops: &[KernelOp<'_>],
    comp: CompositeType,
    paint: Option<&dyn PaintSource>,
) -> GfxResult<()> {
    if ops.is_empty() {
        return Ok(());
    }
    let args = kernel_args(ctx, comp, paint);
    ctx.surface().with_raster(&mut |r| {
        for op in ops {
            kernel.run(r, op, &args)?;
        }
        Ok(())
    })
}

/// Run fill ops, sampling the context's paint when it is not a plain color.
fn run_fill(ctx: &GraphicsContext, kernel: &dyn Kernel, ops: &[KernelOp<'_>]) -> GfxResult<()> {
    let sampler = (ctx.paint_state() > PaintState::AlphaColor)
        .then(|| PaintSampler::new(ctx.paint().clone(), ctx.transform()));
    execute(
        ctx,
        kernel,
        ops,
        fill_composite_type(ctx),
        sampler.as_ref().map(|s| s as &dyn PaintSource),
    )
}

fn run_levels(ctx: &GraphicsContext, kernel: &dyn Kernel, levels: &[(u8, Region)]) -> GfxResult<()> {
    let ops: Vec<KernelOp<'_>> = levels
        .iter()
        .map(|(coverage, region)| KernelOp::Mask {
            region,
            coverage: *coverage,
        })
        .collect();
    run_fill(ctx, kernel, &ops)
}

/// Linear part of `t` applied to `v`.
fn linear(t: Affine, v: Vec2) -> Vec2 {
    let [a, b, c, d, _, _] = t.as_coeffs();
    Vec2::new(a * v.x + c * v.y, b * v.x + d * v.y)
}

fn int_rect(x: i32, y: i32, w: i32, h: i32) -> Rect {
    Rect::new(x as f64, y as f64, x as f64 + w as f64, y as f64 + h as f64)
}

// ---- shapes ----

/// Fill a device-space outline through the family of `kind`.
fn fill_device_path(ctx: &GraphicsContext, kind: PipeKind, path: &BezPath) -> GfxResult<()> {
    match route(ctx, kind) {
        Route::Null => Ok(()),
        Route::Loops => {
            let Some(k) = require(loops(ctx).and_then(|l| l.fill_spans.clone()), "fill_spans")
            else {
                return Ok(());
            };
            let region = ctx.registry().rasterizer().rasterize(path, ctx.clip_region());
            run_fill(ctx, &*k, &[KernelOp::Spans(&region)])
        }
        Route::Mask { kernel, aa: false } => {
            let region = ctx.registry().rasterizer().rasterize(path, ctx.clip_region());
            run_fill(ctx, &*kernel, &[KernelOp::Spans(&region)])
        }
        Route::Mask { kernel, aa: true } => {
            let levels = coverage_levels(path, ctx.clip_region().bounds());
            run_levels(ctx, &*kernel, &levels)
        }
    }
}

fn fill_user_rect_kind(ctx: &GraphicsContext, kind: PipeKind, r: Rect) -> GfxResult<()> {
    let r = r.abs();
    let t = ctx.transform();
    if kind == PipeKind::ColorViaPgram {
        if let Some(k) = loops(ctx).and_then(|l| l.fill_parallelogram.clone()) {
            let op = KernelOp::Parallelogram {
                origin: t * Point::new(r.x0, r.y0),
                d1: linear(t, Vec2::new(r.width(), 0.0)),
                d2: linear(t, Vec2::new(0.0, r.height())),
            };
            return run_fill(ctx, &*k, &[op]);
        }
    }
    fill_device_path(ctx, kind, &(t * r.to_path(0.1)))
}

pub(crate) fn fill_user_rect(ctx: &mut GraphicsContext, slot: Slot, r: Rect) -> GfxResult<()> {
    let ctx: &GraphicsContext = ctx;
    fill_user_rect_kind(ctx, slot.kind(ctx.pipes()), r)
}

pub(crate) fn fill_path(ctx: &mut GraphicsContext, slot: Slot, path: &BezPath) -> GfxResult<()> {
    let ctx: &GraphicsContext = ctx;
    fill_device_path(ctx, slot.kind(ctx.pipes()), &(ctx.transform() * path.clone()))
}

pub(crate) fn draw_path(ctx: &mut GraphicsContext, slot: Slot, path: &BezPath) -> GfxResult<()> {
    let ctx: &GraphicsContext = ctx;
    draw_user_path(ctx, slot.kind(ctx.pipes()), path)
}

/// User-space path after applying the stroke's dash pattern, if any.
fn dashed(ctx: &GraphicsContext, path: &BezPath) -> BezPath {
    match ctx.stroke() {
        Stroke::Basic(s) if !s.dash_pattern.is_empty() => {
            kurbo::dash(path.iter(), s.dash_offset, &s.dash_pattern).collect()
        }
        _ => path.clone(),
    }
}

/// Device-space line segments of a flattened path, with endpoints snapped to pixels.
fn thin_segments(device: &BezPath) -> Vec<(i32, i32, i32, i32)> {
    let snap = |p: Point| (p.x.floor() as i32, p.y.floor() as i32);
    let mut lines = Vec::new();
    let (mut start, mut last) = (Point::ZERO, Point::ZERO);
    kurbo::flatten(device.iter(), 0.25, |el| match el {
        PathEl::MoveTo(p) => {
            start = p;
            last = p;
        }
        PathEl::LineTo(p) => {
            let ((x1, y1), (x2, y2)) = (snap(last), snap(p));
            lines.push((x1, y1, x2, y2));
            last = p;
        }
        PathEl::ClosePath => {
            if last != start {
                let ((x1, y1), (x2, y2)) = (snap(last), snap(start));
                lines.push((x1, y1, x2, y2));
            }
            last = start;
        }
        PathEl::QuadTo(..) | PathEl::CurveTo(..) => {}
    });
    lines
}

/// Stroke a user-space path with the context's stroke.
fn draw_user_path(ctx: &GraphicsContext, kind: PipeKind, path: &BezPath) -> GfxResult<()> {
    let t = ctx.transform();
    let thin = ctx.stroke_state() <= StrokeState::ThinDashed;
    if thin && kind.is_loop_based() {
        let Some(k) = require(loops(ctx).and_then(|l| l.draw_line.clone()), "draw_line") else {
            return Ok(());
        };
        let device = t * dashed(ctx, path);
        let ops: Vec<KernelOp<'_>> = thin_segments(&device)
            .into_iter()
            .map(|(x1, y1, x2, y2)| KernelOp::Line { x1, y1, x2, y2 })
            .collect();
        return run_fill(ctx, &*k, &ops);
    }
    if thin {
        let device = t * dashed(ctx, path);
        let outline = kurbo::stroke(
            device.iter(),
            &kurbo::Stroke::new(1.0),
            &kurbo::StrokeOpts::default(),
            0.1,
        );
        return fill_device_path(ctx, kind, &outline);
    }
    let outline = ctx.stroke().outline(path, 0.1);
    fill_device_path(ctx, kind, &(t * outline))
}

fn polyline_path(xs: &[i32], ys: &[i32], close: bool) -> BezPath {
    let mut path = BezPath::new();
    for (i, (&x, &y)) in xs.iter().zip(ys).enumerate() {
        let p = Point::new(x as f64, y as f64);
        if i == 0 {
            path.move_to(p);
        } else {
            path.line_to(p);
        }
    }
    if close && !xs.is_empty() {
        path.close_path();
    }
    path
}

// ---- verbs ----

pub(crate) fn fill_rect(ctx: &mut GraphicsContext, x: i32, y: i32, w: i32, h: i32) -> GfxResult<()> {
    if w <= 0 || h <= 0 {
        return Ok(());
    }
    let ctx: &GraphicsContext = ctx;
    let kind = ctx.pipes().fill;
    if kind == PipeKind::ColorPrimitives {
        let Some(k) = require(loops(ctx).and_then(|l| l.fill_rect.clone()), "fill_rect") else {
            return Ok(());
        };
        let (tx, ty) = ctx.device_offset();
        let r = IntRect::new(x.saturating_add(tx), y.saturating_add(ty), w, h);
        return run_fill(ctx, &*k, &[KernelOp::Rect(r)]);
    }
    fill_user_rect_kind(ctx, kind, int_rect(x, y, w, h))
}

/// Outline covering `x..=x+w` by `y..=y+h`.
pub(crate) fn draw_rect(ctx: &mut GraphicsContext, x: i32, y: i32, w: i32, h: i32) -> GfxResult<()> {
    if w < 0 || h < 0 {
        return Ok(());
    }
    let ctx: &GraphicsContext = ctx;
    let kind = ctx.pipes().draw;
    if kind == PipeKind::ColorPrimitives {
        let Some(k) = require(loops(ctx).and_then(|l| l.fill_rect.clone()), "fill_rect") else {
            return Ok(());
        };
        let (tx, ty) = ctx.device_offset();
        let (x, y) = (x.saturating_add(tx), y.saturating_add(ty));
        let (w1, h1) = (w.saturating_add(1), h.saturating_add(1));
        let ops: Vec<KernelOp<'_>> = if w == 0 || h == 0 {
            vec![KernelOp::Rect(IntRect::new(x, y, w1, h1))]
        } else {
            vec![
                KernelOp::Rect(IntRect::new(x, y, w1, 1)),
                KernelOp::Rect(IntRect::new(x, y.saturating_add(h), w1, 1)),
                KernelOp::Rect(IntRect::new(x, y.saturating_add(1), 1, h - 1)),
                KernelOp::Rect(IntRect::new(x.saturating_add(w), y.saturating_add(1), 1, h - 1)),
            ]
        };
        return run_fill(ctx, &*k, &ops);
    }
    draw_user_path(ctx, kind, &int_rect(x, y, w, h).to_path(0.1))
}

/// Parallelogram covering a wide line with butt or square caps, in device space.
fn line_parallelogram(ctx: &GraphicsContext, p1: Point, p2: Point) -> Option<KernelOp<'static>> {
    if ctx.stroke_state() != StrokeState::Wide {
        return None;
    }
    let Stroke::Basic(s) = ctx.stroke() else {
        return None;
    };
    if !s.dash_pattern.is_empty() || s.start_cap != s.end_cap || s.start_cap == Cap::Round {
        return None;
    }
    let v = p2 - p1;
    let len = v.hypot();
    if len == 0.0 {
        return None;
    }
    let half = s.width / 2.0;
    let u = v / len;
    let (start, along) = if s.start_cap == Cap::Square {
        (p1 - u * half, v + u * (2.0 * half))
    } else {
        (p1, v)
    };
    let normal = Vec2::new(-u.y, u.x) * half;
    let t = ctx.transform();
    Some(KernelOp::Parallelogram {
        origin: t * (start - normal),
        d1: linear(t, along),
        d2: linear(t, normal * 2.0),
    })
}

pub(crate) fn draw_line(
    ctx: &mut GraphicsContext,
    x1: i32,
    y1: i32,
    x2: i32,
    y2: i32,
) -> GfxResult<()> {
    let ctx: &GraphicsContext = ctx;
    let kind = ctx.pipes().draw;
    match kind {
        PipeKind::ColorPrimitives => {
            let Some(k) = require(loops(ctx).and_then(|l| l.draw_line.clone()), "draw_line")
            else {
                return Ok(());
            };
            let (tx, ty) = ctx.device_offset();
            let op = KernelOp::Line {
                x1: x1.saturating_add(tx),
                y1: y1.saturating_add(ty),
                x2: x2.saturating_add(tx),
                y2: y2.saturating_add(ty),
            };
            run_fill(ctx, &*k, &[op])
        }
        PipeKind::ColorViaPgram => {
            let (p1, p2) = (
                Point::new(x1 as f64, y1 as f64),
                Point::new(x2 as f64, y2 as f64),
            );
            let pgram = loops(ctx)
                .and_then(|l| l.fill_parallelogram.clone())
                .zip(line_parallelogram(ctx, p1, p2));
            match pgram {
                Some((k, op)) => run_fill(ctx, &*k, &[op]),
                None => draw_user_path(ctx, kind, &kurbo::Line::new(p1, p2).to_path(0.1)),
            }
        }
        _ => {
            let line = kurbo::Line::new((x1 as f64, y1 as f64), (x2 as f64, y2 as f64));
            draw_user_path(ctx, kind, &line.to_path(0.1))
        }
    }
}

pub(crate) fn draw_poly(
    ctx: &mut GraphicsContext,
    xs: &[i32],
    ys: &[i32],
    close: bool,
) -> GfxResult<()> {
    if xs.is_empty() {
        return Ok(());
    }
    let ctx: &GraphicsContext = ctx;
    let kind = ctx.pipes().draw;
    if kind != PipeKind::ColorPrimitives {
        return draw_user_path(ctx, kind, &polyline_path(xs, ys, close));
    }
    let Some(k) = require(loops(ctx).and_then(|l| l.draw_line.clone()), "draw_line") else {
        return Ok(());
    };
    let (tx, ty) = ctx.device_offset();
    let pts: Vec<(i32, i32)> = xs
        .iter()
        .zip(ys)
        .map(|(&x, &y)| (x.saturating_add(tx), y.saturating_add(ty)))
        .collect();
    let mut ops: Vec<KernelOp<'_>> = match pts.as_slice() {
        [(x, y)] => vec![KernelOp::Line {
            x1: *x,
            y1: *y,
            x2: *x,
            y2: *y,
        }],
        _ => pts
            .windows(2)
            .map(|w| KernelOp::Line {
                x1: w[0].0,
                y1: w[0].1,
                x2: w[1].0,
                y2: w[1].1,
            })
            .collect(),
    };
    let (first, last) = (pts[0], pts[pts.len() - 1]);
    if close && first != last {
        ops.push(KernelOp::Line {
            x1: last.0,
            y1: last.1,
            x2: first.0,
            y2: first.1,
        });
    }
    run_fill(ctx, &*k, &ops)
}

pub(crate) fn fill_polygon(ctx: &mut GraphicsContext, xs: &[i32], ys: &[i32]) -> GfxResult<()> {
    if xs.len() < 3 {
        return Ok(());
    }
    fill_path(ctx, Slot::Fill, &polyline_path(xs, ys, true))
}

// ---- text ----

/// Per-pixel glyph coverage grouped by level. LCD coverage is averaged over subpixels.
fn glyph_levels(glyphs: &[GlyphImage]) -> Vec<(u8, Region)> {
    let mut levels: BTreeMap<u8, Vec<(i32, i32, i32)>> = BTreeMap::new();
    for g in glyphs {
        let stride = if g.lcd { 3 } else { 1 };
        for gy in 0..g.height as i32 {
            for gx in 0..g.width as i32 {
                let at = (gy as usize * g.width as usize + gx as usize) * stride;
                let Some(cov) = g.coverage.get(at..at + stride) else {
                    continue;
                };
                let c = (cov.iter().map(|&c| c as u32).sum::<u32>() / stride as u32) as u8;
                if c > 0 {
                    let x = g.x.saturating_add(gx);
                    let y = g.y.saturating_add(gy);
                    levels.entry(c).or_default().push((y, x, x.saturating_add(1)));
                }
            }
        }
    }
    levels
        .into_iter()
        .map(|(c, spans)| (c, Region::from_spans(spans)))
        .collect()
}

pub(crate) fn draw_text(
    ctx: &mut GraphicsContext,
    info: &FontInfo,
    text: &str,
    at: Point,
) -> GfxResult<()> {
    let ctx: &GraphicsContext = ctx;
    let origin = ctx.transform() * at + (info.dev_tx * info.origin).to_vec2();
    let strikes = ctx.registry().strikes();
    let kind = ctx.pipes().text;
    match kind {
        TextPipeKind::Invalid | TextPipeKind::Null => Ok(()),
        TextPipeKind::Solid | TextPipeKind::Aa | TextPipeKind::Lcd => {
            let kernel = loops(ctx).and_then(|l| match kind {
                TextPipeKind::Aa => l.draw_glyph_list_aa.clone(),
                TextPipeKind::Lcd => l.draw_glyph_list_lcd.clone(),
                _ => l.draw_glyph_list.clone(),
            });
            let Some(k) = require(kernel, "draw_glyph_list") else {
                return Ok(());
            };
            let glyphs = strikes.glyphs(&info.strike, text, origin);
            run_fill(ctx, &*k, &[KernelOp::Glyphs(&glyphs)])
        }
        TextPipeKind::Outline => {
            let outline = strikes.outlines(&info.strike, text, origin);
            fill_device_path(ctx, ctx.pipes().fill, &outline)
        }
        TextPipeKind::Color | TextPipeKind::ClipColor => {
            let glyphs = strikes.glyphs(&info.strike, text, origin);
            run_levels(ctx, &*alpha_fill_or_generic(ctx), &glyph_levels(&glyphs))
        }
        TextPipeKind::Paint
        | TextPipeKind::ClipPaint
        | TextPipeKind::Comp
        | TextPipeKind::ClipComp => {
            let glyphs = strikes.glyphs(&info.strike, text, origin);
            run_levels(ctx, &*generic_mask(), &glyph_levels(&glyphs))
        }
    }
}

// ---- images ----

/// Draw `src` at user-space `(x, y)`. `Ok(false)` when the source could not be read.
pub(crate) fn draw_image(
    ctx: &mut GraphicsContext,
    src: &SharedSurface,
    x: i32,
    y: i32,
    bg: Option<Color>,
) -> GfxResult<bool> {
    let ctx: &GraphicsContext = ctx;
    if ctx.pipes().image != ImagePipeKind::DrawImage {
        return Ok(true);
    }
    let ts = ctx.transform_state();
    let op = if ts <= TransformState::IntTranslate {
        ImageOp::Blit
    } else if ts <= TransformState::TranslateScale {
        ImageOp::ScaledBlit
    } else {
        ImageOp::TransformBlit
    };
    let dst = ctx.surface();
    let comp = ctx.image_comp();
    let data = match src.proxies() {
        Some(cache) => {
            let threshold = ctx.registry().config().proxy_threshold;
            let proxy = cache.get_or_insert_with(dst.surface_type(), || {
                dst.make_proxy_for(&**src, threshold)
            });
            proxy.replace_data(src, op, comp, bg)
        }
        None => Arc::clone(src),
    };
    if !data.is_valid() {
        tracing::debug!("image source is invalid; skipping draw");
        return Ok(false);
    }

    let bounds = data.bounds();
    let mut snapshot: Option<SourceImage> = None;
    if let Err(err) = data.with_raster(&mut |r| {
        snapshot = Some(r.snapshot(bounds));
        Ok(())
    }) {
        tracing::debug!(%err, "image source unreadable; skipping draw");
        return Ok(false);
    }
    let Some(mut image) = snapshot else {
        return Ok(false);
    };
    if let Some(bg) = bg {
        for p in &mut image.argb {
            *p = composite_argb(CompositeType::SrcOver, *p, bg.argb(), 0xff);
        }
    }

    let (prim, name) = if op == ImageOp::Blit {
        (PrimitiveKind::Blit, "blit")
    } else {
        (PrimitiveKind::TransformBlit, "transform_blit")
    };
    let kernel = ctx
        .registry()
        .locate(prim, data.surface_type(), comp, dst.surface_type());
    let Some(k) = require(kernel, name) else {
        return Ok(true);
    };
    let kop = if op == ImageOp::Blit {
        let (tx, ty) = ctx.device_offset();
        KernelOp::Blit {
            src: &image,
            sx: image.origin_x,
            sy: image.origin_y,
            dx: x.saturating_add(tx),
            dy: y.saturating_add(ty),
            width: image.width as i32,
            height: image.height as i32,
        }
    } else {
        let placed = ctx.transform() * Affine::translate((x as f64, y as f64));
        let det = placed.determinant();
        if !det.is_finite() || det.abs() < f64::EPSILON {
            tracing::debug!(det, "degenerate image transform; nothing to draw");
            return Ok(true);
        }
        let local = Rect::new(
            image.origin_x as f64,
            image.origin_y as f64,
            image.origin_x as f64 + image.width as f64,
            image.origin_y as f64 + image.height as f64,
        );
        let dev = placed.transform_rect_bbox(local);
        KernelOp::TransformBlit {
            src: &image,
            inverse: placed.inverse(),
            area: IntRect::from_corners(
                dev.x0.floor() as i32,
                dev.y0.floor() as i32,
                dev.x1.ceil() as i32,
                dev.y1.ceil() as i32,
            ),
            bilinear: ctx.hints().interpolation_type != InterpolationHint::NearestNeighbor,
        }
    };
    execute(ctx, &*k, &[kop], comp, None)?;
    Ok(true)
}

/// Blit-based copy within the bound surface, for surfaces without an in-place fast path.
/// Overlapping copies toward larger coordinates run in strips from the far edge.
pub(crate) fn copy_area(
    ctx: &mut GraphicsContext,
    area: IntRect,
    dx: i32,
    dy: i32,
) -> GfxResult<()> {
    let ctx: &GraphicsContext = ctx;
    let surface = ctx.surface();
    let mut comp = ctx.image_comp();
    if comp == CompositeType::SrcOverNoEa
        && surface.transparency() == Transparency::Opaque
    {
        comp = CompositeType::SrcNoEa;
    }
    let ty = surface.surface_type();
    let Some(k) = require(ctx.registry().locate(PrimitiveKind::Blit, ty, comp, ty), "blit")
    else {
        return Ok(());
    };

    let IntRect {
        x,
        y,
        width: w,
        height: h,
    } = area;
    let mut strips = Vec::new();
    if dy == 0 && dx > 0 && dx < w {
        let mut rem = w;
        while rem > 0 {
            let part = rem.min(dx);
            rem -= part;
            strips.push(IntRect::new(x + rem, y, part, h));
        }
    } else if dy > 0 && dy < h && dx > -w && dx < w {
        let mut rem = h;
        while rem > 0 {
            let part = rem.min(dy);
            rem -= part;
            strips.push(IntRect::new(x, y + rem, w, part));
        }
    } else {
        strips.push(area);
    }

    let args = kernel_args(ctx, comp, None);
    surface.with_raster(&mut |r| {
        for strip in &strips {
            let snapshot = r.snapshot(*strip);
            let op = KernelOp::Blit {
                src: &snapshot,
                sx: strip.x,
                sy: strip.y,
                dx: strip.x.saturating_add(dx),
                dy: strip.y.saturating_add(dy),
                width: strip.width,
                height: strip.height,
            };
            k.run(r, &op, &args)?;
        }
        Ok(())
    })
}

#[cfg(test)]
#[path = "../../tests/unit/context/dispatch.rs"]
mod tests;
