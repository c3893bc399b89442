//! Reference software kernels behind the rendering-loop registry.
//!
//! Kernels are deliberately simple per-pixel loops. Pipe selection only cares whether a
//! kernel exists for a key; backends with faster kernels register them under the same keys.

use crate::context::state::CustomComposite;
use crate::foundation::core::{Affine, ColorModel, IntRect, Point, Rect, Vec2};
use crate::foundation::error::{GfxError, GfxResult};
use crate::render::blend::{composite_argb, scale_alpha};
use crate::render::region::Region;
use crate::render::types::CompositeType;
use std::fmt;

/// Mutable view of a surface's pixels for the duration of one kernel call.
pub struct Raster<'a> {
    pub width: u32,
    pub height: u32,
    pub model: ColorModel,
    pub pixels: &'a mut [u32],
}

impl Raster<'_> {
    pub fn bounds(&self) -> IntRect {
        IntRect::new(0, 0, self.width as i32, self.height as i32)
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        self.bounds()
            .contains(x, y)
            .then(|| y as usize * self.width as usize + x as usize)
    }

    /// Straight-alpha ARGB at `(x, y)`, or `None` outside the raster.
    pub fn argb(&self, x: i32, y: i32) -> Option<u32> {
        self.index(x, y).map(|i| self.model.rgb_for(self.pixels[i]))
    }

    pub fn snapshot(&self, area: IntRect) -> SourceImage {
        let area = area.intersect(self.bounds());
        let mut argb = Vec::with_capacity((area.width.max(0) * area.height.max(0)) as usize);
        for y in area.y..area.y2() {
            for x in area.x..area.x2() {
                argb.push(self.argb(x, y).unwrap_or(0));
            }
        }
        SourceImage {
            origin_x: area.x,
            origin_y: area.y,
            width: area.width.max(0) as u32,
            height: area.height.max(0) as u32,
            argb,
        }
    }
}

/// Straight-alpha ARGB copy of a source rectangle, detached from its surface.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SourceImage {
    /// Position of the first pixel in the source surface.
    pub origin_x: i32,
    pub origin_y: i32,
    pub width: u32,
    pub height: u32,
    pub argb: Vec<u32>,
}

impl SourceImage {
    /// Pixel at source-surface coordinates.
    pub fn at(&self, x: i32, y: i32) -> Option<u32> {
        let (Some(lx), Some(ly)) = (x.checked_sub(self.origin_x), y.checked_sub(self.origin_y))
        else {
            return None;
        };
        if lx < 0 || ly < 0 || lx >= self.width as i32 || ly >= self.height as i32 {
            return None;
        }
        Some(self.argb[ly as usize * self.width as usize + lx as usize])
    }

    /// Whether a floored sample position lies within one pixel of the image.
    fn near(&self, fx: f64, fy: f64) -> bool {
        let x0 = self.origin_x as f64 - 1.0;
        let y0 = self.origin_y as f64 - 1.0;
        (x0..=x0 + self.width as f64 + 1.0).contains(&fx)
            && (y0..=y0 + self.height as f64 + 1.0).contains(&fy)
    }
}

/// Rasterized glyph coverage in device space.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GlyphImage {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    /// One byte per pixel, or three (R, G, B subpixels) for LCD glyphs.
    pub coverage: Vec<u8>,
    pub lcd: bool,
}

/// Samples a non-solid paint in device space.
pub trait PaintSource: Send + Sync + fmt::Debug {
    fn argb_at(&self, x: f64, y: f64) -> u32;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct XorArgs {
    pub xor_pixel: u32,
    pub alpha_mask: u32,
}

/// Per-call state shared by every kernel.
#[derive(Clone, Copy, Debug)]
pub struct KernelArgs<'a> {
    pub clip: &'a Region,
    /// Effective straight-alpha color (extra alpha folded in).
    pub color: u32,
    /// `color` converted for the destination.
    pub pixel: u32,
    pub comp: CompositeType,
    pub extra_alpha: f32,
    pub xor: Option<XorArgs>,
    pub custom: Option<&'a dyn CustomComposite>,
    pub paint: Option<&'a dyn PaintSource>,
}

/// Geometry handed to a kernel, in device space.
#[derive(Clone, Copy, Debug)]
pub enum KernelOp<'a> {
    Spans(&'a Region),
    Rect(IntRect),
    Line {
        x1: i32,
        y1: i32,
        x2: i32,
        y2: i32,
    },
    Parallelogram {
        origin: Point,
        d1: Vec2,
        d2: Vec2,
    },
    Mask {
        region: &'a Region,
        coverage: u8,
    },
    Glyphs(&'a [GlyphImage]),
    Blit {
        src: &'a SourceImage,
        sx: i32,
        sy: i32,
        dx: i32,
        dy: i32,
        width: i32,
        height: i32,
    },
    TransformBlit {
        src: &'a SourceImage,
        inverse: Affine,
        area: IntRect,
        bilinear: bool,
    },
}

impl KernelOp<'_> {
    fn name(&self) -> &'static str {
        match self {
            Self::Spans(_) => "spans",
            Self::Rect(_) => "rect",
            Self::Line { .. } => "line",
            Self::Parallelogram { .. } => "parallelogram",
            Self::Mask { .. } => "mask",
            Self::Glyphs(_) => "glyphs",
            Self::Blit { .. } => "blit",
            Self::TransformBlit { .. } => "transform_blit",
        }
    }
}

/// A rendering kernel stored in the loop registry.
pub trait Kernel: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    fn run(&self, dst: &mut Raster<'_>, op: &KernelOp<'_>, args: &KernelArgs<'_>)
    -> GfxResult<()>;

    /// Whether this kernel consumes [`KernelOp::Parallelogram`] directly.
    fn handles_parallelograms(&self) -> bool {
        false
    }
}

fn unsupported(kernel: &dyn Kernel, op: &KernelOp<'_>) -> GfxError {
    GfxError::illegal_argument(format!(
        "kernel '{}' cannot run '{}' operations",
        kernel.name(),
        op.name()
    ))
}

/// Write one source sample through the composite in `args`.
fn put(dst: &mut Raster<'_>, x: i32, y: i32, src_argb: u32, coverage: u8, args: &KernelArgs<'_>) {
    let Some(i) = dst.index(x, y) else {
        return;
    };
    if coverage == 0 {
        return;
    }
    if let Some(xor) = args.xor {
        if coverage >= 0x80 {
            let sp = dst.model.pixel_for(src_argb);
            dst.pixels[i] ^= (sp ^ xor.xor_pixel) & !xor.alpha_mask;
        }
        return;
    }
    let d = dst.model.rgb_for(dst.pixels[i]);
    let out = match args.custom {
        Some(custom) => {
            let composed = custom.compose(src_argb, d);
            composite_argb(CompositeType::Src, composed, d, coverage)
        }
        None => composite_argb(args.comp, src_argb, d, coverage),
    };
    dst.pixels[i] = dst.model.pixel_for(out);
}

fn is_store(args: &KernelArgs<'_>) -> bool {
    args.xor.is_none()
        && args.custom.is_none()
        && args.paint.is_none()
        && match args.comp {
            CompositeType::SrcNoEa | CompositeType::Src | CompositeType::Clear => true,
            CompositeType::OpaqueSrcOverNoEa => true,
            CompositeType::SrcOverNoEa | CompositeType::SrcOver => args.color >> 24 == 0xff,
            _ => false,
        }
}

fn source_at(args: &KernelArgs<'_>, x: i32, y: i32) -> u32 {
    match args.paint {
        Some(p) => scale_alpha(p.argb_at(x as f64 + 0.5, y as f64 + 0.5), args.extra_alpha),
        None => args.color,
    }
}

fn fill_span(dst: &mut Raster<'_>, y: i32, x0: i32, x1: i32, coverage: u8, args: &KernelArgs<'_>) {
    let b = dst.bounds();
    if y < b.y || y >= b.y2() {
        return;
    }
    let (x0, x1) = (x0.max(b.x), x1.min(b.x2()));
    if coverage == 0xff && is_store(args) {
        let pixel = if args.comp == CompositeType::Clear {
            dst.model.pixel_for(0)
        } else {
            args.pixel
        };
        let row = y as usize * dst.width as usize;
        for x in x0..x1 {
            dst.pixels[row + x as usize] = pixel;
        }
        return;
    }
    for x in x0..x1 {
        let s = source_at(args, x, y);
        put(dst, x, y, s, coverage, args);
    }
}

fn fill_region(dst: &mut Raster<'_>, region: &Region, coverage: u8, args: &KernelArgs<'_>) {
    let clipped = region.intersect(args.clip);
    clipped.for_each_span(|y, x0, x1| fill_span(dst, y, x0, x1, coverage, args));
}

/// Solid-color span and rectangle fills.
#[derive(Debug, Default)]
pub struct SolidFill;

impl Kernel for SolidFill {
    fn name(&self) -> &'static str {
        "solid_fill"
    }

    fn run(
        &self,
        dst: &mut Raster<'_>,
        op: &KernelOp<'_>,
        args: &KernelArgs<'_>,
    ) -> GfxResult<()> {
        match op {
            KernelOp::Spans(region) => fill_region(dst, region, 0xff, args),
            KernelOp::Rect(r) => fill_region(dst, &Region::rect(*r), 0xff, args),
            _ => return Err(unsupported(self, op)),
        }
        Ok(())
    }
}

/// Coverage-weighted fills for colors, paints and custom composites.
#[derive(Debug, Default)]
pub struct MaskFill;

impl Kernel for MaskFill {
    fn name(&self) -> &'static str {
        "mask_fill"
    }

    fn run(
        &self,
        dst: &mut Raster<'_>,
        op: &KernelOp<'_>,
        args: &KernelArgs<'_>,
    ) -> GfxResult<()> {
        match op {
            KernelOp::Mask { region, coverage } => fill_region(dst, region, *coverage, args),
            KernelOp::Spans(region) => fill_region(dst, region, 0xff, args),
            KernelOp::Rect(r) => fill_region(dst, &Region::rect(*r), 0xff, args),
            KernelOp::Parallelogram { origin, d1, d2 } => {
                let region = parallelogram_region(*origin, *d1, *d2, args.clip.bounds());
                fill_region(dst, &region, 0xff, args)
            }
            _ => return Err(unsupported(self, op)),
        }
        Ok(())
    }

    fn handles_parallelograms(&self) -> bool {
        true
    }
}

/// One-pixel lines.
#[derive(Debug, Default)]
pub struct SolidLine;

impl Kernel for SolidLine {
    fn name(&self) -> &'static str {
        "solid_line"
    }

    fn run(
        &self,
        dst: &mut Raster<'_>,
        op: &KernelOp<'_>,
        args: &KernelArgs<'_>,
    ) -> GfxResult<()> {
        let KernelOp::Line { x1, y1, x2, y2 } = *op else {
            return Err(unsupported(self, op));
        };
        let (dx, dy) = ((x2 - x1).abs(), -(y2 - y1).abs());
        let (sx, sy) = (if x1 < x2 { 1 } else { -1 }, if y1 < y2 { 1 } else { -1 });
        let (mut x, mut y, mut err) = (x1, y1, dx + dy);
        loop {
            if args.clip.contains(x, y) {
                put(dst, x, y, args.color, 0xff, args);
            }
            if x == x2 && y == y2 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
        Ok(())
    }
}

/// Pixels whose centers fall inside the parallelogram `origin + u*d1 + v*d2`, `u, v` in
/// `[0, 1)`.
pub fn parallelogram_region(origin: Point, d1: Vec2, d2: Vec2, limit: IntRect) -> Region {
    let corners = [origin, origin + d1, origin + d2, origin + d1 + d2];
    let mut bbox = Rect::from_points(corners[0], corners[1]);
    for c in &corners[2..] {
        bbox = bbox.union_pt(*c);
    }
    let area = IntRect::covering(bbox).intersect(limit);
    let det = d1.cross(d2);
    if det == 0.0 || area.is_empty() {
        return Region::empty();
    }
    let mut spans = Vec::new();
    for y in area.y..area.y2() {
        let mut run: Option<i32> = None;
        for x in area.x..area.x2() {
            let p = Point::new(x as f64 + 0.5, y as f64 + 0.5) - origin;
            let u = p.cross(d2) / det;
            let v = d1.cross(p) / det;
            let inside = (0.0..1.0).contains(&u) && (0.0..1.0).contains(&v);
            match (inside, run) {
                (true, None) => run = Some(x),
                (false, Some(start)) => {
                    spans.push((y, start, x));
                    run = None;
                }
                _ => {}
            }
        }
        if let Some(start) = run {
            spans.push((y, start, area.x2()));
        }
    }
    Region::from_spans(spans)
}

/// Parallelogram fills for solid colors.
#[derive(Debug, Default)]
pub struct SolidParallelogram;

impl Kernel for SolidParallelogram {
    fn name(&self) -> &'static str {
        "solid_parallelogram"
    }

    fn run(
        &self,
        dst: &mut Raster<'_>,
        op: &KernelOp<'_>,
        args: &KernelArgs<'_>,
    ) -> GfxResult<()> {
        let KernelOp::Parallelogram { origin, d1, d2 } = *op else {
            return Err(unsupported(self, op));
        };
        let region = parallelogram_region(origin, d1, d2, args.clip.bounds());
        fill_region(dst, &region, 0xff, args);
        Ok(())
    }

    fn handles_parallelograms(&self) -> bool {
        true
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GlyphMode {
    /// Coverage thresholded at one half.
    Solid,
    Gray,
    Lcd,
}

/// Glyph-list renderer.
#[derive(Debug)]
pub struct GlyphList {
    pub mode: GlyphMode,
}

impl Kernel for GlyphList {
    fn name(&self) -> &'static str {
        match self.mode {
            GlyphMode::Solid => "glyph_list",
            GlyphMode::Gray => "glyph_list_aa",
            GlyphMode::Lcd => "glyph_list_lcd",
        }
    }

    fn run(
        &self,
        dst: &mut Raster<'_>,
        op: &KernelOp<'_>,
        args: &KernelArgs<'_>,
    ) -> GfxResult<()> {
        let KernelOp::Glyphs(glyphs) = *op else {
            return Err(unsupported(self, op));
        };
        for g in glyphs {
            let stride = if g.lcd { 3 } else { 1 };
            for gy in 0..g.height as i32 {
                for gx in 0..g.width as i32 {
                    let (x, y) = (g.x + gx, g.y + gy);
                    if !args.clip.contains(x, y) {
                        continue;
                    }
                    let at = (gy as usize * g.width as usize + gx as usize) * stride;
                    let Some(cov) = g.coverage.get(at..at + stride) else {
                        continue;
                    };
                    match (self.mode, g.lcd) {
                        (GlyphMode::Lcd, true) => put_lcd(dst, x, y, [cov[0], cov[1], cov[2]], args),
                        (GlyphMode::Solid, _) => {
                            if cov[0] >= 0x80 {
                                put(dst, x, y, args.color, 0xff, args);
                            }
                        }
                        _ => put(dst, x, y, args.color, cov[0], args),
                    }
                }
            }
        }
        Ok(())
    }
}

fn put_lcd(dst: &mut Raster<'_>, x: i32, y: i32, cov: [u8; 3], args: &KernelArgs<'_>) {
    let Some(i) = dst.index(x, y) else {
        return;
    };
    let d = dst.model.rgb_for(dst.pixels[i]).to_be_bytes();
    let s = args.color.to_be_bytes();
    let mix = |sc: u8, dc: u8, c: u8| {
        ((sc as u32 * c as u32 + dc as u32 * (255 - c as u32) + 127) / 255) as u8
    };
    let out = u32::from_be_bytes([
        0xff,
        mix(s[1], d[1], cov[0]),
        mix(s[2], d[2], cov[1]),
        mix(s[3], d[3], cov[2]),
    ]);
    dst.pixels[i] = dst.model.pixel_for(out);
}

/// Copies with color conversion and compositing.
#[derive(Debug, Default)]
pub struct ConvertBlit;

impl Kernel for ConvertBlit {
    fn name(&self) -> &'static str {
        "convert_blit"
    }

    fn run(
        &self,
        dst: &mut Raster<'_>,
        op: &KernelOp<'_>,
        args: &KernelArgs<'_>,
    ) -> GfxResult<()> {
        let KernelOp::Blit {
            src,
            sx,
            sy,
            dx,
            dy,
            width,
            height,
        } = *op
        else {
            return Err(unsupported(self, op));
        };
        let area = IntRect::new(dx, dy, width, height);
        let clipped = args.clip.intersect_rect(area);
        clipped.for_each_span(|y, x0, x1| {
            for x in x0..x1 {
                if let Some(s) = src.at(sx + (x - dx), sy + (y - dy)) {
                    put(dst, x, y, scale_alpha(s, args.extra_alpha), 0xff, args);
                }
            }
        });
        Ok(())
    }
}

/// Resampling copies through an arbitrary transform.
#[derive(Debug, Default)]
pub struct TransformBlit;

fn sample_bilinear(src: &SourceImage, x: f64, y: f64) -> Option<u32> {
    let (fx, fy) = ((x - 0.5).floor(), (y - 0.5).floor());
    if !src.near(fx, fy) {
        return None;
    }
    let (x0, y0) = (fx as i32, fy as i32);
    let (tx, ty) = (x - 0.5 - fx, y - 0.5 - fy);
    let (x1, y1) = (x0.saturating_add(1), y0.saturating_add(1));
    let taps = [
        (x0, y0, (1.0 - tx) * (1.0 - ty)),
        (x1, y0, tx * (1.0 - ty)),
        (x0, y1, (1.0 - tx) * ty),
        (x1, y1, tx * ty),
    ];
    let mut acc = [0.0f64; 4];
    let mut weight = 0.0;
    for (sx, sy, w) in taps {
        let Some(p) = src.at(sx, sy) else {
            continue;
        };
        let [a, r, g, b] = p.to_be_bytes();
        let af = a as f64 / 255.0;
        acc[0] += w * a as f64;
        acc[1] += w * r as f64 * af;
        acc[2] += w * g as f64 * af;
        acc[3] += w * b as f64 * af;
        weight += w;
    }
    if weight <= 0.0 {
        return None;
    }
    let a = acc[0] / weight;
    if a <= 0.0 {
        return Some(0);
    }
    let un = |c: f64| ((c / weight) * 255.0 / a).round().clamp(0.0, 255.0) as u32;
    Some(((a.round() as u32) << 24) | (un(acc[1]) << 16) | (un(acc[2]) << 8) | un(acc[3]))
}

impl Kernel for TransformBlit {
    fn name(&self) -> &'static str {
        "transform_blit"
    }

    fn run(
        &self,
        dst: &mut Raster<'_>,
        op: &KernelOp<'_>,
        args: &KernelArgs<'_>,
    ) -> GfxResult<()> {
        let KernelOp::TransformBlit {
            src,
            inverse,
            area,
            bilinear,
        } = *op
        else {
            return Err(unsupported(self, op));
        };
        let clipped = args.clip.intersect_rect(area);
        clipped.for_each_span(|y, x0, x1| {
            for x in x0..x1 {
                let p = inverse * Point::new(x as f64 + 0.5, y as f64 + 0.5);
                let sample = if bilinear {
                    sample_bilinear(src, p.x, p.y)
                } else if src.near(p.x.floor(), p.y.floor()) {
                    src.at(p.x.floor() as i32, p.y.floor() as i32)
                } else {
                    None
                };
                if let Some(s) = sample {
                    put(dst, x, y, scale_alpha(s, args.extra_alpha), 0xff, args);
                }
            }
        });
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/kernels.rs"]
mod tests;
