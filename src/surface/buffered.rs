use crate::context::GraphicsContext;
use crate::context::state::{ClipState, CompositeState};
use crate::foundation::core::{ColorModel, IntRect};
use crate::foundation::error::{GfxError, GfxResult};
use crate::render::kernels::Raster;
use crate::state::State;
use crate::surface::proxy::ConvertingProxy;
use crate::surface::{ProxyCache, SharedSurface, Surface, SurfaceCore, SurfaceDataProxy};
use parking_lot::Mutex;
use std::path::Path;
use std::sync::{Arc, Weak};

/// Heap-backed raster surface.
#[derive(Debug)]
pub struct BufferedSurface {
    core: SurfaceCore,
    width: u32,
    height: u32,
    pixels: Mutex<Vec<u32>>,
    successor: Mutex<Option<SharedSurface>>,
    proxies: ProxyCache,
    this: Weak<BufferedSurface>,
}

impl BufferedSurface {
    pub fn new(width: u32, height: u32, model: ColorModel) -> Arc<Self> {
        Self::with_core(width, height, SurfaceCore::new(model, State::Stable))
    }

    pub fn with_core(width: u32, height: u32, core: SurfaceCore) -> Arc<Self> {
        let len = width as usize * height as usize;
        Arc::new_cyclic(|this| Self {
            core,
            width,
            height,
            pixels: Mutex::new(vec![0; len]),
            successor: Mutex::new(None),
            proxies: ProxyCache::new(),
            this: this.clone(),
        })
    }

    /// Import straight-alpha RGBA8 pixels.
    pub fn from_rgba_image(img: &image::RgbaImage, model: ColorModel) -> Arc<Self> {
        let s = Self::new(img.width(), img.height(), model);
        {
            let mut px = s.pixels.lock();
            for (dst, p) in px.iter_mut().zip(img.pixels()) {
                let [r, g, b, a] = p.0;
                *dst = model.pixel_for(u32::from_be_bytes([a, r, g, b]));
            }
        }
        s
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Straight-alpha ARGB at `(x, y)`.
    pub fn argb(&self, x: i32, y: i32) -> Option<u32> {
        if !self.bounds().contains(x, y) {
            return None;
        }
        let px = self.pixels.lock();
        Some(
            self.core
                .color_model()
                .rgb_for(px[y as usize * self.width as usize + x as usize]),
        )
    }

    /// Overwrite every pixel with `argb`.
    pub fn clear_to(&self, argb: u32) {
        let pixel = self.core.color_model().pixel_for(argb);
        self.pixels.lock().fill(pixel);
        self.mark_dirty();
    }

    /// Retire this surface in favor of `next`, which becomes its replacement.
    pub fn set_successor(&self, next: SharedSurface) {
        *self.successor.lock() = Some(next);
        self.invalidate();
    }

    /// Attach a writer that bypasses tracked drawing. While any writer is attached the
    /// surface reports [`State::Dynamic`]. Immutable surfaces refuse writers.
    pub fn external_writer(&self) -> GfxResult<ExternalWriter<'_>> {
        self.core.delegate().add_dynamic_agent()?;
        Ok(ExternalWriter { surface: self })
    }

    pub fn to_rgba_image(&self) -> GfxResult<image::RgbaImage> {
        let model = self.core.color_model();
        let px = self.pixels.lock();
        let mut bytes = Vec::with_capacity(px.len() * 4);
        for &p in px.iter() {
            let [a, r, g, b] = model.rgb_for(p).to_be_bytes();
            bytes.extend_from_slice(&[r, g, b, a]);
        }
        image::RgbaImage::from_raw(self.width, self.height, bytes)
            .ok_or_else(|| GfxError::illegal_state("pixel buffer does not match dimensions"))
    }

    pub fn write_png(&self, path: &Path) -> GfxResult<()> {
        let img = self.to_rgba_image()?;
        img.save_with_format(path, image::ImageFormat::Png)
            .map_err(|e| GfxError::Other(anyhow::Error::new(e)))
    }
}

impl Surface for BufferedSurface {
    fn core(&self) -> &SurfaceCore {
        &self.core
    }

    fn bounds(&self) -> IntRect {
        IntRect::new(0, 0, self.width as i32, self.height as i32)
    }

    fn replacement(&self) -> Option<SharedSurface> {
        if let Some(next) = self.successor.lock().clone() {
            return Some(next);
        }
        if self.is_valid() {
            return self.this.upgrade().map(|s| s as SharedSurface);
        }
        None
    }

    fn with_raster(
        &self,
        f: &mut dyn FnMut(&mut Raster<'_>) -> GfxResult<()>,
    ) -> GfxResult<()> {
        if !self.is_valid() {
            return Err(GfxError::invalid_pipe("surface has been invalidated"));
        }
        let mut px = self.pixels.lock();
        let mut raster = Raster {
            width: self.width,
            height: self.height,
            model: self.core.color_model(),
            pixels: px.as_mut_slice(),
        };
        f(&mut raster)
    }

    fn copy_area(
        &self,
        ctx: &GraphicsContext,
        area: IntRect,
        dx: i32,
        dy: i32,
    ) -> GfxResult<bool> {
        if ctx.composite_state() != CompositeState::Copy || ctx.clip_state() == ClipState::Shape {
            return Ok(false);
        }
        if !self.is_valid() {
            return Err(GfxError::invalid_pipe("surface has been invalidated"));
        }
        let dst = area
            .translate(dx, dy)
            .intersect(ctx.clip_region().bounds())
            .intersect(self.bounds());
        let src = dst
            .translate(dx.saturating_neg(), dy.saturating_neg())
            .intersect(self.bounds());
        let dst = src.translate(dx, dy);
        if src.is_empty() {
            return Ok(true);
        }

        let stride = self.width as usize;
        let mut px = self.pixels.lock();
        let rows: Box<dyn Iterator<Item = i32>> = if dy > 0 {
            Box::new((0..src.height).rev())
        } else {
            Box::new(0..src.height)
        };
        for row in rows {
            let s = (src.y + row) as usize * stride + src.x as usize;
            let d = (dst.y + row) as usize * stride + dst.x as usize;
            px.copy_within(s..s + src.width as usize, d);
        }
        Ok(true)
    }

    fn proxies(&self) -> Option<&ProxyCache> {
        Some(&self.proxies)
    }

    fn make_proxy_for(&self, src: &dyn Surface, threshold: u32) -> SurfaceDataProxy {
        if src.color_model() == self.core.color_model() {
            return SurfaceDataProxy::uncached();
        }
        SurfaceDataProxy::new(
            Arc::new(ConvertingProxy::new(self.core.color_model())),
            threshold,
        )
    }
}

/// Untracked writer handed out by [`BufferedSurface::external_writer`].
pub struct ExternalWriter<'a> {
    surface: &'a BufferedSurface,
}

impl ExternalWriter<'_> {
    pub fn put(&self, x: i32, y: i32, argb: u32) {
        let s = self.surface;
        if !s.bounds().contains(x, y) {
            return;
        }
        let pixel = s.core.color_model().pixel_for(argb);
        s.pixels.lock()[y as usize * s.width as usize + x as usize] = pixel;
    }
}

impl Drop for ExternalWriter<'_> {
    fn drop(&mut self) {
        if let Err(err) = self.surface.core.delegate().remove_dynamic_agent() {
            tracing::warn!(%err, "external writer detach failed");
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/surface/buffered.rs"]
mod tests;
