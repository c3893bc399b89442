use crate::foundation::core::{Color, ColorModel, IntRect, Transparency};
use crate::foundation::error::{GfxError, GfxResult};
use crate::render::types::{CompositeType, SurfaceType};
use crate::state::{State, StateTracker};
use crate::surface::{BufferedSurface, SharedSurface, Surface};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Image operation a proxy is consulted for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageOp {
    Blit,
    ScaledBlit,
    TransformBlit,
}

/// Destination-specific policy for building cached copies of a source surface.
pub trait ProxyBackend: Send + Sync + fmt::Debug {
    fn is_supported_operation(
        &self,
        src: &dyn Surface,
        op: ImageOp,
        comp: CompositeType,
        bg: Option<Color>,
    ) -> bool;

    /// Return a cache surface able to hold `width x height` pixels of `src`, reusing
    /// `cached` when it still fits. `None` when no cache can be allocated right now.
    fn validate_surface(
        &self,
        src: &dyn Surface,
        cached: Option<&SharedSurface>,
        width: u32,
        height: u32,
    ) -> Option<SharedSurface>;

    /// Copy the source contents into the cache surface.
    fn update_surface(
        &self,
        src: &dyn Surface,
        dst: &dyn Surface,
        width: u32,
        height: u32,
    ) -> GfxResult<()> {
        let area = IntRect::new(0, 0, width as i32, height as i32);
        let mut snapshot = None;
        src.with_raster(&mut |r| {
            snapshot = Some(r.snapshot(area));
            Ok(())
        })?;
        let snapshot = snapshot
            .ok_or_else(|| GfxError::illegal_state("source surface produced no pixels"))?;
        dst.with_raster(&mut |r| {
            for y in 0..snapshot.height as i32 {
                for x in 0..snapshot.width as i32 {
                    if let (Some(argb), true) = (snapshot.at(x, y), r.bounds().contains(x, y)) {
                        let i = y as usize * r.width as usize + x as usize;
                        r.pixels[i] = r.model.pixel_for(argb);
                    }
                }
            }
            Ok(())
        })?;
        dst.mark_dirty();
        Ok(())
    }
}

#[derive(Debug)]
struct ProxyInner {
    cached: Option<SharedSurface>,
    src_tracker: StateTracker,
    cache_tracker: StateTracker,
    numtries: u32,
}

/// Per (source, destination type) cache manager for image draws.
///
/// The proxy waits until a source has stayed unchanged across `threshold` uses before it
/// builds a converted copy, and discards the copy once the source changes.
pub struct SurfaceDataProxy {
    backend: Option<Arc<dyn ProxyBackend>>,
    threshold: u32,
    valid: AtomicBool,
    inner: Mutex<ProxyInner>,
}

impl fmt::Debug for SurfaceDataProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("SurfaceDataProxy")
            .field("backend", &self.backend)
            .field("threshold", &self.threshold)
            .field("valid", &self.is_valid())
            .field("cached", &inner.cached.is_some())
            .field("numtries", &inner.numtries)
            .finish()
    }
}

impl SurfaceDataProxy {
    pub fn new(backend: Arc<dyn ProxyBackend>, threshold: u32) -> Self {
        Self {
            backend: Some(backend),
            threshold,
            valid: AtomicBool::new(true),
            inner: Mutex::new(ProxyInner {
                cached: None,
                src_tracker: StateTracker::NeverCurrent,
                cache_tracker: StateTracker::NeverCurrent,
                numtries: threshold,
            }),
        }
    }

    /// Proxy that never caches.
    pub fn uncached() -> Self {
        Self {
            backend: None,
            threshold: 0,
            valid: AtomicBool::new(true),
            inner: Mutex::new(ProxyInner {
                cached: None,
                src_tracker: StateTracker::NeverCurrent,
                cache_tracker: StateTracker::NeverCurrent,
                numtries: 0,
            }),
        }
    }

    pub fn is_caching(&self) -> bool {
        self.backend.is_some()
    }

    pub fn is_valid(&self) -> bool {
        self.valid.load(Ordering::Acquire)
    }

    /// Permanently stop caching for this pairing.
    pub fn invalidate(&self) {
        self.valid.store(false, Ordering::Release);
    }

    /// Surface to read from when drawing `src`: either `src` itself or a current cached copy.
    #[tracing::instrument(level = "trace", skip_all, fields(?op, ?comp))]
    pub fn replace_data(
        &self,
        src: &SharedSurface,
        op: ImageOp,
        comp: CompositeType,
        bg: Option<Color>,
    ) -> SharedSurface {
        let Some(backend) = self.backend.as_deref() else {
            return Arc::clone(src);
        };
        if !self.is_valid() || !backend.is_supported_operation(&**src, op, comp, bg) {
            return Arc::clone(src);
        }

        let cur_tracker = {
            let mut inner = self.inner.lock();
            if !inner.src_tracker.is_current() {
                inner.src_tracker = src.state_tracker();
                inner.cache_tracker = StateTracker::NeverCurrent;
                inner.numtries = self.threshold;
                if !inner.src_tracker.is_current() {
                    if src.state() == State::Untrackable {
                        drop(inner);
                        tracing::debug!("source is untrackable; disabling proxy");
                        self.invalidate();
                        self.flush();
                    }
                    return Arc::clone(src);
                }
            }
            if inner.cache_tracker.is_current() {
                return inner.cached.clone().unwrap_or_else(|| Arc::clone(src));
            }
            if inner.numtries > 0 {
                inner.numtries -= 1;
                return Arc::clone(src);
            }
            inner.src_tracker.clone()
        };

        let bounds = src.bounds();
        let (w, h) = (bounds.width.max(0) as u32, bounds.height.max(0) as u32);
        let previous = self.inner.lock().cached.clone();
        let Some(cache) = backend.validate_surface(&**src, previous.as_ref(), w, h) else {
            let mut inner = self.inner.lock();
            if inner.src_tracker == cur_tracker {
                inner.cache_tracker = StateTracker::countdown(self.threshold);
                inner.cached = None;
            }
            return Arc::clone(src);
        };
        if let Err(err) = backend.update_surface(&**src, &*cache, w, h) {
            tracing::debug!(%err, "proxy update failed; drawing from source");
            return Arc::clone(src);
        }
        if !cache.is_valid() {
            return Arc::clone(src);
        }

        let mut inner = self.inner.lock();
        if inner.src_tracker == cur_tracker && cur_tracker.is_current() {
            tracing::debug!(w, h, "proxy cache refreshed");
            inner.cache_tracker = cache.state_tracker();
            inner.cached = Some(Arc::clone(&cache));
            return cache;
        }
        Arc::clone(src)
    }

    /// Drop and invalidate the cached copy. The next eligible use rebuilds it.
    pub fn flush(&self) {
        let dropped = {
            let mut inner = self.inner.lock();
            inner.cache_tracker = StateTracker::NeverCurrent;
            inner.cached.take()
        };
        if let Some(cache) = dropped {
            cache.invalidate();
        }
    }

    /// Drop the cached copy; with `deaccelerated` also stop caching. Returns whether the
    /// proxy is now invalid.
    pub fn flush_with(&self, deaccelerated: bool) -> bool {
        if deaccelerated {
            self.invalidate();
        }
        self.flush();
        !self.is_valid()
    }

    pub fn display_changed(&self) {
        self.flush();
    }

    /// Force the next use to re-snapshot the source.
    pub fn palette_changed(&self) {
        self.inner.lock().src_tracker = StateTracker::NeverCurrent;
    }

    pub fn cached(&self) -> Option<SharedSurface> {
        self.inner.lock().cached.clone()
    }
}

/// Proxies for one source surface, keyed by destination surface type.
#[derive(Debug, Default)]
pub struct ProxyCache {
    proxies: Mutex<HashMap<SurfaceType, Arc<SurfaceDataProxy>>>,
}

impl ProxyCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_insert_with(
        &self,
        dst: SurfaceType,
        make: impl FnOnce() -> SurfaceDataProxy,
    ) -> Arc<SurfaceDataProxy> {
        let mut proxies = self.proxies.lock();
        Arc::clone(proxies.entry(dst).or_insert_with(|| Arc::new(make())))
    }

    pub fn get(&self, dst: SurfaceType) -> Option<Arc<SurfaceDataProxy>> {
        self.proxies.lock().get(&dst).cloned()
    }

    pub fn display_changed(&self) {
        for proxy in self.proxies.lock().values() {
            proxy.display_changed();
        }
    }

    pub fn flush_all(&self) {
        for proxy in self.proxies.lock().values() {
            proxy.flush();
        }
    }

    pub fn len(&self) -> usize {
        self.proxies.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.proxies.lock().is_empty()
    }
}

/// Caches sources converted into a destination's color model.
#[derive(Debug)]
pub struct ConvertingProxy {
    model: ColorModel,
}

impl ConvertingProxy {
    pub fn new(model: ColorModel) -> Self {
        Self { model }
    }
}

impl ProxyBackend for ConvertingProxy {
    fn is_supported_operation(
        &self,
        src: &dyn Surface,
        _op: ImageOp,
        _comp: CompositeType,
        bg: Option<Color>,
    ) -> bool {
        bg.is_none() || src.transparency() == Transparency::Opaque
    }

    fn validate_surface(
        &self,
        _src: &dyn Surface,
        cached: Option<&SharedSurface>,
        width: u32,
        height: u32,
    ) -> Option<SharedSurface> {
        if width == 0 || height == 0 {
            return None;
        }
        if let Some(c) = cached {
            let b = c.bounds();
            if c.is_valid() && b.width as u32 == width && b.height as u32 == height {
                return Some(Arc::clone(c));
            }
        }
        Some(BufferedSurface::new(width, height, self.model) as SharedSurface)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/surface/proxy.rs"]
mod tests;
