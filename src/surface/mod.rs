//! Drawable surfaces and the collaborators attached to them.

/// In-memory raster surface.
pub mod buffered;
/// Background and polled reclamation of native resources.
pub mod disposer;
/// Null-object surface for disposed or lost contexts.
pub mod null;
/// Cached, converted copies of source surfaces.
pub mod proxy;

use crate::context::GraphicsContext;
use crate::foundation::core::{ColorModel, IntRect, Transparency};
use crate::foundation::error::{GfxError, GfxResult};
use crate::render::kernels::{Kernel, Raster};
use crate::render::registry::RenderLoops;
use crate::render::types::SurfaceType;
use crate::state::{State, StateTrackableDelegate, StateTracker};
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

pub use buffered::BufferedSurface;
pub use disposer::{Disposer, DisposerHandle, DisposerRecord};
pub use null::NullSurface;
pub use proxy::{ImageOp, ProxyBackend, ProxyCache, SurfaceDataProxy};

/// Shared handle to a drawable surface.
pub type SharedSurface = Arc<dyn Surface>;

/// A drawable destination.
///
/// Implementors provide raster access, bounds and replacement; pipe selection, pixel
/// conversion and state tracking have defaults driven by [`SurfaceCore`].
pub trait Surface: Send + Sync + fmt::Debug {
    fn core(&self) -> &SurfaceCore;

    /// Device-space bounds of the drawable area.
    fn bounds(&self) -> IntRect;

    /// Surface to draw to in place of this one. `None` means nothing usable is left and the
    /// caller should switch to the null surface.
    fn replacement(&self) -> Option<SharedSurface>;

    /// Run `f` against the surface's pixels. Fails with [`GfxError::InvalidPipe`] once the
    /// surface has been invalidated.
    fn with_raster(
        &self,
        f: &mut dyn FnMut(&mut Raster<'_>) -> GfxResult<()>,
    ) -> GfxResult<()>;

    fn is_valid(&self) -> bool {
        self.core().is_valid()
    }

    fn invalidate(&self) {
        self.core().invalidate();
    }

    fn is_surface_lost(&self) -> bool {
        self.core().is_surface_lost()
    }

    fn set_surface_lost(&self, lost: bool) {
        self.core().set_surface_lost(lost);
    }

    fn surface_type(&self) -> SurfaceType {
        self.core().surface_type()
    }

    fn color_model(&self) -> ColorModel {
        self.core().color_model()
    }

    fn transparency(&self) -> Transparency {
        self.color_model().transparency()
    }

    fn state(&self) -> State {
        self.core().delegate().state()
    }

    fn state_tracker(&self) -> StateTracker {
        self.core().delegate().state_tracker()
    }

    fn mark_dirty(&self) {
        self.core().delegate().mark_dirty();
    }

    fn pixel_for(&self, argb: u32) -> u32 {
        self.color_model().pixel_for(argb)
    }

    fn rgb_for(&self, pixel: u32) -> u32 {
        self.color_model().rgb_for(pixel)
    }

    /// Select pipes for `ctx`'s current state. Surfaces with special needs override this and
    /// may delegate back to [`crate::pipe::validate_pipes`].
    fn validate_pipe(&self, ctx: &mut GraphicsContext) -> GfxResult<()> {
        crate::pipe::validate_pipes(self, ctx)
    }

    /// Surface-specific in-place copy. `Ok(false)` means no fast path; the caller falls back
    /// to a blit.
    fn copy_area(
        &self,
        _ctx: &GraphicsContext,
        _area: IntRect,
        _dx: i32,
        _dy: i32,
    ) -> GfxResult<bool> {
        Ok(false)
    }

    /// Fails when custom composites (which read destination pixels back) are not allowed.
    fn check_custom_composite(&self) -> GfxResult<()> {
        if self.core().allows_pixel_reads() {
            Ok(())
        } else {
            Err(GfxError::permission(
                "surface does not allow reading pixels for custom composites",
            ))
        }
    }

    fn can_render_lcd_text(&self, ctx: &GraphicsContext) -> bool {
        crate::pipe::select::can_render_lcd_text(self, ctx)
    }

    fn can_render_parallelograms(&self, ctx: &GraphicsContext) -> bool {
        crate::pipe::select::can_render_parallelograms(self, ctx)
    }

    /// Coverage fill kernel for the context's paint and composite, if one exists.
    fn mask_fill(&self, ctx: &GraphicsContext) -> Option<Arc<dyn Kernel>> {
        crate::pipe::select::locate_mask_fill(self, ctx)
    }

    fn render_loops(&self, ctx: &GraphicsContext) -> Arc<RenderLoops> {
        crate::pipe::select::render_loops_for(self, ctx)
    }

    /// Proxies caching copies of this surface when it is used as an image source.
    fn proxies(&self) -> Option<&ProxyCache> {
        None
    }

    /// Proxy to use when `src` is drawn onto this surface.
    fn make_proxy_for(&self, _src: &dyn Surface, _threshold: u32) -> SurfaceDataProxy {
        SurfaceDataProxy::uncached()
    }
}

/// Results of one-time kernel availability probes, cached per surface.
#[derive(Debug, Default)]
pub struct LoopProbes {
    pub pgram_solid: OnceLock<bool>,
    pub pgram_xor: OnceLock<bool>,
    pub lcd: OnceLock<bool>,
}

/// State shared by every surface implementation.
#[derive(Debug)]
pub struct SurfaceCore {
    surface_type: SurfaceType,
    color_model: ColorModel,
    valid: AtomicBool,
    lost: AtomicBool,
    pixel_reads: bool,
    delegate: StateTrackableDelegate,
    probes: LoopProbes,
    disposer: Mutex<Option<DisposerHandle>>,
}

impl SurfaceCore {
    pub fn new(color_model: ColorModel, state: State) -> Self {
        Self::with_type(SurfaceType::for_model(color_model), color_model, state)
    }

    pub fn with_type(surface_type: SurfaceType, color_model: ColorModel, state: State) -> Self {
        Self {
            surface_type,
            color_model,
            valid: AtomicBool::new(true),
            lost: AtomicBool::new(false),
            pixel_reads: true,
            delegate: StateTrackableDelegate::new(state),
            probes: LoopProbes::default(),
            disposer: Mutex::new(None),
        }
    }

    /// Forbid custom composites on this surface.
    pub fn deny_pixel_reads(mut self) -> Self {
        self.pixel_reads = false;
        self
    }

    pub fn allows_pixel_reads(&self) -> bool {
        self.pixel_reads
    }

    pub fn surface_type(&self) -> SurfaceType {
        self.surface_type
    }

    pub fn color_model(&self) -> ColorModel {
        self.color_model
    }

    pub fn is_valid(&self) -> bool {
        self.valid.load(Ordering::Acquire)
    }

    /// Mark the surface unusable. Pipes validated against it fail on next use.
    pub fn invalidate(&self) {
        self.valid.store(false, Ordering::Release);
        self.delegate.mark_dirty();
    }

    pub fn is_surface_lost(&self) -> bool {
        self.lost.load(Ordering::Acquire)
    }

    pub fn set_surface_lost(&self, lost: bool) {
        self.lost.store(lost, Ordering::Release);
    }

    pub fn delegate(&self) -> &StateTrackableDelegate {
        &self.delegate
    }

    pub fn probes(&self) -> &LoopProbes {
        &self.probes
    }

    /// Tie a native resource's lifetime to this surface.
    pub fn attach_disposer(&self, handle: DisposerHandle) {
        *self.disposer.lock() = Some(handle);
    }
}
