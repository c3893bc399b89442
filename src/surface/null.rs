use crate::context::GraphicsContext;
use crate::foundation::core::{ColorModel, IntRect};
use crate::foundation::error::GfxResult;
use crate::pipe::PipeSet;
use crate::render::kernels::Raster;
use crate::state::State;
use crate::surface::{SharedSurface, Surface, SurfaceCore};
use std::sync::{Arc, LazyLock};

static NULL_SURFACE: LazyLock<Arc<NullSurface>> = LazyLock::new(|| {
    Arc::new(NullSurface {
        core: SurfaceCore::new(ColorModel::IntArgb, State::Immutable),
    })
});

/// Surface that accepts every operation and draws nothing.
///
/// Contexts switch to it when disposed or when their surface has no replacement.
#[derive(Debug)]
pub struct NullSurface {
    core: SurfaceCore,
}

impl NullSurface {
    pub fn shared() -> SharedSurface {
        Arc::clone(&*NULL_SURFACE) as SharedSurface
    }

    pub fn is_null(surface: &dyn Surface) -> bool {
        std::ptr::addr_eq(surface as *const dyn Surface, Arc::as_ptr(&*NULL_SURFACE))
    }
}

impl Surface for NullSurface {
    fn core(&self) -> &SurfaceCore {
        &self.core
    }

    fn bounds(&self) -> IntRect {
        IntRect::default()
    }

    fn replacement(&self) -> Option<SharedSurface> {
        Some(Self::shared())
    }

    fn with_raster(
        &self,
        _f: &mut dyn FnMut(&mut Raster<'_>) -> GfxResult<()>,
    ) -> GfxResult<()> {
        Ok(())
    }

    fn is_valid(&self) -> bool {
        true
    }

    fn invalidate(&self) {}

    fn mark_dirty(&self) {}

    fn validate_pipe(&self, ctx: &mut GraphicsContext) -> GfxResult<()> {
        ctx.set_pipes(PipeSet::null());
        Ok(())
    }

    fn copy_area(
        &self,
        _ctx: &GraphicsContext,
        _area: IntRect,
        _dx: i32,
        _dy: i32,
    ) -> GfxResult<bool> {
        Ok(true)
    }
}
