use crate::context::font::{BoxStrikeProvider, StrikeProvider};
use crate::foundation::config::GfxConfig;
use crate::foundation::error::GfxResult;
use crate::render::kernels::{
    ConvertBlit, GlyphList, GlyphMode, Kernel, MaskFill, SolidFill, SolidLine,
    SolidParallelogram, TransformBlit,
};
use crate::render::scanline::{ClipRasterizer, ScanlineRasterizer};
use crate::render::types::{CompositeType, LoopKey, PrimitiveKind, SurfaceType};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Kernels keyed by `(primitive, source type, composite type, destination type)`.
#[derive(Clone, Default)]
pub struct LoopRegistry {
    kernels: HashMap<LoopKey, Arc<dyn Kernel>>,
}

impl fmt::Debug for LoopRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoopRegistry")
            .field("kernels", &self.kernels.len())
            .finish()
    }
}

impl LoopRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reference kernels for every integer and byte surface.
    pub fn with_defaults() -> Self {
        use CompositeType as C;
        use PrimitiveKind as P;
        use SurfaceType as S;

        let mut r = Self::new();
        let solid: Arc<dyn Kernel> = Arc::new(SolidFill);
        let mask: Arc<dyn Kernel> = Arc::new(MaskFill);
        r.insert(P::FillSpans, S::AnyColor, C::Any, S::Any, Arc::clone(&solid));
        r.insert(P::FillRect, S::AnyColor, C::Any, S::Any, solid);
        r.register(P::DrawLine, S::AnyColor, C::Any, S::Any, SolidLine);
        r.register(P::FillParallelogram, S::AnyColor, C::SrcNoEa, S::AnyInt, SolidParallelogram);
        r.register(P::FillParallelogram, S::AnyColor, C::Xor, S::AnyInt, SolidParallelogram);
        r.insert(P::MaskFill, S::AnyPaint, C::AnyAlpha, S::Any, Arc::clone(&mask));
        r.insert(P::MaskFill, S::AnyPaint, C::General, S::Any, mask);
        r.register(
            P::DrawGlyphList,
            S::AnyColor,
            C::Any,
            S::Any,
            GlyphList {
                mode: GlyphMode::Solid,
            },
        );
        r.register(
            P::DrawGlyphListAa,
            S::AnyColor,
            C::AnyAlpha,
            S::Any,
            GlyphList {
                mode: GlyphMode::Gray,
            },
        );
        r.register(
            P::DrawGlyphListLcd,
            S::AnyColor,
            C::SrcNoEa,
            S::IntRgb,
            GlyphList {
                mode: GlyphMode::Lcd,
            },
        );
        r.register(P::Blit, S::Any, C::Any, S::Any, ConvertBlit);
        r.register(P::TransformBlit, S::Any, C::Any, S::Any, TransformBlit);
        r
    }

    pub fn register(
        &mut self,
        prim: PrimitiveKind,
        src: SurfaceType,
        comp: CompositeType,
        dst: SurfaceType,
        kernel: impl Kernel + 'static,
    ) {
        self.insert(prim, src, comp, dst, Arc::new(kernel));
    }

    pub fn insert(
        &mut self,
        prim: PrimitiveKind,
        src: SurfaceType,
        comp: CompositeType,
        dst: SurfaceType,
        kernel: Arc<dyn Kernel>,
    ) {
        self.kernels.insert(
            LoopKey {
                prim,
                src,
                comp,
                dst,
            },
            kernel,
        );
    }

    /// Most specific kernel serving the key, walking each type's lineage. `None` means no
    /// fast path exists and callers must fall back.
    pub fn locate(
        &self,
        prim: PrimitiveKind,
        src: SurfaceType,
        comp: CompositeType,
        dst: SurfaceType,
    ) -> Option<Arc<dyn Kernel>> {
        for &d in dst.lineage() {
            for &c in comp.lineage() {
                for &s in src.lineage() {
                    let key = LoopKey {
                        prim,
                        src: s,
                        comp: c,
                        dst: d,
                    };
                    if let Some(k) = self.kernels.get(&key) {
                        return Some(Arc::clone(k));
                    }
                }
            }
        }
        None
    }

    pub fn len(&self) -> usize {
        self.kernels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kernels.is_empty()
    }
}

/// Loop-based primitives resolved for one `(source, composite, destination)` triple.
#[derive(Clone, Debug, Default)]
pub struct RenderLoops {
    pub fill_spans: Option<Arc<dyn Kernel>>,
    pub fill_rect: Option<Arc<dyn Kernel>>,
    pub draw_line: Option<Arc<dyn Kernel>>,
    pub fill_parallelogram: Option<Arc<dyn Kernel>>,
    pub draw_glyph_list: Option<Arc<dyn Kernel>>,
    pub draw_glyph_list_aa: Option<Arc<dyn Kernel>>,
    pub draw_glyph_list_lcd: Option<Arc<dyn Kernel>>,
}

type RenderLoopsKey = (SurfaceType, CompositeType, SurfaceType);

/// Immutable rendering services shared by every graphics context: kernels, clip
/// rasterizer, glyph strikes and configuration.
pub struct PipeRegistry {
    config: GfxConfig,
    loops: LoopRegistry,
    rasterizer: Arc<dyn ClipRasterizer>,
    strikes: Arc<dyn StrikeProvider>,
    render_cache: Mutex<HashMap<RenderLoopsKey, Arc<RenderLoops>>>,
}

impl fmt::Debug for PipeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipeRegistry")
            .field("config", &self.config)
            .field("loops", &self.loops)
            .field("rasterizer", &self.rasterizer)
            .field("strikes", &self.strikes)
            .finish()
    }
}

impl Default for PipeRegistry {
    fn default() -> Self {
        let config = GfxConfig::default();
        Self {
            loops: LoopRegistry::with_defaults(),
            rasterizer: Arc::new(ScanlineRasterizer::new(config.pool)),
            strikes: Arc::new(BoxStrikeProvider::default()),
            render_cache: Mutex::new(HashMap::new()),
            config,
        }
    }
}

impl PipeRegistry {
    pub fn builder(config: GfxConfig) -> PipeRegistryBuilder {
        PipeRegistryBuilder {
            config,
            loops: None,
            rasterizer: None,
            strikes: None,
        }
    }

    pub fn config(&self) -> &GfxConfig {
        &self.config
    }

    pub fn loops(&self) -> &LoopRegistry {
        &self.loops
    }

    pub fn rasterizer(&self) -> &dyn ClipRasterizer {
        &*self.rasterizer
    }

    pub fn strikes(&self) -> &dyn StrikeProvider {
        &*self.strikes
    }

    pub fn locate(
        &self,
        prim: PrimitiveKind,
        src: SurfaceType,
        comp: CompositeType,
        dst: SurfaceType,
    ) -> Option<Arc<dyn Kernel>> {
        self.loops.locate(prim, src, comp, dst)
    }

    /// Resolve (and memoize) the loop-based primitives for a triple.
    pub fn render_loops(
        &self,
        src: SurfaceType,
        comp: CompositeType,
        dst: SurfaceType,
    ) -> Arc<RenderLoops> {
        let mut cache = self.render_cache.lock();
        Arc::clone(cache.entry((src, comp, dst)).or_insert_with(|| {
            use PrimitiveKind as P;
            let find = |p| self.loops.locate(p, src, comp, dst);
            Arc::new(RenderLoops {
                fill_spans: find(P::FillSpans),
                fill_rect: find(P::FillRect),
                draw_line: find(P::DrawLine),
                fill_parallelogram: find(P::FillParallelogram),
                draw_glyph_list: find(P::DrawGlyphList),
                draw_glyph_list_aa: find(P::DrawGlyphListAa),
                draw_glyph_list_lcd: find(P::DrawGlyphListLcd),
            })
        }))
    }
}

pub struct PipeRegistryBuilder {
    config: GfxConfig,
    loops: Option<LoopRegistry>,
    rasterizer: Option<Arc<dyn ClipRasterizer>>,
    strikes: Option<Arc<dyn StrikeProvider>>,
}

impl PipeRegistryBuilder {
    pub fn loops(mut self, loops: LoopRegistry) -> Self {
        self.loops = Some(loops);
        self
    }

    pub fn rasterizer(mut self, rasterizer: Arc<dyn ClipRasterizer>) -> Self {
        self.rasterizer = Some(rasterizer);
        self
    }

    pub fn strikes(mut self, strikes: Arc<dyn StrikeProvider>) -> Self {
        self.strikes = Some(strikes);
        self
    }

    pub fn build(self) -> GfxResult<PipeRegistry> {
        self.config.validate()?;
        let pool = self.config.pool;
        Ok(PipeRegistry {
            loops: self.loops.unwrap_or_else(LoopRegistry::with_defaults),
            rasterizer: self
                .rasterizer
                .unwrap_or_else(|| Arc::new(ScanlineRasterizer::new(pool))),
            strikes: self
                .strikes
                .unwrap_or_else(|| Arc::new(BoxStrikeProvider::default())),
            render_cache: Mutex::new(HashMap::new()),
            config: self.config,
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/registry.rs"]
mod tests;
