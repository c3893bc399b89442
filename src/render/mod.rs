/// Porter-Duff arithmetic on packed pixels.
pub mod blend;
/// Reference rendering kernels.
pub mod kernels;
/// Scanline pixel regions.
pub mod region;
/// Kernel and service registry shared by graphics contexts.
pub mod registry;
/// Outline-to-region rasterization.
pub mod scanline;
/// Surface, composite and primitive classifications.
pub mod types;

pub use kernels::{GlyphImage, Kernel, KernelArgs, KernelOp, PaintSource, Raster, SourceImage};
pub use region::Region;
pub use registry::{LoopRegistry, PipeRegistry, RenderLoops};
pub use scanline::{ClipRasterizer, ScanlineRasterizer};
pub use types::{CompositeType, PrimitiveKind, SurfaceType};
