//! gfxpipe validates 2D rendering state and dispatches drawing to software raster surfaces.
//!
//! A [`GraphicsContext`] holds paint, composite, stroke, transform, clip, font and hints
//! for one destination [`surface::Surface`]. Each state change is classified into a small
//! code, and those codes select the pipes that carry the next drawing call to the kernels
//! in a shared [`render::PipeRegistry`]. Surfaces publish freshness through
//! [`state::StateTracker`] tokens so cached copies ([`surface::SurfaceDataProxy`]) know
//! when they are stale.
#![forbid(unsafe_code)]

mod foundation;

/// Graphics contexts and drawing state.
pub mod context;
/// Pipe slots and selection.
pub mod pipe;
/// Reentrant scratch-context pools.
pub mod pool;
/// Kernels, regions and the registry.
pub mod render;
/// JSON drawing scripts.
pub mod script;
/// Lazily collapsed interval sets.
pub mod spans;
/// Surface freshness tracking.
pub mod state;
/// Drawable surfaces, proxies and resource reclamation.
pub mod surface;

pub use crate::foundation::config::{DisposerConfig, GfxConfig, PoolConfig, TextPolicy};
pub use crate::foundation::core::{
    Affine, BezPath, Color, ColorModel, IntRect, Point, Rect, Shape, Transparency, Vec2,
    parse_hex_color,
};
pub use crate::foundation::error::{GfxError, GfxResult};

pub use crate::context::{ContextStats, GraphicsContext};
pub use crate::render::PipeRegistry;
pub use crate::surface::{BufferedSurface, NullSurface, SharedSurface, Surface};
