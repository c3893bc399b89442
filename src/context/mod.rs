//! Graphics contexts: the drawing state, its classification and verb dispatch.

/// Per-verb execution through the selected pipes.
pub(crate) mod dispatch;
/// Fonts, strikes and resolved text parameters.
pub mod font;
/// The graphics context itself.
pub mod graphics;
/// Rendering hints.
pub mod hints;
/// Paint, composite, stroke, transform and clip values and their classifications.
pub mod state;

pub use font::{BoxStrikeProvider, Font, FontInfo, FontMetrics, FontRenderContext, StrikeProvider};
pub use graphics::{ContextStats, GraphicsContext};
pub use hints::{HintKey, Hints, RenderingHint};
pub use state::{AlphaComposite, ClipShape, Composite, Paint, Rule, Stroke, XorComposite};
