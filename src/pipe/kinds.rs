use crate::render::kernels::Kernel;
use crate::render::registry::RenderLoops;
use serde::Serialize;
use std::sync::Arc;

/// Implementation chosen for the draw, fill and shape slots.
///
/// `*ViaShape` converts pixel-level verbs into outlines before rendering, `*ViaPgram`
/// additionally turns rectangles and simple lines into parallelograms, and `Clip` variants
/// are the forms selected while the clip is an arbitrary shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipeKind {
    /// Sentinel installed on every state change; forces re-selection before use.
    Invalid,
    /// Discards everything (disposed contexts and the null surface).
    Null,
    /// Integer loop primitives straight from the kernel registry.
    ColorPrimitives,
    ColorViaShape,
    ColorViaPgram,
    PaintViaShape,
    PaintShape,
    CompViaShape,
    CompShape,
    AaCompViaShape,
    AaClipCompViaShape,
    AaColorViaShape,
    AaColorViaPgram,
    AaClipColorViaShape,
    AaPaintViaShape,
    AaClipPaintViaShape,
}

impl PipeKind {
    pub fn is_valid(self) -> bool {
        self != Self::Invalid
    }

    /// Whether the pipe executes through the context's resolved [`RenderLoops`].
    pub fn is_loop_based(self) -> bool {
        matches!(
            self,
            Self::ColorPrimitives | Self::ColorViaShape | Self::ColorViaPgram
        )
    }

    /// Whether rectangles and lines may be issued as parallelograms.
    pub fn uses_parallelograms(self) -> bool {
        matches!(self, Self::ColorViaPgram | Self::AaColorViaPgram)
    }

    pub fn is_antialiased(self) -> bool {
        matches!(
            self,
            Self::AaCompViaShape
                | Self::AaClipCompViaShape
                | Self::AaColorViaShape
                | Self::AaColorViaPgram
                | Self::AaClipColorViaShape
                | Self::AaPaintViaShape
                | Self::AaClipPaintViaShape
        )
    }
}

/// Implementation chosen for the text slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TextPipeKind {
    Invalid,
    Null,
    /// Bilevel glyph-list loop.
    Solid,
    /// Grayscale glyph-list loop.
    Aa,
    /// Subpixel glyph-list loop.
    Lcd,
    /// Glyph outlines handed to the fill slot.
    Outline,
    /// Glyph coverage through the mask-fill kernel.
    Color,
    ClipColor,
    /// Glyph coverage through the general paint path.
    Paint,
    ClipPaint,
    /// Glyph coverage through the custom composite.
    Comp,
    ClipComp,
}

impl TextPipeKind {
    pub fn is_valid(self) -> bool {
        self != Self::Invalid
    }

    pub fn is_loop_based(self) -> bool {
        matches!(self, Self::Solid | Self::Aa | Self::Lcd)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImagePipeKind {
    Invalid,
    Null,
    /// Registry blits, resampling through the transform when needed.
    DrawImage,
}

impl ImagePipeKind {
    pub fn is_valid(self) -> bool {
        self != Self::Invalid
    }
}

/// The five pipe slots of a graphics context plus the kernels they resolved.
#[derive(Clone, Debug)]
pub struct PipeSet {
    pub draw: PipeKind,
    pub fill: PipeKind,
    pub shape: PipeKind,
    pub text: TextPipeKind,
    pub image: ImagePipeKind,
    /// Coverage fill for the current paint and composite, when one exists.
    pub alpha_fill: Option<Arc<dyn Kernel>>,
    /// Resolved only when some slot is loop-based.
    pub loops: Option<Arc<RenderLoops>>,
}

impl PipeSet {
    pub fn invalid() -> Self {
        Self {
            draw: PipeKind::Invalid,
            fill: PipeKind::Invalid,
            shape: PipeKind::Invalid,
            text: TextPipeKind::Invalid,
            image: ImagePipeKind::Invalid,
            alpha_fill: None,
            loops: None,
        }
    }

    pub fn null() -> Self {
        Self {
            draw: PipeKind::Null,
            fill: PipeKind::Null,
            shape: PipeKind::Null,
            text: TextPipeKind::Null,
            image: ImagePipeKind::Null,
            alpha_fill: None,
            loops: None,
        }
    }

    /// All five slots hold a selected pipe.
    pub fn is_valid(&self) -> bool {
        self.graphics_valid() && self.text.is_valid()
    }

    /// The draw, fill, shape and image slots hold a selected pipe. The text slot can be
    /// invalidated on its own by font changes.
    pub fn graphics_valid(&self) -> bool {
        self.draw.is_valid() && self.fill.is_valid() && self.shape.is_valid() && self.image.is_valid()
    }

    pub fn needs_loops(&self) -> bool {
        self.draw.is_loop_based()
            || self.fill.is_loop_based()
            || self.shape.is_loop_based()
            || self.text.is_loop_based()
    }

    pub fn snapshot(&self) -> PipeSnapshot {
        PipeSnapshot {
            draw: self.draw,
            fill: self.fill,
            shape: self.shape,
            text: self.text,
            image: self.image,
            alpha_fill: self.alpha_fill.as_ref().map(|k| k.name()),
            loops: self.loops.is_some(),
        }
    }
}

impl Default for PipeSet {
    fn default() -> Self {
        Self::invalid()
    }
}

/// Serializable view of a [`PipeSet`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PipeSnapshot {
    pub draw: PipeKind,
    pub fill: PipeKind,
    pub shape: PipeKind,
    pub text: TextPipeKind,
    pub image: ImagePipeKind,
    pub alpha_fill: Option<&'static str>,
    pub loops: bool,
}
