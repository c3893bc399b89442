use crate::foundation::core::ColorModel;
use serde::Serialize;

/// Source or destination classification used to key rendering kernels.
///
/// Types form a lineage from most to least specific; a kernel registered for an ancestor
/// serves every descendant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SurfaceType {
    Any,
    AnyPaint,
    AnyColor,
    OpaqueColor,
    GradientPaint,
    LinearGradientPaint,
    RadialGradientPaint,
    TexturePaint,
    AnyInt,
    IntArgb,
    IntArgbPre,
    IntRgb,
    AnyByte,
    ByteGray,
}

impl SurfaceType {
    pub fn lineage(self) -> &'static [SurfaceType] {
        use SurfaceType::*;
        match self {
            Any => &[Any],
            AnyPaint => &[AnyPaint, Any],
            AnyColor => &[AnyColor, AnyPaint, Any],
            OpaqueColor => &[OpaqueColor, AnyColor, AnyPaint, Any],
            GradientPaint => &[GradientPaint, AnyPaint, Any],
            LinearGradientPaint => &[LinearGradientPaint, AnyPaint, Any],
            RadialGradientPaint => &[RadialGradientPaint, AnyPaint, Any],
            TexturePaint => &[TexturePaint, AnyPaint, Any],
            AnyInt => &[AnyInt, Any],
            IntArgb => &[IntArgb, AnyInt, Any],
            IntArgbPre => &[IntArgbPre, AnyInt, Any],
            IntRgb => &[IntRgb, AnyInt, Any],
            AnyByte => &[AnyByte, Any],
            ByteGray => &[ByteGray, AnyByte, Any],
        }
    }

    pub fn is_a(self, ancestor: SurfaceType) -> bool {
        self.lineage().contains(&ancestor)
    }

    pub fn for_model(model: ColorModel) -> Self {
        match model {
            ColorModel::IntArgb => Self::IntArgb,
            ColorModel::IntArgbPre => Self::IntArgbPre,
            ColorModel::IntRgb => Self::IntRgb,
            ColorModel::ByteGray => Self::ByteGray,
        }
    }
}

/// Compositing rule classification used to key rendering kernels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompositeType {
    Any,
    AnyAlpha,
    Xor,
    General,
    Clear,
    Src,
    SrcNoEa,
    SrcOver,
    SrcOverNoEa,
    /// Source-over with a source known to be opaque; behaves as a plain copy.
    OpaqueSrcOverNoEa,
    SrcIn,
    SrcOut,
    SrcAtop,
    Dst,
    DstOver,
    DstIn,
    DstOut,
    DstAtop,
    AlphaXor,
}

impl CompositeType {
    pub fn lineage(self) -> &'static [CompositeType] {
        use CompositeType::*;
        match self {
            Any => &[Any],
            AnyAlpha => &[AnyAlpha, Any],
            Xor => &[Xor, Any],
            General => &[General, Any],
            Src => &[Src, AnyAlpha, Any],
            SrcNoEa => &[SrcNoEa, Src, AnyAlpha, Any],
            SrcOver => &[SrcOver, AnyAlpha, Any],
            SrcOverNoEa => &[SrcOverNoEa, SrcOver, AnyAlpha, Any],
            OpaqueSrcOverNoEa => &[
                OpaqueSrcOverNoEa,
                SrcNoEa,
                Src,
                SrcOverNoEa,
                SrcOver,
                AnyAlpha,
                Any,
            ],
            Clear => &[Clear, AnyAlpha, Any],
            SrcIn => &[SrcIn, AnyAlpha, Any],
            SrcOut => &[SrcOut, AnyAlpha, Any],
            SrcAtop => &[SrcAtop, AnyAlpha, Any],
            Dst => &[Dst, AnyAlpha, Any],
            DstOver => &[DstOver, AnyAlpha, Any],
            DstIn => &[DstIn, AnyAlpha, Any],
            DstOut => &[DstOut, AnyAlpha, Any],
            DstAtop => &[DstAtop, AnyAlpha, Any],
            AlphaXor => &[AlphaXor, AnyAlpha, Any],
        }
    }

    pub fn is_a(self, ancestor: CompositeType) -> bool {
        self.lineage().contains(&ancestor)
    }
}

/// Rendering primitive a kernel implements.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimitiveKind {
    FillSpans,
    FillRect,
    DrawLine,
    FillParallelogram,
    MaskFill,
    DrawGlyphList,
    DrawGlyphListAa,
    DrawGlyphListLcd,
    Blit,
    TransformBlit,
}

/// Full lookup key for a rendering kernel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct LoopKey {
    pub prim: PrimitiveKind,
    pub src: SurfaceType,
    pub comp: CompositeType,
    pub dst: SurfaceType,
}

#[cfg(test)]
#[path = "../../tests/unit/render/types.rs"]
mod tests;
