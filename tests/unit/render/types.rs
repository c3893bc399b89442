use super::*;

#[test]
fn lineages_start_with_self_and_end_with_any() {
    for t in [
        SurfaceType::OpaqueColor,
        SurfaceType::IntArgbPre,
        SurfaceType::ByteGray,
        SurfaceType::TexturePaint,
    ] {
        assert_eq!(t.lineage()[0], t);
        assert_eq!(*t.lineage().last().unwrap(), SurfaceType::Any);
    }
    for c in [CompositeType::OpaqueSrcOverNoEa, CompositeType::Xor, CompositeType::Clear] {
        assert_eq!(c.lineage()[0], c);
        assert_eq!(*c.lineage().last().unwrap(), CompositeType::Any);
    }
}

#[test]
fn opaque_source_over_matches_copy_kernels() {
    assert!(CompositeType::OpaqueSrcOverNoEa.is_a(CompositeType::SrcNoEa));
    assert!(CompositeType::OpaqueSrcOverNoEa.is_a(CompositeType::SrcOver));
    assert!(!CompositeType::SrcOverNoEa.is_a(CompositeType::SrcNoEa));
    assert!(!CompositeType::Xor.is_a(CompositeType::AnyAlpha));
}

#[test]
fn surface_types_follow_color_models() {
    assert_eq!(
        SurfaceType::for_model(ColorModel::IntRgb),
        SurfaceType::IntRgb
    );
    assert!(SurfaceType::IntRgb.is_a(SurfaceType::AnyInt));
    assert!(SurfaceType::OpaqueColor.is_a(SurfaceType::AnyPaint));
}
