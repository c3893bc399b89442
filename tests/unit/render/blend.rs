use super::*;

#[test]
fn src_over_with_opaque_source_replaces() {
    assert_eq!(
        composite_argb(CompositeType::SrcOver, 0xff11_2233, 0xffff_ffff, 255),
        0xff11_2233
    );
}

#[test]
fn src_over_half_alpha_mixes() {
    let out = composite_argb(CompositeType::SrcOver, 0x80ff_0000, 0xff00_00ff, 255);
    assert_eq!(out >> 24, 0xff);
    let r = (out >> 16) & 0xff;
    let b = out & 0xff;
    assert!((127..=129).contains(&r), "r={r}");
    assert!((126..=128).contains(&b), "b={b}");
}

#[test]
fn clear_and_dst_rules() {
    assert_eq!(
        composite_argb(CompositeType::Clear, 0xffff_ffff, 0xff12_3456, 255),
        0
    );
    assert_eq!(
        composite_argb(CompositeType::Dst, 0xffff_ffff, 0xff12_3456, 255),
        0xff12_3456
    );
}

#[test]
fn zero_coverage_keeps_destination() {
    assert_eq!(
        composite_argb(CompositeType::Src, 0xffff_ffff, 0xff12_3456, 0),
        0xff12_3456
    );
}

#[test]
fn scale_alpha_rounds() {
    assert_eq!(scale_alpha(0xff00_ff00, 0.5), 0x8000_ff00);
    assert_eq!(scale_alpha(0xff00_ff00, 1.0), 0xff00_ff00);
}
