use super::*;

#[test]
fn color_accepts_hex_and_integer_forms() {
    let a: Color = serde_json::from_str("\"#ff0000\"").unwrap();
    let b: Color = serde_json::from_str("4294901760").unwrap();
    assert_eq!(a, Color::rgb(255, 0, 0));
    assert_eq!(a, b);
    assert_eq!(serde_json::to_string(&a).unwrap(), "\"#ffff0000\"");
    assert!(serde_json::from_str::<Color>("\"#fff\"").is_err());
}

#[test]
fn premultiplied_model_round_trips_opaque_and_clear() {
    let m = ColorModel::IntArgbPre;
    assert_eq!(m.pixel_for(0xff12_3456), 0xff12_3456);
    assert_eq!(m.rgb_for(m.pixel_for(0x00ab_cdef)), 0);
    assert_eq!(m.pixel_for(0x80ff_0000), 0x8080_0000);
}

#[test]
fn opaque_models_drop_alpha() {
    assert_eq!(ColorModel::IntRgb.pixel_for(0x10ab_cdef), 0x00ab_cdef);
    assert_eq!(ColorModel::IntRgb.rgb_for(0x00ab_cdef), 0xffab_cdef);
    assert_eq!(ColorModel::ByteGray.pixel_for(0xffff_ffff), 0xff);
    assert_eq!(ColorModel::ByteGray.rgb_for(0x80), 0xff80_8080);
    assert_eq!(ColorModel::IntRgb.transparency(), Transparency::Opaque);
}

#[test]
fn int_rect_intersection_clamps_to_empty() {
    let a = IntRect::new(0, 0, 10, 10);
    let b = IntRect::new(5, 5, 10, 10);
    assert_eq!(a.intersect(b), IntRect::new(5, 5, 5, 5));
    assert!(a.intersect(IntRect::new(20, 20, 2, 2)).is_empty());
}

#[test]
fn covering_selects_pixel_centers() {
    assert_eq!(
        IntRect::covering(Rect::new(0.4, 0.6, 2.5, 3.4)),
        IntRect::new(0, 1, 2, 2)
    );
    assert_eq!(clip_round(f64::NAN), 0);
}
