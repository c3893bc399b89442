use super::*;
use crate::foundation::core::ColorModel;
use crate::surface::BufferedSurface;

#[test]
fn alpha_composite_rejects_alpha_outside_unit_range() {
    assert!(AlphaComposite::new(Rule::SrcOver, 0.5).is_ok());
    assert!(AlphaComposite::new(Rule::SrcOver, 1.5).is_err());
    assert!(AlphaComposite::new(Rule::Src, -0.1).is_err());
}

#[test]
fn full_extra_alpha_selects_no_ea_forms() {
    assert_eq!(AlphaComposite::SRC_OVER.composite_type(), CompositeType::SrcOverNoEa);
    assert_eq!(AlphaComposite::SRC.composite_type(), CompositeType::SrcNoEa);
    let half = AlphaComposite::new(Rule::SrcOver, 0.5).unwrap();
    assert_eq!(half.composite_type(), CompositeType::SrcOver);
    let xor = AlphaComposite::new(Rule::Xor, 1.0).unwrap();
    assert_eq!(xor.composite_type(), CompositeType::AlphaXor);
}

#[test]
fn xor_composite_resolves_pixel_for_destination() {
    let s = BufferedSurface::new(1, 1, ColorModel::IntRgb);
    let x = XorComposite::new(Color::rgb(1, 2, 3), &*s);
    assert_eq!(x.xor_pixel, 0x0001_0203);
    assert_eq!(x.alpha_mask, ColorModel::IntRgb.alpha_mask());
}

#[test]
fn paint_classification_follows_variant() {
    assert_eq!(Paint::Color(Color::BLACK).state(), PaintState::OpaqueColor);
    assert_eq!(Paint::Color(Color(0x80ff_0000)).state(), PaintState::AlphaColor);
    let g = GradientPaint {
        p1: Point::new(0.0, 0.0),
        c1: Color::BLACK,
        p2: Point::new(10.0, 0.0),
        c2: Color::WHITE,
        cyclic: false,
    };
    assert_eq!(Paint::Gradient(g.clone()).state(), PaintState::Gradient);
    assert_eq!(Paint::Gradient(g).transparency(), Transparency::Opaque);
}

#[test]
fn two_point_gradient_interpolates_and_cycles() {
    let g = GradientPaint {
        p1: Point::new(0.0, 0.0),
        c1: Color(0xff00_0000),
        p2: Point::new(10.0, 0.0),
        c2: Color(0xff00_00ff),
        cyclic: true,
    };
    let p = Paint::Gradient(g);
    assert_eq!(p.argb_at(Point::new(0.0, 5.0)), 0xff00_0000);
    assert_eq!(p.argb_at(Point::new(10.0, 0.0)), 0xff00_00ff);
    // reflected on the way back
    assert_eq!(p.argb_at(Point::new(20.0, 0.0)), 0xff00_0000);
}

#[test]
fn multi_stop_gradient_clamps_outside_stops() {
    let stops = vec![
        GradientStop {
            offset: 0.25,
            color: Color(0xffff_0000),
        },
        GradientStop {
            offset: 0.75,
            color: Color(0xff00_00ff),
        },
    ];
    let p = Paint::LinearGradient(LinearGradient {
        start: Point::new(0.0, 0.0),
        end: Point::new(100.0, 0.0),
        stops,
    });
    assert_eq!(p.argb_at(Point::new(0.0, 0.0)), 0xffff_0000);
    assert_eq!(p.argb_at(Point::new(100.0, 0.0)), 0xff00_00ff);
    assert_eq!(p.transparency(), Transparency::Opaque);
}

#[test]
fn texture_tiles_across_anchor() {
    let image = Arc::new(SourceImage {
        origin_x: 0,
        origin_y: 0,
        width: 2,
        height: 1,
        argb: vec![0xff11_1111, 0xff22_2222],
    });
    let p = Paint::Texture(TexturePaint {
        image,
        anchor: Rect::new(0.0, 0.0, 4.0, 4.0),
    });
    assert_eq!(p.argb_at(Point::new(1.0, 1.0)), 0xff11_1111);
    assert_eq!(p.argb_at(Point::new(3.0, 1.0)), 0xff22_2222);
    assert_eq!(p.argb_at(Point::new(5.0, 9.0)), 0xff11_1111);
}

#[test]
fn transform_classification() {
    assert_eq!(classify_transform(Affine::IDENTITY), (TransformState::Identity, 0, 0));
    assert_eq!(
        classify_transform(Affine::translate((3.0, -2.0))),
        (TransformState::IntTranslate, 3, -2)
    );
    assert_eq!(
        classify_transform(Affine::translate((0.5, 0.0))).0,
        TransformState::AnyTranslate
    );
    assert_eq!(
        classify_transform(Affine::scale(2.0)).0,
        TransformState::TranslateScale
    );
    assert_eq!(
        classify_transform(Affine::scale_non_uniform(-1.0, 1.0)).0,
        TransformState::Generic
    );
    assert_eq!(classify_transform(Affine::rotate(0.3)).0, TransformState::Generic);
}

#[test]
fn stroke_classification_depends_on_device_width() {
    let one = kurbo::Stroke::new(1.0);
    let two = kurbo::Stroke::new(2.0);
    let dashed = kurbo::Stroke::new(1.0).with_dashes(0.0, [2.0, 2.0]);
    let id = Affine::IDENTITY;
    let c = |s: &kurbo::Stroke, t: Affine, aa: bool| {
        classify_basic_stroke(s, t, classify_transform(t).0, aa, 0.125)
    };
    assert_eq!(c(&one, id, false), StrokeState::Thin);
    assert_eq!(c(&dashed, id, false), StrokeState::ThinDashed);
    assert_eq!(c(&two, id, false), StrokeState::Wide);
    assert_eq!(c(&one, Affine::scale(2.0), false), StrokeState::Wide);
    assert_eq!(c(&two, Affine::scale(0.5), false), StrokeState::Thin);
    assert_eq!(c(&one, id, true), StrokeState::Wide);
}

#[test]
fn max_stretch_of_rotation_is_one() {
    let s = max_stretch_squared(Affine::rotate(0.7));
    assert!((s - 1.0).abs() < 1e-9);
    assert!((max_stretch_squared(Affine::scale_non_uniform(3.0, 1.0)) - 9.0).abs() < 1e-9);
}

#[test]
fn axis_aligned_clip_rects_stay_rects() {
    let r = ClipShape::Rect(Rect::new(0.0, 0.0, 10.0, 10.0));
    assert_eq!(
        r.transformed(Affine::translate((5.0, 5.0))),
        ClipShape::Rect(Rect::new(5.0, 5.0, 15.0, 15.0))
    );
    assert!(matches!(r.transformed(Affine::rotate(0.5)), ClipShape::Path(_)));
}

#[test]
fn custom_paints_compare_by_identity() {
    #[derive(Debug)]
    struct Flat;
    impl CustomPaint for Flat {
        fn argb_at(&self, _p: Point) -> u32 {
            0xff00_ff00
        }
    }
    let a: Arc<dyn CustomPaint> = Arc::new(Flat);
    let b: Arc<dyn CustomPaint> = Arc::new(Flat);
    assert_eq!(Paint::Custom(Arc::clone(&a)), Paint::Custom(Arc::clone(&a)));
    assert_ne!(Paint::Custom(a), Paint::Custom(b));
}
