use super::*;
use kurbo::Shape;

fn area() -> Region {
    Region::rect(IntRect::new(0, 0, 32, 32))
}

#[test]
fn axis_aligned_rect_rasterizes_to_rectangular_region() {
    let r = ScanlineRasterizer::default();
    let path = kurbo::Rect::new(2.0, 3.0, 10.0, 7.0).to_path(0.1);
    let region = r.rasterize(&path, &area());
    assert!(region.is_rectangular());
    assert_eq!(region.bounds(), IntRect::new(2, 3, 8, 4));
}

#[test]
fn triangle_is_not_rectangular() {
    let r = ScanlineRasterizer::default();
    let mut path = BezPath::new();
    path.move_to((0.0, 0.0));
    path.line_to((16.0, 16.0));
    path.line_to((0.0, 16.0));
    path.close_path();
    let region = r.rasterize(&path, &area());
    assert!(!region.is_rectangular());
    assert!(region.contains(1, 10));
    assert!(!region.contains(14, 2));
}

#[test]
fn output_is_clipped_to_area() {
    let r = ScanlineRasterizer::default();
    let path = kurbo::Circle::new((16.0, 16.0), 40.0).to_path(0.1);
    let region = r.rasterize(&path, &Region::rect(IntRect::new(4, 4, 8, 8)));
    assert!(region.is_rectangular());
    assert_eq!(region.bounds(), IntRect::new(4, 4, 8, 8));
}

#[test]
fn nonzero_winding_fills_overlaps_once() {
    let r = ScanlineRasterizer::default();
    let mut path = kurbo::Rect::new(0.0, 0.0, 8.0, 8.0).to_path(0.1);
    path.extend(kurbo::Rect::new(4.0, 0.0, 12.0, 8.0).to_path(0.1));
    let region = r.rasterize(&path, &area());
    assert_eq!(region.bounds(), IntRect::new(0, 0, 12, 8));
    assert!(region.is_rectangular());
}

#[test]
fn scratch_returns_to_pool_after_use() {
    let r = ScanlineRasterizer::default();
    let path = kurbo::Rect::new(0.0, 0.0, 4.0, 4.0).to_path(0.1);
    r.rasterize(&path, &area());
    r.rasterize(&path, &area());
    assert_eq!(r.scratch_pool().stats().created, 1);
}

#[test]
fn coverage_levels_grade_partial_edges() {
    let path = kurbo::Rect::new(0.5, 0.5, 4.5, 4.5).to_path(0.1);
    let levels = coverage_levels(&path, IntRect::new(0, 0, 16, 16));
    let by_cov: Vec<(u8, i32)> = levels
        .iter()
        .map(|(cov, region)| {
            let mut n = 0;
            region.for_each_span(|_, x0, x1| n += x1 - x0);
            (*cov, n)
        })
        .collect();
    assert_eq!(by_cov, vec![(63, 4), (127, 12), (255, 9)]);
    let full = &levels[2].1;
    assert_eq!(full.bounds(), IntRect::new(1, 1, 3, 3));
}

#[test]
fn coverage_levels_outside_limit_are_empty() {
    let path = kurbo::Rect::new(20.0, 20.0, 24.0, 24.0).to_path(0.1);
    assert!(coverage_levels(&path, IntRect::new(0, 0, 16, 16)).is_empty());
}
