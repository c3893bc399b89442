use super::*;

#[test]
fn overlapping_spans_collapse() {
    let mut s = Spans::new();
    s.add(5.0, 10.0);
    s.add(0.0, 3.0);
    s.add(2.0, 6.0);
    s.add(20.0, 25.0);
    assert_eq!(
        s.spans().unwrap(),
        &[Span::new(0.0, 10.0), Span::new(20.0, 25.0)]
    );
}

#[test]
fn adjacent_spans_stay_separate() {
    let mut s = Spans::new();
    s.add(0.0, 3.0);
    s.add(3.0, 5.0);
    assert_eq!(s.spans().unwrap().len(), 2);
    assert!(s.intersects(2.5, 3.5));
    assert!(!s.intersects(5.0, 9.0));
}

#[test]
fn intersects_uses_half_open_bounds() {
    let mut s = Spans::new();
    s.add(10.0, 20.0);
    assert!(s.intersects(19.0, 30.0));
    assert!(!s.intersects(20.0, 30.0));
    assert!(!s.intersects(0.0, 10.0));
    assert!(s.intersects(0.0, 10.5));
}

#[test]
fn eager_collapse_after_many_adds() {
    let mut s = Spans::new();
    for i in 0..MAX_ADDS_SINCE_SORT {
        s.add(i as f64, i as f64 + 2.0);
    }
    assert_eq!(s.adds_since_sort, 0);
    assert_eq!(s.spans.as_ref().unwrap().len(), 1);
}

#[test]
fn infinite_mode_absorbs_everything() {
    let mut s = Spans::new();
    s.add(0.0, 1.0);
    s.add_infinite();
    s.add(5.0, 6.0);
    assert!(s.is_infinite());
    assert!(s.intersects(-1e9, -1e9 + 1.0));
    assert!(s.spans().is_none());
}
