use super::*;

fn source() -> SharedSurface {
    let s = BufferedSurface::new(4, 4, ColorModel::IntArgb);
    s.clear_to(0x80ff_0000);
    s
}

fn converting(threshold: u32) -> SurfaceDataProxy {
    SurfaceDataProxy::new(Arc::new(ConvertingProxy::new(ColorModel::IntRgb)), threshold)
}

fn draw(proxy: &SurfaceDataProxy, src: &SharedSurface) -> SharedSurface {
    proxy.replace_data(src, ImageOp::Blit, CompositeType::SrcOverNoEa, None)
}

#[test]
fn uncached_proxy_passes_source_through() {
    let src = source();
    let proxy = SurfaceDataProxy::uncached();
    assert!(!proxy.is_caching());
    assert!(Arc::ptr_eq(&draw(&proxy, &src), &src));
}

#[test]
fn cache_builds_after_threshold_and_is_reused() {
    let src = source();
    let proxy = converting(2);
    assert!(Arc::ptr_eq(&draw(&proxy, &src), &src));
    assert!(Arc::ptr_eq(&draw(&proxy, &src), &src));
    let cached = draw(&proxy, &src);
    assert!(!Arc::ptr_eq(&cached, &src));
    assert_eq!(cached.color_model(), ColorModel::IntRgb);
    assert!(Arc::ptr_eq(&draw(&proxy, &src), &cached));
}

#[test]
fn source_change_restarts_hysteresis() {
    let src = source();
    let proxy = converting(1);
    draw(&proxy, &src);
    let cached = draw(&proxy, &src);
    assert!(!Arc::ptr_eq(&cached, &src));

    src.mark_dirty();
    assert!(Arc::ptr_eq(&draw(&proxy, &src), &src));
    let rebuilt = draw(&proxy, &src);
    assert!(!Arc::ptr_eq(&rebuilt, &src));
    assert!(Arc::ptr_eq(&rebuilt, &cached), "same-size cache surface is reused");
}

#[test]
fn untrackable_source_disables_proxy() {
    let src = source();
    src.core().delegate().set_untrackable().unwrap();
    let proxy = converting(0);
    assert!(Arc::ptr_eq(&draw(&proxy, &src), &src));
    assert!(!proxy.is_valid());
    assert!(Arc::ptr_eq(&draw(&proxy, &src), &src));
}

#[test]
fn untrackable_after_caching_flushes_the_copy() {
    let src = source();
    let proxy = converting(0);
    let cached = draw(&proxy, &src);
    assert!(!Arc::ptr_eq(&cached, &src));

    src.core().delegate().set_untrackable().unwrap();
    assert!(Arc::ptr_eq(&draw(&proxy, &src), &src));
    assert!(!proxy.is_valid());
    assert!(proxy.cached().is_none());
    assert!(!cached.is_valid());
    for _ in 0..4 {
        assert!(Arc::ptr_eq(&draw(&proxy, &src), &src));
    }
}

#[test]
fn display_change_rebuilds_the_copy() {
    let src = source();
    let proxy = converting(1);
    draw(&proxy, &src);
    let before = draw(&proxy, &src);
    assert!(!Arc::ptr_eq(&before, &src));

    proxy.display_changed();
    assert!(proxy.cached().is_none());
    assert!(!before.is_valid());
    assert!(proxy.is_valid());

    let after = draw(&proxy, &src);
    assert!(!Arc::ptr_eq(&after, &src));
    assert!(!Arc::ptr_eq(&after, &before));
    assert!(after.is_valid());
    assert!(Arc::ptr_eq(&proxy.cached().unwrap(), &after));
}

#[test]
fn flush_all_lets_every_proxy_rebuild() {
    let src = source();
    let cache = ProxyCache::new();
    let proxy = cache.get_or_insert_with(SurfaceType::IntRgb, || converting(0));
    let first = draw(&proxy, &src);
    cache.flush_all();
    assert!(proxy.cached().is_none());
    let second = draw(&proxy, &src);
    assert!(!Arc::ptr_eq(&second, &src));
    assert!(!Arc::ptr_eq(&second, &first));
}

#[test]
fn palette_change_restarts_the_countdown() {
    let src = source();
    let proxy = converting(2);
    for _ in 0..2 {
        draw(&proxy, &src);
    }
    let cached = draw(&proxy, &src);
    assert!(!Arc::ptr_eq(&cached, &src));

    proxy.palette_changed();
    assert!(Arc::ptr_eq(&draw(&proxy, &src), &src));
    assert!(Arc::ptr_eq(&draw(&proxy, &src), &src));
    let resynced = draw(&proxy, &src);
    assert!(!Arc::ptr_eq(&resynced, &src));
    assert!(resynced.is_valid());
}

#[test]
fn background_on_translucent_source_is_unsupported() {
    let src = source();
    let proxy = converting(0);
    let out = proxy.replace_data(
        &src,
        ImageOp::Blit,
        CompositeType::SrcOverNoEa,
        Some(Color::WHITE),
    );
    assert!(Arc::ptr_eq(&out, &src));
    assert!(proxy.cached().is_none());
}

#[test]
fn flush_with_deacceleration_invalidates() {
    let src = source();
    let proxy = converting(0);
    draw(&proxy, &src);
    assert!(proxy.cached().is_some());
    assert!(!proxy.flush_with(false));
    assert!(proxy.cached().is_none());
    assert!(proxy.flush_with(true));
}

#[test]
fn proxy_cache_keys_by_destination_type() {
    let cache = ProxyCache::new();
    let a = cache.get_or_insert_with(SurfaceType::IntRgb, || converting(1));
    let b = cache.get_or_insert_with(SurfaceType::IntRgb, SurfaceDataProxy::uncached);
    assert!(Arc::ptr_eq(&a, &b));
    assert!(b.is_caching());
    assert_eq!(cache.len(), 1);
}
