use super::*;
use std::sync::atomic::AtomicUsize;

struct Counting {
    hits: Arc<AtomicUsize>,
    inline: bool,
}

impl DisposerRecord for Counting {
    fn dispose(&mut self) {
        self.hits.fetch_add(1, Ordering::SeqCst);
    }

    fn poll_safe(&self) -> bool {
        self.inline
    }
}

fn record(hits: &Arc<AtomicUsize>, inline: bool) -> Counting {
    Counting {
        hits: Arc::clone(hits),
        inline,
    }
}

#[test]
fn poll_releases_safe_records_inline_and_defers_the_rest() {
    let d = Disposer::new(DisposerConfig::default());
    let hits = Arc::new(AtomicUsize::new(0));
    drop(d.register(record(&hits, true)));
    drop(d.register(record(&hits, false)));

    let stats = d.poll_removed();
    assert_eq!(stats.reclaimed, 2);
    assert_eq!(stats.disposed_inline, 1);
    assert_eq!(stats.deferred, 1);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert_eq!(d.pending_deferred(), 1);

    d.flush_deferred();
    assert_eq!(hits.load(Ordering::SeqCst), 2);
    assert_eq!(d.poll_removed(), PollStats::default());
}

#[test]
fn poll_is_bounded() {
    let d = Disposer::new(DisposerConfig {
        max_reclaimed_per_poll: 3,
        max_deferred_per_poll: 2,
    });
    let hits = Arc::new(AtomicUsize::new(0));
    for _ in 0..5 {
        drop(d.register(record(&hits, true)));
    }
    assert_eq!(d.poll_removed().reclaimed, 3);
    assert_eq!(d.poll_removed().reclaimed, 2);

    for _ in 0..5 {
        drop(d.register(record(&hits, false)));
    }
    assert_eq!(d.poll_removed().deferred, 2);
}

#[test]
fn background_thread_releases_each_record_once() {
    let d = Disposer::new(DisposerConfig::default());
    d.start().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    for i in 0..20 {
        drop(d.register(record(&hits, i % 2 == 0)));
    }
    d.poll_removed();
    d.shutdown();
    d.flush_deferred();
    while d.poll_removed().reclaimed > 0 {}
    d.flush_deferred();
    assert_eq!(hits.load(Ordering::SeqCst), 20);
    assert_eq!(d.disposed(), 20);
}

#[test]
fn native_records_call_their_routine() {
    static RELEASED: AtomicU64 = AtomicU64::new(0);
    fn release(token: u64) {
        RELEASED.fetch_add(token, Ordering::SeqCst);
    }
    let d = Disposer::new(DisposerConfig::default());
    drop(d.register(NativeRecord::new(release, 7).poll_safe()));
    d.poll_removed();
    assert_eq!(RELEASED.load(Ordering::SeqCst), 7);
}

#[test]
fn handles_outliving_the_disposer_release_inline() {
    let hits = Arc::new(AtomicUsize::new(0));
    let handle = {
        let d = Disposer::new(DisposerConfig::default());
        d.register(record(&hits, false))
    };
    drop(handle);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[test]
fn dropping_the_disposer_releases_queued_and_deferred_records() {
    let hits = Arc::new(AtomicUsize::new(0));
    {
        let d = Disposer::new(DisposerConfig::default());
        drop(d.register(record(&hits, false)));
        assert_eq!(d.poll_removed().deferred, 1);
        drop(d.register(record(&hits, false)));
        drop(d.register(record(&hits, true)));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }
    assert_eq!(hits.load(Ordering::SeqCst), 3);
}

#[test]
fn dropping_a_started_disposer_releases_everything_once() {
    let hits = Arc::new(AtomicUsize::new(0));
    {
        let d = Disposer::new(DisposerConfig::default());
        d.start().unwrap();
        for i in 0..10 {
            drop(d.register(record(&hits, i % 3 == 0)));
        }
    }
    assert_eq!(hits.load(Ordering::SeqCst), 10);
}
