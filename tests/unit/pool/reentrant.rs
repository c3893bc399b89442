use super::*;
use std::sync::Arc;

#[derive(Debug, Default)]
struct Scratch {
    id: u64,
    buf: Vec<u8>,
}

impl ReentrantContext for Scratch {
    fn reset(&mut self) {
        self.buf.clear();
    }
}

fn pool(strategy: PoolStrategy, strength: RefStrength) -> ReentrantContextPool<Scratch> {
    let next = AtomicU64::new(0);
    ReentrantContextPool::new(strategy, strength, move || Scratch {
        id: next.fetch_add(1, Ordering::Relaxed),
        buf: Vec::new(),
    })
}

#[test]
fn nested_acquisitions_get_distinct_instances() {
    let p = pool(PoolStrategy::ThreadLocal, RefStrength::Hard);
    let a = p.acquire();
    let b = p.acquire();
    let c = p.acquire();
    assert_eq!(a.usage(), Usage::ThreadLocal);
    assert_eq!(b.usage(), Usage::Queue);
    assert_ne!(a.id, b.id);
    assert_ne!(b.id, c.id);
    assert_ne!(a.id, c.id);
}

#[test]
fn released_instances_return_to_their_origin() {
    let p = pool(PoolStrategy::ThreadLocal, RefStrength::Hard);
    let (primary, nested) = {
        let a = p.acquire();
        let b = p.acquire();
        (a.id, b.id)
    };
    assert_eq!(p.queued(), 1);

    let a = p.acquire();
    assert_eq!(a.id, primary);
    let b = p.acquire();
    assert_eq!(b.id, nested);
    assert_eq!(p.stats().created, 2);
    assert_eq!(p.stats().reused, 2);
}

#[test]
fn reset_runs_before_parking() {
    let p = pool(PoolStrategy::Queue, RefStrength::Hard);
    {
        let mut a = p.acquire();
        a.buf.extend_from_slice(b"dirty");
    }
    assert!(p.acquire().buf.is_empty());
}

#[test]
fn memory_pressure_respects_strength() {
    let hard = pool(PoolStrategy::Queue, RefStrength::Hard);
    drop(hard.acquire());
    hard.on_memory_pressure(MemoryPressure::Critical);
    drop(hard.acquire());
    assert_eq!(hard.stats().created, 1);

    let soft = pool(PoolStrategy::Queue, RefStrength::Soft);
    drop(soft.acquire());
    soft.on_memory_pressure(MemoryPressure::Moderate);
    drop(soft.acquire());
    assert_eq!(soft.stats().created, 1);
    soft.on_memory_pressure(MemoryPressure::Critical);
    drop(soft.acquire());
    assert_eq!(soft.stats().created, 2);
    assert_eq!(soft.stats().evicted, 1);

    let weak = pool(PoolStrategy::ThreadLocal, RefStrength::Weak);
    drop(weak.acquire());
    weak.on_memory_pressure(MemoryPressure::Moderate);
    drop(weak.acquire());
    assert_eq!(weak.stats().created, 2);
}

#[test]
fn threads_never_share_an_in_use_instance() {
    let p = Arc::new(pool(PoolStrategy::ThreadLocal, RefStrength::Hard));
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let p = Arc::clone(&p);
            std::thread::spawn(move || {
                let mut seen = Vec::new();
                for _ in 0..50 {
                    let a = p.acquire();
                    let b = p.acquire();
                    assert_ne!(a.id, b.id);
                    seen.push(a.id);
                }
                seen
            })
        })
        .collect();
    for h in handles {
        let seen = h.join().unwrap();
        assert!(seen.windows(2).all(|w| w[0] == w[1]));
    }
}
