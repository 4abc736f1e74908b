/*!
 * Guarded Value Integration Tests
 *
 * Mutual exclusion, read consistency and increment races across every
 * lock strategy
 */

use guarded::{Concurrent, GuardedValue, LockStrategy};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

fn increment_race(strategy: LockStrategy, threads: usize, per_thread: usize) -> u64 {
    let counter = Arc::new(GuardedValue::new(0u64, strategy));
    let barrier = Arc::new(Barrier::new(threads));

    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let counter = counter.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                for _ in 0..per_thread {
                    counter.atomically(|n| *n += 1);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    counter.value()
}

#[test]
fn test_spin_thousand_threads() {
    let counter = Arc::new(GuardedValue::new(0, LockStrategy::Spin));

    let handles: Vec<_> = (0..1000)
        .map(|_| {
            let counter = counter.clone();
            thread::spawn(move || counter.atomically(|n| *n += 1))
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(counter.value(), 1000);
}

#[test]
fn test_one_increment_per_thread_every_strategy() {
    for strategy in LockStrategy::ALL {
        assert_eq!(increment_race(strategy, 64, 1), 64, "strategy {strategy}");
    }
}

#[test]
fn test_contended_increments_every_strategy() {
    for strategy in LockStrategy::ALL {
        assert_eq!(increment_race(strategy, 8, 2_000), 16_000, "strategy {strategy}");
    }
}

#[test]
fn test_initial_value_every_strategy() {
    for strategy in LockStrategy::ALL {
        let guarded = GuardedValue::new((7u8, "seven"), strategy);
        assert_eq!(guarded.value(), (7, "seven"));
    }
}

/// A transform moves units between two accounts; readers must always see
/// the total preserved.
#[test]
fn test_no_dirty_reads_every_strategy() {
    const TOTAL: i64 = 1_000;

    for strategy in LockStrategy::ALL {
        let accounts = Arc::new(GuardedValue::new((TOTAL, 0i64), strategy));
        let done = Arc::new(AtomicBool::new(false));

        let writers: Vec<_> = (0..4)
            .map(|w| {
                let accounts = accounts.clone();
                thread::spawn(move || {
                    for i in 0..500 {
                        let amount = (i % 7 + w) as i64;
                        accounts.atomically(|(a, b)| {
                            *a -= amount;
                            thread::yield_now();
                            *b += amount;
                        });
                    }
                })
            })
            .collect();

        let readers: Vec<_> = (0..2)
            .map(|_| {
                let accounts = accounts.clone();
                let done = done.clone();
                thread::spawn(move || {
                    let mut observed = 0usize;
                    while !done.load(Ordering::Acquire) {
                        let (a, b) = accounts.value();
                        assert_eq!(a + b, TOTAL, "torn read");
                        observed += 1;
                    }
                    observed
                })
            })
            .collect();

        for writer in writers {
            writer.join().unwrap();
        }
        done.store(true, Ordering::Release);
        for reader in readers {
            reader.join().unwrap();
        }

        let (a, b) = accounts.value();
        assert_eq!(a + b, TOTAL, "strategy {strategy}");
    }
}

#[test]
fn test_transforms_do_not_interleave() {
    for strategy in LockStrategy::ALL {
        let log = Arc::new(GuardedValue::new(Vec::<(usize, bool)>::new(), strategy));

        let handles: Vec<_> = (0..6)
            .map(|id| {
                let log = log.clone();
                thread::spawn(move || {
                    for _ in 0..50 {
                        log.atomically(|entries| {
                            entries.push((id, true));
                            thread::yield_now();
                            entries.push((id, false));
                        });
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let entries = log.value();
        assert_eq!(entries.len(), 6 * 50 * 2);
        for pair in entries.chunks(2) {
            assert_eq!(pair[0].0, pair[1].0, "strategy {strategy}: interleaved transform");
            assert!(pair[0].1 && !pair[1].1);
        }
    }
}

#[test]
fn test_shared_reads_run_together_under_read_write() {
    let guarded = Arc::new(GuardedValue::new(5, LockStrategy::ReadWrite));
    let barrier = Arc::new(Barrier::new(2));

    // Both readers must be inside `read` at once to pass the barrier
    let handles: Vec<_> = (0..2)
        .map(|_| {
            let guarded = guarded.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                guarded.read(|v| {
                    barrier.wait();
                    *v
                })
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), 5);
    }
}

#[test]
fn test_reentrant_strategies_allow_nested_reads() {
    for strategy in LockStrategy::ALL.into_iter().filter(|s| s.is_reentrant()) {
        let guarded = GuardedValue::new(vec![1, 2], strategy);
        let total = guarded.read(|outer| outer.len() + guarded.read(|inner| inner.len()));
        assert_eq!(total, 4);
    }
}

#[test]
fn test_update_result_escapes_lock() {
    let guarded = GuardedValue::new(10u32, LockStrategy::Monitor);
    let previous = guarded.update(|n| {
        let before = *n;
        *n *= 3;
        before
    });
    assert_eq!(previous, 10);
    assert_eq!(guarded.value(), 30);
}

#[test]
fn test_generic_over_concurrent() {
    fn drain<C: Concurrent<Value = Vec<u8>>>(c: &C) -> Vec<u8> {
        let mut out = Vec::new();
        c.atomically(|v| out = std::mem::take(v));
        out
    }

    let guarded = GuardedValue::new(vec![1, 2, 3], LockStrategy::Queue);
    assert_eq!(drain(&guarded), vec![1, 2, 3]);
    assert!(guarded.value().is_empty());
}

fn any_lock_strategy() -> impl Strategy<Value = LockStrategy> {
    prop::sample::select(LockStrategy::ALL.to_vec())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// Concurrent commutative transforms end where any sequential order would
    #[test]
    fn prop_concurrent_adds_match_sequential(
        strategy in any_lock_strategy(),
        initial in -1_000i64..1_000,
        batches in prop::collection::vec(prop::collection::vec(-50i64..50, 0..40), 1..6),
    ) {
        let guarded = Arc::new(GuardedValue::new(initial, strategy));

        let handles: Vec<_> = batches
            .clone()
            .into_iter()
            .map(|batch| {
                let guarded = guarded.clone();
                thread::spawn(move || {
                    for delta in batch {
                        guarded.atomically(|n| *n += delta);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let expected = initial + batches.iter().flatten().sum::<i64>();
        prop_assert_eq!(guarded.value(), expected);
    }

    /// Appends from every thread all land, each thread's in its own order
    #[test]
    fn prop_appends_preserve_per_thread_order(
        strategy in any_lock_strategy(),
        threads in 1usize..5,
        per_thread in 1usize..30,
    ) {
        let guarded = Arc::new(GuardedValue::new(Vec::new(), strategy));

        let handles: Vec<_> = (0..threads)
            .map(|t| {
                let guarded = guarded.clone();
                thread::spawn(move || {
                    for i in 0..per_thread {
                        guarded.atomically(|v| v.push((t, i)));
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let entries = guarded.value();
        prop_assert_eq!(entries.len(), threads * per_thread);
        for t in 0..threads {
            let seen: Vec<usize> = entries.iter().filter(|(id, _)| *id == t).map(|(_, i)| *i).collect();
            prop_assert_eq!(seen, (0..per_thread).collect::<Vec<_>>());
        }
    }
}
