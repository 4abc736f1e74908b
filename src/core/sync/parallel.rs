/*!
 * Parallel Slice Helpers
 *
 * Order-preserving concurrent map / flat-map / compact-map. Workers pull
 * indices from a shared cursor, compute outside the lock, and publish each
 * result into a guarded slot table using the caller's lock strategy.
 */

use super::config::LockStrategy;
use super::guarded::GuardedValue;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

/// Number of workers for `len` items
fn worker_count(len: usize) -> usize {
    let cpus = thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1);
    cpus.min(len).max(1)
}

/// Compute `f` for every item in parallel, results in input order
fn collect_in_order<T, R, F>(items: &[T], strategy: LockStrategy, f: F) -> Vec<R>
where
    T: Sync,
    R: Send + Sync,
    F: Fn(&T) -> R + Sync,
{
    if items.is_empty() {
        return Vec::new();
    }

    let slots: GuardedValue<Vec<Option<R>>> =
        GuardedValue::new(items.iter().map(|_| None).collect(), strategy);
    let cursor = AtomicUsize::new(0);

    thread::scope(|scope| {
        for _ in 0..worker_count(items.len()) {
            scope.spawn(|| loop {
                let index = cursor.fetch_add(1, Ordering::Relaxed);
                let Some(item) = items.get(index) else {
                    break;
                };
                let result = f(item);
                slots.atomically(|slots| slots[index] = Some(result));
            });
        }
    });

    // Every index below len was claimed by exactly one worker
    slots.into_inner().into_iter().flatten().collect()
}

/// Concurrent counterparts of `map`, `flat_map` and `filter_map`
///
/// `strategy` selects the lock that serializes result publication.
pub trait ConcurrentSliceExt<T: Sync> {
    /// Parallel `map`; output order matches input order
    fn concurrent_map<R, F>(&self, strategy: LockStrategy, f: F) -> Vec<R>
    where
        R: Send + Sync,
        F: Fn(&T) -> R + Sync;

    /// Parallel `flat_map`; output order matches input order
    fn concurrent_flat_map<R, I, F>(&self, strategy: LockStrategy, f: F) -> Vec<R>
    where
        R: Send + Sync,
        I: IntoIterator<Item = R>,
        F: Fn(&T) -> I + Sync;

    /// Parallel `filter_map`; output order matches input order
    fn concurrent_compact_map<R, F>(&self, strategy: LockStrategy, f: F) -> Vec<R>
    where
        R: Send + Sync,
        F: Fn(&T) -> Option<R> + Sync;
}

impl<T: Sync> ConcurrentSliceExt<T> for [T] {
    fn concurrent_map<R, F>(&self, strategy: LockStrategy, f: F) -> Vec<R>
    where
        R: Send + Sync,
        F: Fn(&T) -> R + Sync,
    {
        collect_in_order(self, strategy, f)
    }

    fn concurrent_flat_map<R, I, F>(&self, strategy: LockStrategy, f: F) -> Vec<R>
    where
        R: Send + Sync,
        I: IntoIterator<Item = R>,
        F: Fn(&T) -> I + Sync,
    {
        collect_in_order(self, strategy, |item| f(item).into_iter().collect::<Vec<R>>())
            .into_iter()
            .flatten()
            .collect()
    }

    fn concurrent_compact_map<R, F>(&self, strategy: LockStrategy, f: F) -> Vec<R>
    where
        R: Send + Sync,
        F: Fn(&T) -> Option<R> + Sync,
    {
        collect_in_order(self, strategy, f)
            .into_iter()
            .flatten()
            .collect()
    }
}
