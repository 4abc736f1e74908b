/*!
 * Guarded Value
 *
 * A single value behind a lock whose strategy is chosen at construction.
 * Reads copy the value out under the lock; transforms run with exclusive
 * access. Every strategy gives the same observable semantics and differs
 * only in cost, fairness and reentrancy.
 */

use super::config::{FallbackPolicy, GuardConfig, LockStrategy, Resolution};
use super::locks::LockHandle;
use super::traits::Concurrent;
use crate::core::errors::{GuardedError, GuardedResult};
use std::cell::UnsafeCell;
use std::fmt;
use std::sync::atomic::{AtomicIsize, Ordering};
use tracing::{trace, warn};

const UNBORROWED: isize = 0;
const WRITING: isize = -1;

/// Borrow bookkeeping for the stored value
///
/// Only consulted under the reentrant strategies, where the thread that
/// holds the lock can re-enter it. There every access is still serialized
/// by the lock, so the counter never bounces between cores. Overlap panics
/// instead of handing out aliasing references.
struct BorrowState(AtomicIsize);

impl BorrowState {
    const fn new() -> Self {
        Self(AtomicIsize::new(UNBORROWED))
    }

    fn begin_read(&self) -> BorrowRelease<'_> {
        let mut current = self.0.load(Ordering::Acquire);
        loop {
            if current == WRITING {
                panic!("guarded value read while a transform of it is in progress on this thread");
            }
            match self.0.compare_exchange_weak(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return BorrowRelease { state: self, writing: false },
                Err(actual) => current = actual,
            }
        }
    }

    fn begin_write(&self) -> BorrowRelease<'_> {
        if self
            .0
            .compare_exchange(UNBORROWED, WRITING, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            panic!("guarded value transformed while it is already borrowed on this thread");
        }
        BorrowRelease { state: self, writing: true }
    }
}

struct BorrowRelease<'a> {
    state: &'a BorrowState,
    writing: bool,
}

impl Drop for BorrowRelease<'_> {
    fn drop(&mut self) {
        if self.writing {
            self.state.0.store(UNBORROWED, Ordering::Release);
        } else {
            self.state.0.fetch_sub(1, Ordering::AcqRel);
        }
    }
}

/// A value whose every access is serialized through a configurable lock
///
/// # Reentrancy
///
/// Calling back into the same instance from inside `atomically` (or `read`)
/// blocks forever unless the strategy is reentrant (`Recursive`,
/// `Monitor`). With a reentrant strategy the lock is re-acquired, and a
/// nested access that would overlap a transform panics.
///
/// # Panics in transforms
///
/// The lock is released while unwinding. Whatever the transform wrote
/// before panicking stays in place.
///
/// # Thread safety
///
/// `GuardedValue<V>` is `Sync` only when `V: Send + Sync`, whatever the
/// strategy. `ReadWrite` lets several threads hold `&V` at once, and the
/// bound cannot depend on a strategy picked at runtime. Values that are
/// `Send` but not `Sync` (`Cell<_>`, `mpsc::Receiver<_>`) therefore cannot
/// be shared across threads through a `GuardedValue`, even under an
/// exclusive strategy.
///
/// # Examples
///
/// ```
/// use guarded::{GuardedValue, LockStrategy};
///
/// let counter = GuardedValue::new(0u64, LockStrategy::Spin);
/// counter.atomically(|n| *n += 1);
/// assert_eq!(counter.value(), 1);
/// ```
pub struct GuardedValue<V> {
    lock: LockHandle,
    reentrant: bool,
    borrow: BorrowState,
    value: UnsafeCell<V>,
}

// SAFETY: all access to `value` goes through `lock`. Exclusive strategies
// hand out one reference at a time; `ReadWrite` hands out shared references
// to several threads at once, hence `V: Sync`.
unsafe impl<V: Send + Sync> Sync for GuardedValue<V> {}

impl<V> GuardedValue<V> {
    /// Create a guarded value
    ///
    /// An unsupported strategy is replaced by the default fallback (`Spin`)
    /// and a warning is logged.
    pub fn new(value: V, strategy: LockStrategy) -> Self {
        Self::with_config(value, &GuardConfig::new(strategy))
    }

    /// Create a guarded value from a configuration, substituting if needed
    ///
    /// Never fails; `config.fallback` is only honored by `try_with_config`.
    pub fn with_config(value: V, config: &GuardConfig) -> Self {
        let strategy = match config.resolve() {
            Resolution::Native(strategy) => strategy,
            Resolution::Substituted { requested, actual } => {
                warn!(
                    requested = %requested,
                    substitute = %actual,
                    "Lock strategy unsupported on this platform, substituting"
                );
                actual
            }
        };

        Self::build(value, strategy, config.max_spins)
    }

    /// Create a guarded value, honoring the configured fallback policy
    pub fn try_with_config(value: V, config: &GuardConfig) -> GuardedResult<Self> {
        config.validate()?;

        match (config.resolve(), config.fallback) {
            (Resolution::Substituted { requested, .. }, FallbackPolicy::Reject) => {
                Err(GuardedError::UnsupportedStrategy { requested })
            }
            _ => Ok(Self::with_config(value, config)),
        }
    }

    /// Create a guarded value configured from the environment
    pub fn from_env(value: V) -> GuardedResult<Self> {
        let config = GuardConfig::from_env()?;
        Self::try_with_config(value, &config)
    }

    fn build(value: V, strategy: LockStrategy, max_spins: u32) -> Self {
        trace!(strategy = %strategy, "Guarded value created");
        Self {
            lock: LockHandle::new(strategy, max_spins),
            reentrant: strategy.is_reentrant(),
            borrow: BorrowState::new(),
            value: UnsafeCell::new(value),
        }
    }

    /// Strategy in effect (after any fallback substitution)
    pub fn strategy(&self) -> LockStrategy {
        self.lock.strategy()
    }

    /// Run `f` with shared access to the value
    ///
    /// Concurrent readers only run in parallel under `ReadWrite`.
    #[inline]
    pub fn read<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&V) -> R,
    {
        let _held = self.lock.read();
        // Non-reentrant strategies cannot overlap a write on this thread,
        // and shared readers under `ReadWrite` skip the shared counter
        let _borrow = self.reentrant.then(|| self.borrow.begin_read());
        // SAFETY: the read lock is held and no write borrow is active
        f(unsafe { &*self.value.get() })
    }

    /// Apply `transform` with exclusive access to the value
    #[inline]
    pub fn atomically<F>(&self, transform: F)
    where
        F: FnOnce(&mut V),
    {
        self.update(transform)
    }

    /// Apply `f` with exclusive access and return its result
    #[inline]
    pub fn update<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&mut V) -> R,
    {
        let _held = self.lock.write();
        let _borrow = self.reentrant.then(|| self.borrow.begin_write());
        // SAFETY: the write lock is held and no other borrow is active
        f(unsafe { &mut *self.value.get() })
    }

    /// Store `value`, returning the previous one
    pub fn replace(&self, value: V) -> V {
        self.update(|current| std::mem::replace(current, value))
    }

    /// Mutable access without locking; `&mut self` already proves exclusivity
    pub fn get_mut(&mut self) -> &mut V {
        self.value.get_mut()
    }

    /// Consume the guard and return the value
    pub fn into_inner(self) -> V {
        self.value.into_inner()
    }
}

impl<V: Clone> GuardedValue<V> {
    /// Copy of the current value
    #[inline]
    pub fn value(&self) -> V {
        self.read(V::clone)
    }
}

impl<V: Clone> Concurrent for GuardedValue<V> {
    type Value = V;

    fn value(&self) -> V {
        GuardedValue::value(self)
    }

    fn atomically<F>(&self, transform: F)
    where
        F: FnOnce(&mut V),
    {
        GuardedValue::atomically(self, transform)
    }
}

impl<V: Default> Default for GuardedValue<V> {
    fn default() -> Self {
        Self::new(V::default(), LockStrategy::default())
    }
}

impl<V> From<V> for GuardedValue<V> {
    fn from(value: V) -> Self {
        Self::new(value, LockStrategy::default())
    }
}

impl<V: fmt::Debug> fmt::Debug for GuardedValue<V> {
    // Takes the read lock; same reentrancy rules as `read`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.read(|value| {
            f.debug_struct("GuardedValue")
                .field("strategy", &self.strategy())
                .field("value", value)
                .finish()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::sync::config::Capabilities;
    use std::io;
    use std::panic::{self, AssertUnwindSafe};
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct CapturedLog(Arc<Mutex<Vec<u8>>>);

    impl CapturedLog {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl io::Write for CapturedLog {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn capture_logs<F: FnOnce()>(f: F) -> String {
        let log = CapturedLog::default();
        let writer = log.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::WARN)
            .finish();

        tracing::subscriber::with_default(subscriber, f);
        log.contents()
    }

    #[test]
    fn test_initial_value_every_strategy() {
        for strategy in LockStrategy::ALL {
            let guarded = GuardedValue::new(String::from("ents"), strategy);
            assert_eq!(guarded.value(), "ents");
            assert_eq!(guarded.strategy(), strategy);
        }
    }

    #[test]
    fn test_update_returns_result() {
        let guarded = GuardedValue::new(vec![1, 2, 3], LockStrategy::Mutex);
        let len = guarded.update(|v| {
            v.push(4);
            v.len()
        });
        assert_eq!(len, 4);
        assert_eq!(guarded.read(|v| v.iter().sum::<i32>()), 10);
    }

    #[test]
    fn test_replace_and_into_inner() {
        let guarded = GuardedValue::new(1, LockStrategy::Queue);
        assert_eq!(guarded.replace(2), 1);
        assert_eq!(guarded.into_inner(), 2);
    }

    #[test]
    fn test_get_mut() {
        let mut guarded = GuardedValue::new(5, LockStrategy::Semaphore);
        *guarded.get_mut() += 1;
        assert_eq!(guarded.value(), 6);
    }

    #[test]
    fn test_unfair_falls_back_without_fast_lock() {
        let config = GuardConfig::new(LockStrategy::Unfair)
            .with_capabilities(Capabilities { fast_lock: false });

        let guarded = GuardedValue::with_config(7, &config);
        assert_eq!(guarded.strategy(), LockStrategy::Spin);
        assert_eq!(guarded.value(), 7);
    }

    #[test]
    fn test_fallback_logs_warning() {
        let config = GuardConfig::new(LockStrategy::Unfair)
            .with_capabilities(Capabilities { fast_lock: false });

        let output = capture_logs(|| {
            let guarded = GuardedValue::with_config(0, &config);
            assert_eq!(guarded.strategy(), LockStrategy::Spin);
        });

        let line = output
            .lines()
            .find(|line| line.contains("substituting"))
            .expect("fallback warning logged");
        assert!(line.contains("WARN"), "{line}");
        assert!(line.contains("requested=unfair substitute=spin"), "{line}");
    }

    #[test]
    fn test_native_strategy_logs_no_warning() {
        let config = GuardConfig::new(LockStrategy::Unfair)
            .with_capabilities(Capabilities { fast_lock: true });

        let output = capture_logs(|| {
            let guarded = GuardedValue::with_config(0, &config);
            assert_eq!(guarded.strategy(), LockStrategy::Unfair);
            let _ = GuardedValue::new(0, LockStrategy::Spin);
        });

        assert!(!output.contains("substituting"), "{output}");
    }

    #[test]
    fn test_borrow_tracking_only_for_reentrant_strategies() {
        for strategy in LockStrategy::ALL {
            let guarded = GuardedValue::new(0, strategy);
            let depth = guarded.read(|_| guarded.borrow.0.load(Ordering::Relaxed));
            let expected = if strategy.is_reentrant() { 1 } else { UNBORROWED };
            assert_eq!(depth, expected, "strategy {strategy}");
        }
    }

    #[test]
    fn test_strict_config_rejects_unsupported() {
        let config = GuardConfig::new(LockStrategy::Unfair)
            .with_capabilities(Capabilities { fast_lock: false })
            .strict();

        let result = GuardedValue::try_with_config(0, &config);
        assert!(matches!(
            result,
            Err(GuardedError::UnsupportedStrategy {
                requested: LockStrategy::Unfair
            })
        ));
    }

    #[test]
    fn test_strict_config_accepts_supported() {
        let config = GuardConfig::new(LockStrategy::ReadWrite).strict();
        let guarded = GuardedValue::try_with_config(0, &config).unwrap();
        assert_eq!(guarded.strategy(), LockStrategy::ReadWrite);
    }

    #[test]
    fn test_panicking_transform_releases_lock() {
        for strategy in LockStrategy::ALL {
            let guarded = GuardedValue::new(0, strategy);

            let result = panic::catch_unwind(AssertUnwindSafe(|| {
                guarded.atomically(|n| {
                    *n = 1;
                    panic!("transform failed");
                });
            }));
            assert!(result.is_err());

            // Lock and borrow state were both released
            guarded.atomically(|n| *n += 1);
            assert_eq!(guarded.value(), 2, "strategy {strategy}");
        }
    }

    #[test]
    fn test_nested_read_under_reentrant_strategy() {
        for strategy in [LockStrategy::Recursive, LockStrategy::Monitor] {
            let guarded = GuardedValue::new(3, strategy);
            let sum = guarded.read(|outer| outer + guarded.value());
            assert_eq!(sum, 6);
        }
    }

    #[test]
    fn test_nested_transform_panics_under_reentrant_strategy() {
        for strategy in [LockStrategy::Recursive, LockStrategy::Monitor] {
            let guarded = GuardedValue::new(0, strategy);

            let result = panic::catch_unwind(AssertUnwindSafe(|| {
                guarded.atomically(|_| guarded.atomically(|n| *n += 1));
            }));
            assert!(result.is_err());

            let result = panic::catch_unwind(AssertUnwindSafe(|| {
                guarded.atomically(|_| {
                    let _ = guarded.value();
                });
            }));
            assert!(result.is_err());

            // Still usable afterwards
            guarded.atomically(|n| *n = 9);
            assert_eq!(guarded.value(), 9);
        }
    }

    #[test]
    fn test_concurrent_trait() {
        fn bump<C: Concurrent<Value = u32>>(c: &C) -> u32 {
            c.atomically(|n| *n += 1);
            c.value()
        }

        let guarded = GuardedValue::new(41u32, LockStrategy::Exclusive);
        assert_eq!(bump(&guarded), 42);
    }

    #[test]
    fn test_debug_format() {
        let guarded = GuardedValue::new(3, LockStrategy::Spin);
        assert_eq!(
            format!("{:?}", guarded),
            "GuardedValue { strategy: Spin, value: 3 }"
        );
    }

    #[test]
    fn test_default_and_from() {
        let guarded: GuardedValue<u8> = GuardedValue::default();
        assert_eq!(guarded.value(), 0);
        assert_eq!(guarded.strategy(), GuardConfig::default().resolve().strategy());

        let guarded = GuardedValue::from("x");
        assert_eq!(guarded.value(), "x");
    }
}
