/*!
 * Synchronization Primitives
 *
 * Guarded values with a lock strategy chosen at construction:
 * - Spin, unfair, fair and OS mutexes for plain mutual exclusion
 * - Recursive lock and object monitor when reentry is needed
 * - Reader-writer lock for read-heavy values
 * - Serial queue and semaphore for token-style serialization
 *
 * # Architecture
 *
 * `GuardedValue` owns its value and a `LockHandle`, a tagged variant over
 * the strategies. The strategy is resolved against platform capabilities
 * once, at construction; unsupported strategies fall back according to
 * `FallbackPolicy`.
 *
 * # Guarantees
 *
 * - Transforms never interleave on the same instance
 * - Reads never observe a partially applied transform
 * - Locks are released on every exit path, panics included
 * - No fairness guarantee across waiting threads
 */

mod config;
mod guarded;
pub mod locks;
mod parallel;
mod traits;

pub use config::{
    Capabilities, FallbackPolicy, GuardConfig, LockStrategy, Resolution, DEFAULT_MAX_SPINS,
    FALLBACK_ENV, MAX_SPINS_ENV, STRATEGY_ENV,
};
pub use guarded::GuardedValue;
pub use locks::live_lock_handles;
pub use parallel::ConcurrentSliceExt;
pub use traits::Concurrent;
