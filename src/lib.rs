/*!
 * Guarded Values
 * A value behind a lock whose strategy is picked at construction time
 */

pub mod core;
pub mod monitoring;

// Re-exports
pub use crate::core::errors::{GuardedError, GuardedResult};
pub use crate::core::sync::{
    live_lock_handles, Capabilities, Concurrent, ConcurrentSliceExt, FallbackPolicy, GuardConfig,
    GuardedValue, LockStrategy, Resolution,
};
pub use monitoring::init_tracing;
