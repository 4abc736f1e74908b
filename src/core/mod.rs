/*!
 * Core Module
 * Guarded values, lock strategies and error handling
 */

pub mod errors;
pub mod sync;

// Re-export for convenience
pub use errors::*;
pub use sync::{
    Capabilities, Concurrent, ConcurrentSliceExt, FallbackPolicy, GuardConfig, GuardedValue,
    LockStrategy,
};
