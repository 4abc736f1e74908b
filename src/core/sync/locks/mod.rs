/*!
 * Lock Primitives
 *
 * The locks a guarded value can be backed by:
 * - Spin lock (bounded busy-wait, then yield)
 * - Serial queue (token passing over a bounded channel)
 * - Counting semaphore
 * - Reentrant object monitor
 * - parking_lot / std locks for the remaining strategies
 */

mod handle;
mod monitor;
mod queue;
mod semaphore;
mod spin;

// Re-export public API
pub use handle::live_lock_handles;
pub use monitor::{Monitor, MonitorGuard};
pub use queue::{QueueTicket, SerialQueue};
pub use semaphore::{Permit, Semaphore};
pub use spin::{SpinGuard, SpinLock};

pub(crate) use handle::LockHandle;
