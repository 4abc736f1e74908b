/*!
 * Lock Handle
 *
 * Tagged variant over every lock strategy. Each variant owns its lock
 * object; acquisition dispatches through a `match`, so the set of
 * strategies is closed and checked exhaustively.
 */

use super::monitor::{Monitor, MonitorGuard};
use super::queue::{QueueTicket, SerialQueue};
use super::semaphore::{Permit, Semaphore};
use super::spin::{SpinGuard, SpinLock};
use crate::core::sync::config::LockStrategy;
use parking_lot::{
    FairMutex, FairMutexGuard, ReentrantMutex, ReentrantMutexGuard, RwLock, RwLockReadGuard,
    RwLockWriteGuard,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::PoisonError;

/// Lock handles currently alive in this process
static LIVE_HANDLES: AtomicUsize = AtomicUsize::new(0);

/// Number of lock handles currently alive
///
/// Every guarded value owns exactly one handle, so a create/drop cycle
/// that leaves this unchanged released its lock resource.
pub fn live_lock_handles() -> usize {
    LIVE_HANDLES.load(Ordering::Acquire)
}

/// Lock object for one strategy
pub(crate) enum LockHandle {
    Spin(SpinLock),
    Unfair(parking_lot::Mutex<()>),
    Monitor(Monitor),
    Mutex(std::sync::Mutex<()>),
    Exclusive(FairMutex<()>),
    Recursive(ReentrantMutex<()>),
    ReadWrite(RwLock<()>),
    Queue(SerialQueue),
    Semaphore(Semaphore),
}

/// A held acquisition; releasing happens when this is dropped
#[allow(dead_code)] // guards are held only for their Drop
pub(crate) enum Held<'a> {
    Spin(SpinGuard<'a>),
    Unfair(parking_lot::MutexGuard<'a, ()>),
    Monitor(MonitorGuard<'a>),
    Mutex(std::sync::MutexGuard<'a, ()>),
    Exclusive(FairMutexGuard<'a, ()>),
    Recursive(ReentrantMutexGuard<'a, ()>),
    Read(RwLockReadGuard<'a, ()>),
    Write(RwLockWriteGuard<'a, ()>),
    Queue(QueueTicket<'a>),
    Semaphore(Permit<'a>),
}

impl LockHandle {
    /// Create the lock object for `strategy`
    pub(crate) fn new(strategy: LockStrategy, max_spins: u32) -> Self {
        let handle = match strategy {
            LockStrategy::Spin => Self::Spin(SpinLock::new(max_spins)),
            LockStrategy::Unfair => Self::Unfair(parking_lot::Mutex::new(())),
            LockStrategy::Monitor => Self::Monitor(Monitor::new()),
            LockStrategy::Mutex => Self::Mutex(std::sync::Mutex::new(())),
            LockStrategy::Exclusive => Self::Exclusive(FairMutex::new(())),
            LockStrategy::Recursive => Self::Recursive(ReentrantMutex::new(())),
            LockStrategy::ReadWrite => Self::ReadWrite(RwLock::new(())),
            LockStrategy::Queue => Self::Queue(SerialQueue::new()),
            LockStrategy::Semaphore => Self::Semaphore(Semaphore::new(1)),
        };

        LIVE_HANDLES.fetch_add(1, Ordering::AcqRel);
        handle
    }

    /// Strategy this handle implements
    pub(crate) fn strategy(&self) -> LockStrategy {
        match self {
            Self::Spin(_) => LockStrategy::Spin,
            Self::Unfair(_) => LockStrategy::Unfair,
            Self::Monitor(_) => LockStrategy::Monitor,
            Self::Mutex(_) => LockStrategy::Mutex,
            Self::Exclusive(_) => LockStrategy::Exclusive,
            Self::Recursive(_) => LockStrategy::Recursive,
            Self::ReadWrite(_) => LockStrategy::ReadWrite,
            Self::Queue(_) => LockStrategy::Queue,
            Self::Semaphore(_) => LockStrategy::Semaphore,
        }
    }

    /// Acquire for reading
    ///
    /// Shared only for `ReadWrite`; every other strategy is exclusive.
    #[inline]
    pub(crate) fn read(&self) -> Held<'_> {
        match self {
            Self::ReadWrite(lock) => Held::Read(lock.read()),
            _ => self.write(),
        }
    }

    /// Acquire exclusively
    #[inline]
    pub(crate) fn write(&self) -> Held<'_> {
        match self {
            Self::Spin(lock) => Held::Spin(lock.lock()),
            // Fast path first, then park
            Self::Unfair(lock) => Held::Unfair(lock.try_lock().unwrap_or_else(|| lock.lock())),
            Self::Monitor(monitor) => Held::Monitor(monitor.enter()),
            // A panicking transform poisons the mutex; the value stays usable
            Self::Mutex(lock) => Held::Mutex(lock.lock().unwrap_or_else(PoisonError::into_inner)),
            Self::Exclusive(lock) => Held::Exclusive(lock.lock()),
            Self::Recursive(lock) => Held::Recursive(lock.lock()),
            Self::ReadWrite(lock) => Held::Write(lock.write()),
            Self::Queue(queue) => Held::Queue(queue.enter()),
            Self::Semaphore(semaphore) => Held::Semaphore(semaphore.acquire()),
        }
    }
}

impl Drop for LockHandle {
    fn drop(&mut self) {
        LIVE_HANDLES.fetch_sub(1, Ordering::AcqRel);
    }
}

impl std::fmt::Debug for LockHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("LockHandle").field(&self.strategy()).finish()
    }
}
