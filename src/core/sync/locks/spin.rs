/*!
 * Spin Lock
 *
 * Test-and-test-and-set lock for very short critical sections.
 * Busy-polls for a bounded number of iterations, then yields between polls.
 */

use crate::core::sync::config::DEFAULT_MAX_SPINS;
use std::hint;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

/// Spin lock with bounded busy-waiting
///
/// # Performance
///
/// - Uncontended acquire is a single CAS
/// - Waiters poll a shared load (no cache-line ping-pong while held)
/// - After `max_spins` polls, waiters yield to the scheduler
///
/// # Use Cases
///
/// Best when:
/// - Critical sections are a handful of instructions
/// - Contention is low
/// - The holder is never descheduled while holding the lock
#[repr(C, align(64))] // Cache-line aligned to prevent false sharing
pub struct SpinLock {
    locked: AtomicBool,
    max_spins: u32,
}

impl SpinLock {
    /// Create an unlocked spin lock
    pub const fn new(max_spins: u32) -> Self {
        Self {
            locked: AtomicBool::new(false),
            max_spins,
        }
    }

    /// Acquire the lock, spinning until it is available
    #[inline]
    pub fn lock(&self) -> SpinGuard<'_> {
        while self
            .locked
            .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            self.wait_unlocked();
        }
        SpinGuard { lock: self }
    }

    /// Acquire the lock if it is free
    #[inline]
    pub fn try_lock(&self) -> Option<SpinGuard<'_>> {
        self.locked
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|_| SpinGuard { lock: self })
    }

    /// Whether the lock is currently held (diagnostics only)
    #[inline]
    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Relaxed)
    }

    /// Poll until the lock looks free
    fn wait_unlocked(&self) {
        let mut spin_count = 0u32;

        while self.locked.load(Ordering::Relaxed) {
            if spin_count < self.max_spins {
                hint::spin_loop();
                spin_count += 1;
            } else {
                thread::yield_now();
            }
        }
    }
}

impl Default for SpinLock {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SPINS)
    }
}

impl std::fmt::Debug for SpinLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpinLock")
            .field("locked", &self.is_locked())
            .field("max_spins", &self.max_spins)
            .finish()
    }
}

/// RAII guard; releases the spin lock on drop
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct SpinGuard<'a> {
    lock: &'a SpinLock,
}

impl Drop for SpinGuard<'_> {
    #[inline]
    fn drop(&mut self) {
        self.lock.locked.store(false, Ordering::Release);
    }
}
