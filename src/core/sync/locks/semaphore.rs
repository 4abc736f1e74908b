/*!
 * Counting Semaphore
 *
 * Condvar-based semaphore built on parking_lot
 */

use parking_lot::{Condvar, Mutex};

/// Counting semaphore
///
/// With a single permit it behaves as a non-reentrant mutual exclusion lock.
pub struct Semaphore {
    permits: Mutex<usize>,
    available: Condvar,
    capacity: usize,
}

impl Semaphore {
    /// Create a semaphore holding `permits` permits
    pub fn new(permits: usize) -> Self {
        Self {
            permits: Mutex::new(permits),
            available: Condvar::new(),
            capacity: permits,
        }
    }

    /// Take a permit, blocking until one is available
    pub fn acquire(&self) -> Permit<'_> {
        let mut permits = self.permits.lock();
        while *permits == 0 {
            self.available.wait(&mut permits);
        }
        *permits -= 1;
        Permit { semaphore: self }
    }

    /// Take a permit if one is available right now
    pub fn try_acquire(&self) -> Option<Permit<'_>> {
        let mut permits = self.permits.lock();
        if *permits == 0 {
            return None;
        }
        *permits -= 1;
        Some(Permit { semaphore: self })
    }

    /// Permits not currently held
    pub fn available_permits(&self) -> usize {
        *self.permits.lock()
    }

    /// Permits the semaphore was created with
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn release(&self) {
        let mut permits = self.permits.lock();
        *permits += 1;
        drop(permits);
        self.available.notify_one();
    }
}

/// RAII permit; returned to the semaphore on drop
#[must_use = "the permit is returned as soon as it is dropped"]
pub struct Permit<'a> {
    semaphore: &'a Semaphore,
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        self.semaphore.release();
    }
}
