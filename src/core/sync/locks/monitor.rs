/*!
 * Object Monitor
 *
 * Reentrant monitor in the style of per-object synchronized blocks:
 * an owner thread plus a recursion depth, with waiters parked on a condvar.
 */

use parking_lot::{Condvar, Mutex};
use std::marker::PhantomData;
use std::thread::{self, ThreadId};

#[derive(Debug, Default)]
struct MonitorState {
    owner: Option<ThreadId>,
    depth: usize,
}

/// Reentrant monitor
///
/// The owning thread may enter again; each `MonitorGuard` exits one level.
pub struct Monitor {
    state: Mutex<MonitorState>,
    available: Condvar,
}

impl Monitor {
    /// Create an unowned monitor
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MonitorState::default()),
            available: Condvar::new(),
        }
    }

    /// Enter the monitor, blocking while another thread owns it
    pub fn enter(&self) -> MonitorGuard<'_> {
        let me = thread::current().id();
        let mut state = self.state.lock();

        loop {
            match state.owner {
                None => {
                    state.owner = Some(me);
                    state.depth = 1;
                    break;
                }
                Some(owner) if owner == me => {
                    state.depth += 1;
                    break;
                }
                Some(_) => self.available.wait(&mut state),
            }
        }

        MonitorGuard {
            monitor: self,
            _not_send: PhantomData,
        }
    }

    /// Enter the monitor only if that does not require waiting
    pub fn try_enter(&self) -> Option<MonitorGuard<'_>> {
        let me = thread::current().id();
        let mut state = self.state.lock();

        match state.owner {
            None => {
                state.owner = Some(me);
                state.depth = 1;
            }
            Some(owner) if owner == me => state.depth += 1,
            Some(_) => return None,
        }

        Some(MonitorGuard {
            monitor: self,
            _not_send: PhantomData,
        })
    }

    /// Recursion depth held by the current owner (0 when unowned)
    pub fn depth(&self) -> usize {
        self.state.lock().depth
    }

    /// Whether the calling thread owns the monitor
    pub fn is_owned_by_current_thread(&self) -> bool {
        self.state.lock().owner == Some(thread::current().id())
    }

    fn exit(&self) {
        let mut state = self.state.lock();
        debug_assert_eq!(state.owner, Some(thread::current().id()));

        state.depth -= 1;
        if state.depth == 0 {
            state.owner = None;
            drop(state);
            self.available.notify_one();
        }
    }
}

impl Default for Monitor {
    fn default() -> Self {
        Self::new()
    }
}

/// One level of monitor ownership; exits on drop
///
/// Not `Send`: the level must be exited by the thread that entered it.
#[must_use = "the monitor is exited as soon as the guard is dropped"]
pub struct MonitorGuard<'a> {
    monitor: &'a Monitor,
    _not_send: PhantomData<*const ()>,
}

impl Drop for MonitorGuard<'_> {
    fn drop(&mut self) {
        self.monitor.exit();
    }
}
