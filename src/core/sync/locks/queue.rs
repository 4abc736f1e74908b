/*!
 * Serial Queue
 *
 * Serializes callers by circulating a single token through a bounded
 * channel. Whoever holds the token is inside the critical section.
 */

use flume::{Receiver, Sender, TryRecvError};

/// Token-passing serial queue
///
/// Blocked callers park inside `flume` until the token comes back, so the
/// queue never spins.
pub struct SerialQueue {
    tx: Sender<()>,
    rx: Receiver<()>,
}

impl SerialQueue {
    /// Create an idle queue
    pub fn new() -> Self {
        let (tx, rx) = flume::bounded(1);
        // Capacity is 1 and the channel is empty, so the token always fits
        let _ = tx.try_send(());
        Self { tx, rx }
    }

    /// Wait for the token
    pub fn enter(&self) -> QueueTicket<'_> {
        match self.rx.recv() {
            Ok(()) => QueueTicket { queue: self },
            // The queue owns a sender, so the channel cannot disconnect
            Err(_) => unreachable!("serial queue channel disconnected"),
        }
    }

    /// Take the token if nobody holds it
    pub fn try_enter(&self) -> Option<QueueTicket<'_>> {
        match self.rx.try_recv() {
            Ok(()) => Some(QueueTicket { queue: self }),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Whether the token is out
    pub fn is_busy(&self) -> bool {
        self.rx.is_empty()
    }
}

impl Default for SerialQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Holding a ticket means holding the queue; dropping it hands the token on
#[must_use = "the queue is released as soon as the ticket is dropped"]
pub struct QueueTicket<'a> {
    queue: &'a SerialQueue,
}

impl Drop for QueueTicket<'_> {
    fn drop(&mut self) {
        let returned = self.queue.tx.try_send(());
        debug_assert!(returned.is_ok(), "serial queue token duplicated");
    }
}
