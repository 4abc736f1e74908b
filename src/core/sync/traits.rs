/*!
 * Concurrent Access Traits
 */

/// A value with serialized read and read-modify-write access
///
/// Implementations guarantee that `atomically` transforms never interleave
/// and that `value` never observes a partially applied transform.
pub trait Concurrent {
    /// Type of the protected value
    type Value;

    /// Snapshot of the current value
    fn value(&self) -> Self::Value;

    /// Apply `transform` with exclusive access to the value
    ///
    /// Any result has to leave through state captured by the closure.
    fn atomically<F>(&self, transform: F)
    where
        F: FnOnce(&mut Self::Value);
}
