//! Explicit interception of the write path.
//!
//! A store runs every [`WriteMessage`] through its registered middlewares in
//! registration order. Each middleware decides what to do around the write
//! and calls [`Next::run`] to hand the message to the rest of the chain;
//! the innermost step applies the message to the store.

use crate::error::StoreResult;
use crate::message::WriteMessage;

/// A layer in the store's write path.
///
/// `handle` runs synchronously on the writer's thread, so implementations
/// must not block; anything slow belongs in a task scheduled from here.
pub trait WriteMiddleware: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Handle one write. Implementations are expected to call `next.run`
    /// exactly once with the same message.
    fn handle(&self, message: &WriteMessage, next: Next<'_>) -> StoreResult<()>;
}

/// The remainder of the middleware chain.
pub struct Next<'a> {
    inner: &'a (dyn Fn(&WriteMessage) -> StoreResult<()> + 'a),
}

impl<'a> Next<'a> {
    pub fn new(inner: &'a (dyn Fn(&WriteMessage) -> StoreResult<()> + 'a)) -> Self {
        Self { inner }
    }

    /// Pass the message down the chain.
    pub fn run(self, message: &WriteMessage) -> StoreResult<()> {
        (self.inner)(message)
    }
}
