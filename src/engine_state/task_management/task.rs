//! # Task System Core Traits
//!
//! ## Task Lifecycle
//! 1. A `Task` is created and scheduled via `TaskManager::publish_task()`
//! 2. The task's `process()` method is called on a worker thread
//! 3. The task returns a boxed `TaskResult`
//! 4. The result's `handle_result()` is called on the owning thread with the
//!    manager's context
//!
//! ## Thread Safety
//! - `Task` must be `Send` to be transferred between threads
//! - `TaskResult` must be `Send` to be transferred back to the owning thread
//! - Tasks own their input, they never borrow shared state

/// A unit of work that can be executed on a worker thread.
///
/// Tasks should be self-contained: they own every piece of data they need, so
/// a worker never has to lock anything while processing.
pub trait Task<C>: Send {
    /// Processes the task and returns a result. Runs on a worker thread, or
    /// inline when the manager has no workers.
    fn process(self: Box<Self>) -> Box<dyn TaskResult<C> + Send>;
}

/// The result of processing a `Task`, applied on the thread that owns the
/// `TaskManager`.
///
/// Keep `handle_result` short: it usually runs while holding a lock on
/// shared state.
pub trait TaskResult<C>: Send {
    fn handle_result(self: Box<Self>, context: &mut C);
}
