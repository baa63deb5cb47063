/// Work that can be deferred on a [`Scheduler`](crate::Scheduler).
///
/// `run` consumes the task: a job is popped from the queue exactly once and
/// never re-inserted. `ctx` is the value the scheduler was built with, shared
/// by every invocation; `scheduled_at` is the job's due time in milliseconds
/// since the Unix epoch, not the time it actually started.
///
/// Several kinds of task can share one scheduler through an enum with
/// `#[derive(Task)]`, or through boxed closures, which implement `Task`
/// via the blanket impl below.
///
/// # Example
///
/// ```rust
/// use deferred_runtime::Task;
/// use std::sync::atomic::{AtomicUsize, Ordering};
///
/// struct Increment;
///
/// impl Task<AtomicUsize> for Increment {
///     fn run(self, ctx: &AtomicUsize, _scheduled_at: i64) {
///         ctx.fetch_add(1, Ordering::SeqCst);
///     }
/// }
///
/// # fn main() {
/// let counter = AtomicUsize::new(0);
/// Increment.run(&counter, 0);
/// assert_eq!(counter.load(Ordering::SeqCst), 1);
/// # }
/// ```
pub trait Task<C>: Send + 'static {
    /// Execute the task on the worker thread
    fn run(self, ctx: &C, scheduled_at: i64);
}

impl<C, F> Task<C> for F
where
    F: FnOnce(&C, i64) + Send + 'static,
{
    fn run(self, ctx: &C, scheduled_at: i64) {
        self(ctx, scheduled_at)
    }
}

/// A type-erased closure task, for schedulers that accept arbitrary work.
pub type BoxedTask<C> = Box<dyn FnOnce(&C, i64) + Send + 'static>;
