use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::runtime::Handle;
use tracing::trace;

use crate::task::Task;

/// Async work that can be deferred without blocking the worker thread.
///
/// Wrap an instance in [`Spawn`] to schedule it: when the job comes due the
/// worker hands the future to a tokio runtime and moves on to the next job.
///
/// # Example
///
/// ```rust
/// use deferred_runtime::{Runnable, Scheduler, Spawn};
/// use std::future::Future;
/// use std::pin::Pin;
/// use std::sync::Arc;
///
/// struct Heartbeat {
///     name: String,
/// }
///
/// impl Runnable for Heartbeat {
///     fn run(&self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
///         Box::pin(async move {
///             println!("heartbeat from {}", self.name);
///         })
///     }
/// }
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let runtime = tokio::runtime::Runtime::new()?;
/// let scheduler = Scheduler::new(runtime.handle().clone());
/// let heartbeat = Arc::new(Heartbeat { name: "api".to_string() });
/// scheduler.schedule_in(Spawn::new(heartbeat), 10)?;
/// # Ok(())
/// # }
/// ```
pub trait Runnable: Send + Sync {
    /// Execute the deferred work
    fn run(&self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>>;
}

/// Contexts that carry a tokio runtime for [`Spawn`] tasks.
pub trait RuntimeContext {
    fn runtime(&self) -> &Handle;
}

impl RuntimeContext for Handle {
    fn runtime(&self) -> &Handle {
        self
    }
}

impl<C: RuntimeContext + ?Sized> RuntimeContext for Arc<C> {
    fn runtime(&self) -> &Handle {
        (**self).runtime()
    }
}

/// Task that spawns a [`Runnable`] onto the context's tokio runtime.
pub struct Spawn<R: ?Sized> {
    instance: Arc<R>,
}

impl<R: Runnable + ?Sized + 'static> Spawn<R> {
    pub fn new(instance: Arc<R>) -> Self {
        Self { instance }
    }
}

impl<R: ?Sized> Clone for Spawn<R> {
    fn clone(&self) -> Self {
        Self {
            instance: Arc::clone(&self.instance),
        }
    }
}

impl<R, C> Task<C> for Spawn<R>
where
    R: Runnable + ?Sized + 'static,
    C: RuntimeContext,
{
    fn run(self, ctx: &C, scheduled_at: i64) {
        trace!(
            scheduled_at,
            runnable = std::any::type_name::<R>(),
            "Spawning runnable onto tokio runtime"
        );
        let instance = self.instance;
        ctx.runtime().spawn(async move {
            instance.run().await;
        });
    }
}
