use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, ThreadId};
use std::time::Duration;

use parking_lot::{Condvar, Mutex, MutexGuard};
use tracing::{debug, error, trace};

use crate::clock::now_ms;
use crate::config::PanicPolicy;
use crate::queue::{Job, JobQueue};
use crate::task::Task;

/// Everything guarded by the scheduler mutex.
pub(crate) struct State<T> {
    pub(crate) queue: JobQueue<T>,
    pub(crate) running: bool,
    /// Bumped by every successful `start()`; a worker only serves its own.
    pub(crate) generation: u64,
    /// The worker currently inside its loop, if any. At most one at a time.
    pub(crate) active: Option<ActiveWorker>,
}

/// Identity of the worker thread that holds the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ActiveWorker {
    pub(crate) generation: u64,
    pub(crate) thread: ThreadId,
}

impl<T> State<T> {
    fn serves(&self, generation: u64) -> bool {
        self.running && self.generation == generation
    }

    /// Whether a worker of `generation` or older still holds the loop.
    pub(crate) fn retiring(&self, generation: u64) -> Option<ActiveWorker> {
        self.active.filter(|active| active.generation <= generation)
    }
}

/// State shared between the scheduler handle and its worker thread.
pub(crate) struct Shared<T, C> {
    pub(crate) state: Mutex<State<T>>,
    pub(crate) wakeup: Condvar,
    /// Signalled whenever a worker leaves the loop.
    pub(crate) released: Condvar,
    pub(crate) ctx: C,
    pub(crate) panic_policy: PanicPolicy,
}

impl<T, C> Shared<T, C>
where
    T: Task<C>,
    C: Send + Sync + 'static,
{
    /// Worker thread body: drain due jobs, then sleep until the next one is
    /// due or until signalled. Every wake-up, whatever its cause, goes back
    /// through the drain.
    pub(crate) fn run_worker(&self, generation: u64) {
        // Declared before `state` so it is released after the lock guard,
        // also when a task panic unwinds through here.
        let Some(_claim) = self.claim(generation) else {
            debug!(generation, "Worker superseded before it started");
            return;
        };
        let mut state = self.state.lock();
        debug!(generation, pending = state.queue.len(), "Worker started");

        loop {
            let wait_ms = self.process_pending(&mut state, generation);
            if !state.serves(generation) {
                break;
            }

            match wait_ms {
                Some(wait_ms) => {
                    let timed_out = self
                        .wakeup
                        .wait_for(&mut state, Duration::from_millis(wait_ms))
                        .timed_out();
                    trace!(wait_ms, timed_out, "Worker woke from timed wait");
                }
                None => {
                    self.wakeup.wait(&mut state);
                    trace!("Worker woke from idle wait");
                }
            }
        }

        debug!(generation, pending = state.queue.len(), "Worker exiting");
    }

    /// Wait until no older worker holds the loop, then take it. An older
    /// worker can still be finishing a task after a stop requested from
    /// inside that task. Returns `None` once this generation is stopped or
    /// replaced, without ever taking the loop.
    fn claim(&self, generation: u64) -> Option<Claim<'_, T, C>> {
        let mut state = self.state.lock();
        loop {
            if !state.serves(generation) {
                return None;
            }
            if state.active.is_none() {
                break;
            }
            trace!(generation, "Waiting for previous worker to finish");
            self.released.wait(&mut state);
        }
        state.active = Some(ActiveWorker {
            generation,
            thread: thread::current().id(),
        });
        Some(Claim { shared: self })
    }

    /// Run every job that is due. Returns the milliseconds until the next
    /// pending job, or `None` when the queue is empty. The lock is held on
    /// entry and on return, and released around each task.
    fn process_pending(&self, state: &mut MutexGuard<'_, State<T>>, generation: u64) -> Option<u64> {
        while state.serves(generation) {
            let next_at = state.queue.peek().map(|job| job.at)?;
            let wait_ms = next_at.saturating_sub(now_ms());
            if wait_ms > 0 {
                return Some(wait_ms as u64);
            }

            if let Some(job) = state.queue.remove() {
                MutexGuard::unlocked(state, || self.execute(job));
            }
        }
        None
    }

    fn execute(&self, job: Job<T>) {
        let Job { at, task } = job;
        trace!(scheduled_at = at, lag_ms = now_ms().saturating_sub(at), "Running job");

        match self.panic_policy {
            PanicPolicy::Propagate => task.run(&self.ctx, at),
            PanicPolicy::CatchAndLog => {
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| task.run(&self.ctx, at)));
                if let Err(payload) = outcome {
                    error!(
                        scheduled_at = at,
                        panic = panic_message(payload.as_ref()),
                        "Task panicked, worker keeps running"
                    );
                }
            }
        }
    }
}

/// Gives up the worker loop when dropped.
struct Claim<'a, T, C> {
    shared: &'a Shared<T, C>,
}

impl<T, C> Drop for Claim<'_, T, C> {
    fn drop(&mut self) {
        self.shared.state.lock().active = None;
        self.shared.released.notify_all();
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}
