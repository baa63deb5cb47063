use super::worker::{Shared, State};
use crate::clock::{now_ms, UnixMillis};
use crate::config::{resolve_config_value, SchedulerConfig};
use crate::error::{Result, SchedulerError};
use crate::queue::{Job, JobQueue};
use crate::task::Task;
use crate::time_unit::parse_delay_millis;
use config::Config;
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, trace, warn};

/// Runs deferred tasks on one background thread, earliest due time first.
///
/// Jobs may be scheduled from any thread, before or after `start()`. Tasks
/// run one at a time on the worker, outside the scheduler lock, and each
/// receives a shared reference to the context `C` given at construction.
///
/// Dropping the scheduler stops it; jobs still queued are discarded.
///
/// # Example
///
/// ```rust
/// use deferred_runtime::Scheduler;
/// use std::sync::atomic::{AtomicUsize, Ordering};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let scheduler = Scheduler::new(AtomicUsize::new(0));
/// scheduler.schedule_in(|hits: &AtomicUsize, _at: i64| {
///     hits.fetch_add(1, Ordering::SeqCst);
/// }, -1)?;
///
/// scheduler.start()?;
/// std::thread::sleep(std::time::Duration::from_millis(50));
/// scheduler.stop();
///
/// assert_eq!(scheduler.context().load(Ordering::SeqCst), 1);
/// # Ok(())
/// # }
/// ```
pub struct Scheduler<T, C = ()>
where
    T: Task<C>,
    C: Send + Sync + 'static,
{
    shared: Arc<Shared<T, C>>,
    worker: Mutex<Option<WorkerHandle>>,
    settings: SchedulerConfig,
    config: Arc<Config>,
}

/// Join handle of the most recently spawned worker.
struct WorkerHandle {
    generation: u64,
    handle: JoinHandle<()>,
}

impl WorkerHandle {
    fn join(self) {
        if self.handle.join().is_err() {
            warn!(generation = self.generation, "Worker thread panicked");
        }
    }

    /// Collect a replaced worker. One that is still finishing a task is
    /// detached; the new worker waits for it before running anything.
    fn reap(self) {
        if self.handle.is_finished() {
            self.join();
        } else {
            trace!(generation = self.generation, "Detaching previous worker");
        }
    }
}

impl<T, C> Scheduler<T, C>
where
    T: Task<C>,
    C: Send + Sync + 'static,
{
    /// Create a stopped scheduler with default settings
    pub fn new(ctx: C) -> Self {
        Self::with_settings(ctx, SchedulerConfig::default())
    }

    /// Create a stopped scheduler with explicit worker settings
    pub fn with_settings(ctx: C, settings: SchedulerConfig) -> Self {
        Self::from_parts(ctx, settings, Arc::new(Config::default()))
    }

    pub(crate) fn from_parts(ctx: C, settings: SchedulerConfig, config: Arc<Config>) -> Self {
        let shared = Shared {
            state: Mutex::new(State {
                queue: JobQueue::with_capacity(settings.initial_capacity),
                running: false,
                generation: 0,
                active: None,
            }),
            wakeup: Condvar::new(),
            released: Condvar::new(),
            ctx,
            panic_policy: settings.panic_policy,
        };

        Self {
            shared: Arc::new(shared),
            worker: Mutex::new(None),
            settings,
            config,
        }
    }

    /// Spawn the worker thread.
    ///
    /// Fails with [`SchedulerError::AlreadyRunning`] if a worker is already
    /// running, leaving it untouched. If the thread cannot be spawned the
    /// scheduler is left stopped and can be started again. A worker stopped
    /// from inside one of its own tasks finishes that task before the new
    /// worker runs anything.
    pub fn start(&self) -> Result<()> {
        let mut worker = self.worker.lock();

        let generation = {
            let mut state = self.shared.state.lock();
            if state.running {
                return Err(SchedulerError::AlreadyRunning);
            }
            state.running = true;
            state.generation += 1;
            state.generation
        };

        let mut builder = thread::Builder::new().name(self.settings.thread_name.clone());
        if let Some(stack_size) = self.settings.stack_size {
            builder = builder.stack_size(stack_size);
        }

        let shared = Arc::clone(&self.shared);
        match builder.spawn(move || shared.run_worker(generation)) {
            Ok(handle) => {
                if let Some(previous) = worker.replace(WorkerHandle { generation, handle }) {
                    previous.reap();
                }
                info!(
                    thread = %self.settings.thread_name,
                    generation,
                    pending = self.pending(),
                    "Scheduler started"
                );
                Ok(())
            }
            Err(e) => {
                let mut state = self.shared.state.lock();
                if state.generation == generation {
                    state.running = false;
                }
                drop(state);
                error!(thread = %self.settings.thread_name, error = %e, "Failed to spawn worker thread");
                Err(e.into())
            }
        }
    }

    /// Stop the worker and wait for it to exit.
    ///
    /// A task that is running finishes first; queued jobs stay queued. Safe
    /// to call when stopped, and concurrent callers all wait for the same
    /// worker. When called from a task on the worker itself, returns without
    /// waiting and the worker exits once that task returns.
    pub fn stop(&self) {
        let current = thread::current().id();
        let mut state = self.shared.state.lock();
        let was_running = std::mem::replace(&mut state.running, false);
        let stopped = state.generation;
        if was_running {
            self.shared.wakeup.notify_one();
        }

        while let Some(active) = state.retiring(stopped) {
            if active.thread == current {
                debug!("Stop requested from a running task, not waiting for the worker");
                return;
            }
            self.shared.released.wait(&mut state);
        }
        drop(state);

        if !was_running {
            return;
        }

        let finished = {
            let mut worker = self.worker.lock();
            match worker.take() {
                Some(done) if done.generation <= stopped => Some(done),
                other => {
                    *worker = other;
                    None
                }
            }
        };
        if let Some(done) = finished {
            done.join();
        }
        info!(generation = stopped, pending = self.pending(), "Scheduler stopped");
    }

    /// Stop the scheduler and drop it, returning how many jobs never ran.
    pub fn shutdown(self) -> usize {
        self.stop();
        self.pending()
    }

    /// Queue `task` to run at `at`, in milliseconds since the Unix epoch.
    ///
    /// Any time is accepted; times in the past run on the worker's next
    /// pass. The worker is woken only when this job becomes the earliest
    /// pending one.
    pub fn schedule(&self, task: T, at: i64) -> Result<()> {
        let reschedule = {
            let mut state = self.shared.state.lock();
            // Compare against the earliest job before this one is added.
            let reschedule = state.queue.peek().map_or(true, |next| at < next.at);
            state.queue.add(Job::new(at, task))?;
            reschedule
        };

        if reschedule {
            debug!(at, "New earliest job, waking worker");
            self.shared.wakeup.notify_one();
        } else {
            trace!(at, "Job queued");
        }
        Ok(())
    }

    /// Queue `task` to run `offset_ms` from now. Negative offsets are due immediately.
    pub fn schedule_in(&self, task: T, offset_ms: i64) -> Result<()> {
        self.schedule(task, now_ms().saturating_add(offset_ms))
    }

    /// Queue `task` to run at a calendar time.
    pub fn schedule_at<D>(&self, task: T, when: &D) -> Result<()>
    where
        D: UnixMillis + ?Sized,
    {
        self.schedule(task, when.unix_millis())
    }

    /// Queue `task` after a delay expression such as `"250ms"`, `"5s"`,
    /// `"1500"` (milliseconds) or a config placeholder like
    /// `"${jobs.retry_delay:30s}"`.
    pub fn schedule_after(&self, task: T, delay: &str) -> Result<()> {
        let resolved = resolve_config_value(delay, &self.config)?;
        let offset_ms = parse_delay_millis(&resolved)?;
        self.schedule_in(task, offset_ms)
    }

    /// Whether the scheduler has been started and not stopped since.
    pub fn is_running(&self) -> bool {
        self.shared.state.lock().running
    }

    /// Number of jobs waiting in the queue.
    pub fn pending(&self) -> usize {
        self.shared.state.lock().queue.len()
    }

    /// The context passed to every task.
    pub fn context(&self) -> &C {
        &self.shared.ctx
    }

    /// Worker settings this scheduler was built with.
    pub fn settings(&self) -> &SchedulerConfig {
        &self.settings
    }
}

impl<T, C> Default for Scheduler<T, C>
where
    T: Task<C>,
    C: Default + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new(C::default())
    }
}

impl<T, C> Drop for Scheduler<T, C>
where
    T: Task<C>,
    C: Send + Sync + 'static,
{
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PanicPolicy;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;
    use std::time::{Duration, Instant};

    type Counter = Scheduler<fn(&AtomicUsize, i64), AtomicUsize>;

    fn bump(hits: &AtomicUsize, _at: i64) {
        hits.fetch_add(1, Ordering::SeqCst);
    }

    fn slow_bump(hits: &AtomicUsize, _at: i64) {
        thread::sleep(Duration::from_millis(100));
        hits.fetch_add(1, Ordering::SeqCst);
    }

    fn eventually(mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(2));
        }
        condition()
    }

    /// Tracks how many tasks run at once.
    #[derive(Default)]
    struct Overlap {
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        finished: AtomicUsize,
    }

    impl Overlap {
        fn enter(&self) {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        }

        fn leave(&self) {
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.finished.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn new_scheduler_is_idle() {
        let scheduler = Counter::new(AtomicUsize::new(0));
        assert!(!scheduler.is_running());
        assert_eq!(scheduler.pending(), 0);
        scheduler.stop();
    }

    #[test]
    fn jobs_wait_until_started() {
        let scheduler = Counter::new(AtomicUsize::new(0));
        scheduler.schedule_in(bump, -100).unwrap();
        thread::sleep(Duration::from_millis(20));
        assert_eq!(scheduler.context().load(Ordering::SeqCst), 0);
        assert_eq!(scheduler.pending(), 1);

        scheduler.start().unwrap();
        thread::sleep(Duration::from_millis(50));
        scheduler.stop();
        assert_eq!(scheduler.context().load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn restart_after_stop() {
        let scheduler = Counter::new(AtomicUsize::new(0));
        scheduler.start().unwrap();
        scheduler.stop();
        assert!(!scheduler.is_running());
        scheduler.start().unwrap();
        assert!(scheduler.is_running());
        assert!(matches!(scheduler.start(), Err(SchedulerError::AlreadyRunning)));
    }

    #[test]
    fn shutdown_reports_abandoned_jobs() {
        let scheduler = Counter::new(AtomicUsize::new(0));
        scheduler.schedule_in(bump, 60_000).unwrap();
        scheduler.schedule_in(bump, 120_000).unwrap();
        scheduler.start().unwrap();
        assert_eq!(scheduler.shutdown(), 2);
    }

    #[test]
    fn worker_thread_uses_configured_name() {
        let settings = SchedulerConfig {
            thread_name: "named-worker".to_string(),
            ..SchedulerConfig::default()
        };
        let scheduler: Scheduler<fn(&Mutex<Option<String>>, i64), _> =
            Scheduler::with_settings(Mutex::new(None), settings);
        scheduler
            .schedule_in(
                |seen: &Mutex<Option<String>>, _| {
                    *seen.lock() = thread::current().name().map(str::to_string);
                },
                0,
            )
            .unwrap();
        scheduler.start().unwrap();
        thread::sleep(Duration::from_millis(50));
        scheduler.stop();
        assert_eq!(scheduler.context().lock().as_deref(), Some("named-worker"));
    }

    #[test]
    fn panicking_task_does_not_kill_worker_by_default() {
        let scheduler: Scheduler<fn(&AtomicUsize, i64), _> = Scheduler::new(AtomicUsize::new(0));
        assert_eq!(scheduler.settings().panic_policy, PanicPolicy::CatchAndLog);

        scheduler.schedule_in(|_, _| panic!("task failure"), -10).unwrap();
        scheduler.schedule_in(bump, 0).unwrap();
        scheduler.start().unwrap();
        thread::sleep(Duration::from_millis(50));
        scheduler.stop();

        assert_eq!(scheduler.context().load(Ordering::SeqCst), 1);
    }

    #[test]
    fn stop_from_inside_a_task_does_not_deadlock() {
        let scheduler: Arc<Scheduler<Box<dyn FnOnce(&AtomicUsize, i64) + Send>, AtomicUsize>> =
            Arc::new(Scheduler::new(AtomicUsize::new(0)));

        let handle = Arc::clone(&scheduler);
        scheduler
            .schedule_in(
                Box::new(move |hits: &AtomicUsize, _: i64| {
                    hits.fetch_add(1, Ordering::SeqCst);
                    handle.stop();
                }),
                0,
            )
            .unwrap();
        scheduler
            .schedule_in(Box::new(|hits: &AtomicUsize, _: i64| { hits.fetch_add(10, Ordering::SeqCst); }), 30)
            .unwrap();

        scheduler.start().unwrap();
        thread::sleep(Duration::from_millis(100));

        assert!(!scheduler.is_running());
        assert_eq!(scheduler.context().load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.pending(), 1);
    }

    #[test]
    fn restart_after_stop_from_a_task_waits_for_that_task() {
        type Tracked = Scheduler<Box<dyn FnOnce(&Overlap, i64) + Send>, Overlap>;
        let scheduler: Arc<Tracked> = Arc::new(Scheduler::new(Overlap::default()));

        let handle = Arc::clone(&scheduler);
        scheduler
            .schedule_in(
                Box::new(move |overlap: &Overlap, _: i64| {
                    overlap.enter();
                    handle.stop();
                    thread::sleep(Duration::from_millis(150));
                    overlap.leave();
                }),
                0,
            )
            .unwrap();
        scheduler.start().unwrap();
        assert!(eventually(|| !scheduler.is_running()));

        scheduler.start().unwrap();
        scheduler
            .schedule_in(
                Box::new(|overlap: &Overlap, _: i64| {
                    overlap.enter();
                    overlap.leave();
                }),
                20,
            )
            .unwrap();

        assert!(eventually(|| scheduler.context().finished.load(Ordering::SeqCst) == 2));
        scheduler.stop();
        assert_eq!(scheduler.context().max_in_flight.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn racing_start_and_stop_never_hangs() {
        let scheduler = Arc::new(Counter::new(AtomicUsize::new(0)));

        for round in 0..300 {
            scheduler.start().unwrap();

            let starter = {
                let scheduler = Arc::clone(&scheduler);
                thread::spawn(move || {
                    let _ = scheduler.start();
                })
            };
            let (done_tx, done_rx) = mpsc::channel();
            let stopper = {
                let scheduler = Arc::clone(&scheduler);
                thread::spawn(move || {
                    scheduler.stop();
                    let _ = done_tx.send(());
                })
            };

            assert!(
                done_rx.recv_timeout(Duration::from_secs(5)).is_ok(),
                "stop() blocked in round {round}"
            );
            starter.join().unwrap();
            stopper.join().unwrap();

            scheduler.stop();
            assert!(!scheduler.is_running());
            assert!(scheduler.shared.state.lock().active.is_none());
        }
    }

    #[test]
    fn concurrent_stops_both_wait_for_the_running_task() {
        let scheduler = Arc::new(Counter::new(AtomicUsize::new(0)));
        scheduler.schedule_in(slow_bump, 0).unwrap();
        scheduler.start().unwrap();
        assert!(eventually(|| scheduler.pending() == 0));

        let stoppers: Vec<_> = (0..2)
            .map(|_| {
                let scheduler = Arc::clone(&scheduler);
                thread::spawn(move || {
                    scheduler.stop();
                    scheduler.context().load(Ordering::SeqCst)
                })
            })
            .collect();

        for stopper in stoppers {
            assert_eq!(stopper.join().unwrap(), 1);
        }
        assert!(scheduler.shared.state.lock().active.is_none());
    }

    #[test]
    fn failed_spawn_leaves_scheduler_stopped_and_startable() {
        let settings = SchedulerConfig {
            stack_size: Some(usize::MAX / 8),
            ..SchedulerConfig::default()
        };
        let mut scheduler = Counter::with_settings(AtomicUsize::new(0), settings);
        scheduler.schedule_in(bump, 0).unwrap();

        assert!(matches!(scheduler.start(), Err(SchedulerError::Spawn(_))));
        assert!(!scheduler.is_running());
        assert_eq!(scheduler.pending(), 1);
        // Still stopped, so a retry reports the spawn error again.
        assert!(matches!(scheduler.start(), Err(SchedulerError::Spawn(_))));

        scheduler.settings.stack_size = None;
        scheduler.start().unwrap();
        assert!(eventually(|| scheduler.context().load(Ordering::SeqCst) == 1));
        scheduler.stop();
    }
}
