use chrono::Local;
use deferred::{BoxedTask, Scheduler};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

fn announce(label: &'static str) -> BoxedTask<AtomicU32> {
    Box::new(move |runs: &AtomicU32, scheduled_at: i64| {
        let count = runs.fetch_add(1, Ordering::SeqCst) + 1;
        let now = Local::now().format("%H:%M:%S%.3f");
        println!("[{}] #{} {} (due at {})", now, count, label, scheduled_at);
    })
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let scheduler: Scheduler<BoxedTask<AtomicU32>, AtomicU32> = Scheduler::new(AtomicU32::new(0));

    scheduler.schedule_in(announce("overdue, runs first"), -500)?;
    scheduler.schedule_in(announce("after 1.5s"), 1_500)?;
    scheduler.schedule_in(announce("after 300ms"), 300)?;
    scheduler.schedule_after(announce("after 1s"), "1s")?;
    scheduler.schedule_in(announce("never, stopped before it is due"), 60_000)?;

    scheduler.start()?;
    println!("Scheduler started with {} pending jobs", scheduler.pending());

    std::thread::sleep(Duration::from_millis(700));
    // Jumps ahead of everything still pending and wakes the worker early.
    scheduler.schedule_in(announce("inserted late, due in 50ms"), 50)?;

    std::thread::sleep(Duration::from_secs(2));
    let abandoned = scheduler.shutdown();
    println!("Stopped; {} job(s) never ran", abandoned);

    Ok(())
}
