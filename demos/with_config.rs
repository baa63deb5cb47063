use deferred::{BoxedTask, Scheduler, SchedulerBuilder};
use std::time::Duration;

const CONFIG_PATH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../demos/config/application.toml");

fn say(message: &'static str) -> BoxedTask<String> {
    Box::new(move |service: &String, _at: i64| {
        println!("[{}] {}", service, message);
    })
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("deferred_runtime=debug")),
        )
        .init();

    let scheduler: Scheduler<BoxedTask<String>, String> = SchedulerBuilder::with_toml(CONFIG_PATH)?
        .build("billing".to_string());

    println!("Worker thread: {}", scheduler.settings().thread_name);

    // Delays come from the [jobs] table; the last one falls back to its default.
    scheduler.schedule_after(say("reminder sent"), "${jobs.reminder_delay}")?;
    scheduler.schedule_after(say("cleanup finished"), "${jobs.cleanup_delay}")?;
    scheduler.schedule_after(say("audit (default delay)"), "${jobs.audit_delay:1s}")?;
    scheduler.schedule_after(say("next task panics; the worker keeps going"), "100ms")?;
    scheduler.schedule_in(
        Box::new(|_: &String, _: i64| panic!("simulated task failure")),
        200,
    )?;

    scheduler.start()?;
    std::thread::sleep(Duration::from_millis(2_500));
    scheduler.stop();

    Ok(())
}
