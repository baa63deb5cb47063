use deferred::{Runnable, Scheduler, Spawn};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;

/// Async work: the worker thread only hands it to tokio and moves on.
struct FetchQuote {
    symbol: &'static str,
}

impl Runnable for FetchQuote {
    fn run(&self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(async move {
            println!("Fetching {}...", self.symbol);
            tokio::time::sleep(Duration::from_millis(200)).await;
            println!("{} fetched", self.symbol);
        })
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let scheduler: Scheduler<Spawn<FetchQuote>, Handle> = Scheduler::new(Handle::current());

    for (offset, symbol) in [(100, "ACME"), (150, "INIT"), (120, "GLOBEX")] {
        scheduler.schedule_in(Spawn::new(Arc::new(FetchQuote { symbol })), offset)?;
    }
    scheduler.start()?;

    tokio::time::sleep(Duration::from_millis(600)).await;

    // stop() joins the worker thread, so keep it off the async executor.
    tokio::task::spawn_blocking(move || scheduler.stop()).await?;
    Ok(())
}
