#![allow(dead_code)]

use deferred::{now_ms, BoxedTask};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// One observed task execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Run {
    pub value: u32,
    pub scheduled_at: i64,
    pub ran_at: i64,
}

/// Context that records every task execution in order.
#[derive(Debug, Default)]
pub struct Recorder {
    runs: Mutex<Vec<Run>>,
}

impl Recorder {
    pub fn runs(&self) -> Vec<Run> {
        self.runs.lock().unwrap().clone()
    }

    pub fn values(&self) -> Vec<u32> {
        self.runs().iter().map(|run| run.value).collect()
    }

    pub fn len(&self) -> usize {
        self.runs.lock().unwrap().len()
    }
}

/// A task that records `value` when it runs.
pub fn record(value: u32) -> BoxedTask<Recorder> {
    Box::new(move |recorder: &Recorder, scheduled_at: i64| {
        recorder.runs.lock().unwrap().push(Run {
            value,
            scheduled_at,
            ran_at: now_ms(),
        });
    })
}

/// Poll `condition` until it holds or `timeout` passes.
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    condition()
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
