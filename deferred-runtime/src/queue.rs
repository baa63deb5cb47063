use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::error::Result;

/// A task paired with the absolute time it is due, in ms since the Unix epoch.
#[derive(Debug, Clone)]
pub struct Job<T> {
    pub at: i64,
    pub task: T,
}

impl<T> Job<T> {
    pub fn new(at: i64, task: T) -> Self {
        Self { at, task }
    }
}

// Jobs compare by `at` only, reversed so `BinaryHeap` pops the earliest.
// Equal times are left in heap order.
impl<T> PartialEq for Job<T> {
    fn eq(&self, other: &Self) -> bool {
        self.at == other.at
    }
}

impl<T> Eq for Job<T> {}

impl<T> PartialOrd for Job<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Job<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        other.at.cmp(&self.at)
    }
}

/// Min-heap of pending jobs keyed by due time.
#[derive(Debug)]
pub struct JobQueue<T> {
    heap: BinaryHeap<Job<T>>,
}

impl<T> Default for JobQueue<T> {
    fn default() -> Self {
        Self::with_capacity(0)
    }
}

impl<T> JobQueue<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            heap: BinaryHeap::with_capacity(capacity),
        }
    }

    /// Insert a job. Space is reserved before inserting, so on allocation
    /// failure the queue is left untouched.
    pub fn add(&mut self, job: Job<T>) -> Result<()> {
        self.heap.try_reserve(1)?;
        self.heap.push(job);
        Ok(())
    }

    /// The earliest job, without removing it.
    pub fn peek(&self) -> Option<&Job<T>> {
        self.heap.peek()
    }

    /// Remove and return the earliest job.
    pub fn remove(&mut self) -> Option<Job<T>> {
        self.heap.pop()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}
