//! Background task set for snapshot retries.
//!
//! Tasks are registered on spawn and remove themselves on completion,
//! so the set only ever holds in-flight work. Shutdown aborts whatever
//! is left without running the tasks' failure paths.

use parking_lot::Mutex;
use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};
use tokio::task::AbortHandle;

#[derive(Default)]
pub(crate) struct RetrySet {
    tasks: Arc<Mutex<HashMap<u64, AbortHandle>>>,
    counter: AtomicU64,
}

impl RetrySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn a detached task and track it until it completes.
    pub fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let id = self.counter.fetch_add(1, Ordering::Relaxed);
        let tasks = self.tasks.clone();
        // Hold the lock across the spawn so the task's own removal
        // cannot run before the handle is registered.
        let mut registered = self.tasks.lock();
        let handle = tokio::spawn(async move {
            task.await;
            tasks.lock().remove(&id);
        });
        registered.insert(id, handle.abort_handle());
    }

    /// In-flight task count.
    pub fn len(&self) -> usize {
        self.tasks.lock().len()
    }

    /// Abort everything still running.
    pub fn abort_all(&self) {
        for (_, handle) in self.tasks.lock().drain() {
            handle.abort();
        }
    }
}
