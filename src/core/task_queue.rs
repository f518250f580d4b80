use std::{
    sync::{Mutex, mpsc},
    thread::{self, JoinHandle, ThreadId},
};

use super::{error::EngineError, sync::lock};

type Task = Box<dyn FnOnce() + Send + 'static>;

/// A named worker thread draining a FIFO of closures.
///
/// Two call styles:
/// - [`post`](Self::post): enqueue and return immediately.
/// - [`invoke`](Self::invoke): enqueue and block until the closure's result is
///   back. Called from the queue's own thread it runs inline instead of
///   deadlocking on itself.
pub struct TaskQueue {
    name: String,
    tx: Mutex<Option<mpsc::Sender<Task>>>,
    handle: Mutex<Option<JoinHandle<()>>>,
    thread_id: ThreadId,
}

impl TaskQueue {
    pub fn new(name: &str) -> Result<Self, EngineError> {
        let (tx, rx) = mpsc::channel::<Task>();
        let handle = thread::Builder::new()
            .name(name.to_owned())
            .spawn(move || {
                while let Ok(task) = rx.recv() {
                    task();
                }
            })
            .map_err(|e| EngineError::TaskQueue {
                name: name.to_owned(),
                reason: e.to_string(),
            })?;
        let thread_id = handle.thread().id();
        Ok(Self {
            name: name.to_owned(),
            tx: Mutex::new(Some(tx)),
            handle: Mutex::new(Some(handle)),
            thread_id,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_current(&self) -> bool {
        thread::current().id() == self.thread_id
    }

    /// Fire-and-forget. Returns `false` once the queue is shut down.
    pub fn post<F>(&self, f: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        match lock(&self.tx).as_ref() {
            Some(tx) => tx.send(Box::new(f)).is_ok(),
            None => false,
        }
    }

    /// Runs `f` on the queue thread and waits for its result.
    pub fn invoke<R, F>(&self, f: F) -> Result<R, EngineError>
    where
        R: Send + 'static,
        F: FnOnce() -> R + Send + 'static,
    {
        if self.is_current() {
            return Ok(f());
        }
        let (result_tx, result_rx) = mpsc::sync_channel(1);
        let posted = self.post(move || {
            let _ = result_tx.send(f());
        });
        if !posted {
            return Err(EngineError::EngineShutdown);
        }
        result_rx.recv().map_err(|_| EngineError::EngineShutdown)
    }

    /// Stops accepting work, lets already queued tasks finish and joins the
    /// thread. Idempotent. From the queue's own thread it only detaches.
    pub fn shutdown(&self) {
        lock(&self.tx).take();
        let handle = lock(&self.handle).take();
        if let Some(h) = handle {
            if !self.is_current() {
                let _ = h.join();
            }
        }
    }
}

impl Drop for TaskQueue {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for TaskQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskQueue").field("name", &self.name).finish()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn invoke_returns_value_from_queue_thread() {
        let q = TaskQueue::new("test-api").unwrap();
        let name = q
            .invoke(|| thread::current().name().map(str::to_owned))
            .unwrap();
        assert_eq!(name.as_deref(), Some("test-api"));
    }

    #[test]
    fn posted_tasks_run_in_order_before_shutdown_returns() {
        let q = TaskQueue::new("test-worker").unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        for i in 0..10 {
            let seen = seen.clone();
            assert!(q.post(move || seen.lock().unwrap().push(i)));
        }
        q.shutdown();
        assert_eq!(*seen.lock().unwrap(), (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn invoke_from_inside_runs_inline() {
        let q = Arc::new(TaskQueue::new("test-nested").unwrap());
        let inner = q.clone();
        let v = q.invoke(move || inner.invoke(|| 41).unwrap() + 1).unwrap();
        assert_eq!(v, 42);
    }

    #[test]
    fn closed_queue_rejects_work() {
        let q = TaskQueue::new("test-closed").unwrap();
        q.shutdown();
        let counter = Arc::new(AtomicUsize::new(0));
        let c = counter.clone();
        assert!(!q.post(move || {
            c.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(q.invoke(|| 1), Err(EngineError::EngineShutdown));
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }
}
