use std::sync::Arc;

use super::{error::EngineError, observer::EngineObserver, task_queue::TaskQueue};
use crate::{config::Config, log::log_sink::LogSink, sink_debug};

struct ContextInner {
    api: TaskQueue,
    worker: TaskQueue,
    network: TaskQueue,
    logger: Arc<dyn LogSink>,
    config: Arc<Config>,
    observer: Option<Arc<dyn EngineObserver>>,
}

/// Shared resources every engine component is created with.
///
/// Owns three long-lived queues:
/// - `api`: blocking device queries and observer callbacks.
/// - `worker`: starting and stopping push chains, which opens and closes cameras.
/// - `network`: signaling replies and packet egress.
///
/// Cloning is cheap; all clones refer to the same queues. Call
/// [`shutdown`](Self::shutdown) to stop and join them.
#[derive(Clone)]
pub struct EngineContext {
    inner: Arc<ContextInner>,
}

impl EngineContext {
    pub fn init(
        config: Config,
        logger: Arc<dyn LogSink>,
        observer: Option<Arc<dyn EngineObserver>>,
    ) -> Result<Self, EngineError> {
        let inner = ContextInner {
            api: TaskQueue::new("pushrtc-api")?,
            worker: TaskQueue::new("pushrtc-worker")?,
            network: TaskQueue::new("pushrtc-network")?,
            logger,
            config: Arc::new(config),
            observer,
        };
        sink_debug!(inner.logger, "[EngineContext] task queues up");
        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    pub fn api(&self) -> &TaskQueue {
        &self.inner.api
    }

    pub fn worker(&self) -> &TaskQueue {
        &self.inner.worker
    }

    pub fn network(&self) -> &TaskQueue {
        &self.inner.network
    }

    pub fn logger(&self) -> &Arc<dyn LogSink> {
        &self.inner.logger
    }

    pub fn config(&self) -> &Arc<Config> {
        &self.inner.config
    }

    /// Posts `f` to the api queue with the registered observer, if any.
    pub fn notify<F>(&self, f: F)
    where
        F: FnOnce(&dyn EngineObserver) + Send + 'static,
    {
        if let Some(observer) = self.inner.observer.clone() {
            self.inner.api.post(move || f(observer.as_ref()));
        }
    }

    /// Stops the queues in reverse dependency order. Pending tasks still run.
    pub fn shutdown(&self) {
        self.inner.network.shutdown();
        self.inner.worker.shutdown();
        self.inner.api.shutdown();
        sink_debug!(self.inner.logger, "[EngineContext] task queues joined");
    }
}

impl std::fmt::Debug for EngineContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineContext")
            .field("has_observer", &self.inner.observer.is_some())
            .finish()
    }
}
