use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, Ordering},
    mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError},
};
use std::time::Duration;

use crate::core::{EngineError, sync::lock};

/// Shared flag telling in-flight callbacks their round was abandoned.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Sending half of one negotiation round. Consumed on completion.
#[derive(Debug)]
pub(crate) struct NegotiationCompleter {
    tx: Sender<Result<(), EngineError>>,
}

impl NegotiationCompleter {
    pub(crate) fn complete(self, result: Result<(), EngineError>) {
        // The handle may already be gone; nobody is waiting then.
        let _ = self.tx.send(result);
    }
}

/// Caller's view of one offer/answer round: a one-shot result plus a way to
/// abandon it.
#[derive(Debug)]
pub struct NegotiationHandle {
    rx: Receiver<Result<(), EngineError>>,
    token: CancellationToken,
    result: Mutex<Option<Result<(), EngineError>>>,
}

pub(crate) fn negotiation_channel(token: CancellationToken) -> (NegotiationCompleter, NegotiationHandle) {
    let (tx, rx) = mpsc::channel();
    (
        NegotiationCompleter { tx },
        NegotiationHandle {
            rx,
            token,
            result: Mutex::new(None),
        },
    )
}

impl NegotiationHandle {
    /// Blocks up to `timeout`. `None` when the round is still running.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<Result<(), EngineError>> {
        let mut cached = lock(&self.result);
        if cached.is_none() {
            *cached = match self.rx.recv_timeout(timeout) {
                Ok(r) => Some(r),
                Err(RecvTimeoutError::Timeout) => return None,
                Err(RecvTimeoutError::Disconnected) => Some(Err(EngineError::NegotiationCancelled)),
            };
        }
        cached.clone()
    }

    /// Non-blocking variant of [`wait_timeout`](Self::wait_timeout).
    pub fn try_result(&self) -> Option<Result<(), EngineError>> {
        let mut cached = lock(&self.result);
        if cached.is_none() {
            *cached = match self.rx.try_recv() {
                Ok(r) => Some(r),
                Err(TryRecvError::Empty) => return None,
                Err(TryRecvError::Disconnected) => Some(Err(EngineError::NegotiationCancelled)),
            };
        }
        cached.clone()
    }

    /// Abandons the round. Replies arriving afterwards are discarded.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;

    #[test]
    fn result_is_delivered_once_and_cached() {
        let (completer, handle) = negotiation_channel(CancellationToken::new());
        assert_eq!(handle.try_result(), None);
        std::thread::spawn(move || completer.complete(Ok(())));
        assert_eq!(handle.wait_timeout(Duration::from_secs(2)), Some(Ok(())));
        assert_eq!(handle.try_result(), Some(Ok(())));
    }

    #[test]
    fn dropped_completer_reads_as_cancelled() {
        let (completer, handle) = negotiation_channel(CancellationToken::new());
        drop(completer);
        assert_eq!(
            handle.wait_timeout(Duration::from_millis(10)),
            Some(Err(EngineError::NegotiationCancelled))
        );
    }

    #[test]
    fn cancel_is_visible_through_clones() {
        let token = CancellationToken::new();
        let (_completer, handle) = negotiation_channel(token.clone());
        handle.cancel();
        assert!(token.is_cancelled());
        assert_eq!(handle.wait_timeout(Duration::from_millis(5)), None);
    }
}
