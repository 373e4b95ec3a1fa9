//! Cooperative cancellation for in-flight investigations.
//!
//! The orchestrator checks the signal at every phase boundary and before
//! each hypothesis test. Work already committed is kept.

use tokio::sync::watch;

/// Owner side: call [`cancel`](Self::cancel) to stop an investigation.
#[derive(Debug)]
pub struct CancellationHandle {
    sender: watch::Sender<bool>,
}

impl CancellationHandle {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self { sender }
    }

    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.sender.borrow()
    }

    pub fn signal(&self) -> CancellationSignal {
        CancellationSignal {
            receiver: self.sender.subscribe(),
        }
    }
}

impl Default for CancellationHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Observer side, handed to the orchestrator.
#[derive(Debug, Clone)]
pub struct CancellationSignal {
    receiver: watch::Receiver<bool>,
}

impl CancellationSignal {
    /// A signal that never fires.
    pub fn never() -> Self {
        let (_, receiver) = watch::channel(false);
        Self { receiver }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolves once cancellation is requested. Pends forever if the handle
    /// is dropped without cancelling.
    pub async fn cancelled(&mut self) {
        loop {
            if *self.receiver.borrow_and_update() {
                return;
            }
            if self.receiver.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn cancel_is_visible_to_all_signals() {
        let handle = CancellationHandle::new();
        let a = handle.signal();
        let b = a.clone();
        assert!(!a.is_cancelled());
        handle.cancel();
        assert!(a.is_cancelled());
        assert!(b.is_cancelled());
        assert!(handle.is_cancelled());
    }

    #[test]
    fn never_stays_clear() {
        assert!(!CancellationSignal::never().is_cancelled());
    }

    #[tokio::test]
    async fn cancelled_future_resolves() {
        let handle = CancellationHandle::new();
        let mut signal = handle.signal();
        let waiter = tokio::spawn(async move { signal.cancelled().await });
        handle.cancel();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }
}
