//! Cancellation signal for in-flight optimizations
//!
//! A [`CancelHandle`] owns the sending side of a `watch` channel; every
//! [`CancelSignal`] cloned from it observes the same flag. Blocking work polls
//! [`CancelSignal::is_cancelled`] between stages, async work awaits
//! [`CancelSignal::cancelled`].

use tokio::sync::watch;

/// Sending side: call [`CancelHandle::cancel`] to stop outstanding work
#[derive(Debug)]
pub struct CancelHandle {
    sender: watch::Sender<bool>,
}

/// Receiving side, cheap to clone and `Send` into blocking tasks
#[derive(Debug, Clone, Default)]
pub struct CancelSignal {
    receiver: Option<watch::Receiver<bool>>,
}

impl CancelHandle {
    /// Create a handle and the signal observing it
    pub fn new() -> (Self, CancelSignal) {
        let (sender, receiver) = watch::channel(false);
        (
            Self { sender },
            CancelSignal {
                receiver: Some(receiver),
            },
        )
    }

    pub fn cancel(&self) {
        // send_replace never fails, even with no receivers left
        self.sender.send_replace(true);
    }

    pub fn signal(&self) -> CancelSignal {
        CancelSignal {
            receiver: Some(self.sender.subscribe()),
        }
    }
}

impl CancelSignal {
    /// A signal that is never cancelled
    pub fn never() -> Self {
        Self { receiver: None }
    }

    pub fn is_cancelled(&self) -> bool {
        self.receiver
            .as_ref()
            .map(|rx| *rx.borrow())
            .unwrap_or(false)
    }

    /// Resolve once cancelled; pending forever for [`CancelSignal::never`] or
    /// when the handle is dropped without cancelling
    pub async fn cancelled(&self) {
        let Some(mut rx) = self.receiver.clone() else {
            return std::future::pending().await;
        };

        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                return std::future::pending().await;
            }
        }
    }
}
