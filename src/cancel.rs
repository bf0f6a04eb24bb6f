//! Cooperative cancellation for message processing.
//!
//! The processor checks the signal before parsing and before each request is
//! classified and dispatched. Work already handed to a handler runs to
//! completion; the handler may watch the signal itself.

use tokio::sync::watch;

/// Create a linked handle and signal pair
pub fn cancellation() -> (CancellationHandle, CancellationSignal) {
    let (sender, receiver) = watch::channel(false);
    (
        CancellationHandle { sender },
        CancellationSignal {
            receiver: Some(receiver),
        },
    )
}

/// Handle to request cancellation
#[derive(Debug, Clone)]
pub struct CancellationHandle {
    sender: watch::Sender<bool>,
}

impl CancellationHandle {
    /// Request cancellation; every linked signal observes it
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.sender.borrow()
    }
}

/// Signal observed by the processor
#[derive(Debug, Clone, Default)]
pub struct CancellationSignal {
    receiver: Option<watch::Receiver<bool>>,
}

impl CancellationSignal {
    /// A signal that is never cancelled
    pub fn never() -> Self {
        Self { receiver: None }
    }

    pub fn is_cancelled(&self) -> bool {
        self.receiver
            .as_ref()
            .is_some_and(|receiver| *receiver.borrow())
    }

    /// Wait until cancellation is requested.
    ///
    /// Never completes for [`CancellationSignal::never`] or once every handle
    /// has been dropped without cancelling.
    pub async fn cancelled(&self) {
        if let Some(receiver) = &self.receiver {
            let mut receiver = receiver.clone();
            if receiver.wait_for(|cancelled| *cancelled).await.is_ok() {
                return;
            }
        }
        std::future::pending::<()>().await
    }
}
