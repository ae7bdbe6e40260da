use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use shellbridge_core::BatteryLevel;

use crate::traits::BatterySource;

/// Whether a [`BatteryNotifier`] currently holds a subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifierState {
    Idle,
    Listening,
}

/// Forwards battery events from a [`BatterySource`] to a single consumer.
///
/// `attach` transitions `Idle -> Listening` and hands back the consumer's
/// receiving end; `detach` transitions back to `Idle` and is idempotent.
/// Attaching while already listening replaces the previous consumer: its
/// channel closes and it receives nothing further. Events are forwarded one
/// at a time in arrival order with no coalescing.
///
/// Dropping the notifier detaches, so a subscription cannot outlive its
/// owner.
pub struct BatteryNotifier {
    source: Arc<dyn BatterySource>,
    forward: Option<JoinHandle<()>>,
}

impl BatteryNotifier {
    pub fn new(source: Arc<dyn BatterySource>) -> Self {
        Self {
            source,
            forward: None,
        }
    }

    /// Subscribe to the source and start forwarding events.
    ///
    /// Must be called from within a tokio runtime.
    pub fn attach(&mut self) -> mpsc::UnboundedReceiver<BatteryLevel> {
        self.detach();

        let mut events = self.source.subscribe();
        let (tx, rx) = mpsc::unbounded_channel();

        self.forward = Some(tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(level) => {
                        if tx.send(level).is_err() {
                            // Consumer dropped its end
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "battery consumer lagged, events dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }));

        rx
    }

    /// Stop forwarding and release the subscription. No-op when `Idle`.
    pub fn detach(&mut self) {
        if let Some(task) = self.forward.take() {
            task.abort();
        }
    }

    pub fn state(&self) -> NotifierState {
        if self.forward.is_some() {
            NotifierState::Listening
        } else {
            NotifierState::Idle
        }
    }
}

impl Drop for BatteryNotifier {
    fn drop(&mut self) {
        self.detach();
    }
}
