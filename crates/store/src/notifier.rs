//! Post-insert notifications
//!
//! The store publishes each row a batch actually inserted on an unbounded
//! channel once the transaction has committed. A separate task drains the
//! channel and logs a decoded view of the row. Nothing on the receiving side
//! can affect the insert: a closed channel only produces a warning.

use monitoring::truncate_message;
use scval::decode_or_raw;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::NewEvent;

#[derive(Clone, Debug)]
pub struct InsertNotifier {
    sender: mpsc::UnboundedSender<NewEvent>,
}

impl InsertNotifier {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<NewEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    /// Returns false when nobody is listening anymore
    pub fn publish(&self, event: &NewEvent) -> bool {
        match self.sender.send(event.clone()) {
            Ok(()) => true,
            Err(_) => {
                warn!(
                    "Insert listener is gone, dropping notification for {} :: {}",
                    event.project_key, event.action
                );
                false
            }
        }
    }
}

/// Spawn the logging listener. The task ends when every notifier is dropped.
pub fn spawn_event_logger(mut receiver: mpsc::UnboundedReceiver<NewEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut seen = 0u64;
        while let Some(event) = receiver.recv().await {
            log_inserted_event(&event);
            seen += 1;
        }
        info!("Event listener stopped after {} notifications", seen);
    })
}

/// Log a row, decoding any field that is still XDR encoded
pub fn log_inserted_event(event: &NewEvent) {
    let project_key = decode_or_raw(&event.project_key);
    let action = decode_or_raw(&event.action);
    let value = truncate_message(&decode_or_raw(&event.value).to_string());

    debug!(
        "Event listener: {} :: {} :: {} :: {}",
        project_key, action, value, event.ledger
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> NewEvent {
        NewEvent {
            ledger: 4,
            action: "commit".to_string(),
            project_key: "37ae83c0".to_string(),
            value: "AAAABAAAJxA=".to_string(),
        }
    }

    #[tokio::test]
    async fn test_publish_delivers_event() {
        let (notifier, mut receiver) = InsertNotifier::channel();
        assert!(notifier.publish(&sample()));
        assert_eq!(receiver.recv().await, Some(sample()));
    }

    #[tokio::test]
    async fn test_publish_without_listener_does_not_panic() {
        let (notifier, receiver) = InsertNotifier::channel();
        drop(receiver);
        assert!(!notifier.publish(&sample()));
    }

    #[tokio::test]
    async fn test_logger_stops_when_notifiers_are_dropped() {
        let (notifier, receiver) = InsertNotifier::channel();
        let handle = spawn_event_logger(receiver);
        notifier.publish(&sample());
        drop(notifier);
        handle.await.unwrap();
    }
}
