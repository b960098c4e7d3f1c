use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Notification emitted after a lead changes hands or stage.
/// Delivery is fire-and-forget; failures are logged, never surfaced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeadNotification {
    pub org_id: Uuid,
    pub recipient_id: Uuid,
    pub actor_id: Uuid,
    pub action: String,
    pub entity_type: String,
    pub entity_id: Uuid,
    pub entity_name: String,
    pub message: String,
    pub url: String,
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Delivery failed: {0}")]
    Delivery(String),
}

#[async_trait::async_trait]
pub trait NotificationEmitter: Send + Sync {
    async fn emit(&self, notification: LeadNotification) -> Result<(), NotifyError>;
}

/// Default emitter: fans notifications out on a broadcast channel that
/// delivery workers (WebSocket push, email digests) subscribe to.
pub struct BroadcastEmitter {
    sender: broadcast::Sender<LeadNotification>,
}

impl BroadcastEmitter {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LeadNotification> {
        self.sender.subscribe()
    }
}

impl Default for BroadcastEmitter {
    fn default() -> Self {
        Self::new(100)
    }
}

#[async_trait::async_trait]
impl NotificationEmitter for BroadcastEmitter {
    async fn emit(&self, notification: LeadNotification) -> Result<(), NotifyError> {
        match self.sender.send(notification) {
            Ok(receivers) => {
                log::debug!("Notification delivered to {receivers} subscriber(s)");
                Ok(())
            }
            // No subscribers attached; the transition already committed.
            Err(_) => {
                log::debug!("Notification dropped: no active subscribers");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(recipient: Uuid) -> LeadNotification {
        LeadNotification {
            org_id: Uuid::nil(),
            recipient_id: recipient,
            actor_id: Uuid::nil(),
            action: "stage_changed".to_string(),
            entity_type: "lead".to_string(),
            entity_id: Uuid::nil(),
            entity_name: "Acme deal".to_string(),
            message: "Stage changed to Qualified".to_string(),
            url: "http://localhost:8080/leads/x".to_string(),
        }
    }

    #[tokio::test]
    async fn emit_succeeds_without_subscribers() {
        let emitter = BroadcastEmitter::new(4);
        assert!(emitter.emit(sample(Uuid::new_v4())).await.is_ok());
    }

    #[tokio::test]
    async fn emit_reaches_subscriber() {
        let emitter = BroadcastEmitter::new(4);
        let mut rx = emitter.subscribe();
        let recipient = Uuid::new_v4();
        emitter.emit(sample(recipient)).await.unwrap();
        let received = rx.recv().await.unwrap();
        assert_eq!(received.recipient_id, recipient);
    }
}
