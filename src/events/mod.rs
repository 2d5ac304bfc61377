use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Domain events published by the services
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    CartUpdated {
        user_id: Uuid,
        order_id: Uuid,
        item_id: Uuid,
    },
    CheckoutCompleted {
        order_id: Uuid,
        checkout_address_id: Uuid,
    },
    OrderPlaced {
        order_id: Uuid,
        payment_id: Uuid,
    },
    PaymentRecorded {
        payment_id: Uuid,
        tx_ref: String,
        amount: Decimal,
    },
    PaymentFailed {
        user_id: Uuid,
        reason: String,
    },
    OrderStatusChanged {
        order_id: Uuid,
        old_status: String,
        new_status: String,
    },
    ItemSaved(Uuid),
    ArticlePublished(Uuid),
    CommentAdded {
        article_id: Uuid,
        comment_id: Uuid,
    },
}

impl Event {
    /// Events that change what the latest-orders snapshot shows
    pub fn affects_order_feed(&self) -> bool {
        matches!(
            self,
            Event::OrderPlaced { .. } | Event::OrderStatusChanged { .. }
        )
    }
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Creates a sender together with the receiving end for [`process_events`]
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Event>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx), rx)
    }

    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends and logs on failure; delivery problems never fail the caller
    pub async fn publish(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!(error = %e, "event dropped");
        }
    }
}

#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle_event(&self, event: &Event) -> Result<(), String>;
}

/// Drains the event channel, handing every event to each handler in turn
pub async fn process_events(mut rx: mpsc::Receiver<Event>, handlers: Vec<Arc<dyn EventHandler>>) {
    info!(handlers = handlers.len(), "Starting event processing loop");

    while let Some(event) = rx.recv().await {
        debug!(?event, "Received event");

        match &event {
            Event::PaymentFailed { user_id, reason } => {
                warn!(%user_id, %reason, "Payment failed");
            }
            Event::OrderPlaced { order_id, payment_id } => {
                info!(%order_id, %payment_id, "Order placed");
            }
            _ => {}
        }

        for handler in &handlers {
            if let Err(e) = handler.handle_event(&event).await {
                error!(?event, error = %e, "Event handler failed");
            }
        }
    }

    warn!("Event processing loop has ended");
}

/// Broadcast of serialized snapshots for push subscribers on one topic
#[derive(Debug, Clone)]
pub struct Feed {
    topic: &'static str,
    sender: broadcast::Sender<Arc<serde_json::Value>>,
}

impl Feed {
    pub fn new(topic: &'static str, capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { topic, sender }
    }

    pub fn topic(&self) -> &'static str {
        self.topic
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<serde_json::Value>> {
        self.sender.subscribe()
    }

    /// Returns the number of subscribers reached; zero when nobody listens
    pub fn publish(&self, snapshot: serde_json::Value) -> usize {
        self.sender.send(Arc::new(snapshot)).unwrap_or(0)
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<Event>>);

    #[async_trait]
    impl EventHandler for Recorder {
        async fn handle_event(&self, event: &Event) -> Result<(), String> {
            self.0.lock().unwrap().push(event.clone());
            Ok(())
        }
    }

    #[tokio::test]
    async fn events_reach_every_handler() {
        let (sender, rx) = EventSender::channel(8);
        let recorder = Arc::new(Recorder::default());
        let task = tokio::spawn(process_events(rx, vec![recorder.clone()]));

        sender.publish(Event::ItemSaved(Uuid::nil())).await;
        drop(sender);
        task.await.unwrap();

        assert_eq!(recorder.0.lock().unwrap().as_slice(), &[Event::ItemSaved(Uuid::nil())]);
    }

    #[tokio::test]
    async fn feed_without_subscribers_drops_snapshot() {
        let feed = Feed::new("orders", 4);
        assert_eq!(feed.publish(serde_json::json!([])), 0);

        let mut rx = feed.subscribe();
        assert_eq!(feed.publish(serde_json::json!([1])), 1);
        assert_eq!(*rx.recv().await.unwrap(), serde_json::json!([1]));
    }

    #[test]
    fn only_order_events_refresh_the_feed() {
        assert!(Event::OrderStatusChanged {
            order_id: Uuid::nil(),
            old_status: "1".into(),
            new_status: "2".into(),
        }
        .affects_order_feed());
        assert!(!Event::ItemSaved(Uuid::nil()).affects_order_feed());
    }
}
