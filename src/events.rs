use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;

pub const AVAILABILITY_CREATED: &str = "availability:created";
pub const AVAILABILITY_DELETED: &str = "availability:deleted";
pub const BOOKING_CREATED: &str = "booking:created";
pub const BOOKING_UPDATED: &str = "booking:updated";

/// A committed state change, carrying the affected record as JSON.
#[derive(Clone, Debug)]
pub struct DomainEvent {
    pub name: &'static str,
    pub payload: Value,
}

impl DomainEvent {
    pub fn new<T: Serialize>(name: &'static str, record: &T) -> Self {
        Self {
            name,
            payload: serde_json::to_value(record).unwrap_or(Value::Null),
        }
    }
}

/// Broadcast bus fanning committed changes out to every connected observer.
/// Events are not retained; late subscribers start from a fresh fetch.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<DomainEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.sender.subscribe()
    }

    pub fn publish(&self, event: DomainEvent) {
        tracing::debug!(event = event.name, "publishing event");
        // No receivers is fine
        let _ = self.sender.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fan_out_to_all_subscribers() {
        let bus = EventBus::new(8);
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();

        bus.publish(DomainEvent::new(BOOKING_CREATED, &serde_json::json!({"id": 1})));

        assert_eq!(a.recv().await.unwrap().name, BOOKING_CREATED);
        let event = b.recv().await.unwrap();
        assert_eq!(event.payload["id"], 1);
    }

    #[tokio::test]
    async fn test_late_subscriber_misses_earlier_events() {
        let bus = EventBus::new(8);
        bus.publish(DomainEvent::new(AVAILABILITY_CREATED, &serde_json::json!({"id": 1})));

        let mut late = bus.subscribe();
        bus.publish(DomainEvent::new(AVAILABILITY_DELETED, &serde_json::json!({"id": 1})));

        assert_eq!(late.recv().await.unwrap().name, AVAILABILITY_DELETED);
        assert!(late.try_recv().is_err());
    }

    #[test]
    fn test_publish_without_subscribers() {
        let bus = EventBus::new(1);
        bus.publish(DomainEvent::new(BOOKING_UPDATED, &serde_json::json!({})));
    }
}
