use serde::Serialize;
use tokio::sync::broadcast;

use crate::models::NewLeadSummary;

const EVENT_BUFFER: usize = 64;

/// Outbound notifications for whoever is listening (a UI, the stdio bridge).
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MonitorEvent {
    NewLeadsDetected {
        count: usize,
        leads: Vec<NewLeadSummary>,
    },
    #[serde(rename_all = "camelCase")]
    PauseChanged { active: bool, remaining_ms: u64 },
}

#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<MonitorEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(EVENT_BUFFER);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> {
        self.tx.subscribe()
    }

    /// Fire and forget. Having nobody listening is not an error.
    pub fn emit(&self, event: MonitorEvent) {
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn emit_without_listeners_is_silent() {
        EventBus::new().emit(MonitorEvent::PauseChanged {
            active: false,
            remaining_ms: 0,
        });
    }

    #[tokio::test]
    async fn new_leads_event_wire_shape() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();
        bus.emit(MonitorEvent::NewLeadsDetected {
            count: 1,
            leads: vec![NewLeadSummary {
                id: "L1".into(),
                customer_name: "Sam".into(),
                location: "Parramatta".into(),
                status: "Available".into(),
            }],
        });

        let event = rx.recv().await.unwrap();
        assert_eq!(
            serde_json::to_value(event).unwrap(),
            json!({
                "type": "NEW_LEADS_DETECTED",
                "count": 1,
                "leads": [{
                    "id": "L1",
                    "customerName": "Sam",
                    "location": "Parramatta",
                    "status": "Available",
                }],
            })
        );
    }

    #[test]
    fn pause_event_uses_camel_case_fields() {
        let value = serde_json::to_value(MonitorEvent::PauseChanged {
            active: true,
            remaining_ms: 1500,
        })
        .unwrap();
        assert_eq!(value, json!({"type": "PAUSE_CHANGED", "active": true, "remainingMs": 1500}));
    }
}
