use super::bus::Bus;
use super::domain::{DomainEvent, EventError, HubEvent};
use log::{debug, warn};

/// Republishes host-pushed events on the in-process bus.
///
/// Fire-and-forget: nothing is sent back to the host and nothing is buffered.
#[derive(Clone)]
pub struct HubEventBridge {
    bus: Bus,
}

impl HubEventBridge {
    pub fn new(bus: Bus) -> Self {
        Self { bus }
    }

    /// Publishes one host event; returns how many handlers ran.
    ///
    /// Events failing validation are logged and dropped.
    pub fn deliver(&self, event: HubEvent) -> usize {
        let hub = event.hub.clone();
        let topic = event.topic.clone();

        match DomainEvent::from_hub_event(event) {
            Ok(domain_event) => {
                let delivered = self.bus.publish(&domain_event);
                debug!(
                    "event=hub_event module=event status=ok hub={} topic={} label={} handlers={}",
                    hub,
                    topic,
                    domain_event.label().unwrap_or("-"),
                    delivered
                );
                delivered
            }
            Err(err) => {
                warn!(
                    "event=hub_event module=event status=dropped hub={} topic={} error={}",
                    hub, topic, err
                );
                0
            }
        }
    }

    /// Parses and publishes one raw JSON host event.
    pub fn deliver_json(&self, payload: &str) -> usize {
        match serde_json::from_str::<HubEvent>(payload).map_err(EventError::from) {
            Ok(event) => self.deliver(event),
            Err(err) => {
                warn!("event=hub_event module=event status=dropped error={err}");
                0
            }
        }
    }
}
