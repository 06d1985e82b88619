//! Domain events and the in-process publish/subscribe bus.
//!
//! # Responsibility
//! - Type host-pushed hub events at the bus boundary.
//! - Route events to subscribers by hub, topic and optional label.
//!
//! # Invariants
//! - Events are delivered in arrival order, synchronously, never batched.
//! - Neither the bridge nor the bus raises errors to the event source.

mod bridge;
mod bus;
mod domain;

pub use bridge::HubEventBridge;
pub use bus::{Bus, HandlerResult, Subscription, Topic};
pub use domain::{
    DomainEvent, EventError, HubEvent, ModelAction, ModelEvent, MODEL_HUB, ROUTE_CHANGE_TOPIC,
    ROUTE_HUB,
};
