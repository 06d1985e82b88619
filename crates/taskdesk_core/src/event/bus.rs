use super::domain::{DomainEvent, ModelAction, MODEL_HUB, ROUTE_CHANGE_TOPIC, ROUTE_HUB};
use crate::model::EntityKind;
use log::{error, warn};
use std::cell::{Cell, RefCell};
use std::error::Error;
use std::panic::{self, AssertUnwindSafe};
use std::rc::{Rc, Weak};

/// Outcome of one handler call. Errors are logged by the bus, never raised.
pub type HandlerResult = Result<(), Box<dyn Error>>;

type Handler = Box<dyn Fn(&DomainEvent) -> HandlerResult>;

/// Subscription key: hub + topic, optionally narrowed to one label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topic {
    hub: String,
    topic: String,
    label: Option<String>,
}

impl Topic {
    pub fn new(hub: impl Into<String>, topic: impl Into<String>) -> Self {
        Self {
            hub: hub.into(),
            topic: topic.into(),
            label: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// `Model/<action>` narrowed to one entity label.
    pub fn model(action: ModelAction, entity: EntityKind) -> Self {
        Self::new(MODEL_HUB, action.as_str()).with_label(entity.as_str())
    }

    pub fn route_change() -> Self {
        Self::new(ROUTE_HUB, ROUTE_CHANGE_TOPIC)
    }

    /// Unlabeled keys match every label of their hub/topic.
    pub fn matches(&self, event: &DomainEvent) -> bool {
        if self.hub != event.hub() || self.topic != event.topic() {
            return false;
        }
        match &self.label {
            Some(label) => event.label() == Some(label.as_str()),
            None => true,
        }
    }
}

struct Entry {
    id: u64,
    topic: Topic,
    handler: Handler,
    running: Cell<bool>,
}

#[derive(Default)]
struct BusState {
    next_id: u64,
    entries: Vec<Rc<Entry>>,
}

/// In-process publish/subscribe bus with named hubs.
///
/// # Invariants
/// - Delivery is synchronous and follows registration order.
/// - A failing or panicking handler never stops delivery to the others.
/// - A handler is never re-entered by a nested publish.
/// - A released subscription never fires again, even mid-delivery.
#[derive(Clone, Default)]
pub struct Bus {
    state: Rc<RefCell<BusState>>,
}

impl Bus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `topic`; dropping the returned guard releases it.
    #[must_use = "dropping the subscription releases the handler immediately"]
    pub fn subscribe<F>(&self, topic: Topic, handler: F) -> Subscription
    where
        F: Fn(&DomainEvent) -> HandlerResult + 'static,
    {
        let mut state = self.state.borrow_mut();
        state.next_id += 1;
        let id = state.next_id;
        state.entries.push(Rc::new(Entry {
            id,
            topic,
            handler: Box::new(handler),
            running: Cell::new(false),
        }));

        Subscription {
            id,
            state: Rc::downgrade(&self.state),
        }
    }

    /// Delivers `event` to every matching subscription.
    ///
    /// Returns how many handlers ran (including the ones that failed).
    pub fn publish(&self, event: &DomainEvent) -> usize {
        let targets = self
            .state
            .borrow()
            .entries
            .iter()
            .filter(|entry| entry.topic.matches(event))
            .cloned()
            .collect::<Vec<_>>();

        let mut delivered = 0;
        for entry in targets {
            if !self.is_registered(entry.id) {
                continue;
            }
            if entry.running.get() {
                warn!(
                    "event=bus_publish module=event status=skipped reason=reentrant hub={} topic={} subscription={}",
                    event.hub(),
                    event.topic(),
                    entry.id
                );
                continue;
            }

            entry.running.set(true);
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| (entry.handler)(event)));
            entry.running.set(false);
            delivered += 1;

            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(err)) => warn!(
                    "event=bus_publish module=event status=handler_error hub={} topic={} subscription={} error={}",
                    event.hub(),
                    event.topic(),
                    entry.id,
                    err
                ),
                Err(_) => error!(
                    "event=bus_publish module=event status=handler_panic hub={} topic={} subscription={}",
                    event.hub(),
                    event.topic(),
                    entry.id
                ),
            }
        }

        delivered
    }

    pub fn subscriber_count(&self) -> usize {
        self.state.borrow().entries.len()
    }

    /// Releases every subscription at once.
    pub fn clear(&self) {
        let released = std::mem::take(&mut self.state.borrow_mut().entries);
        // Handlers may own component state whose drop releases more guards.
        drop(released);
    }

    fn is_registered(&self, id: u64) -> bool {
        self.state.borrow().entries.iter().any(|entry| entry.id == id)
    }
}

/// RAII guard for one bus registration.
pub struct Subscription {
    id: u64,
    state: Weak<RefCell<BusState>>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_active(&self) -> bool {
        self.state
            .upgrade()
            .is_some_and(|state| state.borrow().entries.iter().any(|entry| entry.id == self.id))
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let Some(state) = self.state.upgrade() else {
            return;
        };
        let removed = {
            let Ok(mut state) = state.try_borrow_mut() else {
                return;
            };
            state
                .entries
                .iter()
                .position(|entry| entry.id == self.id)
                .map(|index| state.entries.remove(index))
        };
        drop(removed);
    }
}
