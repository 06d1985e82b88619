//! Stateful view components rendered into the shared document.
//!
//! # Responsibility
//! - Own one document subtree per component.
//! - Turn bus events into targeted document updates.
//! - Turn UI events into entity client calls.
//!
//! # Invariants
//! - Client calls never touch the document; rendering follows bus events.
//! - Completions check mount state (and request recency) before rendering.
//! - The document is never borrowed across a bus publish or a callback.
//!
//! # See also
//! - `crate::context::AppContext` for the collaborators every component gets.

mod app_view;
mod menu;
mod nav_view;
mod overlay;
mod project_view;
mod tasks_table;
mod ui;

pub use app_view::{split_title, AppView, APP_TITLE, WELCOME_TEXT};
pub use menu::MenuComponent;
pub use nav_view::{NavView, ProjectNewInput};
pub use overlay::Overlays;
pub use project_view::ProjectView;
pub use tasks_table::{TaskRow, TasksDataTable, TASK_MENU_CLASS};
pub use ui::{Selector, UiEvent, UiEventKind, UiHandler, UiHandlerTable};

use crate::context::AppContext;
use crate::dom::NodeId;
use crate::event::{DomainEvent, HandlerResult, Subscription, Topic};
use std::cell::{Cell, RefCell};
use std::rc::Weak;

/// Explicit component lifecycle: mounted by a type-specific `mount`, then
/// driven by bus and UI events until `unmount`.
pub trait Component {
    fn root(&self) -> NodeId;

    /// Reacts to one bus event the component subscribed to.
    fn handle_event(&self, event: &DomainEvent) -> HandlerResult;

    /// Returns whether the event was handled by this component or a child.
    fn dispatch_ui(&self, event: &UiEvent) -> bool;

    /// Releases subscriptions and removes the subtree. Idempotent.
    fn unmount(&self);

    fn is_mounted(&self) -> bool;
}

/// Mount flag plus the bus subscriptions held while mounted.
#[derive(Default)]
pub struct Lifecycle {
    mounted: Cell<bool>,
    subscriptions: RefCell<Vec<Subscription>>,
}

impl Lifecycle {
    pub fn mark_mounted(&self) {
        self.mounted.set(true);
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted.get()
    }

    pub fn hold(&self, subscription: Subscription) {
        self.subscriptions.borrow_mut().push(subscription);
    }

    /// Drops every held subscription; returns `false` if already released.
    pub fn release(&self) -> bool {
        let was_mounted = self.mounted.replace(false);
        let released = std::mem::take(&mut *self.subscriptions.borrow_mut());
        drop(released);
        was_mounted
    }
}

/// Tags requests so only the latest one may render.
#[derive(Debug, Default)]
pub struct Latest(Cell<u64>);

impl Latest {
    pub fn next(&self) -> u64 {
        let tag = self.0.get() + 1;
        self.0.set(tag);
        tag
    }

    pub fn is_current(&self, tag: u64) -> bool {
        self.0.get() == tag
    }
}

/// Subscribes `component` to `topic` through a weak reference.
///
/// Events reaching a dropped or unmounted component are ignored.
pub fn listen<C>(ctx: &AppContext, component: &Weak<C>, topic: Topic) -> Subscription
where
    C: Component + 'static,
{
    let component = component.clone();
    ctx.bus().subscribe(topic, move |event| match component.upgrade() {
        Some(component) if component.is_mounted() => component.handle_event(event),
        _ => Ok(()),
    })
}

#[cfg(test)]
mod tests {
    use super::{Latest, Lifecycle};
    use crate::event::{Bus, DomainEvent, Topic};

    #[test]
    fn release_drops_subscriptions_once() {
        let bus = Bus::new();
        let lifecycle = Lifecycle::default();
        lifecycle.mark_mounted();
        lifecycle.hold(bus.subscribe(Topic::route_change(), |_| Ok(())));
        assert_eq!(bus.publish(&DomainEvent::RouteChange), 1);

        assert!(lifecycle.release());
        assert!(!lifecycle.release());
        assert!(!lifecycle.is_mounted());
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn only_the_latest_tag_is_current() {
        let latest = Latest::default();
        let first = latest.next();
        let second = latest.next();
        assert!(!latest.is_current(first));
        assert!(latest.is_current(second));
    }
}
