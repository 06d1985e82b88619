//! Flat client-side route state.
//!
//! # Responsibility
//! - Hold the single process-wide route record.
//! - Broadcast `Route/change` after every update.
//!
//! # Invariants
//! - `Route` only carries primitive optional fields, so a clone is a full
//!   defensive copy.
//! - Every `update_state` broadcasts, even when nothing changed; subscribers
//!   must be idempotent.

use crate::event::{Bus, DomainEvent};
use log::debug;
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Route {
    pub project_id: Option<String>,
}

/// Partial route update; unset fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoutePatch {
    project_id: Option<Option<String>>,
}

impl RoutePatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn project_id(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(Some(project_id.into()));
        self
    }

    pub fn clear_project_id(mut self) -> Self {
        self.project_id = Some(None);
        self
    }
}

impl Route {
    fn merge(&mut self, patch: RoutePatch) {
        if let Some(project_id) = patch.project_id {
            self.project_id = project_id;
        }
    }
}

#[derive(Clone)]
pub struct Router {
    current: Rc<RefCell<Route>>,
    bus: Bus,
}

impl Router {
    pub fn new(bus: Bus) -> Self {
        Self {
            current: Rc::new(RefCell::new(Route::default())),
            bus,
        }
    }

    /// Shallow-merges `patch` and broadcasts `Route/change`.
    pub fn update_state(&self, patch: RoutePatch) {
        self.current.borrow_mut().merge(patch);
        debug!(
            "event=route_update module=router status=ok has_project={}",
            self.current.borrow().project_id.is_some()
        );
        self.bus.publish(&DomainEvent::RouteChange);
    }

    /// Returns a copy of the current route.
    pub fn get_current(&self) -> Route {
        self.current.borrow().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::{Route, RoutePatch, Router};
    use crate::event::{Bus, Topic};
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn update_merges_and_always_broadcasts() {
        let bus = Bus::new();
        let router = Router::new(bus.clone());
        let changes = Rc::new(RefCell::new(Vec::new()));
        let observer = router.clone();
        let sink = changes.clone();
        let _sub = bus.subscribe(Topic::route_change(), move |_| {
            sink.borrow_mut().push(observer.get_current());
            Ok(())
        });

        router.update_state(RoutePatch::new().project_id("p1"));
        router.update_state(RoutePatch::new());
        router.update_state(RoutePatch::new().project_id("p2"));
        router.update_state(RoutePatch::new().clear_project_id());

        let expected = [Some("p1"), Some("p1"), Some("p2"), None]
            .into_iter()
            .map(|id| Route {
                project_id: id.map(str::to_string),
            })
            .collect::<Vec<_>>();
        assert_eq!(*changes.borrow(), expected);
    }

    #[test]
    fn get_current_returns_independent_copies() {
        let router = Router::new(Bus::new());
        router.update_state(RoutePatch::new().project_id("p1"));

        let mut first = router.get_current();
        first.project_id = Some("tampered".to_string());
        let second = router.get_current();

        assert_eq!(second.project_id.as_deref(), Some("p1"));
        assert_ne!(first, second);
    }
}
