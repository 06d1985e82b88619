use super::{Component, UiEvent, UiEventKind};
use crate::dom::{DomHandle, NodeId};
use std::cell::RefCell;
use std::rc::Rc;

/// Components floating above the tree (menus).
///
/// Overlays are offered UI events before the tree. A pointer-up outside an
/// overlay dismisses it only after the tree has seen the event.
#[derive(Clone, Default)]
pub struct Overlays {
    open: Rc<RefCell<Vec<Rc<dyn Component>>>>,
}

impl Overlays {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&self, overlay: Rc<dyn Component>) {
        self.open.borrow_mut().push(overlay);
    }

    /// Forgets the overlay rooted at `root`; does not unmount it.
    pub fn close(&self, root: NodeId) {
        let removed = {
            let mut open = self.open.borrow_mut();
            let index = open.iter().position(|overlay| overlay.root() == root);
            index.map(|index| open.remove(index))
        };
        drop(removed);
    }

    pub fn len(&self) -> usize {
        self.open.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Currently open overlays, oldest first.
    pub fn snapshot(&self) -> Vec<Rc<dyn Component>> {
        self.open.borrow().clone()
    }

    /// Offers `event` to every open overlay, oldest first.
    pub fn dispatch(&self, event: &UiEvent) -> bool {
        self.snapshot()
            .iter()
            .any(|overlay| overlay.dispatch_ui(event))
    }

    /// Unmounts the overlays of `open` that a pointer-up `event` landed
    /// outside of; returns how many closed.
    pub fn dismiss_outside(open: &[Rc<dyn Component>], doc: &DomHandle, event: &UiEvent) -> usize {
        if event.kind != UiEventKind::PointerUp {
            return 0;
        }
        let outside = open
            .iter()
            .filter(|overlay| overlay.is_mounted())
            .filter(|overlay| !doc.borrow().is_within(event.target, overlay.root()))
            .cloned()
            .collect::<Vec<_>>();
        for overlay in &outside {
            overlay.unmount();
        }
        outside.len()
    }

    pub fn close_all(&self) {
        let open = std::mem::take(&mut *self.open.borrow_mut());
        for overlay in open {
            overlay.unmount();
        }
    }
}
