use crate::dom::{Document, DomHandle, NodeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UiEventKind {
    PointerDown,
    PointerUp,
    KeyDown,
    /// Committed value change of an input or check element.
    Change,
}

/// User interaction aimed at one element of the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiEvent {
    pub kind: UiEventKind,
    pub target: NodeId,
    /// Key name for [`UiEventKind::KeyDown`].
    pub key: Option<String>,
}

impl UiEvent {
    pub fn pointer_down(target: NodeId) -> Self {
        Self::new(UiEventKind::PointerDown, target)
    }

    pub fn pointer_up(target: NodeId) -> Self {
        Self::new(UiEventKind::PointerUp, target)
    }

    pub fn change(target: NodeId) -> Self {
        Self::new(UiEventKind::Change, target)
    }

    pub fn key_down(target: NodeId, key: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
            ..Self::new(UiEventKind::KeyDown, target)
        }
    }

    fn new(kind: UiEventKind, target: NodeId) -> Self {
        Self {
            kind,
            target,
            key: None,
        }
    }
}

/// Element predicate used by handler tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selector {
    Any,
    Tag(&'static str),
    TagWithClass(&'static str, &'static str),
    /// Tag carrying the named attribute, whatever its value.
    TagWithAttr(&'static str, &'static str),
}

impl Selector {
    pub fn matches(&self, doc: &Document, id: NodeId) -> bool {
        match *self {
            Self::Any => true,
            Self::Tag(tag) => doc.tag(id) == Some(tag),
            Self::TagWithClass(tag, class) => doc.tag(id) == Some(tag) && doc.has_class(id, class),
            Self::TagWithAttr(tag, attr) => {
                doc.tag(id) == Some(tag) && doc.attr(id, attr).is_some()
            }
        }
    }
}

/// Handler receiving the component, the event and the matched element.
pub type UiHandler<C> = fn(&C, &UiEvent, NodeId);

/// Ordered `(kind, selector) -> handler` rules of one component.
///
/// Rules are evaluated in registration order; the first rule whose kind
/// matches and whose selector matches the target (or one of its ancestors up
/// to the component root) handles the event.
pub struct UiHandlerTable<C> {
    rules: Vec<(UiEventKind, Selector, UiHandler<C>)>,
}

impl<C> Default for UiHandlerTable<C> {
    fn default() -> Self {
        Self { rules: Vec::new() }
    }
}

impl<C> UiHandlerTable<C> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(mut self, kind: UiEventKind, selector: Selector, handler: UiHandler<C>) -> Self {
        self.rules.push((kind, selector, handler));
        self
    }

    /// Returns whether a rule handled `event`.
    ///
    /// The document is not borrowed while the handler runs.
    pub fn dispatch(&self, component: &C, doc: &DomHandle, root: NodeId, event: &UiEvent) -> bool {
        if !doc.borrow().is_within(event.target, root) {
            return false;
        }
        for (kind, selector, handler) in &self.rules {
            if *kind != event.kind {
                continue;
            }
            let matched = doc
                .borrow()
                .closest(event.target, root, |doc, id| selector.matches(doc, id));
            if let Some(node) = matched {
                handler(component, event, node);
                return true;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::{Selector, UiEvent, UiEventKind, UiHandlerTable};
    use crate::dom::{Document, NodeId};
    use std::cell::RefCell;

    #[derive(Default)]
    struct Recorder {
        hits: RefCell<Vec<(&'static str, NodeId)>>,
    }

    fn on_item(recorder: &Recorder, _: &UiEvent, node: NodeId) {
        recorder.hits.borrow_mut().push(("item", node));
    }

    fn on_any(recorder: &Recorder, _: &UiEvent, node: NodeId) {
        recorder.hits.borrow_mut().push(("any", node));
    }

    #[test]
    fn first_matching_rule_wins_and_matches_ancestors() {
        let doc = Document::shared();
        let (root, item, label, outside) = {
            let mut doc = doc.borrow_mut();
            let root = doc.create_element("menu-c");
            let item = doc.create_element("li");
            let label = doc.create_text_element("label", "Delete");
            let outside = doc.create_element("div");
            let body = doc.body();
            doc.append_child(body, root);
            doc.append_child(body, outside);
            doc.append_child(root, item);
            doc.append_child(item, label);
            doc.set_attr(item, "data-key", "delete");
            (root, item, label, outside)
        };
        let table = UiHandlerTable::<Recorder>::new()
            .on(UiEventKind::PointerUp, Selector::TagWithAttr("li", "data-key"), on_item)
            .on(UiEventKind::PointerUp, Selector::Any, on_any);
        let recorder = Recorder::default();

        assert!(table.dispatch(&recorder, &doc, root, &UiEvent::pointer_up(label)));
        assert!(table.dispatch(&recorder, &doc, root, &UiEvent::pointer_up(root)));
        assert!(!table.dispatch(&recorder, &doc, root, &UiEvent::pointer_down(label)));
        assert!(!table.dispatch(&recorder, &doc, root, &UiEvent::pointer_up(outside)));

        assert_eq!(*recorder.hits.borrow(), vec![("item", item), ("any", root)]);
    }
}
