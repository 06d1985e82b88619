//! In-memory element tree the views render into.
//!
//! # Responsibility
//! - Own element nodes (tag, classes, attributes, text, children).
//! - Offer the small query/mutation surface the views need.
//!
//! # Invariants
//! - `NodeId`s are never reused; a removed node stays unknown forever.
//! - Operations on unknown nodes are no-ops, never panics.
//! - Removing a node destroys its whole subtree.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::fmt::Write;
use std::rc::Rc;

/// Shared handle used by every component of one application.
pub type DomHandle = Rc<RefCell<Document>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

#[derive(Debug, Clone, Default)]
struct Node {
    tag: String,
    classes: Vec<String>,
    attrs: BTreeMap<String, String>,
    text: String,
    children: Vec<NodeId>,
    parent: Option<NodeId>,
}

#[derive(Debug)]
pub struct Document {
    nodes: HashMap<NodeId, Node>,
    next_id: u64,
    body: NodeId,
    focused: Option<NodeId>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        let body = NodeId(0);
        let mut nodes = HashMap::new();
        nodes.insert(
            body,
            Node {
                tag: "body".to_string(),
                ..Node::default()
            },
        );
        Self {
            nodes,
            next_id: 1,
            body,
            focused: None,
        }
    }

    pub fn shared() -> DomHandle {
        Rc::new(RefCell::new(Self::new()))
    }

    pub fn body(&self) -> NodeId {
        self.body
    }

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(
            id,
            Node {
                tag: tag.to_string(),
                ..Node::default()
            },
        );
        id
    }

    /// Creates `tag` with `text` content.
    pub fn create_text_element(&mut self, tag: &str, text: &str) -> NodeId {
        let id = self.create_element(tag);
        self.set_text(id, text);
        id
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Whether `id` is attached under the body.
    pub fn is_connected(&self, id: NodeId) -> bool {
        self.is_within(id, self.body)
    }

    /// Whether `id` is `ancestor` or one of its descendants.
    pub fn is_within(&self, id: NodeId, ancestor: NodeId) -> bool {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            if current == ancestor {
                return self.contains(current);
            }
            cursor = self.nodes.get(&current).and_then(|node| node.parent);
        }
        false
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.nodes.get(&id).map(|node| node.tag.as_str())
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(&id).and_then(|node| node.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(&id)
            .map(|node| node.children.as_slice())
            .unwrap_or(&[])
    }

    /// Appends `child` as last child of `parent`, detaching it first.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.insert_child(parent, child, None);
    }

    pub fn prepend_child(&mut self, parent: NodeId, child: NodeId) {
        self.insert_child(parent, child, Some(0));
    }

    /// Replaces the children of `parent`; previous children not listed in
    /// `children` are destroyed.
    pub fn replace_children(&mut self, parent: NodeId, children: Vec<NodeId>) {
        if !self.contains(parent) {
            return;
        }
        let previous = self
            .nodes
            .get_mut(&parent)
            .map(|node| std::mem::take(&mut node.children))
            .unwrap_or_default();
        for old in previous {
            if let Some(node) = self.nodes.get_mut(&old) {
                node.parent = None;
            }
            if !children.contains(&old) {
                self.destroy(old);
            }
        }
        if let Some(node) = self.nodes.get_mut(&parent) {
            node.text.clear();
        }
        for child in children {
            self.append_child(parent, child);
        }
    }

    /// Detaches and destroys `id` with its subtree. Returns `false` when the
    /// node is already gone.
    pub fn remove(&mut self, id: NodeId) -> bool {
        if !self.contains(id) || id == self.body {
            return false;
        }
        self.detach(id);
        self.destroy(id);
        true
    }

    /// Sets text content, destroying any children.
    pub fn set_text(&mut self, id: NodeId, text: &str) {
        if !self.contains(id) {
            return;
        }
        let children = self
            .nodes
            .get_mut(&id)
            .map(|node| std::mem::take(&mut node.children))
            .unwrap_or_default();
        for child in children {
            self.destroy(child);
        }
        if let Some(node) = self.nodes.get_mut(&id) {
            node.text = text.to_string();
        }
    }

    /// Concatenated text of `id` and its descendants.
    pub fn text(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    pub fn add_class(&mut self, id: NodeId, class: &str) {
        if let Some(node) = self.nodes.get_mut(&id) {
            if !node.classes.iter().any(|value| value == class) {
                node.classes.push(class.to_string());
            }
        }
    }

    pub fn remove_class(&mut self, id: NodeId, class: &str) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.classes.retain(|value| value != class);
        }
    }

    /// Toggles `class`; returns whether it is now present.
    pub fn toggle_class(&mut self, id: NodeId, class: &str) -> bool {
        if self.has_class(id, class) {
            self.remove_class(id, class);
            false
        } else {
            self.add_class(id, class);
            self.has_class(id, class)
        }
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.nodes
            .get(&id)
            .is_some_and(|node| node.classes.iter().any(|value| value == class))
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.attrs.insert(name.to_string(), value.to_string());
        }
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.attrs.remove(name);
        }
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.nodes
            .get(&id)
            .and_then(|node| node.attrs.get(name))
            .map(String::as_str)
    }

    /// Descendants of `root` in document order, `root` excluded.
    pub fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = self.children(root).iter().rev().copied().collect::<Vec<_>>();
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.children(id).iter().rev().copied());
        }
        out
    }

    /// Descendants of `root` with tag `tag` and attribute `name == value`.
    pub fn find_by_attr(&self, root: NodeId, tag: &str, name: &str, value: &str) -> Vec<NodeId> {
        self.descendants(root)
            .into_iter()
            .filter(|id| self.tag(*id) == Some(tag) && self.attr(*id, name) == Some(value))
            .collect()
    }

    /// First descendant of `root` with tag `tag` and, if given, class `class`.
    pub fn first(&self, root: NodeId, tag: &str, class: Option<&str>) -> Option<NodeId> {
        self.descendants(root).into_iter().find(|id| {
            self.tag(*id) == Some(tag) && class.map_or(true, |class| self.has_class(*id, class))
        })
    }

    /// `from` or its closest ancestor, stopping at `boundary`, matching `predicate`.
    pub fn closest(
        &self,
        from: NodeId,
        boundary: NodeId,
        predicate: impl Fn(&Self, NodeId) -> bool,
    ) -> Option<NodeId> {
        let mut cursor = Some(from);
        while let Some(current) = cursor {
            if !self.contains(current) {
                return None;
            }
            if predicate(self, current) {
                return Some(current);
            }
            if current == boundary {
                return None;
            }
            cursor = self.parent(current);
        }
        None
    }

    pub fn focus(&mut self, id: NodeId) {
        if self.is_connected(id) {
            self.focused = Some(id);
        }
    }

    pub fn focused(&self) -> Option<NodeId> {
        self.focused.filter(|id| self.contains(*id))
    }

    /// Debug markup of `id` and its subtree.
    pub fn render(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.render_into(id, &mut out);
        out
    }

    fn insert_child(&mut self, parent: NodeId, child: NodeId, index: Option<usize>) {
        if !self.contains(parent) || !self.contains(child) || self.is_within(parent, child) {
            return;
        }
        self.detach(child);
        if let Some(node) = self.nodes.get_mut(&child) {
            node.parent = Some(parent);
        }
        if let Some(node) = self.nodes.get_mut(&parent) {
            match index {
                Some(index) => node.children.insert(index.min(node.children.len()), child),
                None => node.children.push(child),
            }
        }
    }

    fn detach(&mut self, id: NodeId) {
        let parent = self.nodes.get_mut(&id).and_then(|node| node.parent.take());
        if let Some(parent) = parent.and_then(|parent| self.nodes.get_mut(&parent)) {
            parent.children.retain(|child| *child != id);
        }
    }

    fn destroy(&mut self, id: NodeId) {
        let Some(node) = self.nodes.remove(&id) else {
            return;
        };
        if self.focused == Some(id) {
            self.focused = None;
        }
        for child in node.children {
            self.destroy(child);
        }
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.nodes.get(&id) else {
            return;
        };
        out.push_str(&node.text);
        for child in &node.children {
            self.collect_text(*child, out);
        }
    }

    fn render_into(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.nodes.get(&id) else {
            return;
        };
        let _ = write!(out, "<{}", node.tag);
        if !node.classes.is_empty() {
            let _ = write!(out, " class=\"{}\"", node.classes.join(" "));
        }
        for (name, value) in &node.attrs {
            let _ = write!(out, " {name}=\"{value}\"");
        }
        out.push('>');
        out.push_str(&node.text);
        for child in &node.children {
            self.render_into(*child, out);
        }
        let _ = write!(out, "</{}>", node.tag);
    }
}
