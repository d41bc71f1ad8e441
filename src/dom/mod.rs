//! In-memory host tree the views mount into.
//!
//! Nodes live in an arena keyed by [`NodeId`]. A node created from
//! [`Markup`] starts detached; views insert, swap and remove nodes through
//! the helpers in [`render`]. Listeners are stored per node, so freeing a
//! node (see [`HostTree::discard`]) drops every registration it carried.

mod markup;
mod picker;
mod render;

use std::collections::HashMap;

use chrono::NaiveDateTime;
use tracing::trace;

use crate::view::{Handler, ViewKey};

pub use markup::{ButtonRole, Markup, Tag, TextStyle};
pub use picker::{format_picker_date, parse_picker_date, DatePickerOptions, PickerId, DATE_FORMAT};
pub use render::{remove, render, replace, RenderPosition};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventKind {
    Change,
    Input,
    Submit,
    Reset,
    Click,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HostKey {
    Escape,
    Other,
}

/// Which view handles a delivery, and with which handler.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ListenerTarget {
    pub view: ViewKey,
    pub handler: Handler,
}

impl ListenerTarget {
    pub fn new(view: ViewKey, handler: Handler) -> Self {
        Self { view, handler }
    }
}

/// Snapshot of the dispatching node taken when the event fires.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InputEvent {
    pub kind: EventKind,
    pub target: NodeId,
    pub value: String,
    pub checked: bool,
    pub date: Option<NaiveDateTime>,
    pub key: Option<HostKey>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Delivery {
    pub target: ListenerTarget,
    pub event: InputEvent,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Subscription(u64);

#[derive(Clone, Copy, Debug)]
struct Listener {
    kind: EventKind,
    target: ListenerTarget,
}

#[derive(Debug)]
pub struct Node {
    pub tag: Tag,
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub name: Option<String>,
    pub value: String,
    pub label: String,
    pub checked: bool,
    pub disabled: bool,
    pub style: TextStyle,
    validity: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    pub fn validity(&self) -> Option<&str> {
        if self.validity.is_empty() {
            None
        } else {
            Some(&self.validity)
        }
    }
}

#[derive(Default)]
pub struct HostTree {
    nodes: HashMap<NodeId, Node>,
    listeners: HashMap<NodeId, Vec<Listener>>,
    document_listeners: Vec<(Subscription, ListenerTarget)>,
    pickers: HashMap<PickerId, picker::DatePicker>,
    next_id: u64,
    reported: Option<String>,
}

impl HostTree {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    /// Builds a detached node (and its subtree) from markup.
    pub fn create_element(&mut self, markup: Markup) -> NodeId {
        let id = NodeId(self.allocate());
        let Markup {
            tag,
            id: element_id,
            classes,
            name,
            value,
            label,
            checked,
            disabled,
            style,
            children,
        } = markup;

        self.nodes.insert(
            id,
            Node {
                tag,
                id: element_id,
                classes,
                name,
                value,
                label,
                checked,
                disabled,
                style,
                validity: String::new(),
                parent: None,
                children: Vec::new(),
            },
        );

        let child_ids: Vec<NodeId> = children
            .into_iter()
            .map(|child| self.create_element(child))
            .collect();
        for child in &child_ids {
            self.node_mut(*child).parent = Some(id);
        }
        self.node_mut(id).children = child_ids;
        id
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        match self.nodes.get_mut(&id) {
            Some(node) => node,
            None => panic!("host node {id:?} was already discarded"),
        }
    }

    pub fn is_alive(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(&id).and_then(|node| node.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(&id)
            .map_or(&[], |node| node.children.as_slice())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn insert(&mut self, container: NodeId, node: NodeId, position: RenderPosition) {
        self.detach(node);
        let children = &mut self.node_mut(container).children;
        match position {
            RenderPosition::AfterBegin => children.insert(0, node),
            RenderPosition::BeforeEnd => children.push(node),
        }
        self.node_mut(node).parent = Some(container);
    }

    /// Unlinks `node` from its parent. The node stays alive.
    pub fn detach(&mut self, node: NodeId) {
        let Some(parent) = self.node_mut(node).parent.take() else {
            return;
        };
        self.node_mut(parent).children.retain(|child| *child != node);
    }

    /// Puts `new` where `old` sits. `old` is detached but stays alive.
    ///
    /// # Panics
    ///
    /// When `old` is not mounted anywhere.
    pub fn replace_node(&mut self, new: NodeId, old: NodeId) {
        let Some(parent) = self.parent(old) else {
            panic!("can't replace host node {old:?}: it is not mounted");
        };
        self.detach(new);
        let children = &mut self.node_mut(parent).children;
        if let Some(slot) = children.iter_mut().find(|child| **child == old) {
            *slot = new;
        }
        self.node_mut(old).parent = None;
        self.node_mut(new).parent = Some(parent);
    }

    /// Detaches and frees a subtree along with its listeners.
    ///
    /// # Panics
    ///
    /// When a live date picker is still bound to a node of the subtree.
    pub fn discard(&mut self, node: NodeId) {
        if !self.is_alive(node) {
            return;
        }
        self.detach(node);
        let doomed = self.descendants(node);
        if let Some((picker, _)) = self
            .pickers
            .iter()
            .find(|(_, picker)| doomed.contains(&picker.input))
        {
            panic!("discarding host node {node:?} while date picker {picker:?} is still attached");
        }
        for id in &doomed {
            self.nodes.remove(id);
            self.listeners.remove(id);
        }
        trace!(root = ?node, freed = doomed.len(), "discarded host subtree");
    }

    /// `root` and everything below it, in document order.
    pub fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let Some(node) = self.nodes.get(&id) else {
                continue;
            };
            out.push(id);
            stack.extend(node.children.iter().rev().copied());
        }
        out
    }

    pub fn find_by_id(&self, root: NodeId, element_id: &str) -> Option<NodeId> {
        self.descendants(root).into_iter().find(|id| {
            self.nodes
                .get(id)
                .is_some_and(|node| node.id.as_deref() == Some(element_id))
        })
    }

    pub fn find_by_class(&self, root: NodeId, class: &str) -> Option<NodeId> {
        self.find_all_by_class(root, class).into_iter().next()
    }

    pub fn find_all_by_class(&self, root: NodeId, class: &str) -> Vec<NodeId> {
        self.descendants(root)
            .into_iter()
            .filter(|id| self.nodes.get(id).is_some_and(|node| node.has_class(class)))
            .collect()
    }

    /// Nearest ancestor-or-self with the given tag.
    pub fn closest(&self, node: NodeId, tag: Tag) -> Option<NodeId> {
        let mut current = Some(node);
        while let Some(id) = current {
            let found = self.nodes.get(&id)?;
            if found.tag == tag {
                return Some(id);
            }
            current = found.parent;
        }
        None
    }

    pub fn value(&self, node: NodeId) -> &str {
        self.nodes.get(&node).map_or("", |n| n.value.as_str())
    }

    pub fn set_value(&mut self, node: NodeId, value: impl Into<String>) {
        self.node_mut(node).value = value.into();
    }

    pub fn checked(&self, node: NodeId) -> bool {
        self.nodes.get(&node).is_some_and(|n| n.checked)
    }

    pub fn set_checked(&mut self, node: NodeId, checked: bool) {
        self.node_mut(node).checked = checked;
    }

    /// Checks a radio and unchecks its same-name siblings within the enclosing form.
    pub fn select_radio(&mut self, node: NodeId) {
        let name = self.nodes.get(&node).and_then(|n| n.name.clone());
        let scope = self
            .closest(node, Tag::Form)
            .unwrap_or_else(|| self.root_of(node));
        if let Some(name) = name {
            for id in self.descendants(scope) {
                let node = self.node_mut(id);
                if node.tag == Tag::Radio && node.name.as_deref() == Some(name.as_str()) {
                    node.checked = false;
                }
            }
        }
        self.set_checked(node, true);
    }

    pub fn root_of(&self, node: NodeId) -> NodeId {
        let mut current = node;
        while let Some(parent) = self.parent(current) {
            current = parent;
        }
        current
    }

    /// An empty message marks the control valid again.
    pub fn set_custom_validity(&mut self, node: NodeId, message: impl Into<String>) {
        self.node_mut(node).validity = message.into();
    }

    /// Surfaces the first invalid control under `node`; `false` when one was found.
    pub fn report_validity(&mut self, node: NodeId) -> bool {
        let message = self
            .descendants(node)
            .into_iter()
            .find_map(|id| self.nodes.get(&id).and_then(Node::validity).map(str::to_string));
        let valid = message.is_none();
        self.reported = message;
        valid
    }

    pub fn reported(&self) -> Option<&str> {
        self.reported.as_deref()
    }

    pub fn take_reported(&mut self) -> Option<String> {
        self.reported.take()
    }

    /// Registers a listener. Registering the same kind and target twice is a no-op.
    ///
    /// # Panics
    ///
    /// When `node` was discarded.
    pub fn add_event_listener(&mut self, node: NodeId, kind: EventKind, target: ListenerTarget) {
        assert!(
            self.is_alive(node),
            "can't listen on discarded host node {node:?}"
        );
        let listeners = self.listeners.entry(node).or_default();
        if listeners
            .iter()
            .any(|l| l.kind == kind && l.target == target)
        {
            return;
        }
        listeners.push(Listener { kind, target });
    }

    pub fn listener_count(&self, node: NodeId) -> usize {
        self.listeners.get(&node).map_or(0, Vec::len)
    }

    fn snapshot(&self, node: NodeId, kind: EventKind) -> InputEvent {
        let (value, checked) = self
            .nodes
            .get(&node)
            .map_or((String::new(), false), |n| (n.value.clone(), n.checked));
        InputEvent {
            kind,
            target: node,
            value,
            checked,
            date: None,
            key: None,
        }
    }

    /// Fires `kind` at `node`, bubbling to its ancestors.
    ///
    /// A committed change on a picker-bound input is routed through the
    /// picker instead of the node's own listeners.
    pub fn dispatch(&mut self, node: NodeId, kind: EventKind) -> Vec<Delivery> {
        let Some(found) = self.nodes.get(&node) else {
            return Vec::new();
        };
        if found.disabled {
            return Vec::new();
        }

        if kind == EventKind::Change {
            if let Some(picker) = self.picker_for_input(node) {
                return self.commit_picker(picker).into_iter().collect();
            }
        }

        let event = self.snapshot(node, kind);
        let mut out = Vec::new();
        let mut current = Some(node);
        while let Some(id) = current {
            if let Some(listeners) = self.listeners.get(&id) {
                out.extend(listeners.iter().filter(|l| l.kind == kind).map(|l| Delivery {
                    target: l.target,
                    event: event.clone(),
                }));
            }
            current = self.parent(id);
        }
        out
    }

    pub fn add_document_listener(&mut self, target: ListenerTarget) -> Subscription {
        let subscription = Subscription(self.allocate());
        self.document_listeners.push((subscription, target));
        subscription
    }

    pub fn remove_document_listener(&mut self, subscription: Subscription) -> bool {
        let before = self.document_listeners.len();
        self.document_listeners
            .retain(|(sub, _)| *sub != subscription);
        before != self.document_listeners.len()
    }

    pub fn document_listener_count(&self) -> usize {
        self.document_listeners.len()
    }

    pub fn dispatch_key(&mut self, key: HostKey) -> Vec<Delivery> {
        self.document_listeners
            .iter()
            .map(|(_, target)| Delivery {
                target: *target,
                event: InputEvent {
                    kind: EventKind::Input,
                    target: NodeId(0),
                    value: String::new(),
                    checked: false,
                    date: None,
                    key: Some(key),
                },
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(handler: Handler) -> ListenerTarget {
        ListenerTarget::new(ViewKey::next(), handler)
    }

    fn form() -> Markup {
        Markup::new(Tag::Form).id("form").child(
            Markup::new(Tag::Block)
                .class("row")
                .child(Markup::new(Tag::TextInput).id("price").value("10"))
                .child(Markup::new(Tag::Button(ButtonRole::Submit)).label("Save")),
        )
    }

    #[test]
    fn created_elements_start_detached() {
        let mut tree = HostTree::new();
        let node = tree.create_element(form());
        assert_eq!(tree.parent(node), None);
        let price = tree.find_by_id(node, "price").expect("price input");
        assert_eq!(tree.value(price), "10");
        assert_eq!(tree.closest(price, Tag::Form), Some(node));
        assert_eq!(tree.len(), 4);
    }

    #[test]
    fn insert_positions_and_replace() {
        let mut tree = HostTree::new();
        let root = tree.create_element(Markup::new(Tag::Block));
        let a = tree.create_element(Markup::text("a"));
        let b = tree.create_element(Markup::text("b"));
        let c = tree.create_element(Markup::text("c"));
        tree.insert(root, a, RenderPosition::BeforeEnd);
        tree.insert(root, b, RenderPosition::AfterBegin);
        assert_eq!(tree.children(root), &[b, a]);

        tree.replace_node(c, b);
        assert_eq!(tree.children(root), &[c, a]);
        assert!(tree.is_alive(b));
        assert_eq!(tree.parent(b), None);
    }

    #[test]
    #[should_panic(expected = "not mounted")]
    fn replacing_unmounted_node_is_fatal() {
        let mut tree = HostTree::new();
        let a = tree.create_element(Markup::text("a"));
        let b = tree.create_element(Markup::text("b"));
        tree.replace_node(a, b);
    }

    #[test]
    fn submit_bubbles_to_form_listener() {
        let mut tree = HostTree::new();
        let node = tree.create_element(form());
        let submit = target(Handler::FormSubmit);
        tree.add_event_listener(node, EventKind::Submit, submit);
        tree.add_event_listener(node, EventKind::Submit, submit);
        assert_eq!(tree.listener_count(node), 1);

        let price = tree.find_by_id(node, "price").expect("price input");
        let deliveries = tree.dispatch(price, EventKind::Submit);
        assert_eq!(deliveries.len(), 1);
        assert_eq!(deliveries[0].target, submit);
        assert_eq!(deliveries[0].event.value, "10");
        assert!(tree.dispatch(price, EventKind::Change).is_empty());
    }

    #[test]
    fn discard_drops_listeners_with_nodes() {
        let mut tree = HostTree::new();
        let node = tree.create_element(form());
        let price = tree.find_by_id(node, "price").expect("price input");
        tree.add_event_listener(price, EventKind::Input, target(Handler::PriceInput));
        tree.discard(node);
        assert!(tree.is_empty());
        assert_eq!(tree.listener_count(price), 0);
        assert!(tree.dispatch(price, EventKind::Input).is_empty());
    }

    #[test]
    fn disabled_nodes_deliver_nothing() {
        let mut tree = HostTree::new();
        let node = tree.create_element(Markup::new(Tag::TextInput).disabled(true));
        tree.add_event_listener(node, EventKind::Input, target(Handler::PriceInput));
        assert!(tree.dispatch(node, EventKind::Input).is_empty());
    }

    #[test]
    fn report_validity_surfaces_first_message() {
        let mut tree = HostTree::new();
        let node = tree.create_element(form());
        assert!(tree.report_validity(node));
        let price = tree.find_by_id(node, "price").expect("price input");
        tree.set_custom_validity(price, "bad price");
        assert!(!tree.report_validity(node));
        assert_eq!(tree.reported(), Some("bad price"));
        tree.set_custom_validity(price, "");
        assert!(tree.report_validity(node));
        assert_eq!(tree.reported(), None);
    }

    #[test]
    fn radios_are_exclusive_within_form() {
        let mut tree = HostTree::new();
        let node = tree.create_element(
            Markup::new(Tag::Form)
                .child(Markup::new(Tag::Radio).name("kind").value("a").checked(true))
                .child(Markup::new(Tag::Radio).name("kind").value("b")),
        );
        let radios = tree.children(node).to_vec();
        tree.select_radio(radios[1]);
        assert!(!tree.checked(radios[0]));
        assert!(tree.checked(radios[1]));
    }

    #[test]
    fn document_listeners_subscribe_and_unsubscribe() {
        let mut tree = HostTree::new();
        let escape = target(Handler::EscapeKey);
        let sub = tree.add_document_listener(escape);
        let deliveries = tree.dispatch_key(HostKey::Escape);
        assert_eq!(deliveries.len(), 1);
        assert_eq!(deliveries[0].event.key, Some(HostKey::Escape));
        assert!(tree.remove_document_listener(sub));
        assert!(!tree.remove_document_listener(sub));
        assert!(tree.dispatch_key(HostKey::Escape).is_empty());
    }
}
