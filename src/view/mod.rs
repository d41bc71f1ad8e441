//! View layer: templates rendered into the host tree.
//!
//! Every view caches the node built from its [`AbstractView::template`].
//! Stateful views additionally keep a working-data object and regenerate
//! their node from it on [`StatefulView::update_element`]: the fresh node
//! takes the old one's place and [`StatefulView::restore_handlers`] replays
//! every listener and widget the old node had, since none of them survive
//! the swap.

mod event_form;
mod event_row;
mod list;
mod sort;
mod validate;

use std::sync::atomic::{AtomicU64, Ordering};

use crate::dom::{HostTree, InputEvent, Markup, NodeId};

pub use event_form::{EventFormView, FormData, FormMode, FormPatch, FormReset};
pub use event_row::EventRowView;
pub use list::{DayInfo, NoEventsView, TripDayView, TripListView};
pub use sort::SortView;
pub use validate::{validate_destination, validate_price};

static NEXT_VIEW_KEY: AtomicU64 = AtomicU64::new(1);

/// Routing identity of a view instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ViewKey(u64);

impl ViewKey {
    pub fn next() -> Self {
        Self(NEXT_VIEW_KEY.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Handler {
    EditClick,
    TypeChange,
    DestinationChange,
    StartDateChange,
    EndDateChange,
    PriceInput,
    FavoriteChange,
    OfferToggle,
    FormSubmit,
    FormReset,
    RollupClick,
    SortTypeChange,
    EscapeKey,
}

#[derive(Debug)]
pub struct ViewBase {
    key: ViewKey,
    element: Option<NodeId>,
}

impl ViewBase {
    pub fn new() -> Self {
        Self {
            key: ViewKey::next(),
            element: None,
        }
    }
}

impl Default for ViewBase {
    fn default() -> Self {
        Self::new()
    }
}

pub trait AbstractView {
    fn base(&self) -> &ViewBase;

    fn base_mut(&mut self) -> &mut ViewBase;

    fn template(&self) -> Markup;

    fn key(&self) -> ViewKey {
        self.base().key
    }

    /// The view's node, built from the template on first access.
    fn element(&mut self, tree: &mut HostTree) -> NodeId {
        if let Some(node) = self.base().element {
            return node;
        }
        let node = tree.create_element(self.template());
        self.base_mut().element = Some(node);
        node
    }

    /// The node, if one was built; never builds one.
    fn cached_element(&self) -> Option<NodeId> {
        self.base().element
    }

    fn has_element(&self) -> bool {
        self.cached_element().is_some()
    }

    /// Tears down externally-owned widgets bound to the current node.
    fn release_widgets(&mut self, _tree: &mut HostTree) {}

    /// Frees the cached node. Registered callbacks stay, so the view can be
    /// rendered again later.
    fn remove_element(&mut self, tree: &mut HostTree) {
        self.release_widgets(tree);
        if let Some(node) = self.base_mut().element.take() {
            tree.discard(node);
        }
    }

    fn handle(&mut self, _handler: Handler, _event: &InputEvent, _tree: &mut HostTree) {}
}

/// Shallow merge: every field present in the patch replaces the current value.
pub trait Merge {
    type Patch;

    fn merge(&mut self, patch: Self::Patch);
}

pub trait StatefulView: AbstractView {
    type Data: Merge;

    fn data(&self) -> &Self::Data;

    fn data_mut(&mut self) -> &mut Self::Data;

    /// Re-registers every listener and widget a fresh node needs.
    fn restore_handlers(&mut self, tree: &mut HostTree);

    fn update_data(
        &mut self,
        tree: &mut HostTree,
        patch: Option<<Self::Data as Merge>::Patch>,
        silent: bool,
    ) {
        let Some(patch) = patch else {
            return;
        };
        self.data_mut().merge(patch);
        if silent {
            return;
        }
        self.update_element(tree);
    }

    fn update_element(&mut self, tree: &mut HostTree) {
        let prev = self.element(tree);
        self.release_widgets(tree);
        self.base_mut().element = None;

        let next = self.element(tree);
        if tree.parent(prev).is_some() {
            tree.replace_node(next, prev);
        }
        tree.discard(prev);

        self.restore_handlers(tree);
    }
}
