//! Timeline presenter: owns the events and the views showing them.
//!
//! View callbacks never touch the presenter directly. They post a
//! [`TimelineCommand`] on a channel that [`Timeline::dispatch`] drains right
//! after handing a host event to the view, so every mutation still finishes
//! before dispatch returns.

use std::rc::Rc;
use std::sync::mpsc::{self, Receiver, Sender};

use chrono::NaiveDateTime;
use tracing::{debug, info};

use crate::catalog::Catalog;
use crate::dom::{
    remove, render, replace, Delivery, EventKind, HostKey, HostTree, ListenerTarget, NodeId,
    RenderPosition, Subscription,
};
use crate::model::{by_price, by_start, events_on_day, trip_days, City, Event, EventType, SortMode};
use crate::view::{
    AbstractView, DayInfo, EventFormView, EventRowView, FormMode, FormReset, Handler,
    NoEventsView, SortView, StatefulView, TripDayView, TripListView, ViewKey,
};

/// Id carried by the new-event form until it is saved. Loaded itineraries
/// may not use it.
pub const NEW_EVENT_ID: &str = "new";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct PairId(u64);

#[derive(Debug)]
enum TimelineCommand {
    OpenForm(PairId),
    Save(PairId, Event),
    Reset(PairId, FormReset),
    Close(PairId),
    SortChange(SortMode),
}

/// A row and its hidden-until-requested form. New events have no row.
struct EventPair {
    id: PairId,
    row: Option<EventRowView>,
    form: EventFormView,
    escape: Option<Subscription>,
}

impl EventPair {
    fn is_open(&self) -> bool {
        self.escape.is_some()
    }
}

pub struct Timeline {
    container: NodeId,
    catalog: Rc<Catalog>,
    current_sort: SortMode,
    sourced_events: Vec<Event>,
    timeline_events: Vec<Event>,

    sort_view: SortView,
    list_view: TripListView,
    no_events_view: NoEventsView,
    day_views: Vec<TripDayView>,
    pairs: Vec<EventPair>,
    creating: Option<EventPair>,

    next_pair: u64,
    tx: Sender<TimelineCommand>,
    rx: Receiver<TimelineCommand>,
}

impl Timeline {
    pub fn new(container: NodeId, catalog: Rc<Catalog>) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            container,
            catalog,
            current_sort: SortMode::Default,
            sourced_events: Vec::new(),
            timeline_events: Vec::new(),
            sort_view: SortView::new(SortMode::Default),
            list_view: TripListView::new(),
            no_events_view: NoEventsView::new(),
            day_views: Vec::new(),
            pairs: Vec::new(),
            creating: None,
            next_pair: 0,
            tx,
            rx,
        }
    }

    /// Takes a snapshot of `events` and renders it. Calling it again
    /// replaces whatever was rendered before; the sort mode is kept.
    pub fn init(&mut self, tree: &mut HostTree, events: Vec<Event>) {
        self.clear_timeline(tree);
        self.sourced_events = events.clone();
        self.timeline_events = events;
        self.sort_events(self.current_sort);
        info!(
            events = self.sourced_events.len(),
            sort = %self.current_sort,
            "timeline initialised"
        );
        self.render_timeline(tree);
    }

    pub fn current_sort(&self) -> SortMode {
        self.current_sort
    }

    /// Events in display order.
    pub fn events(&self) -> &[Event] {
        &self.timeline_events
    }

    /// Events in load order.
    pub fn sourced_events(&self) -> &[Event] {
        &self.sourced_events
    }

    pub fn day_buckets(&self) -> Vec<Option<DayInfo>> {
        self.day_views.iter().map(TripDayView::info).collect()
    }

    pub fn list_element(&self) -> Option<NodeId> {
        self.list_view.cached_element()
    }

    pub fn placeholder_element(&self) -> Option<NodeId> {
        self.no_events_view.cached_element()
    }

    pub fn sort_element(&self) -> Option<NodeId> {
        self.sort_view.cached_element()
    }

    /// Row node of the event, when it is rendered.
    pub fn row_element(&self, event_id: &str) -> Option<NodeId> {
        self.pairs
            .iter()
            .filter_map(|pair| pair.row.as_ref())
            .find(|row| row.event().id == event_id)
            .and_then(|row| row.cached_element())
    }

    /// Form node of the event, including the new-event form (`"new"`).
    pub fn form_element(&self, event_id: &str) -> Option<NodeId> {
        self.pairs
            .iter()
            .chain(self.creating.iter())
            .find(|pair| pair.form.data().id == event_id)
            .and_then(|pair| pair.form.cached_element())
    }

    pub fn is_form_open(&self, event_id: &str) -> bool {
        self.pairs
            .iter()
            .chain(self.creating.iter())
            .any(|pair| pair.form.data().id == event_id && pair.is_open())
    }

    pub fn is_creating(&self) -> bool {
        self.creating.is_some()
    }

    pub fn sort_events(&mut self, mode: SortMode) {
        match mode {
            SortMode::Time => self.timeline_events.sort_by(by_start),
            SortMode::Price => self.timeline_events.sort_by(by_price),
            SortMode::Default => self.timeline_events = self.sourced_events.clone(),
        }
        self.current_sort = mode;
    }

    pub fn handle_sort_type_change(&mut self, tree: &mut HostTree, mode: SortMode) {
        if self.current_sort == mode {
            return;
        }
        info!(from = %self.current_sort, to = %mode, "sort mode changed");
        self.sort_events(mode);
        self.rebuild_timeline(tree);
    }

    /// Fires a host event and runs whatever the views asked for.
    pub fn dispatch(&mut self, tree: &mut HostTree, node: NodeId, kind: EventKind) {
        let deliveries = tree.dispatch(node, kind);
        self.deliver(tree, deliveries);
    }

    /// Fires a document-level key press.
    pub fn dispatch_key(&mut self, tree: &mut HostTree, key: HostKey) {
        let deliveries = tree.dispatch_key(key);
        self.deliver(tree, deliveries);
    }

    fn deliver(&mut self, tree: &mut HostTree, deliveries: Vec<Delivery>) {
        for delivery in deliveries {
            self.route(tree, delivery);
            self.drain_commands(tree);
        }
    }

    fn route(&mut self, tree: &mut HostTree, delivery: Delivery) {
        let Delivery { target, event } = delivery;

        if target.handler == Handler::EscapeKey {
            if event.key == Some(HostKey::Escape) {
                if let Some(pair) = self.pair_by_form(target.view) {
                    self.close_form(tree, pair);
                }
            }
            return;
        }

        if self.sort_view.key() == target.view {
            self.sort_view.handle(target.handler, &event, tree);
            return;
        }

        for pair in self.pairs.iter_mut().chain(self.creating.iter_mut()) {
            if pair.form.key() == target.view {
                pair.form.handle(target.handler, &event, tree);
                return;
            }
            if let Some(row) = pair.row.as_mut() {
                if row.key() == target.view {
                    row.handle(target.handler, &event, tree);
                    return;
                }
            }
        }
        debug!(?target, "delivery for a view that is gone");
    }

    fn drain_commands(&mut self, tree: &mut HostTree) {
        while let Ok(command) = self.rx.try_recv() {
            match command {
                TimelineCommand::OpenForm(pair) => self.open_form(tree, pair),
                TimelineCommand::Save(pair, event) => self.save_event(tree, pair, event),
                TimelineCommand::Reset(pair, FormReset::Delete(event)) => {
                    self.delete_event(tree, pair, &event);
                }
                TimelineCommand::Reset(pair, FormReset::Cancel) | TimelineCommand::Close(pair) => {
                    self.close_form(tree, pair);
                }
                TimelineCommand::SortChange(mode) => self.handle_sort_type_change(tree, mode),
            }
        }
    }

    fn pair_by_form(&self, view: ViewKey) -> Option<PairId> {
        self.pairs
            .iter()
            .chain(self.creating.iter())
            .find(|pair| pair.form.key() == view)
            .map(|pair| pair.id)
    }

    fn pair_mut(&mut self, id: PairId) -> Option<&mut EventPair> {
        if let Some(pair) = self.creating.as_mut().filter(|pair| pair.id == id) {
            return Some(pair);
        }
        self.pairs.iter_mut().find(|pair| pair.id == id)
    }

    fn next_pair_id(&mut self) -> PairId {
        self.next_pair += 1;
        PairId(self.next_pair)
    }

    fn open_form(&mut self, tree: &mut HostTree, id: PairId) {
        let Some(pair) = self.pair_mut(id) else {
            return;
        };
        if pair.is_open() {
            return;
        }
        let Some(row) = pair.row.as_mut() else {
            return;
        };
        replace(tree, &mut pair.form, row);
        let target = ListenerTarget::new(pair.form.key(), Handler::EscapeKey);
        pair.escape = Some(tree.add_document_listener(target));
        debug!(event = %pair.form.data().id, "form opened");
    }

    /// Leaves the form without saving. Existing events roll the form back
    /// to the canonical event and show the row again; a new-event form is
    /// dropped.
    fn close_form(&mut self, tree: &mut HostTree, id: PairId) {
        if self.creating.as_ref().is_some_and(|pair| pair.id == id) {
            if let Some(mut pair) = self.creating.take() {
                Self::release_escape(tree, &mut pair);
                remove(tree, &mut pair.form);
                debug!("new event cancelled");
            }
            return;
        }

        let Some(pair) = self.pairs.iter_mut().find(|pair| pair.id == id) else {
            return;
        };
        if !pair.is_open() {
            return;
        }
        Self::release_escape(tree, pair);
        if let Some(row) = pair.row.as_mut() {
            let canonical = row.event().clone();
            pair.form.reset(tree, &canonical);
            replace(tree, row, &mut pair.form);
        }
        debug!(event = %pair.form.data().id, "form closed");
    }

    fn release_escape(tree: &mut HostTree, pair: &mut EventPair) {
        if let Some(subscription) = pair.escape.take() {
            tree.remove_document_listener(subscription);
        }
    }

    fn save_event(&mut self, tree: &mut HostTree, id: PairId, event: Event) {
        if self.creating.as_ref().is_some_and(|pair| pair.id == id) {
            self.save_new_event(tree, event);
            return;
        }

        let Some(index) = self.pairs.iter().position(|pair| pair.id == id) else {
            return;
        };
        let Some(previous) = self
            .sourced_events
            .iter()
            .find(|e| e.id == event.id)
            .cloned()
        else {
            return;
        };

        let reorder = self.ordering_changed(&previous, &event);
        replace_by_id(&mut self.sourced_events, &event);
        replace_by_id(&mut self.timeline_events, &event);
        info!(event = %event.id, price = event.price, reorder, "event saved");

        if reorder {
            self.sort_events(self.current_sort);
            self.rebuild_timeline(tree);
            return;
        }

        let mut row = EventRowView::new(event.clone());
        let tx = self.tx.clone();
        row.set_edit_click_handler(tree, move || {
            let _ = tx.send(TimelineCommand::OpenForm(id));
        });

        let pair = &mut self.pairs[index];
        Self::release_escape(tree, pair);
        pair.form.reset(tree, &event);
        replace(tree, &mut row, &mut pair.form);
        if let Some(mut old_row) = pair.row.replace(row) {
            old_row.remove_element(tree);
        }
    }

    fn save_new_event(&mut self, tree: &mut HostTree, mut event: Event) {
        if let Some(mut pair) = self.creating.take() {
            Self::release_escape(tree, &mut pair);
            remove(tree, &mut pair.form);
        }

        event.id = self.fresh_event_id();
        info!(event = %event.id, "event created");
        self.sourced_events.push(event.clone());
        self.timeline_events.push(event);
        self.sort_events(self.current_sort);
        self.clear_timeline(tree);
        self.render_timeline(tree);
    }

    fn delete_event(&mut self, tree: &mut HostTree, id: PairId, event: &Event) {
        if self.pair_mut(id).is_none() {
            return;
        }
        self.sourced_events.retain(|e| e.id != event.id);
        self.timeline_events.retain(|e| e.id != event.id);
        info!(event = %event.id, "event deleted");
        self.rebuild_timeline(tree);
    }

    fn ordering_changed(&self, previous: &Event, saved: &Event) -> bool {
        match self.current_sort {
            SortMode::Default => previous.day() != saved.day(),
            SortMode::Time => previous.start() != saved.start(),
            SortMode::Price => previous.price != saved.price,
        }
    }

    fn fresh_event_id(&self) -> String {
        let highest = self
            .sourced_events
            .iter()
            .filter_map(|e| e.id.parse::<u64>().ok())
            .max()
            .unwrap_or(0);
        (highest + 1).to_string()
    }

    /// Opens a blank form at the top of the list. Only one new-event form
    /// exists at a time; returns `false` when one is already open.
    pub fn create_event(&mut self, tree: &mut HostTree, now: NaiveDateTime) -> bool {
        if self.creating.is_some() {
            return false;
        }

        let blank = Event {
            id: NEW_EVENT_ID.to_string(),
            city: City::default(),
            event_type: EventType::bare(self.catalog.default_type_name()),
            price: 0,
            date_range: (now, now),
            is_favorite: false,
        };
        let id = self.next_pair_id();
        let mut form = EventFormView::new(tree, &blank, Rc::clone(&self.catalog), FormMode::Create);

        let tx = self.tx.clone();
        form.set_form_submit_handler(tree, move |event| {
            let _ = tx.send(TimelineCommand::Save(id, event));
        });
        let tx = self.tx.clone();
        form.set_form_reset_handler(tree, move |reset| {
            let _ = tx.send(TimelineCommand::Reset(id, reset));
        });

        let container = self.create_container(tree);
        render(tree, container, &mut form, RenderPosition::AfterBegin);

        let escape = tree.add_document_listener(ListenerTarget::new(form.key(), Handler::EscapeKey));
        self.creating = Some(EventPair {
            id,
            row: None,
            form,
            escape: Some(escape),
        });
        debug!("new event form opened");
        true
    }

    fn create_container(&mut self, tree: &mut HostTree) -> NodeId {
        if self.list_view.has_element() {
            self.list_view.element(tree)
        } else {
            self.container
        }
    }

    fn render_sort(&mut self, tree: &mut HostTree) {
        self.sort_view
            .update_current_sort_type(tree, self.current_sort);
        let tx = self.tx.clone();
        self.sort_view.set_sort_type_change_handler(tree, move |mode| {
            let _ = tx.send(TimelineCommand::SortChange(mode));
        });
        render(tree, self.container, &mut self.sort_view, RenderPosition::BeforeEnd);
    }

    fn render_event(&mut self, tree: &mut HostTree, event: &Event, container: NodeId) {
        let id = self.next_pair_id();
        let mut row = EventRowView::new(event.clone());
        let mut form = EventFormView::new(tree, event, Rc::clone(&self.catalog), FormMode::Edit);

        let tx = self.tx.clone();
        row.set_edit_click_handler(tree, move || {
            let _ = tx.send(TimelineCommand::OpenForm(id));
        });
        let tx = self.tx.clone();
        form.set_form_submit_handler(tree, move |event| {
            let _ = tx.send(TimelineCommand::Save(id, event));
        });
        let tx = self.tx.clone();
        form.set_form_reset_handler(tree, move |reset| {
            let _ = tx.send(TimelineCommand::Reset(id, reset));
        });
        let tx = self.tx.clone();
        form.set_rollup_click_handler(tree, move || {
            let _ = tx.send(TimelineCommand::Close(id));
        });

        render(tree, container, &mut row, RenderPosition::BeforeEnd);
        self.pairs.push(EventPair {
            id,
            row: Some(row),
            form,
            escape: None,
        });
    }

    fn render_day(&mut self, tree: &mut HostTree, info: Option<DayInfo>, events: &[&Event]) {
        let list = self.list_view.element(tree);
        let mut day = TripDayView::new(info);
        render(tree, list, &mut day, RenderPosition::BeforeEnd);
        let container = day.container(tree);
        self.day_views.push(day);
        for event in events {
            self.render_event(tree, event, container);
        }
    }

    fn render_events(&mut self, tree: &mut HostTree) {
        let events = self.timeline_events.clone();
        if self.current_sort == SortMode::Default {
            for (index, date) in trip_days(&events).into_iter().enumerate() {
                let info = DayInfo {
                    date,
                    counter: index + 1,
                };
                self.render_day(tree, Some(info), &events_on_day(&events, date));
            }
        } else {
            let all: Vec<&Event> = events.iter().collect();
            self.render_day(tree, None, &all);
        }
    }

    fn render_events_list(&mut self, tree: &mut HostTree) {
        render(tree, self.container, &mut self.list_view, RenderPosition::BeforeEnd);
    }

    fn render_no_events(&mut self, tree: &mut HostTree) {
        render(tree, self.container, &mut self.no_events_view, RenderPosition::BeforeEnd);
    }

    /// Frees every node and widget the timeline rendered, forms included,
    /// and drops any Escape subscriptions still held.
    fn clear_timeline(&mut self, tree: &mut HostTree) {
        for mut pair in self.pairs.drain(..).chain(self.creating.take()) {
            Self::release_escape(tree, &mut pair);
            pair.form.remove_element(tree);
            if let Some(row) = pair.row.as_mut() {
                row.remove_element(tree);
            }
        }
        for mut day in self.day_views.drain(..) {
            remove(tree, &mut day);
        }
        remove(tree, &mut self.sort_view);
        remove(tree, &mut self.list_view);
        remove(tree, &mut self.no_events_view);
    }

    /// Clears and re-renders. An open new-event form keeps its node, its
    /// pickers and its working data, and goes back on top of the new list.
    fn rebuild_timeline(&mut self, tree: &mut HostTree) {
        let creating = self.creating.take();
        if let Some(node) = creating.as_ref().and_then(|pair| pair.form.cached_element()) {
            tree.detach(node);
        }
        self.clear_timeline(tree);
        self.render_timeline(tree);
        if let Some(mut pair) = creating {
            let container = self.create_container(tree);
            render(tree, container, &mut pair.form, RenderPosition::AfterBegin);
            self.creating = Some(pair);
        }
    }

    fn render_timeline(&mut self, tree: &mut HostTree) {
        if self.timeline_events.is_empty() {
            self.render_no_events(tree);
            return;
        }

        self.render_sort(tree);
        self.render_events_list(tree);
        self.render_events(tree);
    }
}

fn replace_by_id(events: &mut [Event], event: &Event) {
    if let Some(slot) = events.iter_mut().find(|e| e.id == event.id) {
        *slot = event.clone();
    }
}
