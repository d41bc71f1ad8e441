use std::rc::Rc;

use chrono::NaiveDateTime;
use tracing::debug;

use crate::catalog::{type_label, Catalog, TypeGroup, EVENT_TYPES};
use crate::dom::{
    format_picker_date, ButtonRole, DatePickerOptions, EventKind, HostTree, InputEvent,
    ListenerTarget, Markup, NodeId, PickerId, Tag, TextStyle,
};
use crate::markdown::description_markup;
use crate::model::{capitalize, City, Event, EventType, OfferRef};

use super::validate::{validate_destination, validate_price};
use super::{AbstractView, Handler, Merge, StatefulView, ViewBase};

/// Working copy of an event while its form is open.
///
/// The `is_*` flags are UI state only and never reach a canonical [`Event`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FormData {
    pub id: String,
    pub city: City,
    pub event_type: EventType,
    pub price: u32,
    pub date_range: (NaiveDateTime, NaiveDateTime),
    pub is_favorite: bool,
    pub is_disabled: bool,
    pub is_saving: bool,
    pub is_deleting: bool,
}

impl FormData {
    pub fn from_event(event: &Event) -> Self {
        Self {
            id: event.id.clone(),
            city: event.city.clone(),
            event_type: event.event_type.clone(),
            price: event.price,
            date_range: event.date_range,
            is_favorite: event.is_favorite,
            is_disabled: false,
            is_saving: false,
            is_deleting: false,
        }
    }

    pub fn to_event(&self) -> Event {
        Event {
            id: self.id.clone(),
            city: self.city.clone(),
            event_type: self.event_type.clone(),
            price: self.price,
            date_range: self.date_range,
            is_favorite: self.is_favorite,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FormPatch {
    pub city: Option<City>,
    pub event_type: Option<EventType>,
    pub price: Option<u32>,
    pub date_range: Option<(NaiveDateTime, NaiveDateTime)>,
    pub is_favorite: Option<bool>,
    pub is_disabled: Option<bool>,
    pub is_saving: Option<bool>,
    pub is_deleting: Option<bool>,
}

impl FormPatch {
    /// Replaces every event field; transient flags go back to `false`.
    pub fn from_event(event: &Event) -> Self {
        Self {
            city: Some(event.city.clone()),
            event_type: Some(event.event_type.clone()),
            price: Some(event.price),
            date_range: Some(event.date_range),
            is_favorite: Some(event.is_favorite),
            is_disabled: Some(false),
            is_saving: Some(false),
            is_deleting: Some(false),
        }
    }
}

impl Merge for FormData {
    type Patch = FormPatch;

    fn merge(&mut self, patch: FormPatch) {
        let FormPatch {
            city,
            event_type,
            price,
            date_range,
            is_favorite,
            is_disabled,
            is_saving,
            is_deleting,
        } = patch;
        if let Some(city) = city {
            self.city = city;
        }
        if let Some(event_type) = event_type {
            self.event_type = event_type;
        }
        if let Some(price) = price {
            self.price = price;
        }
        if let Some(date_range) = date_range {
            self.date_range = date_range;
        }
        if let Some(is_favorite) = is_favorite {
            self.is_favorite = is_favorite;
        }
        if let Some(is_disabled) = is_disabled {
            self.is_disabled = is_disabled;
        }
        if let Some(is_saving) = is_saving {
            self.is_saving = is_saving;
        }
        if let Some(is_deleting) = is_deleting {
            self.is_deleting = is_deleting;
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FormMode {
    Edit,
    Create,
}

/// What the reset control asks for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FormReset {
    Delete(Event),
    Cancel,
}

#[derive(Default)]
struct FormCallbacks {
    form_submit: Option<Box<dyn FnMut(Event)>>,
    form_reset: Option<Box<dyn FnMut(FormReset)>>,
    rollup_click: Option<Box<dyn FnMut()>>,
}

#[derive(Default)]
struct DatePickers {
    start: Option<PickerId>,
    end: Option<PickerId>,
}

/// Inline edit form for one event.
pub struct EventFormView {
    base: ViewBase,
    data: FormData,
    mode: FormMode,
    catalog: Rc<Catalog>,
    pickers: DatePickers,
    callbacks: FormCallbacks,
}

impl EventFormView {
    pub fn new(tree: &mut HostTree, event: &Event, catalog: Rc<Catalog>, mode: FormMode) -> Self {
        let mut view = Self {
            base: ViewBase::new(),
            data: FormData::from_event(event),
            mode,
            catalog,
            pickers: DatePickers::default(),
            callbacks: FormCallbacks::default(),
        };
        view.set_inner_handlers(tree);
        view
    }

    pub fn mode(&self) -> FormMode {
        self.mode
    }

    /// Rolls the working data back to `event` and re-renders, which also
    /// drops uncommitted text left in the controls.
    pub fn reset(&mut self, tree: &mut HostTree, event: &Event) {
        self.update_data(tree, Some(FormPatch::from_event(event)), false);
    }

    fn target(&self, handler: Handler) -> ListenerTarget {
        ListenerTarget::new(self.key(), handler)
    }

    fn control(&mut self, tree: &mut HostTree, prefix: &str) -> Option<NodeId> {
        let root = self.element(tree);
        tree.find_by_id(root, &format!("{prefix}-{}", self.data.id))
    }

    fn set_inner_handlers(&mut self, tree: &mut HostTree) {
        let root = self.element(tree);

        let type_change = self.target(Handler::TypeChange);
        for input in tree.find_all_by_class(root, "event__type-input") {
            tree.add_event_listener(input, EventKind::Change, type_change);
        }

        let offer_toggle = self.target(Handler::OfferToggle);
        for input in tree.find_all_by_class(root, "event__offer-checkbox") {
            tree.add_event_listener(input, EventKind::Change, offer_toggle);
        }

        if let Some(input) = self.control(tree, "event-destination") {
            tree.add_event_listener(
                input,
                EventKind::Change,
                self.target(Handler::DestinationChange),
            );
        }
        if let Some(input) = self.control(tree, "event-price") {
            tree.add_event_listener(input, EventKind::Input, self.target(Handler::PriceInput));
        }
        if let Some(input) = self.control(tree, "event-favorite") {
            tree.add_event_listener(
                input,
                EventKind::Change,
                self.target(Handler::FavoriteChange),
            );
        }

        self.attach_date_pickers(tree);
    }

    /// Fresh pickers for the current node; the end picker's lower bound is
    /// pinned to the current start.
    fn attach_date_pickers(&mut self, tree: &mut HostTree) {
        self.destroy_date_pickers(tree);
        let (start, end) = self.data.date_range;

        if let Some(input) = self.control(tree, "event-start-time") {
            let options = DatePickerOptions {
                default_date: start,
                min_date: None,
                on_change: self.target(Handler::StartDateChange),
            };
            self.pickers.start = Some(tree.attach_date_picker(input, options));
        }
        if let Some(input) = self.control(tree, "event-end-time") {
            let options = DatePickerOptions {
                default_date: end,
                min_date: Some(start),
                on_change: self.target(Handler::EndDateChange),
            };
            let picker = tree.attach_date_picker(input, options);
            self.pickers.end = Some(picker);
            // The picker never shows an end before the start; adopt what it shows.
            self.data.date_range.1 = tree.date_picker_date(picker);
        }
    }

    fn destroy_date_pickers(&mut self, tree: &mut HostTree) {
        if let Some(picker) = self.pickers.start.take() {
            tree.destroy_date_picker(picker);
        }
        if let Some(picker) = self.pickers.end.take() {
            tree.destroy_date_picker(picker);
        }
    }

    pub fn date_pickers(&self) -> (Option<PickerId>, Option<PickerId>) {
        (self.pickers.start, self.pickers.end)
    }

    pub fn set_form_submit_handler(
        &mut self,
        tree: &mut HostTree,
        callback: impl FnMut(Event) + 'static,
    ) {
        self.callbacks.form_submit = Some(Box::new(callback));
        self.bind_form_submit(tree);
    }

    pub fn set_form_reset_handler(
        &mut self,
        tree: &mut HostTree,
        callback: impl FnMut(FormReset) + 'static,
    ) {
        self.callbacks.form_reset = Some(Box::new(callback));
        self.bind_form_reset(tree);
    }

    /// Only existing events have a rollup control; in create mode the
    /// callback is stored but never fires.
    pub fn set_rollup_click_handler(&mut self, tree: &mut HostTree, callback: impl FnMut() + 'static) {
        self.callbacks.rollup_click = Some(Box::new(callback));
        self.bind_rollup_click(tree);
    }

    fn bind_form_submit(&mut self, tree: &mut HostTree) {
        let root = self.element(tree);
        tree.add_event_listener(root, EventKind::Submit, self.target(Handler::FormSubmit));
    }

    fn bind_form_reset(&mut self, tree: &mut HostTree) {
        let root = self.element(tree);
        tree.add_event_listener(root, EventKind::Reset, self.target(Handler::FormReset));
    }

    fn bind_rollup_click(&mut self, tree: &mut HostTree) {
        let root = self.element(tree);
        if let Some(button) = tree.find_by_class(root, "event__rollup-btn") {
            tree.add_event_listener(button, EventKind::Click, self.target(Handler::RollupClick));
        }
    }

    fn report(&mut self, tree: &mut HostTree, control: NodeId, message: &str) {
        debug!(form = %self.data.id, reason = message, "rejected form input");
        tree.set_custom_validity(control, message);
        let root = self.element(tree);
        tree.report_validity(root);
    }

    fn type_changed(&mut self, tree: &mut HostTree, name: &str) {
        if name == self.data.event_type.name {
            return;
        }
        // Fails loudly for a type the catalog can't serve.
        self.catalog.offers_for(name);
        let patch = FormPatch {
            event_type: Some(EventType::bare(name)),
            ..FormPatch::default()
        };
        self.update_data(tree, Some(patch), false);
    }

    fn destination_changed(&mut self, tree: &mut HostTree, control: NodeId, value: &str) {
        if value == self.data.city.name {
            tree.set_custom_validity(control, "");
            return;
        }
        match validate_destination(value, &self.catalog) {
            Ok(destination) => {
                let patch = FormPatch {
                    city: Some(destination.to_city()),
                    ..FormPatch::default()
                };
                self.update_data(tree, Some(patch), false);
            }
            Err(err) => self.report(tree, control, &err.to_string()),
        }
    }

    fn price_input(&mut self, tree: &mut HostTree, control: NodeId, value: &str) {
        match validate_price(value) {
            Ok(price) => {
                tree.set_custom_validity(control, "");
                let patch = FormPatch {
                    price: Some(price),
                    ..FormPatch::default()
                };
                self.update_data(tree, Some(patch), true);
            }
            Err(err) => self.report(tree, control, &err.to_string()),
        }
    }

    fn start_changed(&mut self, tree: &mut HostTree, date: NaiveDateTime) {
        let patch = FormPatch {
            date_range: Some((date, self.data.date_range.1)),
            ..FormPatch::default()
        };
        self.update_data(tree, Some(patch), false);
    }

    fn end_changed(&mut self, tree: &mut HostTree, date: NaiveDateTime) {
        let patch = FormPatch {
            date_range: Some((self.data.date_range.0, date)),
            ..FormPatch::default()
        };
        self.update_data(tree, Some(patch), false);
    }

    fn favorite_changed(&mut self, tree: &mut HostTree) {
        let patch = FormPatch {
            is_favorite: Some(!self.data.is_favorite),
            ..FormPatch::default()
        };
        self.update_data(tree, Some(patch), true);
    }

    /// Adds or drops one offer of the current type. Labels the type's
    /// catalog entry doesn't offer are refused.
    pub fn toggle_offer(&mut self, tree: &mut HostTree, label: &str, checked: bool) -> bool {
        let entry = self.catalog.offers_for(&self.data.event_type.name);
        let Some(offer) = entry.offer(label).cloned() else {
            return false;
        };

        let mut offers: Vec<OfferRef> = self
            .data
            .event_type
            .offers
            .iter()
            .filter(|selected| selected.label != label)
            .cloned()
            .collect();
        if checked {
            offers.push(offer);
        }

        let patch = FormPatch {
            event_type: Some(EventType {
                name: self.data.event_type.name.clone(),
                offers,
            }),
            ..FormPatch::default()
        };
        self.update_data(tree, Some(patch), true);
        true
    }

    /// Re-checks the rendered destination and price controls and hands the
    /// canonical event to the submit callback. Returns whether it was sent.
    pub fn submit(&mut self, tree: &mut HostTree) -> bool {
        let (Some(destination), Some(price)) = (
            self.control(tree, "event-destination"),
            self.control(tree, "event-price"),
        ) else {
            panic!("form {} lost its destination or price control", self.data.id);
        };

        let city = match validate_destination(tree.value(destination), &self.catalog) {
            Ok(found) => found.to_city(),
            Err(err) => {
                self.report(tree, destination, &err.to_string());
                return false;
            }
        };
        let price_value = match validate_price(tree.value(price)) {
            Ok(value) => value,
            Err(err) => {
                self.report(tree, price, &err.to_string());
                return false;
            }
        };

        tree.set_custom_validity(destination, "");
        tree.set_custom_validity(price, "");
        let patch = FormPatch {
            city: Some(city),
            price: Some(price_value),
            ..FormPatch::default()
        };
        self.update_data(tree, Some(patch), true);

        let event = self.data.to_event();
        match self.callbacks.form_submit.as_mut() {
            Some(callback) => {
                callback(event);
                true
            }
            None => false,
        }
    }

    fn reset_requested(&mut self) {
        let request = match self.mode {
            FormMode::Edit => FormReset::Delete(self.data.to_event()),
            FormMode::Create => FormReset::Cancel,
        };
        if let Some(callback) = self.callbacks.form_reset.as_mut() {
            callback(request);
        }
    }

    fn type_list(&self) -> Markup {
        let id = &self.data.id;
        let groups = [TypeGroup::Transfer, TypeGroup::Activity].map(|group| {
            Markup::new(Tag::Block)
                .class("event__type-group")
                .child(Markup::text(format!("{}:", group.title())).muted())
                .children(
                    EVENT_TYPES
                        .iter()
                        .filter(|(_, g)| *g == group)
                        .map(|(name, _)| {
                            Markup::new(Tag::Radio)
                                .id(format!("event-type-{name}-{id}"))
                                .class("event__type-input")
                                .name(format!("event-type-{id}"))
                                .value(*name)
                                .label(capitalize(name))
                                .checked(*name == self.data.event_type.name)
                                .disabled(self.data.is_disabled)
                        }),
                )
        });
        Markup::new(Tag::Group)
            .class("event__type-list")
            .children(groups)
    }

    fn offers_section(&self) -> Option<Markup> {
        let entry = self.catalog.offers_for(&self.data.event_type.name);
        if entry.offers.is_empty() {
            return None;
        }
        let id = &self.data.id;
        Some(
            Markup::new(Tag::Group)
                .class("event__section--offers")
                .child(Markup::new(Tag::Heading).child(Markup::text("Offers")))
                .children(entry.offers.iter().map(|offer| {
                    Markup::new(Tag::Block).class("event__offer-selector").child(
                        Markup::new(Tag::Checkbox)
                            .id(format!("event-offer-{}-{id}", slug(&offer.label)))
                            .class("event__offer-checkbox")
                            .value(offer.label.clone())
                            .label(format!("{} +€{}", offer.label, offer.price))
                            .checked(self.data.event_type.has_offer(&offer.label))
                            .disabled(self.data.is_disabled),
                    )
                })),
        )
    }

    fn destination_section(&self) -> Option<Markup> {
        let City {
            description,
            photos,
            ..
        } = &self.data.city;
        if description.is_empty() && photos.is_empty() {
            return None;
        }
        let photos = (!photos.is_empty()).then(|| {
            Markup::new(Tag::Block)
                .class("event__photos-tape")
                .children(photos.iter().map(|photo| {
                    Markup::new(Tag::Image)
                        .class("event__photo")
                        .value(photo.src.clone())
                        .label(photo.description.clone())
                }))
        });
        Some(
            Markup::new(Tag::Group)
                .class("event__section--destination")
                .child(Markup::new(Tag::Heading).child(Markup::text("Destination")))
                .children(description_markup(description))
                .maybe(photos),
        )
    }
}

fn slug(label: &str) -> String {
    label
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect()
}

impl AbstractView for EventFormView {
    fn base(&self) -> &ViewBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ViewBase {
        &mut self.base
    }

    fn template(&self) -> Markup {
        let FormData {
            id,
            city,
            event_type,
            price,
            date_range,
            is_favorite,
            is_disabled,
            is_saving,
            is_deleting,
        } = &self.data;
        let disabled = *is_disabled;

        let destination = Markup::new(Tag::Block)
            .class("event__field-group--destination")
            .child(
                Markup::styled(
                    type_label(&event_type.name),
                    TextStyle {
                        strong: true,
                        ..TextStyle::default()
                    },
                )
                .class("event__type-output"),
            )
            .child(
                Markup::new(Tag::TextInput)
                    .id(format!("event-destination-{id}"))
                    .class("event__input--destination")
                    .value(city.name.clone())
                    .disabled(disabled),
            )
            .child(
                Markup::text(format!(
                    "({})",
                    self.catalog.destination_names().collect::<Vec<_>>().join(", ")
                ))
                .class("event__destination-hints")
                .muted(),
            );

        let time = Markup::new(Tag::Block)
            .class("event__field-group--time")
            .child(Markup::text("From"))
            .child(
                Markup::new(Tag::TextInput)
                    .id(format!("event-start-time-{id}"))
                    .class("event__input--time")
                    .value(format_picker_date(date_range.0))
                    .disabled(disabled),
            )
            .child(Markup::text("—"))
            .child(
                Markup::new(Tag::TextInput)
                    .id(format!("event-end-time-{id}"))
                    .class("event__input--time")
                    .value(format_picker_date(date_range.1))
                    .disabled(disabled),
            );

        let price = Markup::new(Tag::Block)
            .class("event__field-group--price")
            .child(Markup::text("€"))
            .child(
                Markup::new(Tag::TextInput)
                    .id(format!("event-price-{id}"))
                    .class("event__input--price")
                    .value(price.to_string())
                    .disabled(disabled),
            );

        let reset_label = match (self.mode, *is_deleting) {
            (FormMode::Create, _) => "Cancel",
            (FormMode::Edit, true) => "Deleting...",
            (FormMode::Edit, false) => "Delete",
        };
        let rollup = (self.mode == FormMode::Edit).then(|| {
            Markup::new(Tag::Button(ButtonRole::Plain))
                .id(format!("event-close-{id}"))
                .class("event__rollup-btn")
                .label("Close event")
                .disabled(disabled)
        });
        let controls = Markup::new(Tag::Block)
            .class("event__controls")
            .child(
                Markup::new(Tag::Button(ButtonRole::Submit))
                    .id(format!("event-save-{id}"))
                    .class("event__save-btn")
                    .label(if *is_saving { "Saving..." } else { "Save" })
                    .disabled(disabled),
            )
            .child(
                Markup::new(Tag::Button(ButtonRole::Reset))
                    .id(format!("event-reset-{id}"))
                    .class("event__reset-btn")
                    .label(reset_label)
                    .disabled(disabled),
            )
            .child(
                Markup::new(Tag::Checkbox)
                    .id(format!("event-favorite-{id}"))
                    .class("event__favorite-checkbox")
                    .label("Favorite")
                    .checked(*is_favorite)
                    .disabled(disabled),
            )
            .maybe(rollup);

        let header = Markup::new(Tag::Block)
            .class("event__header")
            .child(self.type_list())
            .child(destination)
            .child(time)
            .child(price)
            .child(controls);

        let details = Markup::new(Tag::Block)
            .class("event__details")
            .maybe(self.offers_section())
            .maybe(self.destination_section());

        Markup::new(Tag::Form)
            .id(format!("event-form-{id}"))
            .class("trip-events__item")
            .class("event--edit")
            .child(header)
            .child(details)
    }

    fn release_widgets(&mut self, tree: &mut HostTree) {
        self.destroy_date_pickers(tree);
    }

    fn handle(&mut self, handler: Handler, event: &InputEvent, tree: &mut HostTree) {
        match handler {
            Handler::TypeChange => self.type_changed(tree, &event.value),
            Handler::DestinationChange => self.destination_changed(tree, event.target, &event.value),
            Handler::PriceInput => self.price_input(tree, event.target, &event.value),
            Handler::StartDateChange => {
                if let Some(date) = event.date {
                    self.start_changed(tree, date);
                }
            }
            Handler::EndDateChange => {
                if let Some(date) = event.date {
                    self.end_changed(tree, date);
                }
            }
            Handler::FavoriteChange => self.favorite_changed(tree),
            Handler::OfferToggle => {
                self.toggle_offer(tree, &event.value, event.checked);
            }
            Handler::FormSubmit => {
                self.submit(tree);
            }
            Handler::FormReset => self.reset_requested(),
            Handler::RollupClick => {
                if let Some(callback) = self.callbacks.rollup_click.as_mut() {
                    callback();
                }
            }
            Handler::EditClick | Handler::SortTypeChange | Handler::EscapeKey => {}
        }
    }
}

impl StatefulView for EventFormView {
    type Data = FormData;

    fn data(&self) -> &FormData {
        &self.data
    }

    fn data_mut(&mut self) -> &mut FormData {
        &mut self.data
    }

    fn restore_handlers(&mut self, tree: &mut HostTree) {
        self.set_inner_handlers(tree);
        if self.callbacks.form_submit.is_some() {
            self.bind_form_submit(tree);
        }
        if self.callbacks.form_reset.is_some() {
            self.bind_form_reset(tree);
        }
        if self.callbacks.rollup_click.is_some() {
            self.bind_rollup_click(tree);
        }
    }
}
