use crate::catalog::type_label;
use crate::dom::{ButtonRole, EventKind, HostTree, InputEvent, ListenerTarget, Markup, Tag, TextStyle};
use crate::model::{format_duration, format_time, Event};

use super::{AbstractView, Handler, ViewBase};

const MAX_LISTED_OFFERS: usize = 3;

#[derive(Default)]
struct RowCallbacks {
    edit_click: Option<Box<dyn FnMut()>>,
}

/// Read-only row for one canonical event.
pub struct EventRowView {
    base: ViewBase,
    event: Event,
    callbacks: RowCallbacks,
}

impl EventRowView {
    pub fn new(event: Event) -> Self {
        Self {
            base: ViewBase::new(),
            event,
            callbacks: RowCallbacks::default(),
        }
    }

    pub fn event(&self) -> &Event {
        &self.event
    }

    pub fn set_edit_click_handler(&mut self, tree: &mut HostTree, callback: impl FnMut() + 'static) {
        self.callbacks.edit_click = Some(Box::new(callback));
        let root = self.element(tree);
        if let Some(button) = tree.find_by_class(root, "event__rollup-btn") {
            tree.add_event_listener(
                button,
                EventKind::Click,
                ListenerTarget::new(self.key(), Handler::EditClick),
            );
        }
    }
}

impl AbstractView for EventRowView {
    fn base(&self) -> &ViewBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ViewBase {
        &mut self.base
    }

    fn template(&self) -> Markup {
        let Event {
            id,
            city,
            event_type,
            price,
            date_range,
            is_favorite,
        } = &self.event;
        let (start, end) = *date_range;

        let title = Markup::new(Tag::Block)
            .class("event__header")
            .child(Markup::text(format!("[{}]", event_type.name)).muted())
            .child(
                Markup::styled(
                    format!("{} {}", type_label(&event_type.name), city.name),
                    TextStyle {
                        strong: true,
                        ..TextStyle::default()
                    },
                )
                .class("event__title"),
            )
            .maybe((*is_favorite).then(|| Markup::text("★").class("event__favorite")));

        let schedule = Markup::new(Tag::Block)
            .class("event__schedule")
            .child(
                Markup::text(format!("{} — {}", format_time(start), format_time(end)))
                    .class("event__time"),
            )
            .child(Markup::text(format_duration(start, end)).class("event__duration"))
            .child(Markup::text(format!("€ {price}")).class("event__price"));

        let offers = (!event_type.offers.is_empty()).then(|| {
            Markup::new(Tag::Group)
                .class("event__selected-offers")
                .children(event_type.offers.iter().take(MAX_LISTED_OFFERS).map(|offer| {
                    Markup::text(format!("+ {} €{}", offer.label, offer.price))
                        .class("event__offer")
                        .muted()
                }))
        });

        Markup::new(Tag::Group)
            .id(format!("event-row-{id}"))
            .class("trip-events__item")
            .class("event")
            .child(title)
            .child(schedule)
            .maybe(offers)
            .child(
                Markup::new(Tag::Button(ButtonRole::Plain))
                    .id(format!("event-open-{id}"))
                    .class("event__rollup-btn")
                    .label("Open event"),
            )
    }

    fn handle(&mut self, handler: Handler, _event: &InputEvent, _tree: &mut HostTree) {
        if handler != Handler::EditClick {
            return;
        }
        if let Some(callback) = self.callbacks.edit_click.as_mut() {
            callback();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;
    use crate::model::fixtures::event;

    #[test]
    fn renders_snapshot_and_signals_edit() {
        let mut tree = HostTree::new();
        let mut row = EventRowView::new(event(
            "1",
            "Amsterdam",
            "2026-03-18 10:30",
            "2026-03-18 11:00",
            20,
        ));
        let clicks = Rc::new(Cell::new(0));
        let counter = Rc::clone(&clicks);
        row.set_edit_click_handler(&mut tree, move || counter.set(counter.get() + 1));

        let root = row.element(&mut tree);
        let title = tree.find_by_class(root, "event__title").expect("title");
        assert_eq!(tree.value(title), "Taxi to Amsterdam");
        let time = tree.find_by_class(root, "event__time").expect("time");
        assert_eq!(tree.value(time), "10:30 — 11:00");
        assert_eq!(tree.find_all_by_class(root, "event__offer").len(), 1);

        let button = tree.find_by_id(root, "event-open-1").expect("rollup");
        for delivery in tree.dispatch(button, EventKind::Click) {
            row.handle(delivery.target.handler, &delivery.event, &mut tree);
        }
        assert_eq!(clicks.get(), 1);
    }
}
