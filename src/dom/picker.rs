//! Date picker widgets bound to text inputs.
//!
//! A picker is a host-side resource: whoever attaches one owns it and must
//! destroy it before the bound input is discarded.

use chrono::NaiveDateTime;
use tracing::debug;

use super::{Delivery, EventKind, HostTree, InputEvent, ListenerTarget, NodeId};

pub const DATE_FORMAT: &str = "%d/%m/%y %H:%M";

pub fn format_picker_date(value: NaiveDateTime) -> String {
    value.format(DATE_FORMAT).to_string()
}

pub fn parse_picker_date(text: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text.trim(), DATE_FORMAT).ok()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PickerId(u64);

#[derive(Clone, Debug)]
pub struct DatePickerOptions {
    pub default_date: NaiveDateTime,
    pub min_date: Option<NaiveDateTime>,
    pub on_change: ListenerTarget,
}

#[derive(Debug)]
pub(super) struct DatePicker {
    pub(super) input: NodeId,
    current: NaiveDateTime,
    options: DatePickerOptions,
}

impl HostTree {
    /// The initial date is clamped to `min_date` like a committed one.
    ///
    /// # Panics
    ///
    /// When `input` was discarded or already has a live picker.
    pub fn attach_date_picker(&mut self, input: NodeId, options: DatePickerOptions) -> PickerId {
        assert!(
            self.is_alive(input),
            "can't attach a date picker to discarded host node {input:?}"
        );
        if let Some(existing) = self.picker_for_input(input) {
            panic!("host node {input:?} already has date picker {existing:?}");
        }

        let id = PickerId(self.allocate());
        let current = match options.min_date {
            Some(min) if options.default_date < min => min,
            _ => options.default_date,
        };
        self.set_value(input, format_picker_date(current));
        self.pickers.insert(
            id,
            DatePicker {
                input,
                current,
                options,
            },
        );
        debug!(picker = ?id, ?input, "attached date picker");
        id
    }

    /// # Panics
    ///
    /// When the picker was already destroyed.
    pub fn destroy_date_picker(&mut self, id: PickerId) {
        if self.pickers.remove(&id).is_none() {
            panic!("date picker {id:?} was already destroyed");
        }
        debug!(picker = ?id, "destroyed date picker");
    }

    fn picker(&self, id: PickerId) -> &DatePicker {
        match self.pickers.get(&id) {
            Some(picker) => picker,
            None => panic!("date picker {id:?} was destroyed"),
        }
    }

    pub fn date_picker_date(&self, id: PickerId) -> NaiveDateTime {
        self.picker(id).current
    }

    pub fn date_picker_min(&self, id: PickerId) -> Option<NaiveDateTime> {
        self.picker(id).options.min_date
    }

    pub fn date_picker_input(&self, id: PickerId) -> NodeId {
        self.picker(id).input
    }

    pub fn live_date_pickers(&self) -> usize {
        self.pickers.len()
    }

    pub(super) fn picker_for_input(&self, input: NodeId) -> Option<PickerId> {
        self.pickers
            .iter()
            .find(|(_, picker)| picker.input == input)
            .map(|(id, _)| *id)
    }

    /// Reads the input's text, clamps it to the lower bound and rewrites the
    /// input. Unparseable text is reverted and nothing is delivered.
    pub(super) fn commit_picker(&mut self, id: PickerId) -> Option<Delivery> {
        let (input, current, min_date, on_change) = {
            let picker = self.picker(id);
            (
                picker.input,
                picker.current,
                picker.options.min_date,
                picker.options.on_change,
            )
        };

        let Some(parsed) = parse_picker_date(self.value(input)) else {
            debug!(picker = ?id, text = self.value(input), "rejected date text");
            self.set_value(input, format_picker_date(current));
            return None;
        };
        let date = match min_date {
            Some(min) if parsed < min => min,
            _ => parsed,
        };

        self.set_value(input, format_picker_date(date));
        if let Some(picker) = self.pickers.get_mut(&id) {
            picker.current = date;
        }

        Some(Delivery {
            target: on_change,
            event: InputEvent {
                kind: EventKind::Change,
                target: input,
                value: format_picker_date(date),
                checked: false,
                date: Some(date),
                key: None,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{Markup, Tag};
    use crate::view::{Handler, ViewKey};

    fn options(default: &str, min: Option<&str>) -> DatePickerOptions {
        DatePickerOptions {
            default_date: parse_picker_date(default).expect("date"),
            min_date: min.and_then(parse_picker_date),
            on_change: ListenerTarget::new(ViewKey::next(), Handler::EndDateChange),
        }
    }

    #[test]
    fn attach_writes_default_and_commit_clamps_to_min() {
        let mut tree = HostTree::new();
        let input = tree.create_element(Markup::new(Tag::TextInput));
        let picker = tree.attach_date_picker(input, options("18/03/26 11:00", Some("18/03/26 10:30")));
        assert_eq!(tree.value(input), "18/03/26 11:00");

        tree.set_value(input, "17/03/26 08:00");
        let deliveries = tree.dispatch(input, EventKind::Change);
        assert_eq!(deliveries.len(), 1);
        assert_eq!(deliveries[0].event.date, parse_picker_date("18/03/26 10:30"));
        assert_eq!(tree.value(input), "18/03/26 10:30");
        assert_eq!(tree.date_picker_date(picker), tree.date_picker_min(picker).expect("min"));
    }

    #[test]
    fn default_below_min_starts_at_min() {
        let mut tree = HostTree::new();
        let input = tree.create_element(Markup::new(Tag::TextInput));
        let picker = tree.attach_date_picker(input, options("18/03/26 09:00", Some("18/03/26 10:30")));
        assert_eq!(tree.value(input), "18/03/26 10:30");
        assert_eq!(tree.date_picker_date(picker), tree.date_picker_min(picker).expect("min"));
    }

    #[test]
    fn garbage_text_reverts_without_delivery() {
        let mut tree = HostTree::new();
        let input = tree.create_element(Markup::new(Tag::TextInput));
        tree.attach_date_picker(input, options("18/03/26 11:00", None));
        tree.set_value(input, "tomorrow-ish");
        assert!(tree.dispatch(input, EventKind::Change).is_empty());
        assert_eq!(tree.value(input), "18/03/26 11:00");
    }

    #[test]
    #[should_panic(expected = "still attached")]
    fn discarding_input_with_live_picker_is_fatal() {
        let mut tree = HostTree::new();
        let input = tree.create_element(Markup::new(Tag::TextInput));
        tree.attach_date_picker(input, options("18/03/26 11:00", None));
        tree.discard(input);
    }

    #[test]
    #[should_panic(expected = "already destroyed")]
    fn destroying_twice_is_fatal() {
        let mut tree = HostTree::new();
        let input = tree.create_element(Markup::new(Tag::TextInput));
        let picker = tree.attach_date_picker(input, options("18/03/26 11:00", None));
        tree.destroy_date_picker(picker);
        tree.destroy_date_picker(picker);
    }
}
