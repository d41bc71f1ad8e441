use crate::dom::{EventKind, HostTree, InputEvent, ListenerTarget, Markup, Tag, TextStyle};
use crate::model::SortMode;

use super::{AbstractView, Handler, ViewBase};

#[derive(Default)]
struct SortCallbacks {
    sort_type_change: Option<Box<dyn FnMut(SortMode)>>,
}

/// Radio group over the sort modes.
pub struct SortView {
    base: ViewBase,
    current: SortMode,
    callbacks: SortCallbacks,
}

impl SortView {
    pub fn new(current: SortMode) -> Self {
        Self {
            base: ViewBase::new(),
            current,
            callbacks: SortCallbacks::default(),
        }
    }

    pub fn current(&self) -> SortMode {
        self.current
    }

    /// Takes effect on the next render; a mounted node is dropped.
    pub fn update_current_sort_type(&mut self, tree: &mut HostTree, mode: SortMode) {
        if self.current == mode {
            return;
        }
        self.current = mode;
        self.remove_element(tree);
    }

    pub fn set_sort_type_change_handler(
        &mut self,
        tree: &mut HostTree,
        callback: impl FnMut(SortMode) + 'static,
    ) {
        self.callbacks.sort_type_change = Some(Box::new(callback));
        let root = self.element(tree);
        let target = ListenerTarget::new(self.key(), Handler::SortTypeChange);
        for input in tree.find_all_by_class(root, "trip-sort__input") {
            tree.add_event_listener(input, EventKind::Change, target);
        }
    }
}

impl AbstractView for SortView {
    fn base(&self) -> &ViewBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ViewBase {
        &mut self.base
    }

    fn template(&self) -> Markup {
        let day = if self.current == SortMode::Default {
            "Day"
        } else {
            ""
        };
        Markup::new(Tag::Form)
            .class("trip-sort")
            .child(
                Markup::styled(
                    day,
                    TextStyle {
                        strong: true,
                        ..TextStyle::default()
                    },
                )
                .class("trip-sort__item--day"),
            )
            .children(SortMode::ALL.into_iter().map(|mode| {
                Markup::new(Tag::Radio)
                    .id(format!("sort-{}", mode.as_str()))
                    .class("trip-sort__input")
                    .name("trip-sort")
                    .value(mode.control_value())
                    .label(mode.as_str())
                    .checked(mode == self.current)
            }))
            .child(Markup::text("Offers").muted().class("trip-sort__item--offers"))
    }

    fn handle(&mut self, handler: Handler, event: &InputEvent, _tree: &mut HostTree) {
        if handler != Handler::SortTypeChange {
            return;
        }
        let Ok(mode) = event.value.parse::<SortMode>() else {
            return;
        };
        if let Some(callback) = self.callbacks.sort_type_change.as_mut() {
            callback(mode);
        }
    }
}
