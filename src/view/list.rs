use chrono::NaiveDate;

use crate::dom::{HostTree, Markup, NodeId, Tag, TextStyle};
use crate::model::format_day;

use super::{AbstractView, ViewBase};

#[derive(Default)]
pub struct TripListView {
    base: ViewBase,
}

impl TripListView {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AbstractView for TripListView {
    fn base(&self) -> &ViewBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ViewBase {
        &mut self.base
    }

    fn template(&self) -> Markup {
        Markup::new(Tag::Block).class("trip-days")
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DayInfo {
    pub date: NaiveDate,
    pub counter: usize,
}

/// One day bucket. Without a [`DayInfo`] it is the headerless flat bucket
/// used by the time and price orders.
pub struct TripDayView {
    base: ViewBase,
    info: Option<DayInfo>,
}

impl TripDayView {
    pub fn new(info: Option<DayInfo>) -> Self {
        Self {
            base: ViewBase::new(),
            info,
        }
    }

    pub fn info(&self) -> Option<DayInfo> {
        self.info
    }

    /// Node that receives this bucket's event rows.
    pub fn container(&mut self, tree: &mut HostTree) -> NodeId {
        let root = self.element(tree);
        match tree.find_by_class(root, "trip-events__list") {
            Some(node) => node,
            None => panic!("day template lost its event list"),
        }
    }
}

impl AbstractView for TripDayView {
    fn base(&self) -> &ViewBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ViewBase {
        &mut self.base
    }

    fn template(&self) -> Markup {
        let header = self.info.map(|info| {
            Markup::new(Tag::Heading)
                .class("day__info")
                .child(
                    Markup::styled(
                        info.counter.to_string(),
                        TextStyle {
                            strong: true,
                            ..TextStyle::default()
                        },
                    )
                    .class("day__counter"),
                )
                .child(Markup::text(format_day(info.date)).class("day__date"))
        });

        Markup::new(Tag::Block)
            .class("trip-days__item")
            .class("day")
            .maybe(header)
            .child(Markup::new(Tag::Group).class("trip-events__list"))
    }
}

#[derive(Default)]
pub struct NoEventsView {
    base: ViewBase,
}

impl NoEventsView {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AbstractView for NoEventsView {
    fn base(&self) -> &ViewBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ViewBase {
        &mut self.base
    }

    fn template(&self) -> Markup {
        Markup::new(Tag::Block)
            .class("trip-events__msg")
            .child(Markup::text("Click New Event to create your first point"))
    }
}
