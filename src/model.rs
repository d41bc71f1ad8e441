use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Photo {
    pub src: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct City {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub photos: Vec<Photo>,
}

/// A selected add-on. Unique by `label` within one event type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferRef {
    pub label: String,
    pub price: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventType {
    pub name: String,
    #[serde(default)]
    pub offers: Vec<OfferRef>,
}

impl EventType {
    pub fn bare(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            offers: Vec::new(),
        }
    }

    pub fn has_offer(&self, label: &str) -> bool {
        self.offers.iter().any(|offer| offer.label == label)
    }
}

/// One itinerary item, as owned by the timeline.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub city: City,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub price: u32,
    pub date_range: (NaiveDateTime, NaiveDateTime),
    #[serde(default)]
    pub is_favorite: bool,
}

impl Event {
    pub fn start(&self) -> NaiveDateTime {
        self.date_range.0
    }

    pub fn end(&self) -> NaiveDateTime {
        self.date_range.1
    }

    pub fn day(&self) -> NaiveDate {
        self.date_range.0.date()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SortMode {
    #[default]
    Default,
    Time,
    Price,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown sort mode '{0}' (expected event, time or price)")]
pub struct ParseSortModeError(String);

impl SortMode {
    pub const ALL: [SortMode; 3] = [SortMode::Default, SortMode::Time, SortMode::Price];

    pub fn as_str(self) -> &'static str {
        match self {
            SortMode::Default => "event",
            SortMode::Time => "time",
            SortMode::Price => "price",
        }
    }

    /// Value carried by the sort control's radio input.
    pub fn control_value(self) -> String {
        format!("sort-{}", self.as_str())
    }
}

impl FromStr for SortMode {
    type Err = ParseSortModeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.strip_prefix("sort-").unwrap_or(value) {
            "event" | "default" | "day" => Ok(SortMode::Default),
            "time" => Ok(SortMode::Time),
            "price" => Ok(SortMode::Price),
            other => Err(ParseSortModeError(other.to_string())),
        }
    }
}

impl fmt::Display for SortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn by_start(a: &Event, b: &Event) -> Ordering {
    a.start().cmp(&b.start())
}

pub fn by_price(a: &Event, b: &Event) -> Ordering {
    a.price.cmp(&b.price)
}

/// Distinct calendar days, earliest first.
pub fn trip_days(events: &[Event]) -> Vec<NaiveDate> {
    let mut days: Vec<NaiveDate> = events.iter().map(Event::day).collect();
    days.sort_unstable();
    days.dedup();
    days
}

pub fn events_on_day(events: &[Event], day: NaiveDate) -> Vec<&Event> {
    events.iter().filter(|event| event.day() == day).collect()
}

pub fn format_time(value: NaiveDateTime) -> String {
    value.format("%H:%M").to_string()
}

pub fn format_day(value: NaiveDate) -> String {
    value.format("%b %d").to_string().to_ascii_uppercase()
}

pub fn format_duration(start: NaiveDateTime, end: NaiveDateTime) -> String {
    let minutes = (end - start).num_minutes().max(0);
    let days = minutes / (24 * 60);
    let hours = (minutes / 60) % 24;
    let rest = minutes % 60;

    if days > 0 {
        format!("{days:02}D {hours:02}H {rest:02}M")
    } else if hours > 0 {
        format!("{hours:02}H {rest:02}M")
    } else {
        format!("{rest:02}M")
    }
}

pub fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::NaiveDateTime;

    use super::{City, Event, EventType, OfferRef};

    pub fn at(value: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M").expect("fixture date")
    }

    pub fn event(id: &str, city: &str, start: &str, end: &str, price: u32) -> Event {
        Event {
            id: id.to_string(),
            city: City {
                name: city.to_string(),
                description: String::new(),
                photos: Vec::new(),
            },
            event_type: EventType {
                name: "taxi".to_string(),
                offers: vec![OfferRef {
                    label: "Order Uber".to_string(),
                    price: 20,
                }],
            },
            price,
            date_range: (at(start), at(end)),
            is_favorite: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::{at, event};
    use super::*;

    fn permutations(items: &[Event]) -> Vec<Vec<Event>> {
        if items.len() <= 1 {
            return vec![items.to_vec()];
        }
        let mut out = Vec::new();
        for idx in 0..items.len() {
            let mut rest = items.to_vec();
            let head = rest.remove(idx);
            for mut tail in permutations(&rest) {
                tail.insert(0, head.clone());
                out.push(tail);
            }
        }
        out
    }

    fn sample() -> Vec<Event> {
        vec![
            event("1", "Amsterdam", "2026-03-18 10:30", "2026-03-18 11:00", 20),
            event("2", "Geneva", "2026-03-18 09:00", "2026-03-18 12:00", 160),
            event("3", "Chamonix", "2026-03-19 12:25", "2026-03-19 13:35", 20),
            event("4", "Paris", "2026-03-18 09:00", "2026-03-20 14:00", 600),
        ]
    }

    #[test]
    fn time_sort_is_monotonic_and_stable_for_all_orders() {
        for mut events in permutations(&sample()) {
            let before = events.clone();
            events.sort_by(by_start);
            assert!(events.windows(2).all(|w| w[0].start() <= w[1].start()));

            let tied: Vec<&str> = events
                .iter()
                .filter(|e| e.start() == at("2026-03-18 09:00"))
                .map(|e| e.id.as_str())
                .collect();
            let expected: Vec<&str> = before
                .iter()
                .filter(|e| e.start() == at("2026-03-18 09:00"))
                .map(|e| e.id.as_str())
                .collect();
            assert_eq!(tied, expected);
        }
    }

    #[test]
    fn price_sort_is_monotonic_and_stable_for_all_orders() {
        for mut events in permutations(&sample()) {
            let before = events.clone();
            events.sort_by(by_price);
            assert!(events.windows(2).all(|w| w[0].price <= w[1].price));

            let tied: Vec<&str> = events
                .iter()
                .filter(|e| e.price == 20)
                .map(|e| e.id.as_str())
                .collect();
            let expected: Vec<&str> = before
                .iter()
                .filter(|e| e.price == 20)
                .map(|e| e.id.as_str())
                .collect();
            assert_eq!(tied, expected);
        }
    }

    #[test]
    fn trip_days_are_distinct_and_chronological() {
        let days = trip_days(&sample());
        assert_eq!(
            days,
            vec![at("2026-03-18 00:00").date(), at("2026-03-19 00:00").date()]
        );
        let events = sample();
        let first: Vec<&str> = events_on_day(&events, days[0])
            .iter()
            .map(|e| e.id.as_str())
            .collect();
        assert_eq!(first, vec!["1", "2", "4"]);
    }

    #[test]
    fn sort_mode_parses_control_values() {
        assert_eq!("sort-time".parse::<SortMode>(), Ok(SortMode::Time));
        assert_eq!("price".parse::<SortMode>(), Ok(SortMode::Price));
        assert_eq!("sort-event".parse::<SortMode>(), Ok(SortMode::Default));
        assert!("sort-offers".parse::<SortMode>().is_err());
        assert_eq!(SortMode::Price.control_value(), "sort-price");
    }

    #[test]
    fn durations_pick_the_largest_unit() {
        assert_eq!(
            format_duration(at("2026-03-18 10:30"), at("2026-03-18 11:00")),
            "30M"
        );
        assert_eq!(
            format_duration(at("2026-03-18 10:30"), at("2026-03-18 12:05")),
            "01H 35M"
        );
        assert_eq!(
            format_duration(at("2026-03-18 10:30"), at("2026-03-20 12:35")),
            "02D 02H 05M"
        );
    }

    #[test]
    fn day_and_label_formatting() {
        assert_eq!(format_day(at("2026-03-18 10:30").date()), "MAR 18");
        assert_eq!(format_time(at("2026-03-18 09:05")), "09:05");
        assert_eq!(capitalize("check-in"), "Check-in");
    }
}
