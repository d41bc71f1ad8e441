//! Itinerary files: `{ "events": [ ... ] }`.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::catalog::{type_group, Catalog};
use crate::error::LoadError;
use crate::model::Event;
use crate::timeline::NEW_EVENT_ID;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Itinerary {
    #[serde(default)]
    pub events: Vec<Event>,
}

pub fn parse(source: &str, catalog: &Catalog) -> Result<Vec<Event>, LoadError> {
    let itinerary: Itinerary = serde_json::from_str(source)?;
    check(&itinerary.events, catalog)?;
    Ok(itinerary.events)
}

pub fn load(path: &Path, catalog: &Catalog) -> Result<Vec<Event>, LoadError> {
    let source = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse(&source, catalog)
}

fn check(events: &[Event], catalog: &Catalog) -> Result<(), LoadError> {
    let mut seen = HashSet::new();
    for event in events {
        if event.id == NEW_EVENT_ID {
            return Err(LoadError::ReservedId(event.id.clone()));
        }
        if !seen.insert(event.id.as_str()) {
            return Err(LoadError::DuplicateId(event.id.clone()));
        }
        if event.end() < event.start() {
            return Err(LoadError::InvertedRange {
                id: event.id.clone(),
                start: event.start().to_string(),
                end: event.end().to_string(),
            });
        }

        let type_name = &event.event_type.name;
        let entry = match (type_group(type_name), catalog.find_offers(type_name)) {
            (Some(_), Some(entry)) => entry,
            _ => {
                return Err(LoadError::UnknownType {
                    id: event.id.clone(),
                    name: type_name.clone(),
                })
            }
        };
        if let Some(offer) = event
            .event_type
            .offers
            .iter()
            .find(|offer| entry.offer(&offer.label).is_none())
        {
            return Err(LoadError::UnknownOffer {
                id: event.id.clone(),
                label: offer.label.clone(),
                type_name: type_name.clone(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_EVENTS: &str = r#"{
        "events": [
            {
                "id": "1",
                "city": { "name": "Amsterdam" },
                "type": { "name": "taxi", "offers": [{ "label": "Order Uber", "price": 20 }] },
                "price": 20,
                "date_range": ["2026-03-18T10:30:00", "2026-03-18T11:00:00"]
            },
            {
                "id": "2",
                "city": { "name": "Geneva", "description": "Lake city" },
                "type": { "name": "check-in" },
                "price": 600,
                "date_range": ["2026-03-18T12:00:00", "2026-03-19T10:00:00"],
                "is_favorite": true
            }
        ]
    }"#;

    #[test]
    fn parses_events_with_defaults() {
        let events = parse(TWO_EVENTS, &Catalog::builtin()).expect("valid itinerary");
        assert_eq!(events.len(), 2);
        assert!(events[0].city.photos.is_empty());
        assert!(!events[0].is_favorite);
        assert!(events[1].is_favorite);
        assert_eq!(events[1].event_type.name, "check-in");
    }

    #[test]
    fn rejects_the_new_event_id() {
        let source = TWO_EVENTS.replace(r#""id": "2""#, r#""id": "new""#);
        let err = parse(&source, &Catalog::builtin()).expect_err("reserved id");
        assert!(matches!(err, LoadError::ReservedId(id) if id == "new"));
    }

    #[test]
    fn rejects_inverted_range() {
        let source = TWO_EVENTS.replace("2026-03-18T11:00:00", "2026-03-18T09:00:00");
        let err = parse(&source, &Catalog::builtin()).expect_err("inverted");
        assert!(matches!(err, LoadError::InvertedRange { id, .. } if id == "1"));
    }

    #[test]
    fn rejects_offer_outside_type_catalog() {
        let source = TWO_EVENTS.replace("Order Uber", "Add breakfast");
        let err = parse(&source, &Catalog::builtin()).expect_err("foreign offer");
        assert!(matches!(err, LoadError::UnknownOffer { label, .. } if label == "Add breakfast"));
    }

    #[test]
    fn rejects_unknown_type_and_duplicate_ids() {
        let source = TWO_EVENTS.replace("\"check-in\"", "\"hovercraft\"");
        assert!(matches!(
            parse(&source, &Catalog::builtin()),
            Err(LoadError::UnknownType { .. })
        ));

        let source = TWO_EVENTS.replace("\"id\": \"2\"", "\"id\": \"1\"");
        assert!(matches!(
            parse(&source, &Catalog::builtin()),
            Err(LoadError::DuplicateId(id)) if id == "1"
        ));
    }
}
