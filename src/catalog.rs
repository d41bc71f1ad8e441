//! Static lookup tables: event-type taxonomy, offers per type, destinations.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::LoadError;
use crate::model::{capitalize, City, OfferRef, Photo};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TypeGroup {
    Transfer,
    Activity,
}

impl TypeGroup {
    pub fn title(self) -> &'static str {
        match self {
            TypeGroup::Transfer => "Transfer",
            TypeGroup::Activity => "Activity",
        }
    }
}

pub const EVENT_TYPES: &[(&str, TypeGroup)] = &[
    ("taxi", TypeGroup::Transfer),
    ("bus", TypeGroup::Transfer),
    ("train", TypeGroup::Transfer),
    ("ship", TypeGroup::Transfer),
    ("transport", TypeGroup::Transfer),
    ("drive", TypeGroup::Transfer),
    ("flight", TypeGroup::Transfer),
    ("check-in", TypeGroup::Activity),
    ("sightseeing", TypeGroup::Activity),
    ("restaurant", TypeGroup::Activity),
];

pub fn type_group(name: &str) -> Option<TypeGroup> {
    EVENT_TYPES
        .iter()
        .find(|(type_name, _)| *type_name == name)
        .map(|(_, group)| *group)
}

/// "Taxi to", "Check-in in".
pub fn type_label(name: &str) -> String {
    let preposition = match type_group(name) {
        Some(TypeGroup::Activity) => "in",
        _ => "to",
    };
    format!("{} {preposition}", capitalize(name))
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferEntry {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub offers: Vec<OfferRef>,
}

impl OfferEntry {
    pub fn offer(&self, label: &str) -> Option<&OfferRef> {
        self.offers.iter().find(|offer| offer.label == label)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destination {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub pictures: Vec<Photo>,
}

impl Destination {
    pub fn to_city(&self) -> City {
        City {
            name: self.name.clone(),
            description: self.description.clone(),
            photos: self.pictures.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    pub offers: Vec<OfferEntry>,
    pub destinations: Vec<Destination>,
}

impl Catalog {
    pub fn from_json(source: &str) -> Result<Self, LoadError> {
        let catalog: Catalog = serde_json::from_str(source)?;
        catalog.check()?;
        Ok(catalog)
    }

    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let source = fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&source)
    }

    fn check(&self) -> Result<(), LoadError> {
        for (name, _) in EVENT_TYPES {
            if self.find_offers(name).is_none() {
                return Err(LoadError::MissingOfferEntry((*name).to_string()));
            }
        }
        Ok(())
    }

    pub fn find_offers(&self, type_name: &str) -> Option<&OfferEntry> {
        self.offers
            .iter()
            .find(|entry| entry.event_type == type_name)
    }

    /// Offer entry for a type the taxonomy knows about.
    ///
    /// # Panics
    ///
    /// When the catalog has no entry for `type_name`; every type a form can
    /// select must be present.
    pub fn offers_for(&self, type_name: &str) -> &OfferEntry {
        match self.find_offers(type_name) {
            Some(entry) => entry,
            None => panic!("offer catalog has no entry for event type '{type_name}'"),
        }
    }

    pub fn destination(&self, name: &str) -> Option<&Destination> {
        self.destinations.iter().find(|dest| dest.name == name)
    }

    pub fn destination_names(&self) -> impl Iterator<Item = &str> {
        self.destinations.iter().map(|dest| dest.name.as_str())
    }

    pub fn default_type_name(&self) -> &'static str {
        EVENT_TYPES[0].0
    }

    pub fn builtin() -> Self {
        fn offer(label: &str, price: u32) -> OfferRef {
            OfferRef {
                label: label.to_string(),
                price,
            }
        }
        fn entry(event_type: &str, offers: Vec<OfferRef>) -> OfferEntry {
            OfferEntry {
                event_type: event_type.to_string(),
                offers,
            }
        }
        fn destination(name: &str, description: &str, pictures: &[&str]) -> Destination {
            Destination {
                name: name.to_string(),
                description: description.to_string(),
                pictures: pictures
                    .iter()
                    .map(|src| Photo {
                        src: (*src).to_string(),
                        description: format!("{name} view"),
                    })
                    .collect(),
            }
        }

        Self {
            offers: vec![
                entry(
                    "taxi",
                    vec![offer("Order Uber", 20), offer("Upgrade to business", 120)],
                ),
                entry("bus", vec![offer("Choose seats", 5), offer("Add luggage", 30)]),
                entry(
                    "train",
                    vec![offer("Travel by train", 40), offer("Add meal", 15)],
                ),
                entry("ship", vec![offer("Choose cabin", 50)]),
                entry("transport", Vec::new()),
                entry("drive", vec![offer("Rent a car", 200)]),
                entry(
                    "flight",
                    vec![
                        offer("Add luggage", 50),
                        offer("Switch to comfort", 80),
                        offer("Add meal", 15),
                        offer("Choose seats", 5),
                    ],
                ),
                entry("check-in", vec![offer("Add breakfast", 50)]),
                entry(
                    "sightseeing",
                    vec![offer("Book tickets", 40), offer("Lunch in city", 30)],
                ),
                entry("restaurant", Vec::new()),
            ],
            destinations: vec![
                destination(
                    "Amsterdam",
                    "Amsterdam is the capital of the *Netherlands*, known for its **canals** and narrow houses.",
                    &["img/photos/amsterdam-1.jpg", "img/photos/amsterdam-2.jpg"],
                ),
                destination(
                    "Chamonix",
                    "Chamonix-Mont-Blanc is a resort area near the junction of **France**, Switzerland and Italy.",
                    &["img/photos/chamonix-1.jpg"],
                ),
                destination(
                    "Geneva",
                    "Geneva is a city in Switzerland that lies at the southern tip of expansive *Lac Léman*.",
                    &[],
                ),
                destination(
                    "Moscow",
                    "Moscow is the capital of Russia, with the **Red Square** at its heart.",
                    &["img/photos/moscow-1.jpg", "img/photos/moscow-2.jpg"],
                ),
                destination("Saint Petersburg", "", &[]),
                destination(
                    "Paris",
                    "Paris is the capital of France. ~~Quiet~~ Lively at any hour.",
                    &["img/photos/paris-1.jpg"],
                ),
            ],
        }
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}
