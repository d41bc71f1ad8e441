use std::path::PathBuf;

use thiserror::Error;

/// A user input problem surfaced on the offending form control.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Select value from the list below, please!")]
    DestinationMissing,

    #[error("Can't find your destination, try to select value from hints below, please!")]
    UnknownDestination(String),

    #[error("Enter the price, please!")]
    PriceMissing,

    #[error("Price must be a non-negative whole number!")]
    PriceNotNumber,

    #[error("Price can't start with a leading zero!")]
    PriceLeadingZero,

    #[error("Price is too large!")]
    PriceTooLarge,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("event {id}: end {end} is before start {start}")]
    InvertedRange {
        id: String,
        start: String,
        end: String,
    },

    #[error("event {id}: unknown event type '{name}'")]
    UnknownType { id: String, name: String },

    #[error("event {id}: offer '{label}' is not available for '{type_name}'")]
    UnknownOffer {
        id: String,
        label: String,
        type_name: String,
    },

    #[error("event id '{0}' is reserved for unsaved events")]
    ReservedId(String),

    #[error("duplicate event id '{0}'")]
    DuplicateId(String),

    #[error("catalog has no offer entry for type '{0}'")]
    MissingOfferEntry(String),
}
