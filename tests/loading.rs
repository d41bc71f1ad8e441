use std::fs;

use waypoint::catalog::Catalog;
use waypoint::error::LoadError;
use waypoint::itinerary;

const TRIP: &str = r#"{
    "events": [
        {
            "id": "1",
            "city": { "name": "Amsterdam" },
            "type": { "name": "taxi", "offers": [{ "label": "Order Uber", "price": 20 }] },
            "price": 20,
            "date_range": ["2026-03-18T10:30:00", "2026-03-18T11:00:00"],
            "is_favorite": true
        },
        {
            "id": "2",
            "city": { "name": "Geneva" },
            "type": { "name": "check-in", "offers": [] },
            "price": 160,
            "date_range": ["2026-03-18T14:00:00", "2026-03-19T10:00:00"]
        }
    ]
}"#;

#[test]
fn loads_itinerary_from_disk() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("trip.json");
    fs::write(&path, TRIP)?;

    let events = itinerary::load(&path, &Catalog::builtin())?;
    assert_eq!(events.len(), 2);
    assert!(events[0].is_favorite);
    assert!(!events[1].is_favorite);
    assert_eq!(events[1].event_type.name, "check-in");
    Ok(())
}

#[test]
fn missing_file_reports_its_path() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("absent.json");
    match itinerary::load(&path, &Catalog::builtin()) {
        Err(LoadError::Io { path: reported, .. }) => assert_eq!(reported, path),
        other => anyhow::bail!("unexpected result: {:?}", other),
    }
    Ok(())
}

#[test]
fn rejects_inverted_ranges_and_foreign_offers() -> anyhow::Result<()> {
    let catalog = Catalog::builtin();

    let inverted = TRIP.replace("2026-03-19T10:00:00", "2026-03-17T10:00:00");
    match itinerary::parse(&inverted, &catalog) {
        Err(LoadError::InvertedRange { id, .. }) => assert_eq!(id, "2"),
        other => anyhow::bail!("unexpected result: {:?}", other),
    }

    let foreign = TRIP.replace("\"Order Uber\"", "\"Add meal\"");
    match itinerary::parse(&foreign, &catalog) {
        Err(LoadError::UnknownOffer { label, type_name, .. }) => {
            assert_eq!(label, "Add meal");
            assert_eq!(type_name, "taxi");
        }
        other => anyhow::bail!("unexpected result: {:?}", other),
    }

    let duplicate = TRIP.replace("\"id\": \"2\"", "\"id\": \"1\"");
    assert!(matches!(
        itinerary::parse(&duplicate, &catalog),
        Err(LoadError::DuplicateId(id)) if id == "1"
    ));
    Ok(())
}

#[test]
fn custom_catalog_must_cover_every_type() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("catalog.json");

    let mut catalog = Catalog::builtin();
    fs::write(&path, serde_json::to_string(&catalog)?)?;
    assert_eq!(Catalog::load(&path)?, catalog);

    catalog.offers.retain(|entry| entry.event_type != "ship");
    fs::write(&path, serde_json::to_string(&catalog)?)?;
    match Catalog::load(&path) {
        Err(LoadError::MissingOfferEntry(name)) => assert_eq!(name, "ship"),
        other => anyhow::bail!("unexpected result: {:?}", other),
    }
    Ok(())
}
