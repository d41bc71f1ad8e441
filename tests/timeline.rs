use std::rc::Rc;

use waypoint::catalog::Catalog;
use waypoint::dom::{EventKind, HostKey, HostTree, Markup, NodeId, Tag};
use waypoint::itinerary;
use waypoint::model::SortMode;
use waypoint::paint::{paint, plain_render};
use waypoint::timeline::Timeline;

const TRIP: &str = r#"{
    "events": [
        {
            "id": "1",
            "city": { "name": "Amsterdam" },
            "type": { "name": "flight", "offers": [{ "label": "Add luggage", "price": 50 }] },
            "price": 300,
            "date_range": ["2026-03-19T07:00:00", "2026-03-19T09:35:00"]
        },
        {
            "id": "2",
            "city": { "name": "Geneva" },
            "type": { "name": "taxi", "offers": [] },
            "price": 40,
            "date_range": ["2026-03-18T21:00:00", "2026-03-18T21:30:00"]
        },
        {
            "id": "3",
            "city": { "name": "Geneva" },
            "type": { "name": "check-in", "offers": [] },
            "price": 160,
            "date_range": ["2026-03-18T22:00:00", "2026-03-19T06:00:00"]
        }
    ]
}"#;

fn setup() -> anyhow::Result<(HostTree, NodeId, Timeline)> {
    let catalog = Catalog::builtin();
    let events = itinerary::parse(TRIP, &catalog)?;
    let mut tree = HostTree::new();
    let root = tree.create_element(Markup::new(Tag::Block));
    let mut timeline = Timeline::new(root, Rc::new(catalog));
    timeline.init(&mut tree, events);
    Ok((tree, root, timeline))
}

fn open_form(tree: &mut HostTree, timeline: &mut Timeline, id: &str) -> anyhow::Result<NodeId> {
    let row = timeline
        .row_element(id)
        .ok_or_else(|| anyhow::anyhow!("no row for {id}"))?;
    let button = tree
        .find_by_id(row, &format!("event-open-{id}"))
        .ok_or_else(|| anyhow::anyhow!("no open button"))?;
    timeline.dispatch(tree, button, EventKind::Click);
    timeline
        .form_element(id)
        .ok_or_else(|| anyhow::anyhow!("no form for {id}"))
}

#[test]
fn plain_output_lists_days_in_order() -> anyhow::Result<()> {
    let (tree, root, _timeline) = setup()?;
    let text = plain_render(&paint(&tree, root, None));

    let first_day = text.find("MAR 18").ok_or_else(|| anyhow::anyhow!("missing MAR 18"))?;
    let second_day = text.find("MAR 19").ok_or_else(|| anyhow::anyhow!("missing MAR 19"))?;
    assert!(first_day < second_day);

    let flight = text
        .find("Flight to Amsterdam")
        .ok_or_else(|| anyhow::anyhow!("missing flight"))?;
    assert!(flight > second_day);
    assert!(text.contains("Check-in in Geneva"));
    assert!(text.contains("+ Add luggage €50"));
    Ok(())
}

#[test]
fn moving_an_event_to_another_day_rebuckets_it() -> anyhow::Result<()> {
    let (mut tree, _, mut timeline) = setup()?;
    let form = open_form(&mut tree, &mut timeline, "2")?;

    let start = tree
        .find_by_id(form, "event-start-time-2")
        .ok_or_else(|| anyhow::anyhow!("no start field"))?;
    tree.set_value(start, "19/03/26 21:00");
    timeline.dispatch(&mut tree, start, EventKind::Change);

    let form = timeline
        .form_element("2")
        .ok_or_else(|| anyhow::anyhow!("form vanished"))?;
    let end = tree
        .find_by_id(form, "event-end-time-2")
        .ok_or_else(|| anyhow::anyhow!("no end field"))?;
    assert_eq!(tree.value(end), "19/03/26 21:00");

    timeline.dispatch(&mut tree, form, EventKind::Submit);
    assert!(!timeline.is_form_open("2"));

    let buckets = timeline.day_buckets();
    assert_eq!(buckets.len(), 2);
    let on_first_day: Vec<&str> = timeline
        .events()
        .iter()
        .filter(|event| event.day() == buckets[0].map(|info| info.date).unwrap_or_default())
        .map(|event| event.id.as_str())
        .collect();
    assert_eq!(on_first_day, vec!["3"]);
    Ok(())
}

#[test]
fn price_order_survives_reload() -> anyhow::Result<()> {
    let (mut tree, _, mut timeline) = setup()?;
    timeline.handle_sort_type_change(&mut tree, SortMode::Price);

    let events = itinerary::parse(TRIP, &Catalog::builtin())?;
    timeline.init(&mut tree, events);
    let prices: Vec<u32> = timeline.events().iter().map(|event| event.price).collect();
    assert_eq!(prices, vec![40, 160, 300]);
    assert_eq!(timeline.sourced_events()[0].id, "1");
    Ok(())
}

#[test]
fn escape_without_open_forms_changes_nothing() -> anyhow::Result<()> {
    let (mut tree, root, mut timeline) = setup()?;
    let before = plain_render(&paint(&tree, root, None));
    timeline.dispatch_key(&mut tree, HostKey::Escape);
    assert_eq!(plain_render(&paint(&tree, root, None)), before);
    assert_eq!(tree.document_listener_count(), 0);
    Ok(())
}
