//! Terminal itinerary editor.
//!
//! Trip events are grouped by day, sortable by start time or price, and any
//! event can be opened as an inline edit form. Views render into an in-memory
//! host tree ([`dom::HostTree`]) that the terminal shell paints with ratatui.

pub mod app;
pub mod catalog;
pub mod dom;
pub mod error;
pub mod itinerary;
pub mod markdown;
pub mod model;
pub mod paint;
pub mod timeline;
pub mod view;
