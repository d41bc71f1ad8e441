//! Interactive shell: focus, keyboard input and drawing.

use std::path::PathBuf;
use std::rc::Rc;
use std::sync::mpsc::{self, Receiver};

use anyhow::{Context, Result};
use chrono::{Local, NaiveDateTime, Timelike};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use notify::{Config, Event as FsEvent, RecommendedWatcher, RecursiveMode, Watcher};
use ratatui::layout::{Constraint, Layout};
use ratatui::prelude::{Color, Rect, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::block::Padding;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use tracing::{debug, info, warn};

use crate::catalog::Catalog;
use crate::dom::{ButtonRole, EventKind, HostKey, HostTree, Markup, NodeId, Tag};
use crate::itinerary;
use crate::model::{Event, SortMode};
use crate::paint::{paint, plain_render, Painting};
use crate::timeline::{Timeline, NEW_EVENT_ID};

fn inset_rect(area: Rect, horizontal: u16, vertical: u16) -> Rect {
    let x = area.x.saturating_add(horizontal);
    let y = area.y.saturating_add(vertical);
    let width = area.width.saturating_sub(horizontal.saturating_mul(2));
    let height = area.height.saturating_sub(vertical.saturating_mul(2));
    Rect {
        x,
        y,
        width,
        height,
    }
}

fn usize_to_u16_saturating(value: usize) -> u16 {
    match u16::try_from(value) {
        Ok(v) => v,
        Err(_) => u16::MAX,
    }
}

/// Current wall-clock time at minute precision, the resolution of the
/// date fields.
fn now_minutes() -> NaiveDateTime {
    let now = Local::now().naive_local();
    now.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(now)
}

struct FileWatcher {
    _watcher: RecommendedWatcher,
    rx: Receiver<notify::Result<FsEvent>>,
}

/// The text control being edited and its value when focus arrived.
struct Editing {
    node: NodeId,
    committed: String,
}

pub struct App {
    tree: HostTree,
    root: NodeId,
    timeline: Timeline,
    catalog: Rc<Catalog>,
    path: Option<PathBuf>,

    focus: Option<NodeId>,
    editing: Option<Editing>,
    scroll: u16,
    viewport_height: u16,

    status: String,

    watch: bool,
    watcher: Option<FileWatcher>,
    pub watch_requested: bool,
}

impl App {
    pub fn new(
        catalog: Rc<Catalog>,
        events: Vec<Event>,
        sort: SortMode,
        path: Option<PathBuf>,
        watch: bool,
    ) -> Self {
        let mut tree = HostTree::new();
        let root = tree.create_element(Markup::new(Tag::Block).class("trip-events"));
        let mut timeline = Timeline::new(root, Rc::clone(&catalog));
        timeline.sort_events(sort);
        timeline.init(&mut tree, events);

        Self {
            tree,
            root,
            timeline,
            catalog,
            path,
            focus: None,
            editing: None,
            scroll: 0,
            viewport_height: 1,
            status: String::new(),
            watch,
            watcher: None,
            watch_requested: false,
        }
    }

    pub fn tree(&self) -> &HostTree {
        &self.tree
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
    }

    pub fn focused(&self) -> Option<NodeId> {
        self.focus
    }

    pub fn render_plain(&self) -> String {
        plain_render(&paint(&self.tree, self.root, None))
    }

    fn controls(&self) -> Vec<NodeId> {
        paint(&self.tree, self.root, None)
            .controls
            .into_iter()
            .map(|(node, _)| node)
            .collect()
    }

    fn is_mounted(&self, node: NodeId) -> bool {
        self.tree.is_alive(node) && self.tree.root_of(node) == self.root
    }

    fn set_focus(&mut self, node: Option<NodeId>) {
        self.focus = node;
        self.editing = node
            .filter(|id| self.tree.node(*id).is_some_and(|n| n.tag == Tag::TextInput))
            .map(|id| Editing {
                node: id,
                committed: self.tree.value(id).to_string(),
            });
    }

    /// Moves focus onto the control with the given element id.
    pub fn focus_element(&mut self, element_id: &str) -> bool {
        let found = self.tree.find_by_id(self.root, element_id);
        if found.is_some() {
            self.set_focus(found);
        }
        found.is_some()
    }

    fn move_focus(&mut self, reverse: bool) {
        self.commit_edit();
        let controls = self.controls();
        if controls.is_empty() {
            self.set_focus(None);
            return;
        }
        let current = self
            .focus
            .and_then(|node| controls.iter().position(|c| *c == node));
        let next = match (current, reverse) {
            (None, false) => 0,
            (None, true) => controls.len() - 1,
            (Some(idx), false) => (idx + 1) % controls.len(),
            (Some(idx), true) => (idx + controls.len() - 1) % controls.len(),
        };
        self.set_focus(Some(controls[next]));
    }

    fn dispatch(&mut self, node: NodeId, kind: EventKind) {
        self.timeline.dispatch(&mut self.tree, node, kind);
    }

    /// Fires `change` when the edited value differs from the last commit.
    fn commit_edit(&mut self) {
        let Some(editing) = self.editing.as_ref() else {
            return;
        };
        let node = editing.node;
        if !self.is_mounted(node) || self.tree.value(node) == editing.committed {
            return;
        }
        let anchor = self.anchor();
        self.dispatch(node, EventKind::Change);
        self.restore_focus(anchor);
        if let Some(editing) = self.editing.as_mut().filter(|e| e.node == node) {
            editing.committed = self.tree.value(node).to_string();
        }
    }

    fn edit_text(&mut self, edit: impl FnOnce(&mut String)) {
        let Some(node) = self.focus else {
            return;
        };
        let mut value = self.tree.value(node).to_string();
        edit(&mut value);
        self.tree.set_value(node, value);
        let anchor = self.anchor();
        self.dispatch(node, EventKind::Input);
        self.restore_focus(anchor);
    }

    /// Where focus was before a dispatch: element id and position.
    fn anchor(&self) -> (Option<String>, Option<usize>) {
        let Some(node) = self.focus else {
            return (None, None);
        };
        let id = self.tree.node(node).and_then(|n| n.id.clone());
        let position = self.controls().iter().position(|c| *c == node);
        (id, position)
    }

    /// Re-targets focus after a dispatch may have swapped nodes: same
    /// element id first, then the same position in the control order.
    fn restore_focus(&mut self, (element_id, position): (Option<String>, Option<usize>)) {
        if let Some(node) = self.focus {
            if self.is_mounted(node) {
                return;
            }
        }
        if let Some(id) = element_id {
            if self.focus_element(&id) {
                return;
            }
        }
        let controls = self.controls();
        let fallback = position
            .filter(|_| !controls.is_empty())
            .map(|idx| controls[idx.min(controls.len() - 1)]);
        self.set_focus(fallback);
    }

    fn activate(&mut self, node: NodeId) {
        let Some(found) = self.tree.node(node) else {
            return;
        };
        let tag = found.tag;
        let anchor = self.anchor();
        match tag {
            Tag::Checkbox => {
                let checked = !self.tree.checked(node);
                self.tree.set_checked(node, checked);
                self.dispatch(node, EventKind::Change);
            }
            Tag::Radio if self.tree.checked(node) => {}
            Tag::Radio => {
                self.tree.select_radio(node);
                self.dispatch(node, EventKind::Change);
            }
            Tag::Button(ButtonRole::Submit) => {
                if let Some(form) = self.tree.closest(node, Tag::Form) {
                    self.dispatch(form, EventKind::Submit);
                }
            }
            Tag::Button(ButtonRole::Reset) => {
                if let Some(form) = self.tree.closest(node, Tag::Form) {
                    self.dispatch(form, EventKind::Reset);
                }
            }
            Tag::Button(ButtonRole::Plain) => self.dispatch(node, EventKind::Click),
            Tag::TextInput => self.commit_edit(),
            Tag::Block | Tag::Group | Tag::Form | Tag::Heading | Tag::Text | Tag::Image => {}
        }
        self.restore_focus(anchor);
    }

    fn escape(&mut self) {
        let anchor = self.anchor();
        self.timeline.dispatch_key(&mut self.tree, HostKey::Escape);
        self.restore_focus(anchor);
    }

    fn new_event(&mut self) {
        if !self.timeline.is_creating() {
            self.timeline.create_event(&mut self.tree, now_minutes());
        }
        let controls = self.controls();
        let first = self.timeline.form_element(NEW_EVENT_ID).and_then(|form| {
            let inside = self.tree.descendants(form);
            controls.into_iter().find(|c| inside.contains(c))
        });
        self.set_focus(first);
    }

    pub fn reload_current(&mut self) -> Result<()> {
        let Some(path) = self.path.clone() else {
            return Ok(());
        };

        let events = itinerary::load(&path, &self.catalog)
            .with_context(|| format!("Failed to reload {}", path.display()))?;
        let position = self.anchor().1;
        self.timeline.init(&mut self.tree, events);
        self.restore_focus((None, position));
        info!(path = %path.display(), "itinerary reloaded");
        self.status = format!("Reloaded {}", path.display());
        self.ensure_watcher()?;
        Ok(())
    }

    pub fn ensure_watcher(&mut self) -> Result<()> {
        if !self.watch {
            self.watcher = None;
            return Ok(());
        }

        let Some(path) = self.path.clone() else {
            self.watcher = None;
            return Ok(());
        };

        let (tx, rx) = mpsc::channel();
        let mut watcher = RecommendedWatcher::new(
            move |res| {
                let _ = tx.send(res);
            },
            Config::default(),
        )?;

        watcher.watch(&path, RecursiveMode::NonRecursive)?;
        self.watcher = Some(FileWatcher {
            _watcher: watcher,
            rx,
        });
        Ok(())
    }

    pub fn poll_watch(&mut self) {
        if let Some(watcher) = self.watcher.as_mut() {
            while let Ok(event) = watcher.rx.try_recv() {
                match event {
                    Ok(_) => self.watch_requested = true,
                    Err(err) => warn!(error = %err, "file watcher error"),
                }
            }
        }
    }

    fn is_editing_text(&self) -> bool {
        self.editing
            .as_ref()
            .is_some_and(|editing| Some(editing.node) == self.focus)
    }

    /// Returns `true` when the app should quit.
    pub fn handle_key(&mut self, key: KeyEvent) -> Result<bool> {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return Ok(true);
        }

        if self.is_editing_text() {
            match key.code {
                KeyCode::Char(c)
                    if !key
                        .modifiers
                        .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
                {
                    self.edit_text(|value| value.push(c));
                    self.take_report();
                    return Ok(false);
                }
                KeyCode::Backspace => {
                    self.edit_text(|value| {
                        value.pop();
                    });
                    self.take_report();
                    return Ok(false);
                }
                _ => {}
            }
        }

        match key.code {
            KeyCode::Char('q') => return Ok(true),
            KeyCode::Tab | KeyCode::Down | KeyCode::Char('j') => self.move_focus(false),
            KeyCode::BackTab | KeyCode::Up | KeyCode::Char('k') => self.move_focus(true),
            KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                let delta = self.viewport_height.saturating_div(2).max(1);
                self.scroll = self.scroll.saturating_add(delta);
            }
            KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                let delta = self.viewport_height.saturating_div(2).max(1);
                self.scroll = self.scroll.saturating_sub(delta);
            }
            KeyCode::Enter | KeyCode::Char(' ') => {
                if let Some(node) = self.focus {
                    self.activate(node);
                }
            }
            KeyCode::Esc => self.escape(),
            KeyCode::Char('n') => self.new_event(),
            KeyCode::Char('r') => {
                if let Err(err) = self.reload_current() {
                    self.status = format!("Reload failed: {err:#}");
                }
            }
            _ => {}
        }

        self.take_report();
        Ok(false)
    }

    fn take_report(&mut self) {
        if let Some(message) = self.tree.take_reported() {
            debug!(%message, "validity surfaced");
            self.status = message;
        }
    }

    fn keep_focus_visible(&mut self, painting: &Painting) {
        let Some(line) = self.focus.and_then(|node| painting.line_of(node)) else {
            return;
        };
        let line = usize_to_u16_saturating(line);
        if line < self.scroll {
            self.scroll = line;
        } else if line >= self.scroll.saturating_add(self.viewport_height) {
            self.scroll = line.saturating_add(1).saturating_sub(self.viewport_height);
        }
    }

    pub fn draw(&mut self, frame: &mut ratatui::Frame<'_>) {
        let root = inset_rect(frame.size(), 1, 0);
        let chunks = Layout::vertical([Constraint::Min(1), Constraint::Length(1)]).split(root);
        let body = chunks[0];
        let status = inset_rect(chunks[1], 1, 0);

        let painting = paint(&self.tree, self.root, self.focus);
        self.viewport_height = body.height.saturating_sub(1).max(1);
        let max_scroll =
            usize_to_u16_saturating(painting.lines.len().saturating_sub(self.viewport_height as usize));
        self.scroll = self.scroll.min(max_scroll);
        self.keep_focus_visible(&painting);

        self.draw_content(frame, body, &painting);
        self.draw_status(frame, status);
    }

    fn draw_content(&self, frame: &mut ratatui::Frame<'_>, area: Rect, painting: &Painting) {
        let lines: Vec<Line> = painting
            .lines
            .iter()
            .map(|line| {
                if line.segments.is_empty() {
                    return Line::from(vec![Span::raw("")]);
                }
                Line::from(
                    line.segments
                        .iter()
                        .map(|segment| Span::styled(segment.text.clone(), segment.style))
                        .collect::<Vec<_>>(),
                )
            })
            .collect();

        let paragraph = Paragraph::new(Text::from(lines))
            .block(
                Block::default()
                    .title(" waypoint ")
                    .borders(Borders::TOP)
                    .border_style(Style::default().fg(Color::DarkGray))
                    .padding(Padding::new(1, 1, 0, 0)),
            )
            .scroll((self.scroll, 0))
            .wrap(Wrap { trim: false });

        frame.render_widget(paragraph, area);
    }

    fn draw_status(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let path = self
            .path
            .as_ref()
            .map_or_else(|| "<builtin>".to_string(), |p| p.display().to_string());
        let sort_hint = format!("sort: {}", self.timeline.current_sort());
        let count_hint = format!("events: {}", self.timeline.events().len());
        let watch_hint = if self.watch { " watch:on" } else { "" };

        let status_text = if self.status.is_empty() {
            format!("{path} | {sort_hint} | {count_hint}{watch_hint}")
        } else {
            format!(
                "{path} | {sort_hint} | {count_hint}{watch_hint} | {}",
                self.status
            )
        };

        frame.render_widget(
            Paragraph::new(format!(" {status_text}")).style(Style::default().fg(Color::Gray)),
            area,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(app: &mut App, code: KeyCode) -> bool {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE))
            .expect("key handled")
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    fn app() -> App {
        let source = r#"{
            "events": [
                {
                    "id": "1",
                    "city": { "name": "Amsterdam", "description": "", "photos": [] },
                    "type": { "name": "taxi", "offers": [] },
                    "price": 20,
                    "date_range": ["2026-03-18T10:30:00", "2026-03-18T11:00:00"],
                    "is_favorite": false
                }
            ]
        }"#;
        let catalog = Catalog::builtin();
        let events = itinerary::parse(source, &catalog).expect("itinerary");
        App::new(Rc::new(catalog), events, SortMode::Default, None, false)
    }

    #[test]
    fn tab_walks_controls_in_document_order() {
        let mut app = app();
        assert_eq!(app.focused(), None);
        press(&mut app, KeyCode::Tab);
        let first = app.focused().expect("focus");
        assert_eq!(
            app.tree().node(first).and_then(|n| n.id.as_deref()),
            Some("sort-event")
        );
        press(&mut app, KeyCode::BackTab);
        let last = app.focused().expect("focus");
        assert_eq!(
            app.tree().node(last).and_then(|n| n.id.as_deref()),
            Some("event-open-1")
        );
    }

    #[test]
    fn edit_and_save_through_the_keyboard() {
        let mut app = app();
        assert!(app.focus_element("event-open-1"));
        press(&mut app, KeyCode::Enter);
        assert!(app.timeline().is_form_open("1"));

        assert!(app.focus_element("event-price-1"));
        press(&mut app, KeyCode::Backspace);
        press(&mut app, KeyCode::Backspace);
        type_text(&mut app, "150");
        assert!(app.focus_element("event-save-1"));
        press(&mut app, KeyCode::Enter);

        assert!(!app.timeline().is_form_open("1"));
        assert_eq!(app.timeline().events()[0].price, 150);
    }

    #[test]
    fn rejected_price_lands_in_the_status_line() {
        let mut app = app();
        app.focus_element("event-open-1");
        press(&mut app, KeyCode::Enter);
        app.focus_element("event-price-1");
        type_text(&mut app, "x");
        assert_eq!(app.status(), "Price must be a non-negative whole number!");
    }

    #[test]
    fn quit_key_is_text_inside_inputs() {
        let mut app = app();
        app.focus_element("event-open-1");
        press(&mut app, KeyCode::Enter);
        app.focus_element("event-destination-1");
        assert!(!press(&mut app, KeyCode::Char('q')));

        press(&mut app, KeyCode::Esc);
        assert!(!app.timeline().is_form_open("1"));
        press(&mut app, KeyCode::Tab);
        assert!(press(&mut app, KeyCode::Char('q')));
    }

    #[test]
    fn pressing_the_checked_type_radio_keeps_offers() {
        let mut app = app();
        app.focus_element("event-open-1");
        press(&mut app, KeyCode::Enter);
        assert!(app.focus_element("event-offer-order-uber-1"));
        press(&mut app, KeyCode::Char(' '));

        assert!(app.focus_element("event-type-taxi-1"));
        press(&mut app, KeyCode::Char(' '));
        press(&mut app, KeyCode::Enter);

        assert!(app.focus_element("event-save-1"));
        press(&mut app, KeyCode::Enter);
        let offers: Vec<&str> = app.timeline().events()[0]
            .event_type
            .offers
            .iter()
            .map(|offer| offer.label.as_str())
            .collect();
        assert_eq!(offers, vec!["Order Uber"]);
    }

    #[test]
    fn new_event_form_takes_focus() {
        let mut app = app();
        press(&mut app, KeyCode::Char('n'));
        assert!(app.timeline().is_creating());
        let focus = app.focused().expect("focus");
        let form = app.timeline().form_element("new").expect("form");
        assert!(app.tree().descendants(form).contains(&focus));

        press(&mut app, KeyCode::Esc);
        assert!(!app.timeline().is_creating());
        assert!(app.render_plain().contains("Taxi to Amsterdam"));
    }
}
