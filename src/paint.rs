//! Paints the host tree as styled terminal lines.

use ratatui::prelude::{Color, Modifier, Style};

use crate::dom::{ButtonRole, HostTree, NodeId, Tag, TextStyle};

#[derive(Clone, Debug)]
pub struct StyledSegment {
    pub text: String,
    pub style: Style,
}

#[derive(Clone, Debug, Default)]
pub struct RenderedLine {
    pub segments: Vec<StyledSegment>,
    pub plain: String,
}

#[derive(Clone, Debug, Default)]
pub struct Painting {
    pub lines: Vec<RenderedLine>,
    /// Focusable controls in document order with the line each sits on.
    pub controls: Vec<(NodeId, usize)>,
}

impl Painting {
    pub fn line_of(&self, node: NodeId) -> Option<usize> {
        self.controls
            .iter()
            .find(|(id, _)| *id == node)
            .map(|(_, line)| *line)
    }
}

fn text_style(style: TextStyle) -> Style {
    let mut out = Style::default();
    if style.emphasis {
        out = out.add_modifier(Modifier::ITALIC);
    }
    if style.strong {
        out = out.add_modifier(Modifier::BOLD);
    }
    if style.struck {
        out = out.add_modifier(Modifier::CROSSED_OUT);
    }
    if style.muted {
        out = out.fg(Color::DarkGray);
    }
    out
}

struct Painter<'a> {
    tree: &'a HostTree,
    focus: Option<NodeId>,
    lines: Vec<RenderedLine>,
    controls: Vec<(NodeId, usize)>,
    current_segments: Vec<StyledSegment>,
    current_plain: String,
    depth: usize,
    heading: bool,
}

impl<'a> Painter<'a> {
    fn new(tree: &'a HostTree, focus: Option<NodeId>) -> Self {
        Self {
            tree,
            focus,
            lines: Vec::new(),
            controls: Vec::new(),
            current_segments: Vec::new(),
            current_plain: String::new(),
            depth: 0,
            heading: false,
        }
    }

    fn finish(mut self) -> Painting {
        self.flush_line();
        if self.lines.is_empty() {
            self.lines.push(RenderedLine::default());
        }
        Painting {
            lines: self.lines,
            controls: self.controls,
        }
    }

    fn push_text(&mut self, text: &str, style: Style) {
        if text.is_empty() {
            return;
        }
        if self.current_plain.is_empty() && self.depth > 0 {
            let indent = "  ".repeat(self.depth);
            self.current_plain.push_str(&indent);
            self.current_segments.push(StyledSegment {
                text: indent,
                style: Style::default(),
            });
        } else if !self.current_plain.is_empty() && !self.current_plain.ends_with(' ') {
            self.current_plain.push(' ');
            self.current_segments.push(StyledSegment {
                text: " ".to_string(),
                style: Style::default(),
            });
        }
        self.current_plain.push_str(text);
        self.current_segments.push(StyledSegment {
            text: text.to_string(),
            style,
        });
    }

    fn flush_line(&mut self) {
        if self.current_segments.is_empty() {
            return;
        }
        self.lines.push(RenderedLine {
            segments: std::mem::take(&mut self.current_segments),
            plain: std::mem::take(&mut self.current_plain),
        });
    }

    fn control_style(&self, node: NodeId, disabled: bool) -> Style {
        if self.focus == Some(node) {
            Style::default().bg(Color::Blue).fg(Color::White)
        } else if disabled {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default().fg(Color::Cyan)
        }
    }

    fn paint(&mut self, id: NodeId) {
        let Some(node) = self.tree.node(id) else {
            return;
        };

        if node.tag.is_block() {
            self.flush_line();
            let nested = node.tag == Tag::Group;
            let was_heading = self.heading;
            if nested {
                self.depth += 1;
            }
            self.heading = node.tag == Tag::Heading;
            for child in self.tree.children(id) {
                self.paint(*child);
            }
            self.flush_line();
            self.heading = was_heading;
            if nested {
                self.depth -= 1;
            }
            return;
        }

        if node.tag.is_focusable() && !node.disabled {
            self.controls.push((id, self.lines.len()));
        }

        let style = self.control_style(id, node.disabled);
        match node.tag {
            Tag::Text => {
                let style = if self.heading {
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD)
                } else {
                    text_style(node.style)
                };
                self.push_text(&node.value, style);
            }
            Tag::TextInput => {
                if !node.label.is_empty() {
                    self.push_text(&node.label, Style::default().fg(Color::Gray));
                }
                self.push_text(&format!("[{}]", node.value), style);
            }
            Tag::Checkbox => {
                let mark = if node.checked { "[x]" } else { "[ ]" };
                self.push_text(&format!("{mark} {}", node.label), style);
            }
            Tag::Radio => {
                let mark = if node.checked { "(*)" } else { "( )" };
                self.push_text(&format!("{mark} {}", node.label), style);
            }
            Tag::Button(role) => {
                let style = if role == ButtonRole::Submit && self.focus != Some(id) {
                    style.add_modifier(Modifier::BOLD)
                } else {
                    style
                };
                self.push_text(&format!("<{}>", node.label), style);
            }
            Tag::Image => {
                self.push_text(
                    &format!("[image: {}]", node.label),
                    Style::default().fg(Color::DarkGray),
                );
            }
            Tag::Block | Tag::Group | Tag::Form | Tag::Heading => {}
        }

        if let Some(message) = node.validity() {
            self.push_text(&format!("! {message}"), Style::default().fg(Color::Red));
        }
    }
}

/// Lays out everything under `root`. `focus` is highlighted.
pub fn paint(tree: &HostTree, root: NodeId, focus: Option<NodeId>) -> Painting {
    let mut painter = Painter::new(tree, focus);
    painter.paint(root);
    painter.finish()
}

pub fn plain_render(painting: &Painting) -> String {
    let mut out = String::new();
    for (idx, line) in painting.lines.iter().enumerate() {
        out.push_str(&line.plain);
        if idx + 1 < painting.lines.len() {
            out.push('\n');
        }
    }
    out
}
