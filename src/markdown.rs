//! Inline markdown for destination descriptions.

use pulldown_cmark::{Event as MdEvent, Options, Parser as MdParser, Tag as MdTag, TagEnd};

use crate::dom::{Markup, Tag, TextStyle};

#[derive(Default)]
struct InlineState {
    emphasis: usize,
    strong: usize,
    strikethrough: usize,
}

impl InlineState {
    fn style(&self) -> TextStyle {
        TextStyle {
            strong: self.strong > 0,
            emphasis: self.emphasis > 0,
            struck: self.strikethrough > 0,
            muted: false,
        }
    }
}

struct Renderer {
    inline: InlineState,
    paragraphs: Vec<Markup>,
    current: Vec<Markup>,
}

impl Renderer {
    fn new() -> Self {
        Self {
            inline: InlineState::default(),
            paragraphs: Vec::new(),
            current: Vec::new(),
        }
    }

    fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let style = self.inline.style();
        // Merge with the previous run when the style did not change.
        if let Some(last) = self.current.last_mut() {
            if last.style == style {
                last.value.push_str(text);
                return;
            }
        }
        self.current.push(Markup::styled(text, style));
    }

    fn flush_paragraph(&mut self) {
        if self.current.is_empty() {
            return;
        }
        let runs = std::mem::take(&mut self.current);
        self.paragraphs.push(
            Markup::new(Tag::Block)
                .class("event__destination-description")
                .children(runs),
        );
    }

    fn finish(mut self) -> Vec<Markup> {
        self.flush_paragraph();
        self.paragraphs
    }
}

/// One block per paragraph; emphasis, strong and strikethrough become
/// styled text runs. Other markdown constructs keep only their text.
pub fn description_markup(source: &str) -> Vec<Markup> {
    let mut renderer = Renderer::new();
    for event in MdParser::new_ext(source, Options::ENABLE_STRIKETHROUGH) {
        match event {
            MdEvent::Start(MdTag::Emphasis) => {
                renderer.inline.emphasis = renderer.inline.emphasis.saturating_add(1);
            }
            MdEvent::Start(MdTag::Strong) => {
                renderer.inline.strong = renderer.inline.strong.saturating_add(1);
            }
            MdEvent::Start(MdTag::Strikethrough) => {
                renderer.inline.strikethrough = renderer.inline.strikethrough.saturating_add(1);
            }
            MdEvent::End(TagEnd::Emphasis) => {
                renderer.inline.emphasis = renderer.inline.emphasis.saturating_sub(1);
            }
            MdEvent::End(TagEnd::Strong) => {
                renderer.inline.strong = renderer.inline.strong.saturating_sub(1);
            }
            MdEvent::End(TagEnd::Strikethrough) => {
                renderer.inline.strikethrough = renderer.inline.strikethrough.saturating_sub(1);
            }
            MdEvent::End(TagEnd::Paragraph | TagEnd::Heading(_) | TagEnd::Item) => {
                renderer.flush_paragraph();
            }
            MdEvent::Text(text) | MdEvent::Code(text) => renderer.push_text(&text),
            MdEvent::SoftBreak | MdEvent::HardBreak => renderer.push_text(" "),
            _ => {}
        }
    }
    renderer.finish()
}
