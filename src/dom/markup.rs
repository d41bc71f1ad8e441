/// What kind of host node a markup element becomes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tag {
    /// Starts a new line; children flow inline.
    Block,
    /// Like `Block`, children indented one level.
    Group,
    Form,
    Heading,
    Text,
    TextInput,
    Checkbox,
    Radio,
    Button(ButtonRole),
    Image,
}

impl Tag {
    pub fn is_block(self) -> bool {
        matches!(self, Tag::Block | Tag::Group | Tag::Form | Tag::Heading)
    }

    pub fn is_focusable(self) -> bool {
        matches!(
            self,
            Tag::TextInput | Tag::Checkbox | Tag::Radio | Tag::Button(_)
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ButtonRole {
    Submit,
    Reset,
    Plain,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TextStyle {
    pub strong: bool,
    pub emphasis: bool,
    pub struck: bool,
    pub muted: bool,
}

/// Element description produced by a view's template.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Markup {
    pub tag: Tag,
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub name: Option<String>,
    pub value: String,
    pub label: String,
    pub checked: bool,
    pub disabled: bool,
    pub style: TextStyle,
    pub children: Vec<Markup>,
}

impl Markup {
    pub fn new(tag: Tag) -> Self {
        Self {
            tag,
            id: None,
            classes: Vec::new(),
            name: None,
            value: String::new(),
            label: String::new(),
            checked: false,
            disabled: false,
            style: TextStyle::default(),
            children: Vec::new(),
        }
    }

    pub fn text(value: impl Into<String>) -> Self {
        Self::new(Tag::Text).value(value)
    }

    pub fn styled(value: impl Into<String>, style: TextStyle) -> Self {
        Self::new(Tag::Text).value(value).style(style)
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn class(mut self, class: &str) -> Self {
        self.classes.push(class.to_string());
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn checked(mut self, checked: bool) -> Self {
        self.checked = checked;
        self
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    pub fn style(mut self, style: TextStyle) -> Self {
        self.style = style;
        self
    }

    pub fn muted(mut self) -> Self {
        self.style.muted = true;
        self
    }

    pub fn child(mut self, child: Markup) -> Self {
        self.children.push(child);
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = Markup>) -> Self {
        self.children.extend(children);
        self
    }

    /// Appends `child` only when present; templates use this for optional sections.
    pub fn maybe(mut self, child: Option<Markup>) -> Self {
        if let Some(child) = child {
            self.children.push(child);
        }
        self
    }
}
