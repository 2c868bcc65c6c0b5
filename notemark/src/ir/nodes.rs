//! Document tree exchanged with the editing surface.
//!
//! A [`Document`] owns a list of block [`Node`]s. Every node carries a
//! [`NodeKind`] (its type plus attributes), its children, and the marks that
//! style it. The set of kinds is closed so the builder, serializer and JSON
//! boundary all match on it exhaustively; the only escape hatch is
//! [`NodeKind::Unknown`], which the JSON boundary uses for node types it
//! does not know.

use serde_json::{Map, Value};
use std::fmt;

/// Root of a document tree. Its children are block nodes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    pub content: Vec<Node>,
}

impl Document {
    pub fn new(content: Vec<Node>) -> Self {
        Self { content }
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

/// A single node of the tree.
///
/// `marks` are only meaningful on inline nodes and are stored outermost
/// first.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub content: Vec<Node>,
    pub marks: Vec<Mark>,
}

impl Node {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            content: Vec::new(),
            marks: Vec::new(),
        }
    }

    pub fn with_content(kind: NodeKind, content: Vec<Node>) -> Self {
        Self {
            kind,
            content,
            marks: Vec::new(),
        }
    }

    pub fn with_marks(mut self, marks: Vec<Mark>) -> Self {
        self.marks = marks;
        self
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::new(NodeKind::Text(text.into()))
    }

    pub fn paragraph(content: Vec<Node>) -> Self {
        Self::with_content(NodeKind::Paragraph, content)
    }

    pub fn heading(level: u8, content: Vec<Node>) -> Self {
        Self::with_content(NodeKind::Heading { level }, content)
    }

    /// The text of a `text` node, `None` for every other kind.
    pub fn as_text(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Text(text) => Some(text),
            _ => None,
        }
    }
}

// Children are detached onto a local stack so that dropping a deep tree
// never recurses once per level.
impl Drop for Node {
    fn drop(&mut self) {
        if self.content.is_empty() {
            return;
        }
        let mut pending = std::mem::take(&mut self.content);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.content);
        }
    }
}

/// Node type plus its attributes.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Paragraph,
    Heading {
        level: u8,
    },
    BulletList,
    OrderedList {
        start: u64,
    },
    TaskList,
    ListItem,
    TaskItem {
        state: TaskState,
    },
    Blockquote,
    /// Content is a single text node holding the raw code, or nothing.
    CodeBlock {
        language: Option<String>,
    },
    Table,
    TableRow,
    TableHeaderCell {
        align: Alignment,
    },
    TableDataCell {
        align: Alignment,
    },
    HorizontalRule,
    Text(String),
    HardBreak,
    Image {
        src: String,
        alt: String,
        title: Option<String>,
    },
    TaskMarker {
        state: TaskState,
    },
    Timestamp {
        time: String,
    },
    NoteLink {
        title: String,
        note_id: Option<String>,
    },
    Unknown {
        type_name: String,
        attrs: Map<String, Value>,
    },
}

impl NodeKind {
    /// The interchange name of this kind (`"bulletList"`, `"taskMarker"`, ...).
    pub fn type_name(&self) -> &str {
        match self {
            NodeKind::Paragraph => "paragraph",
            NodeKind::Heading { .. } => "heading",
            NodeKind::BulletList => "bulletList",
            NodeKind::OrderedList { .. } => "orderedList",
            NodeKind::TaskList => "taskList",
            NodeKind::ListItem => "listItem",
            NodeKind::TaskItem { .. } => "taskItem",
            NodeKind::Blockquote => "blockquote",
            NodeKind::CodeBlock { .. } => "codeBlock",
            NodeKind::Table => "table",
            NodeKind::TableRow => "tableRow",
            NodeKind::TableHeaderCell { .. } => "tableHeaderCell",
            NodeKind::TableDataCell { .. } => "tableDataCell",
            NodeKind::HorizontalRule => "horizontalRule",
            NodeKind::Text(_) => "text",
            NodeKind::HardBreak => "hardBreak",
            NodeKind::Image { .. } => "image",
            NodeKind::TaskMarker { .. } => "taskMarker",
            NodeKind::Timestamp { .. } => "timestamp",
            NodeKind::NoteLink { .. } => "noteLink",
            NodeKind::Unknown { type_name, .. } => type_name,
        }
    }

    pub fn is_inline(&self) -> bool {
        matches!(
            self,
            NodeKind::Text(_)
                | NodeKind::HardBreak
                | NodeKind::Image { .. }
                | NodeKind::TaskMarker { .. }
                | NodeKind::Timestamp { .. }
                | NodeKind::NoteLink { .. }
        )
    }

    /// Atomic nodes never carry content.
    pub fn is_atomic(&self) -> bool {
        matches!(
            self,
            NodeKind::HorizontalRule
                | NodeKind::HardBreak
                | NodeKind::Image { .. }
                | NodeKind::TaskMarker { .. }
                | NodeKind::Timestamp { .. }
                | NodeKind::NoteLink { .. }
        )
    }

    /// Blocks whose content is an inline run.
    pub fn is_textblock(&self) -> bool {
        matches!(self, NodeKind::Paragraph | NodeKind::Heading { .. })
    }
}

/// Inline styling applied to a range of inline nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mark {
    Bold,
    Italic,
    Strike,
    Code,
    Highlight,
    Link { href: String, title: Option<String> },
}

impl Mark {
    pub fn type_name(&self) -> &'static str {
        match self {
            Mark::Bold => "bold",
            Mark::Italic => "italic",
            Mark::Strike => "strike",
            Mark::Code => "code",
            Mark::Highlight => "highlight",
            Mark::Link { .. } => "link",
        }
    }

    /// Same mark type, ignoring attributes.
    pub fn same_type(&self, other: &Mark) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

/// State of a task item or inline task marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskState {
    Todo,
    Doing,
    Waiting,
    Hold,
    Done,
    Canceled,
    Idea,
}

impl TaskState {
    pub const ALL: [TaskState; 7] = [
        TaskState::Todo,
        TaskState::Doing,
        TaskState::Waiting,
        TaskState::Hold,
        TaskState::Done,
        TaskState::Canceled,
        TaskState::Idea,
    ];

    /// Lowercase name used in the tree (`"todo"`).
    pub fn as_str(self) -> &'static str {
        match self {
            TaskState::Todo => "todo",
            TaskState::Doing => "doing",
            TaskState::Waiting => "waiting",
            TaskState::Hold => "hold",
            TaskState::Done => "done",
            TaskState::Canceled => "canceled",
            TaskState::Idea => "idea",
        }
    }

    /// Uppercase keyword written to markup (`"TODO"`).
    pub fn keyword(self) -> &'static str {
        match self {
            TaskState::Todo => "TODO",
            TaskState::Doing => "DOING",
            TaskState::Waiting => "WAITING",
            TaskState::Hold => "HOLD",
            TaskState::Done => "DONE",
            TaskState::Canceled => "CANCELED",
            TaskState::Idea => "IDEA",
        }
    }

    /// Case-insensitive lookup; `CANCELLED` is accepted for `canceled`.
    pub fn from_keyword(word: &str) -> Option<Self> {
        if word.eq_ignore_ascii_case("cancelled") {
            return Some(TaskState::Canceled);
        }
        Self::ALL
            .into_iter()
            .find(|state| state.as_str().eq_ignore_ascii_case(word))
    }

    pub fn is_completed(self) -> bool {
        matches!(self, TaskState::Done | TaskState::Canceled)
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Column alignment of a table cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Alignment {
    #[default]
    None,
    Left,
    Center,
    Right,
}

impl Alignment {
    pub fn as_str(self) -> Option<&'static str> {
        match self {
            Alignment::None => None,
            Alignment::Left => Some("left"),
            Alignment::Center => Some("center"),
            Alignment::Right => Some("right"),
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "left" => Some(Alignment::Left),
            "center" => Some(Alignment::Center),
            "right" => Some(Alignment::Right),
            _ => None,
        }
    }
}

/// Validates an `H:MM` / `HH:MM` clock time and returns it zero-padded.
///
/// Hours run 0-23 and minutes 0-59; anything else is rejected.
pub fn normalize_time(raw: &str) -> Option<String> {
    let (hour, minute) = raw.split_once(':')?;
    if hour.is_empty() || hour.len() > 2 || minute.len() != 2 {
        return None;
    }
    if !hour.bytes().chain(minute.bytes()).all(|b| b.is_ascii_digit()) {
        return None;
    }
    let hour: u8 = hour.parse().ok()?;
    let minute: u8 = minute.parse().ok()?;
    if hour > 23 || minute > 59 {
        return None;
    }
    Some(format!("{hour:02}:{minute:02}"))
}
