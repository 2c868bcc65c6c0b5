//! Defines the flat token stream produced by the tokenizer.
//!
//! A token stream is a depth-first walk of the document: block containers
//! and range marks come as open/close pairs, everything else is a single
//! self-closing token. The tree builder reduces it back into a
//! [`Document`](crate::ir::nodes::Document).

use crate::ir::nodes::{Alignment, Mark, NodeKind, TaskState};
use std::fmt;

/// Depth contribution of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nesting {
    Open,
    Close,
    SelfClosing,
}

impl Nesting {
    pub fn delta(self) -> i8 {
        match self {
            Nesting::Open => 1,
            Nesting::Close => -1,
            Nesting::SelfClosing => 0,
        }
    }
}

/// Block containers that appear as open/close pairs.
#[derive(Debug, Clone, PartialEq)]
pub enum BlockToken {
    Paragraph,
    Heading { level: u8 },
    BulletList,
    OrderedList { start: u64 },
    TaskList,
    ListItem,
    TaskItem { state: TaskState },
    Blockquote,
    Table,
    /// Section wrapper; its rows are spliced into the table.
    TableHead,
    /// Section wrapper; its rows are spliced into the table.
    TableBody,
    TableRow,
    TableHeaderCell { align: Alignment },
    TableDataCell { align: Alignment },
}

impl BlockToken {
    pub fn name(&self) -> &'static str {
        match self {
            BlockToken::Paragraph => "paragraph",
            BlockToken::Heading { .. } => "heading",
            BlockToken::BulletList => "bullet_list",
            BlockToken::OrderedList { .. } => "ordered_list",
            BlockToken::TaskList => "task_list",
            BlockToken::ListItem => "list_item",
            BlockToken::TaskItem { .. } => "task_item",
            BlockToken::Blockquote => "blockquote",
            BlockToken::Table => "table",
            BlockToken::TableHead => "thead",
            BlockToken::TableBody => "tbody",
            BlockToken::TableRow => "tr",
            BlockToken::TableHeaderCell { .. } => "th",
            BlockToken::TableDataCell { .. } => "td",
        }
    }

    pub fn is_transparent(&self) -> bool {
        matches!(self, BlockToken::TableHead | BlockToken::TableBody)
    }

    /// Open and close tokens match by container type; attributes live on the
    /// open token only.
    pub fn matches(&self, other: &BlockToken) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }

    /// The node kind this container builds, `None` for transparent wrappers.
    pub fn node_kind(&self) -> Option<NodeKind> {
        let kind = match self {
            BlockToken::Paragraph => NodeKind::Paragraph,
            BlockToken::Heading { level } => NodeKind::Heading { level: *level },
            BlockToken::BulletList => NodeKind::BulletList,
            BlockToken::OrderedList { start } => NodeKind::OrderedList { start: *start },
            BlockToken::TaskList => NodeKind::TaskList,
            BlockToken::ListItem => NodeKind::ListItem,
            BlockToken::TaskItem { state } => NodeKind::TaskItem { state: *state },
            BlockToken::Blockquote => NodeKind::Blockquote,
            BlockToken::Table => NodeKind::Table,
            BlockToken::TableHead | BlockToken::TableBody => return None,
            BlockToken::TableRow => NodeKind::TableRow,
            BlockToken::TableHeaderCell { align } => NodeKind::TableHeaderCell { align: *align },
            BlockToken::TableDataCell { align } => NodeKind::TableDataCell { align: *align },
        };
        Some(kind)
    }

    /// The container token for a node kind, `None` for leaves and kinds
    /// without a token form.
    pub fn from_node_kind(kind: &NodeKind) -> Option<BlockToken> {
        let block = match kind {
            NodeKind::Paragraph => BlockToken::Paragraph,
            NodeKind::Heading { level } => BlockToken::Heading { level: *level },
            NodeKind::BulletList => BlockToken::BulletList,
            NodeKind::OrderedList { start } => BlockToken::OrderedList { start: *start },
            NodeKind::TaskList => BlockToken::TaskList,
            NodeKind::ListItem => BlockToken::ListItem,
            NodeKind::TaskItem { state } => BlockToken::TaskItem { state: *state },
            NodeKind::Blockquote => BlockToken::Blockquote,
            NodeKind::Table => BlockToken::Table,
            NodeKind::TableRow => BlockToken::TableRow,
            NodeKind::TableHeaderCell { align } => BlockToken::TableHeaderCell { align: *align },
            NodeKind::TableDataCell { align } => BlockToken::TableDataCell { align: *align },
            _ => return None,
        };
        Some(block)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Block(BlockToken),
    Mark(Mark),
    Text(String),
    /// Text carrying a token-scoped `code` mark.
    CodeInline(String),
    CodeBlock {
        language: Option<String>,
        content: String,
    },
    HorizontalRule,
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
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub nesting: Nesting,
}

impl Token {
    pub fn open(block: BlockToken) -> Self {
        Self {
            kind: TokenKind::Block(block),
            nesting: Nesting::Open,
        }
    }

    pub fn close(block: BlockToken) -> Self {
        Self {
            kind: TokenKind::Block(block),
            nesting: Nesting::Close,
        }
    }

    pub fn mark_open(mark: Mark) -> Self {
        Self {
            kind: TokenKind::Mark(mark),
            nesting: Nesting::Open,
        }
    }

    pub fn mark_close(mark: Mark) -> Self {
        Self {
            kind: TokenKind::Mark(mark),
            nesting: Nesting::Close,
        }
    }

    pub fn leaf(kind: TokenKind) -> Self {
        Self {
            kind,
            nesting: Nesting::SelfClosing,
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::leaf(TokenKind::Text(text.into()))
    }

    pub fn as_text(&self) -> Option<&str> {
        match &self.kind {
            TokenKind::Text(text) => Some(text),
            _ => None,
        }
    }
}

/// One-line rendering used by `notemark inspect`, e.g. `heading_open level=1`
/// or `text "buy milk"`.
impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let suffix = match self.nesting {
            Nesting::Open => "_open",
            Nesting::Close => "_close",
            Nesting::SelfClosing => "",
        };
        match &self.kind {
            TokenKind::Block(block) => {
                write!(f, "{}{suffix}", block.name())?;
                if self.nesting == Nesting::Open {
                    match block {
                        BlockToken::Heading { level } => write!(f, " level={level}")?,
                        BlockToken::OrderedList { start } => write!(f, " start={start}")?,
                        BlockToken::TaskItem { state } => write!(f, " state={state}")?,
                        BlockToken::TableHeaderCell { align }
                        | BlockToken::TableDataCell { align } => {
                            if let Some(align) = align.as_str() {
                                write!(f, " align={align}")?;
                            }
                        }
                        _ => {}
                    }
                }
                Ok(())
            }
            TokenKind::Mark(mark) => {
                write!(f, "{}{suffix}", mark.type_name())?;
                if let (Mark::Link { href, .. }, Nesting::Open) = (mark, self.nesting) {
                    write!(f, " href={href:?}")?;
                }
                Ok(())
            }
            TokenKind::Text(text) => write!(f, "text {text:?}"),
            TokenKind::CodeInline(code) => write!(f, "code_inline {code:?}"),
            TokenKind::CodeBlock { language, content } => {
                write!(f, "code_block")?;
                if let Some(language) = language {
                    write!(f, " language={language}")?;
                }
                write!(f, " {content:?}")
            }
            TokenKind::HorizontalRule => write!(f, "hr"),
            TokenKind::HardBreak => write!(f, "hardbreak"),
            TokenKind::Image { src, alt, .. } => write!(f, "image src={src:?} alt={alt:?}"),
            TokenKind::TaskMarker { state } => write!(f, "task_marker state={state}"),
            TokenKind::Timestamp { time } => write!(f, "timestamp time={time}"),
            TokenKind::NoteLink { title } => write!(f, "note_link title={title:?}"),
        }
    }
}
