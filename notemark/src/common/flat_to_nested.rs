//! Converts a flat token stream back to a nested document tree.
//!
//! # The High-Level Concept
//!
//! The core challenge is to reconstruct a tree structure from a linear sequence of tokens.
//! The algorithm uses a stack to keep track of the current nesting level. The stack acts as
//! a memory of "open" containers. When we encounter an `Open` token for a container (like a
//! heading or list), we push a frame onto the stack, making it the new "current" container.
//! When we see its corresponding `Close` token, we pop it off and attach the finished node to
//! its parent.
//!
//! Marks live on a second stack. They never create frames: every inline node simply takes a
//! copy of the marks open at the moment it is appended.
//!
//! # Tolerating Broken Streams
//!
//! The builder never fails. Token streams coming from the tokenizer are always balanced, but
//! streams assembled by hand (or truncated) may not be:
//!
//! ```text
//! blockquote_open
//! paragraph_open
//! text "quoted"
//! blockquote_close       <- force-closes the paragraph, then the blockquote
//! list_item_close        <- nothing open matches: ignored
//! bullet_list_open       <- never closed: force-closed at end of stream
//! ```
//!
//! # The Algorithm
//!
//! 1. **Initialization:**
//!    - Push a `document` frame; it is never popped by a close token
//!
//! 2. **Processing `Open` block tokens:**
//!    - Push a new empty frame remembering the opening token
//!
//! 3. **Processing leaf tokens:**
//!    - Build the node (inline nodes take the current marks) and append it to the top frame
//!
//! 4. **Processing `Close` block tokens:**
//!    - Find the innermost frame opened by the same container type
//!    - Force-close every frame above it, then close it
//!    - Transparent frames (`tableHead`/`tableBody`) splice their children into the parent
//!
//! 5. **Completion:**
//!    - Force-close the remaining frames, innermost first
//!    - The document frame holds the finished tree

use crate::ir::nodes::{Document, Mark, Node, NodeKind};
use crate::ir::tokens::{BlockToken, Nesting, Token, TokenKind};
use log::debug;

/// A container being built on the stack
#[derive(Debug)]
struct Frame {
    /// `None` for the document frame
    opened_by: Option<BlockToken>,
    content: Vec<Node>,
}

impl Frame {
    fn document() -> Self {
        Self {
            opened_by: None,
            content: Vec::new(),
        }
    }

    fn open(block: BlockToken) -> Self {
        Self {
            opened_by: Some(block),
            content: Vec::new(),
        }
    }

    fn is_opened_by(&self, block: &BlockToken) -> bool {
        self.opened_by
            .as_ref()
            .is_some_and(|opened| opened.matches(block))
    }
}

struct TreeBuilder {
    frames: Vec<Frame>,
    marks: Vec<Mark>,
}

impl TreeBuilder {
    fn new() -> Self {
        Self {
            frames: vec![Frame::document()],
            marks: Vec::new(),
        }
    }

    fn push(&mut self, token: &Token) {
        match (&token.kind, token.nesting) {
            (TokenKind::Block(block), Nesting::Open) => self.frames.push(Frame::open(block.clone())),
            (TokenKind::Block(block), Nesting::Close) => self.close_block(block),
            (TokenKind::Block(block), Nesting::SelfClosing) => {
                self.frames.push(Frame::open(block.clone()));
                self.close_top();
            }
            (TokenKind::Mark(mark), Nesting::Open) => self.marks.push(mark.clone()),
            (TokenKind::Mark(mark), Nesting::Close) => self.close_mark(mark),
            (TokenKind::Mark(mark), Nesting::SelfClosing) => {
                debug!("ignoring self-closing {} mark token", mark.type_name());
            }
            (TokenKind::Text(text), _) => self.append_inline(NodeKind::Text(text.clone())),
            (TokenKind::CodeInline(code), _) => {
                self.marks.push(Mark::Code);
                self.append_inline(NodeKind::Text(code.clone()));
                self.marks.pop();
            }
            (TokenKind::CodeBlock { language, content }, _) => {
                let content = if content.is_empty() {
                    Vec::new()
                } else {
                    vec![Node::text(content.clone())]
                };
                self.append(Node::with_content(
                    NodeKind::CodeBlock {
                        language: language.clone(),
                    },
                    content,
                ));
            }
            (TokenKind::HorizontalRule, _) => self.append(Node::new(NodeKind::HorizontalRule)),
            (TokenKind::HardBreak, _) => self.append_inline(NodeKind::HardBreak),
            (TokenKind::Image { src, alt, title }, _) => self.append_inline(NodeKind::Image {
                src: src.clone(),
                alt: alt.clone(),
                title: title.clone(),
            }),
            (TokenKind::TaskMarker { state }, _) => {
                self.append_inline(NodeKind::TaskMarker { state: *state })
            }
            (TokenKind::Timestamp { time }, _) => {
                self.append_inline(NodeKind::Timestamp { time: time.clone() })
            }
            (TokenKind::NoteLink { title }, _) => self.append_inline(NodeKind::NoteLink {
                title: title.clone(),
                note_id: None,
            }),
        }
    }

    fn close_block(&mut self, block: &BlockToken) {
        let Some(depth) = self.frames.iter().rposition(|f| f.is_opened_by(block)) else {
            debug!("ignoring unmatched {}_close token", block.name());
            return;
        };
        while self.frames.len() > depth + 1 {
            if let Some(opened) = self.frames.last().and_then(|f| f.opened_by.as_ref()) {
                debug!(
                    "force-closing {} before {}_close",
                    opened.name(),
                    block.name()
                );
            }
            self.close_top();
        }
        self.close_top();
    }

    /// Pops the top frame into its parent. The document frame is never popped.
    fn close_top(&mut self) {
        if self.frames.len() <= 1 {
            return;
        }
        let Some(frame) = self.frames.pop() else {
            return;
        };
        let Some(parent) = self.frames.last_mut() else {
            return;
        };
        match frame.opened_by.as_ref().and_then(BlockToken::node_kind) {
            Some(kind) => parent.content.push(Node::with_content(kind, frame.content)),
            None => parent.content.extend(frame.content),
        }
    }

    fn close_mark(&mut self, mark: &Mark) {
        match self.marks.iter().rposition(|m| m.same_type(mark)) {
            Some(index) => {
                self.marks.remove(index);
            }
            None => debug!("ignoring unmatched {}_close token", mark.type_name()),
        }
    }

    fn append(&mut self, node: Node) {
        if let Some(top) = self.frames.last_mut() {
            top.content.push(node);
        }
    }

    fn append_inline(&mut self, kind: NodeKind) {
        let node = Node::new(kind).with_marks(self.marks.clone());
        self.append(node);
    }

    fn finish(mut self) -> Document {
        if self.frames.len() > 1 {
            debug!(
                "force-closing {} unclosed frame(s) at end of stream",
                self.frames.len() - 1
            );
        }
        while self.frames.len() > 1 {
            self.close_top();
        }
        let content = self.frames.pop().map(|f| f.content).unwrap_or_default();
        Document::new(content)
    }
}

/// Reduces a token stream into a document tree.
///
/// Never fails: unmatched close tokens are ignored and unclosed containers are
/// closed at the end of the stream.
pub fn build(tokens: &[Token]) -> Document {
    let mut builder = TreeBuilder::new();
    for token in tokens {
        builder.push(token);
    }
    builder.finish()
}
