//! Converts a nested document tree into a flat token stream.
//!
//! # The High-Level Concept
//!
//! Traversing the tree in pre-order lets us emit a sequence of open/leaf/close
//! tokens that [`build`](crate::common::flat_to_nested::build) reassembles into
//! the original tree. The walk keeps its own stack of pending work instead of
//! recursing, so deeply nested documents do not grow the call stack.
//!
//! # The Algorithm
//!
//! 1. **Entering Containers:**
//!    - Emit the `Open` token, schedule the matching `Close`, then schedule the
//!      children in reverse so they pop in document order
//!
//! 2. **Inline Runs:**
//!    - Text blocks emit their inline children as one run. Marks shared by
//!      neighbouring nodes stay open across them (common prefix), so a bold
//!      span split by an italic word becomes a single bold open/close pair
//!    - `code` is token-scoped: text whose marks include it becomes `CodeInline`
//!
//! 3. **Leaves:**
//!    - Code blocks and rules become single self-closing tokens
//!
//! `build(flatten(doc)) == doc` holds for trees produced by `build`, where
//! `code` is always the innermost mark.

use crate::ir::nodes::{Document, Mark, Node, NodeKind};
use crate::ir::tokens::{BlockToken, Token, TokenKind};

enum Step<'a> {
    Enter(&'a Node),
    Exit(BlockToken),
}

/// Converts a document tree to a flat vector of tokens.
pub fn flatten(doc: &Document) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut stack: Vec<Step<'_>> = doc.content.iter().rev().map(Step::Enter).collect();

    while let Some(step) = stack.pop() {
        let node = match step {
            Step::Exit(block) => {
                tokens.push(Token::close(block));
                continue;
            }
            Step::Enter(node) => node,
        };

        if node.kind.is_inline() {
            emit_inline_run(std::slice::from_ref(node), &mut tokens);
            continue;
        }

        match &node.kind {
            NodeKind::CodeBlock { language } => {
                let content = node.content.iter().filter_map(Node::as_text).collect();
                tokens.push(Token::leaf(TokenKind::CodeBlock {
                    language: language.clone(),
                    content,
                }));
            }
            NodeKind::HorizontalRule => tokens.push(Token::leaf(TokenKind::HorizontalRule)),
            kind => {
                let block = BlockToken::from_node_kind(kind);
                if let Some(block) = &block {
                    tokens.push(Token::open(block.clone()));
                }
                if kind.is_textblock() {
                    emit_inline_run(&node.content, &mut tokens);
                    if let Some(block) = block {
                        tokens.push(Token::close(block));
                    }
                } else {
                    if let Some(block) = block {
                        stack.push(Step::Exit(block));
                    }
                    stack.extend(node.content.iter().rev().map(Step::Enter));
                }
            }
        }
    }

    tokens
}

fn emit_inline_run(nodes: &[Node], tokens: &mut Vec<Token>) {
    let mut open: Vec<&Mark> = Vec::new();

    for node in nodes {
        let code = node.marks.contains(&Mark::Code);
        let ranged: Vec<&Mark> = node.marks.iter().filter(|m| **m != Mark::Code).collect();

        let shared = open
            .iter()
            .zip(&ranged)
            .take_while(|(a, b)| a == b)
            .count();
        while open.len() > shared {
            if let Some(mark) = open.pop() {
                tokens.push(Token::mark_close(mark.clone()));
            }
        }
        for mark in &ranged[shared..] {
            tokens.push(Token::mark_open((*mark).clone()));
            open.push(*mark);
        }

        let kind = match &node.kind {
            NodeKind::Text(text) if code => TokenKind::CodeInline(text.clone()),
            NodeKind::Text(text) => TokenKind::Text(text.clone()),
            NodeKind::HardBreak => TokenKind::HardBreak,
            NodeKind::Image { src, alt, title } => TokenKind::Image {
                src: src.clone(),
                alt: alt.clone(),
                title: title.clone(),
            },
            NodeKind::TaskMarker { state } => TokenKind::TaskMarker { state: *state },
            NodeKind::Timestamp { time } => TokenKind::Timestamp { time: time.clone() },
            NodeKind::NoteLink { title, .. } => TokenKind::NoteLink {
                title: title.clone(),
            },
            _ => continue,
        };
        tokens.push(Token::leaf(kind));
    }

    while let Some(mark) = open.pop() {
        tokens.push(Token::mark_close(mark.clone()));
    }
}
