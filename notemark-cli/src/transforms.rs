//! CLI-specific transforms
//!
//! This module defines the views available to `notemark inspect`. Each
//! transform is a stage + format combination (e.g. `token-simple`,
//! `tree-json`).
//!
//! ## Transform Pipeline
//!
//! 1. **Tokenization** - Markdown → token stream
//!    - `token-simple`: one token per line, indented by nesting depth
//!    - `token-count`: token totals per kind
//!
//! 2. **Building** - token stream → document tree
//!    - `tree-outline`: indented outline of node types and attributes
//!    - `tree-json`: the JSON interchange tree
//!
//! 3. **Serializing** - document tree → Markdown
//!    - `markdown`: canonical re-serialization (same as `notemark format`)

use notemark::{build, serialize_with, tokenize, Nesting, Node, NodeKind, ParseOptions, SerializeRules};
use std::collections::BTreeMap;
use std::fmt::Write;

/// All available CLI transforms (stage + format combinations)
pub const AVAILABLE_TRANSFORMS: &[&str] = &[
    "token-simple",
    "token-count",
    "tree-outline",
    "tree-json",
    "markdown",
];

pub const DEFAULT_TRANSFORM: &str = "tree-outline";

/// Execute a named transform on Markdown source.
pub fn execute_transform(
    source: &str,
    transform_name: &str,
    options: &ParseOptions,
    rules: &SerializeRules,
) -> Result<String, String> {
    match transform_name {
        "token-simple" => Ok(tokens_to_simple(source, options)),
        "token-count" => Ok(tokens_to_counts(source, options)),
        "tree-outline" => Ok(tree_outline(&build(&tokenize(source, options)).content)),
        "tree-json" => build(&tokenize(source, options))
            .to_json_pretty()
            .map(|mut json| {
                json.push('\n');
                json
            })
            .map_err(|e| format!("JSON serialization failed: {e}")),
        "markdown" => Ok(serialize_with(&build(&tokenize(source, options)), rules)),
        _ => Err(format!(
            "Unknown transform '{transform_name}'. Available: {}",
            AVAILABLE_TRANSFORMS.join(", ")
        )),
    }
}

fn tokens_to_simple(source: &str, options: &ParseOptions) -> String {
    let mut depth = 0usize;
    let mut out = String::new();
    for token in tokenize(source, options) {
        if token.nesting == Nesting::Close {
            depth = depth.saturating_sub(1);
        }
        let _ = writeln!(out, "{}{token}", "  ".repeat(depth));
        if token.nesting == Nesting::Open {
            depth += 1;
        }
    }
    out
}

fn tokens_to_counts(source: &str, options: &ParseOptions) -> String {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for token in tokenize(source, options) {
        if token.nesting == Nesting::Close {
            continue;
        }
        let line = token.to_string();
        let name = line
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .trim_end_matches("_open")
            .to_string();
        *counts.entry(name).or_default() += 1;
    }
    counts
        .iter()
        .map(|(name, count)| format!("{name}: {count}\n"))
        .collect()
}

/// Indented outline of the tree, one node per line.
fn tree_outline(nodes: &[Node]) -> String {
    let mut out = String::new();
    let mut stack: Vec<(usize, &Node)> = nodes.iter().rev().map(|node| (0, node)).collect();
    while let Some((depth, node)) = stack.pop() {
        let _ = writeln!(out, "{}{}", "  ".repeat(depth), describe(node));
        stack.extend(node.content.iter().rev().map(|child| (depth + 1, child)));
    }
    out
}

fn describe(node: &Node) -> String {
    let mut line = node.kind.type_name().to_string();
    match &node.kind {
        NodeKind::Heading { level } => {
            let _ = write!(line, " level={level}");
        }
        NodeKind::OrderedList { start } => {
            let _ = write!(line, " start={start}");
        }
        NodeKind::TaskItem { state } | NodeKind::TaskMarker { state } => {
            let _ = write!(line, " state={state}");
        }
        NodeKind::CodeBlock {
            language: Some(language),
        } => {
            let _ = write!(line, " language={language}");
        }
        NodeKind::TableHeaderCell { align } | NodeKind::TableDataCell { align } => {
            if let Some(align) = align.as_str() {
                let _ = write!(line, " align={align}");
            }
        }
        NodeKind::Text(text) => {
            let _ = write!(line, " {text:?}");
        }
        NodeKind::Image { src, .. } => {
            let _ = write!(line, " src={src}");
        }
        NodeKind::Timestamp { time } => {
            let _ = write!(line, " time={time}");
        }
        NodeKind::NoteLink { title, .. } => {
            let _ = write!(line, " title={title:?}");
        }
        _ => {}
    }
    if !node.marks.is_empty() {
        let marks: Vec<&str> = node.marks.iter().map(|mark| mark.type_name()).collect();
        let _ = write!(line, " [{}]", marks.join(", "));
    }
    line
}
