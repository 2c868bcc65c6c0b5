//! Whole-pipeline transforms
//!
//! Functional shortcuts over parse → tree → serialize, for callers that do
//! not need the tree in between (the CLI's `format` command, tests).

use crate::error::FormatError;
use crate::formats::markdown::{ParseOptions, SerializeRules};
use crate::ir::nodes::Document;
use crate::{parse_with, serialize_with};

/// Round-trip transformation: parse and re-serialize
///
/// Normalizes markup to the serializer's canonical spelling (bullets, fences,
/// keyword case, escaping).
///
/// # Example
///
/// ```
/// use notemark::transforms::format_source;
/// use notemark::formats::markdown::{ParseOptions, SerializeRules};
///
/// let formatted = format_source("* todo call Bob\n", &ParseOptions::default(), &SerializeRules::default());
/// assert_eq!(formatted, "- TODO call Bob\n");
/// ```
pub fn format_source(source: &str, options: &ParseOptions, rules: &SerializeRules) -> String {
    serialize_with(&parse_with(source, options), rules)
}

/// Markup straight to the pretty-printed JSON tree
pub fn markdown_to_json(source: &str, options: &ParseOptions) -> Result<String, FormatError> {
    parse_with(source, options).to_json_pretty()
}

/// A JSON tree straight to markup
pub fn json_to_markdown(json: &str, rules: &SerializeRules) -> Result<String, FormatError> {
    let doc = Document::from_json(json)?;
    Ok(serialize_with(&doc, rules))
}
