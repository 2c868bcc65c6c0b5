//! JSON tree interchange as a format
//!
//! Parsing validates the incoming tree (see [`crate::ir::json`]); serializing
//! writes pretty-printed JSON with a trailing newline.

use crate::error::FormatError;
use crate::format::Format;
use crate::ir::nodes::Document;

/// Format implementation for the JSON document tree
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFormat;

impl Format for JsonFormat {
    fn name(&self) -> &str {
        "json"
    }

    fn description(&self) -> &str {
        "Document tree as JSON"
    }

    fn file_extensions(&self) -> &[&str] {
        &["json"]
    }

    fn supports_parsing(&self) -> bool {
        true
    }

    fn supports_serialization(&self) -> bool {
        true
    }

    fn parse(&self, source: &str) -> Result<Document, FormatError> {
        Document::from_json(source)
    }

    fn serialize(&self, doc: &Document) -> Result<String, FormatError> {
        let mut out = doc.to_json_pretty()?;
        out.push('\n');
        Ok(out)
    }
}
