//! Markdown format implementation
//!
//! This module implements bidirectional conversion between the document tree
//! and note markup: CommonMark with GFM tables, strikethrough, autolinks and
//! task checkboxes, plus four note extensions (`==highlight==`, task
//! keywords, `[HH:MM]` timestamps and `[[title]]` note links).
//!
//! # Library Choice
//!
//! We use the `comrak` crate for block and inline parsing. The extensions are
//! recognized in a second pass over the token stream, since comrak knows
//! nothing about them. Serialization is written by hand: comrak's
//! CommonMark formatter cannot emit the extensions and does not guarantee the
//! output re-parses to the same tree.
//!
//! # Pipeline
//!
//! ```text
//! parse:     text --tokenizer--> tokens --recognizers--> tokens --builder--> Document
//! serialize: Document --serializer--> text
//! ```
//!
//! # Element Mapping Table
//!
//! | Tree node         | Markdown                     | Export notes                          | Import notes                          |
//! |-------------------|------------------------------|---------------------------------------|---------------------------------------|
//! | heading           | `#`..`######`                | trailing `#` escaped                  | setext headings accepted              |
//! | paragraph         | paragraph                    | direct                                | soft breaks become hard breaks        |
//! | bulletList        | `- item`                     | `*` when following another `-` list   | any bullet                            |
//! | orderedList       | `1. item`                    | `)` when following another `.` list   | start number kept                     |
//! | taskList/taskItem | `- [ ] TODO item`            | `[x]` for done/canceled               | keyword sets the state                |
//! | blockquote        | `> `                         | every line prefixed                   | direct                                |
//! | codeBlock         | fenced block                 | fence longer than any run inside      | indented blocks accepted              |
//! | table             | GFM pipe table               | first row is the header               | alignment per column                  |
//! | horizontalRule    | `---`                        | `***` as first line of a list item    | any thematic break                    |
//! | image             | `![alt](src "title")`        | `.assets/` paths made portable        | alt flattened to text                 |
//! | hardBreak         | newline                      | `\` when the line would be blank      | backslash and two-space forms         |
//! | taskMarker        | `TODO`                       | uppercase keyword                     | whole word, any case                  |
//! | timestamp         | `[09:30]`                    | direct                                | `H:MM` padded to `HH:MM`              |
//! | noteLink          | `[[Title]]`                  | direct                                | `noteId` left unset                   |
//! | Marks:            |                              |                                       |                                       |
//! |   bold            | `**bold**`                   | use `**`                              | parse both                            |
//! |   italic          | `*italic*`                   | `_` directly after a `*` delimiter    | parse both                            |
//! |   strike          | `~~strike~~`                 | direct                                | direct                                |
//! |   highlight       | `==mark==`                   | direct                                | paired per inline run                 |
//! |   code            | `` `code` ``                 | innermost, fence grows with content   | direct                                |
//! |   link            | `[text](href "title")`       | `<...>` when href has spaces/parens   | autolinks accepted                    |
//!
//! # Lossy Conversions
//!
//! The following conversions lose information on round-trip:
//! - Blank-line runs and trailing whitespace are normalized
//! - Raw HTML blocks import as plain paragraphs; inline HTML as text
//! - Plain text that spells a task keyword re-parses as a task marker
//!   (`[HH:MM]`, `[[...]]` and `==` are escaped and stay text)
//! - `noteId` on note links is not written to markup
//! - Reference-style links import as inline links
//!
//! # Implementation Status
//!
//! - [x] Import (Markdown → tree)
//!   - [x] Paragraphs, headings, block quotes, rules
//!   - [x] Bullet, ordered and task lists (checkbox and keyword forms)
//!   - [x] Code blocks, tables, images
//!   - [x] Bold, italic, strike, code, highlight, links
//!   - [x] Task keywords, timestamps, note links
//! - [x] Export (tree → Markdown)
//!   - [x] All of the above, escaping literal text so it re-parses as text

pub mod escape;
pub mod options;
pub mod recognizers;
pub mod serializer;
pub mod tokenizer;

pub use options::{HardBreakStyle, ParseOptions, SerializeRules};

use crate::common::flat_to_nested::build;
use crate::error::FormatError;
use crate::format::Format;
use crate::ir::nodes::Document;

/// Format implementation for Markdown
#[derive(Debug, Clone, Default)]
pub struct MarkdownFormat {
    pub parse_options: ParseOptions,
    pub rules: SerializeRules,
}

impl MarkdownFormat {
    pub fn new(parse_options: ParseOptions, rules: SerializeRules) -> Self {
        Self {
            parse_options,
            rules,
        }
    }
}

impl Format for MarkdownFormat {
    fn name(&self) -> &str {
        "markdown"
    }

    fn description(&self) -> &str {
        "CommonMark with note extensions"
    }

    fn file_extensions(&self) -> &[&str] {
        &["md", "markdown"]
    }

    fn supports_parsing(&self) -> bool {
        true
    }

    fn supports_serialization(&self) -> bool {
        true
    }

    fn parse(&self, source: &str) -> Result<Document, FormatError> {
        let tokens = tokenizer::tokenize(source, &self.parse_options);
        Ok(build(&tokens))
    }

    fn serialize(&self, doc: &Document) -> Result<String, FormatError> {
        Ok(serializer::serialize_document(doc, &self.rules))
    }
}
