//! Markup ↔ document tree conversion for structured notes
//!
//!     A note is edited as a nested document tree (headings, lists, tables, code blocks,
//!     styled text) but stored as plain Markdown with a few note extensions: task keywords
//!     (`TODO`, `DONE`, ...), `[HH:MM]` timestamps, `[[Title]]` note links and
//!     `==highlights==`. This crate converts between the two.
//!
//!     This is a pure lib: no I/O, no global state, no shell assumptions. It powers
//!     notemark-cli, which owns files, config and logging setup.
//!
//! Architecture
//!
//!     The conversion is split around a flat token stream (./ir/tokens.rs), the same way in
//!     both directions:
//!
//!         parse:      text --tokenizer--> tokens --builder--> tree
//!         serialize:  tree --serializer--> text
//!         inspect:    tree --flatten--> tokens
//!
//!     The tokenizer (./formats/markdown/tokenizer.rs) lowers comrak's AST into tokens and
//!     runs the entity recognizers (./formats/markdown/recognizers.rs) over every inline run.
//!     The builder (./common/flat_to_nested.rs) is format agnostic: it reduces any balanced or
//!     unbalanced token stream into a tree with a stack of open frames.
//!
//!     The file structure :
//!     .
//!     ├── error.rs
//!     ├── format.rs               # Format trait definition
//!     ├── registry.rs             # FormatRegistry for discovery and selection
//!     ├── transforms.rs           # whole-pipeline shortcuts
//!     ├── formats
//!     │   ├── markdown            # tokenizer, recognizers, serializer, escaping, options
//!     │   └── json                # tree interchange as a format
//!     ├── ir                      # tree, tokens, JSON shape
//!     └── common                  # builder (flat → nested) and flatten (nested → flat)
//!
//! Testing
//!
//!     tests
//!     ├── lib.rs                  # includes the sub-modules below
//!     ├── common                  # builder and flatten through the public API
//!     ├── json
//!     ├── markdown
//!     │   └── <testname>.rs       # import, export, entities, table, round_trip
//!     └── fixtures
//!
//!     Note that rust does not by default discover tests in subdirectories, so we need to include these
//!     in the mod.
//!
//! Round trip
//!
//!     `parse(serialize(tree))` is structurally equivalent to `tree` up to blank-line runs and
//!     trailing whitespace, and serializing is idempotent. Brackets and `==` in plain text are
//!     written escaped and stay text; a plain-text task keyword re-parses as a task marker,
//!     since letters have no backslash escape.

pub mod common;
pub mod error;
pub mod format;
pub mod formats;
pub mod ir;
pub mod registry;
pub mod transforms;

pub use common::flat_to_nested::build;
pub use common::nested_to_flat::flatten;
pub use error::FormatError;
pub use format::Format;
pub use formats::markdown::{HardBreakStyle, ParseOptions, SerializeRules};
pub use formats::{JsonFormat, MarkdownFormat};
pub use ir::nodes::{Alignment, Document, Mark, Node, NodeKind, TaskState};
pub use ir::tokens::{BlockToken, Nesting, Token, TokenKind};
pub use registry::FormatRegistry;

/// Parse markup with the default options.
pub fn parse(source: &str) -> Document {
    parse_with(source, &ParseOptions::default())
}

/// Parse markup into a fresh document tree. Never fails: anything the
/// tokenizer does not recognize stays text.
pub fn parse_with(source: &str, options: &ParseOptions) -> Document {
    build(&tokenize(source, options))
}

/// Serialize with the default rules.
pub fn serialize(doc: &Document) -> String {
    serialize_with(doc, &SerializeRules::default())
}

pub fn serialize_with(doc: &Document, rules: &SerializeRules) -> String {
    formats::markdown::serializer::serialize_document(doc, rules)
}

/// The token stream the builder sees for `source`.
pub fn tokenize(source: &str, options: &ParseOptions) -> Vec<Token> {
    formats::markdown::tokenizer::tokenize(source, options)
}
