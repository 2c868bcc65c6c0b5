//! Intermediate representations shared by every format.
//!
//! - [`nodes`]: the nested document tree.
//! - [`tokens`]: the flat token stream between the tokenizer and the builder.
//! - [`json`]: the tree's JSON interchange shape.

pub mod json;
pub mod nodes;
pub mod tokens;
