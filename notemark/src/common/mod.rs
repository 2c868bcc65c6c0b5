//! Contains logic for mapping between the tree and the token stream.

pub mod flat_to_nested;
pub mod nested_to_flat;
