//! # Path Queries
//!
//! A JSONPath-inspired path language for selecting parts of JSON documents,
//! with support for:
//! - Field access by name, array indexing (negative indices count from the
//!   end) and slices
//! - Wildcards and multi-selector brackets like `['a', 0, 1:3]`
//! - Recursive descent (`..`) at any depth
//!
//! Paths are compiled into one shared automaton and then walked together
//! with a document to produce a pruned copy of it. Filter expressions,
//! functions and scripts are not supported.

pub mod ast;
pub(crate) mod common;
pub mod compile;
pub mod nfa;
pub mod parser;
pub mod selector;
pub mod walker;

// Re-exports
pub use ast::*;
pub use common::{Limits, MAX_DEPTH, MAX_PATH_COUNT, MAX_PATH_LENGTH, Mode};
pub use compile::*;
pub use nfa::{Automaton, State, StateId};
pub use parser::*;
pub use selector::*;
pub use walker::*;
