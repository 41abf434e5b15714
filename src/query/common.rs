/*!
# Shared Types

This module contains shared types used across the shaking pipeline: the
[`Mode`] a query runs in and the safety [`Limits`] applied while compiling
and walking.
*/
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Default maximum JSON nesting depth visited by a walk.
pub const MAX_DEPTH: usize = 1000;

/// Default maximum byte length of a single path expression.
pub const MAX_PATH_LENGTH: usize = 10_000;

/// Default maximum number of path expressions in one query.
pub const MAX_PATH_COUNT: usize = 1000;

/// Selects between keeping and removing the matched subtrees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Keep only the matched subtrees.
    Include,
    /// Remove the matched subtrees and keep everything else.
    Exclude,
}

impl Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Include => write!(f, "include"),
            Self::Exclude => write!(f, "exclude"),
        }
    }
}

/// Safety bounds for compiling and walking. A `None` field means "no
/// restriction".
///
/// The [`Default`] value applies [`MAX_DEPTH`], [`MAX_PATH_LENGTH`] and
/// [`MAX_PATH_COUNT`], which is what untrusted input should get. Individual
/// bounds can be overridden with struct update syntax:
///
/// ```
/// use jsonshake::query::Limits;
/// let limits = Limits { max_depth: Some(64), ..Limits::default() };
/// assert_eq!(limits.max_path_count, Some(1000));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Maximum nesting depth of visited JSON nodes
    pub max_depth: Option<usize>,
    /// Maximum byte length of each path expression
    pub max_path_length: Option<usize>,
    /// Maximum number of path expressions per query
    pub max_path_count: Option<usize>,
}

impl Limits {
    /// Limits with every bound disabled. Only use this when both the
    /// document and the paths are trusted.
    #[must_use]
    pub const fn none() -> Self {
        Self { max_depth: None, max_path_length: None, max_path_count: None }
    }
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_depth: Some(MAX_DEPTH),
            max_path_length: Some(MAX_PATH_LENGTH),
            max_path_count: Some(MAX_PATH_COUNT),
        }
    }
}
