/*!
# Path AST and Builder

Defines the AST of parsed path expressions and exposes a fluent API for
constructing paths using a builder pattern.

A [`Path`] is an ordered sequence of [`Segment`]s, each holding one or more
[`Selector`]s. The `descendant` flag on a segment represents the `..`
(recursive descent) operator: the selectors of that segment may match at any
depth below the current position.

# Examples

To construct the path `$.users[*].name`:
```
use jsonshake::query::{Path, PathBuilder};
let path = PathBuilder::new().name("users").wildcard().name("name").build();
assert_eq!(path.to_string(), "$.users.*.name");
```

The same path can be parsed from a raw string:

```
use jsonshake::query::Path;
let path: Path = "$.users[*].name".parse().expect("Invalid path");
assert_eq!(path.segments.len(), 3);
```
*/
use std::{
    fmt::{Display, Write as _},
    ops::{Bound, RangeBounds},
    str::FromStr,
};

use super::{
    common::MAX_PATH_LENGTH,
    parser::{ParseError, parse_path},
    selector::{Selector, Slice},
};

/// A single step in a path expression.
///
/// Multi-selector brackets like `[a,b]` produce several selectors in the same
/// segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Selectors tried at this step; at least one
    pub selectors: Vec<Selector>,
    /// Whether this step was reached via `..`
    pub descendant: bool,
}

impl Segment {
    /// Creates a direct (non-descendant) segment.
    #[must_use]
    pub const fn child(selectors: Vec<Selector>) -> Self {
        Self { selectors, descendant: false }
    }

    /// Creates a recursive-descent segment.
    #[must_use]
    pub const fn descendant(selectors: Vec<Selector>) -> Self {
        Self { selectors, descendant: true }
    }
}

impl Display for Segment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let dots = if self.descendant { ".." } else { "." };
        match self.selectors.as_slice() {
            [Selector::Name(name)] if !needs_quoting(name) => {
                write!(f, "{dots}{name}")
            }
            [Selector::Wildcard] => write!(f, "{dots}*"),
            selectors => {
                if self.descendant {
                    write!(f, "..")?;
                }
                let joined = selectors
                    .iter()
                    .map(bracket_form)
                    .collect::<Vec<_>>()
                    .join(",");
                write!(f, "[{joined}]")
            }
        }
    }
}

/// A parsed path expression.
///
/// The raw string is kept for diagnostics and for deciding whether a path is
/// absolute when a prefix is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path {
    /// Ordered steps from the root to the target node
    pub segments: Vec<Segment>,
    /// The original path string
    pub raw: String,
}

impl Path {
    /// Reports whether the path starts with the `$` root marker.
    #[must_use]
    pub fn is_absolute(&self) -> bool {
        self.raw.starts_with('$')
    }

    /// Returns a new path with `prefix`'s segments placed before this path's
    /// segments.
    #[must_use]
    pub fn prepend(&self, prefix: &Self) -> Self {
        let mut segments =
            Vec::with_capacity(prefix.segments.len() + self.segments.len());
        segments.extend_from_slice(&prefix.segments);
        segments.extend_from_slice(&self.segments);
        Self { segments, raw: format!("{}{}", prefix.raw, self.raw) }
    }
}

impl Display for Path {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_absolute() {
            write!(f, "$")?;
        }
        for segment in &self.segments {
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

impl FromStr for Path {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_path(s, Some(MAX_PATH_LENGTH))
    }
}

/// Renders a selector as it appears inside a bracket group.
fn bracket_form(selector: &Selector) -> String {
    match selector {
        Selector::Name(name) => format!("'{}'", escape_for_quoted_name(name)),
        Selector::Index(idx) => idx.to_string(),
        Selector::Wildcard => "*".to_string(),
        Selector::Slice(slice) => {
            let rendered = slice.to_string();
            // strip the surrounding brackets of the standalone form
            rendered[1..rendered.len() - 1].to_string()
        }
    }
}

/// Returns `true` if a name cannot be written in dot notation. This mirrors
/// the parser's unquoted name rule: a letter or `_` followed by letters,
/// digits, `_` or `-`.
fn needs_quoting(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        // An empty name cannot be represented unquoted
        return true;
    };
    !(first == '_' || first.is_alphabetic())
        || chars.any(|c| !(c == '_' || c == '-' || c.is_alphanumeric()))
}

/// Escape characters inside a single-quoted name for display. This is the
/// inverse of the parser's unescaping.
fn escape_for_quoted_name(name: &str) -> String {
    let mut result = String::with_capacity(name.len());
    for c in name.chars() {
        match c {
            '\'' => result.push_str("\\'"),
            '\\' => result.push_str("\\\\"),
            '\n' => result.push_str("\\n"),
            '\t' => result.push_str("\\t"),
            '\r' => result.push_str("\\r"),
            _ => result.push(c),
        }
    }
    result
}

/// Builder for constructing absolute paths without going through the parser.
#[derive(Debug, Default)]
pub struct PathBuilder {
    /// The segments built so far
    segments: Vec<Segment>,
}

impl PathBuilder {
    /// Creates a new `PathBuilder` rooted at `$`.
    ///
    /// # Examples
    /// ```
    /// use jsonshake::query::PathBuilder;
    /// let path = PathBuilder::new().name("a").build();
    /// assert_eq!(path.to_string(), "$.a");
    /// ```
    #[must_use]
    pub const fn new() -> Self {
        Self { segments: Vec::new() }
    }

    /// Adds a child step matching an exact object key.
    #[must_use]
    pub fn name(self, name: &str) -> Self {
        self.child(Selector::Name(name.to_string()))
    }

    /// Adds a child step matching an exact array index.
    ///
    /// # Examples
    ///
    /// ```
    /// use jsonshake::query::PathBuilder;
    /// let path = PathBuilder::new().name("items").index(-1).build();
    /// assert_eq!(path.to_string(), "$.items[-1]");
    /// ```
    #[must_use]
    pub fn index(self, idx: i64) -> Self {
        self.child(Selector::Index(idx))
    }

    /// Adds a child step matching any key or index.
    #[must_use]
    pub fn wildcard(self) -> Self {
        self.child(Selector::Wildcard)
    }

    /// Adds a child step matching a range of array indices.
    ///
    /// # Examples
    ///
    /// ```
    /// use jsonshake::query::PathBuilder;
    /// let path = PathBuilder::new().slice(1..4).build();
    /// assert_eq!(path.to_string(), "$[1:4]");
    /// ```
    #[must_use]
    pub fn slice(self, range: impl RangeBounds<i64>) -> Self {
        let start = match range.start_bound() {
            Bound::Included(&s) => Some(s),
            Bound::Excluded(&s) => Some(s.saturating_add(1)),
            Bound::Unbounded => None,
        };
        let end = match range.end_bound() {
            Bound::Included(&e) => Some(e.saturating_add(1)),
            Bound::Excluded(&e) => Some(e),
            Bound::Unbounded => None,
        };
        self.child(Selector::Slice(Slice::new(start, end, None)))
    }

    /// Adds a child step holding several selectors at once, e.g. `[a,0]`.
    #[must_use]
    pub fn any_of(mut self, selectors: Vec<Selector>) -> Self {
        self.segments.push(Segment::child(selectors));
        self
    }

    /// Turns the most recently added step into a recursive-descent step. If
    /// no step was added yet this is a no-op.
    ///
    /// # Examples
    ///
    /// ```
    /// use jsonshake::query::PathBuilder;
    /// let path = PathBuilder::new().name("secret").descendant().build();
    /// assert_eq!(path.to_string(), "$..secret");
    /// ```
    #[must_use]
    pub fn descendant(mut self) -> Self {
        if let Some(last) = self.segments.last_mut() {
            last.descendant = true;
        }
        self
    }

    /// Return the built path.
    #[must_use]
    pub fn build(self) -> Path {
        let mut raw = String::from("$");
        for segment in &self.segments {
            // writing into a String cannot fail
            let _ = write!(raw, "{segment}");
        }
        Path { segments: self.segments, raw }
    }

    fn child(mut self, selector: Selector) -> Self {
        self.segments.push(Segment::child(vec![selector]));
        self
    }
}
