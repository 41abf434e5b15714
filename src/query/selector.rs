/*!
# Selectors

Selectors are the leaves of a parsed path: each one describes a single
matching rule for one step down a JSON document. The set of selectors is
fixed by the path grammar:

- [`Selector::Name`]: exact object key, e.g. `.name` or `['name']`
- [`Selector::Index`]: exact array index, negative indices count from the end
- [`Selector::Wildcard`]: any key or index, e.g. `.*` or `[*]`
- [`Selector::Slice`]: array slice with optional start, end and step, e.g.
  `[1:5:2]`

Slice bounds follow [RFC 9535 §2.3.4](https://www.rfc-editor.org/rfc/rfc9535#section-2.3.4).
*/
use std::fmt::Display;

/// One step into a JSON container, as seen by [`Selector::matches`]: either
/// an object key or an array index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key<'a> {
    /// Object member name
    Name(&'a str),
    /// Array element position (always non-negative)
    Index(usize),
}

/// A single matching rule within a path segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Selector {
    /// Matches an object key exactly.
    Name(String),
    /// Matches an array index exactly. Negative values are resolved against
    /// the array length at match time, e.g. `-1` is the last element.
    Index(i64),
    /// Matches any object key or array index.
    Wildcard,
    /// Matches a range of array indices.
    Slice(Slice),
}

impl Selector {
    /// Reports whether this selector alone matches `key`. `len` is the length
    /// of the containing array and is ignored for object keys.
    ///
    /// This is a standalone predicate for callers holding a single parsed
    /// selector; compiled queries match through their automaton instead.
    #[must_use]
    pub fn matches(&self, key: Key<'_>, len: usize) -> bool {
        match (self, key) {
            (Self::Wildcard, _) => true,
            (Self::Name(name), Key::Name(k)) => name == k,
            (Self::Index(idx), Key::Index(i)) => {
                resolve_index(*idx, len) == Some(i)
            }
            (Self::Slice(slice), Key::Index(i)) => slice.contains(i, len),
            _ => false,
        }
    }
}

impl Display for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Name(name) => write!(f, "{name}"),
            Self::Index(idx) => write!(f, "[{idx}]"),
            Self::Wildcard => write!(f, "*"),
            Self::Slice(slice) => write!(f, "{slice}"),
        }
    }
}

/// Array slice `[start:end:step]`. Unspecified components take their RFC 9535
/// defaults when matched, which depend on the sign of the step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Slice {
    /// First index (inclusive)
    pub start: Option<i64>,
    /// Last index (exclusive)
    pub end: Option<i64>,
    /// Stride between matched indices; `0` matches nothing
    pub step: Option<i64>,
}

impl Slice {
    /// Creates a new slice from its optional components.
    #[must_use]
    pub const fn new(
        start: Option<i64>,
        end: Option<i64>,
        step: Option<i64>,
    ) -> Self {
        Self { start, end, step }
    }

    /// Reports whether array index `index` of an array of length `len` falls
    /// inside the slice.
    #[must_use]
    pub fn contains(&self, index: usize, len: usize) -> bool {
        let step = self.step.unwrap_or(1);
        if step == 0 {
            return false;
        }
        let (Ok(idx), Ok(len)) = (i64::try_from(index), i64::try_from(len))
        else {
            return false;
        };

        let (start, end) = self.bounds(len, step);
        let in_range = if step > 0 {
            idx >= start && idx < end
        } else {
            idx <= start && idx > end
        };
        // `unsigned_abs` keeps `i64::MIN` steps from overflowing
        in_range && (idx - start).unsigned_abs() % step.unsigned_abs() == 0
    }

    /// Resolves defaults, normalizes negative bounds and clamps them to the
    /// array.
    fn bounds(&self, len: i64, step: i64) -> (i64, i64) {
        if step > 0 {
            let start = self.start.map_or(0, |s| normalize(s, len));
            let end = self.end.map_or(len, |e| normalize(e, len));
            (start.clamp(0, len), end.clamp(0, len))
        } else {
            let start = self.start.map_or(len - 1, |s| normalize(s, len));
            let end = self.end.map_or(-1, |e| normalize(e, len));
            (start.clamp(-1, len - 1), end.clamp(-1, len - 1))
        }
    }
}

impl Display for Slice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[")?;
        if let Some(s) = self.start {
            write!(f, "{s}")?;
        }
        write!(f, ":")?;
        if let Some(e) = self.end {
            write!(f, "{e}")?;
        }
        if let Some(step) = self.step {
            write!(f, ":{step}")?;
        }
        write!(f, "]")
    }
}

/// Converts a possibly negative index into a position within an array of
/// length `len`, or `None` if it lies outside the array. Used by
/// [`Selector::matches`].
#[must_use]
pub fn resolve_index(idx: i64, len: usize) -> Option<usize> {
    let len = i64::try_from(len).ok()?;
    let resolved = if idx < 0 { idx.checked_add(len)? } else { idx };
    if (0..len).contains(&resolved) {
        usize::try_from(resolved).ok()
    } else {
        None
    }
}

const fn normalize(idx: i64, len: i64) -> i64 {
    if idx < 0 { idx.saturating_add(len) } else { idx }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Collects every index of an array of length `len` matched by `slice`.
    fn selected(slice: Slice, len: usize) -> Vec<usize> {
        (0..len).filter(|&i| slice.contains(i, len)).collect()
    }

    #[test]
    fn name_matches_only_exact_keys() {
        let sel = Selector::Name("foo".to_string());
        assert!(sel.matches(Key::Name("foo"), 0));
        assert!(!sel.matches(Key::Name("fo"), 0));
        assert!(!sel.matches(Key::Index(0), 3));
    }

    #[test]
    fn index_resolves_negative_positions() {
        let last = Selector::Index(-1);
        assert!(last.matches(Key::Index(4), 5));
        assert!(!last.matches(Key::Index(3), 5));

        let out_of_bounds = Selector::Index(-6);
        assert!((0..5).all(|i| !out_of_bounds.matches(Key::Index(i), 5)));
    }

    #[test]
    fn index_never_matches_names() {
        assert!(!Selector::Index(0).matches(Key::Name("0"), 1));
    }

    #[test]
    fn wildcard_matches_everything() {
        assert!(Selector::Wildcard.matches(Key::Name("anything"), 0));
        assert!(Selector::Wildcard.matches(Key::Index(7), 8));
    }

    #[test]
    fn slice_with_defaults_selects_all() {
        assert_eq!(selected(Slice::default(), 4), vec![0, 1, 2, 3]);
    }

    #[test]
    fn slice_bounded_range() {
        let slice = Slice::new(Some(0), Some(3), None);
        assert_eq!(selected(slice, 6), vec![0, 1, 2]);
    }

    #[test]
    fn slice_with_step() {
        let slice = Slice::new(Some(1), None, Some(2));
        assert_eq!(selected(slice, 7), vec![1, 3, 5]);
    }

    #[test]
    fn slice_negative_bounds() {
        // [-2:] selects the last two elements
        let slice = Slice::new(Some(-2), None, None);
        assert_eq!(selected(slice, 5), vec![3, 4]);
    }

    #[test]
    fn slice_negative_step_walks_backwards() {
        let slice = Slice::new(None, None, Some(-1));
        assert_eq!(selected(slice, 3), vec![0, 1, 2]);

        let slice = Slice::new(Some(3), Some(0), Some(-2));
        assert_eq!(selected(slice, 5), vec![1, 3]);
    }

    #[test]
    fn slice_zero_step_matches_nothing() {
        let slice = Slice::new(None, None, Some(0));
        assert!(selected(slice, 5).is_empty());
    }

    #[test]
    fn slice_extreme_steps_select_one_end() {
        let slice = Slice::new(None, None, Some(i64::MIN));
        assert_eq!(selected(slice, 3), vec![2]);
        assert!(Selector::Slice(slice).matches(Key::Index(2), 3));

        let slice = Slice::new(None, None, Some(i64::MAX));
        assert_eq!(selected(slice, 3), vec![0]);

        let slice = Slice::new(Some(i64::MIN), Some(i64::MAX), Some(i64::MIN));
        assert!(selected(slice, 4).is_empty());
    }

    #[test]
    fn slice_bounds_are_clamped() {
        let slice = Slice::new(Some(-100), Some(100), None);
        assert_eq!(selected(slice, 3), vec![0, 1, 2]);
    }

    #[test]
    fn slice_display() {
        assert_eq!(Slice::new(Some(1), Some(5), None).to_string(), "[1:5]");
        assert_eq!(Slice::new(None, None, Some(2)).to_string(), "[::2]");
        assert_eq!(Slice::new(Some(-1), None, None).to_string(), "[-1:]");
    }
}
