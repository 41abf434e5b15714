/*!
# Walker

Traverses a JSON value tree and a compiled [`Automaton`] in lockstep and
builds a new, pruned tree.

Each visited node is paired with the automaton state reached by the keys and
indices leading to it:

- no state: include drops the subtree, exclude copies it unchanged
- accepting state: include copies the subtree, exclude drops it
- otherwise the node's entries are visited with their next states

Scalars reached by a non-accepting state are where the query expected to go
deeper than the document does. Include drops them and exclude keeps them.

Recursive descent (`..`) is handled through the epsilon child of a state,
which must be tried at every nesting level below it:

- include mode runs a *search* that tests the epsilon state against every
  entry at every depth and merges what it finds into the direct result
- exclude mode runs a *filter* over the already-pruned result that removes
  every nested match of the epsilon state

Composite states produced while matching live in a walk-scoped
[`Scratch`] store and are dropped when the walk returns.
*/
use log::debug;
use serde_json::{Map, Value};
use thiserror::Error;

use super::{
    common::Mode,
    nfa::{Automaton, Scratch, StateId, StateStore, match_index, match_name, union},
};

/// The document nests deeper than the configured maximum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("maximum depth {max_depth} exceeded at depth {depth}")]
pub struct DepthError {
    /// Depth of the first node beyond the limit, counted in edges from the
    /// root (the root itself is at depth 0)
    pub depth: usize,
    /// The configured maximum depth
    pub max_depth: usize,
}

/// Prunes `value` against `automaton`.
///
/// When nothing matches in include mode the result is the empty container of
/// the root's shape: `{}` for an object, `[]` for an array and `null` for a
/// scalar.
///
/// # Errors
///
/// Returns a [`DepthError`] as soon as a visited node lies deeper than
/// `max_depth`. No partial result is returned.
pub fn prune(
    automaton: &Automaton,
    value: &Value,
    mode: Mode,
    max_depth: Option<usize>,
) -> Result<Value, DepthError> {
    let mut walker = Walker { store: Scratch::new(automaton), max_depth };
    let root = Some(automaton.root());

    let result = match mode {
        Mode::Include => walker.include(value, root, 0)?,
        Mode::Exclude => walker.exclude(value, root, 0)?,
    };
    debug!(
        "{mode} walk finished, {} composite states created",
        walker.store.created()
    );

    Ok(result.unwrap_or_else(|| empty_like(value)))
}

/// Per-call walk state.
struct Walker<'a> {
    store: Scratch<'a>,
    max_depth: Option<usize>,
}

impl Walker<'_> {
    const fn check_depth(&self, depth: usize) -> Result<(), DepthError> {
        match self.max_depth {
            Some(max_depth) if depth > max_depth => {
                Err(DepthError { depth, max_depth })
            }
            _ => Ok(()),
        }
    }

    /// Returns `(accepting, epsilon)` for a state.
    fn flags(&self, id: StateId) -> (bool, Option<StateId>) {
        let state = self.store.state(id);
        (state.is_accepting(), state.epsilon())
    }

    /// Include walk. `None` means nothing below this node matched.
    fn include(
        &mut self,
        value: &Value,
        state: Option<StateId>,
        depth: usize,
    ) -> Result<Option<Value>, DepthError> {
        let Some(id) = state else { return Ok(None) };
        self.check_depth(depth)?;
        let (accepting, epsilon) = self.flags(id);
        if accepting {
            return Ok(Some(value.clone()));
        }

        match value {
            Value::Object(map) => {
                let mut out = Map::new();
                for (key, child) in map {
                    let direct = match_name(&mut self.store, id, key);
                    let from_epsilon = epsilon
                        .and_then(|eps| match_name(&mut self.store, eps, key));
                    if let Some(kept) = self.include_entry(
                        child,
                        direct,
                        from_epsilon,
                        epsilon,
                        depth + 1,
                    )? {
                        out.insert(key.clone(), kept);
                    }
                }
                Ok((!out.is_empty()).then_some(Value::Object(out)))
            }
            Value::Array(items) => {
                let len = items.len();
                let mut out = Vec::new();
                for (i, child) in items.iter().enumerate() {
                    let direct = match_index(&mut self.store, id, i, len);
                    let from_epsilon = epsilon.and_then(|eps| {
                        match_index(&mut self.store, eps, i, len)
                    });
                    if let Some(kept) = self.include_entry(
                        child,
                        direct,
                        from_epsilon,
                        epsilon,
                        depth + 1,
                    )? {
                        out.push(kept);
                    }
                }
                Ok((!out.is_empty()).then_some(Value::Array(out)))
            }
            _ => Ok(None),
        }
    }

    /// Combines the direct match, the epsilon child's match at this entry and
    /// the epsilon search below it. Where results overlap on anything other
    /// than two objects, the direct result wins.
    fn include_entry(
        &mut self,
        child: &Value,
        direct: Option<StateId>,
        from_epsilon: Option<StateId>,
        epsilon: Option<StateId>,
        depth: usize,
    ) -> Result<Option<Value>, DepthError> {
        let mut result = self.include(child, direct, depth)?;
        if from_epsilon.is_some() {
            let found = self.include(child, from_epsilon, depth)?;
            result = merge_results(result, found);
        }
        if let Some(eps) = epsilon {
            let found = self.search(child, eps, depth)?;
            result = merge_results(result, found);
        }
        Ok(result)
    }

    /// Tests the epsilon state against every entry below `value`, at every
    /// depth. Searching continues below a match.
    fn search(
        &mut self,
        value: &Value,
        epsilon: StateId,
        depth: usize,
    ) -> Result<Option<Value>, DepthError> {
        self.check_depth(depth)?;

        match value {
            Value::Object(map) => {
                let mut out = Map::new();
                for (key, child) in map {
                    let next = match_name(&mut self.store, epsilon, key);
                    let found = self.include(child, next, depth + 1)?;
                    let deeper = self.search(child, epsilon, depth + 1)?;
                    if let Some(kept) = merge_results(found, deeper) {
                        out.insert(key.clone(), kept);
                    }
                }
                Ok((!out.is_empty()).then_some(Value::Object(out)))
            }
            Value::Array(items) => {
                let len = items.len();
                let mut out = Vec::new();
                for (i, child) in items.iter().enumerate() {
                    let next = match_index(&mut self.store, epsilon, i, len);
                    let found = self.include(child, next, depth + 1)?;
                    let deeper = self.search(child, epsilon, depth + 1)?;
                    if let Some(kept) = merge_results(found, deeper) {
                        out.push(kept);
                    }
                }
                Ok((!out.is_empty()).then_some(Value::Array(out)))
            }
            _ => Ok(None),
        }
    }

    /// Exclude walk. `None` means the whole node was removed.
    fn exclude(
        &mut self,
        value: &Value,
        state: Option<StateId>,
        depth: usize,
    ) -> Result<Option<Value>, DepthError> {
        let Some(id) = state else { return Ok(Some(value.clone())) };
        self.check_depth(depth)?;
        let (accepting, epsilon) = self.flags(id);
        if accepting {
            return Ok(None);
        }

        match value {
            Value::Object(map) => {
                let mut out = Map::new();
                for (key, child) in map {
                    let direct = match_name(&mut self.store, id, key);
                    let from_epsilon = epsilon
                        .and_then(|eps| match_name(&mut self.store, eps, key));
                    let next = union(&mut self.store, direct, from_epsilon);
                    if let Some(kept) =
                        self.exclude_entry(child, next, epsilon, depth + 1)?
                    {
                        out.insert(key.clone(), kept);
                    }
                }
                Ok(Some(Value::Object(out)))
            }
            Value::Array(items) => {
                let len = items.len();
                let mut out = Vec::with_capacity(len);
                for (i, child) in items.iter().enumerate() {
                    let direct = match_index(&mut self.store, id, i, len);
                    let from_epsilon = epsilon.and_then(|eps| {
                        match_index(&mut self.store, eps, i, len)
                    });
                    let next = union(&mut self.store, direct, from_epsilon);
                    if let Some(kept) =
                        self.exclude_entry(child, next, epsilon, depth + 1)?
                    {
                        out.push(kept);
                    }
                }
                Ok(Some(Value::Array(out)))
            }
            scalar => Ok(Some(scalar.clone())),
        }
    }

    fn exclude_entry(
        &mut self,
        child: &Value,
        next: Option<StateId>,
        epsilon: Option<StateId>,
        depth: usize,
    ) -> Result<Option<Value>, DepthError> {
        let Some(kept) = self.exclude(child, next, depth)? else {
            return Ok(None);
        };
        match epsilon {
            Some(eps) => self.filter(kept, eps, depth).map(Some),
            None => Ok(Some(kept)),
        }
    }

    /// Removes every nested match of the epsilon state below `value`. A full
    /// match drops the entry; a partial match is excluded through the normal
    /// walk and then filtered further.
    fn filter(
        &mut self,
        value: Value,
        epsilon: StateId,
        depth: usize,
    ) -> Result<Value, DepthError> {
        self.check_depth(depth)?;

        match value {
            Value::Object(map) => {
                let mut out = Map::new();
                for (key, child) in map {
                    let next = match_name(&mut self.store, epsilon, &key);
                    if let Some(kept) =
                        self.filter_entry(child, next, epsilon, depth + 1)?
                    {
                        out.insert(key, kept);
                    }
                }
                Ok(Value::Object(out))
            }
            Value::Array(items) => {
                let len = items.len();
                let mut out = Vec::with_capacity(len);
                for (i, child) in items.into_iter().enumerate() {
                    let next = match_index(&mut self.store, epsilon, i, len);
                    if let Some(kept) =
                        self.filter_entry(child, next, epsilon, depth + 1)?
                    {
                        out.push(kept);
                    }
                }
                Ok(Value::Array(out))
            }
            scalar => Ok(scalar),
        }
    }

    fn filter_entry(
        &mut self,
        child: Value,
        next: Option<StateId>,
        epsilon: StateId,
        depth: usize,
    ) -> Result<Option<Value>, DepthError> {
        let child = match next {
            None => child,
            Some(_) => match self.exclude(&child, next, depth)? {
                Some(kept) => kept,
                None => return Ok(None),
            },
        };
        self.filter(child, epsilon, depth).map(Some)
    }
}

/// The empty container matching the shape of `value`.
fn empty_like(value: &Value) -> Value {
    match value {
        Value::Object(_) => Value::Object(Map::new()),
        Value::Array(_) => Value::Array(Vec::new()),
        _ => Value::Null,
    }
}

fn merge_results(direct: Option<Value>, other: Option<Value>) -> Option<Value> {
    match (direct, other) {
        (Some(direct), Some(other)) => Some(merge_values(direct, other)),
        (direct, other) => direct.or(other),
    }
}

/// Two objects are unioned key by key, recursively. For any other pair the
/// direct value is kept.
fn merge_values(direct: Value, other: Value) -> Value {
    match (direct, other) {
        (Value::Object(mut base), Value::Object(extra)) => {
            for (key, value) in extra {
                match base.get_mut(&key) {
                    Some(slot) => *slot = merge_values(slot.take(), value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
            Value::Object(base)
        }
        (direct, _) => direct,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{Path, parse_path};
    use serde_json::json;

    fn run(
        mode: Mode,
        paths: &[&str],
        value: &Value,
        max_depth: Option<usize>,
    ) -> Result<Value, DepthError> {
        let parsed: Vec<Path> =
            paths.iter().map(|p| parse_path(p, None).unwrap()).collect();
        let automaton = Automaton::build(&parsed);
        prune(&automaton, value, mode, max_depth)
    }

    fn include(paths: &[&str], value: &Value) -> Value {
        run(Mode::Include, paths, value, None).unwrap()
    }

    fn exclude(paths: &[&str], value: &Value) -> Value {
        run(Mode::Exclude, paths, value, None).unwrap()
    }

    #[test]
    fn include_selected_fields() {
        let doc = json!({"name": "John", "age": 30, "email": "j@x.com"});
        assert_eq!(
            include(&["$.name", "$.email"], &doc),
            json!({"name": "John", "email": "j@x.com"})
        );
    }

    #[test]
    fn include_keeps_input_key_order() {
        let doc = json!({"z": 1, "a": 2, "m": 3});
        let out = include(&["$.m", "$.z"], &doc);
        let keys: Vec<_> = out.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["z", "m"]);
    }

    #[test]
    fn include_nested_with_wildcard() {
        let doc = json!({
            "users": [
                {"name": "a", "password": "x"},
                {"name": "b", "password": "y"}
            ]
        });
        assert_eq!(
            include(&["$.users[*].name"], &doc),
            json!({"users": [{"name": "a"}, {"name": "b"}]})
        );
    }

    #[test]
    fn include_compacts_arrays() {
        let doc = json!([10, 20, 30, 40, 50]);
        assert_eq!(include(&["$[0,2,4]"], &doc), json!([10, 30, 50]));
        assert_eq!(include(&["$[-1]"], &doc), json!([50]));
        assert_eq!(include(&["$[::-2]"], &doc), json!([10, 30, 50]));
    }

    #[test]
    fn include_slice() {
        let doc = json!([0, 1, 2, 3, 4, 5]);
        assert_eq!(include(&["$[0:3]"], &doc), json!([0, 1, 2]));
    }

    #[test]
    fn include_no_match_gives_empty_container() {
        assert_eq!(include(&["$.missing"], &json!({"a": 1})), json!({}));
        assert_eq!(include(&["$[9]"], &json!([1, 2])), json!([]));
        assert_eq!(include(&["$.a"], &json!(42)), Value::Null);
    }

    #[test]
    fn include_scalar_where_container_expected_is_dropped() {
        let doc = json!({"a": 1, "b": {"c": 2}});
        assert_eq!(include(&["$.a.x", "$.b.c"], &doc), json!({"b": {"c": 2}}));
    }

    #[test]
    fn include_empty_matches_do_not_create_parents() {
        let doc = json!({"a": {"b": {}}, "c": 1});
        assert_eq!(include(&["$.a.b.x"], &doc), json!({}));
    }

    #[test]
    fn include_recursive_descent_matches_every_depth() {
        let doc = json!({"a": {"name": "A", "b": {"name": "B"}}});
        assert_eq!(include(&["$..name"], &doc), doc);
    }

    #[test]
    fn include_recursive_descent_through_arrays() {
        let doc = json!({
            "items": [{"id": 1, "x": 0}, {"nested": [{"id": 2}]}],
            "id": 3
        });
        assert_eq!(
            include(&["$..id"], &doc),
            json!({"items": [{"id": 1}, {"nested": [{"id": 2}]}], "id": 3})
        );
    }

    #[test]
    fn include_recursive_descent_below_a_prefix() {
        let doc = json!({"keep": {"a": {"id": 1}}, "skip": {"id": 2}});
        assert_eq!(
            include(&["$.keep..id"], &doc),
            json!({"keep": {"a": {"id": 1}}})
        );
    }

    #[test]
    fn include_recursive_descent_continues_below_matches() {
        let doc = json!({"node": {"v": 1, "node": {"v": 2}}});
        assert_eq!(include(&["$..node.v"], &doc), doc);
    }

    #[test]
    fn include_recursive_wildcard() {
        let doc = json!({"a": [1, {"b": 2}]});
        assert_eq!(include(&["$..*"], &doc), doc);
    }

    #[test]
    fn include_direct_and_descendant_results_are_unioned() {
        let doc = json!({"a": {"x": 1, "y": 2, "z": 3}});
        assert_eq!(
            include(&["$.a.x", "$..y"], &doc),
            json!({"a": {"x": 1, "y": 2}})
        );
    }

    #[test]
    fn include_overlapping_paths_keep_whole_subtree() {
        let doc = json!({"a": {"b": 1, "c": 2}});
        assert_eq!(include(&["$.a", "$.a.b"], &doc), doc);
    }

    #[test]
    fn include_multi_selector_with_names_and_wildcard() {
        let doc = json!({"a": {"x": 1, "y": 2}, "b": {"x": 3, "y": 4}});
        assert_eq!(
            include(&["$.a.y", "$.*.x"], &doc),
            json!({"a": {"x": 1, "y": 2}, "b": {"x": 3}})
        );
    }

    #[test]
    fn exclude_missing_field_is_identity() {
        let doc = json!({"name": "John", "age": 30, "email": "j@x.com"});
        assert_eq!(exclude(&["$.password"], &doc), doc);
    }

    #[test]
    fn exclude_removes_nested_fields() {
        let doc = json!({"user": {"name": "a", "password": "x"}, "n": 1});
        assert_eq!(
            exclude(&["$.user.password"], &doc),
            json!({"user": {"name": "a"}, "n": 1})
        );
    }

    #[test]
    fn exclude_never_collapses_containers() {
        let doc = json!({"a": {"b": 1}, "c": [1]});
        assert_eq!(exclude(&["$.a.b", "$.c[0]"], &doc), json!({"a": {}, "c": []}));
    }

    #[test]
    fn exclude_array_elements() {
        let doc = json!([0, 1, 2, 3, 4]);
        assert_eq!(exclude(&["$[1:3]", "$[-1]"], &doc), json!([0, 3]));
    }

    #[test]
    fn exclude_recursive_descent_everywhere() {
        let doc = json!({
            "password": 1,
            "a": {"password": 2, "b": [{"password": 3, "ok": true}]}
        });
        assert_eq!(
            exclude(&["$..password"], &doc),
            json!({"a": {"b": [{"ok": true}]}})
        );
    }

    #[test]
    fn exclude_recursive_descent_partial_match() {
        let doc = json!({
            "a": {"secret": {"key": 1, "public": 2}},
            "secret": {"key": 3}
        });
        assert_eq!(
            exclude(&["$..secret.key"], &doc),
            json!({"a": {"secret": {"public": 2}}, "secret": {}})
        );
    }

    #[test]
    fn exclude_keeps_scalars_where_container_expected() {
        let doc = json!({"a": 1});
        assert_eq!(exclude(&["$.a.b"], &doc), doc);
    }

    #[test]
    fn numbers_are_preserved_verbatim() {
        let raw = r#"{"big":12345678901234567890123456789,"f":1.10,"drop":0}"#;
        let doc: Value = serde_json::from_str(raw).unwrap();
        let out = exclude(&["$.drop"], &doc);
        assert_eq!(
            serde_json::to_string(&out).unwrap(),
            r#"{"big":12345678901234567890123456789,"f":1.10}"#
        );
    }

    #[test]
    fn slice_with_minimum_step_selects_last() {
        let doc = json!([1, 2, 3]);
        let out =
            run(Mode::Include, &["$[::-9223372036854775808]"], &doc, None);
        assert_eq!(out.unwrap(), json!([3]));
    }

    #[test]
    fn depth_limit_boundary() {
        let at_limit = json!({"a": {"b": {"leaf": 1}}});
        assert_eq!(
            run(Mode::Include, &["$..leaf"], &at_limit, Some(3)).unwrap(),
            at_limit
        );

        let too_deep = json!({"a": {"b": {"c": {"leaf": 1}}}});
        let err = run(Mode::Include, &["$..leaf"], &too_deep, Some(3)).unwrap_err();
        assert_eq!(err, DepthError { depth: 4, max_depth: 3 });

        let err = run(Mode::Exclude, &["$..leaf"], &too_deep, Some(3)).unwrap_err();
        assert_eq!(err.max_depth, 3);
    }

    #[test]
    fn depth_limit_ignores_untouched_subtrees() {
        let doc = json!({"a": {"b": {"c": {"d": 1}}}, "x": 1});
        assert_eq!(
            run(Mode::Include, &["$.a"], &doc, Some(1)).unwrap(),
            json!({"a": {"b": {"c": {"d": 1}}}})
        );
        assert_eq!(
            run(Mode::Exclude, &["$.x"], &doc, Some(1)).unwrap(),
            json!({"a": {"b": {"c": {"d": 1}}}})
        );
    }

    #[test]
    fn merge_values_direct_wins_for_non_objects() {
        assert_eq!(merge_values(json!([1]), json!([2])), json!([1]));
        assert_eq!(merge_values(json!(1), json!({"a": 1})), json!(1));
        assert_eq!(
            merge_values(json!({"a": {"b": 1}}), json!({"a": {"c": 2}, "d": 3})),
            json!({"a": {"b": 1, "c": 2}, "d": 3})
        );
    }
}
