/*!
# Path Automaton

Compiles many parsed paths into one shared prefix trie that behaves as a
non-deterministic finite automaton (NFA):

- Each [`State`] is a state of the automaton and each JSON key or array index
  consumed during a walk is an input symbol.
- Child links (names, indexes, wildcard, slices) are the transitions.
- An accepting state marks the end of a full path; the whole JSON subtree
  reached there is matched.
- The epsilon child is an epsilon transition: it does not consume a symbol
  and models the `..` (recursive descent) operator, which the walker applies
  at every depth.

The automaton is non-deterministic because one key can take several
transitions at once: `"name"` may match both `names["name"]` and the
wildcard, and under `..` the same key is also tested against the epsilon
child. When that happens, [`merge`] performs an on-the-fly subset
construction and produces one composite state that tracks every active
branch.

States live in an arena and are addressed by [`StateId`], so shared prefixes
and multi-selector branches form a DAG without reference counting. Composite
states created while walking are appended to a walk-scoped [`Scratch`]
overlay and dropped with it.

After insertion, a finalize pass precomputes `merge(names[k], wildcard)` for
every state that has both, so the common single-key lookup is one map lookup
at walk time. This is memoization, not a full NFA to DFA conversion: epsilon
transitions and index matching (which needs the array length) are still
merged on the fly.

For reference:

- [Wikipedia: Powerset construction](https://en.wikipedia.org/wiki/Powerset_construction)
*/
use log::{debug, trace};
use std::{
    collections::{HashMap, hash_map::Entry},
    fmt::Display,
};

use crate::query::{Path, Segment, Selector, Slice};

/// Stable index of a state within an automaton arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateId(usize);

impl StateId {
    /// Position of the state in its arena.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl Display for StateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A state of the path automaton.
#[derive(Debug, Clone, Default)]
pub struct State {
    /// Transitions on exact object keys
    names: HashMap<String, StateId>,
    /// Transitions on exact array indices, possibly negative
    indexes: HashMap<i64, StateId>,
    /// Transition on any key or index
    wildcard: Option<StateId>,
    /// Transitions on array slices, deduplicated structurally
    slices: Vec<(Slice, StateId)>,
    /// Root of the recursive-descent sub-automaton
    epsilon: Option<StateId>,
    /// A full path terminates here
    accepting: bool,
    /// `names_merged[k] = merge(names[k], wildcard)`, filled in by finalize
    names_merged: Option<HashMap<String, StateId>>,
    /// Guards against finalizing a shared state twice
    finalized: bool,
}

impl State {
    /// Whether a complete path ends at this state.
    #[must_use]
    pub const fn is_accepting(&self) -> bool {
        self.accepting
    }

    /// The epsilon (recursive-descent) child, if any.
    #[must_use]
    pub const fn epsilon(&self) -> Option<StateId> {
        self.epsilon
    }

    /// The wildcard child, if any.
    #[must_use]
    pub const fn wildcard(&self) -> Option<StateId> {
        self.wildcard
    }

    /// The child reached by exactly the object key `name`, if any.
    #[must_use]
    pub fn name(&self, name: &str) -> Option<StateId> {
        self.names.get(name).copied()
    }

    /// The child reached by exactly the index `idx`, if any.
    #[must_use]
    pub fn index(&self, idx: i64) -> Option<StateId> {
        self.indexes.get(&idx).copied()
    }

    /// Slice transitions of this state.
    #[must_use]
    pub fn slices(&self) -> &[(Slice, StateId)] {
        &self.slices
    }

    /// Whether finalize precomputed the name/wildcard merges of this state.
    #[must_use]
    pub const fn is_memoized(&self) -> bool {
        self.names_merged.is_some()
    }

    /// All direct successors, including the epsilon child.
    fn children(&self) -> impl Iterator<Item = StateId> + '_ {
        self.names
            .values()
            .chain(self.indexes.values())
            .copied()
            .chain(self.wildcard)
            .chain(self.slices.iter().map(|(_, id)| *id))
            .chain(self.epsilon)
    }
}

/// Storage for automaton states. Matching and merging are written against
/// this trait so that they work both on the compiled arena (during
/// finalize) and on a walk-scoped [`Scratch`] overlay.
pub(crate) trait StateStore {
    /// Looks up a state. Ids always come from the same store.
    fn state(&self, id: StateId) -> &State;

    /// Appends a new state and returns its id.
    fn push(&mut self, state: State) -> StateId;
}

/// A compiled, immutable path automaton.
#[derive(Debug, Clone)]
pub struct Automaton {
    /// Arena of states; the root is always at index `0`
    states: Vec<State>,
}

impl StateStore for Automaton {
    fn state(&self, id: StateId) -> &State {
        &self.states[id.0]
    }

    fn push(&mut self, state: State) -> StateId {
        self.states.push(state);
        StateId(self.states.len() - 1)
    }
}

impl Automaton {
    /// The start state.
    pub const ROOT: StateId = StateId(0);

    /// Compiles parsed paths into a single automaton.
    ///
    /// Shared prefixes are merged automatically: inserting `$.data.name` and
    /// `$.data.email` creates one `data` state with two children.
    #[must_use]
    pub fn build(paths: &[Path]) -> Self {
        let mut automaton = Self { states: vec![State::default()] };
        for path in paths {
            trace!("inserting path `{}`", path.raw);
            automaton.insert(&path.segments);
        }
        automaton.finalize();
        debug!(
            "compiled {} paths into {} automaton states",
            paths.len(),
            automaton.states.len()
        );
        automaton
    }

    /// The start state.
    #[must_use]
    pub const fn root(&self) -> StateId {
        Self::ROOT
    }

    /// Total number of states, including states precomputed by finalize.
    #[must_use]
    pub const fn num_states(&self) -> usize {
        self.states.len()
    }

    /// Looks up a state by id.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not produced by this automaton.
    #[must_use]
    pub fn get(&self, id: StateId) -> &State {
        &self.states[id.0]
    }

    pub(crate) fn states(&self) -> &[State] {
        &self.states
    }

    /// Inserts one path's segments starting at the root.
    ///
    /// A descendant segment is inserted, with its flag cleared, below the
    /// epsilon child of the current state, followed by the rest of the path.
    /// Every selector of a direct segment creates or reuses its own child and
    /// continues with the remaining segments from there.
    fn insert(&mut self, segments: &[Segment]) {
        // (state, segment position, treat that segment as non-descendant)
        let mut work = vec![(Self::ROOT, 0, false)];

        while let Some((id, at, as_child)) = work.pop() {
            let Some(segment) = segments.get(at) else {
                self.states[id.0].accepting = true;
                continue;
            };

            if segment.descendant && !as_child {
                let epsilon = self.epsilon_of(id);
                work.push((epsilon, at, true));
                continue;
            }

            for selector in &segment.selectors {
                let child = self.child_for(id, selector);
                work.push((child, at + 1, false));
            }
        }
    }

    /// Returns the epsilon child of `id`, creating it if absent.
    fn epsilon_of(&mut self, id: StateId) -> StateId {
        if let Some(epsilon) = self.states[id.0].epsilon {
            return epsilon;
        }
        let epsilon = self.push(State::default());
        self.states[id.0].epsilon = Some(epsilon);
        epsilon
    }

    /// Returns the child of `id` reached by `selector`, creating it if
    /// absent.
    fn child_for(&mut self, id: StateId, selector: &Selector) -> StateId {
        let existing = {
            let state = &self.states[id.0];
            match selector {
                Selector::Name(name) => state.name(name),
                Selector::Index(idx) => state.index(*idx),
                Selector::Wildcard => state.wildcard,
                Selector::Slice(slice) => state
                    .slices
                    .iter()
                    .find(|(s, _)| s == slice)
                    .map(|(_, child)| *child),
            }
        };
        if let Some(child) = existing {
            return child;
        }

        let child = self.push(State::default());
        let state = &mut self.states[id.0];
        match selector {
            Selector::Name(name) => {
                state.names.insert(name.clone(), child);
            }
            Selector::Index(idx) => {
                state.indexes.insert(*idx, child);
            }
            Selector::Wildcard => state.wildcard = Some(child),
            Selector::Slice(slice) => state.slices.push((*slice, child)),
        }
        child
    }

    /// Post-order pass precomputing `merge(names[k], wildcard)` for every
    /// state that has both named children and a wildcard child.
    fn finalize(&mut self) {
        // (state, children already finalized)
        let mut stack = vec![(Self::ROOT, false)];

        while let Some((id, children_done)) = stack.pop() {
            if children_done {
                self.memoize(id);
                continue;
            }
            if self.states[id.0].finalized {
                continue;
            }
            self.states[id.0].finalized = true;
            stack.push((id, true));
            let pending: Vec<StateId> = self.states[id.0]
                .children()
                .filter(|child| !self.states[child.0].finalized)
                .collect();
            stack.extend(pending.into_iter().map(|child| (child, false)));
        }
    }

    fn memoize(&mut self, id: StateId) {
        let state = &self.states[id.0];
        let Some(wildcard) = state.wildcard else { return };
        if state.names.is_empty() {
            return;
        }

        let named: Vec<(String, StateId)> =
            state.names.iter().map(|(k, v)| (k.clone(), *v)).collect();
        let mut merged = HashMap::with_capacity(named.len());
        for (key, child) in named {
            merged.insert(key, merge_pair(self, child, wildcard));
        }
        self.states[id.0].names_merged = Some(merged);
    }
}

impl Display for Automaton {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Automaton States: {}", self.states.len())?;
        writeln!(f, "Accepting States: {:?}", {
            self.states
                .iter()
                .enumerate()
                .filter_map(|(i, s)| if s.accepting { Some(i) } else { None })
                .collect::<Vec<_>>()
        })?;
        writeln!(f, "Transitions:")?;
        for (st, state) in self.states.iter().enumerate() {
            writeln!(f, "\tstate {st}:")?;
            let mut names: Vec<_> = state.names.iter().collect();
            names.sort();
            for (name, dest) in names {
                writeln!(f, "\t\ton [{name:?}] -> {dest}")?;
            }
            let mut indexes: Vec<_> = state.indexes.iter().collect();
            indexes.sort();
            for (idx, dest) in indexes {
                writeln!(f, "\t\ton [{idx}] -> {dest}")?;
            }
            if let Some(dest) = state.wildcard {
                writeln!(f, "\t\ton [*] -> {dest}")?;
            }
            for (slice, dest) in &state.slices {
                writeln!(f, "\t\ton {slice} -> {dest}")?;
            }
            if let Some(dest) = state.epsilon {
                writeln!(f, "\t\ton [epsilon] -> {dest}")?;
            }
        }
        Ok(())
    }
}

/// Walk-scoped store layering ephemeral composite states over a compiled
/// automaton. Dropping it frees every composite state created during the
/// walk; the compiled automaton is never modified.
pub(crate) struct Scratch<'a> {
    base: &'a [State],
    extra: Vec<State>,
}

impl<'a> Scratch<'a> {
    pub(crate) fn new(automaton: &'a Automaton) -> Self {
        Self { base: automaton.states(), extra: Vec::new() }
    }

    /// Number of composite states created so far.
    pub(crate) fn created(&self) -> usize {
        self.extra.len()
    }
}

impl StateStore for Scratch<'_> {
    fn state(&self, id: StateId) -> &State {
        match id.0.checked_sub(self.base.len()) {
            None => &self.base[id.0],
            Some(offset) => &self.extra[offset],
        }
    }

    fn push(&mut self, state: State) -> StateId {
        self.extra.push(state);
        StateId(self.base.len() + self.extra.len() - 1)
    }
}

/// Finds the next state for the object key `key`, or `None` if no
/// transition matches.
pub(crate) fn match_name<S: StateStore>(
    store: &mut S,
    id: StateId,
    key: &str,
) -> Option<StateId> {
    let state = store.state(id);
    if let Some(merged) = &state.names_merged {
        return merged.get(key).copied().or(state.wildcard);
    }

    match (state.name(key), state.wildcard) {
        (Some(named), Some(wildcard)) => {
            Some(merge_pair(store, named, wildcard))
        }
        (named, wildcard) => named.or(wildcard),
    }
}

/// Finds the next state for array index `index` of an array of length
/// `len`, or `None` if no transition matches.
///
/// Unlike [`match_name`] this cannot be fully precomputed, since negative
/// indices and slices depend on the array length.
pub(crate) fn match_index<S: StateStore>(
    store: &mut S,
    id: StateId,
    index: usize,
    len: usize,
) -> Option<StateId> {
    let (Ok(idx), Ok(signed_len)) = (i64::try_from(index), i64::try_from(len))
    else {
        return None;
    };
    // the same position written relative to the end, e.g. `-1` for the last
    let from_end = idx - signed_len;

    let state = store.state(id);
    let direct = state.index(idx);
    let negative = state.index(from_end);

    if state.wildcard.is_none() && state.slices.is_empty() {
        return match (direct, negative) {
            (Some(a), Some(b)) => Some(merge_pair(store, a, b)),
            (a, b) => a.or(b),
        };
    }

    let candidates: Vec<StateId> = direct
        .into_iter()
        .chain(negative)
        .chain(state.wildcard)
        .chain(
            state
                .slices
                .iter()
                .filter(|(slice, _)| slice.contains(index, len))
                .map(|(_, child)| *child),
        )
        .collect();
    merge(store, &candidates)
}

/// Merges two states, returning the single one unchanged when they are the
/// same state.
pub(crate) fn merge_pair<S: StateStore>(
    store: &mut S,
    a: StateId,
    b: StateId,
) -> StateId {
    if a == b { a } else { merge_many(store, &[a, b]) }
}

/// Combines candidate next-states into one composite state representing
/// "in all of these at once". Zero candidates yield `None` and a single
/// candidate is returned as is.
pub(crate) fn merge<S: StateStore>(
    store: &mut S,
    ids: &[StateId],
) -> Option<StateId> {
    match ids {
        [] => None,
        [single] => Some(*single),
        [a, b] => Some(merge_pair(store, *a, *b)),
        _ => Some(merge_many(store, ids)),
    }
}

/// Subset construction over two or more states: accepting is OR-ed, name
/// and index maps are unioned with colliding keys merged recursively,
/// wildcard and epsilon children are merged, and slice lists concatenated.
fn merge_many<S: StateStore>(store: &mut S, ids: &[StateId]) -> StateId {
    let mut merged = State::default();

    for &id in ids {
        let (names, indexes, wildcard, slices, epsilon) = {
            let state = store.state(id);
            merged.accepting |= state.accepting;
            (
                state.names.clone(),
                state.indexes.clone(),
                state.wildcard,
                state.slices.clone(),
                state.epsilon,
            )
        };

        for (key, child) in names {
            match merged.names.entry(key) {
                Entry::Occupied(mut entry) => {
                    let combined = merge_pair(store, *entry.get(), child);
                    entry.insert(combined);
                }
                Entry::Vacant(entry) => {
                    entry.insert(child);
                }
            }
        }
        for (idx, child) in indexes {
            match merged.indexes.entry(idx) {
                Entry::Occupied(mut entry) => {
                    let combined = merge_pair(store, *entry.get(), child);
                    entry.insert(combined);
                }
                Entry::Vacant(entry) => {
                    entry.insert(child);
                }
            }
        }
        merged.wildcard = union(store, merged.wildcard, wildcard);
        merged.epsilon = union(store, merged.epsilon, epsilon);
        merged.slices.extend(slices);
    }

    store.push(merged)
}

/// Merges two optional states; a single present state is returned as is.
pub(crate) fn union<S: StateStore>(
    store: &mut S,
    a: Option<StateId>,
    b: Option<StateId>,
) -> Option<StateId> {
    match (a, b) {
        (Some(a), Some(b)) => Some(merge_pair(store, a, b)),
        (a, b) => a.or(b),
    }
}
