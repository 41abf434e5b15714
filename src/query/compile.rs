/*!
# Query Compilation

Turns raw path strings into a reusable [`CompiledQuery`].

Compilation enforces the configured [`Limits`] before doing any real work:
the path count is checked before a single path is parsed, and each path's
length is checked before it is scanned. Parse failures of all paths are
collected into one [`CompileError::Parse`]; a query with any invalid path is
never partially usable.

A [`Query`] is the uncompiled form. It compiles lazily on the first
[`Query::walk`] and caches the result, so repeated walks reuse one automaton.
The cache is a [`OnceLock`], which makes sharing an uncompiled query across
threads safe as well.

```
use jsonshake::query::Query;
use serde_json::json;

let query = Query::include(["$.name", "$.email"]);
let doc = json!({"name": "John", "age": 30, "email": "j@x.com"});
assert_eq!(
    query.walk(&doc).unwrap(),
    json!({"name": "John", "email": "j@x.com"})
);
```
*/
use std::sync::{Arc, OnceLock};

use log::debug;
use serde_json::Value;
use thiserror::Error;

use super::{
    common::{Limits, Mode},
    nfa::Automaton,
    parser::{ParseError, parse_path},
    walker::{DepthError, prune},
};
use crate::shake::ShakeError;

/// Errors raised while compiling a query.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// The query holds more paths than allowed.
    #[error("query has {count} paths, exceeding the maximum path count of {max}")]
    PathCount {
        /// Number of paths in the query
        count: usize,
        /// The configured maximum
        max: usize,
    },
    /// One or more paths failed to parse; holds every failure.
    #[error("{}", join_lines(.0))]
    Parse(Vec<ParseError>),
}

fn join_lines(errors: &[ParseError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

/// An immutable, compiled query. Cheap to clone and safe to share between
/// threads; every walk allocates its own scratch states.
#[derive(Debug, Clone)]
pub struct CompiledQuery {
    mode: Mode,
    limits: Limits,
    automaton: Arc<Automaton>,
}

impl CompiledQuery {
    /// Whether matches are kept or removed.
    #[must_use]
    pub const fn mode(&self) -> Mode {
        self.mode
    }

    /// The limits this query was compiled with. The depth bound applies to
    /// every walk.
    #[must_use]
    pub const fn limits(&self) -> Limits {
        self.limits
    }

    /// The compiled path automaton.
    #[must_use]
    pub fn automaton(&self) -> &Automaton {
        &self.automaton
    }

    /// Prunes `value` according to this query.
    ///
    /// # Errors
    ///
    /// Returns a [`DepthError`] if the walk visits a node nested deeper than
    /// the configured maximum depth.
    pub fn walk(&self, value: &Value) -> Result<Value, DepthError> {
        prune(&self.automaton, value, self.mode, self.limits.max_depth)
    }
}

/// Compiles `paths` into a query running in `mode`.
///
/// # Errors
///
/// Returns [`CompileError::PathCount`] if there are too many paths, or
/// [`CompileError::Parse`] with every parse failure otherwise.
pub fn compile<S: AsRef<str>>(
    mode: Mode,
    paths: &[S],
    limits: Limits,
) -> Result<CompiledQuery, CompileError> {
    compile_scoped(mode, paths, None, limits)
}

/// Prunes `value` with an already compiled query.
///
/// # Errors
///
/// Returns a [`DepthError`] if the document nests too deeply.
pub fn walk(query: &CompiledQuery, value: &Value) -> Result<Value, DepthError> {
    query.walk(value)
}

/// Compiles `paths`, scoping every relative path under `prefix`.
fn compile_scoped<S: AsRef<str>>(
    mode: Mode,
    paths: &[S],
    prefix: Option<&str>,
    limits: Limits,
) -> Result<CompiledQuery, CompileError> {
    if let Some(max) = limits.max_path_count
        && paths.len() > max
    {
        return Err(CompileError::PathCount { count: paths.len(), max });
    }

    let mut errors = Vec::new();
    let prefix = match prefix.filter(|p| !p.is_empty()) {
        Some(raw) => match parse_path(raw, limits.max_path_length) {
            Ok(prefix) => Some(prefix),
            Err(err) => {
                errors.push(err);
                None
            }
        },
        None => None,
    };

    let mut parsed = Vec::with_capacity(paths.len());
    for raw in paths {
        match parse_path(raw.as_ref(), limits.max_path_length) {
            Ok(path) => match &prefix {
                Some(prefix) if !path.is_absolute() => {
                    parsed.push(path.prepend(prefix));
                }
                _ => parsed.push(path),
            },
            Err(err) => errors.push(err),
        }
    }

    if !errors.is_empty() {
        debug!("{} of {} paths failed to parse", errors.len(), paths.len());
        return Err(CompileError::Parse(errors));
    }

    let automaton = Automaton::build(&parsed);
    Ok(CompiledQuery { mode, limits, automaton: Arc::new(automaton) })
}

/// An uncompiled query: a mode, raw paths, an optional prefix and limits.
///
/// # Examples
///
/// Relative paths are scoped under the prefix; absolute ones are not:
///
/// ```
/// use jsonshake::query::Query;
/// use serde_json::json;
///
/// let query = Query::include([".name", "$.id"]).with_prefix("$.user");
/// let doc = json!({"id": 7, "user": {"name": "a", "age": 3}});
/// assert_eq!(
///     query.walk(&doc).unwrap(),
///     json!({"id": 7, "user": {"name": "a"}})
/// );
/// ```
#[derive(Debug, Clone)]
pub struct Query {
    mode: Mode,
    paths: Vec<String>,
    prefix: Option<String>,
    limits: Limits,
    /// Compiled on first use
    compiled: OnceLock<Result<CompiledQuery, CompileError>>,
}

impl Query {
    /// Creates a query running in `mode` with default limits.
    pub fn new<I, S>(mode: Mode, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            mode,
            paths: paths.into_iter().map(Into::into).collect(),
            prefix: None,
            limits: Limits::default(),
            compiled: OnceLock::new(),
        }
    }

    /// Creates a query keeping only the subtrees matched by `paths`.
    pub fn include<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(Mode::Include, paths)
    }

    /// Creates a query removing the subtrees matched by `paths`.
    pub fn exclude<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(Mode::Exclude, paths)
    }

    /// Scopes every relative path (one not starting with `$`) under `prefix`.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self.compiled = OnceLock::new();
        self
    }

    /// Replaces the default limits.
    #[must_use]
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self.compiled = OnceLock::new();
        self
    }

    #[must_use]
    pub const fn mode(&self) -> Mode {
        self.mode
    }

    #[must_use]
    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    #[must_use]
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    #[must_use]
    pub const fn limits(&self) -> Limits {
        self.limits
    }

    /// Compiles the query, or returns the cached result of an earlier
    /// compilation.
    ///
    /// # Errors
    ///
    /// See [`compile`].
    pub fn compile(&self) -> Result<CompiledQuery, CompileError> {
        self.compiled().cloned().map_err(Clone::clone)
    }

    /// Compiles the query if needed, then prunes `value`.
    ///
    /// # Errors
    ///
    /// Returns [`ShakeError::Compile`] if the query does not compile and
    /// [`ShakeError::Depth`] if the document nests too deeply.
    pub fn walk(&self, value: &Value) -> Result<Value, ShakeError> {
        let compiled =
            self.compiled().map_err(|err| ShakeError::Compile(err.clone()))?;
        Ok(compiled.walk(value)?)
    }

    fn compiled(&self) -> Result<&CompiledQuery, &CompileError> {
        self.compiled
            .get_or_init(|| {
                debug!(
                    "compiling {} query with {} paths",
                    self.mode,
                    self.paths.len()
                );
                compile_scoped(
                    self.mode,
                    &self.paths,
                    self.prefix.as_deref(),
                    self.limits,
                )
            })
            .as_ref()
    }
}
