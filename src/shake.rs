/*!
# Shaking JSON Bytes

Convenience layer over [`crate::query`] working on encoded JSON: decode the
input, walk it with a [`Query`], encode the pruned result.

Three ways in:

- [`shake`] / [`shake_value`] with a ready [`Query`]
- the fluent [`ShakeBuilder`], where include and exclude are separate builder
  types so that a pipeline cannot mix them
- a [`ShakeRequest`] deserialized from the `{"mode": .., "paths": [..]}` wire
  schema

```
use jsonshake::shake::ShakeBuilder;

let input = br#"{"data":{"name":"John","age":30},"meta":"kept"}"#;
let out = ShakeBuilder::new(input)
    .prefix("$.data")
    .include([".name"])
    .shake()
    .unwrap();
assert_eq!(out, br#"{"data":{"name":"John"}}"#);
```
*/
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::query::{CompileError, DepthError, Limits, Mode, Query};

/// Errors returned while shaking a document.
#[derive(Debug, Error)]
pub enum ShakeError {
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error(transparent)]
    Depth(#[from] DepthError),
    /// The input is not valid JSON.
    #[error("failed to decode input JSON: {0}")]
    Decode(#[source] serde_json::Error),
    /// The pruned document could not be written.
    #[error("failed to encode output JSON: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Decodes `input`, prunes it with `query` and returns the compact encoding
/// of the result. Numbers are written back exactly as they were read.
///
/// # Errors
///
/// Fails with [`ShakeError::Decode`] on malformed input, and with
/// [`ShakeError::Compile`] or [`ShakeError::Depth`] if the query fails to
/// compile or the document nests too deeply.
pub fn shake(input: &[u8], query: &Query) -> Result<Vec<u8>, ShakeError> {
    let value = decode(input).map_err(ShakeError::Decode)?;
    let result = shake_value(&value, query)?;
    serde_json::to_vec(&result).map_err(ShakeError::Encode)
}

/// Decodes a JSON document of any nesting depth.
///
/// serde_json's recursion limit is lifted and the stack grows on demand, so
/// [`Limits::max_depth`] is the only bound on nesting.
///
/// # Errors
///
/// Returns an error if `input` is not a single valid JSON document.
pub fn decode(input: &[u8]) -> Result<Value, serde_json::Error> {
    let mut de = serde_json::Deserializer::from_slice(input);
    de.disable_recursion_limit();
    let value = Value::deserialize(serde_stacker::Deserializer::new(&mut de))?;
    de.end()?;
    Ok(value)
}

/// Prunes an already decoded document.
///
/// # Errors
///
/// See [`Query::walk`].
pub fn shake_value(value: &Value, query: &Query) -> Result<Value, ShakeError> {
    query.walk(value)
}

/// Entry point of the fluent API.
#[derive(Debug, Clone)]
pub struct ShakeBuilder<'a> {
    input: &'a [u8],
    prefix: Option<String>,
    limits: Limits,
}

impl<'a> ShakeBuilder<'a> {
    #[must_use]
    pub fn new(input: &'a [u8]) -> Self {
        Self { input, prefix: None, limits: Limits::default() }
    }

    /// Scopes relative paths under `prefix`.
    #[must_use]
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Overrides the default limits.
    #[must_use]
    pub const fn limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Keeps only what `paths` match.
    pub fn include<I, S>(self, paths: I) -> IncludeBuilder<'a>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        IncludeBuilder {
            builder: self,
            paths: paths.into_iter().map(Into::into).collect(),
        }
    }

    /// Removes what `paths` match.
    pub fn exclude<I, S>(self, paths: I) -> ExcludeBuilder<'a>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ExcludeBuilder {
            builder: self,
            paths: paths.into_iter().map(Into::into).collect(),
        }
    }

    fn run(self, mode: Mode, paths: Vec<String>) -> Result<Vec<u8>, ShakeError> {
        let mut query = Query::new(mode, paths).with_limits(self.limits);
        if let Some(prefix) = self.prefix {
            query = query.with_prefix(prefix);
        }
        shake(self.input, &query)
    }
}

/// Include pipeline; more paths can be chained before shaking.
#[derive(Debug, Clone)]
pub struct IncludeBuilder<'a> {
    builder: ShakeBuilder<'a>,
    paths: Vec<String>,
}

impl IncludeBuilder<'_> {
    #[must_use]
    pub fn include<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.paths.extend(paths.into_iter().map(Into::into));
        self
    }

    /// Runs the pipeline.
    ///
    /// # Errors
    ///
    /// See [`shake`].
    pub fn shake(self) -> Result<Vec<u8>, ShakeError> {
        self.builder.run(Mode::Include, self.paths)
    }
}

/// Exclude pipeline; more paths can be chained before shaking.
#[derive(Debug, Clone)]
pub struct ExcludeBuilder<'a> {
    builder: ShakeBuilder<'a>,
    paths: Vec<String>,
}

impl ExcludeBuilder<'_> {
    #[must_use]
    pub fn exclude<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.paths.extend(paths.into_iter().map(Into::into));
        self
    }

    /// Runs the pipeline.
    ///
    /// # Errors
    ///
    /// See [`shake`].
    pub fn shake(self) -> Result<Vec<u8>, ShakeError> {
        self.builder.run(Mode::Exclude, self.paths)
    }
}

/// Rejection reasons for a [`ShakeRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("request must contain at least one path")]
    EmptyPaths,
}

/// Wire form of a shake request: `{"mode": "include", "paths": ["$.a"]}`.
///
/// Deserialization rejects an empty `paths` list and any `mode` other than
/// the literals `"include"` and `"exclude"`.
///
/// ```
/// use jsonshake::shake::ShakeRequest;
///
/// let req: ShakeRequest =
///     serde_json::from_str(r#"{"mode":"exclude","paths":["$..password"]}"#).unwrap();
/// let out = jsonshake::shake::shake(br#"{"a":{"password":1,"b":2}}"#, &req.into_query()).unwrap();
/// assert_eq!(out, br#"{"a":{"b":2}}"#);
///
/// assert!(serde_json::from_str::<ShakeRequest>(r#"{"mode":"include","paths":[]}"#).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawRequest")]
pub struct ShakeRequest {
    pub mode: Mode,
    pub paths: Vec<String>,
}

#[derive(Deserialize)]
struct RawRequest {
    mode: Mode,
    paths: Vec<String>,
}

impl TryFrom<RawRequest> for ShakeRequest {
    type Error = RequestError;

    fn try_from(raw: RawRequest) -> Result<Self, Self::Error> {
        if raw.paths.is_empty() {
            return Err(RequestError::EmptyPaths);
        }
        Ok(Self { mode: raw.mode, paths: raw.paths })
    }
}

impl ShakeRequest {
    /// Converts the request into an uncompiled [`Query`] with default
    /// limits.
    #[must_use]
    pub fn into_query(self) -> Query {
        Query::new(self.mode, self.paths)
    }
}
