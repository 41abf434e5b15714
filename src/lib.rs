/*!
# `jsonshake` Library

Prunes JSON documents down to, or away from, the parts selected by
JSONPath-style path expressions.

Paths are compiled once into a shared automaton ([`query::compile`]) and
then walked together with each document ([`query::walk`]). The [`shake`]
module wraps this for encoded JSON bytes.

```
use jsonshake::{Query, shake};

let query = Query::exclude(["$..password"]);
let out = shake(br#"{"user":{"name":"a","password":"x"}}"#, &query).unwrap();
assert_eq!(out, br#"{"user":{"name":"a"}}"#);
```
*/

pub mod commands;
pub mod query;
pub mod shake;
pub mod utils;

pub use query::{
    CompileError, CompiledQuery, DepthError, Limits, Mode, ParseError, Query,
};
pub use shake::{ShakeBuilder, ShakeError, ShakeRequest, shake, shake_value};
pub use utils::depth;
