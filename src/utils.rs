//! Miscellaneous utility functions.

use anyhow::Context as _;
use colored::Colorize;
use serde_json::Value;
use std::io::Write;
use std::io::{self, ErrorKind};

/// Returns the nesting depth of the JSON value, counted in edges from the
/// root: a scalar or an empty container is at depth 0. This is the measure
/// bounded by [`crate::query::Limits::max_depth`].
#[must_use]
pub fn depth(json: &Value) -> usize {
    match json {
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => 0,
        Value::Array(arr) => {
            arr.iter().map(|item| 1 + depth(item)).max().unwrap_or(0)
        }
        Value::Object(map) => {
            map.values().map(|item| 1 + depth(item)).max().unwrap_or(0)
        }
    }
}

/// Returns `true` if writing failed only because the reader went away, e.g.
/// when piping into `head`.
#[must_use]
pub fn is_broken_pipe(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<io::Error>()
            .is_some_and(|io| io.kind() == ErrorKind::BrokenPipe)
    })
}

// ==============================================================================
// Colorized JSON Output
// ==============================================================================

/// Write a JSON document with syntax highlighting, followed by a newline.
/// Silently returns `Ok(())` on broken pipe so that piping to tools like
/// `less` or `head` exits cleanly.
///
/// # Errors
///
/// Returns an error if writing to `writer` fails.
pub fn write_colored_result<W: Write>(
    writer: &mut W,
    value: &Value,
    pretty: bool,
) -> anyhow::Result<()> {
    let result = (|| -> io::Result<()> {
        write_colored_json(writer, value, 0, pretty)?;
        writeln!(writer)?;
        writer.flush()
    })();

    match result {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::BrokenPipe => Ok(()),
        Err(err) => Err(err).context("write colorized JSON"),
    }
}

/// Recursively write a JSON value with syntax highlighting.
fn write_colored_json<W: Write>(
    writer: &mut W,
    value: &Value,
    indent: usize,
    pretty: bool,
) -> io::Result<()> {
    match value {
        Value::Null => write!(writer, "{}", "null".red().dimmed()),
        Value::Bool(b) => write!(writer, "{}", b.to_string().yellow().bold()),
        // Display keeps the literal as it appeared in the input
        Value::Number(n) => write!(writer, "{}", n.to_string().yellow()),
        Value::String(s) => write!(writer, "{}", quote(s)?.green()),
        Value::Array(arr) => {
            let layout = Layout { indent, pretty };
            layout.write_entries(writer, ('[', ']'), arr.iter(), |w, item| {
                write_colored_json(w, item, indent + 2, pretty)
            })
        }
        Value::Object(obj) => {
            let layout = Layout { indent, pretty };
            let separator = if pretty { ": " } else { ":" };
            layout.write_entries(writer, ('{', '}'), obj.iter(), |w, (key, val)| {
                write!(w, "{}{separator}", quote(key)?.cyan())?;
                write_colored_json(w, val, indent + 2, pretty)
            })
        }
    }
}

/// Placement of a container's entries: one per line in pretty mode,
/// otherwise all on one line.
struct Layout {
    indent: usize,
    pretty: bool,
}

impl Layout {
    fn write_entries<W, I, F>(
        &self,
        writer: &mut W,
        (open, close): (char, char),
        entries: I,
        mut write_entry: F,
    ) -> io::Result<()>
    where
        W: Write,
        I: Iterator,
        F: FnMut(&mut W, I::Item) -> io::Result<()>,
    {
        write!(writer, "{open}")?;
        let mut empty = true;
        for entry in entries {
            if !empty {
                write!(writer, ",")?;
            }
            empty = false;
            self.newline(writer, self.indent + 2)?;
            write_entry(writer, entry)?;
        }
        if !empty {
            self.newline(writer, self.indent)?;
        }
        write!(writer, "{close}")
    }

    fn newline<W: Write>(&self, writer: &mut W, width: usize) -> io::Result<()> {
        if self.pretty {
            write!(writer, "\n{:width$}", "")?;
        }
        Ok(())
    }
}

/// JSON-quotes and escapes a string.
fn quote(s: &str) -> io::Result<String> {
    serde_json::to_string(s).map_err(io::Error::other)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn render(value: &Value, pretty: bool) -> String {
        colored::control::set_override(false);
        let mut out = Vec::new();
        write_colored_result(&mut out, value, pretty).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn depth_counts_edges() {
        assert_eq!(depth(&json!(1)), 0);
        assert_eq!(depth(&json!({})), 0);
        assert_eq!(depth(&json!({"a": 1})), 1);
        assert_eq!(depth(&json!({"a": [1, {"b": null}], "c": 2})), 3);
    }

    #[test]
    fn uncolored_compact_output_is_plain_json() {
        let value = json!({"a": [1, "x\"y", null, true], "b": {}});
        assert_eq!(render(&value, false), format!("{value}\n"));
    }

    #[test]
    fn uncolored_pretty_output_matches_serde() {
        let value = json!({"a": [1, {"b": "c"}], "d": [], "e": {}});
        assert_eq!(
            render(&value, true),
            format!("{}\n", serde_json::to_string_pretty(&value).unwrap())
        );
    }
}
