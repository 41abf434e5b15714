/*!
# Path Parser

Parser for converting raw path strings into [`Path`] objects.

The parser is a single-pass recursive-descent scanner: bytes are read and
turned directly into AST nodes with no intermediate token stream.

## Examples

This module exposes the public API method [`parse_path`] that can be used to
convert raw path strings into [`Path`] objects:

```rust
use jsonshake::query::parser;
let path = parser::parse_path("$.store.book[0,-1].title", None).expect("Invalid path");
assert_eq!(path.segments.len(), 4);
```

## Errors

If the input is invalid, [`parse_path`] returns a [`ParseError`] carrying the
byte offset at which scanning failed:

```rust
use jsonshake::query::parser;

let err = parser::parse_path("$.items[", None).unwrap_err();
assert_eq!(err.offset, 8);
assert_eq!(err.message, "unexpected end in bracket");
```

## See Also

- [`Path`]: The parsed path AST.
- [`ParseError`]: The error type for failed parses.
*/
use thiserror::Error;

use crate::query::{Path, Segment, Selector, Slice};

/// Describes a syntax error encountered while parsing a path expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("parse error at position {offset} in {path:?}: {message}")]
pub struct ParseError {
    /// The full raw path that failed to parse
    pub path: String,
    /// Byte offset into `path` where the problem was detected
    pub offset: usize,
    /// Human-readable description
    pub message: &'static str,
}

/// Parse a raw path string into a [`Path`].
///
/// A leading `$` is optional. When `max_length` is set, paths longer than
/// that many bytes are rejected before any scanning happens.
///
/// # Errors
///
/// Returns a [`ParseError`] describing where and how parsing failed.
pub fn parse_path(
    raw: &str,
    max_length: Option<usize>,
) -> Result<Path, ParseError> {
    if let Some(max) = max_length
        && raw.len() > max
    {
        return Err(ParseError {
            path: raw.to_string(),
            offset: 0,
            message: "path exceeds maximum length",
        });
    }

    let segments = Scanner::new(raw).parse()?;
    Ok(Path { segments, raw: raw.to_string() })
}

/// Cursor over the bytes of a raw path.
struct Scanner<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Scanner<'a> {
    const fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn err(&self, message: &'static str) -> ParseError {
        self.err_at(self.pos, message)
    }

    fn err_at(&self, offset: usize, message: &'static str) -> ParseError {
        ParseError { path: self.src.to_string(), offset, message }
    }

    fn peek(&self) -> Option<u8> {
        self.src.as_bytes().get(self.pos).copied()
    }

    fn peek_at(&self, ahead: usize) -> Option<u8> {
        self.src.as_bytes().get(self.pos + ahead).copied()
    }

    fn skip_spaces(&mut self) {
        while self.peek() == Some(b' ') {
            self.pos += 1;
        }
    }

    /// Entry point: optional `$` root, then segments until input runs out.
    fn parse(&mut self) -> Result<Vec<Segment>, ParseError> {
        if self.peek() == Some(b'$') {
            self.pos += 1;
        }

        let mut segments = Vec::new();
        while self.pos < self.src.len() {
            segments.push(self.parse_segment()?);
        }

        if segments.is_empty() {
            return Err(self.err("empty path"));
        }
        Ok(segments)
    }

    /// Handles `.name`, `..name`, `[...]`, `.*`, `..*` and `..[...]`.
    fn parse_segment(&mut self) -> Result<Segment, ParseError> {
        match self.peek() {
            Some(b'.') if self.peek_at(1) == Some(b'.') => {
                self.pos += 2;
                self.parse_after_descendant()
            }
            Some(b'.') => {
                self.pos += 1;
                self.parse_after_dot()
            }
            Some(b'[') => Ok(Segment::child(self.parse_bracket()?)),
            _ => Err(self.err("expected '.', '..', or '['")),
        }
    }

    fn parse_after_descendant(&mut self) -> Result<Segment, ParseError> {
        match self.peek() {
            None => Err(self.err("unexpected end after '..'")),
            Some(b'[') => Ok(Segment::descendant(self.parse_bracket()?)),
            Some(b'*') => {
                self.pos += 1;
                Ok(Segment::descendant(vec![Selector::Wildcard]))
            }
            Some(_) if self.is_name_start() => {
                let name = self.scan_name();
                Ok(Segment::descendant(vec![Selector::Name(name)]))
            }
            Some(_) => Err(self.err("expected name, '*', or '[' after '..'")),
        }
    }

    fn parse_after_dot(&mut self) -> Result<Segment, ParseError> {
        match self.peek() {
            None => Err(self.err("unexpected end after '.'")),
            Some(b'*') => {
                self.pos += 1;
                Ok(Segment::child(vec![Selector::Wildcard]))
            }
            Some(_) if self.is_name_start() => {
                let name = self.scan_name();
                Ok(Segment::child(vec![Selector::Name(name)]))
            }
            Some(_) => Err(self.err("expected name or '*' after '.'")),
        }
    }

    /// Parses `[` selector (`,` selector)* `]`.
    fn parse_bracket(&mut self) -> Result<Vec<Selector>, ParseError> {
        self.pos += 1; // consume '['
        let mut selectors = Vec::new();

        loop {
            self.skip_spaces();
            selectors.push(self.parse_bracket_selector()?);
            self.skip_spaces();

            match self.peek() {
                None => return Err(self.err("unclosed '['")),
                Some(b']') => {
                    self.pos += 1;
                    return Ok(selectors);
                }
                Some(b',') => self.pos += 1,
                Some(_) => return Err(self.err("expected ',' or ']'")),
            }
        }
    }

    fn parse_bracket_selector(&mut self) -> Result<Selector, ParseError> {
        match self.peek() {
            None => Err(self.err("unexpected end in bracket")),
            Some(b'*') => {
                self.pos += 1;
                Ok(Selector::Wildcard)
            }
            Some(quote @ (b'\'' | b'"')) => {
                Ok(Selector::Name(self.scan_string(quote)?))
            }
            Some(b'-' | b'0'..=b'9') => self.parse_number_or_slice(),
            Some(b':') => self.parse_slice_from(None),
            Some(_) if self.is_name_start() => {
                Ok(Selector::Name(self.scan_name()))
            }
            Some(_) => Err(self.err("expected name, number, string, or '*'")),
        }
    }

    /// Reads an integer; a following `:` promotes it to a slice start.
    fn parse_number_or_slice(&mut self) -> Result<Selector, ParseError> {
        let n = self.scan_int()?;
        self.skip_spaces();
        if self.peek() == Some(b':') {
            return self.parse_slice_from(Some(n));
        }
        Ok(Selector::Index(n))
    }

    /// Parses the rest of `start:end:step` starting at the first `:`.
    fn parse_slice_from(
        &mut self,
        start: Option<i64>,
    ) -> Result<Selector, ParseError> {
        self.pos += 1; // consume ':'
        self.skip_spaces();
        let end = self.scan_optional_int()?;
        self.skip_spaces();

        let mut step = None;
        if self.peek() == Some(b':') {
            self.pos += 1;
            self.skip_spaces();
            step = self.scan_optional_int()?;
        }

        Ok(Selector::Slice(Slice::new(start, end, step)))
    }

    fn scan_optional_int(&mut self) -> Result<Option<i64>, ParseError> {
        match self.peek() {
            Some(b'-' | b'0'..=b'9') => self.scan_int().map(Some),
            _ => Ok(None),
        }
    }

    /// Scans an optionally negative decimal integer.
    fn scan_int(&mut self) -> Result<i64, ParseError> {
        let start = self.pos;
        let negative = self.peek() == Some(b'-');
        if negative {
            self.pos += 1;
        }
        if !matches!(self.peek(), Some(b'0'..=b'9')) {
            return Err(self.err_at(start, "expected integer"));
        }

        let mut n: i64 = 0;
        while let Some(digit @ b'0'..=b'9') = self.peek() {
            let d = i64::from(digit - b'0');
            // accumulate negatively so that i64::MIN is representable
            n = n
                .checked_mul(10)
                .and_then(|n| n.checked_sub(d))
                .ok_or_else(|| self.err_at(start, "integer out of range"))?;
            self.pos += 1;
        }

        if negative {
            Ok(n)
        } else {
            n.checked_neg()
                .ok_or_else(|| self.err_at(start, "integer out of range"))
        }
    }

    /// Reports whether the current position starts an unquoted name: a
    /// letter (including Unicode letters) or `_`. Digits and `-` only
    /// continue a name.
    fn is_name_start(&self) -> bool {
        self.src[self.pos..]
            .chars()
            .next()
            .is_some_and(|c| c == '_' || c.is_alphabetic())
    }

    /// Scans an unquoted name made of letters, digits, `_` and `-`.
    fn scan_name(&mut self) -> String {
        let start = self.pos;
        for c in self.src[self.pos..].chars() {
            if c == '_' || c == '-' || c.is_alphanumeric() {
                self.pos += c.len_utf8();
            } else {
                break;
            }
        }
        self.src[start..self.pos].to_string()
    }

    /// Scans a single- or double-quoted string, returning the unescaped
    /// content.
    fn scan_string(&mut self, quote: u8) -> Result<String, ParseError> {
        let start = self.pos;
        self.pos += 1; // consume opening quote
        let mut buf = String::new();
        let mut run_start = self.pos;

        while let Some(b) = self.peek() {
            if b == quote {
                buf.push_str(&self.src[run_start..self.pos]);
                self.pos += 1;
                return Ok(buf);
            }
            if b != b'\\' {
                self.pos += 1;
                continue;
            }

            buf.push_str(&self.src[run_start..self.pos]);
            let escape_at = self.pos + 1;
            let unescaped = match self.peek_at(1) {
                None => break,
                Some(c @ (b'\\' | b'\'' | b'"')) => char::from(c),
                Some(b'n') => '\n',
                Some(b't') => '\t',
                Some(b'r') => '\r',
                Some(_) => {
                    return Err(
                        self.err_at(escape_at, "invalid escape sequence")
                    );
                }
            };
            buf.push(unescaped);
            self.pos += 2;
            run_start = self.pos;
        }

        Err(self.err_at(start, "unclosed string"))
    }
}
