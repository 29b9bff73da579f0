//! Text Snapshot
//!
//! Line-oriented dump format:
//!
//! ```text
//! ---
//! <key>: [<value>,<ttl>]
//! ```
//!
//! One line per entry, sorted by key. `ttl` is the expiration in epoch
//! seconds and is empty for permanent entries. Inside key and value the
//! characters `:`, `,` and `\` are preceded by `\`; on read `\X` is always
//! the literal `X`.

use std::fmt;
use std::io::{BufRead, Write};
use tracing::info;

use crate::error::{Error, Result, SnapshotError};
use crate::storage::{Entry, Store};

/// First line of every text snapshot
pub const HEADER: &str = "---";

impl Store {
    /// Write all entries, expired ones included, as a text snapshot
    ///
    /// The entries are copied under the shared lock; nothing is written
    /// while the lock is held.
    pub fn dump<W: Write>(&self, mut writer: W) -> Result<()> {
        let text = render(&self.sorted_entries())?;
        writer.write_all(text.as_bytes())?;
        writer.flush()?;
        Ok(())
    }

    /// Replace the store contents with a text snapshot
    ///
    /// The whole stream is parsed before anything becomes visible; on error
    /// the store is left as it was. Returns the number of loaded entries.
    pub fn load<R: BufRead>(&self, reader: R) -> Result<usize> {
        let entries = parse(reader)?;
        let count = self.replace_entries(entries);
        info!(entries = count, "loaded text snapshot");
        Ok(count)
    }
}

impl fmt::Display for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", HEADER)?;
        for (key, entry) in self.sorted_entries() {
            let mut line = String::new();
            match write_line(&mut line, &key, &entry) {
                Ok(()) => writeln!(f, "{}", line)?,
                // Entries dump rejects are shown debug-quoted
                Err(_) => writeln!(
                    f,
                    "{:?}: [{:?},{}]",
                    key,
                    entry.value(),
                    ttl_field(&entry)
                )?,
            }
        }
        Ok(())
    }
}

fn render(entries: &[(String, Entry)]) -> Result<String> {
    let mut out = String::with_capacity(HEADER.len() + 1 + entries.len() * 16);
    out.push_str(HEADER);
    out.push('\n');
    for (key, entry) in entries {
        write_line(&mut out, key, entry)?;
        out.push('\n');
    }
    Ok(out)
}

fn ttl_field(entry: &Entry) -> String {
    entry.expires_at().map(|t| t.to_string()).unwrap_or_default()
}

/// Append `key: [value,ttl]` without the trailing newline
fn write_line(out: &mut String, key: &str, entry: &Entry) -> Result<()> {
    // Lines with an empty key are skipped on read
    if key.is_empty() {
        return Err(Error::Unrepresentable {
            key: String::new(),
            reason: "empty key",
        });
    }
    if key.contains('\n') {
        return Err(Error::Unrepresentable {
            key: key.to_owned(),
            reason: "key contains a newline",
        });
    }
    if entry.value().contains('\n') {
        return Err(Error::Unrepresentable {
            key: key.to_owned(),
            reason: "value contains a newline",
        });
    }

    let mut chars = key.chars();
    // Leading whitespace is skipped on read, keep it by escaping
    if let Some(first) = chars.next() {
        if first == ' ' || first == '\t' {
            out.push('\\');
            out.push(first);
        } else {
            escape_into(out, first);
        }
    }
    chars.for_each(|c| escape_into(out, c));

    out.push_str(": [");
    entry.value().chars().for_each(|c| escape_into(out, c));
    out.push(',');
    out.push_str(&ttl_field(entry));
    out.push(']');
    Ok(())
}

#[inline]
fn escape_into(out: &mut String, c: char) {
    if matches!(c, ':' | ',' | '\\') {
        out.push('\\');
    }
    out.push(c);
}

/// Parse a whole snapshot into a scratch list of entries
pub(crate) fn parse<R: BufRead>(reader: R) -> Result<Vec<(String, Entry)>> {
    let mut lines = reader.lines();

    match lines.next().transpose()? {
        Some(header) if header == HEADER => {}
        _ => return Err(Error::malformed(1, SnapshotError::MissingHeader)),
    }

    let mut entries = Vec::new();
    for (idx, line) in lines.enumerate() {
        let line = line?;
        // Header is line 1
        let line_no = idx + 2;
        let parsed = parse_line(&line).map_err(|kind| Error::malformed(line_no, kind))?;
        if let Some(parsed) = parsed {
            entries.push(parsed);
        }
    }
    Ok(entries)
}

/// Where the scanner is inside `key: [value,ttl]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Key,
    /// Between `:` and `[`
    Colon,
    Value,
    Ttl,
    /// After the closing `]` or the second `,`
    Closed,
}

#[derive(Debug, Default)]
struct LineParser {
    key: String,
    value: String,
    ttl: String,
}

impl LineParser {
    fn field(&mut self, state: State) -> Option<&mut String> {
        match state {
            State::Key => Some(&mut self.key),
            State::Value => Some(&mut self.value),
            State::Ttl => Some(&mut self.ttl),
            State::Colon | State::Closed => None,
        }
    }

    fn step(&mut self, state: State, c: char) -> std::result::Result<State, SnapshotError> {
        let next = match (state, c) {
            (State::Key, ':') => State::Colon,
            (State::Colon, ' ' | '\t') => State::Colon,
            (State::Colon, '[') => State::Value,
            (State::Colon, _) => return Err(SnapshotError::MissingOpenBracket),
            (State::Value, ',') => State::Ttl,
            (State::Ttl, ']' | ',') => State::Closed,
            (State::Closed, _) => State::Closed,
            (state, c) => {
                if let Some(field) = self.field(state) {
                    field.push(c);
                }
                state
            }
        };
        Ok(next)
    }
}

/// Parse one entry line
///
/// `Ok(None)` for blank lines and lines with an empty key.
pub(crate) fn parse_line(
    line: &str,
) -> std::result::Result<Option<(String, Entry)>, SnapshotError> {
    let mut parser = LineParser::default();
    let mut state = State::Key;
    let mut chars = line.trim_start_matches([' ', '\t']).chars();

    while let Some(c) = chars.next() {
        if c == '\\' && state != State::Closed {
            let escaped = chars.next().ok_or(SnapshotError::DanglingEscape)?;
            match parser.field(state) {
                Some(field) => field.push(escaped),
                None => return Err(SnapshotError::MissingOpenBracket),
            }
            continue;
        }
        state = parser.step(state, c)?;
    }

    match state {
        State::Key if parser.key.is_empty() => return Ok(None),
        State::Key => return Err(SnapshotError::MissingColon),
        State::Colon => return Err(SnapshotError::MissingOpenBracket),
        State::Value | State::Ttl | State::Closed => {}
    }

    if parser.key.is_empty() {
        return Ok(None);
    }

    let LineParser { key, value, ttl } = parser;
    let entry = match ttl.trim() {
        "" => Entry::permanent(value),
        ttl => {
            let expires_at = ttl
                .parse::<i64>()
                .map_err(|_| SnapshotError::InvalidTtl(ttl.to_owned()))?;
            Entry::expiring(value, expires_at)
        }
    };
    Ok(Some((key, entry)))
}
