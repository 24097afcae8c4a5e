//! Manifest line format.
//!
//! `"<path>"\t<size>\t<mtime>\t<sha256 hex>`, with the path quoted using Go
//! string-literal escapes as in the classic `lsr` listing. Paths are raw
//! bytes: invalid UTF-8 is written as `\xNN`, non-printable characters as
//! `\uNNNN`/`\UNNNNNNNN`. Unassigned code points outside the escape table
//! below are written as-is. Fields after the path may be separated by any
//! whitespace.

use super::{Digest, Record, DIGEST_LEN};
use chrono::{DateTime, SecondsFormat, Utc};
use std::borrow::Cow;
use std::fmt::Write;

/// Render a record as one manifest line, without the trailing newline.
pub fn encode_record(record: &Record) -> String {
    let mut line = quote(&record.path);
    let _ = write!(
        line,
        "\t{}\t{}\t{}",
        record.size,
        format_mtime(record.mtime),
        hex::encode(record.digest)
    );
    line
}

/// Parse one manifest line. The error string describes what was wrong.
pub fn decode_record(line: &str) -> Result<Record, String> {
    let (path, rest) = unquote(line)?;

    let fields: Vec<&str> = rest.split_whitespace().collect();
    let [size, mtime, digest] = fields.as_slice() else {
        return Err(format!("expected 3 fields after path, found {}", fields.len()));
    };
    if !rest.starts_with(char::is_whitespace) {
        return Err("missing separator after path".to_string());
    }

    let size = size
        .parse::<u64>()
        .map_err(|e| format!("bad size {size:?}: {e}"))?;
    let mtime = parse_mtime(mtime)?;
    let digest = decode_digest(digest)?;

    Ok(Record {
        path,
        size,
        mtime,
        digest,
    })
}

/// RFC 3339, UTC, whole seconds.
pub fn format_mtime(mtime: DateTime<Utc>) -> String {
    mtime.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Inverse of [`format_mtime`]. Offsets and fractional seconds are rejected.
fn parse_mtime(text: &str) -> Result<DateTime<Utc>, String> {
    if !text.ends_with('Z') || text.contains('.') {
        return Err(format!("mtime {text:?} is not whole-second UTC"));
    }
    DateTime::parse_from_rfc3339(text)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| format!("bad mtime {text:?}: {e}"))
}

fn decode_digest(text: &str) -> Result<Digest, String> {
    let bytes = hex::decode(text).map_err(|e| format!("bad digest {text:?}: {e}"))?;
    Digest::try_from(bytes.as_slice()).map_err(|_| {
        format!(
            "digest is {} bytes, expected {}",
            bytes.len(),
            DIGEST_LEN
        )
    })
}

/// Code points Go's `strconv.IsPrint` rejects beyond the control characters:
/// space separators other than ' ', line/paragraph separators, format
/// characters, private use and noncharacters.
const NON_PRINTING: &[(u32, u32)] = &[
    (0x00A0, 0x00A0),
    (0x00AD, 0x00AD),
    (0x0600, 0x0605),
    (0x061C, 0x061C),
    (0x06DD, 0x06DD),
    (0x070F, 0x070F),
    (0x0890, 0x0891),
    (0x08E2, 0x08E2),
    (0x1680, 0x1680),
    (0x180E, 0x180E),
    (0x2000, 0x200F),
    (0x2028, 0x202F),
    (0x205F, 0x2064),
    (0x2066, 0x206F),
    (0x3000, 0x3000),
    (0xE000, 0xF8FF),
    (0xFEFF, 0xFEFF),
    (0xFFF9, 0xFFFB),
    (0xFFFE, 0xFFFF),
    (0x110BD, 0x110BD),
    (0x110CD, 0x110CD),
    (0x13430, 0x1343F),
    (0x1BCA0, 0x1BCA3),
    (0x1D173, 0x1D17A),
    (0xE0001, 0xE0001),
    (0xE0020, 0xE007F),
    (0xF0000, 0x10FFFF),
];

fn is_printable(c: char) -> bool {
    if c.is_control() {
        return false;
    }
    let cp = c as u32;
    !NON_PRINTING
        .iter()
        .any(|&(lo, hi)| (lo..=hi).contains(&cp))
}

/// Quote a path as a double-quoted literal.
pub fn quote(path: &[u8]) -> String {
    let mut out = String::with_capacity(path.len() + 2);
    out.push('"');
    for chunk in path.utf8_chunks() {
        push_escaped(&mut out, chunk.valid());
        for byte in chunk.invalid() {
            let _ = write!(out, "\\x{byte:02x}");
        }
    }
    out.push('"');
    out
}

fn push_escaped(out: &mut String, s: &str) {
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\u{07}' => out.push_str("\\a"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0c}' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{0b}' => out.push_str("\\v"),
            c if is_printable(c) => out.push(c),
            c if (c as u32) < 0x80 => {
                let _ = write!(out, "\\x{:02x}", c as u32);
            }
            c if (c as u32) < 0x10000 => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => {
                let _ = write!(out, "\\U{:08x}", c as u32);
            }
        }
    }
}

/// Path as shown on a report line: verbatim when nothing in it needs
/// escaping, otherwise quoted like the manifest.
pub fn display_path(path: &[u8]) -> Cow<'_, str> {
    match std::str::from_utf8(path) {
        Ok(s) if s.chars().all(|c| is_printable(c) && c != '"' && c != '\\') => {
            Cow::Borrowed(s)
        }
        _ => Cow::Owned(quote(path)),
    }
}

/// Parse a leading quoted literal, returning its bytes and the remaining input.
pub fn unquote(input: &str) -> Result<(Vec<u8>, &str), String> {
    let body = input
        .strip_prefix('"')
        .ok_or_else(|| "path is not quoted".to_string())?;

    let mut out = Vec::new();
    let mut chars = body.char_indices();
    while let Some((i, c)) = chars.next() {
        match c {
            '"' => return Ok((out, &body[i + 1..])),
            '\\' => {
                let (_, esc) = chars
                    .next()
                    .ok_or_else(|| "unterminated escape".to_string())?;
                let decoded = match esc {
                    '"' => '"',
                    '\'' => '\'',
                    '\\' => '\\',
                    'a' => '\u{07}',
                    'b' => '\u{08}',
                    'f' => '\u{0c}',
                    'n' => '\n',
                    'r' => '\r',
                    't' => '\t',
                    'v' => '\u{0b}',
                    'x' => {
                        // A raw byte, not necessarily valid UTF-8 on its own
                        out.push(hex_escape(&mut chars, 2)? as u8);
                        continue;
                    }
                    'u' => code_point(hex_escape(&mut chars, 4)?)?,
                    'U' => code_point(hex_escape(&mut chars, 8)?)?,
                    other => return Err(format!("unknown escape \\{other}")),
                };
                push_char(&mut out, decoded);
            }
            c if c.is_control() => return Err("raw control character in path".to_string()),
            c => push_char(&mut out, c),
        }
    }
    Err("unterminated quoted path".to_string())
}

fn push_char(out: &mut Vec<u8>, c: char) {
    let mut buf = [0u8; 4];
    out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
}

fn code_point(value: u32) -> Result<char, String> {
    char::from_u32(value).ok_or_else(|| format!("invalid code point {value:#x}"))
}

fn hex_escape(chars: &mut std::str::CharIndices<'_>, width: usize) -> Result<u32, String> {
    let mut value = 0u32;
    for _ in 0..width {
        let (_, c) = chars
            .next()
            .ok_or_else(|| "truncated hex escape".to_string())?;
        let digit = c
            .to_digit(16)
            .ok_or_else(|| format!("bad hex digit {c:?} in escape"))?;
        value = value * 16 + digit;
    }
    Ok(value)
}
