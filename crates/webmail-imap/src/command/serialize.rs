//! Command serialization helpers.

use crate::types::Mailbox;
use crate::utf7;
use crate::{Error, Result};

use super::types::{FetchAttribute, SearchCriteria, StoreAction};

/// Writes an astring (atom or quoted string).
pub fn write_astring(buf: &mut Vec<u8>, s: &str) -> Result<()> {
    if s.is_empty() || s.bytes().any(needs_quoting) {
        write_quoted(buf, s)
    } else {
        buf.extend_from_slice(s.as_bytes());
        Ok(())
    }
}

/// Writes a quoted string.
///
/// CR, LF and NUL cannot appear in a quoted string; a value carrying one
/// would end the command line early, so it is refused.
pub fn write_quoted(buf: &mut Vec<u8>, s: &str) -> Result<()> {
    if let Some(b) = s.bytes().find(|b| matches!(b, b'\r' | b'\n' | 0)) {
        return Err(Error::InvalidArgument(format!(
            "byte 0x{b:02X} not allowed in a quoted string"
        )));
    }
    buf.push(b'"');
    for b in s.bytes() {
        if b == b'"' || b == b'\\' {
            buf.push(b'\\');
        }
        buf.push(b);
    }
    buf.push(b'"');
    Ok(())
}

/// Writes a mailbox name: modified UTF-7, always quoted.
pub fn write_mailbox(buf: &mut Vec<u8>, mailbox: &Mailbox) -> Result<()> {
    write_quoted(buf, &utf7::encode(mailbox.as_str()))
}

/// Writes a LIST pattern. Wildcards pass through the encoding unchanged.
pub fn write_list_pattern(buf: &mut Vec<u8>, pattern: &str) -> Result<()> {
    write_quoted(buf, &utf7::encode(pattern))
}

/// Returns true if the byte needs quoting.
const fn needs_quoting(b: u8) -> bool {
    matches!(b, b' ' | b'"' | b'\\' | b'(' | b')' | b'{' | b'%' | b'*' | b']')
        || b < 0x20
        || b >= 0x7F
}

/// Writes a parenthesized list of FETCH attributes.
pub fn write_fetch_items(buf: &mut Vec<u8>, attrs: &[FetchAttribute]) {
    buf.push(b'(');
    for (i, attr) in attrs.iter().enumerate() {
        if i > 0 {
            buf.push(b' ');
        }
        write_fetch_attribute(buf, attr);
    }
    buf.push(b')');
}

/// Writes a single FETCH attribute.
pub fn write_fetch_attribute(buf: &mut Vec<u8>, attr: &FetchAttribute) {
    match attr {
        FetchAttribute::Flags => buf.extend_from_slice(b"FLAGS"),
        FetchAttribute::Rfc822Size => buf.extend_from_slice(b"RFC822.SIZE"),
        FetchAttribute::BodyStructure => buf.extend_from_slice(b"BODYSTRUCTURE"),
        FetchAttribute::Uid => buf.extend_from_slice(b"UID"),
        FetchAttribute::Body { section, peek } => {
            if *peek {
                buf.extend_from_slice(b"BODY.PEEK[");
            } else {
                buf.extend_from_slice(b"BODY[");
            }
            buf.extend_from_slice(section.as_bytes());
            buf.push(b']');
        }
    }
}

/// Writes STORE action.
pub fn write_store_action(buf: &mut Vec<u8>, action: &StoreAction, silent: bool) {
    let (prefix, flags) = match action {
        StoreAction::AddFlags(f) => ("+FLAGS", f),
        StoreAction::RemoveFlags(f) => ("-FLAGS", f),
    };
    buf.extend_from_slice(prefix.as_bytes());
    if silent {
        buf.extend_from_slice(b".SILENT");
    }
    buf.extend_from_slice(b" (");
    for (i, flag) in flags.iter().enumerate() {
        if i > 0 {
            buf.push(b' ');
        }
        buf.extend_from_slice(flag.as_str().as_bytes());
    }
    buf.push(b')');
}

/// Writes SEARCH criteria.
///
/// Search strings are always quoted; `OR` operands are parenthesized.
pub fn write_search_criteria(buf: &mut Vec<u8>, criteria: &SearchCriteria) -> Result<()> {
    match criteria {
        SearchCriteria::All => buf.extend_from_slice(b"ALL"),
        SearchCriteria::Deleted => buf.extend_from_slice(b"DELETED"),
        SearchCriteria::Subject(s) => {
            buf.extend_from_slice(b"SUBJECT ");
            write_quoted(buf, s)?;
        }
        SearchCriteria::From(s) => {
            buf.extend_from_slice(b"FROM ");
            write_quoted(buf, s)?;
        }
        SearchCriteria::And(items) => {
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    buf.push(b' ');
                }
                write_search_criteria(buf, item)?;
            }
        }
        SearchCriteria::Or(a, b) => {
            buf.extend_from_slice(b"OR (");
            write_search_criteria(buf, a)?;
            buf.extend_from_slice(b") (");
            write_search_criteria(buf, b)?;
            buf.push(b')');
        }
        SearchCriteria::Not(c) => {
            buf.extend_from_slice(b"NOT ");
            if matches!(**c, SearchCriteria::And(_)) {
                buf.push(b'(');
                write_search_criteria(buf, c)?;
                buf.push(b')');
            } else {
                write_search_criteria(buf, c)?;
            }
        }
    }
    Ok(())
}
