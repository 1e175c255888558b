//! FETCH response decoding.
//!
//! A FETCH answer is a batch of `* n FETCH (...)` responses, each carrying a
//! list of `name value` pairs. The decoder keeps values as [`Value`] trees
//! keyed by their data item name and groups them per message. A response
//! that does not decode is recorded as a [`DecodeError`] and the rest of the
//! batch is still processed; the items read before the fault are kept in a
//! record marked partial.

use std::collections::BTreeMap;

use thiserror::Error;

use super::lexer::{Lexer, Token};
use super::value::Value;
use crate::types::{Flag, Flags, SeqNum, Uid};
use crate::{Error, Result};

/// Bytes of context kept around a decode failure.
const EXCERPT_LEN: usize = 48;

/// A FETCH response that could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot decode response {fragment} at byte {position}: {message} (near {excerpt:?})")]
pub struct DecodeError {
    /// Index of the response within the batch.
    pub fragment: usize,
    /// Byte offset of the failure within that response.
    pub position: usize,
    /// What went wrong.
    pub message: String,
    /// Text around the failure, lossily decoded.
    pub excerpt: String,
}

impl DecodeError {
    fn new(fragment: usize, input: &[u8], position: usize, message: String) -> Self {
        let start = position.saturating_sub(EXCERPT_LEN / 2);
        let end = (position + EXCERPT_LEN / 2).min(input.len());
        let excerpt = input
            .get(start..end)
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
            .unwrap_or_default();
        Self {
            fragment,
            position,
            message,
            excerpt,
        }
    }
}

/// Data items returned for one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRecord {
    seq: SeqNum,
    uid: Option<Uid>,
    fields: Vec<(String, Value)>,
    partial: bool,
    invalid: Vec<String>,
}

impl FetchRecord {
    fn empty(seq: SeqNum) -> Self {
        Self {
            seq,
            uid: None,
            fields: Vec::new(),
            partial: false,
            invalid: Vec::new(),
        }
    }

    /// Parses the parenthesized item list of a FETCH response.
    ///
    /// The lexer must be positioned at the opening parenthesis.
    pub fn parse(seq: SeqNum, lexer: &mut Lexer<'_>) -> Result<Self> {
        let mut record = Self::empty(seq);
        record.parse_items(lexer)?;
        Ok(record)
    }

    /// Like [`FetchRecord::parse`], but a fault does not lose the items
    /// decoded before it. The record comes back marked partial together
    /// with the error.
    pub fn parse_partial(seq: SeqNum, lexer: &mut Lexer<'_>) -> (Self, Option<Error>) {
        let mut record = Self::empty(seq);
        match record.parse_items(lexer) {
            Ok(()) => (record, None),
            Err(e) => {
                record.partial = true;
                (record, Some(e))
            }
        }
    }

    fn parse_items(&mut self, lexer: &mut Lexer<'_>) -> Result<()> {
        lexer.expect(Token::LParen)?;

        loop {
            lexer.skip_spaces();
            match lexer.peek() {
                Some(b')') => {
                    lexer.advance();
                    return Ok(());
                }
                None => return Err(lexer.error("Unterminated FETCH item list")),
                Some(_) => {}
            }

            let name = lexer.read_item_name()?.to_string();
            let value = match lexer.expect_space().and_then(|()| Value::parse(lexer)) {
                Ok(value) => value,
                Err(e) => {
                    self.invalid.push(name);
                    return Err(e);
                }
            };

            if name.eq_ignore_ascii_case("UID") {
                let uid = value
                    .as_number()
                    .and_then(|n| u32::try_from(n).ok())
                    .and_then(Uid::new);
                let Some(uid) = uid else {
                    self.invalid.push(name);
                    return Err(lexer.error("Invalid UID value"));
                };
                self.uid = Some(uid);
            }
            self.insert(name, value);
        }
    }

    /// Returns the message sequence number.
    #[must_use]
    pub const fn seq(&self) -> SeqNum {
        self.seq
    }

    /// Returns the UID, if the server sent one.
    #[must_use]
    pub const fn uid(&self) -> Option<Uid> {
        self.uid
    }

    /// Returns the UID if present, otherwise the sequence number.
    #[must_use]
    pub fn id(&self) -> u32 {
        self.uid.map_or_else(|| self.seq.get(), Uid::get)
    }

    /// True when decoding stopped early and items may be missing.
    #[must_use]
    pub const fn is_partial(&self) -> bool {
        self.partial
    }

    /// Names of the data items whose values could not be decoded.
    #[must_use]
    pub fn invalid_items(&self) -> &[String] {
        &self.invalid
    }

    /// Looks up a data item by name.
    ///
    /// Names compare case-insensitively, `BODY.PEEK[...]` matches the
    /// `BODY[...]` item the server answers with, and a partial suffix such
    /// as `<0>` is ignored.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        let wanted = item_key(name);
        self.fields
            .iter()
            .find(|(stored, _)| item_key(stored) == wanted)
            .map(|(_, value)| value)
    }

    /// Iterates over data items in the order they were received.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Returns the FLAGS item.
    #[must_use]
    pub fn flags(&self) -> Option<Flags> {
        let items = self.get("FLAGS")?.as_list()?;
        Some(
            items
                .iter()
                .filter_map(Value::as_text)
                .map(|flag| Flag::parse(&flag))
                .collect(),
        )
    }

    /// Returns the RFC822.SIZE item.
    #[must_use]
    pub fn size(&self) -> Option<u64> {
        self.get("RFC822.SIZE")?.as_number()
    }

    /// Returns the raw BODYSTRUCTURE tree.
    #[must_use]
    pub fn body_structure(&self) -> Option<&Value> {
        self.get("BODYSTRUCTURE")
    }

    /// Returns the payload of `BODY[section]`. `NIL` yields `None`.
    #[must_use]
    pub fn section(&self, section: &str) -> Option<&[u8]> {
        self.get(&format!("BODY[{section}]"))?.as_bytes()
    }

    /// Inserts an item, replacing an earlier one with the same name.
    fn insert(&mut self, name: String, value: Value) {
        let key = item_key(&name);
        match self.fields.iter_mut().find(|(stored, _)| item_key(stored) == key) {
            Some(slot) => *slot = (name, value),
            None => self.fields.push((name, value)),
        }
    }

    /// Folds the items of a later response for the same message into this one.
    pub fn merge(&mut self, other: Self) {
        if self.uid.is_none() {
            self.uid = other.uid;
        }
        self.partial |= other.partial;
        for (name, value) in other.fields {
            let key = item_key(&name);
            self.invalid.retain(|stored| item_key(stored) != key);
            self.insert(name, value);
        }
        for name in other.invalid {
            if self.get(&name).is_none() && !self.invalid.contains(&name) {
                self.invalid.push(name);
            }
        }
    }

    /// Writes the item list back in wire form, `(NAME value ...)`.
    pub fn write_fields(&self, out: &mut Vec<u8>) {
        out.push(b'(');
        for (i, (name, value)) in self.fields.iter().enumerate() {
            if i > 0 {
                out.push(b' ');
            }
            out.extend_from_slice(name.as_bytes());
            out.push(b' ');
            value.write_to(out);
        }
        out.push(b')');
    }
}

/// Normalized data item name used for lookups.
fn item_key(name: &str) -> String {
    let mut key = name.to_ascii_uppercase();
    if let Some(rest) = key.strip_prefix("BODY.PEEK") {
        key = format!("BODY{rest}");
    }
    if key.ends_with('>') {
        if let Some(open) = key.rfind('<') {
            key.truncate(open);
        }
    }
    key
}

/// All FETCH records of one command, with per-response decode failures.
#[derive(Debug, Clone, Default)]
pub struct FetchBatch {
    records: Vec<FetchRecord>,
    by_seq: BTreeMap<u32, usize>,
    errors: Vec<DecodeError>,
}

impl FetchBatch {
    /// Decodes complete responses as delivered by the framed reader.
    ///
    /// Responses other than FETCH are skipped.
    pub fn from_responses<I, B>(responses: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: AsRef<[u8]>,
    {
        let mut batch = Self::default();
        for (index, response) in responses.into_iter().enumerate() {
            batch.decode_one(index, response.as_ref());
        }
        batch
    }

    fn decode_one(&mut self, index: usize, input: &[u8]) {
        let mut lexer = Lexer::new(input);
        let Some(seq) = fetch_prefix(&mut lexer) else {
            return;
        };

        let (record, fault) = FetchRecord::parse_partial(seq, &mut lexer);
        if let Some(e) = fault {
            let (position, message) = match e {
                Error::Parse { position, message } => (position, message),
                e => (lexer.position(), e.to_string()),
            };
            tracing::debug!(
                fragment = index,
                position,
                %message,
                invalid = ?record.invalid_items(),
                "undecodable FETCH response"
            );
            self.errors
                .push(DecodeError::new(index, input, position, message));
        }
        self.push(record);
    }

    fn push(&mut self, record: FetchRecord) {
        let seq = record.seq.get();
        if let Some(&idx) = self.by_seq.get(&seq) {
            self.records[idx].merge(record);
        } else {
            self.by_seq.insert(seq, self.records.len());
            self.records.push(record);
        }
    }

    /// Returns the record for a UID.
    #[must_use]
    pub fn get(&self, uid: Uid) -> Option<&FetchRecord> {
        self.records.iter().find(|r| r.uid == Some(uid))
    }

    /// Returns the record for a sequence number.
    #[must_use]
    pub fn by_seq(&self, seq: SeqNum) -> Option<&FetchRecord> {
        self.by_seq.get(&seq.get()).map(|&idx| &self.records[idx])
    }

    /// Iterates over records in arrival order.
    pub fn iter(&self) -> impl Iterator<Item = &FetchRecord> {
        self.records.iter()
    }

    /// Consumes the batch, returning records keyed by UID (or sequence
    /// number when the server sent no UID).
    #[must_use]
    pub fn into_map(self) -> BTreeMap<u32, FetchRecord> {
        self.records.into_iter().map(|r| (r.id(), r)).collect()
    }

    /// Returns the decode failures.
    #[must_use]
    pub fn errors(&self) -> &[DecodeError] {
        &self.errors
    }

    /// Returns the number of decoded records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if no record was decoded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Consumes `* n FETCH ` and returns `n`, or `None` for any other response.
fn fetch_prefix(lexer: &mut Lexer<'_>) -> Option<SeqNum> {
    if !matches!(lexer.next_token(), Ok(Token::Asterisk)) {
        return None;
    }
    lexer.expect_space().ok()?;
    let seq = match lexer.next_token() {
        Ok(Token::Number(n)) => u32::try_from(n).ok().and_then(SeqNum::new)?,
        _ => return None,
    };
    lexer.expect_space().ok()?;
    match lexer.next_token() {
        Ok(Token::Atom(name)) if name.eq_ignore_ascii_case("FETCH") => {}
        _ => return None,
    }
    lexer.expect_space().ok()?;
    Some(seq)
}
