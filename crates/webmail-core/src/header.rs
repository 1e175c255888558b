//! Header records for message lists and message views.
//!
//! A [`HeaderRecord`] is filled from a raw header block through a table
//! that maps each [`HeaderField`] to the parser for its value. Address
//! lists, subjects and display names have their RFC 2047 encoded words
//! decoded; dates are parsed as RFC 2822.
//!
//! ```
//! use webmail_core::header::{HeaderField, HeaderRecord};
//!
//! let record = HeaderRecord::from_bytes(
//!     b"From: =?utf-8?q?Ren=C3=A9?= <rene@example.com>\r\nSubject: Lunch\r\n",
//! );
//! assert_eq!(record.display(HeaderField::From).as_deref(), Some("Ren\u{e9}"));
//! assert_eq!(record.subject, "Lunch");
//! ```

use std::fmt;

use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use webmail_imap::FetchRecord;
use webmail_mime::Headers;
use webmail_mime::words::decode_header_lossy;

/// Header fields the service layer understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderField {
    /// `From`
    From,
    /// `To`
    To,
    /// `Cc`
    Cc,
    /// `Reply-To`
    ReplyTo,
    /// `Date`
    Date,
    /// `Message-ID`
    MessageId,
    /// `Subject`
    Subject,
}

impl HeaderField {
    /// Every field, in display order.
    pub const ALL: [Self; 7] = [
        Self::From,
        Self::To,
        Self::Cc,
        Self::ReplyTo,
        Self::Date,
        Self::MessageId,
        Self::Subject,
    ];

    /// Canonical header name.
    #[must_use]
    pub const fn header_name(self) -> &'static str {
        match self {
            Self::From => "From",
            Self::To => "To",
            Self::Cc => "Cc",
            Self::ReplyTo => "Reply-To",
            Self::Date => "Date",
            Self::MessageId => "Message-ID",
            Self::Subject => "Subject",
        }
    }

    /// Looks a field up by header name, ignoring case.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|field| field.header_name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for HeaderField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.header_name())
    }
}

/// One mailbox of an address header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Address {
    /// Decoded display name.
    pub name: Option<String>,
    /// `local@domain` as written.
    pub email: String,
}

impl Address {
    /// Parses `Name <local@domain>` or a bare address.
    fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        let (name, email) = match (raw.rfind('<'), raw.rfind('>')) {
            (Some(open), Some(close)) if open < close => {
                (unquote(raw[..open].trim()), raw[open + 1..close].trim())
            }
            _ => (String::new(), raw),
        };
        let name = decode_header_lossy(&name);
        Some(Self {
            name: (!name.is_empty()).then_some(name),
            email: email.to_string(),
        })
    }

    /// The display name, or the address when there is none.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.email)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{name} <{}>", self.email),
            None => f.write_str(&self.email),
        }
    }
}

/// Decoded headers of one message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HeaderRecord {
    /// First `From` mailbox.
    pub from: Option<Address>,
    /// `To` recipients.
    pub to: Vec<Address>,
    /// `Cc` recipients.
    pub cc: Vec<Address>,
    /// `Reply-To` mailboxes.
    pub reply_to: Vec<Address>,
    /// Parsed `Date`; `None` when missing or unparseable.
    pub date: Option<DateTime<FixedOffset>>,
    /// `Message-ID` as written.
    pub message_id: Option<String>,
    /// Decoded subject, empty when missing.
    pub subject: String,
}

type FieldParser = fn(&mut HeaderRecord, &str);

const PARSERS: [(HeaderField, FieldParser); 7] = [
    (HeaderField::From, |record, value| {
        record.from = parse_address_list(value).into_iter().next();
    }),
    (HeaderField::To, |record, value| record.to = parse_address_list(value)),
    (HeaderField::Cc, |record, value| record.cc = parse_address_list(value)),
    (HeaderField::ReplyTo, |record, value| {
        record.reply_to = parse_address_list(value);
    }),
    (HeaderField::Date, |record, value| record.date = parse_date(value)),
    (HeaderField::MessageId, |record, value| {
        record.message_id = Some(value.trim().to_string());
    }),
    (HeaderField::Subject, |record, value| {
        record.subject = decode_header_lossy(value).trim().to_string();
    }),
];

impl HeaderRecord {
    /// Fills a record from a parsed header block. Fields that are missing
    /// or blank keep their defaults.
    #[must_use]
    pub fn from_headers(headers: &Headers) -> Self {
        let mut record = Self::default();
        for (field, parse) in PARSERS {
            if let Some(value) = headers.get(field.header_name()) {
                if !value.trim().is_empty() {
                    parse(&mut record, value);
                }
            }
        }
        record
    }

    /// Parses a raw header block.
    #[must_use]
    pub fn from_bytes(raw: &[u8]) -> Self {
        Self::from_headers(&Headers::parse(raw))
    }

    /// Reads the `BODY[HEADER...]` item of a FETCH record. A record
    /// without one gives an empty record.
    #[must_use]
    pub fn from_fetch(record: &FetchRecord) -> Self {
        record
            .fields()
            .find(|(name, _)| name.to_ascii_uppercase().starts_with("BODY[HEADER"))
            .and_then(|(_, value)| value.as_bytes())
            .map(Self::from_bytes)
            .unwrap_or_default()
    }

    /// Text shown for `field`; `None` when the message lacks it.
    ///
    /// Addresses show their display name, dates their RFC 2822 form.
    #[must_use]
    pub fn display(&self, field: HeaderField) -> Option<String> {
        let join = |addresses: &[Address]| {
            (!addresses.is_empty()).then(|| {
                addresses
                    .iter()
                    .map(Address::display_name)
                    .collect::<Vec<_>>()
                    .join(", ")
            })
        };
        match field {
            HeaderField::From => self.from.as_ref().map(|a| a.display_name().to_string()),
            HeaderField::To => join(&self.to),
            HeaderField::Cc => join(&self.cc),
            HeaderField::ReplyTo => join(&self.reply_to),
            HeaderField::Date => self.date.map(|date| date.to_rfc2822()),
            HeaderField::MessageId => self.message_id.clone(),
            HeaderField::Subject => (!self.subject.is_empty()).then(|| self.subject.clone()),
        }
    }
}

/// Splits an address list on commas outside quotes and angle brackets.
fn parse_address_list(value: &str) -> Vec<Address> {
    let mut addresses = Vec::new();
    let mut start = 0;
    let mut quoted = false;
    let mut escaped = false;
    let mut angle = false;
    for (i, c) in value.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' if quoted => escaped = true,
            '"' => quoted = !quoted,
            '<' if !quoted => angle = true,
            '>' if !quoted => angle = false,
            ',' if !quoted && !angle => {
                addresses.extend(Address::parse(&value[start..i]));
                start = i + 1;
            }
            _ => {}
        }
    }
    addresses.extend(Address::parse(&value[start..]));
    addresses
}

fn unquote(phrase: &str) -> String {
    match phrase.strip_prefix('"').and_then(|p| p.strip_suffix('"')) {
        Some(inner) => {
            let mut out = String::with_capacity(inner.len());
            let mut chars = inner.chars();
            while let Some(c) = chars.next() {
                match c {
                    '\\' => out.extend(chars.next()),
                    c => out.push(c),
                }
            }
            out
        }
        None => phrase.to_string(),
    }
}

fn parse_date(value: &str) -> Option<DateTime<FixedOffset>> {
    let mut value = value.trim();
    // Trailing zone comment, as in "+0100 (CET)".
    if value.ends_with(')') {
        if let Some(open) = value.rfind('(') {
            value = value[..open].trim_end();
        }
    }
    match DateTime::parse_from_rfc2822(value) {
        Ok(date) => Some(date),
        Err(e) => {
            tracing::debug!(%e, value, "unparseable Date header");
            None
        }
    }
}
