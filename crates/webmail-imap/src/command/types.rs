//! Command-related type definitions.

use crate::types::Flag;

/// STATUS attributes to request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusAttribute {
    /// Number of messages.
    Messages,
    /// Number of recent messages.
    Recent,
    /// Next UID.
    UidNext,
    /// UIDVALIDITY.
    UidValidity,
    /// Number of unseen messages.
    Unseen,
}

impl StatusAttribute {
    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            Self::Messages => "MESSAGES",
            Self::Recent => "RECENT",
            Self::UidNext => "UIDNEXT",
            Self::UidValidity => "UIDVALIDITY",
            Self::Unseen => "UNSEEN",
        }
    }
}

/// Individual FETCH attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchAttribute {
    /// Message flags.
    Flags,
    /// RFC822 size.
    Rfc822Size,
    /// Body structure.
    BodyStructure,
    /// UID.
    Uid,
    /// Body section, e.g. `BODY.PEEK[1.2]` or `BODY[]`.
    Body {
        /// Section specifier; empty for the whole message.
        section: String,
        /// Peek (don't set \Seen).
        peek: bool,
    },
}

impl FetchAttribute {
    /// `BODY.PEEK[HEADER.FIELDS (...)]` for the given header names.
    #[must_use]
    pub fn header_fields<S: AsRef<str>>(names: &[S]) -> Self {
        Self::Body {
            section: Self::header_section(names),
            peek: true,
        }
    }

    /// The `HEADER.FIELDS (...)` section specifier for the given names.
    #[must_use]
    pub fn header_section<S: AsRef<str>>(names: &[S]) -> String {
        let names: Vec<String> = names
            .iter()
            .map(|name| name.as_ref().to_ascii_uppercase())
            .collect();
        format!("HEADER.FIELDS ({})", names.join(" "))
    }

    /// `BODY.PEEK[section]`.
    #[must_use]
    pub fn peek(section: impl Into<String>) -> Self {
        Self::Body {
            section: section.into(),
            peek: true,
        }
    }
}

/// STORE action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreAction {
    /// Add flags.
    AddFlags(Vec<Flag>),
    /// Remove flags.
    RemoveFlags(Vec<Flag>),
}

/// SEARCH criteria.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchCriteria {
    /// All messages.
    All,
    /// Messages with \Deleted flag.
    Deleted,
    /// Subject contains text.
    Subject(String),
    /// From contains text.
    From(String),
    /// AND of criteria.
    And(Vec<Self>),
    /// OR of criteria.
    Or(Box<Self>, Box<Self>),
    /// NOT of criteria.
    Not(Box<Self>),
}

impl SearchCriteria {
    /// Builds the criteria for a free-text filter over the given fields.
    ///
    /// `fields` may name `from`, `subject` or both; anything else is
    /// ignored. Returns `None` when no usable field is named.
    #[must_use]
    pub fn filter(pattern: &str, fields: &[&str]) -> Option<Self> {
        let from = fields.iter().any(|f| f.eq_ignore_ascii_case("from"));
        let subject = fields.iter().any(|f| f.eq_ignore_ascii_case("subject"));
        match (from, subject) {
            (true, true) => Some(Self::Or(
                Box::new(Self::From(pattern.to_string())),
                Box::new(Self::Subject(pattern.to_string())),
            )),
            (true, false) => Some(Self::From(pattern.to_string())),
            (false, true) => Some(Self::Subject(pattern.to_string())),
            (false, false) => None,
        }
    }
}

/// SORT key (RFC 5256).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    /// Internal date and time.
    Arrival,
    /// First Cc address.
    Cc,
    /// Sent date.
    Date,
    /// First From address.
    From,
    /// Message size.
    Size,
    /// Base subject.
    Subject,
    /// First To address.
    To,
}

impl SortKey {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Arrival => "ARRIVAL",
            Self::Cc => "CC",
            Self::Date => "DATE",
            Self::From => "FROM",
            Self::Size => "SIZE",
            Self::Subject => "SUBJECT",
            Self::To => "TO",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "arrival" => Some(Self::Arrival),
            "cc" => Some(Self::Cc),
            "date" => Some(Self::Date),
            "from" => Some(Self::From),
            "size" => Some(Self::Size),
            "subject" => Some(Self::Subject),
            "to" => Some(Self::To),
            _ => None,
        }
    }
}

/// One SORT criterion: a key, optionally reversed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortCriterion {
    /// Sort key.
    pub key: SortKey,
    /// Descending order.
    pub reverse: bool,
}

impl SortCriterion {
    /// Newest first, the default message list order.
    pub const NEWEST_FIRST: Self = Self {
        key: SortKey::Date,
        reverse: true,
    };

    /// Parses an order token such as `date` or `-date` (descending).
    ///
    /// Unknown keys fall back to [`SortCriterion::NEWEST_FIRST`].
    #[must_use]
    pub fn from_order(order: &str) -> Self {
        let (reverse, name) = order
            .strip_prefix('-')
            .map_or((false, order), |rest| (true, rest));
        SortKey::parse(name).map_or(Self::NEWEST_FIRST, |key| Self { key, reverse })
    }

    pub(crate) fn write(self, buf: &mut Vec<u8>) {
        if self.reverse {
            buf.extend_from_slice(b"REVERSE ");
        }
        buf.extend_from_slice(self.key.as_str().as_bytes());
    }
}
