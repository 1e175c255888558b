//! IMAP command builder.
//!
//! Every message-level command goes out in its `UID` form: the web tier
//! addresses messages by UID, and UIDs stay valid across expunges.

mod serialize;
mod tag_generator;
mod types;

use crate::Result;
use crate::types::{Flag, Mailbox, UidSet};

pub use tag_generator::TagGenerator;
pub use types::{
    FetchAttribute, SearchCriteria, SortCriterion, SortKey, StatusAttribute, StoreAction,
};

use serialize::{
    write_astring, write_fetch_items, write_list_pattern, write_mailbox, write_search_criteria,
    write_store_action,
};

/// IMAP command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    // Any State Commands
    /// CAPABILITY command.
    Capability,
    /// NOOP command.
    Noop,
    /// LOGOUT command.
    Logout,

    // Not Authenticated State Commands
    /// STARTTLS command.
    StartTls,
    /// LOGIN command.
    Login {
        /// Username.
        username: String,
        /// Password.
        password: String,
    },

    // Authenticated State Commands
    /// NAMESPACE command (RFC 2342).
    Namespace,
    /// SELECT command.
    Select {
        /// Mailbox to select.
        mailbox: Mailbox,
    },
    /// EXAMINE command (read-only SELECT).
    Examine {
        /// Mailbox to examine.
        mailbox: Mailbox,
    },
    /// CREATE command.
    Create {
        /// Mailbox to create.
        mailbox: Mailbox,
    },
    /// DELETE command.
    Delete {
        /// Mailbox to delete.
        mailbox: Mailbox,
    },
    /// RENAME command.
    Rename {
        /// Current mailbox name.
        from: Mailbox,
        /// New mailbox name.
        to: Mailbox,
    },
    /// Plain LIST command.
    List {
        /// Reference name.
        reference: String,
        /// Mailbox pattern.
        pattern: String,
    },
    /// LIST with RFC 5258 return options, e.g.
    /// `LIST "" "%" RETURN (CHILDREN STATUS (MESSAGES))`.
    ListExtended {
        /// Reference name.
        reference: String,
        /// Mailbox pattern.
        pattern: String,
        /// Request `\HasChildren`/`\HasNoChildren`.
        children: bool,
        /// Status items returned alongside each mailbox (RFC 5819).
        status: Vec<StatusAttribute>,
    },
    /// STATUS command.
    Status {
        /// Mailbox name.
        mailbox: Mailbox,
        /// Status items to request.
        items: Vec<StatusAttribute>,
    },
    /// GETQUOTAROOT command (RFC 2087).
    GetQuotaRoot {
        /// Mailbox whose quota roots are wanted.
        mailbox: Mailbox,
    },
    /// APPEND command. Only the command line is serialized; the message
    /// follows once the server sends a continuation.
    Append {
        /// Target mailbox.
        mailbox: Mailbox,
        /// Flags to set.
        flags: Vec<Flag>,
        /// Message data.
        message: Vec<u8>,
    },

    // Selected State Commands
    /// CHECK command.
    Check,
    /// EXPUNGE command.
    Expunge,
    /// UID SEARCH command.
    UidSearch {
        /// Charset of the search strings.
        charset: Option<String>,
        /// Search criteria.
        criteria: SearchCriteria,
    },
    /// UID SORT command (RFC 5256).
    UidSort {
        /// Sort criteria, most significant first.
        keys: Vec<SortCriterion>,
        /// Charset of the search strings.
        charset: String,
        /// Search criteria.
        criteria: SearchCriteria,
    },
    /// UID FETCH command.
    UidFetch {
        /// UIDs to fetch.
        uids: UidSet,
        /// Items to fetch.
        items: Vec<FetchAttribute>,
    },
    /// UID STORE command.
    UidStore {
        /// UIDs to modify.
        uids: UidSet,
        /// Store action.
        action: StoreAction,
        /// Silent mode (no FETCH response).
        silent: bool,
    },
    /// UID COPY command.
    UidCopy {
        /// UIDs to copy.
        uids: UidSet,
        /// Target mailbox.
        mailbox: Mailbox,
    },
}

impl Command {
    /// Serializes the command to bytes with the given tag.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`](crate::Error::InvalidArgument) when a
    /// quoted argument contains CR, LF or NUL.
    #[allow(clippy::too_many_lines)]
    pub fn serialize(&self, tag: &str) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        buf.extend_from_slice(tag.as_bytes());
        buf.push(b' ');

        match self {
            Self::Capability => buf.extend_from_slice(b"CAPABILITY"),
            Self::Noop => buf.extend_from_slice(b"NOOP"),
            Self::Logout => buf.extend_from_slice(b"LOGOUT"),
            Self::StartTls => buf.extend_from_slice(b"STARTTLS"),
            Self::Namespace => buf.extend_from_slice(b"NAMESPACE"),
            Self::Check => buf.extend_from_slice(b"CHECK"),
            Self::Expunge => buf.extend_from_slice(b"EXPUNGE"),

            Self::Login { username, password } => {
                buf.extend_from_slice(b"LOGIN ");
                write_astring(&mut buf, username)?;
                buf.push(b' ');
                write_astring(&mut buf, password)?;
            }

            Self::Select { mailbox } => {
                buf.extend_from_slice(b"SELECT ");
                write_mailbox(&mut buf, mailbox)?;
            }

            Self::Examine { mailbox } => {
                buf.extend_from_slice(b"EXAMINE ");
                write_mailbox(&mut buf, mailbox)?;
            }

            Self::Create { mailbox } => {
                buf.extend_from_slice(b"CREATE ");
                write_mailbox(&mut buf, mailbox)?;
            }

            Self::Delete { mailbox } => {
                buf.extend_from_slice(b"DELETE ");
                write_mailbox(&mut buf, mailbox)?;
            }

            Self::Rename { from, to } => {
                buf.extend_from_slice(b"RENAME ");
                write_mailbox(&mut buf, from)?;
                buf.push(b' ');
                write_mailbox(&mut buf, to)?;
            }

            Self::List { reference, pattern } => {
                buf.extend_from_slice(b"LIST ");
                write_list_pattern(&mut buf, reference)?;
                buf.push(b' ');
                write_list_pattern(&mut buf, pattern)?;
            }

            Self::ListExtended {
                reference,
                pattern,
                children,
                status,
            } => {
                buf.extend_from_slice(b"LIST ");
                write_list_pattern(&mut buf, reference)?;
                buf.push(b' ');
                write_list_pattern(&mut buf, pattern)?;

                let mut options = Vec::new();
                if *children {
                    options.push("CHILDREN".to_string());
                }
                if !status.is_empty() {
                    let items: Vec<&str> = status.iter().map(|item| item.as_str()).collect();
                    options.push(format!("STATUS ({})", items.join(" ")));
                }
                if !options.is_empty() {
                    buf.extend_from_slice(format!(" RETURN ({})", options.join(" ")).as_bytes());
                }
            }

            Self::Status { mailbox, items } => {
                buf.extend_from_slice(b"STATUS ");
                write_mailbox(&mut buf, mailbox)?;
                buf.extend_from_slice(b" (");
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        buf.push(b' ');
                    }
                    buf.extend_from_slice(item.as_str().as_bytes());
                }
                buf.push(b')');
            }

            Self::GetQuotaRoot { mailbox } => {
                buf.extend_from_slice(b"GETQUOTAROOT ");
                write_mailbox(&mut buf, mailbox)?;
            }

            Self::Append {
                mailbox,
                flags,
                message,
            } => {
                buf.extend_from_slice(b"APPEND ");
                write_mailbox(&mut buf, mailbox)?;
                if !flags.is_empty() {
                    buf.extend_from_slice(b" (");
                    for (i, flag) in flags.iter().enumerate() {
                        if i > 0 {
                            buf.push(b' ');
                        }
                        buf.extend_from_slice(flag.as_str().as_bytes());
                    }
                    buf.push(b')');
                }
                buf.extend_from_slice(format!(" {{{}}}", message.len()).as_bytes());
            }

            Self::UidSearch { charset, criteria } => {
                buf.extend_from_slice(b"UID SEARCH ");
                if let Some(charset) = charset {
                    buf.extend_from_slice(b"CHARSET ");
                    write_astring(&mut buf, charset)?;
                    buf.push(b' ');
                }
                write_search_criteria(&mut buf, criteria)?;
            }

            Self::UidSort {
                keys,
                charset,
                criteria,
            } => {
                buf.extend_from_slice(b"UID SORT (");
                for (i, key) in keys.iter().enumerate() {
                    if i > 0 {
                        buf.push(b' ');
                    }
                    key.write(&mut buf);
                }
                buf.extend_from_slice(b") ");
                write_astring(&mut buf, charset)?;
                buf.push(b' ');
                write_search_criteria(&mut buf, criteria)?;
            }

            Self::UidFetch { uids, items } => {
                buf.extend_from_slice(b"UID FETCH ");
                buf.extend_from_slice(uids.to_string().as_bytes());
                buf.push(b' ');
                write_fetch_items(&mut buf, items);
            }

            Self::UidStore {
                uids,
                action,
                silent,
            } => {
                buf.extend_from_slice(b"UID STORE ");
                buf.extend_from_slice(uids.to_string().as_bytes());
                buf.push(b' ');
                write_store_action(&mut buf, action, *silent);
            }

            Self::UidCopy { uids, mailbox } => {
                buf.extend_from_slice(b"UID COPY ");
                buf.extend_from_slice(uids.to_string().as_bytes());
                buf.push(b' ');
                write_mailbox(&mut buf, mailbox)?;
            }
        }

        buf.extend_from_slice(b"\r\n");
        Ok(buf)
    }

    /// Command name for logging. Never includes arguments.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Capability => "CAPABILITY",
            Self::Noop => "NOOP",
            Self::Logout => "LOGOUT",
            Self::StartTls => "STARTTLS",
            Self::Login { .. } => "LOGIN",
            Self::Namespace => "NAMESPACE",
            Self::Select { .. } => "SELECT",
            Self::Examine { .. } => "EXAMINE",
            Self::Create { .. } => "CREATE",
            Self::Delete { .. } => "DELETE",
            Self::Rename { .. } => "RENAME",
            Self::List { .. } | Self::ListExtended { .. } => "LIST",
            Self::Status { .. } => "STATUS",
            Self::GetQuotaRoot { .. } => "GETQUOTAROOT",
            Self::Append { .. } => "APPEND",
            Self::Check => "CHECK",
            Self::Expunge => "EXPUNGE",
            Self::UidSearch { .. } => "UID SEARCH",
            Self::UidSort { .. } => "UID SORT",
            Self::UidFetch { .. } => "UID FETCH",
            Self::UidStore { .. } => "UID STORE",
            Self::UidCopy { .. } => "UID COPY",
        }
    }
}
