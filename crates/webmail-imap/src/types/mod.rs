//! Core IMAP types.

mod capability;
mod flags;
mod identifiers;
mod mailbox;
mod namespace;
mod response_code;
mod sequence;

pub use capability::{Capability, Status};
pub use flags::{Flag, Flags};
pub use identifiers::{SeqNum, Tag, Uid, UidValidity};
pub use mailbox::{ListResponse, Mailbox, MailboxAttribute, MailboxStatus};
pub use namespace::{NamespaceEntry, Namespaces};
pub use response_code::ResponseCode;
pub use sequence::UidSet;
