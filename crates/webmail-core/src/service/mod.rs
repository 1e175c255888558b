//! Services consumed by the web tier.

pub mod mail;

pub use mail::{Attachment, MailService, MessagePage, MessageSummary, MessageView};
