//! Mail operations for the web tier.
//!
//! Every method takes the caller's credentials, borrows that user's
//! session from the [`ConnectionPool`] for the duration of the call and
//! hands it back before returning.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use webmail_imap::{
    Classification, ContentFormat, Connector, Credentials, FetchRecord, ListOptions, MailboxNode,
    MessageItems, PartDescriptor, Quota, SearchCriteria, TcpConnector, Uid,
};
use webmail_mime::charset;

use crate::config::WebmailConfig;
use crate::header::{HeaderField, HeaderRecord};
use crate::pool::ConnectionPool;
use crate::{Error, Result};

/// One row of a message list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageSummary {
    /// Message UID.
    pub uid: u32,
    /// `\Seen` is not set.
    pub unseen: bool,
    /// `\Answered` is set.
    pub answered: bool,
    /// `$Forwarded` is set.
    pub forwarded: bool,
    /// `\Flagged` is set.
    pub flagged: bool,
    /// `RFC822.SIZE` in bytes.
    pub size: u64,
    /// The message offers something for download.
    pub has_attachments: bool,
    /// Decoded overview headers.
    pub headers: HeaderRecord,
    /// Some of the server's data for this row could not be decoded; the
    /// affected fields hold their defaults.
    pub incomplete: bool,
}

impl MessageSummary {
    /// A row for a message the server answered for but nothing of which
    /// could be read.
    fn unreadable(uid: u32) -> Self {
        Self {
            uid,
            unseen: false,
            answered: false,
            forwarded: false,
            flagged: false,
            size: 0,
            has_attachments: false,
            headers: HeaderRecord::default(),
            incomplete: true,
        }
    }

    fn from_record(uid: u32, record: &FetchRecord) -> Self {
        let flags = record.flags().unwrap_or_default();
        let has_attachments = record.body_structure().is_some_and(|structure| {
            match Classification::classify(structure) {
                Ok(classification) => classification.has_attachments(),
                Err(e) => {
                    tracing::warn!(%e, uid, "unreadable body structure in list");
                    false
                }
            }
        });
        Self {
            uid,
            unseen: !flags.is_seen(),
            answered: flags.is_answered(),
            forwarded: flags.is_forwarded(),
            flagged: flags.is_flagged(),
            size: record.size().unwrap_or_default(),
            has_attachments,
            headers: HeaderRecord::from_fetch(record),
            incomplete: record.is_partial(),
        }
    }
}

/// One page of a message list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessagePage {
    /// Messages in the whole listing.
    pub total: usize,
    /// Page number, from 1.
    pub page: usize,
    /// Rows of this page, in listing order.
    pub items: Vec<MessageSummary>,
    /// Quota of the mailbox, when the server reports one.
    #[serde(skip)]
    pub quota: Option<Quota>,
}

/// A message ready for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageView {
    /// Message UID.
    pub uid: u32,
    /// Decoded headers.
    pub headers: HeaderRecord,
    /// Format of `body`; `None` for a message without a text body.
    pub format: Option<ContentFormat>,
    /// Decoded body text.
    pub body: String,
    /// Parts offered for download.
    pub attachments: Vec<PartDescriptor>,
    /// Parts referenced from the HTML body, keyed by Content-ID.
    pub inlines: BTreeMap<String, PartDescriptor>,
}

/// A downloaded part.
#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    /// What the body structure says about the part.
    pub descriptor: PartDescriptor,
    /// Payload with its transfer encoding removed.
    pub data: Vec<u8>,
}

/// High-level mail operations over pooled sessions.
#[derive(Debug)]
pub struct MailService<C: Connector> {
    pool: Arc<ConnectionPool<C>>,
    config: WebmailConfig,
}

impl MailService<TcpConnector> {
    /// A service that dials the configured server.
    #[must_use]
    pub fn connect(config: WebmailConfig) -> Self {
        let connector = TcpConnector::new(config.imap.clone());
        Self::new(connector, config)
    }
}

impl<C: Connector> MailService<C> {
    /// A service with its own pool over `connector`.
    #[must_use]
    pub fn new(connector: C, config: WebmailConfig) -> Self {
        let pool = ConnectionPool::new(connector, config.max_identities);
        Self::with_pool(Arc::new(pool), config)
    }

    /// A service sharing `pool`.
    #[must_use]
    pub const fn with_pool(pool: Arc<ConnectionPool<C>>, config: WebmailConfig) -> Self {
        Self { pool, config }
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &Arc<ConnectionPool<C>> {
        &self.pool
    }

    /// The service configuration.
    #[must_use]
    pub const fn config(&self) -> &WebmailConfig {
        &self.config
    }

    /// Lists `mailbox` sorted by `order` (`-date`, `from`, ...) and
    /// returns page `page` (from 1) of `page_size` rows.
    ///
    /// A row whose FETCH data does not fully decode is still listed,
    /// marked [`MessageSummary::incomplete`].
    ///
    /// # Errors
    ///
    /// Fails if the mailbox cannot be selected, searched or fetched.
    pub async fn list_page(
        &self,
        credentials: &Credentials,
        mailbox: &str,
        order: &str,
        filter: Option<SearchCriteria>,
        page: usize,
        page_size: usize,
    ) -> Result<MessagePage> {
        let page = page.max(1);
        let mut session = self.pool.acquire(credentials).await?;
        let total = session.messages_count(mailbox, order, filter).await?;

        let start = (page - 1).saturating_mul(page_size).min(total);
        let end = start.saturating_add(page_size).min(total);
        let uids = session.uids()[start..end].to_vec();

        let headers: Vec<&str> = self.config.overview_headers.iter().map(String::as_str).collect();
        let batch = session.fetch_overview(mailbox, &uids, &headers).await?;
        for error in batch.errors() {
            tracing::warn!(%error, mailbox, "undecodable FETCH response in list");
        }

        let items = uids
            .iter()
            .map(|&uid| {
                Uid::new(uid)
                    .and_then(|id| batch.get(id))
                    .map_or_else(|| MessageSummary::unreadable(uid), |record| {
                        MessageSummary::from_record(uid, record)
                    })
            })
            .collect();
        Ok(MessagePage {
            total,
            page,
            items,
            quota: session.quota().copied(),
        })
    }

    /// Loads a message for display and marks it seen.
    ///
    /// The body is taken in `preferred` format when the message has it,
    /// otherwise in the other one. Body parts are fetched with
    /// `BODY.PEEK`, then decoded from their transfer encoding and charset.
    ///
    /// # Errors
    ///
    /// [`Error::MessageNotFound`] for an unknown UID; otherwise IMAP
    /// failures, including a malformed body structure.
    pub async fn message_view(
        &self,
        credentials: &Credentials,
        mailbox: &str,
        uid: u32,
        preferred: ContentFormat,
    ) -> Result<MessageView> {
        let names = HeaderField::ALL
            .iter()
            .map(|field| field.header_name().to_ascii_uppercase())
            .collect();
        let mut session = self.pool.acquire(credentials).await?;
        let record = session
            .fetch_message(mailbox, uid, &MessageItems::Headers(names), false)
            .await?
            .ok_or_else(|| not_found(mailbox, uid))?;

        let headers = HeaderRecord::from_fetch(&record);
        let classification = match record.body_structure() {
            Some(structure) => {
                Classification::classify(structure).map_err(webmail_imap::Error::from)?
            }
            None => Classification::default(),
        };

        let format = classification.preferred_format(preferred);
        let parts = format
            .and_then(|format| classification.contents.get(&format))
            .map(Vec::as_slice)
            .unwrap_or_default();

        let mut body = String::new();
        if !parts.is_empty() {
            let sections: Vec<&str> = parts.iter().map(|part| part.path.as_str()).collect();
            let fetched = session
                .fetch_sections(mailbox, uid, &sections)
                .await?
                .ok_or_else(|| not_found(mailbox, uid))?;
            for part in parts {
                let Some(raw) = fetched.section(&part.path) else {
                    tracing::debug!(uid, part = %part.path, "server returned no body for part");
                    continue;
                };
                body.push_str(&decode_text(part, raw));
            }
        }

        Ok(MessageView {
            uid,
            headers,
            format,
            body,
            attachments: classification.attachments,
            inlines: classification.inlines,
        })
    }

    /// Downloads the attachment at section `part`.
    ///
    /// # Errors
    ///
    /// [`Error::PartNotFound`] when the message or the attachment is
    /// missing; [`Error::Mime`] when the payload does not decode.
    pub async fn attachment(
        &self,
        credentials: &Credentials,
        mailbox: &str,
        uid: u32,
        part: &str,
    ) -> Result<Attachment> {
        let mut session = self.pool.acquire(credentials).await?;
        let (descriptor, payload) =
            session
                .fetch_part(mailbox, uid, part)
                .await?
                .ok_or_else(|| Error::PartNotFound {
                    uid,
                    part: part.to_string(),
                })?;
        let data = descriptor.encoding.decode(&payload)?;
        Ok(Attachment { descriptor, data })
    }

    /// Downloads the inline resource with Content-ID `cid`, leaving
    /// `\Seen` alone.
    ///
    /// # Errors
    ///
    /// [`Error::PartNotFound`] when no inline part has that Content-ID.
    pub async fn inline(
        &self,
        credentials: &Credentials,
        mailbox: &str,
        uid: u32,
        cid: &str,
    ) -> Result<Attachment> {
        let missing = || Error::PartNotFound {
            uid,
            part: cid.to_string(),
        };
        let mut session = self.pool.acquire(credentials).await?;
        let record = session
            .fetch_message(mailbox, uid, &MessageItems::BodyStructure, true)
            .await?
            .ok_or_else(|| not_found(mailbox, uid))?;
        let structure = record.body_structure().ok_or_else(missing)?;
        let mut classification =
            Classification::classify(structure).map_err(webmail_imap::Error::from)?;
        let descriptor = classification.inlines.remove(cid).ok_or_else(missing)?;

        let fetched = session
            .fetch_sections(mailbox, uid, &[descriptor.path.as_str()])
            .await?
            .ok_or_else(|| not_found(mailbox, uid))?;
        let payload = fetched.section(&descriptor.path).ok_or_else(missing)?;
        let data = descriptor.encoding.decode(payload)?;
        Ok(Attachment { descriptor, data })
    }

    /// The full RFC 822 source of a message.
    ///
    /// # Errors
    ///
    /// [`Error::MessageNotFound`] for an unknown UID.
    pub async fn source(&self, credentials: &Credentials, mailbox: &str, uid: u32) -> Result<Vec<u8>> {
        let mut session = self.pool.acquire(credentials).await?;
        let record = session
            .fetch_message(mailbox, uid, &MessageItems::Source, false)
            .await?
            .ok_or_else(|| not_found(mailbox, uid))?;
        record
            .section("")
            .map(<[u8]>::to_vec)
            .ok_or_else(|| not_found(mailbox, uid))
    }

    /// The folder tree below `top` (the top level when `None`), expanded
    /// along the way to `until`. The configured special folders lead the
    /// top level.
    ///
    /// # Errors
    ///
    /// Fails if the server refuses the listing.
    pub async fn folders(
        &self,
        credentials: &Credentials,
        top: Option<&str>,
        until: Option<&str>,
        unseen: bool,
    ) -> Result<Vec<MailboxNode>> {
        let mut options = ListOptions::new()
            .with_unseen(unseen)
            .pinned(self.config.pinned());
        if let Some(top) = top {
            options = options.top(top);
        }
        if let Some(until) = until {
            options = options.until(until);
        }
        let mut session = self.pool.acquire(credentials).await?;
        Ok(session.mailboxes(&options).await?)
    }

    /// Unseen messages in `mailbox`.
    ///
    /// # Errors
    ///
    /// Fails if the server refuses `STATUS`.
    pub async fn unseen_count(&self, credentials: &Credentials, mailbox: &str) -> Result<u32> {
        let mut session = self.pool.acquire(credentials).await?;
        Ok(session.unseen_count(mailbox).await?)
    }

    /// Sets `\Seen` on `uids`.
    ///
    /// # Errors
    ///
    /// [`Error::Operation`] with the server's reason when it refuses.
    pub async fn mark_read(&self, credentials: &Credentials, mailbox: &str, uids: &[u32]) -> Result<()> {
        let mut session = self.pool.acquire(credentials).await?;
        session.mark_read(mailbox, uids).await.map_err(Error::from_refusal)
    }

    /// Clears `\Seen` on `uids`.
    ///
    /// # Errors
    ///
    /// [`Error::Operation`] with the server's reason when it refuses.
    pub async fn mark_unread(&self, credentials: &Credentials, mailbox: &str, uids: &[u32]) -> Result<()> {
        let mut session = self.pool.acquire(credentials).await?;
        session.mark_unread(mailbox, uids).await.map_err(Error::from_refusal)
    }

    /// Sets `\Flagged` on `uids`.
    ///
    /// # Errors
    ///
    /// [`Error::Operation`] with the server's reason when it refuses.
    pub async fn mark_flagged(&self, credentials: &Credentials, mailbox: &str, uids: &[u32]) -> Result<()> {
        let mut session = self.pool.acquire(credentials).await?;
        session.mark_flagged(mailbox, uids).await.map_err(Error::from_refusal)
    }

    /// Clears `\Flagged` on `uids`.
    ///
    /// # Errors
    ///
    /// [`Error::Operation`] with the server's reason when it refuses.
    pub async fn mark_unflagged(
        &self,
        credentials: &Credentials,
        mailbox: &str,
        uids: &[u32],
    ) -> Result<()> {
        let mut session = self.pool.acquire(credentials).await?;
        session.mark_unflagged(mailbox, uids).await.map_err(Error::from_refusal)
    }

    /// Records that the message was replied to.
    ///
    /// # Errors
    ///
    /// [`Error::Operation`] with the server's reason when it refuses.
    pub async fn mark_answered(&self, credentials: &Credentials, mailbox: &str, uid: u32) -> Result<()> {
        let mut session = self.pool.acquire(credentials).await?;
        session.mark_answered(mailbox, uid).await.map_err(Error::from_refusal)
    }

    /// Records that the message was forwarded.
    ///
    /// # Errors
    ///
    /// [`Error::Operation`] with the server's reason when it refuses.
    pub async fn mark_forwarded(&self, credentials: &Credentials, mailbox: &str, uid: u32) -> Result<()> {
        let mut session = self.pool.acquire(credentials).await?;
        session.mark_forwarded(mailbox, uid).await.map_err(Error::from_refusal)
    }

    /// Moves `uids` from `source` to `target`.
    ///
    /// # Errors
    ///
    /// [`Error::Operation`] with the server's reason when it refuses.
    pub async fn move_messages(
        &self,
        credentials: &Credentials,
        uids: &[u32],
        source: &str,
        target: &str,
    ) -> Result<()> {
        let mut session = self.pool.acquire(credentials).await?;
        session
            .move_messages(uids, source, target)
            .await
            .map_err(Error::from_refusal)
    }

    /// Moves `uids` to the configured trash folder.
    ///
    /// # Errors
    ///
    /// [`Error::Operation`] with the server's reason when it refuses.
    pub async fn trash_messages(&self, credentials: &Credentials, mailbox: &str, uids: &[u32]) -> Result<()> {
        let trash = &self.config.folders.trash;
        self.move_messages(credentials, uids, mailbox, trash).await
    }

    /// Deletes every message of the configured trash folder.
    ///
    /// # Errors
    ///
    /// [`Error::Operation`] with the server's reason when it refuses.
    pub async fn empty_trash(&self, credentials: &Credentials) -> Result<()> {
        let mut session = self.pool.acquire(credentials).await?;
        session
            .empty(&self.config.folders.trash)
            .await
            .map_err(Error::from_refusal)
    }

    /// Expunges messages flagged `\Deleted` in `mailbox`.
    ///
    /// # Errors
    ///
    /// [`Error::Operation`] with the server's reason when it refuses.
    pub async fn compact(&self, credentials: &Credentials, mailbox: &str) -> Result<()> {
        let mut session = self.pool.acquire(credentials).await?;
        session.compact(mailbox).await.map_err(Error::from_refusal)
    }

    /// Stores a message, such as a draft, in `mailbox`.
    ///
    /// # Errors
    ///
    /// [`Error::Operation`] with the server's reason when it refuses.
    pub async fn append(&self, credentials: &Credentials, mailbox: &str, message: &[u8]) -> Result<()> {
        let mut session = self.pool.acquire(credentials).await?;
        session.append(mailbox, message).await.map_err(Error::from_refusal)
    }

    /// Creates folder `name`, below `parent` when given.
    ///
    /// # Errors
    ///
    /// [`Error::Operation`] with the server's reason when it refuses.
    pub async fn create_folder(
        &self,
        credentials: &Credentials,
        name: &str,
        parent: Option<&str>,
    ) -> Result<()> {
        let mut session = self.pool.acquire(credentials).await?;
        session.create_folder(name, parent).await.map_err(Error::from_refusal)
    }

    /// Renames folder `from` to `to`.
    ///
    /// # Errors
    ///
    /// [`Error::Operation`] with the server's reason when it refuses.
    pub async fn rename_folder(&self, credentials: &Credentials, from: &str, to: &str) -> Result<()> {
        let mut session = self.pool.acquire(credentials).await?;
        session.rename_folder(from, to).await.map_err(Error::from_refusal)
    }

    /// Deletes folder `name`.
    ///
    /// # Errors
    ///
    /// [`Error::Operation`] with the server's reason when it refuses.
    pub async fn delete_folder(&self, credentials: &Credentials, name: &str) -> Result<()> {
        let mut session = self.pool.acquire(credentials).await?;
        session.delete_folder(name).await.map_err(Error::from_refusal)
    }

    /// Ends the user's pooled session.
    ///
    /// # Errors
    ///
    /// Fails on I/O errors during `LOGOUT`.
    pub async fn logout(&self, username: &str) -> Result<()> {
        self.pool.logout(username).await
    }
}

fn not_found(mailbox: &str, uid: u32) -> Error {
    Error::MessageNotFound {
        mailbox: mailbox.to_string(),
        uid,
    }
}

/// Removes the transfer encoding and decodes the charset. A payload that
/// is not valid in its encoding is shown as it came.
fn decode_text(part: &PartDescriptor, raw: &[u8]) -> String {
    match part.encoding.decode(raw) {
        Ok(bytes) => charset::decode_lossy(&bytes, part.charset()),
        Err(e) => {
            tracing::warn!(%e, part = %part.path, "undecodable body part");
            charset::decode_lossy(raw, part.charset())
        }
    }
}
