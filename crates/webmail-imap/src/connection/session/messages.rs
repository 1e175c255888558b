//! Message-level operations: listing, fetching, flags, moves.

use super::Session;
use crate::bodystructure::{Classification, PartDescriptor};
use crate::command::{FetchAttribute, SearchCriteria, SortCriterion, StatusAttribute, StoreAction};
use crate::connection::connector::Connector;
use crate::parser::{FetchBatch, FetchRecord, StatusItem};
use crate::types::{Capability, Flag, Mailbox, Uid, UidSet};
use crate::Result;

/// Headers fetched for a message list when the caller names none.
pub const OVERVIEW_HEADERS: [&str; 5] = ["DATE", "FROM", "TO", "CC", "SUBJECT"];

/// What [`Session::fetch_message`] retrieves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageItems {
    /// `BODYSTRUCTURE` only.
    BodyStructure,
    /// The full source, `BODY[]`.
    Source,
    /// `BODYSTRUCTURE` plus the named header fields.
    Headers(Vec<String>),
}

fn uid_set(uids: &[u32]) -> Option<UidSet> {
    UidSet::from_uids(uids.iter().copied().filter_map(Uid::new))
}

impl<C: Connector> Session<C> {
    /// Lists the non-deleted messages of `mailbox` and returns how many
    /// there are. The UIDs are kept, in display order, for
    /// [`Session::uids`].
    ///
    /// `order` is a sort token such as `-date`. Without the `SORT`
    /// capability the server's UID order is reversed instead. The mailbox
    /// quota is refreshed afterwards.
    ///
    /// # Errors
    ///
    /// Fails if the mailbox cannot be selected or searched.
    pub async fn messages_count(
        &mut self,
        mailbox: &str,
        order: &str,
        filter: Option<SearchCriteria>,
    ) -> Result<usize> {
        self.select(mailbox, false, false).await?;

        let not_deleted = SearchCriteria::Not(Box::new(SearchCriteria::Deleted));
        let (criteria, charset) = match filter {
            Some(filter) => (SearchCriteria::And(vec![not_deleted, filter]), Some("UTF-8")),
            None => (not_deleted, None),
        };

        let result = if self.has_capability(&Capability::Sort) {
            let keys = [SortCriterion::from_order(order)];
            self.connected()?.uid_sort(&keys, "UTF-8", criteria).await
        } else {
            self.connected()?
                .uid_search(charset, criteria)
                .await
                .map(|mut uids| {
                    uids.reverse();
                    uids
                })
        };
        self.uids = self.track(result)?;
        tracing::debug!(mailbox, count = self.uids.len(), "listed messages");

        self.refresh_quota(mailbox).await;
        Ok(self.uids.len())
    }

    /// Fetches what a message list shows: UID, flags, size, structure and
    /// the given header fields ([`OVERVIEW_HEADERS`] when empty).
    ///
    /// # Errors
    ///
    /// Fails if the mailbox cannot be selected or the fetch is refused.
    pub async fn fetch_overview(
        &mut self,
        mailbox: &str,
        uids: &[u32],
        headers: &[&str],
    ) -> Result<FetchBatch> {
        let Some(set) = uid_set(uids) else {
            return Ok(FetchBatch::default());
        };
        self.select(mailbox, true, false).await?;

        let headers = if headers.is_empty() { &OVERVIEW_HEADERS[..] } else { headers };
        let items = [
            FetchAttribute::Uid,
            FetchAttribute::Flags,
            FetchAttribute::BodyStructure,
            FetchAttribute::Rfc822Size,
            FetchAttribute::header_fields(headers),
        ];
        let result = self.connected()?.uid_fetch(&set, &items).await;
        self.track(result)
    }

    /// Fetches one message. With `read_only` the mailbox is examined and
    /// headers are peeked, so `\Seen` is left alone.
    ///
    /// Returns `None` when the server has no message with that UID.
    ///
    /// # Errors
    ///
    /// Fails if the mailbox cannot be selected or the fetch is refused.
    pub async fn fetch_message(
        &mut self,
        mailbox: &str,
        uid: u32,
        what: &MessageItems,
        read_only: bool,
    ) -> Result<Option<FetchRecord>> {
        let Some(set) = uid_set(&[uid]) else {
            return Ok(None);
        };
        self.select(mailbox, read_only, false).await?;

        let mut items = vec![FetchAttribute::Uid];
        match what {
            MessageItems::BodyStructure => items.push(FetchAttribute::BodyStructure),
            MessageItems::Source => items.push(FetchAttribute::Body {
                section: String::new(),
                peek: false,
            }),
            MessageItems::Headers(names) => {
                items.push(FetchAttribute::BodyStructure);
                items.push(FetchAttribute::Body {
                    section: FetchAttribute::header_section(names),
                    peek: read_only,
                });
            }
        }

        let result = self.connected()?.uid_fetch(&set, &items).await;
        Ok(self.track(result)?.into_map().remove(&uid))
    }

    /// Fetches the body of one part by section path (`"2"`, `"1.3"`).
    ///
    /// The part is looked up among the message's attachments; content and
    /// inline parts are not returned. The payload is still in its transfer
    /// encoding.
    ///
    /// # Errors
    ///
    /// Fails if the fetch is refused or the body structure is malformed.
    pub async fn fetch_part(
        &mut self,
        mailbox: &str,
        uid: u32,
        part: &str,
    ) -> Result<Option<(PartDescriptor, Vec<u8>)>> {
        let Some(set) = uid_set(&[uid]) else {
            return Ok(None);
        };
        self.select(mailbox, false, false).await?;

        let items = [
            FetchAttribute::Uid,
            FetchAttribute::BodyStructure,
            FetchAttribute::Body {
                section: part.to_string(),
                peek: false,
            },
        ];
        let result = self.connected()?.uid_fetch(&set, &items).await;
        let batch = self.track(result)?;

        let Some(record) = batch.into_map().remove(&uid) else {
            return Ok(None);
        };
        let Some(structure) = record.body_structure() else {
            return Ok(None);
        };
        let classification = Classification::classify(structure)?;
        let Some(descriptor) = classification.find_attachment(part) else {
            return Ok(None);
        };
        let payload = record.section(part).unwrap_or_default().to_vec();
        Ok(Some((descriptor.clone(), payload)))
    }

    /// Fetches part bodies with `BODY.PEEK`, leaving `\Seen` alone.
    ///
    /// Returns `None` when the server has no message with that UID.
    ///
    /// # Errors
    ///
    /// Fails if the mailbox cannot be examined or the fetch is refused.
    pub async fn fetch_sections(
        &mut self,
        mailbox: &str,
        uid: u32,
        sections: &[&str],
    ) -> Result<Option<FetchRecord>> {
        let Some(set) = uid_set(&[uid]) else {
            return Ok(None);
        };
        self.select(mailbox, true, false).await?;

        let mut items = vec![FetchAttribute::Uid];
        items.extend(sections.iter().map(|section| FetchAttribute::peek(*section)));
        let result = self.connected()?.uid_fetch(&set, &items).await;
        Ok(self.track(result)?.into_map().remove(&uid))
    }

    /// Number of unseen messages in `mailbox`, via `STATUS (UNSEEN)`.
    ///
    /// # Errors
    ///
    /// Fails if the server refuses the `STATUS`.
    pub async fn unseen_count(&mut self, mailbox: &str) -> Result<u32> {
        let mailbox = Mailbox::new(mailbox);
        let result = self
            .connected()?
            .status(&mailbox, &[StatusAttribute::Unseen])
            .await;
        let items = self.track(result)?;
        Ok(items
            .into_iter()
            .find_map(|item| match item {
                StatusItem::Unseen(n) => Some(n),
                _ => None,
            })
            .unwrap_or(0))
    }

    /// Marks messages `\Seen`.
    ///
    /// # Errors
    ///
    /// Fails if the mailbox cannot be selected or the store is refused.
    pub async fn mark_read(&mut self, mailbox: &str, uids: &[u32]) -> Result<()> {
        self.store(mailbox, uids, StoreAction::AddFlags(vec![Flag::Seen])).await
    }

    /// Clears `\Seen`.
    ///
    /// # Errors
    ///
    /// Fails if the mailbox cannot be selected or the store is refused.
    pub async fn mark_unread(&mut self, mailbox: &str, uids: &[u32]) -> Result<()> {
        self.store(mailbox, uids, StoreAction::RemoveFlags(vec![Flag::Seen])).await
    }

    /// Marks messages `\Flagged`.
    ///
    /// # Errors
    ///
    /// Fails if the mailbox cannot be selected or the store is refused.
    pub async fn mark_flagged(&mut self, mailbox: &str, uids: &[u32]) -> Result<()> {
        self.store(mailbox, uids, StoreAction::AddFlags(vec![Flag::Flagged])).await
    }

    /// Clears `\Flagged`.
    ///
    /// # Errors
    ///
    /// Fails if the mailbox cannot be selected or the store is refused.
    pub async fn mark_unflagged(&mut self, mailbox: &str, uids: &[u32]) -> Result<()> {
        self.store(mailbox, uids, StoreAction::RemoveFlags(vec![Flag::Flagged])).await
    }

    /// Marks a message `\Answered`.
    ///
    /// # Errors
    ///
    /// Fails if the mailbox cannot be selected or the store is refused.
    pub async fn mark_answered(&mut self, mailbox: &str, uid: u32) -> Result<()> {
        self.store(mailbox, &[uid], StoreAction::AddFlags(vec![Flag::Answered])).await
    }

    /// Marks a message `$Forwarded`.
    ///
    /// # Errors
    ///
    /// Fails if the mailbox cannot be selected or the store is refused.
    pub async fn mark_forwarded(&mut self, mailbox: &str, uid: u32) -> Result<()> {
        self.store(mailbox, &[uid], StoreAction::AddFlags(vec![Flag::Forwarded])).await
    }

    /// Moves messages by copying them to `target` and marking the
    /// originals `\Deleted \Seen`. Not atomic: if the second step fails
    /// the messages exist in both mailboxes.
    ///
    /// # Errors
    ///
    /// Fails if either step is refused.
    pub async fn move_messages(&mut self, uids: &[u32], source: &str, target: &str) -> Result<()> {
        let Some(set) = uid_set(uids) else {
            return Ok(());
        };
        self.select(source, false, false).await?;

        let target = Mailbox::new(target);
        let result = self.connected()?.uid_copy(&set, &target).await;
        self.track(result)?;

        let action = StoreAction::AddFlags(vec![Flag::Deleted, Flag::Seen]);
        let result = self.connected()?.uid_store(&set, action).await;
        self.track(result)?;
        tracing::info!(count = uids.len(), target = %target, "moved messages");
        Ok(())
    }

    /// Deletes every message in `mailbox` and expunges.
    ///
    /// # Errors
    ///
    /// Fails if any step is refused.
    pub async fn empty(&mut self, mailbox: &str) -> Result<()> {
        self.select(mailbox, false, false).await?;
        let result = self.connected()?.uid_search(None, SearchCriteria::All).await;
        let uids = self.track(result)?;
        let Some(set) = uid_set(&uids) else {
            return Ok(());
        };

        let result = self
            .connected()?
            .uid_store(&set, StoreAction::AddFlags(vec![Flag::Deleted]))
            .await;
        self.track(result)?;
        let result = self.connected()?.expunge().await;
        self.track(result)?;
        tracing::info!(mailbox, count = uids.len(), "emptied mailbox");
        Ok(())
    }

    /// Expunges `mailbox`.
    ///
    /// # Errors
    ///
    /// Fails if the mailbox cannot be selected or `EXPUNGE` is refused.
    pub async fn compact(&mut self, mailbox: &str) -> Result<()> {
        self.select(mailbox, false, false).await?;
        let result = self.connected()?.expunge().await;
        self.track(result)
    }

    /// Appends a message to `mailbox`, flagged `\Seen`.
    ///
    /// # Errors
    ///
    /// Fails if the server refuses the message.
    pub async fn append(&mut self, mailbox: &str, message: &[u8]) -> Result<()> {
        let mailbox = Mailbox::new(mailbox);
        let result = self.connected()?.append(&mailbox, &[Flag::Seen], message).await;
        self.track(result)
    }

    async fn store(&mut self, mailbox: &str, uids: &[u32], action: StoreAction) -> Result<()> {
        let Some(set) = uid_set(uids) else {
            return Ok(());
        };
        self.select(mailbox, false, false).await?;
        let result = self.connected()?.uid_store(&set, action).await;
        self.track(result)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::super::tests::{login_script, open};
    use crate::Error;
    use crate::types::Uid;

    #[tokio::test]
    async fn test_messages_count_sorts_and_refreshes_quota() {
        let mut script = login_script("SORT QUOTA");
        script
            .write(b"A0002 SELECT \"INBOX\"\r\n")
            .read(b"A0002 OK [READ-WRITE] done\r\n")
            .write(b"A0003 UID SORT (REVERSE DATE) UTF-8 NOT DELETED\r\n")
            .read(b"* SORT 12 9 4\r\n")
            .read(b"A0003 OK sorted\r\n")
            .write(b"A0004 GETQUOTAROOT \"INBOX\"\r\n")
            .read(b"* QUOTAROOT INBOX \"\"\r\n")
            .read(b"* QUOTA \"\" (STORAGE 500 1000)\r\n")
            .read(b"A0004 OK done\r\n");
        let mut session = open(vec![script]).await;

        let count = session.messages_count("INBOX", "-date", None).await.unwrap();
        assert_eq!(count, 3);
        assert_eq!(session.uids(), &[12, 9, 4]);
        assert_eq!(session.quota().unwrap().usage, 50);
    }

    #[tokio::test]
    async fn test_messages_count_without_sort_reverses_search() {
        let mut script = login_script("UIDPLUS");
        script
            .write(b"A0002 SELECT \"Archive\"\r\n")
            .read(b"A0002 OK [READ-WRITE] done\r\n")
            .write(b"A0003 UID SEARCH CHARSET UTF-8 NOT DELETED FROM \"bob\"\r\n")
            .read(b"* SEARCH 3 5 8\r\n")
            .read(b"A0003 OK done\r\n");
        let mut session = open(vec![script]).await;

        let filter = crate::command::SearchCriteria::filter("bob", &["from"]);
        let count = session.messages_count("Archive", "date", filter).await.unwrap();
        assert_eq!(count, 3);
        assert_eq!(session.uids(), &[8, 5, 3]);
        assert!(session.quota().is_none());
    }

    #[tokio::test]
    async fn test_fetch_overview() {
        let mut script = login_script("SORT");
        script
            .write(b"A0002 EXAMINE \"INBOX\"\r\n")
            .read(b"A0002 OK [READ-ONLY] done\r\n")
            .write(
                b"A0003 UID FETCH 4,9 (UID FLAGS BODYSTRUCTURE RFC822.SIZE \
                  BODY.PEEK[HEADER.FIELDS (DATE FROM TO CC SUBJECT)])\r\n",
            )
            .read(b"* 1 FETCH (UID 4 FLAGS (\\Seen) RFC822.SIZE 120 BODYSTRUCTURE (\"TEXT\" \"PLAIN\" NIL NIL NIL \"7BIT\" 5 1) BODY[HEADER.FIELDS (DATE FROM TO CC SUBJECT)] {15}\r\n")
            .read(b"Subject: hi\r\n\r\n)\r\n")
            .read(b"* 2 FETCH (UID 9 FLAGS () RFC822.SIZE 80)\r\n")
            .read(b"A0003 OK done\r\n");
        let mut session = open(vec![script]).await;

        let batch = session.fetch_overview("INBOX", &[9, 4], &[]).await.unwrap();
        assert_eq!(batch.len(), 2);
        let first = batch.get(Uid::new(4).unwrap()).unwrap();
        assert_eq!(first.size(), Some(120));
        assert_eq!(
            first.section("HEADER.FIELDS (DATE FROM TO CC SUBJECT)"),
            Some(&b"Subject: hi\r\n\r\n"[..])
        );
    }

    #[tokio::test]
    async fn test_move_copies_then_marks_deleted() {
        let mut script = login_script("SORT");
        script
            .write(b"A0002 SELECT \"INBOX\"\r\n")
            .read(b"A0002 OK [READ-WRITE] done\r\n")
            .write(b"A0003 UID COPY 3:5 \"Trash\"\r\n")
            .read(b"A0003 OK copied\r\n")
            .write(b"A0004 UID STORE 3:5 +FLAGS.SILENT (\\Deleted \\Seen)\r\n")
            .read(b"A0004 OK stored\r\n");
        let mut session = open(vec![script]).await;

        session.move_messages(&[3, 4, 5], "INBOX", "Trash").await.unwrap();
    }

    #[tokio::test]
    async fn test_refused_copy_is_reported() {
        let mut script = login_script("SORT");
        script
            .write(b"A0002 SELECT \"INBOX\"\r\n")
            .read(b"A0002 OK [READ-WRITE] done\r\n")
            .write(b"A0003 UID COPY 3 \"Nowhere\"\r\n")
            .read(b"A0003 NO [TRYCREATE] no such mailbox\r\n");
        let mut session = open(vec![script]).await;

        let err = session.move_messages(&[3], "INBOX", "Nowhere").await.unwrap_err();
        assert!(matches!(err, Error::No(_)));
    }

    #[tokio::test]
    async fn test_empty_mailbox() {
        let mut script = login_script("SORT");
        script
            .write(b"A0002 SELECT \"Trash\"\r\n")
            .read(b"A0002 OK [READ-WRITE] done\r\n")
            .write(b"A0003 UID SEARCH ALL\r\n")
            .read(b"* SEARCH 1 2 7\r\n")
            .read(b"A0003 OK done\r\n")
            .write(b"A0004 UID STORE 1:2,7 +FLAGS.SILENT (\\Deleted)\r\n")
            .read(b"A0004 OK done\r\n")
            .write(b"A0005 EXPUNGE\r\n")
            .read(b"* 3 EXPUNGE\r\n")
            .read(b"A0005 OK done\r\n");
        let mut session = open(vec![script]).await;

        session.empty("Trash").await.unwrap();
    }

    #[tokio::test]
    async fn test_unseen_count_and_flags() {
        let mut script = login_script("SORT");
        script
            .write(b"A0002 STATUS \"INBOX\" (UNSEEN)\r\n")
            .read(b"* STATUS INBOX (UNSEEN 4)\r\n")
            .read(b"A0002 OK done\r\n")
            .write(b"A0003 SELECT \"INBOX\"\r\n")
            .read(b"A0003 OK [READ-WRITE] done\r\n")
            .write(b"A0004 UID STORE 8 -FLAGS.SILENT (\\Seen)\r\n")
            .read(b"A0004 OK done\r\n")
            .write(b"A0005 UID STORE 8 +FLAGS.SILENT ($Forwarded)\r\n")
            .read(b"A0005 OK done\r\n");
        let mut session = open(vec![script]).await;

        assert_eq!(session.unseen_count("INBOX").await.unwrap(), 4);
        session.mark_unread("INBOX", &[8]).await.unwrap();
        session.mark_forwarded("INBOX", 8).await.unwrap();
    }

    #[tokio::test]
    async fn test_fetch_part_returns_attachment() {
        let mut script = login_script("SORT");
        script
            .write(b"A0002 SELECT \"INBOX\"\r\n")
            .read(b"A0002 OK [READ-WRITE] done\r\n")
            .write(b"A0003 UID FETCH 7 (UID BODYSTRUCTURE BODY[2])\r\n")
            .read(
                b"* 1 FETCH (UID 7 BODYSTRUCTURE ((\"TEXT\" \"PLAIN\" (\"CHARSET\" \"utf-8\") NIL NIL \"7BIT\" 2 1 NIL NIL NIL NIL)\
                  (\"APPLICATION\" \"PDF\" (\"NAME\" \"a.pdf\") NIL NIL \"BASE64\" 4 NIL NIL NIL NIL) \"MIXED\") BODY[2] {4}\r\n",
            )
            .read(b"QUJD)\r\n")
            .read(b"A0003 OK done\r\n");
        let mut session = open(vec![script]).await;

        let (descriptor, payload) = session.fetch_part("INBOX", 7, "2").await.unwrap().unwrap();
        assert_eq!(descriptor.filename, "a.pdf");
        assert_eq!(payload, b"QUJD");
    }

    #[tokio::test]
    async fn test_fetch_sections_peeks() {
        let mut script = login_script("SORT");
        script
            .write(b"A0002 EXAMINE \"INBOX\"\r\n")
            .read(b"A0002 OK [READ-ONLY] done\r\n")
            .write(b"A0003 UID FETCH 7 (UID BODY.PEEK[1] BODY.PEEK[2])\r\n")
            .read(b"* 1 FETCH (UID 7 BODY[1] \"hi\" BODY[2] {3}\r\n")
            .read(b"abc)\r\n")
            .read(b"A0003 OK done\r\n");
        let mut session = open(vec![script]).await;

        let record = session.fetch_sections("INBOX", 7, &["1", "2"]).await.unwrap().unwrap();
        assert_eq!(record.section("1"), Some(&b"hi"[..]));
        assert_eq!(record.section("2"), Some(&b"abc"[..]));
    }
}
