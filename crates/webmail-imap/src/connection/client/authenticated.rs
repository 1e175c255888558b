//! Commands available once logged in.
//!
//! Selection is not encoded in the type: `select` and `examine` borrow the
//! client, so a `NO` leaves it usable and the session's record of the
//! selected mailbox untouched.

use tokio::io::{AsyncRead, AsyncWrite};

use super::{Client, Completion};
use super::states::Authenticated;
use crate::command::{
    Command, FetchAttribute, SearchCriteria, SortCriterion, StatusAttribute, StoreAction,
};
use crate::parser::{FetchBatch, QuotaResource, StatusItem, UntaggedResponse};
use crate::types::{Flag, ListResponse, Mailbox, MailboxStatus, Namespaces, ResponseCode, UidSet};
use crate::Result;

/// Parsed `GETQUOTAROOT` reply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuotaRootReply {
    /// Quota roots governing the mailbox.
    pub roots: Vec<String>,
    /// Resources per quota root, in arrival order.
    pub quotas: Vec<(String, Vec<QuotaResource>)>,
}

impl<S> Client<S, Authenticated>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Sends `NAMESPACE`. A server without namespace data yields the
    /// empty default.
    ///
    /// # Errors
    ///
    /// Fails on I/O errors or a `NO`/`BAD` completion.
    pub async fn namespace(&mut self) -> Result<Namespaces> {
        let completion = self.execute(&Command::Namespace).await?;
        Ok(completion
            .responses()
            .find_map(|response| match response {
                UntaggedResponse::Namespace(namespaces) => Some(namespaces),
                _ => None,
            })
            .unwrap_or_default())
    }

    /// Opens `mailbox` with `SELECT`, or `EXAMINE` when `read_only`.
    ///
    /// # Errors
    ///
    /// A `NO` (e.g. nonexistent mailbox) surfaces as [`crate::Error::No`].
    pub async fn select(&mut self, mailbox: &Mailbox, read_only: bool) -> Result<MailboxStatus> {
        let command = if read_only {
            Command::Examine {
                mailbox: mailbox.clone(),
            }
        } else {
            Command::Select {
                mailbox: mailbox.clone(),
            }
        };
        let completion = self.execute(&command).await?;
        Ok(mailbox_status(&completion, read_only))
    }

    /// Sends a plain `LIST`.
    ///
    /// # Errors
    ///
    /// Fails on I/O errors or a `NO`/`BAD` completion.
    pub async fn list(&mut self, reference: &str, pattern: &str) -> Result<Vec<ListResponse>> {
        let command = Command::List {
            reference: reference.to_string(),
            pattern: pattern.to_string(),
        };
        Ok(list_responses(&self.execute(&command).await?))
    }

    /// Sends `LIST ... RETURN (CHILDREN STATUS (MESSAGES))` (RFC 5258,
    /// RFC 5819). The interleaved `STATUS` responses are not returned.
    ///
    /// # Errors
    ///
    /// Fails on I/O errors or a `NO`/`BAD` completion.
    pub async fn list_extended(
        &mut self,
        reference: &str,
        pattern: &str,
    ) -> Result<Vec<ListResponse>> {
        let command = Command::ListExtended {
            reference: reference.to_string(),
            pattern: pattern.to_string(),
            children: true,
            status: vec![StatusAttribute::Messages],
        };
        Ok(list_responses(&self.execute(&command).await?))
    }

    /// Sends `STATUS`.
    ///
    /// # Errors
    ///
    /// Fails on I/O errors or a `NO`/`BAD` completion.
    pub async fn status(
        &mut self,
        mailbox: &Mailbox,
        items: &[StatusAttribute],
    ) -> Result<Vec<StatusItem>> {
        let command = Command::Status {
            mailbox: mailbox.clone(),
            items: items.to_vec(),
        };
        let completion = self.execute(&command).await?;
        Ok(completion
            .responses()
            .find_map(|response| match response {
                UntaggedResponse::Status { items, .. } => Some(items),
                _ => None,
            })
            .unwrap_or_default())
    }

    /// Sends `CREATE`.
    ///
    /// # Errors
    ///
    /// The server's reason is carried by [`crate::Error::No`].
    pub async fn create(&mut self, mailbox: &Mailbox) -> Result<()> {
        let command = Command::Create {
            mailbox: mailbox.clone(),
        };
        self.execute(&command).await.map(drop)
    }

    /// Sends `DELETE`.
    ///
    /// # Errors
    ///
    /// The server's reason is carried by [`crate::Error::No`].
    pub async fn delete(&mut self, mailbox: &Mailbox) -> Result<()> {
        let command = Command::Delete {
            mailbox: mailbox.clone(),
        };
        self.execute(&command).await.map(drop)
    }

    /// Sends `RENAME`.
    ///
    /// # Errors
    ///
    /// The server's reason is carried by [`crate::Error::No`].
    pub async fn rename(&mut self, from: &Mailbox, to: &Mailbox) -> Result<()> {
        let command = Command::Rename {
            from: from.clone(),
            to: to.clone(),
        };
        self.execute(&command).await.map(drop)
    }

    /// Sends `GETQUOTAROOT`.
    ///
    /// # Errors
    ///
    /// Fails on I/O errors or a `NO`/`BAD` completion.
    pub async fn get_quota_root(&mut self, mailbox: &Mailbox) -> Result<QuotaRootReply> {
        let command = Command::GetQuotaRoot {
            mailbox: mailbox.clone(),
        };
        let completion = self.execute(&command).await?;

        let mut reply = QuotaRootReply::default();
        for response in completion.responses() {
            match response {
                UntaggedResponse::QuotaRoot { roots, .. } => reply.roots = roots,
                UntaggedResponse::Quota { root, resources } => {
                    reply.quotas.push((root, resources));
                }
                _ => {}
            }
        }
        Ok(reply)
    }

    /// Appends `message` to `mailbox` with the given flags.
    ///
    /// # Errors
    ///
    /// Fails if the server refuses the command or the literal.
    pub async fn append(&mut self, mailbox: &Mailbox, flags: &[Flag], message: &[u8]) -> Result<()> {
        let command = Command::Append {
            mailbox: mailbox.clone(),
            flags: flags.to_vec(),
            message: message.to_vec(),
        };
        self.execute_with_literal(&command, message).await.map(drop)
    }

    /// Sends `CHECK`.
    ///
    /// # Errors
    ///
    /// Fails on I/O errors or a `NO`/`BAD` completion.
    pub async fn check(&mut self) -> Result<()> {
        self.execute(&Command::Check).await.map(drop)
    }

    /// Sends `EXPUNGE`.
    ///
    /// # Errors
    ///
    /// Fails on I/O errors or a `NO`/`BAD` completion.
    pub async fn expunge(&mut self) -> Result<()> {
        self.execute(&Command::Expunge).await.map(drop)
    }

    /// Sends `UID SEARCH` and returns matching UIDs.
    ///
    /// # Errors
    ///
    /// Fails on I/O errors or a `NO`/`BAD` completion.
    pub async fn uid_search(
        &mut self,
        charset: Option<&str>,
        criteria: SearchCriteria,
    ) -> Result<Vec<u32>> {
        let command = Command::UidSearch {
            charset: charset.map(str::to_string),
            criteria,
        };
        let completion = self.execute(&command).await?;
        Ok(completion
            .responses()
            .filter_map(|response| match response {
                UntaggedResponse::Search(uids) => Some(uids),
                _ => None,
            })
            .flatten()
            .collect())
    }

    /// Sends `UID SORT` (RFC 5256) and returns UIDs in server order.
    ///
    /// # Errors
    ///
    /// Fails on I/O errors or a `NO`/`BAD` completion.
    pub async fn uid_sort(
        &mut self,
        keys: &[SortCriterion],
        charset: &str,
        criteria: SearchCriteria,
    ) -> Result<Vec<u32>> {
        let command = Command::UidSort {
            keys: keys.to_vec(),
            charset: charset.to_string(),
            criteria,
        };
        let completion = self.execute(&command).await?;
        Ok(completion
            .responses()
            .filter_map(|response| match response {
                UntaggedResponse::Sort(uids) => Some(uids),
                _ => None,
            })
            .flatten()
            .collect())
    }

    /// Sends `UID FETCH` and decodes the data through [`FetchBatch`].
    ///
    /// Per-message decode failures are kept in [`FetchBatch::errors`]; they
    /// do not fail the command.
    ///
    /// # Errors
    ///
    /// Fails on I/O errors or a `NO`/`BAD` completion.
    pub async fn uid_fetch(&mut self, uids: &UidSet, items: &[FetchAttribute]) -> Result<FetchBatch> {
        let command = Command::UidFetch {
            uids: uids.clone(),
            items: items.to_vec(),
        };
        let completion = self.execute(&command).await?;
        let batch = FetchBatch::from_responses(&completion.untagged);
        if !batch.errors().is_empty() {
            tracing::warn!(errors = batch.errors().len(), "undecodable FETCH responses");
        }
        Ok(batch)
    }

    /// Sends `UID STORE` (silent).
    ///
    /// # Errors
    ///
    /// Fails on I/O errors or a `NO`/`BAD` completion.
    pub async fn uid_store(&mut self, uids: &UidSet, action: StoreAction) -> Result<()> {
        let command = Command::UidStore {
            uids: uids.clone(),
            action,
            silent: true,
        };
        self.execute(&command).await.map(drop)
    }

    /// Sends `UID COPY`.
    ///
    /// # Errors
    ///
    /// Fails on I/O errors or a `NO`/`BAD` completion.
    pub async fn uid_copy(&mut self, uids: &UidSet, mailbox: &Mailbox) -> Result<()> {
        let command = Command::UidCopy {
            uids: uids.clone(),
            mailbox: mailbox.clone(),
        };
        self.execute(&command).await.map(drop)
    }
}

fn list_responses(completion: &Completion) -> Vec<ListResponse> {
    completion
        .responses()
        .filter_map(|response| match response {
            UntaggedResponse::List(list) => Some(list),
            _ => None,
        })
        .collect()
}

fn mailbox_status(completion: &Completion, read_only: bool) -> MailboxStatus {
    let mut status = MailboxStatus {
        read_only,
        ..MailboxStatus::default()
    };

    for response in completion.responses() {
        match response {
            UntaggedResponse::Exists(n) => status.exists = n,
            UntaggedResponse::Recent(n) => status.recent = n,
            UntaggedResponse::Flags(flags) => status.flags = flags,
            UntaggedResponse::Ok {
                code: Some(code), ..
            } => match code {
                ResponseCode::UidValidity(v) => status.uid_validity = Some(v),
                ResponseCode::UidNext(v) => status.uid_next = Some(v),
                ResponseCode::Unseen(v) => status.unseen = Some(v),
                ResponseCode::PermanentFlags(flags) => {
                    status.permanent_flags = flags.into_iter().collect();
                }
                _ => {}
            },
            _ => {}
        }
    }

    match completion.code {
        Some(ResponseCode::ReadOnly) => status.read_only = true,
        Some(ResponseCode::ReadWrite) => status.read_only = false,
        _ => {}
    }
    status
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tokio_test::io::{Builder, Mock};

    use super::*;
    use crate::Error;
    use crate::connection::client::NotAuthenticated;
    use crate::types::Uid;

    async fn logged_in(script: &mut Builder) -> Client<Mock, Authenticated> {
        let mock = script.build();
        let client: Client<Mock, NotAuthenticated> = Client::from_stream(mock).await.unwrap();
        client.login("alice", "secret").await.unwrap()
    }

    fn greeting() -> Builder {
        let mut builder = Builder::new();
        builder
            .read(b"* OK ready\r\n")
            .write(b"A0001 LOGIN alice secret\r\n")
            .read(b"A0001 OK [CAPABILITY IMAP4rev1 SORT] done\r\n");
        builder
    }

    #[tokio::test]
    async fn test_select_builds_status() {
        let mut script = greeting();
        script
            .write(b"A0002 SELECT \"INBOX\"\r\n")
            .read(b"* FLAGS (\\Answered \\Seen)\r\n")
            .read(b"* 172 EXISTS\r\n")
            .read(b"* 1 RECENT\r\n")
            .read(b"* OK [UNSEEN 12] first unseen\r\n")
            .read(b"* OK [UIDVALIDITY 3857529045] UIDs valid\r\n")
            .read(b"* OK [UIDNEXT 4392] next\r\n")
            .read(b"A0002 OK [READ-WRITE] SELECT completed\r\n");
        let mut client = logged_in(&mut script).await;

        let status = client.select(&Mailbox::inbox(), false).await.unwrap();
        assert_eq!(status.exists, 172);
        assert_eq!(status.recent, 1);
        assert_eq!(status.unseen.map(|s| s.get()), Some(12));
        assert_eq!(status.uid_next, Uid::new(4392));
        assert!(!status.read_only);
    }

    #[tokio::test]
    async fn test_select_no_is_protocol_failure() {
        let mut script = greeting();
        script
            .write(b"A0002 SELECT \"Nope\"\r\n")
            .read(b"A0002 NO [NONEXISTENT] Mailbox doesn't exist\r\n")
            .write(b"A0003 NOOP\r\n")
            .read(b"A0003 OK done\r\n");
        let mut client = logged_in(&mut script).await;

        let err = client.select(&Mailbox::new("Nope"), false).await.unwrap_err();
        assert!(matches!(err, Error::No(ref reason) if reason == "Mailbox doesn't exist"));
        client.noop().await.unwrap();
    }

    #[tokio::test]
    async fn test_list_with_literal_name() {
        let mut script = greeting();
        script
            .write(b"A0002 LIST \"\" \"*\"\r\n")
            .read(b"* LIST (\\HasNoChildren) \".\" \"INBOX\"\r\n")
            .read(b"* LIST (\\HasNoChildren) \".\" {12}\r\n")
            .read(b"Entw&APw-rfe\r\n")
            .read(b"A0002 OK done\r\n");
        let mut client = logged_in(&mut script).await;

        let list = client.list("", "*").await.unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[1].mailbox.as_str(), "Entw\u{fc}rfe");
        assert_eq!(list[1].delimiter, Some('.'));
    }

    #[tokio::test]
    async fn test_uid_sort_collects_uids() {
        let mut script = greeting();
        script
            .write(b"A0002 UID SORT (REVERSE DATE) UTF-8 NOT DELETED\r\n")
            .read(b"* SORT 9 4 7\r\n")
            .read(b"A0002 OK sorted\r\n");
        let mut client = logged_in(&mut script).await;

        let uids = client
            .uid_sort(
                &[SortCriterion::NEWEST_FIRST],
                "UTF-8",
                SearchCriteria::Not(Box::new(SearchCriteria::Deleted)),
            )
            .await
            .unwrap();
        assert_eq!(uids, vec![9, 4, 7]);
    }

    #[tokio::test]
    async fn test_append_waits_for_continuation() {
        let mut script = greeting();
        script
            .write(b"A0002 APPEND \"Sent\" (\\Seen) {5}\r\n")
            .read(b"+ Ready for literal data\r\n")
            .write(b"hello")
            .write(b"\r\n")
            .read(b"A0002 OK [APPENDUID 38505 3955] APPEND completed\r\n");
        let mut client = logged_in(&mut script).await;

        client
            .append(&Mailbox::new("Sent"), &[Flag::Seen], b"hello")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_append_refused_before_continuation() {
        let mut script = greeting();
        script
            .write(b"A0002 APPEND \"Sent\" {5}\r\n")
            .read(b"A0002 NO [TRYCREATE] no such mailbox\r\n");
        let mut client = logged_in(&mut script).await;

        let err = client
            .append(&Mailbox::new("Sent"), &[], b"hello")
            .await
            .unwrap_err();
        assert_eq!(err.server_reason(), Some("no such mailbox"));
    }

    #[tokio::test]
    async fn test_get_quota_root() {
        let mut script = greeting();
        script
            .write(b"A0002 GETQUOTAROOT \"INBOX\"\r\n")
            .read(b"* QUOTAROOT INBOX \"\"\r\n")
            .read(b"* QUOTA \"\" (STORAGE 10 512)\r\n")
            .read(b"A0002 OK Getquotaroot completed\r\n");
        let mut client = logged_in(&mut script).await;

        let reply = client.get_quota_root(&Mailbox::inbox()).await.unwrap();
        assert_eq!(reply.roots, vec![String::new()]);
        assert_eq!(reply.quotas[0].1[0].usage, 10);
        assert_eq!(reply.quotas[0].1[0].limit, 512);
    }

    #[tokio::test]
    async fn test_uid_fetch_decodes_batch() {
        let mut script = greeting();
        script
            .write(b"A0002 UID FETCH 7 (UID FLAGS)\r\n")
            .read(b"* 1 FETCH (UID 7 FLAGS (\\Seen))\r\n")
            .read(b"A0002 OK done\r\n");
        let mut client = logged_in(&mut script).await;

        let uid = Uid::new(7).unwrap();
        let batch = client
            .uid_fetch(
                &UidSet::single(uid),
                &[FetchAttribute::Uid, FetchAttribute::Flags],
            )
            .await
            .unwrap();
        assert!(batch.get(uid).unwrap().flags().unwrap().is_seen());
    }
}
