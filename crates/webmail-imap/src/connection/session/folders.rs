//! Folder management.

use super::Session;
use crate::connection::connector::Connector;
use crate::types::Mailbox;
use crate::Result;

impl<C: Connector> Session<C> {
    /// Creates `name`, below `parent` when given.
    ///
    /// # Errors
    ///
    /// A refusal surfaces as [`crate::Error::No`] with the server's reason.
    pub async fn create_folder(&mut self, name: &str, parent: Option<&str>) -> Result<()> {
        let full = match parent {
            Some(parent) if !parent.is_empty() => format!("{parent}{}{name}", self.delimiter()),
            _ => name.to_string(),
        };
        let mailbox = Mailbox::new(full);
        let result = self.connected()?.create(&mailbox).await;
        self.track(result)?;
        tracing::info!(mailbox = %mailbox, "created folder");
        Ok(())
    }

    /// Renames `from` to `to`.
    ///
    /// # Errors
    ///
    /// A refusal surfaces as [`crate::Error::No`] with the server's reason.
    pub async fn rename_folder(&mut self, from: &str, to: &str) -> Result<()> {
        let (from, to) = (Mailbox::new(from), Mailbox::new(to));
        let result = self.connected()?.rename(&from, &to).await;
        self.track(result)?;
        self.invalidate_selection_under(&from);
        tracing::info!(from = %from, to = %to, "renamed folder");
        Ok(())
    }

    /// Deletes `name`.
    ///
    /// # Errors
    ///
    /// A refusal surfaces as [`crate::Error::No`] with the server's reason.
    pub async fn delete_folder(&mut self, name: &str) -> Result<()> {
        let mailbox = Mailbox::new(name);
        let result = self.connected()?.delete(&mailbox).await;
        self.track(result)?;
        self.invalidate_selection_under(&mailbox);
        tracing::info!(mailbox = %mailbox, "deleted folder");
        Ok(())
    }

    /// Forces a fresh `SELECT` if the selected mailbox is `mailbox` or
    /// lies below it.
    fn invalidate_selection_under(&mut self, mailbox: &Mailbox) {
        let prefix = format!("{}{}", mailbox.as_str(), self.delimiter());
        let affected = self.selection().is_some_and(|selection| {
            selection.mailbox == *mailbox || selection.mailbox.as_str().starts_with(&prefix)
        });
        if affected {
            self.selection_valid = false;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::super::tests::{login_script, open};

    #[tokio::test]
    async fn test_create_under_parent_uses_delimiter() {
        let mut script = login_script("NAMESPACE");
        script
            .write(b"A0002 NAMESPACE\r\n")
            .read(b"* NAMESPACE ((\"\" \"/\")) NIL NIL\r\n")
            .read(b"A0002 OK done\r\n")
            .write(b"A0003 CREATE \"Projects/R&AOk-sum&AOk-s\"\r\n")
            .read(b"A0003 OK created\r\n");
        let mut session = open(vec![script]).await;

        session
            .create_folder("R\u{e9}sum\u{e9}s", Some("Projects"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_rename_forces_reselect() {
        let mut script = login_script("SORT");
        script
            .write(b"A0002 SELECT \"Old\"\r\n")
            .read(b"A0002 OK [READ-WRITE] done\r\n")
            .write(b"A0003 RENAME \"Old\" \"New\"\r\n")
            .read(b"A0003 OK renamed\r\n")
            .write(b"A0004 SELECT \"Old\"\r\n")
            .read(b"A0004 NO [NONEXISTENT] no such mailbox\r\n");
        let mut session = open(vec![script]).await;

        session.select("Old", false, false).await.unwrap();
        session.rename_folder("Old", "New").await.unwrap();
        assert!(session.select("Old", false, false).await.is_err());
    }

    #[tokio::test]
    async fn test_refused_delete_carries_reason() {
        let mut script = login_script("SORT");
        script
            .write(b"A0002 DELETE \"INBOX\"\r\n")
            .read(b"A0002 NO cannot delete INBOX\r\n");
        let mut session = open(vec![script]).await;

        let err = session.delete_folder("INBOX").await.unwrap_err();
        assert_eq!(err.server_reason(), Some("cannot delete INBOX"));
    }
}
