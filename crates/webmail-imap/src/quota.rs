//! Storage quota (RFC 2087).

use crate::connection::{Connector, QuotaRootReply, Session};
use crate::types::{Capability, Mailbox};

/// Storage usage of a quota root, in the server's units (KiB).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quota {
    /// Current usage.
    pub current: u64,
    /// Limit.
    pub limit: u64,
    /// `floor(current * 100 / limit)`.
    pub usage: u64,
}

impl Quota {
    /// Computes usage from a `STORAGE` pair. A zero limit gives `None`.
    #[must_use]
    pub fn new(current: u64, limit: u64) -> Option<Self> {
        if limit == 0 {
            return None;
        }
        let usage = u128::from(current) * 100 / u128::from(limit);
        Some(Self {
            current,
            limit,
            usage: u64::try_from(usage).unwrap_or(u64::MAX),
        })
    }

    /// Reads the first `STORAGE` resource of a `GETQUOTAROOT` reply.
    #[must_use]
    pub fn from_reply(reply: &QuotaRootReply) -> Option<Self> {
        reply
            .quotas
            .iter()
            .flat_map(|(_, resources)| resources)
            .find(|resource| resource.name.eq_ignore_ascii_case("STORAGE"))
            .and_then(|storage| Self::new(storage.usage, storage.limit))
    }
}

impl<C: Connector> Session<C> {
    /// Re-reads the quota governing `mailbox`.
    ///
    /// Without the `QUOTA` capability, or when the server refuses or sends
    /// nothing usable, the quota becomes unknown. Only a dead connection
    /// is remembered, through the session state.
    pub async fn refresh_quota(&mut self, mailbox: &str) {
        self.quota = None;
        if !self.has_capability(&Capability::Quota) {
            return;
        }
        let Ok(client) = self.connected() else {
            return;
        };
        let result = client.get_quota_root(&Mailbox::new(mailbox)).await;
        match self.track(result) {
            Ok(reply) => {
                self.quota = Quota::from_reply(&reply);
                if self.quota.is_none() {
                    tracing::debug!(mailbox, "no STORAGE quota reported");
                }
            }
            Err(e) => tracing::warn!(?e, mailbox, "GETQUOTAROOT failed, quota unknown"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::connection::session::tests::{login_script, open};
    use crate::parser::QuotaResource;

    fn reply(resources: Vec<(&str, u64, u64)>) -> QuotaRootReply {
        QuotaRootReply {
            roots: vec![String::new()],
            quotas: vec![(
                String::new(),
                resources
                    .into_iter()
                    .map(|(name, usage, limit)| QuotaResource {
                        name: name.to_string(),
                        usage,
                        limit,
                    })
                    .collect(),
            )],
        }
    }

    #[test]
    fn test_usage_is_floored_percentage() {
        assert_eq!(Quota::from_reply(&reply(vec![("STORAGE", 500, 1000)])).unwrap().usage, 50);
        assert_eq!(Quota::new(2, 3).unwrap().usage, 66);
        assert_eq!(Quota::new(10, 0), None);
    }

    #[test]
    fn test_missing_storage_is_unknown() {
        assert_eq!(Quota::from_reply(&reply(vec![("MESSAGE", 5, 100)])), None);
        assert_eq!(Quota::from_reply(&QuotaRootReply::default()), None);
    }

    #[tokio::test]
    async fn test_refused_getquotaroot_degrades() {
        let mut script = login_script("QUOTA");
        script
            .write(b"A0002 GETQUOTAROOT \"INBOX\"\r\n")
            .read(b"A0002 NO quota not enabled\r\n");
        let mut session = open(vec![script]).await;

        session.refresh_quota("INBOX").await;
        assert!(session.quota().is_none());
        assert!(session.selection().is_none());
    }

    #[tokio::test]
    async fn test_without_capability_no_command_is_sent() {
        let mut session = open(vec![login_script("SORT")]).await;
        session.refresh_quota("INBOX").await;
        assert!(session.quota().is_none());
    }
}
