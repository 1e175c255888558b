//! Stateful IMAP session for one user.
//!
//! A `Session` owns at most one logged-in connection, obtained from its
//! [`Connector`]. It records the protocol state, the capability set and
//! the hierarchy delimiter discovered at login, and memoizes the selected
//! mailbox so consecutive operations on one folder cost a single `SELECT`.
//!
//! Any command that fails because the transport is gone discards the
//! connection and drops the session back to
//! [`SessionState::NotAuthenticated`]. Only [`Session::refresh`] logs in
//! again; every other method reports the fault to the caller.
//!
//! ```ignore
//! use webmail_imap::connection::{Config, Credentials, Session, TcpConnector};
//!
//! let connector = TcpConnector::new(Config::new("imap.example.com"));
//! let mut session = Session::open(connector, Credentials::new("alice", "secret")).await?;
//!
//! let total = session.messages_count("INBOX", "-date", None).await?;
//! let first_page = session.uids()[..total.min(40)].to_vec();
//! let overview = session.fetch_overview("INBOX", &first_page, &[]).await?;
//! session.logout().await?;
//! ```

mod folders;
mod messages;

use super::client::{Authenticated, Client};
use super::config::Credentials;
use super::connector::Connector;
use crate::quota::Quota;
use crate::types::{Capability, Mailbox, MailboxStatus, Namespaces};
use crate::{Error, Result};

pub use messages::{MessageItems, OVERVIEW_HEADERS};

/// Delimiter assumed when the server reports none.
pub const DEFAULT_DELIMITER: char = '.';

/// The mailbox a session has selected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// Selected mailbox.
    pub mailbox: Mailbox,
    /// True when opened with `EXAMINE` or the server answered `READ-ONLY`.
    pub read_only: bool,
    /// What `SELECT`/`EXAMINE` reported.
    pub status: MailboxStatus,
}

/// Protocol state of a [`Session`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// No usable connection; [`Session::refresh`] logs in again.
    NotAuthenticated,
    /// Logged in, nothing selected.
    Authenticated,
    /// Logged in with a mailbox selected.
    Selected(Selection),
    /// Logged out for good.
    LoggedOut,
}

/// One user's IMAP session.
pub struct Session<C: Connector> {
    connector: C,
    credentials: Credentials,
    client: Option<Client<C::Stream, Authenticated>>,
    state: SessionState,
    // A refused SELECT leaves the server with nothing selected while the
    // recorded selection stays; the next use must select again.
    selection_valid: bool,
    capabilities: Vec<Capability>,
    namespaces: Option<Namespaces>,
    pub(crate) quota: Option<Quota>,
    uids: Vec<u32>,
}

impl<C: Connector> std::fmt::Debug for Session<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("user", &self.credentials.username)
            .field("state", &self.state)
            .field("capabilities", &self.capabilities)
            .field("quota", &self.quota)
            .finish_non_exhaustive()
    }
}

impl<C: Connector> Session<C> {
    /// Connects, logs in and discovers capabilities and namespaces.
    ///
    /// # Errors
    ///
    /// Fails if the server cannot be reached or rejects the credentials.
    pub async fn open(connector: C, credentials: Credentials) -> Result<Self> {
        let mut session = Self {
            connector,
            credentials,
            client: None,
            state: SessionState::NotAuthenticated,
            selection_valid: false,
            capabilities: Vec::new(),
            namespaces: None,
            quota: None,
            uids: Vec::new(),
        };
        session.login().await?;
        Ok(session)
    }

    /// Current protocol state.
    #[must_use]
    pub const fn state(&self) -> &SessionState {
        &self.state
    }

    /// Login name of the session's user.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.credentials.username
    }

    /// Returns true when the session logs in with exactly `credentials`.
    #[must_use]
    pub fn is_for(&self, credentials: &Credentials) -> bool {
        self.credentials == *credentials
    }

    /// Capabilities announced at the last login.
    #[must_use]
    pub fn capabilities(&self) -> &[Capability] {
        &self.capabilities
    }

    /// Checks for one capability.
    #[must_use]
    pub fn has_capability(&self, capability: &Capability) -> bool {
        self.capabilities.contains(capability)
    }

    /// Namespaces discovered at the first login.
    #[must_use]
    pub fn namespaces(&self) -> Option<&Namespaces> {
        self.namespaces.as_ref()
    }

    /// Hierarchy delimiter: the first one the `NAMESPACE` response
    /// carried, else [`DEFAULT_DELIMITER`].
    #[must_use]
    pub fn delimiter(&self) -> char {
        self.namespaces
            .as_ref()
            .and_then(Namespaces::first_delimiter)
            .unwrap_or(DEFAULT_DELIMITER)
    }

    /// Last selected mailbox, kept even when a later `SELECT` was refused.
    #[must_use]
    pub const fn selection(&self) -> Option<&Selection> {
        match &self.state {
            SessionState::Selected(selection) => Some(selection),
            _ => None,
        }
    }

    /// Quota of the last listed mailbox; `None` while unknown.
    #[must_use]
    pub const fn quota(&self) -> Option<&Quota> {
        self.quota.as_ref()
    }

    /// UIDs of the last listing, in display order.
    #[must_use]
    pub fn uids(&self) -> &[u32] {
        &self.uids
    }

    /// Probes the connection with `NOOP` and logs in again if it is gone.
    ///
    /// A failed probe forgets the selected mailbox.
    ///
    /// # Errors
    ///
    /// Fails after logout, or if the new login fails.
    pub async fn refresh(&mut self) -> Result<()> {
        if self.state == SessionState::LoggedOut {
            return Err(Error::InvalidState("session is logged out".into()));
        }
        if let Some(client) = self.client.as_mut() {
            match client.noop().await {
                Ok(()) => return Ok(()),
                Err(e) => tracing::warn!(?e, "noop probe failed, logging in again"),
            }
        }
        self.discard();
        self.login().await
    }

    /// Selects `name` (`INBOX` when empty), read-only with `EXAMINE`.
    ///
    /// Selecting the mailbox that is already selected is a no-op, unless
    /// `force` is set or a read-write selection is wanted and the current
    /// one is read-only.
    ///
    /// # Errors
    ///
    /// A refused `SELECT` surfaces as [`Error::No`] and leaves the recorded
    /// selection untouched.
    pub async fn select(&mut self, name: &str, read_only: bool, force: bool) -> Result<MailboxStatus> {
        let mailbox = Mailbox::new(name);
        if !force && self.selection_valid {
            if let Some(current) = self.selection() {
                if current.mailbox == mailbox && (read_only || !current.read_only) {
                    return Ok(current.status.clone());
                }
            }
        }

        let result = self.connected()?.select(&mailbox, read_only).await;
        match self.track(result) {
            Ok(status) => {
                tracing::info!(mailbox = %mailbox, read_only = status.read_only, "selected");
                self.state = SessionState::Selected(Selection {
                    mailbox,
                    read_only: status.read_only,
                    status: status.clone(),
                });
                self.selection_valid = true;
                Ok(status)
            }
            Err(e) => {
                self.selection_valid = false;
                Err(e)
            }
        }
    }

    /// Sends `CHECK` (failures ignored) when a mailbox is selected, then
    /// `LOGOUT`. The session cannot be used afterwards.
    ///
    /// # Errors
    ///
    /// Fails on I/O errors during `LOGOUT`.
    pub async fn logout(&mut self) -> Result<()> {
        let selected = self.selection_valid && self.selection().is_some();
        self.state = SessionState::LoggedOut;
        self.selection_valid = false;

        let Some(mut client) = self.client.take() else {
            return Ok(());
        };
        if selected {
            if let Err(e) = client.check().await {
                tracing::debug!(?e, "CHECK before LOGOUT failed");
            }
        }
        client.logout().await?;
        tracing::info!(user = %self.credentials.username, "logged out");
        Ok(())
    }

    async fn login(&mut self) -> Result<()> {
        let client = self.connector.connect().await?;
        let mut client = client
            .login(&self.credentials.username, &self.credentials.password)
            .await?;

        if self.namespaces.is_none() {
            let namespaces = if client.has_capability(&Capability::Namespace) {
                match client.namespace().await {
                    Ok(namespaces) => namespaces,
                    Err(e) if !e.is_connection_fault() => {
                        tracing::warn!(?e, "NAMESPACE refused, using defaults");
                        Namespaces::default()
                    }
                    Err(e) => return Err(e),
                }
            } else {
                Namespaces::default()
            };
            self.namespaces = Some(namespaces);
        }

        self.capabilities = client.capabilities().to_vec();
        self.client = Some(client);
        self.state = SessionState::Authenticated;
        self.selection_valid = false;
        Ok(())
    }

    /// The live client, or an error if the session holds none.
    pub(crate) fn connected(&mut self) -> Result<&mut Client<C::Stream, Authenticated>> {
        match self.state {
            SessionState::LoggedOut => Err(Error::InvalidState("session is logged out".into())),
            _ => self
                .client
                .as_mut()
                .ok_or_else(|| Error::InvalidState("not logged in".into())),
        }
    }

    /// Drops the connection when `result` shows it is dead.
    pub(crate) fn track<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            if e.is_connection_fault() {
                tracing::warn!(?e, user = %self.credentials.username, "connection lost");
                self.discard();
            }
        }
        result
    }

    fn discard(&mut self) {
        self.client = None;
        self.state = SessionState::NotAuthenticated;
        self.selection_valid = false;
    }
}
