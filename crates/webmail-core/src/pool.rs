//! Per-user IMAP connections shared across web requests.
//!
//! The pool keeps at most one [`Session`] per login name. A request
//! acquires the session, which locks it for that request alone, and
//! releases it by dropping the handle. Before a kept session is handed
//! out again it is probed with `NOOP` and logged in again if the server
//! dropped it.
//!
//! When the pool is at capacity, a new user takes the slot of one whose
//! session is idle; if every session is in use, acquiring fails with
//! [`Error::PoolFull`].

use std::collections::HashMap;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMappedMutexGuard, OwnedMutexGuard};
use webmail_imap::{Connector, Credentials, Session, SessionState};

use crate::{Error, Result};

type PooledConnection<C> = Session<Arc<C>>;
type Slot<C> = Arc<AsyncMutex<Option<PooledConnection<C>>>>;

/// Connections keyed by user identity.
pub struct ConnectionPool<C: Connector> {
    connector: Arc<C>,
    max_identities: usize,
    slots: Mutex<HashMap<String, Slot<C>>>,
}

impl<C: Connector> std::fmt::Debug for ConnectionPool<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionPool")
            .field("identities", &self.len())
            .field("max_identities", &self.max_identities)
            .finish_non_exhaustive()
    }
}

/// A session lent out by [`ConnectionPool::acquire`].
///
/// Other requests for the same user wait until this handle is dropped.
pub struct PooledSession<C: Connector> {
    guard: OwnedMappedMutexGuard<Option<PooledConnection<C>>, PooledConnection<C>>,
}

impl<C: Connector> std::fmt::Debug for PooledSession<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledSession").finish_non_exhaustive()
    }
}

impl<C: Connector> Deref for PooledSession<C> {
    type Target = Session<Arc<C>>;

    fn deref(&self) -> &Self::Target {
        &self.guard
    }
}

impl<C: Connector> DerefMut for PooledSession<C> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.guard
    }
}

impl<C: Connector> ConnectionPool<C> {
    /// Creates an empty pool. `max_identities` is raised to at least one.
    #[must_use]
    pub fn new(connector: C, max_identities: usize) -> Self {
        Self {
            connector: Arc::new(connector),
            max_identities: max_identities.max(1),
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Number of users holding a slot.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// True when no user holds a slot.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns a logged-in session for `credentials`, waiting while
    /// another request uses it.
    ///
    /// A kept session is reused after a liveness probe. One opened with
    /// another password is logged out and replaced.
    ///
    /// # Errors
    ///
    /// [`Error::PoolFull`] when every slot is busy; otherwise whatever
    /// connecting or logging in fails with.
    pub async fn acquire(&self, credentials: &Credentials) -> Result<PooledSession<C>> {
        let mut guard = loop {
            let (slot, evicted) = self.claim(&credentials.username)?;
            if let Some((name, evicted)) = evicted {
                close(&name, evicted).await;
            }
            let guard = Arc::clone(&slot).lock_owned().await;
            // A logout may have closed the slot while this request waited.
            if self.holds(&credentials.username, &slot) {
                break guard;
            }
            tracing::debug!(user = %credentials.username, "slot closed while waiting");
        };
        let reusable = guard.as_ref().is_some_and(|session| {
            session.is_for(credentials) && *session.state() != SessionState::LoggedOut
        });

        if reusable {
            if let Some(session) = guard.as_mut() {
                if let Err(e) = session.refresh().await {
                    *guard = None;
                    return Err(e.into());
                }
            }
        } else {
            if let Some(mut stale) = guard.take() {
                if let Err(e) = stale.logout().await {
                    tracing::debug!(?e, user = %credentials.username, "logout of replaced session failed");
                }
            }
            let session = Session::open(Arc::clone(&self.connector), credentials.clone()).await?;
            tracing::debug!(user = %credentials.username, "pooled new session");
            *guard = Some(session);
        }

        OwnedMutexGuard::try_map(guard, Option::as_mut)
            .map(|guard| PooledSession { guard })
            .map_err(|_| webmail_imap::Error::InvalidState("pooled session vanished".into()).into())
    }

    /// Hands a session back.
    pub fn release(&self, session: PooledSession<C>) {
        tracing::trace!(user = %session.username(), "released");
        drop(session);
    }

    /// Logs `username` out and frees the slot. Waits for a request
    /// still using the session; requests queued behind the logout get a
    /// fresh slot.
    ///
    /// # Errors
    ///
    /// Fails on I/O errors during `LOGOUT`; the slot is freed anyway.
    pub async fn logout(&self, username: &str) -> Result<()> {
        let slot = self
            .slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(username)
            .cloned();
        let Some(slot) = slot else {
            return Ok(());
        };
        let mut guard = slot.lock().await;
        {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            if slots.get(username).is_some_and(|current| Arc::ptr_eq(current, &slot)) {
                slots.remove(username);
            }
        }
        match guard.take() {
            Some(mut session) => Ok(session.logout().await?),
            None => Ok(()),
        }
    }

    /// True while `slot` is the one the map holds for `username`.
    fn holds(&self, username: &str, slot: &Slot<C>) -> bool {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(username)
            .is_some_and(|current| Arc::ptr_eq(current, slot))
    }

    /// Finds or creates the slot for `username`, evicting an idle user
    /// when the pool is at capacity.
    fn claim(&self, username: &str) -> Result<(Slot<C>, Option<(String, Slot<C>)>)> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(slot) = slots.get(username) {
            return Ok((Arc::clone(slot), None));
        }

        let mut evicted = None;
        if slots.len() >= self.max_identities {
            // Only the map holds an idle slot; a lent-out or awaited one
            // has further references.
            let idle = slots
                .iter()
                .find(|(_, slot)| Arc::strong_count(slot) == 1)
                .map(|(name, _)| name.clone());
            let Some(name) = idle else {
                tracing::warn!(user = username, max = self.max_identities, "connection pool full");
                return Err(Error::PoolFull(self.max_identities));
            };
            evicted = slots.remove(&name).map(|slot| (name, slot));
        }

        let slot: Slot<C> = Arc::new(AsyncMutex::new(None));
        slots.insert(username.to_string(), Arc::clone(&slot));
        Ok((slot, evicted))
    }
}

async fn close<C: Connector>(name: &str, slot: Slot<C>) {
    let Ok(mut guard) = slot.try_lock_owned() else {
        return;
    };
    if let Some(mut session) = guard.take() {
        match session.logout().await {
            Ok(()) => tracing::info!(user = name, "evicted idle session"),
            Err(e) => tracing::debug!(?e, user = name, "logout of evicted session failed"),
        }
    }
}
