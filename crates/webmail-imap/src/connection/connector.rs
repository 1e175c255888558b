//! Opening greeted connections.
//!
//! A [`Session`](super::Session) never dials the server itself: it asks its
//! connector for a fresh, greeted client whenever it has to log in again.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::Mutex;

use super::client::{Client, NotAuthenticated};
use super::config::{Config, Security};
use super::stream::{ImapStream, open};
use crate::{Error, Result};

/// Produces greeted, not yet authenticated clients.
pub trait Connector: Send + Sync {
    /// Transport the clients run on.
    type Stream: AsyncRead + AsyncWrite + Unpin + Send;

    /// Opens a connection and reads the greeting.
    fn connect(
        &self,
    ) -> impl Future<Output = Result<Client<Self::Stream, NotAuthenticated>>> + Send;
}

impl<C: Connector> Connector for Arc<C> {
    type Stream = C::Stream;

    fn connect(
        &self,
    ) -> impl Future<Output = Result<Client<Self::Stream, NotAuthenticated>>> + Send {
        (**self).connect()
    }
}

/// Dials the configured server over TCP, with TLS per [`Security`].
#[derive(Debug, Clone)]
pub struct TcpConnector {
    config: Config,
}

impl TcpConnector {
    /// Creates a connector for `config`.
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config }
    }

    /// The server configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }
}

impl Connector for TcpConnector {
    type Stream = ImapStream;

    async fn connect(&self) -> Result<Client<ImapStream, NotAuthenticated>> {
        let stream = open(&self.config).await?;
        let limit = self.config.io_timeout;
        let mut client = tokio::time::timeout(limit, Client::from_stream(stream))
            .await
            .map_err(|_| Error::Timeout(limit))??;
        client.set_io_timeout(Some(limit));

        if self.config.security == Security::StartTls {
            client = client.starttls(&self.config.host).await?;
        }
        tracing::debug!(address = %self.config.address(), "connected");
        Ok(client)
    }
}

/// Hands out pre-established transports in order, one per connect.
///
/// Useful when the socket is set up elsewhere, such as a proxy tunnel, and
/// for scripted transports in tests. Once the queue is empty every connect
/// fails with [`Error::ConnectionLost`].
#[derive(Debug)]
pub struct QueuedConnector<S> {
    streams: Mutex<VecDeque<S>>,
}

impl<S> QueuedConnector<S> {
    /// Queues `streams`, first one first.
    pub fn new(streams: impl IntoIterator<Item = S>) -> Self {
        Self {
            streams: Mutex::new(streams.into_iter().collect()),
        }
    }

    /// Number of transports not handed out yet.
    pub async fn remaining(&self) -> usize {
        self.streams.lock().await.len()
    }
}

impl<S> Connector for QueuedConnector<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    type Stream = S;

    async fn connect(&self) -> Result<Client<S, NotAuthenticated>> {
        let next = self.streams.lock().await.pop_front();
        let stream = next.ok_or_else(|| Error::ConnectionLost("no transport left to connect".into()))?;
        Client::from_stream(stream).await
    }
}
