//! Greeting, `STARTTLS` and `LOGIN`.

use tokio::io::{AsyncRead, AsyncWrite};

use super::Client;
use super::states::{Authenticated, NotAuthenticated};
use crate::command::Command;
use crate::connection::framed::FramedStream;
use crate::connection::stream::ImapStream;
use crate::parser::{Response, ResponseParser, UntaggedResponse};
use crate::types::{Capability, ResponseCode};
use crate::{Error, Result};

impl<S> Client<S, NotAuthenticated>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Reads the server greeting from a freshly connected transport.
    ///
    /// Capabilities in a `[CAPABILITY ...]` greeting code are kept until
    /// login.
    ///
    /// # Errors
    ///
    /// Fails on I/O errors or a `BYE` greeting.
    pub async fn from_stream(stream: S) -> Result<Self> {
        let mut framed = FramedStream::new(stream);
        let greeting = framed.read_response().await?;

        let capabilities = match ResponseParser::parse(&greeting)? {
            Response::Untagged(
                UntaggedResponse::Ok { code, .. } | UntaggedResponse::PreAuth { code, .. },
            ) => match code {
                Some(ResponseCode::Capability(caps)) => caps,
                _ => Vec::new(),
            },
            Response::Untagged(UntaggedResponse::Bye { text, .. }) => {
                return Err(Error::Bye(text));
            }
            other => {
                return Err(Error::Protocol(format!("unexpected greeting: {other:?}")));
            }
        };
        tracing::debug!(capabilities = capabilities.len(), "greeted");

        Ok(Self::from_framed(framed, capabilities))
    }

    /// Logs in with `LOGIN`.
    ///
    /// Capabilities announced by the login itself are adopted; otherwise an
    /// explicit `CAPABILITY` follows. Greeting capabilities are never
    /// trusted past this point since servers advertise more after login.
    ///
    /// # Errors
    ///
    /// A `NO` completion becomes [`Error::Auth`]; I/O errors propagate.
    pub async fn login(
        mut self,
        username: &str,
        password: &str,
    ) -> Result<Client<S, Authenticated>> {
        if self.has_capability(&Capability::LoginDisabled) {
            return Err(Error::Auth("LOGIN is disabled on this connection".into()));
        }

        let command = Command::Login {
            username: username.to_string(),
            password: password.to_string(),
        };
        let completion = match self.execute(&command).await {
            Ok(completion) => completion,
            Err(Error::No(reason) | Error::Bad(reason)) => return Err(Error::Auth(reason)),
            Err(e) => return Err(e),
        };

        let mut client: Client<S, Authenticated> = self.transition();
        if let Some(caps) = completion.capabilities() {
            client.capabilities = caps;
        } else {
            client.capabilities.clear();
            client.capability().await?;
        }
        tracing::info!(user = username, capabilities = client.capabilities.len(), "logged in");
        Ok(client)
    }
}

impl Client<ImapStream, NotAuthenticated> {
    /// Upgrades the connection with `STARTTLS` and re-reads capabilities.
    ///
    /// # Errors
    ///
    /// Fails if the server refuses or the TLS handshake fails.
    pub async fn starttls(mut self, host: &str) -> Result<Self> {
        self.execute(&Command::StartTls).await?;
        let io_timeout = self.io_timeout;
        let tls = self.stream.into_inner().upgrade_to_tls(host).await?;

        let mut client = Self::from_framed(FramedStream::new(tls), Vec::new());
        client.set_io_timeout(io_timeout);
        client.capability().await?;
        tracing::debug!(host, "tls negotiated");
        Ok(client)
    }
}
