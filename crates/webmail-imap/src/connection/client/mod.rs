//! Type-state IMAP client.
//!
//! The login boundary is enforced at compile time: a
//! `Client<S, NotAuthenticated>` can only greet, upgrade to TLS and log in,
//! and `login` consumes it to produce a `Client<S, Authenticated>`.
//! Mailbox selection stays a runtime property tracked by the session, so a
//! refused `SELECT` never costs the caller its connection.
//!
//! Every command is one strict round trip: write, then read until the
//! tagged completion. Nothing is pipelined.

mod authenticated;
mod not_authenticated;
mod states;

use std::marker::PhantomData;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};

pub use self::authenticated::QuotaRootReply;
pub use self::states::{Authenticated, NotAuthenticated};
use super::framed::{FramedStream, ResponseAccumulator};
use crate::command::{Command, TagGenerator};
use crate::parser::{Response, ResponseParser, UntaggedResponse};
use crate::types::{Capability, ResponseCode, Status};
use crate::{Error, Result};

/// IMAP client connection with type-state.
pub struct Client<S, State> {
    stream: FramedStream<S>,
    tag_gen: TagGenerator,
    capabilities: Vec<Capability>,
    io_timeout: Option<Duration>,
    _state: PhantomData<State>,
}

impl<S, State> std::fmt::Debug for Client<S, State> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("tag_gen", &self.tag_gen)
            .field("capabilities", &self.capabilities)
            .field("io_timeout", &self.io_timeout)
            .finish_non_exhaustive()
    }
}

/// What a command returned: raw untagged responses plus the tagged
/// `OK` completion.
#[derive(Debug, Clone, Default)]
pub struct Completion {
    /// Raw untagged responses in arrival order, literals included.
    pub untagged: Vec<Vec<u8>>,
    /// Response code on the tagged `OK`.
    pub code: Option<ResponseCode>,
    /// Human-readable text on the tagged `OK`.
    pub text: String,
}

impl Completion {
    /// Parses the untagged responses, skipping any that do not decode.
    ///
    /// A skipped line is logged; it never fails the command.
    pub fn responses(&self) -> impl Iterator<Item = UntaggedResponse> + '_ {
        self.untagged.iter().filter_map(|raw| match ResponseParser::parse(raw) {
            Ok(Response::Untagged(response)) => Some(response),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    line = %String::from_utf8_lossy(&raw[..raw.len().min(80)]),
                    "skipping undecodable response"
                );
                None
            }
        })
    }

    /// Capabilities announced during the command, via an untagged
    /// `CAPABILITY` response or a `[CAPABILITY ...]` code on the completion.
    #[must_use]
    pub fn capabilities(&self) -> Option<Vec<Capability>> {
        let untagged = self.responses().find_map(|response| match response {
            UntaggedResponse::Capability(caps) => Some(caps),
            _ => None,
        });
        untagged.or_else(|| match &self.code {
            Some(ResponseCode::Capability(caps)) => Some(caps.clone()),
            _ => None,
        })
    }
}

impl<S, State> Client<S, State>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    fn from_framed(stream: FramedStream<S>, capabilities: Vec<Capability>) -> Self {
        Self {
            stream,
            tag_gen: TagGenerator::default(),
            capabilities,
            io_timeout: None,
            _state: PhantomData,
        }
    }

    fn transition<Next>(self) -> Client<S, Next> {
        Client {
            stream: self.stream,
            tag_gen: self.tag_gen,
            capabilities: self.capabilities,
            io_timeout: self.io_timeout,
            _state: PhantomData,
        }
    }

    /// Bounds every subsequent command round trip.
    pub const fn set_io_timeout(&mut self, timeout: Option<Duration>) {
        self.io_timeout = timeout;
    }

    /// Returns the server capabilities.
    #[must_use]
    pub fn capabilities(&self) -> &[Capability] {
        &self.capabilities
    }

    /// Checks if the server has a specific capability.
    #[must_use]
    pub fn has_capability(&self, cap: &Capability) -> bool {
        self.capabilities.contains(cap)
    }

    /// Sends `NOOP`.
    ///
    /// # Errors
    ///
    /// Fails if the connection is dead or the server refuses.
    pub async fn noop(&mut self) -> Result<()> {
        self.execute(&Command::Noop).await.map(drop)
    }

    /// Sends `CAPABILITY` and replaces the stored capability set.
    ///
    /// # Errors
    ///
    /// Fails on I/O errors or a `NO`/`BAD` completion.
    pub async fn capability(&mut self) -> Result<Vec<Capability>> {
        let completion = self.execute(&Command::Capability).await?;
        if let Some(caps) = completion.capabilities() {
            self.capabilities.clone_from(&caps);
        }
        Ok(self.capabilities.clone())
    }

    /// Sends `LOGOUT` and drops the connection.
    ///
    /// # Errors
    ///
    /// Fails on I/O errors. The server's `BYE` is expected and not an error.
    pub async fn logout(mut self) -> Result<()> {
        match self.execute(&Command::Logout).await {
            Ok(_) | Err(Error::ConnectionLost(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Runs one command round trip.
    pub(crate) async fn execute(&mut self, command: &Command) -> Result<Completion> {
        let tag = self.tag_gen.next();
        let bytes = command.serialize(&tag)?;
        tracing::debug!(tag = %tag, command = command.name(), "sending");

        let round_trip = async {
            self.stream.write_command(&bytes).await?;
            ResponseAccumulator::new(tag.as_str())
                .read_until_tagged(&mut self.stream)
                .await
        };
        let responses = with_timeout(self.io_timeout, round_trip).await?;
        complete(command.name(), &tag, responses)
    }

    /// Runs a command whose final argument is a synchronizing literal.
    ///
    /// The command line (ending in `{N}`) is sent, the server's `+`
    /// continuation awaited, then `literal` and the closing CRLF.
    pub(crate) async fn execute_with_literal(
        &mut self,
        command: &Command,
        literal: &[u8],
    ) -> Result<Completion> {
        let tag = self.tag_gen.next();
        let bytes = command.serialize(&tag)?;
        tracing::debug!(tag = %tag, command = command.name(), bytes = literal.len(), "sending literal");

        let round_trip = async {
            self.stream.write_command(&bytes).await?;
            let mut accumulator = ResponseAccumulator::new(tag.as_str());
            let mut early = Vec::new();
            loop {
                let response = self.stream.read_response().await?;
                if response.starts_with(b"+") {
                    break;
                }
                let done = accumulator.is_completion(&response);
                early.push(response);
                if done {
                    // Refused before the continuation.
                    return Ok(early);
                }
            }
            self.stream.write_raw(literal).await?;
            self.stream.write_raw(b"\r\n").await?;
            let mut rest = accumulator.read_until_tagged(&mut self.stream).await?;
            early.append(&mut rest);
            Ok(early)
        };
        let responses = with_timeout(self.io_timeout, round_trip).await?;
        complete(command.name(), &tag, responses)
    }
}

async fn with_timeout<T>(
    timeout: Option<Duration>,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    match timeout {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| Error::Timeout(limit))?,
        None => fut.await,
    }
}

/// Splits off the tagged completion and maps its status.
fn complete(name: &str, tag: &str, mut responses: Vec<Vec<u8>>) -> Result<Completion> {
    let last = responses
        .pop()
        .ok_or_else(|| Error::Protocol(format!("{name}: no tagged response")))?;

    let (status, code, text) = match ResponseParser::parse(&last)? {
        Response::Tagged {
            tag: got,
            status,
            code,
            text,
        } if got.as_str() == tag => (status, code, text),
        other => {
            return Err(Error::Protocol(format!(
                "{name}: expected completion for {tag}, got {other:?}"
            )));
        }
    };

    match status {
        Status::Ok | Status::PreAuth => Ok(Completion {
            untagged: responses,
            code,
            text,
        }),
        Status::No => {
            tracing::debug!(command = name, reason = %text, "server said NO");
            Err(Error::No(text))
        }
        Status::Bad => {
            tracing::warn!(command = name, reason = %text, "server said BAD");
            Err(Error::Bad(text))
        }
        Status::Bye => Err(Error::Bye(text)),
    }
}
