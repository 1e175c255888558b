//! Scripted IMAP servers shared by the integration tests.

#![allow(dead_code)]

use tokio_test::io::{Builder, Mock};
use webmail_core::{MailService, WebmailConfig};
use webmail_imap::{Config, QueuedConnector};

/// Routes `tracing` output to the test harness; filter with `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Greeting and a successful `LOGIN` announcing `caps`.
pub fn login(user: &str, password: &str, caps: &str) -> Builder {
    let mut builder = Builder::new();
    builder
        .read(b"* OK ready\r\n")
        .write(format!("A0001 LOGIN {user} {password}\r\n").as_bytes())
        .read(format!("A0001 OK [CAPABILITY IMAP4rev1 {caps}] logged in\r\n").as_bytes());
    builder
}

/// A successful liveness probe.
pub fn noop(script: &mut Builder, tag: u32) {
    script
        .write(format!("A{tag:04} NOOP\r\n").as_bytes())
        .read(format!("A{tag:04} OK done\r\n").as_bytes());
}

/// `LOGOUT` as a server answers it.
pub fn logout(script: &mut Builder, tag: u32) {
    script
        .write(format!("A{tag:04} LOGOUT\r\n").as_bytes())
        .read(b"* BYE see you\r\n")
        .read(format!("A{tag:04} OK done\r\n").as_bytes());
}

/// An untagged FETCH whose last item is the literal `data`.
pub fn fetch_literal(script: &mut Builder, head: &str, data: &[u8]) {
    script.read(format!("{head} {{{}}}\r\n", data.len()).as_bytes());
    let mut tail = data.to_vec();
    tail.extend_from_slice(b")\r\n");
    script.read(&tail);
}

pub fn connector(scripts: Vec<Builder>) -> QueuedConnector<Mock> {
    QueuedConnector::new(scripts.into_iter().map(|mut script| script.build()).collect::<Vec<_>>())
}

pub fn service(scripts: Vec<Builder>) -> MailService<QueuedConnector<Mock>> {
    init_tracing();
    let config = WebmailConfig::new(Config::new("imap.example.com"));
    MailService::new(connector(scripts), config)
}
