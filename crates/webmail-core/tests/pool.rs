//! Connection pool behavior against scripted servers.

#![allow(clippy::unwrap_used)]

mod common;

use std::time::Duration;

use common::{connector, init_tracing, login, logout, noop};
use webmail_core::{ConnectionPool, Error};
use webmail_imap::{Capability, Credentials, SessionState};

fn alice() -> Credentials {
    Credentials::new("alice", "secret")
}

#[tokio::test]
async fn test_reuse_probes_the_kept_session() {
    init_tracing();
    let mut script = login("alice", "secret", "SORT");
    noop(&mut script, 2);
    let pool = ConnectionPool::new(connector(vec![script]), 4);

    let session = pool.acquire(&alice()).await.unwrap();
    assert_eq!(session.username(), "alice");

    // A second request for the same user waits for the first.
    let waiting = tokio::time::timeout(Duration::from_millis(20), pool.acquire(&alice())).await;
    assert!(waiting.is_err());

    pool.release(session);
    let session = pool.acquire(&alice()).await.unwrap();
    assert_eq!(session.state(), &SessionState::Authenticated);
    assert_eq!(pool.len(), 1);
}

#[tokio::test]
async fn test_dead_session_logs_in_again() {
    init_tracing();
    let mut first = login("alice", "secret", "SORT");
    first
        .write(b"A0002 NOOP\r\n")
        .read(b"* BYE idle timeout\r\n");
    let second = login("alice", "secret", "SORT QUOTA");
    let pool = ConnectionPool::new(connector(vec![first, second]), 4);

    drop(pool.acquire(&alice()).await.unwrap());
    let session = pool.acquire(&alice()).await.unwrap();
    assert!(session.has_capability(&Capability::Quota));
}

#[tokio::test]
async fn test_new_password_replaces_session() {
    init_tracing();
    let mut first = login("alice", "secret", "SORT");
    logout(&mut first, 2);
    let second = login("alice", "changed", "SORT");
    let pool = ConnectionPool::new(connector(vec![first, second]), 4);

    drop(pool.acquire(&alice()).await.unwrap());
    let changed = Credentials::new("alice", "changed");
    let session = pool.acquire(&changed).await.unwrap();
    assert!(session.is_for(&changed));
    assert_eq!(pool.len(), 1);
}

#[tokio::test]
async fn test_full_pool_evicts_only_idle_users() {
    init_tracing();
    let mut first = login("alice", "secret", "SORT");
    logout(&mut first, 2);
    let second = login("bob", "hunter2", "SORT");
    let pool = ConnectionPool::new(connector(vec![first, second]), 1);
    let bob = Credentials::new("bob", "hunter2");

    let held = pool.acquire(&alice()).await.unwrap();
    let err = pool.acquire(&bob).await.unwrap_err();
    assert!(matches!(err, Error::PoolFull(1)));

    pool.release(held);
    let session = pool.acquire(&bob).await.unwrap();
    assert_eq!(session.username(), "bob");
    assert_eq!(pool.len(), 1);
}

#[tokio::test]
async fn test_logout_frees_the_slot() {
    init_tracing();
    let mut script = login("alice", "secret", "SORT");
    logout(&mut script, 2);
    let pool = ConnectionPool::new(connector(vec![script]), 4);

    drop(pool.acquire(&alice()).await.unwrap());
    pool.logout("alice").await.unwrap();
    assert!(pool.is_empty());
    pool.logout("nobody").await.unwrap();
}

#[tokio::test]
async fn test_request_queued_behind_logout_gets_new_slot() {
    init_tracing();
    let mut first = login("alice", "secret", "SORT");
    logout(&mut first, 2);
    let second = login("alice", "secret", "SORT QUOTA");
    let pool = ConnectionPool::new(connector(vec![first, second]), 4);

    let held = pool.acquire(&alice()).await.unwrap();
    let release = async {
        tokio::task::yield_now().await;
        drop(held);
    };
    let creds = alice();
    let ((), logged_out, session) =
        tokio::join!(release, pool.logout("alice"), pool.acquire(&creds));

    logged_out.unwrap();
    let session = session.unwrap();
    assert!(session.has_capability(&Capability::Quota));
    assert_eq!(pool.len(), 1);
}

#[tokio::test]
async fn test_rejected_login_is_reported() {
    init_tracing();
    let mut script = tokio_test::io::Builder::new();
    script
        .read(b"* OK ready\r\n")
        .write(b"A0001 LOGIN alice secret\r\n")
        .read(b"A0001 NO [AUTHENTICATIONFAILED] Invalid credentials\r\n");
    let pool = ConnectionPool::new(connector(vec![script]), 4);

    let err = pool.acquire(&alice()).await.unwrap_err();
    assert!(matches!(err, Error::Imap(webmail_imap::Error::Auth(_))));
}
