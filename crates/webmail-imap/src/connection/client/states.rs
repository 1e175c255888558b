//! Type-state markers for the client.

/// Greeted, not yet logged in. Only `STARTTLS`, `LOGIN` and the
/// any-state commands are available.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotAuthenticated;

/// Logged in. Mailbox and message commands are available; which mailbox
/// is selected is tracked at runtime by the session.
#[derive(Debug, Clone, Copy, Default)]
pub struct Authenticated;
