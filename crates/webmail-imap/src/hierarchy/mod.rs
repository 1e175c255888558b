//! Mailbox tree for the folder pane.
//!
//! Servers advertising `LIST-EXTENDED` are walked one level at a time with
//! `LIST ... RETURN (CHILDREN ...)`, descending only along the path to the
//! mailbox the user is looking at. Other servers are listed once with
//! `LIST "" "*"` and the same tree is cut out of the flat result.

mod extended;
mod simple;

use std::collections::HashMap;

use serde::Serialize;

use crate::connection::{Connector, Session};
use crate::types::{Capability, ListResponse, MailboxAttribute};
use crate::Result;

/// One folder in the tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MailboxNode {
    /// Last segment of the name.
    pub name: String,
    /// Full name, as used in commands.
    pub path: String,
    /// `Some` when the folder has subfolders. The list is empty unless
    /// this level was expanded.
    pub children: Option<Vec<MailboxNode>>,
    /// Unseen messages, when probed and positive.
    pub unseen: Option<u32>,
    /// Listed as `\NonExistent`.
    pub removed: bool,
    #[serde(skip)]
    pub(crate) needs_status: bool,
}

impl MailboxNode {
    /// Reads a node from a LIST reply.
    fn from_list(response: &ListResponse, delimiter: char) -> Self {
        let path = response.mailbox.as_str();
        let delimiter = response.delimiter.unwrap_or(delimiter);
        let has = |attribute: MailboxAttribute| response.has(&attribute);

        let removed = has(MailboxAttribute::NonExistent);
        let needs_status = (has(MailboxAttribute::Marked) || !has(MailboxAttribute::Unmarked))
            && !has(MailboxAttribute::NoSelect)
            && !removed;

        Self {
            name: separate_mailbox(path, delimiter).0.to_string(),
            path: path.to_string(),
            children: has(MailboxAttribute::HasChildren).then(Vec::new),
            unseen: None,
            removed,
            needs_status,
        }
    }

    /// A folder known only by name: a pinned folder the server did not
    /// list, or a level of hierarchy without a mailbox of its own.
    fn placeholder(path: &str, delimiter: char) -> Self {
        Self {
            name: separate_mailbox(path, delimiter).0.to_string(),
            path: path.to_string(),
            children: None,
            unseen: None,
            removed: false,
            needs_status: false,
        }
    }

    /// Returns true when the server reported subfolders.
    #[must_use]
    pub fn has_children(&self) -> bool {
        self.children.is_some()
    }
}

/// What [`Session::mailboxes`] should return.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListOptions {
    /// List below this folder instead of the root.
    pub top: Option<String>,
    /// Expand every level needed to reach this folder.
    pub until: Option<String>,
    /// Probe unseen counts.
    pub unseen: bool,
    /// Folders that lead the root level in this order, listed or not.
    pub pinned: Vec<String>,
}

impl ListOptions {
    /// Root level, no counts, nothing pinned.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Lists below `top`.
    #[must_use]
    pub fn top(mut self, top: impl Into<String>) -> Self {
        self.top = Some(top.into()).filter(|top: &String| !top.is_empty());
        self
    }

    /// Expands the path to `mailbox`.
    #[must_use]
    pub fn until(mut self, mailbox: impl Into<String>) -> Self {
        self.until = Some(mailbox.into()).filter(|until: &String| !until.is_empty());
        self
    }

    /// Attaches unseen counts.
    #[must_use]
    pub const fn with_unseen(mut self, unseen: bool) -> Self {
        self.unseen = unseen;
        self
    }

    /// Pins special folders at the root.
    #[must_use]
    pub fn pinned<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pinned = names.into_iter().map(Into::into).collect();
        self
    }
}

/// Splits a full name into its last segment and its parent.
///
/// ```
/// use webmail_imap::hierarchy::separate_mailbox;
///
/// assert_eq!(separate_mailbox("INBOX.Lists.rust", '.'), ("rust", Some("INBOX.Lists")));
/// assert_eq!(separate_mailbox("Archive", '.'), ("Archive", None));
/// ```
#[must_use]
pub fn separate_mailbox(full: &str, delimiter: char) -> (&str, Option<&str>) {
    match full.rsplit_once(delimiter) {
        Some((parent, name)) => (name, Some(parent)),
        None => (full, None),
    }
}

/// Returns true when `path` is `until` or one of its ancestors.
fn leads_to(until: Option<&str>, path: &str, delimiter: char) -> bool {
    until.is_some_and(|until| {
        until == path
            || until
                .strip_prefix(path)
                .is_some_and(|rest| rest.starts_with(delimiter))
    })
}

fn sort_level(nodes: &mut [MailboxNode]) {
    nodes.sort_by(|a, b| a.name.cmp(&b.name));
}

/// Moves the pinned folders to the front, in the given order, adding
/// placeholders for the ones the server did not list.
fn pin(nodes: Vec<MailboxNode>, pinned: &[String], delimiter: char) -> Vec<MailboxNode> {
    let matches = |node: &MailboxNode, name: &str| {
        if name.eq_ignore_ascii_case("INBOX") {
            node.path.eq_ignore_ascii_case("INBOX")
        } else {
            node.path == name
        }
    };

    let mut rest = nodes;
    let mut leading: Vec<MailboxNode> = Vec::new();
    for name in pinned.iter().filter(|name| !name.is_empty()) {
        if leading.iter().any(|node| matches(node, name)) {
            continue;
        }
        let node = match rest.iter().position(|node| matches(node, name)) {
            Some(index) => rest.remove(index),
            None => MailboxNode::placeholder(name, delimiter),
        };
        leading.push(node);
    }
    leading.extend(rest);
    leading
}

fn probe_targets(nodes: &[MailboxNode], out: &mut Vec<String>) {
    for node in nodes {
        if node.needs_status && !node.removed {
            out.push(node.path.clone());
        }
        if let Some(children) = &node.children {
            probe_targets(children, out);
        }
    }
}

fn apply_counts(nodes: &mut [MailboxNode], counts: &HashMap<String, u32>) {
    for node in nodes {
        if let Some(&count) = counts.get(&node.path) {
            node.unseen = Some(count);
        }
        if let Some(children) = &mut node.children {
            apply_counts(children, counts);
        }
    }
}

impl<C: Connector> Session<C> {
    /// Builds the folder tree described by `options`.
    ///
    /// Every level is sorted by name. A target mailbox in
    /// [`ListOptions::until`] opens the levels leading to it; its own
    /// subfolders stay collapsed.
    ///
    /// # Errors
    ///
    /// Fails when a `LIST` is refused or the connection is lost. A refused
    /// unseen probe leaves that folder without a count.
    pub async fn mailboxes(&mut self, options: &ListOptions) -> Result<Vec<MailboxNode>> {
        let extended = self.has_capability(&Capability::ListExtended);
        self.mailboxes_with(options, extended).await
    }

    pub(crate) async fn mailboxes_with(
        &mut self,
        options: &ListOptions,
        extended: bool,
    ) -> Result<Vec<MailboxNode>> {
        let delimiter = self.delimiter();
        let top = options.top.as_deref();
        let until = options
            .until
            .as_deref()
            .and_then(|until| separate_mailbox(until, delimiter).1);

        let mut nodes = if extended {
            self.list_extended_tree(top, until, delimiter).await?
        } else {
            let result = self.connected()?.list("", "*").await;
            let responses = self.track(result)?;
            simple::build(&responses, delimiter, top, until)
        };
        tracing::debug!(top, until, extended, count = nodes.len(), "listed mailboxes");

        if top.is_none() {
            nodes = pin(nodes, &options.pinned, delimiter);
        }
        if options.unseen {
            self.attach_unseen(&mut nodes).await?;
        }
        Ok(nodes)
    }

    async fn attach_unseen(&mut self, nodes: &mut [MailboxNode]) -> Result<()> {
        let mut targets = Vec::new();
        probe_targets(nodes, &mut targets);

        let mut counts = HashMap::new();
        for path in targets {
            match self.unseen_count(&path).await {
                Ok(0) => {}
                Ok(count) => {
                    counts.insert(path, count);
                }
                Err(e) if e.is_connection_fault() => return Err(e),
                Err(e) => tracing::warn!(mailbox = %path, %e, "unseen probe refused"),
            }
        }
        apply_counts(nodes, &counts);
        Ok(())
    }
}
