//! Tree building from a flat `LIST "" "*"`.

use std::collections::BTreeMap;

use super::{MailboxNode, leads_to, sort_level};
use crate::types::ListResponse;

#[derive(Default)]
struct Entry<'a> {
    listed: Option<&'a ListResponse>,
    children: BTreeMap<&'a str, Entry<'a>>,
}

/// Cuts the level below `top` out of a full listing, expanding the
/// folders that lead to `until`.
///
/// Levels of hierarchy the server did not list by themselves become
/// placeholders that take no unseen probe.
pub(super) fn build(
    responses: &[ListResponse],
    delimiter: char,
    top: Option<&str>,
    until: Option<&str>,
) -> Vec<MailboxNode> {
    let mut root = Entry::default();
    for response in responses {
        let separator = response.delimiter.unwrap_or(delimiter);
        let mut entry = &mut root;
        for segment in response.mailbox.as_str().split(separator) {
            entry = entry.children.entry(segment).or_default();
        }
        entry.listed = Some(response);
    }

    let mut level = &root;
    let mut prefix = String::new();
    if let Some(top) = top {
        for segment in top.split(delimiter) {
            match level.children.get(segment) {
                Some(entry) => level = entry,
                None => return Vec::new(),
            }
        }
        prefix = top.to_string();
    }
    convert(level, &prefix, delimiter, until)
}

fn convert(
    entry: &Entry<'_>,
    prefix: &str,
    delimiter: char,
    until: Option<&str>,
) -> Vec<MailboxNode> {
    let mut nodes: Vec<MailboxNode> = entry
        .children
        .iter()
        .map(|(segment, child)| {
            let path = if prefix.is_empty() {
                (*segment).to_string()
            } else {
                format!("{prefix}{delimiter}{segment}")
            };
            let mut node = match child.listed {
                Some(response) => MailboxNode::from_list(response, delimiter),
                None => MailboxNode::placeholder(&path, delimiter),
            };
            if !child.children.is_empty() || node.has_children() {
                node.children = Some(if leads_to(until, &path, delimiter) {
                    convert(child, &path, delimiter, until)
                } else {
                    Vec::new()
                });
            }
            node
        })
        .collect();
    sort_level(&mut nodes);
    nodes
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{Mailbox, MailboxAttribute};

    fn listed(name: &str, attributes: Vec<MailboxAttribute>) -> ListResponse {
        ListResponse {
            attributes,
            delimiter: Some('/'),
            mailbox: Mailbox::new(name),
        }
    }

    #[test]
    fn test_missing_levels_become_placeholders() {
        let responses = [listed("a/b/c", vec![]), listed("z", vec![])];
        let nodes = build(&responses, '/', None, Some("a/b"));

        assert_eq!(nodes.len(), 2);
        let a = &nodes[0];
        assert_eq!((a.name.as_str(), a.needs_status), ("a", false));
        let b = &a.children.as_ref().unwrap()[0];
        assert_eq!(b.path, "a/b");
        let c = &b.children.as_ref().unwrap()[0];
        assert_eq!((c.path.as_str(), c.needs_status), ("a/b/c", true));
        assert!(c.children.is_none());
    }

    #[test]
    fn test_descends_through_unlisted_level() {
        let responses = [
            listed("INBOX", vec![]),
            listed("INBOX/Drafts", vec![]),
            listed("INBOX/Archive/2020", vec![]),
        ];
        let nodes = build(&responses, '/', None, Some("INBOX/Archive"));

        let inbox = nodes[0].children.as_ref().unwrap();
        let names: Vec<&str> = inbox.iter().map(|node| node.name.as_str()).collect();
        assert_eq!(names, ["Archive", "Drafts"]);
        let archive = inbox[0].children.as_ref().unwrap();
        assert_eq!(archive.len(), 1);
        assert_eq!(archive[0].path, "INBOX/Archive/2020");
        assert!(inbox[1].children.is_none());
    }

    #[test]
    fn test_dotted_names_nest_three_levels() {
        let dotted = |name: &str, attributes: Vec<MailboxAttribute>| ListResponse {
            attributes,
            delimiter: Some('.'),
            mailbox: Mailbox::new(name),
        };
        let responses = [
            dotted("INBOX", vec![MailboxAttribute::HasChildren]),
            dotted("INBOX.Drafts", vec![]),
            dotted(
                "INBOX.Archive",
                vec![MailboxAttribute::NoSelect, MailboxAttribute::HasChildren],
            ),
            dotted("INBOX.Archive.2020", vec![]),
        ];
        let nodes = build(&responses, '.', None, Some("INBOX.Archive"));

        assert_eq!(nodes.len(), 1);
        assert!(nodes[0].needs_status);
        let inbox = nodes[0].children.as_ref().unwrap();
        let paths: Vec<&str> = inbox.iter().map(|node| node.path.as_str()).collect();
        assert_eq!(paths, ["INBOX.Archive", "INBOX.Drafts"]);

        let archive = &inbox[0];
        assert_eq!(archive.name, "Archive");
        assert!(!archive.needs_status);
        let years = archive.children.as_ref().unwrap();
        assert_eq!(years.len(), 1);
        assert_eq!((years[0].name.as_str(), years[0].path.as_str()), ("2020", "INBOX.Archive.2020"));
        assert!(years[0].needs_status);
        assert!(years[0].children.is_none());
        assert!(inbox[1].children.is_none());
    }

    #[test]
    fn test_top_selects_a_subtree() {
        let responses = [
            listed("a", vec![]),
            listed("a/y", vec![]),
            listed("a/x", vec![MailboxAttribute::NoSelect]),
            listed("a/x/1", vec![]),
        ];
        let nodes = build(&responses, '/', Some("a"), None);
        let names: Vec<&str> = nodes.iter().map(|node| node.name.as_str()).collect();
        assert_eq!(names, ["x", "y"]);
        assert_eq!(nodes[0].children, Some(Vec::new()));
        assert!(!nodes[0].needs_status);

        assert!(build(&responses, '/', Some("nope"), None).is_empty());
    }
}
