//! NAMESPACE response data (RFC 2342).

/// One `("prefix" "delimiter")` pair from a NAMESPACE response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceEntry {
    /// Mailbox name prefix, e.g. `INBOX.` or `""`.
    pub prefix: String,
    /// Hierarchy delimiter for this namespace, `None` for `NIL`.
    pub delimiter: Option<char>,
}

/// The three namespace groups a server reports.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Namespaces {
    /// The user's own mailboxes.
    pub personal: Vec<NamespaceEntry>,
    /// Other users' mailboxes.
    pub other_users: Vec<NamespaceEntry>,
    /// Shared mailboxes.
    pub shared: Vec<NamespaceEntry>,
}

impl Namespaces {
    /// Returns the first delimiter reported, scanning personal, then
    /// other-users, then shared namespaces.
    #[must_use]
    pub fn first_delimiter(&self) -> Option<char> {
        self.personal
            .iter()
            .chain(&self.other_users)
            .chain(&self.shared)
            .find_map(|entry| entry.delimiter)
    }

    /// Returns the personal namespace prefixes.
    pub fn personal_prefixes(&self) -> impl Iterator<Item = &str> {
        self.personal.iter().map(|entry| entry.prefix.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_delimiter_skips_empty_groups() {
        let ns = Namespaces {
            personal: Vec::new(),
            other_users: vec![NamespaceEntry {
                prefix: "#Users/".into(),
                delimiter: Some('/'),
            }],
            shared: vec![NamespaceEntry {
                prefix: "#Public.".into(),
                delimiter: Some('.'),
            }],
        };
        assert_eq!(ns.first_delimiter(), Some('/'));
    }

    #[test]
    fn first_delimiter_none() {
        assert_eq!(Namespaces::default().first_delimiter(), None);
    }
}
