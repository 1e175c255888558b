//! Service configuration.

use webmail_imap::{Config, OVERVIEW_HEADERS};

/// How many users may hold a pooled connection at once by default.
pub const DEFAULT_MAX_IDENTITIES: usize = 64;

/// Names of the special folders, as the web tier configures them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderNames {
    /// Drafts folder.
    pub drafts: String,
    /// Junk folder.
    pub junk: String,
    /// Sent folder.
    pub sent: String,
    /// Trash folder.
    pub trash: String,
}

impl Default for FolderNames {
    fn default() -> Self {
        Self {
            drafts: "Drafts".to_string(),
            junk: "Junk".to_string(),
            sent: "Sent".to_string(),
            trash: "Trash".to_string(),
        }
    }
}

/// Everything the service layer needs besides per-request credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebmailConfig {
    /// How to reach the IMAP server.
    pub imap: Config,
    /// Special folder names.
    pub folders: FolderNames,
    /// Header fields fetched for the message list.
    pub overview_headers: Vec<String>,
    /// Upper bound on pooled identities.
    pub max_identities: usize,
}

impl WebmailConfig {
    /// Default folders and headers for `imap`.
    #[must_use]
    pub fn new(imap: Config) -> Self {
        WebmailConfigBuilder::new(imap).build()
    }

    /// Starts a builder for `imap`.
    #[must_use]
    pub fn builder(imap: Config) -> WebmailConfigBuilder {
        WebmailConfigBuilder::new(imap)
    }

    /// Folders that lead the top-level folder list, `INBOX` first.
    #[must_use]
    pub fn pinned(&self) -> [&str; 5] {
        [
            "INBOX",
            &self.folders.drafts,
            &self.folders.junk,
            &self.folders.sent,
            &self.folders.trash,
        ]
    }
}

/// Builder for [`WebmailConfig`].
#[derive(Debug, Clone)]
pub struct WebmailConfigBuilder {
    imap: Config,
    folders: FolderNames,
    overview_headers: Vec<String>,
    max_identities: usize,
}

impl WebmailConfigBuilder {
    /// Creates a builder with the default folder names.
    #[must_use]
    pub fn new(imap: Config) -> Self {
        Self {
            imap,
            folders: FolderNames::default(),
            overview_headers: OVERVIEW_HEADERS.iter().map(ToString::to_string).collect(),
            max_identities: DEFAULT_MAX_IDENTITIES,
        }
    }

    /// Sets the special folder names.
    #[must_use]
    pub fn folders(mut self, folders: FolderNames) -> Self {
        self.folders = folders;
        self
    }

    /// Sets the header fields of the message list. An empty list keeps
    /// the defaults.
    #[must_use]
    pub fn overview_headers<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let headers: Vec<String> = headers.into_iter().map(Into::into).collect();
        if !headers.is_empty() {
            self.overview_headers = headers;
        }
        self
    }

    /// Sets the pool bound; zero is raised to one.
    #[must_use]
    pub const fn max_identities(mut self, max: usize) -> Self {
        self.max_identities = if max == 0 { 1 } else { max };
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> WebmailConfig {
        WebmailConfig {
            imap: self.imap,
            folders: self.folders,
            overview_headers: self.overview_headers,
            max_identities: self.max_identities,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = WebmailConfig::new(Config::new("imap.example.com"));
        assert_eq!(config.pinned(), ["INBOX", "Drafts", "Junk", "Sent", "Trash"]);
        assert_eq!(config.overview_headers, ["DATE", "FROM", "TO", "CC", "SUBJECT"]);
        assert_eq!(config.max_identities, DEFAULT_MAX_IDENTITIES);
    }

    #[test]
    fn test_builder_overrides() {
        let config = WebmailConfig::builder(Config::new("localhost"))
            .folders(FolderNames {
                trash: "Deleted Items".into(),
                ..FolderNames::default()
            })
            .overview_headers(Vec::<String>::new())
            .max_identities(0)
            .build();
        assert_eq!(config.pinned()[4], "Deleted Items");
        assert_eq!(config.overview_headers.len(), 5);
        assert_eq!(config.max_identities, 1);
    }
}
