//! Store configuration
//!
//! Construction parameters for a `Store`. The document-store source must be
//! declared explicitly: either a connection URI or `relational_only()`.
//! Leaving it undeclared is a fatal configuration error, not a silent
//! fallback.

use std::path::PathBuf;
use std::time::Duration;

use super::schema::Mode;

/// Timeout bounds for the remote document store. Connection attempts and
/// server selection are bounded independently.
#[derive(Debug, Clone)]
pub struct DocumentTimeouts {
    pub connect: Duration,
    pub server_selection: Duration,
}

impl Default for DocumentTimeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(30),
            server_selection: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) enum DocumentSource {
    /// Nothing declared; rejected at construction.
    Unset,
    /// Relational backend only.
    Disabled,
    /// Remote document store at this URI.
    Uri(String),
}

/// Construction parameters for a `Store`.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub(crate) database: String,
    pub(crate) collection: String,
    pub(crate) mode: Mode,
    pub(crate) data_dir: PathBuf,
    pub(crate) document: DocumentSource,
    pub(crate) timeouts: DocumentTimeouts,
}

impl StoreConfig {
    pub fn new(database: impl Into<String>, collection: impl Into<String>, mode: Mode) -> Self {
        Self {
            database: database.into(),
            collection: collection.into(),
            mode,
            data_dir: PathBuf::from("."),
            document: DocumentSource::Unset,
            timeouts: DocumentTimeouts::default(),
        }
    }

    /// Directory holding the `{database}.db` file. Defaults to the working
    /// directory.
    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    /// Activate the document backend at this connection URI.
    pub fn document_uri(mut self, uri: impl Into<String>) -> Self {
        self.document = DocumentSource::Uri(uri.into());
        self
    }

    /// Run with the relational backend only.
    pub fn relational_only(mut self) -> Self {
        self.document = DocumentSource::Disabled;
        self
    }

    pub fn document_timeouts(mut self, timeouts: DocumentTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub(crate) fn db_path(&self) -> PathBuf {
        self.data_dir.join(format!("{}.db", self.database))
    }
}
