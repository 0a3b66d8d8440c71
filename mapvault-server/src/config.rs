//! Resolved server settings.

use std::net::{Ipv4Addr, SocketAddr};

use camino::{Utf8Path, Utf8PathBuf};
use mapvault_data::{DEFAULT_MAX_UPLOAD_BYTES, RetrievalPolicy};

/// Default listening port.
pub const DEFAULT_PORT: u16 = 5000;

/// Name of the SQLite database inside the data directory.
pub const DATABASE_FILE: &str = "mapvault.db";

/// Name of the blob directory inside the data directory.
pub const UPLOADS_DIR: &str = "uploads";

/// Settings needed to open stores and serve requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Socket address to listen on.
    pub bind: SocketAddr,
    /// Directory holding the database and the upload area.
    pub data_dir: Utf8PathBuf,
    /// Largest accepted upload in bytes.
    pub max_upload_bytes: usize,
    /// Who may fetch stored files.
    pub retrieval_policy: RetrievalPolicy,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_PORT)),
            data_dir: Utf8PathBuf::from("data"),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            retrieval_policy: RetrievalPolicy::default(),
        }
    }
}

impl ServerConfig {
    /// Settings rooted at `data_dir` with every other value defaulted.
    #[must_use]
    pub fn for_data_dir(data_dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    /// Path of the SQLite database.
    #[must_use]
    pub fn database_path(&self) -> Utf8PathBuf {
        self.data_dir.join(DATABASE_FILE)
    }

    /// Path of the upload area.
    #[must_use]
    pub fn uploads_dir(&self) -> Utf8PathBuf {
        self.data_dir.join(UPLOADS_DIR)
    }

    /// Data directory.
    #[must_use]
    pub fn data_dir(&self) -> &Utf8Path {
        &self.data_dir
    }
}
