//! Opening persisted state from a data directory.

use std::io;
use std::sync::Arc;

use camino::Utf8PathBuf;
use mapvault_core::{SqliteStore, SqliteStoreError};
use mapvault_data::{BlobAreaError, FsBlobStore};
use thiserror::Error;

use crate::config::ServerConfig;
use crate::state::AppState;

/// Failures while opening the data directory.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// The data directory could not be created.
    #[error("failed to prepare data directory {path}: {source}")]
    DataDir {
        /// Directory that was requested.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// The database could not be opened or migrated.
    #[error(transparent)]
    Database(#[from] SqliteStoreError),
    /// The upload area could not be opened.
    #[error(transparent)]
    Uploads(#[from] BlobAreaError),
}

/// Stores opened from a data directory.
#[derive(Debug)]
pub struct OpenedStores {
    /// SQLite store for records and credentials.
    pub records: Arc<SqliteStore>,
    /// Filesystem blob area.
    pub blobs: Arc<FsBlobStore>,
}

/// Open (creating where needed) the database and upload area under
/// `config.data_dir`.
pub fn open_stores(config: &ServerConfig) -> Result<OpenedStores, BootstrapError> {
    mapvault_fs::open_or_create_dir(config.data_dir()).map_err(|source| {
        BootstrapError::DataDir {
            path: config.data_dir.clone(),
            source,
        }
    })?;
    let records = Arc::new(SqliteStore::open(config.database_path())?);
    let blobs = Arc::new(FsBlobStore::open(&config.uploads_dir())?);
    tracing::debug!(data_dir = %config.data_dir, "opened persisted state");
    Ok(OpenedStores { records, blobs })
}

/// Open the stores and wrap them in [`AppState`].
pub fn open_state(config: &ServerConfig) -> Result<AppState, BootstrapError> {
    let OpenedStores { records, blobs } = open_stores(config)?;
    Ok(AppState::new(
        blobs,
        records,
        config.max_upload_bytes,
        config.retrieval_policy,
    ))
}
