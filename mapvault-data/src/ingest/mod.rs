//! Upload ingestion: validate, persist bytes, parse, record.
//!
//! The coordinator runs every cheap rejection (empty input, size ceiling,
//! extension) before touching the blob area. Bytes are written before the
//! parser runs so that a persisted record always has retrievable bytes; a blob
//! whose parse or record write fails is removed again.

mod naming;

use std::sync::Arc;

use mapvault_core::{
    BlobError, BlobStore, FileFormat, FileRecordStore, OwnerId, StorageName, StoreError,
    UploadedFile, UploadedFileError, sanitise_original_name,
};
use thiserror::Error;
use time::OffsetDateTime;

use crate::formats::{ParseError, extract_metadata};

pub use naming::StorageNamer;

/// Default upload ceiling: 10 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Attempts made to find an unused storage name before giving up.
const MAX_NAME_ATTEMPTS: usize = 8;

/// One upload as received from a client.
#[derive(Debug, Clone)]
pub struct Upload {
    /// Raw file content.
    pub bytes: Vec<u8>,
    /// File name supplied by the client.
    pub original_name: String,
    /// Authenticated uploader.
    pub owner: OwnerId,
}

/// Reasons an upload is rejected.
#[derive(Debug, Error)]
pub enum IngestError {
    /// No content, or no usable file name.
    #[error("No file uploaded")]
    NoFileProvided,
    /// The file extension is not accepted.
    #[error("file '{name}' has an unsupported extension; expected .geojson, .kml, .tif or .tiff")]
    UnsupportedExtension {
        /// Sanitised client file name.
        name: String,
    },
    /// The content exceeds the configured ceiling.
    #[error("upload exceeds the {limit} byte limit ({size} bytes received)")]
    SizeExceeded {
        /// Bytes received before the upload was rejected.
        size: usize,
        /// Configured ceiling.
        limit: usize,
    },
    /// The parser rejected the content.
    #[error("{source}")]
    MalformedContent {
        /// Format the content was parsed as.
        format: FileFormat,
        /// Parser failure.
        #[source]
        source: ParseError,
    },
    /// The metadata store or the blob area failed.
    #[error("failed to store upload: {source}")]
    StoreFailure {
        /// Underlying storage failure.
        #[source]
        source: StorageFailure,
    },
}

impl IngestError {
    /// Whether the failure lies with the server's storage rather than the
    /// upload itself.
    #[must_use]
    pub const fn is_storage_failure(&self) -> bool {
        matches!(self, Self::StoreFailure { .. })
    }
}

impl From<StorageFailure> for IngestError {
    fn from(source: StorageFailure) -> Self {
        Self::StoreFailure { source }
    }
}

/// Storage-side causes of [`IngestError::StoreFailure`].
#[derive(Debug, Error)]
pub enum StorageFailure {
    /// The metadata store rejected the record.
    #[error("metadata store: {0}")]
    Records(#[from] StoreError),
    /// The blob area failed, including running out of unused storage names.
    #[error("blob area: {0}")]
    Blobs(#[from] BlobError),
    /// Extracted metadata disagreed with the declared format.
    #[error("inconsistent record: {0}")]
    Record(#[from] UploadedFileError),
}

/// Ingestion coordinator shared by every request.
#[derive(Clone)]
pub struct Ingestor {
    blobs: Arc<dyn BlobStore>,
    records: Arc<dyn FileRecordStore>,
    namer: Arc<StorageNamer>,
    max_bytes: usize,
}

impl std::fmt::Debug for Ingestor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ingestor")
            .field("max_bytes", &self.max_bytes)
            .finish_non_exhaustive()
    }
}

impl Ingestor {
    /// Coordinator over the given stores with the default size ceiling.
    pub fn new(blobs: Arc<dyn BlobStore>, records: Arc<dyn FileRecordStore>) -> Self {
        Self {
            blobs,
            records,
            namer: Arc::new(StorageNamer::default()),
            max_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    /// Replace the size ceiling.
    #[must_use]
    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    /// Replace the storage namer.
    #[must_use]
    pub fn with_namer(mut self, namer: StorageNamer) -> Self {
        self.namer = Arc::new(namer);
        self
    }

    /// Configured size ceiling in bytes.
    #[must_use]
    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Ingest one upload and return the persisted record.
    pub fn ingest(&self, upload: Upload) -> Result<UploadedFile, IngestError> {
        let Upload {
            bytes,
            original_name,
            owner,
        } = upload;

        if bytes.is_empty() {
            return Err(IngestError::NoFileProvided);
        }
        if bytes.len() > self.max_bytes {
            return Err(IngestError::SizeExceeded {
                size: bytes.len(),
                limit: self.max_bytes,
            });
        }
        let original = sanitise_original_name(&original_name).ok_or(IngestError::NoFileProvided)?;
        let (format, extension) = FileFormat::from_file_name(&original).ok_or_else(|| {
            IngestError::UnsupportedExtension {
                name: original.clone(),
            }
        })?;

        let storage_name = self.write_blob(&original, &bytes)?;

        let metadata = match extract_metadata(format, &bytes) {
            Ok(metadata) => metadata,
            Err(source) => {
                log::info!("rejected {format} upload '{original}' from {owner}: {source}");
                self.discard_blob(&storage_name);
                return Err(IngestError::MalformedContent { format, source });
            }
        };

        let record = match UploadedFile::new(
            storage_name.clone(),
            original,
            (format, extension),
            owner,
            metadata,
            OffsetDateTime::now_utc(),
        ) {
            Ok(record) => record,
            Err(err) => {
                self.discard_blob(&storage_name);
                return Err(StorageFailure::from(err).into());
            }
        };

        if let Err(err) = self.records.insert_file(&record) {
            self.discard_blob(&storage_name);
            return Err(StorageFailure::from(err).into());
        }

        log::info!(
            "ingested {} upload '{}' as {} for {}",
            record.format,
            record.original_name,
            record.storage_name,
            record.owner
        );
        Ok(record)
    }

    fn write_blob(&self, original: &str, bytes: &[u8]) -> Result<StorageName, IngestError> {
        let mut attempt = 1;
        loop {
            let name = self
                .namer
                .name_for(original)
                .map_err(|_| IngestError::NoFileProvided)?;
            match self.blobs.put_new(&name, bytes) {
                Ok(()) => return Ok(name),
                Err(BlobError::AlreadyExists { .. }) if attempt < MAX_NAME_ATTEMPTS => {
                    log::debug!("storage name {name} already taken; retrying");
                    attempt += 1;
                }
                Err(err) => return Err(StorageFailure::from(err).into()),
            }
        }
    }

    fn discard_blob(&self, name: &StorageName) {
        if let Err(err) = self.blobs.remove(name) {
            log::warn!("failed to remove orphaned blob {name}: {err}");
        }
    }
}

#[cfg(test)]
mod tests;
