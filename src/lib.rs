//! Facade crate for the `mapvault` geospatial upload store.
//!
//! This crate re-exports the core domain types and exposes the ingestion
//! pipeline and the `SqliteStore` behind the `ingest` and `store-sqlite`
//! feature flags.

#![forbid(unsafe_code)]

pub use mapvault_core::{
    AnnotationError, AnnotationStore, BlobError, BlobStore, BoundingBox, CredentialStore,
    FileFormat, FileMetadata, FileRecordStore, Marker, MarkerDraft, MarkerPatch, OwnerId, Shape,
    ShapeDraft, ShapePatch, StorageName, StoreError, UploadedFile,
};

#[cfg(feature = "store-sqlite")]
pub use mapvault_core::{SqliteStore, SqliteStoreError};

#[cfg(feature = "ingest")]
pub use mapvault_data::{
    FsBlobStore, IngestError, Ingestor, RetrievalPolicy, RetrieveError, RetrievedFile, Retriever,
    StorageFailure, Upload, extract_metadata,
};
