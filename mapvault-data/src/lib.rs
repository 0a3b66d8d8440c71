//! Upload ingestion and retrieval for mapvault.
//!
//! Responsibilities:
//! - Parse GeoJSON and KML uploads into [`mapvault_core::FileMetadata`].
//! - Coordinate ingestion: validation, blob write, parse, record write.
//! - Store raw bytes in a capability-scoped upload directory.
//! - Read bytes back under a [`RetrievalPolicy`].
//!
//! Boundaries:
//! - Domain types and store traits live in `mapvault-core`.
//! - All I/O here is blocking; async callers run it on a blocking pool.

#![forbid(unsafe_code)]

mod blob;
mod formats;
mod ingest;
mod retrieve;

pub use blob::{BlobAreaError, FsBlobStore};
pub use formats::{GeoJsonError, KmlError, ParseError, extract_metadata, parse_geojson, parse_kml};
pub use ingest::{
    DEFAULT_MAX_UPLOAD_BYTES, IngestError, Ingestor, StorageFailure, StorageNamer, Upload,
};
pub use retrieve::{
    ContentDesignation, ParsePolicyError, RetrievalPolicy, RetrieveError, RetrievedFile, Retriever,
};
