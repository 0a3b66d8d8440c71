//! Core domain types for mapvault.
//!
//! The crate defines upload records and their metadata, owner-scoped map
//! annotations, the bounding-box reducer used by the GeoJSON parser, and the
//! store traits that persist all of them. Constructors return `Result` so that
//! invalid values never reach a store.
#![forbid(unsafe_code)]

pub mod annotation;
pub mod file;
pub mod geometry;
mod owner;
pub mod store;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use annotation::{
    AnnotationError, Marker, MarkerDraft, MarkerPatch, MarkerPosition, Properties, RecordId,
    Shape, ShapeDraft, ShapePatch,
};
pub use file::{
    FileFormat, FileMetadata, GeoJsonMetadata, KmlMetadata, MAX_STORAGE_NAME_LEN, StorageName,
    StorageNameError, UploadedFile, UploadedFileError, sanitise_original_name,
};
pub use geometry::{
    BoundingBox, BoundsAccumulator, CoordinateTree, GeometryError, MAX_COORDINATE_DEPTH,
    bounding_box,
};
pub use owner::{OwnerId, OwnerIdError};
pub use store::{
    AnnotationStore, BlobError, BlobStore, CredentialStore, FileRecordStore, StoreError,
};
#[cfg(feature = "store-sqlite")]
pub use store::{SCHEMA_VERSION, SchemaError, SqliteStore, SqliteStoreError};
