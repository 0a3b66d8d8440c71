//! Persistence traits for upload records, annotations, credentials and raw
//! upload bytes.
//!
//! Stores are synchronous and shared across threads. Every owner-scoped
//! operation takes the caller's [`OwnerId`] and treats another owner's record
//! exactly like a missing one.

use std::error::Error as StdError;

use thiserror::Error;
use time::OffsetDateTime;

use crate::{
    Marker, MarkerPatch, OwnerId, RecordId, Shape, ShapePatch, StorageName, UploadedFile,
};

#[cfg(feature = "store-sqlite")]
mod schema;
#[cfg(feature = "store-sqlite")]
mod sqlite;

#[cfg(feature = "store-sqlite")]
pub use schema::{SCHEMA_VERSION, SchemaError};
#[cfg(feature = "store-sqlite")]
pub use sqlite::{SqliteStore, SqliteStoreError};

/// Failure reported by a record store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend rejected or failed an operation.
    #[error("store operation '{operation}' failed: {source}")]
    Backend {
        /// Short description of the failed operation.
        operation: &'static str,
        /// Backend error.
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
    /// A record with the same key already exists.
    #[error("{entity} '{key}' already exists")]
    Duplicate {
        /// Kind of record.
        entity: &'static str,
        /// Conflicting key.
        key: String,
    },
    /// A persisted record could not be decoded.
    #[error("stored {entity} '{key}' is corrupt: {reason}")]
    Corrupt {
        /// Kind of record.
        entity: &'static str,
        /// Key of the corrupt record.
        key: String,
        /// Decoding failure.
        reason: String,
    },
    /// A thread panicked while holding the store lock.
    #[error("store lock poisoned")]
    Poisoned,
}

impl StoreError {
    /// Wrap a backend error with the operation that raised it.
    pub fn backend(
        operation: &'static str,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::Backend {
            operation,
            source: Box::new(source),
        }
    }
}

/// Metadata records for ingested uploads.
pub trait FileRecordStore: Send + Sync {
    /// Persist a new record. Fails with [`StoreError::Duplicate`] when the
    /// storage name is taken.
    fn insert_file(&self, record: &UploadedFile) -> Result<(), StoreError>;

    /// Look a record up by exact storage name, regardless of owner.
    fn find_file(&self, name: &StorageName) -> Result<Option<UploadedFile>, StoreError>;

    /// All records belonging to `owner`, oldest first.
    fn files_for_owner(&self, owner: &OwnerId) -> Result<Vec<UploadedFile>, StoreError>;

    /// Number of records belonging to `owner`.
    fn count_files(&self, owner: &OwnerId) -> Result<u64, StoreError>;
}

/// Owner-scoped marker and shape records.
pub trait AnnotationStore: Send + Sync {
    /// Persist a new marker.
    fn insert_marker(&self, marker: &Marker) -> Result<(), StoreError>;

    /// Markers belonging to `owner`, in creation order.
    fn markers_for_owner(&self, owner: &OwnerId) -> Result<Vec<Marker>, StoreError>;

    /// The marker `id` if it belongs to `owner`.
    fn find_marker(&self, owner: &OwnerId, id: RecordId) -> Result<Option<Marker>, StoreError>;

    /// Apply `patch` to the marker `id` owned by `owner`, returning the
    /// updated marker or `None` when there is no such marker.
    fn update_marker(
        &self,
        owner: &OwnerId,
        id: RecordId,
        patch: MarkerPatch,
        now: OffsetDateTime,
    ) -> Result<Option<Marker>, StoreError>;

    /// Delete the marker `id` owned by `owner`. Returns whether one existed.
    fn delete_marker(&self, owner: &OwnerId, id: RecordId) -> Result<bool, StoreError>;

    /// Number of markers belonging to `owner`.
    fn count_markers(&self, owner: &OwnerId) -> Result<u64, StoreError>;

    /// Persist a new shape.
    fn insert_shape(&self, shape: &Shape) -> Result<(), StoreError>;

    /// Shapes belonging to `owner`, in creation order.
    fn shapes_for_owner(&self, owner: &OwnerId) -> Result<Vec<Shape>, StoreError>;

    /// The shape `id` if it belongs to `owner`.
    fn find_shape(&self, owner: &OwnerId, id: RecordId) -> Result<Option<Shape>, StoreError>;

    /// Apply `patch` to the shape `id` owned by `owner`.
    fn update_shape(
        &self,
        owner: &OwnerId,
        id: RecordId,
        patch: ShapePatch,
    ) -> Result<Option<Shape>, StoreError>;

    /// Delete the shape `id` owned by `owner`. Returns whether one existed.
    fn delete_shape(&self, owner: &OwnerId, id: RecordId) -> Result<bool, StoreError>;

    /// Number of shapes belonging to `owner`.
    fn count_shapes(&self, owner: &OwnerId) -> Result<u64, StoreError>;
}

/// Bearer-token digests mapped to owners.
///
/// Only SHA-256 hex digests are stored; raw tokens never reach the store.
pub trait CredentialStore: Send + Sync {
    /// Resolve a token digest to its owner.
    fn owner_for_token_digest(&self, digest: &str) -> Result<Option<OwnerId>, StoreError>;

    /// Register a new token digest for `owner`.
    fn register_token_digest(&self, digest: &str, owner: &OwnerId) -> Result<(), StoreError>;
}

/// Failure reported by a [`BlobStore`].
#[derive(Debug, Error)]
pub enum BlobError {
    /// A blob with this name already exists.
    #[error("blob '{name}' already exists")]
    AlreadyExists {
        /// Conflicting storage name.
        name: StorageName,
    },
    /// Underlying I/O failed.
    #[error("failed to {operation} blob '{name}': {source}")]
    Io {
        /// Operation being attempted.
        operation: &'static str,
        /// Storage name involved.
        name: StorageName,
        /// I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Raw upload bytes keyed by storage name.
pub trait BlobStore: Send + Sync {
    /// Write a new blob, failing with [`BlobError::AlreadyExists`] rather than
    /// overwriting.
    fn put_new(&self, name: &StorageName, bytes: &[u8]) -> Result<(), BlobError>;

    /// Read a blob, or `None` when it does not exist.
    fn get(&self, name: &StorageName) -> Result<Option<Vec<u8>>, BlobError>;

    /// Remove a blob. Removing a missing blob is not an error.
    fn remove(&self, name: &StorageName) -> Result<(), BlobError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{MemoryBlobStore, MemoryStore};
    use crate::{MarkerDraft, MarkerPosition, Properties};
    use rstest::{fixture, rstest};

    #[fixture]
    fn store() -> MemoryStore {
        MemoryStore::default()
    }

    fn owner(name: &str) -> OwnerId {
        OwnerId::new(name).expect("valid owner")
    }

    fn marker_for(owner: &OwnerId) -> Marker {
        Marker::create(
            owner.clone(),
            MarkerDraft {
                coordinates: MarkerPosition::new(1.0, 2.0).expect("valid position"),
                properties: Properties::new(),
            },
            OffsetDateTime::UNIX_EPOCH,
        )
    }

    #[rstest]
    fn other_owners_cannot_reach_a_marker(store: MemoryStore) {
        let alice = owner("alice");
        let bob = owner("bob");
        let marker = marker_for(&alice);
        store.insert_marker(&marker).expect("insert");

        assert_eq!(store.find_marker(&bob, marker.id).expect("find"), None);
        assert!(!store.delete_marker(&bob, marker.id).expect("delete"));
        assert_eq!(
            store
                .update_marker(&bob, marker.id, MarkerPatch::default(), OffsetDateTime::now_utc())
                .expect("update"),
            None
        );
        assert_eq!(store.count_markers(&alice).expect("count"), 1);
        assert_eq!(store.count_markers(&bob).expect("count"), 0);
    }

    #[rstest]
    fn blobs_are_never_overwritten() {
        let blobs = MemoryBlobStore::default();
        let name = StorageName::parse("1-a.kml").expect("valid name");
        blobs.put_new(&name, b"first").expect("first write");

        let second = blobs.put_new(&name, b"second");
        assert!(matches!(second, Err(BlobError::AlreadyExists { .. })));
        assert_eq!(blobs.get(&name).expect("read"), Some(b"first".to_vec()));

        blobs.remove(&name).expect("remove");
        blobs.remove(&name).expect("second remove is a no-op");
        assert_eq!(blobs.get(&name).expect("read"), None);
    }
}
