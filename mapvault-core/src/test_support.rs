//! Test-only, in-memory store implementations used by unit, behaviour and
//! HTTP tests across the workspace.

use std::collections::BTreeMap;
use std::io;
use std::sync::{Mutex, MutexGuard};

use time::OffsetDateTime;

use crate::{
    AnnotationStore, BlobError, BlobStore, CredentialStore, FileRecordStore, Marker, MarkerPatch,
    OwnerId, RecordId, Shape, ShapePatch, StorageName, StoreError, UploadedFile,
};

#[derive(Debug, Default)]
struct Records {
    files: Vec<UploadedFile>,
    markers: Vec<Marker>,
    shapes: Vec<Shape>,
    tokens: BTreeMap<String, OwnerId>,
}

/// In-memory implementation of every record store trait.
///
/// Records are kept in insertion order and scanned linearly.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<Records>,
}

impl MemoryStore {
    fn records(&self) -> Result<MutexGuard<'_, Records>, StoreError> {
        self.records.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Store with a single bearer-token digest registered for `owner`.
    pub fn with_token_digest(digest: &str, owner: &OwnerId) -> Self {
        let store = Self::default();
        if let Ok(mut records) = store.records() {
            records.tokens.insert(digest.to_owned(), owner.clone());
        }
        store
    }
}

fn count(len: usize) -> u64 {
    u64::try_from(len).unwrap_or(u64::MAX)
}

impl FileRecordStore for MemoryStore {
    fn insert_file(&self, record: &UploadedFile) -> Result<(), StoreError> {
        let mut records = self.records()?;
        if records
            .files
            .iter()
            .any(|existing| existing.storage_name == record.storage_name)
        {
            return Err(StoreError::Duplicate {
                entity: "uploaded file",
                key: record.storage_name.to_string(),
            });
        }
        records.files.push(record.clone());
        Ok(())
    }

    fn find_file(&self, name: &StorageName) -> Result<Option<UploadedFile>, StoreError> {
        Ok(self
            .records()?
            .files
            .iter()
            .find(|record| &record.storage_name == name)
            .cloned())
    }

    fn files_for_owner(&self, owner: &OwnerId) -> Result<Vec<UploadedFile>, StoreError> {
        Ok(self
            .records()?
            .files
            .iter()
            .filter(|record| &record.owner == owner)
            .cloned()
            .collect())
    }

    fn count_files(&self, owner: &OwnerId) -> Result<u64, StoreError> {
        Ok(count(self.files_for_owner(owner)?.len()))
    }
}

impl AnnotationStore for MemoryStore {
    fn insert_marker(&self, marker: &Marker) -> Result<(), StoreError> {
        self.records()?.markers.push(marker.clone());
        Ok(())
    }

    fn markers_for_owner(&self, owner: &OwnerId) -> Result<Vec<Marker>, StoreError> {
        Ok(self
            .records()?
            .markers
            .iter()
            .filter(|marker| &marker.owner == owner)
            .cloned()
            .collect())
    }

    fn find_marker(&self, owner: &OwnerId, id: RecordId) -> Result<Option<Marker>, StoreError> {
        Ok(self
            .records()?
            .markers
            .iter()
            .find(|marker| marker.id == id && &marker.owner == owner)
            .cloned())
    }

    fn update_marker(
        &self,
        owner: &OwnerId,
        id: RecordId,
        patch: MarkerPatch,
        now: OffsetDateTime,
    ) -> Result<Option<Marker>, StoreError> {
        let mut records = self.records()?;
        let Some(marker) = records
            .markers
            .iter_mut()
            .find(|marker| marker.id == id && &marker.owner == owner)
        else {
            return Ok(None);
        };
        marker.apply(patch, now);
        Ok(Some(marker.clone()))
    }

    fn delete_marker(&self, owner: &OwnerId, id: RecordId) -> Result<bool, StoreError> {
        let mut records = self.records()?;
        let before = records.markers.len();
        records
            .markers
            .retain(|marker| !(marker.id == id && &marker.owner == owner));
        Ok(records.markers.len() < before)
    }

    fn count_markers(&self, owner: &OwnerId) -> Result<u64, StoreError> {
        Ok(count(self.markers_for_owner(owner)?.len()))
    }

    fn insert_shape(&self, shape: &Shape) -> Result<(), StoreError> {
        self.records()?.shapes.push(shape.clone());
        Ok(())
    }

    fn shapes_for_owner(&self, owner: &OwnerId) -> Result<Vec<Shape>, StoreError> {
        Ok(self
            .records()?
            .shapes
            .iter()
            .filter(|shape| &shape.owner == owner)
            .cloned()
            .collect())
    }

    fn find_shape(&self, owner: &OwnerId, id: RecordId) -> Result<Option<Shape>, StoreError> {
        Ok(self
            .records()?
            .shapes
            .iter()
            .find(|shape| shape.id == id && &shape.owner == owner)
            .cloned())
    }

    fn update_shape(
        &self,
        owner: &OwnerId,
        id: RecordId,
        patch: ShapePatch,
    ) -> Result<Option<Shape>, StoreError> {
        let mut records = self.records()?;
        let Some(shape) = records
            .shapes
            .iter_mut()
            .find(|shape| shape.id == id && &shape.owner == owner)
        else {
            return Ok(None);
        };
        shape.apply(patch);
        Ok(Some(shape.clone()))
    }

    fn delete_shape(&self, owner: &OwnerId, id: RecordId) -> Result<bool, StoreError> {
        let mut records = self.records()?;
        let before = records.shapes.len();
        records
            .shapes
            .retain(|shape| !(shape.id == id && &shape.owner == owner));
        Ok(records.shapes.len() < before)
    }

    fn count_shapes(&self, owner: &OwnerId) -> Result<u64, StoreError> {
        Ok(count(self.shapes_for_owner(owner)?.len()))
    }
}

impl CredentialStore for MemoryStore {
    fn owner_for_token_digest(&self, digest: &str) -> Result<Option<OwnerId>, StoreError> {
        Ok(self.records()?.tokens.get(digest).cloned())
    }

    fn register_token_digest(&self, digest: &str, owner: &OwnerId) -> Result<(), StoreError> {
        self.records()?
            .tokens
            .insert(digest.to_owned(), owner.clone());
        Ok(())
    }
}

/// In-memory [`BlobStore`].
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<BTreeMap<StorageName, Vec<u8>>>,
}

impl MemoryBlobStore {
    fn blobs(
        &self,
        operation: &'static str,
        name: &StorageName,
    ) -> Result<MutexGuard<'_, BTreeMap<StorageName, Vec<u8>>>, BlobError> {
        self.blobs.lock().map_err(|_| BlobError::Io {
            operation,
            name: name.clone(),
            source: io::Error::other("blob map lock poisoned"),
        })
    }

    /// Number of blobs currently held.
    pub fn len(&self) -> usize {
        self.blobs.lock().map_or(0, |blobs| blobs.len())
    }

    /// Whether no blobs are held.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl BlobStore for MemoryBlobStore {
    fn put_new(&self, name: &StorageName, bytes: &[u8]) -> Result<(), BlobError> {
        let mut blobs = self.blobs("write", name)?;
        if blobs.contains_key(name) {
            return Err(BlobError::AlreadyExists { name: name.clone() });
        }
        blobs.insert(name.clone(), bytes.to_vec());
        Ok(())
    }

    fn get(&self, name: &StorageName) -> Result<Option<Vec<u8>>, BlobError> {
        Ok(self.blobs("read", name)?.get(name).cloned())
    }

    fn remove(&self, name: &StorageName) -> Result<(), BlobError> {
        self.blobs("remove", name)?.remove(name);
        Ok(())
    }
}

/// Record store whose every operation fails, for exercising error paths.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableStore;

fn unavailable(operation: &'static str) -> StoreError {
    StoreError::backend(operation, io::Error::other("store unavailable"))
}

impl FileRecordStore for UnavailableStore {
    fn insert_file(&self, _record: &UploadedFile) -> Result<(), StoreError> {
        Err(unavailable("insert uploaded file"))
    }

    fn find_file(&self, _name: &StorageName) -> Result<Option<UploadedFile>, StoreError> {
        Err(unavailable("find uploaded file"))
    }

    fn files_for_owner(&self, _owner: &OwnerId) -> Result<Vec<UploadedFile>, StoreError> {
        Err(unavailable("list uploaded files"))
    }

    fn count_files(&self, _owner: &OwnerId) -> Result<u64, StoreError> {
        Err(unavailable("count uploaded files"))
    }
}
