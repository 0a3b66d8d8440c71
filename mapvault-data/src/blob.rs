//! Filesystem blob area for raw upload bytes.

use std::io::{self, Write};

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::fs::OpenOptions;
use cap_std::fs_utf8::Dir;
use mapvault_core::{BlobError, BlobStore, StorageName};
use thiserror::Error;

/// Failure to open the upload directory.
#[derive(Debug, Error)]
#[error("failed to open upload directory {path}: {source}")]
pub struct BlobAreaError {
    /// Directory that could not be opened or created.
    pub path: Utf8PathBuf,
    /// Underlying I/O error.
    #[source]
    pub source: io::Error,
}

/// Blob store writing one file per storage name inside a capability
/// directory.
///
/// Storage names are single path components, and every access goes through
/// the directory handle, so no name can resolve outside the upload area.
#[derive(Debug)]
pub struct FsBlobStore {
    dir: Dir,
    root: Utf8PathBuf,
}

impl FsBlobStore {
    /// Open (creating if needed) the upload directory at `root`.
    pub fn open(root: &Utf8Path) -> Result<Self, BlobAreaError> {
        let dir = mapvault_fs::open_or_create_dir(root).map_err(|source| BlobAreaError {
            path: root.to_path_buf(),
            source,
        })?;
        Ok(Self {
            dir,
            root: root.to_path_buf(),
        })
    }

    /// Directory holding the blobs.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    fn io_error(operation: &'static str, name: &StorageName, source: io::Error) -> BlobError {
        BlobError::Io {
            operation,
            name: name.clone(),
            source,
        }
    }
}

impl BlobStore for FsBlobStore {
    fn put_new(&self, name: &StorageName, bytes: &[u8]) -> Result<(), BlobError> {
        let mut options = OpenOptions::new();
        options.write(true).create_new(true);
        let mut file = match self.dir.open_with(name.as_str(), &options) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                return Err(BlobError::AlreadyExists { name: name.clone() });
            }
            Err(err) => return Err(Self::io_error("create", name, err)),
        };

        if let Err(err) = file.write_all(bytes).and_then(|()| file.sync_all()) {
            drop(file);
            if let Err(cleanup) = self.dir.remove_file(name.as_str()) {
                log::warn!("failed to remove partial blob {name}: {cleanup}");
            }
            return Err(Self::io_error("write", name, err));
        }
        log::debug!("wrote {} bytes to {}/{name}", bytes.len(), self.root);
        Ok(())
    }

    fn get(&self, name: &StorageName) -> Result<Option<Vec<u8>>, BlobError> {
        match self.dir.read(name.as_str()) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(Self::io_error("read", name, err)),
        }
    }

    fn remove(&self, name: &StorageName) -> Result<(), BlobError> {
        match self.dir.remove_file(name.as_str()) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(Self::io_error("remove", name, err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    struct Area {
        _temp: TempDir,
        root: Utf8PathBuf,
        store: FsBlobStore,
    }

    #[fixture]
    fn area() -> Area {
        let temp = TempDir::new().expect("tempdir");
        let root = Utf8PathBuf::from_path_buf(temp.path().join("uploads")).expect("UTF-8 path");
        let store = FsBlobStore::open(&root).expect("open blob area");
        Area {
            _temp: temp,
            root,
            store,
        }
    }

    fn name(raw: &str) -> StorageName {
        StorageName::parse(raw).expect("valid name")
    }

    #[rstest]
    fn writes_files_under_the_root(area: Area) {
        area.store
            .put_new(&name("1-a.geojson"), b"{}")
            .expect("write");
        let on_disk = std::fs::read(area.root.join("1-a.geojson")).expect("file exists");
        assert_eq!(on_disk, b"{}");
        assert_eq!(area.store.root(), area.root);
    }

    #[rstest]
    fn refuses_to_overwrite(area: Area) {
        area.store.put_new(&name("1-a.kml"), b"first").expect("write");
        let second = area.store.put_new(&name("1-a.kml"), b"second");
        assert!(matches!(second, Err(BlobError::AlreadyExists { .. })));
        assert_eq!(
            area.store.get(&name("1-a.kml")).expect("read"),
            Some(b"first".to_vec())
        );
    }

    #[rstest]
    fn missing_blobs_read_as_none(area: Area) {
        assert_eq!(area.store.get(&name("404-missing.kml")).expect("read"), None);
        area.store
            .remove(&name("404-missing.kml"))
            .expect("removing a missing blob succeeds");
    }
}
