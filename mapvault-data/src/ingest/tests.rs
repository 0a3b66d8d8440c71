//! Unit tests for the ingestion coordinator.

use std::sync::Arc;

use mapvault_core::test_support::{MemoryBlobStore, MemoryStore, UnavailableStore};
use mapvault_core::{FileMetadata, KmlMetadata};
use rstest::{fixture, rstest};

use super::*;

struct Harness {
    blobs: Arc<MemoryBlobStore>,
    records: Arc<MemoryStore>,
    ingestor: Ingestor,
}

fn frozen_clock() -> u64 {
    42
}

#[fixture]
fn harness() -> Harness {
    let blobs = Arc::new(MemoryBlobStore::default());
    let records = Arc::new(MemoryStore::default());
    let ingestor = Ingestor::new(blobs.clone(), records.clone())
        .with_max_bytes(64)
        .with_namer(StorageNamer::with_clock(frozen_clock));
    Harness {
        blobs,
        records,
        ingestor,
    }
}

fn upload(name: &str, bytes: &[u8]) -> Upload {
    Upload {
        bytes: bytes.to_vec(),
        original_name: name.to_owned(),
        owner: OwnerId::new("alice").expect("valid owner"),
    }
}

fn stored_records(harness: &Harness) -> usize {
    let owner = OwnerId::new("alice").expect("valid owner");
    harness
        .records
        .files_for_owner(&owner)
        .expect("list records")
        .len()
}

#[rstest]
fn ingests_kml_and_persists_both_halves(harness: Harness) {
    let record = harness
        .ingestor
        .ingest(upload("trail.kml", b"<kml><Placemark/></kml>"))
        .expect("ingest");

    assert_eq!(record.storage_name.as_str(), "42-trail.kml");
    assert_eq!(record.format, FileFormat::Kml);
    assert_eq!(record.file_type, ".kml");
    assert_eq!(
        record.metadata,
        FileMetadata::Kml(KmlMetadata { placemarks: 1 })
    );
    assert_eq!(
        harness.blobs.get(&record.storage_name).expect("read blob"),
        Some(b"<kml><Placemark/></kml>".to_vec())
    );
    assert_eq!(
        harness
            .records
            .find_file(&record.storage_name)
            .expect("find record"),
        Some(record)
    );
}

#[rstest]
fn empty_uploads_are_rejected_first(harness: Harness) {
    let result = harness.ingestor.ingest(upload("notes.txt", b""));
    assert!(matches!(result, Err(IngestError::NoFileProvided)));
    assert!(harness.blobs.is_empty());
}

#[rstest]
fn size_is_checked_before_extension(harness: Harness) {
    let result = harness.ingestor.ingest(upload("notes.txt", &[b'x'; 65]));
    assert!(matches!(
        result,
        Err(IngestError::SizeExceeded { size: 65, limit: 64 })
    ));
    assert!(harness.blobs.is_empty());
}

#[rstest]
fn uploads_at_the_ceiling_are_accepted(harness: Harness) {
    let mut doc = b"<kml>".to_vec();
    doc.resize(58, b' ');
    doc.extend_from_slice(b"</kml>");
    assert_eq!(doc.len(), 64);
    assert!(harness.ingestor.ingest(upload("a.kml", &doc)).is_ok());
}

#[rstest]
#[case("notes.txt")]
#[case("shapefile.shp")]
#[case("noextension")]
fn unsupported_extensions_leave_no_trace(harness: Harness, #[case] name: &str) {
    let result = harness.ingestor.ingest(upload(name, b"{}"));
    assert!(matches!(
        result,
        Err(IngestError::UnsupportedExtension { .. })
    ));
    assert!(harness.blobs.is_empty());
    assert_eq!(stored_records(&harness), 0);
}

#[rstest]
#[case("bad.geojson", b"{\"features\": 3}".as_slice())]
#[case("bad.kml", b"<kml><Document></kml>".as_slice())]
fn malformed_content_removes_the_blob(
    harness: Harness,
    #[case] name: &str,
    #[case] bytes: &[u8],
) {
    let result = harness.ingestor.ingest(upload(name, bytes));
    assert!(matches!(
        result,
        Err(IngestError::MalformedContent { .. })
    ));
    assert!(harness.blobs.is_empty());
    assert_eq!(stored_records(&harness), 0);
}

#[rstest]
fn raster_uploads_are_recorded_without_parsing(harness: Harness) {
    let record = harness
        .ingestor
        .ingest(upload("DEM.TIFF", b"II*\0 raster bytes"))
        .expect("ingest");
    assert_eq!(record.format, FileFormat::Unsupported);
    assert_eq!(record.file_type, ".tiff");
    assert_eq!(record.metadata, FileMetadata::Unsupported);
}

#[rstest]
fn client_paths_are_stripped(harness: Harness) {
    let record = harness
        .ingestor
        .ingest(upload("../../etc/trail.kml", b"<kml/>"))
        .expect("ingest");
    assert_eq!(record.original_name, "trail.kml");
    assert_eq!(record.storage_name.as_str(), "42-trail.kml");
}

#[rstest]
fn name_collisions_are_retried(harness: Harness) {
    let taken = StorageName::parse("42-trail.kml").expect("valid name");
    harness.blobs.put_new(&taken, b"older").expect("seed blob");

    let record = harness
        .ingestor
        .ingest(upload("trail.kml", b"<kml/>"))
        .expect("ingest");
    assert_eq!(record.storage_name.as_str(), "43-trail.kml");
    assert_eq!(
        harness.blobs.get(&taken).expect("read"),
        Some(b"older".to_vec())
    );
}

#[rstest]
fn store_failures_remove_the_blob() {
    let blobs = Arc::new(MemoryBlobStore::default());
    let ingestor = Ingestor::new(blobs.clone(), Arc::new(UnavailableStore));

    let result = ingestor.ingest(upload("trail.kml", b"<kml/>"));
    let err = result.expect_err("store is unavailable");
    assert!(matches!(
        err,
        IngestError::StoreFailure {
            source: StorageFailure::Records(_)
        }
    ));
    assert!(err.is_storage_failure());
    assert!(blobs.is_empty());
}

#[rstest]
fn running_out_of_storage_names_is_a_store_failure(harness: Harness) {
    for stamp in 42..42 + MAX_NAME_ATTEMPTS {
        let taken = StorageName::parse(format!("{stamp}-trail.kml")).expect("valid name");
        harness.blobs.put_new(&taken, b"older").expect("seed blob");
    }

    let err = harness
        .ingestor
        .ingest(upload("trail.kml", b"<kml/>"))
        .expect_err("every candidate name is taken");

    match &err {
        IngestError::StoreFailure {
            source: StorageFailure::Blobs(BlobError::AlreadyExists { name }),
        } => assert_eq!(name.as_str(), "49-trail.kml"),
        other => panic!("expected a blob-area store failure, found {other:?}"),
    }
    assert!(err.is_storage_failure());
    assert_eq!(harness.blobs.len(), MAX_NAME_ATTEMPTS);
    assert_eq!(stored_records(&harness), 0);
}
