//! SQLite-backed implementation of every record store trait.

use std::{
    fmt,
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard},
};

use rusqlite::{Connection, ErrorCode, OptionalExtension, Row, ffi, params};
use thiserror::Error;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use crate::{
    FileFormat, FileMetadata, Marker, MarkerPatch, MarkerPosition, OwnerId, Properties, RecordId,
    Shape, ShapePatch, StorageName, UploadedFile,
};

use super::schema::{SchemaError, initialise_schema};
use super::{AnnotationStore, CredentialStore, FileRecordStore, StoreError};

/// Errors raised while opening a [`SqliteStore`].
#[derive(Debug, Error)]
pub enum SqliteStoreError {
    /// Opening the SQLite database failed.
    #[error("failed to open SQLite database at {path}: {source}")]
    OpenDatabase {
        /// Location of the SQLite database on disk.
        path: PathBuf,
        /// Source error returned by `rusqlite`.
        #[source]
        source: rusqlite::Error,
    },
    /// The schema could not be created or has an unexpected version.
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// Record store persisted in a single SQLite database.
///
/// The connection sits behind a mutex; every trait method holds the lock for
/// the duration of one statement or transaction.
pub struct SqliteStore {
    connection: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl SqliteStore {
    /// Open (creating if needed) the database at `path` and apply the schema.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SqliteStoreError> {
        let path = path.as_ref();
        let connection =
            Connection::open(path).map_err(|source| SqliteStoreError::OpenDatabase {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_connection(connection, Some(path.to_path_buf()))
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self, SqliteStoreError> {
        let connection =
            Connection::open_in_memory().map_err(|source| SqliteStoreError::OpenDatabase {
                path: PathBuf::from(":memory:"),
                source,
            })?;
        Self::from_connection(connection, None)
    }

    fn from_connection(
        mut connection: Connection,
        path: Option<PathBuf>,
    ) -> Result<Self, SqliteStoreError> {
        initialise_schema(&mut connection)?;
        log::debug!("opened SQLite store at {}", display_path(path.as_deref()));
        Ok(Self {
            connection: Mutex::new(connection),
            path,
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.connection.lock().map_err(|_| StoreError::Poisoned)
    }
}

fn display_path(path: Option<&Path>) -> String {
    path.map_or_else(|| ":memory:".to_owned(), |p| p.display().to_string())
}

fn format_timestamp(timestamp: OffsetDateTime) -> Result<String, StoreError> {
    timestamp
        .format(&Rfc3339)
        .map_err(|source| StoreError::backend("format timestamp", source))
}

fn encode_json<T: serde::Serialize>(value: &T, operation: &'static str) -> Result<String, StoreError> {
    serde_json::to_string(value).map_err(|source| StoreError::backend(operation, source))
}

fn count_result(count: i64) -> Result<u64, StoreError> {
    u64::try_from(count).map_err(|source| StoreError::backend("read count", source))
}

/// Map an insert failure, reporting primary-key clashes as duplicates.
fn insert_error(
    operation: &'static str,
    entity: &'static str,
    key: String,
) -> impl FnOnce(rusqlite::Error) -> StoreError {
    move |source| {
        if is_primary_key_violation(&source) {
            StoreError::Duplicate { entity, key }
        } else {
            StoreError::backend(operation, source)
        }
    }
}

fn is_primary_key_violation(error: &rusqlite::Error) -> bool {
    matches!(
        error,
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.code == ErrorCode::ConstraintViolation
                && failure.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY
    )
}

/// Undecoded `uploaded_files` row.
struct FileRow {
    storage_name: String,
    original_name: String,
    file_type: String,
    format: String,
    owner_id: String,
    metadata: String,
    uploaded_at: String,
}

impl FileRow {
    const COLUMNS: &'static str =
        "storage_name, original_name, file_type, format, owner_id, metadata, uploaded_at";

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            storage_name: row.get(0)?,
            original_name: row.get(1)?,
            file_type: row.get(2)?,
            format: row.get(3)?,
            owner_id: row.get(4)?,
            metadata: row.get(5)?,
            uploaded_at: row.get(6)?,
        })
    }

    fn decode(self) -> Result<UploadedFile, StoreError> {
        let key = self.storage_name.clone();
        let corrupt = |reason: String| StoreError::Corrupt {
            entity: "uploaded file",
            key: key.clone(),
            reason,
        };
        let storage_name =
            StorageName::parse(self.storage_name).map_err(|err| corrupt(err.to_string()))?;
        let format = FileFormat::from_tag(&self.format)
            .ok_or_else(|| corrupt(format!("unknown format tag '{}'", self.format)))?;
        let owner = OwnerId::new(self.owner_id).map_err(|err| corrupt(err.to_string()))?;
        let metadata: FileMetadata =
            serde_json::from_str(&self.metadata).map_err(|err| corrupt(err.to_string()))?;
        let uploaded_at = OffsetDateTime::parse(&self.uploaded_at, &Rfc3339)
            .map_err(|err| corrupt(err.to_string()))?;
        UploadedFile::new(
            storage_name,
            self.original_name,
            (format, &self.file_type),
            owner,
            metadata,
            uploaded_at,
        )
        .map_err(|err| corrupt(err.to_string()))
    }
}

/// Undecoded `markers` row.
struct MarkerRow {
    id: String,
    owner_id: String,
    lat: f64,
    lng: f64,
    properties: String,
    created_at: String,
    updated_at: String,
}

impl MarkerRow {
    const COLUMNS: &'static str = "id, owner_id, lat, lng, properties, created_at, updated_at";

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            owner_id: row.get(1)?,
            lat: row.get(2)?,
            lng: row.get(3)?,
            properties: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
        })
    }

    fn decode(self) -> Result<Marker, StoreError> {
        let key = self.id.clone();
        let corrupt = |reason: String| StoreError::Corrupt {
            entity: "marker",
            key: key.clone(),
            reason,
        };
        let id = RecordId::parse(&self.id).ok_or_else(|| corrupt("invalid id".to_owned()))?;
        let owner = OwnerId::new(self.owner_id).map_err(|err| corrupt(err.to_string()))?;
        let coordinates =
            MarkerPosition::new(self.lat, self.lng).map_err(|err| corrupt(err.to_string()))?;
        let properties: Properties =
            serde_json::from_str(&self.properties).map_err(|err| corrupt(err.to_string()))?;
        let created_at = OffsetDateTime::parse(&self.created_at, &Rfc3339)
            .map_err(|err| corrupt(err.to_string()))?;
        let updated_at = OffsetDateTime::parse(&self.updated_at, &Rfc3339)
            .map_err(|err| corrupt(err.to_string()))?;
        Ok(Marker {
            id,
            owner,
            coordinates,
            properties,
            created_at,
            updated_at,
        })
    }
}

/// Undecoded `shapes` row.
struct ShapeRow {
    id: String,
    owner_id: String,
    kind: String,
    coordinates: String,
    properties: Option<String>,
    created_at: String,
}

impl ShapeRow {
    const COLUMNS: &'static str = "id, owner_id, kind, coordinates, properties, created_at";

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            owner_id: row.get(1)?,
            kind: row.get(2)?,
            coordinates: row.get(3)?,
            properties: row.get(4)?,
            created_at: row.get(5)?,
        })
    }

    fn decode(self) -> Result<Shape, StoreError> {
        let key = self.id.clone();
        let corrupt = |reason: String| StoreError::Corrupt {
            entity: "shape",
            key: key.clone(),
            reason,
        };
        let id = RecordId::parse(&self.id).ok_or_else(|| corrupt("invalid id".to_owned()))?;
        let owner = OwnerId::new(self.owner_id).map_err(|err| corrupt(err.to_string()))?;
        let coordinates: Vec<serde_json::Value> =
            serde_json::from_str(&self.coordinates).map_err(|err| corrupt(err.to_string()))?;
        let properties = self
            .properties
            .map(|text| serde_json::from_str::<Properties>(&text))
            .transpose()
            .map_err(|err| corrupt(err.to_string()))?;
        let created_at = OffsetDateTime::parse(&self.created_at, &Rfc3339)
            .map_err(|err| corrupt(err.to_string()))?;
        Ok(Shape {
            id,
            owner,
            kind: self.kind,
            coordinates,
            properties,
            created_at,
        })
    }
}

fn select_all<R, T>(
    connection: &Connection,
    sql: &str,
    owner: &OwnerId,
    operation: &'static str,
    from_row: fn(&Row<'_>) -> rusqlite::Result<R>,
    decode: fn(R) -> Result<T, StoreError>,
) -> Result<Vec<T>, StoreError> {
    let mut statement = connection
        .prepare(sql)
        .map_err(|source| StoreError::backend(operation, source))?;
    let rows = statement
        .query_map([owner.as_str()], from_row)
        .map_err(|source| StoreError::backend(operation, source))?;
    rows.map(|row| {
        row.map_err(|source| StoreError::backend(operation, source))
            .and_then(decode)
    })
    .collect()
}

fn count_for_owner(
    connection: &Connection,
    sql: &str,
    owner: &OwnerId,
    operation: &'static str,
) -> Result<u64, StoreError> {
    let count: i64 = connection
        .query_row(sql, [owner.as_str()], |row| row.get(0))
        .map_err(|source| StoreError::backend(operation, source))?;
    count_result(count)
}

fn delete_owned(
    connection: &Connection,
    sql: &str,
    owner: &OwnerId,
    id: RecordId,
    operation: &'static str,
) -> Result<bool, StoreError> {
    connection
        .execute(sql, params![id.to_string(), owner.as_str()])
        .map(|affected| affected > 0)
        .map_err(|source| StoreError::backend(operation, source))
}

impl FileRecordStore for SqliteStore {
    fn insert_file(&self, record: &UploadedFile) -> Result<(), StoreError> {
        let metadata = encode_json(&record.metadata, "encode file metadata")?;
        let uploaded_at = format_timestamp(record.uploaded_at)?;
        let connection = self.lock()?;
        connection
            .execute(
                "INSERT INTO uploaded_files
                    (storage_name, original_name, file_type, format, owner_id, metadata, uploaded_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    record.storage_name.as_str(),
                    record.original_name,
                    record.file_type,
                    record.format.tag(),
                    record.owner.as_str(),
                    metadata,
                    uploaded_at,
                ],
            )
            .map(|_| ())
            .map_err(insert_error(
                "insert uploaded file",
                "uploaded file",
                record.storage_name.to_string(),
            ))
    }

    fn find_file(&self, name: &StorageName) -> Result<Option<UploadedFile>, StoreError> {
        let connection = self.lock()?;
        let sql = format!(
            "SELECT {} FROM uploaded_files WHERE storage_name = ?1",
            FileRow::COLUMNS
        );
        connection
            .query_row(&sql, [name.as_str()], FileRow::from_row)
            .optional()
            .map_err(|source| StoreError::backend("find uploaded file", source))?
            .map(FileRow::decode)
            .transpose()
    }

    fn files_for_owner(&self, owner: &OwnerId) -> Result<Vec<UploadedFile>, StoreError> {
        let connection = self.lock()?;
        let sql = format!(
            "SELECT {} FROM uploaded_files WHERE owner_id = ?1 ORDER BY rowid",
            FileRow::COLUMNS
        );
        select_all(
            &connection,
            &sql,
            owner,
            "list uploaded files",
            FileRow::from_row,
            FileRow::decode,
        )
    }

    fn count_files(&self, owner: &OwnerId) -> Result<u64, StoreError> {
        let connection = self.lock()?;
        count_for_owner(
            &connection,
            "SELECT COUNT(*) FROM uploaded_files WHERE owner_id = ?1",
            owner,
            "count uploaded files",
        )
    }
}

impl AnnotationStore for SqliteStore {
    fn insert_marker(&self, marker: &Marker) -> Result<(), StoreError> {
        let properties = encode_json(&marker.properties, "encode marker properties")?;
        let created_at = format_timestamp(marker.created_at)?;
        let updated_at = format_timestamp(marker.updated_at)?;
        let connection = self.lock()?;
        connection
            .execute(
                "INSERT INTO markers (id, owner_id, lat, lng, properties, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    marker.id.to_string(),
                    marker.owner.as_str(),
                    marker.coordinates.lat(),
                    marker.coordinates.lng(),
                    properties,
                    created_at,
                    updated_at,
                ],
            )
            .map(|_| ())
            .map_err(insert_error("insert marker", "marker", marker.id.to_string()))
    }

    fn markers_for_owner(&self, owner: &OwnerId) -> Result<Vec<Marker>, StoreError> {
        let connection = self.lock()?;
        let sql = format!(
            "SELECT {} FROM markers WHERE owner_id = ?1 ORDER BY rowid",
            MarkerRow::COLUMNS
        );
        select_all(
            &connection,
            &sql,
            owner,
            "list markers",
            MarkerRow::from_row,
            MarkerRow::decode,
        )
    }

    fn find_marker(&self, owner: &OwnerId, id: RecordId) -> Result<Option<Marker>, StoreError> {
        let connection = self.lock()?;
        find_owned_marker(&connection, owner, id)
    }

    fn update_marker(
        &self,
        owner: &OwnerId,
        id: RecordId,
        patch: MarkerPatch,
        now: OffsetDateTime,
    ) -> Result<Option<Marker>, StoreError> {
        let mut connection = self.lock()?;
        let transaction = connection
            .transaction()
            .map_err(|source| StoreError::backend("begin marker update", source))?;
        let Some(mut marker) = find_owned_marker(&transaction, owner, id)? else {
            return Ok(None);
        };
        marker.apply(patch, now);
        let properties = encode_json(&marker.properties, "encode marker properties")?;
        transaction
            .execute(
                "UPDATE markers SET lat = ?1, lng = ?2, properties = ?3, updated_at = ?4
                 WHERE id = ?5 AND owner_id = ?6",
                params![
                    marker.coordinates.lat(),
                    marker.coordinates.lng(),
                    properties,
                    format_timestamp(marker.updated_at)?,
                    id.to_string(),
                    owner.as_str(),
                ],
            )
            .map_err(|source| StoreError::backend("update marker", source))?;
        transaction
            .commit()
            .map_err(|source| StoreError::backend("commit marker update", source))?;
        Ok(Some(marker))
    }

    fn delete_marker(&self, owner: &OwnerId, id: RecordId) -> Result<bool, StoreError> {
        let connection = self.lock()?;
        delete_owned(
            &connection,
            "DELETE FROM markers WHERE id = ?1 AND owner_id = ?2",
            owner,
            id,
            "delete marker",
        )
    }

    fn count_markers(&self, owner: &OwnerId) -> Result<u64, StoreError> {
        let connection = self.lock()?;
        count_for_owner(
            &connection,
            "SELECT COUNT(*) FROM markers WHERE owner_id = ?1",
            owner,
            "count markers",
        )
    }

    fn insert_shape(&self, shape: &Shape) -> Result<(), StoreError> {
        let coordinates = encode_json(&shape.coordinates, "encode shape coordinates")?;
        let properties = shape
            .properties
            .as_ref()
            .map(|bag| encode_json(bag, "encode shape properties"))
            .transpose()?;
        let created_at = format_timestamp(shape.created_at)?;
        let connection = self.lock()?;
        connection
            .execute(
                "INSERT INTO shapes (id, owner_id, kind, coordinates, properties, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    shape.id.to_string(),
                    shape.owner.as_str(),
                    shape.kind,
                    coordinates,
                    properties,
                    created_at,
                ],
            )
            .map(|_| ())
            .map_err(insert_error("insert shape", "shape", shape.id.to_string()))
    }

    fn shapes_for_owner(&self, owner: &OwnerId) -> Result<Vec<Shape>, StoreError> {
        let connection = self.lock()?;
        let sql = format!(
            "SELECT {} FROM shapes WHERE owner_id = ?1 ORDER BY rowid",
            ShapeRow::COLUMNS
        );
        select_all(
            &connection,
            &sql,
            owner,
            "list shapes",
            ShapeRow::from_row,
            ShapeRow::decode,
        )
    }

    fn find_shape(&self, owner: &OwnerId, id: RecordId) -> Result<Option<Shape>, StoreError> {
        let connection = self.lock()?;
        find_owned_shape(&connection, owner, id)
    }

    fn update_shape(
        &self,
        owner: &OwnerId,
        id: RecordId,
        patch: ShapePatch,
    ) -> Result<Option<Shape>, StoreError> {
        let mut connection = self.lock()?;
        let transaction = connection
            .transaction()
            .map_err(|source| StoreError::backend("begin shape update", source))?;
        let Some(mut shape) = find_owned_shape(&transaction, owner, id)? else {
            return Ok(None);
        };
        shape.apply(patch);
        let coordinates = encode_json(&shape.coordinates, "encode shape coordinates")?;
        let properties = shape
            .properties
            .as_ref()
            .map(|bag| encode_json(bag, "encode shape properties"))
            .transpose()?;
        transaction
            .execute(
                "UPDATE shapes SET coordinates = ?1, properties = ?2
                 WHERE id = ?3 AND owner_id = ?4",
                params![coordinates, properties, id.to_string(), owner.as_str()],
            )
            .map_err(|source| StoreError::backend("update shape", source))?;
        transaction
            .commit()
            .map_err(|source| StoreError::backend("commit shape update", source))?;
        Ok(Some(shape))
    }

    fn delete_shape(&self, owner: &OwnerId, id: RecordId) -> Result<bool, StoreError> {
        let connection = self.lock()?;
        delete_owned(
            &connection,
            "DELETE FROM shapes WHERE id = ?1 AND owner_id = ?2",
            owner,
            id,
            "delete shape",
        )
    }

    fn count_shapes(&self, owner: &OwnerId) -> Result<u64, StoreError> {
        let connection = self.lock()?;
        count_for_owner(
            &connection,
            "SELECT COUNT(*) FROM shapes WHERE owner_id = ?1",
            owner,
            "count shapes",
        )
    }
}

fn find_owned_marker(
    connection: &Connection,
    owner: &OwnerId,
    id: RecordId,
) -> Result<Option<Marker>, StoreError> {
    let sql = format!(
        "SELECT {} FROM markers WHERE id = ?1 AND owner_id = ?2",
        MarkerRow::COLUMNS
    );
    connection
        .query_row(&sql, params![id.to_string(), owner.as_str()], MarkerRow::from_row)
        .optional()
        .map_err(|source| StoreError::backend("find marker", source))?
        .map(MarkerRow::decode)
        .transpose()
}

fn find_owned_shape(
    connection: &Connection,
    owner: &OwnerId,
    id: RecordId,
) -> Result<Option<Shape>, StoreError> {
    let sql = format!(
        "SELECT {} FROM shapes WHERE id = ?1 AND owner_id = ?2",
        ShapeRow::COLUMNS
    );
    connection
        .query_row(&sql, params![id.to_string(), owner.as_str()], ShapeRow::from_row)
        .optional()
        .map_err(|source| StoreError::backend("find shape", source))?
        .map(ShapeRow::decode)
        .transpose()
}

impl CredentialStore for SqliteStore {
    fn owner_for_token_digest(&self, digest: &str) -> Result<Option<OwnerId>, StoreError> {
        let connection = self.lock()?;
        let owner: Option<String> = connection
            .query_row(
                "SELECT owner_id FROM access_tokens WHERE token_digest = ?1",
                [digest],
                |row| row.get(0),
            )
            .optional()
            .map_err(|source| StoreError::backend("resolve access token", source))?;
        owner
            .map(|raw| {
                OwnerId::new(raw).map_err(|err| StoreError::Corrupt {
                    entity: "access token",
                    key: digest.to_owned(),
                    reason: err.to_string(),
                })
            })
            .transpose()
    }

    fn register_token_digest(&self, digest: &str, owner: &OwnerId) -> Result<(), StoreError> {
        let connection = self.lock()?;
        connection
            .execute(
                "INSERT INTO access_tokens (token_digest, owner_id) VALUES (?1, ?2)",
                params![digest, owner.as_str()],
            )
            .map(|_| ())
            .map_err(insert_error(
                "register access token",
                "access token",
                digest.to_owned(),
            ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{GeoJsonMetadata, KmlMetadata, MarkerDraft, ShapeDraft};
    use rstest::{fixture, rstest};
    use serde_json::json;
    use tempfile::TempDir;
    use time::macros::datetime;

    #[fixture]
    fn store() -> SqliteStore {
        SqliteStore::open_in_memory().expect("in-memory store")
    }

    fn owner(name: &str) -> OwnerId {
        OwnerId::new(name).expect("valid owner")
    }

    fn kml_record(name: &str, owner: &OwnerId) -> UploadedFile {
        UploadedFile::new(
            StorageName::parse(name).expect("valid name"),
            "doc.kml".into(),
            (FileFormat::Kml, ".kml"),
            owner.clone(),
            FileMetadata::Kml(KmlMetadata { placemarks: 3 }),
            datetime!(2024-03-01 09:30:00 UTC),
        )
        .expect("consistent record")
    }

    #[rstest]
    fn file_records_round_trip(store: SqliteStore) {
        let alice = owner("alice");
        let record = UploadedFile::new(
            StorageName::parse("17-trail.geojson").expect("valid name"),
            "trail.geojson".into(),
            (FileFormat::GeoJson, ".geojson"),
            alice.clone(),
            FileMetadata::GeoJson(GeoJsonMetadata {
                features: 0,
                bbox: None,
            }),
            datetime!(2024-03-01 09:30:00.250 UTC),
        )
        .expect("consistent record");

        store.insert_file(&record).expect("insert");
        let found = store
            .find_file(&record.storage_name)
            .expect("find")
            .expect("record exists");
        assert_eq!(found, record);
        assert_eq!(store.files_for_owner(&alice).expect("list"), vec![record]);
    }

    #[rstest]
    fn duplicate_storage_names_are_rejected(store: SqliteStore) {
        let alice = owner("alice");
        store
            .insert_file(&kml_record("1-doc.kml", &alice))
            .expect("first insert");
        let second = store.insert_file(&kml_record("1-doc.kml", &alice));
        assert!(matches!(second, Err(StoreError::Duplicate { .. })));
    }

    #[rstest]
    fn listings_are_owner_scoped(store: SqliteStore) {
        let alice = owner("alice");
        let bob = owner("bob");
        store.insert_file(&kml_record("1-a.kml", &alice)).expect("insert");
        store.insert_file(&kml_record("2-b.kml", &bob)).expect("insert");
        store.insert_file(&kml_record("3-c.kml", &alice)).expect("insert");

        let names: Vec<_> = store
            .files_for_owner(&alice)
            .expect("list")
            .into_iter()
            .map(|record| record.storage_name.to_string())
            .collect();
        assert_eq!(names, ["1-a.kml", "3-c.kml"]);
        assert_eq!(store.count_files(&bob).expect("count"), 1);
    }

    #[rstest]
    fn marker_updates_are_persisted(store: SqliteStore) {
        let alice = owner("alice");
        let mut properties = Properties::new();
        properties.insert("label".into(), json!("Summit"));
        let marker = Marker::create(
            alice.clone(),
            MarkerDraft {
                coordinates: MarkerPosition::new(45.0, 7.0).expect("valid position"),
                properties: properties.clone(),
            },
            datetime!(2024-01-01 00:00:00 UTC),
        );
        store.insert_marker(&marker).expect("insert");

        let later = datetime!(2024-01-05 00:00:00 UTC);
        let updated = store
            .update_marker(
                &alice,
                marker.id,
                MarkerPatch {
                    coordinates: Some(MarkerPosition::new(46.0, 8.0).expect("valid")),
                    properties: None,
                },
                later,
            )
            .expect("update")
            .expect("marker exists");

        assert_eq!(updated.properties, properties);
        let reloaded = store
            .find_marker(&alice, marker.id)
            .expect("find")
            .expect("marker exists");
        assert_eq!(reloaded, updated);
        assert_eq!(reloaded.updated_at, later);
        assert_eq!(reloaded.created_at, marker.created_at);
    }

    #[rstest]
    fn shapes_are_owner_scoped(store: SqliteStore) {
        let alice = owner("alice");
        let bob = owner("bob");
        let draft = ShapeDraft::new(
            Some("polygon".into()),
            Some(vec![json!([[0, 0], [1, 0], [1, 1], [0, 0]])]),
            None,
        )
        .expect("valid draft");
        let shape = Shape::create(alice.clone(), draft, OffsetDateTime::UNIX_EPOCH);
        store.insert_shape(&shape).expect("insert");

        assert_eq!(store.find_shape(&bob, shape.id).expect("find"), None);
        assert_eq!(store.shapes_for_owner(&bob).expect("list"), Vec::new());
        assert!(!store.delete_shape(&bob, shape.id).expect("delete"));
        assert!(store.delete_shape(&alice, shape.id).expect("delete"));
        assert_eq!(store.count_shapes(&alice).expect("count"), 0);
    }

    #[rstest]
    fn token_digests_resolve_to_owners(store: SqliteStore) {
        let digest = "a".repeat(64);
        store
            .register_token_digest(&digest, &owner("alice"))
            .expect("register");
        assert_eq!(
            store.owner_for_token_digest(&digest).expect("resolve"),
            Some(owner("alice"))
        );
        assert_eq!(
            store.owner_for_token_digest(&"b".repeat(64)).expect("resolve"),
            None
        );
    }

    #[rstest]
    fn records_survive_reopening() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("mapvault.db");
        let alice = owner("alice");
        {
            let store = SqliteStore::open(&path).expect("open");
            store.insert_file(&kml_record("5-doc.kml", &alice)).expect("insert");
        }
        let reopened = SqliteStore::open(&path).expect("reopen");
        assert_eq!(reopened.count_files(&alice).expect("count"), 1);
    }
}
