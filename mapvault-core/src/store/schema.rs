//! SQLite schema for upload records, annotations and access tokens.

use rusqlite::{Connection, Error as SqliteError, OptionalExtension, Transaction};
use thiserror::Error;

/// Schema version written by this build.
pub const SCHEMA_VERSION: i64 = 1;

/// Errors raised when initialising the schema.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("failed to execute migration step '{step}'")]
    Migration {
        step: &'static str,
        #[source]
        source: SqliteError,
    },
    #[error("expected mapvault schema version {expected} but found {found}; apply migrations before retrying")]
    VersionMismatch { expected: i64, found: i64 },
}

/// Create every table and index if missing and record the schema version.
///
/// Existing databases must already be at [`SCHEMA_VERSION`].
pub(crate) fn initialise_schema(connection: &mut Connection) -> Result<(), SchemaError> {
    let transaction = connection
        .transaction()
        .map_err(|source| SchemaError::Migration {
            step: "begin schema transaction",
            source,
        })?;

    create_tables(&transaction)?;
    create_indexes(&transaction)?;
    ensure_schema_version(&transaction)?;

    transaction
        .commit()
        .map_err(|source| SchemaError::Migration {
            step: "commit schema transaction",
            source,
        })
}

fn create_tables(transaction: &Transaction<'_>) -> Result<(), SchemaError> {
    run_migration_step(
        transaction,
        "create uploaded_files",
        "CREATE TABLE IF NOT EXISTS uploaded_files (
            storage_name TEXT PRIMARY KEY CHECK (length(storage_name) > 0),
            original_name TEXT NOT NULL,
            file_type TEXT NOT NULL,
            format TEXT NOT NULL,
            owner_id TEXT NOT NULL,
            metadata TEXT NOT NULL,
            uploaded_at TEXT NOT NULL
        )",
    )?;
    run_migration_step(
        transaction,
        "create markers",
        "CREATE TABLE IF NOT EXISTS markers (
            id TEXT PRIMARY KEY,
            owner_id TEXT NOT NULL,
            lat REAL NOT NULL CHECK (lat BETWEEN -90.0 AND 90.0),
            lng REAL NOT NULL CHECK (lng BETWEEN -180.0 AND 180.0),
            properties TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
    )?;
    run_migration_step(
        transaction,
        "create shapes",
        "CREATE TABLE IF NOT EXISTS shapes (
            id TEXT PRIMARY KEY,
            owner_id TEXT NOT NULL,
            kind TEXT NOT NULL CHECK (length(trim(kind)) > 0),
            coordinates TEXT NOT NULL,
            properties TEXT,
            created_at TEXT NOT NULL
        )",
    )?;
    run_migration_step(
        transaction,
        "create access_tokens",
        "CREATE TABLE IF NOT EXISTS access_tokens (
            token_digest TEXT PRIMARY KEY CHECK (length(token_digest) = 64),
            owner_id TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
        ) WITHOUT ROWID",
    )
}

fn create_indexes(transaction: &Transaction<'_>) -> Result<(), SchemaError> {
    run_migration_step(
        transaction,
        "index uploaded_files by owner",
        "CREATE INDEX IF NOT EXISTS idx_uploaded_files_owner ON uploaded_files(owner_id)",
    )?;
    run_migration_step(
        transaction,
        "index markers by owner",
        "CREATE INDEX IF NOT EXISTS idx_markers_owner ON markers(owner_id)",
    )?;
    run_migration_step(
        transaction,
        "index shapes by owner",
        "CREATE INDEX IF NOT EXISTS idx_shapes_owner ON shapes(owner_id)",
    )
}

fn ensure_schema_version(transaction: &Transaction<'_>) -> Result<(), SchemaError> {
    run_migration_step(
        transaction,
        "create schema version table",
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY CHECK (version > 0),
            applied_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
        ) WITHOUT ROWID",
    )?;

    let existing: Option<i64> = transaction
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
            row.get(0)
        })
        .optional()
        .map_err(|source| SchemaError::Migration {
            step: "read schema version",
            source,
        })?;

    match existing {
        Some(version) if version == SCHEMA_VERSION => Ok(()),
        Some(found) => Err(SchemaError::VersionMismatch {
            expected: SCHEMA_VERSION,
            found,
        }),
        None => transaction
            .execute(
                "INSERT INTO schema_version (version) VALUES (?1)",
                [SCHEMA_VERSION],
            )
            .map(|_| ())
            .map_err(|source| SchemaError::Migration {
                step: "record schema version",
                source,
            }),
    }
}

fn run_migration_step(
    transaction: &Transaction<'_>,
    step: &'static str,
    sql: &str,
) -> Result<(), SchemaError> {
    transaction
        .execute(sql, [])
        .map(|_| ())
        .map_err(|source| SchemaError::Migration { step, source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn initialisation_is_idempotent() {
        let mut connection = Connection::open_in_memory().expect("in-memory database");
        initialise_schema(&mut connection).expect("first run");
        initialise_schema(&mut connection).expect("second run");

        let version: i64 = connection
            .query_row("SELECT version FROM schema_version", [], |row| row.get(0))
            .expect("read version");
        assert_eq!(version, SCHEMA_VERSION);
    }

    #[rstest]
    fn rejects_foreign_schema_versions() {
        let mut connection = Connection::open_in_memory().expect("in-memory database");
        initialise_schema(&mut connection).expect("initialise");
        connection
            .execute("UPDATE schema_version SET version = 7", [])
            .expect("tamper with version");

        let result = initialise_schema(&mut connection);
        assert!(matches!(
            result,
            Err(SchemaError::VersionMismatch { expected: 1, found: 7 })
        ));
    }
}
