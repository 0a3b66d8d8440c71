//! `ingest` command: store a local file exactly as an upload would.

use std::io::Write;

use camino::Utf8PathBuf;
use clap::Parser;
use mapvault_core::OwnerId;
use mapvault_data::Upload;
use mapvault_server::{ServerConfig, open_state};
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

use crate::{
    ARG_DATA_DIR, ARG_FILE, ARG_MAX_UPLOAD_BYTES, ARG_OWNER, CliError, ENV_INGEST_FILE,
    ENV_INGEST_OWNER, write_json,
};

/// CLI arguments for the `ingest` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    name = "ingest",
    long_about = "Run a local GeoJSON, KML or GeoTIFF file through the upload \
                 pipeline and store it for the given owner. The stored record \
                 is printed as JSON.",
    about = "Ingest a local file for an owner"
)]
#[ortho_config(prefix = "MAPVAULT")]
pub(crate) struct IngestArgs {
    /// Path to the file to ingest.
    #[arg(value_name = "path")]
    #[serde(default)]
    pub(crate) file: Option<Utf8PathBuf>,
    /// Owner the file is stored for.
    #[arg(long = ARG_OWNER, value_name = "id")]
    #[serde(default)]
    pub(crate) owner: Option<String>,
    /// Directory holding `mapvault.db` and the `uploads/` area.
    #[arg(long = ARG_DATA_DIR, value_name = "dir")]
    #[serde(default)]
    pub(crate) data_dir: Option<Utf8PathBuf>,
    /// Largest accepted upload in bytes.
    #[arg(long = ARG_MAX_UPLOAD_BYTES, value_name = "bytes")]
    #[serde(default)]
    pub(crate) max_upload_bytes: Option<usize>,
}

impl IngestArgs {
    pub(crate) fn into_config(self) -> Result<IngestConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        IngestConfig::try_from(merged)
    }
}

/// Resolved `ingest` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct IngestConfig {
    /// File to ingest.
    pub(crate) file: Utf8PathBuf,
    /// Owner of the stored record.
    pub(crate) owner: OwnerId,
    /// Store location and upload ceiling.
    pub(crate) server: ServerConfig,
}

impl TryFrom<IngestArgs> for IngestConfig {
    type Error = CliError;

    fn try_from(args: IngestArgs) -> Result<Self, Self::Error> {
        let file = args.file.ok_or(CliError::MissingArgument {
            field: ARG_FILE,
            env: ENV_INGEST_FILE,
        })?;
        let owner = args.owner.ok_or(CliError::MissingArgument {
            field: ARG_OWNER,
            env: ENV_INGEST_OWNER,
        })?;
        let owner = OwnerId::new(owner).map_err(|source| CliError::InvalidOwner { source })?;

        let mut server = ServerConfig::default();
        if let Some(data_dir) = args.data_dir {
            server.data_dir = data_dir;
        }
        if let Some(max_upload_bytes) = args.max_upload_bytes {
            server.max_upload_bytes = max_upload_bytes;
        }
        Ok(Self {
            file,
            owner,
            server,
        })
    }
}

pub(crate) fn run_ingest(args: IngestArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let config = args.into_config()?;
    ingest_with_config(&config, writer)
}

pub(crate) fn ingest_with_config(
    config: &IngestConfig,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let (bytes, original_name) =
        mapvault_fs::read_file(&config.file).map_err(|source| CliError::ReadInput {
            path: config.file.clone(),
            source,
        })?;
    let state = open_state(&config.server)?;
    let record = state
        .ingestor
        .ingest(Upload {
            bytes,
            original_name,
            owner: config.owner.clone(),
        })
        .map_err(|source| CliError::Ingest {
            path: config.file.clone(),
            source,
        })?;
    tracing::info!(storage_name = %record.storage_name, "stored {}", config.file);
    write_json(writer, &record)
}
