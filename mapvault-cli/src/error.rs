//! Error types emitted by the mapvault CLI.
//!
//! Keep this error type reasonably small, as every CLI helper returns
//! `Result<_, CliError>`.

use std::sync::Arc;

use camino::Utf8PathBuf;
use mapvault_core::{OwnerIdError, StoreError};
use mapvault_data::{IngestError, ParseError};
use mapvault_server::BootstrapError;
use thiserror::Error;

/// Errors emitted by the mapvault CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// A required option is missing after configuration merging.
    #[error("missing {field} (set --{field} or {env})")]
    MissingArgument {
        field: &'static str,
        env: &'static str,
    },
    /// The owner identifier was rejected.
    #[error("invalid owner: {source}")]
    InvalidOwner {
        #[source]
        source: OwnerIdError,
    },
    /// An input file could not be read.
    #[error("failed to read {path}: {source}")]
    ReadInput {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The input file's extension is not a recognised upload type.
    #[error("{path} is not a .geojson, .kml, .tif or .tiff file")]
    UnsupportedInput { path: Utf8PathBuf },
    /// A parser rejected the input file.
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: Utf8PathBuf,
        #[source]
        source: ParseError,
    },
    /// Opening the data directory failed.
    #[error(transparent)]
    Bootstrap(#[from] BootstrapError),
    /// Ingesting a file failed.
    #[error("failed to ingest {path}: {source}")]
    Ingest {
        path: Utf8PathBuf,
        #[source]
        source: IngestError,
    },
    /// A store operation failed.
    #[error("store operation failed: {0}")]
    Store(#[from] StoreError),
    /// The async runtime could not be started.
    #[error("failed to start the async runtime: {0}")]
    Runtime(#[source] std::io::Error),
    /// The HTTP server stopped with an error.
    #[error("server on {bind} failed: {source}")]
    Serve {
        bind: std::net::SocketAddr,
        #[source]
        source: std::io::Error,
    },
    /// Encoding command output failed.
    #[error("failed to serialise output: {0}")]
    SerialiseOutput(#[source] serde_json::Error),
    /// Writing command output failed.
    #[error("failed to write output: {0}")]
    WriteOutput(#[source] std::io::Error),
}
