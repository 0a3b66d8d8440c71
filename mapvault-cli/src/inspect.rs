//! `inspect` command: print a file's metadata without storing it.

use std::io::Write;

use camino::Utf8PathBuf;
use clap::Parser;
use mapvault_core::FileFormat;
use mapvault_data::extract_metadata;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

use crate::{ARG_FILE, CliError, ENV_INSPECT_FILE, write_json};

/// CLI arguments for the `inspect` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    name = "inspect",
    about = "Print the metadata an upload of a local file would record"
)]
#[ortho_config(prefix = "MAPVAULT")]
pub(crate) struct InspectArgs {
    /// Path to the file to inspect.
    #[arg(value_name = "path")]
    #[serde(default)]
    pub(crate) file: Option<Utf8PathBuf>,
}

pub(crate) fn run_inspect(args: InspectArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let merged = args.load_and_merge().map_err(CliError::Configuration)?;
    let file = merged.file.ok_or(CliError::MissingArgument {
        field: ARG_FILE,
        env: ENV_INSPECT_FILE,
    })?;
    inspect_file(file, writer)
}

pub(crate) fn inspect_file(path: Utf8PathBuf, writer: &mut dyn Write) -> Result<(), CliError> {
    let (format, _) = path
        .file_name()
        .and_then(FileFormat::from_file_name)
        .ok_or_else(|| CliError::UnsupportedInput { path: path.clone() })?;
    let (bytes, _) = mapvault_fs::read_file(&path).map_err(|source| CliError::ReadInput {
        path: path.clone(),
        source,
    })?;
    let metadata = extract_metadata(format, &bytes).map_err(|source| CliError::Parse {
        path: path.clone(),
        source,
    })?;
    write_json(writer, &metadata)
}
