//! Command-line interface for running and administering mapvault.
#![forbid(unsafe_code)]

use std::io::Write;

use clap::{Parser, Subcommand};
use serde::Serialize;

mod error;
mod ingest;
mod inspect;
mod serve;
mod token;

pub use error::CliError;

use ingest::IngestArgs;
use inspect::InspectArgs;
use serve::ServeArgs;
use token::IssueTokenArgs;

pub(crate) const ARG_DATA_DIR: &str = "data-dir";
pub(crate) const ARG_BIND: &str = "bind";
pub(crate) const ARG_MAX_UPLOAD_BYTES: &str = "max-upload-bytes";
pub(crate) const ARG_RETRIEVAL_POLICY: &str = "retrieval-policy";
pub(crate) const ARG_OWNER: &str = "owner";
pub(crate) const ARG_FILE: &str = "file";
pub(crate) const ENV_INGEST_FILE: &str = "MAPVAULT_CMDS_INGEST_FILE";
pub(crate) const ENV_INGEST_OWNER: &str = "MAPVAULT_CMDS_INGEST_OWNER";
pub(crate) const ENV_INSPECT_FILE: &str = "MAPVAULT_CMDS_INSPECT_FILE";
pub(crate) const ENV_ISSUE_TOKEN_OWNER: &str = "MAPVAULT_CMDS_ISSUE_TOKEN_OWNER";

/// Run the mapvault CLI with the current process arguments and environment.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    let mut stdout = std::io::stdout().lock();
    run_with(cli, &mut stdout)
}

fn run_with(cli: Cli, writer: &mut dyn Write) -> Result<(), CliError> {
    match cli.command {
        Command::Serve(args) => serve::run_serve(args),
        Command::Ingest(args) => ingest::run_ingest(args, writer),
        Command::Inspect(args) => inspect::run_inspect(args, writer),
        Command::IssueToken(args) => token::run_issue_token(args, writer),
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "mapvault",
    about = "Store geospatial uploads and map annotations behind an HTTP API",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve the HTTP API.
    Serve(ServeArgs),
    /// Ingest a local file into the data directory on behalf of an owner.
    Ingest(IngestArgs),
    /// Parse a local file and print its metadata without storing it.
    Inspect(InspectArgs),
    /// Issue a bearer token for an owner.
    IssueToken(IssueTokenArgs),
}

/// Write `value` as pretty JSON followed by a newline.
pub(crate) fn write_json<T: Serialize>(writer: &mut dyn Write, value: &T) -> Result<(), CliError> {
    let payload = serde_json::to_string_pretty(value).map_err(CliError::SerialiseOutput)?;
    writeln!(writer, "{payload}").map_err(CliError::WriteOutput)
}

#[cfg(test)]
mod tests;
