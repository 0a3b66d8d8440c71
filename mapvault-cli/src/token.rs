//! `issue-token` command.

use std::io::Write;

use camino::Utf8PathBuf;
use clap::Parser;
use mapvault_core::OwnerId;
use mapvault_server::{OpenedStores, ServerConfig, issue_token, open_stores};
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

use crate::{ARG_DATA_DIR, ARG_OWNER, CliError, ENV_ISSUE_TOKEN_OWNER};

/// CLI arguments for the `issue-token` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    name = "issue-token",
    long_about = "Generate a random bearer token for an owner and store its \
                 SHA-256 digest. The raw token is printed once and cannot be \
                 recovered later.",
    about = "Issue a bearer token for an owner"
)]
#[ortho_config(prefix = "MAPVAULT")]
pub(crate) struct IssueTokenArgs {
    /// Owner the token authenticates as.
    #[arg(long = ARG_OWNER, value_name = "id")]
    #[serde(default)]
    pub(crate) owner: Option<String>,
    /// Directory holding `mapvault.db`.
    #[arg(long = ARG_DATA_DIR, value_name = "dir")]
    #[serde(default)]
    pub(crate) data_dir: Option<Utf8PathBuf>,
}

/// Resolved `issue-token` configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct IssueTokenConfig {
    pub(crate) owner: OwnerId,
    pub(crate) server: ServerConfig,
}

impl TryFrom<IssueTokenArgs> for IssueTokenConfig {
    type Error = CliError;

    fn try_from(args: IssueTokenArgs) -> Result<Self, Self::Error> {
        let owner = args.owner.ok_or(CliError::MissingArgument {
            field: ARG_OWNER,
            env: ENV_ISSUE_TOKEN_OWNER,
        })?;
        let owner = OwnerId::new(owner).map_err(|source| CliError::InvalidOwner { source })?;
        let server = args
            .data_dir
            .map_or_else(ServerConfig::default, ServerConfig::for_data_dir);
        Ok(Self { owner, server })
    }
}

pub(crate) fn run_issue_token(
    args: IssueTokenArgs,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let merged = args.load_and_merge().map_err(CliError::Configuration)?;
    let config = IssueTokenConfig::try_from(merged)?;
    issue_with_config(&config, writer)
}

pub(crate) fn issue_with_config(
    config: &IssueTokenConfig,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let OpenedStores { records, .. } = open_stores(&config.server)?;
    let token = issue_token(records.as_ref(), &config.owner)?;
    tracing::info!(owner = %config.owner, "issued bearer token");
    writeln!(writer, "{token}").map_err(CliError::WriteOutput)
}
