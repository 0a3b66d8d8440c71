//! `serve` command: run the HTTP API.

use std::net::SocketAddr;

use camino::Utf8PathBuf;
use clap::Parser;
use mapvault_data::RetrievalPolicy;
use mapvault_server::{ServerConfig, open_state};
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

use crate::{ARG_BIND, ARG_DATA_DIR, ARG_MAX_UPLOAD_BYTES, ARG_RETRIEVAL_POLICY, CliError};

/// CLI arguments for the `serve` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    name = "serve",
    long_about = "Serve the upload, retrieval and annotation API. Settings \
                 can come from CLI flags, configuration files, or environment \
                 variables.",
    about = "Serve the HTTP API"
)]
#[ortho_config(prefix = "MAPVAULT")]
pub(crate) struct ServeArgs {
    /// Directory holding `mapvault.db` and the `uploads/` area.
    #[arg(long = ARG_DATA_DIR, value_name = "dir")]
    #[serde(default)]
    pub(crate) data_dir: Option<Utf8PathBuf>,
    /// Socket address to listen on.
    #[arg(long = ARG_BIND, value_name = "addr")]
    #[serde(default)]
    pub(crate) bind: Option<SocketAddr>,
    /// Largest accepted upload in bytes.
    #[arg(long = ARG_MAX_UPLOAD_BYTES, value_name = "bytes")]
    #[serde(default)]
    pub(crate) max_upload_bytes: Option<usize>,
    /// `owner-only` or `any-authenticated`.
    #[arg(long = ARG_RETRIEVAL_POLICY, value_name = "policy")]
    #[serde(default)]
    pub(crate) retrieval_policy: Option<RetrievalPolicy>,
}

impl ServeArgs {
    pub(crate) fn into_config(self) -> Result<ServerConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        Ok(ServerConfig::from(merged))
    }
}

impl From<ServeArgs> for ServerConfig {
    fn from(args: ServeArgs) -> Self {
        let defaults = Self::default();
        Self {
            bind: args.bind.unwrap_or(defaults.bind),
            data_dir: args.data_dir.unwrap_or(defaults.data_dir),
            max_upload_bytes: args.max_upload_bytes.unwrap_or(defaults.max_upload_bytes),
            retrieval_policy: args.retrieval_policy.unwrap_or(defaults.retrieval_policy),
        }
    }
}

pub(crate) fn run_serve(args: ServeArgs) -> Result<(), CliError> {
    let config = args.into_config()?;
    let state = open_state(&config)?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;
    runtime
        .block_on(mapvault_server::serve(&config, state))
        .map_err(|source| CliError::Serve {
            bind: config.bind,
            source,
        })
}

#[cfg(test)]
pub(crate) fn config_from_layers_for_test(
    layers: Vec<ortho_config::MergeLayer<'static>>,
) -> Result<ServerConfig, CliError> {
    let merged = ServeArgs::merge_from_layers(layers).map_err(CliError::from)?;
    Ok(ServerConfig::from(merged))
}
