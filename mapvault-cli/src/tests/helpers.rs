//! Test helpers for scratch data directories and sample inputs.

use super::*;
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use tempfile::TempDir;

pub(super) const TWO_POINTS: &str = r#"{"type":"FeatureCollection","features":[
    {"type":"Feature","geometry":{"type":"Point","coordinates":[10,20]},"properties":{}},
    {"type":"Feature","geometry":{"type":"Point","coordinates":[-5,15]},"properties":{}}
]}"#;

pub(super) const ONE_PLACEMARK: &str =
    r#"<kml xmlns="http://www.opengis.net/kml/2.2"><Placemark><name>Peak</name></Placemark></kml>"#;

/// Scratch workspace holding input files and a data directory.
#[derive(Debug)]
pub(super) struct Workspace {
    _dir: TempDir,
    root: Utf8PathBuf,
}

impl Workspace {
    pub(super) fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 tempdir");
        Self { _dir: dir, root }
    }

    pub(super) fn data_dir(&self) -> Utf8PathBuf {
        self.root.join("data")
    }

    pub(super) fn write(&self, name: &str, contents: &str) -> Utf8PathBuf {
        let path = self.root.join(name);
        fs::write(&path, contents).expect("write input file");
        path
    }

    pub(super) fn root(&self) -> &Utf8Path {
        &self.root
    }
}

/// Run a full CLI invocation, capturing stdout.
pub(super) fn invoke(args: &[&str]) -> (Result<(), CliError>, String) {
    let mut output = Vec::new();
    let outcome = Cli::try_parse_from(args.iter().copied())
        .map_err(CliError::ArgumentParsing)
        .and_then(|cli| run_with(cli, &mut output));
    let text = String::from_utf8(output).expect("utf-8 output");
    (outcome, text)
}
