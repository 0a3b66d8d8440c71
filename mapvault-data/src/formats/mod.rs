//! Format parsers producing [`FileMetadata`].

mod geojson;
mod kml;

pub use geojson::{GeoJsonError, parse_geojson};
pub use kml::{KmlError, parse_kml};

use mapvault_core::{FileFormat, FileMetadata};
use thiserror::Error;

/// A parser rejected an upload's content.
#[derive(Debug, Error)]
pub enum ParseError {
    /// GeoJSON structure was invalid.
    #[error("malformed GeoJSON: {0}")]
    GeoJson(#[from] GeoJsonError),
    /// KML markup was invalid.
    #[error("malformed KML: {0}")]
    Kml(#[from] KmlError),
}

/// Run the parser matching `format`. Unsupported formats are not parsed.
pub fn extract_metadata(format: FileFormat, bytes: &[u8]) -> Result<FileMetadata, ParseError> {
    match format {
        FileFormat::GeoJson => Ok(FileMetadata::GeoJson(parse_geojson(bytes)?)),
        FileFormat::Kml => Ok(FileMetadata::Kml(parse_kml(bytes)?)),
        FileFormat::Unsupported => Ok(FileMetadata::Unsupported),
    }
}
