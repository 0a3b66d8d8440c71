//! Uploaded file records and the names they are stored under.
//!
//! An [`UploadedFile`] is created exactly once, when ingestion succeeds, and is
//! never updated afterwards. Its [`FileFormat`] comes from the client's file
//! name alone; content is parsed to extract [`FileMetadata`] but never used to
//! reclassify the upload.

use std::{fmt, path::Path};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;

use crate::{BoundingBox, OwnerId};

/// Longest storage name accepted, in bytes.
pub const MAX_STORAGE_NAME_LEN: usize = 255;

/// Longest sanitised original name kept inside a storage name, in bytes.
const MAX_ORIGINAL_NAME_LEN: usize = 200;

/// Format tag derived from an upload's file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileFormat {
    /// `.geojson` feature collections.
    #[serde(rename = "GeoJSON")]
    GeoJson,
    /// `.kml` documents.
    #[serde(rename = "KML")]
    Kml,
    /// Accepted but not parsed (`.tif`, `.tiff`).
    Unsupported,
}

const RECOGNISED_EXTENSIONS: [(&str, FileFormat); 4] = [
    (".geojson", FileFormat::GeoJson),
    (".kml", FileFormat::Kml),
    (".tif", FileFormat::Unsupported),
    (".tiff", FileFormat::Unsupported),
];

impl FileFormat {
    /// Classify a file name by its extension, ignoring case.
    ///
    /// Returns the format together with the canonical lower-case extension,
    /// or `None` when the extension is not accepted. Dot-files such as
    /// `.geojson` have no extension.
    ///
    /// # Examples
    ///
    /// ```
    /// use mapvault_core::FileFormat;
    ///
    /// assert_eq!(
    ///     FileFormat::from_file_name("Trail.GeoJSON"),
    ///     Some((FileFormat::GeoJson, ".geojson"))
    /// );
    /// assert_eq!(FileFormat::from_file_name("scan.TIFF").map(|(f, _)| f), Some(FileFormat::Unsupported));
    /// assert_eq!(FileFormat::from_file_name("notes.txt"), None);
    /// ```
    #[must_use]
    pub fn from_file_name(name: &str) -> Option<(Self, &'static str)> {
        let extension = Path::new(name).extension()?.to_str()?.to_ascii_lowercase();
        RECOGNISED_EXTENSIONS
            .iter()
            .find(|(candidate, _)| candidate.get(1..) == Some(extension.as_str()))
            .map(|(candidate, format)| (*format, *candidate))
    }

    /// Tag used in serialised records.
    #[must_use]
    pub fn tag(self) -> &'static str {
        match self {
            Self::GeoJson => "GeoJSON",
            Self::Kml => "KML",
            Self::Unsupported => "Unsupported",
        }
    }

    /// Inverse of [`FileFormat::tag`].
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        [Self::GeoJson, Self::Kml, Self::Unsupported]
            .into_iter()
            .find(|format| format.tag() == tag)
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Reduce a client-supplied file name to a safe basename.
///
/// Directory components separated by `/` or `\` are dropped and control
/// characters become `_`. Overlong names keep their tail so the extension
/// survives. Returns `None` when nothing usable remains.
///
/// # Examples
///
/// ```
/// use mapvault_core::sanitise_original_name;
///
/// assert_eq!(sanitise_original_name("C:\\maps\\trail.kml").as_deref(), Some("trail.kml"));
/// assert_eq!(sanitise_original_name("../../"), None);
/// ```
#[must_use]
pub fn sanitise_original_name(raw: &str) -> Option<String> {
    let basename = raw.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = basename
        .trim()
        .chars()
        .map(|c| if c.is_control() { '_' } else { c })
        .collect();
    if cleaned.is_empty() || cleaned == "." || cleaned == ".." {
        return None;
    }
    if cleaned.len() <= MAX_ORIGINAL_NAME_LEN {
        return Some(cleaned);
    }
    let mut start = cleaned.len() - MAX_ORIGINAL_NAME_LEN;
    while !cleaned.is_char_boundary(start) {
        start += 1;
    }
    cleaned.get(start..).map(str::to_owned)
}

/// Name under which an upload's raw bytes are persisted.
///
/// Storage names are single path components: never empty, never starting with
/// a dot, and free of separators and control characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StorageName(String);

/// Errors returned by [`StorageName::parse`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StorageNameError {
    /// The name was empty.
    #[error("storage name must not be empty")]
    Empty,
    /// The name exceeded [`MAX_STORAGE_NAME_LEN`] bytes.
    #[error("storage name exceeds {max} bytes")]
    TooLong {
        /// Maximum accepted length.
        max: usize,
    },
    /// The name began with a dot.
    #[error("storage name must not start with '.'")]
    LeadingDot,
    /// The name contained a separator or control character.
    #[error("storage name contains forbidden character {found:?}")]
    ForbiddenCharacter {
        /// The offending character.
        found: char,
    },
}

impl StorageName {
    /// Validate an existing storage name.
    pub fn parse(raw: impl Into<String>) -> Result<Self, StorageNameError> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(StorageNameError::Empty);
        }
        if raw.len() > MAX_STORAGE_NAME_LEN {
            return Err(StorageNameError::TooLong {
                max: MAX_STORAGE_NAME_LEN,
            });
        }
        if raw.starts_with('.') {
            return Err(StorageNameError::LeadingDot);
        }
        if let Some(found) = raw
            .chars()
            .find(|c| matches!(c, '/' | '\\') || c.is_control())
        {
            return Err(StorageNameError::ForbiddenCharacter { found });
        }
        Ok(Self(raw))
    }

    /// Build the name for a fresh upload: `<stamp>-<sanitised original>`.
    pub fn generate(stamp_millis: u64, sanitised_original: &str) -> Result<Self, StorageNameError> {
        Self::parse(format!("{stamp_millis}-{sanitised_original}"))
    }

    /// Borrow the name text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether retrieval should designate the bytes as JSON.
    ///
    /// The check is a case-sensitive suffix match on `.geojson`.
    #[must_use]
    pub fn designates_json(&self) -> bool {
        self.0.ends_with(".geojson")
    }
}

impl fmt::Display for StorageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for StorageName {
    type Error = StorageNameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<StorageName> for String {
    fn from(name: StorageName) -> Self {
        name.0
    }
}

/// Summary extracted from a GeoJSON feature collection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoJsonMetadata {
    /// Number of entries in the `features` array.
    pub features: u64,
    /// Box around every coordinate pair, absent when there are none.
    pub bbox: Option<BoundingBox>,
}

/// Summary extracted from a KML document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KmlMetadata {
    /// Number of `Placemark` elements.
    pub placemarks: u64,
}

/// Format-specific metadata, tagged by `type` when serialised.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum FileMetadata {
    /// GeoJSON summary.
    #[serde(rename = "GeoJSON")]
    GeoJson(GeoJsonMetadata),
    /// KML summary.
    #[serde(rename = "KML")]
    Kml(KmlMetadata),
    /// No metadata is extracted for unsupported formats.
    Unsupported,
}

impl FileMetadata {
    /// The format this metadata describes.
    #[must_use]
    pub fn format(&self) -> FileFormat {
        match self {
            Self::GeoJson(_) => FileFormat::GeoJson,
            Self::Kml(_) => FileFormat::Kml,
            Self::Unsupported => FileFormat::Unsupported,
        }
    }
}

/// Metadata record for one successfully ingested upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFile {
    /// Unique, time-ordered storage name.
    #[serde(rename = "filename")]
    pub storage_name: StorageName,
    /// Sanitised client file name.
    pub original_name: String,
    /// Canonical extension, e.g. `.geojson`.
    pub file_type: String,
    /// Format derived from the extension.
    pub format: FileFormat,
    /// Account that uploaded the file.
    #[serde(rename = "userId")]
    pub owner: OwnerId,
    /// Extracted summary.
    pub metadata: FileMetadata,
    /// Ingestion time.
    #[serde(rename = "uploadDate", with = "time::serde::rfc3339")]
    pub uploaded_at: OffsetDateTime,
}

/// Errors returned by [`UploadedFile::new`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UploadedFileError {
    /// The metadata variant disagreed with the declared format.
    #[error("{metadata} metadata cannot describe a {format} upload")]
    MetadataMismatch {
        /// Format derived from the extension.
        format: FileFormat,
        /// Format implied by the metadata.
        metadata: FileFormat,
    },
}

impl UploadedFile {
    /// Validates and constructs an [`UploadedFile`].
    pub fn new(
        storage_name: StorageName,
        original_name: String,
        (format, extension): (FileFormat, &str),
        owner: OwnerId,
        metadata: FileMetadata,
        uploaded_at: OffsetDateTime,
    ) -> Result<Self, UploadedFileError> {
        if metadata.format() != format {
            return Err(UploadedFileError::MetadataMismatch {
                format,
                metadata: metadata.format(),
            });
        }
        Ok(Self {
            storage_name,
            original_name,
            file_type: extension.to_owned(),
            format,
            owner,
            metadata,
            uploaded_at,
        })
    }
}
