//! Owner-scoped map annotations: markers and shapes.
//!
//! Annotations are stored as submitted; the crate only validates marker
//! positions and the presence of required fields.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::OwnerId;

/// Free-form property bag attached to an annotation.
pub type Properties = Map<String, Value>;

/// Identifier of a marker or shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(Uuid);

impl RecordId {
    /// Fresh random (v4) identifier.
    #[must_use]
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a textual identifier, returning `None` when it is not a UUID.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        Uuid::parse_str(raw).ok().map(Self)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0.hyphenated(), f)
    }
}

/// Validation failures for annotation payloads.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AnnotationError {
    /// Marker coordinates were not `[lat, lng]` within range.
    #[error("Invalid coordinates")]
    InvalidCoordinates,
    /// A required field was absent.
    #[error("{field} is required")]
    MissingField {
        /// Wire name of the field.
        field: &'static str,
    },
    /// A shape `type` was blank.
    #[error("shape type must not be blank")]
    BlankShapeKind,
}

/// Marker location as `[lat, lng]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(into = "[f64; 2]", try_from = "Vec<f64>")]
pub struct MarkerPosition {
    lat: f64,
    lng: f64,
}

impl MarkerPosition {
    /// Validates and constructs a [`MarkerPosition`].
    ///
    /// # Examples
    ///
    /// ```
    /// use mapvault_core::MarkerPosition;
    ///
    /// assert!(MarkerPosition::new(51.5, -0.12).is_ok());
    /// assert!(MarkerPosition::new(91.0, 0.0).is_err());
    /// ```
    pub fn new(lat: f64, lng: f64) -> Result<Self, AnnotationError> {
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
            return Err(AnnotationError::InvalidCoordinates);
        }
        Ok(Self { lat, lng })
    }

    /// Accepts exactly two ordinates, latitude first.
    pub fn from_ordinates(ordinates: &[f64]) -> Result<Self, AnnotationError> {
        match ordinates {
            [lat, lng] => Self::new(*lat, *lng),
            _ => Err(AnnotationError::InvalidCoordinates),
        }
    }

    /// Latitude in degrees.
    #[must_use]
    pub fn lat(&self) -> f64 {
        self.lat
    }

    /// Longitude in degrees.
    #[must_use]
    pub fn lng(&self) -> f64 {
        self.lng
    }
}

impl From<MarkerPosition> for [f64; 2] {
    fn from(position: MarkerPosition) -> Self {
        [position.lat, position.lng]
    }
}

impl TryFrom<Vec<f64>> for MarkerPosition {
    type Error = AnnotationError;

    fn try_from(value: Vec<f64>) -> Result<Self, Self::Error> {
        Self::from_ordinates(&value)
    }
}

/// A single labelled point on a user's map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Marker {
    /// Record identifier.
    pub id: RecordId,
    /// Owning account.
    #[serde(rename = "userId")]
    pub owner: OwnerId,
    /// `[lat, lng]`.
    pub coordinates: MarkerPosition,
    /// Client-defined properties.
    pub properties: Properties,
    /// Creation time.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// Last modification time.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Input for a new marker.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerDraft {
    /// `[lat, lng]`.
    pub coordinates: MarkerPosition,
    /// Properties; an absent bag is stored as `{}`.
    pub properties: Properties,
}

/// Partial marker update. `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarkerPatch {
    /// Replacement position.
    pub coordinates: Option<MarkerPosition>,
    /// Replacement properties.
    pub properties: Option<Properties>,
}

impl Marker {
    /// Materialise a draft for `owner`.
    #[must_use]
    pub fn create(owner: OwnerId, draft: MarkerDraft, now: OffsetDateTime) -> Self {
        Self {
            id: RecordId::random(),
            owner,
            coordinates: draft.coordinates,
            properties: draft.properties,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a patch and refresh `updated_at`.
    pub fn apply(&mut self, patch: MarkerPatch, now: OffsetDateTime) {
        if let Some(coordinates) = patch.coordinates {
            self.coordinates = coordinates;
        }
        if let Some(properties) = patch.properties {
            self.properties = properties;
        }
        self.updated_at = now;
    }
}

/// A polygon, line or other drawn figure.
///
/// Coordinates are stored verbatim; the crate does not interpret them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shape {
    /// Record identifier.
    pub id: RecordId,
    /// Owning account.
    #[serde(rename = "userId")]
    pub owner: OwnerId,
    /// Client-defined kind such as `polygon` or `line`. Immutable.
    #[serde(rename = "type")]
    pub kind: String,
    /// Coordinate array as submitted.
    pub coordinates: Vec<Value>,
    /// Optional client-defined properties.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<Properties>,
    /// Creation time.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Input for a new shape.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeDraft {
    kind: String,
    coordinates: Vec<Value>,
    properties: Option<Properties>,
}

impl ShapeDraft {
    /// Validates and constructs a [`ShapeDraft`].
    pub fn new(
        kind: Option<String>,
        coordinates: Option<Vec<Value>>,
        properties: Option<Properties>,
    ) -> Result<Self, AnnotationError> {
        let kind = kind.ok_or(AnnotationError::MissingField { field: "type" })?;
        if kind.trim().is_empty() {
            return Err(AnnotationError::BlankShapeKind);
        }
        let coordinates = coordinates.ok_or(AnnotationError::MissingField {
            field: "coordinates",
        })?;
        Ok(Self {
            kind,
            coordinates,
            properties,
        })
    }
}

/// Partial shape update. The shape `type` cannot change.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShapePatch {
    /// Replacement coordinates.
    pub coordinates: Option<Vec<Value>>,
    /// Replacement properties.
    pub properties: Option<Properties>,
}

impl Shape {
    /// Materialise a draft for `owner`.
    #[must_use]
    pub fn create(owner: OwnerId, draft: ShapeDraft, now: OffsetDateTime) -> Self {
        Self {
            id: RecordId::random(),
            owner,
            kind: draft.kind,
            coordinates: draft.coordinates,
            properties: draft.properties,
            created_at: now,
        }
    }

    /// Apply a patch.
    pub fn apply(&mut self, patch: ShapePatch) {
        if let Some(coordinates) = patch.coordinates {
            self.coordinates = coordinates;
        }
        if let Some(properties) = patch.properties {
            self.properties = Some(properties);
        }
    }
}
