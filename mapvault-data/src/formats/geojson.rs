//! GeoJSON feature-collection parser.
//!
//! Only the structure needed for metadata is validated: a top-level object
//! with a `features` array whose geometries carry well-formed coordinates.
//! Feature properties and foreign members are ignored.

use mapvault_core::{
    BoundsAccumulator, CoordinateTree, GeoJsonMetadata, GeometryError,
};
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// Deepest `GeometryCollection` nesting accepted.
const MAX_COLLECTION_DEPTH: usize = 16;

/// Structural problems found in a GeoJSON document.
#[derive(Debug, Error)]
pub enum GeoJsonError {
    /// The bytes were not JSON.
    #[error("invalid JSON: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },
    /// A value that must be an object was something else.
    #[error("{what} must be a JSON object")]
    NotAnObject { what: &'static str },
    /// The top-level object had no `features` member.
    #[error("missing 'features' array")]
    MissingFeatures,
    /// A member that must be an array was something else.
    #[error("'{member}' must be an array")]
    NotAnArray { member: &'static str },
    /// The top-level `type` was not `FeatureCollection`.
    #[error("expected type 'FeatureCollection' but found '{found}'")]
    UnexpectedType { found: String },
    /// A geometry had neither `coordinates` nor `geometries`.
    #[error("geometry of feature {feature} has no coordinates")]
    MissingCoordinates { feature: usize },
    /// `coordinates` was not a nested array of numbers.
    #[error("feature {feature} has malformed coordinates: {source}")]
    InvalidCoordinates {
        feature: usize,
        #[source]
        source: serde_json::Error,
    },
    /// The coordinate tree was rejected by the reducer.
    #[error("feature {feature} has invalid geometry: {source}")]
    Geometry {
        feature: usize,
        #[source]
        source: GeometryError,
    },
    /// Geometry collections nested too deeply.
    #[error("geometry collections nest deeper than {limit} levels")]
    CollectionTooDeep { limit: usize },
}

/// Count features and compute the bounding box of a feature collection.
///
/// # Examples
///
/// ```
/// use mapvault_data::parse_geojson;
///
/// let doc = br#"{"type":"FeatureCollection","features":[
///     {"type":"Feature","geometry":{"type":"Point","coordinates":[10,20]}},
///     {"type":"Feature","geometry":{"type":"Point","coordinates":[-5,15]}}
/// ]}"#;
/// let metadata = parse_geojson(doc)?;
/// assert_eq!(metadata.features, 2);
/// assert_eq!(metadata.bbox.map(|b| b.to_array()), Some([-5.0, 15.0, 10.0, 20.0]));
/// # Ok::<(), mapvault_data::GeoJsonError>(())
/// ```
pub fn parse_geojson(bytes: &[u8]) -> Result<GeoJsonMetadata, GeoJsonError> {
    let document: Value =
        serde_json::from_slice(bytes).map_err(|source| GeoJsonError::InvalidJson { source })?;
    let Value::Object(collection) = document else {
        return Err(GeoJsonError::NotAnObject {
            what: "top-level value",
        });
    };
    check_collection_type(&collection)?;

    let features = match collection.get("features") {
        Some(Value::Array(features)) => features,
        Some(_) => return Err(GeoJsonError::NotAnArray { member: "features" }),
        None => return Err(GeoJsonError::MissingFeatures),
    };

    let mut bounds = BoundsAccumulator::default();
    for (index, feature) in features.iter().enumerate() {
        let Value::Object(feature) = feature else {
            return Err(GeoJsonError::NotAnObject { what: "feature" });
        };
        match feature.get("geometry") {
            None | Some(Value::Null) => {}
            Some(geometry) => visit_geometry(geometry, index, 0, &mut bounds)?,
        }
    }

    Ok(GeoJsonMetadata {
        features: u64::try_from(features.len()).unwrap_or(u64::MAX),
        bbox: bounds.finish(),
    })
}

fn check_collection_type(collection: &Map<String, Value>) -> Result<(), GeoJsonError> {
    match collection.get("type") {
        None => Ok(()),
        Some(Value::String(kind)) if kind == "FeatureCollection" => Ok(()),
        Some(Value::String(kind)) => Err(GeoJsonError::UnexpectedType {
            found: kind.clone(),
        }),
        Some(other) => Err(GeoJsonError::UnexpectedType {
            found: other.to_string(),
        }),
    }
}

fn visit_geometry(
    geometry: &Value,
    feature: usize,
    depth: usize,
    bounds: &mut BoundsAccumulator,
) -> Result<(), GeoJsonError> {
    let Value::Object(geometry) = geometry else {
        return Err(GeoJsonError::NotAnObject { what: "geometry" });
    };

    if let Some(members) = geometry.get("geometries") {
        let Value::Array(members) = members else {
            return Err(GeoJsonError::NotAnArray {
                member: "geometries",
            });
        };
        if depth >= MAX_COLLECTION_DEPTH {
            return Err(GeoJsonError::CollectionTooDeep {
                limit: MAX_COLLECTION_DEPTH,
            });
        }
        return members
            .iter()
            .try_for_each(|member| visit_geometry(member, feature, depth + 1, bounds));
    }

    let coordinates = geometry
        .get("coordinates")
        .ok_or(GeoJsonError::MissingCoordinates { feature })?;
    let tree = CoordinateTree::deserialize(coordinates)
        .map_err(|source| GeoJsonError::InvalidCoordinates { feature, source })?;
    bounds
        .include_tree(&tree)
        .map_err(|source| GeoJsonError::Geometry { feature, source })
}
