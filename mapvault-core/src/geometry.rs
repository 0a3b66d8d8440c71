//! Axis-aligned bounding boxes over nested coordinate trees.
//!
//! GeoJSON nests positions to a depth that depends on the geometry kind: a
//! `Point` holds one position, a `Polygon` holds rings of positions and a
//! `MultiPolygon` adds one more level. [`CoordinateTree`] captures that shape
//! without caring about the kind, and [`BoundsAccumulator`] folds every
//! position it meets into a running minimum and maximum.
//!
//! The fold only ever takes component-wise `min`/`max`, so the result does not
//! depend on traversal order.

use geo::{Coord, Rect};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Deepest nesting accepted below the root of a coordinate tree.
///
/// Real geometries never exceed four levels (`MultiPolygon`); the ceiling keeps
/// recursion bounded for adversarial input.
pub const MAX_COORDINATE_DEPTH: usize = 32;

/// An arbitrarily nested array of positions.
///
/// A position is an array of numbers `[x, y]` or `[x, y, z, ...]`. Anything
/// else is a nested array of trees.
///
/// # Examples
///
/// ```
/// use mapvault_core::CoordinateTree;
///
/// let ring: CoordinateTree = serde_json::from_str("[[0, 0], [4, 0], [4, 3], [0, 0]]")?;
/// assert!(matches!(ring, CoordinateTree::Nested(ref items) if items.len() == 4));
/// # Ok::<(), serde_json::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CoordinateTree {
    /// A leaf position. An empty array contributes nothing.
    Position(Vec<f64>),
    /// A sequence of nested trees (rings, lines, polygons...).
    Nested(Vec<CoordinateTree>),
}

impl CoordinateTree {
    /// Build a two-dimensional leaf position.
    #[must_use]
    pub fn point(x: f64, y: f64) -> Self {
        Self::Position(vec![x, y])
    }
}

/// Errors raised while folding a coordinate tree.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum GeometryError {
    /// A position carried fewer than two ordinates.
    #[error("position has {found} ordinate(s); at least two are required")]
    IncompletePosition {
        /// Number of ordinates present.
        found: usize,
    },
    /// A position carried `NaN` or an infinite ordinate.
    #[error("position contains a non-finite ordinate")]
    NonFinite,
    /// Nesting exceeded [`MAX_COORDINATE_DEPTH`].
    #[error("coordinates nest deeper than {limit} levels")]
    TooDeep {
        /// Depth limit that was exceeded.
        limit: usize,
    },
    /// A serialised box had a minimum greater than its maximum.
    #[error("bounding box minimum exceeds maximum")]
    InvertedBox,
}

/// Axis-aligned rectangle `(min_x, min_y, max_x, max_y)` in source coordinates.
///
/// Serialises as the four-element array used by GeoJSON's `bbox` member.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(into = "[f64; 4]", try_from = "[f64; 4]")]
pub struct BoundingBox(Rect<f64>);

impl BoundingBox {
    /// Degenerate box covering a single coordinate.
    #[must_use]
    pub fn of_coord(coord: Coord<f64>) -> Self {
        Self(Rect::new(coord, coord))
    }

    /// Box spanning two corners; `Rect::new` normalises the corner order.
    #[must_use]
    pub fn from_corners(a: Coord<f64>, b: Coord<f64>) -> Self {
        Self(Rect::new(a, b))
    }

    /// Smallest x ordinate.
    #[must_use]
    pub fn min_x(&self) -> f64 {
        self.0.min().x
    }

    /// Smallest y ordinate.
    #[must_use]
    pub fn min_y(&self) -> f64 {
        self.0.min().y
    }

    /// Largest x ordinate.
    #[must_use]
    pub fn max_x(&self) -> f64 {
        self.0.max().x
    }

    /// Largest y ordinate.
    #[must_use]
    pub fn max_y(&self) -> f64 {
        self.0.max().y
    }

    /// The underlying `geo` rectangle.
    #[must_use]
    pub fn rect(&self) -> Rect<f64> {
        self.0
    }

    /// Smallest box covering both `self` and `other`.
    #[must_use]
    pub fn union(self, other: Self) -> Self {
        let min = Coord {
            x: self.min_x().min(other.min_x()),
            y: self.min_y().min(other.min_y()),
        };
        let max = Coord {
            x: self.max_x().max(other.max_x()),
            y: self.max_y().max(other.max_y()),
        };
        Self(Rect::new(min, max))
    }

    /// `[min_x, min_y, max_x, max_y]`.
    #[must_use]
    pub fn to_array(self) -> [f64; 4] {
        [self.min_x(), self.min_y(), self.max_x(), self.max_y()]
    }
}

impl From<BoundingBox> for [f64; 4] {
    fn from(bbox: BoundingBox) -> Self {
        bbox.to_array()
    }
}

impl TryFrom<[f64; 4]> for BoundingBox {
    type Error = GeometryError;

    fn try_from([min_x, min_y, max_x, max_y]: [f64; 4]) -> Result<Self, Self::Error> {
        if [min_x, min_y, max_x, max_y].iter().any(|v| !v.is_finite()) {
            return Err(GeometryError::NonFinite);
        }
        if min_x > max_x || min_y > max_y {
            return Err(GeometryError::InvertedBox);
        }
        Ok(Self::from_corners(
            Coord { x: min_x, y: min_y },
            Coord { x: max_x, y: max_y },
        ))
    }
}

/// Running bounding box over any number of coordinates and trees.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BoundsAccumulator {
    bounds: Option<BoundingBox>,
}

impl BoundsAccumulator {
    /// Fold a single coordinate into the box.
    pub fn include_coord(&mut self, coord: Coord<f64>) {
        let point = BoundingBox::of_coord(coord);
        self.bounds = Some(match self.bounds {
            Some(existing) => existing.union(point),
            None => point,
        });
    }

    /// Fold every position in `tree` into the box.
    ///
    /// On error the accumulator may already hold positions visited before the
    /// offending one; callers discard it.
    pub fn include_tree(&mut self, tree: &CoordinateTree) -> Result<(), GeometryError> {
        self.visit(tree, 0)
    }

    fn visit(&mut self, tree: &CoordinateTree, depth: usize) -> Result<(), GeometryError> {
        if depth > MAX_COORDINATE_DEPTH {
            return Err(GeometryError::TooDeep {
                limit: MAX_COORDINATE_DEPTH,
            });
        }
        match tree {
            CoordinateTree::Position(ordinates) => match ordinates.as_slice() {
                [] => Ok(()),
                [x, y, ..] => {
                    if !x.is_finite() || !y.is_finite() {
                        return Err(GeometryError::NonFinite);
                    }
                    self.include_coord(Coord { x: *x, y: *y });
                    Ok(())
                }
                short => Err(GeometryError::IncompletePosition { found: short.len() }),
            },
            CoordinateTree::Nested(children) => children
                .iter()
                .try_for_each(|child| self.visit(child, depth + 1)),
        }
    }

    /// Combine two partial results.
    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        let bounds = match (self.bounds, other.bounds) {
            (Some(left), Some(right)) => Some(left.union(right)),
            (Some(bounds), None) | (None, Some(bounds)) => Some(bounds),
            (None, None) => None,
        };
        Self { bounds }
    }

    /// The box so far, or `None` when no coordinate has been seen.
    #[must_use]
    pub fn finish(self) -> Option<BoundingBox> {
        self.bounds
    }
}

/// Compute the bounding box of a single coordinate tree.
///
/// Returns `Ok(None)` when the tree holds no positions at all.
///
/// # Examples
///
/// ```
/// use mapvault_core::{CoordinateTree, bounding_box};
///
/// let line: CoordinateTree = serde_json::from_str("[[10, 20], [-5, 15]]")?;
/// let bbox = bounding_box(&line)?.expect("line has positions");
/// assert_eq!(bbox.to_array(), [-5.0, 15.0, 10.0, 20.0]);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn bounding_box(tree: &CoordinateTree) -> Result<Option<BoundingBox>, GeometryError> {
    let mut accumulator = BoundsAccumulator::default();
    accumulator.include_tree(tree)?;
    Ok(accumulator.finish())
}
