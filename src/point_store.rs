use crate::error::{KMeansError, Result};
use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Cluster index assigned to a point.
pub type Label = u32;

/// A 2-D point, laid out as `x` then `y` with no padding.
#[repr(C)]
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Serialize,
    Deserialize,
    IntoBytes,
    FromBytes,
    Immutable,
    KnownLayout,
)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Point { x, y }
    }

    /// Squared Euclidean distance to `other`.
    #[inline]
    pub fn distance_squared(&self, other: &Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }
}

impl From<(f32, f32)> for Point {
    fn from((x, y): (f32, f32)) -> Self {
        Point { x, y }
    }
}

/// Immutable input points for one clustering run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PointStore {
    points: Vec<Point>,
}

impl PointStore {
    pub fn new(points: Vec<Point>) -> Self {
        PointStore { points }
    }

    /// Builds a store from an `(n, 2)` array, one point per row.
    pub fn from_array(data: ArrayView2<f32>) -> Result<Self> {
        if data.ncols() != 2 {
            return Err(KMeansError::LengthMismatch {
                buffer: "point columns",
                expected: 2,
                actual: data.ncols(),
            });
        }
        let points = data
            .rows()
            .into_iter()
            .map(|row| Point::new(row[0], row[1]))
            .collect();
        Ok(PointStore { points })
    }

    pub fn to_array(&self) -> Array2<f32> {
        let mut arr = Array2::<f32>::zeros((self.points.len(), 2));
        for (i, p) in self.points.iter().enumerate() {
            arr[(i, 0)] = p.x;
            arr[(i, 1)] = p.y;
        }
        arr
    }

    pub fn as_slice(&self) -> &[Point] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn into_inner(self) -> Vec<Point> {
        self.points
    }
}

impl From<Vec<Point>> for PointStore {
    fn from(points: Vec<Point>) -> Self {
        PointStore::new(points)
    }
}
