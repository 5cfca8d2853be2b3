//! Points and natural-coordinate DOF bookkeeping.

use nalgebra::Vector2;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A 2D point of the mechanism.
///
/// Fixed points are immutable ground references; free points contribute
/// two scalar unknowns (x, y) to the state vector of an assembled model.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Point2 {
    /// Initial (and, for fixed points, permanent) coordinates.
    pub coords: Vector2<f64>,
    /// Whether the point is grounded.
    pub fixed: bool,
}

impl Default for Point2 {
    fn default() -> Self {
        Self {
            coords: Vector2::zeros(),
            fixed: false,
        }
    }
}

impl Point2 {
    /// Create a point.
    #[must_use]
    pub const fn new(coords: Vector2<f64>, fixed: bool) -> Self {
        Self { coords, fixed }
    }
}

/// Axis tag for a natural-coordinate DOF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PointDof {
    /// Horizontal axis.
    X,
    /// Vertical axis.
    Y,
}

impl PointDof {
    /// Single-letter label used in coordinate dumps.
    #[must_use]
    pub const fn letter(self) -> char {
        match self {
            Self::X => 'x',
            Self::Y => 'y',
        }
    }
}

/// One natural-coordinate DOF: an axis of a free point.
///
/// The ordered list of these defines the first block of the state vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NaturalDof {
    /// Index of the point in the model registry.
    pub point_index: usize,
    /// Which axis of the point.
    pub axis: PointDof,
}

impl NaturalDof {
    /// Create a natural DOF descriptor.
    #[must_use]
    pub const fn new(point_index: usize, axis: PointDof) -> Self {
        Self { point_index, axis }
    }
}

/// Reverse map entry: the q-columns of a point's axes.
///
/// `None` means the axis is fixed and has no column in the state vector.
/// Built once per assembled model, read-only thereafter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PointDofMap {
    /// Column of the x coordinate, if free.
    pub dof_x: Option<usize>,
    /// Column of the y coordinate, if free.
    pub dof_y: Option<usize>,
}

impl PointDofMap {
    /// Column for the given axis, if free.
    #[must_use]
    pub const fn column(&self, axis: PointDof) -> Option<usize> {
        match axis {
            PointDof::X => self.dof_x,
            PointDof::Y => self.dof_y,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_point_is_free_at_origin() {
        let pt = Point2::default();
        assert!(!pt.fixed);
        assert_eq!(pt.coords, Vector2::zeros());
    }

    #[test]
    fn test_dof_map_column_lookup() {
        let map = PointDofMap {
            dof_x: Some(4),
            dof_y: None,
        };
        assert_eq!(map.column(PointDof::X), Some(4));
        assert_eq!(map.column(PointDof::Y), None);
    }

    #[test]
    fn test_dof_letters() {
        assert_eq!(PointDof::X.letter(), 'x');
        assert_eq!(PointDof::Y.letter(), 'y');
    }
}
