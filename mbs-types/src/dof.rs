//! Relative-coordinate DOF descriptors.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A relative coordinate appended to the state vector after all natural DOFs.
///
/// Each variant carries its own constraint equation, instantiated at
/// assembly time and bound to the DOF's column. The set is closed:
/// assembly dispatches with an exhaustive `match`, so an unknown variant
/// is unrepresentable rather than a runtime error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum RelativeDof {
    /// Signed angle at `p1` between the segments `p1→p0` and `p1→p2`.
    Angle {
        /// First segment endpoint.
        p0: usize,
        /// Shared vertex of the two segments.
        p1: usize,
        /// Second segment endpoint.
        p2: usize,
    },
    /// Angle of the segment `p0→p1` measured against the global +X axis.
    AngleAbsolute {
        /// Segment origin.
        p0: usize,
        /// Segment tip.
        p1: usize,
    },
}

impl RelativeDof {
    /// Point indices referenced by this DOF.
    #[must_use]
    pub fn points(&self) -> Vec<usize> {
        match *self {
            Self::Angle { p0, p1, p2 } => vec![p0, p1, p2],
            Self::AngleAbsolute { p0, p1 } => vec![p0, p1],
        }
    }

    /// Human-readable description used in coordinate dumps.
    #[must_use]
    pub fn describe(&self) -> String {
        match *self {
            Self::Angle { p0, p1, p2 } => format!("relativeAngle({p0} - {p1} - {p2})"),
            Self::AngleAbsolute { p0, p1 } => format!("relativeAngleWrtGround({p0} - {p1})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_referenced_points() {
        let dof = RelativeDof::Angle {
            p0: 0,
            p1: 1,
            p2: 2,
        };
        assert_eq!(dof.points(), vec![0, 1, 2]);

        let dof = RelativeDof::AngleAbsolute { p0: 3, p1: 5 };
        assert_eq!(dof.points(), vec![3, 5]);
    }

    #[test]
    fn test_describe() {
        let dof = RelativeDof::AngleAbsolute { p0: 0, p1: 1 };
        assert_eq!(dof.describe(), "relativeAngleWrtGround(0 - 1)");
    }
}
