//! Error types for model assembly and numeric updates.

use thiserror::Error;

/// Errors that can occur while defining, assembling, or updating a model.
///
/// The kernel is fail-fast: every variant except the render-adapter paths
/// indicates a malformed model definition or a caller protocol violation,
/// and must be propagated to the top-level caller rather than corrected.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MbsError {
    /// A body references fewer than two points.
    #[error("body '{name}' has {count} points, at least 2 are required")]
    BodyTooFewPoints {
        /// Name of the offending body.
        name: String,
        /// Number of points it declares.
        count: usize,
    },

    /// The model has no free point axes; nothing to solve for.
    #[error("cannot assemble a model with zero natural-coordinate DOFs")]
    ZeroNaturalDofs,

    /// Point index out of range.
    #[error("point index {0} out of range")]
    InvalidPointIndex(usize),

    /// Body index out of range.
    #[error("body index {0} out of range")]
    InvalidBodyIndex(usize),

    /// A body's reference length is zero or negative.
    #[error("body '{name}' has non-positive reference length {length}")]
    NonPositiveLength {
        /// Name of the offending body.
        name: String,
        /// The invalid length.
        length: f64,
    },

    /// Invalid mass properties on a body.
    #[error("invalid mass properties for body '{name}': {reason}")]
    InvalidMassProperties {
        /// Name of the offending body.
        name: String,
        /// Description of what's wrong.
        reason: String,
    },

    /// Structural mutation attempted after rigidity constraints were generated.
    #[error("model definition is frozen once rigidity constraints are generated")]
    ModelFrozen,

    /// `copy_state_from` between models with different DOF layouts.
    #[error("structural signature mismatch: {expected:#018x} vs {actual:#018x}")]
    StructureMismatch {
        /// Fingerprint of the destination model.
        expected: u64,
        /// Fingerprint of the source model.
        actual: u64,
    },

    /// A constraint references a state-vector column outside the DOF layout.
    #[error("state column {0} out of range")]
    InvalidDofColumn(usize),

    /// A constraint was updated before its sparse structures were built.
    #[error("constraint updated before build_sparse_structures")]
    StructuresNotBuilt,

    /// Geometry degenerated to the point where a constraint is undefined.
    #[error("degenerate geometry: {reason}")]
    DegenerateGeometry {
        /// Description of the degeneracy.
        reason: String,
    },
}

impl MbsError {
    /// Create an invalid-mass-properties error.
    #[must_use]
    pub fn invalid_mass(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidMassProperties {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create a degenerate-geometry error.
    #[must_use]
    pub fn degenerate(reason: impl Into<String>) -> Self {
        Self::DegenerateGeometry {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MbsError::BodyTooFewPoints {
            name: "crank".into(),
            count: 1,
        };
        assert!(err.to_string().contains("crank"));
        assert!(err.to_string().contains('1'));

        let err = MbsError::InvalidPointIndex(7);
        assert!(err.to_string().contains('7'));

        let err = MbsError::invalid_mass("rod", "negative mass");
        assert!(err.to_string().contains("negative mass"));
    }

    #[test]
    fn test_signature_mismatch_formatting() {
        let err = MbsError::StructureMismatch {
            expected: 0xdead,
            actual: 0xbeef,
        };
        let s = err.to_string();
        assert!(s.contains("0x000000000000dead"));
        assert!(s.contains("0x000000000000beef"));
    }
}
