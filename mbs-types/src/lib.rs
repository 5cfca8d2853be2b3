//! Core data types for planar multibody assembly.
//!
//! This crate provides the foundational types shared by the assembly kernel
//! and its consumers:
//!
//! - [`Point2`] - a 2D point with a fixed (grounded) flag
//! - [`Body`] - a planar rigid body with a frozen local frame and
//!   natural-coordinate generalized-mass blocks
//! - [`NaturalDof`] / [`RelativeDof`] - state-vector layout descriptors
//! - [`PointDofMap`] - the point↔DOF reverse map entry
//! - [`MbsError`] - fail-fast error enum for the whole workspace
//!
//! # Design Philosophy
//!
//! These types are **pure data**. They have no assembly logic, no constraint
//! math, no I/O. They're the common language between:
//!
//! - The assembly kernel (mbs-core)
//! - Dynamics and estimation solvers consuming the assembled state
//! - Rendering adapters reading world poses
//!
//! # Coordinate System
//!
//! Planar, right-handed: X right, Y up. The third gravity component exists
//! only so solvers can keep 3-vector conventions; all geometry is 2D.

#![doc(html_root_url = "https://docs.rs/mbs-types/0.1.0")]
#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(clippy::missing_const_for_fn)]

mod body;
mod dof;
mod error;
mod point;

pub use body::Body;
pub use dof::RelativeDof;
pub use error::MbsError;
pub use point::{NaturalDof, Point2, PointDof, PointDofMap};

// Re-export math types for convenience
pub use nalgebra::{Matrix2, Vector2, Vector3};

/// Result type for model assembly and update operations.
pub type Result<T> = std::result::Result<T, MbsError>;

/// Energy terms of an assembled model at its current state.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EnergyValues {
    /// Kinetic energy.
    pub kinetic: f64,
    /// Gravitational potential energy.
    pub potential: f64,
    /// Sum of the two.
    pub total: f64,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn test_energy_values_default() {
        let e = EnergyValues::default();
        assert_eq!(e.kinetic, 0.0);
        assert_eq!(e.potential, 0.0);
        assert_eq!(e.total, 0.0);
    }
}

#[cfg(all(test, feature = "serde"))]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod serde_tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_point_roundtrip() {
        let pt = Point2::new(Vector2::new(1.5, -2.0), true);
        let json = serde_json::to_string(&pt).unwrap();
        let back: Point2 = serde_json::from_str(&json).unwrap();
        assert_eq!(back, pt);
    }

    #[test]
    fn test_relative_dof_roundtrip() {
        let dof = RelativeDof::Angle {
            p0: 0,
            p1: 1,
            p2: 2,
        };
        let json = serde_json::to_string(&dof).unwrap();
        let back: RelativeDof = serde_json::from_str(&json).unwrap();
        assert_eq!(back, dof);
    }

    #[test]
    fn test_frozen_body_roundtrip() {
        let mut b = Body::new("rod");
        b.points = vec![0, 1];
        b.mass = 3.0;
        b.cog = Vector2::new(1.0, 0.0);
        b.inertia_cog = 1.0;
        b.freeze_frame(&[Vector2::zeros(), Vector2::new(2.0, 0.0)])
            .unwrap();

        let json = serde_json::to_string(&b).unwrap();
        let back: Body = serde_json::from_str(&json).unwrap();
        assert!(back.is_frozen());
        assert_relative_eq!(back.length(), 2.0, epsilon = 1e-12);
        assert_relative_eq!(back.m00()[(0, 0)], b.m00()[(0, 0)], epsilon = 1e-12);
    }
}
