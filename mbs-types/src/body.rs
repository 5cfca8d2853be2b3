//! Planar rigid bodies in natural coordinates.
//!
//! A body is defined by an ordered list of member points; its pose is fully
//! determined by the global positions of the first two. The local frame has
//! its origin at point 0, X axis along point 0 → point 1, and is frozen from
//! the initial configuration at model-build time — local geometry never
//! changes afterwards (rigid-body assumption).
//!
//! The generalized mass of a two-point planar element is a 4×4 matrix made of
//! three 2×2 blocks:
//!
//! ```text
//! M = [ M00  M01 ]
//!     [ M01ᵀ M11 ]
//! ```
//!
//! acting on the stacked velocities of the two defining points. The blocks
//! are computed once when the frame is frozen.

use nalgebra::{Matrix2, Vector2};

use crate::error::MbsError;
use crate::Result;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A planar rigid body.
///
/// The public fields are filled in during model definition; the private ones
/// (local geometry and mass blocks) are frozen by [`Body::freeze_frame`],
/// which the assembly step invokes exactly once per registry.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Body {
    /// Body name; auto-generated (`body{N}`) when left empty at registration.
    pub name: String,
    /// Member point indices, ≥2. The first two define the local frame.
    pub points: Vec<usize>,
    /// Total mass.
    pub mass: f64,
    /// Rotational inertia about the center of gravity.
    ///
    /// The natural-coordinate mass blocks need the polar inertia about the
    /// local origin (point 0); it is obtained from this via the
    /// parallel-axis theorem when the frame is frozen.
    pub inertia_cog: f64,
    /// Center of gravity in the local frame.
    pub cog: Vector2<f64>,

    length: f64,
    local_points: Vec<Vector2<f64>>,
    m00: Matrix2<f64>,
    m01: Matrix2<f64>,
    m11: Matrix2<f64>,
    frozen: bool,
}

impl Body {
    /// Create an empty body with the given name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            points: Vec::new(),
            mass: 0.0,
            inertia_cog: 0.0,
            cog: Vector2::zeros(),
            length: 0.0,
            local_points: Vec::new(),
            m00: Matrix2::zeros(),
            m01: Matrix2::zeros(),
            m11: Matrix2::zeros(),
            frozen: false,
        }
    }

    /// Reference length: the initial distance between the first two points.
    ///
    /// Zero until the frame is frozen.
    #[must_use]
    pub const fn length(&self) -> f64 {
        self.length
    }

    /// Local coordinates of every member point, frozen at assembly.
    #[must_use]
    pub fn local_points(&self) -> &[Vector2<f64>] {
        &self.local_points
    }

    /// Whether [`Body::freeze_frame`] has run.
    #[must_use]
    pub const fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Upper-left generalized-mass block (acts on point-0 velocity).
    #[must_use]
    pub const fn m00(&self) -> &Matrix2<f64> {
        &self.m00
    }

    /// Off-diagonal generalized-mass block (couples the two point velocities).
    #[must_use]
    pub const fn m01(&self) -> &Matrix2<f64> {
        &self.m01
    }

    /// Lower-right generalized-mass block (acts on point-1 velocity).
    #[must_use]
    pub const fn m11(&self) -> &Matrix2<f64> {
        &self.m11
    }

    /// Freeze the local frame from the initial global coordinates of the
    /// member points, then build the generalized-mass blocks.
    ///
    /// `member_coords` holds the initial global coordinates of each member
    /// point, in `self.points` order. Idempotent guard: once frozen, later
    /// calls are rejected with [`MbsError::ModelFrozen`].
    ///
    /// # Errors
    ///
    /// [`MbsError::BodyTooFewPoints`] for fewer than two members,
    /// [`MbsError::NonPositiveLength`] when the first two points coincide,
    /// [`MbsError::InvalidMassProperties`] for negative or non-finite mass
    /// or inertia.
    pub fn freeze_frame(&mut self, member_coords: &[Vector2<f64>]) -> Result<()> {
        if self.frozen {
            return Err(MbsError::ModelFrozen);
        }
        if self.points.len() < 2 || member_coords.len() != self.points.len() {
            return Err(MbsError::BodyTooFewPoints {
                name: self.name.clone(),
                count: self.points.len().min(member_coords.len()),
            });
        }
        if !(self.mass >= 0.0 && self.mass.is_finite()) {
            return Err(MbsError::invalid_mass(&self.name, "mass must be finite and >= 0"));
        }
        if !(self.inertia_cog >= 0.0 && self.inertia_cog.is_finite()) {
            return Err(MbsError::invalid_mass(
                &self.name,
                "rotational inertia must be finite and >= 0",
            ));
        }

        let p0 = member_coords[0];
        let v01 = member_coords[1] - p0;
        let length = v01.norm();
        if length <= 0.0 {
            return Err(MbsError::NonPositiveLength {
                name: self.name.clone(),
                length,
            });
        }

        // Local frame: X along p0->p1, Y orthogonal (+90 deg).
        let u = v01 / length;
        self.local_points = member_coords
            .iter()
            .map(|p| {
                let d = p - p0;
                Vector2::new(d.dot(&u), u.x * d.y - u.y * d.x)
            })
            .collect();

        self.length = length;
        self.build_mass_blocks();
        self.frozen = true;
        Ok(())
    }

    /// Natural-coordinate mass blocks of a two-point element.
    ///
    /// With m the mass, L the reference length, (xg, yg) the local COG and
    /// I0 the polar inertia about the local origin:
    ///
    /// ```text
    /// M00 = (m - 2 m xg/L + I0/L²) I₂
    /// M11 = (I0/L²) I₂
    /// M01 = α I₂ + β S,   α = m xg/L - I0/L²,  β = m yg/L
    /// ```
    ///
    /// where S is the +90° rotation. Derived by integrating the density over
    /// the linear velocity field r = q0 + (x/L)(q1−q0) + (y/L) S (q1−q0).
    fn build_mass_blocks(&mut self) {
        let m = self.mass;
        let l = self.length;
        let i0 = self.inertia_cog + m * self.cog.norm_squared();
        let u = self.cog.x / l;
        let i0_l2 = i0 / (l * l);

        let m00 = m - 2.0 * m * u + i0_l2;
        let m11 = i0_l2;
        let alpha = m * u - i0_l2;
        let beta = m * self.cog.y / l;

        self.m00 = Matrix2::from_diagonal_element(m00);
        self.m11 = Matrix2::from_diagonal_element(m11);
        self.m01 = Matrix2::new(alpha, -beta, beta, alpha);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn rod() -> Body {
        // Uniform slender rod between (0,0) and (2,0): m=3, L=2,
        // COG at the middle, I_cog = m L² / 12.
        let mut b = Body::new("rod");
        b.points = vec![0, 1];
        b.mass = 3.0;
        b.cog = Vector2::new(1.0, 0.0);
        b.inertia_cog = 3.0 * 4.0 / 12.0;
        b.freeze_frame(&[Vector2::zeros(), Vector2::new(2.0, 0.0)])
            .unwrap();
        b
    }

    #[test]
    fn test_local_frame_from_initial_coords() {
        let mut b = Body::new("tri");
        b.points = vec![0, 1, 2];
        b.mass = 1.0;
        b.cog = Vector2::zeros();
        let coords = [
            Vector2::new(1.0, 1.0),
            Vector2::new(1.0, 3.0), // straight up: local X points along +Y global
            Vector2::new(0.0, 1.0),
        ];
        b.freeze_frame(&coords).unwrap();

        assert_relative_eq!(b.length(), 2.0, epsilon = 1e-12);
        let local = b.local_points();
        assert_relative_eq!(local[0].x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(local[1].x, 2.0, epsilon = 1e-12);
        assert_relative_eq!(local[1].y, 0.0, epsilon = 1e-12);
        // Global (0,1) is one unit along local +Y.
        assert_relative_eq!(local[2].x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(local[2].y, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_freeze_is_idempotent_guarded() {
        let mut b = rod();
        let err = b
            .freeze_frame(&[Vector2::zeros(), Vector2::new(2.0, 0.0)])
            .unwrap_err();
        assert_eq!(err, MbsError::ModelFrozen);
    }

    #[test]
    fn test_coincident_points_rejected() {
        let mut b = Body::new("bad");
        b.points = vec![0, 1];
        b.mass = 1.0;
        let err = b
            .freeze_frame(&[Vector2::new(1.0, 1.0), Vector2::new(1.0, 1.0)])
            .unwrap_err();
        assert!(matches!(err, MbsError::NonPositiveLength { .. }));
    }

    #[test]
    fn test_translation_kinetic_energy_recovers_mass() {
        // Pure translation: 0.5 vᵀ(M00 + 2 M01 + M11) v must equal 0.5 m v².
        let b = rod();
        let v = Vector2::new(0.7, -1.3);
        let ke = 0.5 * (v.dot(&(b.m00() * v)) + v.dot(&(b.m11() * v))) + v.dot(&(b.m01() * v));
        assert_relative_eq!(ke, 0.5 * 3.0 * v.norm_squared(), epsilon = 1e-12);
    }

    #[test]
    fn test_rotation_kinetic_energy_recovers_polar_inertia() {
        // Rotation about point 0 at rate w: dq0 = 0, |dq1| = w L, so
        // KE = 0.5 dq1ᵀ M11 dq1 = 0.5 I0 w².
        let b = rod();
        let w = 2.5;
        let dq1 = Vector2::new(0.0, w * b.length());
        let ke = 0.5 * dq1.dot(&(b.m11() * dq1));
        let i0 = b.inertia_cog + b.mass * b.cog.norm_squared();
        assert_relative_eq!(ke, 0.5 * i0 * w * w, epsilon = 1e-12);
    }

    #[test]
    fn test_negative_mass_rejected() {
        let mut b = Body::new("bad");
        b.points = vec![0, 1];
        b.mass = -1.0;
        let err = b
            .freeze_frame(&[Vector2::zeros(), Vector2::new(1.0, 0.0)])
            .unwrap_err();
        assert!(matches!(err, MbsError::InvalidMassProperties { .. }));
    }
}
