//! Solver-facing dense assemblies: generalized mass and gravity forces.
//!
//! Dynamics and estimation solvers live outside this kernel, but both the
//! generalized mass matrix and the gravity load are pure functions of
//! kernel-owned data (body mass blocks, the reverse map, the gravity
//! vector), so they are assembled here and read by solvers alongside Φ and
//! its Jacobians.

use mbs_types::{Result, Vector2};
use nalgebra::{DMatrix, DVector};

use crate::assembled::AssembledModel;

impl AssembledModel {
    /// Assemble the dense n×n generalized mass matrix from the per-body
    /// 2×2 blocks.
    ///
    /// Each body contributes its M00/M01/M11 blocks at the q columns of its
    /// first two member points; fixed axes have no column and their
    /// contribution drops out. The result is symmetric.
    ///
    /// # Errors
    ///
    /// Index errors for bodies referencing unregistered points.
    pub fn generalized_mass_matrix(&self) -> Result<DMatrix<f64>> {
        let n = self.dof_count();
        let mut mass = DMatrix::zeros(n, n);

        for body in self.symbolic().model().bodies() {
            let d0 = *self.point_dof_map(body.points[0])?;
            let d1 = *self.point_dof_map(body.points[1])?;
            let cols0 = [d0.dof_x, d0.dof_y];
            let cols1 = [d1.dof_x, d1.dof_y];

            for (i, &ci) in cols0.iter().enumerate() {
                for (j, &cj) in cols0.iter().enumerate() {
                    if let (Some(ci), Some(cj)) = (ci, cj) {
                        mass[(ci, cj)] += body.m00()[(i, j)];
                    }
                }
                for (j, &cj) in cols1.iter().enumerate() {
                    if let (Some(ci), Some(cj)) = (ci, cj) {
                        mass[(ci, cj)] += body.m01()[(i, j)];
                        mass[(cj, ci)] += body.m01()[(i, j)];
                    }
                }
            }
            for (i, &ci) in cols1.iter().enumerate() {
                for (j, &cj) in cols1.iter().enumerate() {
                    if let (Some(ci), Some(cj)) = (ci, cj) {
                        mass[(ci, cj)] += body.m11()[(i, j)];
                    }
                }
            }
        }
        Ok(mass)
    }

    /// Generalized gravity force: −∂V/∂q for V the total gravitational
    /// potential, projected onto the natural coordinates.
    ///
    /// Each body's COG position is linear in its two defining points,
    /// r_cog = C0·q0 + C1·q1 with C0 = (1−u)I − wS and C1 = uI + wS
    /// (u = xg/L, w = yg/L, S the +90° rotation), so the load per point is
    /// m·C0ᵀg and m·C1ᵀg.
    ///
    /// # Errors
    ///
    /// Index errors for bodies referencing unregistered points.
    pub fn gravity_generalized_forces(&self) -> Result<DVector<f64>> {
        let n = self.dof_count();
        let mut force = DVector::zeros(n);
        let g = Vector2::new(self.gravity().x, self.gravity().y);
        let sg = Vector2::new(-g.y, g.x);

        for body in self.symbolic().model().bodies() {
            let u = body.cog.x / body.length();
            let w = body.cog.y / body.length();
            let f0 = body.mass * ((1.0 - u) * g + w * sg);
            let f1 = body.mass * (u * g - w * sg);

            let d0 = *self.point_dof_map(body.points[0])?;
            let d1 = *self.point_dof_map(body.points[1])?;
            if let Some(c) = d0.dof_x {
                force[c] += f0.x;
            }
            if let Some(c) = d0.dof_y {
                force[c] += f0.y;
            }
            if let Some(c) = d1.dof_x {
                force[c] += f1.x;
            }
            if let Some(c) = d1.dof_y {
                force[c] += f1.y;
            }
        }
        Ok(force)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::mechanisms::four_bar_linkage;
    use crate::AssembledModel;
    use approx::assert_relative_eq;

    #[test]
    fn test_mass_matrix_is_symmetric() {
        let mut def = four_bar_linkage();
        let sym = def.assemble(Vec::new()).unwrap();
        let model = AssembledModel::new(&sym).unwrap();
        let mass = model.generalized_mass_matrix().unwrap();
        assert_eq!(mass.nrows(), model.dof_count());
        for i in 0..mass.nrows() {
            for j in 0..mass.ncols() {
                assert_relative_eq!(mass[(i, j)], mass[(j, i)], epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_kinetic_energy_matches_mass_matrix() {
        // 0.5 q̇ᵀ M q̇ must agree with the per-body block accumulation
        // used by evaluate_energy.
        let mut def = four_bar_linkage();
        let sym = def.assemble(Vec::new()).unwrap();
        let mut model = AssembledModel::new(&sym).unwrap();
        for i in 0..model.dof_count() {
            #[allow(clippy::cast_precision_loss)]
            let v = 0.3 + 0.1 * i as f64;
            model.dq[i] = v;
        }
        let mass = model.generalized_mass_matrix().unwrap();
        let ke = 0.5 * model.dq.dot(&(&mass * &model.dq));
        let e = model.evaluate_energy().unwrap();
        assert_relative_eq!(ke, e.kinetic, epsilon = 1e-9);
    }

    #[test]
    fn test_gravity_force_is_negative_potential_gradient() {
        let mut def = four_bar_linkage();
        let sym = def.assemble(Vec::new()).unwrap();
        let mut model = AssembledModel::new(&sym).unwrap();
        let force = model.gravity_generalized_forces().unwrap();

        let h = 1e-7;
        for j in 0..model.dof_count() {
            let q0 = model.q[j];
            model.q[j] = q0 + h;
            let vp = model.evaluate_energy().unwrap().potential;
            model.q[j] = q0 - h;
            let vm = model.evaluate_energy().unwrap().potential;
            model.q[j] = q0;
            let fd = -(vp - vm) / (2.0 * h);
            assert_relative_eq!(force[j], fd, epsilon = 1e-5);
        }
    }
}
