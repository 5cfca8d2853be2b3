//! The assembled model: numeric state, constraint orchestration, energy.
//!
//! An [`AssembledModel`] owns every numeric buffer of one model instance:
//! the state vectors q/dq/ddq and generalized force, the constraint residual
//! Φ and its time derivative, and the sparse Jacobian family (Φ_q, dΦ_q/dt,
//! ∂(Φ_q·q̇)/∂q). Constraints are cloned from the registry at construction
//! and bound to the instance's sparse slots; the sparsity pattern is fixed
//! for the life of the model.
//!
//! The update protocol is explicit and caller-driven: mutate q/dq, call
//! [`AssembledModel::update_constraints`], then read Φ and the Jacobians.
//! There is no dirty tracking; a stale read after mutating state without an
//! intervening update is a caller error the kernel does not detect.
//!
//! Several instances may be built from one [`SymbolicAssembly`] (or from
//! repeated assemblies of the same definition) and exchange state through
//! [`AssembledModel::copy_state_from`], which verifies a structural
//! fingerprint of the DOF layout and writes in place, never reallocating
//! the state buffers.

use std::collections::hash_map::DefaultHasher;
use std::fmt::Write as _;
use std::hash::{Hash, Hasher};

use mbs_types::{
    EnergyValues, MbsError, NaturalDof, PointDof, PointDofMap, RelativeDof, Result, Vector2,
    Vector3,
};
use nalgebra::DVector;

use crate::constraints::{Constraint, RelativeAngle, RelativeAngleAbsolute};
use crate::model::SymbolicAssembly;
use crate::sparse::{SlotId, SparseMatrix};

/// Default gravity vector: (0, −9.81, 0).
pub const DEFAULT_GRAVITY: Vector3<f64> = Vector3::new(0.0, -9.81, 0.0);

/// Handle to one Jacobian column position across the whole matrix family.
///
/// Issued at structure-build time; constraints hold these instead of raw
/// references into the matrices, so state buffers can never be aliased or
/// relocated out from under them.
#[derive(Debug, Clone, Copy)]
pub struct JacSlot {
    /// The q column this slot writes.
    pub col: usize,
    phi_q: SlotId,
    dot_phi_q: SlotId,
    d_phiq_dq_dq: SlotId,
}

/// A fully assembled, numerically evaluable model instance.
#[derive(Debug, Clone)]
pub struct AssembledModel {
    symbolic: SymbolicAssembly,

    /// Generalized coordinates. Natural DOFs first, relative DOFs after.
    pub q: DVector<f64>,
    /// Generalized velocities, same layout as `q`.
    pub dq: DVector<f64>,
    /// Generalized accelerations, same layout as `q`.
    pub ddq: DVector<f64>,
    /// Generalized forces, same layout as `q`.
    pub gen_force: DVector<f64>,

    pub(crate) phi: DVector<f64>,
    pub(crate) dot_phi: DVector<f64>,
    pub(crate) phi_q: SparseMatrix,
    pub(crate) dot_phi_q: SparseMatrix,
    pub(crate) d_phiq_dq_dq: SparseMatrix,

    point_dofs: Vec<PointDofMap>,
    rel_dof_cols: Vec<usize>,
    constraints: Vec<Constraint>,
    gravity: Vector3<f64>,
    signature: u64,
}

impl AssembledModel {
    /// Build an assembled model from a symbolic descriptor.
    ///
    /// Sizes the state to the total DOF count, seeds q with each free
    /// point's initial coordinate, builds the point↔DOF reverse map, clones
    /// the registry constraints, appends one constraint per relative DOF,
    /// and fixes the Jacobian sparsity pattern.
    ///
    /// # Errors
    ///
    /// [`MbsError::ZeroNaturalDofs`] for a model with no free point axes;
    /// constraint structure-building errors otherwise.
    pub fn new(symbolic: &SymbolicAssembly) -> Result<Self> {
        let n_natural = symbolic.natural_dofs().len();
        if n_natural == 0 {
            return Err(MbsError::ZeroNaturalDofs);
        }
        let n = n_natural + symbolic.relative_dofs().len();

        let mut q = DVector::zeros(n);
        let mut point_dofs = vec![PointDofMap::default(); symbolic.model().point_count()];
        for (i, dof) in symbolic.natural_dofs().iter().enumerate() {
            let pt = symbolic.model().point(dof.point_index)?;
            match dof.axis {
                PointDof::X => {
                    q[i] = pt.coords.x;
                    point_dofs[dof.point_index].dof_x = Some(i);
                }
                PointDof::Y => {
                    q[i] = pt.coords.y;
                    point_dofs[dof.point_index].dof_y = Some(i);
                }
            }
        }

        // Registry constraints first, then one constraint per relative DOF,
        // in relative-DOF order. Exhaustive dispatch: the closed enum makes
        // an unknown variant unrepresentable.
        let mut constraints = symbolic.model().constraints().to_vec();
        let mut rel_dof_cols = Vec::with_capacity(symbolic.relative_dofs().len());
        for (i, rdof) in symbolic.relative_dofs().iter().enumerate() {
            let col = n_natural + i;
            constraints.push(match *rdof {
                RelativeDof::Angle { p0, p1, p2 } => {
                    Constraint::RelativeAngle(RelativeAngle::new(p0, p1, p2, col))
                }
                RelativeDof::AngleAbsolute { p0, p1 } => {
                    Constraint::RelativeAngleAbsolute(RelativeAngleAbsolute::new(p0, p1, col))
                }
            });
            rel_dof_cols.push(col);
        }

        let mut phi_q = SparseMatrix::new();
        let mut dot_phi_q = SparseMatrix::new();
        let mut d_phiq_dq_dq = SparseMatrix::new();
        phi_q.set_col_count(n);
        dot_phi_q.set_col_count(n);
        d_phiq_dq_dq.set_col_count(n);

        let mut model = Self {
            symbolic: symbolic.clone(),
            q,
            dq: DVector::zeros(n),
            ddq: DVector::zeros(n),
            gen_force: DVector::zeros(n),
            phi: DVector::zeros(0),
            dot_phi: DVector::zeros(0),
            phi_q,
            dot_phi_q,
            d_phiq_dq_dq,
            point_dofs,
            rel_dof_cols,
            constraints,
            gravity: DEFAULT_GRAVITY,
            signature: structural_signature(symbolic.natural_dofs(), symbolic.relative_dofs()),
        };

        model.build_structures()?;
        Ok(model)
    }

    /// Run every constraint's numeric update, in registration order.
    ///
    /// Pure function of the current q/dq; must be called after any state
    /// mutation and before reading Φ or its Jacobians.
    ///
    /// # Errors
    ///
    /// Degenerate-geometry errors from angle constraints.
    pub fn update_constraints(&mut self) -> Result<()> {
        let constraints = std::mem::take(&mut self.constraints);
        let mut result = Ok(());
        for c in &constraints {
            if let Err(e) = c.update(self) {
                result = Err(e);
                break;
            }
        }
        self.constraints = constraints;
        result
    }

    /// Grow Φ and every Jacobian-family matrix by exactly one row.
    ///
    /// Existing rows and entries are unaffected. Returns the new row index.
    pub fn add_constraint_row(&mut self) -> usize {
        let idx = self.phi.len();
        self.phi = self.phi.clone().resize_vertically(idx + 1, 0.0);
        self.dot_phi = self.dot_phi.clone().resize_vertically(idx + 1, 0.0);
        let r = self.phi_q.add_row();
        debug_assert_eq!(r, idx);
        self.dot_phi_q.add_row();
        self.d_phiq_dq_dq.add_row();
        idx
    }

    /// Current coordinates of a point: the registry value if grounded, else
    /// read from q via the reverse map. O(1), no allocation.
    ///
    /// # Errors
    ///
    /// [`MbsError::InvalidPointIndex`].
    pub fn point_coords(&self, index: usize) -> Result<Vector2<f64>> {
        let pt = self.symbolic.model().point(index)?;
        let map = &self.point_dofs[index];
        Ok(Vector2::new(
            map.dof_x.map_or(pt.coords.x, |c| self.q[c]),
            map.dof_y.map_or(pt.coords.y, |c| self.q[c]),
        ))
    }

    /// Current velocity of a point; zero on fixed axes.
    ///
    /// # Errors
    ///
    /// [`MbsError::InvalidPointIndex`].
    pub fn point_velocity(&self, index: usize) -> Result<Vector2<f64>> {
        let map = self
            .point_dofs
            .get(index)
            .ok_or(MbsError::InvalidPointIndex(index))?;
        Ok(Vector2::new(
            map.dof_x.map_or(0.0, |c| self.dq[c]),
            map.dof_y.map_or(0.0, |c| self.dq[c]),
        ))
    }

    /// World coordinates of a point rigidly attached to a body, given its
    /// local coordinates in the frame spanned by the body's first two
    /// member points.
    ///
    /// # Errors
    ///
    /// [`MbsError::InvalidBodyIndex`]; [`MbsError::NonPositiveLength`] when
    /// the body's reference length was never frozen to a positive value.
    pub fn body_point_coords(&self, body_index: usize, local: Vector2<f64>) -> Result<Vector2<f64>> {
        let body = self.symbolic.model().body(body_index)?;
        let length = body.length();
        if length <= 0.0 {
            return Err(MbsError::NonPositiveLength {
                name: body.name.clone(),
                length,
            });
        }
        let q0 = self.point_coords(body.points[0])?;
        let q1 = self.point_coords(body.points[1])?;
        let u = (q1 - q0) / length;
        let v = Vector2::new(-u.y, u.x);
        Ok(q0 + u * local.x + v * local.y)
    }

    /// Evaluate the current mechanical energy of the system.
    ///
    /// Kinetic energy accumulates per body through its 2×2 generalized-mass
    /// blocks; potential energy is each body's COG height against the
    /// gravity vector, negated. O(bodies).
    ///
    /// # Errors
    ///
    /// Index errors for bodies referencing unregistered points.
    pub fn evaluate_energy(&self) -> Result<EnergyValues> {
        let mut e = EnergyValues::default();
        for (bi, body) in self.symbolic.model().bodies().iter().enumerate() {
            let dq0 = self.point_velocity(body.points[0])?;
            let dq1 = self.point_velocity(body.points[1])?;

            e.kinetic += 0.5 * (dq0.dot(&(body.m00() * dq0)) + dq1.dot(&(body.m11() * dq1)))
                + dq0.dot(&(body.m01() * dq1));

            let cog = self.body_point_coords(bi, body.cog)?;
            e.potential -= body.mass * (self.gravity.x * cog.x + self.gravity.y * cog.y);
        }
        e.total = e.kinetic + e.potential;
        Ok(e)
    }

    /// Replicate another instance's q and dq into this one.
    ///
    /// Only valid between instances with the same DOF layout (same symbolic
    /// lineage); verified by structural fingerprint. Copies in place —
    /// ddq and the generalized force are deliberately left alone, and the
    /// state buffers are never reallocated.
    ///
    /// # Errors
    ///
    /// [`MbsError::StructureMismatch`].
    pub fn copy_state_from(&mut self, other: &Self) -> Result<()> {
        if self.signature != other.signature {
            return Err(MbsError::StructureMismatch {
                expected: self.signature,
                actual: other.signature,
            });
        }
        self.q.copy_from(&other.q);
        self.dq.copy_from(&other.dq);
        Ok(())
    }

    /// Enumerate every DOF with its description, in assembly order.
    ///
    /// Debug/diagnostic output only; nothing dispatches on it.
    #[must_use]
    pub fn dump_coordinates(&self) -> String {
        let natural = self.symbolic.natural_dofs();
        let relative = self.symbolic.relative_dofs();
        let mut out = String::new();
        let _ = writeln!(
            out,
            "[AssembledModel] |q|={}, {} natural, {} relative coordinates.",
            self.q.len(),
            natural.len(),
            relative.len()
        );
        let _ = writeln!(out, "Natural coordinates:");
        for (i, dof) in natural.iter().enumerate() {
            let _ = writeln!(out, " q[{i}]: {}{}", dof.axis.letter(), dof.point_index);
        }
        if !relative.is_empty() {
            let _ = writeln!(out, "Relative coordinates:");
            for (i, dof) in relative.iter().enumerate() {
                let _ = writeln!(out, " q[{}]: {}", i + natural.len(), dof.describe());
            }
        }
        out
    }

    // ------------------------------------------------------------------
    // Read accessors for solvers and factor adapters
    // ------------------------------------------------------------------

    /// Constraint residual vector Φ.
    #[must_use]
    pub fn phi(&self) -> &DVector<f64> {
        &self.phi
    }

    /// Time derivative of the residual vector.
    #[must_use]
    pub fn dot_phi(&self) -> &DVector<f64> {
        &self.dot_phi
    }

    /// Sparse Jacobian Φ_q.
    #[must_use]
    pub fn phi_q(&self) -> &SparseMatrix {
        &self.phi_q
    }

    /// Sparse time derivative d(Φ_q)/dt.
    #[must_use]
    pub fn dot_phi_q(&self) -> &SparseMatrix {
        &self.dot_phi_q
    }

    /// Sparse ∂(Φ_q·q̇)/∂q.
    #[must_use]
    pub fn d_phiq_dq_dq(&self) -> &SparseMatrix {
        &self.d_phiq_dq_dq
    }

    /// Total DOF count (natural + relative).
    #[must_use]
    pub fn dof_count(&self) -> usize {
        self.q.len()
    }

    /// Natural DOF count.
    #[must_use]
    pub fn natural_dof_count(&self) -> usize {
        self.symbolic.natural_dofs().len()
    }

    /// Relative DOF count.
    #[must_use]
    pub fn relative_dof_count(&self) -> usize {
        self.rel_dof_cols.len()
    }

    /// The q column of relative DOF `i`, if registered.
    #[must_use]
    pub fn relative_dof_column(&self, i: usize) -> Option<usize> {
        self.rel_dof_cols.get(i).copied()
    }

    /// The reverse-map entry of a point.
    ///
    /// # Errors
    ///
    /// [`MbsError::InvalidPointIndex`].
    pub fn point_dof_map(&self, index: usize) -> Result<&PointDofMap> {
        self.point_dofs
            .get(index)
            .ok_or(MbsError::InvalidPointIndex(index))
    }

    /// The symbolic descriptor this instance was built from.
    #[must_use]
    pub fn symbolic(&self) -> &SymbolicAssembly {
        &self.symbolic
    }

    /// Gravity vector acting on this instance.
    #[must_use]
    pub const fn gravity(&self) -> Vector3<f64> {
        self.gravity
    }

    /// Set the gravity vector. Per-instance state, never global.
    pub fn set_gravity(&mut self, gravity: Vector3<f64>) {
        self.gravity = gravity;
    }

    /// Structural fingerprint of the DOF layout.
    #[must_use]
    pub const fn signature(&self) -> u64 {
        self.signature
    }

    /// Number of constraint objects attached to this instance.
    #[must_use]
    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    // ------------------------------------------------------------------
    // Structure-building hooks used by the constraint objects
    // ------------------------------------------------------------------

    /// Register a Jacobian-family slot for a point axis; `None` if the axis
    /// is fixed (no column exists, the contribution vanishes).
    pub(crate) fn jacobian_slot(
        &mut self,
        row: usize,
        point: usize,
        axis: PointDof,
    ) -> Result<Option<JacSlot>> {
        let map = *self
            .point_dofs
            .get(point)
            .ok_or(MbsError::InvalidPointIndex(point))?;
        Ok(map
            .column(axis)
            .map(|col| self.jacobian_slot_for_column(row, col)))
    }

    /// Register a Jacobian-family slot for an explicit column (relative DOFs).
    pub(crate) fn jacobian_slot_for_column(&mut self, row: usize, col: usize) -> JacSlot {
        JacSlot {
            col,
            phi_q: self.phi_q.register(row, col),
            dot_phi_q: self.dot_phi_q.register(row, col),
            d_phiq_dq_dq: self.d_phiq_dq_dq.register(row, col),
        }
    }

    /// Write one slot across the family: `value` into Φ_q, `dvalue` into
    /// both d(Φ_q)/dt and ∂(Φ_q·q̇)/∂q (they coincide for scleronomic
    /// constraints).
    pub(crate) fn write_jacobian(&mut self, slot: JacSlot, value: f64, dvalue: f64) {
        self.phi_q.set(slot.phi_q, value);
        self.dot_phi_q.set(slot.dot_phi_q, dvalue);
        self.d_phiq_dq_dq.set(slot.d_phiq_dq_dq, dvalue);
    }

    #[inline]
    pub(crate) fn set_phi(&mut self, row: usize, value: f64) {
        self.phi[row] = value;
    }

    #[inline]
    pub(crate) fn set_dot_phi(&mut self, row: usize, value: f64) {
        self.dot_phi[row] = value;
    }

    /// Build sparse structures for every attached constraint, in order.
    ///
    /// The constraint vector is taken out while iterating so each
    /// constraint can mutate the model's matrices without aliasing, then
    /// restored.
    fn build_structures(&mut self) -> Result<()> {
        let mut constraints = std::mem::take(&mut self.constraints);
        let mut result = Ok(());
        for c in &mut constraints {
            if let Err(e) = c.build_sparse_structures(self) {
                result = Err(e);
                break;
            }
        }
        self.constraints = constraints;
        result
    }
}

/// Fingerprint of the DOF layout: length and content of both DOF lists.
///
/// Compared only between models in the same process; the hasher's
/// cross-version stability is irrelevant here.
fn structural_signature(natural: &[NaturalDof], relative: &[RelativeDof]) -> u64 {
    let mut h = DefaultHasher::new();
    natural.len().hash(&mut h);
    for dof in natural {
        dof.hash(&mut h);
    }
    relative.len().hash(&mut h);
    for dof in relative {
        dof.hash(&mut h);
    }
    h.finish()
}
