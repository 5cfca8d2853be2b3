//! Constraint equations and their analytic Jacobians.
//!
//! Each constraint owns one scalar residual row (two for
//! [`RelativePosition`]) plus the set of Jacobian positions its geometry
//! touches. The set of variants is closed: dispatch is an exhaustive `match`
//! on [`Constraint`], so an unknown kind is unrepresentable.
//!
//! Lifecycle per variant:
//!
//! 1. `build_sparse_structures` — runs once on the assembled model: appends
//!    the residual row(s) and registers every (row, column) Jacobian slot
//!    the constraint may ever write. Axes of fixed points register nothing;
//!    their contribution has no column to land in.
//! 2. `update` — recomputes the residual, its time derivative, and all
//!    registered Jacobian entries from the current q/dq. Pure function of
//!    state; no dirty tracking.
//!
//! All variants are scleronomic (no explicit time dependence), so the row of
//! ∂(Φ_q·q̇)/∂q equals the row of d(Φ_q)/dt by symmetry of the Hessian; the
//! update writes the same values into both matrices.

use mbs_types::{MbsError, PointDof, Result, Vector2};

use crate::assembled::{AssembledModel, JacSlot};

/// A constraint equation of the assembled model.
#[derive(Debug, Clone)]
pub enum Constraint {
    /// Constant squared distance between two points.
    ConstantDistance(ConstantDistance),
    /// Signed angle at a shared vertex between two segments, minus a q column.
    RelativeAngle(RelativeAngle),
    /// Angle of a segment against the global +X axis, minus a q column.
    RelativeAngleAbsolute(RelativeAngleAbsolute),
    /// A point held at fixed local coordinates in a two-point frame.
    RelativePosition(RelativePosition),
}

impl Constraint {
    /// Append this constraint's row(s) and register its Jacobian slots.
    ///
    /// Called exactly once per assembled model; positions are never mutated
    /// afterwards.
    ///
    /// # Errors
    ///
    /// Propagates invalid point indices, out-of-range relative-DOF columns,
    /// and degenerate geometry.
    pub fn build_sparse_structures(&mut self, model: &mut AssembledModel) -> Result<()> {
        match self {
            Self::ConstantDistance(c) => c.build(model),
            Self::RelativeAngle(c) => c.build(model),
            Self::RelativeAngleAbsolute(c) => c.build(model),
            Self::RelativePosition(c) => c.build(model),
        }
    }

    /// Recompute the residual and all registered Jacobian entries.
    ///
    /// # Errors
    ///
    /// [`MbsError::StructuresNotBuilt`] if called before
    /// [`Constraint::build_sparse_structures`]; degenerate-geometry errors
    /// from the angle variants when segment endpoints coincide.
    pub fn update(&self, model: &mut AssembledModel) -> Result<()> {
        match self {
            Self::ConstantDistance(c) => c.update(model),
            Self::RelativeAngle(c) => c.update(model),
            Self::RelativeAngleAbsolute(c) => c.update(model),
            Self::RelativePosition(c) => c.update(model),
        }
    }
}

/// Slots of one point's two axes; `None` where the axis is fixed.
#[derive(Debug, Clone, Copy, Default)]
struct PointSlots {
    x: Option<JacSlot>,
    y: Option<JacSlot>,
}

impl PointSlots {
    fn register(model: &mut AssembledModel, row: usize, point: usize) -> Result<Self> {
        Ok(Self {
            x: model.jacobian_slot(row, point, PointDof::X)?,
            y: model.jacobian_slot(row, point, PointDof::Y)?,
        })
    }

    /// Write one point's gradient pair (value and its time derivative).
    fn write(&self, model: &mut AssembledModel, g: Vector2<f64>, dg: Vector2<f64>) {
        if let Some(s) = self.x {
            model.write_jacobian(s, g.x, dg.x);
        }
        if let Some(s) = self.y {
            model.write_jacobian(s, g.y, dg.y);
        }
    }
}

// ============================================================================
// Constant distance
// ============================================================================

/// Φ = |p1 − p0|² − L².
///
/// The squared form keeps the Jacobian free of normalization terms:
/// the row is ±2(p1 − p0) in the x/y columns of the two endpoints.
#[derive(Debug, Clone)]
pub struct ConstantDistance {
    /// First endpoint.
    pub p0: usize,
    /// Second endpoint.
    pub p1: usize,
    /// Target distance.
    pub length: f64,

    row: Option<usize>,
    s0: PointSlots,
    s1: PointSlots,
}

impl ConstantDistance {
    /// Create a constant-distance constraint with the given target length.
    #[must_use]
    pub fn new(p0: usize, p1: usize, length: f64) -> Self {
        Self {
            p0,
            p1,
            length,
            row: None,
            s0: PointSlots::default(),
            s1: PointSlots::default(),
        }
    }

    fn build(&mut self, model: &mut AssembledModel) -> Result<()> {
        let row = model.add_constraint_row();
        self.s0 = PointSlots::register(model, row, self.p0)?;
        self.s1 = PointSlots::register(model, row, self.p1)?;
        self.row = Some(row);
        Ok(())
    }

    fn update(&self, model: &mut AssembledModel) -> Result<()> {
        let row = self.row.ok_or(MbsError::StructuresNotBuilt)?;
        let d = model.point_coords(self.p1)? - model.point_coords(self.p0)?;
        let dv = model.point_velocity(self.p1)? - model.point_velocity(self.p0)?;

        model.set_phi(row, d.norm_squared() - self.length * self.length);
        model.set_dot_phi(row, 2.0 * d.dot(&dv));

        self.s0.write(model, -2.0 * d, -2.0 * dv);
        self.s1.write(model, 2.0 * d, 2.0 * dv);
        Ok(())
    }
}

// ============================================================================
// Relative angle (three points)
// ============================================================================

/// Φ = atan2(a×b, a·b) − q[col], with a = p0 − p1 and b = p2 − p1.
///
/// The signed angle at the shared vertex p1, paired with the relative-DOF
/// column it drives.
#[derive(Debug, Clone)]
pub struct RelativeAngle {
    /// First segment endpoint.
    pub p0: usize,
    /// Shared vertex.
    pub p1: usize,
    /// Second segment endpoint.
    pub p2: usize,
    /// State-vector column of the relative coordinate.
    pub col: usize,

    row: Option<usize>,
    s0: PointSlots,
    s1: PointSlots,
    s2: PointSlots,
    s_col: Option<JacSlot>,
}

impl RelativeAngle {
    /// Create a relative-angle constraint bound to column `col`.
    #[must_use]
    pub fn new(p0: usize, p1: usize, p2: usize, col: usize) -> Self {
        Self {
            p0,
            p1,
            p2,
            col,
            row: None,
            s0: PointSlots::default(),
            s1: PointSlots::default(),
            s2: PointSlots::default(),
            s_col: None,
        }
    }

    fn build(&mut self, model: &mut AssembledModel) -> Result<()> {
        if self.col >= model.dof_count() {
            return Err(MbsError::InvalidDofColumn(self.col));
        }
        let row = model.add_constraint_row();
        self.s0 = PointSlots::register(model, row, self.p0)?;
        self.s1 = PointSlots::register(model, row, self.p1)?;
        self.s2 = PointSlots::register(model, row, self.p2)?;
        self.s_col = Some(model.jacobian_slot_for_column(row, self.col));
        self.row = Some(row);
        Ok(())
    }

    #[allow(clippy::similar_names)]
    fn update(&self, model: &mut AssembledModel) -> Result<()> {
        let row = self.row.ok_or(MbsError::StructuresNotBuilt)?;
        let s_col = self.s_col.ok_or(MbsError::StructuresNotBuilt)?;

        let c1 = model.point_coords(self.p1)?;
        let a = model.point_coords(self.p0)? - c1;
        let b = model.point_coords(self.p2)? - c1;
        let v1 = model.point_velocity(self.p1)?;
        let da = model.point_velocity(self.p0)? - v1;
        let db = model.point_velocity(self.p2)? - v1;

        let u = a.x * b.y - a.y * b.x;
        let v = a.dot(&b);
        let den = a.norm_squared() * b.norm_squared();
        if den <= 0.0 {
            return Err(MbsError::degenerate(format!(
                "relative angle at point {} with a coincident endpoint",
                self.p1
            )));
        }

        model.set_phi(row, u.atan2(v) - model.q[self.col]);

        let du = da.x * b.y + a.x * db.y - da.y * b.x - a.y * db.x;
        let dv = da.dot(&b) + a.dot(&db);
        model.set_dot_phi(row, (v * du - u * dv) / den - model.dq[self.col]);

        // Gradients: ∂θ/∂a and ∂θ/∂b of θ = atan2(a×b, a·b), plus their
        // exact time derivatives (quotient rule against dden).
        let g0 = Vector2::new(v * b.y - u * b.x, -v * b.x - u * b.y) / den;
        let g2 = Vector2::new(-v * a.y - u * a.x, v * a.x - u * a.y) / den;
        let dden = 2.0 * (a.dot(&da) * b.norm_squared() + b.dot(&db) * a.norm_squared());
        let dg0 = Vector2::new(
            dv * b.y + v * db.y - du * b.x - u * db.x,
            -dv * b.x - v * db.x - du * b.y - u * db.y,
        ) / den
            - g0 * (dden / den);
        let dg2 = Vector2::new(
            -dv * a.y - v * da.y - du * a.x - u * da.x,
            dv * a.x + v * da.x - du * a.y - u * da.y,
        ) / den
            - g2 * (dden / den);

        self.s0.write(model, g0, dg0);
        self.s2.write(model, g2, dg2);
        self.s1.write(model, -(g0 + g2), -(dg0 + dg2));
        model.write_jacobian(s_col, -1.0, 0.0);
        Ok(())
    }
}

// ============================================================================
// Relative angle, absolute
// ============================================================================

/// Φ = atan2(p1.y − p0.y, p1.x − p0.x) − q[col].
///
/// Angle of the segment p0→p1 against the global +X axis, paired with the
/// relative-DOF column it drives.
#[derive(Debug, Clone)]
pub struct RelativeAngleAbsolute {
    /// Segment origin.
    pub p0: usize,
    /// Segment tip.
    pub p1: usize,
    /// State-vector column of the relative coordinate.
    pub col: usize,

    row: Option<usize>,
    s0: PointSlots,
    s1: PointSlots,
    s_col: Option<JacSlot>,
}

impl RelativeAngleAbsolute {
    /// Create an absolute relative-angle constraint bound to column `col`.
    #[must_use]
    pub fn new(p0: usize, p1: usize, col: usize) -> Self {
        Self {
            p0,
            p1,
            col,
            row: None,
            s0: PointSlots::default(),
            s1: PointSlots::default(),
            s_col: None,
        }
    }

    fn build(&mut self, model: &mut AssembledModel) -> Result<()> {
        if self.col >= model.dof_count() {
            return Err(MbsError::InvalidDofColumn(self.col));
        }
        let row = model.add_constraint_row();
        self.s0 = PointSlots::register(model, row, self.p0)?;
        self.s1 = PointSlots::register(model, row, self.p1)?;
        self.s_col = Some(model.jacobian_slot_for_column(row, self.col));
        self.row = Some(row);
        Ok(())
    }

    fn update(&self, model: &mut AssembledModel) -> Result<()> {
        let row = self.row.ok_or(MbsError::StructuresNotBuilt)?;
        let s_col = self.s_col.ok_or(MbsError::StructuresNotBuilt)?;

        let a = model.point_coords(self.p1)? - model.point_coords(self.p0)?;
        let da = model.point_velocity(self.p1)? - model.point_velocity(self.p0)?;

        let r2 = a.norm_squared();
        if r2 <= 0.0 {
            return Err(MbsError::degenerate(format!(
                "absolute angle of coincident points {} and {}",
                self.p0, self.p1
            )));
        }

        model.set_phi(row, a.y.atan2(a.x) - model.q[self.col]);

        let cross = a.x * da.y - a.y * da.x;
        model.set_dot_phi(row, cross / r2 - model.dq[self.col]);

        // ∂θ/∂p1 = (−a.y, a.x)/r² and its time derivative.
        let g1 = Vector2::new(-a.y, a.x) / r2;
        let radial = 2.0 * a.dot(&da) / r2;
        let dg1 = Vector2::new(-da.y + a.y * radial, da.x - a.x * radial) / r2;

        self.s0.write(model, -g1, -dg1);
        self.s1.write(model, g1, dg1);
        model.write_jacobian(s_col, -1.0, 0.0);
        Ok(())
    }
}

// ============================================================================
// Relative position
// ============================================================================

/// Holds a point at fixed local coordinates in the frame spanned by
/// ref0→ref1.
///
/// Two residual rows:
///
/// ```text
/// Φx = pt.x − ref0.x − (xl·(ref1.x − ref0.x) − yl·(ref1.y − ref0.y))/L
/// Φy = pt.y − ref0.y − (xl·(ref1.y − ref0.y) + yl·(ref1.x − ref0.x))/L
/// ```
///
/// with L the (constant) initial distance between the reference points and
/// (xl, yl) the point's local coordinates, captured when structures are
/// built. The residuals are linear in the coordinates, so the Jacobian is
/// constant and its time derivative vanishes.
#[derive(Debug, Clone)]
pub struct RelativePosition {
    /// Frame origin point.
    pub ref0: usize,
    /// Frame X-direction point.
    pub ref1: usize,
    /// Constrained point.
    pub pt: usize,

    local: Option<Vector2<f64>>,
    length: f64,
    rows: Option<(usize, usize)>,
    sx_r0: PointSlots,
    sx_r1: PointSlots,
    sx_pt: Option<JacSlot>,
    sy_r0: PointSlots,
    sy_r1: PointSlots,
    sy_pt: Option<JacSlot>,
}

impl RelativePosition {
    /// Create a relative-position constraint; the local coordinates are
    /// captured from the model's configuration when structures are built.
    #[must_use]
    pub fn new(ref0: usize, ref1: usize, pt: usize) -> Self {
        Self {
            ref0,
            ref1,
            pt,
            local: None,
            length: 0.0,
            rows: None,
            sx_r0: PointSlots::default(),
            sx_r1: PointSlots::default(),
            sx_pt: None,
            sy_r0: PointSlots::default(),
            sy_r1: PointSlots::default(),
            sy_pt: None,
        }
    }

    fn build(&mut self, model: &mut AssembledModel) -> Result<()> {
        // Capture the frame from the configuration at build time (the
        // initial coordinates).
        let r0 = model.point_coords(self.ref0)?;
        let v01 = model.point_coords(self.ref1)? - r0;
        let length = v01.norm();
        if length <= 0.0 {
            return Err(MbsError::degenerate(format!(
                "relative-position frame with coincident references {} and {}",
                self.ref0, self.ref1
            )));
        }
        let u = v01 / length;
        let d = model.point_coords(self.pt)? - r0;
        self.local = Some(Vector2::new(d.dot(&u), u.x * d.y - u.y * d.x));
        self.length = length;

        let row_x = model.add_constraint_row();
        self.sx_r0 = PointSlots::register(model, row_x, self.ref0)?;
        self.sx_r1 = PointSlots::register(model, row_x, self.ref1)?;
        self.sx_pt = model.jacobian_slot(row_x, self.pt, PointDof::X)?;

        let row_y = model.add_constraint_row();
        self.sy_r0 = PointSlots::register(model, row_y, self.ref0)?;
        self.sy_r1 = PointSlots::register(model, row_y, self.ref1)?;
        self.sy_pt = model.jacobian_slot(row_y, self.pt, PointDof::Y)?;

        self.rows = Some((row_x, row_y));
        Ok(())
    }

    fn update(&self, model: &mut AssembledModel) -> Result<()> {
        let (row_x, row_y) = self.rows.ok_or(MbsError::StructuresNotBuilt)?;
        let local = self.local.ok_or(MbsError::StructuresNotBuilt)?;

        let r0 = model.point_coords(self.ref0)?;
        let r1 = model.point_coords(self.ref1)?;
        let p = model.point_coords(self.pt)?;
        let dr0 = model.point_velocity(self.ref0)?;
        let dr1 = model.point_velocity(self.ref1)?;
        let dp = model.point_velocity(self.pt)?;

        let xl = local.x / self.length;
        let yl = local.y / self.length;

        let phi_x = p.x - r0.x - xl * (r1.x - r0.x) + yl * (r1.y - r0.y);
        let phi_y = p.y - r0.y - xl * (r1.y - r0.y) - yl * (r1.x - r0.x);
        model.set_phi(row_x, phi_x);
        model.set_phi(row_y, phi_y);

        model.set_dot_phi(
            row_x,
            dp.x - dr0.x - xl * (dr1.x - dr0.x) + yl * (dr1.y - dr0.y),
        );
        model.set_dot_phi(
            row_y,
            dp.y - dr0.y - xl * (dr1.y - dr0.y) - yl * (dr1.x - dr0.x),
        );

        // Constant Jacobian; time derivative is identically zero.
        let zero = Vector2::zeros();
        self.sx_r0
            .write(model, Vector2::new(xl - 1.0, -yl), zero);
        self.sx_r1.write(model, Vector2::new(-xl, yl), zero);
        if let Some(s) = self.sx_pt {
            model.write_jacobian(s, 1.0, 0.0);
        }
        self.sy_r0
            .write(model, Vector2::new(yl, xl - 1.0), zero);
        self.sy_r1.write(model, Vector2::new(-yl, -xl), zero);
        if let Some(s) = self.sy_pt {
            model.write_jacobian(s, 1.0, 0.0);
        }
        Ok(())
    }
}
