//! Symbolic model registry, rigidity-constraint generation, and assembly.
//!
//! [`ModelDefinition`] is the mutable registry a model loader fills with
//! points and bodies. Once rigidity constraints have been generated the
//! registry is structurally frozen: the idempotent guard both prevents
//! duplicate rigidity constraints across repeated assemblies and rejects
//! further point/body mutation.
//!
//! [`ModelDefinition::assemble`] produces a [`SymbolicAssembly`], the sole
//! input to [`AssembledModel`](crate::AssembledModel) construction. It does
//! no numeric work; it only enumerates the DOF layout and snapshots the
//! registry so several assembled instances can share one symbolic model.

use std::sync::Arc;

use mbs_types::{Body, MbsError, NaturalDof, Point2, PointDof, RelativeDof, Result, Vector2};

use crate::constraints::{ConstantDistance, Constraint};

/// The mutable registry of points, bodies, and constraints.
#[derive(Debug, Clone, Default)]
pub struct ModelDefinition {
    points: Vec<Point2>,
    bodies: Vec<Body>,
    constraints: Vec<Constraint>,
    rigidity_generated: bool,
}

impl ModelDefinition {
    /// Create an empty model definition.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered points.
    #[must_use]
    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    /// Resize the point registry; new points are free and at the origin.
    ///
    /// # Errors
    ///
    /// [`MbsError::ModelFrozen`] after rigidity constraints were generated.
    pub fn set_point_count(&mut self, count: usize) -> Result<()> {
        if self.rigidity_generated {
            return Err(MbsError::ModelFrozen);
        }
        self.points.resize(count, Point2::default());
        Ok(())
    }

    /// Set a point's coordinates and fixed flag.
    ///
    /// # Errors
    ///
    /// [`MbsError::ModelFrozen`] after rigidity constraints were generated;
    /// [`MbsError::InvalidPointIndex`] for an unregistered index.
    pub fn set_point_coords(
        &mut self,
        index: usize,
        coords: Vector2<f64>,
        fixed: bool,
    ) -> Result<()> {
        if self.rigidity_generated {
            return Err(MbsError::ModelFrozen);
        }
        let pt = self
            .points
            .get_mut(index)
            .ok_or(MbsError::InvalidPointIndex(index))?;
        pt.coords = coords;
        pt.fixed = fixed;
        Ok(())
    }

    /// A point by index.
    ///
    /// # Errors
    ///
    /// [`MbsError::InvalidPointIndex`] for an unregistered index.
    pub fn point(&self, index: usize) -> Result<&Point2> {
        self.points
            .get(index)
            .ok_or(MbsError::InvalidPointIndex(index))
    }

    /// All registered points.
    #[must_use]
    pub fn points(&self) -> &[Point2] {
        &self.points
    }

    /// Register a new body and return it for field setup.
    ///
    /// An empty name is replaced by `body{N}`.
    ///
    /// # Errors
    ///
    /// [`MbsError::ModelFrozen`] after rigidity constraints were generated.
    pub fn add_body(&mut self, name: &str) -> Result<&mut Body> {
        if self.rigidity_generated {
            return Err(MbsError::ModelFrozen);
        }
        let name = if name.is_empty() {
            format!("body{}", self.bodies.len())
        } else {
            name.to_owned()
        };
        self.bodies.push(Body::new(name));
        // Just pushed; cannot be empty.
        Ok(self.bodies.last_mut().unwrap_or_else(|| unreachable!()))
    }

    /// A body by index.
    ///
    /// # Errors
    ///
    /// [`MbsError::InvalidBodyIndex`] for an unregistered index.
    pub fn body(&self, index: usize) -> Result<&Body> {
        self.bodies
            .get(index)
            .ok_or(MbsError::InvalidBodyIndex(index))
    }

    /// All registered bodies.
    #[must_use]
    pub fn bodies(&self) -> &[Body] {
        &self.bodies
    }

    /// Add an arbitrary constraint to the registry.
    ///
    /// Registry constraints are cloned into every assembled model.
    pub fn add_constraint(&mut self, constraint: Constraint) {
        self.constraints.push(constraint);
    }

    /// Registry constraints (rigidity plus caller-added).
    #[must_use]
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// Whether rigidity constraints have been generated (registry frozen).
    #[must_use]
    pub const fn rigidity_generated(&self) -> bool {
        self.rigidity_generated
    }

    fn initial_distance(&self, i: usize, j: usize) -> Result<f64> {
        let a = self.point(i)?.coords;
        let b = self.point(j)?.coords;
        Ok((b - a).norm())
    }

    /// Derive the minimal constant-distance constraint set that makes every
    /// body structurally rigid, then freeze the registry.
    ///
    /// Per body point count:
    /// - 0 or 1 points: invalid body, fatal.
    /// - 2 points: one constraint over the initial separation.
    /// - 3 points: the three pairwise constraints (rigid triangle).
    /// - more: a fan over the base segment — (0,1), then (0,j) and (1,j)
    ///   for every j ≥ 2.
    ///
    /// Runs at most once; later calls are no-ops so that repeated assembly
    /// with different relative-coordinate sets does not duplicate rigidity
    /// constraints.
    ///
    /// # Errors
    ///
    /// [`MbsError::BodyTooFewPoints`], [`MbsError::InvalidPointIndex`], and
    /// the frame-freezing errors of [`Body::freeze_frame`].
    pub fn generate_rigidity_constraints(&mut self) -> Result<()> {
        if self.rigidity_generated {
            return Ok(());
        }

        // Freeze every body's local frame from the initial configuration.
        for bi in 0..self.bodies.len() {
            let member_coords: Vec<Vector2<f64>> = {
                let body = &self.bodies[bi];
                body.points
                    .iter()
                    .map(|&pi| self.point(pi).map(|p| p.coords))
                    .collect::<Result<_>>()?
            };
            self.bodies[bi].freeze_frame(&member_coords)?;
        }

        for bi in 0..self.bodies.len() {
            let points = self.bodies[bi].points.clone();
            let pairs: Vec<(usize, usize)> = match points.len() {
                0 | 1 => {
                    return Err(MbsError::BodyTooFewPoints {
                        name: self.bodies[bi].name.clone(),
                        count: points.len(),
                    });
                }
                2 => vec![(0, 1)],
                3 => vec![(0, 1), (0, 2), (1, 2)],
                n => {
                    let mut pairs = vec![(0, 1)];
                    for j in 2..n {
                        pairs.push((0, j));
                        pairs.push((1, j));
                    }
                    pairs
                }
            };

            for (i, j) in pairs {
                let (pi, pj) = (points[i], points[j]);
                let length = self.initial_distance(pi, pj)?;
                self.constraints
                    .push(Constraint::ConstantDistance(ConstantDistance::new(
                        pi, pj, length,
                    )));
            }
        }

        self.rigidity_generated = true;
        Ok(())
    }

    /// Assemble the symbolic model: partition points into fixed and free,
    /// enumerate natural DOFs in point order (x then y per free point), and
    /// append the caller's relative DOFs.
    ///
    /// Generates rigidity constraints first if still pending. The returned
    /// descriptor snapshots the registry behind an [`Arc`], so it stays
    /// valid however the caller keeps using this definition.
    ///
    /// # Errors
    ///
    /// Rigidity-generation errors, plus [`MbsError::InvalidPointIndex`] for
    /// relative DOFs referencing unregistered points.
    pub fn assemble(&mut self, relative_dofs: Vec<RelativeDof>) -> Result<SymbolicAssembly> {
        for dof in &relative_dofs {
            for p in dof.points() {
                if p >= self.points.len() {
                    return Err(MbsError::InvalidPointIndex(p));
                }
            }
        }

        self.generate_rigidity_constraints()?;

        let mut natural_dofs = Vec::new();
        for (i, pt) in self.points.iter().enumerate() {
            if !pt.fixed {
                natural_dofs.push(NaturalDof::new(i, PointDof::X));
                natural_dofs.push(NaturalDof::new(i, PointDof::Y));
            }
        }

        Ok(SymbolicAssembly {
            model: Arc::new(self.clone()),
            natural_dofs,
            relative_dofs,
        })
    }
}

/// The symbolic assembled-model descriptor: a frozen registry snapshot plus
/// the ordered DOF layout. Cheap to clone; assembled instances built from
/// the same descriptor share the registry.
#[derive(Debug, Clone)]
pub struct SymbolicAssembly {
    model: Arc<ModelDefinition>,
    natural_dofs: Vec<NaturalDof>,
    relative_dofs: Vec<RelativeDof>,
}

impl SymbolicAssembly {
    /// The frozen registry.
    #[must_use]
    pub fn model(&self) -> &ModelDefinition {
        &self.model
    }

    /// Ordered natural DOFs (the first block of the state vector).
    #[must_use]
    pub fn natural_dofs(&self) -> &[NaturalDof] {
        &self.natural_dofs
    }

    /// Ordered relative DOFs (appended after all natural DOFs).
    #[must_use]
    pub fn relative_dofs(&self) -> &[RelativeDof] {
        &self.relative_dofs
    }
}
