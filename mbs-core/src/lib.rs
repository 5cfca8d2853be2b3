//! Planar multibody assembly kernel in natural coordinates.
//!
//! This crate turns a symbolic description of points, rigid bodies, and
//! joints into a numeric state vector, a set of algebraic constraint
//! equations Φ, and their sparse Jacobians, and keeps them synchronized as
//! the state evolves — the reduced (index-3 DAE) coordinate form consumed
//! by dynamics solvers and estimators.
//!
//! # Pipeline
//!
//! 1. [`ModelDefinition`] — mutable registry of points and bodies.
//! 2. Rigidity generation — a minimal constant-distance set per body,
//!    derived once and frozen.
//! 3. [`ModelDefinition::assemble`] — partitions fixed vs. free points and
//!    produces a [`SymbolicAssembly`] descriptor.
//! 4. [`AssembledModel`] — owns q/dq/ddq/Q, Φ and the sparse Jacobian
//!    family, with a fixed sparsity pattern established at construction.
//!
//! # Update protocol
//!
//! ```
//! use mbs_core::{mechanisms, AssembledModel};
//!
//! let mut def = mechanisms::four_bar_linkage();
//! let sym = def.assemble(Vec::new())?;
//! let mut model = AssembledModel::new(&sym)?;
//!
//! // mutate state → update → read
//! model.dq[0] = 0.5;
//! model.update_constraints()?;
//! let residual = model.phi().norm();
//! let energy = model.evaluate_energy()?;
//! # assert!(residual < 1e-12);
//! # assert!(energy.kinetic > 0.0);
//! # Ok::<(), mbs_core::MbsError>(())
//! ```
//!
//! The kernel is single-threaded and deterministic: no caching, no
//! dirty-tracking, no interior locking. Independent [`AssembledModel`]
//! instances may run on separate threads; one instance must not be shared
//! without external synchronization, because `update_constraints` writes
//! the Jacobian storage in place.

#![doc(html_root_url = "https://docs.rs/mbs-core/0.1.0")]
#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(clippy::missing_const_for_fn)]

mod assembled;
mod constraints;
mod dynamics;
pub mod mechanisms;
mod model;
mod sparse;
mod viz;

pub use assembled::{AssembledModel, JacSlot, DEFAULT_GRAVITY};
pub use constraints::{
    ConstantDistance, Constraint, RelativeAngle, RelativeAngleAbsolute, RelativePosition,
};
pub use model::{ModelDefinition, SymbolicAssembly};
pub use sparse::{SlotId, SparseMatrix};
pub use viz::{BodyPose2, BodyPoseCache};

// Re-export the shared data types
pub use mbs_types::{
    Body, EnergyValues, MbsError, NaturalDof, Point2, PointDof, PointDofMap, RelativeDof, Result,
    Vector2, Vector3,
};
