//! Render-adapter boundary: per-body world poses.
//!
//! Rendering is external to the kernel; adapters only ever read world
//! poses. [`BodyPoseCache`] is that boundary: it recovers each body's
//! planar pose from its two defining points. Updating an uninitialized
//! cache is the one non-fatal degradation in the kernel — rendering is
//! optional and non-authoritative, so it warns and skips instead of
//! erroring.

use mbs_types::Vector2;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::assembled::AssembledModel;

/// Planar pose of one body: position of its first point and the angle of
/// its first-to-second point segment.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BodyPose2 {
    /// World position of the body's first member point.
    pub position: Vector2<f64>,
    /// World angle of the local X axis.
    pub angle: f64,
}

/// Cache of per-body world poses for rendering adapters.
#[derive(Debug, Clone, Default)]
pub struct BodyPoseCache {
    poses: Vec<BodyPose2>,
    initialized: bool,
}

impl BodyPoseCache {
    /// Create an uninitialized cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate one pose per body of `model` and fill in the current poses.
    pub fn init(&mut self, model: &AssembledModel) {
        self.poses = vec![BodyPose2::default(); model.symbolic().model().bodies().len()];
        self.initialized = true;
        self.update(model);
    }

    /// Recompute every body pose from the model's current state.
    ///
    /// No-op with a warning when the cache was never initialized or the
    /// body count does not match; rendering state is non-authoritative.
    pub fn update(&mut self, model: &AssembledModel) {
        let bodies = model.symbolic().model().bodies();
        if !self.initialized || self.poses.len() != bodies.len() {
            tracing::warn!(
                cached = self.poses.len(),
                bodies = bodies.len(),
                "body pose cache not initialized; skipping pose update"
            );
            return;
        }

        for (i, body) in bodies.iter().enumerate() {
            let (Ok(p0), Ok(p1)) = (
                model.point_coords(body.points[0]),
                model.point_coords(body.points[1]),
            ) else {
                tracing::warn!(body = i, "body references unknown points; pose left stale");
                continue;
            };
            let d = p1 - p0;
            self.poses[i] = BodyPose2 {
                position: p0,
                angle: d.y.atan2(d.x),
            };
        }
    }

    /// The cached poses, one per body, in registry order.
    #[must_use]
    pub fn poses(&self) -> &[BodyPose2] {
        &self.poses
    }

    /// Whether `init` has run.
    #[must_use]
    pub const fn is_initialized(&self) -> bool {
        self.initialized
    }
}
