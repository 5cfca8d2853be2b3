//! Canned model definitions for tests and examples.

use mbs_types::Vector2;

use crate::model::ModelDefinition;

/// Uniform slender rod between two already-registered points.
fn rod_body(def: &mut ModelDefinition, name: &str, p0: usize, p1: usize, mass: f64) {
    let length = {
        // Points are registered before bodies; indices are valid here.
        let a = def.points()[p0].coords;
        let b = def.points()[p1].coords;
        (b - a).norm()
    };
    #[allow(clippy::unwrap_used)]
    let body = def.add_body(name).unwrap();
    body.points = vec![p0, p1];
    body.mass = mass;
    body.cog = Vector2::new(length / 2.0, 0.0);
    body.inertia_cog = mass * length * length / 12.0;
}

/// A planar four-bar linkage: ground pivots at (0,0) and (4,0), crank tip
/// at (1,0), coupler tip at (1,2). Three uniform rods: crank 0–1, coupler
/// 1–2, rocker 2–3. One mechanism DOF.
#[must_use]
pub fn four_bar_linkage() -> ModelDefinition {
    let mut def = ModelDefinition::new();
    #[allow(clippy::unwrap_used)]
    {
        def.set_point_count(4).unwrap();
        def.set_point_coords(0, Vector2::new(0.0, 0.0), true).unwrap();
        def.set_point_coords(1, Vector2::new(1.0, 0.0), false).unwrap();
        def.set_point_coords(2, Vector2::new(1.0, 2.0), false).unwrap();
        def.set_point_coords(3, Vector2::new(4.0, 0.0), true).unwrap();
    }
    rod_body(&mut def, "crank", 0, 1, 1.0);
    rod_body(&mut def, "coupler", 1, 2, 2.0);
    rod_body(&mut def, "rocker", 2, 3, 4.0);
    def
}

/// A double pendulum hanging from (0,0): two uniform rods 0–1 and 1–2,
/// initially horizontal. Two mechanism DOFs.
#[must_use]
pub fn double_pendulum() -> ModelDefinition {
    let mut def = ModelDefinition::new();
    #[allow(clippy::unwrap_used)]
    {
        def.set_point_count(3).unwrap();
        def.set_point_coords(0, Vector2::new(0.0, 0.0), true).unwrap();
        def.set_point_coords(1, Vector2::new(1.0, 0.0), false).unwrap();
        def.set_point_coords(2, Vector2::new(2.0, 0.0), false).unwrap();
    }
    rod_body(&mut def, "upper", 0, 1, 1.0);
    rod_body(&mut def, "lower", 1, 2, 1.0);
    def
}
