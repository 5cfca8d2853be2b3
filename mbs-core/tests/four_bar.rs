//! End-to-end checks on the four-bar linkage: state layout, residuals,
//! row growth, and state replication between instances.

use approx::assert_relative_eq;
use mbs_core::{mechanisms, AssembledModel, MbsError, RelativeDof};

fn assembled_with_crank_angle() -> AssembledModel {
    let mut def = mechanisms::four_bar_linkage();
    let sym = def
        .assemble(vec![RelativeDof::AngleAbsolute { p0: 0, p1: 1 }])
        .unwrap();
    AssembledModel::new(&sym).unwrap()
}

#[test]
fn test_state_layout_and_seeding() {
    let model = assembled_with_crank_angle();

    // Free points 1 (1,0) and 2 (1,2), x then y, then the crank angle.
    assert_eq!(model.dof_count(), 5);
    assert_eq!(model.natural_dof_count(), 4);
    assert_relative_eq!(model.q[0], 1.0);
    assert_relative_eq!(model.q[1], 0.0);
    assert_relative_eq!(model.q[2], 1.0);
    assert_relative_eq!(model.q[3], 2.0);
    // Relative coordinates start at zero; here the crank really is at
    // angle zero, so the initial state is consistent.
    assert_relative_eq!(model.q[4], 0.0);

    // 3 rigidity rows plus the relative-angle row.
    assert_eq!(model.constraint_count(), 4);
    assert_eq!(model.phi().len(), 4);
    assert_eq!(model.phi_q().ncols(), 5);
}

#[test]
fn test_residual_zero_at_initial_configuration() {
    let mut model = assembled_with_crank_angle();
    model.update_constraints().unwrap();
    assert!(model.phi().norm() < 1e-12);
    assert!(model.dot_phi().norm() < 1e-12);
}

#[test]
fn test_fixed_points_never_move() {
    let mut model = assembled_with_crank_angle();
    for i in 0..model.dof_count() {
        model.q[i] += 10.0;
    }
    let p0 = model.point_coords(0).unwrap();
    let p3 = model.point_coords(3).unwrap();
    assert_relative_eq!(p0.x, 0.0);
    assert_relative_eq!(p0.y, 0.0);
    assert_relative_eq!(p3.x, 4.0);
    assert_relative_eq!(p3.y, 0.0);
    // Fixed axes also report zero velocity.
    model.dq[0] = 1.0;
    assert_relative_eq!(model.point_velocity(0).unwrap().norm(), 0.0);
}

#[test]
fn test_crank_rotation_violates_only_downstream_rows() {
    let mut model = assembled_with_crank_angle();
    // Rotate the crank tip about the ground pivot; crank length is intact.
    let theta = 0.3_f64;
    model.q[0] = theta.cos();
    model.q[1] = theta.sin();
    model.update_constraints().unwrap();

    let phi = model.phi();
    assert_relative_eq!(phi[0], 0.0, epsilon = 1e-12); // crank rigidity
    assert!(phi[1].abs() > 1e-3); // coupler stretched
    assert_relative_eq!(phi[2], 0.0, epsilon = 1e-12); // rocker untouched
    // The relative-angle row reports the angle the q entry has not caught
    // up with yet.
    assert_relative_eq!(phi[3], theta, epsilon = 1e-12);

    // Catch the relative coordinate up and the row closes.
    model.q[4] = theta;
    model.update_constraints().unwrap();
    assert_relative_eq!(model.phi()[3], 0.0, epsilon = 1e-12);
}

#[test]
fn test_add_constraint_row_grows_whole_family() {
    let mut model = assembled_with_crank_angle();
    model.q[2] = 1.5;
    model.update_constraints().unwrap();
    let before = model.phi().clone();
    let nnz = model.phi_q().nnz();

    let row = model.add_constraint_row();
    assert_eq!(row, 4);
    assert_eq!(model.phi().len(), 5);
    assert_eq!(model.dot_phi().len(), 5);
    assert_eq!(model.phi_q().nrows(), 5);
    assert_eq!(model.dot_phi_q().nrows(), 5);
    assert_eq!(model.d_phiq_dq_dq().nrows(), 5);

    // Existing rows and the sparsity pattern are untouched.
    assert_eq!(model.phi_q().nnz(), nnz);
    for i in 0..before.len() {
        assert_relative_eq!(model.phi()[i], before[i]);
    }
    assert_relative_eq!(model.phi()[row], 0.0);
}

#[test]
fn test_copy_state_between_siblings() {
    let mut def = mechanisms::four_bar_linkage();
    let sym = def
        .assemble(vec![RelativeDof::AngleAbsolute { p0: 0, p1: 1 }])
        .unwrap();
    let mut a = AssembledModel::new(&sym).unwrap();
    let mut b = AssembledModel::new(&sym).unwrap();
    assert_eq!(a.signature(), b.signature());

    for i in 0..a.dof_count() {
        a.q[i] += 0.01 * (i as f64 + 1.0);
        a.dq[i] = 0.2 - 0.03 * i as f64;
    }
    b.copy_state_from(&a).unwrap();
    assert_relative_eq!((&b.q - &a.q).norm(), 0.0);
    assert_relative_eq!((&b.dq - &a.dq).norm(), 0.0);

    let ea = a.evaluate_energy().unwrap();
    let eb = b.evaluate_energy().unwrap();
    assert_relative_eq!(ea.total, eb.total, epsilon = 1e-12);
}

#[test]
fn test_copy_state_rejects_different_layout() {
    let mut def = mechanisms::four_bar_linkage();
    let plain = def.assemble(Vec::new()).unwrap();
    let with_angle = def
        .assemble(vec![RelativeDof::AngleAbsolute { p0: 0, p1: 1 }])
        .unwrap();
    let mut a = AssembledModel::new(&plain).unwrap();
    let b = AssembledModel::new(&with_angle).unwrap();

    let err = a.copy_state_from(&b).unwrap_err();
    assert!(matches!(err, MbsError::StructureMismatch { .. }));
}

#[test]
fn test_coordinate_dump() {
    let model = assembled_with_crank_angle();
    let dump = model.dump_coordinates();
    assert!(dump.contains("|q|=5"));
    assert!(dump.contains("4 natural"));
    assert!(dump.contains("1 relative"));
    assert!(dump.contains("q[0]: x1"));
    assert!(dump.contains("q[3]: y2"));
    assert!(dump.contains("relativeAngleWrtGround(0 - 1)"));
}

#[test]
fn test_gravity_is_per_instance() {
    let mut def = mechanisms::four_bar_linkage();
    let sym = def.assemble(Vec::new()).unwrap();
    let mut a = AssembledModel::new(&sym).unwrap();
    let b = AssembledModel::new(&sym).unwrap();

    a.set_gravity(mbs_core::Vector3::new(0.0, -1.62, 0.0));
    assert_relative_eq!(a.gravity().y, -1.62);
    assert_relative_eq!(b.gravity().y, -9.81);

    let ea = a.evaluate_energy().unwrap();
    let eb = b.evaluate_energy().unwrap();
    assert_relative_eq!(ea.potential * 9.81, eb.potential * 1.62, epsilon = 1e-9);
}
