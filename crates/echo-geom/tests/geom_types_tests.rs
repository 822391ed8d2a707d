// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

#![allow(missing_docs)]
//! Integration tests for echo-geom AABBs and transforms.

use core::f64::consts::{FRAC_PI_2, FRAC_PI_4};
use echo_geom::{Aabb, Quat, Transform, Vec3};

fn close(a: Vec3, b: Vec3) -> bool {
    a.sub(&b).length() < 1e-9
}

#[test]
fn touching_boxes_do_not_overlap() {
    let a = Aabb::from_center_half_extents(Vec3::ZERO, Vec3::splat(1.0));
    let b = Aabb::from_center_half_extents(Vec3::new(2.0, 0.0, 0.0), Vec3::splat(1.0));
    assert!(!a.overlaps(&b));
    assert!(a.inflate(0.01).overlaps(&b));
    let c = Aabb::from_center_half_extents(Vec3::new(1.5, 0.5, -0.5), Vec3::splat(1.0));
    assert!(a.overlaps(&c) && c.overlaps(&a));
}

#[test]
fn unbounded_overlaps_everything() {
    let far = Aabb::from_center_half_extents(Vec3::splat(1e12), Vec3::splat(0.5));
    let all = Aabb::unbounded().inflate(0.04);
    assert!(all.overlaps(&far));
    assert!(far.overlaps(&all));
    assert!(all.overlaps(&Aabb::unbounded()));
}

#[test]
fn union_center_and_extents() {
    let a = Aabb::new(Vec3::new(-1.0, 0.0, 0.0), Vec3::new(0.0, 1.0, 1.0));
    let b = Aabb::new(Vec3::new(2.0, -1.0, 0.0), Vec3::new(3.0, 0.0, 2.0));
    let u = a.union(&b);
    assert_eq!(u.min().to_array(), [-1.0, -1.0, 0.0]);
    assert_eq!(u.max().to_array(), [3.0, 1.0, 2.0]);
    assert_eq!(u.center().to_array(), [1.0, 0.0, 1.0]);
    assert_eq!(u.half_extents().to_array(), [2.0, 1.0, 1.0]);
    assert!(u.contains_point(&Vec3::new(3.0, 1.0, 2.0)));
}

#[test]
fn inverse_apply_undoes_apply() {
    let t = Transform::new(
        Vec3::new(1.0, -2.0, 3.0),
        Quat::from_axis_angle(Vec3::new(1.0, 1.0, 0.0), 0.9),
    );
    let p = Vec3::new(0.25, 4.0, -1.5);
    assert!(close(t.inverse_apply(&t.apply(&p)), p));
    assert!(close(t.inverse_apply_rotation(&t.apply_rotation(&p)), p));
}

#[test]
fn integrate_translates_by_velocity() {
    let t = Transform::from_location(Vec3::new(0.0, 1.0, 0.0));
    let next = t.integrate(&Vec3::new(2.0, 2.0, 2.0), &Vec3::ZERO, 0.2);
    assert!(close(next.location(), Vec3::new(0.4, 1.4, 0.4)));
    assert_eq!(next.rotation(), Quat::identity());
}

#[test]
fn integrate_matches_axis_angle_below_limit() {
    let t = Transform::identity();
    let next = t.integrate(&Vec3::ZERO, &Vec3::new(0.0, 0.0, 1.0), 0.5);
    let expected = Quat::from_axis_angle(Vec3::UNIT_Z, 0.5);
    let got = next.rotation().to_array();
    let want = expected.to_array();
    for i in 0..4 {
        assert!((got[i] - want[i]).abs() < 1e-12, "{got:?} vs {want:?}");
    }
}

#[test]
fn integrate_clamps_fast_spins() {
    let t = Transform::identity();
    let next = t.integrate(&Vec3::ZERO, &Vec3::new(0.0, 0.0, 10.0 * FRAC_PI_2), 1.0);
    // Rotation about +Z by exactly the per-step limit.
    let x = next.apply_rotation(&Vec3::UNIT_X);
    assert!(close(x, Vec3::new(FRAC_PI_4.cos(), FRAC_PI_4.sin(), 0.0)));
}
