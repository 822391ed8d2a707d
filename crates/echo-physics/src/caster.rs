// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
use echo_geom::{Transform, Vec3, EPSILON};
use tracing::trace;

use crate::body::Body;
use crate::shape::{Shape, ShapeKind};

/// Ray in world space: origin plus unit direction.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct WorldRay {
    /// Start point.
    pub origin: Vec3,
    /// Unit direction.
    pub direction: Vec3,
}

/// Ray-intersection algorithm for one target shape kind.
pub type CastFn = fn(&WorldRay, &Shape, &Transform) -> Option<Vec3>;

/// Algorithm registered for targets of `kind`, if any.
pub fn cast_algorithm(kind: ShapeKind) -> Option<CastFn> {
    match kind {
        ShapeKind::Sphere => Some(cast_sphere),
        ShapeKind::Box => Some(cast_box),
        ShapeKind::Plane => Some(cast_plane),
        ShapeKind::Ray => None,
    }
}

/// Casts the `ray` body against `target`.
///
/// Returns the nearest world-space intersection, or `None` when there is no
/// hit, when `ray` is not a ray, or when the target kind has no algorithm.
pub fn cast(ray: &Body, target: &Body) -> Option<Vec3> {
    let Some(direction) = ray.shape().direction() else {
        trace!(caster = ?ray.shape().kind(), "cast from a non-ray body");
        return None;
    };
    let Some(algorithm) = cast_algorithm(target.shape().kind()) else {
        trace!(target = ?target.shape().kind(), "no cast algorithm for target shape");
        return None;
    };
    let world = ray.world();
    let direction = world.apply_rotation(&direction).normalize();
    if direction.is_zero() {
        return None;
    }
    let ray = WorldRay {
        origin: world.location(),
        direction,
    };
    algorithm(&ray, target.shape(), &target.world())
}

/// Ray against sphere: the entry point, if the centre is ahead of the origin
/// and the ray passes within the radius.
pub fn cast_sphere(ray: &WorldRay, shape: &Shape, world: &Transform) -> Option<Vec3> {
    let radius = shape.radius()?;
    let to_center = world.location() - ray.origin;
    let along = to_center.dot(&ray.direction);
    if along < 0.0 {
        return None;
    }
    let off_axis2 = to_center.length_squared() - along * along;
    let r2 = radius * radius;
    if off_axis2 > r2 {
        return None;
    }
    Some(ray.origin + ray.direction * (along - (r2 - off_axis2).sqrt()))
}

/// Ray against plane. Only planes facing away from the ray are hit, the same
/// side a ray leaving the solid half-space would cross.
pub fn cast_plane(ray: &WorldRay, shape: &Shape, world: &Transform) -> Option<Vec3> {
    let normal = world.apply_rotation(&shape.normal()?).normalize();
    let facing = ray.direction.dot(&normal);
    if facing < EPSILON {
        return None;
    }
    let distance = (world.location() - ray.origin).dot(&normal) / facing;
    if distance < 0.0 {
        return None;
    }
    Some(ray.origin + ray.direction * distance)
}

/// Ray against box: slab test in box space. Returns the entry point, or the
/// exit point when the origin is inside the box.
pub fn cast_box(ray: &WorldRay, shape: &Shape, world: &Transform) -> Option<Vec3> {
    let half = shape.half_extents()?.to_array();
    let origin = world.inverse_apply(&ray.origin).to_array();
    let dir = world.inverse_apply_rotation(&ray.direction).to_array();
    let mut near = f64::NEG_INFINITY;
    let mut far = f64::INFINITY;
    for axis in 0..3 {
        if dir[axis].abs() < EPSILON {
            if origin[axis].abs() > half[axis] {
                return None;
            }
            continue;
        }
        let inv = 1.0 / dir[axis];
        let t0 = (-half[axis] - origin[axis]) * inv;
        let t1 = (half[axis] - origin[axis]) * inv;
        near = near.max(t0.min(t1));
        far = far.min(t0.max(t1));
    }
    if near > far || far < 0.0 {
        return None;
    }
    let t = if near >= 0.0 { near } else { far };
    Some(ray.origin + ray.direction * t)
}
