// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Contacts against infinite planes.
//!
//! Planes are always B. The half-space behind the normal is solid, and
//! contacts are reported while the true surfaces are within `margin`.

use echo_geom::Vec3;

use super::{ContactParams, Order};
use crate::body::Body;
use crate::contact::{Contact, MANIFOLD_CAPACITY};

/// World-space `(origin, unit normal)` of a plane body.
fn plane_frame(plane: &Body) -> Option<(Vec3, Vec3)> {
    let world = plane.world();
    let normal = world.apply_rotation(&plane.shape().normal()?).normalize();
    if normal.is_zero() {
        return None;
    }
    Some((world.location(), normal))
}

/// Sphere (A) resting on or sinking into a plane (B).
pub fn collide_sphere_plane(
    a: &Body,
    b: &Body,
    params: &ContactParams,
    out: &mut Vec<Contact>,
) -> Order {
    let (Some(radius), Some((origin, normal))) = (a.shape().radius(), plane_frame(b)) else {
        return Order::Kept;
    };
    let center = a.world().location();
    let height = (center - origin).dot(&normal);
    let depth = height - radius;
    if depth > params.margin {
        return Order::Kept;
    }
    out.push(Contact {
        point: center - normal * height,
        normal,
        depth,
    });
    Order::Kept
}

/// Plane against sphere: runs [`collide_sphere_plane`] with the sphere as A.
pub fn collide_plane_sphere(
    a: &Body,
    b: &Body,
    params: &ContactParams,
    out: &mut Vec<Contact>,
) -> Order {
    collide_sphere_plane(b, a, params, out);
    Order::Swapped
}

/// Box (A) against a plane (B): one contact per corner near or below the
/// plane, keeping the deepest [`MANIFOLD_CAPACITY`].
pub fn collide_box_plane(
    a: &Body,
    b: &Body,
    params: &ContactParams,
    out: &mut Vec<Contact>,
) -> Order {
    let (Some(half), Some((origin, normal))) = (a.shape().half_extents(), plane_frame(b)) else {
        return Order::Kept;
    };
    let world = a.world();
    for corner in 0..8_u8 {
        let sign = |bit: u8| if corner & bit == 0 { -1.0 } else { 1.0 };
        let local = Vec3::new(sign(1) * half.x(), sign(2) * half.y(), sign(4) * half.z());
        let p = world.apply(&local);
        let depth = (p - origin).dot(&normal);
        if depth <= params.margin {
            out.push(Contact {
                point: p - normal * depth,
                normal,
                depth,
            });
        }
    }
    if out.len() > MANIFOLD_CAPACITY {
        out.sort_by(|l, r| l.depth.total_cmp(&r.depth));
        out.truncate(MANIFOLD_CAPACITY);
    }
    Order::Kept
}

/// Plane against box: runs [`collide_box_plane`] with the box as A.
pub fn collide_plane_box(
    a: &Body,
    b: &Body,
    params: &ContactParams,
    out: &mut Vec<Contact>,
) -> Order {
    collide_box_plane(b, a, params, out);
    Order::Swapped
}
