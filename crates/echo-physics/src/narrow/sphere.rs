// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
use echo_geom::{Vec3, EPSILON};

use super::{ContactParams, Order};
use crate::body::Body;
use crate::contact::Contact;

/// Sphere against sphere. Touching spheres produce a zero-depth contact.
pub fn collide_sphere_sphere(
    a: &Body,
    b: &Body,
    _params: &ContactParams,
    out: &mut Vec<Contact>,
) -> Order {
    let (Some(ra), Some(rb)) = (a.shape().radius(), b.shape().radius()) else {
        return Order::Kept;
    };
    let cb = b.world().location();
    let offset = a.world().location() - cb;
    let separation = offset.length();
    let reach = ra + rb;
    if separation > reach {
        return Order::Kept;
    }
    // Coincident centres have no preferred direction.
    let normal = if separation > EPSILON {
        offset * (1.0 / separation)
    } else {
        Vec3::UNIT_X
    };
    out.push(Contact {
        point: cb + normal * rb,
        normal,
        depth: separation - reach,
    });
    Order::Kept
}

/// Sphere (A) against box (B), with the box padded by the margin.
///
/// Contacts are kept up to `contact_distance` beyond touching so resting
/// spheres do not flicker in and out of the manifold.
pub fn collide_sphere_box(
    a: &Body,
    b: &Body,
    params: &ContactParams,
    out: &mut Vec<Contact>,
) -> Order {
    let (Some(radius), Some(half)) = (a.shape().radius(), b.shape().half_extents()) else {
        return Order::Kept;
    };
    let box_world = b.world();
    let center = box_world.inverse_apply(&a.world().location());
    let clamped = Vec3::new(
        center.x().clamp(-half.x(), half.x()),
        center.y().clamp(-half.y(), half.y()),
        center.z().clamp(-half.z(), half.z()),
    );
    let intersection = radius + params.margin;
    let reach = intersection + params.contact_distance;
    let offset = center - clamped;
    let dist2 = offset.length_squared();
    if dist2 > reach * reach {
        return Order::Kept;
    }
    let (surface, normal, distance) = if dist2 <= EPSILON * EPSILON {
        deepest_face(&center, &half)
    } else {
        let distance = dist2.sqrt();
        (clamped, offset * (1.0 / distance), distance)
    };
    out.push(Contact {
        point: box_world.apply(&(surface + normal * params.margin)),
        normal: box_world.apply_rotation(&normal),
        depth: distance - intersection,
    });
    Order::Kept
}

/// Box against sphere: runs [`collide_sphere_box`] with the sphere as A.
pub fn collide_box_sphere(
    a: &Body,
    b: &Body,
    params: &ContactParams,
    out: &mut Vec<Contact>,
) -> Order {
    collide_sphere_box(b, a, params, out);
    Order::Swapped
}

/// Nearest box face to an interior point: `(point on face, face normal,
/// negative distance to the face)`, all in box space.
fn deepest_face(center: &Vec3, half: &Vec3) -> (Vec3, Vec3, f64) {
    let c = center.to_array();
    let h = half.to_array();
    let mut best = f64::INFINITY;
    let mut surface = *center;
    let mut normal = Vec3::UNIT_X;
    for axis in 0..3 {
        for sign in [1.0, -1.0] {
            let gap = h[axis] - sign * c[axis];
            if gap < best {
                best = gap;
                let mut p = c;
                p[axis] = sign * h[axis];
                surface = Vec3::from(p);
                let mut n = [0.0; 3];
                n[axis] = sign;
                normal = Vec3::from(n);
            }
        }
    }
    (surface, normal, -best)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deepest_face_picks_nearest_side() {
        let (p, n, d) = deepest_face(&Vec3::new(0.0, 0.8, 0.1), &Vec3::splat(1.0));
        assert_eq!(n, Vec3::UNIT_Y);
        assert_eq!(p.to_array(), [0.0, 1.0, 0.1]);
        assert!((d + 0.2).abs() < 1e-12);
    }
}
