// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
use std::fmt;

use echo_geom::{Transform, Vec3};

use crate::body::{Body, BodyId};

/// Maximum number of points a contact manifold keeps.
pub const MANIFOLD_CAPACITY: usize = 4;

/// Order-independent key for a pair of bodies.
///
/// Packs `(min(id) << 32) | max(id)` so `PairId::new(a, b) == PairId::new(b, a)`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PairId(u64);

impl PairId {
    /// Canonical key for the unordered pair `{a, b}`.
    pub fn new(a: BodyId, b: BodyId) -> Self {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        Self((u64::from(lo.raw()) << 32) | u64::from(hi.raw()))
    }

    /// Packed representation.
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PairId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pair#{}:{}", self.0 >> 32, self.0 & u64::from(u32::MAX))
    }
}

/// One point of contact as produced by a narrowphase algorithm.
///
/// `point` lies on body B in world space and `normal` is a unit vector
/// pointing from B toward A. `depth` is negative while the shapes
/// interpenetrate; the matching point on A is `point + normal * depth`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Contact {
    /// World point on B.
    pub point: Vec3,
    /// Unit normal from B toward A.
    pub normal: Vec3,
    /// Signed separation along the normal.
    pub depth: f64,
}

impl Contact {
    /// World point on A.
    pub fn point_on_a(&self) -> Vec3 {
        self.point.add(&self.normal.scale(self.depth))
    }
}

/// Cached, solver-ready contact point.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ManifoldPoint {
    local_a: Vec3,
    local_b: Vec3,
    world_a: Vec3,
    world_b: Vec3,
    normal: Vec3,
    distance: f64,
    friction: f64,
    restitution: f64,
    warm_impulse: f64,
}

impl ManifoldPoint {
    fn prepare(contact: &Contact, a: &Body, b: &Body, max_friction: f64) -> Self {
        let world_a = contact.point_on_a();
        let world_b = contact.point;
        Self {
            local_a: a.world().inverse_apply(&world_a),
            local_b: b.world().inverse_apply(&world_b),
            world_a,
            world_b,
            normal: contact.normal,
            distance: contact.depth,
            friction: a.combined_friction(b, max_friction),
            restitution: a.combined_restitution(b),
            warm_impulse: 0.0,
        }
    }

    /// Contact point on A in world space.
    pub fn world_a(&self) -> Vec3 {
        self.world_a
    }

    /// Contact point on B in world space.
    pub fn world_b(&self) -> Vec3 {
        self.world_b
    }

    /// Contact point in A's local space.
    pub fn local_a(&self) -> Vec3 {
        self.local_a
    }

    /// Contact point in B's local space.
    pub fn local_b(&self) -> Vec3 {
        self.local_b
    }

    /// Unit normal from B toward A.
    pub fn normal(&self) -> Vec3 {
        self.normal
    }

    /// Signed separation; negative while penetrating.
    pub fn distance(&self) -> f64 {
        self.distance
    }

    /// Combined friction of the two bodies.
    pub fn friction(&self) -> f64 {
        self.friction
    }

    /// Combined restitution of the two bodies.
    pub fn restitution(&self) -> f64 {
        self.restitution
    }

    /// Normal impulse applied last step, reused to warm-start the solver.
    pub fn warm_impulse(&self) -> f64 {
        self.warm_impulse
    }

    pub(crate) fn set_warm_impulse(&mut self, impulse: f64) {
        self.warm_impulse = impulse;
    }

    fn mirrored(&self) -> Self {
        Self {
            local_a: self.local_b,
            local_b: self.local_a,
            world_a: self.world_b,
            world_b: self.world_a,
            normal: self.normal.scale(-1.0),
            ..*self
        }
    }
}

/// Persistent state for a tracked pair of bodies.
///
/// Created by the broadphase when two bodies first overlap and dropped when
/// their padded bounds separate. The manifold survives across steps so the
/// solver can warm-start from last step's impulses.
#[derive(Debug, Clone)]
pub struct ContactPair {
    id: PairId,
    a: BodyId,
    b: BodyId,
    points: Vec<ManifoldPoint>,
    colliding: bool,
    breaking_limit: f64,
}

impl ContactPair {
    /// Empty pair for `a` and `b`.
    pub fn new(a: BodyId, b: BodyId, breaking_limit: f64) -> Self {
        Self {
            id: PairId::new(a, b),
            a,
            b,
            points: Vec::with_capacity(MANIFOLD_CAPACITY),
            colliding: false,
            breaking_limit,
        }
    }

    /// Pair key.
    pub fn id(&self) -> PairId {
        self.id
    }

    /// Bodies in `(A, B)` order.
    pub fn bodies(&self) -> (BodyId, BodyId) {
        (self.a, self.b)
    }

    /// Returns `true` if `body` is one of the pair.
    pub fn involves(&self, body: BodyId) -> bool {
        self.a == body || self.b == body
    }

    /// Cached manifold.
    pub fn points(&self) -> &[ManifoldPoint] {
        &self.points
    }

    /// Whether the last narrowphase pass found the shapes touching.
    pub fn is_colliding(&self) -> bool {
        self.colliding
    }

    pub(crate) fn set_colliding(&mut self, colliding: bool) {
        self.colliding = colliding;
    }

    pub(crate) fn points_mut(&mut self) -> &mut [ManifoldPoint] {
        &mut self.points
    }

    /// Exchanges A and B, mirroring any cached points.
    pub fn swap(&mut self) {
        std::mem::swap(&mut self.a, &mut self.b);
        for p in &mut self.points {
            *p = p.mirrored();
        }
    }

    /// Re-derives world points from the cached local points and drops the
    /// ones that drifted further than the breaking limit.
    pub fn refresh(&mut self, world_a: &Transform, world_b: &Transform) {
        let limit = self.breaking_limit;
        self.points.retain_mut(|p| {
            p.world_a = world_a.apply(&p.local_a);
            p.world_b = world_b.apply(&p.local_b);
            p.distance = p.world_a.sub(&p.world_b).dot(&p.normal);
            if p.distance > limit {
                return false;
            }
            let projected = p.world_a.sub(&p.normal.scale(p.distance));
            projected.distance_squared(&p.world_b) <= limit * limit
        });
    }

    /// Folds freshly detected contacts into the cached manifold.
    ///
    /// A contact that lands within the breaking limit of a cached point
    /// replaces it and inherits its warm-start impulse. Other contacts are
    /// appended while there is room; a full manifold replaces the point whose
    /// removal keeps the widest spread, never the deepest one.
    pub fn merge(&mut self, contacts: &[Contact], a: &Body, b: &Body, max_friction: f64) {
        for contact in contacts {
            let fresh = ManifoldPoint::prepare(contact, a, b, max_friction);
            if let Some(index) = self.closest_point(&fresh) {
                let warm = self.points[index].warm_impulse;
                self.points[index] = ManifoldPoint {
                    warm_impulse: warm,
                    ..fresh
                };
            } else if self.points.len() < MANIFOLD_CAPACITY {
                self.points.push(fresh);
            } else {
                let index = self.replacement_index(&fresh);
                self.points[index] = fresh;
            }
        }
    }

    fn closest_point(&self, fresh: &ManifoldPoint) -> Option<usize> {
        let mut best = self.breaking_limit * self.breaking_limit;
        let mut found = None;
        for (i, p) in self.points.iter().enumerate() {
            let d2 = p.local_a.distance_squared(&fresh.local_a);
            if d2 < best {
                best = d2;
                found = Some(i);
            }
        }
        found
    }

    fn replacement_index(&self, fresh: &ManifoldPoint) -> usize {
        let deepest = self
            .points
            .iter()
            .enumerate()
            .min_by(|(_, l), (_, r)| l.distance.total_cmp(&r.distance))
            .map_or(0, |(i, _)| i);
        let p: [Vec3; MANIFOLD_CAPACITY] = std::array::from_fn(|i| self.points[i].local_a);
        let n = fresh.local_a;
        // Area spanned by the remaining points if index `i` is replaced.
        let areas = [
            quad_area(&n, &p[1], &p[2], &p[3]),
            quad_area(&n, &p[0], &p[2], &p[3]),
            quad_area(&n, &p[0], &p[1], &p[3]),
            quad_area(&n, &p[0], &p[1], &p[2]),
        ];
        let mut best = None;
        let mut best_area = f64::NEG_INFINITY;
        for (i, area) in areas.into_iter().enumerate() {
            if i != deepest && area > best_area {
                best_area = area;
                best = Some(i);
            }
        }
        best.unwrap_or(0)
    }
}

/// Squared area measure of four points: the largest of the three ways to
/// pair them into diagonals, so vertex order does not matter.
fn quad_area(p0: &Vec3, p1: &Vec3, p2: &Vec3, p3: &Vec3) -> f64 {
    let l0 = p0.sub(p1).cross(&p2.sub(p3)).length_squared();
    let l1 = p0.sub(p2).cross(&p1.sub(p3)).length_squared();
    let l2 = p0.sub(p3).cross(&p1.sub(p2)).length_squared();
    l0.max(l1).max(l2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::Shape;
    use proptest::prelude::*;

    const LIMIT: f64 = 0.02;

    fn pair() -> (Body, Body, ContactPair) {
        let a = Body::new(Shape::sphere(1.0));
        let b = Body::new(Shape::sphere(1.0));
        let pair = ContactPair::new(a.id(), b.id(), LIMIT);
        (a, b, pair)
    }

    fn up(x: f64, z: f64, depth: f64) -> Contact {
        Contact {
            point: Vec3::new(x, 0.0, z),
            normal: Vec3::UNIT_Y,
            depth,
        }
    }

    proptest! {
        #[test]
        fn pair_id_ignores_order(x in any::<u32>(), y in any::<u32>()) {
            let (a, b) = (BodyId::from_raw(x), BodyId::from_raw(y));
            prop_assert_eq!(PairId::new(a, b), PairId::new(b, a));
            prop_assert_eq!(PairId::new(a, b).raw() >> 32, u64::from(x.min(y)));
        }
    }

    #[test]
    fn pair_id_display_lists_low_then_high() {
        let id = PairId::new(BodyId::from_raw(9), BodyId::from_raw(4));
        assert_eq!(id.to_string(), "pair#4:9");
    }

    #[test]
    fn nearby_contact_inherits_warm_impulse() {
        let (a, b, mut pair) = pair();
        pair.merge(&[up(0.0, 0.0, -0.1)], &a, &b, 100.0);
        pair.points_mut()[0].set_warm_impulse(3.0);

        pair.merge(&[up(0.005, 0.0, -0.11)], &a, &b, 100.0);
        assert_eq!(pair.points().len(), 1);
        let p = pair.points()[0];
        assert!((p.warm_impulse() - 3.0).abs() < f64::EPSILON);
        assert!((p.distance() + 0.11).abs() < 1e-12);

        pair.merge(&[up(1.0, 0.0, -0.1)], &a, &b, 100.0);
        assert_eq!(pair.points().len(), 2);
        assert!(pair.points()[1].warm_impulse().abs() < f64::EPSILON);
    }

    #[test]
    fn full_manifold_keeps_the_deepest_point() {
        let (a, b, mut pair) = pair();
        let corners = [
            up(1.0, 1.0, -0.01),
            up(-1.0, 1.0, -0.01),
            up(-1.0, -1.0, -0.5),
            up(1.0, -1.0, -0.01),
        ];
        pair.merge(&corners, &a, &b, 100.0);
        assert_eq!(pair.points().len(), MANIFOLD_CAPACITY);

        pair.merge(&[up(0.0, 0.0, -0.02)], &a, &b, 100.0);
        assert_eq!(pair.points().len(), MANIFOLD_CAPACITY);
        assert!(pair
            .points()
            .iter()
            .any(|p| (p.distance() + 0.5).abs() < 1e-12));
        assert!(pair
            .points()
            .iter()
            .any(|p| (p.distance() + 0.02).abs() < 1e-12));
    }

    #[test]
    fn quad_area_ignores_vertex_order() {
        let corners = [
            Vec3::new(1.0, 0.0, 1.0),
            Vec3::new(-1.0, 0.0, 1.0),
            Vec3::new(-1.0, 0.0, -1.0),
            Vec3::new(1.0, 0.0, -1.0),
        ];
        // Every ordering of the square sees its diagonals: |(2,2) x (-2,2)|^2.
        for i in 0..4 {
            for j in (0..4).filter(|&j| j != i) {
                for k in (0..4).filter(|&k| k != i && k != j) {
                    let l = 6 - i - j - k;
                    let area = quad_area(&corners[i], &corners[j], &corners[k], &corners[l]);
                    assert!((area - 64.0).abs() < 1e-12, "order {i}{j}{k}{l}: {area}");
                }
            }
        }
    }

    #[test]
    fn swap_mirrors_cached_points() {
        let (a, b, mut pair) = pair();
        pair.merge(&[up(0.0, 0.0, -0.1)], &a, &b, 100.0);
        let before = pair.points()[0];
        pair.swap();
        assert_eq!(pair.bodies(), (b.id(), a.id()));
        assert_eq!(pair.id(), PairId::new(a.id(), b.id()));
        let after = pair.points()[0];
        assert_eq!(after.normal(), Vec3::new(0.0, -1.0, 0.0));
        assert_eq!(after.world_a(), before.world_b());
        assert_eq!(after.world_b(), before.world_a());
        assert!((after.distance() - before.distance()).abs() < f64::EPSILON);
    }

    #[test]
    fn refresh_drops_points_that_slid_apart() {
        let (a, b, mut pair) = pair();
        pair.merge(&[up(0.0, 0.0, -0.1)], &a, &b, 100.0);
        let still = Transform::identity();
        pair.refresh(&still, &still);
        assert_eq!(pair.points().len(), 1);

        let slid = Transform::from_location(Vec3::new(0.5, 0.0, 0.0));
        pair.refresh(&slid, &still);
        assert!(pair.points().is_empty());
    }

    #[test]
    fn refresh_drops_points_that_separated() {
        let (a, b, mut pair) = pair();
        pair.merge(&[up(0.0, 0.0, -0.01)], &a, &b, 100.0);
        let lifted = Transform::from_location(Vec3::new(0.0, 0.1, 0.0));
        pair.refresh(&lifted, &Transform::identity());
        assert!(pair.points().is_empty());
        assert!(pair.involves(a.id()) && pair.involves(b.id()));
    }
}
