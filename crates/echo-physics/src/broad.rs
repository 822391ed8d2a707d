// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Broadphase: candidate pair tracking with AABBs.
//!
//! New pairs are found with tight bounds around the current transforms.
//! Pairs already tracked are kept while their predicted bounds, padded by
//! the margin, still overlap. The padding only applies to tracked pairs so
//! pairs are created conservatively and persist generously.

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use crate::body::{Body, BodyId};
use crate::contact::{ContactPair, PairId};

/// Updates `pairs` against every unordered pair `i < j` of `bodies`.
pub(crate) fn update_pairs(
    bodies: &[Body],
    pairs: &mut BTreeMap<PairId, ContactPair>,
    margin: f64,
    breaking_limit: f64,
) {
    for (i, a) in bodies.iter().enumerate() {
        for b in &bodies[i + 1..] {
            let id = PairId::new(a.id(), b.id());
            if !a.is_movable() && !b.is_movable() {
                if pairs.remove(&id).is_some() {
                    trace!(pair = %id, "dropped pair between immovable bodies");
                }
                continue;
            }
            if pairs.contains_key(&id) {
                let overlapping = match (a.predicted_aabb(margin), b.predicted_aabb(margin)) {
                    (Some(ba), Some(bb)) => ba.overlaps(&bb),
                    _ => false,
                };
                if !overlapping {
                    pairs.remove(&id);
                    trace!(pair = %id, "pair separated");
                }
            } else if let (Some(ba), Some(bb)) = (a.aabb(0.0), b.aabb(0.0)) {
                if ba.overlaps(&bb) {
                    pairs.insert(id, ContactPair::new(a.id(), b.id(), breaking_limit));
                    trace!(pair = %id, "pair tracked");
                }
            }
        }
    }
}

/// Drops tracked pairs whose bodies are missing from `index`.
pub(crate) fn purge_missing(
    pairs: &mut BTreeMap<PairId, ContactPair>,
    index: &FxHashMap<BodyId, usize>,
) {
    let before = pairs.len();
    pairs.retain(|_, pair| {
        let (a, b) = pair.bodies();
        index.contains_key(&a) && index.contains_key(&b)
    });
    let purged = before - pairs.len();
    if purged > 0 {
        debug!(purged, "purged pairs for bodies no longer stepped");
    }
}

/// Drops every tracked pair that involves `body`. Returns how many went.
pub(crate) fn purge_body(pairs: &mut BTreeMap<PairId, ContactPair>, body: BodyId) -> usize {
    let before = pairs.len();
    pairs.retain(|_, pair| !pair.involves(body));
    before - pairs.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::Shape;
    use echo_geom::Vec3;

    fn ball(x: f64) -> Body {
        let mut b = Body::new(Shape::sphere(1.0));
        b.set_material(1.0, 0.0);
        b.set_location(Vec3::new(x, 0.0, 0.0));
        b
    }

    #[test]
    fn new_pairs_need_tight_overlap() {
        let bodies = [ball(0.0), ball(2.01)];
        let mut pairs = BTreeMap::new();
        update_pairs(&bodies, &mut pairs, 0.04, 0.02);
        assert!(pairs.is_empty());

        let bodies = [ball(0.0), ball(1.9)];
        update_pairs(&bodies, &mut pairs, 0.04, 0.02);
        assert_eq!(pairs.len(), 1);
    }

    #[test]
    fn tracked_pairs_survive_within_margin() {
        let mut bodies = [ball(0.0), ball(1.9)];
        let mut pairs = BTreeMap::new();
        update_pairs(&bodies, &mut pairs, 0.04, 0.02);
        assert_eq!(pairs.len(), 1);

        // Gap of 0.05 is within the padded bounds (2 * 0.04).
        bodies[1].set_location(Vec3::new(2.05, 0.0, 0.0));
        update_pairs(&bodies, &mut pairs, 0.04, 0.02);
        assert_eq!(pairs.len(), 1);

        bodies[1].set_location(Vec3::new(2.2, 0.0, 0.0));
        update_pairs(&bodies, &mut pairs, 0.04, 0.02);
        assert!(pairs.is_empty());
    }

    #[test]
    fn immovable_pairs_are_never_tracked() {
        let bodies = [
            Body::new(Shape::sphere(1.0)),
            Body::new(Shape::plane(Vec3::UNIT_Y)),
        ];
        let mut pairs = BTreeMap::new();
        update_pairs(&bodies, &mut pairs, 0.04, 0.02);
        assert!(pairs.is_empty());
    }

    #[test]
    fn rays_never_pair() {
        let bodies = [ball(0.0), Body::new(Shape::ray(Vec3::UNIT_X))];
        let mut pairs = BTreeMap::new();
        update_pairs(&bodies, &mut pairs, 0.04, 0.02);
        assert!(pairs.is_empty());
    }

    #[test]
    fn purges_pairs_of_missing_bodies() {
        let bodies = [ball(0.0), ball(1.0), ball(-0.5)];
        let mut pairs = BTreeMap::new();
        update_pairs(&bodies, &mut pairs, 0.04, 0.02);
        assert_eq!(pairs.len(), 3);

        let index: FxHashMap<BodyId, usize> =
            bodies[..2].iter().enumerate().map(|(i, b)| (b.id(), i)).collect();
        purge_missing(&mut pairs, &index);
        assert_eq!(pairs.len(), 1);
        assert_eq!(purge_body(&mut pairs, bodies[0].id()), 1);
        assert!(pairs.is_empty());
    }
}
