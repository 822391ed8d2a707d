// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Sequential-impulse contact solver.
//!
//! Each colliding manifold point becomes one non-penetration row and one
//! friction row. Rows are relaxed one at a time (projected Gauss-Seidel)
//! against per-body velocity deltas. Deep penetrations are separated by a
//! dedicated push/turn velocity that moves the world transform without
//! leaving energy in the body's real velocity.

use std::collections::BTreeMap;

use echo_geom::{Mat3, Transform, Vec3, EPSILON};
use rustc_hash::FxHashMap;
use tracing::trace;

use crate::body::{Body, BodyId};
use crate::config::SolverConfig;
use crate::contact::{ContactPair, PairId};

/// Upper limit used for unbounded normal impulses.
const IMPULSE_LIMIT: f64 = 1e10;

/// Slot of the shared immovable solver body.
const FIXED: usize = 0;

/// Solver-side copy of a body, accumulating velocity changes.
#[derive(Debug, Clone)]
struct SolverBody {
    /// Index into the caller's body slice; `None` for the fixed body.
    index: Option<usize>,
    imass: f64,
    iitw: Mat3,
    world: Transform,
    linear: Vec3,
    angular: Vec3,
    delta_linear: Vec3,
    delta_angular: Vec3,
    push: Vec3,
    turn: Vec3,
}

impl SolverBody {
    fn fixed() -> Self {
        Self {
            index: None,
            imass: 0.0,
            iitw: Mat3::zero(),
            world: Transform::identity(),
            linear: Vec3::ZERO,
            angular: Vec3::ZERO,
            delta_linear: Vec3::ZERO,
            delta_angular: Vec3::ZERO,
            push: Vec3::ZERO,
            turn: Vec3::ZERO,
        }
    }

    fn from_body(index: usize, body: &Body) -> Self {
        Self {
            index: Some(index),
            imass: body.inverse_mass(),
            iitw: body.inverse_inertia_world(),
            world: body.world(),
            linear: body.speed(),
            angular: body.whirl(),
            ..Self::fixed()
        }
    }

    fn apply_impulse(&mut self, linear: Vec3, angular: Vec3, magnitude: f64) {
        if self.index.is_some() {
            self.delta_linear += linear * magnitude;
            self.delta_angular += angular * magnitude;
        }
    }

    fn apply_push_impulse(&mut self, linear: Vec3, angular: Vec3, magnitude: f64) {
        if self.index.is_some() {
            self.push += linear * magnitude;
            self.turn += angular * magnitude;
        }
    }
}

/// One-dimensional constraint along `normal` between two solver bodies.
#[derive(Debug, Clone)]
struct Constraint {
    a: usize,
    b: usize,
    normal: Vec3,
    relpos1_cross_normal: Vec3,
    relpos2_cross_normal: Vec3,
    angular_a: Vec3,
    angular_b: Vec3,
    applied: f64,
    applied_push: f64,
    friction: f64,
    jac_diag_inv: f64,
    rhs: f64,
    rhs_penetration: f64,
    cfm: f64,
    lower: f64,
    upper: f64,
    /// Manifold point this row came from, for warm-start write-back.
    origin: (PairId, usize),
}

/// Per-step scratch state; allocations are reused across steps.
#[derive(Debug, Clone)]
pub(crate) struct Solver {
    config: SolverConfig,
    bodies: Vec<SolverBody>,
    slots: FxHashMap<usize, usize>,
    contacts: Vec<Constraint>,
    frictions: Vec<Constraint>,
}

impl Solver {
    pub(crate) fn new(config: SolverConfig) -> Self {
        Self {
            config,
            bodies: Vec::new(),
            slots: FxHashMap::default(),
            contacts: Vec::new(),
            frictions: Vec::new(),
        }
    }

    /// Resolves every colliding pair and writes velocities (and, with split
    /// impulse, corrected transforms) back to the movable bodies involved.
    pub(crate) fn solve(
        &mut self,
        bodies: &mut [Body],
        index: &FxHashMap<BodyId, usize>,
        pairs: &mut BTreeMap<PairId, ContactPair>,
        dt: f64,
    ) {
        self.setup(bodies, index, pairs, dt);
        if self.contacts.is_empty() {
            return;
        }
        trace!(
            bodies = self.bodies.len() - 1,
            contacts = self.contacts.len(),
            "solving contacts"
        );
        self.iterate();
        self.finish(bodies, pairs, dt);
    }

    fn setup(
        &mut self,
        bodies: &[Body],
        index: &FxHashMap<BodyId, usize>,
        pairs: &BTreeMap<PairId, ContactPair>,
        dt: f64,
    ) {
        self.bodies.clear();
        self.bodies.push(SolverBody::fixed());
        self.slots.clear();
        self.contacts.clear();
        self.frictions.clear();

        for (pid, pair) in pairs.iter().filter(|(_, p)| p.is_colliding()) {
            let (id_a, id_b) = pair.bodies();
            let (Some(&ia), Some(&ib)) = (index.get(&id_a), index.get(&id_b)) else {
                continue;
            };
            if !bodies[ia].is_movable() && !bodies[ib].is_movable() {
                trace!(pair = %pid, "ignoring contact between immovable bodies");
                continue;
            }
            let sa = self.slot(ia, &bodies[ia]);
            let sb = self.slot(ib, &bodies[ib]);
            let (la, lb) = (bodies[ia].world().location(), bodies[ib].world().location());
            for (k, point) in pair.points().iter().enumerate() {
                let rel_a = point.world_a() - la;
                let rel_b = point.world_b() - lb;
                let (contact, velocity, rel_vel) = self.contact_row(
                    sa,
                    sb,
                    &bodies[ia],
                    &bodies[ib],
                    point,
                    rel_a,
                    rel_b,
                    dt,
                    (*pid, k),
                );
                self.contacts.push(contact);

                let lateral = velocity - point.normal() * rel_vel;
                let lateral_len2 = lateral.length_squared();
                let direction = if lateral_len2 > EPSILON {
                    lateral * (1.0 / lateral_len2.sqrt())
                } else {
                    point.normal().plane_space().0
                };
                let friction =
                    self.friction_row(sa, sb, direction, point.friction(), rel_a, rel_b, (*pid, k));
                self.frictions.push(friction);
            }
        }
    }

    /// Solver slot for the body at `index`, creating one for movable bodies.
    fn slot(&mut self, index: usize, body: &Body) -> usize {
        if !body.is_movable() {
            return FIXED;
        }
        if let Some(&slot) = self.slots.get(&index) {
            return slot;
        }
        let slot = self.bodies.len();
        self.bodies.push(SolverBody::from_body(index, body));
        self.slots.insert(index, slot);
        slot
    }

    /// Builds the non-penetration row for one manifold point and applies its
    /// warm-start impulse. Returns the row, the relative velocity at the
    /// contact, and that velocity's normal component.
    #[allow(clippy::too_many_arguments)]
    fn contact_row(
        &mut self,
        sa: usize,
        sb: usize,
        body_a: &Body,
        body_b: &Body,
        point: &crate::contact::ManifoldPoint,
        rel_a: Vec3,
        rel_b: Vec3,
        dt: f64,
        origin: (PairId, usize),
    ) -> (Constraint, Vec3, f64) {
        let cfg = &self.config;
        let normal = point.normal();
        let (im_a, iitw_a) = (self.bodies[sa].imass, self.bodies[sa].iitw);
        let (im_b, iitw_b) = (self.bodies[sb].imass, self.bodies[sb].iitw);

        let torque_a = rel_a.cross(&normal);
        let torque_b = rel_b.cross(&normal);
        let angular_a = iitw_a.mul_vec3(&torque_a);
        let angular_b = iitw_b.mul_vec3(&(-torque_b));
        let denom_a = im_a + normal.dot(&angular_a.cross(&rel_a));
        let denom_b = im_b + normal.dot(&(-angular_b).cross(&rel_b));
        let jac_diag_inv = inverse_or_zero(denom_a + denom_b);
        let relpos2_cross_normal = -torque_b;

        let velocity = body_a.velocity_at(&rel_a) - body_b.velocity_at(&rel_b);
        let rel_vel = normal.dot(&velocity);
        let restitution = (point.restitution() * -rel_vel).max(0.0);

        let applied = point.warm_impulse() * cfg.warmstarting_factor;
        self.bodies[sa].apply_impulse(normal * im_a, angular_a, applied);
        self.bodies[sb].apply_impulse(normal * im_b, -angular_b, -applied);

        let (ba, bb) = (&self.bodies[sa], &self.bodies[sb]);
        let vel1_dotn = normal.dot(&ba.linear) + torque_a.dot(&ba.angular);
        let vel2_dotn = (-normal).dot(&bb.linear) + relpos2_cross_normal.dot(&bb.angular);
        let mut velocity_error = restitution - (vel1_dotn + vel2_dotn);

        let penetration = point.distance() + cfg.linear_slop;
        let combined = !cfg.split_impulse || penetration > cfg.split_impulse_penetration_limit;
        let erp = if combined { cfg.erp } else { cfg.erp2 };
        let mut positional_error = 0.0;
        if penetration > 0.0 {
            velocity_error -= penetration / dt;
        } else {
            positional_error = -penetration * erp / dt;
        }
        let penetration_impulse = positional_error * jac_diag_inv;
        let velocity_impulse = velocity_error * jac_diag_inv;
        let (rhs, rhs_penetration) = if combined {
            (penetration_impulse + velocity_impulse, 0.0)
        } else {
            (velocity_impulse, penetration_impulse)
        };

        let row = Constraint {
            a: sa,
            b: sb,
            normal,
            relpos1_cross_normal: torque_a,
            relpos2_cross_normal,
            angular_a,
            angular_b,
            applied,
            applied_push: 0.0,
            friction: point.friction(),
            jac_diag_inv,
            rhs,
            rhs_penetration,
            cfm: 0.0,
            lower: 0.0,
            upper: IMPULSE_LIMIT,
            origin,
        };
        (row, velocity, rel_vel)
    }

    /// Builds the friction row along `direction`. Its limits are set during
    /// iteration from the matching contact row's impulse.
    #[allow(clippy::too_many_arguments)]
    fn friction_row(
        &self,
        sa: usize,
        sb: usize,
        direction: Vec3,
        friction: f64,
        rel_a: Vec3,
        rel_b: Vec3,
        origin: (PairId, usize),
    ) -> Constraint {
        let (ba, bb) = (&self.bodies[sa], &self.bodies[sb]);
        let relpos1_cross_normal = rel_a.cross(&direction);
        let relpos2_cross_normal = rel_b.cross(&(-direction));
        let angular_a = ba.iitw.mul_vec3(&relpos1_cross_normal);
        let angular_b = bb.iitw.mul_vec3(&relpos2_cross_normal);
        let denom_a = ba.imass + direction.dot(&angular_a.cross(&rel_a));
        let denom_b = bb.imass + direction.dot(&(-angular_b).cross(&rel_b));
        let jac_diag_inv = inverse_or_zero(denom_a + denom_b);

        let vel1_dotn = direction.dot(&ba.linear) + relpos1_cross_normal.dot(&ba.angular);
        let vel2_dotn = (-direction).dot(&bb.linear) + relpos2_cross_normal.dot(&bb.angular);
        Constraint {
            a: sa,
            b: sb,
            normal: direction,
            relpos1_cross_normal,
            relpos2_cross_normal,
            angular_a,
            angular_b,
            applied: 0.0,
            applied_push: 0.0,
            friction,
            jac_diag_inv,
            rhs: -(vel1_dotn + vel2_dotn) * jac_diag_inv,
            rhs_penetration: 0.0,
            cfm: 0.0,
            lower: 0.0,
            upper: IMPULSE_LIMIT,
            origin,
        }
    }

    fn iterate(&mut self) {
        let iterations = self.config.iterations;
        if self.config.split_impulse {
            for _ in 0..iterations {
                for row in &mut self.contacts {
                    resolve_split_penetration(&mut self.bodies, row);
                }
            }
        }
        for _ in 0..iterations {
            for row in &mut self.contacts {
                resolve(&mut self.bodies, row);
            }
            for (row, contact) in self.frictions.iter_mut().zip(&self.contacts) {
                let total = contact.applied;
                if total > 0.0 {
                    row.lower = -(row.friction * total);
                    row.upper = row.friction * total;
                    resolve(&mut self.bodies, row);
                }
            }
        }
    }

    fn finish(
        &mut self,
        bodies: &mut [Body],
        pairs: &mut BTreeMap<PairId, ContactPair>,
        dt: f64,
    ) {
        for row in &self.contacts {
            let (pid, k) = row.origin;
            if let Some(point) = pairs
                .get_mut(&pid)
                .and_then(|pair| pair.points_mut().get_mut(k))
            {
                point.set_warm_impulse(row.applied);
            }
        }

        let split = self.config.split_impulse;
        let turn_erp = self.config.split_impulse_turn_erp;
        for sb in &self.bodies {
            let Some(index) = sb.index else {
                continue;
            };
            let linear = sb.linear + sb.delta_linear;
            let angular = sb.angular + sb.delta_angular;
            let world = (split && !(sb.push.is_zero() && sb.turn.is_zero()))
                .then(|| sb.world.integrate(&sb.push, &(sb.turn * turn_erp), dt));
            bodies[index].write_back(linear, angular, world);
        }
    }
}

/// Relaxes one row against the accumulated velocity deltas, clamping the
/// total impulse to the row's limits.
fn resolve(bodies: &mut [SolverBody], row: &mut Constraint) {
    let (a, b) = (&bodies[row.a], &bodies[row.b]);
    let dv1 = row.normal.dot(&a.delta_linear) + row.relpos1_cross_normal.dot(&a.delta_angular);
    let dv2 = (-row.normal).dot(&b.delta_linear) + row.relpos2_cross_normal.dot(&b.delta_angular);
    let mut delta = row.rhs - row.applied * row.cfm;
    delta -= dv1 * row.jac_diag_inv;
    delta -= dv2 * row.jac_diag_inv;
    let sum = row.applied + delta;
    if sum < row.lower {
        delta = row.lower - row.applied;
        row.applied = row.lower;
    } else if sum > row.upper {
        delta = row.upper - row.applied;
        row.applied = row.upper;
    } else {
        row.applied = sum;
    }
    let (im_a, im_b) = (bodies[row.a].imass, bodies[row.b].imass);
    bodies[row.a].apply_impulse(row.normal * im_a, row.angular_a, delta);
    bodies[row.b].apply_impulse(-row.normal * im_b, row.angular_b, delta);
}

/// Relaxes the positional part of a deep contact into push/turn velocities.
fn resolve_split_penetration(bodies: &mut [SolverBody], row: &mut Constraint) {
    if row.rhs_penetration == 0.0 {
        return;
    }
    let (a, b) = (&bodies[row.a], &bodies[row.b]);
    let dv1 = row.normal.dot(&a.push) + row.relpos1_cross_normal.dot(&a.turn);
    let dv2 = (-row.normal).dot(&b.push) + row.relpos2_cross_normal.dot(&b.turn);
    let mut delta = row.rhs_penetration - row.applied_push * row.cfm;
    delta -= dv1 * row.jac_diag_inv;
    delta -= dv2 * row.jac_diag_inv;
    let sum = row.applied_push + delta;
    if sum < row.lower {
        delta = row.lower - row.applied_push;
        row.applied_push = row.lower;
    } else {
        row.applied_push = sum;
    }
    let (im_a, im_b) = (bodies[row.a].imass, bodies[row.b].imass);
    bodies[row.a].apply_push_impulse(row.normal * im_a, row.angular_a, delta);
    bodies[row.b].apply_push_impulse(-row.normal * im_b, row.angular_b, delta);
}

fn inverse_or_zero(value: f64) -> f64 {
    if value.abs() <= f64::EPSILON || !value.is_finite() {
        0.0
    } else {
        1.0 / value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contact::Contact;
    use crate::shape::Shape;

    fn pair_of(a: &Body, b: &Body, contacts: &[Contact]) -> BTreeMap<PairId, ContactPair> {
        let mut pair = ContactPair::new(a.id(), b.id(), 0.02);
        pair.merge(contacts, a, b, 100.0);
        pair.set_colliding(true);
        BTreeMap::from([(pair.id(), pair)])
    }

    fn index_of(bodies: &[Body]) -> FxHashMap<BodyId, usize> {
        bodies.iter().enumerate().map(|(i, b)| (b.id(), i)).collect()
    }

    #[test]
    fn stops_a_body_falling_onto_a_fixed_one() {
        let mut ball = Body::new(Shape::sphere(0.5));
        ball.set_material(1.0, 0.0).set_friction(0.0);
        ball.push(0.0, -2.0, 0.0);
        let ground = Body::new(Shape::plane(Vec3::UNIT_Y));
        let contact = Contact {
            point: Vec3::new(0.0, 0.0, 0.0),
            normal: Vec3::UNIT_Y,
            depth: 0.0,
        };
        ball.set_location(Vec3::new(0.0, 0.5, 0.0));
        let mut pairs = pair_of(&ball, &ground, &[contact]);
        let mut bodies = vec![ball, ground];
        let index = index_of(&bodies);
        let mut solver = Solver::new(SolverConfig::default());
        solver.solve(&mut bodies, &index, &mut pairs, 1.0 / 60.0);
        assert!(bodies[0].speed().y().abs() < 1e-9);
        assert_eq!(bodies[1].speed(), Vec3::ZERO);
        let warm = pairs.values().next().map(|p| p.points()[0].warm_impulse());
        assert!(warm.is_some_and(|w| (w - 2.0).abs() < 1e-9));
    }

    #[test]
    fn friction_is_bounded_by_the_normal_impulse() {
        let mut ball = Body::new(Shape::sphere(0.5));
        ball.set_material(1.0, 0.0).set_friction(0.5);
        ball.push(5.0, -2.0, 0.0);
        ball.set_location(Vec3::new(0.0, 0.5, 0.0));
        let mut ground = Body::new(Shape::plane(Vec3::UNIT_Y));
        ground.set_friction(0.5);
        let contact = Contact {
            point: Vec3::ZERO,
            normal: Vec3::UNIT_Y,
            depth: 0.0,
        };
        let mut pairs = pair_of(&ball, &ground, &[contact]);
        let mut bodies = vec![ball, ground];
        let index = index_of(&bodies);
        Solver::new(SolverConfig::default()).solve(&mut bodies, &index, &mut pairs, 1.0 / 60.0);
        // Normal impulse 2 stops the fall; friction 0.25 * 2 slows the slide.
        assert!(bodies[0].speed().y().abs() < 1e-9);
        assert!((bodies[0].speed().x() - 4.5).abs() < 1e-9);
        assert!(bodies[0].whirl().z() < 0.0);
    }

    #[test]
    fn separating_contacts_apply_no_impulse() {
        let mut ball = Body::new(Shape::sphere(0.5));
        ball.set_material(1.0, 0.0);
        ball.push(0.0, 3.0, 0.0);
        ball.set_location(Vec3::new(0.0, 0.5, 0.0));
        let ground = Body::new(Shape::plane(Vec3::UNIT_Y));
        let contact = Contact {
            point: Vec3::ZERO,
            normal: Vec3::UNIT_Y,
            depth: 0.0,
        };
        let mut pairs = pair_of(&ball, &ground, &[contact]);
        let mut bodies = vec![ball, ground];
        let index = index_of(&bodies);
        Solver::new(SolverConfig::default()).solve(&mut bodies, &index, &mut pairs, 0.01);
        assert!((bodies[0].speed().y() - 3.0).abs() < 1e-12);
    }

    #[test]
    fn deep_penetration_moves_the_transform() {
        let mut ball = Body::new(Shape::sphere(0.5));
        ball.set_material(1.0, 0.0);
        ball.set_location(Vec3::new(0.0, 0.3, 0.0));
        let ground = Body::new(Shape::plane(Vec3::UNIT_Y));
        let contact = Contact {
            point: Vec3::ZERO,
            normal: Vec3::UNIT_Y,
            depth: -0.2,
        };
        let mut pairs = pair_of(&ball, &ground, &[contact]);
        let mut bodies = vec![ball, ground];
        let index = index_of(&bodies);
        Solver::new(SolverConfig::default()).solve(&mut bodies, &index, &mut pairs, 0.1);
        assert!(bodies[0].world().location().y() > 0.3);
        // Push velocity never leaks into the real velocity.
        assert!(bodies[0].speed().y().abs() < 1e-9);
    }

    #[test]
    fn static_pairs_are_skipped() {
        let a = Body::new(Shape::sphere(1.0));
        let b = Body::new(Shape::sphere(1.0));
        let contact = Contact {
            point: Vec3::ZERO,
            normal: Vec3::UNIT_X,
            depth: -0.5,
        };
        let mut pairs = pair_of(&a, &b, &[contact]);
        let mut bodies = vec![a, b];
        let index = index_of(&bodies);
        Solver::new(SolverConfig::default()).solve(&mut bodies, &index, &mut pairs, 0.1);
        assert!(pairs.values().all(|p| p.points()[0].warm_impulse() == 0.0));
    }
}
