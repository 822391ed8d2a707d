// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
use std::collections::BTreeMap;

use echo_geom::Vec3;
use rustc_hash::FxHashMap;
use tracing::{debug, instrument, trace, warn};

use crate::body::{Body, BodyId};
use crate::broad;
use crate::caster;
use crate::config::{ConfigError, PhysicsConfig};
use crate::contact::{Contact, ContactPair, PairId, MANIFOLD_CAPACITY};
use crate::narrow::{Collider, ContactParams, Order};
use crate::solver::Solver;

/// Physics world driver.
///
/// Owns the overlap map (tracked pairs and their manifolds) and the solver
/// scratch state. Bodies stay with the caller and are passed to every
/// [`Mover::step`]; pairs refer to them by [`BodyId`] only.
///
/// # Examples
/// ```
/// use echo_physics::{Body, Mover, Shape, Vec3};
///
/// let mut ground = Body::new(Shape::plane(Vec3::UNIT_Y));
/// let mut ball = Body::new(Shape::sphere(0.5));
/// ball.set_material(1.0, 0.0).set_location(Vec3::new(0.0, 2.0, 0.0));
/// ground.set_location(Vec3::ZERO);
///
/// let mut bodies = [ground, ball];
/// let mut mover = Mover::new();
/// for _ in 0..120 {
///     mover.step(&mut bodies, 1.0 / 60.0);
/// }
/// assert!(bodies[1].world().location().y() < 2.0);
/// ```
#[derive(Debug, Clone)]
pub struct Mover {
    config: PhysicsConfig,
    collider: Collider,
    solver: Solver,
    pairs: BTreeMap<PairId, ContactPair>,
    index: FxHashMap<BodyId, usize>,
    scratch: Vec<Contact>,
}

impl Default for Mover {
    fn default() -> Self {
        Self::new()
    }
}

impl Mover {
    /// Mover with the default configuration.
    pub fn new() -> Self {
        Self::build(PhysicsConfig::default())
    }

    /// Mover with a validated custom configuration.
    ///
    /// # Errors
    /// Returns the first [`ConfigError`] found in `config`.
    pub fn with_config(config: PhysicsConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: PhysicsConfig) -> Self {
        Self {
            config,
            collider: Collider::new(),
            solver: Solver::new(config.solver),
            pairs: BTreeMap::new(),
            index: FxHashMap::default(),
            scratch: Vec::with_capacity(MANIFOLD_CAPACITY * 2),
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    /// Advances `bodies` by `dt` seconds.
    ///
    /// Predicts motion, refreshes tracked pairs and their manifolds, solves
    /// contacts, commits world transforms, and clears accumulated forces. A
    /// `dt` that is not a positive finite number leaves everything untouched.
    #[instrument(level = "trace", skip_all, fields(bodies = bodies.len(), dt))]
    pub fn step(&mut self, bodies: &mut [Body], dt: f64) {
        if dt <= 0.0 || !dt.is_finite() {
            debug!(dt, "ignoring step with non-positive timestep");
            return;
        }
        self.index.clear();
        self.index
            .extend(bodies.iter().enumerate().map(|(i, b)| (b.id(), i)));
        broad::purge_missing(&mut self.pairs, &self.index);

        self.predict(bodies, dt);
        broad::update_pairs(
            bodies,
            &mut self.pairs,
            self.config.margin,
            self.config.breaking_limit,
        );
        if self.narrowphase(bodies) {
            self.solver.solve(bodies, &self.index, &mut self.pairs, dt);
        }

        for body in bodies.iter_mut() {
            if body.is_movable() {
                body.update_world_transform(dt);
            }
            body.clear_forces();
        }
    }

    fn predict(&self, bodies: &mut [Body], dt: f64) {
        for body in bodies.iter_mut() {
            if body.is_movable() {
                body.apply_gravity(self.config.gravity);
                body.integrate_velocities(dt);
                body.apply_damping(dt);
                body.update_predicted_transform(dt);
            } else {
                body.reset_predicted_transform();
            }
        }
    }

    /// Runs the collision algorithm for every tracked pair and folds the
    /// results into the manifolds. Returns `true` if any pair is touching.
    fn narrowphase(&mut self, bodies: &[Body]) -> bool {
        let params = ContactParams::from_config(&self.config);
        let max_friction = self.config.max_friction;
        let mut touching = 0_usize;
        for pair in self.pairs.values_mut() {
            let (id_a, id_b) = pair.bodies();
            let (Some(&ia), Some(&ib)) = (self.index.get(&id_a), self.index.get(&id_b)) else {
                continue;
            };
            let (mut a, mut b) = (&bodies[ia], &bodies[ib]);
            if self.collider.collide(a, b, &params, &mut self.scratch) == Order::Swapped {
                pair.swap();
                std::mem::swap(&mut a, &mut b);
            }
            if self.scratch.is_empty() {
                pair.set_colliding(false);
                continue;
            }
            pair.set_colliding(true);
            pair.refresh(&a.world(), &b.world());
            pair.merge(&self.scratch, a, b, max_friction);
            touching += 1;
        }
        trace!(pairs = self.pairs.len(), touching, "narrowphase done");
        touching > 0
    }

    /// Returns `true` if `a` and `b` touch right now.
    ///
    /// Runs the collision algorithm once outside the tracked-pair lifecycle.
    /// No body or pair state changes, and the answer does not depend on
    /// argument order.
    pub fn collide(&self, a: &Body, b: &Body) -> bool {
        let params = ContactParams::from_config(&self.config);
        let mut contacts = Vec::with_capacity(MANIFOLD_CAPACITY);
        self.collider.collide(a, b, &params, &mut contacts);
        !contacts.is_empty()
    }

    /// Nearest world-space point where the `ray` body's ray meets `body`.
    pub fn cast(&self, ray: &Body, body: &Body) -> Option<Vec3> {
        caster::cast(ray, body)
    }

    /// Sets the Y acceleration applied from the next step on.
    pub fn set_gravity(&mut self, gravity: f64) {
        if !gravity.is_finite() {
            warn!(gravity, "ignoring non-finite gravity");
            return;
        }
        self.config.gravity = gravity;
    }

    /// Current gravity.
    pub fn gravity(&self) -> f64 {
        self.config.gravity
    }

    /// Sets the broadphase and collision margin from the next step on.
    /// Negative values are clamped to zero.
    pub fn set_margin(&mut self, margin: f64) {
        if !margin.is_finite() {
            warn!(margin, "ignoring non-finite margin");
            return;
        }
        if margin < 0.0 {
            warn!(margin, "negative margin clamped to zero");
        }
        self.config.margin = margin.max(0.0);
    }

    /// Current margin.
    pub fn margin(&self) -> f64 {
        self.config.margin
    }

    /// Tracked pair for `a` and `b`, in either order.
    pub fn pair(&self, a: BodyId, b: BodyId) -> Option<&ContactPair> {
        self.pairs.get(&PairId::new(a, b))
    }

    /// Every tracked pair in [`PairId`] order.
    pub fn pairs(&self) -> impl Iterator<Item = &ContactPair> + '_ {
        self.pairs.values()
    }

    /// Number of tracked pairs.
    pub fn pair_count(&self) -> usize {
        self.pairs.len()
    }

    /// Drops every tracked pair that involves `body`.
    ///
    /// Call when destroying a body so no cached manifold outlives it.
    /// Returns the number of pairs removed.
    pub fn forget(&mut self, body: BodyId) -> usize {
        let removed = broad::purge_body(&mut self.pairs, body);
        if removed > 0 {
            debug!(%body, removed, "forgot pairs for destroyed body");
        }
        removed
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use crate::config::SolverConfig;
    use crate::shape::Shape;

    #[test]
    fn margin_is_never_negative() {
        let mut mover = Mover::new();
        mover.set_margin(-1.0);
        assert!(mover.margin().abs() < f64::EPSILON);
        mover.set_margin(f64::NAN);
        assert!(mover.margin().abs() < f64::EPSILON);
        mover.set_margin(0.1);
        assert!((mover.margin() - 0.1).abs() < f64::EPSILON);
    }

    #[test]
    fn rejects_invalid_configs() {
        let config = PhysicsConfig {
            margin: f64::INFINITY,
            ..PhysicsConfig::default()
        };
        assert!(Mover::with_config(config).is_err());
    }

    #[test]
    fn without_split_impulse_deep_contacts_gain_velocity() {
        let mut ground = Body::new(Shape::plane(Vec3::UNIT_Y));
        ground.set_location(Vec3::ZERO);
        let mut ball = Body::new(Shape::sphere(0.5));
        ball.set_material(1.0, 0.0);
        ball.set_location(Vec3::new(0.0, 0.3, 0.0));
        let mut bodies = [ground, ball];

        let config = PhysicsConfig {
            gravity: 0.0,
            solver: SolverConfig {
                split_impulse: false,
                ..SolverConfig::default()
            },
            ..PhysicsConfig::default()
        };
        let mut mover = Mover::with_config(config).expect("valid config");
        mover.step(&mut bodies, 0.1);
        assert!(bodies[1].speed().y() > 0.0);
    }
}
