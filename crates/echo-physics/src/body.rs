// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
use std::cell::Cell;
use std::f64::consts::FRAC_PI_2 as HALF_PI;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU32, Ordering};

use echo_geom::{Aabb, Mat3, Quat, Transform, Vec3, EPSILON};
use tracing::warn;

use crate::shape::Shape;

/// World transform record shared between a body and external observers.
///
/// The simulation writes the cell in place each step, so anyone holding a
/// clone of the handle sees the new transform without re-querying the body.
pub type SharedTransform = Rc<Cell<Transform>>;

static NEXT_BODY_ID: AtomicU32 = AtomicU32::new(1);

/// Unique body identity, assigned monotonically at construction.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyId(u32);

impl BodyId {
    fn next() -> Self {
        let raw = NEXT_BODY_ID.fetch_add(1, Ordering::Relaxed);
        if raw == u32::MAX {
            warn!("body id space exhausted; ids will repeat");
        }
        Self(raw)
    }

    /// Raw numeric id.
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[cfg(test)]
    pub(crate) const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }
}

impl fmt::Display for BodyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "body#{}", self.0)
    }
}

/// Rigid body: a shape plus mass, material, transforms, and motion state.
///
/// Invariants:
/// - A body that is not movable has zero inverse mass and zero inverse inertia.
/// - The world transform of a movable body only changes inside
///   [`Mover::step`](crate::Mover::step), apart from explicit placement calls.
/// - Bodies never reference one another; pairs refer to them by [`BodyId`].
#[derive(Debug)]
pub struct Body {
    id: BodyId,
    shape: Shape,
    world: SharedTransform,
    guess: Transform,
    movable: bool,
    mass: f64,
    imass: f64,
    friction: f64,
    restitution: f64,
    lvel: Vec3,
    lfor: Vec3,
    ldamp: f64,
    avel: Vec3,
    afor: Vec3,
    adamp: f64,
    iit: Vec3,
    iitw: Mat3,
}

impl Body {
    /// Friction coefficient given to new bodies.
    pub const DEFAULT_FRICTION: f64 = 0.5;

    /// Creates an immovable body at the origin with unit mass, no bounce,
    /// and default friction. Call [`Body::set_material`] to make it movable.
    pub fn new(shape: Shape) -> Self {
        Self {
            id: BodyId::next(),
            shape,
            world: Rc::new(Cell::new(Transform::identity())),
            guess: Transform::identity(),
            movable: false,
            mass: 1.0,
            imass: 0.0,
            friction: Self::DEFAULT_FRICTION,
            restitution: 0.0,
            lvel: Vec3::ZERO,
            lfor: Vec3::ZERO,
            ldamp: 0.0,
            avel: Vec3::ZERO,
            afor: Vec3::ZERO,
            adamp: 0.0,
            iit: Vec3::ZERO,
            iitw: Mat3::zero(),
        }
    }

    /// Unique identity.
    pub fn id(&self) -> BodyId {
        self.id
    }

    /// Collision shape.
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Current world transform.
    pub fn world(&self) -> Transform {
        self.world.get()
    }

    /// Handle to the shared world transform record.
    pub fn world_handle(&self) -> SharedTransform {
        Rc::clone(&self.world)
    }

    /// Binds the body to an externally owned transform record.
    ///
    /// The record's current value becomes the body's placement and every
    /// later step writes into it in place.
    pub fn set_world(&mut self, world: SharedTransform) {
        self.world = world;
        self.guess = self.world.get();
        self.update_inertia_tensor();
    }

    /// Moves the body, keeping its orientation.
    pub fn set_location(&mut self, location: Vec3) {
        let mut t = self.world.get();
        t.set_location(location);
        self.place(t);
    }

    /// Re-orients the body, keeping its location.
    pub fn set_rotation(&mut self, rotation: Quat) {
        let mut t = self.world.get();
        t.set_rotation(rotation);
        self.place(t);
    }

    /// Replaces the world transform in place.
    pub fn place(&mut self, world: Transform) {
        self.world.set(world);
        self.guess = world;
        self.update_inertia_tensor();
    }

    /// Predicted transform computed during the current step.
    pub fn guess(&self) -> Transform {
        self.guess
    }

    /// Sets mass and restitution.
    ///
    /// A positive mass on a shape with volume makes the body movable with
    /// inverse mass `1/mass`. Any other combination leaves it immovable.
    pub fn set_material(&mut self, mass: f64, bounce: f64) -> &mut Self {
        self.restitution = bounce;
        self.mass = mass;
        self.imass = 0.0;
        self.iit = Vec3::ZERO;
        if mass > EPSILON && mass.is_finite() {
            if let Some(inertia) = self.shape.inertia(mass) {
                self.imass = 1.0 / mass;
                self.iit = Vec3::new(
                    invert(inertia.x()),
                    invert(inertia.y()),
                    invert(inertia.z()),
                );
            }
        }
        self.movable = self.imass > 0.0;
        if !self.movable {
            self.lvel = Vec3::ZERO;
            self.avel = Vec3::ZERO;
        }
        self.update_inertia_tensor();
        self
    }

    /// Sets the friction coefficient, clamped to `[0, 1]`.
    pub fn set_friction(&mut self, friction: f64) -> &mut Self {
        self.friction = friction.clamp(0.0, 1.0);
        self
    }

    /// Sets per-second linear and angular damping, each clamped to `[0, 1]`.
    pub fn set_damping(&mut self, linear: f64, angular: f64) -> &mut Self {
        self.ldamp = linear.clamp(0.0, 1.0);
        self.adamp = angular.clamp(0.0, 1.0);
        self
    }

    /// Adds to the linear velocity.
    pub fn push(&mut self, dx: f64, dy: f64, dz: f64) {
        self.lvel += Vec3::new(dx, dy, dz);
    }

    /// Adds to the angular velocity.
    pub fn turn(&mut self, dx: f64, dy: f64, dz: f64) {
        self.avel += Vec3::new(dx, dy, dz);
    }

    /// Zeroes the linear velocity.
    pub fn stop(&mut self) {
        self.lvel = Vec3::ZERO;
    }

    /// Zeroes the angular velocity.
    pub fn rest(&mut self) {
        self.avel = Vec3::ZERO;
    }

    /// Accumulates a force for the next step.
    pub fn apply_force(&mut self, force: Vec3) {
        self.lfor += force;
    }

    /// Accumulates a torque for the next step.
    pub fn apply_torque(&mut self, torque: Vec3) {
        self.afor += torque;
    }

    /// Drops accumulated force and torque.
    pub fn clear_forces(&mut self) {
        self.lfor = Vec3::ZERO;
        self.afor = Vec3::ZERO;
    }

    /// Linear velocity.
    pub fn speed(&self) -> Vec3 {
        self.lvel
    }

    /// Angular velocity.
    pub fn whirl(&self) -> Vec3 {
        self.avel
    }

    /// Accumulated force.
    pub fn force(&self) -> Vec3 {
        self.lfor
    }

    /// Accumulated torque.
    pub fn torque(&self) -> Vec3 {
        self.afor
    }

    /// Mass as last given to [`Body::set_material`].
    pub fn mass(&self) -> f64 {
        self.mass
    }

    /// Inverse mass; zero for immovable bodies.
    pub fn inverse_mass(&self) -> f64 {
        self.imass
    }

    /// Restitution.
    pub fn bounce(&self) -> f64 {
        self.restitution
    }

    /// Friction coefficient.
    pub fn friction(&self) -> f64 {
        self.friction
    }

    /// Whether the simulation integrates this body.
    pub fn is_movable(&self) -> bool {
        self.movable
    }

    /// World-space inverse inertia tensor.
    pub fn inverse_inertia_world(&self) -> Mat3 {
        self.iitw
    }

    /// Bounding box around the current world transform, padded by `margin`.
    pub fn aabb(&self, margin: f64) -> Option<Aabb> {
        self.shape.aabb(&self.world.get(), margin)
    }

    pub(crate) fn predicted_aabb(&self, margin: f64) -> Option<Aabb> {
        self.shape.aabb(&self.guess, margin)
    }

    pub(crate) fn apply_gravity(&mut self, gravity: f64) {
        // Unit-mass gravity: the force is not scaled by mass.
        self.lfor += Vec3::new(0.0, gravity, 0.0);
    }

    pub(crate) fn integrate_velocities(&mut self, dt: f64) {
        if !self.movable {
            return;
        }
        self.lvel += self.lfor.scale(self.imass * dt);
        self.avel += self.iitw.mul_vec3(&self.afor).scale(dt);
        let spin = self.avel.length();
        if spin * dt > HALF_PI {
            self.avel = self.avel.scale(HALF_PI / dt / spin);
        }
    }

    pub(crate) fn apply_damping(&mut self, dt: f64) {
        self.lvel *= (1.0 - self.ldamp).powf(dt);
        self.avel *= (1.0 - self.adamp).powf(dt);
    }

    pub(crate) fn update_predicted_transform(&mut self, dt: f64) {
        self.guess = self.world.get().integrate(&self.lvel, &self.avel, dt);
    }

    pub(crate) fn reset_predicted_transform(&mut self) {
        self.guess = self.world.get();
    }

    pub(crate) fn update_world_transform(&mut self, dt: f64) {
        let next = self.world.get().integrate(&self.lvel, &self.avel, dt);
        self.world.set(next);
        self.update_inertia_tensor();
    }

    pub(crate) fn write_back(&mut self, linear: Vec3, angular: Vec3, world: Option<Transform>) {
        self.lvel = linear;
        self.avel = angular;
        if let Some(world) = world {
            self.world.set(world);
        }
    }

    fn update_inertia_tensor(&mut self) {
        let rot = self.world.get().rotation().to_mat3();
        self.iitw = rot
            .multiply(&Mat3::from_diagonal(self.iit))
            .multiply(&rot.transpose());
    }

    pub(crate) fn velocity_at(&self, rel: &Vec3) -> Vec3 {
        self.avel.cross(rel).add(&self.lvel)
    }

    pub(crate) fn combined_friction(&self, other: &Self, max_friction: f64) -> f64 {
        (self.friction * other.friction).clamp(-max_friction, max_friction)
    }

    pub(crate) fn combined_restitution(&self, other: &Self) -> f64 {
        self.restitution * other.restitution
    }
}

fn invert(value: f64) -> f64 {
    if value.abs() <= EPSILON {
        0.0
    } else {
        1.0 / value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Vec3, b: [f64; 3], tol: f64) -> bool {
        let a = a.to_array();
        (0..3).all(|i| (a[i] - b[i]).abs() < tol)
    }

    #[test]
    fn material_sets_inverse_mass_and_inertia() {
        let mut body = Body::new(Shape::sphere(1.0));
        body.set_material(0.5, 0.8);
        assert!(body.is_movable());
        assert!((body.inverse_mass() - 2.0).abs() < 1e-12);
        assert!(close(body.iit, [5.0, 5.0, 5.0], 1e-9));
        assert!((body.bounce() - 0.8).abs() < 1e-12);
    }

    #[test]
    fn non_positive_mass_is_immovable() {
        let mut body = Body::new(Shape::cuboid(1.0, 1.0, 1.0));
        body.push(1.0, 0.0, 0.0);
        body.set_material(-3.0, 0.0);
        assert!(!body.is_movable());
        assert!(body.inverse_mass().abs() < f64::EPSILON);
        assert_eq!(body.speed(), Vec3::ZERO);
        let mut plane = Body::new(Shape::plane(Vec3::UNIT_Y));
        plane.set_material(10.0, 0.0);
        assert!(!plane.is_movable());
    }

    #[test]
    fn integrates_force_into_velocity() {
        let mut body = Body::new(Shape::sphere(1.0));
        body.set_material(1.0, 0.0);
        body.apply_force(Vec3::splat(1.0));
        body.push(2.0, 2.0, 2.0);
        body.integrate_velocities(0.2);
        assert!(close(body.speed(), [2.2, 2.2, 2.2], 1e-12));
    }

    #[test]
    fn friction_and_damping_stay_in_unit_range() {
        let mut body = Body::new(Shape::sphere(1.0));
        body.set_friction(3.0).set_damping(-1.0, 2.0);
        assert!((body.friction() - 1.0).abs() < f64::EPSILON);
        assert!(body.ldamp.abs() < f64::EPSILON);
        assert!((body.adamp - 1.0).abs() < f64::EPSILON);
        body.set_friction(-0.5);
        assert!(body.friction().abs() < f64::EPSILON);
    }

    #[test]
    fn combined_coefficients_multiply_and_clamp() {
        let mut a = Body::new(Shape::sphere(1.0));
        let mut b = Body::new(Shape::sphere(1.0));
        a.set_material(1.0, 0.5).set_friction(0.8);
        b.set_material(1.0, 0.5).set_friction(0.5);
        assert!((a.combined_friction(&b, 100.0) - 0.4).abs() < 1e-12);
        assert!((a.combined_friction(&b, 0.1) - 0.1).abs() < 1e-12);
        assert!((a.combined_restitution(&b) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn immovable_bodies_ignore_forces() {
        let mut body = Body::new(Shape::sphere(1.0));
        body.apply_gravity(-10.0);
        body.integrate_velocities(0.2);
        assert_eq!(body.speed(), Vec3::ZERO);
    }

    #[test]
    fn damping_decays_velocity() {
        let mut body = Body::new(Shape::sphere(1.0));
        body.set_material(1.0, 0.0).set_damping(0.5, 0.5);
        body.push(2.0, 2.0, 2.0);
        body.turn(3.0, 3.0, 3.0);
        body.apply_damping(0.2);
        let factor = 0.5_f64.powf(0.2);
        assert!(close(body.speed(), [2.0 * factor; 3], 1e-12));
        assert!(close(body.whirl(), [3.0 * factor; 3], 1e-12));
        assert!((body.speed().x() - 1.741).abs() < 1e-3);
    }

    #[test]
    fn prediction_leaves_world_untouched() {
        let mut body = Body::new(Shape::sphere(1.0));
        body.set_material(1.0, 0.0);
        body.push(2.0, 2.0, 2.0);
        body.turn(3.0, 3.0, 3.0);
        body.update_predicted_transform(0.2);
        assert!(close(body.guess().location(), [0.4, 0.4, 0.4], 1e-12));
        assert_ne!(body.guess().rotation(), Quat::identity());
        assert_eq!(body.world(), Transform::identity());
    }

    #[test]
    fn shared_world_is_written_in_place() {
        let external: SharedTransform = Rc::new(Cell::new(Transform::from_location(Vec3::UNIT_Y)));
        let mut body = Body::new(Shape::sphere(1.0));
        body.set_world(Rc::clone(&external));
        body.set_material(1.0, 0.0);
        body.push(1.0, 0.0, 0.0);
        body.update_world_transform(0.5);
        assert!(close(external.get().location(), [0.5, 1.0, 0.0], 1e-12));
    }

    #[test]
    fn ids_are_unique_and_increasing() {
        let a = Body::new(Shape::sphere(1.0));
        let b = Body::new(Shape::sphere(1.0));
        assert!(b.id() > a.id());
    }
}
