// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

use std::f64::consts::FRAC_PI_4;

use crate::math::{Quat, Vec3};

/// Largest rotation, in radians, that [`Transform::integrate`] applies in a
/// single call. Faster spins are clamped to keep the exponential map stable.
pub const ANGULAR_MOTION_LIMIT: f64 = FRAC_PI_4;

/// Rigid transform (location + orientation) placing a body in world space.
///
/// Conventions:
/// - `location` in meters (world space).
/// - `rotation` as a unit quaternion; [`Transform::integrate`] renormalizes.
/// - Points map local → world as `R·p + t`.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct Transform {
    location: Vec3,
    rotation: Quat,
}

impl Transform {
    /// Identity transform (no translation, no rotation).
    #[must_use]
    pub const fn identity() -> Self {
        Self {
            location: Vec3::ZERO,
            rotation: Quat::identity(),
        }
    }

    /// Creates a transform from components.
    #[must_use]
    pub const fn new(location: Vec3, rotation: Quat) -> Self {
        Self { location, rotation }
    }

    /// Translation-only transform.
    #[must_use]
    pub const fn from_location(location: Vec3) -> Self {
        Self::new(location, Quat::identity())
    }

    /// Location component.
    #[must_use]
    pub fn location(&self) -> Vec3 {
        self.location
    }

    /// Rotation component.
    #[must_use]
    pub fn rotation(&self) -> Quat {
        self.rotation
    }

    /// Replaces the location.
    pub fn set_location(&mut self, location: Vec3) {
        self.location = location;
    }

    /// Replaces the rotation (normalized).
    pub fn set_rotation(&mut self, rotation: Quat) {
        self.rotation = rotation.normalize();
    }

    /// Maps a local point into world space.
    #[must_use]
    pub fn apply(&self, point: &Vec3) -> Vec3 {
        self.rotation.rotate(point).add(&self.location)
    }

    /// Rotates a local direction into world space (no translation).
    #[must_use]
    pub fn apply_rotation(&self, direction: &Vec3) -> Vec3 {
        self.rotation.rotate(direction)
    }

    /// Maps a world point into this transform's local space.
    #[must_use]
    pub fn inverse_apply(&self, point: &Vec3) -> Vec3 {
        self.rotation.inverse_rotate(&point.sub(&self.location))
    }

    /// Rotates a world direction into this transform's local space.
    #[must_use]
    pub fn inverse_apply_rotation(&self, direction: &Vec3) -> Vec3 {
        self.rotation.inverse_rotate(direction)
    }

    /// Advances the transform by linear velocity `linear` and angular
    /// velocity `angular` (world space, radians per second) over `dt`.
    ///
    /// Rotation uses the exponential map with a Taylor expansion for small
    /// angles. The rotation per call is clamped to [`ANGULAR_MOTION_LIMIT`].
    #[must_use]
    pub fn integrate(&self, linear: &Vec3, angular: &Vec3, dt: f64) -> Self {
        let location = self.location.add(&linear.scale(dt));

        let mut spin_rate = *angular;
        let mut angle = spin_rate.length();
        if angle * dt > ANGULAR_MOTION_LIMIT {
            spin_rate = spin_rate.scale(ANGULAR_MOTION_LIMIT / (angle * dt));
            angle = ANGULAR_MOTION_LIMIT / dt;
        }
        let fac = if angle < 0.001 {
            // Taylor expansion of sin(a·dt/2)/a.
            0.5 * dt - (dt * dt * dt) * 0.020_833_333_333 * angle * angle
        } else {
            (0.5 * angle * dt).sin() / angle
        };
        let axis = spin_rate.scale(fac);
        let spin = Quat::new(axis.x(), axis.y(), axis.z(), (angle * dt * 0.5).cos());
        let rotation = spin.multiply(&self.rotation).normalize();
        Self { location, rotation }
    }
}
