// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Narrowphase: exact contact generation per shape pair.
//!
//! Every `(ShapeKind, ShapeKind)` combination maps to one [`CollideFn`] in a
//! fixed table. Mirrored combinations (box-sphere, plane-box, ...) delegate to
//! the canonical algorithm with the operands exchanged and report
//! [`Order::Swapped`], so callers know which body the contacts treat as A.

use tracing::trace;

use crate::body::Body;
use crate::config::PhysicsConfig;
use crate::contact::Contact;
use crate::shape::ShapeKind;

mod cuboid;
mod plane;
mod sphere;

pub use cuboid::collide_box_box;
pub use plane::{collide_box_plane, collide_plane_box, collide_plane_sphere, collide_sphere_plane};
pub use sphere::{collide_box_sphere, collide_sphere_box, collide_sphere_sphere};

/// Which operand the produced contacts treat as body A.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Order {
    /// The first argument is A.
    Kept,
    /// The second argument is A.
    Swapped,
}

/// Distances the collision algorithms need.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ContactParams {
    /// Collision skin around boxes, and the detection tolerance for planes.
    pub margin: f64,
    /// Extra reach for sphere-box contacts beyond touching.
    pub contact_distance: f64,
}

impl ContactParams {
    /// Parameters taken from a world configuration.
    pub fn from_config(config: &PhysicsConfig) -> Self {
        Self {
            margin: config.margin,
            contact_distance: config.contact_distance,
        }
    }
}

impl Default for ContactParams {
    fn default() -> Self {
        Self::from_config(&PhysicsConfig::default())
    }
}

/// Shape-pair collision algorithm.
///
/// Appends zero or more contacts to `out` (which the caller clears) and
/// reports which operand ended up as A. Contacts never alter either body.
pub type CollideFn = fn(&Body, &Body, &ContactParams, &mut Vec<Contact>) -> Order;

/// Dispatch table from shape-kind pairs to collision algorithms.
#[derive(Debug, Clone)]
pub struct Collider {
    table: [[CollideFn; ShapeKind::COUNT]; ShapeKind::COUNT],
}

impl Default for Collider {
    fn default() -> Self {
        Self::new()
    }
}

impl Collider {
    /// Table with every built-in algorithm registered.
    pub fn new() -> Self {
        let mut table: [[CollideFn; ShapeKind::COUNT]; ShapeKind::COUNT] =
            [[collide_none as CollideFn; ShapeKind::COUNT]; ShapeKind::COUNT];
        let mut set = |a: ShapeKind, b: ShapeKind, f: CollideFn| table[a.index()][b.index()] = f;
        set(ShapeKind::Sphere, ShapeKind::Sphere, collide_sphere_sphere);
        set(ShapeKind::Sphere, ShapeKind::Box, collide_sphere_box);
        set(ShapeKind::Box, ShapeKind::Sphere, collide_box_sphere);
        set(ShapeKind::Box, ShapeKind::Box, collide_box_box);
        set(ShapeKind::Sphere, ShapeKind::Plane, collide_sphere_plane);
        set(ShapeKind::Plane, ShapeKind::Sphere, collide_plane_sphere);
        set(ShapeKind::Box, ShapeKind::Plane, collide_box_plane);
        set(ShapeKind::Plane, ShapeKind::Box, collide_plane_box);
        Self { table }
    }

    /// Algorithm registered for `(a, b)`.
    pub fn algorithm(&self, a: ShapeKind, b: ShapeKind) -> CollideFn {
        self.table[a.index()][b.index()]
    }

    /// Clears `out` and runs the algorithm for the two bodies' shapes.
    pub fn collide(
        &self,
        a: &Body,
        b: &Body,
        params: &ContactParams,
        out: &mut Vec<Contact>,
    ) -> Order {
        out.clear();
        let algorithm = self.algorithm(a.shape().kind(), b.shape().kind());
        algorithm(a, b, params, out)
    }
}

/// Placeholder for shape pairs that cannot touch (rays, plane-plane).
pub fn collide_none(a: &Body, b: &Body, _params: &ContactParams, _out: &mut Vec<Contact>) -> Order {
    trace!(
        a = ?a.shape().kind(),
        b = ?b.shape().kind(),
        "no collision algorithm for shape pair"
    );
    Order::Kept
}
