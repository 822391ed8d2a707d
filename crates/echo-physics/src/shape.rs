// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
use std::f64::consts::PI;

use echo_geom::{Aabb, Transform, Vec3};

/// Dispatch tag for a [`Shape`]. Indexes the collision and cast tables.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ShapeKind {
    /// Solid sphere.
    Sphere,
    /// Solid box.
    Box,
    /// Half-line used for casts.
    Ray,
    /// Infinite plane; the half-space behind the normal is solid.
    Plane,
}

impl ShapeKind {
    /// Number of shape kinds (the dispatch table dimension).
    pub const COUNT: usize = 4;

    /// Every kind, in table order.
    pub const ALL: [Self; Self::COUNT] = [Self::Sphere, Self::Box, Self::Ray, Self::Plane];

    /// Dense index into dispatch tables.
    pub const fn index(self) -> usize {
        match self {
            Self::Sphere => 0,
            Self::Box => 1,
            Self::Ray => 2,
            Self::Plane => 3,
        }
    }
}

/// Collision primitive, expressed in the owning body's local space.
///
/// Shapes are immutable once built. Use the constructors rather than the
/// variants directly so inputs are normalised.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Shape {
    /// Sphere centred on the body origin.
    Sphere {
        /// Radius in metres.
        radius: f64,
    },
    /// Box centred on the body origin.
    Box {
        /// Half the box size along each local axis.
        half_extents: Vec3,
    },
    /// Ray starting at the body origin.
    Ray {
        /// Unit direction in local space.
        direction: Vec3,
    },
    /// Plane through the body origin.
    Plane {
        /// Unit normal in local space.
        normal: Vec3,
    },
}

impl Shape {
    /// Sphere with the given radius (sign is ignored).
    pub fn sphere(radius: f64) -> Self {
        Self::Sphere {
            radius: radius.abs(),
        }
    }

    /// Box with the given half-extents (signs are ignored).
    pub fn cuboid(hx: f64, hy: f64, hz: f64) -> Self {
        Self::Box {
            half_extents: Vec3::new(hx, hy, hz).abs(),
        }
    }

    /// Ray along `direction` (normalised; zero stays zero).
    pub fn ray(direction: Vec3) -> Self {
        Self::Ray {
            direction: direction.normalize(),
        }
    }

    /// Plane with the given normal (normalised; zero stays zero).
    pub fn plane(normal: Vec3) -> Self {
        Self::Plane {
            normal: normal.normalize(),
        }
    }

    /// Dispatch tag.
    pub const fn kind(&self) -> ShapeKind {
        match self {
            Self::Sphere { .. } => ShapeKind::Sphere,
            Self::Box { .. } => ShapeKind::Box,
            Self::Ray { .. } => ShapeKind::Ray,
            Self::Plane { .. } => ShapeKind::Plane,
        }
    }

    /// Sphere radius, if this is a sphere.
    pub const fn radius(&self) -> Option<f64> {
        match self {
            Self::Sphere { radius } => Some(*radius),
            _ => None,
        }
    }

    /// Box half-extents, if this is a box.
    pub const fn half_extents(&self) -> Option<Vec3> {
        match self {
            Self::Box { half_extents } => Some(*half_extents),
            _ => None,
        }
    }

    /// Plane normal (local space), if this is a plane.
    pub const fn normal(&self) -> Option<Vec3> {
        match self {
            Self::Plane { normal } => Some(*normal),
            _ => None,
        }
    }

    /// Ray direction (local space), if this is a ray.
    pub const fn direction(&self) -> Option<Vec3> {
        match self {
            Self::Ray { direction } => Some(*direction),
            _ => None,
        }
    }

    /// Enclosed volume; zero for rays and planes.
    pub fn volume(&self) -> f64 {
        match self {
            Self::Sphere { radius } => 4.0 / 3.0 * PI * radius * radius * radius,
            Self::Box { half_extents } => {
                8.0 * half_extents.x() * half_extents.y() * half_extents.z()
            }
            Self::Ray { .. } | Self::Plane { .. } => 0.0,
        }
    }

    /// Diagonal of the body-space inertia tensor for `mass`.
    ///
    /// `None` for shapes that cannot carry mass.
    pub fn inertia(&self, mass: f64) -> Option<Vec3> {
        match self {
            Self::Sphere { radius } => Some(Vec3::splat(0.4 * mass * radius * radius)),
            Self::Box { half_extents } => {
                let l = half_extents.scale(2.0);
                let (lx2, ly2, lz2) = (l.x() * l.x(), l.y() * l.y(), l.z() * l.z());
                Some(Vec3::new(ly2 + lz2, lx2 + lz2, lx2 + ly2).scale(mass / 12.0))
            }
            Self::Ray { .. } | Self::Plane { .. } => None,
        }
    }

    /// World-space bounding box under `world`, expanded by `margin`.
    ///
    /// Planes are unbounded. Rays have no box and never enter the broadphase.
    pub fn aabb(&self, world: &Transform, margin: f64) -> Option<Aabb> {
        match self {
            Self::Sphere { radius } => Some(Aabb::from_center_half_extents(
                world.location(),
                Vec3::splat(radius + margin),
            )),
            Self::Box { half_extents } => {
                let rot = world.rotation().to_mat3();
                let padded = half_extents.add(&Vec3::splat(margin));
                let extent = Vec3::new(
                    rot.row(0).abs().dot(&padded),
                    rot.row(1).abs().dot(&padded),
                    rot.row(2).abs().dot(&padded),
                );
                Some(Aabb::from_center_half_extents(world.location(), extent))
            }
            Self::Plane { .. } => Some(Aabb::unbounded()),
            Self::Ray { .. } => None,
        }
    }
}
