// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! echo-physics: rigid-body simulation core.
//!
//! A [`Mover`] advances a caller-owned slice of [`Body`] records by a fixed
//! timestep. Each step predicts motion, tracks candidate pairs with
//! margin-expanded AABBs, builds persistent contact manifolds, and resolves
//! them with a sequential-impulse solver (split impulse, warm starting,
//! friction, restitution) before committing world transforms.
//!
//! Simulation calls never fail: unsupported shape pairs report no contact,
//! casts against unsupported shapes report no hit, and a non-positive
//! timestep is ignored. Only configuration validation returns errors.
#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms, unused_must_use)]
#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::cargo,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro,
    clippy::print_stdout,
    clippy::print_stderr
)]
#![allow(
    clippy::must_use_candidate,
    clippy::return_self_not_must_use,
    clippy::unreadable_literal,
    clippy::missing_const_for_fn,
    clippy::suboptimal_flops,
    clippy::redundant_pub_crate,
    clippy::many_single_char_names,
    clippy::module_name_repetitions,
    clippy::use_self
)]

/// Body records: identity, material, transforms, and velocities.
pub mod body;
mod broad;
/// Ray casts against bodies.
pub mod caster;
/// Tunable simulation parameters and their validation.
pub mod config;
/// Contact points, manifolds, and persistent contact pairs.
pub mod contact;
/// Per-tick orchestration.
pub mod mover;
/// Shape-pair collision algorithms and their dispatch table.
pub mod narrow;
/// Collision shapes.
pub mod shape;
mod solver;

pub use body::{Body, BodyId, SharedTransform};
pub use caster::cast;
pub use config::{ConfigError, PhysicsConfig, SolverConfig};
pub use contact::{Contact, ContactPair, ManifoldPoint, PairId, MANIFOLD_CAPACITY};
pub use mover::Mover;
pub use narrow::{CollideFn, Collider, ContactParams, Order};
pub use shape::{Shape, ShapeKind};

pub use echo_geom::{Quat, Transform, Vec3};
