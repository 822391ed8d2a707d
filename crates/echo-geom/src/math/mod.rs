// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Linear algebra primitives and the shared epsilon.
//!
//! All arithmetic is `f64`. Rigid-body integration accumulates error over
//! many ticks, so the extra precision keeps resting contacts quiet.

mod mat3;
mod quat;
mod vec3;

pub use mat3::Mat3;
pub use quat::Quat;
pub use vec3::Vec3;

/// Global epsilon used by math routines when detecting degenerate values.
pub const EPSILON: f64 = 1e-6;
