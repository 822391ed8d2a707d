// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![doc = r"Geometry primitives for the Echo physics core.

This crate provides:
- `f64` linear algebra (`Vec3`, `Quat`, `Mat3`).
- Rigid transforms (`Transform`) with velocity integration.
- Axis-aligned bounding boxes (`Aabb`) with strict overlap tests.

Design notes:
- Deterministic: no ambient RNG, no platform-dependent intrinsics.
- Degenerate inputs (zero-length axes, zero vectors) collapse to well-defined
  values instead of producing NaNs.
- Rustdoc is treated as part of the contract; public items are documented.
"]

/// Scalar helpers and linear algebra primitives.
pub mod math;
/// Foundational geometric types.
pub mod types;

pub use math::{Mat3, Quat, Vec3, EPSILON};
pub use types::aabb::Aabb;
pub use types::transform::Transform;
