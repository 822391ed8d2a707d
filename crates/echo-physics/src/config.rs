// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Simulation parameters.
//!
//! Defaults reproduce the tuning the solver constants were chosen against;
//! scene files may override any subset of fields.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for configuration validation.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    /// A field holds NaN or an infinity.
    #[error("{field} must be finite")]
    NonFinite {
        /// Offending field name.
        field: &'static str,
    },
    /// A field that must be non-negative is negative.
    #[error("{field} must be non-negative, got {value}")]
    Negative {
        /// Offending field name.
        field: &'static str,
        /// Rejected value.
        value: f64,
    },
    /// A field lies outside its allowed closed range.
    #[error("{field} must lie in [{min}, {max}], got {value}")]
    OutOfRange {
        /// Offending field name.
        field: &'static str,
        /// Rejected value.
        value: f64,
        /// Inclusive lower bound.
        min: f64,
        /// Inclusive upper bound.
        max: f64,
    },
    /// The solver was configured with zero iterations.
    #[error("solver iterations must be at least 1")]
    NoIterations,
}

/// Sequential-impulse solver tuning.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SolverConfig {
    /// Passes over all contacts per step (and again for split impulse).
    pub iterations: u32,
    /// Error reduction for penetration folded into the velocity solve.
    pub erp: f64,
    /// Error reduction for penetration resolved by the split impulse.
    pub erp2: f64,
    /// Resolve deep penetration with a separate push impulse.
    pub split_impulse: bool,
    /// Penetrations deeper than this are separated by the push impulse.
    pub split_impulse_penetration_limit: f64,
    /// Fraction of the split-impulse turn applied to orientation.
    pub split_impulse_turn_erp: f64,
    /// Allowed penetration before correction kicks in.
    pub linear_slop: f64,
    /// Fraction of the cached impulse re-applied at setup.
    pub warmstarting_factor: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            iterations: 10,
            erp: 0.2,
            erp2: 0.8,
            split_impulse: true,
            split_impulse_penetration_limit: -0.04,
            split_impulse_turn_erp: 0.1,
            linear_slop: 0.0,
            warmstarting_factor: 0.85,
        }
    }
}

/// World-level simulation parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PhysicsConfig {
    /// Acceleration added to the Y force of every movable body each step.
    pub gravity: f64,
    /// AABB padding for tracked pairs; also the collision margin around boxes.
    pub margin: f64,
    /// Upper bound on the magnitude of a combined friction coefficient.
    pub max_friction: f64,
    /// Extra distance beyond touching at which sphere-box contacts are kept.
    pub contact_distance: f64,
    /// Drift beyond which a cached contact point is discarded.
    pub breaking_limit: f64,
    /// Solver tuning.
    pub solver: SolverConfig,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: -10.0,
            margin: 0.04,
            max_friction: 100.0,
            contact_distance: 0.1,
            breaking_limit: 0.02,
            solver: SolverConfig::default(),
        }
    }
}

fn finite(field: &'static str, value: f64) -> Result<f64, ConfigError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ConfigError::NonFinite { field })
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if finite(field, value)? < 0.0 {
        return Err(ConfigError::Negative { field, value });
    }
    Ok(())
}

fn within(field: &'static str, value: f64, min: f64, max: f64) -> Result<(), ConfigError> {
    let value = finite(field, value)?;
    if value < min || value > max {
        return Err(ConfigError::OutOfRange {
            field,
            value,
            min,
            max,
        });
    }
    Ok(())
}

impl SolverConfig {
    /// Checks every field against its allowed range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.iterations == 0 {
            return Err(ConfigError::NoIterations);
        }
        within("solver.erp", self.erp, 0.0, 1.0)?;
        within("solver.erp2", self.erp2, 0.0, 1.0)?;
        within(
            "solver.split_impulse_penetration_limit",
            self.split_impulse_penetration_limit,
            f64::MIN,
            0.0,
        )?;
        within("solver.split_impulse_turn_erp", self.split_impulse_turn_erp, 0.0, 1.0)?;
        non_negative("solver.linear_slop", self.linear_slop)?;
        within("solver.warmstarting_factor", self.warmstarting_factor, 0.0, 1.0)
    }
}

impl PhysicsConfig {
    /// Checks every field against its allowed range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        finite("gravity", self.gravity)?;
        non_negative("margin", self.margin)?;
        non_negative("max_friction", self.max_friction)?;
        non_negative("contact_distance", self.contact_distance)?;
        non_negative("breaking_limit", self.breaking_limit)?;
        self.solver.validate()
    }
}
