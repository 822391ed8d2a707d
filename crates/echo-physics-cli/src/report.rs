// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Final-state reports.

use comfy_table::{presets::UTF8_FULL, Cell, CellAlignment, Table};
use echo_physics::Body;
use serde::Serialize;

use crate::scene::World;

/// State of one body after the run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BodyState {
    /// Scene label.
    pub name: String,
    /// Whether the solver can move the body.
    pub movable: bool,
    /// World location.
    pub location: [f64; 3],
    /// World rotation as `[x, y, z, w]`.
    pub rotation: [f64; 4],
    /// Linear velocity.
    pub velocity: [f64; 3],
    /// Angular velocity.
    pub spin: [f64; 3],
}

impl BodyState {
    fn capture(name: &str, body: &Body) -> Self {
        let world = body.world();
        Self {
            name: name.to_owned(),
            movable: body.is_movable(),
            location: world.location().to_array(),
            rotation: world.rotation().to_array(),
            velocity: body.speed().to_array(),
            spin: body.whirl().to_array(),
        }
    }
}

/// Summary of a finished run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    /// Scene label.
    pub scene: String,
    /// Steps taken.
    pub ticks: u32,
    /// Timestep in seconds.
    pub dt: f64,
    /// Contact pairs tracked after the last step.
    pub pairs: usize,
    /// Bodies in stepping order.
    pub bodies: Vec<BodyState>,
}

impl Report {
    /// Snapshots `world` after stepping.
    pub fn capture(world: &World, ticks: u32, dt: f64) -> Self {
        Self {
            scene: world.name.clone(),
            ticks,
            dt,
            pairs: world.mover.pair_count(),
            bodies: world
                .labels
                .iter()
                .zip(&world.bodies)
                .map(|(name, body)| BodyState::capture(name, body))
                .collect(),
        }
    }

    /// Renders the body states as a table, headed by a one-line summary.
    pub fn to_table(&self) -> String {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_header(vec!["body", "movable", "location", "velocity", "spin"]);
        for body in &self.bodies {
            table.add_row(vec![
                Cell::new(&body.name),
                Cell::new(if body.movable { "yes" } else { "no" }).set_alignment(CellAlignment::Center),
                Cell::new(triple(body.location)),
                Cell::new(triple(body.velocity)),
                Cell::new(triple(body.spin)),
            ]);
        }
        format!(
            "scene {} after {} ticks of {:.4}s, {} pairs\n{table}",
            self.scene, self.ticks, self.dt, self.pairs
        )
    }
}

fn triple(v: [f64; 3]) -> String {
    let [x, y, z] = v;
    // Avoid printing "-0.000" for values that round to zero.
    let tidy = |c: f64| if c.abs() < 5e-4 { 0.0 } else { c };
    format!("{:.3}, {:.3}, {:.3}", tidy(x), tidy(y), tidy(z))
}
