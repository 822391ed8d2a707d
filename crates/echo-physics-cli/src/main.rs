// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Echo physics CLI.
//!
//! Runs a built-in or JSON scene for a number of fixed timesteps and prints
//! the final body states.
//!
//! # Usage
//! ```text
//! echo-physics run [drop|stack|elastic|rain] [--scene FILE] [--ticks N] [--dt SECONDS] [--format table|json]
//! echo-physics scenes
//! ```
//!
//! Logs go to stderr; `RUST_LOG` overrides `--log-level`.

// The CLI is expected to print to stdout/stderr.
#![allow(clippy::print_stdout, clippy::print_stderr)]

mod report;
mod scene;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::{info, trace};
use tracing_subscriber::EnvFilter;

use crate::report::Report;
use crate::scene::{Builtin, Scene};

#[derive(Parser, Debug)]
#[command(name = "echo-physics", version, about = "Run Echo rigid-body scenes")]
struct Cli {
    /// Log filter used when RUST_LOG is unset (e.g. "warn", "echo_physics=debug")
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Step a scene and print the final body states
    Run(RunArgs),
    /// List the built-in scenes
    Scenes,
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Built-in scene to run (default: drop)
    #[arg(value_enum, conflicts_with = "scene")]
    builtin: Option<Builtin>,
    /// JSON scene file to run instead of a built-in
    #[arg(long)]
    scene: Option<PathBuf>,
    /// Number of steps
    #[arg(long, default_value_t = 120)]
    ticks: u32,
    /// Timestep in seconds
    #[arg(long, default_value_t = 1.0 / 60.0)]
    dt: f64,
    /// Output format
    #[arg(long, value_enum, default_value_t = Format::Table)]
    format: Format,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Table,
    Json,
}

fn init_tracing(level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .with_context(|| format!("invalid log level {level:?}"))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
    Ok(())
}

fn run(args: &RunArgs) -> Result<Report> {
    if !(args.dt.is_finite() && args.dt > 0.0) {
        bail!("--dt must be a positive number of seconds, got {}", args.dt);
    }
    let scene = match &args.scene {
        Some(path) => Scene::load(path)?,
        None => Scene::builtin(args.builtin.unwrap_or(Builtin::Drop)),
    };
    let mut world = scene.build()?;
    info!(scene = %world.name, bodies = world.bodies.len(), ticks = args.ticks, dt = args.dt, "running");
    for tick in 0..args.ticks {
        world.mover.step(&mut world.bodies, args.dt);
        trace!(tick, pairs = world.mover.pair_count(), "stepped");
    }
    Ok(Report::capture(&world, args.ticks, args.dt))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level)?;
    match cli.command {
        Command::Run(args) => {
            let report = run(&args)?;
            match args.format {
                Format::Table => println!("{}", report.to_table()),
                Format::Json => println!(
                    "{}",
                    serde_json::to_string_pretty(&report).context("serialize report")?
                ),
            }
        }
        Command::Scenes => {
            for which in Builtin::ALL {
                println!("{:<8} {}", which.name(), which.summary());
            }
        }
    }
    Ok(())
}
