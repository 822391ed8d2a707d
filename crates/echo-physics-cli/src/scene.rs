// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Scene descriptions: the built-in demos and the JSON scene format.
//!
//! A scene file is a JSON object with an optional `config` (any subset of
//! [`PhysicsConfig`]) and a list of `bodies`:
//!
//! ```json
//! {
//!   "name": "ramp",
//!   "config": { "gravity": -9.81 },
//!   "bodies": [
//!     { "shape": "plane", "normal": [0, 1, 0] },
//!     { "shape": "sphere", "radius": 0.5, "location": [0, 3, 0], "mass": 1 }
//!   ]
//! }
//! ```
//!
//! Bodies with `mass <= 0` (the default) are immovable.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::ValueEnum;
use echo_physics::{Body, Mover, PhysicsConfig, Quat, Shape, Transform, Vec3};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Scenes compiled into the binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Builtin {
    /// A sphere dropped onto the ground.
    Drop,
    /// Three boxes stacked on the ground.
    Stack,
    /// Two elastic spheres colliding head-on without gravity.
    Elastic,
    /// A grid of spheres falling onto the ground at staggered heights.
    Rain,
}

impl Builtin {
    /// Every built-in scene, in listing order.
    pub const ALL: [Self; 4] = [Self::Drop, Self::Stack, Self::Elastic, Self::Rain];

    /// Name accepted on the command line.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Drop => "drop",
            Self::Stack => "stack",
            Self::Elastic => "elastic",
            Self::Rain => "rain",
        }
    }

    /// One-line description for `echo-physics scenes`.
    pub const fn summary(self) -> &'static str {
        match self {
            Self::Drop => "a sphere dropped onto the ground",
            Self::Stack => "three boxes stacked on the ground",
            Self::Elastic => "two elastic spheres colliding head-on, no gravity",
            Self::Rain => "a 4x4 grid of spheres falling at staggered heights",
        }
    }
}

/// Collision shape as written in a scene file.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "lowercase")]
pub enum ShapeSpec {
    /// Sphere of the given radius.
    Sphere {
        /// Radius in metres.
        radius: f64,
    },
    /// Box with the given half-extents.
    Box {
        /// Half size along each local axis.
        half_extents: [f64; 3],
    },
    /// Infinite plane through the body origin.
    Plane {
        /// Plane normal in local space.
        normal: [f64; 3],
    },
    /// Ray from the body origin. Rays never collide; they only make sense
    /// as cast sources.
    Ray {
        /// Ray direction in local space.
        direction: [f64; 3],
    },
}

impl ShapeSpec {
    fn label(&self) -> &'static str {
        match self {
            Self::Sphere { .. } => "sphere",
            Self::Box { .. } => "box",
            Self::Plane { .. } => "plane",
            Self::Ray { .. } => "ray",
        }
    }

    fn to_shape(self) -> Result<Shape> {
        let shape = match self {
            Self::Sphere { radius } => {
                if !(radius.is_finite() && radius > 0.0) {
                    bail!("sphere radius must be positive, got {radius}");
                }
                Shape::sphere(radius)
            }
            Self::Box { half_extents: [x, y, z] } => {
                if ![x, y, z].iter().all(|h| h.is_finite() && *h > 0.0) {
                    bail!("box half extents must be positive, got [{x}, {y}, {z}]");
                }
                Shape::cuboid(x, y, z)
            }
            Self::Plane { normal } => Shape::plane(direction("plane normal", normal)?),
            Self::Ray { direction: d } => Shape::ray(direction("ray direction", d)?),
        };
        Ok(shape)
    }
}

fn direction(what: &str, v: [f64; 3]) -> Result<Vec3> {
    let v = vector(what, v)?;
    if v.is_zero() {
        bail!("{what} must be non-zero");
    }
    Ok(v)
}

fn vector(what: &str, [x, y, z]: [f64; 3]) -> Result<Vec3> {
    let v = Vec3::new(x, y, z);
    if !v.is_finite() {
        bail!("{what} must be finite, got [{x}, {y}, {z}]");
    }
    Ok(v)
}

const fn identity_rotation() -> [f64; 4] {
    [0.0, 0.0, 0.0, 1.0]
}

/// One body as written in a scene file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodySpec {
    /// Label used in reports. Defaults to the shape name and index.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Collision shape.
    #[serde(flatten)]
    pub shape: ShapeSpec,
    /// World location.
    #[serde(default)]
    pub location: [f64; 3],
    /// World rotation as `[x, y, z, w]`; normalised on load.
    #[serde(default = "identity_rotation")]
    pub rotation: [f64; 4],
    /// Mass; `<= 0` makes the body immovable.
    #[serde(default)]
    pub mass: f64,
    /// Restitution.
    #[serde(default)]
    pub bounce: f64,
    /// Friction coefficient in `[0, 1]`; the body default when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub friction: Option<f64>,
    /// Initial linear velocity.
    #[serde(default)]
    pub velocity: [f64; 3],
    /// Initial angular velocity.
    #[serde(default)]
    pub spin: [f64; 3],
}

impl BodySpec {
    fn new(shape: ShapeSpec, location: [f64; 3], mass: f64) -> Self {
        Self {
            name: None,
            shape,
            location,
            rotation: identity_rotation(),
            mass,
            bounce: 0.0,
            friction: None,
            velocity: [0.0; 3],
            spin: [0.0; 3],
        }
    }

    fn ground() -> Self {
        let mut spec = Self::new(
            ShapeSpec::Plane {
                normal: [0.0, 1.0, 0.0],
            },
            [0.0; 3],
            0.0,
        );
        spec.name = Some("ground".to_owned());
        spec
    }

    fn build(&self) -> Result<Body> {
        let mut body = Body::new(self.shape.to_shape()?);
        let [x, y, z, w] = self.rotation;
        let rotation = Quat::new(x, y, z, w);
        if !rotation.to_array().iter().all(|c| c.is_finite()) || rotation.length_squared() <= 0.0 {
            bail!("rotation must be a finite non-zero quaternion");
        }
        body.place(Transform::new(
            vector("location", self.location)?,
            rotation.normalize(),
        ));
        if !(self.mass.is_finite() && self.bounce.is_finite()) {
            bail!("mass and bounce must be finite");
        }
        body.set_material(self.mass, self.bounce);
        if let Some(friction) = self.friction {
            if !(0.0..=1.0).contains(&friction) {
                bail!("friction must be within [0, 1], got {friction}");
            }
            body.set_friction(friction);
        }
        let v = vector("velocity", self.velocity)?;
        let w = vector("spin", self.spin)?;
        body.push(v.x(), v.y(), v.z());
        body.turn(w.x(), w.y(), w.z());
        Ok(body)
    }
}

/// A complete scene: world parameters plus bodies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    /// Label used in reports.
    #[serde(default = "unnamed")]
    pub name: String,
    /// World parameters; missing fields take their defaults.
    #[serde(default)]
    pub config: PhysicsConfig,
    /// Bodies in stepping order.
    pub bodies: Vec<BodySpec>,
}

fn unnamed() -> String {
    "scene".to_owned()
}

/// A scene turned into live simulation state.
pub struct World {
    /// Scene label.
    pub name: String,
    /// Configured mover.
    pub mover: Mover,
    /// Bodies in stepping order.
    pub bodies: Vec<Body>,
    /// Report label per body.
    pub labels: Vec<String>,
}

impl Scene {
    /// Reads and parses a JSON scene file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read scene {}", path.display()))?;
        let mut scene: Self = serde_json::from_str(&text)
            .with_context(|| format!("failed to parse scene {}", path.display()))?;
        if scene.name == unnamed() {
            if let Some(stem) = path.file_stem() {
                scene.name = stem.to_string_lossy().into_owned();
            }
        }
        info!(scene = %scene.name, bodies = scene.bodies.len(), "loaded scene file");
        Ok(scene)
    }

    /// Builds one of the compiled-in scenes.
    pub fn builtin(which: Builtin) -> Self {
        let mut config = PhysicsConfig::default();
        let mut bodies = Vec::new();
        match which {
            Builtin::Drop => {
                bodies.push(BodySpec::ground());
                let mut ball = BodySpec::new(ShapeSpec::Sphere { radius: 0.5 }, [0.0, 3.0, 0.0], 1.0);
                ball.bounce = 0.3;
                bodies.push(ball);
            }
            Builtin::Stack => {
                bodies.push(BodySpec::ground());
                for level in 0..3u32 {
                    bodies.push(BodySpec::new(
                        ShapeSpec::Box {
                            half_extents: [0.5, 0.5, 0.5],
                        },
                        [0.0, 0.5 + f64::from(level), 0.0],
                        1.0,
                    ));
                }
            }
            Builtin::Elastic => {
                config.gravity = 0.0;
                for (x, vx) in [(-2.0, 1.0), (2.0, -1.0)] {
                    let mut ball = BodySpec::new(ShapeSpec::Sphere { radius: 1.0 }, [x, 0.0, 0.0], 1.0);
                    ball.bounce = 1.0;
                    ball.velocity = [vx, 0.0, 0.0];
                    bodies.push(ball);
                }
            }
            Builtin::Rain => {
                bodies.push(BodySpec::ground());
                for row in 0..4u32 {
                    for col in 0..4u32 {
                        let height = 1.0 + f64::from((row + col) % 3) * 0.75;
                        let mut drop = BodySpec::new(
                            ShapeSpec::Sphere { radius: 0.4 },
                            [f64::from(col) * 1.2, height, f64::from(row) * 1.2],
                            1.0,
                        );
                        drop.bounce = 0.2;
                        bodies.push(drop);
                    }
                }
            }
        }
        Self {
            name: which.name().to_owned(),
            config,
            bodies,
        }
    }

    /// Validates the scene and creates its mover and bodies.
    pub fn build(&self) -> Result<World> {
        let mover = Mover::with_config(self.config).context("invalid physics config")?;
        let mut bodies = Vec::with_capacity(self.bodies.len());
        let mut labels = Vec::with_capacity(self.bodies.len());
        for (i, spec) in self.bodies.iter().enumerate() {
            let label = spec
                .name
                .clone()
                .unwrap_or_else(|| format!("{}{i}", spec.shape.label()));
            let body = spec
                .build()
                .with_context(|| format!("invalid body {label}"))?;
            debug!(%label, id = %body.id(), movable = body.is_movable(), "built body");
            bodies.push(body);
            labels.push(label);
        }
        Ok(World {
            name: self.name.clone(),
            mover,
            bodies,
            labels,
        })
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn builtins_build() {
        for which in Builtin::ALL {
            let world = Scene::builtin(which).build().expect("builtin scene builds");
            assert_eq!(world.bodies.len(), world.labels.len());
            assert_eq!(world.name, which.name());
        }
    }

    #[test]
    fn file_defaults_fill_in() {
        let scene: Scene = serde_json::from_str(
            r#"{ "bodies": [ { "shape": "sphere", "radius": 1.0, "mass": 2.0 } ] }"#,
        )
        .expect("parse scene");
        assert_eq!(scene.config, PhysicsConfig::default());
        assert_eq!(scene.bodies[0].rotation, identity_rotation());
        let world = scene.build().expect("build");
        assert!(world.bodies[0].is_movable());
        assert_eq!(world.labels[0], "sphere0");
    }

    #[test]
    fn bad_bodies_are_rejected() {
        let scene: Scene = serde_json::from_str(
            r#"{ "bodies": [ { "shape": "box", "half_extents": [1.0, 0.0, 1.0] } ] }"#,
        )
        .expect("parse scene");
        let err = scene.build().err().expect("zero extent rejected");
        assert!(format!("{err:#}").contains("half extents"));

        let scene: Scene = serde_json::from_str(
            r#"{ "bodies": [ { "shape": "plane", "normal": [0.0, 0.0, 0.0] } ] }"#,
        )
        .expect("parse scene");
        assert!(scene.build().is_err());

        let scene: Scene = serde_json::from_str(
            r#"{ "bodies": [ { "shape": "sphere", "radius": 1.0, "friction": 1.5 } ] }"#,
        )
        .expect("parse scene");
        let err = scene.build().err().expect("friction above one rejected");
        assert!(format!("{err:#}").contains("friction must be within"));
    }

    #[test]
    fn invalid_config_is_reported() {
        let scene: Scene =
            serde_json::from_str(r#"{ "config": { "margin": -1.0 }, "bodies": [] }"#)
                .expect("parse scene");
        let err = scene.build().err().expect("negative margin rejected");
        assert!(format!("{err:#}").contains("invalid physics config"));
    }
}
