//! The bottle scene: a walled box, two spikes, a pile of balls and
//! gravity that flips direction on a fixed schedule.
//!
//! Coordinates are world units with the origin in the middle of the
//! bottle and +y up.
//!
//! ```ignore
//! let mut bottle = Bottle::new(BottleConfig::default().with_seed(7))?;
//! for _ in 0..300 {
//!     bottle.step();
//! }
//! let positions = bottle.ball_positions();
//! ```

use glam::Vec2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::PhysicsError;
use crate::physics::{BodyDesc, BodyHandle, BodyKind, Material, Shape, World};

/// Scene parameters. Defaults give the classic 50 x 70 bottle.
#[derive(Clone, Debug, PartialEq)]
pub struct BottleConfig {
    pub width: f32,
    pub height: f32,
    pub wall_thickness: f32,
    pub ball_count: usize,
    pub ball_radius: f32,
    pub ball_material: Material,
    pub spike_thickness: f32,
    /// Distance of each spike tip from the centre line.
    pub spike_extent: f32,
    pub gravity: Vec2,
    /// Full period of the gravity schedule, in simulated seconds.
    pub flip_period: f32,
    pub dt: f32,
    pub velocity_iterations: usize,
    pub position_iterations: usize,
    pub allow_sleep: bool,
    /// Seed for ball placement. `None` draws one from the OS.
    pub seed: Option<u64>,
}

impl Default for BottleConfig {
    fn default() -> Self {
        Self {
            width: 50.0,
            height: 70.0,
            wall_thickness: 1.0,
            ball_count: 150,
            ball_radius: 1.0,
            ball_material: Material {
                density: 1.0,
                friction: 0.0,
                restitution: 0.3,
            },
            spike_thickness: 12.0,
            spike_extent: 20.0,
            gravity: Vec2::new(0.0, -20.0),
            flip_period: 5.5,
            dt: 1.0 / 30.0,
            velocity_iterations: 8,
            position_iterations: 3,
            allow_sleep: false,
            seed: None,
        }
    }
}

impl BottleConfig {
    pub fn with_size(mut self, width: f32, height: f32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_ball_count(mut self, count: usize) -> Self {
        self.ball_count = count;
        self
    }

    pub fn with_ball_radius(mut self, radius: f32) -> Self {
        self.ball_radius = radius;
        self
    }

    pub fn with_ball_material(mut self, material: Material) -> Self {
        self.ball_material = material;
        self
    }

    pub fn with_gravity(mut self, gravity: Vec2) -> Self {
        self.gravity = gravity;
        self
    }

    pub fn with_flip_period(mut self, period: f32) -> Self {
        self.flip_period = period;
        self
    }

    pub fn with_timestep(mut self, dt: f32) -> Self {
        self.dt = dt;
        self
    }

    pub fn with_iterations(mut self, velocity: usize, position: usize) -> Self {
        self.velocity_iterations = velocity;
        self.position_iterations = position;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Gravity as a function of simulated time.
///
/// A sine with period `period` is sampled at `t`. A negative sample
/// selects the inverted vector, anything else the nominal one.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GravitySchedule {
    pub nominal: Vec2,
    pub period: f32,
}

impl GravitySchedule {
    pub fn sample(&self, t: f64) -> Vec2 {
        let phase = t / self.period as f64 * std::f64::consts::TAU;
        if phase.sin() < 0.0 {
            -self.nominal
        } else {
            self.nominal
        }
    }
}

/// A static polygon in world coordinates, kept for drawing.
#[derive(Clone, Debug, PartialEq)]
pub struct StaticPolygon {
    pub vertices: Vec<Vec2>,
}

impl StaticPolygon {
    fn rect(center: Vec2, half: Vec2) -> Self {
        Self {
            vertices: vec![
                center + Vec2::new(-half.x, -half.y),
                center + Vec2::new(half.x, -half.y),
                center + Vec2::new(half.x, half.y),
                center + Vec2::new(-half.x, half.y),
            ],
        }
    }

    /// Fan triangulation. Only valid for convex polygons.
    pub fn triangles(&self) -> impl Iterator<Item = [Vec2; 3]> + '_ {
        let first = self.vertices.first().copied().unwrap_or_default();
        self.vertices
            .windows(2)
            .skip(1)
            .map(move |pair| [first, pair[0], pair[1]])
    }

    fn min_max(&self) -> (Vec2, Vec2) {
        self.vertices.iter().fold(
            (Vec2::splat(f32::INFINITY), Vec2::splat(f32::NEG_INFINITY)),
            |(lo, hi), v| (lo.min(*v), hi.max(*v)),
        )
    }
}

const SPAWN_ATTEMPTS: usize = 32;

struct Spawn {
    position: Vec2,
    /// False when every attempt overlapped a spike.
    clear: bool,
}

pub struct Bottle {
    config: BottleConfig,
    world: World,
    schedule: GravitySchedule,
    balls: Vec<BodyHandle>,
    walls: Vec<StaticPolygon>,
    spikes: Vec<StaticPolygon>,
    ticks: u64,
}

impl Bottle {
    pub fn new(config: BottleConfig) -> Result<Self, PhysicsError> {
        let schedule = GravitySchedule {
            nominal: config.gravity,
            period: config.flip_period,
        };
        let mut bottle = Self {
            world: World::new(config.gravity, config.allow_sleep),
            schedule,
            balls: Vec::with_capacity(config.ball_count),
            walls: Vec::new(),
            spikes: Vec::new(),
            ticks: 0,
            config,
        };

        bottle.build_container()?;
        let extent = bottle.config.spike_extent;
        bottle.add_spike(Vec2::new(extent, 0.0), 1.0)?;
        bottle.add_spike(Vec2::new(-extent, 0.0), -1.0)?;

        let mut rng = match bottle.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut crowded = 0;
        for _ in 0..bottle.config.ball_count {
            let spawn = bottle.spawn_position(&mut rng);
            if !spawn.clear {
                crowded += 1;
            }
            bottle.add_ball(spawn.position)?;
        }
        if crowded > 0 {
            log::warn!(
                "{} of {} balls overlap a spike after {} placement attempts each",
                crowded,
                bottle.config.ball_count,
                SPAWN_ATTEMPTS
            );
        }

        log::info!(
            "bottle {}x{} with {} balls, gravity {:?} flipping every {}s",
            bottle.config.width,
            bottle.config.height,
            bottle.balls.len(),
            bottle.config.gravity,
            bottle.config.flip_period / 2.0
        );
        Ok(bottle)
    }

    fn build_container(&mut self) -> Result<(), PhysicsError> {
        let half_w = self.config.width / 2.0;
        let half_h = self.config.height / 2.0;
        let half_t = self.config.wall_thickness / 2.0;
        let walls = [
            (Vec2::new(half_w, 0.0), Vec2::new(half_t, half_h)),
            (Vec2::new(-half_w, 0.0), Vec2::new(half_t, half_h)),
            (Vec2::new(0.0, half_h), Vec2::new(half_w, half_t)),
            (Vec2::new(0.0, -half_h), Vec2::new(half_w, half_t)),
        ];
        for (position, half) in walls {
            let body = self.world.create_body(BodyDesc {
                position,
                kind: BodyKind::Static,
            });
            let shape = Shape::Box {
                half_width: half.x,
                half_height: half.y,
            };
            let material = Material {
                density: 0.0,
                ..Material::default()
            };
            self.world.create_fixture(body, &shape, material)?;
            self.walls.push(StaticPolygon::rect(position, half));
        }
        Ok(())
    }

    /// A triangle with its base on the side wall and its tip at `position`.
    /// `dir` is +1 for the right wall and -1 for the left.
    fn add_spike(&mut self, position: Vec2, dir: f32) -> Result<(), PhysicsError> {
        let base_x = dir * self.config.width / 2.0 - position.x;
        let half = self.config.spike_thickness / 2.0;
        let local = vec![
            Vec2::new(base_x, dir * half),
            Vec2::ZERO,
            Vec2::new(base_x, -dir * half),
        ];

        let body = self.world.create_body(BodyDesc {
            position,
            kind: BodyKind::Static,
        });
        self.world
            .create_fixture(body, &Shape::Polygon(local.clone()), Material::default())?;
        self.spikes.push(StaticPolygon {
            vertices: local.into_iter().map(|v| v + position).collect(),
        });
        Ok(())
    }

    fn add_ball(&mut self, position: Vec2) -> Result<(), PhysicsError> {
        let body = self.world.create_body(BodyDesc {
            position,
            kind: BodyKind::Dynamic,
        });
        let shape = Shape::Circle {
            radius: self.config.ball_radius,
        };
        self.world
            .create_fixture(body, &shape, self.config.ball_material)?;
        self.balls.push(body);
        Ok(())
    }

    /// Uniform position inside the walls, retried a few times to stay
    /// clear of the spikes. Gives up with the last sample.
    fn spawn_position(&self, rng: &mut StdRng) -> Spawn {
        let inset = self.config.ball_radius + self.config.wall_thickness / 2.0;
        let half = Vec2::new(self.config.width, self.config.height) / 2.0 - inset;
        let half = half.max(Vec2::ZERO);
        let mut position = Vec2::ZERO;
        for _ in 0..SPAWN_ATTEMPTS {
            position = Vec2::new(
                rng.gen_range(-half.x..=half.x),
                rng.gen_range(-half.y..=half.y),
            );
            let clear = self.spikes.iter().all(|spike| {
                let (lo, hi) = spike.min_max();
                let margin = Vec2::splat(self.config.ball_radius);
                position.cmplt(lo - margin).any() || position.cmpgt(hi + margin).any()
            });
            if clear {
                return Spawn {
                    position,
                    clear: true,
                };
            }
        }
        Spawn {
            position,
            clear: false,
        }
    }

    /// Apply the scheduled gravity and advance the world by one step.
    pub fn step(&mut self) {
        let gravity = self.schedule.sample(self.sim_time());
        self.world.set_gravity(gravity);
        self.world.step(
            self.config.dt,
            self.config.velocity_iterations,
            self.config.position_iterations,
        );
        self.ticks += 1;
    }

    pub fn ball_positions(&self) -> Vec<Vec2> {
        self.balls
            .iter()
            .filter_map(|ball| self.world.position(*ball).ok())
            .collect()
    }

    /// Ball positions packed for a vertex buffer.
    pub fn pack_positions(&self, out: &mut Vec<[f32; 2]>) {
        out.clear();
        out.extend(
            self.balls
                .iter()
                .filter_map(|ball| self.world.position(*ball).ok())
                .map(|p| p.to_array()),
        );
    }

    /// Walls followed by spikes.
    pub fn static_polygons(&self) -> impl Iterator<Item = &StaticPolygon> {
        self.walls.iter().chain(&self.spikes)
    }

    pub fn spikes(&self) -> &[StaticPolygon] {
        &self.spikes
    }

    /// All static geometry as a flat triangle list.
    pub fn static_triangles(&self) -> Vec<[f32; 2]> {
        self.static_polygons()
            .flat_map(|poly| poly.triangles())
            .flat_map(|tri| tri.map(|v| v.to_array()))
            .collect()
    }

    /// World to clip space scale for the bottle filling the viewport.
    pub fn clip_scale(&self) -> Vec2 {
        Vec2::new(2.0 / self.config.width, 2.0 / self.config.height)
    }

    pub fn config(&self) -> &BottleConfig {
        &self.config
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn ball_count(&self) -> usize {
        self.balls.len()
    }

    /// Simulated seconds, derived from the tick count so it never drifts.
    pub fn sim_time(&self) -> f64 {
        self.ticks as f64 * self.config.dt as f64
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}
