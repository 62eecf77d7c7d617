//! Thin wrapper over the rapier2d rigid-body pipeline.
//!
//! Exposes just what the bottle needs: static and dynamic bodies, box,
//! polygon and circle fixtures, a gravity vector and a fixed step.

use std::num::NonZeroUsize;

use glam::Vec2;
use rapier2d::prelude::*;

use crate::error::PhysicsError;

/// Handle to a body created by [`World::create_body`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BodyHandle(RigidBodyHandle);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BodyKind {
    /// Never moves. Used for walls and spikes.
    Static,
    /// Moved by gravity and contacts.
    Dynamic,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BodyDesc {
    pub position: Vec2,
    pub kind: BodyKind,
}

/// Collision shape in body-local coordinates.
#[derive(Clone, Debug, PartialEq)]
pub enum Shape {
    Box { half_width: f32, half_height: f32 },
    /// Convex polygon, at least three non-collinear vertices.
    Polygon(Vec<Vec2>),
    Circle { radius: f32 },
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Material {
    pub density: f32,
    pub friction: f32,
    pub restitution: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            density: 1.0,
            friction: 0.0,
            restitution: 0.0,
        }
    }
}

pub struct World {
    gravity: Vector<Real>,
    allow_sleep: bool,
    integration_parameters: IntegrationParameters,
    physics_pipeline: PhysicsPipeline,
    rigid_body_set: RigidBodySet,
    collider_set: ColliderSet,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    island_manager: IslandManager,
    impulse_joint_set: ImpulseJointSet,
    multibody_joint_set: MultibodyJointSet,
    ccd_solver: CCDSolver,
}

impl World {
    pub fn new(gravity: Vec2, allow_sleep: bool) -> Self {
        Self {
            gravity: vector![gravity.x, gravity.y],
            allow_sleep,
            integration_parameters: IntegrationParameters::default(),
            physics_pipeline: PhysicsPipeline::new(),
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            island_manager: IslandManager::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
        }
    }

    pub fn gravity(&self) -> Vec2 {
        Vec2::new(self.gravity.x, self.gravity.y)
    }

    pub fn set_gravity(&mut self, gravity: Vec2) {
        self.gravity = vector![gravity.x, gravity.y];
    }

    pub fn create_body(&mut self, desc: BodyDesc) -> BodyHandle {
        let builder = match desc.kind {
            BodyKind::Static => RigidBodyBuilder::fixed(),
            // thin walls need CCD at this step size
            BodyKind::Dynamic => RigidBodyBuilder::dynamic()
                .can_sleep(self.allow_sleep)
                .ccd_enabled(true),
        };
        let body = builder
            .translation(vector![desc.position.x, desc.position.y])
            .build();
        BodyHandle(self.rigid_body_set.insert(body))
    }

    /// Attach a collider to `body`.
    pub fn create_fixture(
        &mut self,
        body: BodyHandle,
        shape: &Shape,
        material: Material,
    ) -> Result<(), PhysicsError> {
        if self.rigid_body_set.get(body.0).is_none() {
            return Err(PhysicsError::UnknownBody);
        }
        let builder = match shape {
            Shape::Box {
                half_width,
                half_height,
            } => ColliderBuilder::cuboid(*half_width, *half_height),
            Shape::Circle { radius } => ColliderBuilder::ball(*radius),
            Shape::Polygon(vertices) => {
                let points: Vec<Point<Real>> =
                    vertices.iter().map(|v| point![v.x, v.y]).collect();
                ColliderBuilder::convex_hull(&points)
                    .ok_or(PhysicsError::DegeneratePolygon(vertices.len()))?
            }
        };
        let collider = builder
            .density(material.density)
            .friction(material.friction)
            .restitution(material.restitution)
            .build();
        self.collider_set
            .insert_with_parent(collider, body.0, &mut self.rigid_body_set);
        Ok(())
    }

    /// Advance the world by `dt` seconds.
    ///
    /// `velocity_iterations` drives the solver iteration count and
    /// `position_iterations` the internal stabilization passes.
    pub fn step(&mut self, dt: f32, velocity_iterations: usize, position_iterations: usize) {
        self.integration_parameters.dt = dt;
        self.integration_parameters.num_solver_iterations =
            NonZeroUsize::new(velocity_iterations).unwrap_or(NonZeroUsize::MIN);
        self.integration_parameters.num_internal_pgs_iterations = position_iterations.max(1);

        self.physics_pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            None,
            &(),
            &(),
        );
    }

    pub fn position(&self, body: BodyHandle) -> Result<Vec2, PhysicsError> {
        let body = self
            .rigid_body_set
            .get(body.0)
            .ok_or(PhysicsError::UnknownBody)?;
        let t = body.translation();
        Ok(Vec2::new(t.x, t.y))
    }

    pub fn body_count(&self) -> usize {
        self.rigid_body_set.len()
    }
}
