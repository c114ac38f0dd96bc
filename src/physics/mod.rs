mod forces;
mod quadtree;

use std::f32::consts::PI;

use eframe::egui::{Vec2, vec2};
use log::{debug, trace};

use crate::config::{ForceProfile, PhysicsConfig, RestartProfile};
use crate::model::{Generation, Graph};
use forces::{
    ChargeParams, CollisionParams, Link, accumulate_charge_for_node, accumulate_collision_pairs,
    apply_cluster_pull, apply_links, cluster_anchors,
};
use quadtree::QuadNode;

const INITIAL_RADIUS: f32 = 10.0;
const SLEEP_SPEED_SQ: f32 = 1e-6;

/// What caused a restart; each cause has its own energy profile.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RestartTrigger {
    InitialLoad,
    DataChanged,
    ManualRefresh,
}

/// Position and velocity of one node. Owned by the stepper; everyone else
/// reads it through [`PhysicsStepper::bodies`].
#[derive(Clone, Debug, PartialEq)]
pub struct Body {
    pub position: Option<Vec2>,
    pub velocity: Vec2,
    pub pinned: Option<Vec2>,
    pub radius: f32,
    pub last_update: Generation,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimulationState {
    pub alpha: f64,
    pub running: bool,
    pub paused: bool,
    pub tick_count: u64,
}

#[derive(Default)]
struct PhysicsScratch {
    positions: Vec<Vec2>,
    velocities: Vec<Vec2>,
    predicted: Vec<Vec2>,
    radii: Vec<f32>,
}

pub struct PhysicsStepper {
    config: PhysicsConfig,
    profile: ForceProfile,
    bodies: Vec<Body>,
    groups: Vec<Option<usize>>,
    anchors: Vec<Vec2>,
    links: Vec<Link>,
    alpha: f64,
    alpha_decay: f64,
    running: bool,
    paused: bool,
    tick_count: u64,
    seeded: usize,
    scratch: PhysicsScratch,
}

fn phyllotaxis(slot: usize) -> Vec2 {
    let angle = PI * (3.0 - 5.0_f32.sqrt());
    let radius = INITIAL_RADIUS * (0.5 + slot as f32).sqrt();
    let turn = slot as f32 * angle;
    vec2(turn.cos(), turn.sin()) * radius
}

impl PhysicsStepper {
    pub fn new(
        config: &PhysicsConfig,
        graph: &Graph,
        initial_positions: &[Option<Vec2>],
        pins: &[Option<Vec2>],
    ) -> Self {
        let profile = config.force_profile();
        let bodies = graph
            .nodes
            .iter()
            .enumerate()
            .map(|(index, node)| {
                let pinned = pins.get(index).copied().flatten();
                Body {
                    position: pinned.or(initial_positions.get(index).copied().flatten()),
                    velocity: Vec2::ZERO,
                    pinned,
                    radius: node.radius,
                    last_update: 0,
                }
            })
            .collect::<Vec<_>>();

        let links = graph
            .edges
            .iter()
            .map(|edge| {
                let source_degree = graph.degree[edge.source].max(1) as f32;
                let target_degree = graph.degree[edge.target].max(1) as f32;
                Link {
                    source: edge.source,
                    target: edge.target,
                    distance: profile.link_distance
                        + graph.nodes[edge.source].radius
                        + graph.nodes[edge.target].radius,
                    strength: profile.link_strength_scale * edge.weight
                        / source_degree.min(target_degree),
                    bias: source_degree / (source_degree + target_degree),
                }
            })
            .collect();

        Self {
            config: config.clone(),
            profile,
            bodies,
            groups: graph.nodes.iter().map(|node| node.group).collect(),
            anchors: cluster_anchors(graph.groups.len(), profile.cluster_ring_radius),
            links,
            alpha: 0.0,
            alpha_decay: config.alpha_decay,
            running: false,
            paused: false,
            tick_count: 0,
            seeded: 0,
            scratch: PhysicsScratch::default(),
        }
    }

    pub fn bodies(&self) -> &[Body] {
        &self.bodies
    }

    pub fn position(&self, index: usize) -> Option<Vec2> {
        self.bodies.get(index).and_then(|body| body.position)
    }

    pub fn state(&self) -> SimulationState {
        SimulationState {
            alpha: self.alpha,
            running: self.running,
            paused: self.paused,
            tick_count: self.tick_count,
        }
    }

    pub fn profile(&self) -> &ForceProfile {
        &self.profile
    }

    fn restart_profile(&self, trigger: RestartTrigger) -> RestartProfile {
        match trigger {
            RestartTrigger::InitialLoad => self.config.initial_load,
            RestartTrigger::DataChanged => self.config.data_changed,
            RestartTrigger::ManualRefresh => self.config.manual_refresh,
        }
    }

    /// Reseeds the energy. `energy` overrides the trigger's profile alpha.
    pub fn restart(&mut self, trigger: RestartTrigger, energy: Option<f64>) {
        let profile = self.restart_profile(trigger);
        let alpha = energy.unwrap_or(profile.alpha);
        self.alpha = if alpha.is_finite() {
            alpha.clamp(0.0, 1.0)
        } else {
            profile.alpha
        };
        self.alpha_decay = profile.alpha_decay.unwrap_or(self.config.alpha_decay);
        self.running = !self.bodies.is_empty()
            && (self.alpha >= self.config.alpha_min || self.config.alpha_target > 0.0);
        debug!(
            "physics restart {:?}: alpha {:.3}, decay {:.4}",
            trigger, self.alpha, self.alpha_decay
        );
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    /// Drops all energy; only a restart brings the simulation back.
    pub fn stop(&mut self) {
        self.alpha = 0.0;
        self.running = false;
    }

    pub fn is_active(&self) -> bool {
        self.running && !self.paused
    }

    /// Sets or clears a pin. A new pin moves the body immediately.
    pub fn pin(&mut self, index: usize, position: Option<Vec2>, stamp: Generation) -> bool {
        let Some(body) = self.bodies.get_mut(index) else {
            return false;
        };
        if position.is_some_and(|position| !position.is_finite()) {
            return false;
        }

        body.pinned = position;
        if let Some(position) = position {
            body.velocity = Vec2::ZERO;
            if body.position != Some(position) {
                body.position = Some(position);
                body.last_update = stamp;
            }
        }
        true
    }

    /// Gives every unpositioned body a spot on a phyllotaxis spiral.
    fn seed_positions(&mut self, stamp: Generation) {
        for body in &mut self.bodies {
            if body.position.is_none() {
                body.position = Some(body.pinned.unwrap_or_else(|| phyllotaxis(self.seeded)));
                body.last_update = stamp;
                self.seeded += 1;
            }
        }
    }

    /// Advances one step. Returns whether any body moved; bodies that moved
    /// are stamped with `stamp`.
    pub fn tick(&mut self, stamp: Generation) -> bool {
        if !self.is_active() || self.bodies.is_empty() {
            return false;
        }

        let unseeded_before = self.bodies.iter().any(|body| body.position.is_none());
        if unseeded_before {
            self.seed_positions(stamp);
        }

        self.alpha += (self.config.alpha_target - self.alpha) * self.alpha_decay;
        let alpha = self.alpha as f32;
        self.accumulate_forces(alpha);
        let moved = self.integrate(stamp) || unseeded_before;
        self.tick_count += 1;

        if self.alpha < self.config.alpha_min {
            self.running = false;
            debug!(
                "physics settled after {} ticks (alpha {:.5})",
                self.tick_count, self.alpha
            );
        }
        trace!("physics tick {}: alpha {:.4}, moved {moved}", self.tick_count, self.alpha);

        moved
    }

    fn accumulate_forces(&mut self, alpha: f32) {
        let node_count = self.bodies.len();
        let scratch = &mut self.scratch;
        scratch.positions.clear();
        scratch.velocities.clear();
        scratch.radii.clear();
        scratch.positions.reserve(node_count);
        scratch.velocities.reserve(node_count);
        scratch.radii.reserve(node_count);
        for body in &self.bodies {
            scratch.positions.push(body.position.unwrap_or(Vec2::ZERO));
            scratch.velocities.push(body.velocity);
            scratch.radii.push(body.radius + self.profile.collision_padding * 0.5);
        }

        let profile = self.profile;
        apply_links(&self.links, &scratch.positions, &mut scratch.velocities, alpha);

        if profile.charge_strength != 0.0
            && let Some(tree) = QuadNode::build(&scratch.positions, &scratch.radii)
        {
            let params = ChargeParams {
                strength: profile.charge_strength,
                distance_min_sq: profile.charge_distance_min * profile.charge_distance_min,
                distance_max_sq: profile.charge_distance_max * profile.charge_distance_max,
                theta_sq: profile.theta * profile.theta,
                alpha,
            };
            for (index, velocity) in scratch.velocities.iter_mut().enumerate() {
                accumulate_charge_for_node(&tree, index, &scratch.positions, params, velocity);
            }
        }

        if profile.cluster_strength > 0.0 {
            apply_cluster_pull(
                &self.groups,
                &self.anchors,
                &scratch.positions,
                &mut scratch.velocities,
                profile.cluster_strength,
                alpha,
            );
        }

        if profile.collision_strength > 0.0 {
            scratch.predicted.clear();
            scratch.predicted.extend(
                scratch
                    .positions
                    .iter()
                    .zip(&scratch.velocities)
                    .map(|(position, velocity)| *position + *velocity),
            );
            if let Some(tree) = QuadNode::build(&scratch.predicted, &scratch.radii) {
                accumulate_collision_pairs(
                    &tree,
                    &tree,
                    true,
                    &scratch.predicted,
                    &scratch.radii,
                    CollisionParams {
                        strength: profile.collision_strength,
                        padding: 0.0,
                    },
                    &mut scratch.velocities,
                );
            }
        }

        if profile.center_strength > 0.0 {
            let mut centroid = Vec2::ZERO;
            for position in &scratch.positions {
                centroid += *position;
            }
            centroid /= node_count as f32;
            let shift = centroid * profile.center_strength;
            if shift.length_sq() > 0.0 {
                for (position, body) in scratch.positions.iter_mut().zip(&self.bodies) {
                    if body.pinned.is_none() {
                        *position -= shift;
                    }
                }
            }
        }
    }

    fn integrate(&mut self, stamp: Generation) -> bool {
        let retain = 1.0 - self.config.velocity_decay;
        let mut any_motion = false;
        for (index, body) in self.bodies.iter_mut().enumerate() {
            let next_position = if let Some(pin) = body.pinned {
                body.velocity = Vec2::ZERO;
                pin
            } else {
                let mut velocity = self.scratch.velocities[index] * retain;
                if velocity.length_sq() < SLEEP_SPEED_SQ {
                    velocity = Vec2::ZERO;
                }
                body.velocity = velocity;
                self.scratch.positions[index] + velocity
            };

            if !next_position.is_finite() {
                continue;
            }
            if body.position != Some(next_position) {
                body.position = Some(next_position);
                body.last_update = stamp;
                any_motion = true;
            }
        }
        any_motion
    }

    /// Runs up to `max_ticks` ticks off the paint clock. Returns how many
    /// ticks ran.
    pub fn warm_start(&mut self, max_ticks: usize) -> usize {
        let mut ticks = 0;
        while ticks < max_ticks && self.is_active() {
            self.tick(0);
            ticks += 1;
        }
        debug!(
            "warm start ran {ticks} ticks, alpha {:.4}, settled {}",
            self.alpha, !self.running
        );
        ticks
    }
}
