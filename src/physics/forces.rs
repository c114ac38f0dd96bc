use std::f32::consts::TAU;

use eframe::egui::{Vec2, vec2};

use super::quadtree::QuadNode;

/// Tiny deterministic offset for coincident points.
pub(super) fn jiggle(seed: usize) -> Vec2 {
    let angle = ((seed as f32) * 0.618_034 + 0.37) * TAU;
    vec2(angle.cos(), angle.sin()) * 1e-6
}

#[derive(Clone, Copy, Debug)]
pub(super) struct Link {
    pub(super) source: usize,
    pub(super) target: usize,
    pub(super) distance: f32,
    pub(super) strength: f32,
    /// Share of the correction applied to the target.
    pub(super) bias: f32,
}

pub(super) fn apply_links(links: &[Link], positions: &[Vec2], velocities: &mut [Vec2], alpha: f32) {
    for (seed, link) in links.iter().enumerate() {
        let (source, target) = (link.source, link.target);
        let mut delta =
            (positions[target] + velocities[target]) - (positions[source] + velocities[source]);
        if delta == Vec2::ZERO {
            delta = jiggle(seed);
        }

        let length = delta.length();
        let correction = delta * ((length - link.distance) / length * alpha * link.strength);
        velocities[target] -= correction * link.bias;
        velocities[source] += correction * (1.0 - link.bias);
    }
}

#[derive(Clone, Copy, Debug)]
pub(super) struct ChargeParams {
    /// Negative values repel.
    pub(super) strength: f32,
    pub(super) distance_min_sq: f32,
    pub(super) distance_max_sq: f32,
    pub(super) theta_sq: f32,
    pub(super) alpha: f32,
}

fn charge_contribution(delta: Vec2, mut distance_sq: f32, weight: f32, params: ChargeParams) -> Vec2 {
    if distance_sq < params.distance_min_sq {
        distance_sq = (params.distance_min_sq * distance_sq).sqrt();
    }
    delta * (params.strength * weight * params.alpha / distance_sq)
}

pub(super) fn accumulate_charge_for_node(
    node: &QuadNode,
    index: usize,
    positions: &[Vec2],
    params: ChargeParams,
    velocity: &mut Vec2,
) {
    if node.mass <= 0.0 {
        return;
    }

    let point = positions[index];

    if node.is_leaf() {
        for &other_index in &node.indices {
            if other_index == index {
                continue;
            }
            let mut delta = positions[other_index] - point;
            if delta == Vec2::ZERO {
                delta = jiggle(index ^ other_index.rotate_left(7));
            }
            let distance_sq = delta.length_sq();
            if distance_sq >= params.distance_max_sq {
                continue;
            }
            *velocity += charge_contribution(delta, distance_sq, 1.0, params);
        }
        return;
    }

    let delta = node.center_of_mass - point;
    let distance_sq = delta.length_sq().max(1e-9);
    let side = node.bounds.side_length();
    let can_approximate =
        !node.bounds.contains(point) && (side * side) / params.theta_sq < distance_sq;

    if can_approximate {
        if distance_sq < params.distance_max_sq {
            *velocity += charge_contribution(delta, distance_sq, node.mass, params);
        }
        return;
    }

    for child in node.children() {
        accumulate_charge_for_node(child, index, positions, params, velocity);
    }
}

#[derive(Clone, Copy, Debug)]
pub(super) struct CollisionParams {
    pub(super) strength: f32,
    pub(super) padding: f32,
}

fn resolve_collision(
    from: usize,
    to: usize,
    predicted: &[Vec2],
    radii: &[f32],
    params: CollisionParams,
    velocities: &mut [Vec2],
) {
    let reach = radii[from] + radii[to] + params.padding;
    let mut delta = predicted[from] - predicted[to];
    if delta == Vec2::ZERO {
        delta = jiggle(from.wrapping_mul(31) ^ to.wrapping_mul(131));
    }

    let distance_sq = delta.length_sq();
    if distance_sq >= reach * reach {
        return;
    }

    let distance = distance_sq.sqrt();
    let push = delta * ((reach - distance) / distance * params.strength);
    let from_sq = radii[from] * radii[from];
    let to_sq = radii[to] * radii[to];
    let share = if from_sq + to_sq > 0.0 {
        to_sq / (from_sq + to_sq)
    } else {
        0.5
    };
    velocities[from] += push * share;
    velocities[to] -= push * (1.0 - share);
}

/// Dual-tree traversal over every pair of cells whose boxes come close
/// enough for their largest members to touch.
pub(super) fn accumulate_collision_pairs(
    node_a: &QuadNode,
    node_b: &QuadNode,
    same_node: bool,
    predicted: &[Vec2],
    radii: &[f32],
    params: CollisionParams,
    velocities: &mut [Vec2],
) {
    let reach = node_a.max_radius + node_b.max_radius + params.padding;
    if node_a.bounds.distance_sq_to(node_b.bounds) > reach * reach {
        return;
    }

    if node_a.is_leaf() && node_b.is_leaf() {
        if same_node {
            for (offset, &from) in node_a.indices.iter().enumerate() {
                for &to in &node_a.indices[(offset + 1)..] {
                    resolve_collision(from, to, predicted, radii, params, velocities);
                }
            }
        } else {
            for &from in &node_a.indices {
                for &to in &node_b.indices {
                    resolve_collision(from, to, predicted, radii, params, velocities);
                }
            }
        }
        return;
    }

    if same_node {
        let children = node_a.children().collect::<Vec<_>>();
        for (first, child_a) in children.iter().enumerate() {
            accumulate_collision_pairs(
                child_a, child_a, true, predicted, radii, params, velocities,
            );
            for child_b in &children[(first + 1)..] {
                accumulate_collision_pairs(
                    child_a, child_b, false, predicted, radii, params, velocities,
                );
            }
        }
        return;
    }

    let split_a = if node_a.is_leaf() {
        false
    } else if node_b.is_leaf() {
        true
    } else {
        node_a.bounds.half_extent >= node_b.bounds.half_extent
    };

    if split_a {
        for child in node_a.children() {
            accumulate_collision_pairs(child, node_b, false, predicted, radii, params, velocities);
        }
    } else {
        for child in node_b.children() {
            accumulate_collision_pairs(node_a, child, false, predicted, radii, params, velocities);
        }
    }
}

/// Pulls grouped nodes towards their group's anchor.
pub(super) fn apply_cluster_pull(
    groups: &[Option<usize>],
    anchors: &[Vec2],
    positions: &[Vec2],
    velocities: &mut [Vec2],
    strength: f32,
    alpha: f32,
) {
    if strength <= 0.0 || anchors.is_empty() {
        return;
    }

    for ((group, position), velocity) in groups.iter().zip(positions).zip(velocities.iter_mut()) {
        if let Some(anchor) = group.and_then(|group| anchors.get(group)) {
            *velocity += (*anchor - *position) * (strength * alpha);
        }
    }
}

/// Anchors spaced evenly on a ring, one per group.
pub(super) fn cluster_anchors(group_count: usize, ring_radius: f32) -> Vec<Vec2> {
    if group_count <= 1 {
        return vec![Vec2::ZERO; group_count];
    }

    (0..group_count)
        .map(|group| {
            let angle = (group as f32 / group_count as f32) * TAU;
            vec2(angle.cos(), angle.sin()) * ring_radius
        })
        .collect()
}
