//! The phases of one growth step.
//!
//! A step runs:
//! 1. [`attraction_phase`]: every active attractor is assigned to its
//!    nearest visible growing tip; attractors inside the dead zone of that
//!    tip are consumed.
//! 2. [`growth_phase`]: every assigned tip grows a primary child toward the
//!    mean of its attractors and, by chance, a lateral one. Tips with nothing
//!    assigned are terminated.
//! 3. [`index_phase`]: retired tips leave the spatial index and new children
//!    enter it, so the index again mirrors the growth front.

use crate::{
    attractor::AttractorSet,
    config::Config,
    influence_buffer::InfluenceBuffer,
    octree::{Hit, OctreeIndex},
    tree::Tree,
    types::TipId,
};
use glam::{Quat, Vec3};
use rand::Rng;

/// Mean directions shorter than this are degenerate and skip the tip.
pub const DEGENERATE_EPSILON: f32 = 1e-5;

/// Counters collected over one step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StepStats {
    /// Attractors assigned to some tip.
    pub assigned: usize,
    /// Attractors consumed this step.
    pub consumed: usize,
    /// Children created, lateral ones included.
    pub spawned: usize,
    /// Lateral children among `spawned`.
    pub lateral: usize,
    /// Tips terminated because nothing was assigned to them.
    pub terminated: usize,
    /// Tips that kept growing state because their mean direction was degenerate.
    pub skipped: usize,
    /// Children that fell outside the index bounds and were terminated.
    pub rejected: usize,
}

/// Tips created and tips retired by [`growth_phase`].
#[derive(Debug, Default)]
pub struct GrowthOutcome {
    pub spawned: Vec<TipId>,
    pub retired: Vec<TipId>,
}

/// Nearest growing tip within `cfg.max_attraction_radius` of `pos` whose view
/// cone contains `pos`.
pub fn nearest_visible_tip(
    tree: &Tree,
    index: &OctreeIndex<TipId>,
    pos: Vec3,
    cfg: &Config,
) -> Option<Hit<TipId>> {
    match cfg.view_cone_cos() {
        None => index.find_nearest(pos, cfg.max_attraction_radius),
        Some(cos_half) => index
            .find_within_radius(pos, cfg.max_attraction_radius)
            .into_iter()
            .filter(|hit| tree.tips[hit.payload].sees(pos, cos_half))
            .min_by(|a, b| a.distance.total_cmp(&b.distance)),
    }
}

/// Assigns active attractors to tips and consumes those in the dead zone.
///
/// For each active attractor:
///
/// 1. Calls [`nearest_visible_tip`] to find the closest growing tip within
///    `cfg.max_attraction_radius` whose view cone contains it.
/// 2. If one exists, adds the attractor to that tip's entry in the
///    [`InfluenceBuffer`].
/// 3. If the tip is within `cfg.dead_zone_radius`, marks the attractor
///    consumed.
///
/// The buffer is resized (and cleared) to `tree.len()` first via
/// [`InfluenceBuffer::ensure_len`]. A consumed attractor still counts toward
/// its tip's mean in this step.
///
/// ### Parameters
/// - `tree` - The current forest; only read access is required.
/// - `index` - Spatial index over the growing tips.
/// - `attractors` - Attractor set; consumed ones change state.
/// - `cfg` - Supplies the attraction and dead-zone radii and the view cone.
/// - `acc` - Scratch buffer receiving the assignments per tip.
/// - `stats` - Assignment and consumption counters are added here.
pub fn attraction_phase(
    tree: &Tree,
    index: &OctreeIndex<TipId>,
    attractors: &mut AttractorSet,
    cfg: &Config,
    acc: &mut InfluenceBuffer,
    stats: &mut StepStats,
) {
    acc.ensure_len(tree.len());

    for (ai, a) in attractors
        .points
        .iter_mut()
        .enumerate()
        .filter(|(_, a)| a.is_active())
    {
        let Some(hit) = nearest_visible_tip(tree, index, a.pos, cfg) else {
            continue;
        };
        acc.add(hit.payload, ai, a.pos);
        stats.assigned += 1;

        if hit.distance <= cfg.dead_zone_radius {
            a.consume();
            stats.consumed += 1;
        }
    }
}

/// Grows children from every assigned tip and terminates starved ones.
///
/// For each growing tip known to `acc`:
///
/// - nothing assigned: the tip is terminated;
/// - mean attractor position (almost) on the tip: the tip is left alone for
///   this step;
/// - otherwise a primary child is placed `cfg.growth_step` along the unit
///   direction to the mean, and with `cfg.split_probability` a lateral child
///   along that direction rotated by `cfg.branch_angle_degrees`. The parent
///   is then terminated, its children being the new front.
///
/// Retired tips are returned so [`index_phase`] can drop them.
///
/// ### Parameters
/// - `tree` - The forest to be mutated; children are appended.
/// - `acc` - Assignments from [`attraction_phase`].
/// - `cfg` - Supplies the step length, split chance and branch angle.
/// - `rng` - Drives the split decision and the lateral direction.
/// - `stats` - Growth counters are added here.
///
/// ### Returns
/// A [`GrowthOutcome`] with the new children and the retired tips, both in
/// the order they were produced.
pub fn growth_phase(
    tree: &mut Tree,
    acc: &InfluenceBuffer,
    cfg: &Config,
    rng: &mut impl Rng,
    stats: &mut StepStats,
) -> GrowthOutcome {
    let mut outcome = GrowthOutcome::default();
    let front = acc.len().min(tree.len());

    for id in 0..front {
        if !tree.tips[id].is_growing() {
            continue;
        }

        let Some(mean) = acc.mean_pos(id) else {
            tree.terminate(id);
            outcome.retired.push(id);
            stats.terminated += 1;
            continue;
        };

        let pos = tree.tips[id].pos;
        let delta = mean - pos;
        let len = delta.length();
        if !(len > DEGENERATE_EPSILON) {
            log::trace!("tip {id} at {pos} has a degenerate mean direction, skipping");
            stats.skipped += 1;
            continue;
        }

        let heading = delta / len;
        outcome
            .spawned
            .push(tree.add_child(id, pos + heading * cfg.growth_step, heading));

        if cfg.split_probability > 0.0 && rng.random_bool(f64::from(cfg.split_probability)) {
            let lateral = lateral_heading(heading, cfg, rng);
            outcome
                .spawned
                .push(tree.add_child(id, pos + lateral * cfg.growth_step, lateral));
            stats.lateral += 1;
        }

        tree.terminate(id);
        outcome.retired.push(id);
    }

    stats.spawned = outcome.spawned.len();
    outcome
}

/// Direction of a lateral child: `heading` rotated by
/// `cfg.branch_angle_degrees`.
///
/// A heading on the z = 0 plane rotates about ±Z (side picked at random)
/// when `cfg.planar` is set, which keeps the child on the plane. Any other
/// heading rotates about a random axis perpendicular to it, so the branch
/// angle holds even for out-of-plane tips in a planar run.
///
/// ### Parameters
/// - `heading` - Unit direction of the primary child.
/// - `cfg` - Supplies the branch angle and the planar flag.
/// - `rng` - Picks the rotation side or axis.
///
/// ### Returns
/// A unit vector at `cfg.branch_angle_degrees` from `heading`.
pub fn lateral_heading(heading: Vec3, cfg: &Config, rng: &mut impl Rng) -> Vec3 {
    let angle = cfg.branch_angle_degrees.to_radians();
    let in_plane = heading.z.abs() <= DEGENERATE_EPSILON;
    let axis = if cfg.planar && in_plane {
        if rng.random_bool(0.5) {
            Vec3::Z
        } else {
            Vec3::NEG_Z
        }
    } else {
        let roll = rng.random_range(0.0..std::f32::consts::TAU);
        Quat::from_axis_angle(heading, roll) * heading.any_orthonormal_vector()
    };
    (Quat::from_axis_angle(axis, angle) * heading).normalize()
}

/// Drops retired tips from the index and inserts the new children.
///
/// A child outside the index bounds cannot be part of the front; it is
/// terminated instead.
///
/// ### Parameters
/// - `tree` - The forest; rejected children are terminated.
/// - `index` - Spatial index over the growing tips.
/// - `outcome` - What [`growth_phase`] spawned and retired.
/// - `stats` - Rejected inserts are counted here.
pub fn index_phase(
    tree: &mut Tree,
    index: &mut OctreeIndex<TipId>,
    outcome: &GrowthOutcome,
    stats: &mut StepStats,
) {
    for &id in &outcome.retired {
        index.remove_if(tree.tips[id].pos, |&t| t == id);
    }

    for &id in &outcome.spawned {
        let pos = tree.tips[id].pos;
        if let Err(err) = index.insert(pos, id) {
            log::warn!("tip {id} dropped from the growth front: {err}");
            tree.terminate(id);
            stats.rejected += 1;
        }
    }
}
