//! The growth field: attractors, tips and the index over the growth front.

use crate::{
    attractor::{Attractor, AttractorSet},
    config::Config,
    error::Result,
    influence_buffer::InfluenceBuffer,
    octree::OctreeIndex,
    persist::FieldRecord,
    phases::{self, StepStats},
    snapshot::StepSnapshot,
    tree::{Tip, Tree},
    types::TipId,
};
use glam::Vec3;
use rand::{Rng, SeedableRng, rngs::StdRng};

/// Extra room around the working volume when sizing the index.
const BOUNDS_MARGIN: f32 = 1e-3;

/// Owns the simulation state and advances it one step at a time.
///
/// The index holds exactly the growing tips, keyed by their id. It is private
/// to the field; callers only ever see snapshots and records.
pub struct GrowthField {
    config: Config,
    tree: Tree,
    attractors: AttractorSet,
    index: OctreeIndex<TipId>,
    acc: InfluenceBuffer,
    rng: StdRng,
    steps: u64,
    last_stats: StepStats,
}

impl GrowthField {
    /// Validates `config`, then samples seeds on the surface of the region
    /// and attractors inside it.
    pub fn initialize(config: Config) -> Result<Self> {
        config.validate()?;
        let mut rng = make_rng(&config);

        let seeds = sample_seeds(&config, &mut rng);
        let attractors = AttractorSet::random_in_ball(
            Vec3::ZERO,
            config.region_radius,
            config.attractor_count,
            config.planar,
            &mut rng,
        );

        let field = Self::assemble(config, Tree::from_seeds(seeds), attractors, rng)?;
        log::info!(
            "initialized growth field: {} seeds, {} attractors, planar = {}",
            field.tree.len(),
            field.attractors.len(),
            field.config.planar
        );
        Ok(field)
    }

    /// Builds a field from explicit seed and attractor positions. Only the
    /// growth parameters of `config` are used.
    pub fn from_parts(config: Config, seeds: Vec<Vec3>, attractors: Vec<Vec3>) -> Result<Self> {
        config.validate_growth()?;
        let rng = make_rng(&config);
        Self::assemble(
            config,
            Tree::from_seeds(seeds),
            AttractorSet::from_positions(attractors),
            rng,
        )
    }

    /// Rebuilds a field from an exported record.
    pub fn from_record(config: Config, record: &FieldRecord) -> Result<Self> {
        config.validate_growth()?;
        let (tree, attractors) = record.rebuild()?;
        let rng = make_rng(&config);

        let field = Self::assemble(config, tree, attractors, rng)?;
        log::info!(
            "imported growth field: {} tips ({} growing), {} attractors ({} active)",
            field.tree.len(),
            field.index.len(),
            field.attractors.len(),
            field.attractors.active_count()
        );
        Ok(field)
    }

    /// Discards all state and starts over from `config`. On error the current
    /// state is kept.
    pub fn restart(&mut self, config: Config) -> Result<()> {
        *self = Self::initialize(config)?;
        Ok(())
    }

    fn assemble(
        config: Config,
        tree: Tree,
        attractors: AttractorSet,
        rng: StdRng,
    ) -> Result<Self> {
        let (origin, size) = index_bounds(&tree, &attractors, &config);
        let mut index = OctreeIndex::new(origin, size);
        for (id, tip) in tree.tips.iter().enumerate().filter(|(_, t)| t.is_growing()) {
            index.insert(tip.pos, id)?;
        }

        Ok(Self {
            acc: InfluenceBuffer::with_len(tree.len()),
            config,
            tree,
            attractors,
            index,
            rng,
            steps: 0,
            last_stats: StepStats::default(),
        })
    }

    /// Advances the structure by one step and returns the resulting snapshot.
    pub fn step(&mut self) -> StepSnapshot {
        let mut stats = StepStats::default();

        phases::attraction_phase(
            &self.tree,
            &self.index,
            &mut self.attractors,
            &self.config,
            &mut self.acc,
            &mut stats,
        );
        let outcome = phases::growth_phase(
            &mut self.tree,
            &self.acc,
            &self.config,
            &mut self.rng,
            &mut stats,
        );
        phases::index_phase(&mut self.tree, &mut self.index, &outcome, &mut stats);

        debug_assert_eq!(self.index.len(), self.tree.growing_count());

        self.steps += 1;
        self.last_stats = stats;
        log::debug!(
            "step {}: assigned {}, consumed {}, spawned {} ({} lateral), terminated {}, skipped {}, front {}",
            self.steps,
            stats.assigned,
            stats.consumed,
            stats.spawned,
            stats.lateral,
            stats.terminated,
            stats.skipped,
            self.index.len()
        );

        self.snapshot()
    }

    pub fn snapshot(&self) -> StepSnapshot {
        StepSnapshot::capture(&self.tree, &self.attractors, &self.acc)
    }

    pub fn export(&self) -> FieldRecord {
        FieldRecord::capture(&self.tree, &self.attractors)
    }

    /// `true` once nothing can grow: no growing tips or no active attractors.
    pub fn is_finished(&self) -> bool {
        self.index.is_empty() || self.attractors.active_count() == 0
    }

    pub fn tips(&self) -> &[Tip] {
        &self.tree.tips
    }

    pub fn attractors(&self) -> &[Attractor] {
        &self.attractors.points
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn last_stats(&self) -> StepStats {
        self.last_stats
    }

    /// Number of tips currently on the growth front.
    pub fn front_len(&self) -> usize {
        self.index.len()
    }
}

fn make_rng(config: &Config) -> StdRng {
    match config.rng_seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

/// Random points on the region's surface (its rim when planar).
fn sample_seeds(config: &Config, rng: &mut impl Rng) -> Vec<Vec3> {
    (0..config.seed_count)
        .map(|_| loop {
            let mut v = Vec3::new(
                rng.random::<f32>() - 0.5,
                rng.random::<f32>() - 0.5,
                rng.random::<f32>() - 0.5,
            );
            if config.planar {
                v.z = 0.0;
            }
            if let Some(dir) = v.try_normalize() {
                break dir * config.region_radius;
            }
        })
        .collect()
}

/// Cube enclosing every tip and attractor, widened by how far a child can
/// land from an attractor it was pulled by.
fn index_bounds(tree: &Tree, attractors: &AttractorSet, config: &Config) -> (Vec3, f32) {
    let mut points = tree
        .tips
        .iter()
        .map(|t| t.pos)
        .chain(attractors.points.iter().map(|a| a.pos));

    let Some(first) = points.next() else {
        return (Vec3::splat(-1.0), 2.0);
    };
    let (min, max) = points.fold((first, first), |(lo, hi), p| (lo.min(p), hi.max(p)));

    let center = (min + max) * 0.5;
    let half = (max - min).max_element() * 0.5
        + config.max_attraction_radius
        + config.growth_step
        + BOUNDS_MARGIN;
    (center - Vec3::splat(half), half * 2.0)
}
