use glam::Vec3;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Lifecycle of an attractor. `Consumed` is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttractorState {
    Active,
    Consumed,
}

#[derive(Clone, Debug)]
pub struct Attractor {
    pub pos: Vec3,
    pub state: AttractorState,
}

impl Attractor {
    #[inline]
    pub fn is_active(&self) -> bool {
        self.state == AttractorState::Active
    }

    /// Marks the attractor consumed. There is no way back.
    #[inline]
    pub fn consume(&mut self) {
        self.state = AttractorState::Consumed;
    }
}

#[derive(Clone, Debug, Default)]
pub struct AttractorSet {
    pub points: Vec<Attractor>,
}

impl AttractorSet {
    pub fn from_positions(positions: Vec<Vec3>) -> Self {
        let points = positions
            .into_iter()
            .map(|pos| Attractor {
                pos,
                state: AttractorState::Active,
            })
            .collect();

        Self { points }
    }

    /// Rejection-samples `count` points inside a ball of `radius` around
    /// `center`. With `planar` set the ball collapses to a disc at the
    /// center's z.
    pub fn random_in_ball(
        center: Vec3,
        radius: f32,
        count: usize,
        planar: bool,
        rng: &mut impl Rng,
    ) -> Self {
        let mut positions = Vec::with_capacity(count);
        while positions.len() < count {
            let x = rng.random_range(-radius..=radius);
            let y = rng.random_range(-radius..=radius);
            let z = if planar {
                0.0
            } else {
                rng.random_range(-radius..=radius)
            };
            let offset = Vec3::new(x, y, z);
            if offset.length() > radius {
                continue;
            }
            positions.push(center + offset);
        }

        Self::from_positions(positions)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn active_count(&self) -> usize {
        self.points.iter().filter(|a| a.is_active()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};

    #[test]
    fn from_positions_starts_active() {
        let set = AttractorSet::from_positions(vec![Vec3::X, Vec3::Y]);

        assert_eq!(set.len(), 2);
        assert_eq!(set.active_count(), 2);
    }

    #[test]
    fn random_in_ball_stays_inside() {
        let mut rng = StdRng::seed_from_u64(3);
        let center = Vec3::new(0.0, 2.0, 0.0);
        let set = AttractorSet::random_in_ball(center, 0.5, 500, false, &mut rng);

        assert_eq!(set.len(), 500);
        assert!(set.points.iter().all(|a| a.pos.distance(center) <= 0.5));
        assert!(set.points.iter().any(|a| a.pos.z != 0.0));
    }

    #[test]
    fn planar_sampling_flattens_z() {
        let mut rng = StdRng::seed_from_u64(4);
        let set = AttractorSet::random_in_ball(Vec3::ZERO, 1.0, 300, true, &mut rng);

        assert!(set.points.iter().all(|a| a.pos.z == 0.0 && a.pos.length() <= 1.0));
    }

    #[test]
    fn consume_is_terminal() {
        let mut set = AttractorSet::from_positions(vec![Vec3::ZERO]);
        set.points[0].consume();

        assert!(!set.points[0].is_active());
        assert_eq!(set.active_count(), 0);
    }
}
