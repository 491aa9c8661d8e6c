use crate::types::TipId;
use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Lifecycle of a tip. `Terminated` is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TipState {
    Growing,
    Terminated,
}

#[derive(Clone, Debug)]
pub struct Tip {
    pub pos: Vec3,
    pub state: TipState,
    /// Back-reference into the arena. Always smaller than this tip's own id.
    pub parent: Option<TipId>,
    /// Unit direction this tip was grown along. Seeds have none.
    pub heading: Option<Vec3>,
}

/// Append-only arena of tips. Parent links point strictly backwards, so the
/// arena is a forest by construction.
#[derive(Clone, Debug, Default)]
pub struct Tree {
    pub tips: Vec<Tip>,
}

impl Tip {
    pub fn new_seed(pos: Vec3) -> Self {
        Self {
            pos,
            state: TipState::Growing,
            parent: None,
            heading: None,
        }
    }

    pub fn new_child(pos: Vec3, parent: TipId, heading: Vec3) -> Self {
        Self {
            pos,
            state: TipState::Growing,
            parent: Some(parent),
            heading: Some(heading),
        }
    }

    #[inline]
    pub fn is_growing(&self) -> bool {
        self.state == TipState::Growing
    }

    /// View-cone test. `cos_half_angle` is the cosine of the cone's
    /// half-angle; tips without a heading see everything.
    pub fn sees(&self, target: Vec3, cos_half_angle: f32) -> bool {
        let Some(heading) = self.heading else {
            return true;
        };
        match (target - self.pos).try_normalize() {
            Some(dir) => heading.dot(dir) >= cos_half_angle,
            None => true,
        }
    }
}

impl Tree {
    pub fn from_seeds(seeds: impl IntoIterator<Item = Vec3>) -> Self {
        Self {
            tips: seeds.into_iter().map(Tip::new_seed).collect(),
        }
    }

    pub fn add_child(&mut self, parent: TipId, pos: Vec3, heading: Vec3) -> TipId {
        let id = self.tips.len();
        self.tips.push(Tip::new_child(pos, parent, heading));
        id
    }

    pub fn terminate(&mut self, id: TipId) {
        self.tips[id].state = TipState::Terminated;
    }

    pub fn len(&self) -> usize {
        self.tips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tips.is_empty()
    }

    pub fn growing_count(&self) -> usize {
        self.tips.iter().filter(|t| t.is_growing()).count()
    }

    pub fn parent_pos(&self, id: TipId) -> Option<Vec3> {
        self.tips[id].parent.map(|p| self.tips[p].pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn children_link_back_to_parent() {
        let mut tree = Tree::from_seeds([Vec3::ZERO]);
        let a = tree.add_child(0, Vec3::Z, Vec3::Z);
        let b = tree.add_child(a, Vec3::Z * 2.0, Vec3::Z);

        assert_eq!(tree.tips[b].parent, Some(a));
        assert_eq!(tree.parent_pos(b), Some(Vec3::Z));
        assert_eq!(tree.parent_pos(0), None);
        assert_eq!(tree.growing_count(), 3);
    }

    #[test]
    fn view_cone_gates_by_heading() {
        let tip = Tip::new_child(Vec3::ZERO, 0, Vec3::X);
        let cos_45 = 45f32.to_radians().cos();

        assert!(tip.sees(Vec3::new(1.0, 0.5, 0.0), cos_45));
        assert!(!tip.sees(Vec3::new(0.0, 1.0, 0.0), cos_45));
        assert!(!tip.sees(Vec3::new(-1.0, 0.0, 0.0), cos_45));
        // Coincident target has no direction to reject.
        assert!(tip.sees(Vec3::ZERO, cos_45));
    }

    #[test]
    fn seeds_see_everything() {
        let seed = Tip::new_seed(Vec3::ZERO);

        assert!(seed.sees(Vec3::new(-1.0, 0.0, 0.0), 1.0));
    }
}
