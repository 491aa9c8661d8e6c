//! Read-only views handed to renderers after each step.

use crate::{
    attractor::{AttractorSet, AttractorState},
    influence_buffer::InfluenceBuffer,
    tree::{TipState, Tree},
};
use glam::Vec3;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TipSnapshot {
    pub position: Vec3,
    pub state: TipState,
    pub parent_position: Option<Vec3>,
    /// Attractors that pulled on this tip during the latest step.
    pub assigned_attractor_positions: Vec<Vec3>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AttractorSnapshot {
    pub position: Vec3,
    pub state: AttractorState,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct StepSnapshot {
    pub tips: Vec<TipSnapshot>,
    pub attractors: Vec<AttractorSnapshot>,
}

impl StepSnapshot {
    pub fn capture(tree: &Tree, attractors: &AttractorSet, acc: &InfluenceBuffer) -> Self {
        let tips = tree
            .tips
            .iter()
            .enumerate()
            .map(|(id, tip)| TipSnapshot {
                position: tip.pos,
                state: tip.state,
                parent_position: tree.parent_pos(id),
                assigned_attractor_positions: acc
                    .assigned(id)
                    .iter()
                    .map(|&ai| attractors.points[ai].pos)
                    .collect(),
            })
            .collect();

        let attractors = attractors
            .points
            .iter()
            .map(|a| AttractorSnapshot {
                position: a.pos,
                state: a.state,
            })
            .collect();

        Self { tips, attractors }
    }

    pub fn growing_tips(&self) -> impl Iterator<Item = &TipSnapshot> + '_ {
        self.tips.iter().filter(|t| t.state == TipState::Growing)
    }
}
