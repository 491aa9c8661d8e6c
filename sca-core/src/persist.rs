//! Flat, index-based records for an external persistence layer.
//!
//! Tips reference their parent by position in the tip list (`-1` for roots),
//! which is enough to rebuild the forest exactly.

use crate::{
    attractor::{Attractor, AttractorSet, AttractorState},
    error::ImportError,
    tree::{Tip, TipState, Tree},
};
use glam::Vec3;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TipRecord {
    pub position: Vec3,
    pub parent_index: i64,
    pub state: TipState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading: Option<Vec3>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AttractorRecord {
    pub position: Vec3,
    pub state: AttractorState,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldRecord {
    pub tips: Vec<TipRecord>,
    pub attractors: Vec<AttractorRecord>,
}

impl FieldRecord {
    pub fn capture(tree: &Tree, attractors: &AttractorSet) -> Self {
        let tips = tree
            .tips
            .iter()
            .map(|tip| TipRecord {
                position: tip.pos,
                parent_index: tip.parent.map_or(-1, |p| p as i64),
                state: tip.state,
                heading: tip.heading,
            })
            .collect();

        let attractors = attractors
            .points
            .iter()
            .map(|a| AttractorRecord {
                position: a.pos,
                state: a.state,
            })
            .collect();

        Self { tips, attractors }
    }

    /// Rebuilds the tip arena and attractor set.
    ///
    /// ### Errors
    /// [`ImportError::InvalidParent`] unless every parent index is `-1` or
    /// refers to an earlier tip.
    pub fn rebuild(&self) -> Result<(Tree, AttractorSet), ImportError> {
        let mut tips = Vec::with_capacity(self.tips.len());
        for (index, record) in self.tips.iter().enumerate() {
            let parent = match record.parent_index {
                -1 => None,
                p if p >= 0 && (p as usize) < index => Some(p as usize),
                p => {
                    return Err(ImportError::InvalidParent { index, parent: p });
                }
            };
            tips.push(Tip {
                pos: record.position,
                state: record.state,
                parent,
                heading: record.heading,
            });
        }

        let points = self
            .attractors
            .iter()
            .map(|r| Attractor {
                pos: r.position,
                state: r.state,
            })
            .collect();

        Ok((Tree { tips }, AttractorSet { points }))
    }
}
