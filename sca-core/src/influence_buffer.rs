use crate::types::{AttractorId, TipId};
use glam::Vec3;

/// Per-step record of which attractors were assigned to which tip.
///
/// For each `TipId`, this buffer stores:
///
/// - The sum of the positions of all assigned attractors.
/// - The ids of those attractors, in assignment order.
///
/// The sum lets the growth phase read the **mean** attractor position in
/// constant time; the id lists back the `assigned` view in snapshots.
///
/// `sum[i]` and `assigned[i]` correspond to tip `i`.
#[derive(Debug, Default)]
pub struct InfluenceBuffer {
    sum: Vec<Vec3>,
    assigned: Vec<Vec<AttractorId>>,
}

impl InfluenceBuffer {
    /// Creates a cleared buffer covering `len` tips.
    pub fn with_len(len: usize) -> Self {
        Self {
            sum: vec![Vec3::ZERO; len],
            assigned: vec![Vec::new(); len],
        }
    }

    /// Resizes the buffer to `len` tips and clears every entry, even when the
    /// length was already right.
    pub fn ensure_len(&mut self, len: usize) {
        if self.sum.len() != len {
            self.sum.resize(len, Vec3::ZERO);
            self.assigned.resize_with(len, Vec::new);
        }
        self.clear();
    }

    /// Clears all assignments without changing the length.
    pub fn clear(&mut self) {
        for v in &mut self.sum {
            *v = Vec3::ZERO;
        }
        for list in &mut self.assigned {
            list.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.sum.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sum.is_empty()
    }

    /// Assigns attractor `attractor` at `pos` to tip `id`.
    ///
    /// ### Panics
    /// Panics if `id` is out of bounds.
    #[inline]
    pub fn add(&mut self, id: TipId, attractor: AttractorId, pos: Vec3) {
        self.sum[id] += pos;
        self.assigned[id].push(attractor);
    }

    /// Mean position of the attractors assigned to `id`, or `None` if the tip
    /// received nothing (or lies beyond the buffer).
    #[inline]
    pub fn mean_pos(&self, id: TipId) -> Option<Vec3> {
        let n = self.assigned.get(id)?.len();
        if n == 0 {
            None
        } else {
            Some(self.sum[id] / n as f32)
        }
    }

    #[inline]
    pub fn is_influenced(&self, id: TipId) -> bool {
        self.assigned.get(id).is_some_and(|list| !list.is_empty())
    }

    /// Attractors assigned to `id` this step. Tips created after the buffer
    /// was sized have none.
    pub fn assigned(&self, id: TipId) -> &[AttractorId] {
        self.assigned.get(id).map(Vec::as_slice).unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_len_initializes_cleared_state() {
        let buf = InfluenceBuffer::with_len(5);

        assert_eq!(buf.len(), 5);
        assert!(buf.sum.iter().all(|v| *v == Vec3::ZERO));
        assert!((0..5).all(|i| !buf.is_influenced(i)));
    }

    #[test]
    fn ensure_len_clears_when_length_is_unchanged() {
        let mut buf = InfluenceBuffer::with_len(3);
        buf.add(1, 0, Vec3::new(1.0, 2.0, 3.0));
        assert!(buf.is_influenced(1));

        buf.ensure_len(3);

        assert_eq!(buf.len(), 3);
        assert!(!buf.is_influenced(1));
        assert_eq!(buf.mean_pos(1), None);
    }

    #[test]
    fn ensure_len_resizes_and_clears() {
        let mut buf = InfluenceBuffer::with_len(2);
        buf.add(0, 4, Vec3::X);

        buf.ensure_len(4);
        assert_eq!(buf.len(), 4);
        assert!((0..4).all(|i| !buf.is_influenced(i)));

        buf.ensure_len(1);
        assert_eq!(buf.len(), 1);
        assert!(buf.assigned(0).is_empty());
    }

    #[test]
    fn mean_pos_averages_assigned_positions() {
        let mut buf = InfluenceBuffer::with_len(2);

        buf.add(1, 10, Vec3::new(1.0, 0.0, 0.0));
        buf.add(1, 11, Vec3::new(3.0, 0.0, 2.0));

        assert_eq!(buf.mean_pos(1), Some(Vec3::new(2.0, 0.0, 1.0)));
        assert_eq!(buf.assigned(1), &[10, 11]);
        assert_eq!(buf.mean_pos(0), None);
    }

    #[test]
    fn lookups_beyond_the_buffer_are_empty() {
        let buf = InfluenceBuffer::with_len(1);

        assert!(!buf.is_influenced(7));
        assert!(buf.assigned(7).is_empty());
        assert_eq!(buf.mean_pos(7), None);
    }

    #[test]
    fn clear_drops_assignments_but_keeps_length() {
        let mut buf = InfluenceBuffer::with_len(4);
        buf.add(0, 0, Vec3::X);
        buf.add(2, 1, Vec3::Y);
        assert!(buf.is_influenced(0) && buf.is_influenced(2));
        assert!(!buf.is_influenced(1));

        buf.clear();
        assert_eq!(buf.len(), 4);
        assert!((0..4).all(|i| !buf.is_influenced(i)));
    }
}
