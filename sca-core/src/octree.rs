//! Point octree over a fixed cube, with logical deletion.
//!
//! The index associates a small `Copy` payload (a tip id, in practice) with
//! each inserted point and answers:
//!
//! - [`OctreeIndex::contains`]: is there a live point near `p`?
//! - [`OctreeIndex::find_nearest`]: the nearest live point within a limit.
//! - [`OctreeIndex::find_within_radius`]: every live point within a radius.
//!
//! Removal only tombstones an entry. Cells are never merged back and entries
//! are never compacted, which keeps ids stable while a growth step is
//! mutating the index.
//!
//! Cells live in a flat arena (`cells[0]` is the root). A leaf splits into
//! eight equal children as soon as it holds more than one entry, unless it is
//! already at [`MAX_DEPTH`].

use crate::error::IndexError;
use glam::Vec3;

/// Deepest level a cell may be split to.
pub const MAX_DEPTH: u8 = 8;

/// Slack added to every cell boundary to absorb floating-point error.
pub const BOUNDARY_EPSILON: f32 = 1e-5;

/// A live entry returned by a query.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Hit<T> {
    pub payload: T,
    pub position: Vec3,
    /// Euclidean distance from the query point.
    pub distance: f32,
}

#[derive(Clone, Debug)]
struct Entry<T> {
    position: Vec3,
    payload: T,
    tombstoned: bool,
}

#[derive(Clone, Debug)]
struct Cell {
    min: Vec3,
    size: f32,
    depth: u8,
    /// Non-tombstoned entries in this subtree.
    live: usize,
    /// Entry ids, only populated for leaves.
    entries: Vec<usize>,
    children: Option<[usize; 8]>,
}

impl Cell {
    fn new(min: Vec3, size: f32, depth: u8) -> Self {
        Self {
            min,
            size,
            depth,
            live: 0,
            entries: Vec::new(),
            children: None,
        }
    }

    fn center(&self) -> Vec3 {
        self.min + Vec3::splat(self.size * 0.5)
    }

    /// Inclusive lower bound, exclusive upper bound, both widened by `margin`.
    fn contains_within(&self, p: Vec3, margin: f32) -> bool {
        let lo = self.min - Vec3::splat(margin);
        let hi = self.min + Vec3::splat(self.size + margin);
        p.cmpge(lo).all() && p.cmplt(hi).all()
    }

    fn contains(&self, p: Vec3) -> bool {
        self.contains_within(p, BOUNDARY_EPSILON)
    }

    /// `true` when `p` is farther than `reach` from this cell on some axis,
    /// so nothing inside can lie within `reach` of `p`.
    fn out_of_reach(&self, p: Vec3, reach: f32) -> bool {
        let pad = Vec3::splat(reach + BOUNDARY_EPSILON);
        let lo = self.min - pad;
        let hi = self.min + Vec3::splat(self.size) + pad;
        p.cmplt(lo).any() || p.cmpgt(hi).any()
    }
}

/// Dynamic point octree with tombstone removal.
#[derive(Clone, Debug)]
pub struct OctreeIndex<T> {
    cells: Vec<Cell>,
    entries: Vec<Entry<T>>,
}

impl<T: Copy> OctreeIndex<T> {
    /// Creates an empty index whose root cell spans `[origin, origin + size]^3`.
    pub fn new(origin: Vec3, size: f32) -> Self {
        Self {
            cells: vec![Cell::new(origin, size, 0)],
            entries: Vec::new(),
        }
    }

    /// Root cell as `(origin, size)`.
    pub fn bounds(&self) -> (Vec3, f32) {
        (self.cells[0].min, self.cells[0].size)
    }

    /// Number of live (non-tombstoned) entries.
    pub fn len(&self) -> usize {
        self.cells[0].live
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Adds `point` with its payload, splitting the receiving leaf if needed.
    ///
    /// ### Errors
    /// [`IndexError::OutOfBounds`] if `point` is not finite or lies outside
    /// the root cell.
    pub fn insert(&mut self, point: Vec3, payload: T) -> Result<(), IndexError> {
        if !point.is_finite() || !self.cells[0].contains(point) {
            return Err(IndexError::OutOfBounds { point });
        }

        let id = self.entries.len();
        self.entries.push(Entry {
            position: point,
            payload,
            tombstoned: false,
        });
        self.place(0, id);
        Ok(())
    }

    /// Returns the payload of the first live entry within `tolerance` of
    /// `point`, searching only cells that can hold such an entry.
    pub fn contains(&self, point: Vec3, tolerance: f32) -> Option<T> {
        let tol2 = tolerance * tolerance;
        let mut stack = vec![0];

        while let Some(idx) = stack.pop() {
            let cell = &self.cells[idx];
            if cell.live == 0 || !cell.contains_within(point, tolerance + BOUNDARY_EPSILON) {
                continue;
            }
            match cell.children {
                // Reversed so children are visited in index order.
                Some(children) => stack.extend(children.iter().rev()),
                None => {
                    let found = cell
                        .entries
                        .iter()
                        .map(|&e| &self.entries[e])
                        .find(|entry| {
                            !entry.tombstoned && entry.position.distance_squared(point) <= tol2
                        });
                    if let Some(entry) = found {
                        return Some(entry.payload);
                    }
                }
            }
        }
        None
    }

    /// Tombstones the first live entry at `point`.
    pub fn remove(&mut self, point: Vec3) -> Option<T> {
        self.remove_if(point, |_| true)
    }

    /// Tombstones the first live entry at `point` whose payload satisfies
    /// `pred`, returning that payload. Cell structure is left untouched.
    pub fn remove_if<F>(&mut self, point: Vec3, mut pred: F) -> Option<T>
    where
        F: FnMut(&T) -> bool,
    {
        self.tombstone(0, point, &mut pred)
    }

    /// Nearest live entry to `query` whose distance is at most `max_distance`.
    ///
    /// Children are visited closest-center first, and a child is skipped once
    /// `query` lies beyond the current best distance from its bounds on any
    /// axis. Such a child cannot hold anything closer, so the result equals a
    /// brute-force scan.
    pub fn find_nearest(&self, query: Vec3, max_distance: f32) -> Option<Hit<T>> {
        let mut best = None;
        self.nearest_in(0, query, max_distance, &mut best);
        best
    }

    /// Every live entry within `radius` of `query`, in no particular order.
    pub fn find_within_radius(&self, query: Vec3, radius: f32) -> Vec<Hit<T>> {
        let mut out = Vec::new();
        self.within_in(0, query, radius, &mut out);
        out
    }

    fn place(&mut self, start: usize, entry: usize) {
        let position = self.entries[entry].position;
        let live = !self.entries[entry].tombstoned;
        let mut idx = start;

        loop {
            if live {
                self.cells[idx].live += 1;
            }
            match self.cells[idx].children {
                Some(children) => idx = self.child_for(&children, position),
                None => {
                    let cell = &mut self.cells[idx];
                    cell.entries.push(entry);
                    if cell.entries.len() > 1 && cell.depth < MAX_DEPTH {
                        self.split(idx);
                    }
                    return;
                }
            }
        }
    }

    fn child_for(&self, children: &[usize; 8], p: Vec3) -> usize {
        children
            .iter()
            .copied()
            .find(|&c| self.cells[c].contains(p))
            .unwrap_or_else(|| {
                // Only reachable for points in the parent's outer margin.
                children
                    .iter()
                    .copied()
                    .min_by(|&a, &b| {
                        let da = self.cells[a].center().distance_squared(p);
                        let db = self.cells[b].center().distance_squared(p);
                        da.total_cmp(&db)
                    })
                    .unwrap_or(children[0])
            })
    }

    // Child `i` is offset by half the size along x if bit 0 is set,
    // along y for bit 1 and along z for bit 2.
    fn split(&mut self, idx: usize) {
        let (min, half, depth) = {
            let cell = &self.cells[idx];
            (cell.min, cell.size * 0.5, cell.depth + 1)
        };

        let first = self.cells.len();
        let mut children = [0usize; 8];
        for (i, slot) in children.iter_mut().enumerate() {
            let offset = Vec3::new(
                (i & 1) as f32,
                ((i >> 1) & 1) as f32,
                ((i >> 2) & 1) as f32,
            ) * half;
            self.cells.push(Cell::new(min + offset, half, depth));
            *slot = first + i;
        }

        let entries = std::mem::take(&mut self.cells[idx].entries);
        self.cells[idx].children = Some(children);
        for entry in entries {
            let child = self.child_for(&children, self.entries[entry].position);
            self.place(child, entry);
        }
    }

    fn tombstone<F>(&mut self, idx: usize, point: Vec3, pred: &mut F) -> Option<T>
    where
        F: FnMut(&T) -> bool,
    {
        if self.cells[idx].live == 0 || !self.cells[idx].contains(point) {
            return None;
        }

        let found = match self.cells[idx].children {
            Some(children) => children
                .into_iter()
                .find_map(|c| self.tombstone(c, point, pred)),
            None => {
                let tol2 = BOUNDARY_EPSILON * BOUNDARY_EPSILON;
                let hit = self.cells[idx].entries.iter().copied().find(|&e| {
                    let entry = &self.entries[e];
                    !entry.tombstoned
                        && entry.position.distance_squared(point) <= tol2
                        && pred(&entry.payload)
                });
                hit.map(|e| {
                    self.entries[e].tombstoned = true;
                    self.entries[e].payload
                })
            }
        };

        if found.is_some() {
            self.cells[idx].live -= 1;
        }
        found
    }

    fn nearest_in(&self, idx: usize, query: Vec3, limit: f32, best: &mut Option<Hit<T>>) {
        let cell = &self.cells[idx];
        match cell.children {
            None => {
                for &e in &cell.entries {
                    let entry = &self.entries[e];
                    if entry.tombstoned {
                        continue;
                    }
                    let distance = entry.position.distance(query);
                    let better = match best {
                        Some(b) => distance < b.distance,
                        None => distance <= limit,
                    };
                    if better {
                        *best = Some(Hit {
                            payload: entry.payload,
                            position: entry.position,
                            distance,
                        });
                    }
                }
            }
            Some(children) => {
                let mut order = children.map(|c| (c, self.cells[c].center().distance_squared(query)));
                order.sort_by(|a, b| a.1.total_cmp(&b.1));

                for (c, _) in order {
                    let child = &self.cells[c];
                    let reach = best.map_or(limit, |b| b.distance);
                    if child.live == 0 || child.out_of_reach(query, reach) {
                        continue;
                    }
                    self.nearest_in(c, query, limit, best);
                }
            }
        }
    }

    fn within_in(&self, idx: usize, query: Vec3, radius: f32, out: &mut Vec<Hit<T>>) {
        let cell = &self.cells[idx];
        match cell.children {
            None => {
                for &e in &cell.entries {
                    let entry = &self.entries[e];
                    if entry.tombstoned {
                        continue;
                    }
                    let distance = entry.position.distance(query);
                    if distance <= radius {
                        out.push(Hit {
                            payload: entry.payload,
                            position: entry.position,
                            distance,
                        });
                    }
                }
            }
            Some(children) => {
                for c in children {
                    let child = &self.cells[c];
                    if child.live == 0 || child.out_of_reach(query, radius) {
                        continue;
                    }
                    self.within_in(c, query, radius, out);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng, rngs::StdRng};

    fn unit_index() -> OctreeIndex<usize> {
        OctreeIndex::new(Vec3::splat(-1.0), 2.0)
    }

    fn random_points(rng: &mut StdRng, n: usize) -> Vec<Vec3> {
        (0..n)
            .map(|_| {
                Vec3::new(
                    rng.random_range(-1.0f32..1.0),
                    rng.random_range(-1.0f32..1.0),
                    rng.random_range(-1.0f32..1.0),
                )
            })
            .collect()
    }

    fn brute_nearest(points: &[Vec3], removed: &[bool], q: Vec3, max: f32) -> Option<f32> {
        points
            .iter()
            .zip(removed)
            .filter(|(_, r)| !**r)
            .map(|(p, _)| p.distance(q))
            .filter(|&d| d <= max)
            .min_by(|a, b| a.total_cmp(b))
    }

    #[test]
    fn empty_index_returns_nothing() {
        let index = unit_index();

        assert!(index.is_empty());
        assert_eq!(index.find_nearest(Vec3::ZERO, 10.0), None);
        assert!(index.find_within_radius(Vec3::ZERO, 10.0).is_empty());
        assert_eq!(index.contains(Vec3::ZERO, 0.0), None);
    }

    #[test]
    fn inserted_point_is_contained_immediately() {
        let mut index = unit_index();
        let mut rng = StdRng::seed_from_u64(1);

        for (i, p) in random_points(&mut rng, 200).into_iter().enumerate() {
            index.insert(p, i).unwrap();
            assert_eq!(index.contains(p, 0.0), Some(i));
        }
        assert_eq!(index.len(), 200);
    }

    #[test]
    fn second_point_splits_the_root() {
        let mut index = unit_index();
        index.insert(Vec3::new(-0.5, -0.5, -0.5), 0).unwrap();
        assert_eq!(index.cells.len(), 1);

        index.insert(Vec3::new(0.5, 0.5, 0.5), 1).unwrap();
        assert_eq!(index.cells.len(), 9);
        assert!(index.cells[0].entries.is_empty());
        assert_eq!(index.cells[0].live, 2);
    }

    #[test]
    fn coincident_points_stop_splitting_at_max_depth() {
        let mut index = unit_index();
        let p = Vec3::new(0.1, 0.2, 0.3);
        for i in 0..5 {
            index.insert(p, i).unwrap();
        }

        assert_eq!(index.cells.len(), 1 + 8 * MAX_DEPTH as usize);
        assert!(index.cells.iter().all(|c| c.depth <= MAX_DEPTH));
        assert_eq!(index.find_within_radius(p, 0.0).len(), 5);
    }

    #[test]
    fn points_on_the_upper_bound_are_accepted() {
        let mut index = unit_index();
        index.insert(Vec3::ONE, 0).unwrap();
        index.insert(Vec3::splat(-1.0), 1).unwrap();

        assert_eq!(index.contains(Vec3::ONE, 0.0), Some(0));
        assert_eq!(index.contains(Vec3::splat(-1.0), 0.0), Some(1));
    }

    #[test]
    fn out_of_bounds_insert_is_rejected() {
        let mut index = unit_index();
        let p = Vec3::new(0.0, 3.0, 0.0);

        assert_eq!(index.insert(p, 0), Err(IndexError::OutOfBounds { point: p }));
        assert!(index.insert(Vec3::NAN, 1).is_err());
        assert!(index.is_empty());
    }

    #[test]
    fn removed_points_never_show_up_again() {
        let mut index = unit_index();
        let mut rng = StdRng::seed_from_u64(2);
        let points = random_points(&mut rng, 300);
        for (i, &p) in points.iter().enumerate() {
            index.insert(p, i).unwrap();
        }

        for (i, &p) in points.iter().enumerate().filter(|(i, _)| i % 3 == 0) {
            assert_eq!(index.remove(p), Some(i));
        }
        assert_eq!(index.len(), 200);

        for &p in &points {
            if let Some(hit) = index.find_nearest(p, 4.0) {
                assert_ne!(hit.payload % 3, 0);
            }
            assert!(index.find_within_radius(p, 0.5).iter().all(|h| h.payload % 3 != 0));
        }
        assert_eq!(index.contains(points[0], 0.0), None);
        // Removing twice finds nothing.
        assert_eq!(index.remove(points[0]), None);
    }

    #[test]
    fn remove_if_picks_the_matching_payload() {
        let mut index = unit_index();
        let p = Vec3::new(0.25, 0.25, 0.0);
        index.insert(p, 7).unwrap();
        index.insert(p, 9).unwrap();

        assert_eq!(index.remove_if(p, |&id| id == 9), Some(9));
        assert_eq!(index.contains(p, 0.0), Some(7));
        assert_eq!(index.remove_if(p, |&id| id == 9), None);
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn split_keeps_tombstones_out_of_live_counts() {
        let mut index = unit_index();
        let a = Vec3::new(0.5, 0.5, 0.5);
        index.insert(a, 0).unwrap();
        index.remove(a);
        // The leaf holds one tombstone; this insert splits it.
        index.insert(Vec3::new(-0.5, 0.5, 0.5), 1).unwrap();

        assert_eq!(index.len(), 1);
        let live: usize = index.cells[0]
            .children
            .unwrap()
            .iter()
            .map(|&c| index.cells[c].live)
            .sum();
        assert_eq!(live, 1);
    }

    #[test]
    fn nearest_matches_brute_force() {
        for (seed, n) in [(10u64, 100usize), (11, 1_000), (12, 10_000)] {
            let mut rng = StdRng::seed_from_u64(seed);
            let points = random_points(&mut rng, n);
            let mut removed = vec![false; n];
            let mut index = unit_index();
            for (i, &p) in points.iter().enumerate() {
                index.insert(p, i).unwrap();
            }
            for i in (0..n).step_by(7) {
                index.remove_if(points[i], |&id| id == i);
                removed[i] = true;
            }

            for _ in 0..200 {
                let q = Vec3::new(
                    rng.random_range(-1.2f32..1.2),
                    rng.random_range(-1.2f32..1.2),
                    rng.random_range(-1.2f32..1.2),
                );
                let max = rng.random_range(0.01f32..1.0);
                let expected = brute_nearest(&points, &removed, q, max);
                let got = index.find_nearest(q, max);

                match (expected, got) {
                    (None, None) => {}
                    (Some(d), Some(hit)) => {
                        assert!((hit.distance - d).abs() < 1e-6, "n={n} q={q} {d} vs {hit:?}");
                        assert!(!removed[hit.payload]);
                        assert_eq!(hit.position, points[hit.payload]);
                    }
                    other => panic!("mismatch for n={n} q={q}: {other:?}"),
                }
            }
        }
    }

    #[test]
    fn radius_query_matches_brute_force() {
        let mut rng = StdRng::seed_from_u64(20);
        let n = 2_000;
        let points = random_points(&mut rng, n);
        let mut index = unit_index();
        for (i, &p) in points.iter().enumerate() {
            index.insert(p, i).unwrap();
        }
        for i in (0..n).step_by(5) {
            index.remove_if(points[i], |&id| id == i);
        }

        for _ in 0..100 {
            let q = Vec3::new(
                rng.random_range(-1.0f32..1.0),
                rng.random_range(-1.0f32..1.0),
                rng.random_range(-1.0f32..1.0),
            );
            let r = rng.random_range(0.0f32..0.6);

            let mut expected: Vec<usize> = (0..n)
                .filter(|i| i % 5 != 0 && points[*i].distance(q) <= r)
                .collect();
            let mut got: Vec<usize> = index
                .find_within_radius(q, r)
                .into_iter()
                .map(|h| h.payload)
                .collect();
            expected.sort_unstable();
            got.sort_unstable();

            assert_eq!(got, expected);
        }
    }

    #[test]
    fn nearest_respects_max_distance() {
        let mut index = unit_index();
        index.insert(Vec3::new(0.5, 0.0, 0.0), 0).unwrap();

        assert_eq!(index.find_nearest(Vec3::ZERO, 0.4), None);
        let hit = index.find_nearest(Vec3::ZERO, 0.5).unwrap();
        assert_eq!(hit.payload, 0);
        assert_eq!(hit.distance, 0.5);
    }
}
