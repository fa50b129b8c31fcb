//! # Neighbour-query octree
//!
//! A bucketed octree over the particle positions, rebuilt from scratch every
//! step. It answers "which particles lie strictly within `r` of `p`" without
//! the O(n²) all-pairs scan.
//!
//! - Nodes live in a flat arena; children are indices into it.
//! - A leaf holds up to [`LEAF_CAPACITY`] point indices before it splits.
//! - Splitting stops at [`MAX_DEPTH`], so coincident points end up sharing an
//!   oversized leaf instead of recursing forever.
//! - Queries visit only nodes whose box overlaps the query sphere.

use glam::DVec3;

/// Points stored in a leaf before it is subdivided
pub const LEAF_CAPACITY: usize = 8;
/// Depth at which leaves stop splitting
pub const MAX_DEPTH: u32 = 16;

/// One cubic cell of the octree
#[derive(Debug, Clone)]
pub struct OctreeNode {
    pub bbox_min: DVec3,
    pub bbox_max: DVec3,
    /// Indices into [`Octree::nodes`]
    pub children: [Option<usize>; 8],
    /// Indices into the point slice (leaves only)
    pub points: Vec<usize>,
    pub depth: u32,
}

impl OctreeNode {
    fn new(bbox_min: DVec3, bbox_max: DVec3, depth: u32) -> Self {
        Self {
            bbox_min,
            bbox_max,
            children: [None; 8],
            points: Vec::new(),
            depth,
        }
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.children.iter().all(|c| c.is_none())
    }

    /// Squared distance from `p` to the closest point of this node's box
    #[inline]
    fn distance_squared_to(&self, p: DVec3) -> f64 {
        let closest = p.clamp(self.bbox_min, self.bbox_max);
        p.distance_squared(closest)
    }
}

/// Octree built over a snapshot of particle positions
#[derive(Debug, Clone)]
pub struct Octree {
    pub nodes: Vec<OctreeNode>,
    pub root: usize,
    positions: Vec<DVec3>,
}

impl Octree {
    /// Build the tree over `points`
    ///
    /// The root is the cubic bounding box of all points; the positions are
    /// copied so the tree stays valid while the caller moves particles.
    pub fn build(points: &[DVec3]) -> Self {
        let (bbox_min, bbox_max) = compute_cubic_bbox(points);
        let mut tree = Octree {
            nodes: vec![OctreeNode::new(bbox_min, bbox_max, 0)],
            root: 0,
            positions: points.to_vec(),
        };
        for i in 0..points.len() {
            tree.insert(tree.root, i);
        }
        tree
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Position of a stored point
    #[inline]
    pub fn position(&self, index: usize) -> DVec3 {
        self.positions[index]
    }

    /// Indices of every stored point with `0 < |p - center| < radius`
    pub fn query_radius(&self, center: DVec3, radius: f64) -> Vec<usize> {
        let mut found = Vec::new();
        self.for_each_within(center, radius, |i, _, _| found.push(i));
        found
    }

    /// Visit every stored point with `0 < |p - center| < radius`
    ///
    /// The callback receives the point index, its position and the squared
    /// distance to `center`.
    pub fn for_each_within<V>(&self, center: DVec3, radius: f64, mut visit: V)
    where
        V: FnMut(usize, DVec3, f64),
    {
        if self.positions.is_empty() || radius <= 0.0 {
            return;
        }
        let radius_sq = radius * radius;
        let mut stack = vec![self.root];

        while let Some(node_idx) = stack.pop() {
            let node = &self.nodes[node_idx];
            if node.distance_squared_to(center) >= radius_sq {
                continue;
            }
            if node.is_leaf() {
                for &i in &node.points {
                    let p = self.positions[i];
                    let d2 = p.distance_squared(center);
                    if d2 > 0.0 && d2 < radius_sq {
                        visit(i, p, d2);
                    }
                }
            } else {
                stack.extend(node.children.iter().flatten().copied());
            }
        }
    }

    // helpers ==============================================================

    fn insert(&mut self, node_idx: usize, point_idx: usize) {
        let mut node_idx = node_idx;
        loop {
            let node = &self.nodes[node_idx];
            if node.is_leaf() {
                if node.points.len() < LEAF_CAPACITY || node.depth >= MAX_DEPTH {
                    self.nodes[node_idx].points.push(point_idx);
                    return;
                }
                self.split(node_idx);
            }
            let node = &self.nodes[node_idx];
            let octant =
                child_index_for_point(self.positions[point_idx], node.bbox_min, node.bbox_max);
            node_idx = self.child_or_create(node_idx, octant);
        }
    }

    /// Turn a full leaf into an internal node, pushing its points down one level
    fn split(&mut self, node_idx: usize) {
        let points = std::mem::take(&mut self.nodes[node_idx].points);
        let (bbox_min, bbox_max) = (self.nodes[node_idx].bbox_min, self.nodes[node_idx].bbox_max);
        for point_idx in points {
            let octant = child_index_for_point(self.positions[point_idx], bbox_min, bbox_max);
            let child = self.child_or_create(node_idx, octant);
            self.nodes[child].points.push(point_idx);
        }
    }

    fn child_or_create(&mut self, node_idx: usize, octant: usize) -> usize {
        if let Some(child) = self.nodes[node_idx].children[octant] {
            return child;
        }
        let parent = &self.nodes[node_idx];
        let (cmin, cmax) = child_bbox(parent.bbox_min, parent.bbox_max, octant);
        let child = OctreeNode::new(cmin, cmax, parent.depth + 1);
        let child_idx = self.nodes.len();
        self.nodes.push(child);
        self.nodes[node_idx].children[octant] = Some(child_idx);
        child_idx
    }
}

/// Cubic box enclosing all points, padded so no point sits on the boundary
fn compute_cubic_bbox(points: &[DVec3]) -> (DVec3, DVec3) {
    if points.is_empty() {
        return (DVec3::splat(-1.0), DVec3::splat(1.0));
    }
    let mut min = DVec3::splat(f64::INFINITY);
    let mut max = DVec3::splat(f64::NEG_INFINITY);
    for &p in points {
        min = min.min(p);
        max = max.max(p);
    }

    let center = (min + max) * 0.5;
    let half = ((max - min) * 0.5).max_element().max(1e-9) * 1.01;
    (center - DVec3::splat(half), center + DVec3::splat(half))
}

/// Octant of `p` within a box: bit 0 = x, bit 1 = y, bit 2 = z (set = upper half)
#[inline]
fn child_index_for_point(p: DVec3, bbox_min: DVec3, bbox_max: DVec3) -> usize {
    let center = (bbox_min + bbox_max) * 0.5;
    let mut idx = 0;
    if p.x >= center.x {
        idx |= 1;
    }
    if p.y >= center.y {
        idx |= 2;
    }
    if p.z >= center.z {
        idx |= 4;
    }
    idx
}

/// Box of the given octant, using the same bit layout as [`child_index_for_point`]
#[inline]
fn child_bbox(parent_min: DVec3, parent_max: DVec3, octant: usize) -> (DVec3, DVec3) {
    let center = (parent_min + parent_max) * 0.5;
    let mut min = parent_min;
    let mut max = parent_max;
    if (octant & 1) == 0 {
        max.x = center.x;
    } else {
        min.x = center.x;
    }
    if (octant & 2) == 0 {
        max.y = center.y;
    } else {
        min.y = center.y;
    }
    if (octant & 4) == 0 {
        max.z = center.z;
    } else {
        min.z = center.z;
    }
    (min, max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_pcg::Pcg32;

    fn brute_force(points: &[DVec3], center: DVec3, radius: f64) -> Vec<usize> {
        points
            .iter()
            .enumerate()
            .filter(|(_, p)| {
                let d2 = p.distance_squared(center);
                d2 > 0.0 && d2 < radius * radius
            })
            .map(|(i, _)| i)
            .collect()
    }

    fn random_points(rng: &mut Pcg32, n: usize, extent: f64) -> Vec<DVec3> {
        (0..n)
            .map(|_| {
                DVec3::new(
                    rng.random_range(-extent..extent),
                    rng.random_range(-extent..extent),
                    rng.random_range(-extent..extent),
                )
            })
            .collect()
    }

    #[test]
    fn test_empty_tree() {
        let tree = Octree::build(&[]);
        assert!(tree.is_empty());
        assert!(tree.query_radius(DVec3::ZERO, 10.0).is_empty());
    }

    #[test]
    fn test_self_is_excluded() {
        let points = vec![DVec3::ZERO, DVec3::new(0.1, 0.0, 0.0), DVec3::new(0.5, 0.0, 0.0)];
        let tree = Octree::build(&points);
        let mut found = tree.query_radius(DVec3::ZERO, 0.2);
        found.sort_unstable();
        assert_eq!(found, vec![1]);
    }

    #[test]
    fn test_radius_is_strict() {
        let points = vec![DVec3::ZERO, DVec3::new(0.25, 0.0, 0.0)];
        let tree = Octree::build(&points);
        assert!(tree.query_radius(DVec3::ZERO, 0.25).is_empty());
        assert_eq!(tree.query_radius(DVec3::ZERO, 0.2500001), vec![1]);
    }

    #[test]
    fn test_coincident_points_do_not_recurse_forever() {
        let points = vec![DVec3::new(0.3, 0.3, 0.3); 100];
        let tree = Octree::build(&points);
        assert_eq!(tree.len(), 100);
        assert!(tree.nodes.iter().all(|n| n.depth <= MAX_DEPTH));
        // every point coincides with the query center
        assert!(tree.query_radius(DVec3::new(0.3, 0.3, 0.3), 1.0).is_empty());
        assert_eq!(tree.query_radius(DVec3::ZERO, 1.0).len(), 100);
    }

    #[test]
    fn test_matches_brute_force_on_random_cloud() {
        let mut rng = Pcg32::seed_from_u64(2024);
        let points = random_points(&mut rng, 800, 1.0);
        let tree = Octree::build(&points);

        for _ in 0..200 {
            let center = if rng.random_bool(0.5) {
                points[rng.random_range(0..points.len())]
            } else {
                DVec3::new(
                    rng.random_range(-1.2..1.2),
                    rng.random_range(-1.2..1.2),
                    rng.random_range(-1.2..1.2),
                )
            };
            let radius = rng.random_range(0.01..0.6);
            let mut got = tree.query_radius(center, radius);
            got.sort_unstable();
            assert_eq!(got, brute_force(&points, center, radius));
        }
    }

    #[test]
    fn test_for_each_within_reports_distances() {
        let points = vec![DVec3::ZERO, DVec3::new(0.0, 0.3, 0.0), DVec3::new(0.0, 0.0, -0.4)];
        let tree = Octree::build(&points);
        let mut seen = Vec::new();
        tree.for_each_within(DVec3::ZERO, 1.0, |i, p, d2| {
            assert_eq!(p, points[i]);
            seen.push((i, d2));
        });
        seen.sort_by_key(|(i, _)| *i);
        assert_eq!(seen.len(), 2);
        assert!((seen[0].1 - 0.09).abs() < 1e-12);
        assert!((seen[1].1 - 0.16).abs() < 1e-12);
    }

    #[test]
    fn test_points_on_a_sphere_shell() {
        // The growth loop stores points on a thin surface, not a volume
        let mut rng = Pcg32::seed_from_u64(5);
        let points: Vec<DVec3> = (0..600)
            .map(|_| crate::random_unit_vector(&mut rng).unwrap() * 0.5)
            .collect();
        let tree = Octree::build(&points);
        for (i, &p) in points.iter().enumerate().step_by(7) {
            let mut got = tree.query_radius(p, 0.125);
            got.sort_unstable();
            let expected = brute_force(&points, p, 0.125);
            assert!(!got.contains(&i));
            assert_eq!(got, expected);
        }
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(24))]

            #[test]
            fn query_matches_brute_force(
                seed in any::<u64>(),
                n in 500usize..900,
                radius in 0.02_f64..0.5,
            ) {
                let mut rng = Pcg32::seed_from_u64(seed);
                let points = random_points(&mut rng, n, 1.0);
                let tree = Octree::build(&points);
                for _ in 0..20 {
                    let center = points[rng.random_range(0..n)];
                    let mut got = tree.query_radius(center, radius);
                    got.sort_unstable();
                    prop_assert_eq!(got, brute_force(&points, center, radius));
                }
            }
        }
    }
}
