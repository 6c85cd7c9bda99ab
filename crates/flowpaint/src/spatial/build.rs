//! Median-split BVH construction with an explicit work stack

use glam::Vec3;
use tracing::info;

use super::{Aabb, Bvh, BvhNode};

/// Pending node: slot index and triangle range in the permutation
struct BuildTask {
    node: usize,
    start: usize,
    end: usize,
}

impl Bvh {
    /// Build over `triangles` (indices into `positions`).
    ///
    /// Each node splits at the median triangle centroid along the longest
    /// axis of its bounds until it holds at most `leaf_size` triangles.
    pub fn build(positions: &[Vec3], triangles: &[[u32; 3]], leaf_size: usize) -> Self {
        if triangles.is_empty() {
            info!("Bvh::build: empty mesh, no tree built");
            return Self::empty();
        }
        let leaf_size = leaf_size.max(1);

        let tri_bounds: Vec<Aabb> = triangles
            .iter()
            .map(|&[a, b, c]| {
                Aabb::from_triangle(
                    positions[a as usize],
                    positions[b as usize],
                    positions[c as usize],
                )
            })
            .collect();
        let centroids: Vec<Vec3> = tri_bounds.iter().map(Aabb::center).collect();

        let mut order: Vec<u32> = (0..triangles.len() as u32).collect();
        // Upper bound for a binary tree with at least one triangle per leaf
        let capacity = 2 * triangles.len().div_ceil(leaf_size);
        let mut node_min = Vec::with_capacity(capacity);
        let mut node_max = Vec::with_capacity(capacity);
        let mut nodes = Vec::with_capacity(capacity);

        node_min.push(Vec3::ZERO);
        node_max.push(Vec3::ZERO);
        nodes.push(BvhNode::Leaf { start: 0, count: 0 });

        let mut stack = vec![BuildTask {
            node: 0,
            start: 0,
            end: triangles.len(),
        }];

        while let Some(BuildTask { node, start, end }) = stack.pop() {
            let mut bounds = Aabb::empty();
            for &tri in &order[start..end] {
                bounds.include_aabb(&tri_bounds[tri as usize]);
            }
            node_min[node] = bounds.min;
            node_max[node] = bounds.max;

            let count = end - start;
            if count <= leaf_size {
                nodes[node] = BvhNode::Leaf {
                    start: start as u32,
                    count: count as u32,
                };
                continue;
            }

            let axis = bounds.largest_axis();
            let mid = start + count / 2;
            order[start..end].select_nth_unstable_by(count / 2, |&a, &b| {
                centroids[a as usize][axis].total_cmp(&centroids[b as usize][axis])
            });

            let left = nodes.len();
            let right = left + 1;
            for _ in 0..2 {
                node_min.push(Vec3::ZERO);
                node_max.push(Vec3::ZERO);
                nodes.push(BvhNode::Leaf { start: 0, count: 0 });
            }
            nodes[node] = BvhNode::Interior {
                left: left as u32,
                right: right as u32,
            };

            stack.push(BuildTask {
                node: right,
                start: mid,
                end,
            });
            stack.push(BuildTask {
                node: left,
                start,
                end: mid,
            });
        }

        let mut v0 = Vec::with_capacity(order.len());
        let mut e1 = Vec::with_capacity(order.len());
        let mut e2 = Vec::with_capacity(order.len());
        for &tri in &order {
            let [a, b, c] = triangles[tri as usize];
            let p0 = positions[a as usize];
            v0.push(p0);
            e1.push(positions[b as usize] - p0);
            e2.push(positions[c as usize] - p0);
        }

        let bvh = Self {
            node_min,
            node_max,
            nodes,
            order,
            v0,
            e1,
            e2,
        };
        info!(
            "Bvh::build: {} triangles, {} nodes, depth {}",
            bvh.triangle_count(),
            bvh.node_count(),
            bvh.depth()
        );
        bvh
    }
}
