//! Loose-octree broad phase.
//!
//! Items are bounding spheres (position + radius) stored at the deepest node
//! whose child cubes are too small to hold them. A node of edge `E` only
//! holds items of radius ≤ `E / 2` whose centers lie inside it, so every
//! item sphere fits inside the node's cube expanded by half an edge. Region
//! queries use that loose bound for pruning.
//!
//! Item storage is pooled with slot + generation ids; removing an item
//! bumps its slot's generation so stale [`OctreeItemId`]s resolve to
//! nothing.

use kin_types::EPSILON;
use nalgebra::Point3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

const NO_CHILDREN: u32 = u32::MAX;

/// Pooled id of an octree item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OctreeItemId {
    slot: u32,
    generation: u32,
}

impl OctreeItemId {
    /// The slot index.
    #[must_use]
    pub const fn slot(&self) -> u32 {
        self.slot
    }

    /// The generation the slot had when the item was created.
    #[must_use]
    pub const fn generation(&self) -> u32 {
        self.generation
    }
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
struct Item {
    position: Point3<f64>,
    radius: f64,
    node: u32,
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
struct ItemSlot {
    generation: u32,
    item: Option<Item>,
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
struct Node {
    center: Point3<f64>,
    half_edge: f64,
    depth: u8,
    /// Index of the first of eight contiguous children, or `NO_CHILDREN`.
    children: u32,
    items: Vec<u32>,
}

/// A loose octree over bounding spheres.
///
/// # Example
///
/// ```
/// use kin_geom::LooseOctree;
/// use nalgebra::Point3;
///
/// let mut tree = LooseOctree::new(100.0, 9);
/// let id = tree.insert(Point3::new(1.0, 2.0, 3.0), 0.5);
///
/// let mut found = Vec::new();
/// tree.visit_region(
///     Point3::new(0.0, 0.0, 0.0),
///     Point3::new(4.0, 4.0, 4.0),
///     |item, _, _| found.push(item),
/// );
/// assert_eq!(found, vec![id]);
/// ```
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LooseOctree {
    nodes: Vec<Node>,
    items: Vec<ItemSlot>,
    free_items: Vec<u32>,
    max_depth: u8,
    len: usize,
}

impl LooseOctree {
    /// Create an octree covering `[-half_size, half_size]` on each axis,
    /// subdividing at most `max_depth` levels below the root.
    #[must_use]
    pub fn new(half_size: f64, max_depth: u8) -> Self {
        Self {
            nodes: vec![Node {
                center: Point3::origin(),
                half_edge: half_size,
                depth: 0,
                children: NO_CHILDREN,
                items: Vec::new(),
            }],
            items: Vec::new(),
            free_items: Vec::new(),
            max_depth,
            len: 0,
        }
    }

    /// Number of live items.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Whether the tree holds no items.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The position and radius of a live item.
    #[must_use]
    pub fn get(&self, id: OctreeItemId) -> Option<(Point3<f64>, f64)> {
        let slot = self.items.get(id.slot as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.item.as_ref().map(|item| (item.position, item.radius))
    }

    /// Insert an item, returning its pooled id.
    pub fn insert(&mut self, position: Point3<f64>, radius: f64) -> OctreeItemId {
        let node = self.seat(position, radius);
        let slot = match self.free_items.pop() {
            Some(slot) => {
                let entry = &mut self.items[slot as usize];
                entry.item = Some(Item {
                    position,
                    radius,
                    node,
                });
                slot
            }
            None => {
                let slot = self.items.len() as u32;
                self.items.push(ItemSlot {
                    generation: 1,
                    item: Some(Item {
                        position,
                        radius,
                        node,
                    }),
                });
                slot
            }
        };
        self.nodes[node as usize].items.push(slot);
        self.len += 1;
        OctreeItemId {
            slot,
            generation: self.items[slot as usize].generation,
        }
    }

    /// Remove an item. Returns `false` for a stale id.
    pub fn remove(&mut self, id: OctreeItemId) -> bool {
        let Some(entry) = self.items.get_mut(id.slot as usize) else {
            return false;
        };
        if entry.generation != id.generation {
            return false;
        }
        let Some(item) = entry.item.take() else {
            return false;
        };
        entry.generation = entry.generation.wrapping_add(1).max(1);
        self.unseat(item.node, id.slot);
        self.free_items.push(id.slot);
        self.len -= 1;
        true
    }

    /// Move an item, reseating it into a different node when needed.
    /// Returns `false` for a stale id.
    pub fn relocate(&mut self, id: OctreeItemId, position: Point3<f64>, radius: f64) -> bool {
        let Some(entry) = self.items.get(id.slot as usize) else {
            return false;
        };
        if entry.generation != id.generation || entry.item.is_none() {
            return false;
        }
        let target = self.seat(position, radius);
        // seat() may reallocate self.nodes, so re-borrow the item after.
        let Some(item) = self.items[id.slot as usize].item.as_mut() else {
            return false;
        };
        let old_node = item.node;
        item.position = position;
        item.radius = radius;
        item.node = target;
        if target != old_node {
            self.unseat(old_node, id.slot);
            self.nodes[target as usize].items.push(id.slot);
        }
        true
    }

    /// Visit every item whose bounding sphere overlaps the axis-aligned
    /// region `[min, max]`. Visit order is unspecified but stable for the
    /// same tree contents.
    pub fn visit_region<F>(&self, min: Point3<f64>, max: Point3<f64>, mut visit: F)
    where
        F: FnMut(OctreeItemId, Point3<f64>, f64),
    {
        self.visit_node(0, min, max, &mut visit);
    }

    fn visit_node<F>(&self, node_idx: u32, min: Point3<f64>, max: Point3<f64>, visit: &mut F)
    where
        F: FnMut(OctreeItemId, Point3<f64>, f64),
    {
        let node = &self.nodes[node_idx as usize];
        // Loose bound: item centers lie inside the cube and radii are at
        // most half the edge, so spheres stay within twice the half-edge.
        // The root is exempt; it also holds oversized and out-of-world
        // items.
        if node_idx != 0 {
            let reach = 2.0 * node.half_edge;
            for i in 0..3 {
                if max[i] < node.center[i] - reach || min[i] > node.center[i] + reach {
                    return;
                }
            }
        }
        for &slot in &node.items {
            let entry = &self.items[slot as usize];
            let Some(item) = entry.item.as_ref() else {
                continue;
            };
            if sphere_overlaps_region(item.position, item.radius, min, max) {
                visit(
                    OctreeItemId {
                        slot,
                        generation: entry.generation,
                    },
                    item.position,
                    item.radius,
                );
            }
        }
        if node.children != NO_CHILDREN {
            let first = node.children;
            for octant in 0..8 {
                self.visit_node(first + octant, min, max, visit);
            }
        }
    }

    /// Find the node an item of this position and radius belongs in:
    /// descend while the child cube is large enough for the item and the
    /// child octant contains its center.
    fn seat(&mut self, position: Point3<f64>, radius: f64) -> u32 {
        let mut current = 0u32;
        loop {
            let node = &self.nodes[current as usize];
            if node.depth >= self.max_depth {
                return current;
            }
            // Child edge equals this node's half-edge.
            if node.half_edge < 2.0 * radius + EPSILON {
                return current;
            }
            let delta = position - node.center;
            if delta.x.abs() > node.half_edge
                || delta.y.abs() > node.half_edge
                || delta.z.abs() > node.half_edge
            {
                // Outside the cube entirely; stop here (only possible at
                // the root for out-of-world positions).
                return current;
            }
            let octant = usize::from(delta.x >= 0.0)
                | usize::from(delta.y >= 0.0) << 1
                | usize::from(delta.z >= 0.0) << 2;
            current = self.child(current, octant);
        }
    }

    /// Child node index for an octant, allocating all eight lazily.
    fn child(&mut self, node_idx: u32, octant: usize) -> u32 {
        if self.nodes[node_idx as usize].children == NO_CHILDREN {
            let first = self.nodes.len() as u32;
            let (center, half_edge, depth) = {
                let node = &self.nodes[node_idx as usize];
                (node.center, node.half_edge, node.depth)
            };
            let child_half = half_edge / 2.0;
            for i in 0..8 {
                let sx = if i & 1 == 0 { -child_half } else { child_half };
                let sy = if i & 2 == 0 { -child_half } else { child_half };
                let sz = if i & 4 == 0 { -child_half } else { child_half };
                self.nodes.push(Node {
                    center: Point3::new(center.x + sx, center.y + sy, center.z + sz),
                    half_edge: child_half,
                    depth: depth + 1,
                    children: NO_CHILDREN,
                    items: Vec::new(),
                });
            }
            self.nodes[node_idx as usize].children = first;
        }
        self.nodes[node_idx as usize].children + octant as u32
    }

    fn unseat(&mut self, node_idx: u32, slot: u32) {
        let items = &mut self.nodes[node_idx as usize].items;
        if let Some(pos) = items.iter().position(|&s| s == slot) {
            items.swap_remove(pos);
        }
    }
}

fn sphere_overlaps_region(
    center: Point3<f64>,
    radius: f64,
    min: Point3<f64>,
    max: Point3<f64>,
) -> bool {
    let mut dist_sq = 0.0;
    for i in 0..3 {
        let clamped = center[i].clamp(min[i], max[i]);
        let d = center[i] - clamped;
        dist_sq += d * d;
    }
    dist_sq <= radius * radius
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn collect_region(
        tree: &LooseOctree,
        min: Point3<f64>,
        max: Point3<f64>,
    ) -> Vec<OctreeItemId> {
        let mut out = Vec::new();
        tree.visit_region(min, max, |id, _, _| out.push(id));
        out
    }

    #[test]
    fn test_insert_and_get() {
        let mut tree = LooseOctree::new(100.0, 9);
        let id = tree.insert(Point3::new(1.0, 2.0, 3.0), 0.5);
        assert_eq!(tree.len(), 1);
        let (pos, radius) = tree.get(id).unwrap();
        assert_eq!(pos, Point3::new(1.0, 2.0, 3.0));
        assert_eq!(radius, 0.5);
    }

    #[test]
    fn test_remove_makes_id_stale() {
        let mut tree = LooseOctree::new(100.0, 9);
        let id = tree.insert(Point3::origin(), 1.0);
        assert!(tree.remove(id));
        assert!(tree.get(id).is_none());
        assert!(!tree.remove(id));
        assert!(tree.is_empty());

        // The slot is recycled under a new generation; the old id stays
        // stale.
        let replacement = tree.insert(Point3::new(5.0, 0.0, 0.0), 1.0);
        assert_eq!(replacement.slot(), id.slot());
        assert_ne!(replacement.generation(), id.generation());
        assert!(tree.get(id).is_none());
        assert!(tree.get(replacement).is_some());
    }

    #[test]
    fn test_small_items_descend_deep() {
        let mut tree = LooseOctree::new(128.0, 9);
        // A tiny item far from the origin should not sit in the root.
        let id = tree.insert(Point3::new(100.0, 100.0, 100.0), 0.1);
        assert!(tree.nodes.len() > 1);
        assert!(tree.nodes[0].items.is_empty());
        assert!(tree.get(id).is_some());

        // A huge item stays at the root.
        let big = tree.insert(Point3::origin(), 200.0);
        assert_eq!(tree.nodes[0].items.len(), 1);
        assert!(tree.get(big).is_some());
    }

    #[test]
    fn test_visit_region_filters_by_overlap() {
        let mut tree = LooseOctree::new(100.0, 9);
        let near = tree.insert(Point3::new(1.0, 1.0, 1.0), 0.5);
        let far = tree.insert(Point3::new(50.0, 50.0, 50.0), 0.5);

        let found = collect_region(
            &tree,
            Point3::new(-2.0, -2.0, -2.0),
            Point3::new(2.0, 2.0, 2.0),
        );
        assert_eq!(found, vec![near]);

        // A sphere overlapping the region only through its radius is still
        // reported.
        let touching = tree.insert(Point3::new(2.4, 0.0, 0.0), 0.5);
        let found = collect_region(
            &tree,
            Point3::new(-2.0, -2.0, -2.0),
            Point3::new(2.0, 2.0, 2.0),
        );
        assert!(found.contains(&near));
        assert!(found.contains(&touching));
        assert!(!found.contains(&far));
    }

    #[test]
    fn test_relocate_reseats() {
        let mut tree = LooseOctree::new(100.0, 9);
        let id = tree.insert(Point3::new(-50.0, -50.0, -50.0), 0.5);
        assert!(tree.relocate(id, Point3::new(50.0, 50.0, 50.0), 0.5));

        let found = collect_region(
            &tree,
            Point3::new(40.0, 40.0, 40.0),
            Point3::new(60.0, 60.0, 60.0),
        );
        assert_eq!(found, vec![id]);
        let found = collect_region(
            &tree,
            Point3::new(-60.0, -60.0, -60.0),
            Point3::new(-40.0, -40.0, -40.0),
        );
        assert!(found.is_empty());

        // Growing the radius can pull the item up to a shallower node.
        assert!(tree.relocate(id, Point3::new(50.0, 50.0, 50.0), 80.0));
        assert_eq!(tree.nodes[0].items.len(), 1);
    }

    #[test]
    fn test_out_of_world_item_lands_in_root() {
        let mut tree = LooseOctree::new(10.0, 9);
        let id = tree.insert(Point3::new(500.0, 0.0, 0.0), 0.5);
        assert_eq!(tree.nodes[0].items.len(), 1);
        let found = collect_region(
            &tree,
            Point3::new(490.0, -1.0, -1.0),
            Point3::new(510.0, 1.0, 1.0),
        );
        assert_eq!(found, vec![id]);
    }
}
