// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Arena-based storage for network junctions and edges.
//!
//! The [`NetworkGraph`] owns every junction and edge in slot maps with
//! stable, generational keys. The upward adjacency index (junction → edges
//! that use it) enables neighbour lookups and component traversal without
//! scanning the edge table.

use nalgebra::Point3;
use rustc_hash::{FxHashMap, FxHashSet};
use slotmap::SlotMap;

use crate::keys::*;

/// Data stored for a junction: a snapped position in 3D space.
#[derive(Debug, Clone)]
pub struct JunctionData {
    pub position: Point3<f64>,
}

/// Data stored for an edge: a traversable piece of one source feature.
#[derive(Debug, Clone)]
pub struct EdgeData {
    pub from: JunctionKey,
    pub to: JunctionKey,
    /// Id of the network source feature this edge was built from.
    pub source_id: u64,
    /// Segment index within the source feature (always 0 with endpoint
    /// connectivity).
    pub segment: u32,
    /// Traversal cost (minutes).
    pub cost: f64,
    /// Planar length.
    pub length: f64,
}

/// Grid cell of the snapping index. Cells are `tolerance` wide, so every
/// junction within tolerance of a point lies in the point's 3x3x3
/// neighbourhood.
pub(crate) type SnapCell = (i64, i64, i64);

/// The connectivity graph of a network source.
///
/// # Example
///
/// ```
/// use floornet_topology::NetworkGraph;
/// use nalgebra::Point3;
///
/// let mut graph = NetworkGraph::new(0.001).unwrap();
/// let a = graph.junction_at(Point3::new(0.0, 0.0, 0.0));
/// let b = graph.junction_at(Point3::new(5.0, 0.0, 0.0));
/// let again = graph.junction_at(Point3::new(0.0002, 0.0, 0.0));
///
/// assert_eq!(a, again);
/// assert_ne!(a, b);
/// assert_eq!(graph.junction_count(), 2);
/// ```
#[derive(Debug)]
pub struct NetworkGraph {
    // Entity storage
    pub(crate) junctions: SlotMap<JunctionKey, JunctionData>,
    pub(crate) edges: SlotMap<EdgeKey, EdgeData>,

    // Upward adjacency: junction → edges
    pub(crate) junction_to_edges: FxHashMap<JunctionKey, FxHashSet<EdgeKey>>,

    // Snapping index
    pub(crate) snap_index: FxHashMap<SnapCell, Vec<JunctionKey>>,
    pub(crate) tolerance: f64,
}

impl NetworkGraph {
    // --- Junction operations ---

    /// Returns the junction data for the given key, or `None` if not found.
    pub fn junction(&self, key: JunctionKey) -> Option<&JunctionData> {
        self.junctions.get(key)
    }

    /// Returns the number of junctions in the graph.
    pub fn junction_count(&self) -> usize {
        self.junctions.len()
    }

    /// Iterates junctions in insertion order.
    pub fn junctions(&self) -> impl Iterator<Item = (JunctionKey, &JunctionData)> {
        self.junctions.iter()
    }

    /// Edges touching a junction.
    pub fn junction_edges(&self, key: JunctionKey) -> Vec<EdgeKey> {
        self.junction_to_edges
            .get(&key)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    // --- Edge operations ---

    /// Returns the edge data for the given key, or `None` if not found.
    pub fn edge(&self, key: EdgeKey) -> Option<&EdgeData> {
        self.edges.get(key)
    }

    /// Returns the number of edges in the graph.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Iterates edges in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = (EdgeKey, &EdgeData)> {
        self.edges.iter()
    }

    /// Snap tolerance used to merge coincident vertices.
    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Returns `true` if the given key references a live element.
    pub fn contains(&self, key: NetworkKey) -> bool {
        match key {
            NetworkKey::Junction(k) => self.junctions.contains_key(k),
            NetworkKey::Edge(k) => self.edges.contains_key(k),
        }
    }

    // --- Adjacency index helpers ---

    /// Register that an edge uses a junction (upward adjacency).
    pub(crate) fn link_junction_edge(&mut self, junction: JunctionKey, edge: EdgeKey) {
        self.junction_to_edges
            .entry(junction)
            .or_default()
            .insert(edge);
    }

    pub(crate) fn snap_cell(&self, p: &Point3<f64>) -> SnapCell {
        (
            (p.x / self.tolerance).floor() as i64,
            (p.y / self.tolerance).floor() as i64,
            (p.z / self.tolerance).floor() as i64,
        )
    }

    /// Add a junction to the snapping index.
    pub(crate) fn index_junction(&mut self, key: JunctionKey, position: &Point3<f64>) {
        let cell = self.snap_cell(position);
        self.snap_index.entry(cell).or_default().push(key);
    }

    /// Nearest junction within `tolerance` of `position`, if any.
    ///
    /// Ties go to the junction found first, scanning cells in a fixed order
    /// and each cell in insertion order.
    pub fn find_junction_near(&self, position: &Point3<f64>) -> Option<JunctionKey> {
        let (cx, cy, cz) = self.snap_cell(position);
        let tol_sq = self.tolerance * self.tolerance;
        let mut best: Option<(f64, JunctionKey)> = None;

        // Search 3x3x3 neighborhood
        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    let Some(keys) = self.snap_index.get(&(cx + dx, cy + dy, cz + dz)) else {
                        continue;
                    };
                    for &jk in keys {
                        let Some(j) = self.junctions.get(jk) else {
                            continue;
                        };
                        let dist_sq = (j.position - *position).norm_squared();
                        if dist_sq <= tol_sq && best.map_or(true, |(d, _)| dist_sq < d) {
                            best = Some((dist_sq, jk));
                        }
                    }
                }
            }
        }

        best.map(|(_, jk)| jk)
    }
}
