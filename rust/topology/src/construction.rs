// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Construction of network graphs.
//!
//! Edges are created through the graph, which checks that both junctions
//! exist and maintains the adjacency index. [`NetworkGraph::build`] performs
//! a full rebuild from source features; there is no incremental mode.

use nalgebra::Point3;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use slotmap::SlotMap;

use crate::arena::*;
use crate::error::{Error, Result};
use crate::keys::*;

/// Which source vertices become junctions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Connectivity {
    /// Only the first and last vertex of each feature; one edge per feature.
    #[default]
    Endpoint,
    /// Every vertex; one edge per segment, cost split by segment length.
    AnyVertex,
}

/// Options for a full rebuild.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BuildOptions {
    pub connectivity: Connectivity,
    /// Distance under which vertices are merged into one junction.
    pub snap_tolerance: f64,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            connectivity: Connectivity::Endpoint,
            snap_tolerance: 1e-6,
        }
    }
}

/// One network source feature as seen by the graph builder.
#[derive(Debug, Clone, Copy)]
pub struct SourceEdge<'a> {
    pub source_id: u64,
    pub points: &'a [Point3<f64>],
    /// Traversal cost of the whole feature (minutes).
    pub cost: f64,
}

impl<'a> SourceEdge<'a> {
    pub fn new(source_id: u64, points: &'a [Point3<f64>], cost: f64) -> Self {
        Self {
            source_id,
            points,
            cost,
        }
    }

    fn check(&self) -> Result<()> {
        if self.points.len() < 2 {
            return Err(Error::DegenerateSource {
                source_id: self.source_id,
                vertices: self.points.len(),
            });
        }
        if let Some(vertex) = self
            .points
            .iter()
            .position(|p| !(p.x.is_finite() && p.y.is_finite() && p.z.is_finite()))
        {
            return Err(Error::NonFiniteVertex {
                source_id: self.source_id,
                vertex,
            });
        }
        let z = self.points[0].z;
        if self.points.iter().any(|p| p.z != z) {
            return Err(Error::NonPlanarSource(self.source_id));
        }
        if !self.cost.is_finite() || self.cost < 0.0 {
            return Err(Error::InvalidCost {
                source_id: self.source_id,
                cost: self.cost,
            });
        }
        Ok(())
    }
}

fn planar_distance(a: &Point3<f64>, b: &Point3<f64>) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    (dx * dx + dy * dy).sqrt()
}

impl NetworkGraph {
    /// Creates an empty graph that snaps vertices within `tolerance`.
    pub fn new(tolerance: f64) -> Result<Self> {
        if !tolerance.is_finite() || tolerance <= 0.0 {
            return Err(Error::InvalidTolerance(tolerance));
        }
        Ok(Self {
            junctions: SlotMap::with_key(),
            edges: SlotMap::with_key(),
            junction_to_edges: FxHashMap::default(),
            snap_index: FxHashMap::default(),
            tolerance,
        })
    }

    /// Returns the nearest junction within the snap tolerance of
    /// `position`, creating one there if none exists.
    pub fn junction_at(&mut self, position: Point3<f64>) -> JunctionKey {
        if let Some(key) = self.find_junction_near(&position) {
            return key;
        }
        let key = self.junctions.insert(JunctionData { position });
        self.index_junction(key, &position);
        key
    }

    /// Creates an edge between two existing junctions.
    ///
    /// Returns an error if either junction does not exist in the graph.
    pub fn add_edge(
        &mut self,
        from: JunctionKey,
        to: JunctionKey,
        source_id: u64,
        segment: u32,
        cost: f64,
        length: f64,
    ) -> Result<EdgeKey> {
        if !self.junctions.contains_key(from) {
            return Err(Error::JunctionNotFound(from));
        }
        if !self.junctions.contains_key(to) {
            return Err(Error::JunctionNotFound(to));
        }

        let key = self.edges.insert(EdgeData {
            from,
            to,
            source_id,
            segment,
            cost,
            length,
        });
        self.link_junction_edge(from, key);
        self.link_junction_edge(to, key);
        Ok(key)
    }

    /// Builds a graph from scratch over every source feature.
    ///
    /// Sources are processed in the order given, which makes junction and
    /// edge insertion order (and therefore [`NetworkGraph::connectivity`])
    /// deterministic for a given source. The finished graph is validated
    /// before it is returned.
    pub fn build<'a, I>(sources: I, options: &BuildOptions) -> Result<Self>
    where
        I: IntoIterator<Item = SourceEdge<'a>>,
    {
        let mut graph = Self::new(options.snap_tolerance)?;
        let mut seen: FxHashSet<u64> = FxHashSet::default();

        for source in sources {
            source.check()?;
            if !seen.insert(source.source_id) {
                return Err(Error::DuplicateSource(source.source_id));
            }

            match options.connectivity {
                Connectivity::Endpoint => graph.add_endpoint_edge(&source)?,
                Connectivity::AnyVertex => graph.add_segment_edges(&source)?,
            }
        }

        graph.validate()?;
        Ok(graph)
    }

    fn add_endpoint_edge(&mut self, source: &SourceEdge<'_>) -> Result<()> {
        let points = source.points;
        let length: f64 = points.windows(2).map(|w| planar_distance(&w[0], &w[1])).sum();
        let from = self.junction_at(points[0]);
        let to = self.junction_at(points[points.len() - 1]);
        self.add_edge(from, to, source.source_id, 0, source.cost, length)?;
        Ok(())
    }

    fn add_segment_edges(&mut self, source: &SourceEdge<'_>) -> Result<()> {
        let points = source.points;
        let total: f64 = points.windows(2).map(|w| planar_distance(&w[0], &w[1])).sum();

        for (i, w) in points.windows(2).enumerate() {
            let length = planar_distance(&w[0], &w[1]);
            let from = self.junction_at(w[0]);
            let to = self.junction_at(w[1]);
            // Repeated vertices snap together and carry no cost
            if from == to && length == 0.0 {
                continue;
            }
            let cost = if total > 0.0 {
                source.cost * length / total
            } else {
                0.0
            };
            self.add_edge(from, to, source.source_id, i as u32, cost, length)?;
        }
        Ok(())
    }
}
