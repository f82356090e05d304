// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Connectivity queries over a built network graph.
//!
//! Connected components, degrees, structural validation and a
//! key-independent connectivity signature used to compare two rebuilds of
//! the same source.

use std::collections::VecDeque;

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use crate::arena::NetworkGraph;
use crate::error::{Error, Result};
use crate::keys::*;

/// Counts describing a built graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSummary {
    pub junctions: usize,
    pub edges: usize,
    pub components: usize,
}

/// Key-independent description of a graph's connectivity.
///
/// Junctions are numbered by insertion order and each edge is described as
/// `(source_id, segment, from, to)`, sorted. Two graphs with equal
/// signatures connect the same source features in the same way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectivitySignature {
    pub junctions: usize,
    pub edges: Vec<(u64, u32, usize, usize)>,
}

impl NetworkGraph {
    // =========================================================================
    // Adjacency
    // =========================================================================

    /// Junctions reachable over one edge, with the connecting edge.
    pub fn neighbors(&self, junction: JunctionKey) -> Vec<(JunctionKey, EdgeKey)> {
        let Some(edges) = self.junction_to_edges.get(&junction) else {
            return Vec::new();
        };
        edges
            .iter()
            .filter_map(|&ek| {
                let edge = self.edges.get(ek)?;
                let other = if edge.from == junction { edge.to } else { edge.from };
                Some((other, ek))
            })
            .collect()
    }

    /// Number of edges touching a junction.
    pub fn degree(&self, junction: JunctionKey) -> usize {
        self.junction_to_edges
            .get(&junction)
            .map_or(0, |edges| edges.len())
    }

    /// Junctions with no edges.
    pub fn isolated_junctions(&self) -> Vec<JunctionKey> {
        self.junctions
            .keys()
            .filter(|&jk| self.degree(jk) == 0)
            .collect()
    }

    // =========================================================================
    // Connected components
    // =========================================================================

    /// Returns connected components as lists of junction keys, in junction
    /// insertion order of each component's first member.
    pub fn connected_components(&self) -> Vec<Vec<JunctionKey>> {
        let mut visited: FxHashSet<JunctionKey> = FxHashSet::default();
        let mut components = Vec::new();

        for start in self.junctions.keys() {
            if !visited.insert(start) {
                continue;
            }

            let mut component = Vec::new();
            let mut queue = VecDeque::new();
            queue.push_back(start);

            while let Some(junction) = queue.pop_front() {
                component.push(junction);
                for (neighbor, _) in self.neighbors(junction) {
                    if visited.insert(neighbor) {
                        queue.push_back(neighbor);
                    }
                }
            }

            components.push(component);
        }

        components
    }

    /// Number of connected components.
    pub fn component_count(&self) -> usize {
        self.connected_components().len()
    }

    /// Checks if the graph is connected (at most one component).
    pub fn is_connected(&self) -> bool {
        self.component_count() <= 1
    }

    // =========================================================================
    // Validation
    // =========================================================================

    /// Checks that every edge references live junctions and that the
    /// adjacency index matches the edge table exactly.
    pub fn validate(&self) -> Result<()> {
        let mut expected: FxHashMap<JunctionKey, FxHashSet<EdgeKey>> = FxHashMap::default();

        for (ek, edge) in &self.edges {
            for junction in [edge.from, edge.to] {
                if !self.junctions.contains_key(junction) {
                    return Err(Error::DanglingEdge { edge: ek, junction });
                }
                expected.entry(junction).or_default().insert(ek);
            }
        }

        for jk in self.junctions.keys() {
            let actual = self.junction_to_edges.get(&jk);
            let wanted = expected.get(&jk);
            let same = match (actual, wanted) {
                (Some(a), Some(w)) => a == w,
                (None, None) => true,
                (Some(a), None) => a.is_empty(),
                (None, Some(_)) => false,
            };
            if !same {
                return Err(Error::AdjacencyMismatch(jk));
            }
        }

        if let Some(&stray) = self
            .junction_to_edges
            .keys()
            .find(|jk| !self.junctions.contains_key(**jk))
        {
            return Err(Error::JunctionNotFound(stray));
        }

        Ok(())
    }

    // =========================================================================
    // Summaries
    // =========================================================================

    pub fn summary(&self) -> GraphSummary {
        GraphSummary {
            junctions: self.junction_count(),
            edges: self.edge_count(),
            components: self.component_count(),
        }
    }

    /// Key-independent connectivity description.
    pub fn connectivity(&self) -> ConnectivitySignature {
        let ordinals: FxHashMap<JunctionKey, usize> = self
            .junctions
            .keys()
            .enumerate()
            .map(|(i, jk)| (jk, i))
            .collect();

        let mut edges: Vec<(u64, u32, usize, usize)> = self
            .edges
            .values()
            .map(|e| (e.source_id, e.segment, ordinals[&e.from], ordinals[&e.to]))
            .collect();
        edges.sort_unstable();

        ConnectivitySignature {
            junctions: self.junction_count(),
            edges,
        }
    }

    /// Source feature ids of the edges in one component.
    pub fn component_sources(&self, component: &[JunctionKey]) -> Vec<u64> {
        let mut sources: Vec<u64> = component
            .iter()
            .flat_map(|&jk| self.junction_edges(jk))
            .filter_map(|ek| self.edges.get(ek).map(|e| e.source_id))
            .collect();
        sources.sort_unstable();
        sources.dedup();
        sources
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::construction::{BuildOptions, SourceEdge};
    use nalgebra::Point3;

    fn line(z: f64, x0: f64, x1: f64) -> Vec<Point3<f64>> {
        vec![Point3::new(x0, 0.0, z), Point3::new(x1, 0.0, z)]
    }

    #[test]
    fn stacked_floors_stay_separate() {
        let ground = line(0.0, 0.0, 100.0);
        let upper = line(10.0, 0.0, 100.0);
        let graph = NetworkGraph::build(
            [SourceEdge::new(1, &ground, 0.4), SourceEdge::new(2, &upper, 0.4)],
            &BuildOptions::default(),
        )
        .unwrap();

        let components = graph.connected_components();
        assert_eq!(components.len(), 2);
        assert_eq!(graph.component_sources(&components[0]), vec![1]);
        assert_eq!(graph.component_sources(&components[1]), vec![2]);
    }

    #[test]
    fn chain_is_connected() {
        let a = line(0.0, 0.0, 1.0);
        let b = line(0.0, 1.0, 2.0);
        let c = line(0.0, 2.0, 3.0);
        let graph = NetworkGraph::build(
            [
                SourceEdge::new(1, &a, 1.0),
                SourceEdge::new(2, &b, 1.0),
                SourceEdge::new(3, &c, 1.0),
            ],
            &BuildOptions::default(),
        )
        .unwrap();

        assert!(graph.is_connected());
        assert!(graph.isolated_junctions().is_empty());
        let degrees: Vec<usize> = graph.junctions().map(|(jk, _)| graph.degree(jk)).collect();
        assert_eq!(degrees, vec![1, 2, 2, 1]);
    }

    #[test]
    fn rebuilding_same_source_gives_same_signature() {
        let a = line(0.0, 0.0, 1.0);
        let b = line(0.0, 1.0, 2.0);
        let build = || {
            NetworkGraph::build(
                [SourceEdge::new(1, &a, 1.0), SourceEdge::new(2, &b, 1.0)],
                &BuildOptions::default(),
            )
            .unwrap()
        };
        assert_eq!(build().connectivity(), build().connectivity());
    }

    #[test]
    fn validate_detects_dangling_edge() {
        let mut graph = NetworkGraph::new(0.01).unwrap();
        let a = graph.junction_at(Point3::new(0.0, 0.0, 0.0));
        let b = graph.junction_at(Point3::new(1.0, 0.0, 0.0));
        graph.add_edge(a, b, 1, 0, 1.0, 1.0).unwrap();
        assert!(graph.validate().is_ok());

        graph.junctions.remove(b);
        assert!(matches!(graph.validate(), Err(Error::DanglingEdge { .. })));
    }

    #[test]
    fn isolated_junction_is_reported() {
        let mut graph = NetworkGraph::new(0.01).unwrap();
        let lonely = graph.junction_at(Point3::new(4.0, 4.0, 0.0));
        assert_eq!(graph.isolated_junctions(), vec![lonely]);
        assert_eq!(graph.summary().components, 1);
    }
}
