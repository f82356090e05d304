// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! JSON serialization for network graphs.
//!
//! Slot map keys are mapped to sequential integer ids so a persisted graph
//! can be reloaded into a fresh arena. Loading checks every reference and
//! runs [`NetworkGraph::validate`] on the result.

use nalgebra::Point3;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::arena::*;
use crate::error::{Error, Result};
use crate::keys::*;

/// Serializable representation of a full network graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub tolerance: f64,
    pub junctions: Vec<JunctionSnapshot>,
    pub edges: Vec<EdgeSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JunctionSnapshot {
    pub id: usize,
    pub position: [f64; 3],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeSnapshot {
    pub from: usize,
    pub to: usize,
    pub source_id: u64,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub segment: u32,
    pub cost: f64,
    pub length: f64,
}

fn is_zero(v: &u32) -> bool {
    *v == 0
}

impl NetworkGraph {
    /// Serializes the graph to a JSON string.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.to_snapshot())
            .map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Deserializes a graph from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: GraphSnapshot =
            serde_json::from_str(json).map_err(|e| Error::Serialization(e.to_string()))?;
        Self::from_snapshot(&snapshot)
    }

    /// Creates a serializable snapshot of the graph.
    pub fn to_snapshot(&self) -> GraphSnapshot {
        let mut junction_ids: FxHashMap<JunctionKey, usize> = FxHashMap::default();

        let junctions: Vec<JunctionSnapshot> = self
            .junctions
            .iter()
            .enumerate()
            .map(|(i, (k, j))| {
                junction_ids.insert(k, i);
                JunctionSnapshot {
                    id: i,
                    position: [j.position.x, j.position.y, j.position.z],
                }
            })
            .collect();

        let edges: Vec<EdgeSnapshot> = self
            .edges
            .values()
            .map(|e| EdgeSnapshot {
                from: junction_ids[&e.from],
                to: junction_ids[&e.to],
                source_id: e.source_id,
                segment: e.segment,
                cost: e.cost,
                length: e.length,
            })
            .collect();

        GraphSnapshot {
            tolerance: self.tolerance,
            junctions,
            edges,
        }
    }

    /// Reconstructs a graph from a snapshot.
    pub fn from_snapshot(snap: &GraphSnapshot) -> Result<Self> {
        let mut graph = NetworkGraph::new(snap.tolerance)?;

        // Insert directly so each snapshot id keeps its own junction
        let mut junction_keys: Vec<JunctionKey> = Vec::with_capacity(snap.junctions.len());
        for js in &snap.junctions {
            let position = Point3::new(js.position[0], js.position[1], js.position[2]);
            let jk = graph.junctions.insert(JunctionData { position });
            graph.index_junction(jk, &position);
            junction_keys.push(jk);
        }

        for (i, es) in snap.edges.iter().enumerate() {
            let lookup = |idx: usize| {
                junction_keys
                    .get(idx)
                    .copied()
                    .ok_or(Error::DanglingSnapshotEdge {
                        edge: i,
                        junction: idx,
                        junctions: junction_keys.len(),
                    })
            };
            let from = lookup(es.from)?;
            let to = lookup(es.to)?;
            graph.add_edge(from, to, es.source_id, es.segment, es.cost, es.length)?;
        }

        graph.validate()?;
        Ok(graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::construction::{BuildOptions, SourceEdge};

    #[test]
    fn json_round_trip_preserves_connectivity() {
        let a = [Point3::new(0.0, 0.0, 3.0), Point3::new(4.0, 0.0, 3.0)];
        let b = [Point3::new(4.0, 0.0, 3.0), Point3::new(4.0, 4.0, 3.0)];
        let graph = NetworkGraph::build(
            [SourceEdge::new(10, &a, 0.1), SourceEdge::new(11, &b, 0.2)],
            &BuildOptions::default(),
        )
        .unwrap();

        let restored = NetworkGraph::from_json(&graph.to_json().unwrap()).unwrap();
        assert_eq!(restored.connectivity(), graph.connectivity());
        assert_eq!(restored.summary(), graph.summary());
    }

    #[test]
    fn snapshot_with_dangling_edge_is_rejected() {
        let snap = GraphSnapshot {
            tolerance: 0.001,
            junctions: vec![JunctionSnapshot {
                id: 0,
                position: [0.0, 0.0, 0.0],
            }],
            edges: vec![EdgeSnapshot {
                from: 0,
                to: 5,
                source_id: 1,
                segment: 0,
                cost: 1.0,
                length: 1.0,
            }],
        };
        assert!(matches!(
            NetworkGraph::from_snapshot(&snap),
            Err(Error::DanglingSnapshotEdge {
                edge: 0,
                junction: 5,
                junctions: 1
            })
        ));
    }

    #[test]
    fn malformed_json_is_a_serialization_error() {
        assert!(matches!(
            NetworkGraph::from_json("{ not json"),
            Err(Error::Serialization(_))
        ));
    }
}
