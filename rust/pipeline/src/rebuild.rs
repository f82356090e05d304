// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Full network topology rebuild.

use std::time::{Duration, Instant};

use floornet_core::Point3;
use floornet_topology::{BuildOptions, GraphSummary, NetworkGraph, SourceEdge};
use serde::Serialize;

use crate::error::RebuildError;
use crate::store::NetworkStore;

/// Outcome of a successful rebuild.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RebuildReport {
    pub sources: usize,
    pub summary: GraphSummary,
    pub elapsed: Duration,
}

/// Rebuild the network graph from the current source and install it.
///
/// Always a full rebuild. Edge cost is the feature's `minutes`. On error
/// nothing is installed and the previous graph stays in place.
pub fn rebuild(
    store: &mut dyn NetworkStore,
    options: &BuildOptions,
) -> Result<RebuildReport, RebuildError> {
    let start = Instant::now();
    let source = store.source()?;

    let positions: Vec<Vec<Point3<f64>>> = source.iter().map(|f| f.positions()).collect();
    let edges = source
        .iter()
        .zip(&positions)
        .map(|(f, points)| SourceEdge::new(f.source_id, points, f.minutes));

    let graph = NetworkGraph::build(edges, options).map_err(|e| {
        tracing::error!(error = %e, sources = source.len(), "Topology rebuild failed");
        RebuildError::Topology(e)
    })?;
    store.install_graph(&graph)?;

    let report = RebuildReport {
        sources: source.len(),
        summary: graph.summary(),
        elapsed: start.elapsed(),
    };
    tracing::info!(
        sources = report.sources,
        junctions = report.summary.junctions,
        edges = report.summary.edges,
        components = report.summary.components,
        elapsed_ms = report.elapsed.as_millis() as u64,
        "Network topology rebuilt"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{AppendBatch, GraphState, MemoryStore};
    use floornet_core::{FloorKey, LiftedFeature, Polyline, TransientId};

    fn feature(coords: &[(f64, f64)], z: f64) -> LiftedFeature {
        LiftedFeature {
            id: TransientId::new(0, 0),
            floor: FloorKey::new("338", "01"),
            geometry: Polyline::from_xy(coords).at_elevation(z),
            name: Some(String::new()),
            speed: 1.0,
            minutes: 0.5,
            seconds: 30.0,
            length: 30.0,
            source_layer: None,
        }
    }

    fn store_with(features: Vec<LiftedFeature>) -> MemoryStore {
        let mut store = MemoryStore::default();
        store
            .append(AppendBatch {
                features,
                floors: vec![],
            })
            .unwrap();
        store
    }

    #[test]
    fn rebuild_installs_fresh_graph() {
        let mut store = store_with(vec![
            feature(&[(0.0, 0.0), (30.0, 0.0)], 0.0),
            feature(&[(30.0, 0.0), (30.0, 30.0)], 0.0),
        ]);
        let report = rebuild(&mut store, &BuildOptions::default()).unwrap();

        assert_eq!(report.sources, 2);
        assert_eq!(report.summary.edges, 2);
        assert_eq!(report.summary.junctions, 3);
        assert_eq!(report.summary.components, 1);
        assert_eq!(store.graph_state(), GraphState::Fresh);
    }

    #[test]
    fn rebuild_is_idempotent() {
        let mut store = store_with(vec![
            feature(&[(0.0, 0.0), (30.0, 0.0)], 0.0),
            feature(&[(30.0, 0.0), (30.0, 30.0)], 0.0),
            feature(&[(0.0, 0.0), (30.0, 0.0)], 10.0),
        ]);
        rebuild(&mut store, &BuildOptions::default()).unwrap();
        let first = store.graph().unwrap().unwrap().connectivity();
        rebuild(&mut store, &BuildOptions::default()).unwrap();
        let second = store.graph().unwrap().unwrap().connectivity();
        assert_eq!(first, second);
    }

    #[test]
    fn failed_rebuild_keeps_previous_graph() {
        let mut store = store_with(vec![feature(&[(0.0, 0.0), (30.0, 0.0)], 0.0)]);
        rebuild(&mut store, &BuildOptions::default()).unwrap();

        let mut bad = feature(&[(0.0, 0.0), (1.0, 0.0)], 0.0);
        bad.geometry.points[1].z = 4.0;
        store
            .append(AppendBatch {
                features: vec![bad],
                floors: vec![],
            })
            .unwrap();

        let err = rebuild(&mut store, &BuildOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            RebuildError::Topology(floornet_topology::Error::NonPlanarSource(2))
        ));
        assert_eq!(store.graph_state(), GraphState::Stale);
        assert_eq!(store.graph().unwrap().unwrap().edge_count(), 1);
    }

    #[test]
    fn store_failure_keeps_previous_graph() {
        use crate::error::StoreError;
        use crate::store::FileStore;
        use floornet_core::Schema;

        let dir = std::env::temp_dir().join(format!("floornet-rebuild-{}", uuid::Uuid::new_v4()));
        let mut store = FileStore::create(&dir, Schema::pedestrian_network()).unwrap();
        let append = |store: &mut FileStore, f: LiftedFeature| {
            store
                .append(AppendBatch {
                    features: vec![f],
                    floors: vec![],
                })
                .unwrap()
        };
        append(&mut store, feature(&[(0.0, 0.0), (30.0, 0.0)], 0.0));
        rebuild(&mut store, &BuildOptions::default()).unwrap();
        append(&mut store, feature(&[(30.0, 0.0), (30.0, 30.0)], 0.0));

        let blocker = dir.join("network.json.tmp");
        std::fs::create_dir(&blocker).unwrap();
        let err = rebuild(&mut store, &BuildOptions::default()).unwrap_err();
        assert!(matches!(err, RebuildError::Store(StoreError::Io { .. })));
        assert_eq!(store.graph_state(), GraphState::Stale);
        assert_eq!(store.graph().unwrap().unwrap().edge_count(), 1);

        std::fs::remove_dir(&blocker).unwrap();
        let report = rebuild(&mut store, &BuildOptions::default()).unwrap();
        assert_eq!(report.summary.edges, 2);
        assert_eq!(store.graph_state(), GraphState::Fresh);

        drop(store);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
