// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Network source stores.
//!
//! A store holds the persistent network source (append-only feature
//! collection), the merged-floor ledger and the last installed graph.
//! Stores are single-writer: every mutating call takes `&mut self`.

mod file;

pub use file::FileStore;

use std::collections::BTreeSet;
use std::fmt;

use floornet_core::{FloorKey, LiftedFeature, Point3, Schema};
use floornet_topology::{GraphSnapshot, NetworkGraph};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// One persisted network source feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceFeature {
    pub source_id: u64,
    pub building_id: String,
    pub floor_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub speed: f64,
    pub minutes: f64,
    pub seconds: f64,
    pub length: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_layer: Option<String>,
    pub points: Vec<[f64; 3]>,
}

impl SourceFeature {
    pub fn from_lifted(source_id: u64, feature: &LiftedFeature) -> Self {
        Self {
            source_id,
            building_id: feature.floor.building_id().to_string(),
            floor_id: feature.floor.floor_id().to_string(),
            name: feature.name.clone(),
            speed: feature.speed,
            minutes: feature.minutes,
            seconds: feature.seconds,
            length: feature.length,
            source_layer: feature.source_layer.clone(),
            points: feature
                .geometry
                .points
                .iter()
                .map(|p| [p.x, p.y, p.z])
                .collect(),
        }
    }

    pub fn floor(&self) -> FloorKey {
        FloorKey::new(self.building_id.as_str(), self.floor_id.as_str())
    }

    pub fn positions(&self) -> Vec<Point3<f64>> {
        self.points
            .iter()
            .map(|p| Point3::new(p[0], p[1], p[2]))
            .collect()
    }
}

/// Whether the installed graph reflects the current source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GraphState {
    /// No graph has ever been installed.
    #[default]
    Missing,
    /// Installed by the last rebuild, no append since.
    Fresh,
    /// Source changed after the last rebuild.
    Stale,
}

impl fmt::Display for GraphState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            GraphState::Missing => "missing",
            GraphState::Fresh => "fresh",
            GraphState::Stale => "stale",
        })
    }
}

/// Features and floors committed together by one merge.
#[derive(Debug, Clone, Default)]
pub struct AppendBatch {
    pub features: Vec<LiftedFeature>,
    pub floors: Vec<FloorKey>,
}

/// Narrow contract of the persistent network source.
pub trait NetworkStore {
    fn schema(&self) -> &Schema;

    /// Append every feature atomically, record the floors in the ledger and
    /// mark the graph stale. Returns the assigned source ids in batch order.
    fn append(&mut self, batch: AppendBatch) -> Result<Vec<u64>, StoreError>;

    /// Snapshot of every source feature, in source id order.
    fn source(&self) -> Result<Vec<SourceFeature>, StoreError>;

    fn feature_count(&self) -> usize;

    /// Floors merged so far.
    fn merged_floors(&self) -> &BTreeSet<FloorKey>;

    fn graph_state(&self) -> GraphState;

    /// Replace the installed graph and mark it fresh.
    fn install_graph(&mut self, graph: &NetworkGraph) -> Result<(), StoreError>;

    /// The installed graph, if any.
    fn graph(&self) -> Result<Option<NetworkGraph>, StoreError>;
}

/// Serializable state shared by the store implementations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct SourceDocument {
    pub schema: Schema,
    pub next_id: u64,
    pub merged_floors: BTreeSet<FloorKey>,
    pub graph_state: GraphState,
    /// Generation of the installed graph; bumped by every install.
    #[serde(default)]
    pub graph_generation: u64,
    pub features: Vec<SourceFeature>,
}

impl SourceDocument {
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            next_id: 1,
            merged_floors: BTreeSet::new(),
            graph_state: GraphState::Missing,
            graph_generation: 0,
            features: Vec::new(),
        }
    }

    pub fn apply(&mut self, batch: AppendBatch) -> Vec<u64> {
        let mut ids = Vec::with_capacity(batch.features.len());
        for feature in &batch.features {
            let id = self.next_id;
            self.next_id += 1;
            self.features.push(SourceFeature::from_lifted(id, feature));
            ids.push(id);
        }
        self.merged_floors.extend(batch.floors);
        if self.graph_state == GraphState::Fresh {
            self.graph_state = GraphState::Stale;
        }
        ids
    }

    pub fn check(&self) -> Result<(), StoreError> {
        let mut last = 0;
        for f in &self.features {
            if f.source_id <= last || f.source_id >= self.next_id {
                return Err(StoreError::Corrupt(format!(
                    "source id {} out of order",
                    f.source_id
                )));
            }
            last = f.source_id;
        }
        Ok(())
    }
}

/// Network store kept entirely in memory.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    doc: SourceDocument,
    graph: Option<GraphSnapshot>,
}

impl MemoryStore {
    pub fn new(schema: Schema) -> Self {
        Self {
            doc: SourceDocument::new(schema),
            graph: None,
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(Schema::pedestrian_network())
    }
}

impl NetworkStore for MemoryStore {
    fn schema(&self) -> &Schema {
        &self.doc.schema
    }

    fn append(&mut self, batch: AppendBatch) -> Result<Vec<u64>, StoreError> {
        Ok(self.doc.apply(batch))
    }

    fn source(&self) -> Result<Vec<SourceFeature>, StoreError> {
        Ok(self.doc.features.clone())
    }

    fn feature_count(&self) -> usize {
        self.doc.features.len()
    }

    fn merged_floors(&self) -> &BTreeSet<FloorKey> {
        &self.doc.merged_floors
    }

    fn graph_state(&self) -> GraphState {
        self.doc.graph_state
    }

    fn install_graph(&mut self, graph: &NetworkGraph) -> Result<(), StoreError> {
        self.graph = Some(graph.to_snapshot());
        self.doc.graph_state = GraphState::Fresh;
        Ok(())
    }

    fn graph(&self) -> Result<Option<NetworkGraph>, StoreError> {
        self.graph
            .as_ref()
            .map(NetworkGraph::from_snapshot)
            .transpose()
            .map_err(StoreError::from)
    }
}
