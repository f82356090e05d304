// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Pass-scoped transient workspace.
//!
//! Lifted features live here between Lift and Merge. Every floor gets its
//! own partition index, so transient ids produced by parallel lift tasks
//! never overlap. The workspace is consumed by the merge and dropped after
//! commit; nothing in it outlives the pass.

use std::collections::BTreeMap;

use floornet_core::{FloorKey, LiftedFeature, TransientId};
use rustc_hash::FxHashSet;
use uuid::Uuid;

use crate::error::WorkspaceError;

/// Lifted features of one floor.
#[derive(Debug, Clone, PartialEq)]
pub struct FloorPartition {
    pub index: u32,
    pub floor: FloorKey,
    pub features: Vec<LiftedFeature>,
}

impl FloorPartition {
    pub fn new(index: u32, floor: FloorKey) -> Self {
        Self {
            index,
            floor,
            features: Vec::new(),
        }
    }

    /// Id the next pushed feature should carry.
    pub fn next_id(&self) -> TransientId {
        TransientId::new(self.index, self.features.len() as u32)
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// Transient container for one build pass.
#[derive(Debug, Clone)]
pub struct PassWorkspace {
    pass_id: Uuid,
    partitions: BTreeMap<FloorKey, FloorPartition>,
    indices: FxHashSet<u32>,
}

impl PassWorkspace {
    pub fn new(pass_id: Uuid) -> Self {
        Self {
            pass_id,
            partitions: BTreeMap::new(),
            indices: FxHashSet::default(),
        }
    }

    pub fn pass_id(&self) -> Uuid {
        self.pass_id
    }

    /// Join one floor's partition into the workspace.
    ///
    /// Rejects a second partition for the same floor or index, and any
    /// feature whose id was issued for another partition.
    pub fn insert(&mut self, partition: FloorPartition) -> Result<(), WorkspaceError> {
        if self.partitions.contains_key(&partition.floor) {
            return Err(WorkspaceError::FloorTaken(partition.floor));
        }
        if self.indices.contains(&partition.index) {
            return Err(WorkspaceError::PartitionTaken(partition.index));
        }
        if let Some(f) = partition
            .features
            .iter()
            .find(|f| f.id.partition != partition.index)
        {
            return Err(WorkspaceError::ForeignId {
                partition: partition.index,
                id: f.id,
            });
        }

        self.indices.insert(partition.index);
        self.partitions.insert(partition.floor.clone(), partition);
        Ok(())
    }

    /// Total number of lifted features.
    pub fn len(&self) -> usize {
        self.partitions.values().map(FloorPartition::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Floors present, sorted.
    pub fn floors(&self) -> impl Iterator<Item = &FloorKey> {
        self.partitions.keys()
    }

    pub fn partition(&self, floor: &FloorKey) -> Option<&FloorPartition> {
        self.partitions.get(floor)
    }

    /// Features ordered by floor, then by transient id.
    pub fn features(&self) -> impl Iterator<Item = &LiftedFeature> {
        self.partitions.values().flat_map(|p| p.features.iter())
    }

    pub fn into_features(self) -> Vec<LiftedFeature> {
        self.partitions
            .into_values()
            .flat_map(|p| p.features)
            .collect()
    }

    /// Drop the workspace and everything in it.
    pub fn discard(self) {
        tracing::debug!(
            pass = %self.pass_id,
            floors = self.partitions.len(),
            features = self.len(),
            "Workspace discarded"
        );
    }
}
