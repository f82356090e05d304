// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Network source merge.
//!
//! Appends a whole pass workspace to the store in one batch. Every check
//! runs before the append, so a failed merge never leaves a partial batch
//! behind.

use floornet_core::{FloorKey, TransientId};
use serde::{Deserialize, Serialize};

use crate::error::MergeError;
use crate::store::{AppendBatch, NetworkStore};
use crate::workspace::PassWorkspace;

/// What to do when a floor of the batch is already in the merged-floor ledger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    #[default]
    Reject,
    /// Append anyway; the source then holds the floor twice.
    Allow,
}

/// Outcome of a successful merge.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MergeReport {
    pub appended: usize,
    /// Transient ids in append order; `source_ids[i]` was assigned to
    /// `transient_ids[i]`.
    pub transient_ids: Vec<TransientId>,
    pub source_ids: Vec<u64>,
    pub floors: Vec<FloorKey>,
}

/// Merge every lifted feature of `workspace` into `store`.
///
/// The workspace is consumed whether or not the merge succeeds.
pub fn merge(
    workspace: PassWorkspace,
    store: &mut dyn NetworkStore,
    policy: DuplicatePolicy,
) -> Result<MergeReport, MergeError> {
    let schema = store.schema();
    for feature in workspace.features() {
        schema
            .check(&feature.fields())
            .map_err(|violation| MergeError::SchemaMismatch {
                id: feature.id,
                floor: feature.floor.clone(),
                violation,
            })?;
    }

    // Only floors that contribute features enter the ledger
    let floors: Vec<FloorKey> = workspace
        .floors()
        .filter(|f| workspace.partition(f).is_some_and(|p| !p.is_empty()))
        .cloned()
        .collect();
    if policy == DuplicatePolicy::Reject {
        let merged = store.merged_floors();
        if let Some(floor) = floors.iter().find(|f| merged.contains(*f)) {
            return Err(MergeError::DuplicateFloor(floor.clone()));
        }
    }

    let pass_id = workspace.pass_id();
    let features = workspace.into_features();
    let transient_ids: Vec<TransientId> = features.iter().map(|f| f.id).collect();
    let source_ids = store.append(AppendBatch {
        features,
        floors: floors.clone(),
    })?;

    tracing::info!(
        pass = %pass_id,
        appended = source_ids.len(),
        floors = floors.len(),
        total = store.feature_count(),
        "Merged features into network source"
    );

    Ok(MergeReport {
        appended: source_ids.len(),
        transient_ids,
        source_ids,
        floors,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{GraphState, MemoryStore};
    use crate::workspace::FloorPartition;
    use floornet_core::{Field, LiftedFeature, Polyline, Schema};
    use uuid::Uuid;

    fn workspace(floors: &[(&str, u32)], name: Option<&str>) -> PassWorkspace {
        let mut ws = PassWorkspace::new(Uuid::new_v4());
        for (i, &(floor, n)) in floors.iter().enumerate() {
            let mut p = FloorPartition::new(i as u32, FloorKey::new("338", floor));
            for _ in 0..n {
                let f = LiftedFeature {
                    id: p.next_id(),
                    floor: p.floor.clone(),
                    geometry: Polyline::from_xy(&[(0.0, 0.0), (1.0, 0.0)]),
                    name: name.map(String::from),
                    speed: 1.0,
                    minutes: 1.0 / 60.0,
                    seconds: 1.0,
                    length: 1.0,
                    source_layer: None,
                };
                p.features.push(f);
            }
            ws.insert(p).unwrap();
        }
        ws
    }

    #[test]
    fn merge_appends_whole_workspace() {
        let mut store = MemoryStore::default();
        let report = merge(
            workspace(&[("01", 2), ("02", 1)], Some("corridor")),
            &mut store,
            DuplicatePolicy::Reject,
        )
        .unwrap();

        assert_eq!(report.appended, 3);
        assert_eq!(report.source_ids, vec![1, 2, 3]);
        assert_eq!(report.transient_ids[2], TransientId::new(1, 0));
        assert_eq!(store.feature_count(), 3);
        assert_eq!(store.merged_floors().len(), 2);
    }

    #[test]
    fn schema_mismatch_appends_nothing() {
        let mut store = MemoryStore::default();
        let err = merge(
            workspace(&[("01", 3)], None),
            &mut store,
            DuplicatePolicy::Reject,
        )
        .unwrap_err();

        assert_eq!(err.missing_fields(), &[Field::Name]);
        assert_eq!(store.feature_count(), 0);
        assert!(store.merged_floors().is_empty());
        assert_eq!(store.graph_state(), GraphState::Missing);
    }

    #[test]
    fn unexpected_field_is_a_mismatch() {
        let schema = Schema::new(
            Schema::pedestrian_network()
                .fields
                .into_iter()
                .filter(|def| def.field != Field::Speed)
                .collect(),
        );
        let mut store = MemoryStore::new(schema);
        let err = merge(
            workspace(&[("01", 1)], Some("a")),
            &mut store,
            DuplicatePolicy::Reject,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            MergeError::SchemaMismatch { ref violation, .. } if violation.unexpected == vec![Field::Speed]
        ));
    }

    #[test]
    fn duplicate_floor_policy() {
        let mut store = MemoryStore::default();
        merge(workspace(&[("01", 1)], Some("a")), &mut store, DuplicatePolicy::Reject).unwrap();

        let err = merge(
            workspace(&[("02", 1), ("01", 1)], Some("a")),
            &mut store,
            DuplicatePolicy::Reject,
        )
        .unwrap_err();
        assert!(matches!(err, MergeError::DuplicateFloor(ref f) if *f == FloorKey::new("338", "01")));
        assert_eq!(store.feature_count(), 1);

        merge(workspace(&[("01", 1)], Some("a")), &mut store, DuplicatePolicy::Allow).unwrap();
        assert_eq!(store.feature_count(), 2);
    }

    #[test]
    fn empty_floor_stays_out_of_ledger() {
        let mut store = MemoryStore::default();
        let report = merge(
            workspace(&[("01", 0), ("02", 1)], Some("a")),
            &mut store,
            DuplicatePolicy::Reject,
        )
        .unwrap();
        assert_eq!(report.floors, vec![FloorKey::new("338", "02")]);
        assert!(!store.merged_floors().contains(&FloorKey::new("338", "01")));

        // Once fixed, the floor merges without a duplicate error
        let report = merge(workspace(&[("01", 2)], Some("a")), &mut store, DuplicatePolicy::Reject)
            .unwrap();
        assert_eq!(report.appended, 2);
        assert!(store.merged_floors().contains(&FloorKey::new("338", "01")));
    }
}
