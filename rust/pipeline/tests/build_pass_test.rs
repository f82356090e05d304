// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use approx::assert_relative_eq;
use floornet_core::{
    Field, FloorKey, LiftedFeature, Polyline, Schema, SkeletonFeature, SkeletonGeometry,
    TransientId,
};
use floornet_pipeline::{
    merge, rebuild, BuildPass, BuildPassOptions, DuplicatePolicy, FileStore, FloorError,
    FloorPartition, FloorRegistry, GraphState, HandoffDirectory, HandoffError,
    JsonRegistrySource, MemoryStore, MergeError, NetworkStore, PassError, PassState,
    PassWorkspace,
};
use floornet_topology::BuildOptions;
use uuid::Uuid;

fn fixtures() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
}

fn registry() -> FloorRegistry {
    FloorRegistry::load(&JsonRegistrySource::new(fixtures().join("registry.json"))).unwrap()
}

fn skeletons() -> HandoffDirectory {
    HandoffDirectory::scan(fixtures().join("skeletons")).unwrap()
}

fn temp_store_dir() -> PathBuf {
    std::env::temp_dir().join(format!("floornet-pass-{}", Uuid::new_v4()))
}

fn both_floors() -> Vec<FloorKey> {
    vec![FloorKey::new("338", "01"), FloorKey::new("338", "02")]
}

#[test]
fn two_floor_scenario() {
    let dir = temp_store_dir();
    let registry = registry();
    let skeletons = skeletons();

    {
        let mut store = FileStore::create(&dir, Schema::pedestrian_network()).unwrap();
        let before = store.feature_count();

        let mut options = BuildPassOptions::new(both_floors());
        options.speed = 4.11;
        let report = BuildPass::new(options).run(&registry, &skeletons, &mut store);

        assert!(report.is_success(), "{:?}", report.error);
        assert_eq!(store.feature_count(), before + 2);
        assert_eq!(report.counts.rejected, 1);
        assert_eq!(report.rebuild.as_ref().unwrap().summary.components, 2);

        let source = store.source().unwrap();
        for feature in &source {
            assert_relative_eq!(feature.length, 100.0, epsilon = 1e-9);
            assert_relative_eq!(feature.minutes, 100.0 / (4.11 * 60.0), epsilon = 1e-12);
            assert!((feature.minutes - 0.4057).abs() < 1e-3);
            assert_relative_eq!(feature.seconds, 24.33, epsilon = 1e-2);
            let z = if feature.floor_id == "01" { 0.0 } else { 10.0 };
            assert!(feature.points.iter().all(|p| p[2] == z));
        }
        assert_eq!(source[0].name.as_deref(), Some("PATH"));
        assert_eq!(source[1].name.as_deref(), Some("corridor"));
    }

    let store = FileStore::open_read_only(&dir).unwrap();
    assert_eq!(store.graph_state(), GraphState::Fresh);
    let graph = store.graph().unwrap().unwrap();
    assert_eq!(graph.component_count(), 2);
    assert_eq!(graph.edge_count(), 2);

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn zero_length_feature_never_reaches_store() {
    let mut store = MemoryStore::default();
    let report = BuildPass::new(BuildPassOptions::new(vec![FloorKey::new("338", "01")])).run(
        &registry(),
        &skeletons(),
        &mut store,
    );

    assert!(report.is_success());
    assert_eq!(report.counts.loaded, 2);
    assert_eq!(report.counts.lifted, 1);
    assert_eq!(report.floors[0].rejected.len(), 1);
    assert_eq!(store.feature_count(), 1);
}

#[test]
fn floor_without_skeletons_is_reported() {
    let mut store = MemoryStore::default();
    let floors = vec![FloorKey::new("338", "02"), FloorKey::new("338", "03")];
    let report = BuildPass::new(BuildPassOptions::new(floors)).run(
        &registry(),
        &skeletons(),
        &mut store,
    );

    assert!(report.is_success());
    let failed: Vec<_> = report.failed_floors().collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].floor, FloorKey::new("338", "03"));
    assert!(matches!(
        failed[0].error,
        Some(FloorError::Handoff(HandoffError::MissingFloor(_)))
    ));
}

#[test]
fn missing_name_is_a_schema_mismatch() {
    let mut store = MemoryStore::default();
    let floor = FloorKey::new("338", "01");

    let mut partition = FloorPartition::new(0, floor.clone());
    partition.features.push(LiftedFeature {
        id: TransientId::new(0, 0),
        floor: floor.clone(),
        geometry: Polyline::from_xy(&[(0.0, 0.0), (100.0, 0.0)]),
        name: None,
        speed: 4.11,
        minutes: 100.0 / (4.11 * 60.0),
        seconds: 100.0 / 4.11,
        length: 100.0,
        source_layer: None,
    });
    let mut workspace = PassWorkspace::new(Uuid::new_v4());
    workspace.insert(partition).unwrap();

    let err = merge(workspace, &mut store, DuplicatePolicy::Reject).unwrap_err();
    assert!(matches!(err, MergeError::SchemaMismatch { .. }));
    assert_eq!(err.missing_fields(), &[Field::Name]);
    assert_eq!(store.feature_count(), 0);
    assert!(store.merged_floors().is_empty());
    assert_eq!(store.graph_state(), GraphState::Missing);
}

#[test]
fn schema_mismatch_fails_pass_before_rebuild() {
    // Store without a source layer field; floor 01 features carry one
    let schema = Schema::new(
        Schema::pedestrian_network()
            .fields
            .into_iter()
            .filter(|def| def.field != Field::SourceLayer)
            .collect(),
    );
    let mut store = MemoryStore::new(schema);
    let report = BuildPass::new(BuildPassOptions::new(both_floors())).run(
        &registry(),
        &skeletons(),
        &mut store,
    );

    assert_eq!(report.state, PassState::Failed);
    assert_eq!(report.failed_stage, Some(PassState::Merged));
    assert!(matches!(
        report.error,
        Some(PassError::Merge(MergeError::SchemaMismatch { .. }))
    ));
    assert!(report.rebuild.is_none());
    assert_eq!(store.feature_count(), 0);
    assert_eq!(store.graph_state(), GraphState::Missing);
}

#[test]
fn rebuild_is_idempotent_on_unchanged_source() {
    let mut store = MemoryStore::default();
    let report = BuildPass::new(BuildPassOptions::new(both_floors())).run(
        &registry(),
        &skeletons(),
        &mut store,
    );
    assert!(report.is_success());

    let first = store.graph().unwrap().unwrap().connectivity();
    let again = rebuild(&mut store, &BuildOptions::default()).unwrap();
    let second = store.graph().unwrap().unwrap().connectivity();

    assert_eq!(first, second);
    assert_eq!(Some(again.summary), report.rebuild.map(|r| r.summary));
}

#[test]
fn second_pass_over_same_floor_is_rejected() {
    let registry = registry();
    let skeletons = skeletons();
    let mut store = MemoryStore::default();
    let floors = vec![FloorKey::new("338", "02")];

    assert!(BuildPass::new(BuildPassOptions::new(floors.clone()))
        .run(&registry, &skeletons, &mut store)
        .is_success());

    let report =
        BuildPass::new(BuildPassOptions::new(floors.clone())).run(&registry, &skeletons, &mut store);
    assert!(matches!(
        report.error,
        Some(PassError::Merge(MergeError::DuplicateFloor(_)))
    ));
    assert_eq!(store.feature_count(), 1);
    assert_eq!(report.graph_state, GraphState::Fresh);

    let mut options = BuildPassOptions::new(floors);
    options.duplicate_policy = DuplicatePolicy::Allow;
    let report = BuildPass::new(options).run(&registry, &skeletons, &mut store);
    assert!(report.is_success());
    assert_eq!(store.feature_count(), 2);
}

#[test]
fn floor_with_only_rejected_features_can_be_merged_later() {
    let registry = registry();
    let floor = FloorKey::new("338", "01");
    let skeleton = |coords: &[(f64, f64)]| {
        let mut source = BTreeMap::new();
        source.insert(
            floor.clone(),
            vec![SkeletonFeature::new(
                floor.clone(),
                SkeletonGeometry::single(Polyline::from_xy(coords)),
            )],
        );
        source
    };
    let mut store = MemoryStore::default();

    let broken = skeleton(&[(5.0, 5.0), (5.0, 5.0)]);
    let report =
        BuildPass::new(BuildPassOptions::new(vec![floor.clone()])).run(&registry, &broken, &mut store);
    assert!(report.is_success(), "{:?}", report.error);
    assert_eq!(report.counts.merged, 0);
    assert!(store.merged_floors().is_empty());

    let fixed = skeleton(&[(0.0, 0.0), (100.0, 0.0)]);
    let report =
        BuildPass::new(BuildPassOptions::new(vec![floor.clone()])).run(&registry, &fixed, &mut store);
    assert!(report.is_success(), "{:?}", report.error);
    assert_eq!(report.counts.merged, 1);
    assert!(store.merged_floors().contains(&floor));
}

mod merge_props {
    use super::*;
    use proptest::prelude::*;

    fn workspace(counts: &[usize], bad: Option<(usize, usize)>) -> PassWorkspace {
        let mut ws = PassWorkspace::new(Uuid::new_v4());
        for (i, &n) in counts.iter().enumerate() {
            let mut p = FloorPartition::new(i as u32, FloorKey::new("338", format!("{i:02}")));
            for j in 0..n {
                let name = match bad {
                    Some(b) if b == (i, j) => None,
                    _ => Some("path".to_string()),
                };
                p.features.push(LiftedFeature {
                    id: p.next_id(),
                    floor: p.floor.clone(),
                    geometry: Polyline::from_xy(&[(0.0, j as f64), (1.0, j as f64)])
                        .at_elevation(i as f64 * 3.0),
                    name,
                    speed: 1.0,
                    minutes: 1.0 / 60.0,
                    seconds: 1.0,
                    length: 1.0,
                    source_layer: None,
                });
            }
            ws.insert(p).unwrap();
        }
        ws
    }

    proptest! {
        #[test]
        fn merge_is_all_or_nothing(
            counts in prop::collection::vec(1usize..6, 1..5),
            pick in any::<prop::sample::Index>(),
            inner in any::<prop::sample::Index>(),
        ) {
            let floor = pick.index(counts.len());
            let bad = (floor, inner.index(counts[floor]));

            let mut store = MemoryStore::default();
            let result = merge(workspace(&counts, Some(bad)), &mut store, DuplicatePolicy::Reject);
            prop_assert!(result.is_err());
            prop_assert_eq!(store.feature_count(), 0);
            prop_assert!(store.merged_floors().is_empty());

            let report = merge(workspace(&counts, None), &mut store, DuplicatePolicy::Reject).unwrap();
            prop_assert_eq!(report.appended, counts.iter().sum::<usize>());
            prop_assert_eq!(store.feature_count(), report.appended);
        }
    }
}
