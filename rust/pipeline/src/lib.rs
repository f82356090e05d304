// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # Floornet Pipeline
//!
//! Turns per-floor centerline skeletons into a routable multi-floor network.
//!
//! ## Stages
//!
//! 1. [`FloorRegistry`] resolves each floor's elevation offset.
//! 2. [`enrich()`] adds routing attributes (speed, minutes, seconds, elevation).
//! 3. [`lift()`] moves every vertex to the floor elevation.
//! 4. [`merge()`] appends the whole batch to a [`NetworkStore`].
//! 5. [`rebuild()`] recomputes the network topology from the store.
//!
//! [`BuildPass`] drives the stages as one state machine, running enrich
//! and lift per floor in parallel.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::collections::BTreeMap;
//! use floornet_core::{FloorKey, Polyline, SkeletonFeature, SkeletonGeometry};
//! use floornet_pipeline::{BuildPass, BuildPassOptions, FloorRegistry, MemoryStore, RegistryRow};
//!
//! let registry = FloorRegistry::from_rows(vec![RegistryRow::new("338", "01", 0.0)]).unwrap();
//! let floor = FloorKey::new("338", "01");
//! let line = Polyline::from_xy(&[(0.0, 0.0), (100.0, 0.0)]);
//! let mut skeletons = BTreeMap::new();
//! skeletons.insert(
//!     floor.clone(),
//!     vec![SkeletonFeature::new(floor.clone(), SkeletonGeometry::single(line))],
//! );
//!
//! let mut store = MemoryStore::default();
//! let report = BuildPass::new(BuildPassOptions::new(vec![floor]))
//!     .run(&registry, &skeletons, &mut store);
//! assert!(report.is_success());
//! ```

pub mod enrich;
pub mod error;
pub mod handoff;
pub mod lift;
pub mod merge;
pub mod pass;
pub mod rebuild;
pub mod registry;
pub mod store;
pub mod workspace;

pub use enrich::{enrich, enrich_feature, EnrichOutcome};
pub use error::{
    EnrichError, FloorError, HandoffError, LiftError, MergeError, PassError, RebuildError,
    RegistryError, StoreError, WorkspaceError,
};
pub use handoff::{parse_skeletons, read_skeleton_file, FloorSkeletons, HandoffDirectory, SkeletonSource};
pub use lift::{lift, lift_floor};
pub use merge::{merge, DuplicatePolicy, MergeReport};
pub use pass::{
    BuildPass, BuildPassOptions, CancelToken, FloorOutcome, PassCounts, PassReport, PassState,
    DEFAULT_SPEED,
};
pub use rebuild::{rebuild, RebuildReport};
pub use registry::{FloorRegistry, JsonRegistrySource, RegistryRow, RegistrySource};
pub use store::{AppendBatch, FileStore, GraphState, MemoryStore, NetworkStore, SourceFeature};
pub use workspace::{FloorPartition, PassWorkspace};
