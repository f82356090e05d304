// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Build pass orchestration.
//!
//! A build pass moves through
//! `Pending -> Enriched -> Lifted -> Merged -> Rebuilt`, or to `Failed` on
//! the first pass-level error. Enrich and Lift run per floor on the rayon
//! pool; Merge and Rebuild run once for the whole batch.
//!
//! Floor-level errors (unknown floor, unreadable skeletons, lift failures)
//! drop that floor and are listed in the report. Cancellation is only
//! honoured before Merge starts.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use floornet_core::{FloorKey, SkeletonFeature};
use floornet_topology::BuildOptions;
use rayon::prelude::*;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::enrich::{enrich, EnrichOutcome};
use crate::error::{EnrichError, FloorError, PassError};
use crate::handoff::SkeletonSource;
use crate::lift::lift_floor;
use crate::merge::{merge, DuplicatePolicy, MergeReport};
use crate::rebuild::{rebuild, RebuildReport};
use crate::registry::FloorRegistry;
use crate::store::{GraphState, NetworkStore};
use crate::workspace::{FloorPartition, PassWorkspace};

/// Walking speed used when a run does not configure one, in metres per second.
pub const DEFAULT_SPEED: f64 = 4.11;

/// Build pass state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassState {
    Pending,
    Enriched,
    Lifted,
    Merged,
    Rebuilt,
    Failed,
}

impl PassState {
    pub fn is_terminal(self) -> bool {
        matches!(self, PassState::Rebuilt | PassState::Failed)
    }

    /// The only forward step from this state, if any.
    pub fn next(self) -> Option<PassState> {
        match self {
            PassState::Pending => Some(PassState::Enriched),
            PassState::Enriched => Some(PassState::Lifted),
            PassState::Lifted => Some(PassState::Merged),
            PassState::Merged => Some(PassState::Rebuilt),
            PassState::Rebuilt | PassState::Failed => None,
        }
    }

    pub fn can_transition_to(self, to: PassState) -> bool {
        if self.is_terminal() {
            return false;
        }
        to == PassState::Failed || self.next() == Some(to)
    }
}

impl fmt::Display for PassState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PassState::Pending => "pending",
            PassState::Enriched => "enriched",
            PassState::Lifted => "lifted",
            PassState::Merged => "merged",
            PassState::Rebuilt => "rebuilt",
            PassState::Failed => "failed",
        })
    }
}

/// Shared cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Options for one build pass.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildPassOptions {
    pub speed: f64,
    pub floors: Vec<FloorKey>,
    pub duplicate_policy: DuplicatePolicy,
    pub build: BuildOptions,
}

impl BuildPassOptions {
    pub fn new(floors: Vec<FloorKey>) -> Self {
        Self {
            speed: DEFAULT_SPEED,
            floors,
            duplicate_policy: DuplicatePolicy::default(),
            build: BuildOptions::default(),
        }
    }
}

/// What happened to one floor.
#[derive(Debug)]
pub struct FloorOutcome {
    pub floor: FloorKey,
    pub partition: u32,
    pub loaded: usize,
    pub enriched: usize,
    /// Features dropped by enrichment.
    pub rejected: Vec<EnrichError>,
    pub lifted: usize,
    pub error: Option<FloorError>,
}

impl FloorOutcome {
    fn new(floor: FloorKey, partition: u32) -> Self {
        Self {
            floor,
            partition,
            loaded: 0,
            enriched: 0,
            rejected: Vec::new(),
            lifted: 0,
            error: None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Feature counts over the whole pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PassCounts {
    pub loaded: usize,
    pub enriched: usize,
    pub rejected: usize,
    pub lifted: usize,
    pub merged: usize,
}

/// Result of running a build pass.
#[derive(Debug)]
pub struct PassReport {
    pub pass_id: Uuid,
    pub state: PassState,
    /// State the pass was trying to reach when it failed.
    pub failed_stage: Option<PassState>,
    pub floors: Vec<FloorOutcome>,
    pub counts: PassCounts,
    pub merge: Option<MergeReport>,
    pub rebuild: Option<RebuildReport>,
    pub error: Option<PassError>,
    pub graph_state: GraphState,
}

impl PassReport {
    pub fn is_success(&self) -> bool {
        self.state == PassState::Rebuilt
    }

    pub fn failed_floors(&self) -> impl Iterator<Item = &FloorOutcome> {
        self.floors.iter().filter(|f| !f.is_ok())
    }
}

/// One end-to-end run over a set of floors.
#[derive(Debug)]
pub struct BuildPass {
    id: Uuid,
    state: PassState,
    options: BuildPassOptions,
    cancel: CancelToken,
}

impl BuildPass {
    pub fn new(options: BuildPassOptions) -> Self {
        Self {
            id: Uuid::new_v4(),
            state: PassState::Pending,
            options,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> PassState {
        self.state
    }

    pub fn options(&self) -> &BuildPassOptions {
        &self.options
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Move to `to`, rejecting anything but the next forward step or `Failed`.
    pub fn advance(&mut self, to: PassState) -> Result<(), PassError> {
        if !self.state.can_transition_to(to) {
            return Err(PassError::IllegalTransition {
                from: self.state,
                to,
            });
        }
        tracing::debug!(pass = %self.id, from = %self.state, to = %to, "Build pass transition");
        self.state = to;
        Ok(())
    }

    /// Run the pass to a terminal state.
    ///
    /// A pass runs once; running it again reports an illegal transition.
    pub fn run(
        &mut self,
        registry: &FloorRegistry,
        skeletons: &dyn SkeletonSource,
        store: &mut dyn NetworkStore,
    ) -> PassReport {
        let start = Instant::now();
        let mut report = PassReport {
            pass_id: self.id,
            state: self.state,
            failed_stage: None,
            floors: Vec::new(),
            counts: PassCounts::default(),
            merge: None,
            rebuild: None,
            error: None,
            graph_state: store.graph_state(),
        };

        tracing::info!(
            pass = %self.id,
            floors = self.options.floors.len(),
            speed = self.options.speed,
            "Build pass started"
        );

        if let Err(err) = self.execute(registry, skeletons, store, &mut report) {
            let attempted = self.state.next();
            if self.advance(PassState::Failed).is_ok() {
                report.failed_stage = attempted;
            }
            tracing::error!(
                pass = %self.id,
                stage = ?report.failed_stage,
                processed = report.counts.lifted,
                error = %err,
                "Build pass failed"
            );
            report.error = Some(err);
        }

        report.state = self.state;
        report.graph_state = store.graph_state();
        tracing::info!(
            pass = %self.id,
            state = %report.state,
            merged = report.counts.merged,
            failed_floors = report.failed_floors().count(),
            total_time_ms = start.elapsed().as_millis() as u64,
            "Build pass finished"
        );
        report
    }

    fn execute(
        &mut self,
        registry: &FloorRegistry,
        skeletons: &dyn SkeletonSource,
        store: &mut dyn NetworkStore,
        report: &mut PassReport,
    ) -> Result<(), PassError> {
        if self.state != PassState::Pending {
            return Err(PassError::IllegalTransition {
                from: self.state,
                to: PassState::Enriched,
            });
        }
        if self.options.floors.is_empty() {
            return Err(PassError::NoFloors);
        }
        let mut listed = FxHashSet::default();
        if let Some(floor) = self.options.floors.iter().find(|f| !listed.insert(*f)) {
            return Err(PassError::RepeatedFloor(floor.clone()));
        }
        let speed = self.options.speed;
        if !(speed.is_finite() && speed > 0.0) {
            return Err(EnrichError::InvalidSpeed(speed).into());
        }

        // Enrich
        let enriched: Vec<(FloorOutcome, Option<EnrichOutcome>)> = self
            .options
            .floors
            .par_iter()
            .enumerate()
            .map(|(index, floor)| enrich_floor(registry, skeletons, floor, index as u32, speed))
            .collect();

        let mut pending: Vec<(FloorOutcome, Vec<SkeletonFeature>)> = Vec::with_capacity(enriched.len());
        for (outcome, features) in enriched {
            report.counts.loaded += outcome.loaded;
            report.counts.enriched += outcome.enriched;
            report.counts.rejected += outcome.rejected.len();
            match features {
                Some(out) => pending.push((outcome, out.features)),
                None => report.floors.push(outcome),
            }
        }
        self.check_cancelled()?;
        self.advance(PassState::Enriched)?;

        // Lift
        let lifted: Vec<(FloorOutcome, Option<FloorPartition>)> = pending
            .into_par_iter()
            .map(|(mut outcome, features)| {
                match lift_floor(&outcome.floor, outcome.partition, &features) {
                    Ok(partition) => {
                        outcome.lifted = partition.len();
                        (outcome, Some(partition))
                    }
                    Err(err) => {
                        tracing::warn!(floor = %outcome.floor, error = %err, "Floor failed to lift");
                        outcome.error = Some(err.into());
                        (outcome, None)
                    }
                }
            })
            .collect();

        let mut workspace = PassWorkspace::new(self.id);
        let mut usable = 0;
        for (outcome, partition) in lifted {
            report.counts.lifted += outcome.lifted;
            if let Some(partition) = partition {
                workspace.insert(partition)?;
                usable += 1;
            }
            report.floors.push(outcome);
        }
        report.floors.sort_by_key(|f| f.partition);
        if usable == 0 {
            return Err(PassError::NoUsableFloors);
        }
        self.check_cancelled()?;
        self.advance(PassState::Lifted)?;

        // Merge and Rebuild run to completion once started
        let merged = merge(workspace, store, self.options.duplicate_policy)?;
        report.counts.merged = merged.appended;
        report.merge = Some(merged);
        self.advance(PassState::Merged)?;

        report.rebuild = Some(rebuild(store, &self.options.build)?);
        self.advance(PassState::Rebuilt)?;
        Ok(())
    }

    fn check_cancelled(&self) -> Result<(), PassError> {
        if self.cancel.is_cancelled() {
            tracing::warn!(pass = %self.id, state = %self.state, "Build pass cancelled");
            return Err(PassError::Cancelled);
        }
        Ok(())
    }
}

/// Look up, load and enrich one floor. `None` means the floor failed.
fn enrich_floor(
    registry: &FloorRegistry,
    skeletons: &dyn SkeletonSource,
    floor: &FloorKey,
    partition: u32,
    speed: f64,
) -> (FloorOutcome, Option<EnrichOutcome>) {
    let mut outcome = FloorOutcome::new(floor.clone(), partition);

    let loaded = registry
        .get(floor)
        .map_err(FloorError::from)
        .and_then(|record| {
            skeletons
                .floor_features(floor)
                .map(|features| (record, features))
                .map_err(FloorError::from)
        });
    let (record, features) = match loaded {
        Ok(loaded) => loaded,
        Err(err) => {
            tracing::warn!(floor = %floor, error = %err, "Skipping floor");
            outcome.error = Some(err);
            return (outcome, None);
        }
    };
    outcome.loaded = features.len();

    match enrich(features, record, speed) {
        Ok(enriched) => {
            outcome.enriched = enriched.features.len();
            outcome.rejected = enriched.rejected.clone();
            (outcome, Some(enriched))
        }
        Err(err) => {
            outcome.error = Some(err.into());
            (outcome, None)
        }
    }
}
