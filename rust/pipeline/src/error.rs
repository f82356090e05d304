// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the build pipeline.
//!
//! Each stage has its own error type. Feature-level errors ([`EnrichError`])
//! are collected and the floor continues; floor-level errors
//! ([`RegistryError::NotFound`], [`LiftError`], [`HandoffError`]) fail one
//! floor; pass-level errors ([`MergeError`], [`RebuildError`]) fail the pass.

use std::path::PathBuf;

use floornet_core::{Field, FloorKey, GeometryError, SchemaViolation, TransientId};
use thiserror::Error;

use crate::pass::PassState;

/// Floor registry load and lookup errors.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("floor {0} is not in the registry")]
    NotFound(FloorKey),

    #[error("cannot read registry source {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot parse registry source: {0}")]
    Parse(String),

    #[error("registry row {row}: empty building or floor identifier")]
    EmptyIdentifier { row: usize },

    #[error("registry row {row}: floor {key} has no elevation")]
    MissingElevation { row: usize, key: FloorKey },

    #[error("registry row {row}: floor {key} has non-finite elevation")]
    NonFiniteElevation { row: usize, key: FloorKey },

    #[error("registry row {row}: floor {key} is listed more than once")]
    DuplicateFloor { row: usize, key: FloorKey },
}

/// Skeleton hand-off file errors.
#[derive(Debug, Error)]
pub enum HandoffError {
    #[error("cannot read skeleton file {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot parse skeleton file {path:?}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("skeleton file {path:?}, feature {feature}, vertex {vertex}: expected 2 or 3 coordinates, got {len}")]
    Coordinate {
        path: PathBuf,
        feature: usize,
        vertex: usize,
        len: usize,
    },

    #[error("floor {0} has skeleton files {1:?} and {2:?}")]
    DuplicateFloor(FloorKey, PathBuf, PathBuf),

    #[error("no skeleton file for floor {0}")]
    MissingFloor(FloorKey),
}

/// Enrichment errors. Per-feature variants are collected, not propagated.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EnrichError {
    #[error("feature {index}: invalid geometry: {reason}")]
    InvalidGeometry {
        index: usize,
        #[source]
        reason: GeometryError,
    },

    #[error("feature {index}: belongs to floor {found}, expected {expected}")]
    FloorMismatch {
        index: usize,
        expected: FloorKey,
        found: FloorKey,
    },

    #[error("feature {index}: speed override {speed} is not finite and positive")]
    InvalidSpeedOverride { index: usize, speed: f64 },

    #[error("speed constant {0} is not finite and positive")]
    InvalidSpeed(f64),
}

/// Lift errors: the feature was not (correctly) enriched upstream.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LiftError {
    #[error("feature {index} on {floor}: missing {field} attribute, was it enriched?")]
    MissingAttribute {
        index: usize,
        floor: FloorKey,
        field: &'static str,
    },

    #[error("feature {index} on {floor}: elevation {elevation} is not finite")]
    InvalidElevation {
        index: usize,
        floor: FloorKey,
        elevation: f64,
    },

    #[error("feature {index} on {floor}: geometry is not a single polyline")]
    NotSinglePolyline { index: usize, floor: FloorKey },

    #[error("feature {index} on {floor}: input vertices mix Z values")]
    NonPlanar { index: usize, floor: FloorKey },
}

/// Error that fails one floor of a build pass. The other floors continue.
#[derive(Debug, Error)]
pub enum FloorError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Handoff(#[from] HandoffError),

    #[error(transparent)]
    Enrich(#[from] EnrichError),

    #[error(transparent)]
    Lift(#[from] LiftError),
}

/// Pass workspace join errors.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum WorkspaceError {
    #[error("partition {0} is already in the workspace")]
    PartitionTaken(u32),

    #[error("floor {0} is already in the workspace")]
    FloorTaken(FloorKey),

    #[error("feature {id} does not belong to partition {partition}")]
    ForeignId { partition: u32, id: TransientId },
}

/// Network store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("store data is corrupt: {0}")]
    Corrupt(String),

    #[error("store at {0:?} already exists")]
    AlreadyExists(PathBuf),

    #[error("store at {0:?} is locked by another writer")]
    Locked(PathBuf),

    #[error("store was opened read-only")]
    ReadOnly,

    #[error("stored graph is unreadable: {0}")]
    Graph(#[from] floornet_topology::Error),
}

impl StoreError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Merge errors. Every variant leaves the store unchanged.
#[derive(Debug, Error)]
pub enum MergeError {
    #[error("schema mismatch on feature {id} ({floor}): {violation}")]
    SchemaMismatch {
        id: TransientId,
        floor: FloorKey,
        violation: SchemaViolation,
    },

    #[error("floor {0} was already merged into the network source")]
    DuplicateFloor(FloorKey),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl MergeError {
    /// Fields the store requires but the offending feature lacks.
    pub fn missing_fields(&self) -> &[Field] {
        match self {
            MergeError::SchemaMismatch { violation, .. } => &violation.missing,
            _ => &[],
        }
    }
}

/// Rebuild errors. The previously installed graph is left untouched.
#[derive(Debug, Error)]
pub enum RebuildError {
    #[error("topology inconsistency: {0}")]
    Topology(#[from] floornet_topology::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Build pass errors.
#[derive(Debug, Error)]
pub enum PassError {
    #[error("build pass has no floors to process")]
    NoFloors,

    #[error("floor {0} is listed more than once")]
    RepeatedFloor(FloorKey),

    #[error("no floor produced lifted features")]
    NoUsableFloors,

    #[error("build pass cancelled before merge")]
    Cancelled,

    #[error("illegal build pass transition {from} -> {to}")]
    IllegalTransition { from: PassState, to: PassState },

    #[error(transparent)]
    Enrich(#[from] EnrichError),

    #[error(transparent)]
    Workspace(#[from] WorkspaceError),

    #[error(transparent)]
    Merge(#[from] MergeError),

    #[error(transparent)]
    Rebuild(#[from] RebuildError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = RegistryError::NotFound(FloorKey::new("338", "03"));
        assert_eq!(err.to_string(), "floor 338/03 is not in the registry");

        let err = EnrichError::InvalidGeometry {
            index: 4,
            reason: GeometryError::ZeroLength,
        };
        assert_eq!(err.to_string(), "feature 4: invalid geometry: polyline has zero length");
    }

    #[test]
    fn missing_fields_only_for_schema_mismatch() {
        let err = MergeError::SchemaMismatch {
            id: TransientId::new(0, 1),
            floor: FloorKey::new("338", "01"),
            violation: SchemaViolation {
                missing: vec![Field::Name],
                unexpected: vec![],
            },
        };
        assert_eq!(err.missing_fields(), &[Field::Name]);
        assert!(MergeError::DuplicateFloor(FloorKey::new("1", "1"))
            .missing_fields()
            .is_empty());
    }
}
