// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for network topology operations.

use crate::keys::{EdgeKey, JunctionKey};

/// Result type alias for topology operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Topology inconsistencies found while building or loading a graph.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Junction key not found in the graph.
    #[error("junction not found: {0:?}")]
    JunctionNotFound(JunctionKey),

    /// An edge references a junction that does not exist.
    #[error("edge {edge:?} references missing junction {junction:?}")]
    DanglingEdge { edge: EdgeKey, junction: JunctionKey },

    /// The junction → edge index disagrees with the edge table.
    #[error("adjacency index of junction {0:?} is out of sync with its edges")]
    AdjacencyMismatch(JunctionKey),

    /// A snapshot edge references a junction index outside the junction list.
    #[error("snapshot edge {edge} references junction {junction}, only {junctions} exist")]
    DanglingSnapshotEdge {
        edge: usize,
        junction: usize,
        junctions: usize,
    },

    /// Two source features carry the same source id.
    #[error("source feature {0} appears more than once")]
    DuplicateSource(u64),

    /// A source feature has fewer than two vertices.
    #[error("source feature {source_id} has {vertices} vertices, at least 2 are required")]
    DegenerateSource { source_id: u64, vertices: usize },

    /// A source feature has a NaN or infinite coordinate.
    #[error("source feature {source_id} has a non-finite coordinate at vertex {vertex}")]
    NonFiniteVertex { source_id: u64, vertex: usize },

    /// A source feature's vertices do not share one elevation.
    #[error("source feature {0} mixes elevations")]
    NonPlanarSource(u64),

    /// A source feature has a negative or non-finite cost.
    #[error("source feature {source_id} has invalid cost {cost}")]
    InvalidCost { source_id: u64, cost: f64 },

    /// Snap tolerance must be finite and positive.
    #[error("snap tolerance must be finite and positive, got {0}")]
    InvalidTolerance(f64),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}
