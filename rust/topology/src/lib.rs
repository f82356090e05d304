// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # Floornet Topology
//!
//! Connectivity graph of a pedestrian network, rebuilt in full from the
//! network source features.
//!
//! Junctions and edges live in slot maps with stable, generational keys, and
//! an upward adjacency index maps each junction to the edges that touch it.
//! A feature vertex snaps to the nearest junction within the snap tolerance
//! (3D distance), so two centerlines that end at the same position share a
//! junction and become connected. Features that only touch in plan but sit at different
//! elevations never share a junction: floors stay separate components unless
//! an explicit connector feature links them.
//!
//! ```
//! use floornet_topology::{BuildOptions, NetworkGraph, SourceEdge};
//! use nalgebra::Point3;
//!
//! let a = [Point3::new(0.0, 0.0, 0.0), Point3::new(10.0, 0.0, 0.0)];
//! let b = [Point3::new(10.0, 0.0, 0.0), Point3::new(10.0, 5.0, 0.0)];
//! let sources = [SourceEdge::new(1, &a, 0.5), SourceEdge::new(2, &b, 0.25)];
//!
//! let graph = NetworkGraph::build(sources, &BuildOptions::default()).unwrap();
//! assert_eq!(graph.junction_count(), 3);
//! assert_eq!(graph.edge_count(), 2);
//! assert_eq!(graph.component_count(), 1);
//! ```

pub mod arena;
pub mod construction;
pub mod error;
pub mod graph;
pub mod keys;
pub mod serialization;

pub use arena::{EdgeData, JunctionData, NetworkGraph};
pub use construction::{BuildOptions, Connectivity, SourceEdge};
pub use error::{Error, Result};
pub use graph::{ConnectivitySignature, GraphSummary};
pub use keys::{EdgeKey, JunctionKey, NetworkKey};
pub use serialization::GraphSnapshot;
