// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # Floornet Core
//!
//! Shared data model for the skeleton-to-network build pipeline.
//!
//! ## Overview
//!
//! - **Floors**: [`FloorKey`] threads an explicit `(building, floor)` pair
//!   through every stage; [`FloorRecord`] adds the floor's elevation offset.
//! - **Geometry**: [`Polyline`] and [`SkeletonGeometry`] carry centerline
//!   vertices as `nalgebra` points and know how to validate and lift them.
//! - **Features**: [`SkeletonFeature`] is the raw/enriched 2D centerline,
//!   [`LiftedFeature`] is its 3D counterpart ready to merge.
//! - **Schema**: [`Schema`] describes the fields a network source accepts
//!   and which of them are mandatory.
//!
//! ## Quick Start
//!
//! ```rust
//! use floornet_core::{FloorKey, FloorRecord, Polyline, SkeletonFeature, SkeletonGeometry};
//!
//! let floor = FloorKey::new("338", "01");
//! let record = FloorRecord::new(floor.clone(), 0.0);
//! let line = Polyline::from_xy(&[(0.0, 0.0), (100.0, 0.0)]);
//! let feature = SkeletonFeature::new(floor, SkeletonGeometry::single(line));
//!
//! assert_eq!(record.elevation_offset, 0.0);
//! assert!(!feature.is_enriched());
//! ```

pub mod error;
pub mod feature;
pub mod floor;
pub mod geometry;
pub mod layer;
pub mod schema;

pub use nalgebra::Point3;

pub use error::{GeometryError, Result};
pub use feature::{LiftedFeature, SkeletonAttributes, SkeletonFeature, TransientId};
pub use floor::{FloorKey, FloorRecord};
pub use geometry::{Polyline, SkeletonGeometry};
pub use layer::simplify_layer_name;
pub use schema::{Field, FieldDef, FieldSet, Schema, SchemaViolation};
