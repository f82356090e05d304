// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Skeleton and lifted network features

use crate::floor::FloorKey;
use crate::geometry::{Polyline, SkeletonGeometry};
use crate::schema::{Field, FieldSet};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Routing attributes of a skeleton feature.
///
/// `None` means the field does not exist on the feature yet. Enrichment adds
/// every field and fills it with a derived value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SkeletonAttributes {
    pub name: Option<String>,
    pub speed: Option<f64>,
    pub minutes: Option<f64>,
    pub seconds: Option<f64>,
    pub elevation: Option<f64>,
    pub length: Option<f64>,
}

/// A walkable centerline on one floor.
#[derive(Debug, Clone, PartialEq)]
pub struct SkeletonFeature {
    pub floor: FloorKey,
    pub geometry: SkeletonGeometry,
    /// CAD layer the centerline was exported from
    pub source_layer: Option<String>,
    /// Feature-specific walking speed, takes precedence over the pass speed
    pub speed_override: Option<f64>,
    pub attributes: SkeletonAttributes,
}

impl SkeletonFeature {
    pub fn new(floor: FloorKey, geometry: SkeletonGeometry) -> Self {
        Self {
            floor,
            geometry,
            source_layer: None,
            speed_override: None,
            attributes: SkeletonAttributes::default(),
        }
    }

    pub fn with_layer(mut self, layer: impl Into<String>) -> Self {
        self.source_layer = Some(layer.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.attributes.name = Some(name.into());
        self
    }

    pub fn with_speed_override(mut self, speed: f64) -> Self {
        self.speed_override = Some(speed);
        self
    }

    /// True once every routing attribute exists
    pub fn is_enriched(&self) -> bool {
        let a = &self.attributes;
        a.name.is_some()
            && a.speed.is_some()
            && a.minutes.is_some()
            && a.seconds.is_some()
            && a.elevation.is_some()
            && a.length.is_some()
    }
}

/// Identifier of a lifted feature inside one build pass workspace.
///
/// The partition is assigned per floor so parallel lift tasks never share
/// an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TransientId {
    pub partition: u32,
    pub seq: u32,
}

impl TransientId {
    pub fn new(partition: u32, seq: u32) -> Self {
        Self { partition, seq }
    }
}

impl fmt::Display for TransientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}.{}", self.partition, self.seq)
    }
}

/// 3D counterpart of an enriched skeleton feature.
///
/// The elevation lives only in the geometry's Z values.
#[derive(Debug, Clone, PartialEq)]
pub struct LiftedFeature {
    pub id: TransientId,
    pub floor: FloorKey,
    pub geometry: Polyline,
    pub name: Option<String>,
    pub speed: f64,
    pub minutes: f64,
    pub seconds: f64,
    pub length: f64,
    pub source_layer: Option<String>,
}

impl LiftedFeature {
    /// Fields populated on this feature
    pub fn fields(&self) -> FieldSet {
        let mut fields: FieldSet = [
            Field::BuildingId,
            Field::FloorId,
            Field::Speed,
            Field::Minutes,
            Field::Seconds,
            Field::Length,
        ]
        .into_iter()
        .collect();
        if self.name.is_some() {
            fields.insert(Field::Name);
        }
        if self.source_layer.is_some() {
            fields.insert(Field::SourceLayer);
        }
        fields
    }

    /// Elevation baked into the geometry
    pub fn elevation(&self) -> Option<f64> {
        self.geometry.uniform_z()
    }
}
