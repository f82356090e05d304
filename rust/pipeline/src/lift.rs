// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Elevation-based 3D lifting.
//!
//! Turns enriched skeleton features into lifted features whose every vertex
//! has `z == elevation`. The XY coordinates are copied unchanged.

use floornet_core::{FloorKey, LiftedFeature, SkeletonFeature, TransientId};

use crate::error::LiftError;
use crate::workspace::FloorPartition;

fn required(
    value: Option<f64>,
    index: usize,
    floor: &FloorKey,
    field: &'static str,
) -> Result<f64, LiftError> {
    value.ok_or_else(|| LiftError::MissingAttribute {
        index,
        floor: floor.clone(),
        field,
    })
}

/// Lift one enriched feature. `index` only labels errors.
pub fn lift(
    feature: &SkeletonFeature,
    index: usize,
    id: TransientId,
) -> Result<LiftedFeature, LiftError> {
    let floor = &feature.floor;
    let attrs = &feature.attributes;

    let elevation = required(attrs.elevation, index, floor, "elevation")?;
    if !elevation.is_finite() {
        return Err(LiftError::InvalidElevation {
            index,
            floor: floor.clone(),
            elevation,
        });
    }
    let speed = required(attrs.speed, index, floor, "speed")?;
    let minutes = required(attrs.minutes, index, floor, "minutes")?;
    let seconds = required(attrs.seconds, index, floor, "seconds")?;
    let length = required(attrs.length, index, floor, "length")?;

    let line = feature
        .geometry
        .as_single()
        .filter(|line| !line.is_empty())
        .ok_or_else(|| LiftError::NotSinglePolyline {
            index,
            floor: floor.clone(),
        })?;
    if line.uniform_z().is_none() {
        return Err(LiftError::NonPlanar {
            index,
            floor: floor.clone(),
        });
    }

    Ok(LiftedFeature {
        id,
        floor: floor.clone(),
        geometry: line.at_elevation(elevation),
        name: attrs.name.clone(),
        speed,
        minutes,
        seconds,
        length,
        source_layer: feature.source_layer.clone(),
    })
}

/// Lift every enriched feature of one floor into partition `index`.
///
/// The first failing feature fails the whole floor.
pub fn lift_floor(
    floor: &FloorKey,
    index: u32,
    features: &[SkeletonFeature],
) -> Result<FloorPartition, LiftError> {
    let mut partition = FloorPartition::new(index, floor.clone());
    partition.features.reserve(features.len());

    for (i, feature) in features.iter().enumerate() {
        let lifted = lift(feature, i, partition.next_id())?;
        partition.features.push(lifted);
    }

    tracing::debug!(floor = %floor, partition = index, features = partition.len(), "Floor lifted");
    Ok(partition)
}
