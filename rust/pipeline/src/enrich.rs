// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Skeleton attribute enrichment.
//!
//! Adds any missing routing field, then derives every value from the
//! geometry, the floor record and the pass speed:
//!
//! - `elevation = floor.elevation_offset` (always overwritten)
//! - `speed = speed_override.unwrap_or(speed_constant)`
//! - `length` = planar polyline length
//! - `seconds = length / speed`, `minutes = length / (speed * 60)`
//!
//! All values are recomputed from inputs that enrichment never changes, so
//! running it twice gives the same result.

use floornet_core::{simplify_layer_name, FloorRecord, SkeletonFeature};

use crate::error::EnrichError;

/// Result of enriching one floor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnrichOutcome {
    pub features: Vec<SkeletonFeature>,
    /// Rejected features; they are dropped from `features`.
    pub rejected: Vec<EnrichError>,
}

fn check_speed(speed: f64) -> bool {
    speed.is_finite() && speed > 0.0
}

/// Ensure every routing field exists before it is computed.
fn add_missing_fields(feature: &mut SkeletonFeature) {
    let attrs = &mut feature.attributes;
    if attrs.name.is_none() {
        let name = feature
            .source_layer
            .as_deref()
            .and_then(simplify_layer_name)
            .unwrap_or_default();
        attrs.name = Some(name.to_string());
    }
    attrs.speed.get_or_insert(0.0);
    attrs.minutes.get_or_insert(0.0);
    attrs.seconds.get_or_insert(0.0);
    attrs.elevation.get_or_insert(0.0);
    attrs.length.get_or_insert(0.0);
}

/// Enrich a single feature in place.
///
/// `index` only labels errors. On error the feature is left untouched.
pub fn enrich_feature(
    feature: &mut SkeletonFeature,
    index: usize,
    floor: &FloorRecord,
    speed_constant: f64,
) -> Result<(), EnrichError> {
    if feature.floor != floor.key {
        return Err(EnrichError::FloorMismatch {
            index,
            expected: floor.key.clone(),
            found: feature.floor.clone(),
        });
    }

    let (_, length) = feature
        .geometry
        .validate()
        .map_err(|reason| EnrichError::InvalidGeometry { index, reason })?;

    let speed = match feature.speed_override {
        Some(s) if check_speed(s) => s,
        Some(s) => return Err(EnrichError::InvalidSpeedOverride { index, speed: s }),
        None => speed_constant,
    };

    add_missing_fields(feature);
    let attrs = &mut feature.attributes;
    attrs.elevation = Some(floor.elevation_offset);
    attrs.speed = Some(speed);
    attrs.length = Some(length);
    attrs.seconds = Some(length / speed);
    attrs.minutes = Some(length / (speed * 60.0));
    Ok(())
}

/// Enrich all skeleton features of one floor.
///
/// Features with invalid geometry (or belonging to another floor) are
/// rejected and logged; the rest of the floor continues. Only an invalid
/// speed constant fails the call.
pub fn enrich(
    features: Vec<SkeletonFeature>,
    floor: &FloorRecord,
    speed_constant: f64,
) -> Result<EnrichOutcome, EnrichError> {
    if !check_speed(speed_constant) {
        return Err(EnrichError::InvalidSpeed(speed_constant));
    }

    let mut outcome = EnrichOutcome {
        features: Vec::with_capacity(features.len()),
        rejected: Vec::new(),
    };

    for (index, mut feature) in features.into_iter().enumerate() {
        match enrich_feature(&mut feature, index, floor, speed_constant) {
            Ok(()) => outcome.features.push(feature),
            Err(err) => {
                tracing::warn!(floor = %floor.key, error = %err, "Skipping skeleton feature");
                outcome.rejected.push(err);
            }
        }
    }

    tracing::debug!(
        floor = %floor.key,
        enriched = outcome.features.len(),
        rejected = outcome.rejected.len(),
        "Floor enriched"
    );
    Ok(outcome)
}
