// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Floor identity and elevation

use serde::{Deserialize, Serialize};
use std::fmt;

/// Explicit `(building, floor)` pair identifying one floor of one building.
///
/// Ordering is lexicographic on building then floor, which keeps floors of
/// one building together in ordered collections.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FloorKey {
    pub building: String,
    pub floor: String,
}

impl FloorKey {
    pub fn new(building: impl Into<String>, floor: impl Into<String>) -> Self {
        Self {
            building: building.into(),
            floor: floor.into(),
        }
    }

    pub fn building_id(&self) -> &str {
        &self.building
    }

    pub fn floor_id(&self) -> &str {
        &self.floor
    }
}

impl fmt::Display for FloorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.building, self.floor)
    }
}

/// One floor of one building with its elevation offset.
///
/// The offset is relative to the building's ground level, in the same
/// linear unit as the skeleton geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloorRecord {
    pub key: FloorKey,
    pub elevation_offset: f64,
}

impl FloorRecord {
    pub fn new(key: FloorKey, elevation_offset: f64) -> Self {
        Self {
            key,
            elevation_offset,
        }
    }

    pub fn building_id(&self) -> &str {
        self.key.building_id()
    }

    pub fn floor_id(&self) -> &str {
        self.key.floor_id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_joins_building_and_floor() {
        assert_eq!(FloorKey::new("338", "02").to_string(), "338/02");
    }

    #[test]
    fn keys_order_by_building_first() {
        let mut keys = vec![
            FloorKey::new("338", "02"),
            FloorKey::new("245", "03"),
            FloorKey::new("338", "01"),
        ];
        keys.sort();
        assert_eq!(keys[0], FloorKey::new("245", "03"));
        assert_eq!(keys[1], FloorKey::new("338", "01"));
        assert_eq!(keys[2], FloorKey::new("338", "02"));
    }
}
