// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Floor registry: building → floors → elevation offset.
//!
//! Loaded once per run from a tabular source and read-only afterwards. A
//! malformed row fails the whole load; there is no partially loaded registry.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use floornet_core::{FloorKey, FloorRecord};
use serde::Deserialize;

use crate::error::RegistryError;

/// One row of the tabular registry source.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RegistryRow {
    pub building: String,
    pub floor: String,
    #[serde(default)]
    pub elevation: Option<f64>,
}

impl RegistryRow {
    pub fn new(building: impl Into<String>, floor: impl Into<String>, elevation: f64) -> Self {
        Self {
            building: building.into(),
            floor: floor.into(),
            elevation: Some(elevation),
        }
    }
}

/// External collaborator that yields registry rows.
pub trait RegistrySource {
    fn load_rows(&self) -> Result<Vec<RegistryRow>, RegistryError>;
}

impl RegistrySource for Vec<RegistryRow> {
    fn load_rows(&self) -> Result<Vec<RegistryRow>, RegistryError> {
        Ok(self.clone())
    }
}

/// Registry rows exported as a JSON array of
/// `{"building": .., "floor": .., "elevation": ..}` objects.
#[derive(Debug, Clone)]
pub struct JsonRegistrySource {
    path: PathBuf,
}

impl JsonRegistrySource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RegistrySource for JsonRegistrySource {
    fn load_rows(&self) -> Result<Vec<RegistryRow>, RegistryError> {
        let text = std::fs::read_to_string(&self.path).map_err(|source| RegistryError::Io {
            path: self.path.clone(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|e| RegistryError::Parse(e.to_string()))
    }
}

/// Immutable lookup of floor elevations.
#[derive(Debug, Clone, Default)]
pub struct FloorRegistry {
    floors: BTreeMap<FloorKey, FloorRecord>,
}

impl FloorRegistry {
    /// One-shot load from an external source.
    pub fn load(source: &dyn RegistrySource) -> Result<Self, RegistryError> {
        let rows = source.load_rows()?;
        let registry = Self::from_rows(rows)?;
        tracing::info!(
            floors = registry.len(),
            buildings = registry.buildings().len(),
            "Floor registry loaded"
        );
        Ok(registry)
    }

    /// Validate rows and build the registry. Any bad row fails the whole load.
    pub fn from_rows(rows: impl IntoIterator<Item = RegistryRow>) -> Result<Self, RegistryError> {
        let mut floors = BTreeMap::new();

        for (row_idx, row) in rows.into_iter().enumerate() {
            let building = row.building.trim();
            let floor = row.floor.trim();
            if building.is_empty() || floor.is_empty() {
                return Err(RegistryError::EmptyIdentifier { row: row_idx });
            }

            let key = FloorKey::new(building, floor);
            let elevation = match row.elevation {
                Some(e) if e.is_finite() => e,
                Some(_) => {
                    return Err(RegistryError::NonFiniteElevation { row: row_idx, key });
                }
                None => return Err(RegistryError::MissingElevation { row: row_idx, key }),
            };

            if floors.contains_key(&key) {
                return Err(RegistryError::DuplicateFloor { row: row_idx, key });
            }
            floors.insert(key.clone(), FloorRecord::new(key, elevation));
        }

        Ok(Self { floors })
    }

    pub fn lookup(&self, building_id: &str, floor_id: &str) -> Result<&FloorRecord, RegistryError> {
        self.get(&FloorKey::new(building_id, floor_id))
    }

    pub fn get(&self, key: &FloorKey) -> Result<&FloorRecord, RegistryError> {
        self.floors
            .get(key)
            .ok_or_else(|| RegistryError::NotFound(key.clone()))
    }

    /// Floors of one building, lowest elevation first.
    pub fn floors(&self, building_id: &str) -> Vec<&FloorRecord> {
        let mut floors: Vec<&FloorRecord> = self
            .floors
            .values()
            .filter(|r| r.building_id() == building_id)
            .collect();
        floors.sort_by(|a, b| {
            a.elevation_offset
                .total_cmp(&b.elevation_offset)
                .then_with(|| a.key.cmp(&b.key))
        });
        floors
    }

    /// Distinct building ids, sorted.
    pub fn buildings(&self) -> Vec<&str> {
        let mut buildings: Vec<&str> = self.floors.keys().map(|k| k.building_id()).collect();
        buildings.dedup();
        buildings
    }

    pub fn records(&self) -> impl Iterator<Item = &FloorRecord> {
        self.floors.values()
    }

    pub fn len(&self) -> usize {
        self.floors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.floors.is_empty()
    }
}
