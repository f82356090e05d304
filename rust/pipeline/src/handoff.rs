// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Skeleton hand-off from the CAD extraction step.
//!
//! Each floor's centerlines arrive as one JSON document naming the building
//! and floor explicitly:
//!
//! ```json
//! {
//!   "building": "338",
//!   "floor": "01",
//!   "features": [
//!     { "layer": "A-FLOR-PATH", "coordinates": [[0, 0], [100, 0]] },
//!     { "name": "ramp", "speed": 0.9, "parts": [[[0, 0, 0], [5, 5, 0]]] }
//!   ]
//! }
//! ```
//!
//! Vertices are `[x, y]` or `[x, y, z]`. A feature gives either
//! `coordinates` (one polyline) or `parts` (multi-part, rejected later by
//! enrichment).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use floornet_core::{FloorKey, Point3, Polyline, SkeletonFeature, SkeletonGeometry};
use serde::Deserialize;

use crate::error::HandoffError;

#[derive(Debug, Deserialize)]
struct SkeletonDocument {
    building: String,
    floor: String,
    #[serde(default)]
    features: Vec<FeatureDocument>,
}

#[derive(Debug, Deserialize)]
struct FeatureDocument {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    speed: Option<f64>,
    #[serde(default)]
    layer: Option<String>,
    #[serde(default)]
    coordinates: Option<Vec<Vec<f64>>>,
    #[serde(default)]
    parts: Option<Vec<Vec<Vec<f64>>>>,
}

/// All skeleton features of one floor.
#[derive(Debug, Clone, PartialEq)]
pub struct FloorSkeletons {
    pub floor: FloorKey,
    pub features: Vec<SkeletonFeature>,
}

/// Supplies raw skeleton features per floor.
pub trait SkeletonSource: Sync {
    fn floor_features(&self, floor: &FloorKey) -> Result<Vec<SkeletonFeature>, HandoffError>;
}

impl SkeletonSource for BTreeMap<FloorKey, Vec<SkeletonFeature>> {
    fn floor_features(&self, floor: &FloorKey) -> Result<Vec<SkeletonFeature>, HandoffError> {
        self.get(floor)
            .cloned()
            .ok_or_else(|| HandoffError::MissingFloor(floor.clone()))
    }
}

fn to_polyline(
    path: &Path,
    feature: usize,
    coords: &[Vec<f64>],
) -> Result<Polyline, HandoffError> {
    coords
        .iter()
        .enumerate()
        .map(|(vertex, c)| match c.as_slice() {
            [x, y] => Ok(Point3::new(*x, *y, 0.0)),
            [x, y, z] => Ok(Point3::new(*x, *y, *z)),
            _ => Err(HandoffError::Coordinate {
                path: path.to_path_buf(),
                feature,
                vertex,
                len: c.len(),
            }),
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Polyline::new)
}

/// Parse one hand-off document. `path` is only used in error messages.
pub fn parse_skeletons(path: &Path, text: &str) -> Result<FloorSkeletons, HandoffError> {
    let doc: SkeletonDocument = serde_json::from_str(text).map_err(|e| HandoffError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    let floor = FloorKey::new(doc.building.trim(), doc.floor.trim());

    let mut features = Vec::with_capacity(doc.features.len());
    for (idx, fd) in doc.features.into_iter().enumerate() {
        let geometry = match (fd.coordinates, fd.parts) {
            (Some(coords), None) => SkeletonGeometry::single(to_polyline(path, idx, &coords)?),
            (None, Some(parts)) => SkeletonGeometry::multi(
                parts
                    .iter()
                    .map(|part| to_polyline(path, idx, part))
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            (None, None) => SkeletonGeometry::multi(Vec::new()),
            (Some(_), Some(_)) => {
                return Err(HandoffError::Parse {
                    path: path.to_path_buf(),
                    message: format!("feature {idx} has both coordinates and parts"),
                })
            }
        };

        let mut feature = SkeletonFeature::new(floor.clone(), geometry);
        feature.source_layer = fd.layer;
        feature.speed_override = fd.speed;
        feature.attributes.name = fd.name;
        features.push(feature);
    }

    Ok(FloorSkeletons { floor, features })
}

/// Read one hand-off file.
pub fn read_skeleton_file(path: &Path) -> Result<FloorSkeletons, HandoffError> {
    let text = std::fs::read_to_string(path).map_err(|source| HandoffError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_skeletons(path, &text)
}

/// A directory of hand-off files, indexed by the floor each file declares.
#[derive(Debug, Clone)]
pub struct HandoffDirectory {
    root: PathBuf,
    files: BTreeMap<FloorKey, PathBuf>,
}

impl HandoffDirectory {
    /// Scan `root` for `*.json` hand-off files.
    ///
    /// Every file is parsed once to learn its floor; two files declaring the
    /// same floor is an error.
    pub fn scan(root: impl Into<PathBuf>) -> Result<Self, HandoffError> {
        let root = root.into();
        let entries = std::fs::read_dir(&root).map_err(|source| HandoffError::Io {
            path: root.clone(),
            source,
        })?;

        let mut paths: Vec<PathBuf> = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| HandoffError::Io {
                path: root.clone(),
                source,
            })?;
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json")) {
                paths.push(path);
            }
        }
        paths.sort();

        let mut files: BTreeMap<FloorKey, PathBuf> = BTreeMap::new();
        for path in paths {
            let skeletons = read_skeleton_file(&path)?;
            if let Some(previous) = files.get(&skeletons.floor) {
                return Err(HandoffError::DuplicateFloor(
                    skeletons.floor,
                    previous.clone(),
                    path,
                ));
            }
            tracing::debug!(
                floor = %skeletons.floor,
                features = skeletons.features.len(),
                path = %path.display(),
                "Found skeleton file"
            );
            files.insert(skeletons.floor, path);
        }

        Ok(Self { root, files })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Floors with a hand-off file, sorted.
    pub fn floors(&self) -> impl Iterator<Item = &FloorKey> {
        self.files.keys()
    }
}

impl SkeletonSource for HandoffDirectory {
    fn floor_features(&self, floor: &FloorKey) -> Result<Vec<SkeletonFeature>, HandoffError> {
        let path = self
            .files
            .get(floor)
            .ok_or_else(|| HandoffError::MissingFloor(floor.clone()))?;
        Ok(read_skeleton_file(path)?.features)
    }
}
