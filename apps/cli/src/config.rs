// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Run configuration.
//!
//! Precedence, lowest first: built-in defaults, `floornet.toml`,
//! `FLOORNET_*` environment variables, command line flags.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use floornet_core::FloorKey;
use floornet_pipeline::{BuildPassOptions, DuplicatePolicy, DEFAULT_SPEED};
use floornet_topology::{BuildOptions, Connectivity};
use serde::{Deserialize, Serialize};

/// Config file looked up in the working directory when none is given.
pub const CONFIG_FILE_NAME: &str = "floornet.toml";

/// Pipeline configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Walking speed constant, in linear units per second.
    pub speed: f64,
    /// Floors to process as `building/floor`. Empty means every floor with
    /// a skeleton file.
    pub floors: Vec<String>,
    /// Network store directory.
    pub store_dir: PathBuf,
    /// Floor registry rows (JSON).
    pub registry: Option<PathBuf>,
    /// Directory of per-floor skeleton files.
    pub skeleton_dir: Option<PathBuf>,
    pub connectivity: Connectivity,
    pub snap_tolerance: f64,
    pub allow_duplicate_floors: bool,
    /// Number of worker threads for parallel floor processing.
    pub worker_threads: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            speed: DEFAULT_SPEED,
            floors: Vec::new(),
            store_dir: PathBuf::from("network"),
            registry: None,
            skeleton_dir: None,
            connectivity: Connectivity::default(),
            snap_tolerance: BuildOptions::default().snap_tolerance,
            allow_duplicate_floors: false,
            worker_threads: num_cpus::get(),
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| anyhow!("invalid {name}={value:?}: {e}"))
}

/// Parse a `building/floor` pair.
pub fn parse_floor(value: &str) -> Result<FloorKey> {
    match value.split_once('/') {
        Some((building, floor)) if !building.trim().is_empty() && !floor.trim().is_empty() => {
            Ok(FloorKey::new(building.trim(), floor.trim()))
        }
        _ => bail!("invalid floor {value:?}, expected building/floor"),
    }
}

/// Parse a connectivity policy name.
pub fn parse_connectivity(value: &str) -> Result<Connectivity> {
    match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
        "endpoint" => Ok(Connectivity::Endpoint),
        "any_vertex" => Ok(Connectivity::AnyVertex),
        other => bail!("unknown connectivity policy {other:?}, expected endpoint or any_vertex"),
    }
}

impl Config {
    /// Load from `path`, or from `floornet.toml` if present, then apply the
    /// environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(CONFIG_FILE_NAME).exists() => {
                Self::from_file(Path::new(CONFIG_FILE_NAME))?
            }
            None => {
                tracing::debug!("Config file not found, using defaults");
                Self::default()
            }
        };
        config.apply_env(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read config file {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("failed to parse {}", path.display()))
    }

    /// Apply `FLOORNET_*` overrides read through `var`.
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(v) = var("FLOORNET_SPEED") {
            self.speed = parse_var("FLOORNET_SPEED", &v)?;
        }
        if let Some(v) = var("FLOORNET_FLOORS") {
            self.floors = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Some(v) = var("FLOORNET_STORE_DIR") {
            self.store_dir = PathBuf::from(v);
        }
        if let Some(v) = var("FLOORNET_REGISTRY") {
            self.registry = Some(PathBuf::from(v));
        }
        if let Some(v) = var("FLOORNET_SKELETON_DIR") {
            self.skeleton_dir = Some(PathBuf::from(v));
        }
        if let Some(v) = var("FLOORNET_CONNECTIVITY") {
            self.connectivity = parse_connectivity(&v)?;
        }
        if let Some(v) = var("FLOORNET_SNAP_TOLERANCE") {
            self.snap_tolerance = parse_var("FLOORNET_SNAP_TOLERANCE", &v)?;
        }
        if let Some(v) = var("FLOORNET_ALLOW_DUPLICATE_FLOORS") {
            self.allow_duplicate_floors = parse_var("FLOORNET_ALLOW_DUPLICATE_FLOORS", &v)?;
        }
        if let Some(v) = var("FLOORNET_WORKER_THREADS") {
            self.worker_threads = parse_var("FLOORNET_WORKER_THREADS", &v)?;
        }
        Ok(())
    }

    pub fn floor_keys(&self) -> Result<Vec<FloorKey>> {
        self.floors.iter().map(|f| parse_floor(f)).collect()
    }

    pub fn build_options(&self) -> BuildOptions {
        BuildOptions {
            connectivity: self.connectivity,
            snap_tolerance: self.snap_tolerance,
        }
    }

    pub fn duplicate_policy(&self) -> DuplicatePolicy {
        if self.allow_duplicate_floors {
            DuplicatePolicy::Allow
        } else {
            DuplicatePolicy::Reject
        }
    }

    /// Build pass options for `floors`.
    pub fn pass_options(&self, floors: Vec<FloorKey>) -> BuildPassOptions {
        BuildPassOptions {
            speed: self.speed,
            floors,
            duplicate_policy: self.duplicate_policy(),
            build: self.build_options(),
        }
    }
}
