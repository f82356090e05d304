// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Directory-backed network store.
//!
//! Layout:
//!
//! ```text
//! <dir>/network.json   schema, ledger, graph state and source features
//! <dir>/graph-<n>.json installed graph snapshot, generation n
//! <dir>/.lock          held by the single writer
//! ```
//!
//! Every write goes to `<file>.tmp`, is synced, then renamed over the
//! target. In-memory state is only replaced after the rename succeeds, so a
//! failed commit leaves both the files and the open store unchanged.
//!
//! A new graph is written under the next generation number before
//! `network.json` is committed to point at it. Until that commit lands the
//! previous generation stays the installed graph.

use std::collections::BTreeSet;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use floornet_core::{FloorKey, Schema};
use floornet_topology::NetworkGraph;

use super::{AppendBatch, GraphState, NetworkStore, SourceDocument, SourceFeature};
use crate::error::StoreError;

const NETWORK_FILE: &str = "network.json";
const LOCK_FILE: &str = ".lock";

fn atomic_write(path: &Path, data: &[u8]) -> Result<(), StoreError> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    let mut file = File::create(&tmp).map_err(|e| StoreError::io(&tmp, e))?;
    file.write_all(data).map_err(|e| StoreError::io(&tmp, e))?;
    file.sync_all().map_err(|e| StoreError::io(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| StoreError::io(path, e))
}

fn graph_file(generation: u64) -> String {
    format!("graph-{generation}.json")
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let data = serde_json::to_vec_pretty(value).map_err(|e| StoreError::Corrupt(e.to_string()))?;
    atomic_write(path, &data)
}

/// Exclusive writer lock, released on drop.
#[derive(Debug)]
struct WriterLock {
    path: PathBuf,
}

impl WriterLock {
    fn acquire(dir: &Path) -> Result<Self, StoreError> {
        let path = dir.join(LOCK_FILE);
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| match e.kind() {
                ErrorKind::AlreadyExists => StoreError::Locked(dir.to_path_buf()),
                _ => StoreError::io(&path, e),
            })?;
        // Owner pid helps when clearing a lock left by a crashed run
        if let Err(e) = writeln!(file, "{}", std::process::id()) {
            tracing::warn!(error = %e, path = %path.display(), "Failed to record store lock owner");
        }
        Ok(Self { path })
    }
}

impl Drop for WriterLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            tracing::warn!(error = %e, path = %self.path.display(), "Failed to release store lock");
        }
    }
}

/// Network store persisted as JSON documents in one directory.
#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
    doc: SourceDocument,
    lock: Option<WriterLock>,
}

impl FileStore {
    /// Create a new, empty store. Fails if `dir` already holds one.
    pub fn create(dir: impl Into<PathBuf>, schema: Schema) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| StoreError::io(&dir, e))?;
        if dir.join(NETWORK_FILE).exists() {
            return Err(StoreError::AlreadyExists(dir));
        }

        let lock = WriterLock::acquire(&dir)?;
        let doc = SourceDocument::new(schema);
        write_json(&dir.join(NETWORK_FILE), &doc)?;
        tracing::info!(path = %dir.display(), "Created network store");

        Ok(Self {
            dir,
            doc,
            lock: Some(lock),
        })
    }

    /// Open an existing store for writing.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        let lock = WriterLock::acquire(&dir)?;
        let doc = Self::read_document(&dir)?;
        Ok(Self {
            dir,
            doc,
            lock: Some(lock),
        })
    }

    /// Open an existing store without taking the writer lock.
    ///
    /// Mutating calls fail with [`StoreError::ReadOnly`].
    pub fn open_read_only(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        let doc = Self::read_document(&dir)?;
        Ok(Self {
            dir,
            doc,
            lock: None,
        })
    }

    /// Open the store in `dir`, creating it with `schema` if absent.
    pub fn open_or_create(dir: impl Into<PathBuf>, schema: Schema) -> Result<Self, StoreError> {
        let dir = dir.into();
        if dir.join(NETWORK_FILE).exists() {
            Self::open(dir)
        } else {
            Self::create(dir, schema)
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn is_read_only(&self) -> bool {
        self.lock.is_none()
    }

    fn read_document(dir: &Path) -> Result<SourceDocument, StoreError> {
        let path = dir.join(NETWORK_FILE);
        let text = fs::read_to_string(&path).map_err(|e| StoreError::io(&path, e))?;
        let doc: SourceDocument = serde_json::from_str(&text)
            .map_err(|e| StoreError::Corrupt(format!("{}: {e}", path.display())))?;
        doc.check()?;
        tracing::debug!(
            path = %dir.display(),
            features = doc.features.len(),
            graph = %doc.graph_state,
            "Opened network store"
        );
        Ok(doc)
    }

    fn writable(&self) -> Result<(), StoreError> {
        if self.lock.is_none() {
            return Err(StoreError::ReadOnly);
        }
        Ok(())
    }

    /// Persist `doc`, then make it the current state.
    fn commit(&mut self, doc: SourceDocument) -> Result<(), StoreError> {
        write_json(&self.dir.join(NETWORK_FILE), &doc)?;
        self.doc = doc;
        Ok(())
    }
}

impl NetworkStore for FileStore {
    fn schema(&self) -> &Schema {
        &self.doc.schema
    }

    fn append(&mut self, batch: AppendBatch) -> Result<Vec<u64>, StoreError> {
        self.writable()?;
        let mut doc = self.doc.clone();
        let ids = doc.apply(batch);
        self.commit(doc)?;
        Ok(ids)
    }

    fn source(&self) -> Result<Vec<SourceFeature>, StoreError> {
        Ok(self.doc.features.clone())
    }

    fn feature_count(&self) -> usize {
        self.doc.features.len()
    }

    fn merged_floors(&self) -> &BTreeSet<FloorKey> {
        &self.doc.merged_floors
    }

    fn graph_state(&self) -> GraphState {
        self.doc.graph_state
    }

    fn install_graph(&mut self, graph: &NetworkGraph) -> Result<(), StoreError> {
        self.writable()?;
        let previous = self.doc.graph_generation;
        let generation = previous + 1;
        let path = self.dir.join(graph_file(generation));
        write_json(&path, &graph.to_snapshot())?;

        let mut doc = self.doc.clone();
        doc.graph_state = GraphState::Fresh;
        doc.graph_generation = generation;
        if let Err(e) = self.commit(doc) {
            if let Err(cleanup) = fs::remove_file(&path) {
                tracing::warn!(error = %cleanup, path = %path.display(), "Failed to remove uninstalled graph");
            }
            return Err(e);
        }

        if previous > 0 {
            let old = self.dir.join(graph_file(previous));
            if let Err(e) = fs::remove_file(&old) {
                tracing::warn!(error = %e, path = %old.display(), "Failed to remove replaced graph");
            }
        }
        tracing::debug!(path = %path.display(), generation, "Installed network graph");
        Ok(())
    }

    fn graph(&self) -> Result<Option<NetworkGraph>, StoreError> {
        if self.doc.graph_state == GraphState::Missing {
            return Ok(None);
        }
        let path = self.dir.join(graph_file(self.doc.graph_generation));
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::Corrupt(format!(
                    "graph state is {} but {} is missing",
                    self.doc.graph_state,
                    path.display()
                )))
            }
            Err(e) => return Err(StoreError::io(&path, e)),
        };
        Ok(Some(NetworkGraph::from_json(&text)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use floornet_core::{LiftedFeature, Point3, Polyline, TransientId};
    use floornet_topology::{BuildOptions, SourceEdge};
    use uuid::Uuid;

    fn temp_dir() -> PathBuf {
        std::env::temp_dir().join(format!("floornet-store-{}", Uuid::new_v4()))
    }

    fn batch(floor: &FloorKey) -> AppendBatch {
        AppendBatch {
            features: vec![LiftedFeature {
                id: TransientId::new(0, 0),
                floor: floor.clone(),
                geometry: Polyline::from_xy(&[(0.0, 0.0), (4.0, 0.0)]).at_elevation(10.0),
                name: Some("corridor".into()),
                speed: 2.0,
                minutes: 2.0 / 60.0,
                seconds: 2.0,
                length: 4.0,
                source_layer: Some("A-FLOR-PATH".into()),
            }],
            floors: vec![floor.clone()],
        }
    }

    #[test]
    fn appended_features_survive_reopen() {
        let dir = temp_dir();
        let floor = FloorKey::new("338", "02");
        {
            let mut store = FileStore::create(&dir, Schema::default()).unwrap();
            assert_eq!(store.append(batch(&floor)).unwrap(), vec![1]);
        }

        let store = FileStore::open(&dir).unwrap();
        assert_eq!(store.feature_count(), 1);
        assert!(store.merged_floors().contains(&floor));
        let source = store.source().unwrap();
        assert_eq!(source[0].points[1], [4.0, 0.0, 10.0]);
        assert_eq!(source[0].source_layer.as_deref(), Some("A-FLOR-PATH"));
        assert!(!dir.join("network.json.tmp").exists());

        drop(store);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn second_writer_is_locked_out() {
        let dir = temp_dir();
        let writer = FileStore::create(&dir, Schema::default()).unwrap();

        assert!(matches!(FileStore::open(&dir), Err(StoreError::Locked(_))));

        let mut reader = FileStore::open_read_only(&dir).unwrap();
        assert!(reader.is_read_only());
        assert!(matches!(
            reader.append(batch(&FloorKey::new("338", "01"))),
            Err(StoreError::ReadOnly)
        ));

        drop(writer);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn lock_is_released_on_drop() {
        let dir = temp_dir();
        drop(FileStore::create(&dir, Schema::default()).unwrap());
        assert!(FileStore::open(&dir).is_ok());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn lock_records_owner_pid() {
        let dir = temp_dir();
        let store = FileStore::create(&dir, Schema::default()).unwrap();
        let owner = fs::read_to_string(dir.join(".lock")).unwrap();
        assert_eq!(owner.trim(), std::process::id().to_string());
        drop(store);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn create_refuses_existing_store() {
        let dir = temp_dir();
        drop(FileStore::create(&dir, Schema::default()).unwrap());
        assert!(matches!(
            FileStore::create(&dir, Schema::default()),
            Err(StoreError::AlreadyExists(_))
        ));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn installed_graph_round_trips() {
        let dir = temp_dir();
        let pts = [Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0)];
        let graph =
            NetworkGraph::build([SourceEdge::new(1, &pts, 1.0)], &BuildOptions::default()).unwrap();
        {
            let mut store = FileStore::create(&dir, Schema::default()).unwrap();
            assert!(store.graph().unwrap().is_none());
            store.install_graph(&graph).unwrap();
        }

        let store = FileStore::open_read_only(&dir).unwrap();
        assert_eq!(store.graph_state(), GraphState::Fresh);
        let restored = store.graph().unwrap().unwrap();
        assert_eq!(restored.connectivity(), graph.connectivity());
        let _ = fs::remove_dir_all(&dir);
    }

    fn chain(links: usize) -> NetworkGraph {
        let pts: Vec<Point3<f64>> = (0..=links)
            .map(|i| Point3::new(i as f64, 0.0, 0.0))
            .collect();
        let sources: Vec<SourceEdge> = pts
            .windows(2)
            .enumerate()
            .map(|(i, w)| SourceEdge::new(i as u64 + 1, w, 1.0))
            .collect();
        NetworkGraph::build(sources, &BuildOptions::default()).unwrap()
    }

    /// A directory squatting on the temp path makes the next commit fail.
    fn block_commits(dir: &Path) -> PathBuf {
        let blocker = dir.join("network.json.tmp");
        fs::create_dir(&blocker).unwrap();
        blocker
    }

    #[test]
    fn replacing_graph_removes_old_generation() {
        let dir = temp_dir();
        let mut store = FileStore::create(&dir, Schema::default()).unwrap();
        store.install_graph(&chain(1)).unwrap();
        store.install_graph(&chain(2)).unwrap();

        assert!(!dir.join("graph-1.json").exists());
        assert!(dir.join("graph-2.json").exists());
        assert_eq!(store.graph().unwrap().unwrap().edge_count(), 2);

        drop(store);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn failed_install_keeps_previous_graph() {
        let dir = temp_dir();
        let mut store = FileStore::create(&dir, Schema::default()).unwrap();
        store.install_graph(&chain(1)).unwrap();

        let blocker = block_commits(&dir);
        assert!(matches!(
            store.install_graph(&chain(2)),
            Err(StoreError::Io { .. })
        ));

        assert_eq!(store.graph_state(), GraphState::Fresh);
        assert_eq!(store.graph().unwrap().unwrap().edge_count(), 1);
        assert!(!dir.join("graph-2.json").exists());

        let reader = FileStore::open_read_only(&dir).unwrap();
        assert_eq!(reader.graph().unwrap().unwrap().edge_count(), 1);

        fs::remove_dir(&blocker).unwrap();
        store.install_graph(&chain(2)).unwrap();
        assert_eq!(store.graph().unwrap().unwrap().edge_count(), 2);

        drop(store);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn failed_append_leaves_store_unchanged() {
        let dir = temp_dir();
        let floor = FloorKey::new("338", "02");
        let mut store = FileStore::create(&dir, Schema::default()).unwrap();
        store.install_graph(&chain(1)).unwrap();

        let blocker = block_commits(&dir);
        assert!(store.append(batch(&floor)).is_err());

        assert_eq!(store.feature_count(), 0);
        assert!(store.merged_floors().is_empty());
        assert_eq!(store.graph_state(), GraphState::Fresh);
        assert_eq!(store.graph().unwrap().unwrap().edge_count(), 1);

        let reader = FileStore::open_read_only(&dir).unwrap();
        assert_eq!(reader.feature_count(), 0);
        assert_eq!(reader.graph_state(), GraphState::Fresh);

        fs::remove_dir(&blocker).unwrap();
        assert_eq!(store.append(batch(&floor)).unwrap(), vec![1]);
        assert_eq!(store.graph_state(), GraphState::Stale);

        drop(store);
        let _ = fs::remove_dir_all(&dir);
    }
}
