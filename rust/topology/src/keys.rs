// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Network key types for arena-based storage.
//!
//! Keys are created by `slotmap::SlotMap` and stay valid for the lifetime of
//! the graph they came from. A rebuilt graph issues fresh keys; keys are never
//! carried across rebuilds.

use slotmap::new_key_type;

new_key_type! {
    /// Key for a junction (shared endpoint of one or more edges).
    pub struct JunctionKey;

    /// Key for an edge (one traversable piece of a source feature).
    pub struct EdgeKey;
}

/// A key that can reference any network element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NetworkKey {
    Junction(JunctionKey),
    Edge(EdgeKey),
}

impl NetworkKey {
    pub fn kind(&self) -> &'static str {
        match self {
            NetworkKey::Junction(_) => "junction",
            NetworkKey::Edge(_) => "edge",
        }
    }
}

impl From<JunctionKey> for NetworkKey {
    fn from(k: JunctionKey) -> Self {
        NetworkKey::Junction(k)
    }
}

impl From<EdgeKey> for NetworkKey {
    fn from(k: EdgeKey) -> Self {
        NetworkKey::Edge(k)
    }
}
