// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Result type for geometry validation
pub type Result<T> = std::result::Result<T, GeometryError>;

/// Reasons a centerline geometry is not a usable network edge
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    #[error("geometry has no parts")]
    Empty,

    #[error("geometry is not a single connected polyline ({0} parts)")]
    MultiPart(usize),

    #[error("polyline needs at least 2 vertices, got {0}")]
    TooFewVertices(usize),

    #[error("polyline has a non-finite coordinate at vertex {0}")]
    NonFinite(usize),

    #[error("polyline has zero length")]
    ZeroLength,
}
