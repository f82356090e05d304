// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Centerline polylines
//!
//! Skeletons arrive as 2D drawings exported from CAD. Exports may still carry
//! a Z coordinate per vertex (usually 0), so vertices are stored as
//! `Point3<f64>` and "planar" means every vertex shares one Z value. Lengths
//! are always measured in the XY plane: a skeleton is a floor plan path and
//! its cost must not depend on the floor elevation it is lifted to.

use crate::error::{GeometryError, Result};
use nalgebra::Point3;

/// Ordered chain of vertices
#[derive(Debug, Clone, PartialEq)]
pub struct Polyline {
    pub points: Vec<Point3<f64>>,
}

impl Polyline {
    pub fn new(points: Vec<Point3<f64>>) -> Self {
        Self { points }
    }

    /// Build a flat polyline (Z = 0) from XY pairs
    pub fn from_xy(coords: &[(f64, f64)]) -> Self {
        Self {
            points: coords
                .iter()
                .map(|&(x, y)| Point3::new(x, y, 0.0))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn start(&self) -> Option<&Point3<f64>> {
        self.points.first()
    }

    pub fn end(&self) -> Option<&Point3<f64>> {
        self.points.last()
    }

    /// Sum of segment lengths measured in the XY plane
    pub fn planar_length(&self) -> f64 {
        self.points
            .windows(2)
            .map(|w| {
                let dx = w[1].x - w[0].x;
                let dy = w[1].y - w[0].y;
                (dx * dx + dy * dy).sqrt()
            })
            .sum()
    }

    /// Index of the first vertex with a NaN or infinite coordinate
    pub fn first_non_finite(&self) -> Option<usize> {
        self.points
            .iter()
            .position(|p| !(p.x.is_finite() && p.y.is_finite() && p.z.is_finite()))
    }

    /// The shared Z value, or `None` if the polyline is empty or mixes Z values.
    ///
    /// The comparison is exact: lifted vertices are assigned one value, so
    /// any difference at all means the geometry was altered elsewhere.
    pub fn uniform_z(&self) -> Option<f64> {
        let first = self.points.first()?.z;
        if self.points.iter().all(|p| p.z == first) {
            Some(first)
        } else {
            None
        }
    }

    /// True when at least two vertices differ in XY
    pub fn has_distinct_positions(&self) -> bool {
        match self.points.first() {
            Some(first) => self
                .points
                .iter()
                .skip(1)
                .any(|p| p.x != first.x || p.y != first.y),
            None => false,
        }
    }

    /// Check that the polyline is a usable edge and return its planar length
    pub fn validate(&self) -> Result<f64> {
        if self.points.len() < 2 {
            return Err(GeometryError::TooFewVertices(self.points.len()));
        }
        if let Some(idx) = self.first_non_finite() {
            return Err(GeometryError::NonFinite(idx));
        }
        if !self.has_distinct_positions() {
            return Err(GeometryError::ZeroLength);
        }

        let length = self.planar_length();
        if length <= 0.0 {
            return Err(GeometryError::ZeroLength);
        }
        Ok(length)
    }

    /// Copy of this polyline with every vertex moved to `z`
    pub fn at_elevation(&self, z: f64) -> Polyline {
        Polyline {
            points: self
                .points
                .iter()
                .map(|p| Point3::new(p.x, p.y, z))
                .collect(),
        }
    }
}

/// Raw skeleton geometry as exported, possibly multi-part
#[derive(Debug, Clone, PartialEq)]
pub struct SkeletonGeometry {
    pub parts: Vec<Polyline>,
}

impl SkeletonGeometry {
    pub fn single(line: Polyline) -> Self {
        Self { parts: vec![line] }
    }

    pub fn multi(parts: Vec<Polyline>) -> Self {
        Self { parts }
    }

    /// The only part, if the geometry is a single polyline
    pub fn as_single(&self) -> Option<&Polyline> {
        match self.parts.as_slice() {
            [line] => Some(line),
            _ => None,
        }
    }

    /// Validate as a single connected polyline; returns the polyline and its length
    pub fn validate(&self) -> Result<(&Polyline, f64)> {
        match self.parts.as_slice() {
            [] => Err(GeometryError::Empty),
            [line] => line.validate().map(|length| (line, length)),
            parts => Err(GeometryError::MultiPart(parts.len())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn planar_length_ignores_z() {
        let line = Polyline::new(vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(3.0, 4.0, 7.0),
            Point3::new(3.0, 10.0, 7.0),
        ]);
        assert_relative_eq!(line.planar_length(), 11.0);
    }

    #[test]
    fn validate_rejects_coincident_vertices() {
        let line = Polyline::from_xy(&[(5.0, 5.0), (5.0, 5.0), (5.0, 5.0)]);
        assert_eq!(line.validate(), Err(GeometryError::ZeroLength));
    }

    #[test]
    fn validate_rejects_single_vertex() {
        let line = Polyline::from_xy(&[(1.0, 2.0)]);
        assert_eq!(line.validate(), Err(GeometryError::TooFewVertices(1)));
    }

    #[test]
    fn validate_rejects_nan() {
        let line = Polyline::from_xy(&[(0.0, 0.0), (f64::NAN, 1.0)]);
        assert_eq!(line.validate(), Err(GeometryError::NonFinite(1)));
    }

    #[test]
    fn multipart_is_not_a_single_polyline() {
        let geometry = SkeletonGeometry::multi(vec![
            Polyline::from_xy(&[(0.0, 0.0), (1.0, 0.0)]),
            Polyline::from_xy(&[(2.0, 0.0), (3.0, 0.0)]),
        ]);
        assert_eq!(geometry.validate().unwrap_err(), GeometryError::MultiPart(2));
        assert!(geometry.as_single().is_none());
    }

    #[test]
    fn uniform_z_detects_mixed_values() {
        let flat = Polyline::from_xy(&[(0.0, 0.0), (1.0, 0.0)]);
        assert_eq!(flat.uniform_z(), Some(0.0));

        let mixed = Polyline::new(vec![Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.5)]);
        assert_eq!(mixed.uniform_z(), None);
    }

    #[test]
    fn at_elevation_keeps_xy() {
        let line = Polyline::from_xy(&[(1.0, 2.0), (3.0, 4.0)]).at_elevation(10.0);
        assert_eq!(line.points[0], Point3::new(1.0, 2.0, 10.0));
        assert_eq!(line.points[1], Point3::new(3.0, 4.0, 10.0));
    }
}
