// src/geometry/mod.rs
// =============================================================================
// This module knows everything about the municipal boundary.
//
// Submodules:
// - polygon: point-in-polygon and centroid math on plain coordinate rings
// - boundary: the Boundary type (parsed from GeoJSON) and the BoundaryGate
//   the crawler uses to test points
// - source: loading the boundary from a file, an open-data portal, or cache
// =============================================================================

mod boundary;
mod polygon;
mod source;

pub use boundary::{Boundary, BoundaryGate};
pub use polygon::{GeoPoint, Polygon};
pub use source::{load_boundary, save_boundary, BoundaryError};
