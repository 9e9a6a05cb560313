// src/geometry/boundary.rs
// =============================================================================
// The municipal boundary and the gate that tests points against it.
//
// A Boundary is a list of features; each feature is one or more polygons
// (a GeoJSON Polygon or MultiPolygon). Containment is tested against the
// union of every feature. The centerpoint comes from the first feature only,
// which is the municipality itself in the datasets we load.
//
// BoundaryGate is what the crawler holds on to. It answers one question:
// "is this (lat, lon) inside?" and returns None when it cannot tell
// (bad coordinates or an empty boundary) instead of failing.
// =============================================================================

use serde::Deserialize;
use serde_json::{json, Value};

use super::polygon::{multi_centroid, GeoPoint, Polygon, Ring};
use super::source::BoundaryError;

/// One or more features, each made of polygons.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Boundary {
    features: Vec<Vec<Polygon>>,
}

impl Boundary {
    pub fn new(features: Vec<Vec<Polygon>>) -> Self {
        let features = features.into_iter().filter(|f| !f.is_empty()).collect();
        Boundary { features }
    }

    /// A single-feature boundary built from polygons.
    pub fn from_polygons(polygons: Vec<Polygon>) -> Self {
        Boundary::new(vec![polygons])
    }

    /// Parses a GeoJSON FeatureCollection, Feature, Polygon or MultiPolygon.
    ///
    /// Features with other geometry types are ignored. A document without a
    /// single polygon is an error.
    pub fn from_geojson_str(text: &str) -> Result<Self, BoundaryError> {
        let document: GeoJsonDocument = serde_json::from_str(text)?;

        let geometries = match document {
            GeoJsonDocument::FeatureCollection { features } => {
                features.into_iter().filter_map(|f| f.geometry).collect()
            }
            GeoJsonDocument::Feature { geometry } => geometry.into_iter().collect(),
            GeoJsonDocument::Polygon { coordinates } => vec![Geometry::Polygon { coordinates }],
            GeoJsonDocument::MultiPolygon { coordinates } => {
                vec![Geometry::MultiPolygon { coordinates }]
            }
        };

        let mut features = Vec::new();
        for geometry in geometries {
            let polygons = match geometry {
                Geometry::Polygon { coordinates } => vec![polygon_from_rings(coordinates)?],
                Geometry::MultiPolygon { coordinates } => coordinates
                    .into_iter()
                    .map(polygon_from_rings)
                    .collect::<Result<Vec<_>, _>>()?,
                Geometry::Other => continue,
            };
            features.push(polygons);
        }

        let boundary = Boundary::new(features);
        if boundary.is_empty() {
            return Err(BoundaryError::Empty);
        }
        Ok(boundary)
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn feature_count(&self) -> usize {
        self.features.len()
    }

    pub fn polygon_count(&self) -> usize {
        self.features.iter().map(Vec::len).sum()
    }

    /// Representative interior point used to seed the crawl.
    pub fn centerpoint(&self) -> Option<GeoPoint> {
        self.features.first().and_then(|parts| multi_centroid(parts))
    }

    pub fn contains(&self, point: GeoPoint) -> bool {
        self.features
            .iter()
            .flatten()
            .any(|polygon| polygon.contains(point))
    }

    /// Serializes back to a GeoJSON FeatureCollection of MultiPolygons.
    pub fn to_geojson(&self) -> Value {
        let features: Vec<Value> = self
            .features
            .iter()
            .map(|parts| {
                let coordinates: Vec<Vec<&Ring>> = parts
                    .iter()
                    .map(|p| std::iter::once(p.exterior()).chain(p.holes()).collect())
                    .collect();
                json!({
                    "type": "Feature",
                    "properties": {},
                    "geometry": { "type": "MultiPolygon", "coordinates": coordinates },
                })
            })
            .collect();

        json!({ "type": "FeatureCollection", "features": features })
    }
}

/// Containment predicate over a fixed boundary, computed once per run.
#[derive(Debug, Clone)]
pub struct BoundaryGate {
    boundary: Boundary,
}

impl BoundaryGate {
    pub fn new(boundary: Boundary) -> Self {
        BoundaryGate { boundary }
    }

    /// Some(true/false) for a usable point, None when containment can't be decided.
    pub fn contains(&self, lat: f64, lon: f64) -> Option<bool> {
        let point = GeoPoint::new(lat, lon);
        if !point.is_valid() || self.boundary.is_empty() {
            return None;
        }
        Some(self.boundary.contains(point))
    }

    pub fn centerpoint(&self) -> Option<GeoPoint> {
        self.boundary.centerpoint()
    }

    pub fn boundary(&self) -> &Boundary {
        &self.boundary
    }
}

// GeoJSON shapes we understand. Positions may carry altitude, so they are
// read as Vec<f64> and trimmed to [lon, lat].
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum GeoJsonDocument {
    FeatureCollection { features: Vec<Feature> },
    Feature { geometry: Option<Geometry> },
    Polygon { coordinates: Vec<Vec<Vec<f64>>> },
    MultiPolygon { coordinates: Vec<Vec<Vec<Vec<f64>>>> },
}

#[derive(Debug, Deserialize)]
struct Feature {
    geometry: Option<Geometry>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum Geometry {
    Polygon { coordinates: Vec<Vec<Vec<f64>>> },
    MultiPolygon { coordinates: Vec<Vec<Vec<Vec<f64>>>> },
    #[serde(other)]
    Other,
}

fn polygon_from_rings(rings: Vec<Vec<Vec<f64>>>) -> Result<Polygon, BoundaryError> {
    let mut rings = rings.into_iter().map(ring_from_positions);
    let exterior = rings
        .next()
        .ok_or_else(|| BoundaryError::InvalidGeometry("polygon without rings".to_string()))??;
    let holes = rings.collect::<Result<Vec<_>, _>>()?;
    Ok(Polygon::new(exterior, holes))
}

fn ring_from_positions(positions: Vec<Vec<f64>>) -> Result<Ring, BoundaryError> {
    positions
        .into_iter()
        .map(|p| match p.as_slice() {
            [lon, lat, ..] => Ok([*lon, *lat]),
            _ => Err(BoundaryError::InvalidGeometry(format!(
                "position needs at least 2 values, got {}",
                p.len()
            ))),
        })
        .collect()
}
