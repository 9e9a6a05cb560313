// src/geometry/polygon.rs
// =============================================================================
// Plain polygon math: point-in-polygon and centroids.
//
// Coordinates follow GeoJSON order inside rings: [lon, lat] (x, y).
// Public methods take (lat, lon) through GeoPoint so callers never have to
// remember which way round a ring stores them.
//
// Algorithms:
// - Containment: even-odd ray casting ("PNPOLY") per ring
// - Centroid: shoelace formula, area-weighted across rings and parts
// =============================================================================

use serde::{Deserialize, Serialize};

/// A WGS84 position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        GeoPoint { lat, lon }
    }

    /// True when both coordinates are finite and inside WGS84 ranges.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }
}

/// A closed ring of [lon, lat] positions. The closing vertex may be repeated.
pub type Ring = Vec<[f64; 2]>;

/// One polygon: an exterior ring and zero or more holes.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    exterior: Ring,
    holes: Vec<Ring>,
}

impl Polygon {
    pub fn new(exterior: Ring, holes: Vec<Ring>) -> Self {
        Polygon { exterior, holes }
    }

    /// Axis-aligned rectangle, mostly handy in tests.
    pub fn rectangle(min: GeoPoint, max: GeoPoint) -> Self {
        Polygon::new(
            vec![
                [min.lon, min.lat],
                [max.lon, min.lat],
                [max.lon, max.lat],
                [min.lon, max.lat],
                [min.lon, min.lat],
            ],
            Vec::new(),
        )
    }

    pub fn exterior(&self) -> &Ring {
        &self.exterior
    }

    pub fn holes(&self) -> &[Ring] {
        &self.holes
    }

    /// Inside the exterior ring and not inside any hole.
    pub fn contains(&self, point: GeoPoint) -> bool {
        ring_contains(&self.exterior, point.lon, point.lat)
            && !self
                .holes
                .iter()
                .any(|hole| ring_contains(hole, point.lon, point.lat))
    }

    /// Unsigned area (in squared degrees) with holes removed.
    pub fn area(&self) -> f64 {
        let holes: f64 = self.holes.iter().map(|h| ring_area(h).abs()).sum();
        (ring_area(&self.exterior).abs() - holes).max(0.0)
    }

    /// Area-weighted centroid, or None for a zero-area polygon.
    pub fn centroid(&self) -> Option<GeoPoint> {
        let mut weighted = (0.0, 0.0);
        let mut total = 0.0;

        let exterior_area = ring_area(&self.exterior).abs();
        if let Some((x, y)) = ring_centroid(&self.exterior) {
            weighted.0 += x * exterior_area;
            weighted.1 += y * exterior_area;
            total += exterior_area;
        }

        for hole in &self.holes {
            let hole_area = ring_area(hole).abs();
            if let Some((x, y)) = ring_centroid(hole) {
                weighted.0 -= x * hole_area;
                weighted.1 -= y * hole_area;
                total -= hole_area;
            }
        }

        if total <= f64::EPSILON {
            return None;
        }
        Some(GeoPoint::new(weighted.1 / total, weighted.0 / total))
    }
}

/// Centroid of several parts weighted by area, falling back to the mean of
/// all exterior vertices when every part is degenerate.
pub fn multi_centroid(parts: &[Polygon]) -> Option<GeoPoint> {
    let mut lat = 0.0;
    let mut lon = 0.0;
    let mut total = 0.0;

    for part in parts {
        let area = part.area();
        if let Some(c) = part.centroid() {
            lat += c.lat * area;
            lon += c.lon * area;
            total += area;
        }
    }

    if total > f64::EPSILON {
        return Some(GeoPoint::new(lat / total, lon / total));
    }

    let vertices: Vec<&[f64; 2]> = parts.iter().flat_map(|p| p.exterior.iter()).collect();
    if vertices.is_empty() {
        return None;
    }
    let n = vertices.len() as f64;
    let (sum_lon, sum_lat) = vertices
        .iter()
        .fold((0.0, 0.0), |(x, y), v| (x + v[0], y + v[1]));
    Some(GeoPoint::new(sum_lat / n, sum_lon / n))
}

// Even-odd rule: count how many edges a ray going right from (x, y) crosses.
fn ring_contains(ring: &[[f64; 2]], x: f64, y: f64) -> bool {
    if ring.len() < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = ring.len() - 1;
    for i in 0..ring.len() {
        let [xi, yi] = ring[i];
        let [xj, yj] = ring[j];
        if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}

// Signed shoelace area.
fn ring_area(ring: &[[f64; 2]]) -> f64 {
    if ring.len() < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..ring.len() {
        let [x0, y0] = ring[i];
        let [x1, y1] = ring[(i + 1) % ring.len()];
        sum += x0 * y1 - x1 * y0;
    }
    sum / 2.0
}

fn ring_centroid(ring: &[[f64; 2]]) -> Option<(f64, f64)> {
    let area = ring_area(ring);
    if area.abs() <= f64::EPSILON {
        return None;
    }
    let mut cx = 0.0;
    let mut cy = 0.0;
    for i in 0..ring.len() {
        let [x0, y0] = ring[i];
        let [x1, y1] = ring[(i + 1) % ring.len()];
        let cross = x0 * y1 - x1 * y0;
        cx += (x0 + x1) * cross;
        cy += (y0 + y1) * cross;
    }
    Some((cx / (6.0 * area), cy / (6.0 * area)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_square() -> Polygon {
        Polygon::rectangle(GeoPoint::new(0.0, 0.0), GeoPoint::new(1.0, 1.0))
    }

    #[test]
    fn test_point_inside_square() {
        assert!(unit_square().contains(GeoPoint::new(0.5, 0.5)));
    }

    #[test]
    fn test_point_outside_square() {
        assert!(!unit_square().contains(GeoPoint::new(2.0, 2.0)));
        assert!(!unit_square().contains(GeoPoint::new(0.5, -0.1)));
    }

    #[test]
    fn test_point_in_hole_is_outside() {
        let hole = Polygon::rectangle(GeoPoint::new(0.4, 0.4), GeoPoint::new(0.6, 0.6));
        let donut = Polygon::new(unit_square().exterior().clone(), vec![hole.exterior().clone()]);

        assert!(!donut.contains(GeoPoint::new(0.5, 0.5)));
        assert!(donut.contains(GeoPoint::new(0.1, 0.1)));
    }

    #[test]
    fn test_square_centroid_and_area() {
        let square = unit_square();
        assert!((square.area() - 1.0).abs() < 1e-12);

        let c = square.centroid().unwrap();
        assert!((c.lat - 0.5).abs() < 1e-12);
        assert!((c.lon - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_multi_centroid_weights_by_area() {
        // A 2x1 rectangle next to a 1x1 square; the big one pulls the centroid.
        let big = Polygon::rectangle(GeoPoint::new(0.0, 0.0), GeoPoint::new(1.0, 2.0));
        let small = Polygon::rectangle(GeoPoint::new(0.0, 2.0), GeoPoint::new(1.0, 3.0));

        let c = multi_centroid(&[big, small]).unwrap();
        // (1.0 * 2 + 2.5 * 1) / 3 = 1.5
        assert!((c.lon - 1.5).abs() < 1e-12);
        assert!((c.lat - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_degenerate_ring_falls_back_to_vertex_mean() {
        let line = Polygon::new(vec![[0.0, 0.0], [2.0, 2.0]], Vec::new());
        let c = multi_centroid(&[line]).unwrap();
        assert_eq!(c, GeoPoint::new(1.0, 1.0));
        assert!(multi_centroid(&[]).is_none());
    }

    #[test]
    fn test_invalid_points() {
        assert!(GeoPoint::new(43.7, -79.4).is_valid());
        assert!(!GeoPoint::new(f64::NAN, 0.0).is_valid());
        assert!(!GeoPoint::new(91.0, 0.0).is_valid());
        assert!(!GeoPoint::new(0.0, f64::INFINITY).is_valid());
    }
}
