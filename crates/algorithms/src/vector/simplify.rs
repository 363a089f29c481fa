//! Geometry simplification (Douglas-Peucker)

use geo::{LineString, MultiPolygon, Polygon, Simplify};

/// Simplify every ring of a multipolygon with Douglas-Peucker.
///
/// No vertex of the result lies further than `tolerance` from the input
/// boundary. Rings that would collapse below a valid ring (4 coordinates)
/// are kept unsimplified instead of being dropped, so a polygon never
/// disappears. A non-positive tolerance returns the input unchanged.
pub fn simplify_multipolygon(geom: &MultiPolygon<f64>, tolerance: f64) -> MultiPolygon<f64> {
    if tolerance <= 0.0 {
        return geom.clone();
    }
    MultiPolygon::new(
        geom.0
            .iter()
            .map(|p| simplify_polygon(p, tolerance))
            .collect(),
    )
}

fn simplify_polygon(polygon: &Polygon<f64>, tolerance: f64) -> Polygon<f64> {
    let exterior = simplify_ring(polygon.exterior(), tolerance);
    let interiors: Vec<LineString<f64>> = polygon
        .interiors()
        .iter()
        .map(|ring| simplify_ring(ring, tolerance))
        .collect();
    Polygon::new(exterior, interiors)
}

fn simplify_ring(ring: &LineString<f64>, tolerance: f64) -> LineString<f64> {
    let simplified = ring.simplify(&tolerance);
    if simplified.0.len() >= 4 {
        simplified
    } else {
        ring.clone()
    }
}
