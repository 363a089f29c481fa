//! Dissolve: merge many polygons into one region

use geo::{BooleanOps, MultiPolygon};

/// Dissolve a set of geometries into a single multipolygon (their union).
///
/// Overlapping and touching parts merge; disjoint parts stay separate
/// members of the result. No input yields an empty multipolygon.
pub fn dissolve<'a, I>(geometries: I) -> MultiPolygon<f64>
where
    I: IntoIterator<Item = &'a MultiPolygon<f64>>,
{
    geometries
        .into_iter()
        .fold(MultiPolygon::new(Vec::new()), |acc, geom| {
            if acc.0.is_empty() {
                geom.clone()
            } else {
                acc.union(geom)
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{Area, LineString, Polygon};

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> MultiPolygon<f64> {
        MultiPolygon::new(vec![Polygon::new(
            LineString::from(vec![(x0, y0), (x1, y0), (x1, y1), (x0, y1), (x0, y0)]),
            vec![],
        )])
    }

    #[test]
    fn test_dissolve_adjacent_merges() {
        let a = rect(0.0, 0.0, 5.0, 5.0);
        let b = rect(5.0, 0.0, 10.0, 5.0);
        let region = dissolve([&a, &b]);

        assert_eq!(region.0.len(), 1);
        assert!((region.unsigned_area() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_dissolve_overlap_counts_once() {
        let a = rect(0.0, 0.0, 10.0, 10.0);
        let b = rect(5.0, 5.0, 15.0, 15.0);
        let region = dissolve([&a, &b]);
        assert!((region.unsigned_area() - 175.0).abs() < 1e-9);
    }

    #[test]
    fn test_dissolve_disjoint_keeps_parts() {
        let a = rect(0.0, 0.0, 1.0, 1.0);
        let b = rect(20.0, 20.0, 21.0, 21.0);
        assert_eq!(dissolve([&a, &b]).0.len(), 2);
    }

    #[test]
    fn test_dissolve_empty() {
        let none: Vec<&MultiPolygon<f64>> = Vec::new();
        assert!(dissolve(none).0.is_empty());
    }
}
