//! Rasterization of polygons onto a raster grid

use geo::{Area, BooleanOps, BoundingRect, Intersects, LineString, MultiPolygon, Point, Polygon};
use vegtrend_core::raster::{GeoTransform, Mask, MASK_CLEAR, MASK_SET};

/// Fraction of one cell covered by a polygon
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellWeight {
    pub row: usize,
    pub col: usize,
    /// Covered area / cell area, in (0, 1]
    pub weight: f64,
}

/// Range of rows and columns whose cells can touch the given map rectangle
fn cell_window(
    transform: &GeoTransform,
    rows: usize,
    cols: usize,
    (min_x, min_y, max_x, max_y): (f64, f64, f64, f64),
) -> Option<(usize, usize, usize, usize)> {
    let corners = [
        transform.geo_to_pixel(min_x, min_y),
        transform.geo_to_pixel(min_x, max_y),
        transform.geo_to_pixel(max_x, min_y),
        transform.geo_to_pixel(max_x, max_y),
    ];
    let min_c = corners.iter().map(|c| c.0).fold(f64::INFINITY, f64::min).floor();
    let max_c = corners.iter().map(|c| c.0).fold(f64::NEG_INFINITY, f64::max).ceil();
    let min_r = corners.iter().map(|c| c.1).fold(f64::INFINITY, f64::min).floor();
    let max_r = corners.iter().map(|c| c.1).fold(f64::NEG_INFINITY, f64::max).ceil();

    if !min_c.is_finite() || !min_r.is_finite() || max_c < 0.0 || max_r < 0.0 {
        return None;
    }
    let c0 = min_c.max(0.0) as usize;
    let r0 = min_r.max(0.0) as usize;
    let c1 = (max_c as usize).min(cols);
    let r1 = (max_r as usize).min(rows);
    (c0 < c1 && r0 < r1).then_some((r0, r1, c0, c1))
}

/// Mask of the cells whose center lies inside (or on the boundary of) `region`.
///
/// An empty region clears every cell.
pub fn region_mask(
    region: &MultiPolygon<f64>,
    transform: &GeoTransform,
    rows: usize,
    cols: usize,
) -> Mask {
    let mut mask = Mask::filled(rows, cols, MASK_CLEAR).with_transform(*transform);
    let Some(rect) = region.bounding_rect() else {
        return mask;
    };
    let bounds = (rect.min().x, rect.min().y, rect.max().x, rect.max().y);
    let Some((r0, r1, c0, c1)) = cell_window(transform, rows, cols, bounds) else {
        return mask;
    };

    for row in r0..r1 {
        for col in c0..c1 {
            let (x, y) = transform.pixel_to_geo(col, row);
            if region.intersects(&Point::new(x, y)) {
                mask.data_mut()[(row, col)] = MASK_SET;
            }
        }
    }
    mask
}

/// Cells covered by `geometry`, with the covered fraction of each cell.
///
/// Cells are visited in row-major order; cells with no overlap are omitted.
pub fn cell_coverage(
    geometry: &MultiPolygon<f64>,
    transform: &GeoTransform,
    rows: usize,
    cols: usize,
) -> Vec<CellWeight> {
    let Some(rect) = geometry.bounding_rect() else {
        return Vec::new();
    };
    let bounds = (rect.min().x, rect.min().y, rect.max().x, rect.max().y);
    let Some((r0, r1, c0, c1)) = cell_window(transform, rows, cols, bounds) else {
        return Vec::new();
    };
    let cell_area = transform.cell_area();
    if cell_area <= 0.0 {
        return Vec::new();
    }

    let mut weights = Vec::new();
    for row in r0..r1 {
        for col in c0..c1 {
            let (x0, y0, x1, y1) = transform.cell_bounds(col, row);
            let cell = MultiPolygon::new(vec![Polygon::new(
                LineString::from(vec![(x0, y0), (x1, y0), (x1, y1), (x0, y1), (x0, y0)]),
                vec![],
            )]);
            if !cell.intersects(geometry) {
                continue;
            }
            let covered = cell.intersection(geometry).unsigned_area();
            let weight = (covered / cell_area).min(1.0);
            if weight > 0.0 {
                weights.push(CellWeight { row, col, weight });
            }
        }
    }
    weights
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> MultiPolygon<f64> {
        MultiPolygon::new(vec![Polygon::new(
            LineString::from(vec![(x0, y0), (x1, y0), (x1, y1), (x0, y1), (x0, y0)]),
            vec![],
        )])
    }

    fn grid() -> GeoTransform {
        // 10x10 cells of 10 units, covering (0,0)-(100,100)
        GeoTransform::new(0.0, 100.0, 10.0, -10.0)
    }

    #[test]
    fn test_region_mask_uses_cell_centers() {
        let mask = region_mask(&rect(0.0, 80.0, 26.0, 100.0), &grid(), 10, 10);
        // rows 0-1, cols 0-2 (center of col 2 is x=25)
        assert_eq!(mask.count_set(), 6);
        assert!(mask.is_set(0, 2));
        assert!(!mask.is_set(0, 3));
        assert!(!mask.is_set(2, 0));
    }

    #[test]
    fn test_region_mask_empty_region() {
        let empty = MultiPolygon::<f64>::new(vec![]);
        assert_eq!(region_mask(&empty, &grid(), 10, 10).count_set(), 0);
    }

    #[test]
    fn test_cell_coverage_partial_cells() {
        // Covers col 0 fully and half of col 1, in row 0
        let weights = cell_coverage(&rect(0.0, 90.0, 15.0, 100.0), &grid(), 10, 10);
        assert_eq!(weights.len(), 2);
        assert_eq!((weights[0].row, weights[0].col), (0, 0));
        assert!((weights[0].weight - 1.0).abs() < 1e-9);
        assert!((weights[1].weight - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_cell_coverage_outside_grid() {
        let weights = cell_coverage(&rect(200.0, 200.0, 300.0, 300.0), &grid(), 10, 10);
        assert!(weights.is_empty());
    }

    #[test]
    fn test_cell_coverage_sums_to_area() {
        let geom = rect(12.0, 13.0, 57.0, 61.0);
        let total: f64 = cell_coverage(&geom, &grid(), 10, 10)
            .iter()
            .map(|w| w.weight * 100.0)
            .sum();
        assert!((total - 45.0 * 48.0).abs() < 1e-6);
    }
}
