//! Resampling onto a target grid
//!
//! Acquisitions arrive on their own grids: bands at different resolutions,
//! neighbouring tiles at different origins. Before masking and compositing,
//! every band is resampled onto one [`RasterGrid`]. Target cells outside the
//! source footprint, or over masked source cells, come out masked (`NaN`).

use geo::{BoundingRect, MultiPolygon};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::raster::grid::GRID_TOLERANCE;
use crate::raster::{GeoTransform, Raster, RasterElement};

/// Interpolation used when resampling a band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resampling {
    /// Source cell containing the target cell center
    #[default]
    Nearest,
    /// Blend of the four source cell centers around the target cell center.
    /// Falls back to nearest where one of them is masked or off the source.
    Bilinear,
}

/// North-up grid: transform plus dimensions
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterGrid {
    pub transform: GeoTransform,
    pub rows: usize,
    pub cols: usize,
}

impl RasterGrid {
    pub fn new(transform: GeoTransform, rows: usize, cols: usize) -> Self {
        Self {
            transform,
            rows,
            cols,
        }
    }

    /// Grid of square `resolution` cells covering the envelope of `region`.
    ///
    /// The origin is snapped to a multiple of `resolution`, so the same
    /// region and resolution always give the same grid. An empty region has
    /// no grid.
    pub fn covering(region: &MultiPolygon<f64>, resolution: f64) -> Result<Option<Self>> {
        if !(resolution.is_finite() && resolution > 0.0) {
            return Err(Error::InvalidParameter {
                name: "resolution",
                value: resolution.to_string(),
                reason: "must be a positive number of map units".to_string(),
            });
        }
        let Some(rect) = region.bounding_rect() else {
            return Ok(None);
        };

        let min_x = (rect.min().x / resolution).floor() * resolution;
        let max_y = (rect.max().y / resolution).ceil() * resolution;
        let cols = (((rect.max().x - min_x) / resolution).ceil() as usize).max(1);
        let rows = (((max_y - rect.min().y) / resolution).ceil() as usize).max(1);
        let transform = GeoTransform::new(min_x, max_y, resolution, -resolution);
        Ok(Some(Self::new(transform, rows, cols)))
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Whether `raster` already sits on this grid
    pub fn matches<T: RasterElement>(&self, raster: &Raster<T>) -> bool {
        raster.shape() == self.shape()
            && raster.transform().aligned_with(&self.transform, GRID_TOLERANCE)
    }

    /// Raster on this grid with every cell masked
    pub fn masked(&self) -> Raster<f64> {
        let mut out = Raster::filled(self.rows, self.cols, f64::NAN).with_transform(self.transform);
        out.set_nodata(Some(f64::NAN));
        out
    }
}

impl Raster<f64> {
    /// Grid of this raster
    pub fn grid(&self) -> RasterGrid {
        RasterGrid::new(*self.transform(), self.rows(), self.cols())
    }

    /// Resample onto `grid`, sampling at target cell centers
    pub fn resample_onto(&self, grid: &RasterGrid, method: Resampling) -> Raster<f64> {
        if grid.matches(self) {
            return self.clone();
        }
        let mut out = grid.masked();
        for ((row, col), v) in out.data_mut().indexed_iter_mut() {
            let (x, y) = grid.transform.pixel_to_geo(col, row);
            let (fc, fr) = self.transform().geo_to_pixel(x, y);
            *v = match method {
                Resampling::Nearest => self.nearest(fc, fr),
                Resampling::Bilinear => self
                    .bilinear(fc, fr)
                    .unwrap_or_else(|| self.nearest(fc, fr)),
            };
        }
        out
    }

    fn nearest(&self, fc: f64, fr: f64) -> f64 {
        // Also rejects NaN from a degenerate transform
        if !(fc >= 0.0 && fr >= 0.0) {
            return f64::NAN;
        }
        self.data()
            .get((fr.floor() as usize, fc.floor() as usize))
            .copied()
            .unwrap_or(f64::NAN)
    }

    fn bilinear(&self, fc: f64, fr: f64) -> Option<f64> {
        // Cell centers sit at half-integer pixel coordinates
        let (x, y) = (fc - 0.5, fr - 0.5);
        if !(x >= 0.0 && y >= 0.0) {
            return None;
        }
        let (c0, r0) = (x.floor() as usize, y.floor() as usize);
        let (dx, dy) = (x - c0 as f64, y - r0 as f64);
        let at = |r: usize, c: usize| self.data().get((r, c)).copied().filter(|v| !v.is_nan());

        let top = at(r0, c0)? * (1.0 - dx) + at(r0, c0 + 1)? * dx;
        let bottom = at(r0 + 1, c0)? * (1.0 - dx) + at(r0 + 1, c0 + 1)? * dx;
        Some(top * (1.0 - dy) + bottom * dy)
    }
}
