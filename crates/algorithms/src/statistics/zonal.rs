//! Zonal statistics
//!
//! Reduces a raster to one area-weighted mean per polygon. Each cell
//! contributes its value weighted by the fraction of the cell the polygon
//! covers; masked (`NaN`) cells contribute nothing. A polygon with no valid
//! coverage yields a missing value, never an error.
//!
//! The reduction runs at a requested scale: when the scale is coarser than
//! the raster cells, the raster is first aggregated by block means.

use chrono::NaiveDate;
use geo::MultiPolygon;
use vegtrend_core::raster::Raster;
use vegtrend_core::vector::ParcelCollection;
use vegtrend_core::{Error, Result};

use crate::compositing::MonthlyComposite;
use crate::maybe_rayon::*;
use crate::vector::cell_coverage;

/// Mean NDVI of one parcel for one month
#[derive(Debug, Clone, PartialEq)]
pub struct ZonalStatistic {
    /// Position of the parcel in the reduced collection
    pub index: usize,
    pub parcel_id: String,
    pub date: NaiveDate,
    /// `None` when the parcel covers no valid pixel
    pub mean: Option<f64>,
}

/// Zonal statistics of one monthly composite over a parcel set
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyZonalStats {
    /// Transient property name, `mean_ndvi_{year}_{month}`
    pub property: String,
    pub date: NaiveDate,
    /// One entry per parcel, in parcel order
    pub stats: Vec<ZonalStatistic>,
}

impl MonthlyZonalStats {
    /// Mean of the parcel at `index`, `None` if missing or unknown
    pub fn mean_at(&self, index: usize) -> Option<f64> {
        self.stats
            .iter()
            .find(|s| s.index == index)
            .and_then(|s| s.mean)
    }
}

fn check_scale(scale: f64) -> Result<()> {
    if scale.is_finite() && scale > 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidParameter {
            name: "scale",
            value: scale.to_string(),
            reason: "must be a positive number of map units".to_string(),
        })
    }
}

/// Aggregation factor for reducing `raster` at `scale` map units
fn scale_factor(raster: &Raster<f64>, scale: f64) -> Result<usize> {
    check_scale(scale)?;
    let cell = raster.cell_size();
    if cell <= 0.0 {
        return Ok(1);
    }
    Ok(((scale / cell).round() as usize).max(1))
}

/// Aggregate `factor` x `factor` blocks into one cell by the mean of their
/// valid cells. Blocks with no valid cell are masked.
pub fn resample_mean(raster: &Raster<f64>, factor: usize) -> Raster<f64> {
    if factor <= 1 {
        return raster.clone();
    }
    let (rows, cols) = raster.shape();
    let out_rows = rows.div_ceil(factor);
    let out_cols = cols.div_ceil(factor);
    let mut out = Raster::filled(out_rows, out_cols, f64::NAN)
        .with_transform(raster.transform().coarsened(factor));
    out.set_nodata(Some(f64::NAN));

    for orow in 0..out_rows {
        for ocol in 0..out_cols {
            let mut sum = 0.0;
            let mut count = 0usize;
            for row in orow * factor..((orow + 1) * factor).min(rows) {
                for col in ocol * factor..((ocol + 1) * factor).min(cols) {
                    let v = raster.data()[(row, col)];
                    if !v.is_nan() {
                        sum += v;
                        count += 1;
                    }
                }
            }
            if count > 0 {
                out.data_mut()[(orow, ocol)] = sum / count as f64;
            }
        }
    }
    out
}

/// Area-weighted mean of `raster` over `geometry`, at native resolution
fn weighted_mean(raster: &Raster<f64>, geometry: &MultiPolygon<f64>) -> Option<f64> {
    let (rows, cols) = raster.shape();
    let mut sum = 0.0;
    let mut weight = 0.0;
    for cell in cell_coverage(geometry, raster.transform(), rows, cols) {
        let v = raster.data()[(cell.row, cell.col)];
        if v.is_nan() {
            continue;
        }
        sum += v * cell.weight;
        weight += cell.weight;
    }
    (weight > 0.0).then(|| sum / weight)
}

/// Area-weighted mean of `raster` over `geometry` at `scale` map units
pub fn zonal_mean(raster: &Raster<f64>, geometry: &MultiPolygon<f64>, scale: f64) -> Result<Option<f64>> {
    let factor = scale_factor(raster, scale)?;
    if factor > 1 {
        Ok(weighted_mean(&resample_mean(raster, factor), geometry))
    } else {
        Ok(weighted_mean(raster, geometry))
    }
}

/// Mean of `raster` over every parcel, parcels reduced in parallel.
///
/// Returns `(parcel id, mean)` in parcel order.
pub fn reduce_regions(
    raster: &Raster<f64>,
    parcels: &ParcelCollection,
    scale: f64,
) -> Result<Vec<(String, Option<f64>)>> {
    let factor = scale_factor(raster, scale)?;
    let resampled;
    let grid = if factor > 1 {
        resampled = resample_mean(raster, factor);
        &resampled
    } else {
        raster
    };

    Ok(parcels
        .as_slice()
        .par_iter()
        .map(|p| (p.id().to_string(), weighted_mean(grid, p.geometry())))
        .collect())
}

/// Reduce one monthly composite over the parcel set.
///
/// A month without imagery yields a missing mean for every parcel.
pub fn zonal_statistics(
    composite: &MonthlyComposite,
    parcels: &ParcelCollection,
    scale: f64,
) -> Result<MonthlyZonalStats> {
    let date = composite.date();
    let means = match &composite.ndvi {
        Some(ndvi) => reduce_regions(ndvi, parcels, scale)?,
        None => {
            check_scale(scale)?;
            parcels.iter().map(|p| (p.id().to_string(), None)).collect()
        }
    };

    Ok(MonthlyZonalStats {
        property: composite.property_name(),
        date,
        stats: means
            .into_iter()
            .enumerate()
            .map(|(index, (parcel_id, mean))| ZonalStatistic {
                index,
                parcel_id,
                date,
                mean,
            })
            .collect(),
    })
}
