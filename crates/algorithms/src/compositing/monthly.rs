//! Monthly NDVI composites masked by the annual baseline

use chrono::{DateTime, NaiveDate, Utc};
use geo::MultiPolygon;
use vegtrend_core::imagery::SpectralImage;
use vegtrend_core::raster::Raster;
use vegtrend_core::time::{monthly_windows, DateWindow};
use vegtrend_core::{Error, Result};

use super::baseline::{AnnualBaseline, AnnualBaselines};
use crate::imagery::{image_ndvi, CloudMaskReport, CloudMaskedCompositor, ImagerySource};
use crate::maybe_rayon::*;

/// Mean composite and masked NDVI of one calendar month
#[derive(Debug, Clone)]
pub struct MonthlyComposite {
    pub year: i32,
    pub month: u32,
    pub window: DateWindow,
    /// Acquisitions that survived filtering
    pub image_count: usize,
    /// Outcome of the cloud-probability join
    pub report: CloudMaskReport,
    /// Per-band mean of the filtered acquisitions
    pub mean: Option<SpectralImage>,
    /// NDVI of the mean, with the year's low-vegetation pixels masked.
    /// `None` when the month has no imagery: every parcel reads missing.
    pub ndvi: Option<Raster<f64>>,
}

impl MonthlyComposite {
    /// First day of the month
    pub fn date(&self) -> NaiveDate {
        self.window.start()
    }

    pub fn time_start(&self) -> DateTime<Utc> {
        self.window.start_time()
    }

    pub fn time_end(&self) -> DateTime<Utc> {
        self.window.end_time()
    }

    /// Key of this month's zonal mean when merged onto a parcel record
    pub fn property_name(&self) -> String {
        format!("mean_ndvi_{}_{}", self.year, self.month)
    }

    /// Pixels left after masking
    pub fn valid_count(&self) -> usize {
        self.ndvi.as_ref().map_or(0, Raster::valid_count)
    }
}

/// Composite the month `window` and mask it with `baseline`.
///
/// The baseline must be the one of the window's own year. Pixels flagged
/// as low vegetation, or whose flag is unknown, are masked. Without a
/// baseline mask for the year every pixel is masked.
pub fn monthly_composite(
    source: &dyn ImagerySource,
    compositor: &CloudMaskedCompositor,
    region: &MultiPolygon<f64>,
    window: &DateWindow,
    baseline: &AnnualBaseline,
) -> Result<MonthlyComposite> {
    let year = window.year();
    if baseline.year != year {
        return Err(Error::InvalidParameter {
            name: "baseline",
            value: baseline.year.to_string(),
            reason: format!("month {window} needs the baseline of {year}"),
        });
    }

    let (images, report) = compositor.filter_with_report(source, region, window)?;
    let mean = images.mean()?;
    let ndvi = match &mean {
        Some(m) => {
            let mut ndvi = image_ndvi(m, &compositor.bands.nir, &compositor.bands.red)?;
            match &baseline.low_ndvi_mask {
                Some(mask) => mask.inverted().apply_to(&mut ndvi)?,
                None => ndvi = ndvi.masked_like(),
            }
            Some(ndvi)
        }
        None => None,
    };

    Ok(MonthlyComposite {
        year,
        month: window.month_of_year(),
        window: *window,
        image_count: images.len(),
        report,
        mean,
        ndvi,
    })
}

/// Composites for every calendar month from `first` up to (excluding)
/// `end`, in chronological order. Months are computed in parallel.
pub fn monthly_composites(
    source: &dyn ImagerySource,
    compositor: &CloudMaskedCompositor,
    region: &MultiPolygon<f64>,
    first: NaiveDate,
    end: NaiveDate,
    baselines: &AnnualBaselines,
) -> Result<Vec<MonthlyComposite>> {
    let windows = monthly_windows(first, end)?;
    windows
        .par_iter()
        .map(|window| {
            let baseline = baselines.get(window.year())?;
            monthly_composite(source, compositor, region, window, baseline)
        })
        .collect()
}
