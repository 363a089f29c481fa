//! Annual low-vegetation baselines

use std::collections::BTreeMap;
use std::ops::RangeInclusive;

use geo::MultiPolygon;
use vegtrend_core::imagery::SpectralImage;
use vegtrend_core::raster::{Mask, Raster};
use vegtrend_core::time::{ymd, DateWindow};
use vegtrend_core::{Error, Result};

use crate::imagery::{image_ndvi, CloudMaskReport, CloudMaskedCompositor, ImagerySource};
use crate::maybe_rayon::*;

/// Where in each year the reference window sits, and what counts as low
/// vegetation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BaselineParams {
    pub start_month: u32,
    pub start_day: u32,
    /// Window length in calendar months
    pub months: u32,
    /// Pixels with NDVI at or below this value are flagged
    pub low_ndvi_threshold: f64,
}

impl Default for BaselineParams {
    fn default() -> Self {
        Self {
            start_month: 6,
            start_day: 1,
            months: 2,
            low_ndvi_threshold: 0.6,
        }
    }
}

impl BaselineParams {
    /// Reference window within `year`
    pub fn window(&self, year: i32) -> Result<DateWindow> {
        DateWindow::months_from(ymd(year, self.start_month, self.start_day)?, self.months)
    }
}

/// Reference composite of one year and its low-vegetation mask
#[derive(Debug, Clone)]
pub struct AnnualBaseline {
    pub year: i32,
    pub window: DateWindow,
    /// Acquisitions that survived filtering
    pub image_count: usize,
    /// Outcome of the cloud-probability join
    pub report: CloudMaskReport,
    /// Mean of the filtered acquisitions; `None` when there were none
    pub composite: Option<SpectralImage>,
    pub ndvi: Option<Raster<f64>>,
    /// NDVI restricted to the flagged pixels
    pub low_ndvi: Option<Raster<f64>>,
    /// Set where NDVI <= threshold; unknown where NDVI is missing
    pub low_ndvi_mask: Option<Mask>,
}

impl AnnualBaseline {
    /// Number of pixels flagged as low vegetation
    pub fn flagged_count(&self) -> usize {
        self.low_ndvi_mask.as_ref().map_or(0, Mask::count_set)
    }
}

/// Build the baseline of `year`.
///
/// Only imagery inside the year's reference window is read, so the result
/// does not depend on any other year.
pub fn annual_baseline(
    source: &dyn ImagerySource,
    compositor: &CloudMaskedCompositor,
    region: &MultiPolygon<f64>,
    year: i32,
    params: &BaselineParams,
) -> Result<AnnualBaseline> {
    let window = params.window(year)?;
    let (images, report) = compositor.filter_with_report(source, region, &window)?;
    let composite = images.mean()?;

    let ndvi = composite
        .as_ref()
        .map(|c| image_ndvi(c, &compositor.bands.nir, &compositor.bands.red))
        .transpose()?;

    let threshold = params.low_ndvi_threshold;
    let mask = ndvi
        .as_ref()
        .map(|n| Mask::from_predicate(n, |v| v <= threshold));

    let low_ndvi = match (&ndvi, &mask) {
        (Some(n), Some(m)) => {
            let mut low = n.clone();
            m.apply_to(&mut low)?;
            Some(low)
        }
        _ => None,
    };

    Ok(AnnualBaseline {
        year,
        window,
        image_count: images.len(),
        report,
        composite,
        ndvi,
        low_ndvi,
        low_ndvi_mask: mask,
    })
}

/// Baselines keyed by year; lookups require an exact year match
#[derive(Debug, Clone, Default)]
pub struct AnnualBaselines {
    by_year: BTreeMap<i32, AnnualBaseline>,
}

impl AnnualBaselines {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build one baseline per year of `years`, years in parallel
    pub fn build(
        source: &dyn ImagerySource,
        compositor: &CloudMaskedCompositor,
        region: &MultiPolygon<f64>,
        years: RangeInclusive<i32>,
        params: &BaselineParams,
    ) -> Result<Self> {
        let years: Vec<i32> = years.collect();
        let built = years
            .par_iter()
            .map(|&year| annual_baseline(source, compositor, region, year, params))
            .collect::<Result<Vec<_>>>()?;
        Ok(built.into_iter().collect())
    }

    pub fn insert(&mut self, baseline: AnnualBaseline) {
        self.by_year.insert(baseline.year, baseline);
    }

    /// Baseline of exactly `year`; there is no fallback to a neighbouring year
    pub fn get(&self, year: i32) -> Result<&AnnualBaseline> {
        self.by_year.get(&year).ok_or_else(|| Error::InvalidParameter {
            name: "year",
            value: year.to_string(),
            reason: "no annual baseline for this year".to_string(),
        })
    }

    pub fn years(&self) -> impl Iterator<Item = i32> + '_ {
        self.by_year.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AnnualBaseline> {
        self.by_year.values()
    }

    pub fn len(&self) -> usize {
        self.by_year.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_year.is_empty()
    }
}

impl FromIterator<AnnualBaseline> for AnnualBaselines {
    fn from_iter<I: IntoIterator<Item = AnnualBaseline>>(iter: I) -> Self {
        let mut out = Self::new();
        for baseline in iter {
            out.insert(baseline);
        }
        out
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::imagery::{CollectionKind, InMemorySource};
    use chrono::{TimeZone, Utc};
    use geo::{LineString, Polygon};
    use vegtrend_core::raster::GeoTransform;

    pub(crate) const N: usize = 4;

    pub(crate) fn transform() -> GeoTransform {
        GeoTransform::new(0.0, 40.0, 10.0, -10.0)
    }

    pub(crate) fn extent() -> MultiPolygon<f64> {
        MultiPolygon::new(vec![Polygon::new(
            LineString::from(vec![(0.0, 0.0), (40.0, 0.0), (40.0, 40.0), (0.0, 40.0), (0.0, 0.0)]),
            vec![],
        )])
    }

    /// Add a clear-sky acquisition whose NDVI is `(nir - red) / (nir + red)`
    pub(crate) fn add_scene(
        source: &mut InMemorySource,
        id: &str,
        (year, month, day): (i32, u32, u32),
        nir: f64,
        red: f64,
    ) {
        let when = Utc.with_ymd_and_hms(year, month, day, 10, 0, 0).unwrap();
        let band = |v: f64| Raster::filled(N, N, v).with_transform(transform());
        let sr = SpectralImage::new(id, when)
            .with_band("B8", band(nir))
            .with_band("B4", band(red))
            .with_band("B8A", band(0.3))
            .with_band("B9", band(0.3));
        let cloud = SpectralImage::new(id, when)
            .with_band("probability", band(5.0));
        source.add(CollectionKind::SurfaceReflectance, sr);
        source.add(CollectionKind::CloudProbability, cloud);
    }

    #[test]
    fn test_reference_window() {
        let window = BaselineParams::default().window(2021).unwrap();
        assert_eq!(window.start(), ymd(2021, 6, 1).unwrap());
        assert_eq!(window.end(), ymd(2021, 8, 1).unwrap());
    }

    #[test]
    fn test_low_vegetation_flagged() {
        let mut source = InMemorySource::new();
        // NDVI 0.5 -> flagged
        add_scene(&mut source, "s1", (2020, 6, 15), 0.3, 0.1);
        let compositor = CloudMaskedCompositor::default();
        let b = annual_baseline(&source, &compositor, &extent(), 2020, &BaselineParams::default())
            .unwrap();
        assert_eq!(b.image_count, 1);
        assert_eq!(b.flagged_count(), N * N);
        assert_eq!(b.low_ndvi.as_ref().unwrap().valid_count(), N * N);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let mut source = InMemorySource::new();
        // NDVI exactly 0.6
        add_scene(&mut source, "s1", (2020, 6, 15), 0.5, 0.125);
        let compositor = CloudMaskedCompositor::default();
        let b = annual_baseline(&source, &compositor, &extent(), 2020, &BaselineParams::default())
            .unwrap();
        let ndvi = b.ndvi.as_ref().unwrap().get(0, 0).unwrap();
        assert_eq!(ndvi, 0.6);
        assert_eq!(b.flagged_count(), N * N);
    }

    #[test]
    fn test_outside_window_imagery_ignored() {
        let mut source = InMemorySource::new();
        add_scene(&mut source, "june", (2020, 6, 15), 0.9, 0.1);
        let compositor = CloudMaskedCompositor::default();
        let params = BaselineParams::default();
        let before = annual_baseline(&source, &compositor, &extent(), 2020, &params).unwrap();

        // Bare soil in May and in the following year's summer
        add_scene(&mut source, "may", (2020, 5, 15), 0.2, 0.2);
        add_scene(&mut source, "next", (2021, 6, 15), 0.2, 0.2);
        let after = annual_baseline(&source, &compositor, &extent(), 2020, &params).unwrap();

        assert_eq!(before.image_count, after.image_count);
        assert_eq!(
            before.low_ndvi_mask.unwrap().data(),
            after.low_ndvi_mask.unwrap().data()
        );
    }

    #[test]
    fn test_no_imagery_gives_no_mask() {
        let source = InMemorySource::new();
        let b = annual_baseline(
            &source,
            &CloudMaskedCompositor::default(),
            &extent(),
            2020,
            &BaselineParams::default(),
        )
        .unwrap();
        assert!(b.composite.is_none());
        assert!(b.low_ndvi_mask.is_none());
        assert_eq!(b.flagged_count(), 0);
    }

    #[test]
    fn test_exact_year_lookup() {
        let source = InMemorySource::new();
        let baselines = AnnualBaselines::build(
            &source,
            &CloudMaskedCompositor::default(),
            &extent(),
            2019..=2021,
            &BaselineParams::default(),
        )
        .unwrap();
        assert_eq!(baselines.years().collect::<Vec<_>>(), vec![2019, 2020, 2021]);
        assert_eq!(baselines.get(2020).unwrap().year, 2020);
        assert!(baselines.get(2022).is_err());
    }
}
