//! Cloud-masked acquisition filtering
//!
//! Every band is first resampled onto one grid covering the region, so
//! scenes from neighbouring tiles and bands of different resolutions line
//! up. Each reflectance image is then joined to its cloud-probability
//! counterpart by acquisition id (inner join, first match wins), and pixels
//! are removed where the cloud probability reaches the threshold, where
//! either edge-validity band is masked, and outside the region of interest.
//! Images that fail the join are dropped silently.

use geo::MultiPolygon;
use vegtrend_core::imagery::{ImageCollection, SpectralImage};
use vegtrend_core::raster::{Raster, RasterGrid, Resampling};
use vegtrend_core::time::DateWindow;
use vegtrend_core::{Error, Result};

use super::source::{CollectionKind, ImagerySource};
use crate::join::equi_join_first;
use crate::vector::region_mask;

/// Names of the bands the compositor and NDVI read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BandNames {
    pub nir: String,
    pub red: String,
    /// Coarse-resolution pair used to detect invalid tile-edge pixels
    pub edge: [String; 2],
    /// Cloud probability band of the cloud-probability collection
    pub probability: String,
}

impl Default for BandNames {
    fn default() -> Self {
        Self {
            nir: "B8".to_string(),
            red: "B4".to_string(),
            edge: ["B8A".to_string(), "B9".to_string()],
            probability: "probability".to_string(),
        }
    }
}

impl BandNames {
    /// Interpolation for `band`: flag-like bands (edge pair, probability)
    /// are sampled nearest, reflectance bilinear
    pub fn resampling(&self, band: &str) -> Resampling {
        if band == self.probability || self.edge.iter().any(|e| e == band) {
            Resampling::Nearest
        } else {
            Resampling::Bilinear
        }
    }
}

/// Bookkeeping of one filtering run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CloudMaskReport {
    /// Reflectance images that found a cloud-probability counterpart
    pub matched: usize,
    /// Reflectance images dropped for lack of a counterpart
    pub unmatched: usize,
    /// Cloud-probability images ignored because their id was already taken
    pub shadowed: usize,
}

/// Filters and cloud-masks reflectance imagery for arbitrary windows
#[derive(Debug, Clone)]
pub struct CloudMaskedCompositor {
    /// Pixels with probability at or above this value are masked (0-100)
    pub max_cloud_probability: f64,
    /// Cell size of the common grid, map units
    pub resolution: f64,
    pub bands: BandNames,
}

impl Default for CloudMaskedCompositor {
    fn default() -> Self {
        Self {
            max_cloud_probability: 75.0,
            resolution: 10.0,
            bands: BandNames::default(),
        }
    }
}

impl CloudMaskedCompositor {
    pub fn new(max_cloud_probability: f64) -> Result<Self> {
        if !(0.0..=100.0).contains(&max_cloud_probability) {
            return Err(Error::InvalidParameter {
                name: "max_cloud_probability",
                value: max_cloud_probability.to_string(),
                reason: "must be within 0..=100".to_string(),
            });
        }
        Ok(Self {
            max_cloud_probability,
            ..Self::default()
        })
    }

    pub fn with_bands(mut self, bands: BandNames) -> Self {
        self.bands = bands;
        self
    }

    pub fn with_resolution(mut self, resolution: f64) -> Self {
        self.resolution = resolution;
        self
    }

    /// Common grid of every image filtered for `region`
    pub fn grid(&self, region: &MultiPolygon<f64>) -> Result<Option<RasterGrid>> {
        RasterGrid::covering(region, self.resolution)
    }

    /// Filtered collection for `region` over `window`
    pub fn filter(
        &self,
        source: &dyn ImagerySource,
        region: &MultiPolygon<f64>,
        window: &DateWindow,
    ) -> Result<ImageCollection> {
        self.filter_with_report(source, region, window)
            .map(|(images, _)| images)
    }

    /// Like [`filter`](Self::filter), also returning the join bookkeeping
    pub fn filter_with_report(
        &self,
        source: &dyn ImagerySource,
        region: &MultiPolygon<f64>,
        window: &DateWindow,
    ) -> Result<(ImageCollection, CloudMaskReport)> {
        let Some(grid) = self.grid(region)? else {
            return Ok((ImageCollection::new(), CloudMaskReport::default()));
        };
        let reflectance = source.query(CollectionKind::SurfaceReflectance, region, window)?;
        let clouds = source.query(CollectionKind::CloudProbability, region, window)?;

        let edge_masked = reflectance
            .iter()
            .map(|image| {
                let image = image.resample_onto(&grid, |band| self.bands.resampling(band));
                mask_edges(image, &self.bands.edge)
            })
            .collect::<Result<Vec<_>>>()?;

        let joined = equi_join_first(
            edge_masked,
            clouds,
            |img: &SpectralImage| img.id().to_string(),
            |img: &SpectralImage| img.id().to_string(),
        );
        let report = CloudMaskReport {
            matched: joined.pairs.len(),
            unmatched: joined.unmatched,
            shadowed: joined.shadowed,
        };

        let mut out = ImageCollection::new();
        for (image, cloud) in joined.pairs {
            let probability = cloud
                .require_band(&self.bands.probability)?
                .resample_onto(&grid, Resampling::Nearest);
            let masked = mask_clouds(image, &probability, self.max_cloud_probability)?;
            out.push(clip_to_region(masked, region));
        }
        Ok((out, report))
    }
}

/// Mask pixels where either edge-validity band is masked.
///
/// Both bands must exist; a missing band is a fault. The image must already
/// sit on one grid.
pub fn mask_edges(mut image: SpectralImage, edge_bands: &[String; 2]) -> Result<SpectralImage> {
    let first = image.require_band(&edge_bands[0])?.clone();
    let second = image.require_band(&edge_bands[1])?.clone();
    if image.grid().is_none() {
        return Err(Error::GridMismatch(format!(
            "bands of image '{}' are on different grids",
            image.id()
        )));
    }
    image.retain_where(|row, col| {
        let a = first.data()[(row, col)];
        let b = second.data()[(row, col)];
        !a.is_nan() && !b.is_nan()
    });
    Ok(image)
}

/// Mask pixels whose cloud probability is at or above `max_probability`.
///
/// A masked probability pixel masks the reflectance pixel too.
pub fn mask_clouds(
    mut image: SpectralImage,
    probability: &Raster<f64>,
    max_probability: f64,
) -> Result<SpectralImage> {
    for (_, band) in image.bands() {
        band.check_same_grid(probability)?;
    }
    image.retain_where(|row, col| probability.data()[(row, col)] < max_probability);
    Ok(image)
}

/// Mask every pixel whose center falls outside `region`
pub fn clip_to_region(mut image: SpectralImage, region: &MultiPolygon<f64>) -> SpectralImage {
    let Some(grid) = image.grid() else {
        return image;
    };
    let inside = region_mask(region, &grid.transform, grid.rows, grid.cols);
    image.retain_where(|row, col| inside.is_set(row, col));
    image
}

/// Cloud-filtered surface reflectance for `region` over `window`.
///
/// Standalone entry point for reuse outside the vegetation pipeline.
pub fn get_filtered_s2sr(
    source: &dyn ImagerySource,
    region: &MultiPolygon<f64>,
    window: &DateWindow,
    max_cloud_probability: f64,
) -> Result<ImageCollection> {
    CloudMaskedCompositor::new(max_cloud_probability)?.filter(source, region, window)
}
