//! Imagery sources
//!
//! An [`ImagerySource`] answers spatio-temporal queries against the two
//! raster collections the pipeline reads: surface reflectance and cloud
//! probability. Failures of a source (unreadable asset, bad manifest) are
//! faults and abort the run; an empty answer is just an empty collection.

use geo::{Intersects, MultiPolygon, Rect};
use vegtrend_core::imagery::{ImageCollection, SpectralImage};
use vegtrend_core::time::DateWindow;
use vegtrend_core::Result;

/// The raster collections a source serves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionKind {
    /// Multi-band surface reflectance
    SurfaceReflectance,
    /// Per-pixel cloud probability (0-100)
    CloudProbability,
}

/// A catalog of acquisitions
pub trait ImagerySource: Sync {
    /// Acquisitions of `kind` whose footprint intersects `region` and whose
    /// acquisition time falls inside `window`. Order is not significant.
    fn query(
        &self,
        kind: CollectionKind,
        region: &MultiPolygon<f64>,
        window: &DateWindow,
    ) -> Result<ImageCollection>;
}

/// Whether an image footprint touches the region
pub(crate) fn footprint_intersects(image: &SpectralImage, region: &MultiPolygon<f64>) -> bool {
    match image.bounds() {
        Some((min_x, min_y, max_x, max_y)) => {
            let footprint = Rect::new((min_x, min_y), (max_x, max_y));
            region.intersects(&footprint)
        }
        None => false,
    }
}

/// Source holding fully loaded collections in memory
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    reflectance: Vec<SpectralImage>,
    cloud_probability: Vec<SpectralImage>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, kind: CollectionKind, image: SpectralImage) {
        match kind {
            CollectionKind::SurfaceReflectance => self.reflectance.push(image),
            CollectionKind::CloudProbability => self.cloud_probability.push(image),
        }
    }
}

impl ImagerySource for InMemorySource {
    fn query(
        &self,
        kind: CollectionKind,
        region: &MultiPolygon<f64>,
        window: &DateWindow,
    ) -> Result<ImageCollection> {
        let images = match kind {
            CollectionKind::SurfaceReflectance => &self.reflectance,
            CollectionKind::CloudProbability => &self.cloud_probability,
        };
        Ok(images
            .iter()
            .filter(|img| window.contains(&img.acquired()) && footprint_intersects(img, region))
            .cloned()
            .collect())
    }
}
