//! A single multi-band acquisition

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::raster::{Raster, RasterGrid, Resampling};

/// A multi-band raster acquisition.
///
/// Bands keep their native grids as read, so a scene may mix resolutions.
/// Pixel-wise work (masking, compositing) happens after
/// [`resample_onto`](Self::resample_onto) has put every band on one grid.
#[derive(Debug, Clone)]
pub struct SpectralImage {
    /// Acquisition identifier, unique within its collection
    id: String,
    /// Acquisition time
    acquired: DateTime<Utc>,
    bands: BTreeMap<String, Raster<f64>>,
}

impl SpectralImage {
    /// Create an image with no bands yet
    pub fn new(id: impl Into<String>, acquired: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            acquired,
            bands: BTreeMap::new(),
        }
    }

    /// Builder-style band insertion
    pub fn with_band(mut self, name: impl Into<String>, band: Raster<f64>) -> Self {
        self.insert_band(name, band);
        self
    }

    /// Insert or replace a band
    pub fn insert_band(&mut self, name: impl Into<String>, band: Raster<f64>) {
        self.bands.insert(name.into(), band);
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn acquired(&self) -> DateTime<Utc> {
        self.acquired
    }

    /// Band by name
    pub fn band(&self, name: &str) -> Option<&Raster<f64>> {
        self.bands.get(name)
    }

    /// Band by name; a missing band is an asset fault
    pub fn require_band(&self, name: &str) -> Result<&Raster<f64>> {
        self.bands.get(name).ok_or_else(|| Error::MissingBand {
            image: self.id.clone(),
            band: name.to_string(),
        })
    }

    pub fn bands(&self) -> impl Iterator<Item = (&str, &Raster<f64>)> {
        self.bands.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn band_count(&self) -> usize {
        self.bands.len()
    }

    /// Grid shared by all bands; `None` without bands or when they differ
    pub fn grid(&self) -> Option<RasterGrid> {
        let mut bands = self.bands.values();
        let grid = bands.next()?.grid();
        bands.all(|b| grid.matches(b)).then_some(grid)
    }

    /// Map bounds of the image footprint, the union of its bands
    pub fn bounds(&self) -> Option<(f64, f64, f64, f64)> {
        self.bands
            .values()
            .map(Raster::bounds)
            .reduce(|a, b| (a.0.min(b.0), a.1.min(b.1), a.2.max(b.2), a.3.max(b.3)))
    }

    /// Copy of the image with every band resampled onto `grid`.
    ///
    /// `method` picks the interpolation per band name.
    pub fn resample_onto<F>(&self, grid: &RasterGrid, method: F) -> SpectralImage
    where
        F: Fn(&str) -> Resampling,
    {
        SpectralImage {
            id: self.id.clone(),
            acquired: self.acquired,
            bands: self
                .bands
                .iter()
                .map(|(name, band)| (name.clone(), band.resample_onto(grid, method(name))))
                .collect(),
        }
    }

    /// Mask every band where `keep` returns false.
    ///
    /// Indices are those of the common grid; see [`grid`](Self::grid).
    pub fn retain_where<F>(&mut self, keep: F)
    where
        F: Fn(usize, usize) -> bool,
    {
        for band in self.bands.values_mut() {
            band.retain_where(&keep);
        }
    }
}
