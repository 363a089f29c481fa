//! Collections of acquisitions and their mean composite

use std::collections::BTreeMap;

use crate::error::Result;
use crate::imagery::SpectralImage;
use crate::raster::Raster;
use crate::time::DateWindow;

/// An unordered set of acquisitions
#[derive(Debug, Clone, Default)]
pub struct ImageCollection {
    images: Vec<SpectralImage>,
}

impl ImageCollection {
    pub fn new() -> Self {
        Self { images: Vec::new() }
    }

    pub fn push(&mut self, image: SpectralImage) {
        self.images.push(image);
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SpectralImage> {
        self.images.iter()
    }

    /// Keep the images matching `predicate`
    pub fn filter<P>(self, predicate: P) -> Self
    where
        P: FnMut(&SpectralImage) -> bool,
    {
        Self {
            images: self.images.into_iter().filter(predicate).collect(),
        }
    }

    /// Keep the images acquired inside `window`
    pub fn filter_date(self, window: &DateWindow) -> Self {
        self.filter(|img| window.contains(&img.acquired()))
    }

    /// Per-band, per-pixel mean over the collection.
    ///
    /// Masked pixels do not contribute; a pixel masked in every image stays
    /// masked. A band contributes only from the images that carry it. An
    /// empty collection has no composite (`Ok(None)`): that is missing data,
    /// not a failure. Images on different grids are a fault.
    ///
    /// The composite takes the id `mean` and the earliest acquisition time.
    pub fn mean(&self) -> Result<Option<SpectralImage>> {
        let Some(first) = self.images.first() else {
            return Ok(None);
        };

        let mut sums: BTreeMap<&str, (Raster<f64>, Raster<f64>)> = BTreeMap::new();
        for image in &self.images {
            for (name, band) in image.bands() {
                let (sum, count) = sums.entry(name).or_insert_with(|| {
                    (band.like(0.0), band.like(0.0))
                });
                sum.check_same_grid(band)?;
                ndarray::Zip::from(sum.data_mut())
                    .and(count.data_mut())
                    .and(band.data())
                    .for_each(|s, c, &v| {
                        if !v.is_nan() {
                            *s += v;
                            *c += 1.0;
                        }
                    });
            }
        }

        let earliest = self
            .images
            .iter()
            .map(|i| i.acquired())
            .min()
            .unwrap_or_else(|| first.acquired());
        let mut composite = SpectralImage::new("mean", earliest);
        for (name, (mut sum, count)) in sums {
            ndarray::Zip::from(sum.data_mut())
                .and(count.data())
                .for_each(|s, &c| {
                    *s = if c > 0.0 { *s / c } else { f64::NAN };
                });
            sum.set_nodata(Some(f64::NAN));
            composite.insert_band(name, sum);
        }
        Ok(Some(composite))
    }
}

impl FromIterator<SpectralImage> for ImageCollection {
    fn from_iter<I: IntoIterator<Item = SpectralImage>>(iter: I) -> Self {
        Self {
            images: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for ImageCollection {
    type Item = SpectralImage;
    type IntoIter = std::vec::IntoIter<SpectralImage>;

    fn into_iter(self) -> Self::IntoIter {
        self.images.into_iter()
    }
}
