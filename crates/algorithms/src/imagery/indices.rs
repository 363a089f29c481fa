//! Vegetation index from spectral bands
//!
//! NDVI is computed from the mean composite of a filtered collection rather
//! than per acquisition, which averages out per-scene noise before the ratio.

use ndarray::Array2;
use crate::maybe_rayon::*;
use vegtrend_core::imagery::SpectralImage;
use vegtrend_core::raster::Raster;
use vegtrend_core::{Error, Result};

/// Compute the normalized difference between two bands:
///
/// `(band_a - band_b) / (band_a + band_b)`
///
/// Result is in the range [-1, 1]. Pixels where the denominator is zero or
/// either input is masked are `NaN` (missing), never an error.
///
/// # Arguments
/// * `band_a` - Numerator positive band
/// * `band_b` - Numerator negative band
pub fn normalized_difference(band_a: &Raster<f64>, band_b: &Raster<f64>) -> Result<Raster<f64>> {
    band_a.check_same_grid(band_b)?;

    let (rows, cols) = band_a.shape();
    let nodata_a = band_a.nodata();
    let nodata_b = band_b.nodata();

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            for col in 0..cols {
                let a = unsafe { band_a.get_unchecked(row, col) };
                let b = unsafe { band_b.get_unchecked(row, col) };

                if is_nodata_f64(a, nodata_a) || is_nodata_f64(b, nodata_b) {
                    continue;
                }

                let sum = a + b;
                if sum.abs() < 1e-10 {
                    continue; // Avoid division by zero
                }

                row_data[col] = (a - b) / sum;
            }
            row_data
        })
        .collect();

    let mut output = band_a.with_same_meta::<f64>(rows, cols);
    output.set_nodata(Some(f64::NAN));
    *output.data_mut() =
        Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))?;
    Ok(output)
}

/// Normalized Difference Vegetation Index
///
/// `NDVI = (NIR - Red) / (NIR + Red)`
///
/// Values range from -1 to 1:
/// - Dense vegetation: 0.6 to 0.9
/// - Sparse vegetation: 0.2 to 0.5
/// - Bare soil, pavement: 0.1 to 0.2
/// - Water: below 0
pub fn ndvi(nir: &Raster<f64>, red: &Raster<f64>) -> Result<Raster<f64>> {
    normalized_difference(nir, red)
}

/// NDVI of a (composite) image from its named NIR and red bands
pub fn image_ndvi(image: &SpectralImage, nir_band: &str, red_band: &str) -> Result<Raster<f64>> {
    ndvi(image.require_band(nir_band)?, image.require_band(red_band)?)
}

fn is_nodata_f64(value: f64, nodata: Option<f64>) -> bool {
    if value.is_nan() {
        return true;
    }
    match nodata {
        Some(nd) => (value - nd).abs() < f64::EPSILON,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use vegtrend_core::GeoTransform;

    fn make_band(rows: usize, cols: usize, value: f64) -> Raster<f64> {
        let mut r = Raster::filled(rows, cols, value);
        r.set_transform(GeoTransform::new(0.0, rows as f64, 1.0, -1.0));
        r
    }

    #[test]
    fn test_ndvi_vegetation() {
        let nir = make_band(5, 5, 0.8);
        let red = make_band(5, 5, 0.2);

        let val = ndvi(&nir, &red).unwrap().get(2, 2).unwrap();

        // (0.8 - 0.2) / (0.8 + 0.2) = 0.6
        assert!((val - 0.6).abs() < 1e-10, "Expected 0.6, got {}", val);
    }

    #[test]
    fn test_ndvi_water_negative() {
        let nir = make_band(5, 5, 0.05);
        let red = make_band(5, 5, 0.1);

        let val = ndvi(&nir, &red).unwrap().get(2, 2).unwrap();
        assert!(val < 0.0, "Water should have negative NDVI, got {}", val);
    }

    #[test]
    fn test_zero_denominator_is_missing() {
        let nir = make_band(3, 3, 0.0);
        let red = make_band(3, 3, 0.0);

        let result = ndvi(&nir, &red).unwrap();
        assert!(result.get(1, 1).unwrap().is_nan());
        assert_eq!(result.valid_count(), 0);
    }

    #[test]
    fn test_masked_input_propagates() {
        let mut nir = make_band(3, 3, 0.5);
        nir.set(0, 0, f64::NAN).unwrap();
        let red = make_band(3, 3, 0.1);

        let result = ndvi(&nir, &red).unwrap();
        assert!(result.get(0, 0).unwrap().is_nan());
        assert_eq!(result.valid_count(), 8);
    }

    #[test]
    fn test_dimension_mismatch() {
        let a = make_band(5, 5, 1.0);
        let b = make_band(5, 10, 1.0);
        assert!(normalized_difference(&a, &b).is_err());
    }

    #[test]
    fn test_image_ndvi_requires_bands() {
        let image = SpectralImage::new("x", Utc.with_ymd_and_hms(2020, 7, 1, 0, 0, 0).unwrap())
            .with_band("B8", make_band(2, 2, 0.5));
        assert!(image_ndvi(&image, "B8", "B4").is_err());
    }
}
