//! Boolean pixel masks
//!
//! A [`Mask`] is a `Raster<u8>` holding [`MASK_SET`] / [`MASK_CLEAR`], with
//! [`MASK_UNKNOWN`] as nodata for cells whose source value was itself
//! masked. Applying a mask never unmasks anything: an unknown cell always
//! removes the pixel it is applied to.

use crate::error::Result;
use crate::raster::Raster;

/// Flag raised
pub const MASK_SET: u8 = 1;
/// Flag lowered
pub const MASK_CLEAR: u8 = 0;
/// Source value was masked; flag undetermined
pub const MASK_UNKNOWN: u8 = u8::MAX;

/// Per-pixel boolean raster
pub type Mask = Raster<u8>;

impl Raster<u8> {
    /// Threshold a float raster into a mask.
    ///
    /// Masked (`NaN`) cells become [`MASK_UNKNOWN`].
    pub fn from_predicate<F>(source: &Raster<f64>, predicate: F) -> Self
    where
        F: Fn(f64) -> bool,
    {
        let (rows, cols) = source.shape();
        let mut mask = source.with_same_meta::<u8>(rows, cols);
        mask.set_nodata(Some(MASK_UNKNOWN));
        for ((row, col), v) in source.data().indexed_iter() {
            mask.data_mut()[(row, col)] = if v.is_nan() {
                MASK_UNKNOWN
            } else if predicate(*v) {
                MASK_SET
            } else {
                MASK_CLEAR
            };
        }
        mask
    }

    /// Whether the flag at (row, col) is raised; unknown cells are not
    pub fn is_set(&self, row: usize, col: usize) -> bool {
        matches!(self.data().get((row, col)), Some(&MASK_SET))
    }

    /// Whether the flag at (row, col) is known and lowered
    pub fn is_clear(&self, row: usize, col: usize) -> bool {
        matches!(self.data().get((row, col)), Some(&MASK_CLEAR))
    }

    /// Swap set and clear cells; unknown cells stay unknown
    pub fn inverted(&self) -> Self {
        let mut out = self.clone();
        out.data_mut().mapv_inplace(|v| match v {
            MASK_SET => MASK_CLEAR,
            MASK_CLEAR => MASK_SET,
            other => other,
        });
        out
    }

    /// Number of raised cells
    pub fn count_set(&self) -> usize {
        self.data().iter().filter(|v| **v == MASK_SET).count()
    }

    /// Keep only the pixels of `target` where this mask is set.
    ///
    /// Cleared and unknown cells become `NaN` in `target`.
    pub fn apply_to(&self, target: &mut Raster<f64>) -> Result<()> {
        target.check_same_grid(self)?;
        target.retain_where(|row, col| self.is_set(row, col));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> Raster<f64> {
        Raster::from_vec(vec![0.2, 0.7, f64::NAN, 0.6], 2, 2).unwrap()
    }

    #[test]
    fn test_from_predicate_marks_unknown() {
        let mask = Mask::from_predicate(&source(), |v| v <= 0.6);
        assert!(mask.is_set(0, 0));
        assert!(mask.is_clear(0, 1));
        assert_eq!(mask.get(1, 0).unwrap(), MASK_UNKNOWN);
        assert!(mask.is_set(1, 1));
        assert_eq!(mask.count_set(), 2);
    }

    #[test]
    fn test_inverted_keeps_unknown() {
        let inv = Mask::from_predicate(&source(), |v| v <= 0.6).inverted();
        assert!(inv.is_clear(0, 0));
        assert!(inv.is_set(0, 1));
        assert!(!inv.is_set(1, 0));
        assert!(!inv.is_clear(1, 0));
    }

    #[test]
    fn test_apply_masks_cleared_and_unknown() {
        let mask = Mask::from_predicate(&source(), |v| v > 0.5);
        let mut target: Raster<f64> = Raster::filled(2, 2, 1.0);
        mask.apply_to(&mut target).unwrap();
        assert!(target.get(0, 0).unwrap().is_nan());
        assert_eq!(target.get(0, 1).unwrap(), 1.0);
        assert!(target.get(1, 0).unwrap().is_nan());
        assert_eq!(target.get(1, 1).unwrap(), 1.0);
    }
}
