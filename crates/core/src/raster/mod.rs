//! Raster data structures and operations

mod element;
mod geotransform;
mod grid;
mod mask;
mod resample;

pub use element::RasterElement;
pub use geotransform::GeoTransform;
pub use grid::{Raster, RasterStatistics};
pub use mask::{Mask, MASK_CLEAR, MASK_SET, MASK_UNKNOWN};
pub use resample::{RasterGrid, Resampling};
