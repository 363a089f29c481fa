//! # vegtrend core
//!
//! Core types and I/O for the vegtrend parcel NDVI pipeline.
//!
//! This crate provides:
//! - `Raster<T>`: Generic georeferenced raster grid, `NaN` = masked
//! - `GeoTransform`: Affine transformation for georeferencing
//! - `RasterGrid`: the common grid bands are resampled onto before compositing
//! - `SpectralImage` / `ImageCollection`: multi-band acquisitions and mean composites
//! - `Parcel` / `ParcelCollection`: polygon features with attributes
//! - `DateWindow`: half-open calendar windows used for every imagery query
//! - Native single-band GeoTIFF reading and writing

pub mod error;
pub mod imagery;
pub mod io;
pub mod raster;
pub mod time;
pub mod vector;

pub use error::{Error, Result};
pub use imagery::{ImageCollection, SpectralImage};
pub use raster::{GeoTransform, Raster, RasterElement, RasterGrid, Resampling};
pub use time::DateWindow;
pub use vector::{AttributeValue, Parcel, ParcelCollection};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::imagery::{ImageCollection, SpectralImage};
    pub use crate::raster::{GeoTransform, Mask, Raster, RasterElement, RasterGrid, Resampling};
    pub use crate::time::DateWindow;
    pub use crate::vector::{AttributeValue, Parcel, ParcelCollection};
}
